use clap::Parser;
use mafia_party_server::config::{DetectiveInsight, MatchConfig};
use mafia_party_server::constants::TICK_MS;
use mafia_party_server::engine::PhaseController;
use mafia_party_server::logging::{init_logging, LogFormat};
use mafia_party_server::match_state::MatchState;
use mafia_party_server::roles::plan_deck;
use mafia_party_server::types::{GameEvent, Role, Winner};
use mafia_party_server::win::check_win;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info, warn};

const TICK_SAFETY_LIMIT: u64 = 20_000;

#[derive(Parser, Debug)]
#[command(author, version, about = "Runs headless Mafia matches and checks invariants")]
struct Cli {
    #[arg(long, default_value_t = 20)]
    matches: u32,
    #[arg(long, env = "MAFIA_SEED")]
    seed: Option<u32>,
    #[arg(long, default_value = "omniscient", value_parser = parse_insight)]
    detective_insight: DetectiveInsight,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_insight(raw: &str) -> Result<DetectiveInsight, String> {
    DetectiveInsight::parse(raw)
        .ok_or_else(|| format!("unknown detective insight '{raw}' (omniscient | public)"))
}

#[derive(Clone, Debug, Serialize)]
struct MatchResultLine {
    seed: u32,
    winner: Option<Winner>,
    rounds: u32,
    ticks: u64,
    #[serde(rename = "nightKills")]
    night_kills: u32,
    #[serde(rename = "quietNights")]
    quiet_nights: u32,
    #[serde(rename = "voteEliminations")]
    vote_eliminations: u32,
    investigations: usize,
    survivors: usize,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug)]
struct MatchRunResult {
    result: MatchResultLine,
    anomaly_records: Vec<AnomalyRecord>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "matchCount")]
    match_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageRounds")]
    average_rounds: f64,
    #[serde(rename = "winnerCounts")]
    winner_counts: BTreeMap<String, usize>,
    matches: Vec<MatchResultLine>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.verbose.saturating_add(1));

    let run_started_at_ms = now_ms();
    let base_seed = cli.seed.unwrap_or(run_started_at_ms as u32);
    let match_id = cli
        .match_id
        .clone()
        .unwrap_or_else(|| default_match_id(base_seed, run_started_at_ms));
    let mut has_anomaly = false;
    let mut results = Vec::new();
    let mut total_anomalies = 0usize;

    for idx in 0..cli.matches {
        let seed = base_seed.wrapping_add(idx);
        info!(match_id = %match_id, seed, "match started");
        let run = match run_match(seed, cli.detective_insight) {
            Ok(run) => run,
            Err(err) => {
                error!(match_id = %match_id, seed, %err, "match could not start");
                std::process::exit(2);
            }
        };

        for anomaly in &run.anomaly_records {
            warn!(
                match_id = %match_id,
                seed,
                tick = anomaly.tick,
                message = %anomaly.message,
                "anomaly detected"
            );
        }
        if !run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += run.anomaly_records.len();
        info!(
            match_id = %match_id,
            seed,
            winner = %winner_key(run.result.winner),
            rounds = run.result.rounds,
            ticks = run.result.ticks,
            "match finished"
        );

        match serde_json::to_string(&run.result) {
            Ok(line) => println!("{line}"),
            Err(err) => error!(%err, "failed to serialize match result"),
        }
        results.push(run.result);
    }

    let summary = build_run_summary(
        match_id.clone(),
        run_started_at_ms,
        now_ms(),
        results,
        total_anomalies,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(err) = write_summary(path, &summary) {
            error!(path = %path.display(), %err, "summary write failed");
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    info!(
        match_id = %match_id,
        matches = summary.match_count,
        anomalies = summary.anomaly_count,
        average_rounds = summary.average_rounds,
        winners = ?summary.winner_counts,
        summary_out = ?summary_out_written,
        "run finished"
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

/// Plays one match with an idle human seat until the controller reports game over.
fn run_match(
    seed: u32,
    insight: DetectiveInsight,
) -> Result<MatchRunResult, mafia_party_server::error::GameError> {
    let config = MatchConfig {
        detective_insight: insight,
        ..MatchConfig::default()
    };
    let mut controller = PhaseController::new(config, seed)?;
    controller.seat_human("Simulated")?;
    controller.start()?;

    let mut night_kills = 0;
    let mut quiet_nights = 0;
    let mut vote_eliminations = 0;
    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut tick = 0u64;

    while !controller.is_over() {
        controller.advance(TICK_MS);
        tick += 1;
        for event in controller.drain_events() {
            match event {
                GameEvent::NightResults {
                    eliminated: Some(_),
                    ..
                } => night_kills += 1,
                GameEvent::NightResults {
                    eliminated: None, ..
                } => quiet_nights += 1,
                GameEvent::PlayerEliminated { .. } => vote_eliminations += 1,
                _ => {}
            }
        }
        for message in collect_state_anomalies(controller.state(), &controller.config) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                tick,
                message,
            );
        }
        if tick > TICK_SAFETY_LIMIT {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                tick,
                "tick safety limit exceeded".to_string(),
            );
            break;
        }
    }

    let state = controller.state();
    if controller.is_over() && check_win(state).winner != controller.winner() {
        push_anomaly(
            &mut anomalies,
            &mut anomaly_records,
            &mut anomaly_seen,
            tick,
            format!(
                "declared winner {:?} disagrees with final counts",
                controller.winner()
            ),
        );
    }

    Ok(MatchRunResult {
        result: MatchResultLine {
            seed,
            winner: controller.winner(),
            rounds: state.round,
            ticks: tick,
            night_kills,
            quiet_nights,
            vote_eliminations,
            investigations: state.investigations().len(),
            survivors: state.alive_count(),
            anomalies,
        },
        anomaly_records,
    })
}

fn collect_state_anomalies(state: &MatchState, config: &MatchConfig) -> Vec<String> {
    let mut anomalies = Vec::new();
    let participants = state.participants();

    let projected = participants.iter().filter(|p| p.alive).count();
    if state.alive_count() != projected {
        anomalies.push(format!(
            "alive cache {} disagrees with flags {projected}",
            state.alive_count()
        ));
    }
    if state.alive_mafia_count() + state.alive_innocent_count() != state.alive_count() {
        anomalies.push("faction counts do not sum to the alive count".to_string());
    }
    if state.eliminated_ids().len() + state.alive_count() != participants.len() {
        anomalies.push(format!(
            "eliminated log has {} entries with {} alive of {}",
            state.eliminated_ids().len(),
            state.alive_count(),
            participants.len()
        ));
    }
    if state.round as usize > participants.len() {
        anomalies.push(format!("round {} exceeds the table size", state.round));
    }

    match plan_deck(participants.len(), config.mafia_share) {
        Ok(plan) => {
            for role in [Role::Mafia, Role::Doctor, Role::Detective, Role::Townsfolk] {
                let dealt = participants.iter().filter(|p| p.role == role).count();
                if dealt != plan.count(role) {
                    anomalies.push(format!(
                        "deck drift: {dealt} {role} dealt, {} planned",
                        plan.count(role)
                    ));
                }
            }
        }
        Err(err) => anomalies.push(format!("table cannot host a deck: {err}")),
    }
    anomalies
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_match_id(seed: u32, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn winner_key(winner: Option<Winner>) -> String {
    match winner {
        Some(Winner::Mafia) => "mafia",
        Some(Winner::Innocents) => "innocents",
        None => "unfinished",
    }
    .to_string()
}

fn build_run_summary(
    match_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    matches: Vec<MatchResultLine>,
    anomaly_count: usize,
) -> RunSummary {
    let match_count = matches.len();
    let average_rounds = if match_count == 0 {
        0.0
    } else {
        matches.iter().map(|m| f64::from(m.rounds)).sum::<f64>() / match_count as f64
    };
    let mut winner_counts: BTreeMap<String, usize> = BTreeMap::new();
    for result in &matches {
        *winner_counts.entry(winner_key(result.winner)).or_insert(0) += 1;
    }
    RunSummary {
        match_id,
        started_at_ms,
        finished_at_ms,
        match_count,
        anomaly_count,
        average_rounds,
        winner_counts,
        matches,
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_result(winner: Option<Winner>, rounds: u32) -> MatchResultLine {
        MatchResultLine {
            seed: 42,
            winner,
            rounds,
            ticks: 100,
            night_kills: 1,
            quiet_nights: 0,
            vote_eliminations: 1,
            investigations: 1,
            survivors: 5,
            anomalies: Vec::new(),
        }
    }

    #[test]
    fn default_match_id_contains_seed_and_timestamp() {
        assert_eq!(default_match_id(42, 123456789), "sim-42-123456789");
    }

    #[test]
    fn build_run_summary_averages_rounds_and_counts_winners() {
        let summary = build_run_summary(
            "sim-42-1".to_string(),
            1,
            2,
            vec![
                make_result(Some(Winner::Mafia), 2),
                make_result(Some(Winner::Innocents), 3),
                make_result(Some(Winner::Mafia), 4),
            ],
            0,
        );
        assert_eq!(summary.match_count, 3);
        assert!((summary.average_rounds - 3.0).abs() < f64::EPSILON);
        assert_eq!(summary.winner_counts.get("mafia"), Some(&2));
        assert_eq!(summary.winner_counts.get("innocents"), Some(&1));
    }

    #[test]
    fn write_summary_returns_error_when_parent_does_not_exist() {
        let target = std::env::temp_dir()
            .join(format!("mafia-sim-missing-{}", now_ms()))
            .join("summary.json");
        let summary = build_run_summary("sim-1-1".to_string(), 1, 2, Vec::new(), 0);
        assert!(write_summary(&target, &summary).is_err());
    }

    #[test]
    fn push_anomaly_keeps_records_and_deduplicates_summary_messages() {
        let mut anomalies = Vec::new();
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        push_anomaly(&mut anomalies, &mut records, &mut seen, 10, "same".to_string());
        push_anomaly(&mut anomalies, &mut records, &mut seen, 11, "same".to_string());
        assert_eq!(anomalies.len(), 1);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].tick, 11);
    }

    #[test]
    fn simulated_matches_finish_cleanly_in_both_insight_modes() {
        for insight in [DetectiveInsight::Omniscient, DetectiveInsight::PublicSignals] {
            for seed in 1..=10u32 {
                let run = run_match(seed, insight).expect("default table starts");
                assert!(run.result.winner.is_some(), "seed {seed}");
                assert!(run.result.anomalies.is_empty(), "{:?}", run.result.anomalies);
                assert!(run.result.vote_eliminations >= 1);
            }
        }
    }
}
