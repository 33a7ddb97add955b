//! Target selection for the scripted personas.
//!
//! Every function here is a pure scoring pass over borrowed match state: build a
//! score per candidate from a weight table plus jitter drawn from the injected
//! random source, then take the maximum. Ties on score go to the candidate scored
//! first, so candidate order (seat order) is the tie-break.

use tracing::debug;

use crate::config::DetectiveInsight;
use crate::match_state::{MatchState, Participant};
use crate::rng::RandomSource;
use crate::types::{Role, VoteCast};

#[derive(Clone, Debug)]
pub struct ScoredTarget<'a> {
    pub participant: &'a Participant,
    pub score: f32,
    pub reasoning: String,
}

#[derive(Clone, Copy, Debug)]
pub struct MafiaWeights {
    pub detective: f32,
    pub detective_early_bonus: f32,
    pub early_round_max: u32,
    pub doctor: f32,
    pub doctor_late_bonus: f32,
    pub late_round_min: u32,
    pub townsfolk: f32,
    pub near_victory_bonus: f32,
    pub endgame_alive_max: usize,
    pub endgame_townsfolk_penalty: f32,
    pub jitter_span: f32,
}

pub const MAFIA_WEIGHTS: MafiaWeights = MafiaWeights {
    detective: 120.0,
    detective_early_bonus: 30.0,
    early_round_max: 2,
    doctor: 90.0,
    doctor_late_bonus: 20.0,
    late_round_min: 3,
    townsfolk: 60.0,
    near_victory_bonus: 50.0,
    endgame_alive_max: 3,
    endgame_townsfolk_penalty: 30.0,
    jitter_span: 25.0,
};

#[derive(Clone, Copy, Debug)]
pub struct DoctorWeights {
    pub detective: f32,
    pub doctor: f32,
    pub doctor_late_bonus: f32,
    pub late_round_min: u32,
    pub townsfolk: f32,
    pub first_round_detective_bonus: f32,
    pub first_round_doctor_bonus: f32,
    pub survival_round_min: u32,
    pub survival_bonus: f32,
    pub jitter_max: f32,
}

pub const DOCTOR_WEIGHTS: DoctorWeights = DoctorWeights {
    detective: 100.0,
    doctor: 70.0,
    doctor_late_bonus: 20.0,
    late_round_min: 3,
    townsfolk: 40.0,
    first_round_detective_bonus: 30.0,
    first_round_doctor_bonus: 20.0,
    survival_round_min: 4,
    survival_bonus: 40.0,
    jitter_max: 15.0,
};

#[derive(Clone, Copy, Debug)]
pub struct DetectiveWeights {
    pub base: f32,
    pub first_round_spread: f32,
    pub later_spread: f32,
    pub hidden_mafia_bonus: f32,
    pub revisit_penalty: f32,
    pub suspicious_vote_bonus: f32,
    pub suspicion_cap: f32,
}

pub const DETECTIVE_WEIGHTS: DetectiveWeights = DetectiveWeights {
    base: 50.0,
    first_round_spread: 30.0,
    later_spread: 40.0,
    hidden_mafia_bonus: 80.0,
    revisit_penalty: 100.0,
    suspicious_vote_bonus: 20.0,
    suspicion_cap: 60.0,
};

#[derive(Clone, Copy, Debug)]
pub struct VoteWeights {
    pub partner: f32,
    pub detective: f32,
    pub doctor: f32,
    pub innocent: f32,
    pub known_mafia: f32,
    pub uncertain_spread: f32,
    pub jitter_span: f32,
}

pub const VOTE_WEIGHTS: VoteWeights = VoteWeights {
    partner: -1000.0,
    detective: 200.0,
    doctor: 150.0,
    innocent: 100.0,
    known_mafia: 300.0,
    uncertain_spread: 50.0,
    jitter_span: 30.0,
};

/// Highest score wins; on equal scores the earliest candidate is kept.
pub fn pick_best<'a>(scored: &[ScoredTarget<'a>]) -> Option<&'a Participant> {
    let mut best: Option<&ScoredTarget<'a>> = None;
    for entry in scored {
        if best.is_none_or(|current| entry.score > current.score) {
            best = Some(entry);
        }
    }
    best.map(|entry| entry.participant)
}

pub fn score_mafia_targets<'a>(
    candidates: &[&'a Participant],
    round: u32,
    state: &MatchState,
    rng: &mut impl RandomSource,
) -> Vec<ScoredTarget<'a>> {
    let w = MAFIA_WEIGHTS;
    let alive_mafia = state.alive_mafia_count() as i64;
    let alive_innocents = state.alive_innocent_count() as i64;
    let near_victory = alive_mafia >= alive_innocents - 1;
    let endgame = state.alive_count() <= w.endgame_alive_max;

    candidates
        .iter()
        .map(|&target| {
            let (mut score, mut reasoning) = match target.role {
                Role::Detective => {
                    let early = if round <= w.early_round_max {
                        w.detective_early_bonus
                    } else {
                        0.0
                    };
                    (w.detective + early, "detective threatens the mafia".to_string())
                }
                Role::Doctor => {
                    let late = if round >= w.late_round_min {
                        w.doctor_late_bonus
                    } else {
                        0.0
                    };
                    (w.doctor + late, "doctor shields key targets".to_string())
                }
                Role::Townsfolk => (w.townsfolk, "standard townsfolk target".to_string()),
                // never a candidate in practice; scored as a townsfolk would be
                Role::Mafia => (w.townsfolk, "fellow mafia".to_string()),
            };
            if near_victory {
                score += w.near_victory_bonus;
                reasoning.push_str(" + close to victory");
            }
            if endgame && target.role == Role::Townsfolk {
                score -= w.endgame_townsfolk_penalty;
                reasoning.push_str(" - endgame caution");
            }
            score += rng.jitter(w.jitter_span);
            ScoredTarget {
                participant: target,
                score,
                reasoning,
            }
        })
        .collect()
}

pub fn select_mafia_target<'a>(
    candidates: &[&'a Participant],
    round: u32,
    state: &MatchState,
    rng: &mut impl RandomSource,
) -> Option<&'a Participant> {
    let scored = score_mafia_targets(candidates, round, state, rng);
    log_ranking("mafia kill", round, &scored);
    pick_best(&scored)
}

pub fn score_doctor_targets<'a>(
    candidates: &[&'a Participant],
    round: u32,
    rng: &mut impl RandomSource,
) -> Vec<ScoredTarget<'a>> {
    let w = DOCTOR_WEIGHTS;
    candidates
        .iter()
        .map(|&target| {
            let (mut score, mut reasoning) = match target.role {
                Role::Detective => (w.detective, "protect the investigator".to_string()),
                Role::Doctor => {
                    let late = if round >= w.late_round_min {
                        w.doctor_late_bonus
                    } else {
                        0.0
                    };
                    (w.doctor + late, "self-preservation".to_string())
                }
                Role::Townsfolk | Role::Mafia => (w.townsfolk, "protect an innocent".to_string()),
            };
            if round == 1 {
                match target.role {
                    Role::Detective => score += w.first_round_detective_bonus,
                    Role::Doctor => score += w.first_round_doctor_bonus,
                    _ => {}
                }
                reasoning.push_str(" + first round priority");
            }
            if round >= w.survival_round_min && target.role == Role::Doctor {
                score += w.survival_bonus;
                reasoning.push_str(" + late game survival");
            }
            score += rng.next_f32() * w.jitter_max;
            ScoredTarget {
                participant: target,
                score,
                reasoning,
            }
        })
        .collect()
}

pub fn select_doctor_target<'a>(
    candidates: &[&'a Participant],
    round: u32,
    rng: &mut impl RandomSource,
) -> Option<&'a Participant> {
    let scored = score_doctor_targets(candidates, round, rng);
    log_ranking("doctor protection", round, &scored);
    pick_best(&scored)
}

pub fn score_detective_targets<'a>(
    candidates: &[&'a Participant],
    round: u32,
    state: &MatchState,
    insight: DetectiveInsight,
    rng: &mut impl RandomSource,
) -> Vec<ScoredTarget<'a>> {
    let w = DETECTIVE_WEIGHTS;
    candidates
        .iter()
        .map(|&target| {
            let mut score = w.base;
            let mut reasoning = if round == 1 {
                score += rng.next_f32() * w.first_round_spread;
                "first round exploration".to_string()
            } else {
                score += rng.next_f32() * w.later_spread;
                "behavioral analysis".to_string()
            };
            match insight {
                DetectiveInsight::Omniscient => {
                    if target.role.is_mafia() {
                        score += w.hidden_mafia_bonus;
                        reasoning = "high suspicion target".to_string();
                    }
                }
                DetectiveInsight::PublicSignals => {
                    if already_investigated(state, &target.id) {
                        score -= w.revisit_penalty;
                        reasoning.push_str(" - already investigated");
                    }
                    let suspicion = public_suspicion(state, &target.id, &w);
                    if suspicion > 0.0 {
                        score += suspicion;
                        reasoning.push_str(" + voted out innocents");
                    }
                }
            }
            ScoredTarget {
                participant: target,
                score,
                reasoning,
            }
        })
        .collect()
}

pub fn select_detective_target<'a>(
    candidates: &[&'a Participant],
    round: u32,
    state: &MatchState,
    insight: DetectiveInsight,
    rng: &mut impl RandomSource,
) -> Option<&'a Participant> {
    let scored = score_detective_targets(candidates, round, state, insight, rng);
    log_ranking("detective investigation", round, &scored);
    pick_best(&scored)
}

fn already_investigated(state: &MatchState, target_id: &str) -> bool {
    state
        .investigations()
        .iter()
        .any(|investigation| investigation.target_id == target_id)
}

/// Votes this participant cast against someone who was then revealed innocent.
fn public_suspicion(state: &MatchState, target_id: &str, w: &DetectiveWeights) -> f32 {
    let hits = state
        .voting_history()
        .iter()
        .filter(|entry| !entry.eliminated_role.is_mafia())
        .filter(|entry| {
            entry
                .voting_details
                .iter()
                .any(|cast| cast.voter == target_id && cast.target == entry.eliminated_id)
        })
        .count();
    (hits as f32 * w.suspicious_vote_bonus).min(w.suspicion_cap)
}

pub fn score_vote_targets<'a>(
    voter: &Participant,
    state: &'a MatchState,
    rng: &mut impl RandomSource,
) -> Vec<ScoredTarget<'a>> {
    let w = VOTE_WEIGHTS;
    state
        .alive()
        .filter(|target| target.id != voter.id)
        .map(|target| {
            let (mut score, reasoning) = if voter.role.is_mafia() {
                match target.role {
                    Role::Mafia => (w.partner, "mafia partner - avoid"),
                    Role::Detective => (w.detective, "detective - eliminate threat"),
                    Role::Doctor => (w.doctor, "doctor - eliminate protection"),
                    Role::Townsfolk => (w.innocent, "innocent - standard target"),
                }
            } else if target.role.is_mafia() {
                (w.known_mafia, "suspected mafia - eliminate")
            } else {
                (
                    rng.next_f32() * w.uncertain_spread,
                    "uncertain - random choice",
                )
            };
            score += rng.jitter(w.jitter_span);
            ScoredTarget {
                participant: target,
                score,
                reasoning: reasoning.to_string(),
            }
        })
        .collect()
}

pub fn select_vote_target<'a>(
    voter: &Participant,
    state: &'a MatchState,
    rng: &mut impl RandomSource,
) -> Option<&'a Participant> {
    let scored = score_vote_targets(voter, state, rng);
    log_ranking(&format!("{} vote", voter.display_name()), state.round, &scored);
    pick_best(&scored)
}

/// One ballot per living persona, in seat order. Does not touch the vote book.
pub fn persona_ballots(state: &MatchState, rng: &mut impl RandomSource) -> Vec<VoteCast> {
    state
        .alive()
        .filter(|p| p.is_persona())
        .filter_map(|voter| {
            select_vote_target(voter, state, rng).map(|target| VoteCast {
                voter: voter.id.clone(),
                target: target.id.clone(),
            })
        })
        .collect()
}

fn log_ranking(kind: &str, round: u32, scored: &[ScoredTarget<'_>]) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    let mut ranked: Vec<&ScoredTarget<'_>> = scored.iter().collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    for (rank, entry) in ranked.iter().enumerate() {
        debug!(
            kind,
            round,
            rank = rank + 1,
            candidate = entry.participant.display_name(),
            score = f64::from(entry.score),
            reasoning = %entry.reasoning,
            "ai target ranking"
        );
    }
}
