//! Timer-driven phase controller.
//!
//! The controller exclusively owns the [`MatchState`]. External signals and the
//! host scheduler's ticks are processed one at a time; resolution engines borrow
//! the state for a single synchronous call. Everything observable is queued as a
//! [`GameEvent`] and handed out through [`PhaseController::drain_events`].

use chrono::{SecondsFormat, Utc};
use tracing::{debug, info};

use crate::config::MatchConfig;
use crate::constants::{whole_seconds, HUMAN_ID};
use crate::error::{ConfigurationError, GameError, SignalError};
use crate::match_state::{MatchState, NightAction, Participant, PhaseTimer};
use crate::narration::{Narrator, ScriptedNarrator};
use crate::night::{is_valid_kill_target, resolve_night};
use crate::rng::Rng;
use crate::roles::assign_roles;
use crate::strategy::persona_ballots;
use crate::types::{
    FinalStats, GameEvent, GameSnapshot, Phase, RevealedParticipant, Role, VotingHistoryEntry,
    Winner,
};
use crate::voting::resolve_votes;
use crate::win::{check_win, player_result};

pub struct PhaseController {
    pub config: MatchConfig,

    state: MatchState,
    rng: Rng,
    narrator: Box<dyn Narrator>,
    events: Vec<GameEvent>,
    announced_secs: u64,
    winner: Option<Winner>,
}

impl PhaseController {
    /// Opens a lobby with the configured personas already seated.
    pub fn new(config: MatchConfig, seed: u32) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let participants = config.personas.iter().map(Participant::persona).collect();
        Ok(Self {
            state: MatchState::new(participants),
            rng: Rng::new(seed),
            narrator: Box::new(ScriptedNarrator),
            events: Vec::new(),
            announced_secs: 0,
            winner: None,
            config,
        })
    }

    pub fn with_narrator(mut self, narrator: Box<dyn Narrator>) -> Self {
        self.narrator = narrator;
        self
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn winner(&self) -> Option<Winner> {
        self.winner
    }

    pub fn is_over(&self) -> bool {
        self.state.phase == Phase::GameOver
    }

    /// Seats (or renames) the single human. The human always takes the first seat.
    pub fn seat_human(&mut self, name: &str) -> Result<String, SignalError> {
        if self.state.phase != Phase::Lobby {
            return Err(SignalError::LobbyClosed);
        }
        match self.state.participant_mut(HUMAN_ID) {
            Some(human) => human.name = name.to_string(),
            None => self
                .state
                .insert_participant(0, Participant::human(HUMAN_ID, name)),
        }
        info!(participant = HUMAN_ID, name, "human seated");
        Ok(HUMAN_ID.to_string())
    }

    pub fn start(&mut self) -> Result<(), GameError> {
        if self.state.phase != Phase::Lobby {
            return Err(SignalError::WrongPhase {
                action: "start",
                expected: Phase::Lobby,
                actual: self.state.phase,
            }
            .into());
        }
        assign_roles(self.state.participants_mut(), &self.config, &mut self.rng)?;
        self.state.refresh_alive();
        self.state.clear_round_scoped();
        self.state.round = 1;
        self.winner = None;

        let humans: Vec<(String, Role)> = self
            .state
            .humans()
            .map(|human| (human.id.clone(), human.role))
            .collect();
        for (recipient, role) in humans {
            let mafia_partners = if role.is_mafia() {
                self.state
                    .participants()
                    .iter()
                    .filter(|p| p.role.is_mafia() && p.id != recipient)
                    .map(|p| p.display_name().to_string())
                    .collect()
            } else {
                Vec::new()
            };
            self.events.push(GameEvent::RoleAssigned {
                recipient,
                role,
                mafia_partners,
            });
        }
        info!(participants = self.state.participants().len(), "match started");
        self.enter_phase(Phase::Night);
        Ok(())
    }

    /// Records the human's night action; a later submission for the same actor
    /// replaces the earlier one until the night resolves.
    pub fn submit_night_action(
        &mut self,
        actor_id: &str,
        role: Role,
        target_id: &str,
    ) -> Result<(), SignalError> {
        self.expect_phase("night action", Phase::Night)?;
        let actor = self.acting_human(actor_id, "night actions")?;
        if !role.has_night_action() {
            return Err(SignalError::NoNightAction(role));
        }
        if actor.role != role {
            return Err(SignalError::RoleMismatch {
                actor: actor_id.to_string(),
                role,
            });
        }
        self.living_target(target_id)?;
        if role == Role::Mafia && !is_valid_kill_target(&self.state, target_id) {
            return Err(SignalError::InvalidTarget {
                target: target_id.to_string(),
                reason: "the mafia cannot target a partner",
            });
        }

        self.state.record_night_action(NightAction {
            role,
            actor_id: actor_id.to_string(),
            target_id: target_id.to_string(),
        });
        debug!(actor = actor_id, %role, chosen = target_id, "night action recorded");
        self.events.push(GameEvent::NightActionConfirmed {
            recipient: actor_id.to_string(),
            role,
            target: target_id.to_string(),
        });
        Ok(())
    }

    pub fn submit_vote(&mut self, voter_id: &str, target_id: &str) -> Result<(), SignalError> {
        self.expect_phase("vote", Phase::Voting)?;
        self.acting_human(voter_id, "votes")?;
        self.living_target(target_id)?;
        if voter_id == target_id {
            return Err(SignalError::InvalidTarget {
                target: target_id.to_string(),
                reason: "participants cannot vote for themselves",
            });
        }
        self.state.votes_mut().cast(voter_id, target_id);
        debug!(voter = voter_id, chosen = target_id, "vote recorded");
        self.events.push(GameEvent::VoteCast {
            voter: voter_id.to_string(),
            target: target_id.to_string(),
        });
        Ok(())
    }

    /// Fast-forwards the active phase through the same path as a natural expiry.
    pub fn request_skip(&mut self, phase: Phase, skipped_by: &str) -> Result<(), SignalError> {
        let active = self.state.phase;
        if !active.is_timed() {
            return Err(SignalError::CannotSkip(active));
        }
        if phase != active {
            return Err(SignalError::StaleSkip {
                requested: phase,
                active,
            });
        }
        info!(%phase, skipped_by, "phase skipped");
        self.events.push(GameEvent::PhaseSkipped {
            skipped_by: skipped_by.to_string(),
            phase,
        });
        self.on_timer_expire(phase);
        Ok(())
    }

    /// Returns to the lobby from any phase, keeping the seated participants.
    pub fn request_reset(&mut self) {
        self.state.reset();
        self.winner = None;
        self.announced_secs = 0;
        info!("match reset to lobby");
        self.events.push(GameEvent::GameRestarted {
            phase: self.state.phase,
            round: self.state.round,
            alive_count: self.state.alive_count(),
        });
    }

    /// Scheduler entry point: moves the active timer forward by `dt_ms`.
    pub fn advance(&mut self, dt_ms: u64) {
        let Some(mut timer) = self.state.timer else {
            return;
        };
        timer.remaining_ms = timer.remaining_ms.saturating_sub(dt_ms);
        timer.elapsed_ms = timer.elapsed_ms.saturating_add(dt_ms);
        self.state.timer = Some(timer);

        if timer.phase == Phase::Voting
            && !self.state.ai_votes_cast
            && timer.elapsed_ms >= self.config.ai_vote_delay_ms
        {
            self.cast_persona_votes();
        }

        if timer.remaining_ms == 0 {
            self.on_timer_expire(timer.phase);
            return;
        }
        let secs = whole_seconds(timer.remaining_ms);
        if secs != self.announced_secs {
            self.announced_secs = secs;
            self.events.push(GameEvent::TimerUpdate {
                phase: timer.phase,
                time_remaining: secs,
            });
        }
    }

    /// Runs the transition out of `phase`. Returns `false` when `phase` is no longer
    /// the active one, which makes late timer callbacks harmless.
    pub fn on_timer_expire(&mut self, phase: Phase) -> bool {
        if phase != self.state.phase || !phase.is_timed() {
            debug!(%phase, active = %self.state.phase, "stale timer expiry ignored");
            return false;
        }
        self.state.timer = None;
        match phase {
            Phase::Night => self.finish_night(),
            Phase::Discussion => self.enter_phase(Phase::Voting),
            Phase::Voting => self.finish_voting(),
            Phase::Lobby | Phase::GameOver => {}
        }
        true
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            phase: self.state.phase,
            round: self.state.round,
            time_remaining: self
                .state
                .timer
                .map_or(0, |timer| whole_seconds(timer.remaining_ms)),
            alive_players: self.state.alive().map(Participant::view).collect(),
        }
    }

    pub fn voting_history(&self) -> &[VotingHistoryEntry] {
        self.state.voting_history()
    }

    fn enter_phase(&mut self, phase: Phase) {
        let duration_ms = self.config.phase_duration_ms(phase);
        self.state.phase = phase;
        self.state.timer = Some(PhaseTimer::new(phase, duration_ms));
        self.announced_secs = whole_seconds(duration_ms);
        info!(%phase, round = self.state.round, duration_ms, "phase started");
        self.events.push(GameEvent::PhaseChange {
            phase,
            round: self.state.round,
            time_remaining: self.announced_secs,
        });
    }

    fn finish_night(&mut self) {
        let outcome = resolve_night(
            &mut self.state,
            self.config.detective_insight,
            self.narrator.as_ref(),
            &mut self.rng,
        );
        self.events.push(GameEvent::NightResults {
            round: outcome.round,
            narrative: outcome.narrative,
            eliminated: outcome.eliminated,
        });
        for notice in outcome.private {
            self.events.push(GameEvent::PrivateNightInfo {
                recipient: notice.recipient,
                info: notice.info,
            });
        }
        match outcome.win.winner {
            Some(winner) => self.finish(winner, outcome.win.reason),
            None => self.enter_phase(Phase::Discussion),
        }
    }

    fn finish_voting(&mut self) {
        if !self.state.ai_votes_cast {
            self.cast_persona_votes();
        }
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let outcome = resolve_votes(&mut self.state, &mut self.rng, &timestamp);
        if let Some(elimination) = outcome.elimination {
            self.events.push(GameEvent::PlayerEliminated {
                id: elimination.eliminated.id,
                name: elimination.eliminated.name,
                role: elimination.eliminated.role,
                votes: elimination.votes,
                vote_breakdown: elimination.vote_breakdown,
                voting_details: elimination.voting_details,
            });
            let win = check_win(&self.state);
            if let Some(winner) = win.winner {
                self.finish(winner, win.reason);
                return;
            }
        }
        self.state.round += 1;
        self.state.clear_round_scoped();
        self.enter_phase(Phase::Night);
    }

    fn cast_persona_votes(&mut self) {
        let ballots = persona_ballots(&self.state, &mut self.rng);
        for ballot in &ballots {
            self.state.votes_mut().cast(&ballot.voter, &ballot.target);
        }
        self.state.ai_votes_cast = true;
        debug!(ballots = ballots.len(), "persona votes cast");
        self.events.push(GameEvent::AiVotesCast { votes: ballots });
    }

    fn finish(&mut self, winner: Winner, reason: String) {
        self.state.phase = Phase::GameOver;
        self.state.timer = None;
        self.winner = Some(winner);
        let survivors: Vec<RevealedParticipant> =
            self.state.alive().map(Participant::revealed).collect();
        let eliminated: Vec<RevealedParticipant> =
            self.state.eliminated().map(Participant::revealed).collect();
        info!(
            ?winner,
            round = self.state.round,
            survivors = survivors.len(),
            reason = %reason,
            "match over"
        );

        self.events.push(GameEvent::PhaseChange {
            phase: Phase::GameOver,
            round: self.state.round,
            time_remaining: 0,
        });
        self.events.push(GameEvent::GameOver {
            winner,
            reason,
            final_stats: FinalStats {
                rounds: self.state.round,
                survivors,
                eliminated,
            },
        });
        let results: Vec<GameEvent> = self
            .state
            .humans()
            .map(|human| GameEvent::PlayerResult {
                recipient: human.id.clone(),
                result: player_result(human.role, human.alive, winner),
            })
            .collect();
        self.events.extend(results);
    }

    fn expect_phase(&self, action: &'static str, expected: Phase) -> Result<(), SignalError> {
        if self.state.phase == expected {
            Ok(())
        } else {
            Err(SignalError::WrongPhase {
                action,
                expected,
                actual: self.state.phase,
            })
        }
    }

    fn acting_human(&self, id: &str, what: &'static str) -> Result<&Participant, SignalError> {
        let participant = self
            .state
            .participant(id)
            .ok_or_else(|| SignalError::UnknownParticipant(id.to_string()))?;
        if !participant.is_human() {
            return Err(SignalError::NotHuman(what));
        }
        if !participant.alive {
            return Err(SignalError::Eliminated(id.to_string()));
        }
        Ok(participant)
    }

    fn living_target(&self, id: &str) -> Result<(), SignalError> {
        match self.state.participant(id) {
            None => Err(SignalError::UnknownParticipant(id.to_string())),
            Some(target) if !target.alive => Err(SignalError::InvalidTarget {
                target: id.to_string(),
                reason: "target has been eliminated",
            }),
            Some(_) => Ok(()),
        }
    }
}
