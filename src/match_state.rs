use std::collections::BTreeMap;

use crate::personas::PersonaProfile;
use crate::types::{
    Investigation, ParticipantKind, ParticipantView, Phase, RevealedParticipant, Role,
    VotingHistoryEntry,
};
use crate::voting::VoteBook;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub kind: ParticipantKind,
    pub role: Role,
    pub alive: bool,
    pub votes: u32,
    pub voice_id: Option<String>,
}

impl Participant {
    pub fn human(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: ParticipantKind::Human,
            role: Role::Townsfolk,
            alive: true,
            votes: 0,
            voice_id: None,
        }
    }

    pub fn persona(profile: &PersonaProfile) -> Self {
        Self {
            id: profile.participant_id(),
            name: profile.name.clone(),
            kind: ParticipantKind::Persona,
            role: Role::Townsfolk,
            alive: true,
            votes: 0,
            voice_id: Some(profile.voice_id.clone()),
        }
    }

    pub fn display_name(&self) -> &str {
        &self.name
    }

    pub fn is_human(&self) -> bool {
        self.kind == ParticipantKind::Human
    }

    pub fn is_persona(&self) -> bool {
        self.kind == ParticipantKind::Persona
    }

    pub fn view(&self) -> ParticipantView {
        ParticipantView {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: self.kind,
            alive: self.alive,
            voice_id: self.voice_id.clone(),
        }
    }

    pub fn revealed(&self) -> RevealedParticipant {
        RevealedParticipant {
            id: self.id.clone(),
            name: self.name.clone(),
            role: self.role,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NightAction {
    pub role: Role,
    pub actor_id: String,
    pub target_id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseTimer {
    pub phase: Phase,
    pub remaining_ms: u64,
    pub elapsed_ms: u64,
}

impl PhaseTimer {
    pub fn new(phase: Phase, duration_ms: u64) -> Self {
        Self {
            phase,
            remaining_ms: duration_ms,
            elapsed_ms: 0,
        }
    }
}

/// Everything a single match knows. Owned by the phase controller; the resolution
/// engines borrow it for one synchronous call each.
#[derive(Clone, Debug)]
pub struct MatchState {
    pub phase: Phase,
    pub round: u32,
    pub mafia_target: Option<String>,
    pub doctor_save: Option<String>,
    pub detective_check: Option<String>,
    pub timer: Option<PhaseTimer>,
    pub ai_votes_cast: bool,

    participants: Vec<Participant>,
    alive_cache: Vec<usize>,
    eliminated: Vec<String>,
    night_actions: BTreeMap<String, NightAction>,
    votes: VoteBook,
    voting_history: Vec<VotingHistoryEntry>,
    investigations: Vec<Investigation>,
}

impl MatchState {
    pub fn new(participants: Vec<Participant>) -> Self {
        let mut state = Self {
            phase: Phase::Lobby,
            round: 0,
            mafia_target: None,
            doctor_save: None,
            detective_check: None,
            timer: None,
            ai_votes_cast: false,
            participants,
            alive_cache: Vec::new(),
            eliminated: Vec::new(),
            night_actions: BTreeMap::new(),
            votes: VoteBook::default(),
            voting_history: Vec::new(),
            investigations: Vec::new(),
        };
        state.refresh_alive();
        state
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub(crate) fn participants_mut(&mut self) -> &mut [Participant] {
        &mut self.participants
    }

    /// Seats `participant` at `seat`, shifting later seats back.
    pub(crate) fn insert_participant(&mut self, seat: usize, participant: Participant) {
        let seat = seat.min(self.participants.len());
        self.participants.insert(seat, participant);
        self.refresh_alive();
    }

    pub fn participant(&self, id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub(crate) fn participant_mut(&mut self, id: &str) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.id == id)
    }

    pub fn humans(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| p.is_human())
    }

    /// Recomputes the alive projection from the participants' own flags.
    pub(crate) fn refresh_alive(&mut self) {
        self.alive_cache = self
            .participants
            .iter()
            .enumerate()
            .filter(|(_, p)| p.alive)
            .map(|(idx, _)| idx)
            .collect();
    }

    pub fn alive(&self) -> impl Iterator<Item = &Participant> {
        self.alive_cache
            .iter()
            .filter_map(|&idx| self.participants.get(idx))
    }

    pub fn alive_count(&self) -> usize {
        self.alive_cache.len()
    }

    pub fn alive_mafia_count(&self) -> usize {
        self.alive().filter(|p| p.role.is_mafia()).count()
    }

    pub fn alive_innocent_count(&self) -> usize {
        self.alive().filter(|p| !p.role.is_mafia()).count()
    }

    pub fn is_alive(&self, id: &str) -> bool {
        self.participant(id).is_some_and(|p| p.alive)
    }

    pub fn alive_persona_with_role(&self, role: Role) -> Option<&Participant> {
        self.alive().find(|p| p.is_persona() && p.role == role)
    }

    /// Marks `id` dead and appends it to the elimination log.
    pub(crate) fn eliminate(&mut self, id: &str) -> Option<RevealedParticipant> {
        let participant = self.participants.iter_mut().find(|p| p.id == id && p.alive)?;
        participant.alive = false;
        let revealed = participant.revealed();
        self.eliminated.push(revealed.id.clone());
        self.refresh_alive();
        Some(revealed)
    }

    pub fn eliminated_ids(&self) -> &[String] {
        &self.eliminated
    }

    pub fn eliminated(&self) -> impl Iterator<Item = &Participant> {
        self.eliminated.iter().filter_map(|id| self.participant(id))
    }

    pub fn night_actions(&self) -> impl Iterator<Item = &NightAction> {
        self.night_actions.values()
    }

    pub(crate) fn record_night_action(&mut self, action: NightAction) {
        self.night_actions.insert(action.actor_id.clone(), action);
    }

    /// The human-submitted action for `role` this round, if its actor still holds it.
    pub fn submitted_action(&self, role: Role) -> Option<&NightAction> {
        self.night_actions.values().find(|action| {
            action.role == role
                && self
                    .participant(&action.actor_id)
                    .is_some_and(|actor| actor.alive && actor.role == role)
        })
    }

    pub(crate) fn clear_night_actions(&mut self) {
        self.night_actions.clear();
    }

    pub fn votes(&self) -> &VoteBook {
        &self.votes
    }

    pub(crate) fn votes_mut(&mut self) -> &mut VoteBook {
        &mut self.votes
    }

    pub fn voting_history(&self) -> &[VotingHistoryEntry] {
        &self.voting_history
    }

    pub(crate) fn push_voting_history(&mut self, entry: VotingHistoryEntry) {
        self.voting_history.push(entry);
    }

    pub fn investigations(&self) -> &[Investigation] {
        &self.investigations
    }

    pub(crate) fn record_investigation(&mut self, investigation: Investigation) {
        self.investigations.push(investigation);
    }

    /// Drops everything scoped to the round that just ended.
    pub(crate) fn clear_round_scoped(&mut self) {
        self.mafia_target = None;
        self.doctor_save = None;
        self.detective_check = None;
        self.night_actions.clear();
        self.votes.clear();
        self.ai_votes_cast = false;
        for participant in &mut self.participants {
            participant.votes = 0;
        }
    }

    /// Back to the lobby: everyone alive, every role the default, all logs emptied.
    pub(crate) fn reset(&mut self) {
        self.phase = Phase::Lobby;
        self.round = 0;
        self.timer = None;
        self.clear_round_scoped();
        self.eliminated.clear();
        self.voting_history.clear();
        self.investigations.clear();
        for participant in &mut self.participants {
            participant.alive = true;
            participant.role = Role::Townsfolk;
            participant.votes = 0;
        }
        self.refresh_alive();
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::constants::HUMAN_ID;
    use crate::personas::default_personas;

    /// Human first, then the six default personas, with roles in the given order.
    pub(crate) fn state_with_roles(roles: &[Role]) -> MatchState {
        let mut participants = vec![Participant::human(HUMAN_ID, "Alex")];
        participants.extend(default_personas().iter().map(Participant::persona));
        participants.truncate(roles.len());
        for (participant, role) in participants.iter_mut().zip(roles) {
            participant.role = *role;
        }
        let mut state = MatchState::new(participants);
        state.phase = Phase::Night;
        state.round = 1;
        state
    }

    pub(crate) fn id_with_role(state: &MatchState, role: Role, nth: usize) -> String {
        state
            .participants()
            .iter()
            .filter(|p| p.role == role)
            .nth(nth)
            .map(|p| p.id.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::state_with_roles;
    use super::*;

    const SEVEN: [Role; 7] = [
        Role::Townsfolk,
        Role::Mafia,
        Role::Detective,
        Role::Townsfolk,
        Role::Mafia,
        Role::Doctor,
        Role::Townsfolk,
    ];

    fn cache_matches_flags(state: &MatchState) -> bool {
        let cached: Vec<&str> = state.alive().map(|p| p.id.as_str()).collect();
        let projected: Vec<&str> = state
            .participants()
            .iter()
            .filter(|p| p.alive)
            .map(|p| p.id.as_str())
            .collect();
        cached == projected
    }

    #[test]
    fn eliminate_updates_cache_and_log_in_order() {
        let mut state = state_with_roles(&SEVEN);
        let first = state.eliminate("persona_joey").expect("joey alive");
        assert_eq!(first.role, Role::Mafia);
        state.eliminate("human_1").expect("human alive");
        assert_eq!(state.eliminated_ids(), ["persona_joey", "human_1"]);
        assert_eq!(state.alive_count(), 5);
        assert!(cache_matches_flags(&state));
        assert_eq!(
            state.alive_mafia_count() + state.alive_innocent_count(),
            state.alive_count()
        );
    }

    #[test]
    fn eliminating_twice_is_a_no_op() {
        let mut state = state_with_roles(&SEVEN);
        assert!(state.eliminate("persona_ross").is_some());
        assert!(state.eliminate("persona_ross").is_none());
        assert!(state.eliminate("nobody").is_none());
        assert_eq!(state.eliminated_ids().len(), 1);
    }

    #[test]
    fn submitted_action_ignores_actors_who_lost_the_role() {
        let mut state = state_with_roles(&SEVEN);
        state.record_night_action(NightAction {
            role: Role::Mafia,
            actor_id: "human_1".to_string(),
            target_id: "persona_ross".to_string(),
        });
        assert!(state.submitted_action(Role::Mafia).is_none());
    }

    #[test]
    fn reset_restores_lobby_defaults() {
        let mut state = state_with_roles(&SEVEN);
        state.round = 3;
        state.mafia_target = Some("persona_ross".to_string());
        state.eliminate("persona_ross");
        state.reset();
        assert_eq!(state.phase, Phase::Lobby);
        assert_eq!(state.round, 0);
        assert!(state.participants().iter().all(|p| p.alive));
        assert!(state
            .participants()
            .iter()
            .all(|p| p.role == Role::Townsfolk));
        assert!(state.eliminated_ids().is_empty());
        assert!(state.mafia_target.is_none());
        assert!(cache_matches_flags(&state));
    }
}
