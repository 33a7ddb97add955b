use tracing::{debug, info};

use crate::config::MatchConfig;
use crate::constants::get_mafia_count;
use crate::error::ConfigurationError;
use crate::match_state::Participant;
use crate::rng::RandomSource;
use crate::types::Role;

/// How many of each role a table of a given size is dealt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeckPlan {
    pub mafia: usize,
    pub doctor: usize,
    pub detective: usize,
    pub townsfolk: usize,
}

impl DeckPlan {
    pub fn total(&self) -> usize {
        self.mafia + self.doctor + self.detective + self.townsfolk
    }

    pub fn count(&self, role: Role) -> usize {
        match role {
            Role::Mafia => self.mafia,
            Role::Doctor => self.doctor,
            Role::Detective => self.detective,
            Role::Townsfolk => self.townsfolk,
        }
    }

    /// Unshuffled deck: mafia first, then doctor, detective, townsfolk.
    pub fn build(&self) -> Vec<Role> {
        let mut deck = Vec::with_capacity(self.total());
        for role in [Role::Mafia, Role::Doctor, Role::Detective, Role::Townsfolk] {
            deck.extend(std::iter::repeat_n(role, self.count(role)));
        }
        deck
    }
}

pub fn plan_deck(
    participant_count: usize,
    mafia_share: (usize, usize),
) -> Result<DeckPlan, ConfigurationError> {
    let mafia = get_mafia_count(participant_count, mafia_share);
    let innocents = participant_count.saturating_sub(mafia);
    // doctor and detective both need a seat among the innocents
    if mafia >= innocents || innocents < 2 {
        return Err(ConfigurationError::UnbalancedDeck {
            participants: participant_count,
            mafia,
            innocents,
        });
    }
    Ok(DeckPlan {
        mafia,
        doctor: 1,
        detective: 1,
        townsfolk: innocents - 2,
    })
}

/// Deals a freshly shuffled deck to `participants` in seat order and revives everyone.
///
/// Seat order is part of the contract: the human sits first and personas follow in
/// lobby order, so `deck[i]` lands on `participants[i]`.
pub fn assign_roles(
    participants: &mut [Participant],
    config: &MatchConfig,
    rng: &mut impl RandomSource,
) -> Result<DeckPlan, ConfigurationError> {
    let count = participants.len();
    if count < config.min_participants || count > config.max_participants {
        return Err(ConfigurationError::ParticipantCount {
            count,
            min: config.min_participants,
            max: config.max_participants,
        });
    }
    let plan = plan_deck(count, config.mafia_share)?;
    let mut deck = plan.build();
    rng.shuffle(&mut deck);

    for (participant, role) in participants.iter_mut().zip(deck) {
        participant.role = role;
        participant.alive = true;
        participant.votes = 0;
        debug!(participant = %participant.id, %role, "role dealt");
    }
    info!(
        participants = count,
        mafia = plan.mafia,
        townsfolk = plan.townsfolk,
        "roles assigned"
    );
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::personas::default_personas;
    use crate::rng::Rng;

    fn table() -> Vec<Participant> {
        let mut participants = vec![Participant::human("human_1", "Alex")];
        participants.extend(default_personas().iter().map(Participant::persona));
        participants
    }

    fn roles_of(participants: &[Participant]) -> Vec<Role> {
        participants.iter().map(|p| p.role).collect()
    }

    #[test]
    fn seven_seat_deck_is_two_one_one_three() {
        let plan = plan_deck(7, (2, 7)).expect("seven seats are playable");
        assert_eq!(
            plan.build(),
            vec![
                Role::Mafia,
                Role::Mafia,
                Role::Doctor,
                Role::Detective,
                Role::Townsfolk,
                Role::Townsfolk,
                Role::Townsfolk,
            ]
        );
    }

    #[test]
    fn assignment_is_a_permutation_of_the_deck_for_every_seed() {
        let config = MatchConfig::default();
        for seed in 1..=500u32 {
            let mut participants = table();
            let mut rng = Rng::new(seed);
            let plan = assign_roles(&mut participants, &config, &mut rng).expect("assign");
            let mut dealt = roles_of(&participants);
            dealt.sort();
            let mut expected = plan.build();
            expected.sort();
            assert_eq!(dealt, expected, "seed {seed}");
        }
    }

    #[test]
    fn same_seed_reproduces_the_same_assignment() {
        let config = MatchConfig::default();
        let mut first = table();
        let mut second = table();
        assign_roles(&mut first, &config, &mut Rng::new(2024)).expect("assign");
        assign_roles(&mut second, &config, &mut Rng::new(2024)).expect("assign");
        assert_eq!(roles_of(&first), roles_of(&second));
    }

    #[test]
    fn human_seat_is_not_always_dealt_the_same_role() {
        let config = MatchConfig::default();
        let mut human_roles = std::collections::HashSet::new();
        for seed in 1..=200u32 {
            let mut participants = table();
            assign_roles(&mut participants, &config, &mut Rng::new(seed)).expect("assign");
            human_roles.insert(participants[0].role);
        }
        assert_eq!(human_roles.len(), 4);
    }

    #[test]
    fn assignment_revives_and_clears_vote_counters() {
        let config = MatchConfig::default();
        let mut participants = table();
        participants[3].alive = false;
        participants[4].votes = 3;
        assign_roles(&mut participants, &config, &mut Rng::new(5)).expect("assign");
        assert!(participants.iter().all(|p| p.alive && p.votes == 0));
    }

    #[test]
    fn out_of_range_table_is_a_configuration_error() {
        let config = MatchConfig::default();
        let mut participants = table();
        participants.truncate(3);
        let result = assign_roles(&mut participants, &config, &mut Rng::new(1));
        assert_eq!(
            result,
            Err(ConfigurationError::ParticipantCount {
                count: 3,
                min: 4,
                max: 8,
            })
        );
        assert!(participants.iter().all(|p| p.role == Role::Townsfolk));
    }

    #[test]
    fn deck_scales_with_participant_count() {
        for count in 4..=12 {
            let plan = plan_deck(count, (2, 7)).expect("playable");
            assert_eq!(plan.total(), count);
            assert_eq!(plan.doctor, 1);
            assert_eq!(plan.detective, 1);
            assert!(plan.mafia < count - plan.mafia);
        }
    }
}
