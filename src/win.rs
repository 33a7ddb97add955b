use crate::match_state::MatchState;
use crate::types::{PlayerOutcome, PlayerResult, Role, Winner};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WinCheck {
    pub winner: Option<Winner>,
    pub reason: String,
}

impl WinCheck {
    pub fn is_decided(&self) -> bool {
        self.winner.is_some()
    }
}

/// Innocents win once no mafia is alive; mafia win as soon as they are no longer
/// outnumbered by the living innocents.
pub fn check_win(state: &MatchState) -> WinCheck {
    let mafia = state.alive_mafia_count();
    let innocents = state.alive_innocent_count();
    if mafia == 0 {
        return WinCheck {
            winner: Some(Winner::Innocents),
            reason: "All mafia members have been eliminated!".to_string(),
        };
    }
    if mafia >= innocents {
        return WinCheck {
            winner: Some(Winner::Mafia),
            reason: "The mafia now controls the town!".to_string(),
        };
    }
    WinCheck {
        winner: None,
        reason: format!("{mafia} mafia remain among {innocents} innocents"),
    }
}

pub fn player_result(role: Role, survived: bool, winner: Winner) -> PlayerResult {
    let won = role.faction() == winner;
    let (title, personal_message, role_message) = match (role, won) {
        (Role::Mafia, true) => (
            "MAFIA VICTORY!",
            if survived {
                "You and your partner took control of the town!"
            } else {
                "You were eliminated, but your partner completed the mission!"
            },
            "The mafia won by outlasting the town.",
        ),
        (Role::Mafia, false) => (
            "MAFIA DEFEATED",
            "The town discovered the mafia and eliminated every member.",
            "The townspeople identified and eliminated all mafia members.",
        ),
        (Role::Detective, true) => (
            "DETECTIVE VICTORY!",
            if survived {
                "Your investigations helped the town root out the mafia!"
            } else {
                "Your investigative work carried the town even after your fall!"
            },
            "Your detective skills were crucial in identifying the mafia.",
        ),
        (Role::Detective, false) => (
            "DETECTIVE DEFEATED",
            "Your investigations weren't enough to save the town.",
            "Despite your efforts to uncover the truth, the mafia prevailed.",
        ),
        (Role::Doctor, true) => (
            "DOCTOR VICTORY!",
            if survived {
                "Your protection saved lives and helped defeat the mafia!"
            } else {
                "Your care kept the town going long enough to win!"
            },
            "Your healing was vital in protecting innocent lives.",
        ),
        (Role::Doctor, false) => (
            "DOCTOR DEFEATED",
            "You couldn't save enough lives to protect the town.",
            "The mafia's attacks outpaced your protection.",
        ),
        (Role::Townsfolk, true) => (
            "TOWNSPERSON VICTORY!",
            if survived {
                "You helped the town identify and eliminate the mafia!"
            } else {
                "Your sacrifice helped the town win!"
            },
            "The townspeople working together defeated the mafia.",
        ),
        (Role::Townsfolk, false) => (
            "TOWNSPERSON DEFEATED",
            "The mafia has taken control of the town.",
            "The mafia deceived and eliminated enough townspeople to win.",
        ),
    };
    PlayerResult {
        outcome: if won {
            PlayerOutcome::Victory
        } else {
            PlayerOutcome::Defeat
        },
        title: title.to_string(),
        personal_message: personal_message.to_string(),
        role_message: role_message.to_string(),
        role,
        survived,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_state::test_support::{id_with_role, state_with_roles};

    const SEVEN: [Role; 7] = [
        Role::Townsfolk,
        Role::Mafia,
        Role::Detective,
        Role::Townsfolk,
        Role::Mafia,
        Role::Doctor,
        Role::Townsfolk,
    ];

    #[test]
    fn fresh_table_continues() {
        let state = state_with_roles(&SEVEN);
        let check = check_win(&state);
        assert_eq!(check.winner, None);
        assert!(!check.is_decided());
    }

    #[test]
    fn no_living_mafia_means_innocents_win() {
        let mut state = state_with_roles(&SEVEN);
        state.eliminate(&id_with_role(&state, Role::Mafia, 0));
        assert_eq!(check_win(&state).winner, None);
        state.eliminate(&id_with_role(&state, Role::Mafia, 1));
        assert_eq!(check_win(&state).winner, Some(Winner::Innocents));
    }

    #[test]
    fn parity_hands_the_game_to_the_mafia() {
        let mut state = state_with_roles(&SEVEN);
        state.eliminate(&id_with_role(&state, Role::Townsfolk, 0));
        state.eliminate(&id_with_role(&state, Role::Townsfolk, 1));
        // 2 mafia vs 3 innocents
        assert_eq!(check_win(&state).winner, None);
        state.eliminate(&id_with_role(&state, Role::Doctor, 0));
        // 2 vs 2
        assert_eq!(check_win(&state).winner, Some(Winner::Mafia));
    }

    #[test]
    fn win_check_agrees_with_counts_for_every_elimination_order() {
        let ids: Vec<String> = state_with_roles(&SEVEN)
            .participants()
            .iter()
            .map(|p| p.id.clone())
            .collect();
        for start in 0..ids.len() {
            let mut state = state_with_roles(&SEVEN);
            for offset in 0..ids.len() {
                let id = &ids[(start + offset) % ids.len()];
                state.eliminate(id);
                let mafia = state.alive_mafia_count();
                let innocents = state.alive_innocent_count();
                assert_eq!(mafia + innocents, state.alive_count());
                let expected = if mafia == 0 {
                    Some(Winner::Innocents)
                } else if mafia >= innocents {
                    Some(Winner::Mafia)
                } else {
                    None
                };
                assert_eq!(check_win(&state).winner, expected);
            }
        }
    }

    #[test]
    fn player_result_follows_faction() {
        let result = player_result(Role::Doctor, false, Winner::Innocents);
        assert_eq!(result.outcome, PlayerOutcome::Victory);
        assert!(!result.survived);

        let result = player_result(Role::Mafia, true, Winner::Innocents);
        assert_eq!(result.outcome, PlayerOutcome::Defeat);
        assert_eq!(result.title, "MAFIA DEFEATED");
    }
}
