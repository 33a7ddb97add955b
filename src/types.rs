use std::fmt;

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Mafia,
    Doctor,
    Detective,
    Townsfolk,
}

impl Role {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "mafia" => Some(Self::Mafia),
            "doctor" => Some(Self::Doctor),
            "detective" => Some(Self::Detective),
            "townsfolk" => Some(Self::Townsfolk),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mafia => "mafia",
            Self::Doctor => "doctor",
            Self::Detective => "detective",
            Self::Townsfolk => "townsfolk",
        }
    }

    pub fn is_mafia(self) -> bool {
        self == Self::Mafia
    }

    pub fn has_night_action(self) -> bool {
        self != Self::Townsfolk
    }

    pub fn faction(self) -> Winner {
        if self.is_mafia() {
            Winner::Mafia
        } else {
            Winner::Innocents
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Lobby,
    Night,
    Discussion,
    Voting,
    GameOver,
}

impl Phase {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "lobby" => Some(Self::Lobby),
            "night" => Some(Self::Night),
            "discussion" => Some(Self::Discussion),
            "voting" => Some(Self::Voting),
            "gameOver" => Some(Self::GameOver),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lobby => "lobby",
            Self::Night => "night",
            Self::Discussion => "discussion",
            Self::Voting => "voting",
            Self::GameOver => "gameOver",
        }
    }

    pub fn is_timed(self) -> bool {
        matches!(self, Self::Night | Self::Discussion | Self::Voting)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Mafia,
    Innocents,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerOutcome {
    Victory,
    Defeat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantKind {
    Human,
    Persona,
}

/// Public view of a seat; never carries the hidden role.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParticipantView {
    pub id: String,
    pub name: String,
    pub kind: ParticipantKind,
    #[serde(rename = "isAlive")]
    pub alive: bool,
    #[serde(rename = "voiceId", skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
}

/// A seat whose role has become public (eliminated, or at game over).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RevealedParticipant {
    pub id: String,
    pub name: String,
    pub role: Role,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VoteCast {
    pub voter: String,
    pub target: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VoteCount {
    pub target: String,
    pub votes: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VotingHistoryEntry {
    pub round: u32,
    pub timestamp: String,
    #[serde(rename = "eliminatedId")]
    pub eliminated_id: String,
    #[serde(rename = "eliminatedPlayer")]
    pub eliminated_name: String,
    #[serde(rename = "eliminatedRole")]
    pub eliminated_role: Role,
    #[serde(rename = "voteBreakdown")]
    pub vote_breakdown: Vec<VoteCount>,
    #[serde(rename = "votingDetails")]
    pub voting_details: Vec<VoteCast>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Investigation {
    pub round: u32,
    #[serde(rename = "detectiveId")]
    pub detective_id: String,
    #[serde(rename = "targetId")]
    pub target_id: String,
    #[serde(rename = "isMafia")]
    pub is_mafia: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum PrivateNightInfo {
    Mafia {
        message: String,
        #[serde(rename = "partnerName")]
        partner_name: String,
        target: String,
        #[serde(rename = "targetAgreed")]
        target_agreed: bool,
    },
    Doctor {
        message: String,
        target: String,
        successful: bool,
    },
    Detective {
        message: String,
        target: String,
        #[serde(rename = "isMafia")]
        is_mafia: bool,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FinalStats {
    pub rounds: u32,
    pub survivors: Vec<RevealedParticipant>,
    pub eliminated: Vec<RevealedParticipant>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlayerResult {
    pub outcome: PlayerOutcome,
    pub title: String,
    #[serde(rename = "personalMessage")]
    pub personal_message: String,
    #[serde(rename = "roleMessage")]
    pub role_message: String,
    #[serde(rename = "playerRole")]
    pub role: Role,
    #[serde(rename = "playerSurvived")]
    pub survived: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct GameSnapshot {
    pub phase: Phase,
    pub round: u32,
    #[serde(rename = "timeRemaining")]
    pub time_remaining: u64,
    #[serde(rename = "alivePlayers")]
    pub alive_players: Vec<ParticipantView>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum GameEvent {
    PhaseChange {
        phase: Phase,
        round: u32,
        #[serde(rename = "timeRemaining")]
        time_remaining: u64,
    },
    TimerUpdate {
        phase: Phase,
        #[serde(rename = "timeRemaining")]
        time_remaining: u64,
    },
    RoleAssigned {
        recipient: String,
        role: Role,
        #[serde(rename = "mafiaPartners")]
        mafia_partners: Vec<String>,
    },
    NightActionConfirmed {
        recipient: String,
        role: Role,
        target: String,
    },
    NightResults {
        round: u32,
        narrative: String,
        eliminated: Option<RevealedParticipant>,
    },
    PrivateNightInfo {
        recipient: String,
        info: PrivateNightInfo,
    },
    VoteCast {
        voter: String,
        target: String,
    },
    AiVotesCast {
        votes: Vec<VoteCast>,
    },
    PlayerEliminated {
        id: String,
        name: String,
        role: Role,
        votes: usize,
        #[serde(rename = "voteBreakdown")]
        vote_breakdown: Vec<VoteCount>,
        #[serde(rename = "votingDetails")]
        voting_details: Vec<VoteCast>,
    },
    PhaseSkipped {
        #[serde(rename = "skippedBy")]
        skipped_by: String,
        phase: Phase,
    },
    GameOver {
        winner: Winner,
        reason: String,
        #[serde(rename = "finalStats")]
        final_stats: FinalStats,
    },
    PlayerResult {
        recipient: String,
        result: PlayerResult,
    },
    GameRestarted {
        phase: Phase,
        round: u32,
        #[serde(rename = "aliveCount")]
        alive_count: usize,
    },
}

impl GameEvent {
    /// Participant a private event is addressed to; `None` for broadcasts.
    pub fn recipient(&self) -> Option<&str> {
        match self {
            Self::RoleAssigned { recipient, .. }
            | Self::NightActionConfirmed { recipient, .. }
            | Self::PrivateNightInfo { recipient, .. }
            | Self::PlayerResult { recipient, .. } => Some(recipient),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_serializes_with_camel_case_game_over() {
        let value = serde_json::to_value(Phase::GameOver).expect("serialize phase");
        assert_eq!(value, serde_json::json!("gameOver"));
        assert_eq!(Phase::parse("gameOver"), Some(Phase::GameOver));
        assert_eq!(Phase::parse("day"), None);
    }

    #[test]
    fn role_parse_round_trips_through_as_str() {
        for role in [Role::Mafia, Role::Doctor, Role::Detective, Role::Townsfolk] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("werewolf"), None);
    }

    #[test]
    fn events_are_tagged_with_kebab_case_type() {
        let event = GameEvent::PhaseChange {
            phase: Phase::Night,
            round: 1,
            time_remaining: 10,
        };
        let value = serde_json::to_value(&event).expect("serialize event");
        assert_eq!(value["type"], "phase-change");
        assert_eq!(value["phase"], "night");
        assert_eq!(value["timeRemaining"], 10);
    }

    #[test]
    fn private_events_expose_recipient() {
        let event = GameEvent::PrivateNightInfo {
            recipient: "human_1".to_string(),
            info: PrivateNightInfo::Doctor {
                message: "You protected Joey".to_string(),
                target: "persona_joey".to_string(),
                successful: false,
            },
        };
        assert_eq!(event.recipient(), Some("human_1"));
        let value = serde_json::to_value(&event).expect("serialize event");
        assert_eq!(value["info"]["role"], "doctor");

        let public = GameEvent::VoteCast {
            voter: "a".to_string(),
            target: "b".to_string(),
        };
        assert_eq!(public.recipient(), None);
    }

    #[test]
    fn only_townsfolk_lack_a_night_action() {
        assert!(Role::Mafia.has_night_action());
        assert!(Role::Doctor.has_night_action());
        assert!(Role::Detective.has_night_action());
        assert!(!Role::Townsfolk.has_night_action());
        assert_eq!(Role::Doctor.faction(), Winner::Innocents);
    }
}
