use crate::constants::{
    AI_VOTE_DELAY_MS, DISCUSSION_PHASE_MS, MAFIA_SHARE, MAX_PARTICIPANTS, MIN_PARTICIPANTS,
    NIGHT_PHASE_MS, VOTING_PHASE_MS,
};
use crate::error::ConfigurationError;
use crate::personas::{default_personas, PersonaProfile};
use crate::roles::plan_deck;
use crate::types::Phase;

/// What the AI detective may look at when choosing whom to investigate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DetectiveInsight {
    /// Peeks at the hidden role and leans toward real mafia.
    #[default]
    Omniscient,
    /// Only investigation memory and public voting history.
    PublicSignals,
}

impl DetectiveInsight {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "omniscient" => Some(Self::Omniscient),
            "public" | "public_signals" => Some(Self::PublicSignals),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MatchConfig {
    pub night_ms: u64,
    pub discussion_ms: u64,
    pub voting_ms: u64,
    pub ai_vote_delay_ms: u64,
    pub min_participants: usize,
    pub max_participants: usize,
    pub mafia_share: (usize, usize),
    pub detective_insight: DetectiveInsight,
    pub personas: Vec<PersonaProfile>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            night_ms: NIGHT_PHASE_MS,
            discussion_ms: DISCUSSION_PHASE_MS,
            voting_ms: VOTING_PHASE_MS,
            ai_vote_delay_ms: AI_VOTE_DELAY_MS,
            min_participants: MIN_PARTICIPANTS,
            max_participants: MAX_PARTICIPANTS,
            mafia_share: MAFIA_SHARE,
            detective_insight: DetectiveInsight::default(),
            personas: default_personas(),
        }
    }
}

impl MatchConfig {
    pub fn phase_duration_ms(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Night => self.night_ms,
            Phase::Discussion => self.discussion_ms,
            Phase::Voting => self.voting_ms,
            Phase::Lobby | Phase::GameOver => 0,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (field, value) in [
            ("night_ms", self.night_ms),
            ("discussion_ms", self.discussion_ms),
            ("voting_ms", self.voting_ms),
        ] {
            if value == 0 {
                return Err(ConfigurationError::InvalidValue {
                    field,
                    reason: "phase duration must be positive".to_string(),
                });
            }
        }
        if self.min_participants > self.max_participants {
            return Err(ConfigurationError::InvalidValue {
                field: "min_participants",
                reason: format!(
                    "minimum {} exceeds maximum {}",
                    self.min_participants, self.max_participants
                ),
            });
        }
        if self.mafia_share.0 == 0 || self.mafia_share.1 == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "mafia_share",
                reason: "share must be a positive ratio".to_string(),
            });
        }
        for count in self.min_participants..=self.max_participants {
            plan_deck(count, self.mafia_share)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = MatchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.personas.len(), 6);
        assert_eq!(config.phase_duration_ms(Phase::Night), 10_000);
        assert_eq!(config.phase_duration_ms(Phase::Lobby), 0);
    }

    #[test]
    fn zero_duration_is_rejected() {
        let config = MatchConfig {
            voting_ms: 0,
            ..MatchConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue {
                field: "voting_ms",
                ..
            })
        ));
    }

    #[test]
    fn inverted_participant_range_is_rejected() {
        let config = MatchConfig {
            min_participants: 9,
            max_participants: 8,
            ..MatchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn tiny_tables_cannot_host_a_balanced_deck() {
        let config = MatchConfig {
            min_participants: 2,
            ..MatchConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::UnbalancedDeck { participants: 2, .. })
        ));
    }

    #[test]
    fn detective_insight_parses_known_modes() {
        assert_eq!(
            DetectiveInsight::parse("omniscient"),
            Some(DetectiveInsight::Omniscient)
        );
        assert_eq!(
            DetectiveInsight::parse("public"),
            Some(DetectiveInsight::PublicSignals)
        );
        assert_eq!(DetectiveInsight::parse("psychic"), None);
    }
}
