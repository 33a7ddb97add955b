//! Public narrative for night results.
//!
//! A [`Narrator`] may supply richer text (for example from an external dialogue
//! service). Whenever it has nothing to say the built-in wording is used, so the
//! match never waits on or fails because of a narrator.

use crate::types::{RevealedParticipant, Role};

/// Facts a narrator is allowed to see. Only public outcomes are exposed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NightFacts {
    pub round: u32,
    pub eliminated: Option<RevealedParticipant>,
    pub protection_saved: bool,
    pub mafia_struck: bool,
}

pub trait Narrator: Send {
    fn night_summary(&self, facts: &NightFacts) -> Option<String>;
}

/// Narrator that always defers to the built-in text.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScriptedNarrator;

impl Narrator for ScriptedNarrator {
    fn night_summary(&self, _facts: &NightFacts) -> Option<String> {
        None
    }
}

pub fn default_night_summary(facts: &NightFacts) -> String {
    let mut narrative = format!("**Round {} - Night Results:**\n\n", facts.round);
    if let Some(eliminated) = &facts.eliminated {
        narrative.push_str(&format!(
            "{} was eliminated during the night! They were {}.\n",
            eliminated.name,
            with_article(eliminated.role)
        ));
    } else if facts.protection_saved {
        narrative.push_str("The mafia struck, but the doctor's protection saved a life!\n");
    } else if facts.mafia_struck {
        narrative.push_str("The mafia struck, yet everyone woke up unharmed.\n");
    } else {
        narrative.push_str("The night passed quietly.\n");
    }
    narrative
}

pub fn narrate_night(narrator: &dyn Narrator, facts: &NightFacts) -> String {
    narrator
        .night_summary(facts)
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| default_night_summary(facts))
}

fn with_article(role: Role) -> &'static str {
    match role {
        Role::Mafia => "a member of the mafia",
        Role::Doctor => "the doctor",
        Role::Detective => "the detective",
        Role::Townsfolk => "a townsperson",
    }
}
