/// A scripted seat at the table. The voice id is handed to the transport so the
/// external speech service can voice the persona; the core never calls it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersonaProfile {
    pub name: String,
    pub voice_id: String,
}

impl PersonaProfile {
    pub fn new(name: &str, voice_id: &str) -> Self {
        Self {
            name: name.to_string(),
            voice_id: voice_id.to_string(),
        }
    }

    pub fn participant_id(&self) -> String {
        persona_id(&self.name)
    }
}

pub fn persona_id(name: &str) -> String {
    let slug: String = name
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("persona_{slug}")
}

pub fn default_personas() -> Vec<PersonaProfile> {
    vec![
        PersonaProfile::new("Joey", "EXAVITQu4vr4xnSDxMaL"),
        PersonaProfile::new("Phoebe", "21m00Tcm4TlvDq8ikWAM"),
        PersonaProfile::new("Chandler", "pNInz6obpgDQGcFmaJgB"),
        PersonaProfile::new("Rachel", "ThT5KcBeYPX3keUQqHPh"),
        PersonaProfile::new("Ross", "yoZ06aMxZJJ28mfd3POQ"),
        PersonaProfile::new("Monica", "XB0fDUnXU5powFXDhCwa"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn default_roster_has_six_distinct_ids() {
        let ids: HashSet<String> = default_personas()
            .iter()
            .map(PersonaProfile::participant_id)
            .collect();
        assert_eq!(ids.len(), 6);
        assert!(ids.contains("persona_chandler"));
    }

    #[test]
    fn persona_id_slugifies_names() {
        assert_eq!(persona_id(" Mr. Heckles "), "persona_mr__heckles");
    }
}
