use serde_json::Value;

use crate::types::{Phase, Role};

#[derive(Debug, PartialEq)]
pub enum ParsedClientMessage {
    Join { name: String },
    StartGame,
    NightAction { role: Role, target: String },
    Vote { target: String },
    SkipRound { phase: Option<Phase> },
    RestartGame,
    GetVotingHistory,
    Ping { t: f64 },
}

/// Accepts both `snake_case` and the browser client's `kebab-case` type names.
pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?.replace('-', "_");

    match message_type.as_str() {
        "join" => {
            let name = object.get("name")?.as_str()?.to_string();
            Some(ParsedClientMessage::Join { name })
        }
        "start_game" => Some(ParsedClientMessage::StartGame),
        "night_action" => {
            let role = Role::parse(object.get("role")?.as_str()?)?;
            let target = parse_target(object.get("target"))?;
            Some(ParsedClientMessage::NightAction { role, target })
        }
        "vote" => {
            let target = parse_target(object.get("target"))?;
            Some(ParsedClientMessage::Vote { target })
        }
        "skip_round" => {
            let phase = match object.get("phase") {
                None => None,
                Some(value) => Some(Phase::parse(value.as_str()?)?),
            };
            Some(ParsedClientMessage::SkipRound { phase })
        }
        "restart_game" => Some(ParsedClientMessage::RestartGame),
        "get_voting_history" => Some(ParsedClientMessage::GetVotingHistory),
        "ping" => {
            let t = object.get("t")?.as_f64()?;
            if !t.is_finite() {
                return None;
            }
            Some(ParsedClientMessage::Ping { t })
        }
        _ => None,
    }
}

fn parse_target(value: Option<&Value>) -> Option<String> {
    let target = value?.as_str()?.trim();
    if target.is_empty() {
        return None;
    }
    Some(target.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_join_message() {
        let parsed = parse_client_message(r#"{"type":"join","name":"Alex"}"#);
        assert_eq!(
            parsed,
            Some(ParsedClientMessage::Join {
                name: "Alex".to_string()
            })
        );
    }

    #[test]
    fn parse_night_action_message() {
        let parsed = parse_client_message(
            r#"{"type":"night_action","role":"doctor","target":"persona_ross"}"#,
        );
        assert_eq!(
            parsed,
            Some(ParsedClientMessage::NightAction {
                role: Role::Doctor,
                target: "persona_ross".to_string(),
            })
        );
    }

    #[test]
    fn kebab_case_types_are_accepted() {
        assert_eq!(
            parse_client_message(r#"{"type":"restart-game"}"#),
            Some(ParsedClientMessage::RestartGame)
        );
        assert_eq!(
            parse_client_message(r#"{"type":"get-voting-history"}"#),
            Some(ParsedClientMessage::GetVotingHistory)
        );
    }

    #[test]
    fn night_action_rejects_unknown_role_and_blank_target() {
        assert!(parse_client_message(r#"{"type":"night_action","role":"sheriff","target":"x"}"#)
            .is_none());
        assert!(
            parse_client_message(r#"{"type":"night_action","role":"mafia","target":"  "}"#)
                .is_none()
        );
        assert!(parse_client_message(r#"{"type":"vote"}"#).is_none());
    }

    #[test]
    fn skip_round_phase_is_optional_but_must_be_known() {
        assert_eq!(
            parse_client_message(r#"{"type":"skip_round"}"#),
            Some(ParsedClientMessage::SkipRound { phase: None })
        );
        assert_eq!(
            parse_client_message(r#"{"type":"skip_round","phase":"voting"}"#),
            Some(ParsedClientMessage::SkipRound {
                phase: Some(Phase::Voting)
            })
        );
        assert!(parse_client_message(r#"{"type":"skip_round","phase":"dawn"}"#).is_none());
    }

    #[test]
    fn parse_ping_requires_finite_number() {
        let parsed = parse_client_message(r#"{"type":"ping","t":12.5}"#);
        assert!(matches!(parsed, Some(ParsedClientMessage::Ping { .. })));
        assert!(parse_client_message(r#"{"type":"ping","t":"soon"}"#).is_none());
    }

    #[test]
    fn garbage_is_ignored() {
        assert!(parse_client_message("not json").is_none());
        assert!(parse_client_message(r#"["join"]"#).is_none());
        assert!(parse_client_message(r#"{"type":"dance"}"#).is_none());
    }
}
