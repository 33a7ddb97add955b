use tracing::{debug, info};

use crate::config::DetectiveInsight;
use crate::match_state::{MatchState, Participant};
use crate::narration::{narrate_night, NightFacts, Narrator};
use crate::rng::RandomSource;
use crate::strategy::{select_detective_target, select_doctor_target, select_mafia_target};
use crate::types::{Investigation, PrivateNightInfo, RevealedParticipant, Role};
use crate::win::{check_win, WinCheck};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrivateNotice {
    pub recipient: String,
    pub info: PrivateNightInfo,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NightOutcome {
    pub round: u32,
    pub narrative: String,
    pub eliminated: Option<RevealedParticipant>,
    pub protection_saved: bool,
    pub mafia_target: Option<String>,
    pub doctor_save: Option<String>,
    pub detective_check: Option<String>,
    pub private: Vec<PrivateNotice>,
    pub win: WinCheck,
}

/// Who chose a night target: the human seat, or the persona strategy.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Choice {
    actor_id: String,
    target_id: String,
    by_human: bool,
}

/// Settles the night: kill, protection, investigation, then the win check.
///
/// Per role, a human submission beats the persona strategy; a role with neither a
/// submission nor a living persona holder simply does nothing this night.
pub fn resolve_night(
    state: &mut MatchState,
    insight: DetectiveInsight,
    narrator: &dyn Narrator,
    rng: &mut impl RandomSource,
) -> NightOutcome {
    let round = state.round;
    let kill = choose_kill(state, rng);
    let save = choose_save(state, rng);
    let check = choose_check(state, insight, rng);

    state.mafia_target = kill.as_ref().map(|c| c.target_id.clone());
    state.doctor_save = save.as_ref().map(|c| c.target_id.clone());
    state.detective_check = check.as_ref().map(|c| c.target_id.clone());

    let mut private = Vec::new();
    if let Some(kill) = &kill {
        private.extend(mafia_notices(state, kill));
    }

    // the investigation reads the role before anyone dies tonight
    let investigated = check.as_ref().and_then(|check| {
        let target = state.participant(&check.target_id)?;
        Some((check.clone(), target.display_name().to_string(), target.role.is_mafia()))
    });
    if let Some((check, target_name, is_mafia)) = &investigated {
        state.record_investigation(Investigation {
            round,
            detective_id: check.actor_id.clone(),
            target_id: check.target_id.clone(),
            is_mafia: *is_mafia,
        });
        if check.by_human {
            let verdict = if *is_mafia { "MAFIA" } else { "INNOCENT" };
            private.push(PrivateNotice {
                recipient: check.actor_id.clone(),
                info: PrivateNightInfo::Detective {
                    message: format!("Investigation Result: {target_name} is {verdict}"),
                    target: check.target_id.clone(),
                    is_mafia: *is_mafia,
                },
            });
        }
    }

    let protection_saved = matches!(
        (&state.mafia_target, &state.doctor_save),
        (Some(target), Some(save)) if target == save
    );
    let eliminated = match state.mafia_target.clone() {
        Some(target) if !protection_saved => state.eliminate(&target),
        _ => None,
    };

    if let Some(save) = save.as_ref().filter(|c| c.by_human) {
        let target_name = name_of(state, &save.target_id);
        let mut message = format!("You protected {target_name}");
        if protection_saved {
            message.push_str(" - Your protection was successful!");
        }
        private.push(PrivateNotice {
            recipient: save.actor_id.clone(),
            info: PrivateNightInfo::Doctor {
                message,
                target: save.target_id.clone(),
                successful: protection_saved,
            },
        });
    }

    state.clear_night_actions();
    state.refresh_alive();

    let narrative = narrate_night(
        narrator,
        &NightFacts {
            round,
            eliminated: eliminated.clone(),
            protection_saved,
            mafia_struck: kill.is_some(),
        },
    );
    let win = check_win(state);
    info!(
        round,
        eliminated = eliminated.as_ref().map(|e| e.id.as_str()),
        protection_saved,
        winner = ?win.winner,
        "night resolved"
    );

    NightOutcome {
        round,
        narrative,
        eliminated,
        protection_saved,
        mafia_target: state.mafia_target.clone(),
        doctor_save: state.doctor_save.clone(),
        detective_check: state.detective_check.clone(),
        private,
        win,
    }
}

fn choose_kill(state: &MatchState, rng: &mut impl RandomSource) -> Option<Choice> {
    if let Some(action) = state.submitted_action(Role::Mafia) {
        if is_valid_kill_target(state, &action.target_id) {
            return Some(Choice {
                actor_id: action.actor_id.clone(),
                target_id: action.target_id.clone(),
                by_human: true,
            });
        }
    }
    let actor = state.alive_persona_with_role(Role::Mafia)?;
    let candidates: Vec<&Participant> = state.alive().filter(|p| !p.role.is_mafia()).collect();
    let target = select_mafia_target(&candidates, state.round, state, rng)?;
    debug!(actor = %actor.id, chosen = %target.id, "persona mafia chose a target");
    Some(Choice {
        actor_id: actor.id.clone(),
        target_id: target.id.clone(),
        by_human: false,
    })
}

fn choose_save(state: &MatchState, rng: &mut impl RandomSource) -> Option<Choice> {
    if let Some(action) = state.submitted_action(Role::Doctor) {
        if state.is_alive(&action.target_id) {
            return Some(Choice {
                actor_id: action.actor_id.clone(),
                target_id: action.target_id.clone(),
                by_human: true,
            });
        }
    }
    let actor = state.alive_persona_with_role(Role::Doctor)?;
    let candidates: Vec<&Participant> = state.alive().collect();
    let target = select_doctor_target(&candidates, state.round, rng)?;
    debug!(actor = %actor.id, chosen = %target.id, "persona doctor chose a target");
    Some(Choice {
        actor_id: actor.id.clone(),
        target_id: target.id.clone(),
        by_human: false,
    })
}

fn choose_check(
    state: &MatchState,
    insight: DetectiveInsight,
    rng: &mut impl RandomSource,
) -> Option<Choice> {
    if let Some(action) = state.submitted_action(Role::Detective) {
        if state.is_alive(&action.target_id) {
            return Some(Choice {
                actor_id: action.actor_id.clone(),
                target_id: action.target_id.clone(),
                by_human: true,
            });
        }
    }
    let actor = state.alive_persona_with_role(Role::Detective)?;
    let candidates: Vec<&Participant> = state.alive().filter(|p| p.id != actor.id).collect();
    let target = select_detective_target(&candidates, state.round, state, insight, rng)?;
    debug!(actor = %actor.id, chosen = %target.id, "persona detective chose a target");
    Some(Choice {
        actor_id: actor.id.clone(),
        target_id: target.id.clone(),
        by_human: false,
    })
}

pub fn is_valid_kill_target(state: &MatchState, target_id: &str) -> bool {
    state
        .participant(target_id)
        .is_some_and(|p| p.alive && !p.role.is_mafia())
}

/// Coordination note for every human mafia member, sent only while a persona
/// partner is still alive to coordinate with.
fn mafia_notices(state: &MatchState, kill: &Choice) -> Vec<PrivateNotice> {
    let Some(partner) = state.alive_persona_with_role(Role::Mafia) else {
        return Vec::new();
    };
    let target_name = name_of(state, &kill.target_id);
    state
        .alive()
        .filter(|p| p.is_human() && p.role.is_mafia())
        .map(|human| {
            let message = if kill.by_human {
                format!(
                    "Your partner {} agreed with your target choice: {target_name}",
                    partner.display_name()
                )
            } else {
                format!(
                    "Your partner {} chose tonight's target: {target_name}",
                    partner.display_name()
                )
            };
            PrivateNotice {
                recipient: human.id.clone(),
                info: PrivateNightInfo::Mafia {
                    message,
                    partner_name: partner.display_name().to_string(),
                    target: kill.target_id.clone(),
                    target_agreed: kill.by_human,
                },
            }
        })
        .collect()
}

fn name_of(state: &MatchState, id: &str) -> String {
    state
        .participant(id)
        .map(|p| p.display_name().to_string())
        .unwrap_or_else(|| id.to_string())
}
