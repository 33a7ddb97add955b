use serde_json::{json, Value};

use crate::types::Phase;

pub const MAX_NAME_CHARS: usize = 16;
pub const MAX_PHASE_SECS: u64 = 600;

pub fn sanitize_name(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "Player".to_string();
    }
    trimmed.chars().take(MAX_NAME_CHARS).collect()
}

/// Phase length from a seconds setting, clamped to `1..=MAX_PHASE_SECS`.
pub fn phase_ms_from_secs(secs: u64) -> u64 {
    secs.clamp(1, MAX_PHASE_SECS) * 1_000
}

/// A skip without an explicit phase targets whatever is active.
pub fn skip_target(requested: Option<Phase>, active: Phase) -> Phase {
    requested.unwrap_or(active)
}

pub fn error_payload(message: &str) -> Value {
    json!({ "type": "error", "message": message })
}
