pub const TICK_MS: u64 = 250;

pub const NIGHT_PHASE_MS: u64 = 10_000;
pub const DISCUSSION_PHASE_MS: u64 = 90_000;
pub const VOTING_PHASE_MS: u64 = 20_000;
pub const AI_VOTE_DELAY_MS: u64 = 2_000;

pub const MIN_PARTICIPANTS: usize = 4;
pub const MAX_PARTICIPANTS: usize = 8;

/// Two mafia for every seven seats, rounded to nearest.
pub const MAFIA_SHARE: (usize, usize) = (2, 7);

pub const HUMAN_ID: &str = "human_1";

pub fn get_mafia_count(participant_count: usize, share: (usize, usize)) -> usize {
    let (numerator, denominator) = share;
    if denominator == 0 {
        return 1;
    }
    ((participant_count * numerator + denominator / 2) / denominator).max(1)
}

pub fn whole_seconds(remaining_ms: u64) -> u64 {
    remaining_ms.div_ceil(1_000)
}
