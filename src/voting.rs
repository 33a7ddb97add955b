use tracing::info;

use crate::match_state::MatchState;
use crate::rng::RandomSource;
use crate::types::{RevealedParticipant, VoteCast, VoteCount, VotingHistoryEntry};

/// Ballots for the current voting phase, one per voter, in first-cast order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VoteBook {
    ballots: Vec<VoteCast>,
}

impl VoteBook {
    /// Records a ballot; a voter who votes again replaces their earlier choice.
    pub fn cast(&mut self, voter: &str, target: &str) {
        if let Some(existing) = self.ballots.iter_mut().find(|b| b.voter == voter) {
            existing.target = target.to_string();
            return;
        }
        self.ballots.push(VoteCast {
            voter: voter.to_string(),
            target: target.to_string(),
        });
    }

    pub fn target_of(&self, voter: &str) -> Option<&str> {
        self.ballots
            .iter()
            .find(|b| b.voter == voter)
            .map(|b| b.target.as_str())
    }

    pub fn len(&self) -> usize {
        self.ballots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ballots.is_empty()
    }

    pub fn ballots(&self) -> &[VoteCast] {
        &self.ballots
    }

    pub fn clear(&mut self) {
        self.ballots.clear();
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tally {
    pub counts: Vec<VoteCount>,
    pub max_votes: usize,
    pub leaders: Vec<String>,
}

impl Tally {
    pub fn total(&self) -> usize {
        self.counts.iter().map(|c| c.votes).sum()
    }

    /// The sole leader, or a uniformly random one of the tied leaders.
    pub fn choose(&self, rng: &mut impl RandomSource) -> Option<String> {
        match self.leaders.len() {
            0 => None,
            1 => self.leaders.first().cloned(),
            _ => rng.pick(&self.leaders).cloned(),
        }
    }
}

pub fn tally(book: &VoteBook) -> Tally {
    let mut counts: Vec<VoteCount> = Vec::new();
    for ballot in book.ballots() {
        match counts.iter_mut().find(|c| c.target == ballot.target) {
            Some(count) => count.votes += 1,
            None => counts.push(VoteCount {
                target: ballot.target.clone(),
                votes: 1,
            }),
        }
    }
    let max_votes = counts.iter().map(|c| c.votes).max().unwrap_or(0);
    let leaders = counts
        .iter()
        .filter(|c| max_votes > 0 && c.votes == max_votes)
        .map(|c| c.target.clone())
        .collect();
    Tally {
        counts,
        max_votes,
        leaders,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Elimination {
    pub eliminated: RevealedParticipant,
    pub votes: usize,
    pub vote_breakdown: Vec<VoteCount>,
    pub voting_details: Vec<VoteCast>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteOutcome {
    pub tally: Tally,
    pub elimination: Option<Elimination>,
}

/// Counts the vote book, removes the leader and appends a history entry.
///
/// With no ballots nothing happens beyond the empty tally; the caller still moves
/// on to the next round.
pub fn resolve_votes(
    state: &mut MatchState,
    rng: &mut impl RandomSource,
    timestamp: &str,
) -> VoteOutcome {
    let tally = tally(state.votes());
    for participant in state.participants_mut() {
        participant.votes = tally
            .counts
            .iter()
            .find(|c| c.target == participant.id)
            .map_or(0, |c| c.votes as u32);
    }

    let Some(selected) = tally.choose(rng) else {
        info!(round = state.round, "no votes cast");
        return VoteOutcome {
            tally,
            elimination: None,
        };
    };
    let Some(eliminated) = state.eliminate(&selected) else {
        return VoteOutcome {
            tally,
            elimination: None,
        };
    };

    let voting_details = state.votes().ballots().to_vec();
    state.push_voting_history(VotingHistoryEntry {
        round: state.round,
        timestamp: timestamp.to_string(),
        eliminated_id: eliminated.id.clone(),
        eliminated_name: eliminated.name.clone(),
        eliminated_role: eliminated.role,
        vote_breakdown: tally.counts.clone(),
        voting_details: voting_details.clone(),
    });
    info!(
        round = state.round,
        eliminated = %eliminated.id,
        role = %eliminated.role,
        votes = tally.max_votes,
        tied = tally.leaders.len() > 1,
        "voted out"
    );

    let elimination = Elimination {
        eliminated,
        votes: tally.max_votes,
        vote_breakdown: tally.counts.clone(),
        voting_details,
    };
    VoteOutcome {
        tally,
        elimination: Some(elimination),
    }
}
