use std::collections::BTreeMap;
use std::collections::HashSet;

use serde::Serialize;

use super::domain::{Campaign, Candidate, Vote, VoteDecision};

/// Recompute candidate and campaign aggregates from the raw vote set.
///
/// Stores call this inside the same critical section as a ballot write so
/// the cached `vote_count`/`vote_percentage` columns can never drift from
/// the votes that back them.
pub fn recompute_aggregates(campaign: &mut Campaign, candidates: &mut [Candidate], votes: &[Vote]) {
    let valid: Vec<&Vote> = votes.iter().filter(|vote| vote.is_valid).collect();
    let total = valid.len() as u32;

    for candidate in candidates.iter_mut() {
        let count = valid
            .iter()
            .filter(|vote| vote.candidate_id == candidate.id)
            .count() as u32;
        candidate.vote_count = count;
        candidate.vote_percentage = percentage(count, total);
    }

    let voters: HashSet<_> = valid.iter().map(|vote| &vote.fingerprint).collect();
    campaign.total_votes = total;
    campaign.total_voters = voters.len() as u32;
}

pub fn percentage(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        f64::from(part) / f64::from(whole) * 100.0
    }
}

/// Per-candidate tally line recomputed straight from votes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateTally {
    pub anonymous_id: String,
    pub display_order: u32,
    pub vote_count: u32,
    pub vote_percentage: f64,
    pub decisions: BTreeMap<&'static str, u32>,
}

/// Read-only campaign statistics answering operational queries.
///
/// Tallies here are always recomputed from the raw votes rather than the
/// cached candidate columns, so reporting can double as a drift check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignStats {
    pub campaign_id: String,
    pub kind: &'static str,
    pub status: &'static str,
    pub total_votes: u32,
    pub total_voters: u32,
    pub candidates: Vec<CandidateTally>,
    pub decisions: BTreeMap<&'static str, u32>,
    /// Non-fatal integrity findings, e.g. more distinct fingerprints than
    /// eligible voters.
    pub integrity_warnings: Vec<String>,
}

pub fn build_stats(
    campaign: &Campaign,
    candidates: &[Candidate],
    votes: &[Vote],
    eligible_voter_count: Option<usize>,
) -> CampaignStats {
    let valid: Vec<&Vote> = votes.iter().filter(|vote| vote.is_valid).collect();
    let total = valid.len() as u32;

    let mut overall: BTreeMap<&'static str, u32> = BTreeMap::new();
    for vote in &valid {
        *overall.entry(vote.current_decision.label()).or_default() += 1;
    }

    let mut lines: Vec<CandidateTally> = candidates
        .iter()
        .map(|candidate| {
            let mut decisions: BTreeMap<&'static str, u32> = BTreeMap::new();
            let mut count = 0u32;
            for vote in &valid {
                if vote.candidate_id == candidate.id {
                    count += 1;
                    *decisions.entry(vote.current_decision.label()).or_default() += 1;
                }
            }
            CandidateTally {
                anonymous_id: candidate.anonymous_id.clone(),
                display_order: candidate.display_order,
                vote_count: count,
                vote_percentage: percentage(count, total),
                decisions,
            }
        })
        .collect();
    lines.sort_by_key(|line| line.display_order);

    let fingerprints: HashSet<_> = valid.iter().map(|vote| &vote.fingerprint).collect();
    let mut integrity_warnings = Vec::new();
    if let Some(eligible) = eligible_voter_count {
        if fingerprints.len() > eligible {
            integrity_warnings.push(format!(
                "distinct voter fingerprints ({}) exceed eligible voters ({eligible})",
                fingerprints.len()
            ));
        }
    }

    CampaignStats {
        campaign_id: campaign.id.0.clone(),
        kind: campaign.kind.label(),
        status: campaign.status.label(),
        total_votes: total,
        total_voters: fingerprints.len() as u32,
        candidates: lines,
        decisions: overall,
        integrity_warnings,
    }
}

/// Count of votes currently agreeing, used by resolution.
pub fn agree_count(votes: &[Vote]) -> u32 {
    votes
        .iter()
        .filter(|vote| vote.is_valid && vote.current_decision == VoteDecision::Agree)
        .count() as u32
}
