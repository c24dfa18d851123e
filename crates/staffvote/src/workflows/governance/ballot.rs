use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::directory::{DirectoryError, EmployeeDirectory};
use super::domain::{
    Campaign, CampaignId, CampaignStatus, CandidateId, EmployeeId, Vote, VoteDecision, VoteId,
    VoteModification,
};
use super::eligibility::{check_eligibility, EligibilityRejection};
use super::fingerprint::VoterFingerprint;
use super::stats::{build_stats, CampaignStats};
use super::store::{GovernanceStore, StoreError};

/// Enumerable rejection reasons for the ballot protocol. These are expected
/// business outcomes, distinct from store or registry failures.
#[derive(Debug, thiserror::Error)]
pub enum BallotError {
    #[error("campaign not found")]
    CampaignNotFound,
    #[error("candidate not found in campaign")]
    CandidateNotFound,
    #[error("vote not found")]
    VoteNotFound,
    #[error("voter is not a known employee")]
    VoterUnknown,
    #[error("campaign is not accepting votes")]
    CampaignNotActive,
    #[error("this voter has already cast a ballot in the campaign")]
    AlreadyVoted,
    #[error("voter is not eligible: {0}")]
    NotEligible(#[source] EligibilityRejection),
    #[error("vote does not belong to this voter")]
    NotVoteOwner,
    #[error("this campaign does not allow ballot modification")]
    ModificationsDisabled,
    #[error("modification limit reached")]
    ModificationLimitReached,
    #[error("ballot was changed by a concurrent edit; re-read and retry")]
    ModificationConflict,
    #[error(transparent)]
    Store(StoreError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl From<StoreError> for BallotError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::DuplicateFingerprint => BallotError::AlreadyVoted,
            StoreError::ModificationConflict => BallotError::ModificationConflict,
            StoreError::CampaignNotFound => BallotError::CampaignNotFound,
            StoreError::CandidateNotFound => BallotError::CandidateNotFound,
            StoreError::VoteNotFound => BallotError::VoteNotFound,
            other => BallotError::Store(other),
        }
    }
}

static VOTE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_vote_id() -> VoteId {
    let id = VOTE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    VoteId(format!("vote-{id:06}"))
}

/// Service implementing the anonymous ballot protocol over the campaign
/// store: cast, bounded modification, and recomputed statistics.
pub struct BallotService<S, D> {
    store: Arc<S>,
    directory: Arc<D>,
}

impl<S, D> BallotService<S, D>
where
    S: GovernanceStore + 'static,
    D: EmployeeDirectory + 'static,
{
    pub fn new(store: Arc<S>, directory: Arc<D>) -> Self {
        Self { store, directory }
    }

    /// Cast a ballot. The duplicate check rides on the store's fingerprint
    /// uniqueness, so two racing casts can never both land.
    pub fn cast_vote(
        &self,
        campaign_id: &CampaignId,
        candidate_id: &CandidateId,
        employee_id: &EmployeeId,
        decision: VoteDecision,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Vote, BallotError> {
        let campaign = self
            .store
            .campaign(campaign_id)?
            .ok_or(BallotError::CampaignNotFound)?;

        if campaign.status != CampaignStatus::Active || !campaign.voting_window_contains(now) {
            return Err(BallotError::CampaignNotActive);
        }

        let employee = self
            .directory
            .employee(employee_id)?
            .ok_or(BallotError::VoterUnknown)?;
        check_eligibility(&employee, &campaign.eligibility, now)
            .map_err(BallotError::NotEligible)?;

        let fingerprint = VoterFingerprint::derive(employee_id, campaign_id);
        let vote = Vote {
            id: next_vote_id(),
            campaign_id: campaign_id.clone(),
            candidate_id: candidate_id.clone(),
            fingerprint,
            original_decision: decision,
            current_decision: decision,
            modification_count: 0,
            is_valid: true,
            reason,
            voted_at: now,
            last_modified_at: None,
        };

        let stored = self.store.cast_ballot(vote)?;
        debug!(campaign = %campaign_id.0, "ballot accepted");
        Ok(stored)
    }

    /// Change an existing ballot's decision, within the campaign's
    /// modification budget and voting window. Appends an audit record.
    pub fn modify_vote(
        &self,
        vote_id: &VoteId,
        employee_id: &EmployeeId,
        new_decision: VoteDecision,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Vote, BallotError> {
        let vote = self
            .store
            .vote(vote_id)?
            .ok_or(BallotError::VoteNotFound)?;

        let expected = VoterFingerprint::derive(employee_id, &vote.campaign_id);
        if vote.fingerprint != expected {
            return Err(BallotError::NotVoteOwner);
        }

        let campaign = self
            .store
            .campaign(&vote.campaign_id)?
            .ok_or(BallotError::CampaignNotFound)?;

        if !campaign.can_modify_votes {
            return Err(BallotError::ModificationsDisabled);
        }
        if campaign.status != CampaignStatus::Active || !campaign.voting_window_contains(now) {
            return Err(BallotError::CampaignNotActive);
        }
        if vote.modification_count >= campaign.max_modifications {
            return Err(BallotError::ModificationLimitReached);
        }

        let record = VoteModification {
            id: format!("{}-mod-{}", vote.id.0, vote.modification_count + 1),
            vote_id: vote.id.clone(),
            modification_number: vote.modification_count + 1,
            old_decision: vote.current_decision,
            new_decision,
            reason,
            recorded_at: now,
        };

        let mut updated = vote;
        updated.current_decision = new_decision;
        updated.modification_count += 1;
        updated.last_modified_at = Some(now);

        self.store.modify_ballot(updated.clone(), record)?;
        debug!(vote = %updated.id.0, "ballot modified");
        Ok(updated)
    }

    /// Read-only statistics, recomputed from the raw votes. Surfaces an
    /// integrity warning rather than failing when the fingerprint count
    /// exceeds the eligible roster.
    pub fn campaign_stats(
        &self,
        campaign_id: &CampaignId,
        now: DateTime<Utc>,
    ) -> Result<CampaignStats, BallotError> {
        let campaign = self
            .store
            .campaign(campaign_id)?
            .ok_or(BallotError::CampaignNotFound)?;
        let candidates = self.store.candidates(campaign_id)?;
        let votes = self.store.votes(campaign_id)?;
        let eligible = self.eligible_voter_count(&campaign, now)?;
        Ok(build_stats(&campaign, &candidates, &votes, eligible))
    }

    /// Roster size satisfying the campaign's criteria, if it can be
    /// enumerated (requires a position allow-list).
    fn eligible_voter_count(
        &self,
        campaign: &Campaign,
        now: DateTime<Utc>,
    ) -> Result<Option<usize>, BallotError> {
        if campaign.eligibility.allowed_positions.is_empty() {
            return Ok(None);
        }
        let mut count = 0;
        for position in &campaign.eligibility.allowed_positions {
            for employee in self.directory.active_at_position(*position)? {
                if check_eligibility(&employee, &campaign.eligibility, now).is_ok() {
                    count += 1;
                }
            }
        }
        Ok(Some(count))
    }
}
