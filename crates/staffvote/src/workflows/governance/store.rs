use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use super::domain::{
    Campaign, CampaignId, CampaignKind, CampaignResults, CampaignStatus, Candidate, EmployeeId,
    Vote, VoteId, VoteModification,
};
use super::stats::recompute_aggregates;

/// Error enumeration for campaign store failures.
///
/// `DuplicateFingerprint` and `DuplicateOpenCampaign` back the two hard
/// uniqueness invariants; they must come from inside the store's own
/// critical section, never from a read-then-check in the caller.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("campaign not found")]
    CampaignNotFound,
    #[error("candidate not found in campaign")]
    CandidateNotFound,
    #[error("vote not found")]
    VoteNotFound,
    #[error("a ballot with this fingerprint already exists for the campaign")]
    DuplicateFingerprint,
    #[error("ballot edit conflicts with a newer modification or exceeds the budget")]
    ModificationConflict,
    #[error("an open {kind} campaign already exists for employee {employee}")]
    DuplicateOpenCampaign { employee: String, kind: &'static str },
    #[error("campaign is already closed")]
    AlreadyClosed,
    #[error("illegal campaign status transition")]
    InvalidTransition,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence boundary for the voting engine.
///
/// Every transition touching more than one entity is a single trait call so
/// implementations can make it transactional: a ballot insert, its audit
/// record, and the aggregate recomputation commit together or not at all.
pub trait GovernanceStore: Send + Sync {
    /// Persist a campaign with its candidates. For auto campaigns the store
    /// rejects a second open campaign of the same kind for the same trigger
    /// employee.
    fn create_campaign(
        &self,
        campaign: Campaign,
        candidates: Vec<Candidate>,
    ) -> Result<Campaign, StoreError>;

    fn campaign(&self, id: &CampaignId) -> Result<Option<Campaign>, StoreError>;
    fn candidates(&self, id: &CampaignId) -> Result<Vec<Candidate>, StoreError>;
    fn votes(&self, id: &CampaignId) -> Result<Vec<Vote>, StoreError>;
    fn vote(&self, id: &VoteId) -> Result<Option<Vote>, StoreError>;
    fn modifications(&self, id: &VoteId) -> Result<Vec<VoteModification>, StoreError>;

    /// Insert a ballot and recompute cached aggregates atomically. Fails
    /// with `DuplicateFingerprint` when the (campaign, fingerprint) pair is
    /// taken.
    fn cast_ballot(&self, vote: Vote) -> Result<Vote, StoreError>;

    /// Apply a ballot edit: replace the vote row, append its audit record,
    /// and recompute aggregates atomically. The record's modification number
    /// must be exactly one past the stored count and within the campaign's
    /// budget; a stale writer gets `ModificationConflict`.
    fn modify_ballot(&self, vote: Vote, record: VoteModification) -> Result<(), StoreError>;

    /// Close an active campaign with final results. A campaign that is
    /// already closed returns `AlreadyClosed` and keeps its first results.
    fn close_campaign(
        &self,
        id: &CampaignId,
        results: CampaignResults,
    ) -> Result<Campaign, StoreError>;

    fn mark_outcome_executed(&self, id: &CampaignId, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Campaigns still marked active whose voting window has ended.
    fn expired_active(&self, now: DateTime<Utc>) -> Result<Vec<Campaign>, StoreError>;

    /// Closed, passed campaigns whose position change has not been written
    /// to the registry yet.
    fn passed_unexecuted(&self) -> Result<Vec<Campaign>, StoreError>;

    fn open_campaign_exists(
        &self,
        employee: &EmployeeId,
        kind: CampaignKind,
    ) -> Result<bool, StoreError>;

    /// Most recently ended closed-and-failed campaign for an employee/kind,
    /// used for buffer-period checks.
    fn latest_failed(
        &self,
        employee: &EmployeeId,
        kind: CampaignKind,
    ) -> Result<Option<Campaign>, StoreError>;

    fn open_campaigns(&self) -> Result<Vec<Campaign>, StoreError>;
}

#[derive(Default)]
struct StoreInner {
    campaigns: HashMap<CampaignId, Campaign>,
    candidates: HashMap<CampaignId, Vec<Candidate>>,
    votes: HashMap<CampaignId, Vec<Vote>>,
    modifications: HashMap<VoteId, Vec<VoteModification>>,
}

/// Mutex-backed store. The single lock makes every trait call a serialized
/// transaction, which is exactly the atomicity the trait demands.
#[derive(Default, Clone)]
pub struct InMemoryGovernanceStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl InMemoryGovernanceStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        self.inner.lock().expect("governance store mutex poisoned")
    }
}

impl GovernanceStore for InMemoryGovernanceStore {
    fn create_campaign(
        &self,
        campaign: Campaign,
        candidates: Vec<Candidate>,
    ) -> Result<Campaign, StoreError> {
        let mut inner = self.lock();

        if let (true, Some(employee)) = (campaign.kind.is_auto(), &campaign.trigger_employee) {
            let duplicate = inner.campaigns.values().any(|existing| {
                existing.kind == campaign.kind
                    && existing.status.is_open()
                    && existing.trigger_employee.as_ref() == Some(employee)
            });
            if duplicate {
                return Err(StoreError::DuplicateOpenCampaign {
                    employee: employee.0.clone(),
                    kind: campaign.kind.label(),
                });
            }
        }

        inner
            .candidates
            .insert(campaign.id.clone(), candidates);
        inner.votes.insert(campaign.id.clone(), Vec::new());
        inner.campaigns.insert(campaign.id.clone(), campaign.clone());
        Ok(campaign)
    }

    fn campaign(&self, id: &CampaignId) -> Result<Option<Campaign>, StoreError> {
        Ok(self.lock().campaigns.get(id).cloned())
    }

    fn candidates(&self, id: &CampaignId) -> Result<Vec<Candidate>, StoreError> {
        Ok(self.lock().candidates.get(id).cloned().unwrap_or_default())
    }

    fn votes(&self, id: &CampaignId) -> Result<Vec<Vote>, StoreError> {
        Ok(self.lock().votes.get(id).cloned().unwrap_or_default())
    }

    fn vote(&self, id: &VoteId) -> Result<Option<Vote>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .votes
            .values()
            .flatten()
            .find(|vote| &vote.id == id)
            .cloned())
    }

    fn modifications(&self, id: &VoteId) -> Result<Vec<VoteModification>, StoreError> {
        Ok(self
            .lock()
            .modifications
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    fn cast_ballot(&self, vote: Vote) -> Result<Vote, StoreError> {
        let mut inner = self.lock();

        if !inner.campaigns.contains_key(&vote.campaign_id) {
            return Err(StoreError::CampaignNotFound);
        }
        let has_candidate = inner
            .candidates
            .get(&vote.campaign_id)
            .is_some_and(|list| list.iter().any(|c| c.id == vote.candidate_id));
        if !has_candidate {
            return Err(StoreError::CandidateNotFound);
        }

        let votes = inner.votes.entry(vote.campaign_id.clone()).or_default();
        if votes.iter().any(|existing| existing.fingerprint == vote.fingerprint) {
            return Err(StoreError::DuplicateFingerprint);
        }
        votes.push(vote.clone());

        refresh_aggregates(&mut inner, &vote.campaign_id)?;
        Ok(vote)
    }

    fn modify_ballot(&self, vote: Vote, record: VoteModification) -> Result<(), StoreError> {
        let mut inner = self.lock();

        let max_modifications = inner
            .campaigns
            .get(&vote.campaign_id)
            .ok_or(StoreError::CampaignNotFound)?
            .max_modifications;

        let votes = inner
            .votes
            .get_mut(&vote.campaign_id)
            .ok_or(StoreError::CampaignNotFound)?;
        let slot = votes
            .iter_mut()
            .find(|existing| existing.id == vote.id)
            .ok_or(StoreError::VoteNotFound)?;

        // Two writers built from the same read must not both land: the audit
        // trail stays gap-free and the budget is charged for every edit.
        if record.modification_number != slot.modification_count + 1
            || record.modification_number > max_modifications
        {
            return Err(StoreError::ModificationConflict);
        }
        *slot = vote.clone();

        inner
            .modifications
            .entry(vote.id.clone())
            .or_default()
            .push(record);

        refresh_aggregates(&mut inner, &vote.campaign_id)?;
        Ok(())
    }

    fn close_campaign(
        &self,
        id: &CampaignId,
        results: CampaignResults,
    ) -> Result<Campaign, StoreError> {
        let mut inner = self.lock();
        let campaign = inner
            .campaigns
            .get_mut(id)
            .ok_or(StoreError::CampaignNotFound)?;

        match campaign.status {
            CampaignStatus::Closed => Err(StoreError::AlreadyClosed),
            status if status.can_transition_to(CampaignStatus::Closed) => {
                campaign.status = CampaignStatus::Closed;
                campaign.results = Some(results);
                Ok(campaign.clone())
            }
            _ => Err(StoreError::InvalidTransition),
        }
    }

    fn mark_outcome_executed(&self, id: &CampaignId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let campaign = inner
            .campaigns
            .get_mut(id)
            .ok_or(StoreError::CampaignNotFound)?;
        if campaign.outcome_executed_at.is_none() {
            campaign.outcome_executed_at = Some(at);
        }
        Ok(())
    }

    fn expired_active(&self, now: DateTime<Utc>) -> Result<Vec<Campaign>, StoreError> {
        let inner = self.lock();
        let mut expired: Vec<Campaign> = inner
            .campaigns
            .values()
            .filter(|campaign| campaign.status == CampaignStatus::Active && campaign.is_expired(now))
            .cloned()
            .collect();
        expired.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.ends_at.cmp(&b.ends_at)));
        Ok(expired)
    }

    fn passed_unexecuted(&self) -> Result<Vec<Campaign>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .campaigns
            .values()
            .filter(|campaign| {
                campaign.status == CampaignStatus::Closed
                    && campaign.outcome_executed_at.is_none()
                    && campaign.trigger_employee.is_some()
                    && campaign
                        .results
                        .as_ref()
                        .is_some_and(|results| results.passed)
            })
            .cloned()
            .collect())
    }

    fn open_campaign_exists(
        &self,
        employee: &EmployeeId,
        kind: CampaignKind,
    ) -> Result<bool, StoreError> {
        let inner = self.lock();
        Ok(inner.campaigns.values().any(|campaign| {
            campaign.kind == kind
                && campaign.status.is_open()
                && campaign.trigger_employee.as_ref() == Some(employee)
        }))
    }

    fn latest_failed(
        &self,
        employee: &EmployeeId,
        kind: CampaignKind,
    ) -> Result<Option<Campaign>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .campaigns
            .values()
            .filter(|campaign| {
                campaign.kind == kind
                    && campaign.status == CampaignStatus::Closed
                    && campaign.trigger_employee.as_ref() == Some(employee)
                    && campaign
                        .results
                        .as_ref()
                        .is_some_and(|results| !results.passed)
            })
            .max_by_key(|campaign| campaign.ends_at)
            .cloned())
    }

    fn open_campaigns(&self) -> Result<Vec<Campaign>, StoreError> {
        let inner = self.lock();
        let mut open: Vec<Campaign> = inner
            .campaigns
            .values()
            .filter(|campaign| campaign.status.is_open())
            .cloned()
            .collect();
        open.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.ends_at.cmp(&b.ends_at)));
        Ok(open)
    }
}

fn refresh_aggregates(inner: &mut StoreInner, campaign_id: &CampaignId) -> Result<(), StoreError> {
    let votes = inner.votes.get(campaign_id).cloned().unwrap_or_default();
    let campaign = inner
        .campaigns
        .get_mut(campaign_id)
        .ok_or(StoreError::CampaignNotFound)?;
    let candidates = inner.candidates.entry(campaign_id.clone()).or_default();
    recompute_aggregates(campaign, candidates, &votes);
    Ok(())
}
