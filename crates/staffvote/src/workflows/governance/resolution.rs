use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{error, info, warn};

use super::directory::{DirectoryError, EmployeeDirectory};
use super::domain::{Campaign, CampaignId, CampaignKind, CampaignResults, Position};
use super::outbox::{NotificationChannel, NotificationOutbox};
use super::stats::{agree_count, percentage};
use super::store::{GovernanceStore, StoreError};

/// Error enumeration for resolution sweeps.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Summary of one resolution sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolutionReport {
    pub closed: Vec<CampaignId>,
    pub passed: usize,
    pub failed: usize,
    pub executed: usize,
}

/// Closes expired campaigns, computes outcomes, and applies position
/// changes to the employee registry.
pub struct ResolutionEngine<S, D> {
    store: Arc<S>,
    directory: Arc<D>,
    outbox: Arc<dyn NotificationOutbox>,
}

impl<S, D> ResolutionEngine<S, D>
where
    S: GovernanceStore + 'static,
    D: EmployeeDirectory + 'static,
{
    pub fn new(store: Arc<S>, directory: Arc<D>, outbox: Arc<dyn NotificationOutbox>) -> Self {
        Self {
            store,
            directory,
            outbox,
        }
    }

    /// Close every active campaign whose window has ended. Selecting on
    /// status=active makes a re-run over an already-closed campaign a no-op,
    /// and the store refuses a second close outright.
    pub fn process_expired(&self, now: DateTime<Utc>) -> Result<ResolutionReport, ResolutionError> {
        let mut report = ResolutionReport::default();

        for campaign in self.store.expired_active(now)? {
            let votes = self.store.votes(&campaign.id)?;
            let total_votes = votes.iter().filter(|vote| vote.is_valid).count() as u32;
            let agree_votes = agree_count(&votes);
            let agree_percentage = percentage(agree_votes, total_votes);
            let passed = total_votes > 0 && agree_percentage >= campaign.pass_threshold;

            let results = CampaignResults {
                total_votes,
                agree_votes,
                agree_percentage,
                passed,
                processed_at: now,
            };

            let closed = match self.store.close_campaign(&campaign.id, results) {
                Ok(closed) => closed,
                Err(StoreError::AlreadyClosed) => continue,
                Err(other) => return Err(other.into()),
            };

            info!(
                campaign = %closed.id.0,
                passed,
                agree_percentage,
                "campaign closed"
            );
            if passed {
                report.passed += 1;
                if self.execute_outcome(&closed, now)? {
                    report.executed += 1;
                }
            } else {
                report.failed += 1;
                self.announce_outcome(&closed, false, None);
            }
            report.closed.push(closed.id);
        }

        Ok(report)
    }

    /// Retry position changes for passed campaigns whose registry write
    /// failed earlier. Run hourly by the orchestrator.
    pub fn sweep_unexecuted(&self, now: DateTime<Utc>) -> Result<usize, ResolutionError> {
        let mut executed = 0;
        for campaign in self.store.passed_unexecuted()? {
            if self.execute_outcome(&campaign, now)? {
                executed += 1;
            }
        }
        Ok(executed)
    }

    /// Apply the position change for a passed campaign. Returns false when
    /// the registry write could not be performed; the campaign stays in the
    /// unexecuted set for the retry sweep.
    fn execute_outcome(
        &self,
        campaign: &Campaign,
        now: DateTime<Utc>,
    ) -> Result<bool, ResolutionError> {
        let Some(employee_id) = &campaign.trigger_employee else {
            self.announce_outcome(campaign, true, None);
            self.store.mark_outcome_executed(&campaign.id, now)?;
            return Ok(true);
        };

        let Some(employee) = self.directory.employee(employee_id)? else {
            warn!(employee = %employee_id.0, "trigger employee vanished from registry");
            self.store.mark_outcome_executed(&campaign.id, now)?;
            return Ok(true);
        };

        // The target is derived from the employee's rank at execution time,
        // so a re-run can never apply the same change twice.
        let target = match campaign.kind {
            CampaignKind::AutoPromotion | CampaignKind::Manual => employee.position.promoted(),
            CampaignKind::AutoDemotion => employee.position.demoted(),
        };

        let Some(target) = target else {
            warn!(
                employee = %employee_id.0,
                position = employee.position.label(),
                "no neighboring rank; position change skipped"
            );
            self.store.mark_outcome_executed(&campaign.id, now)?;
            self.announce_outcome(campaign, true, None);
            return Ok(true);
        };

        match self.directory.update_position(employee_id, target) {
            Ok(()) => {
                self.store.mark_outcome_executed(&campaign.id, now)?;
                info!(
                    employee = %employee_id.0,
                    from = employee.position.label(),
                    to = target.label(),
                    "position change executed"
                );
                self.announce_outcome(campaign, true, Some(target));
                Ok(true)
            }
            Err(error) => {
                error!(employee = %employee_id.0, %error, "registry write failed; will retry");
                Ok(false)
            }
        }
    }

    fn announce_outcome(&self, campaign: &Campaign, passed: bool, new_position: Option<Position>) {
        let payload = json!({
            "event": "campaign_resolved",
            "campaign_id": campaign.id.0,
            "kind": campaign.kind.label(),
            "passed": passed,
            "employee_id": campaign.trigger_employee.as_ref().map(|id| id.0.clone()),
            "new_position": new_position.map(Position::label),
        });
        if let Err(error) = self.outbox.enqueue(NotificationChannel::Management, payload) {
            warn!(%error, "failed to enqueue outcome notification");
        }
    }
}
