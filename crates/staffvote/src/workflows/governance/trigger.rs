use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Utc};
use serde_json::json;
use tracing::{debug, info, warn};

use super::config::{CampaignPolicy, GovernanceConfig};
use super::directory::{DirectoryError, EmployeeDirectory};
use super::domain::{
    Campaign, CampaignId, CampaignKind, CampaignStatus, Candidate, CandidateId, CandidateStatus,
    EligibilityCriteria, Employee, EmployeeId, Position,
};
use super::fingerprint::VoterFingerprint;
use super::outbox::{NotificationChannel, NotificationOutbox};
use super::store::{GovernanceStore, StoreError};
use crate::workflows::attendance::store::{AttendanceError, AttendanceStore};
use crate::workflows::attendance::AttendanceAggregator;

/// Error enumeration for trigger sweeps.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Attendance(#[from] AttendanceError),
}

/// Summary of one trigger sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriggerReport {
    pub examined: usize,
    pub created: Vec<CampaignId>,
    pub skipped: usize,
}

static CAMPAIGN_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_campaign_id() -> CampaignId {
    let id = CAMPAIGN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    CampaignId(format!("camp-{id:06}"))
}

/// Evaluates tenure and attendance conditions and opens auto campaigns.
pub struct AutoTrigger<S, D, A> {
    store: Arc<S>,
    directory: Arc<D>,
    attendance: Arc<AttendanceAggregator<A>>,
    outbox: Arc<dyn NotificationOutbox>,
    config: GovernanceConfig,
}

impl<S, D, A> AutoTrigger<S, D, A>
where
    S: GovernanceStore + 'static,
    D: EmployeeDirectory + 'static,
    A: AttendanceStore + 'static,
{
    pub fn new(
        store: Arc<S>,
        directory: Arc<D>,
        attendance: Arc<AttendanceAggregator<A>>,
        outbox: Arc<dyn NotificationOutbox>,
        config: GovernanceConfig,
    ) -> Self {
        Self {
            store,
            directory,
            attendance,
            outbox,
            config,
        }
    }

    /// Open promotion campaigns for lowest-rank employees whose tenure has
    /// crossed the threshold. The store's open-campaign uniqueness backs the
    /// existence check, so concurrent sweeps cannot double-create.
    pub fn check_promotions(&self, now: DateTime<Utc>) -> Result<TriggerReport, TriggerError> {
        let mut report = TriggerReport::default();
        let mut selected: HashSet<EmployeeId> = HashSet::new();

        for employee in self.directory.active_at_position(Position::LOWEST)? {
            report.examined += 1;

            if employee.tenure_days(now) < self.config.required_tenure_days {
                report.skipped += 1;
                continue;
            }
            if !selected.insert(employee.id.clone()) {
                report.skipped += 1;
                continue;
            }
            if self
                .store
                .open_campaign_exists(&employee.id, CampaignKind::AutoPromotion)?
            {
                report.skipped += 1;
                continue;
            }
            if self.within_buffer(&employee.id, CampaignKind::AutoPromotion, now)? {
                debug!(employee = %employee.id.0, "promotion re-trigger still in buffer period");
                report.skipped += 1;
                continue;
            }

            match self.open_campaign(CampaignKind::AutoPromotion, &employee, now) {
                Ok(campaign) => {
                    self.announce(
                        NotificationChannel::Staff,
                        json!({
                            "event": "promotion_campaign_started",
                            "campaign_id": campaign.id.0,
                            "employee_id": employee.id.0,
                            "ends_at": campaign.ends_at,
                        }),
                    );
                    info!(campaign = %campaign.id.0, employee = %employee.id.0, "promotion campaign opened");
                    report.created.push(campaign.id);
                }
                Err(StoreError::DuplicateOpenCampaign { .. }) => {
                    // Lost the race to a concurrent sweep; nothing to do.
                    report.skipped += 1;
                }
                Err(error) => return Err(error.into()),
            }
        }

        Ok(report)
    }

    /// Open demotion campaigns for employees whose lateness crossed the
    /// punishment thresholds this period. Latches the statistics row so the
    /// same period cannot trigger twice.
    pub fn check_demotions(&self, now: DateTime<Utc>) -> Result<TriggerReport, TriggerError> {
        let date = now.date_naive();
        let (year, month) = (date.year(), date.month());

        let mut report = TriggerReport::default();
        let mut selected: HashSet<EmployeeId> = HashSet::new();

        for stats in self.attendance.punishment_candidates(year, month)? {
            report.examined += 1;

            let Some(employee) = self.directory.employee(&stats.employee_id)? else {
                warn!(employee = %stats.employee_id.0, "lateness stats for unknown employee");
                report.skipped += 1;
                continue;
            };
            if !employee.is_active() {
                report.skipped += 1;
                continue;
            }
            if employee.position.demoted().is_none() {
                debug!(employee = %employee.id.0, "already at lowest rank, cannot demote");
                report.skipped += 1;
                continue;
            }
            if !selected.insert(employee.id.clone()) {
                report.skipped += 1;
                continue;
            }
            if self
                .store
                .open_campaign_exists(&employee.id, CampaignKind::AutoDemotion)?
            {
                report.skipped += 1;
                continue;
            }
            if self.within_buffer(&employee.id, CampaignKind::AutoDemotion, now)? {
                report.skipped += 1;
                continue;
            }

            match self.open_campaign(CampaignKind::AutoDemotion, &employee, now) {
                Ok(campaign) => {
                    self.attendance
                        .mark_punishment_triggered(&employee.id, year, month)?;
                    self.announce(
                        NotificationChannel::Management,
                        json!({
                            "event": "demotion_campaign_started",
                            "campaign_id": campaign.id.0,
                            "employee_id": employee.id.0,
                            "late_count": stats.late_count,
                            "late_minutes_total": stats.late_minutes_total,
                            "ends_at": campaign.ends_at,
                        }),
                    );
                    info!(campaign = %campaign.id.0, employee = %employee.id.0, "demotion campaign opened");
                    report.created.push(campaign.id);
                }
                Err(StoreError::DuplicateOpenCampaign { .. }) => {
                    report.skipped += 1;
                }
                Err(error) => return Err(error.into()),
            }
        }

        Ok(report)
    }

    fn within_buffer(
        &self,
        employee: &EmployeeId,
        kind: CampaignKind,
        now: DateTime<Utc>,
    ) -> Result<bool, TriggerError> {
        let Some(failed) = self.store.latest_failed(employee, kind)? else {
            return Ok(false);
        };
        let reopen_at = failed.ends_at + Duration::days(failed.buffer_period_days);
        Ok(now < reopen_at)
    }

    fn open_campaign(
        &self,
        kind: CampaignKind,
        employee: &Employee,
        now: DateTime<Utc>,
    ) -> Result<Campaign, StoreError> {
        let policy = self.policy(kind);
        let id = next_campaign_id();

        let title = match kind {
            CampaignKind::AutoPromotion => {
                format!("Probation review: {}", employee.name)
            }
            CampaignKind::AutoDemotion => {
                format!("Attendance review: {}", employee.name)
            }
            CampaignKind::Manual => format!("Review: {}", employee.name),
        };

        let campaign = Campaign {
            id: id.clone(),
            kind,
            status: CampaignStatus::Active,
            title,
            starts_at: now,
            ends_at: now + policy.duration(),
            max_votes_per_voter: 1,
            pass_threshold: policy.pass_threshold,
            eligibility: EligibilityCriteria {
                allowed_positions: Position::ALL.to_vec(),
                min_tenure_days: self.config.voter_min_tenure_days,
                allowed_stores: None,
                excluded_employees: vec![employee.id.clone()],
            },
            trigger_employee: Some(employee.id.clone()),
            system_generated: true,
            priority: match kind {
                CampaignKind::AutoDemotion => 10,
                _ => 5,
            },
            can_modify_votes: true,
            max_modifications: self.config.max_modifications,
            buffer_period_days: self.config.buffer_period_days,
            created_at: now,
            total_votes: 0,
            total_voters: 0,
            results: None,
            outcome_executed_at: None,
        };

        let anonymous_id = format!(
            "anon-{}",
            &VoterFingerprint::derive(&employee.id, &id).0[..8]
        );
        let candidate = Candidate {
            id: CandidateId(format!("{}-cand-1", id.0)),
            campaign_id: id,
            employee_id: employee.id.clone(),
            anonymous_id,
            display_order: 1,
            status: CandidateStatus::Active,
            vote_count: 0,
            vote_percentage: 0.0,
        };

        self.store.create_campaign(campaign, vec![candidate])
    }

    fn policy(&self, kind: CampaignKind) -> CampaignPolicy {
        match kind {
            CampaignKind::AutoDemotion => self.config.demotion,
            _ => self.config.promotion,
        }
    }

    /// Best effort; a full outbox never unwinds the committed campaign.
    fn announce(&self, channel: NotificationChannel, payload: serde_json::Value) {
        if let Err(error) = self.outbox.enqueue(channel, payload) {
            warn!(%error, "failed to enqueue notification");
        }
    }
}
