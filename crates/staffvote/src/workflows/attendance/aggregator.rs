use std::sync::{Arc, Mutex};

use chrono::{DateTime, Datelike, Utc};
use tracing::{debug, info};

use super::domain::{AttendanceStatistics, ClockStatus, LateEvent};
use super::store::{AttendanceError, AttendanceStore};
use crate::workflows::governance::config::GovernanceConfig;
use crate::workflows::governance::domain::EmployeeId;

/// What became of an ingested attendance event.
#[derive(Debug, Clone, PartialEq)]
pub enum LateEventOutcome {
    /// Counted; `punishment_due` is true when the row now exceeds a
    /// threshold and has not latched yet.
    Recorded { punishment_due: bool },
    /// Same `event_ref` seen before; nothing changed.
    Duplicate,
    /// Event was not a late arrival; ignored.
    NotLate,
}

/// What a period rollover did, when one happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodRollover {
    pub reset_rows: usize,
    pub pruned_rows: usize,
}

/// Maintains per-employee monthly lateness counters and decides when the
/// punishment condition is met.
pub struct AttendanceAggregator<A> {
    store: Arc<A>,
    config: GovernanceConfig,
    last_period: Mutex<Option<(i32, u32)>>,
}

impl<A> AttendanceAggregator<A>
where
    A: AttendanceStore + 'static,
{
    pub fn new(store: Arc<A>, config: GovernanceConfig) -> Self {
        Self {
            store,
            config,
            last_period: Mutex::new(None),
        }
    }

    /// Ingest one attendance event. Threshold evaluation happens here, after
    /// every event, so punishment can fire mid-period.
    pub fn record_late_event(&self, event: &LateEvent) -> Result<LateEventOutcome, AttendanceError> {
        if event.status != ClockStatus::Late {
            return Ok(LateEventOutcome::NotLate);
        }

        let (year, month) = event.period();
        let applied = self.store.apply_late_event(event, year, month)?;
        if applied.duplicate {
            debug!(event_ref = %event.event_ref, "duplicate late event ignored");
            return Ok(LateEventOutcome::Duplicate);
        }

        let punishment_due = self.punishment_due(&applied.stats);
        Ok(LateEventOutcome::Recorded { punishment_due })
    }

    /// Whether a row currently satisfies the punishment condition and is
    /// still unlatched.
    pub fn punishment_due(&self, stats: &AttendanceStatistics) -> bool {
        !stats.is_punishment_triggered
            && stats.exceeds_thresholds(
                self.config.late_count_threshold,
                self.config.late_minutes_threshold,
            )
    }

    /// One-shot latch; repeated calls for the same period are no-ops.
    pub fn mark_punishment_triggered(
        &self,
        employee: &EmployeeId,
        year: i32,
        month: u32,
    ) -> Result<bool, AttendanceError> {
        self.store.mark_punishment_triggered(employee, year, month)
    }

    /// Rows in the period that are due a punishment campaign.
    pub fn punishment_candidates(
        &self,
        year: i32,
        month: u32,
    ) -> Result<Vec<AttendanceStatistics>, AttendanceError> {
        let rows = self.store.rows_for_period(year, month)?;
        Ok(rows
            .into_iter()
            .filter(|stats| self.punishment_due(stats))
            .collect())
    }

    /// Zero the period's counters system-wide. Unconditional; the scheduled
    /// path goes through [`roll_period`](Self::roll_period) instead so that
    /// in-month accrual is never wiped.
    pub fn reset_period(&self, year: i32, month: u32) -> Result<usize, AttendanceError> {
        self.store.reset_period(year, month)
    }

    /// Force-reset the period `now` falls in. Admin surface only.
    pub fn reset_current_period(&self, now: DateTime<Utc>) -> Result<usize, AttendanceError> {
        let date = now.date_naive();
        self.reset_period(date.year(), date.month())
    }

    /// Period-boundary hook for the orchestrator's daily tick. Resets the
    /// period the clock has just entered exactly once, and prunes rows older
    /// than anything the triggers still read. Ticks inside an already-seen
    /// period do nothing and return `None`.
    pub fn roll_period(&self, now: DateTime<Utc>) -> Result<Option<PeriodRollover>, AttendanceError> {
        let date = now.date_naive();
        let period = (date.year(), date.month());

        let mut last = self.last_period.lock().expect("period mutex poisoned");
        match *last {
            Some(seen) if seen == period => return Ok(None),
            None => {
                // First tick after startup lands mid-period; adopting it
                // without a reset keeps whatever has already accrued.
                *last = Some(period);
                return Ok(None);
            }
            Some(_) => {}
        }
        *last = Some(period);

        let reset_rows = self.store.reset_period(period.0, period.1)?;
        // Rows more than a year old are outside every window the triggers
        // consult.
        let pruned_rows = self.store.prune_periods_before(period.0 - 1, period.1)?;
        info!(year = period.0, month = period.1, reset_rows, pruned_rows, "attendance period rolled");
        Ok(Some(PeriodRollover {
            reset_rows,
            pruned_rows,
        }))
    }

    pub fn row(
        &self,
        employee: &EmployeeId,
        year: i32,
        month: u32,
    ) -> Result<Option<AttendanceStatistics>, AttendanceError> {
        self.store.row(employee, year, month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::attendance::domain::ClockType;
    use crate::workflows::attendance::store::InMemoryAttendanceStore;
    use chrono::TimeZone;

    fn aggregator() -> AttendanceAggregator<InMemoryAttendanceStore> {
        AttendanceAggregator::new(
            Arc::new(InMemoryAttendanceStore::default()),
            GovernanceConfig::default(),
        )
    }

    fn late(employee: &str, event_ref: &str, minutes: u32) -> LateEvent {
        LateEvent {
            employee_id: EmployeeId(employee.to_string()),
            clock_type: ClockType::In,
            status: ClockStatus::Late,
            clock_time: Utc.with_ymd_and_hms(2026, 3, 9, 9, 5, 0).single().expect("valid"),
            late_minutes: minutes,
            event_ref: event_ref.to_string(),
        }
    }

    #[test]
    fn replayed_event_ref_does_not_double_count() {
        let aggregator = aggregator();
        let event = late("emp-1", "evt-1", 5);

        assert!(matches!(
            aggregator.record_late_event(&event).expect("record"),
            LateEventOutcome::Recorded { .. }
        ));
        assert_eq!(
            aggregator.record_late_event(&event).expect("record"),
            LateEventOutcome::Duplicate
        );

        let row = aggregator
            .row(&EmployeeId("emp-1".to_string()), 2026, 3)
            .expect("row")
            .expect("present");
        assert_eq!(row.late_count, 1);
        assert_eq!(row.late_minutes_total, 5);
    }

    #[test]
    fn punishment_fires_on_count_threshold() {
        let aggregator = aggregator();
        for n in 0..3 {
            let outcome = aggregator
                .record_late_event(&late("emp-1", &format!("evt-{n}"), 1))
                .expect("record");
            assert_eq!(outcome, LateEventOutcome::Recorded { punishment_due: false });
        }
        // Fourth lateness crosses lateCount > 3.
        let outcome = aggregator
            .record_late_event(&late("emp-1", "evt-3x", 1))
            .expect("record");
        assert_eq!(outcome, LateEventOutcome::Recorded { punishment_due: true });
    }

    #[test]
    fn punishment_fires_on_minutes_threshold() {
        let aggregator = aggregator();
        let outcome = aggregator
            .record_late_event(&late("emp-1", "evt-1", 25))
            .expect("record");
        assert_eq!(outcome, LateEventOutcome::Recorded { punishment_due: true });
    }

    #[test]
    fn latch_is_one_shot_until_reset() {
        let aggregator = aggregator();
        let employee = EmployeeId("emp-1".to_string());
        aggregator
            .record_late_event(&late("emp-1", "evt-1", 25))
            .expect("record");

        assert!(aggregator
            .mark_punishment_triggered(&employee, 2026, 3)
            .expect("mark"));
        assert!(!aggregator
            .mark_punishment_triggered(&employee, 2026, 3)
            .expect("mark"));
        assert!(aggregator
            .punishment_candidates(2026, 3)
            .expect("candidates")
            .is_empty());

        let row = aggregator.row(&employee, 2026, 3).expect("row").expect("present");
        assert_eq!(row.punishment_count, 1);

        aggregator.reset_period(2026, 3).expect("reset");
        let row = aggregator.row(&employee, 2026, 3).expect("row").expect("present");
        assert_eq!(row.late_count, 0);
        assert!(!row.is_punishment_triggered);
        assert_eq!(row.punishment_count, 1);
    }

    #[test]
    fn daily_rollover_keeps_in_month_accrual() {
        let aggregator = aggregator();
        let employee = EmployeeId("emp-1".to_string());

        // One lateness a day with the daily job's rollover interleaved; the
        // counters must accumulate across the whole month.
        for day in 9..14 {
            let now = Utc
                .with_ymd_and_hms(2026, 3, day, 9, 5, 0)
                .single()
                .expect("valid");
            assert_eq!(aggregator.roll_period(now).expect("roll"), None);
            let mut event = late("emp-1", &format!("evt-{day}"), 1);
            event.clock_time = now;
            aggregator.record_late_event(&event).expect("record");
        }

        let row = aggregator
            .row(&employee, 2026, 3)
            .expect("row")
            .expect("present");
        assert_eq!(row.late_count, 5);
        assert!(aggregator.punishment_due(&row));
    }

    #[test]
    fn rollover_fires_once_per_boundary_and_prunes_stale_rows() {
        let aggregator = aggregator();
        let employee = EmployeeId("emp-1".to_string());

        // A year-old period with a latched punishment, then a recent period
        // that carries the count forward.
        let mut event = late("emp-1", "evt-old", 25);
        event.clock_time = Utc
            .with_ymd_and_hms(2025, 2, 10, 9, 5, 0)
            .single()
            .expect("valid");
        aggregator.record_late_event(&event).expect("record");
        assert!(aggregator
            .mark_punishment_triggered(&employee, 2025, 2)
            .expect("mark"));

        let recent = Utc
            .with_ymd_and_hms(2026, 2, 10, 9, 5, 0)
            .single()
            .expect("valid");
        let mut event = late("emp-1", "evt-recent", 1);
        event.clock_time = recent;
        aggregator.record_late_event(&event).expect("record");

        aggregator.roll_period(recent).expect("adopt period");
        let boundary = Utc
            .with_ymd_and_hms(2026, 3, 1, 0, 5, 0)
            .single()
            .expect("valid");
        let rollover = aggregator
            .roll_period(boundary)
            .expect("roll")
            .expect("boundary crossed");
        assert_eq!(rollover.pruned_rows, 1);
        assert_eq!(aggregator.roll_period(boundary).expect("roll"), None);

        assert!(aggregator.row(&employee, 2025, 2).expect("row").is_none());
        let kept = aggregator
            .row(&employee, 2026, 2)
            .expect("row")
            .expect("present");
        assert_eq!(kept.punishment_count, 1);
    }

    #[test]
    fn non_late_events_are_ignored() {
        let aggregator = aggregator();
        let mut event = late("emp-1", "evt-1", 0);
        event.status = ClockStatus::OnTime;
        assert_eq!(
            aggregator.record_late_event(&event).expect("record"),
            LateEventOutcome::NotLate
        );
        assert!(aggregator
            .row(&EmployeeId("emp-1".to_string()), 2026, 3)
            .expect("row")
            .is_none());
    }
}
