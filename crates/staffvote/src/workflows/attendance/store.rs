use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::domain::{AttendanceStatistics, LateEvent, LateRecord};
use crate::workflows::governance::domain::EmployeeId;

/// Error enumeration for attendance persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum AttendanceError {
    #[error("attendance store unavailable: {0}")]
    Unavailable(String),
}

/// Result of applying one late event to a period row.
#[derive(Debug, Clone, PartialEq)]
pub struct LateApplication {
    pub stats: AttendanceStatistics,
    /// True when the event's `event_ref` was already recorded and nothing
    /// changed.
    pub duplicate: bool,
}

/// Persistence boundary for monthly lateness counters. Compound mutations
/// are single trait calls so conflicting writers serialize in the store.
pub trait AttendanceStore: Send + Sync {
    /// Append a late event to its (employee, year, month) row, creating the
    /// row on first use. Replaying an `event_ref` already present is a
    /// no-op reported through [`LateApplication::duplicate`].
    fn apply_late_event(
        &self,
        event: &LateEvent,
        year: i32,
        month: u32,
    ) -> Result<LateApplication, AttendanceError>;

    /// Set the one-shot punishment latch. Returns false when the latch was
    /// already set (the call is then a no-op).
    fn mark_punishment_triggered(
        &self,
        employee: &EmployeeId,
        year: i32,
        month: u32,
    ) -> Result<bool, AttendanceError>;

    /// Zero all counters and latches for the period. Returns the number of
    /// rows touched. Idempotent.
    fn reset_period(&self, year: i32, month: u32) -> Result<usize, AttendanceError>;

    /// Drop rows from periods strictly before the cutoff, keeping each
    /// employee's most recent row (with its event log cleared) so the
    /// punishment carry survives. Returns the number of rows removed.
    fn prune_periods_before(&self, year: i32, month: u32) -> Result<usize, AttendanceError>;

    fn row(
        &self,
        employee: &EmployeeId,
        year: i32,
        month: u32,
    ) -> Result<Option<AttendanceStatistics>, AttendanceError>;

    fn rows_for_period(&self, year: i32, month: u32)
        -> Result<Vec<AttendanceStatistics>, AttendanceError>;
}

type PeriodKey = (EmployeeId, i32, u32);

/// Months since year zero; gives periods a total order.
fn period_index(year: i32, month: u32) -> i64 {
    i64::from(year) * 12 + i64::from(month) - 1
}

#[derive(Default, Clone)]
pub struct InMemoryAttendanceStore {
    rows: Arc<Mutex<HashMap<PeriodKey, AttendanceStatistics>>>,
}

impl InMemoryAttendanceStore {
    fn carried_punishment_count(
        rows: &HashMap<PeriodKey, AttendanceStatistics>,
        employee: &EmployeeId,
    ) -> u32 {
        rows.values()
            .filter(|stats| &stats.employee_id == employee)
            .map(|stats| stats.punishment_count)
            .max()
            .unwrap_or(0)
    }
}

impl AttendanceStore for InMemoryAttendanceStore {
    fn apply_late_event(
        &self,
        event: &LateEvent,
        year: i32,
        month: u32,
    ) -> Result<LateApplication, AttendanceError> {
        let mut rows = self.rows.lock().expect("attendance mutex poisoned");
        let carried = Self::carried_punishment_count(&rows, &event.employee_id);
        let key = (event.employee_id.clone(), year, month);
        let stats = rows.entry(key).or_insert_with(|| {
            AttendanceStatistics::new(event.employee_id.clone(), year, month, carried)
        });

        if stats
            .late_records
            .iter()
            .any(|record| record.event_ref == event.event_ref)
        {
            return Ok(LateApplication {
                stats: stats.clone(),
                duplicate: true,
            });
        }

        stats.late_records.push(LateRecord {
            event_ref: event.event_ref.clone(),
            late_minutes: event.late_minutes,
            clock_time: event.clock_time,
            recorded_at: Utc::now(),
        });
        stats.late_count += 1;
        stats.late_minutes_total += event.late_minutes;

        Ok(LateApplication {
            stats: stats.clone(),
            duplicate: false,
        })
    }

    fn mark_punishment_triggered(
        &self,
        employee: &EmployeeId,
        year: i32,
        month: u32,
    ) -> Result<bool, AttendanceError> {
        let mut rows = self.rows.lock().expect("attendance mutex poisoned");
        let key = (employee.clone(), year, month);
        match rows.get_mut(&key) {
            Some(stats) if stats.is_punishment_triggered => Ok(false),
            Some(stats) => {
                stats.is_punishment_triggered = true;
                stats.punishment_count += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn reset_period(&self, year: i32, month: u32) -> Result<usize, AttendanceError> {
        let mut rows = self.rows.lock().expect("attendance mutex poisoned");
        let mut touched = 0;
        for stats in rows.values_mut() {
            if stats.year == year && stats.month == month {
                stats.late_count = 0;
                stats.late_minutes_total = 0;
                stats.late_records.clear();
                stats.is_punishment_triggered = false;
                touched += 1;
            }
        }
        Ok(touched)
    }

    fn prune_periods_before(&self, year: i32, month: u32) -> Result<usize, AttendanceError> {
        let cutoff = period_index(year, month);
        let mut rows = self.rows.lock().expect("attendance mutex poisoned");

        let mut newest: HashMap<EmployeeId, i64> = HashMap::new();
        for (employee, y, m) in rows.keys() {
            let index = period_index(*y, *m);
            newest
                .entry(employee.clone())
                .and_modify(|current| *current = (*current).max(index))
                .or_insert(index);
        }

        let before = rows.len();
        rows.retain(|(employee, y, m), _| {
            let index = period_index(*y, *m);
            index >= cutoff || newest.get(employee) == Some(&index)
        });
        // A retained row from before the cutoff only exists to carry the
        // punishment count forward; its event log is no longer consulted.
        for ((_, y, m), stats) in rows.iter_mut() {
            if period_index(*y, *m) < cutoff {
                stats.late_records.clear();
            }
        }
        Ok(before - rows.len())
    }

    fn row(
        &self,
        employee: &EmployeeId,
        year: i32,
        month: u32,
    ) -> Result<Option<AttendanceStatistics>, AttendanceError> {
        let rows = self.rows.lock().expect("attendance mutex poisoned");
        Ok(rows.get(&(employee.clone(), year, month)).cloned())
    }

    fn rows_for_period(
        &self,
        year: i32,
        month: u32,
    ) -> Result<Vec<AttendanceStatistics>, AttendanceError> {
        let rows = self.rows.lock().expect("attendance mutex poisoned");
        let mut matches: Vec<AttendanceStatistics> = rows
            .values()
            .filter(|stats| stats.year == year && stats.month == month)
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.employee_id.cmp(&b.employee_id));
        Ok(matches)
    }
}
