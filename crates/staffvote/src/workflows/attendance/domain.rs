use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::governance::domain::EmployeeId;

/// Clock direction reported by the external attendance subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockType {
    In,
    Out,
}

/// Punctuality classification attached to a clock event upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockStatus {
    OnTime,
    Late,
    EarlyLeave,
}

/// Inbound attendance event. `event_ref` is the upstream identifier used to
/// deduplicate replays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LateEvent {
    pub employee_id: EmployeeId,
    pub clock_type: ClockType,
    pub status: ClockStatus,
    pub clock_time: DateTime<Utc>,
    pub late_minutes: u32,
    pub event_ref: String,
}

impl LateEvent {
    /// Accounting period the event falls into.
    pub fn period(&self) -> (i32, u32) {
        let date = self.clock_time.date_naive();
        (date.year(), date.month())
    }
}

/// One appended lateness entry inside a period's statistics row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LateRecord {
    pub event_ref: String,
    pub late_minutes: u32,
    pub clock_time: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
}

/// Per-employee monthly lateness counters.
///
/// `is_punishment_triggered` is a one-shot latch: once a demotion campaign
/// has been raised for the period, further threshold crossings are no-ops
/// until the period resets. `punishment_count` carries across periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceStatistics {
    pub employee_id: EmployeeId,
    pub year: i32,
    pub month: u32,
    pub late_count: u32,
    pub late_minutes_total: u32,
    pub late_records: Vec<LateRecord>,
    pub is_punishment_triggered: bool,
    pub punishment_count: u32,
}

impl AttendanceStatistics {
    pub fn new(employee_id: EmployeeId, year: i32, month: u32, punishment_count: u32) -> Self {
        Self {
            employee_id,
            year,
            month,
            late_count: 0,
            late_minutes_total: 0,
            late_records: Vec::new(),
            is_punishment_triggered: false,
            punishment_count,
        }
    }

    /// Whether the punishment condition holds. Checked after every event,
    /// so a campaign can fire mid-period.
    pub fn exceeds_thresholds(&self, late_count_threshold: u32, late_minutes_threshold: u32) -> bool {
        self.late_count > late_count_threshold || self.late_minutes_total > late_minutes_threshold
    }
}
