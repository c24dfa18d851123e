//! Per-employee monthly lateness accounting feeding the demotion trigger.

pub mod aggregator;
pub mod domain;
pub mod store;

pub use aggregator::{AttendanceAggregator, LateEventOutcome, PeriodRollover};
pub use domain::{AttendanceStatistics, ClockStatus, ClockType, LateEvent, LateRecord};
pub use store::{AttendanceError, AttendanceStore, InMemoryAttendanceStore, LateApplication};
