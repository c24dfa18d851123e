//! Autonomous voting engine for personnel decisions.
//!
//! Probation-to-permanent promotions and lateness-triggered demotions are
//! decided by anonymous, time-boxed employee voting campaigns that are
//! opened, resolved, and executed without human initiation. The library is
//! organized as workflows over pluggable stores, with a job scheduler
//! driving the trigger and resolution engines on fixed cadences.

pub mod config;
pub mod error;
pub mod scheduler;
pub mod telemetry;
pub mod workflows;
