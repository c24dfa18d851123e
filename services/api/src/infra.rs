use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::Duration;
use metrics_exporter_prometheus::PrometheusHandle;

use staffvote::scheduler::JobScheduler;
use staffvote::workflows::attendance::{AttendanceAggregator, InMemoryAttendanceStore};
use staffvote::workflows::governance::{
    AutoTrigger, BallotService, Employee, EmployeeId, EmployeeStatus, GovernanceConfig,
    InMemoryEmployeeDirectory, InMemoryGovernanceStore, InMemoryOutbox, Position, ResolutionEngine,
};

pub(crate) type Store = InMemoryGovernanceStore;
pub(crate) type Directory = InMemoryEmployeeDirectory;
pub(crate) type Attendance = InMemoryAttendanceStore;

pub(crate) type Trigger = AutoTrigger<Store, Directory, Attendance>;
pub(crate) type Resolution = ResolutionEngine<Store, Directory>;
pub(crate) type Ballots = BallotService<Store, Directory>;
pub(crate) type Aggregator = AttendanceAggregator<Attendance>;

/// Shared handles threaded through the routes via `Extension`.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) scheduler: Arc<JobScheduler>,
    pub(crate) store: Arc<Store>,
    pub(crate) trigger: Arc<Trigger>,
    pub(crate) resolution: Arc<Resolution>,
    pub(crate) aggregator: Arc<Aggregator>,
    pub(crate) outbox: Arc<InMemoryOutbox>,
    pub(crate) config: GovernanceConfig,
}

/// Starter roster so the service is explorable out of the box. A production
/// deployment replaces the in-memory directory with the real registry.
pub(crate) fn seed_roster(today: chrono::NaiveDate) -> Vec<Employee> {
    let hired = |days: i64| today - Duration::days(days);
    [
        ("emp-001", "Avery Quinn", Position::Intern, 25),
        ("emp-002", "Morgan Reyes", Position::Intern, 8),
        ("emp-003", "Jordan Banks", Position::Staff, 300),
        ("emp-004", "Casey Flores", Position::Staff, 420),
        ("emp-005", "Riley Tan", Position::AssistantManager, 800),
        ("emp-006", "Drew Okafor", Position::Manager, 1500),
    ]
    .into_iter()
    .map(|(id, name, position, tenure)| Employee {
        id: EmployeeId(id.to_string()),
        name: name.to_string(),
        position,
        hire_date: hired(tenure),
        current_store: "store-1".to_string(),
        status: EmployeeStatus::Active,
    })
    .collect()
}
