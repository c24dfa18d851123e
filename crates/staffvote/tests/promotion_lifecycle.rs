//! End-to-end promotion flow: tenure trigger, ballot casting, expiry
//! resolution, and the buffer period after a failed campaign.

mod common {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use staffvote::workflows::attendance::{AttendanceAggregator, InMemoryAttendanceStore};
    use staffvote::workflows::governance::{
        AutoTrigger, BallotService, Employee, EmployeeId, EmployeeStatus, GovernanceConfig,
        InMemoryEmployeeDirectory, InMemoryGovernanceStore, InMemoryOutbox, Position,
        ResolutionEngine,
    };

    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 15, 9, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    pub fn employee(id: &str, position: Position, tenure_days: i64) -> Employee {
        Employee {
            id: EmployeeId(id.to_string()),
            name: format!("Employee {id}"),
            position,
            hire_date: now().date_naive() - Duration::days(tenure_days),
            current_store: "store-1".to_string(),
            status: EmployeeStatus::Active,
        }
    }

    pub struct Engine {
        pub store: Arc<InMemoryGovernanceStore>,
        pub directory: Arc<InMemoryEmployeeDirectory>,
        pub outbox: Arc<InMemoryOutbox>,
        pub trigger:
            AutoTrigger<InMemoryGovernanceStore, InMemoryEmployeeDirectory, InMemoryAttendanceStore>,
        pub resolution: ResolutionEngine<InMemoryGovernanceStore, InMemoryEmployeeDirectory>,
        pub ballots: BallotService<InMemoryGovernanceStore, InMemoryEmployeeDirectory>,
    }

    pub fn engine(employees: impl IntoIterator<Item = Employee>) -> Engine {
        let config = GovernanceConfig::default();
        let store = Arc::new(InMemoryGovernanceStore::default());
        let directory = Arc::new(InMemoryEmployeeDirectory::seeded(employees));
        let outbox = Arc::new(InMemoryOutbox::default());
        let attendance = Arc::new(AttendanceAggregator::new(
            Arc::new(InMemoryAttendanceStore::default()),
            config.clone(),
        ));

        let trigger = AutoTrigger::new(
            store.clone(),
            directory.clone(),
            attendance,
            outbox.clone(),
            config,
        );
        let resolution = ResolutionEngine::new(store.clone(), directory.clone(), outbox.clone());
        let ballots = BallotService::new(store.clone(), directory.clone());

        Engine {
            store,
            directory,
            outbox,
            trigger,
            resolution,
            ballots,
        }
    }
}

use chrono::Duration;
use common::*;

use staffvote::workflows::governance::{
    CampaignStatus, EmployeeDirectory, EmployeeId, GovernanceStore, Position, VoteDecision,
};

#[test]
fn tenure_threshold_opens_exactly_one_campaign() {
    let engine = engine([
        employee("emp-newcomer", Position::Intern, 20),
        employee("emp-too-new", Position::Intern, 5),
        employee("emp-settled", Position::Staff, 400),
    ]);

    let report = engine.trigger.check_promotions(now()).expect("sweep");
    assert_eq!(report.created.len(), 1);

    let campaign = engine
        .store
        .campaign(&report.created[0])
        .expect("lookup")
        .expect("present");
    assert_eq!(campaign.status, CampaignStatus::Active);
    assert_eq!(
        campaign.trigger_employee,
        Some(EmployeeId("emp-newcomer".to_string()))
    );

    let candidates = engine.store.candidates(&campaign.id).expect("candidates");
    assert_eq!(candidates.len(), 1);
    assert_eq!(
        candidates[0].employee_id,
        EmployeeId("emp-newcomer".to_string())
    );

    // A second sweep in the same window must not duplicate the campaign.
    let rerun = engine.trigger.check_promotions(now()).expect("sweep");
    assert!(rerun.created.is_empty());
}

#[test]
fn passed_campaign_promotes_the_employee_on_resolution() {
    let mut roster = vec![employee("emp-newcomer", Position::Intern, 25)];
    for n in 1..=10 {
        roster.push(employee(&format!("emp-voter-{n}"), Position::Staff, 300));
    }
    let engine = engine(roster);

    let report = engine.trigger.check_promotions(now()).expect("sweep");
    let campaign_id = report.created[0].clone();
    let candidate = engine.store.candidates(&campaign_id).expect("candidates")[0]
        .id
        .clone();

    // Six of ten agree: 60% meets the promotion threshold exactly.
    for n in 1..=10 {
        let decision = if n <= 6 {
            VoteDecision::Agree
        } else {
            VoteDecision::Reject
        };
        engine
            .ballots
            .cast_vote(
                &campaign_id,
                &candidate,
                &EmployeeId(format!("emp-voter-{n}")),
                decision,
                None,
                now() + Duration::hours(n),
            )
            .expect("ballot accepted");
    }

    let after_expiry = now() + Duration::days(6);
    let resolution = engine.resolution.process_expired(after_expiry).expect("resolve");
    assert_eq!(resolution.closed, vec![campaign_id.clone()]);
    assert_eq!(resolution.passed, 1);
    assert_eq!(resolution.executed, 1);

    let campaign = engine
        .store
        .campaign(&campaign_id)
        .expect("lookup")
        .expect("present");
    let results = campaign.results.as_ref().expect("results recorded");
    assert_eq!(results.total_votes, 10);
    assert_eq!(results.agree_votes, 6);
    assert!((results.agree_percentage - 60.0).abs() < f64::EPSILON);
    assert!(results.passed);
    assert!(campaign.outcome_executed_at.is_some());

    let promoted = engine
        .directory
        .employee(&EmployeeId("emp-newcomer".to_string()))
        .expect("lookup")
        .expect("present");
    assert_eq!(promoted.position, Position::Staff);

    // Re-running the sweep afterwards changes nothing.
    let rerun = engine.resolution.process_expired(after_expiry).expect("resolve");
    assert!(rerun.closed.is_empty());
    let unchanged = engine
        .store
        .campaign(&campaign_id)
        .expect("lookup")
        .expect("present");
    assert_eq!(unchanged.results, campaign.results);
}

#[test]
fn failed_campaign_starts_the_buffer_period() {
    let engine = engine([
        employee("emp-newcomer", Position::Intern, 25),
        employee("emp-voter-1", Position::Staff, 300),
        employee("emp-voter-2", Position::Staff, 300),
        employee("emp-voter-3", Position::Staff, 300),
    ]);

    let report = engine.trigger.check_promotions(now()).expect("sweep");
    let campaign_id = report.created[0].clone();
    let candidate = engine.store.candidates(&campaign_id).expect("candidates")[0]
        .id
        .clone();

    for (n, decision) in [
        VoteDecision::Agree,
        VoteDecision::Reject,
        VoteDecision::Reject,
    ]
    .into_iter()
    .enumerate()
    {
        engine
            .ballots
            .cast_vote(
                &campaign_id,
                &candidate,
                &EmployeeId(format!("emp-voter-{}", n + 1)),
                decision,
                None,
                now() + Duration::hours(n as i64 + 1),
            )
            .expect("ballot accepted");
    }

    let after_expiry = now() + Duration::days(6);
    let resolution = engine.resolution.process_expired(after_expiry).expect("resolve");
    assert_eq!(resolution.failed, 1);

    let unchanged = engine
        .directory
        .employee(&EmployeeId("emp-newcomer".to_string()))
        .expect("lookup")
        .expect("present");
    assert_eq!(unchanged.position, Position::Intern);

    // Inside the 30-day buffer no new campaign may open.
    let inside_buffer = after_expiry + Duration::days(10);
    let report = engine.trigger.check_promotions(inside_buffer).expect("sweep");
    assert!(report.created.is_empty());

    // Once the buffer has elapsed the employee is eligible again.
    let campaign_end = engine
        .store
        .campaign(&campaign_id)
        .expect("lookup")
        .expect("present")
        .ends_at;
    let after_buffer = campaign_end + Duration::days(31);
    let report = engine.trigger.check_promotions(after_buffer).expect("sweep");
    assert_eq!(report.created.len(), 1);
}

#[test]
fn campaign_with_no_votes_fails_safely() {
    let engine = engine([employee("emp-newcomer", Position::Intern, 25)]);
    let report = engine.trigger.check_promotions(now()).expect("sweep");
    let campaign_id = report.created[0].clone();

    let resolution = engine
        .resolution
        .process_expired(now() + Duration::days(6))
        .expect("resolve");
    assert_eq!(resolution.failed, 1);

    let campaign = engine
        .store
        .campaign(&campaign_id)
        .expect("lookup")
        .expect("present");
    let results = campaign.results.expect("results recorded");
    assert_eq!(results.total_votes, 0);
    assert!((results.agree_percentage - 0.0).abs() < f64::EPSILON);
    assert!(!results.passed);
}

#[test]
fn trigger_and_resolution_emit_notifications() {
    let engine = engine([employee("emp-newcomer", Position::Intern, 25)]);
    engine.trigger.check_promotions(now()).expect("sweep");
    assert_eq!(engine.outbox.events().len(), 1);

    engine
        .resolution
        .process_expired(now() + Duration::days(6))
        .expect("resolve");
    assert_eq!(engine.outbox.events().len(), 2);
}
