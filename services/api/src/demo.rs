use std::sync::Arc;

use chrono::{Duration, Utc};
use clap::Args;

use staffvote::error::AppError;
use staffvote::workflows::attendance::{
    AttendanceAggregator, ClockStatus, ClockType, InMemoryAttendanceStore, LateEvent,
};
use staffvote::workflows::governance::{
    AutoTrigger, BallotService, EmployeeDirectory, EmployeeId, GovernanceConfig, GovernanceStore,
    InMemoryEmployeeDirectory, InMemoryGovernanceStore, InMemoryOutbox, ResolutionEngine,
    VoteDecision,
};

use crate::infra::seed_roster;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the demotion portion of the demo.
    #[arg(long)]
    pub(crate) skip_demotion: bool,
}

/// Walk the full lifecycle against in-memory stores: a tenure-triggered
/// promotion campaign, ballots, resolution, and a lateness-triggered
/// demotion campaign.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = GovernanceConfig::default();
    let now = Utc::now();

    let store = Arc::new(InMemoryGovernanceStore::default());
    let directory = Arc::new(InMemoryEmployeeDirectory::seeded(seed_roster(
        now.date_naive(),
    )));
    let outbox = Arc::new(InMemoryOutbox::default());
    let aggregator = Arc::new(AttendanceAggregator::new(
        Arc::new(InMemoryAttendanceStore::default()),
        config.clone(),
    ));

    let trigger = AutoTrigger::new(
        store.clone(),
        directory.clone(),
        aggregator.clone(),
        outbox.clone(),
        config,
    );
    let resolution = ResolutionEngine::new(store.clone(), directory.clone(), outbox.clone());
    let ballots = BallotService::new(store.clone(), directory.clone());

    println!("== Promotion trigger ==");
    let report = trigger
        .check_promotions(now)
        .map_err(|error| AppError::Io(std::io::Error::other(error.to_string())))?;
    println!(
        "examined {} employees, opened {} campaign(s)",
        report.examined,
        report.created.len()
    );

    let Some(campaign_id) = report.created.first().cloned() else {
        println!("no promotion-eligible employees in the seed roster");
        return Ok(());
    };

    let Some(candidate) = store
        .candidates(&campaign_id)
        .map_err(|error| AppError::Io(std::io::Error::other(error.to_string())))?
        .into_iter()
        .next()
    else {
        println!("campaign {} has no candidate on file", campaign_id.0);
        return Ok(());
    };
    println!(
        "campaign {} voting on candidate {}",
        campaign_id.0, candidate.anonymous_id
    );

    println!("\n== Ballots ==");
    for (voter, decision) in [
        ("emp-003", VoteDecision::Agree),
        ("emp-004", VoteDecision::Agree),
        ("emp-005", VoteDecision::Reject),
        ("emp-006", VoteDecision::Agree),
    ] {
        let vote = ballots
            .cast_vote(
                &campaign_id,
                &candidate.id,
                &EmployeeId(voter.to_string()),
                decision,
                None,
                now + Duration::hours(1),
            )
            .map_err(AppError::Ballot)?;
        println!("{voter} cast {} ({})", vote.current_decision.label(), vote.id.0);
    }

    let stats = ballots
        .campaign_stats(&campaign_id, now + Duration::hours(2))
        .map_err(AppError::Ballot)?;
    println!(
        "tally: {} votes from {} voters, decisions {:?}",
        stats.total_votes, stats.total_voters, stats.decisions
    );

    println!("\n== Resolution ==");
    let resolved = resolution
        .process_expired(now + Duration::days(6))
        .map_err(|error| AppError::Io(std::io::Error::other(error.to_string())))?;
    println!(
        "closed {} campaign(s): {} passed, {} failed, {} executed",
        resolved.closed.len(),
        resolved.passed,
        resolved.failed,
        resolved.executed
    );
    if let Some(subject) = directory
        .employee(&EmployeeId("emp-001".to_string()))
        .map_err(|error| AppError::Io(std::io::Error::other(error.to_string())))?
    {
        println!("emp-001 now holds position: {}", subject.position.label());
    }

    if !args.skip_demotion {
        println!("\n== Demotion trigger ==");
        for n in 1..=4 {
            aggregator
                .record_late_event(&LateEvent {
                    employee_id: EmployeeId("emp-003".to_string()),
                    clock_type: ClockType::In,
                    status: ClockStatus::Late,
                    clock_time: now,
                    late_minutes: 2,
                    event_ref: format!("demo-late-{n}"),
                })
                .map_err(|error| AppError::Io(std::io::Error::other(error.to_string())))?;
        }
        let report = trigger
            .check_demotions(now)
            .map_err(|error| AppError::Io(std::io::Error::other(error.to_string())))?;
        println!(
            "examined {} statistics rows, opened {} demotion campaign(s)",
            report.examined,
            report.created.len()
        );
    }

    println!("\n== Outbox ==");
    for event in outbox.events() {
        println!("[{:?}] {}", event.channel, event.payload);
    }

    Ok(())
}
