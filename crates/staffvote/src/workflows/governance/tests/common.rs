use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::workflows::governance::ballot::BallotService;
use crate::workflows::governance::directory::InMemoryEmployeeDirectory;
use crate::workflows::governance::domain::{
    Campaign, CampaignId, CampaignKind, CampaignStatus, Candidate, CandidateId, CandidateStatus,
    EligibilityCriteria, Employee, EmployeeId, EmployeeStatus, Position,
};
use crate::workflows::governance::fingerprint::VoterFingerprint;
use crate::workflows::governance::store::{GovernanceStore, InMemoryGovernanceStore};

pub(super) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn employee(id: &str, position: Position, tenure_days: i64) -> Employee {
    let hire_date = fixed_now().date_naive() - Duration::days(tenure_days);
    Employee {
        id: EmployeeId(id.to_string()),
        name: format!("Employee {id}"),
        position,
        hire_date,
        current_store: "store-1".to_string(),
        status: EmployeeStatus::Active,
    }
}

/// Active campaign voting on `subject`, open for five days from `fixed_now`.
pub(super) fn campaign_for(subject: &EmployeeId) -> (Campaign, Candidate) {
    campaign_open_at(subject, fixed_now())
}

/// Same shape with the voting window anchored on `now`, for tests that go
/// through handlers reading the real clock.
pub(super) fn campaign_open_at(
    subject: &EmployeeId,
    now: DateTime<Utc>,
) -> (Campaign, Candidate) {
    let id = CampaignId(format!("camp-test-{}", subject.0));
    let campaign = Campaign {
        id: id.clone(),
        kind: CampaignKind::AutoPromotion,
        status: CampaignStatus::Active,
        title: format!("Probation review: {}", subject.0),
        starts_at: now - Duration::hours(1),
        ends_at: now + Duration::days(5),
        max_votes_per_voter: 1,
        pass_threshold: 60.0,
        eligibility: EligibilityCriteria {
            allowed_positions: Position::ALL.to_vec(),
            min_tenure_days: 0,
            allowed_stores: None,
            excluded_employees: vec![subject.clone()],
        },
        trigger_employee: Some(subject.clone()),
        system_generated: true,
        priority: 5,
        can_modify_votes: true,
        max_modifications: 3,
        buffer_period_days: 30,
        created_at: now - Duration::hours(1),
        total_votes: 0,
        total_voters: 0,
        results: None,
        outcome_executed_at: None,
    };
    let candidate = Candidate {
        id: CandidateId(format!("{}-cand-1", id.0)),
        campaign_id: id.clone(),
        employee_id: subject.clone(),
        anonymous_id: format!("anon-{}", &VoterFingerprint::derive(subject, &id).0[..8]),
        display_order: 1,
        status: CandidateStatus::Active,
        vote_count: 0,
        vote_percentage: 0.0,
    };
    (campaign, candidate)
}

pub(super) struct BallotFixture {
    pub store: Arc<InMemoryGovernanceStore>,
    pub directory: Arc<InMemoryEmployeeDirectory>,
    pub service: BallotService<InMemoryGovernanceStore, InMemoryEmployeeDirectory>,
    pub campaign: Campaign,
    pub candidate: Candidate,
    pub subject: EmployeeId,
}

/// A campaign on `emp-candidate` with three seeded voters `emp-1..emp-3`.
pub(super) fn ballot_fixture() -> BallotFixture {
    ballot_fixture_at(fixed_now())
}

/// Same fixture with the campaign window anchored on `now`. Handler tests
/// that read the wall clock need this so the window stays open.
pub(super) fn ballot_fixture_at(now: DateTime<Utc>) -> BallotFixture {
    let subject = EmployeeId("emp-candidate".to_string());
    let directory = Arc::new(InMemoryEmployeeDirectory::seeded([
        employee("emp-candidate", Position::Intern, 25),
        employee("emp-1", Position::Staff, 200),
        employee("emp-2", Position::Staff, 400),
        employee("emp-3", Position::Manager, 900),
    ]));

    let store = Arc::new(InMemoryGovernanceStore::default());
    let (campaign, candidate) = campaign_open_at(&subject, now);
    store
        .create_campaign(campaign.clone(), vec![candidate.clone()])
        .expect("campaign created");

    let service = BallotService::new(store.clone(), directory.clone());
    BallotFixture {
        store,
        directory,
        service,
        campaign,
        candidate,
        subject,
    }
}
