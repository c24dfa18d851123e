use chrono::Duration;

use super::common::*;
use crate::workflows::governance::ballot::BallotError;
use crate::workflows::governance::domain::{CampaignStatus, EmployeeId, VoteDecision};
use crate::workflows::governance::eligibility::EligibilityRejection;
use crate::workflows::governance::store::GovernanceStore;

#[test]
fn cast_rejects_campaign_outside_voting_window() {
    let fixture = ballot_fixture();
    let after_close = fixture.campaign.ends_at + Duration::hours(1);

    let result = fixture.service.cast_vote(
        &fixture.campaign.id,
        &fixture.candidate.id,
        &EmployeeId("emp-1".to_string()),
        VoteDecision::Agree,
        None,
        after_close,
    );
    assert!(matches!(result, Err(BallotError::CampaignNotActive)));
}

#[test]
fn cast_rejects_second_ballot_from_same_voter() {
    let fixture = ballot_fixture();
    let voter = EmployeeId("emp-1".to_string());

    fixture
        .service
        .cast_vote(
            &fixture.campaign.id,
            &fixture.candidate.id,
            &voter,
            VoteDecision::Agree,
            None,
            fixed_now(),
        )
        .expect("first ballot accepted");

    let second = fixture.service.cast_vote(
        &fixture.campaign.id,
        &fixture.candidate.id,
        &voter,
        VoteDecision::Reject,
        None,
        fixed_now(),
    );
    assert!(matches!(second, Err(BallotError::AlreadyVoted)));

    let votes = fixture.store.votes(&fixture.campaign.id).expect("votes");
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].current_decision, VoteDecision::Agree);
}

#[test]
fn candidate_cannot_vote_on_their_own_campaign() {
    let fixture = ballot_fixture();

    let result = fixture.service.cast_vote(
        &fixture.campaign.id,
        &fixture.candidate.id,
        &fixture.subject,
        VoteDecision::Agree,
        None,
        fixed_now(),
    );
    assert!(matches!(
        result,
        Err(BallotError::NotEligible(EligibilityRejection::Excluded))
    ));
}

#[test]
fn cast_rejects_voter_below_minimum_tenure() {
    let mut fixture = ballot_fixture();
    fixture.campaign.eligibility.min_tenure_days = 365;

    // Rebuild the store with the stricter criteria.
    let store = std::sync::Arc::new(
        crate::workflows::governance::store::InMemoryGovernanceStore::default(),
    );
    store
        .create_campaign(fixture.campaign.clone(), vec![fixture.candidate.clone()])
        .expect("campaign created");
    let service = crate::workflows::governance::ballot::BallotService::new(
        store,
        fixture.directory.clone(),
    );

    let result = service.cast_vote(
        &fixture.campaign.id,
        &fixture.candidate.id,
        &EmployeeId("emp-1".to_string()),
        VoteDecision::Agree,
        None,
        fixed_now(),
    );
    assert!(matches!(
        result,
        Err(BallotError::NotEligible(
            EligibilityRejection::InsufficientTenure { required: 365, .. }
        ))
    ));
}

#[test]
fn modify_appends_audit_record_and_updates_tallies() {
    let fixture = ballot_fixture();
    let voter = EmployeeId("emp-1".to_string());

    let vote = fixture
        .service
        .cast_vote(
            &fixture.campaign.id,
            &fixture.candidate.id,
            &voter,
            VoteDecision::Agree,
            None,
            fixed_now(),
        )
        .expect("ballot accepted");

    let updated = fixture
        .service
        .modify_vote(
            &vote.id,
            &voter,
            VoteDecision::Reject,
            Some("changed my mind".to_string()),
            fixed_now() + Duration::hours(2),
        )
        .expect("modification accepted");

    assert_eq!(updated.original_decision, VoteDecision::Agree);
    assert_eq!(updated.current_decision, VoteDecision::Reject);
    assert_eq!(updated.modification_count, 1);

    let records = fixture.store.modifications(&vote.id).expect("records");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].modification_number, 1);
    assert_eq!(records[0].old_decision, VoteDecision::Agree);
    assert_eq!(records[0].new_decision, VoteDecision::Reject);
    assert_eq!(records[0].reason.as_deref(), Some("changed my mind"));
}

#[test]
fn modify_rejects_non_owner() {
    let fixture = ballot_fixture();
    let vote = fixture
        .service
        .cast_vote(
            &fixture.campaign.id,
            &fixture.candidate.id,
            &EmployeeId("emp-1".to_string()),
            VoteDecision::Agree,
            None,
            fixed_now(),
        )
        .expect("ballot accepted");

    let result = fixture.service.modify_vote(
        &vote.id,
        &EmployeeId("emp-2".to_string()),
        VoteDecision::Reject,
        None,
        fixed_now(),
    );
    assert!(matches!(result, Err(BallotError::NotVoteOwner)));
}

#[test]
fn modification_limit_is_enforced() {
    let fixture = ballot_fixture();
    let voter = EmployeeId("emp-1".to_string());
    let vote = fixture
        .service
        .cast_vote(
            &fixture.campaign.id,
            &fixture.candidate.id,
            &voter,
            VoteDecision::Agree,
            None,
            fixed_now(),
        )
        .expect("ballot accepted");

    let decisions = [VoteDecision::Reject, VoteDecision::Agree, VoteDecision::Reject];
    for (n, decision) in decisions.into_iter().enumerate() {
        fixture
            .service
            .modify_vote(
                &vote.id,
                &voter,
                decision,
                None,
                fixed_now() + Duration::hours(n as i64 + 1),
            )
            .unwrap_or_else(|error| panic!("modification {} accepted: {error}", n + 1));
    }

    let fourth = fixture.service.modify_vote(
        &vote.id,
        &voter,
        VoteDecision::Agree,
        None,
        fixed_now() + Duration::hours(10),
    );
    assert!(matches!(fourth, Err(BallotError::ModificationLimitReached)));

    let stored = fixture
        .store
        .vote(&vote.id)
        .expect("lookup")
        .expect("present");
    assert_eq!(stored.modification_count, 3);
    assert!(!stored.can_still_modify(&fixture.campaign, fixed_now()));
}

#[test]
fn cached_aggregates_always_match_recomputation() {
    let fixture = ballot_fixture();
    for (voter, decision) in [
        ("emp-1", VoteDecision::Agree),
        ("emp-2", VoteDecision::Reject),
        ("emp-3", VoteDecision::Agree),
    ] {
        fixture
            .service
            .cast_vote(
                &fixture.campaign.id,
                &fixture.candidate.id,
                &EmployeeId(voter.to_string()),
                decision,
                None,
                fixed_now(),
            )
            .expect("ballot accepted");
    }

    let candidates = fixture
        .store
        .candidates(&fixture.campaign.id)
        .expect("candidates");
    let votes = fixture.store.votes(&fixture.campaign.id).expect("votes");
    let recount = votes
        .iter()
        .filter(|vote| vote.is_valid && vote.candidate_id == candidates[0].id)
        .count() as u32;
    assert_eq!(candidates[0].vote_count, recount);
    assert_eq!(recount, 3);

    let campaign = fixture
        .store
        .campaign(&fixture.campaign.id)
        .expect("lookup")
        .expect("present");
    assert_eq!(campaign.total_votes, 3);
    assert_eq!(campaign.total_voters, 3);
}

#[test]
fn stats_recompute_from_votes_and_report_decisions() {
    let fixture = ballot_fixture();
    for (voter, decision) in [
        ("emp-1", VoteDecision::Agree),
        ("emp-2", VoteDecision::Abstain),
    ] {
        fixture
            .service
            .cast_vote(
                &fixture.campaign.id,
                &fixture.candidate.id,
                &EmployeeId(voter.to_string()),
                decision,
                None,
                fixed_now(),
            )
            .expect("ballot accepted");
    }

    let stats = fixture
        .service
        .campaign_stats(&fixture.campaign.id, fixed_now())
        .expect("stats");
    assert_eq!(stats.total_votes, 2);
    assert_eq!(stats.total_voters, 2);
    assert_eq!(stats.decisions.get("agree"), Some(&1));
    assert_eq!(stats.decisions.get("abstain"), Some(&1));
    assert_eq!(stats.candidates.len(), 1);
    assert_eq!(stats.candidates[0].vote_count, 2);
    // Three eligible voters, two fingerprints: no integrity warning.
    assert!(stats.integrity_warnings.is_empty());
    assert_eq!(stats.status, CampaignStatus::Active.label());
}
