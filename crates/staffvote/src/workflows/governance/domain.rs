use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::fingerprint::VoterFingerprint;

/// Identifier wrapper for voting campaigns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CampaignId(pub String);

/// Identifier wrapper for employees in the external registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EmployeeId(pub String);

/// Identifier wrapper for a candidate row within a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub String);

/// Identifier wrapper for a cast ballot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoteId(pub String);

/// Ranked position ladder. Ordering follows rank, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Position {
    Intern,
    Staff,
    AssistantManager,
    Manager,
    RegionalManager,
}

impl Position {
    pub const LOWEST: Position = Position::Intern;

    pub const ALL: [Position; 5] = [
        Position::Intern,
        Position::Staff,
        Position::AssistantManager,
        Position::Manager,
        Position::RegionalManager,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Position::Intern => "intern",
            Position::Staff => "staff",
            Position::AssistantManager => "assistant_manager",
            Position::Manager => "manager",
            Position::RegionalManager => "regional_manager",
        }
    }

    /// Next rank up, or `None` at the top of the ladder.
    pub const fn promoted(self) -> Option<Position> {
        match self {
            Position::Intern => Some(Position::Staff),
            Position::Staff => Some(Position::AssistantManager),
            Position::AssistantManager => Some(Position::Manager),
            Position::Manager => Some(Position::RegionalManager),
            Position::RegionalManager => None,
        }
    }

    /// Next rank down, or `None` at the bottom of the ladder.
    pub const fn demoted(self) -> Option<Position> {
        match self {
            Position::Intern => None,
            Position::Staff => Some(Position::Intern),
            Position::AssistantManager => Some(Position::Staff),
            Position::Manager => Some(Position::AssistantManager),
            Position::RegionalManager => Some(Position::Manager),
        }
    }
}

/// Employment status mirrored from the external registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmployeeStatus {
    Active,
    Suspended,
    Terminated,
}

/// Read model of an employee owned by the external registry. The resolution
/// engine's position change is the only write this crate performs on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub position: Position,
    pub hire_date: NaiveDate,
    pub current_store: String,
    pub status: EmployeeStatus,
}

impl Employee {
    pub fn tenure_days(&self, now: DateTime<Utc>) -> i64 {
        (now.date_naive() - self.hire_date).num_days()
    }

    pub fn is_active(&self) -> bool {
        self.status == EmployeeStatus::Active
    }
}

/// Campaign flavor. Each auto kind carries its own duration/threshold policy
/// through [`super::config::GovernanceConfig`]; dispatch is by variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CampaignKind {
    Manual,
    AutoPromotion,
    AutoDemotion,
}

impl CampaignKind {
    pub const fn label(self) -> &'static str {
        match self {
            CampaignKind::Manual => "manual",
            CampaignKind::AutoPromotion => "auto_promotion",
            CampaignKind::AutoDemotion => "auto_demotion",
        }
    }

    pub const fn is_auto(self) -> bool {
        !matches!(self, CampaignKind::Manual)
    }
}

/// Lifecycle state. Transitions are monotonic: Draft -> Active -> Closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CampaignStatus {
    Draft,
    Active,
    Closed,
}

impl CampaignStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Active => "active",
            CampaignStatus::Closed => "closed",
        }
    }

    pub const fn is_open(self) -> bool {
        matches!(self, CampaignStatus::Draft | CampaignStatus::Active)
    }

    /// Whether `next` is a legal successor state.
    pub const fn can_transition_to(self, next: CampaignStatus) -> bool {
        matches!(
            (self, next),
            (CampaignStatus::Draft, CampaignStatus::Active)
                | (CampaignStatus::Draft, CampaignStatus::Closed)
                | (CampaignStatus::Active, CampaignStatus::Closed)
        )
    }
}

/// Who may cast a ballot in a campaign. The trigger employee is always part
/// of `excluded_employees` so nobody votes on their own case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityCriteria {
    pub allowed_positions: Vec<Position>,
    pub min_tenure_days: i64,
    pub allowed_stores: Option<Vec<String>>,
    pub excluded_employees: Vec<EmployeeId>,
}

/// A time-boxed voting activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub kind: CampaignKind,
    pub status: CampaignStatus,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub max_votes_per_voter: u32,
    pub pass_threshold: f64,
    pub eligibility: EligibilityCriteria,
    pub trigger_employee: Option<EmployeeId>,
    pub system_generated: bool,
    pub priority: i32,
    pub can_modify_votes: bool,
    pub max_modifications: u32,
    pub buffer_period_days: i64,
    pub created_at: DateTime<Utc>,
    /// Cached aggregates, recomputed by the store inside every ballot
    /// transaction.
    pub total_votes: u32,
    pub total_voters: u32,
    /// Set exactly once, by the resolution engine on close.
    pub results: Option<CampaignResults>,
    /// Set when a passed campaign's position change has been written to the
    /// employee registry. Stays `None` for failed campaigns.
    pub outcome_executed_at: Option<DateTime<Utc>>,
}

impl Campaign {
    pub fn voting_window_contains(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now && now <= self.ends_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.ends_at < now
    }
}

/// Final tally persisted when a campaign closes. Immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignResults {
    pub total_votes: u32,
    pub agree_votes: u32,
    pub agree_percentage: f64,
    pub passed: bool,
    pub processed_at: DateTime<Utc>,
}

/// Candidate row inside a campaign. Auto campaigns have exactly one.
///
/// `vote_count`/`vote_percentage` are cached aggregates; the store recomputes
/// them from valid votes inside the same transaction as any ballot write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub campaign_id: CampaignId,
    pub employee_id: EmployeeId,
    pub anonymous_id: String,
    pub display_order: u32,
    pub status: CandidateStatus,
    pub vote_count: u32,
    pub vote_percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateStatus {
    Active,
    Withdrawn,
}

/// Ballot decision values accepted by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteDecision {
    Agree,
    Reject,
    Abstain,
}

impl VoteDecision {
    pub const fn label(self) -> &'static str {
        match self {
            VoteDecision::Agree => "agree",
            VoteDecision::Reject => "reject",
            VoteDecision::Abstain => "abstain",
        }
    }
}

/// A cast ballot. The voter is identified only by fingerprint; the pair
/// (campaign_id, fingerprint) is unique at the store level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub campaign_id: CampaignId,
    pub candidate_id: CandidateId,
    pub fingerprint: VoterFingerprint,
    pub original_decision: VoteDecision,
    pub current_decision: VoteDecision,
    pub modification_count: u32,
    pub is_valid: bool,
    pub reason: Option<String>,
    pub voted_at: DateTime<Utc>,
    pub last_modified_at: Option<DateTime<Utc>>,
}

impl Vote {
    /// Whether the voter may still change this ballot.
    pub fn can_still_modify(&self, campaign: &Campaign, now: DateTime<Utc>) -> bool {
        campaign.can_modify_votes
            && self.modification_count < campaign.max_modifications
            && campaign.voting_window_contains(now)
    }
}

/// Append-only audit entry for a ballot change. Never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteModification {
    pub id: String,
    pub vote_id: VoteId,
    pub modification_number: u32,
    pub old_decision: VoteDecision,
    pub new_decision: VoteDecision,
    pub reason: Option<String>,
    pub recorded_at: DateTime<Utc>,
}
