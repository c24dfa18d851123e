//! The autonomous voting engine: campaign/candidate/vote model, anonymous
//! ballot protocol, condition-driven campaign triggers, and resolution.

pub mod ballot;
pub mod config;
pub mod directory;
pub mod domain;
pub(crate) mod eligibility;
pub mod fingerprint;
pub mod outbox;
pub mod resolution;
pub mod router;
pub mod stats;
pub mod store;
pub mod trigger;

#[cfg(test)]
mod tests;

pub use ballot::{BallotError, BallotService};
pub use config::{CampaignPolicy, GovernanceConfig};
pub use directory::{DirectoryError, EmployeeDirectory, InMemoryEmployeeDirectory};
pub use domain::{
    Campaign, CampaignId, CampaignKind, CampaignResults, CampaignStatus, Candidate, CandidateId,
    CandidateStatus, EligibilityCriteria, Employee, EmployeeId, EmployeeStatus, Position, Vote,
    VoteDecision, VoteId, VoteModification,
};
pub use eligibility::EligibilityRejection;
pub use fingerprint::VoterFingerprint;
pub use outbox::{
    InMemoryOutbox, NotificationChannel, NotificationEvent, NotificationOutbox, Notifier,
    NotifyError, NullNotifier, OutboxError, OutboxRelay,
};
pub use resolution::{ResolutionEngine, ResolutionError, ResolutionReport};
pub use router::ballot_router;
pub use stats::{CampaignStats, CandidateTally};
pub use store::{GovernanceStore, InMemoryGovernanceStore, StoreError};
pub use trigger::{AutoTrigger, TriggerError, TriggerReport};
