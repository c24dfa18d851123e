use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::ballot::{BallotError, BallotService};
use super::directory::EmployeeDirectory;
use super::domain::{CampaignId, CandidateId, EmployeeId, VoteDecision, VoteId};
use super::store::GovernanceStore;

/// Router builder exposing the ballot protocol over HTTP.
pub fn ballot_router<S, D>(service: Arc<BallotService<S, D>>) -> Router
where
    S: GovernanceStore + 'static,
    D: EmployeeDirectory + 'static,
{
    Router::new()
        .route(
            "/api/v1/campaigns/:campaign_id/votes",
            post(cast_handler::<S, D>),
        )
        .route(
            "/api/v1/votes/:vote_id/modifications",
            post(modify_handler::<S, D>),
        )
        .route(
            "/api/v1/campaigns/:campaign_id/stats",
            get(stats_handler::<S, D>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct CastVoteRequest {
    pub(crate) candidate_id: String,
    pub(crate) employee_id: String,
    pub(crate) decision: VoteDecision,
    #[serde(default)]
    pub(crate) reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModifyVoteRequest {
    employee_id: String,
    decision: VoteDecision,
    #[serde(default)]
    reason: Option<String>,
}

pub(crate) async fn cast_handler<S, D>(
    State(service): State<Arc<BallotService<S, D>>>,
    Path(campaign_id): Path<String>,
    axum::Json(request): axum::Json<CastVoteRequest>,
) -> Response
where
    S: GovernanceStore + 'static,
    D: EmployeeDirectory + 'static,
{
    let result = service.cast_vote(
        &CampaignId(campaign_id),
        &CandidateId(request.candidate_id),
        &EmployeeId(request.employee_id),
        request.decision,
        request.reason,
        Utc::now(),
    );

    match result {
        Ok(vote) => {
            let payload = json!({
                "vote_id": vote.id.0,
                "decision": vote.current_decision.label(),
                "voted_at": vote.voted_at,
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(error) => ballot_error_response(error),
    }
}

pub(crate) async fn modify_handler<S, D>(
    State(service): State<Arc<BallotService<S, D>>>,
    Path(vote_id): Path<String>,
    axum::Json(request): axum::Json<ModifyVoteRequest>,
) -> Response
where
    S: GovernanceStore + 'static,
    D: EmployeeDirectory + 'static,
{
    let result = service.modify_vote(
        &VoteId(vote_id),
        &EmployeeId(request.employee_id),
        request.decision,
        request.reason,
        Utc::now(),
    );

    match result {
        Ok(vote) => {
            let payload = json!({
                "vote_id": vote.id.0,
                "decision": vote.current_decision.label(),
                "modification_count": vote.modification_count,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => ballot_error_response(error),
    }
}

pub(crate) async fn stats_handler<S, D>(
    State(service): State<Arc<BallotService<S, D>>>,
    Path(campaign_id): Path<String>,
) -> Response
where
    S: GovernanceStore + 'static,
    D: EmployeeDirectory + 'static,
{
    match service.campaign_stats(&CampaignId(campaign_id), Utc::now()) {
        Ok(stats) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Err(error) => ballot_error_response(error),
    }
}

fn ballot_error_response(error: BallotError) -> Response {
    let status = match &error {
        BallotError::CampaignNotFound
        | BallotError::CandidateNotFound
        | BallotError::VoteNotFound => StatusCode::NOT_FOUND,
        BallotError::AlreadyVoted
        | BallotError::CampaignNotActive
        | BallotError::ModificationsDisabled
        | BallotError::ModificationLimitReached
        | BallotError::ModificationConflict => StatusCode::CONFLICT,
        BallotError::NotEligible(_) | BallotError::VoterUnknown => StatusCode::UNPROCESSABLE_ENTITY,
        BallotError::NotVoteOwner => StatusCode::FORBIDDEN,
        BallotError::Store(_) | BallotError::Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
