//! Advisory proposals: request one from the advisor, or apply a reviewed one.

use api_types::{advice, ledger::LedgerView};
use axum::{Extension, Json, extract::State};
use chrono::Utc;
use engine::{
    EngineError, apply_budget_proposal, apply_emergency_proposal, request_budget_proposal,
    request_emergency_proposal,
};

use crate::{GeminiAdvisor, ServerError, server::ServerState, user, views};

fn advisor(state: &ServerState) -> Result<&GeminiAdvisor, ServerError> {
    state.advisor.as_ref().ok_or(ServerError::AdvisorMissing)
}

pub async fn budget(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<advice::BudgetProposal>, ServerError> {
    let advisor = advisor(&state)?;
    let ledger = state.engine.sync(&user.username, Utc::now()).await?;
    let proposal = request_budget_proposal(advisor, &ledger.document, &ledger.metrics)
        .await
        .map_err(EngineError::from)?;
    Ok(Json(views::budget_proposal(proposal)))
}

pub async fn budget_apply(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<advice::BudgetProposal>,
) -> Result<Json<LedgerView>, ServerError> {
    let proposal = views::from_budget_proposal(payload);
    let now = Utc::now();
    let ledger = state
        .engine
        .mutate(&user.username, now, |doc, _| {
            apply_budget_proposal(doc, &proposal, now)
        })
        .await?;
    Ok(Json(views::ledger(ledger, now)))
}

pub async fn emergency(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<advice::EmergencyProposal>, ServerError> {
    let advisor = advisor(&state)?;
    let ledger = state.engine.sync(&user.username, Utc::now()).await?;
    let proposal = request_emergency_proposal(advisor, &ledger.document, &ledger.metrics)
        .await
        .map_err(EngineError::from)?;
    Ok(Json(views::emergency_proposal(proposal)))
}

pub async fn emergency_apply(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<advice::EmergencyProposal>,
) -> Result<Json<LedgerView>, ServerError> {
    let proposal = views::from_emergency_proposal(payload);
    let now = Utc::now();
    let ledger = state
        .engine
        .mutate(&user.username, now, |doc, _| {
            apply_emergency_proposal(doc, &proposal)
        })
        .await?;
    Ok(Json(views::ledger(ledger, now)))
}
