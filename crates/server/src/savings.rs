//! Savings goals and the emergency fund plan.

use api_types::{
    goal::{EmergencyPlan, GoalNew, GoalUpdate},
    ledger::LedgerView,
    recurring::Created,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{GoalInput, Money, ops};

use crate::{ServerError, server::ServerState, user, views};

pub async fn goal_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<GoalNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let mut input = GoalInput::new(payload.name, Money::new(payload.target_amount_minor));
    if let Some(date) = payload.target_date {
        input = input.target_date(date);
    }

    let mut created = None;
    state
        .engine
        .mutate(&user.username, Utc::now(), |doc, _| {
            let (next, id) = ops::create_goal(doc, input)?;
            created = Some(id);
            Ok(next)
        })
        .await?;
    let id = created.ok_or_else(|| ServerError::Generic("goal not created".to_string()))?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

pub async fn goal_update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<GoalUpdate>,
) -> Result<Json<LedgerView>, ServerError> {
    let now = Utc::now();
    let ledger = state
        .engine
        .mutate(&user.username, now, |doc, _| {
            ops::update_goal(
                doc,
                &id,
                Money::new(payload.target_amount_minor),
                payload.target_date,
            )
        })
        .await?;
    Ok(Json(views::ledger(ledger, now)))
}

pub async fn goal_remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<LedgerView>, ServerError> {
    let now = Utc::now();
    let ledger = state
        .engine
        .mutate(&user.username, now, |doc, _| ops::delete_goal(doc, &id))
        .await?;
    Ok(Json(views::ledger(ledger, now)))
}

pub async fn emergency_plan(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<EmergencyPlan>,
) -> Result<Json<LedgerView>, ServerError> {
    let now = Utc::now();
    let ledger = state
        .engine
        .mutate(&user.username, now, |doc, _| {
            ops::update_emergency_plan(doc, Money::new(payload.target_minor), payload.deadline)
        })
        .await?;
    Ok(Json(views::ledger(ledger, now)))
}
