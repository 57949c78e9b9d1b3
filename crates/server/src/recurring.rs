//! Bills and income sources.

use api_types::{
    ledger::LedgerView,
    recurring::{Created, Recurring},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{Money, RecurringInput, ops};

use crate::{ServerError, server::ServerState, user, views};

fn input(payload: Recurring) -> RecurringInput {
    RecurringInput::new(
        payload.name,
        Money::new(payload.amount_minor),
        payload.day_of_month,
    )
}

pub async fn bill_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<Recurring>,
) -> Result<(StatusCode, Json<LedgerView>), ServerError> {
    let now = Utc::now();
    let ledger = state
        .engine
        .mutate(&user.username, now, |doc, metrics| {
            ops::add_bill(doc, metrics, input(payload))
        })
        .await?;
    Ok((StatusCode::CREATED, Json(views::ledger(ledger, now))))
}

pub async fn bill_update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(name): Path<String>,
    Json(payload): Json<Recurring>,
) -> Result<Json<LedgerView>, ServerError> {
    let now = Utc::now();
    let ledger = state
        .engine
        .mutate(&user.username, now, |doc, metrics| {
            ops::update_bill(doc, metrics, &name, input(payload), now)
        })
        .await?;
    Ok(Json(views::ledger(ledger, now)))
}

pub async fn bill_remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(name): Path<String>,
) -> Result<Json<LedgerView>, ServerError> {
    let now = Utc::now();
    let ledger = state
        .engine
        .mutate(&user.username, now, |doc, _| ops::remove_bill(doc, &name, now))
        .await?;
    Ok(Json(views::ledger(ledger, now)))
}

pub async fn income_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<Recurring>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let mut created = None;
    state
        .engine
        .mutate(&user.username, Utc::now(), |doc, _| {
            let (next, id) = ops::add_income_source(doc, input(payload))?;
            created = Some(id);
            Ok(next)
        })
        .await?;
    let id = created.ok_or_else(|| ServerError::Generic("income source not created".to_string()))?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

pub async fn income_update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<Recurring>,
) -> Result<Json<LedgerView>, ServerError> {
    let now = Utc::now();
    let ledger = state
        .engine
        .mutate(&user.username, now, |doc, _| {
            ops::update_income_source(doc, &id, input(payload), now)
        })
        .await?;
    Ok(Json(views::ledger(ledger, now)))
}

pub async fn income_remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<LedgerView>, ServerError> {
    let now = Utc::now();
    let ledger = state
        .engine
        .mutate(&user.username, now, |doc, _| {
            ops::remove_income_source(doc, &id, now)
        })
        .await?;
    Ok(Json(views::ledger(ledger, now)))
}
