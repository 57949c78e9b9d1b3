//! Transactions API endpoints

use api_types::{
    ledger::LedgerView,
    transaction::{DepositNew, TransactionNew, TransactionUpdate},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{DepositInput, Money, TransactionAmend, TransactionInput, ops};

use crate::{ServerError, server::ServerState, user, views};

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<LedgerView>), ServerError> {
    let now = Utc::now();
    let timestamp = payload.timestamp.map_or(now, |ts| ts.with_timezone(&Utc));
    let mut input = TransactionInput::new(
        payload.category,
        Money::new(payload.amount_minor),
        timestamp,
    );
    if let Some(description) = payload.description {
        input = input.description(description);
    }

    let ledger = state
        .engine
        .mutate(&user.username, now, |doc, metrics| {
            ops::propose_transaction(doc, metrics, input)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(views::ledger(ledger, now))))
}

pub async fn deposit(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<DepositNew>,
) -> Result<(StatusCode, Json<LedgerView>), ServerError> {
    let now = Utc::now();
    let timestamp = payload.timestamp.map_or(now, |ts| ts.with_timezone(&Utc));
    let mut input = DepositInput::new(
        payload.category,
        Money::new(payload.amount_minor),
        timestamp,
    );
    if let Some(description) = payload.description {
        input = input.description(description);
    }

    let ledger = state
        .engine
        .mutate(&user.username, now, |doc, metrics| {
            ops::propose_deposit(doc, metrics, input)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(views::ledger(ledger, now))))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<TransactionUpdate>,
) -> Result<Json<LedgerView>, ServerError> {
    if payload.amount_minor.is_none()
        && payload.description.is_none()
        && payload.timestamp.is_none()
    {
        return Err(ServerError::Generic(
            "provide at least one of amount_minor, description or timestamp".to_string(),
        ));
    }

    let mut amend = TransactionAmend::new();
    if let Some(amount) = payload.amount_minor {
        amend = amend.amount(Money::new(amount));
    }
    if let Some(description) = payload.description {
        amend = amend.description(description);
    }
    if let Some(timestamp) = payload.timestamp {
        amend = amend.timestamp(timestamp.with_timezone(&Utc));
    }

    let now = Utc::now();
    let ledger = state
        .engine
        .mutate(&user.username, now, |doc, metrics| {
            ops::amend_transaction(doc, metrics, &id, amend, now)
        })
        .await?;
    Ok(Json(views::ledger(ledger, now)))
}

pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<LedgerView>, ServerError> {
    let now = Utc::now();
    let ledger = state
        .engine
        .mutate(&user.username, now, |doc, metrics| {
            ops::remove_transaction(doc, metrics, &id)
        })
        .await?;
    Ok(Json(views::ledger(ledger, now)))
}
