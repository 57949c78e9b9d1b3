//! Whole-ledger endpoints: read, settings, onboarding and wipe.

use api_types::{
    ledger::{LedgerView, MetricsView},
    settings::Settings,
};
use axum::{Extension, Json, extract::State};
use chrono::Utc;
use engine::{UserSettings, ops};

use crate::{ServerError, server::ServerState, user, views};

pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<LedgerView>, ServerError> {
    let now = Utc::now();
    let ledger = state.engine.sync(&user.username, now).await?;
    Ok(Json(views::ledger(ledger, now)))
}

pub async fn metrics(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<MetricsView>, ServerError> {
    let now = Utc::now();
    let ledger = state.engine.sync(&user.username, now).await?;
    Ok(Json(views::metrics(&ledger.document, ledger.metrics, now)))
}

pub async fn settings(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<Settings>,
) -> Result<Json<LedgerView>, ServerError> {
    if payload.currency.trim().is_empty() {
        return Err(ServerError::Generic("currency is required".to_string()));
    }
    let settings = UserSettings {
        currency: payload.currency,
        language: payload.language,
        country: payload.country,
    };

    let now = Utc::now();
    let ledger = state
        .engine
        .mutate(&user.username, now, |doc, _| {
            Ok(ops::update_settings(doc, settings))
        })
        .await?;
    Ok(Json(views::ledger(ledger, now)))
}

pub async fn complete_onboarding(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<LedgerView>, ServerError> {
    let now = Utc::now();
    let ledger = state
        .engine
        .mutate(&user.username, now, |doc, _| Ok(ops::complete_onboarding(doc)))
        .await?;
    Ok(Json(views::ledger(ledger, now)))
}

pub async fn wipe(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<LedgerView>, ServerError> {
    let now = Utc::now();
    let ledger = state
        .engine
        .mutate(&user.username, now, |doc, _| Ok(ops::wipe(doc)))
        .await?;
    tracing::info!(username = user.username, "ledger wiped");
    Ok(Json(views::ledger(ledger, now)))
}
