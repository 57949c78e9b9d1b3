//! Allocation and category endpoints.

use api_types::{
    allocation::AllocationUpdate,
    category::{CategoryCreate, Visibility},
    ledger::LedgerView,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{Category, Money, ops};

use crate::{ServerError, server::ServerState, user, views};

pub async fn allocate(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(category): Path<String>,
    Json(payload): Json<AllocationUpdate>,
) -> Result<Json<LedgerView>, ServerError> {
    let category = Category::from(category);
    let now = Utc::now();
    let ledger = state
        .engine
        .mutate(&user.username, now, |doc, metrics| {
            ops::propose_allocation_edit(
                doc,
                metrics,
                &category,
                Money::new(payload.remaining_minor),
            )
        })
        .await?;
    Ok(Json(views::ledger(ledger, now)))
}

pub async fn create_category(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<CategoryCreate>,
) -> Result<(StatusCode, Json<LedgerView>), ServerError> {
    let now = Utc::now();
    let ledger = state
        .engine
        .mutate(&user.username, now, |doc, _| {
            ops::add_category(doc, &payload.name)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(views::ledger(ledger, now))))
}

pub async fn visibility(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(name): Path<String>,
    Json(payload): Json<Visibility>,
) -> Result<Json<LedgerView>, ServerError> {
    let category = Category::from(name);
    let now = Utc::now();
    let ledger = state
        .engine
        .mutate(&user.username, now, |doc, metrics| {
            if payload.hidden {
                ops::hide_category(doc, metrics, &category)
            } else {
                ops::unhide_category(doc, &category)
            }
        })
        .await?;
    Ok(Json(views::ledger(ledger, now)))
}

pub async fn delete_category(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(name): Path<String>,
) -> Result<Json<LedgerView>, ServerError> {
    let category = Category::from(name);
    let now = Utc::now();
    let ledger = state
        .engine
        .mutate(&user.username, now, |doc, metrics| {
            ops::delete_category(doc, metrics, &category)
        })
        .await?;
    Ok(Json(views::ledger(ledger, now)))
}
