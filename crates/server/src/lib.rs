use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::{EngineError, Rejection};

use serde::Serialize;
pub use advisor::{DEFAULT_ENDPOINT, DEFAULT_MODEL, GeminiAdvisor};
pub use server::{ServerState, router, run, run_with_listener, spawn_with_listener};

mod advice;
mod advisor;
mod budget;
mod ledger;
mod recurring;
mod savings;
mod server;
mod transactions;
mod user;
mod views;

pub mod types {
    pub use api_types::{
        advice, allocation, category, goal, ledger, recurring, settings, transaction,
    };
}

#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    /// Advice was requested but no advisor is configured.
    AdvisorMissing,
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
    /// Violated limit in minor units, for limit rejections.
    #[serde(skip_serializing_if = "Option::is_none")]
    limit_minor: Option<i64>,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Rejected(Rejection::KeyNotFound(_)) => StatusCode::NOT_FOUND,
        EngineError::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::Conflict(_) => StatusCode::CONFLICT,
        EngineError::Advisory(_) => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::Serialization(_) | EngineError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::Serialization(json_err) => {
            tracing::error!("stored ledger unreadable: {json_err}");
            "internal server error".to_string()
        }
        EngineError::Advisory(advisory_err) => {
            tracing::warn!("{advisory_err}");
            advisory_err.to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error, limit_minor) = match self {
            ServerError::Engine(err) => {
                let limit = match &err {
                    EngineError::Rejected(rejection) => rejection.limit().map(|m| m.cents()),
                    _ => None,
                };
                (status_for_engine_error(&err), message_for_engine_error(err), limit)
            }
            ServerError::AdvisorMissing => (
                StatusCode::SERVICE_UNAVAILABLE,
                "no advisor configured".to_string(),
                None,
            ),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err, None),
        };

        (status, Json(Error { error, limit_minor })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
