use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use chrono::Utc;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError},
};

use crate::{
    GeminiAdvisor, advice, budget, ledger, recurring, savings, transactions, user,
};
use engine::{Engine, SqliteStore};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine<SqliteStore>>,
    pub db: DatabaseConnection,
    pub advisor: Option<GeminiAdvisor>,
    listening: Arc<Mutex<HashSet<String>>>,
}

impl ServerState {
    pub fn new(
        engine: Engine<SqliteStore>,
        db: DatabaseConnection,
        advisor: Option<GeminiAdvisor>,
    ) -> Self {
        Self {
            engine: Arc::new(engine),
            db,
            advisor,
            listening: Arc::default(),
        }
    }

    /// Start the change listener of `username` unless it already runs.
    fn watch(&self, username: &str) {
        let fresh = self
            .listening
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(username.to_string());
        if !fresh {
            return;
        }

        let engine = Arc::clone(&self.engine);
        let listening = Arc::clone(&self.listening);
        let username = username.to_string();
        tokio::spawn(async move {
            tracing::debug!(username, "listening for ledger changes");
            if let Err(err) = engine.listen(&username, Utc::now).await {
                tracing::error!(username, "ledger listener stopped: {err}");
            }
            listening
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&username);
        });
    }
}

async fn auth(
    auth_header: TypedHeader<Authorization<Basic>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user: Option<user::Model> = user::Entity::find()
        .filter(user::Column::Username.eq(auth_header.username()))
        .filter(user::Column::Password.eq(auth_header.password()))
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let Some(user) = user else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    state.watch(&user.username);
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/ledger", get(ledger::get))
        .route("/metrics", get(ledger::metrics))
        .route("/settings", put(ledger::settings))
        .route("/onboarding", post(ledger::complete_onboarding))
        .route("/wipe", post(ledger::wipe))
        .route("/transactions", post(transactions::create))
        .route(
            "/transactions/{id}",
            axum::routing::patch(transactions::update).delete(transactions::remove),
        )
        .route("/deposits", post(transactions::deposit))
        .route("/allocations/{category}", put(budget::allocate))
        .route("/categories", post(budget::create_category))
        .route(
            "/categories/{name}",
            axum::routing::delete(budget::delete_category),
        )
        .route("/categories/{name}/visibility", post(budget::visibility))
        .route("/bills", post(recurring::bill_new))
        .route(
            "/bills/{name}",
            axum::routing::patch(recurring::bill_update).delete(recurring::bill_remove),
        )
        .route("/income", post(recurring::income_new))
        .route(
            "/income/{id}",
            axum::routing::patch(recurring::income_update).delete(recurring::income_remove),
        )
        .route("/goals", post(savings::goal_new))
        .route(
            "/goals/{id}",
            axum::routing::patch(savings::goal_update).delete(savings::goal_remove),
        )
        .route("/emergency", put(savings::emergency_plan))
        .route("/advice/budget", post(advice::budget))
        .route("/advice/budget/apply", post(advice::budget_apply))
        .route("/advice/emergency", post(advice::emergency))
        .route("/advice/emergency/apply", post(advice::emergency_apply))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run(state: ServerState, address: &str) {
    let listener = match tokio::net::TcpListener::bind(address).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {address}: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(state, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(state, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
