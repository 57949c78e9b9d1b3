//! Budget ledger and metrics engine.
//!
//! The engine owns one [`LedgerDocument`] per user and three pure
//! transformations over it:
//!
//! - [`materialize_recurring`] books due bills and income exactly once per
//!   month;
//! - [`apply_rollover`] closes the previous month, carrying unspent cash and
//!   per-category under/overspend;
//! - [`derive_metrics`] computes every figure the views and validators use.
//!
//! User changes go through the validators in [`ops`]. [`Engine`] ties these
//! together over a [`SnapshotStore`].

pub use advisory::{
    Advisor, BudgetAdviceRequest, BudgetProposal, EmergencyAdviceRequest, EmergencyProposal,
    apply_budget_proposal, apply_emergency_proposal, parse_budget_proposal,
    parse_emergency_proposal, request_budget_proposal, request_emergency_proposal,
};
pub use categories::{Category, DEFAULT_CATEGORIES, MISCELLANEOUS};
pub use commands::{DepositInput, GoalInput, RecurringInput, TransactionAmend, TransactionInput};
pub use document::{Bill, Goal, IncomeSource, LedgerDocument, Transaction, UserSettings};
pub use error::{AdvisoryError, EngineError, Rejection};
pub use metrics::{CategorySpend, Metrics, MonthRecap, derive_metrics};
pub use money::Money;
pub use recurring::{bill_entry_id, income_entry_id, materialize_recurring};
pub use rollover::apply_rollover;
pub use service::{Engine, EngineBuilder, Ledger};
pub use store::{ChangeFeed, MemoryStore, Snapshot, SnapshotStore, SqliteStore};

mod advisory;
mod categories;
mod commands;
mod document;
mod error;
mod metrics;
mod money;
pub mod ops;
mod recurring;
mod rollover;
mod service;
mod store;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
type ResultRejection<T> = Result<T, Rejection>;

/// Result of a housekeeping step: the next document and whether it differs
/// from the input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub document: LedgerDocument,
    pub changed: bool,
}

impl Outcome {
    pub(crate) fn unchanged(document: &LedgerDocument) -> Self {
        Self {
            document: document.clone(),
            changed: false,
        }
    }

    pub(crate) fn changed(document: LedgerDocument) -> Self {
        Self {
            document,
            changed: true,
        }
    }
}
