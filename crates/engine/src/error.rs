//! The module contains the errors the engine can throw.
//!
//! The errors are:
//!
//! - [`Rejection`] returned by the mutation validators when a proposed change
//!   would break a ledger invariant. Always recoverable: the document is left
//!   untouched and the reason carries the numeric limit that was violated.
//! - [`AdvisoryError`] returned when the suggestion collaborator fails or
//!   answers with something that cannot be turned into a proposal.
//! - [`EngineError`] wrapping the above plus store failures ([`Conflict`],
//!   database and serialization errors).
//!
//!  [`Conflict`]: EngineError::Conflict
use sea_orm::DbErr;
use thiserror::Error;

use crate::{Category, Money};

/// Reasons a proposed mutation is refused.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    #[error("amount must be > 0, got {0}")]
    NonPositiveAmount(Money),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("exceeds budget for \"{category}\": requested {requested}, only {available} left")]
    ExceedsBudget {
        category: Category,
        requested: Money,
        available: Money,
    },
    #[error("insufficient funds in \"{category}\": requested {requested}, balance is {available}")]
    ExceedsPot {
        category: Category,
        requested: Money,
        available: Money,
    },
    #[error(
        "exceeds monthly allocation for \"{category}\": requested {requested}, only {available} left"
    )]
    ExceedsMonthlyAllocation {
        category: Category,
        requested: Money,
        available: Money,
    },
    #[error("exceeds available cash: requested {requested}, only {available} unallocated")]
    ExceedsUnallocated { requested: Money, available: Money },
    #[error("category \"{category}\" is in use: {spent} spent this month")]
    CategoryInUse { category: Category, spent: Money },
    #[error("\"{0}\" is a default category and cannot be deleted")]
    ProtectedCategory(Category),
    #[error("\"{0}\" is reserved for recurring entries")]
    ReservedCategory(Category),
    #[error("\"{0}\" category not found!")]
    UnknownCategory(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Rejection {
    /// The numeric limit that was violated, if the rejection is a limit check.
    #[must_use]
    pub fn limit(&self) -> Option<Money> {
        match self {
            Self::ExceedsBudget { available, .. }
            | Self::ExceedsPot { available, .. }
            | Self::ExceedsMonthlyAllocation { available, .. }
            | Self::ExceedsUnallocated { available, .. } => Some(*available),
            Self::CategoryInUse { .. } | Self::NonPositiveAmount(_) => Some(Money::ZERO),
            _ => None,
        }
    }
}

/// Failures of the advisory text-generation collaborator.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum AdvisoryError {
    #[error("advisor unavailable: {0}")]
    Unavailable(String),
    #[error("advisor response unparseable: {0}")]
    Unparseable(String),
}

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Rejected(#[from] Rejection),
    #[error("ledger of \"{0}\" was replaced concurrently; reload and retry")]
    Conflict(String),
    #[error(transparent)]
    Advisory(#[from] AdvisoryError),
    #[error("invalid ledger document: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Rejected(a), Self::Rejected(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::Advisory(a), Self::Advisory(b)) => a == b,
            (Self::Serialization(a), Self::Serialization(b)) => a.to_string() == b.to_string(),
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
