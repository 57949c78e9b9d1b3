//! Category registry.
//!
//! A handful of category names carry ledger semantics (income credits,
//! materialized bills, the emergency fund pot, the investments line). They are
//! modelled as dedicated variants so the engine never compares raw strings;
//! everything else is a user-defined [`Category::Named`] budget line.

use std::fmt;

use serde::{Deserialize, Serialize};

const INCOME: &str = "Income";
const BILLS: &str = "Bills";
const EMERGENCY_FUND: &str = "Emergency Fund";
const INVESTMENTS: &str = "Investments";
const INVESTMENTS_ALIAS: &str = "Savings & Investments";

/// Catch-all line that absorbs rounding remainders of budget proposals.
pub const MISCELLANEOUS: &str = "Miscellaneous";

/// Categories shipped with a new ledger; they cannot be deleted.
pub const DEFAULT_CATEGORIES: [&str; 9] = [
    "Groceries",
    "Eating Out",
    "Transportation",
    "Shopping",
    "Leisure & Events",
    "Health & Beauty",
    MISCELLANEOUS,
    INVESTMENTS,
    EMERGENCY_FUND,
];

/// A transaction or budget category.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    /// Credits, either materialized from an income source or one-off.
    Income,
    /// Debits materialized from recurring bills.
    Bills,
    /// The emergency fund pot.
    EmergencyFund,
    /// The investments budget line (`"Savings & Investments"` is an alias).
    Investments,
    Named(String),
}

impl Category {
    /// Builds a category from user input, resolving reserved names and
    /// aliases.
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            INCOME => Self::Income,
            BILLS => Self::Bills,
            EMERGENCY_FUND => Self::EmergencyFund,
            INVESTMENTS | INVESTMENTS_ALIAS => Self::Investments,
            other => Self::Named(other.to_string()),
        }
    }

    /// Canonical display name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Income => INCOME,
            Self::Bills => BILLS,
            Self::EmergencyFund => EMERGENCY_FUND,
            Self::Investments => INVESTMENTS,
            Self::Named(name) => name.as_str(),
        }
    }

    /// `Income` and `Bills` are never budget lines: they only tag
    /// transactions.
    #[must_use]
    pub fn is_ledger_only(&self) -> bool {
        matches!(self, Self::Income | Self::Bills)
    }

    /// Default categories cannot be deleted.
    #[must_use]
    pub fn is_protected(&self) -> bool {
        DEFAULT_CATEGORIES.contains(&self.as_str())
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        match Self::parse(&value) {
            Self::Named(_) => Self::Named(value.trim().to_string()),
            reserved => reserved,
        }
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        match value {
            Category::Named(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
