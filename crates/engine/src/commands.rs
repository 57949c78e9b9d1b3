//! Command structs for ledger mutations.
//!
//! These types group the parameters of the validators in [`crate::ops`],
//! keeping call sites readable and avoiding long argument lists.

use chrono::{DateTime, NaiveDate, Utc};

use crate::{Category, Money};

/// Log an expense, a pot withdrawal or a one-time income.
#[derive(Clone, Debug)]
pub struct TransactionInput {
    pub category: Category,
    pub amount: Money,
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl TransactionInput {
    #[must_use]
    pub fn new(category: impl Into<Category>, amount: Money, timestamp: DateTime<Utc>) -> Self {
        Self {
            category: category.into(),
            amount,
            description: None,
            timestamp,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Move money into a goal or the emergency fund.
#[derive(Clone, Debug)]
pub struct DepositInput {
    pub category: Category,
    pub amount: Money,
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl DepositInput {
    #[must_use]
    pub fn new(category: impl Into<Category>, amount: Money, timestamp: DateTime<Utc>) -> Self {
        Self {
            category: category.into(),
            amount,
            description: None,
            timestamp,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Edit of a logged transaction. Unset fields are left as they are.
#[derive(Clone, Debug, Default)]
pub struct TransactionAmend {
    pub amount: Option<Money>,
    pub description: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl TransactionAmend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// A recurring item: bill or income source.
#[derive(Clone, Debug)]
pub struct RecurringInput {
    pub name: String,
    pub amount: Money,
    pub day_of_month: u32,
}

impl RecurringInput {
    #[must_use]
    pub fn new(name: impl Into<String>, amount: Money, day_of_month: u32) -> Self {
        Self {
            name: name.into(),
            amount,
            day_of_month,
        }
    }
}

/// Create a savings goal.
#[derive(Clone, Debug)]
pub struct GoalInput {
    pub name: String,
    pub target_amount: Money,
    pub target_date: Option<NaiveDate>,
}

impl GoalInput {
    #[must_use]
    pub fn new(name: impl Into<String>, target_amount: Money) -> Self {
        Self {
            name: name.into(),
            target_amount,
            target_date: None,
        }
    }

    #[must_use]
    pub fn target_date(mut self, target_date: NaiveDate) -> Self {
        self.target_date = Some(target_date);
        self
    }
}
