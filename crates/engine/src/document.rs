//! The ledger document: the single per-user aggregate every component reads
//! and writes as a whole.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Category, Money, Rejection, ResultRejection,
    categories::DEFAULT_CATEGORIES,
    util::YearMonth,
};

/// A recurring credit, materialized into an `Income` transaction each month.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeSource {
    pub id: String,
    pub name: String,
    pub amount: Money,
    pub day_of_month: u32,
}

/// A recurring debit, materialized into a `Bills` transaction each month.
/// The bill name is the key in [`LedgerDocument::bills`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    pub amount: Money,
    pub day_of_month: u32,
}

/// A savings goal. Its name doubles as a budget category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub name: String,
    pub target_amount: Money,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    /// Persistent balance, untouched by the monthly rollover.
    #[serde(default)]
    pub current_amount: Money,
}

impl Goal {
    #[must_use]
    pub fn category(&self) -> Category {
        Category::from(self.name.as_str())
    }

    /// A goal without a target counts as reached once it holds one whole unit.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        let threshold = if self.target_amount.is_positive() {
            self.target_amount
        } else {
            Money::from_major(1)
        };
        self.current_amount >= threshold
    }
}

/// A ledger entry. Amounts are always positive; the category decides whether
/// it is a credit (`Income`) or a debit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub amount: Money,
    pub category: Category,
    #[serde(default)]
    pub description: String,
    pub timestamp: DateTime<Utc>,
    /// Materialized from a recurring bill or income source.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_system: bool,
    /// A transfer into a goal or the emergency fund, not spending.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_contribution: bool,
}

impl Transaction {
    pub(crate) fn in_month(&self, month: YearMonth) -> bool {
        month.contains(self.timestamp)
    }
}

/// Presentation preferences. Never read by the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub currency: String,
    pub language: String,
    pub country: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            currency: "£".to_string(),
            language: "en".to_string(),
            country: "United Kingdom".to_string(),
        }
    }
}

/// How a category participates in the budget.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Line<'a> {
    Income,
    Bills,
    Emergency,
    Goal(&'a Goal),
    Plain,
}

impl Line<'_> {
    /// Goals and the emergency fund hold a balance across months.
    pub(crate) fn is_pot(self) -> bool {
        matches!(self, Self::Emergency | Self::Goal(_))
    }
}

/// The full persisted state of one user's budget.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerDocument {
    pub income_sources: Vec<IncomeSource>,
    pub bills: BTreeMap<String, Bill>,
    pub categories: Vec<Category>,
    pub hidden_categories: BTreeSet<Category>,
    pub base_allocations: BTreeMap<Category, Money>,
    pub allocations: BTreeMap<Category, Money>,
    /// Display counters, zeroed on rollover.
    pub spent: BTreeMap<Category, Money>,
    /// Newest first.
    pub transactions: Vec<Transaction>,
    pub custom_goals: Vec<Goal>,
    pub emergency_deposits: Money,
    pub emergency_target: Money,
    pub emergency_deadline: Option<NaiveDate>,
    pub income_rollover: Money,
    /// Month (1-12) whose rollover has been applied; 0 when never processed.
    pub last_processed_month: u32,
    pub onboarding_complete: bool,
    pub user_settings: UserSettings,
}

impl LedgerDocument {
    /// The document a new user starts with.
    #[must_use]
    pub fn template(now: DateTime<Utc>) -> Self {
        let plan: [i64; 9] = [350, 150, 120, 100, 100, 50, 50, 200, 100];
        let categories: Vec<Category> = DEFAULT_CATEGORIES.iter().map(|&c| c.into()).collect();
        let allocations: BTreeMap<Category, Money> = categories
            .iter()
            .cloned()
            .zip(plan.into_iter().map(Money::from_major))
            .collect();

        Self {
            categories,
            base_allocations: allocations.clone(),
            allocations,
            emergency_target: Money::from_major(5000),
            last_processed_month: now.month(),
            ..Self::default()
        }
    }

    /// Whether the category is registered (hidden or not).
    #[must_use]
    pub fn has_category(&self, category: &Category) -> bool {
        self.categories.contains(category)
    }

    #[must_use]
    pub fn is_hidden(&self, category: &Category) -> bool {
        self.hidden_categories.contains(category)
    }

    /// Registered categories that are not hidden, in display order.
    pub fn active_categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter().filter(|c| !self.is_hidden(c))
    }

    #[must_use]
    pub fn goal(&self, category: &Category) -> Option<&Goal> {
        self.custom_goals.iter().find(|g| &g.category() == category)
    }

    pub(crate) fn goal_mut(&mut self, category: &Category) -> Option<&mut Goal> {
        self.custom_goals
            .iter_mut()
            .find(|g| &g.category() == category)
    }

    #[must_use]
    pub fn has_transaction(&self, id: &str) -> bool {
        self.transactions.iter().any(|t| t.id == id)
    }

    /// Effective allocation of a registered category.
    #[must_use]
    pub fn allocation(&self, category: &Category) -> Money {
        self.allocations.get(category).copied().unwrap_or_default()
    }

    /// Plan total of all recurring bills.
    #[must_use]
    pub fn bills_total(&self) -> Money {
        self.bills.values().map(|b| b.amount).sum()
    }

    pub(crate) fn line(&self, category: &Category) -> Line<'_> {
        match category {
            Category::Income => Line::Income,
            Category::Bills => Line::Bills,
            Category::EmergencyFund => Line::Emergency,
            other => match self.goal(other) {
                Some(goal) => Line::Goal(goal),
                None => Line::Plain,
            },
        }
    }

    /// Registered budget line or a rejection naming it.
    pub(crate) fn require_category(&self, category: &Category) -> ResultRejection<()> {
        if category.is_ledger_only() || self.has_category(category) {
            Ok(())
        } else {
            Err(Rejection::UnknownCategory(category.to_string()))
        }
    }

    /// Summed magnitude of every stored amount, `None` on overflow.
    pub(crate) fn volume(&self) -> Option<Money> {
        let goals = self
            .custom_goals
            .iter()
            .flat_map(|g| [g.target_amount, g.current_amount]);
        self.transactions
            .iter()
            .map(|t| t.amount)
            .chain(self.bills.values().map(|b| b.amount))
            .chain(self.income_sources.iter().map(|s| s.amount))
            .chain(self.allocations.values().copied())
            .chain(self.base_allocations.values().copied())
            .chain(self.spent.values().copied())
            .chain(goals)
            .chain([
                self.emergency_deposits,
                self.emergency_target,
                self.income_rollover,
            ])
            .try_fold(Money::ZERO, |total, amount| {
                total.checked_add(amount.checked_abs()?)
            })
    }

    pub(crate) fn require_capacity(&self) -> ResultRejection<()> {
        match self.volume() {
            Some(volume) if volume <= Money::LEDGER_CAPACITY => Ok(()),
            _ => Err(Rejection::InvalidAmount(
                "ledger totals exceed the supported range".to_string(),
            )),
        }
    }

    /// Check the structural invariants every successful mutation must keep.
    pub fn check_invariants(&self) -> ResultRejection<()> {
        let mut seen = BTreeSet::new();
        for category in &self.categories {
            if category.is_ledger_only() {
                return Err(Rejection::ReservedCategory(category.clone()));
            }
            if !seen.insert(category) {
                return Err(Rejection::ExistingKey(category.to_string()));
            }
        }
        for category in self.allocations.keys().chain(self.base_allocations.keys()) {
            if !self.has_category(category) {
                return Err(Rejection::UnknownCategory(category.to_string()));
            }
        }
        // Effective allocations may be negative after a rollover carried an
        // overspend; the plan itself never is.
        if let Some((category, amount)) =
            self.base_allocations.iter().find(|(_, a)| a.is_negative())
        {
            return Err(Rejection::InvalidAmount(format!(
                "planned allocation of \"{category}\" is negative: {amount}"
            )));
        }
        self.require_capacity()?;
        let mut ids = BTreeSet::new();
        for tx in &self.transactions {
            if !ids.insert(tx.id.as_str()) {
                return Err(Rejection::ExistingKey(tx.id.clone()));
            }
            if !tx.amount.is_positive() {
                return Err(Rejection::NonPositiveAmount(tx.amount));
            }
        }
        Ok(())
    }
}
