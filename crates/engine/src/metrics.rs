//! Derived metrics.
//!
//! [`derive_metrics`] is a pure function of the document and the clock. Every
//! view and every validator reads the same snapshot, so the figures below are
//! the single definition of "spent", "remaining" and "free cash".
//!
//! The headline figure is built so that the budget equation always holds:
//!
//! ```text
//! effective = bills_total + total_remaining_allocated + total_pot
//!           + total_variable_spending + unallocated
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Category, LedgerDocument, Money, Transaction,
    document::Line,
    rollover::closing_totals,
    util::YearMonth,
};

/// Amount spent in one category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySpend {
    pub category: Category,
    pub amount: Money,
}

/// Recap of the previous calendar month. Derived, never persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthRecap {
    pub year: i32,
    pub month: u32,
    /// Carry currently folded into this month's effective income.
    pub rollover: Money,
    pub total_income: Money,
    /// Bills and category withdrawals, contributions excluded.
    pub total_spent: Money,
    /// Discretionary spend per category (no bills, funds or investments).
    pub spent_by_category: BTreeMap<Category, Money>,
    pub invested: Money,
    pub emergency_added: Money,
    pub savings_added: Money,
    /// Names of the goals whose balance reached their target.
    pub completed_goals: Vec<String>,
    pub top_category: Option<CategorySpend>,
    pub bottom_category: Option<CategorySpend>,
}

/// Snapshot of every figure the views and validators depend on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    /// Income credited this month.
    pub total_income: Money,
    /// `total_income + income_rollover`.
    pub effective: Money,
    /// Plan total of the recurring bills.
    pub bills_total: Money,
    pub emergency_balance: Money,
    pub goals_balance: Money,
    /// `emergency_balance + goals_balance`.
    pub total_pot: Money,
    /// This month's spend per budget line; contributions count, pot
    /// withdrawals do not.
    pub real_spent: BTreeMap<Category, Money>,
    /// Cash outflow against budget lines; contributions excluded.
    pub total_variable_spending: Money,
    pub total_remaining_allocated: Money,
    /// Free cash not yet assigned. Negative when overcommitted.
    pub unallocated: Money,
    pub total_allocated: Money,
    pub total_allocated_spent: Money,
    pub allocated_remaining: Money,
    pub total_contributions: Money,
    pub total_spent: Money,
    pub savings_spent: Money,
    pub savings_allocated: Money,
    /// Contributions into the emergency fund this month.
    pub emergency_contributed: Money,
    pub emergency_allocated: Money,
    pub total_invested_all_time: Money,
    /// Cash that category allocations may be spread over.
    pub available_pool: Money,
    pub disposable_income: Money,
    pub previous_month: MonthRecap,
    /// Month the figures describe.
    #[serde(skip)]
    pub(crate) period: YearMonth,
}

impl Metrics {
    /// This month's real spend of a category.
    #[must_use]
    pub fn spent(&self, category: &Category) -> Money {
        self.real_spent.get(category).copied().unwrap_or_default()
    }

    /// Allocation left on a budget line; negative when overspent.
    #[must_use]
    pub fn remaining(&self, document: &LedgerDocument, category: &Category) -> Money {
        document.allocation(category) - self.spent(category)
    }
}

fn sum<'a>(txs: impl IntoIterator<Item = &'a Transaction>) -> Money {
    txs.into_iter().map(|t| t.amount).sum()
}

/// Compute the metrics of `document` as seen at `now`.
#[must_use]
pub fn derive_metrics(document: &LedgerDocument, now: DateTime<Utc>) -> Metrics {
    let month = YearMonth::of(now);
    let this_month: Vec<&Transaction> = document
        .transactions
        .iter()
        .filter(|t| t.in_month(month))
        .collect();

    let total_income = sum(
        this_month
            .iter()
            .copied()
            .filter(|t| t.category == Category::Income),
    );
    let effective = total_income + document.income_rollover;
    let bills_total = document.bills_total();

    let emergency_withdrawals = sum(
        document
            .transactions
            .iter()
            .filter(|t| t.category == Category::EmergencyFund && !t.is_contribution),
    );
    let emergency_balance = document.emergency_deposits - emergency_withdrawals;
    let goals_balance: Money = document.custom_goals.iter().map(|g| g.current_amount).sum();
    let total_pot = emergency_balance + goals_balance;

    let mut real_spent: BTreeMap<Category, Money> = BTreeMap::new();
    let mut total_contributions = Money::ZERO;
    let mut total_variable_spending = Money::ZERO;
    for tx in &this_month {
        let line = document.line(&tx.category);
        if matches!(line, Line::Income | Line::Bills) {
            continue;
        }
        if !tx.is_contribution {
            total_variable_spending += tx.amount;
        }
        // Withdrawals reduce the pot directly, not a budget line.
        if line.is_pot() && !tx.is_contribution {
            continue;
        }
        if tx.is_contribution {
            total_contributions += tx.amount;
        }
        *real_spent.entry(tx.category.clone()).or_default() += tx.amount;
    }

    let total_remaining_allocated: Money = document
        .allocations
        .iter()
        .map(|(category, allocation)| {
            let spent = real_spent.get(category).copied().unwrap_or_default();
            (*allocation - spent).non_negative()
        })
        .sum();

    let unallocated =
        effective - bills_total - total_remaining_allocated - total_pot - total_variable_spending;

    let total_allocated: Money = document.allocations.values().sum();
    let total_allocated_spent: Money = real_spent.values().sum();
    let emergency_contributed = sum(
        this_month
            .iter()
            .copied()
            .filter(|t| t.category == Category::EmergencyFund && t.is_contribution),
    );
    let total_invested_all_time = sum(
        document
            .transactions
            .iter()
            .filter(|t| t.category == Category::Investments),
    );

    Metrics {
        total_income,
        effective,
        bills_total,
        emergency_balance,
        goals_balance,
        total_pot,
        total_variable_spending,
        total_remaining_allocated,
        unallocated,
        total_allocated,
        total_allocated_spent,
        allocated_remaining: total_allocated - total_allocated_spent,
        total_contributions,
        total_spent: (total_allocated_spent - total_contributions) + bills_total,
        savings_spent: real_spent
            .get(&Category::Investments)
            .copied()
            .unwrap_or_default(),
        savings_allocated: document.allocation(&Category::Investments),
        emergency_contributed,
        emergency_allocated: document.allocation(&Category::EmergencyFund),
        total_invested_all_time,
        available_pool: effective - bills_total - total_pot - total_variable_spending,
        disposable_income: total_income - bills_total,
        real_spent,
        previous_month: recap(document, month.previous()),
        period: month,
    }
}

fn recap(document: &LedgerDocument, month: YearMonth) -> MonthRecap {
    let totals = closing_totals(document, month);
    let mut recap = MonthRecap {
        year: month.year,
        month: month.month,
        rollover: document.income_rollover,
        total_income: totals.income,
        total_spent: totals.spend,
        ..MonthRecap::default()
    };

    // Log order of first appearance; ties for top and bottom go to the earlier.
    let mut order: Vec<&Category> = Vec::new();
    for tx in document.transactions.iter().filter(|t| t.in_month(month)) {
        match &tx.category {
            Category::Income | Category::Bills => {}
            Category::Investments => recap.invested += tx.amount,
            Category::EmergencyFund => {
                if tx.is_contribution {
                    recap.emergency_added += tx.amount;
                }
            }
            _ if tx.is_contribution => recap.savings_added += tx.amount,
            other => {
                if !order.contains(&other) {
                    order.push(other);
                }
                *recap.spent_by_category.entry(other.clone()).or_default() += tx.amount;
            }
        }
    }

    for category in order {
        let amount = recap.spent_by_category[category];
        let spend = || CategorySpend {
            category: category.clone(),
            amount,
        };
        if recap.top_category.as_ref().is_none_or(|top| amount > top.amount) {
            recap.top_category = Some(spend());
        }
        if recap
            .bottom_category
            .as_ref()
            .is_none_or(|bottom| amount < bottom.amount)
        {
            recap.bottom_category = Some(spend());
        }
    }

    recap.completed_goals = document
        .custom_goals
        .iter()
        .filter(|g| g.is_complete())
        .map(|g| g.name.clone())
        .collect();

    recap
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::{Bill, Goal};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 14, 10, 0, 0).unwrap()
    }

    fn tx(id: &str, amount: i64, category: &str, ts: DateTime<Utc>) -> Transaction {
        Transaction {
            id: id.to_string(),
            amount: Money::from_major(amount),
            category: Category::from(category),
            description: String::new(),
            timestamp: ts,
            is_system: false,
            is_contribution: false,
        }
    }

    fn contribution(id: &str, amount: i64, category: &str, ts: DateTime<Utc>) -> Transaction {
        Transaction {
            is_contribution: true,
            ..tx(id, amount, category, ts)
        }
    }

    fn holiday() -> Goal {
        Goal {
            id: "g1".to_string(),
            name: "Holiday".to_string(),
            target_amount: Money::from_major(1000),
            target_date: None,
            current_amount: Money::from_major(400),
        }
    }

    fn document() -> LedgerDocument {
        let mut doc = LedgerDocument::template(now());
        doc.bills.insert(
            "Rent".to_string(),
            Bill {
                amount: Money::from_major(800),
                day_of_month: 1,
            },
        );
        doc.custom_goals.push(holiday());
        doc.categories.push(Category::from("Holiday"));
        doc.allocations
            .insert(Category::from("Holiday"), Money::from_major(150));
        doc.base_allocations
            .insert(Category::from("Holiday"), Money::from_major(150));
        doc.emergency_deposits = Money::from_major(1000);
        doc.income_rollover = Money::from_major(120);
        doc.transactions = vec![
            tx("salary", 3000, "Income", now()),
            tx("rent", 800, "Bills", now()),
            tx("food", 50, "Groceries", now()),
            contribution("dep", 100, "Holiday", now()),
            tx("ticket", 30, "Holiday", now()),
            tx("boiler", 200, "Emergency Fund", now()),
            tx("etf", 75, "Investments", now()),
        ];
        doc
    }

    fn assert_budget_equation(m: &Metrics) {
        assert_eq!(
            m.total_remaining_allocated
                + m.bills_total
                + m.total_pot
                + m.total_variable_spending
                + m.unallocated,
            m.effective
        );
    }

    #[test]
    fn derives_current_month_figures() {
        let m = derive_metrics(&document(), now());

        assert_eq!(m.total_income, Money::from_major(3000));
        assert_eq!(m.effective, Money::from_major(3120));
        assert_eq!(m.bills_total, Money::from_major(800));
        assert_eq!(m.emergency_balance, Money::from_major(800));
        assert_eq!(m.goals_balance, Money::from_major(400));
        assert_eq!(m.total_pot, Money::from_major(1200));

        assert_eq!(m.spent(&Category::from("Groceries")), Money::from_major(50));
        // Deposit counts against the goal line, the withdrawal does not.
        assert_eq!(m.spent(&Category::from("Holiday")), Money::from_major(100));
        assert_eq!(m.spent(&Category::EmergencyFund), Money::ZERO);
        assert_eq!(m.savings_spent, Money::from_major(75));

        // food + ticket + boiler + etf
        assert_eq!(m.total_variable_spending, Money::from_major(355));
        assert_eq!(m.total_contributions, Money::from_major(100));
        assert_eq!(m.total_invested_all_time, Money::from_major(75));
        assert_budget_equation(&m);
    }

    #[test]
    fn remaining_allocations_never_go_negative() {
        let mut doc = document();
        doc.transactions
            .push(tx("feast", 400, "Eating Out", now()));
        let m = derive_metrics(&doc, now());
        // Eating Out: 150 allocated, 400 spent.
        assert_eq!(
            m.remaining(&doc, &Category::from("Eating Out")),
            Money::from_major(-250)
        );
        assert_budget_equation(&m);
    }

    #[test]
    fn emergency_balance_spans_all_time() {
        let mut doc = LedgerDocument::template(now());
        doc.emergency_deposits = Money::from_major(1000);
        doc.transactions = vec![tx(
            "old",
            200,
            "Emergency Fund",
            Utc.with_ymd_and_hms(2025, 11, 2, 0, 0, 0).unwrap(),
        )];
        let m = derive_metrics(&doc, now());
        assert_eq!(m.emergency_balance, Money::from_major(800));
    }

    #[test]
    fn empty_ledger_is_overcommitted_by_its_plan() {
        let doc = LedgerDocument::template(now());
        let m = derive_metrics(&doc, now());
        assert_eq!(m.total_allocated, Money::from_major(1220));
        assert_eq!(m.unallocated, Money::from_major(-1220));
        assert_budget_equation(&m);
    }

    #[test]
    fn recap_covers_previous_month() {
        let april = Utc.with_ymd_and_hms(2026, 4, 20, 0, 0, 0).unwrap();
        let mut doc = document();
        doc.custom_goals[0].current_amount = Money::from_major(1000);
        doc.transactions.extend([
            tx("a-inc", 2000, "Income", april),
            tx("a-bill", 800, "Bills", april),
            tx("a-food", 300, "Groceries", april),
            tx("a-out", 90, "Eating Out", april),
            tx("a-etf", 100, "Investments", april),
            contribution("a-ef", 60, "Emergency Fund", april),
            contribution("a-hol", 40, "Holiday", april),
        ]);

        let recap = derive_metrics(&doc, now()).previous_month;
        assert_eq!((recap.year, recap.month), (2026, 4));
        assert_eq!(recap.total_income, Money::from_major(2000));
        assert_eq!(recap.total_spent, Money::from_major(1290));
        assert_eq!(recap.invested, Money::from_major(100));
        assert_eq!(recap.emergency_added, Money::from_major(60));
        assert_eq!(recap.savings_added, Money::from_major(40));
        assert_eq!(recap.completed_goals, vec!["Holiday".to_string()]);
        assert_eq!(
            recap.top_category,
            Some(CategorySpend {
                category: Category::from("Groceries"),
                amount: Money::from_major(300),
            })
        );
        assert_eq!(
            recap.bottom_category.map(|c| c.category),
            Some(Category::from("Eating Out"))
        );
    }

    #[test]
    fn recap_ties_go_to_the_first_logged_category() {
        let april = Utc.with_ymd_and_hms(2026, 4, 20, 0, 0, 0).unwrap();
        let mut doc = LedgerDocument::template(now());
        // Newest first: Shopping appears in the log before Eating Out.
        doc.transactions = vec![
            tx("shop", 50, "Shopping", april),
            tx("out", 50, "Eating Out", april),
        ];

        let recap = derive_metrics(&doc, now()).previous_month;
        assert_eq!(
            recap.top_category.map(|c| c.category),
            Some(Category::from("Shopping"))
        );
        assert_eq!(
            recap.bottom_category.map(|c| c.category),
            Some(Category::from("Shopping"))
        );
    }

    #[test]
    fn recap_without_spend_has_no_extremes() {
        let doc = LedgerDocument::template(now());
        let recap = derive_metrics(&doc, now()).previous_month;
        assert!(recap.top_category.is_none());
        assert!(recap.bottom_category.is_none());
        assert!(recap.completed_goals.is_empty());
    }
}
