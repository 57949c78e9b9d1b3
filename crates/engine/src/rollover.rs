//! Monthly rollover.
//!
//! Closes out the last processed month once the calendar moves on: unspent
//! effective income is carried into `income_rollover` (negative when the month
//! was overspent) and each category's under/overspend is carried on top of its
//! base allocation. A line overspent by more than its plan starts the new
//! month below zero and recovers as later months underspend it.
//!
//! Only one month is closed per invocation. A ledger untouched for several
//! months catches up by a single step covering `last_processed_month`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::{Category, LedgerDocument, Money, Outcome, util::YearMonth};

/// Totals of the month being closed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct ClosingTotals {
    pub(crate) income: Money,
    /// Bills and category withdrawals; contributions excluded.
    pub(crate) spend: Money,
    /// Every entry of the month per category, contributions included.
    pub(crate) by_category: BTreeMap<Category, Money>,
}

/// Sum the entries of `month`.
pub(crate) fn closing_totals(document: &LedgerDocument, month: YearMonth) -> ClosingTotals {
    let mut totals = ClosingTotals::default();
    for tx in document.transactions.iter().filter(|t| t.in_month(month)) {
        if tx.category == Category::Income {
            totals.income += tx.amount;
        } else if !tx.is_contribution {
            totals.spend += tx.amount;
        }
        *totals.by_category.entry(tx.category.clone()).or_default() += tx.amount;
    }
    totals
}

/// Apply the rollover if `last_processed_month` differs from the month of
/// `now`; otherwise return the document unchanged.
#[must_use]
pub fn apply_rollover(document: &LedgerDocument, now: DateTime<Utc>) -> Outcome {
    let current = YearMonth::of(now);
    if document.last_processed_month == current.month {
        return Outcome::unchanged(document);
    }

    let mut next = document.clone();
    if !(1..=12).contains(&document.last_processed_month) {
        tracing::info!(
            month = current.month,
            "ledger never processed, stamping current month"
        );
        next.last_processed_month = current.month;
        return Outcome::changed(next);
    }

    let closing = current.latest_before(document.last_processed_month);
    let totals = closing_totals(document, closing);
    let effective_previous = totals.income + document.income_rollover;
    let rollover = effective_previous - totals.spend;

    for (category, allocation) in next.allocations.iter_mut() {
        let spent = totals.by_category.get(category).copied().unwrap_or_default();
        let carry = *allocation - spent;
        let base = match document.base_allocations.get(category) {
            Some(base) => *base,
            None => {
                tracing::warn!(%category, "allocation without a base, carrying onto zero");
                Money::ZERO
            }
        };
        *allocation = base + carry;
    }

    for counter in next.spent.values_mut() {
        *counter = Money::ZERO;
    }

    tracing::debug!(
        year = closing.year,
        month = closing.month,
        income = %totals.income,
        spend = %totals.spend,
        carry = %rollover,
        "closing month"
    );

    next.income_rollover = rollover;
    next.last_processed_month = current.month;
    Outcome::changed(next)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::Transaction;

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

    fn march(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap()
    }

    fn april(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn carries_unspent_income() {
        let mut doc = LedgerDocument::template(march(1));
        doc.transactions = vec![
            tx("i", 2000, "Income", march(1)),
            tx("b", 1000, "Bills", march(2)),
            tx("g", 500, "Groceries", march(3)),
        ];

        let outcome = apply_rollover(&doc, april(2));
        assert!(outcome.changed);
        assert_eq!(outcome.document.income_rollover, Money::from_major(500));
        assert_eq!(outcome.document.last_processed_month, 4);
    }

    #[test]
    fn contributions_are_not_spend() {
        let mut doc = LedgerDocument::template(march(1));
        let mut deposit = tx("d", 300, "Emergency Fund", march(4));
        deposit.is_contribution = true;
        doc.transactions = vec![tx("i", 1000, "Income", march(1)), deposit];

        let outcome = apply_rollover(&doc, april(1));
        assert_eq!(outcome.document.income_rollover, Money::from_major(1000));
    }

    #[test]
    fn previous_carry_is_folded_in() {
        let mut doc = LedgerDocument::template(march(1));
        doc.income_rollover = Money::from_major(-200);
        doc.transactions = vec![tx("i", 1000, "Income", march(1))];

        let outcome = apply_rollover(&doc, april(1));
        assert_eq!(outcome.document.income_rollover, Money::from_major(800));
    }

    #[test]
    fn category_carry_adjusts_allocation() {
        let mut doc = LedgerDocument::template(march(1));
        doc.transactions = vec![
            tx("g", 300, "Groceries", march(3)),
            tx("e", 200, "Eating Out", march(5)),
        ];

        let outcome = apply_rollover(&doc, april(1));
        let allocations = &outcome.document.allocations;
        // 350 planned, 300 spent: 50 bonus on top of the 350 baseline.
        assert_eq!(allocations[&Category::from("Groceries")], Money::from_major(400));
        // 150 planned, 200 spent: 50 overspend off the baseline.
        assert_eq!(allocations[&Category::from("Eating Out")], Money::from_major(100));
        assert_eq!(outcome.document.base_allocations, doc.base_allocations);
    }

    #[test]
    fn overspend_beyond_base_carries_forward() {
        let mut doc = LedgerDocument::template(march(1));
        doc.transactions = vec![tx("g", 800, "Groceries", march(3))];
        let groceries = Category::from("Groceries");

        let april_doc = apply_rollover(&doc, april(1)).document;
        assert_eq!(april_doc.allocations[&groceries], Money::from_major(-100));
        assert!(april_doc.check_invariants().is_ok());

        // Untouched in April, the debt is paid back from May's plan.
        let may = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let may_doc = apply_rollover(&april_doc, may).document;
        assert_eq!(may_doc.allocations[&groceries], Money::from_major(250));
    }

    #[test]
    fn other_months_are_ignored() {
        let mut doc = LedgerDocument::template(march(1));
        doc.transactions = vec![
            tx("old", 700, "Income", Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()),
            tx("new", 900, "Income", april(1)),
        ];

        let outcome = apply_rollover(&doc, april(2));
        assert_eq!(outcome.document.income_rollover, Money::ZERO);
    }

    #[test]
    fn same_month_is_a_no_op() {
        let doc = LedgerDocument::template(april(1));
        let outcome = apply_rollover(&doc, april(20));
        assert!(!outcome.changed);
        assert_eq!(outcome.document, doc);
    }

    #[test]
    fn resets_spent_counters() {
        let mut doc = LedgerDocument::template(march(1));
        doc.spent
            .insert(Category::from("Groceries"), Money::from_major(12));

        let outcome = apply_rollover(&doc, april(1));
        assert_eq!(
            outcome.document.spent[&Category::from("Groceries")],
            Money::ZERO
        );
    }

    #[test]
    fn multi_month_gap_closes_a_single_month() {
        let mut doc = LedgerDocument::template(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        doc.transactions = vec![tx(
            "jan",
            100,
            "Income",
            Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap(),
        )];

        let outcome = apply_rollover(&doc, april(1));
        assert_eq!(outcome.document.income_rollover, Money::from_major(100));
        assert_eq!(outcome.document.last_processed_month, 4);
        assert!(!apply_rollover(&outcome.document, april(1)).changed);
    }
}
