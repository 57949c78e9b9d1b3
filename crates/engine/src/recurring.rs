//! Recurring materializer.
//!
//! Turns due bills and income sources into `Bills`/`Income` transactions,
//! at most once per source and month. Identifiers are derived from the
//! source and the month so re-running over an already processed snapshot is a
//! no-op.

use chrono::{DateTime, Datelike, Utc};

use crate::{Category, LedgerDocument, Money, Outcome, Transaction, util::YearMonth};

/// Deterministic id of a materialized bill.
#[must_use]
pub fn bill_entry_id(name: &str, now: DateTime<Utc>) -> String {
    format!("bill-{name}-{}-{}", now.month(), now.year())
}

/// Deterministic id of a materialized income credit.
#[must_use]
pub fn income_entry_id(source_id: &str, now: DateTime<Utc>) -> String {
    format!("inc-{source_id}-{}-{}", now.month(), now.year())
}

fn system_entry(
    id: String,
    amount: Money,
    category: Category,
    description: &str,
    day_of_month: u32,
    now: DateTime<Utc>,
) -> Transaction {
    let due = YearMonth::of(now)
        .at_day(day_of_month)
        .map_or(now, |date| date.min(now));
    Transaction {
        id,
        amount,
        category,
        description: description.to_string(),
        timestamp: due,
        is_system: true,
        is_contribution: false,
    }
}

/// Materialize every bill and income source due on or before `now.day`.
///
/// New entries are prepended (the log is newest first). Never fails.
#[must_use]
pub fn materialize_recurring(document: &LedgerDocument, now: DateTime<Utc>) -> Outcome {
    let today = now.day();
    // A due day past the end of a short month falls on its last day.
    let last_day = YearMonth::of(now).last_day();
    let is_due = |day_of_month: u32| today >= day_of_month.min(last_day);
    let mut fresh = Vec::new();

    for (name, bill) in &document.bills {
        if !is_due(bill.day_of_month) {
            continue;
        }
        let id = bill_entry_id(name, now);
        if document.has_transaction(&id) || !bill.amount.is_positive() {
            continue;
        }
        tracing::debug!(%id, amount = %bill.amount, "materializing bill");
        fresh.push(system_entry(
            id,
            bill.amount,
            Category::Bills,
            name,
            bill.day_of_month,
            now,
        ));
    }

    for source in &document.income_sources {
        if !is_due(source.day_of_month) {
            continue;
        }
        let id = income_entry_id(&source.id, now);
        if document.has_transaction(&id) || !source.amount.is_positive() {
            continue;
        }
        tracing::debug!(%id, amount = %source.amount, "materializing income");
        fresh.push(system_entry(
            id,
            source.amount,
            Category::Income,
            &source.name,
            source.day_of_month,
            now,
        ));
    }

    if fresh.is_empty() {
        return Outcome::unchanged(document);
    }

    let mut document = document.clone();
    // Later entries land on top, matching the order a user would see them
    // logged one by one.
    fresh.reverse();
    fresh.append(&mut document.transactions);
    document.transactions = fresh;
    Outcome::changed(document)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::{Bill, IncomeSource};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, day, 9, 30, 0).unwrap()
    }

    fn document() -> LedgerDocument {
        let mut doc = LedgerDocument::template(at(1));
        doc.bills.insert(
            "Rent".to_string(),
            Bill {
                amount: Money::from_major(900),
                day_of_month: 1,
            },
        );
        doc.bills.insert(
            "Phone".to_string(),
            Bill {
                amount: Money::from_major(20),
                day_of_month: 15,
            },
        );
        doc.income_sources.push(IncomeSource {
            id: "job".to_string(),
            name: "Salary".to_string(),
            amount: Money::from_major(2500),
            day_of_month: 5,
        });
        doc
    }

    #[test]
    fn materializes_only_due_items() {
        let outcome = materialize_recurring(&document(), at(10));
        assert!(outcome.changed);
        let ids: Vec<_> = outcome
            .document
            .transactions
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["inc-job-4-2026", "bill-Rent-4-2026"]);

        let salary = &outcome.document.transactions[0];
        assert_eq!(salary.category, Category::Income);
        assert!(salary.is_system);
        assert_eq!(salary.timestamp, Utc.with_ymd_and_hms(2026, 4, 5, 0, 0, 0).unwrap());
    }

    #[test]
    fn rerun_is_a_no_op() {
        let first = materialize_recurring(&document(), at(20));
        assert_eq!(first.document.transactions.len(), 3);

        let second = materialize_recurring(&first.document, at(20));
        assert!(!second.changed);
        assert_eq!(second.document, first.document);
    }

    #[test]
    fn timestamps_never_exceed_now() {
        let now = at(15);
        let outcome = materialize_recurring(&document(), now);
        assert!(outcome.document.transactions.iter().all(|t| t.timestamp <= now));
    }

    #[test]
    fn day_past_month_end_is_due_on_last_day() {
        let mut doc = document();
        doc.bills.clear();
        doc.income_sources[0].day_of_month = 31;
        let now = Utc.with_ymd_and_hms(2026, 4, 30, 18, 0, 0).unwrap();
        let outcome = materialize_recurring(&doc, now);
        assert!(outcome.changed);
        assert_eq!(
            outcome.document.transactions[0].timestamp,
            Utc.with_ymd_and_hms(2026, 4, 30, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn nothing_due_leaves_document_untouched() {
        let mut doc = document();
        doc.bills.clear();
        doc.income_sources[0].day_of_month = 28;
        let outcome = materialize_recurring(&doc, at(3));
        assert!(!outcome.changed);
        assert_eq!(outcome.document, doc);
    }
}
