use chrono::{DateTime, Utc};

use crate::{
    Bill, LedgerDocument, Metrics, Money, RecurringInput, Rejection, ResultRejection,
    recurring::bill_entry_id, util::normalize_key,
};

use super::{require_day, require_positive, required_name};

fn check_increase(metrics: &Metrics, increase: Money) -> ResultRejection<()> {
    if increase.is_positive() && increase > metrics.unallocated {
        return Err(Rejection::ExceedsUnallocated {
            requested: increase,
            available: metrics.unallocated.non_negative(),
        });
    }
    Ok(())
}

fn clashes(document: &LedgerDocument, name: &str, except: Option<&str>) -> bool {
    let key = normalize_key(name);
    document
        .bills
        .keys()
        .filter(|existing| Some(existing.as_str()) != except)
        .any(|existing| normalize_key(existing) == key)
}

/// Register a recurring bill. Its amount must fit in the unallocated cash.
pub fn add_bill(
    document: &LedgerDocument,
    metrics: &Metrics,
    input: RecurringInput,
) -> ResultRejection<LedgerDocument> {
    let name = required_name(&input.name, "bill")?;
    require_positive(input.amount)?;
    require_day(input.day_of_month)?;
    if clashes(document, &name, None) {
        return Err(Rejection::ExistingKey(name));
    }
    check_increase(metrics, input.amount)?;

    let mut next = document.clone();
    next.bills.insert(
        name,
        Bill {
            amount: input.amount,
            day_of_month: input.day_of_month,
        },
    );
    Ok(next)
}

/// Change a bill. A raise must fit in the unallocated cash.
///
/// If the bill was already materialized this month, that entry is rewritten
/// in place (amount, description and id follow the new name) so the next
/// materialization pass does not book it twice.
pub fn update_bill(
    document: &LedgerDocument,
    metrics: &Metrics,
    name: &str,
    input: RecurringInput,
    now: DateTime<Utc>,
) -> ResultRejection<LedgerDocument> {
    let old = document
        .bills
        .get(name)
        .ok_or_else(|| Rejection::KeyNotFound(name.to_string()))?;
    let new_name = required_name(&input.name, "bill")?;
    require_positive(input.amount)?;
    require_day(input.day_of_month)?;
    if clashes(document, &new_name, Some(name)) {
        return Err(Rejection::ExistingKey(new_name));
    }
    check_increase(metrics, input.amount - old.amount)?;

    let mut next = document.clone();
    next.bills.remove(name);
    next.bills.insert(
        new_name.clone(),
        Bill {
            amount: input.amount,
            day_of_month: input.day_of_month,
        },
    );

    let old_id = bill_entry_id(name, now);
    if let Some(tx) = next.transactions.iter_mut().find(|t| t.id == old_id) {
        tx.id = bill_entry_id(&new_name, now);
        tx.amount = input.amount;
        tx.description = new_name;
        tracing::debug!(from = %old_id, to = %tx.id, "rewrote materialized bill");
    }
    Ok(next)
}

/// Drop a bill together with this month's materialized entry. Earlier months
/// keep their history.
pub fn remove_bill(
    document: &LedgerDocument,
    name: &str,
    now: DateTime<Utc>,
) -> ResultRejection<LedgerDocument> {
    if !document.bills.contains_key(name) {
        return Err(Rejection::KeyNotFound(name.to_string()));
    }
    let mut next = document.clone();
    next.bills.remove(name);
    let id = bill_entry_id(name, now);
    next.transactions.retain(|t| t.id != id);
    Ok(next)
}
