use chrono::{DateTime, Utc};

use crate::{
    IncomeSource, LedgerDocument, RecurringInput, Rejection, ResultRejection,
    recurring::income_entry_id,
};

use super::{new_id, require_day, require_positive, required_name};

fn validated(input: &RecurringInput) -> ResultRejection<String> {
    let name = required_name(&input.name, "income source")?;
    require_positive(input.amount)?;
    require_day(input.day_of_month)?;
    Ok(name)
}

fn index_of(document: &LedgerDocument, id: &str) -> ResultRejection<usize> {
    document
        .income_sources
        .iter()
        .position(|s| s.id == id)
        .ok_or_else(|| Rejection::KeyNotFound(id.to_string()))
}

/// Register a recurring income source. Returns the next document and the id
/// of the new source.
pub fn add_income_source(
    document: &LedgerDocument,
    input: RecurringInput,
) -> ResultRejection<(LedgerDocument, String)> {
    let name = validated(&input)?;
    let id = new_id();
    let mut next = document.clone();
    next.income_sources.push(IncomeSource {
        id: id.clone(),
        name,
        amount: input.amount,
        day_of_month: input.day_of_month,
    });
    Ok((next, id))
}

/// Change an income source. This month's credit, if already booked, follows
/// the new name and amount.
pub fn update_income_source(
    document: &LedgerDocument,
    id: &str,
    input: RecurringInput,
    now: DateTime<Utc>,
) -> ResultRejection<LedgerDocument> {
    let index = index_of(document, id)?;
    let name = validated(&input)?;

    let mut next = document.clone();
    let source = &mut next.income_sources[index];
    source.name = name.clone();
    source.amount = input.amount;
    source.day_of_month = input.day_of_month;

    let entry = income_entry_id(id, now);
    if let Some(tx) = next.transactions.iter_mut().find(|t| t.id == entry) {
        tx.amount = input.amount;
        tx.description = name;
    }
    Ok(next)
}

/// Drop an income source and this month's credit.
pub fn remove_income_source(
    document: &LedgerDocument,
    id: &str,
    now: DateTime<Utc>,
) -> ResultRejection<LedgerDocument> {
    let index = index_of(document, id)?;
    let mut next = document.clone();
    next.income_sources.remove(index);
    let entry = income_entry_id(id, now);
    next.transactions.retain(|t| t.id != entry);
    Ok(next)
}
