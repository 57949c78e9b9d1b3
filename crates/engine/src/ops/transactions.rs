use chrono::{DateTime, Utc};

use crate::{
    Category, DepositInput, LedgerDocument, Metrics, Money, Rejection, ResultRejection,
    Transaction, TransactionAmend, TransactionInput,
    document::Line,
    util::{YearMonth, normalize_display},
};

use super::{new_id, require_positive, require_visible};

fn check_budget(category: &Category, requested: Money, available: Money) -> ResultRejection<()> {
    if requested > available {
        return Err(Rejection::ExceedsBudget {
            category: category.clone(),
            requested,
            available: available.non_negative(),
        });
    }
    Ok(())
}

fn check_pot(category: &Category, requested: Money, available: Money) -> ResultRejection<()> {
    if requested > available {
        return Err(Rejection::ExceedsPot {
            category: category.clone(),
            requested,
            available: available.non_negative(),
        });
    }
    Ok(())
}

fn check_monthly(category: &Category, requested: Money, available: Money) -> ResultRejection<()> {
    if requested > available {
        return Err(Rejection::ExceedsMonthlyAllocation {
            category: category.clone(),
            requested,
            available: available.non_negative(),
        });
    }
    Ok(())
}

/// Entries capped by this month's allocation must fall in this month.
fn require_current_month(metrics: &Metrics, timestamp: DateTime<Utc>) -> ResultRejection<()> {
    if metrics.period.contains(timestamp) {
        Ok(())
    } else {
        Err(Rejection::InvalidInput(format!(
            "{timestamp} is outside the current month; only income and pot withdrawals may be backdated"
        )))
    }
}

/// Room left for contributions this month: allocation minus what was already
/// contributed.
fn monthly_room(document: &LedgerDocument, metrics: &Metrics, category: &Category) -> Money {
    (document.allocation(category) - metrics.spent(category)).non_negative()
}

fn position(document: &LedgerDocument, id: &str) -> ResultRejection<usize> {
    document
        .transactions
        .iter()
        .position(|t| t.id == id)
        .ok_or_else(|| Rejection::KeyNotFound(id.to_string()))
}

fn require_user_entry(tx: &Transaction) -> ResultRejection<()> {
    if tx.is_system {
        return Err(Rejection::InvalidInput(format!(
            "\"{}\" follows its recurring item; edit the bill or income source instead",
            tx.id
        )));
    }
    Ok(())
}

/// Log an expense, a pot withdrawal or a one-time income.
///
/// - plain budget lines are capped by their remaining allocation;
/// - goal withdrawals by the goal balance, which is reduced accordingly;
/// - emergency withdrawals by the emergency balance;
/// - `Income` is a one-time credit and is never capped;
/// - `Bills` is reserved for materialized entries.
pub fn propose_transaction(
    document: &LedgerDocument,
    metrics: &Metrics,
    input: TransactionInput,
) -> ResultRejection<LedgerDocument> {
    require_positive(input.amount)?;
    let category = input.category;
    let mut next = document.clone();

    match document.line(&category) {
        Line::Bills => return Err(Rejection::ReservedCategory(category)),
        Line::Income => {}
        Line::Emergency => {
            require_visible(document, &category)?;
            check_pot(&category, input.amount, metrics.emergency_balance)?;
        }
        Line::Goal(goal) => {
            require_visible(document, &category)?;
            check_pot(&category, input.amount, goal.current_amount)?;
            if let Some(goal) = next.goal_mut(&category) {
                goal.current_amount = (goal.current_amount - input.amount).non_negative();
            }
        }
        Line::Plain => {
            require_visible(document, &category)?;
            require_current_month(metrics, input.timestamp)?;
            check_budget(
                &category,
                input.amount,
                metrics.remaining(document, &category),
            )?;
        }
    }

    let description = input
        .description
        .as_deref()
        .and_then(normalize_display)
        .unwrap_or_else(|| category.to_string());
    let tx = Transaction {
        id: new_id(),
        amount: input.amount,
        category,
        description,
        timestamp: input.timestamp,
        is_system: false,
        is_contribution: false,
    };
    tracing::debug!(id = %tx.id, category = %tx.category, amount = %tx.amount, "logging transaction");
    next.transactions.insert(0, tx);
    next.require_capacity()?;
    Ok(next)
}

/// Contribute to a goal or the emergency fund, capped by what is left of the
/// line's monthly allocation.
pub fn propose_deposit(
    document: &LedgerDocument,
    metrics: &Metrics,
    input: DepositInput,
) -> ResultRejection<LedgerDocument> {
    require_positive(input.amount)?;
    let category = input.category;
    if !document.line(&category).is_pot() {
        return Err(Rejection::InvalidInput(format!(
            "\"{category}\" is neither a goal nor the emergency fund"
        )));
    }
    require_visible(document, &category)?;
    require_current_month(metrics, input.timestamp)?;
    check_monthly(
        &category,
        input.amount,
        monthly_room(document, metrics, &category),
    )?;

    let mut next = document.clone();
    if category == Category::EmergencyFund {
        next.emergency_deposits += input.amount;
    } else if let Some(goal) = next.goal_mut(&category) {
        goal.current_amount += input.amount;
    }

    let description = input
        .description
        .as_deref()
        .and_then(normalize_display)
        .unwrap_or_else(|| format!("{category} deposit"));
    let tx = Transaction {
        id: new_id(),
        amount: input.amount,
        category,
        description,
        timestamp: input.timestamp,
        is_system: false,
        is_contribution: true,
    };
    tracing::debug!(id = %tx.id, category = %tx.category, amount = %tx.amount, "recording deposit");
    next.transactions.insert(0, tx);
    next.require_capacity()?;
    Ok(next)
}

/// Delete a user entry, giving back what it took from or added to a pot.
pub fn remove_transaction(
    document: &LedgerDocument,
    metrics: &Metrics,
    id: &str,
) -> ResultRejection<LedgerDocument> {
    let index = position(document, id)?;
    let tx = &document.transactions[index];
    require_user_entry(tx)?;

    let mut next = document.clone();
    match (document.line(&tx.category), tx.is_contribution) {
        (Line::Emergency, true) => {
            check_pot(&tx.category, tx.amount, metrics.emergency_balance)?;
            next.emergency_deposits -= tx.amount;
        }
        (Line::Goal(goal), true) => {
            check_pot(&tx.category, tx.amount, goal.current_amount)?;
            if let Some(goal) = next.goal_mut(&tx.category) {
                goal.current_amount -= tx.amount;
            }
        }
        (Line::Goal(_), false) => {
            if let Some(goal) = next.goal_mut(&tx.category) {
                goal.current_amount += tx.amount;
            }
        }
        // Emergency withdrawals are derived from the log itself.
        _ => {}
    }

    next.transactions.remove(index);
    Ok(next)
}

/// Change amount, description or date of a user entry.
///
/// Entries landing in the current month are re-checked against their budget
/// line with their previous amount given back first. Pot balances follow the
/// amount delta.
pub fn amend_transaction(
    document: &LedgerDocument,
    metrics: &Metrics,
    id: &str,
    amend: TransactionAmend,
    now: DateTime<Utc>,
) -> ResultRejection<LedgerDocument> {
    let index = position(document, id)?;
    let old = &document.transactions[index];
    require_user_entry(old)?;

    let amount = amend.amount.unwrap_or(old.amount);
    require_positive(amount)?;
    let timestamp = amend.timestamp.unwrap_or(old.timestamp);
    let description = amend
        .description
        .as_deref()
        .and_then(normalize_display)
        .unwrap_or_else(|| old.description.clone());

    let month = YearMonth::of(now);
    let counts_now = month.contains(timestamp);
    let given_back = if month.contains(old.timestamp) {
        old.amount
    } else {
        Money::ZERO
    };
    let delta = amount - old.amount;
    let category = &old.category;
    let capped = old.is_contribution || matches!(document.line(category), Line::Plain);
    if capped && YearMonth::of(timestamp) != YearMonth::of(old.timestamp) {
        require_current_month(metrics, timestamp)?;
    }

    let mut next = document.clone();
    match (document.line(category), old.is_contribution) {
        (Line::Income | Line::Bills, _) => {}
        (Line::Emergency, false) => check_pot(category, delta, metrics.emergency_balance)?,
        (Line::Emergency, true) => {
            if counts_now {
                check_monthly(
                    category,
                    amount,
                    monthly_room(document, metrics, category) + given_back,
                )?;
            }
            check_pot(category, -delta, metrics.emergency_balance)?;
            next.emergency_deposits += delta;
        }
        (Line::Goal(goal), false) => {
            check_pot(category, delta, goal.current_amount)?;
            if let Some(goal) = next.goal_mut(category) {
                goal.current_amount = (goal.current_amount - delta).non_negative();
            }
        }
        (Line::Goal(goal), true) => {
            if counts_now {
                check_monthly(
                    category,
                    amount,
                    monthly_room(document, metrics, category) + given_back,
                )?;
            }
            check_pot(category, -delta, goal.current_amount)?;
            if let Some(goal) = next.goal_mut(category) {
                goal.current_amount += delta;
            }
        }
        (Line::Plain, _) => {
            if counts_now {
                check_budget(
                    category,
                    amount,
                    metrics.remaining(document, category) + given_back,
                )?;
            }
        }
    }

    let tx = &mut next.transactions[index];
    tx.amount = amount;
    tx.description = description;
    tx.timestamp = timestamp;
    next.require_capacity()?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::{
        DepositInput, Goal, derive_metrics,
        ops::test_support::{funded, now},
    };

    fn log(doc: &LedgerDocument, category: &str, amount: i64) -> ResultRejection<LedgerDocument> {
        let metrics = derive_metrics(doc, now());
        propose_transaction(
            doc,
            &metrics,
            TransactionInput::new(category, Money::from_major(amount), now()),
        )
    }

    fn deposit(doc: &LedgerDocument, category: &str, amount: i64) -> ResultRejection<LedgerDocument> {
        let metrics = derive_metrics(doc, now());
        propose_deposit(
            doc,
            &metrics,
            DepositInput::new(category, Money::from_major(amount), now()),
        )
    }

    fn with_goal(doc: &mut LedgerDocument, current: i64) {
        doc.custom_goals.push(Goal {
            id: "goal-1".to_string(),
            name: "Laptop".to_string(),
            target_amount: Money::from_major(1200),
            target_date: None,
            current_amount: Money::from_major(current),
        });
        let category = Category::from("Laptop");
        doc.categories.push(category.clone());
        doc.allocations.insert(category.clone(), Money::from_major(100));
        doc.base_allocations.insert(category, Money::from_major(100));
    }

    #[test]
    fn expense_within_remaining_budget_is_logged() {
        let mut doc = funded();
        doc.allocations
            .insert(Category::from("Groceries"), Money::from_major(300));

        let doc = log(&doc, "Groceries", 50).unwrap();
        assert_eq!(doc.transactions[0].amount, Money::from_major(50));
        assert_eq!(doc.transactions[0].description, "Groceries");

        let err = log(&doc, "Groceries", 260).unwrap_err();
        assert_eq!(
            err,
            Rejection::ExceedsBudget {
                category: Category::from("Groceries"),
                requested: Money::from_major(260),
                available: Money::from_major(250),
            }
        );
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let err = log(&funded(), "Groceries", 0).unwrap_err();
        assert_eq!(err, Rejection::NonPositiveAmount(Money::ZERO));
    }

    #[test]
    fn bills_are_reserved() {
        let err = log(&funded(), "Bills", 10).unwrap_err();
        assert_eq!(err, Rejection::ReservedCategory(Category::Bills));
    }

    #[test]
    fn unknown_category_is_rejected() {
        let err = log(&funded(), "Gadgets", 10).unwrap_err();
        assert_eq!(err, Rejection::UnknownCategory("Gadgets".to_string()));
    }

    #[test]
    fn one_time_income_is_uncapped() {
        let doc = log(&funded(), "Income", 10_000).unwrap();
        let metrics = derive_metrics(&doc, now());
        assert_eq!(metrics.total_income, Money::from_major(13_000));
    }

    #[test]
    fn emergency_withdrawal_is_capped_by_balance() {
        let mut doc = funded();
        doc.emergency_deposits = Money::from_major(300);

        let err = log(&doc, "Emergency Fund", 301).unwrap_err();
        assert_eq!(err.limit(), Some(Money::from_major(300)));

        let doc = log(&doc, "Emergency Fund", 300).unwrap();
        assert_eq!(derive_metrics(&doc, now()).emergency_balance, Money::ZERO);
    }

    #[test]
    fn goal_withdrawal_reduces_balance() {
        let mut doc = funded();
        with_goal(&mut doc, 400);

        let err = log(&doc, "Laptop", 401).unwrap_err();
        assert!(matches!(err, Rejection::ExceedsPot { .. }));

        let doc = log(&doc, "Laptop", 150).unwrap();
        assert_eq!(doc.custom_goals[0].current_amount, Money::from_major(250));
        // Withdrawals leave the goal's monthly line alone.
        assert_eq!(derive_metrics(&doc, now()).spent(&Category::from("Laptop")), Money::ZERO);
    }

    #[test]
    fn deposit_respects_monthly_allocation() {
        let mut doc = funded();
        with_goal(&mut doc, 0);

        let doc = deposit(&doc, "Laptop", 60).unwrap();
        assert_eq!(doc.custom_goals[0].current_amount, Money::from_major(60));
        assert!(doc.transactions[0].is_contribution);

        let err = deposit(&doc, "Laptop", 41).unwrap_err();
        assert_eq!(
            err,
            Rejection::ExceedsMonthlyAllocation {
                category: Category::from("Laptop"),
                requested: Money::from_major(41),
                available: Money::from_major(40),
            }
        );
    }

    #[test]
    fn emergency_deposit_grows_balance() {
        let doc = deposit(&funded(), "Emergency Fund", 100).unwrap();
        let metrics = derive_metrics(&doc, now());
        assert_eq!(metrics.emergency_balance, Money::from_major(100));
        assert_eq!(metrics.emergency_contributed, Money::from_major(100));
        assert!(deposit(&doc, "Emergency Fund", 1).is_err());
    }

    #[test]
    fn deposit_into_plain_line_is_rejected() {
        let err = deposit(&funded(), "Groceries", 10).unwrap_err();
        assert!(matches!(err, Rejection::InvalidInput(_)));
    }

    #[test]
    fn removing_a_deposit_takes_it_back_out() {
        let mut doc = funded();
        with_goal(&mut doc, 0);
        let doc = deposit(&doc, "Laptop", 80).unwrap();
        let id = doc.transactions[0].id.clone();

        let metrics = derive_metrics(&doc, now());
        let doc = remove_transaction(&doc, &metrics, &id).unwrap();
        assert_eq!(doc.custom_goals[0].current_amount, Money::ZERO);
        assert!(!doc.has_transaction(&id));
    }

    #[test]
    fn removing_a_withdrawal_refunds_the_goal() {
        let mut doc = funded();
        with_goal(&mut doc, 400);
        let doc = log(&doc, "Laptop", 100).unwrap();
        let id = doc.transactions[0].id.clone();

        let metrics = derive_metrics(&doc, now());
        let doc = remove_transaction(&doc, &metrics, &id).unwrap();
        assert_eq!(doc.custom_goals[0].current_amount, Money::from_major(400));
    }

    #[test]
    fn system_entries_cannot_be_removed() {
        let mut doc = funded();
        doc.transactions[0].is_system = true;
        let id = doc.transactions[0].id.clone();
        let metrics = derive_metrics(&doc, now());
        assert!(matches!(
            remove_transaction(&doc, &metrics, &id),
            Err(Rejection::InvalidInput(_))
        ));
    }

    #[test]
    fn amend_rechecks_budget_with_previous_amount_given_back() {
        let mut doc = funded();
        doc.allocations
            .insert(Category::from("Groceries"), Money::from_major(300));
        let doc = log(&doc, "Groceries", 200).unwrap();
        let id = doc.transactions[0].id.clone();
        let metrics = derive_metrics(&doc, now());

        let amended = amend_transaction(
            &doc,
            &metrics,
            &id,
            TransactionAmend::new()
                .amount(Money::from_major(300))
                .description("Big shop"),
            now(),
        )
        .unwrap();
        assert_eq!(amended.transactions[0].amount, Money::from_major(300));
        assert_eq!(amended.transactions[0].description, "Big shop");

        let err = amend_transaction(
            &doc,
            &metrics,
            &id,
            TransactionAmend::new().amount(Money::from_major(301)),
            now(),
        )
        .unwrap_err();
        assert_eq!(err.limit(), Some(Money::from_major(300)));
    }

    #[test]
    fn budgeted_entry_cannot_move_to_another_month() {
        let doc = log(&funded(), "Groceries", 100).unwrap();
        let id = doc.transactions[0].id.clone();
        let metrics = derive_metrics(&doc, now());
        let last_year = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();

        let err = amend_transaction(
            &doc,
            &metrics,
            &id,
            TransactionAmend::new().timestamp(last_year),
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, Rejection::InvalidInput(_)));

        let later = Utc.with_ymd_and_hms(2026, 6, 28, 0, 0, 0).unwrap();
        let amended = amend_transaction(
            &doc,
            &metrics,
            &id,
            TransactionAmend::new().timestamp(later),
            now(),
        )
        .unwrap();
        assert_eq!(amended.transactions[0].timestamp, later);
    }

    #[test]
    fn income_may_be_moved_to_a_past_month() {
        let doc = log(&funded(), "Income", 100).unwrap();
        let id = doc.transactions[0].id.clone();
        let metrics = derive_metrics(&doc, now());
        let last_year = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();

        let amended = amend_transaction(
            &doc,
            &metrics,
            &id,
            TransactionAmend::new()
                .amount(Money::from_major(5000))
                .timestamp(last_year),
            now(),
        )
        .unwrap();
        assert_eq!(amended.transactions[0].timestamp, last_year);
    }

    #[test]
    fn backdated_expense_is_rejected() {
        let doc = funded();
        let metrics = derive_metrics(&doc, now());
        let may = Utc.with_ymd_and_hms(2026, 5, 20, 0, 0, 0).unwrap();

        let err = propose_transaction(
            &doc,
            &metrics,
            TransactionInput::new("Groceries", Money::from_major(300), may),
        )
        .unwrap_err();
        assert!(matches!(err, Rejection::InvalidInput(_)));

        let err = propose_deposit(
            &doc,
            &metrics,
            DepositInput::new("Emergency Fund", Money::from_major(50), may),
        )
        .unwrap_err();
        assert!(matches!(err, Rejection::InvalidInput(_)));

        let doc = propose_transaction(
            &doc,
            &metrics,
            TransactionInput::new("Income", Money::from_major(40), may),
        )
        .unwrap();
        assert_eq!(doc.transactions[0].timestamp, may);
    }

    #[test]
    fn oversized_amounts_are_rejected() {
        let doc = funded();
        let metrics = derive_metrics(&doc, now());

        let err = propose_transaction(
            &doc,
            &metrics,
            TransactionInput::new("Income", Money::new(i64::MAX), now()),
        )
        .unwrap_err();
        assert!(matches!(err, Rejection::InvalidAmount(_)));

        let doc = propose_transaction(
            &doc,
            &metrics,
            TransactionInput::new("Income", Money::MAX_ENTRY, now()),
        )
        .unwrap();
        // The ledger stays computable after the largest accepted entry.
        let metrics = derive_metrics(&doc, now());
        assert_eq!(
            metrics.total_income,
            Money::MAX_ENTRY + Money::from_major(3000)
        );
    }

    #[test]
    fn ledger_capacity_bounds_accumulated_income() {
        let mut doc = funded();
        doc.emergency_deposits = Money::LEDGER_CAPACITY - Money::from_major(3000);
        let metrics = derive_metrics(&doc, now());

        let err = propose_transaction(
            &doc,
            &metrics,
            TransactionInput::new("Income", Money::new(1), now()),
        )
        .unwrap_err();
        assert!(matches!(err, Rejection::InvalidAmount(_)));
    }

    #[test]
    fn amend_goal_withdrawal_moves_balance_by_delta() {
        let mut doc = funded();
        with_goal(&mut doc, 400);
        let doc = log(&doc, "Laptop", 100).unwrap();
        let id = doc.transactions[0].id.clone();
        let metrics = derive_metrics(&doc, now());

        let amended = amend_transaction(
            &doc,
            &metrics,
            &id,
            TransactionAmend::new().amount(Money::from_major(250)),
            now(),
        )
        .unwrap();
        assert_eq!(amended.custom_goals[0].current_amount, Money::from_major(150));
    }
}
