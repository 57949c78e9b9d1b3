use chrono::{DateTime, NaiveDate, Utc};

use crate::{
    Category, Goal, GoalInput, LedgerDocument, Money, Rejection, ResultRejection,
    util::months_until,
};

use super::{categories::name_taken, new_id, require_non_negative, required_name};

fn goal_index(document: &LedgerDocument, id: &str) -> ResultRejection<usize> {
    document
        .custom_goals
        .iter()
        .position(|g| g.id == id)
        .ok_or_else(|| Rejection::KeyNotFound(id.to_string()))
}

/// Create a goal and register its budget line with a zero allocation.
pub fn create_goal(
    document: &LedgerDocument,
    input: GoalInput,
) -> ResultRejection<(LedgerDocument, String)> {
    let name = required_name(&input.name, "goal")?;
    require_non_negative(input.target_amount, "goal target")?;
    let category = Category::from(name.as_str());
    if category.is_ledger_only() {
        return Err(Rejection::ReservedCategory(category));
    }
    if name_taken(document, category.as_str()) {
        return Err(Rejection::ExistingKey(name));
    }

    let id = new_id();
    let mut next = document.clone();
    next.custom_goals.push(Goal {
        id: id.clone(),
        name,
        target_amount: input.target_amount,
        target_date: input.target_date,
        current_amount: Money::ZERO,
    });
    next.categories.push(category.clone());
    next.allocations.insert(category.clone(), Money::ZERO);
    next.base_allocations.insert(category, Money::ZERO);
    Ok((next, id))
}

/// Change target amount and date. The name is fixed: it is the budget line.
pub fn update_goal(
    document: &LedgerDocument,
    id: &str,
    target_amount: Money,
    target_date: Option<NaiveDate>,
) -> ResultRejection<LedgerDocument> {
    let index = goal_index(document, id)?;
    require_non_negative(target_amount, "goal target")?;
    let mut next = document.clone();
    let goal = &mut next.custom_goals[index];
    goal.target_amount = target_amount;
    goal.target_date = target_date;
    Ok(next)
}

/// Delete a goal and its budget line. Whatever it held goes back to the
/// unallocated cash.
pub fn delete_goal(document: &LedgerDocument, id: &str) -> ResultRejection<LedgerDocument> {
    let index = goal_index(document, id)?;
    let mut next = document.clone();
    let goal = next.custom_goals.remove(index);
    let category = goal.category();
    next.categories.retain(|c| c != &category);
    next.hidden_categories.remove(&category);
    next.allocations.remove(&category);
    next.base_allocations.remove(&category);
    next.spent.remove(&category);
    tracing::info!(goal = %goal.name, released = %goal.current_amount, "goal deleted");
    Ok(next)
}

/// Set the emergency fund target and deadline.
pub fn update_emergency_plan(
    document: &LedgerDocument,
    target: Money,
    deadline: Option<NaiveDate>,
) -> ResultRejection<LedgerDocument> {
    require_non_negative(target, "emergency target")?;
    let mut next = document.clone();
    next.emergency_target = target;
    next.emergency_deadline = deadline;
    Ok(next)
}

/// Monthly contribution needed to reach `target` from `balance` by
/// `deadline`, rounded up to the cent.
///
/// Zero without a deadline or a target; the whole gap when the deadline is
/// this month or already past.
#[must_use]
pub fn monthly_need(
    target: Money,
    balance: Money,
    deadline: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> Money {
    let Some(deadline) = deadline else {
        return Money::ZERO;
    };
    if !target.is_positive() {
        return Money::ZERO;
    }
    let left = (target - balance).non_negative();
    let months = months_until(now, deadline);
    if months <= 0 {
        return left;
    }
    left.div_ceil(months)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DepositInput, derive_metrics,
        ops::{
            propose_allocation_edit, propose_deposit,
            test_support::{funded, now},
        },
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn create_goal_registers_line() {
        let (doc, id) = create_goal(
            &funded(),
            GoalInput::new("New  Laptop", Money::from_major(1200)).target_date(date(2026, 12, 1)),
        )
        .unwrap();
        let goal = &doc.custom_goals[0];
        assert_eq!(goal.id, id);
        assert_eq!(goal.name, "New Laptop");
        let line = Category::from("New Laptop");
        assert!(doc.has_category(&line));
        assert_eq!(doc.allocation(&line), Money::ZERO);
        assert!(doc.check_invariants().is_ok());
    }

    #[test]
    fn goal_name_must_be_free() {
        let err = create_goal(&funded(), GoalInput::new("eating out", Money::from_major(1)))
            .unwrap_err();
        assert_eq!(err, Rejection::ExistingKey("eating out".to_string()));
    }

    #[test]
    fn delete_goal_releases_balance() {
        let (doc, id) = create_goal(&funded(), GoalInput::new("Bike", Money::from_major(500))).unwrap();
        let line = Category::from("Bike");
        let metrics = derive_metrics(&doc, now());
        let doc = propose_allocation_edit(&doc, &metrics, &line, Money::from_major(100)).unwrap();
        let metrics = derive_metrics(&doc, now());
        let doc = propose_deposit(
            &doc,
            &metrics,
            DepositInput::new("Bike", Money::from_major(100), now()),
        )
        .unwrap();
        let before = derive_metrics(&doc, now());
        assert_eq!(before.goals_balance, Money::from_major(100));

        let doc = delete_goal(&doc, &id).unwrap();
        assert!(!doc.has_category(&line));
        assert!(doc.custom_goals.is_empty());
        let after = derive_metrics(&doc, now());
        assert_eq!(after.goals_balance, Money::ZERO);
        assert!(after.unallocated > before.unallocated);
    }

    #[test]
    fn update_goal_changes_target() {
        let (doc, id) = create_goal(&funded(), GoalInput::new("Bike", Money::from_major(500))).unwrap();
        let doc = update_goal(&doc, &id, Money::from_major(800), Some(date(2027, 3, 1))).unwrap();
        assert_eq!(doc.custom_goals[0].target_amount, Money::from_major(800));
        assert_eq!(
            update_goal(&doc, "nope", Money::ZERO, None).unwrap_err(),
            Rejection::KeyNotFound("nope".to_string())
        );
    }

    #[test]
    fn emergency_plan_rejects_negative_target() {
        let doc = funded();
        assert!(update_emergency_plan(&doc, Money::from_major(-1), None).is_err());
        let doc = update_emergency_plan(&doc, Money::from_major(6000), Some(date(2027, 6, 1))).unwrap();
        assert_eq!(doc.emergency_target, Money::from_major(6000));
        assert_eq!(doc.emergency_deadline, Some(date(2027, 6, 1)));
    }

    #[test]
    fn monthly_need_spreads_gap_over_months() {
        // June 2026 to December 2026: six months.
        let need = monthly_need(
            Money::from_major(5000),
            Money::from_major(800),
            Some(date(2026, 12, 1)),
            now(),
        );
        assert_eq!(need, Money::from_major(700));

        let rounded = monthly_need(Money::new(1000), Money::ZERO, Some(date(2026, 9, 1)), now());
        assert_eq!(rounded, Money::new(334));
    }

    #[test]
    fn monthly_need_edge_cases() {
        let target = Money::from_major(5000);
        assert_eq!(monthly_need(target, Money::ZERO, None, now()), Money::ZERO);
        assert_eq!(
            monthly_need(target, Money::from_major(1000), Some(date(2026, 6, 30)), now()),
            Money::from_major(4000)
        );
        assert_eq!(
            monthly_need(target, Money::from_major(6000), Some(date(2027, 1, 1)), now()),
            Money::ZERO
        );
    }
}
