//! Mutation validators.
//!
//! Every user-initiated change goes through one of these functions. They are
//! pure: given the current document and its metrics they either return the
//! next document or a [`Rejection`] carrying the limit that was violated. On
//! rejection the caller's document is untouched.

use uuid::Uuid;

use crate::{Category, LedgerDocument, Money, Rejection, ResultRejection, util::normalize_display};

mod allocations;
mod bills;
mod categories;
mod income;
mod ledger;
mod savings;
mod transactions;

pub use allocations::propose_allocation_edit;
pub use bills::{add_bill, remove_bill, update_bill};
pub use categories::{add_category, delete_category, hide_category, unhide_category};
pub use income::{add_income_source, remove_income_source, update_income_source};
pub use ledger::{complete_onboarding, update_settings, wipe};
pub use savings::{
    create_goal, delete_goal, monthly_need, update_emergency_plan, update_goal,
};
pub use transactions::{
    amend_transaction, propose_deposit, propose_transaction, remove_transaction,
};

/// Highest `day_of_month` a recurring item may use.
const MAX_DAY_OF_MONTH: u32 = 31;

fn require_positive(amount: Money) -> ResultRejection<()> {
    if !amount.is_positive() {
        return Err(Rejection::NonPositiveAmount(amount));
    }
    require_in_range(amount)
}

fn require_non_negative(amount: Money, label: &str) -> ResultRejection<()> {
    if amount.is_negative() {
        return Err(Rejection::InvalidAmount(format!(
            "{label} must be >= 0, got {amount}"
        )));
    }
    require_in_range(amount)
}

fn require_in_range(amount: Money) -> ResultRejection<()> {
    if amount > Money::MAX_ENTRY {
        return Err(Rejection::InvalidAmount(format!(
            "amount {amount} exceeds the maximum of {}",
            Money::MAX_ENTRY
        )));
    }
    Ok(())
}

/// Registered and not hidden.
fn require_visible(document: &LedgerDocument, category: &Category) -> ResultRejection<()> {
    document.require_category(category)?;
    if document.is_hidden(category) {
        return Err(Rejection::InvalidInput(format!(
            "category \"{category}\" is hidden"
        )));
    }
    Ok(())
}

fn require_day(day_of_month: u32) -> ResultRejection<()> {
    if (1..=MAX_DAY_OF_MONTH).contains(&day_of_month) {
        Ok(())
    } else {
        Err(Rejection::InvalidInput(format!(
            "day of month must be between 1 and {MAX_DAY_OF_MONTH}, got {day_of_month}"
        )))
    }
}

fn required_name(value: &str, label: &str) -> ResultRejection<String> {
    normalize_display(value)
        .ok_or_else(|| Rejection::InvalidInput(format!("{label} name must not be empty")))
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}
