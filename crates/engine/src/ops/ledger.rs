use std::collections::BTreeMap;

use crate::{LedgerDocument, Money, UserSettings};

/// Start over: history, recurring items, goals and fund deposits are cleared
/// and every allocation drops to zero.
///
/// The category list, hidden set, emergency plan and settings survive, as
/// does the rollover stamp so the next pass does not close a month.
#[must_use]
pub fn wipe(document: &LedgerDocument) -> LedgerDocument {
    let zeroed = document
        .categories
        .iter()
        .map(|c| (c.clone(), Money::ZERO))
        .collect::<BTreeMap<_, _>>();
    LedgerDocument {
        categories: document.categories.clone(),
        hidden_categories: document.hidden_categories.clone(),
        base_allocations: zeroed.clone(),
        allocations: zeroed.clone(),
        spent: zeroed,
        emergency_target: document.emergency_target,
        emergency_deadline: document.emergency_deadline,
        last_processed_month: document.last_processed_month,
        user_settings: document.user_settings.clone(),
        ..LedgerDocument::default()
    }
}

/// Replace the presentation settings.
#[must_use]
pub fn update_settings(document: &LedgerDocument, settings: UserSettings) -> LedgerDocument {
    let mut next = document.clone();
    next.user_settings = settings;
    next
}

#[must_use]
pub fn complete_onboarding(document: &LedgerDocument) -> LedgerDocument {
    let mut next = document.clone();
    next.onboarding_complete = true;
    next
}
