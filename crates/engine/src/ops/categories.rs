use crate::{
    Category, LedgerDocument, Metrics, Money, Rejection, ResultRejection, util::normalize_key,
};

use super::required_name;

fn require_unused(metrics: &Metrics, category: &Category) -> ResultRejection<()> {
    let spent = metrics.spent(category);
    if !spent.is_zero() {
        return Err(Rejection::CategoryInUse {
            category: category.clone(),
            spent,
        });
    }
    Ok(())
}

fn require_registered(document: &LedgerDocument, category: &Category) -> ResultRejection<()> {
    if document.has_category(category) {
        Ok(())
    } else {
        Err(Rejection::UnknownCategory(category.to_string()))
    }
}

/// Whether a category with the same normalized name is already registered.
pub(crate) fn name_taken(document: &LedgerDocument, name: &str) -> bool {
    let key = normalize_key(name);
    document
        .categories
        .iter()
        .any(|c| normalize_key(c.as_str()) == key)
}

/// Register a new budget line with an empty allocation.
pub fn add_category(document: &LedgerDocument, name: &str) -> ResultRejection<LedgerDocument> {
    let display = required_name(name, "category")?;
    let category = Category::from(display);
    if category.is_ledger_only() {
        return Err(Rejection::ReservedCategory(category));
    }
    if name_taken(document, category.as_str()) {
        return Err(Rejection::ExistingKey(category.to_string()));
    }

    let mut next = document.clone();
    next.categories.push(category.clone());
    next.allocations.insert(category.clone(), Money::ZERO);
    next.base_allocations.insert(category, Money::ZERO);
    Ok(next)
}

/// Hide a line that has no spending this month; its allocation and plan drop
/// to zero.
pub fn hide_category(
    document: &LedgerDocument,
    metrics: &Metrics,
    category: &Category,
) -> ResultRejection<LedgerDocument> {
    require_registered(document, category)?;
    require_unused(metrics, category)?;

    let mut next = document.clone();
    next.hidden_categories.insert(category.clone());
    next.allocations.insert(category.clone(), Money::ZERO);
    next.base_allocations.insert(category.clone(), Money::ZERO);
    Ok(next)
}

/// Make a hidden line visible again. Its allocation stays at zero until
/// edited.
pub fn unhide_category(
    document: &LedgerDocument,
    category: &Category,
) -> ResultRejection<LedgerDocument> {
    require_registered(document, category)?;
    let mut next = document.clone();
    next.hidden_categories.remove(category);
    Ok(next)
}

/// Remove a user-defined line with no spending this month.
pub fn delete_category(
    document: &LedgerDocument,
    metrics: &Metrics,
    category: &Category,
) -> ResultRejection<LedgerDocument> {
    require_registered(document, category)?;
    if category.is_protected() {
        return Err(Rejection::ProtectedCategory(category.clone()));
    }
    if document.goal(category).is_some() {
        return Err(Rejection::InvalidInput(format!(
            "\"{category}\" belongs to a goal; delete the goal instead"
        )));
    }
    require_unused(metrics, category)?;

    let mut next = document.clone();
    next.categories.retain(|c| c != category);
    next.hidden_categories.remove(category);
    next.allocations.remove(category);
    next.base_allocations.remove(category);
    next.spent.remove(category);
    Ok(next)
}
