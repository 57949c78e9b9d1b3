use crate::{Category, LedgerDocument, Metrics, Money, Rejection, ResultRejection};

use super::{require_non_negative, require_visible};

/// Set what is left to spend on a budget line this month.
///
/// The stored allocation becomes `new_remaining + real_spent`; any increase
/// must fit in the unallocated cash. The base allocation follows, so the new
/// figure is also next month's plan.
pub fn propose_allocation_edit(
    document: &LedgerDocument,
    metrics: &Metrics,
    category: &Category,
    new_remaining: Money,
) -> ResultRejection<LedgerDocument> {
    if category.is_ledger_only() {
        return Err(Rejection::ReservedCategory(category.clone()));
    }
    require_visible(document, category)?;
    require_non_negative(new_remaining, "remaining budget")?;

    let allocation = new_remaining + metrics.spent(category);
    let increase = allocation - document.allocation(category);
    if increase.is_positive() && increase > metrics.unallocated {
        return Err(Rejection::ExceedsUnallocated {
            requested: increase,
            available: metrics.unallocated.non_negative(),
        });
    }

    let mut next = document.clone();
    next.allocations.insert(category.clone(), allocation);
    next.base_allocations.insert(category.clone(), allocation);
    tracing::debug!(%category, %allocation, "allocation edited");
    Ok(next)
}
