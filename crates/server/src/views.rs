//! Mapping of engine values to API bodies.

use api_types::{
    advice,
    ledger::{
        BillView, CategorySpendView, CategoryView, EmergencyView, GoalView, IncomeSourceView,
        LedgerView, MetricsView, MonthRecapView, TransactionView,
    },
    settings::Settings,
};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use engine::{
    BudgetProposal, Category, CategorySpend, EmergencyProposal, Ledger, LedgerDocument, Metrics,
    Money, MonthRecap, Transaction, UserSettings, ops,
};

fn minor(amount: Money) -> i64 {
    amount.cents()
}

fn map_spend(spend: CategorySpend) -> CategorySpendView {
    CategorySpendView {
        category: spend.category.to_string(),
        amount_minor: minor(spend.amount),
    }
}

fn map_recap(recap: MonthRecap) -> MonthRecapView {
    MonthRecapView {
        year: recap.year,
        month: recap.month,
        rollover_minor: minor(recap.rollover),
        total_income_minor: minor(recap.total_income),
        total_spent_minor: minor(recap.total_spent),
        invested_minor: minor(recap.invested),
        emergency_added_minor: minor(recap.emergency_added),
        savings_added_minor: minor(recap.savings_added),
        completed_goals: recap.completed_goals,
        top_category: recap.top_category.map(map_spend),
        bottom_category: recap.bottom_category.map(map_spend),
    }
}

pub(crate) fn metrics(document: &LedgerDocument, metrics: Metrics, now: DateTime<Utc>) -> MetricsView {
    let emergency_need = ops::monthly_need(
        document.emergency_target,
        metrics.emergency_balance,
        document.emergency_deadline,
        now,
    );
    MetricsView {
        total_income_minor: minor(metrics.total_income),
        effective_minor: minor(metrics.effective),
        bills_total_minor: minor(metrics.bills_total),
        emergency_balance_minor: minor(metrics.emergency_balance),
        goals_balance_minor: minor(metrics.goals_balance),
        total_variable_spending_minor: minor(metrics.total_variable_spending),
        unallocated_minor: minor(metrics.unallocated),
        total_allocated_minor: minor(metrics.total_allocated),
        allocated_remaining_minor: minor(metrics.allocated_remaining),
        total_spent_minor: minor(metrics.total_spent),
        total_invested_all_time_minor: minor(metrics.total_invested_all_time),
        available_pool_minor: minor(metrics.available_pool),
        disposable_income_minor: minor(metrics.disposable_income),
        emergency_monthly_need_minor: minor(emergency_need),
        previous_month: map_recap(metrics.previous_month),
    }
}

fn map_transaction(tx: &Transaction, utc: &FixedOffset) -> TransactionView {
    TransactionView {
        id: tx.id.clone(),
        category: tx.category.to_string(),
        amount_minor: minor(tx.amount),
        description: tx.description.clone(),
        timestamp: tx.timestamp.with_timezone(utc),
        is_system: tx.is_system,
        is_contribution: tx.is_contribution,
    }
}

pub(crate) fn settings(settings: &UserSettings) -> Settings {
    Settings {
        currency: settings.currency.clone(),
        language: settings.language.clone(),
        country: settings.country.clone(),
    }
}

pub(crate) fn ledger(ledger: Ledger, now: DateTime<Utc>) -> LedgerView {
    let Ledger {
        document,
        version,
        metrics: figures,
    } = ledger;
    let utc = Utc.fix();

    let categories = document
        .categories
        .iter()
        .map(|category| CategoryView {
            name: category.to_string(),
            hidden: document.is_hidden(category),
            allocation_minor: minor(document.allocation(category)),
            base_allocation_minor: minor(
                document
                    .base_allocations
                    .get(category)
                    .copied()
                    .unwrap_or_default(),
            ),
            spent_minor: minor(figures.spent(category)),
            remaining_minor: minor(figures.remaining(&document, category)),
        })
        .collect();

    let goals = document
        .custom_goals
        .iter()
        .map(|goal| GoalView {
            id: goal.id.clone(),
            name: goal.name.clone(),
            target_amount_minor: minor(goal.target_amount),
            current_amount_minor: minor(goal.current_amount),
            target_date: goal.target_date,
            monthly_need_minor: minor(ops::monthly_need(
                goal.target_amount,
                goal.current_amount,
                goal.target_date,
                now,
            )),
            complete: goal.is_complete(),
        })
        .collect();

    LedgerView {
        version,
        onboarding_complete: document.onboarding_complete,
        categories,
        transactions: document
            .transactions
            .iter()
            .map(|tx| map_transaction(tx, &utc))
            .collect(),
        bills: document
            .bills
            .iter()
            .map(|(name, bill)| BillView {
                name: name.clone(),
                amount_minor: minor(bill.amount),
                day_of_month: bill.day_of_month,
            })
            .collect(),
        income_sources: document
            .income_sources
            .iter()
            .map(|source| IncomeSourceView {
                id: source.id.clone(),
                name: source.name.clone(),
                amount_minor: minor(source.amount),
                day_of_month: source.day_of_month,
            })
            .collect(),
        goals,
        emergency: EmergencyView {
            balance_minor: minor(figures.emergency_balance),
            target_minor: minor(document.emergency_target),
            deadline: document.emergency_deadline,
        },
        income_rollover_minor: minor(document.income_rollover),
        settings: settings(&document.user_settings),
        metrics: metrics(&document, figures, now),
    }
}

pub(crate) fn budget_proposal(proposal: BudgetProposal) -> advice::BudgetProposal {
    advice::BudgetProposal {
        allocations_minor: proposal
            .allocations
            .into_iter()
            .map(|(category, amount)| (category.to_string(), minor(amount)))
            .collect(),
        advice: proposal.advice,
    }
}

pub(crate) fn from_budget_proposal(proposal: advice::BudgetProposal) -> BudgetProposal {
    BudgetProposal {
        allocations: proposal
            .allocations_minor
            .into_iter()
            .map(|(name, amount)| (Category::from(name), Money::new(amount)))
            .collect(),
        advice: proposal.advice,
    }
}

pub(crate) fn emergency_proposal(proposal: EmergencyProposal) -> advice::EmergencyProposal {
    advice::EmergencyProposal {
        suggested_amount_minor: minor(proposal.suggested_amount),
        deadline: proposal.deadline,
        monthly_minor: minor(proposal.monthly),
        reasoning: proposal.reasoning,
    }
}

pub(crate) fn from_emergency_proposal(proposal: advice::EmergencyProposal) -> EmergencyProposal {
    EmergencyProposal {
        suggested_amount: Money::new(proposal.suggested_amount_minor),
        deadline: proposal.deadline,
        monthly: Money::new(proposal.monthly_minor),
        reasoning: proposal.reasoning,
    }
}
