use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod ledger {
    use super::*;

    /// One budget line as shown in the budget view.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryView {
        pub name: String,
        pub hidden: bool,
        pub allocation_minor: i64,
        pub base_allocation_minor: i64,
        /// Logged against the line this month; for goals and the emergency
        /// fund these are the deposits.
        pub spent_minor: i64,
        pub remaining_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategorySpendView {
        pub category: String,
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MonthRecapView {
        pub year: i32,
        pub month: u32,
        pub rollover_minor: i64,
        pub total_income_minor: i64,
        pub total_spent_minor: i64,
        pub invested_minor: i64,
        pub emergency_added_minor: i64,
        pub savings_added_minor: i64,
        pub completed_goals: Vec<String>,
        pub top_category: Option<CategorySpendView>,
        pub bottom_category: Option<CategorySpendView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MetricsView {
        pub total_income_minor: i64,
        /// Income of the month plus the carried rollover.
        pub effective_minor: i64,
        pub bills_total_minor: i64,
        pub emergency_balance_minor: i64,
        pub goals_balance_minor: i64,
        pub total_variable_spending_minor: i64,
        pub unallocated_minor: i64,
        pub total_allocated_minor: i64,
        pub allocated_remaining_minor: i64,
        pub total_spent_minor: i64,
        pub total_invested_all_time_minor: i64,
        pub available_pool_minor: i64,
        pub disposable_income_minor: i64,
        pub emergency_monthly_need_minor: i64,
        pub previous_month: MonthRecapView,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: String,
        pub category: String,
        pub amount_minor: i64,
        pub description: String,
        /// RFC3339 timestamp.
        pub timestamp: DateTime<FixedOffset>,
        pub is_system: bool,
        pub is_contribution: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BillView {
        pub name: String,
        pub amount_minor: i64,
        pub day_of_month: u32,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct IncomeSourceView {
        pub id: String,
        pub name: String,
        pub amount_minor: i64,
        pub day_of_month: u32,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GoalView {
        pub id: String,
        pub name: String,
        pub target_amount_minor: i64,
        pub current_amount_minor: i64,
        pub target_date: Option<NaiveDate>,
        pub monthly_need_minor: i64,
        pub complete: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EmergencyView {
        pub balance_minor: i64,
        pub target_minor: i64,
        pub deadline: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LedgerView {
        pub version: i64,
        pub onboarding_complete: bool,
        pub categories: Vec<CategoryView>,
        /// Newest first.
        pub transactions: Vec<TransactionView>,
        pub bills: Vec<BillView>,
        pub income_sources: Vec<IncomeSourceView>,
        pub goals: Vec<GoalView>,
        pub emergency: EmergencyView,
        pub income_rollover_minor: i64,
        pub settings: super::settings::Settings,
        pub metrics: MetricsView,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub category: String,
        /// Must be > 0.
        pub amount_minor: i64,
        pub description: Option<String>,
        /// Optional: if absent, server uses now().
        pub timestamp: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DepositNew {
        /// `Emergency Fund` or the name of a savings goal.
        pub category: String,
        pub amount_minor: i64,
        pub description: Option<String>,
        pub timestamp: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionUpdate {
        pub amount_minor: Option<i64>,
        pub description: Option<String>,
        pub timestamp: Option<DateTime<FixedOffset>>,
    }
}

pub mod allocation {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AllocationUpdate {
        /// Amount still to be spent this month; the allocation becomes this
        /// plus what was already spent.
        pub remaining_minor: i64,
    }
}

pub mod recurring {
    use super::*;

    /// Body of bill and income-source create/update requests.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct Recurring {
        pub name: String,
        pub amount_minor: i64,
        pub day_of_month: u32,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Created {
        pub id: String,
    }
}

pub mod category {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryCreate {
        pub name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Visibility {
        pub hidden: bool,
    }
}

pub mod goal {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GoalNew {
        pub name: String,
        pub target_amount_minor: i64,
        pub target_date: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GoalUpdate {
        pub target_amount_minor: i64,
        pub target_date: Option<NaiveDate>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EmergencyPlan {
        pub target_minor: i64,
        pub deadline: Option<NaiveDate>,
    }
}

pub mod settings {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Settings {
        pub currency: String,
        pub language: String,
        pub country: String,
    }
}

pub mod advice {
    use super::*;

    /// Suggested remaining amount per category, keyed by category name.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetProposal {
        pub allocations_minor: BTreeMap<String, i64>,
        pub advice: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EmergencyProposal {
        pub suggested_amount_minor: i64,
        pub deadline: Option<NaiveDate>,
        pub monthly_minor: i64,
        pub reasoning: String,
    }
}
