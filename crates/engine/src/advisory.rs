//! Advisory boundary.
//!
//! A text-generation collaborator may *propose* allocations or an emergency
//! plan; it never mutates the ledger. Its free-form answer is parsed strictly
//! into a typed proposal, shown to the user, and only applied through the same
//! validators as a manual edit.

use std::{collections::BTreeMap, future::Future, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    AdvisoryError, Category, LedgerDocument, Metrics, Money, Rejection, ResultRejection,
    categories::MISCELLANEOUS,
    derive_metrics,
    ops::{propose_allocation_edit, update_emergency_plan},
};

/// A text-generation backend.
pub trait Advisor: Send + Sync {
    /// Send `prompt` and return the raw text answer.
    fn generate(&self, prompt: String) -> impl Future<Output = Result<String, AdvisoryError>> + Send;
}

/// Inputs of a budget split suggestion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BudgetAdviceRequest {
    pub available_pool: Money,
    pub categories: Vec<Category>,
    pub currency: String,
}

impl BudgetAdviceRequest {
    #[must_use]
    pub fn from_ledger(document: &LedgerDocument, metrics: &Metrics) -> Self {
        Self {
            available_pool: metrics.available_pool,
            categories: document.active_categories().cloned().collect(),
            currency: document.user_settings.currency.clone(),
        }
    }

    #[must_use]
    pub fn prompt(&self) -> String {
        let names: Vec<&str> = self.categories.iter().map(Category::as_str).collect();
        format!(
            "You are a personal finance advisor. The user has {currency}{pool} left to budget \
             for the rest of this month across these categories: {names:?}.\n\
             Rules:\n\
             1. Distribute the entire {currency}{pool} across the categories.\n\
             2. Each value is the amount still to spend this month, not the monthly total.\n\
             3. Keep amounts realistic for everyday costs.\n\
             4. Answer only with JSON: {{\"allocations\": {{\"Category Name\": number}}, \"advice\": \"string\"}}",
            currency = self.currency,
            pool = self.available_pool,
        )
    }
}

/// Inputs of an emergency fund plan suggestion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmergencyAdviceRequest {
    pub disposable_income: Money,
    pub currency: String,
}

impl EmergencyAdviceRequest {
    #[must_use]
    pub fn from_ledger(document: &LedgerDocument, metrics: &Metrics) -> Self {
        Self {
            disposable_income: metrics.disposable_income,
            currency: document.user_settings.currency.clone(),
        }
    }

    #[must_use]
    pub fn prompt(&self) -> String {
        format!(
            "Analyze an emergency fund. Monthly disposable income after bills: {}{}. \
             Suggest a target amount covering 3 to 6 months of expenses, a monthly \
             contribution and a target date. Answer only with JSON: \
             {{\"suggestedAmount\": number, \"deadline\": \"YYYY-MM-DD\", \"monthly\": number, \
             \"reasoning\": \"string\"}}",
            self.currency, self.disposable_income
        )
    }
}

/// Suggested remaining amount per category.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetProposal {
    pub allocations: BTreeMap<Category, Money>,
    #[serde(default)]
    pub advice: String,
}

impl BudgetProposal {
    /// Make the lines add up to `pool`.
    ///
    /// The difference goes to Miscellaneous when proposed, otherwise to the
    /// largest line; that line never drops below zero.
    #[must_use]
    pub fn balance(mut self, pool: Money) -> Self {
        let total: Money = self.allocations.values().sum();
        let remainder = pool - total;
        if remainder.is_zero() {
            return self;
        }
        let misc = Category::from(MISCELLANEOUS);
        let target = if self.allocations.contains_key(&misc) {
            Some(misc)
        } else {
            self.allocations
                .iter()
                .fold(None::<(&Category, Money)>, |best, (c, v)| match best {
                    Some((_, top)) if *v <= top => best,
                    _ => Some((c, *v)),
                })
                .map(|(c, _)| c.clone())
        };
        if let Some(target) = target {
            let line = self.allocations.entry(target).or_default();
            *line = (*line + remainder).non_negative();
        }
        self
    }
}

/// Suggested emergency fund plan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyProposal {
    pub suggested_amount: Money,
    pub deadline: Option<NaiveDate>,
    pub monthly: Money,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Deserialize)]
struct RawBudget {
    allocations: BTreeMap<String, serde_json::Number>,
    #[serde(default)]
    advice: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEmergency {
    suggested_amount: serde_json::Number,
    #[serde(default)]
    deadline: Option<String>,
    monthly: serde_json::Number,
    #[serde(default)]
    reasoning: String,
}

/// The outermost `{...}` of a chatty answer (code fences, preamble).
fn json_object(text: &str) -> Result<&str, AdvisoryError> {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&text[start..=end]),
        _ => Err(AdvisoryError::Unparseable(
            "no JSON object in answer".to_string(),
        )),
    }
}

/// Figures with sub-cent digits are rounded half up to the cent.
fn amount(field: &str, value: &serde_json::Number) -> Result<Money, AdvisoryError> {
    let unparseable = |reason: String| AdvisoryError::Unparseable(format!("{field}: {reason}"));
    let literal = value.to_string();
    if literal.starts_with('-') {
        return Err(unparseable(format!("negative amount {literal}")));
    }
    let money = match literal.split_once('.') {
        Some((units, fraction))
            if fraction.len() > 2 && fraction.bytes().all(|b| b.is_ascii_digit()) =>
        {
            let cents = Money::from_str(&format!("{units}.{}", &fraction[..2]))
                .map_err(|err| unparseable(err.to_string()))?;
            if fraction.as_bytes()[2] >= b'5' {
                cents
                    .checked_add(Money::new(1))
                    .ok_or_else(|| unparseable("amount too large".to_string()))?
            } else {
                cents
            }
        }
        _ => Money::from_str(&literal).map_err(|err| unparseable(err.to_string()))?,
    };
    if money > Money::MAX_ENTRY {
        return Err(unparseable(format!("amount {money} out of range")));
    }
    Ok(money)
}

/// Parse a budget split answer.
pub fn parse_budget_proposal(text: &str) -> Result<BudgetProposal, AdvisoryError> {
    let raw: RawBudget = serde_json::from_str(json_object(text)?)
        .map_err(|err| AdvisoryError::Unparseable(err.to_string()))?;
    let allocations = raw
        .allocations
        .iter()
        .map(|(name, value)| Ok((Category::from(name.as_str()), amount(name, value)?)))
        .collect::<Result<_, AdvisoryError>>()?;
    Ok(BudgetProposal {
        allocations,
        advice: raw.advice,
    })
}

/// Parse an emergency plan answer.
pub fn parse_emergency_proposal(text: &str) -> Result<EmergencyProposal, AdvisoryError> {
    let raw: RawEmergency = serde_json::from_str(json_object(text)?)
        .map_err(|err| AdvisoryError::Unparseable(err.to_string()))?;
    let deadline = raw
        .deadline
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| {
            NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .map_err(|err| AdvisoryError::Unparseable(format!("deadline: {err}")))
        })
        .transpose()?;
    Ok(EmergencyProposal {
        suggested_amount: amount("suggestedAmount", &raw.suggested_amount)?,
        deadline,
        monthly: amount("monthly", &raw.monthly)?,
        reasoning: raw.reasoning,
    })
}

/// Ask `advisor` for a budget split of the current free cash.
pub async fn request_budget_proposal<A: Advisor>(
    advisor: &A,
    document: &LedgerDocument,
    metrics: &Metrics,
) -> Result<BudgetProposal, AdvisoryError> {
    let request = BudgetAdviceRequest::from_ledger(document, metrics);
    let text = advisor.generate(request.prompt()).await?;
    let proposal = parse_budget_proposal(&text)?;
    tracing::debug!(lines = proposal.allocations.len(), "budget proposal received");
    Ok(proposal.balance(request.available_pool))
}

/// Ask `advisor` for an emergency fund plan.
pub async fn request_emergency_proposal<A: Advisor>(
    advisor: &A,
    document: &LedgerDocument,
    metrics: &Metrics,
) -> Result<EmergencyProposal, AdvisoryError> {
    let request = EmergencyAdviceRequest::from_ledger(document, metrics);
    let text = advisor.generate(request.prompt()).await?;
    parse_emergency_proposal(&text)
}

/// Apply a reviewed budget proposal line by line through
/// [`propose_allocation_edit`].
///
/// Cuts run before raises so freed cash is available to later lines; metrics
/// are recomputed after every line. One rejected line rejects the whole
/// proposal.
pub fn apply_budget_proposal(
    document: &LedgerDocument,
    proposal: &BudgetProposal,
    now: DateTime<Utc>,
) -> ResultRejection<LedgerDocument> {
    if let Some((category, remaining)) = proposal
        .allocations
        .iter()
        .find(|(_, remaining)| remaining.is_negative() || **remaining > Money::MAX_ENTRY)
    {
        return Err(Rejection::InvalidAmount(format!(
            "proposed amount {remaining} for \"{category}\" is out of range"
        )));
    }
    let metrics = derive_metrics(document, now);
    let mut lines: Vec<(&Category, Money, Money)> = proposal
        .allocations
        .iter()
        .map(|(category, remaining)| {
            let delta = *remaining + metrics.spent(category) - document.allocation(category);
            (category, *remaining, delta)
        })
        .collect();
    lines.sort_by_key(|(_, _, delta)| *delta);

    let mut next = document.clone();
    for (category, remaining, _) in lines {
        let metrics = derive_metrics(&next, now);
        next = propose_allocation_edit(&next, &metrics, category, remaining)?;
    }
    Ok(next)
}

/// Adopt a reviewed emergency plan.
pub fn apply_emergency_proposal(
    document: &LedgerDocument,
    proposal: &EmergencyProposal,
) -> ResultRejection<LedgerDocument> {
    update_emergency_plan(document, proposal.suggested_amount, proposal.deadline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::test_support::{funded, now};

    struct Canned(Result<String, AdvisoryError>);

    impl Advisor for Canned {
        async fn generate(&self, _prompt: String) -> Result<String, AdvisoryError> {
            self.0.clone()
        }
    }

    fn line(name: &str, major: i64) -> (Category, Money) {
        (Category::from(name), Money::from_major(major))
    }

    #[test]
    fn parses_fenced_answer() {
        let text = "Sure! Here is a plan:\n```json\n{\"allocations\": {\"Groceries\": 400, \
                    \"Eating Out\": 120.5}, \"advice\": \"Cook more.\"}\n```";
        let proposal = parse_budget_proposal(text).unwrap();
        assert_eq!(proposal.allocations[&Category::from("Groceries")], Money::from_major(400));
        assert_eq!(proposal.allocations[&Category::from("Eating Out")], Money::new(12_050));
        assert_eq!(proposal.advice, "Cook more.");
    }

    #[test]
    fn rejects_answers_without_json() {
        assert!(matches!(
            parse_budget_proposal("I cannot help with that."),
            Err(AdvisoryError::Unparseable(_))
        ));
        assert!(matches!(
            parse_budget_proposal("{\"advice\": \"no allocations\"}"),
            Err(AdvisoryError::Unparseable(_))
        ));
    }

    #[test]
    fn sub_cent_figures_are_rounded_to_the_cent() {
        let proposal = parse_budget_proposal(
            "{\"allocations\": {\"Groceries\": 10.125, \"Shopping\": 99.994, \
             \"Leisure & Events\": 0.999}, \"advice\": \"\"}",
        )
        .unwrap();
        assert_eq!(proposal.allocations[&Category::from("Groceries")], Money::new(1013));
        assert_eq!(proposal.allocations[&Category::from("Shopping")], Money::new(9999));
        assert_eq!(
            proposal.allocations[&Category::from("Leisure & Events")],
            Money::new(100)
        );
    }

    #[test]
    fn rejects_negative_and_oversized_amounts() {
        assert!(parse_budget_proposal("{\"allocations\": {\"Groceries\": -5}}").is_err());
        assert!(
            parse_budget_proposal("{\"allocations\": {\"Groceries\": 90000000000000000}}")
                .is_err()
        );
        assert!(parse_budget_proposal("{\"allocations\": {\"Groceries\": -0.001}}").is_err());
    }

    #[test]
    fn balance_pushes_remainder_into_miscellaneous() {
        let proposal = BudgetProposal {
            allocations: [line("Groceries", 300), line("Miscellaneous", 20)].into(),
            advice: String::new(),
        }
        .balance(Money::from_major(350));
        assert_eq!(
            proposal.allocations[&Category::from("Miscellaneous")],
            Money::from_major(50)
        );
    }

    #[test]
    fn balance_falls_back_to_largest_line_and_floors_at_zero() {
        let proposal = BudgetProposal {
            allocations: [line("Groceries", 300), line("Shopping", 100)].into(),
            advice: String::new(),
        }
        .balance(Money::from_major(350));
        assert_eq!(
            proposal.allocations[&Category::from("Groceries")],
            Money::from_major(250)
        );

        let overdrawn = BudgetProposal {
            allocations: [line("Groceries", 300)].into(),
            advice: String::new(),
        }
        .balance(Money::from_major(-100));
        assert_eq!(overdrawn.allocations[&Category::from("Groceries")], Money::ZERO);
    }

    #[test]
    fn parses_emergency_plan() {
        let text = r#"{"suggestedAmount": 9000, "deadline": "2027-06-01", "monthly": 750, "reasoning": "Six months of costs."}"#;
        let proposal = parse_emergency_proposal(text).unwrap();
        assert_eq!(proposal.suggested_amount, Money::from_major(9000));
        assert_eq!(proposal.deadline, NaiveDate::from_ymd_opt(2027, 6, 1));
        assert_eq!(proposal.monthly, Money::from_major(750));

        let bad_date = r#"{"suggestedAmount": 1, "deadline": "next June", "monthly": 1}"#;
        assert!(parse_emergency_proposal(bad_date).is_err());
    }

    #[test]
    fn applying_moves_cuts_before_raises() {
        let mut doc = funded();
        doc.transactions.clear();
        doc.transactions.push(crate::Transaction {
            id: "salary".to_string(),
            amount: Money::from_major(1220),
            category: Category::Income,
            description: String::new(),
            timestamp: now(),
            is_system: false,
            is_contribution: false,
        });
        // Nothing unallocated: the raise only fits once the cut has run.
        let proposal = BudgetProposal {
            allocations: [line("Groceries", 450), line("Shopping", 0)].into(),
            advice: String::new(),
        };
        let next = apply_budget_proposal(&doc, &proposal, now()).unwrap();
        assert_eq!(next.allocation(&Category::from("Groceries")), Money::from_major(450));
        assert_eq!(next.allocation(&Category::from("Shopping")), Money::ZERO);
    }

    #[test]
    fn applying_is_all_or_nothing() {
        let doc = funded();
        let proposal = BudgetProposal {
            allocations: [line("Groceries", 100), line("Shopping", 5000)].into(),
            advice: String::new(),
        };
        let err = apply_budget_proposal(&doc, &proposal, now()).unwrap_err();
        assert!(matches!(err, Rejection::ExceedsUnallocated { .. }));
    }

    #[test]
    fn applying_refuses_out_of_range_figures() {
        let proposal = BudgetProposal {
            allocations: [(Category::from("Groceries"), Money::new(i64::MAX))].into(),
            advice: String::new(),
        };
        let err = apply_budget_proposal(&funded(), &proposal, now()).unwrap_err();
        assert!(matches!(err, Rejection::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn request_balances_against_available_pool() {
        let doc = funded();
        let metrics = derive_metrics(&doc, now());
        assert_eq!(metrics.available_pool, Money::from_major(3000));

        let advisor = Canned(Ok(
            r#"{"allocations": {"Groceries": 1000, "Miscellaneous": 1000}, "advice": "ok"}"#
                .to_string(),
        ));
        let proposal = request_budget_proposal(&advisor, &doc, &metrics).await.unwrap();
        let total: Money = proposal.allocations.values().sum();
        assert_eq!(total, Money::from_major(3000));
    }

    #[tokio::test]
    async fn unavailable_advisor_is_reported() {
        let doc = funded();
        let metrics = derive_metrics(&doc, now());
        let advisor = Canned(Err(AdvisoryError::Unavailable("HTTP 503".to_string())));
        assert_eq!(
            request_emergency_proposal(&advisor, &doc, &metrics)
                .await
                .unwrap_err(),
            AdvisoryError::Unavailable("HTTP 503".to_string())
        );
    }
}
