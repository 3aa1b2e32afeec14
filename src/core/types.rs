use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::calendar::PlanMonth;
use super::error::PlanError;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Snowball,
    Avalanche,
}

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::Snowball, Strategy::Avalanche];

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Snowball => "snowball",
            Strategy::Avalanche => "avalanche",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "snowball" => Ok(Strategy::Snowball),
            "avalanche" => Ok(Strategy::Avalanche),
            _ => Err(PlanError::InvalidStrategy(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtInput {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub balance: f64,
    /// Fraction (0.18) or percentage (18.0); anything above 1 is read as a percentage.
    #[serde(default, alias = "aprAnnual", alias = "apr")]
    pub apr_annual: Option<f64>,
    #[serde(alias = "minPayment")]
    pub min_payment: f64,
    #[serde(default, alias = "dueDay")]
    pub due_day: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateChange {
    pub debt_id: i64,
    /// Zero-based month index the new rate takes effect in.
    pub month_offset: u32,
    pub apr_annual: f64,
}

#[derive(Debug, Clone)]
pub struct PlanInputs {
    pub debts: Vec<DebtInput>,
    pub strategy: String,
    pub monthly_budget: f64,
    pub extra_payment: f64,
    pub rate_changes: Vec<RateChange>,
    pub start_month: PlanMonth,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    Minimum,
    Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebtPayment {
    pub month: String,
    pub debt_id: i64,
    pub kind: PaymentKind,
    pub payment: f64,
    pub principal: f64,
    pub interest: f64,
    pub balance_after: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebtPlan {
    pub schedule: Vec<DebtPayment>,
    pub months_to_payoff: u32,
    pub total_interest: f64,
    pub strategy: Strategy,
}

impl DebtPlan {
    pub(crate) fn empty(strategy: Strategy) -> Self {
        Self {
            schedule: Vec::new(),
            months_to_payoff: 0,
            total_interest: 0.0,
            strategy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthSummary {
    pub month_index: u32,
    pub month: String,
    pub interest_accrued: f64,
    pub cumulative_interest: f64,
    pub minimum_paid: f64,
    pub extra_paid: f64,
    pub remaining_balance: f64,
    pub active_debts: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebtPayoffSummary {
    pub debt_id: i64,
    pub name: String,
    pub payoff_month: Option<String>,
    pub months_to_payoff: Option<u32>,
    pub total_paid: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrategyOutcome {
    pub strategy: Strategy,
    pub months_to_payoff: u32,
    pub total_interest: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyComparison {
    pub snowball: StrategyOutcome,
    pub avalanche: StrategyOutcome,
    pub interest_saved: f64,
    pub months_saved: i64,
    pub recommended: Strategy,
}
