mod calendar;
mod engine;
mod error;
mod solver;
mod types;

pub use calendar::PlanMonth;
pub use engine::{
    MAX_MONTHS, PAID_OFF_EPSILON, compare_strategies, generate_plan, run_monthly_trace,
    summarize_payoffs,
};
pub use error::PlanError;
pub use solver::{
    ExtraPaymentIteration, ExtraPaymentSolveConfig, ExtraPaymentSolveResult, MAX_SOLVER_ITERATIONS,
    solve_extra_payment,
};
pub use types::{
    DebtInput, DebtPayment, DebtPayoffSummary, DebtPlan, MonthSummary, PaymentKind, PlanInputs,
    RateChange, Strategy, StrategyComparison, StrategyOutcome,
};
