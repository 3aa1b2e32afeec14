use serde::Serialize;

use super::engine::{MAX_MONTHS, generate_plan};
use super::error::PlanError;
use super::types::{DebtPlan, PlanInputs};

pub const MAX_SOLVER_ITERATIONS: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtraPaymentSolveConfig {
    pub target_months: u32,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

impl Default for ExtraPaymentSolveConfig {
    fn default() -> Self {
        Self {
            target_months: 36,
            search_min: 0.0,
            search_max: 10_000.0,
            tolerance: 1.0,
            max_iterations: 40,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExtraPaymentIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_extra: f64,
    pub months_to_payoff: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtraPaymentSolveResult {
    pub target_months: u32,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub solved_extra_payment: Option<f64>,
    pub achieved_months: Option<u32>,
    pub achieved_total_interest: Option<f64>,
    pub iterations: Vec<ExtraPaymentIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

// Bisection relies on a larger extra payment never lengthening the plan.
pub fn solve_extra_payment(
    inputs: &PlanInputs,
    config: ExtraPaymentSolveConfig,
) -> Result<ExtraPaymentSolveResult, PlanError> {
    validate_config(config)?;

    let mut iterations = Vec::new();
    let low_plan = plan_with_extra(inputs, config.search_min)?;
    let high_plan = plan_with_extra(inputs, config.search_max)?;

    let mut solved = None;
    let mut converged = false;
    let feasible;
    let message;

    if meets_target(&low_plan, config) {
        solved = Some((config.search_min, low_plan));
        converged = true;
        feasible = true;
        message = "Already meets target at lower extra-payment bound.".to_string();
    } else if !meets_target(&high_plan, config) {
        feasible = false;
        message = "No feasible extra payment found within the search bounds.".to_string();
    } else {
        let mut lo = config.search_min;
        let mut hi = config.search_max;
        let mut hi_plan = high_plan;
        for it in 1..=config.max_iterations {
            let mid = (lo + hi) * 0.5;
            if mid <= lo || mid >= hi {
                converged = true;
                break;
            }
            let plan = plan_with_extra(inputs, mid)?;
            iterations.push(ExtraPaymentIteration {
                iteration: it,
                lower_bound: lo,
                upper_bound: hi,
                candidate_extra: mid,
                months_to_payoff: plan.months_to_payoff,
            });

            if meets_target(&plan, config) {
                hi = mid;
                hi_plan = plan;
            } else {
                lo = mid;
            }

            if (hi - lo).abs() <= config.tolerance {
                converged = true;
                break;
            }
        }
        solved = Some((hi, hi_plan));
        feasible = true;
        message = if converged {
            "Solved required extra payment.".to_string()
        } else {
            "Reached max iterations before tolerance was met; returning best estimate.".to_string()
        };
    }

    Ok(ExtraPaymentSolveResult {
        target_months: config.target_months,
        search_min: config.search_min,
        search_max: config.search_max,
        tolerance: config.tolerance,
        solved_extra_payment: solved.as_ref().map(|(extra, _)| *extra),
        achieved_months: solved.as_ref().map(|(_, plan)| plan.months_to_payoff),
        achieved_total_interest: solved.as_ref().map(|(_, plan)| plan.total_interest),
        iterations,
        converged,
        feasible,
        message,
    })
}

fn plan_with_extra(base: &PlanInputs, extra: f64) -> Result<DebtPlan, PlanError> {
    let mut inputs = base.clone();
    inputs.extra_payment = extra;
    generate_plan(&inputs)
}

// Hitting the month cap is never a payoff.
fn meets_target(plan: &DebtPlan, config: ExtraPaymentSolveConfig) -> bool {
    plan.months_to_payoff <= config.target_months && plan.months_to_payoff < MAX_MONTHS
}

fn validate_config(config: ExtraPaymentSolveConfig) -> Result<(), PlanError> {
    let invalid = |field: &'static str, reason: &str| -> Result<(), PlanError> {
        Err(PlanError::InvalidSolveConfig {
            field,
            reason: reason.to_string(),
        })
    };

    if config.target_months == 0 || config.target_months >= MAX_MONTHS {
        return invalid("target_months", "must be between 1 and 599");
    }
    if !config.search_min.is_finite() || !config.search_max.is_finite() {
        return invalid("search bounds", "must be finite");
    }
    if config.search_min < 0.0 {
        return invalid("search_min", "must be >= 0");
    }
    if config.search_max <= config.search_min {
        return invalid("search_max", "must be greater than search_min");
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return invalid("tolerance", "must be > 0");
    }
    if config.max_iterations == 0 || config.max_iterations > MAX_SOLVER_ITERATIONS {
        return invalid("max_iterations", "must be between 1 and 200");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DebtInput, PlanMonth};

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn zero_rate_inputs() -> PlanInputs {
        PlanInputs {
            debts: vec![DebtInput {
                id: 1,
                name: "Interest-free loan".to_string(),
                balance: 1_200.0,
                apr_annual: Some(0.0),
                min_payment: 50.0,
                due_day: None,
            }],
            strategy: "snowball".to_string(),
            monthly_budget: 50.0,
            extra_payment: 0.0,
            rate_changes: Vec::new(),
            start_month: PlanMonth::new(2025, 1).expect("valid month"),
        }
    }

    fn config(target_months: u32) -> ExtraPaymentSolveConfig {
        ExtraPaymentSolveConfig {
            target_months,
            search_min: 0.0,
            search_max: 2_000.0,
            tolerance: 0.01,
            max_iterations: 60,
        }
    }

    #[test]
    fn finds_extra_payment_for_interest_free_loan() {
        // 1200 over 12 months needs 100/month: 50 budget + 50 extra.
        let result = solve_extra_payment(&zero_rate_inputs(), config(12)).expect("must solve");
        assert!(result.feasible);
        assert!(result.converged);
        assert_close(result.solved_extra_payment.expect("value"), 50.0, 0.02);
        assert_eq!(result.achieved_months, Some(12));
        assert_eq!(result.achieved_total_interest, Some(0.0));
        assert!(!result.iterations.is_empty());
    }

    #[test]
    fn reports_lower_bound_when_already_on_target() {
        let result = solve_extra_payment(&zero_rate_inputs(), config(24)).expect("must solve");
        assert!(result.feasible);
        assert_eq!(result.solved_extra_payment, Some(0.0));
        assert_eq!(result.achieved_months, Some(24));
        assert!(result.iterations.is_empty());
    }

    #[test]
    fn reports_infeasible_when_upper_bound_too_low() {
        let mut cfg = config(2);
        cfg.search_max = 100.0;
        let result = solve_extra_payment(&zero_rate_inputs(), cfg).expect("must return result");
        assert!(!result.feasible);
        assert!(result.solved_extra_payment.is_none());
        assert!(result.achieved_months.is_none());
    }

    #[test]
    fn solved_extra_meets_target_with_interest() {
        let mut inputs = zero_rate_inputs();
        inputs.debts[0].apr_annual = Some(19.9);
        inputs.debts[0].balance = 5_000.0;
        let result = solve_extra_payment(&inputs, config(18)).expect("must solve");
        assert!(result.feasible);

        let extra = result.solved_extra_payment.expect("value");
        inputs.extra_payment = extra;
        let plan = generate_plan(&inputs).expect("valid plan");
        assert!(plan.months_to_payoff <= 18);

        inputs.extra_payment = (extra - 1.0).max(0.0);
        let slower = generate_plan(&inputs).expect("valid plan");
        assert!(slower.months_to_payoff > 18);
    }

    #[test]
    fn stops_when_bounds_stop_narrowing() {
        let cfg = ExtraPaymentSolveConfig {
            tolerance: 1e-300,
            max_iterations: MAX_SOLVER_ITERATIONS,
            ..config(12)
        };
        let result = solve_extra_payment(&zero_rate_inputs(), cfg).expect("must solve");
        assert!(result.feasible);
        assert!(result.converged);
        assert!(result.iterations.len() < MAX_SOLVER_ITERATIONS as usize);
        assert_close(result.solved_extra_payment.expect("value"), 50.0, 1e-3);
    }

    #[test]
    fn invalid_strategy_propagates() {
        let mut inputs = zero_rate_inputs();
        inputs.strategy = "ladder".to_string();
        let err = solve_extra_payment(&inputs, config(12)).expect_err("must reject");
        assert_eq!(err, PlanError::InvalidStrategy("ladder".to_string()));
    }

    #[test]
    fn rejects_bad_config() {
        let inputs = zero_rate_inputs();
        for (cfg, field) in [
            (config(0), "target_months"),
            (config(MAX_MONTHS), "target_months"),
            (
                ExtraPaymentSolveConfig {
                    search_max: 0.0,
                    ..config(12)
                },
                "search_max",
            ),
            (
                ExtraPaymentSolveConfig {
                    tolerance: 0.0,
                    ..config(12)
                },
                "tolerance",
            ),
            (
                ExtraPaymentSolveConfig {
                    max_iterations: 0,
                    ..config(12)
                },
                "max_iterations",
            ),
            (
                ExtraPaymentSolveConfig {
                    max_iterations: 4_000_000_000,
                    ..config(12)
                },
                "max_iterations",
            ),
        ] {
            match solve_extra_payment(&inputs, cfg) {
                Err(PlanError::InvalidSolveConfig { field: got, .. }) => assert_eq!(got, field),
                other => panic!("expected config error for {field}, got {other:?}"),
            }
        }
    }
}
