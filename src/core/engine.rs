use std::collections::HashMap;

use log::{debug, warn};

use super::error::PlanError;
use super::types::{
    DebtInput, DebtPayment, DebtPayoffSummary, DebtPlan, MonthSummary, PaymentKind, PlanInputs,
    RateChange, Strategy, StrategyComparison, StrategyOutcome,
};

pub const MAX_MONTHS: u32 = 600;

pub const PAID_OFF_EPSILON: f64 = 0.005;

#[derive(Debug)]
struct DebtState {
    id: i64,
    balance: f64,
    apr: f64,
    min_payment: f64,
}

impl DebtState {
    fn monthly_rate(&self) -> f64 {
        self.apr / 12.0
    }

    fn is_active(&self) -> bool {
        self.balance > PAID_OFF_EPSILON
    }
}

#[derive(Debug, Clone, Copy)]
struct MonthTracePoint {
    interest_accrued: f64,
    cumulative_interest: f64,
    minimum_paid: f64,
    extra_paid: f64,
    remaining_balance: f64,
    active_debts: usize,
}

pub fn generate_plan(inputs: &PlanInputs) -> Result<DebtPlan, PlanError> {
    let strategy = inputs.strategy.parse::<Strategy>()?;
    Ok(simulate_plan(inputs, strategy, None))
}

pub fn run_monthly_trace(inputs: &PlanInputs) -> Result<Vec<MonthSummary>, PlanError> {
    let strategy = inputs.strategy.parse::<Strategy>()?;
    let mut trace = Vec::new();
    simulate_plan(inputs, strategy, Some(&mut trace));

    Ok(trace
        .into_iter()
        .enumerate()
        .map(|(idx, point)| MonthSummary {
            month_index: idx as u32,
            month: inputs.start_month.offset(idx as u32).label(),
            interest_accrued: point.interest_accrued,
            cumulative_interest: point.cumulative_interest,
            minimum_paid: point.minimum_paid,
            extra_paid: point.extra_paid,
            remaining_balance: point.remaining_balance,
            active_debts: point.active_debts,
        })
        .collect())
}

// The strategy named in `inputs` is ignored.
pub fn compare_strategies(inputs: &PlanInputs) -> StrategyComparison {
    let [snowball, avalanche] = Strategy::ALL.map(|strategy| {
        let plan = simulate_plan(inputs, strategy, None);
        StrategyOutcome {
            strategy,
            months_to_payoff: plan.months_to_payoff,
            total_interest: plan.total_interest,
        }
    });

    let recommended = match avalanche.total_interest.total_cmp(&snowball.total_interest) {
        std::cmp::Ordering::Less => Strategy::Avalanche,
        std::cmp::Ordering::Greater => Strategy::Snowball,
        std::cmp::Ordering::Equal if avalanche.months_to_payoff < snowball.months_to_payoff => {
            Strategy::Avalanche
        }
        std::cmp::Ordering::Equal => Strategy::Snowball,
    };

    StrategyComparison {
        snowball,
        avalanche,
        interest_saved: round_cents(snowball.total_interest - avalanche.total_interest),
        months_saved: i64::from(snowball.months_to_payoff) - i64::from(avalanche.months_to_payoff),
        recommended,
    }
}

pub fn summarize_payoffs(inputs: &PlanInputs, plan: &DebtPlan) -> Vec<DebtPayoffSummary> {
    struct Tally<'a> {
        total_paid: f64,
        last: &'a DebtPayment,
        last_month_index: u32,
    }

    let mut tallies: HashMap<i64, Tally<'_>> = HashMap::new();
    let mut month_index = 0_u32;
    let mut prev_month: Option<&str> = None;
    for row in &plan.schedule {
        if prev_month.is_some_and(|prev| prev != row.month) {
            month_index += 1;
        }
        prev_month = Some(&row.month);

        tallies
            .entry(row.debt_id)
            .and_modify(|tally| {
                tally.total_paid += row.payment;
                tally.last = row;
                tally.last_month_index = month_index;
            })
            .or_insert(Tally {
                total_paid: row.payment,
                last: row,
                last_month_index: month_index,
            });
    }

    // Removing on first visit drops repeated input ids.
    inputs
        .debts
        .iter()
        .filter_map(|debt| {
            let tally = tallies.remove(&debt.id)?;
            let paid_off = tally.last.balance_after <= PAID_OFF_EPSILON;
            Some(DebtPayoffSummary {
                debt_id: debt.id,
                name: debt.name.clone(),
                payoff_month: paid_off.then(|| tally.last.month.clone()),
                months_to_payoff: paid_off.then_some(tally.last_month_index + 1),
                total_paid: round_cents(tally.total_paid),
            })
        })
        .collect()
}

fn simulate_plan(
    inputs: &PlanInputs,
    strategy: Strategy,
    mut trace: Option<&mut Vec<MonthTracePoint>>,
) -> DebtPlan {
    let mut debts = qualifying_debts(&inputs.debts);
    if debts.is_empty() {
        debug!(
            "no qualifying debts among {} supplied; returning empty {strategy} plan",
            inputs.debts.len()
        );
        return DebtPlan::empty(strategy);
    }
    order_debts(&mut debts, strategy);

    let rate_changes = index_rate_changes(&inputs.rate_changes);
    let month_budget = monthly_allowance(inputs.monthly_budget, inputs.extra_payment);

    let mut schedule = Vec::new();
    let mut total_interest = 0.0;
    let mut months_to_payoff = 0_u32;

    for month_index in 0..MAX_MONTHS {
        let active = debts
            .iter()
            .enumerate()
            .filter(|(_, debt)| debt.is_active())
            .map(|(idx, _)| idx)
            .collect::<Vec<_>>();
        let Some(&target) = active.first() else {
            break;
        };
        months_to_payoff += 1;
        let month = inputs.start_month.offset(month_index).label();

        for &idx in &active {
            if let Some(apr) = rate_changes.get(&(debts[idx].id, month_index)) {
                debts[idx].apr = *apr;
            }
        }

        let interest_accrued = accrue_interest(&mut debts, &active);
        total_interest += interest_accrued;

        let mut budget = month_budget;
        let minimum_paid = pay_minimums(&mut debts, &active, &mut budget, &month, &mut schedule);
        let extra_paid = apply_surplus(&mut debts[target], budget, &month, &mut schedule);

        if let Some(trace_rows) = trace.as_deref_mut() {
            trace_rows.push(MonthTracePoint {
                interest_accrued,
                cumulative_interest: total_interest,
                minimum_paid,
                extra_paid,
                remaining_balance: debts.iter().map(|d| d.balance.max(0.0)).sum(),
                active_debts: active.len(),
            });
        }
    }

    if debts.iter().any(DebtState::is_active) {
        warn!(
            "{strategy} plan hit the {MAX_MONTHS}-month cap with debts outstanding; budget may not cover interest"
        );
    }
    debug!(
        "{strategy} plan: {} debts, {months_to_payoff} months, {:.2} interest, {} payments",
        debts.len(),
        total_interest,
        schedule.len()
    );

    DebtPlan {
        schedule,
        months_to_payoff,
        total_interest: round_cents(total_interest),
        strategy,
    }
}

fn qualifying_debts(debts: &[DebtInput]) -> Vec<DebtState> {
    debts
        .iter()
        .filter(|d| d.balance > 0.0 && d.min_payment > 0.0)
        .filter_map(|d| {
            let apr = normalize_apr(d.apr_annual?)?;
            Some(DebtState {
                id: d.id,
                balance: d.balance,
                apr,
                min_payment: d.min_payment,
            })
        })
        .collect()
}

// Stable: equal keys keep input order.
fn order_debts(debts: &mut [DebtState], strategy: Strategy) {
    match strategy {
        Strategy::Snowball => debts.sort_by(|a, b| a.balance.total_cmp(&b.balance)),
        Strategy::Avalanche => debts.sort_by(|a, b| b.apr.total_cmp(&a.apr)),
    }
}

fn index_rate_changes(changes: &[RateChange]) -> HashMap<(i64, u32), f64> {
    let mut indexed = HashMap::with_capacity(changes.len());
    for change in changes {
        if let Some(apr) = normalize_apr(change.apr_annual) {
            indexed.insert((change.debt_id, change.month_offset), apr);
        }
    }
    indexed
}

pub(crate) fn normalize_apr(raw: f64) -> Option<f64> {
    if !raw.is_finite() {
        return None;
    }
    let apr = if raw > 1.0 { raw / 100.0 } else { raw };
    Some(apr.max(0.0))
}

fn monthly_allowance(monthly_budget: f64, extra_payment: f64) -> f64 {
    let budget = if monthly_budget.is_finite() {
        monthly_budget.max(0.0)
    } else {
        0.0
    };
    let extra = if extra_payment.is_finite() {
        extra_payment
    } else {
        0.0
    };
    budget + extra
}

fn accrue_interest(debts: &mut [DebtState], active: &[usize]) -> f64 {
    let mut accrued = 0.0;
    for &idx in active {
        let debt = &mut debts[idx];
        let interest = debt.balance * debt.monthly_rate();
        debt.balance += interest;
        accrued += interest;
    }
    accrued
}

fn pay_minimums(
    debts: &mut [DebtState],
    active: &[usize],
    budget: &mut f64,
    month: &str,
    schedule: &mut Vec<DebtPayment>,
) -> f64 {
    let mut paid = 0.0;
    for &idx in active {
        let debt = &mut debts[idx];
        let payment = debt.min_payment.min(debt.balance);
        debt.balance -= payment;
        *budget -= payment;
        paid += payment;

        // Reporting split only; balances are driven by the accrual step.
        let principal = (payment - debt.monthly_rate() * debt.balance).max(0.0);
        schedule.push(DebtPayment {
            month: month.to_string(),
            debt_id: debt.id,
            kind: PaymentKind::Minimum,
            payment,
            principal,
            interest: payment - principal,
            balance_after: debt.balance.max(0.0),
        });
    }
    paid
}

// Excess beyond the target's balance is not redirected.
fn apply_surplus(
    target: &mut DebtState,
    budget: f64,
    month: &str,
    schedule: &mut Vec<DebtPayment>,
) -> f64 {
    if budget <= 0.0 {
        return 0.0;
    }
    let payment = budget.min(target.balance);
    if payment <= 0.0 {
        return 0.0;
    }

    target.balance -= payment;
    schedule.push(DebtPayment {
        month: month.to_string(),
        debt_id: target.id,
        kind: PaymentKind::Extra,
        payment,
        principal: payment,
        interest: 0.0,
        balance_after: target.balance.max(0.0),
    });
    payment
}

pub(crate) fn round_cents(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
