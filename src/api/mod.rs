use std::sync::Arc;

use axum::{
    Router,
    extract::{Json, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::core::{
    DebtInput, DebtPayoffSummary, DebtPlan, ExtraPaymentSolveConfig, ExtraPaymentSolveResult,
    MonthSummary, PlanError, PlanInputs, PlanMonth, RateChange, StrategyComparison,
    compare_strategies, generate_plan, run_monthly_trace, solve_extra_payment, summarize_payoffs,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Plan(#[from] PlanError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!("rejected request: {self}");
        error_response(StatusCode::BAD_REQUEST, &self.to_string())
    }
}

// Incomplete entries are skipped rather than rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RateChangePayload {
    #[serde(alias = "debtId")]
    debt_id: Option<i64>,
    #[serde(alias = "monthOffset")]
    month_offset: Option<i64>,
    #[serde(alias = "aprAnnual", alias = "apr")]
    apr_annual: Option<f64>,
}

impl RateChangePayload {
    fn into_rate_change(self) -> Option<RateChange> {
        Some(RateChange {
            debt_id: self.debt_id?,
            month_offset: u32::try_from(self.month_offset?).ok()?,
            apr_annual: self.apr_annual?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PlanPayload {
    strategy: Option<String>,
    #[serde(alias = "monthlyBudget")]
    monthly_budget: Option<f64>,
    debts: Vec<DebtInput>,
    #[serde(alias = "extraPayment")]
    extra_payment: Option<f64>,
    #[serde(alias = "rateChanges")]
    rate_changes: Option<Vec<RateChangePayload>>,
    #[serde(alias = "startMonth")]
    start_month: Option<PlanMonth>,

    #[serde(alias = "targetMonths")]
    target_months: Option<u32>,
    #[serde(alias = "searchMax")]
    search_max: Option<f64>,
    tolerance: Option<f64>,
    #[serde(alias = "maxIterations")]
    max_iterations: Option<u32>,
}

impl PlanPayload {
    pub fn set_target_months(&mut self, months: u32) {
        self.target_months = Some(months);
    }
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    #[serde(flatten)]
    plan: DebtPlan,
    debts: Vec<DebtPayoffSummary>,
    months: Vec<MonthSummary>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub fn parse_payload(json: &str) -> Result<PlanPayload, ApiError> {
    serde_json::from_str::<PlanPayload>(json)
        .map_err(|e| ApiError::BadRequest(format!("Invalid API JSON payload: {e}")))
}

fn plan_inputs_from_payload(
    payload: &mut PlanPayload,
    config: &AppConfig,
    require_strategy: bool,
) -> Result<PlanInputs, ApiError> {
    let strategy = match payload.strategy.take() {
        Some(strategy) => strategy,
        None if require_strategy => {
            return Err(ApiError::BadRequest("strategy is required".to_string()));
        }
        None => "snowball".to_string(),
    };
    let Some(monthly_budget) = payload.monthly_budget else {
        return Err(ApiError::BadRequest("monthly_budget is required".to_string()));
    };

    let supplied = payload.rate_changes.take().unwrap_or_default();
    let supplied_count = supplied.len();
    let rate_changes = supplied
        .into_iter()
        .filter_map(RateChangePayload::into_rate_change)
        .collect::<Vec<_>>();
    if rate_changes.len() < supplied_count {
        warn!(
            "skipped {} malformed rate change(s)",
            supplied_count - rate_changes.len()
        );
    }

    Ok(PlanInputs {
        debts: std::mem::take(&mut payload.debts),
        strategy,
        monthly_budget,
        extra_payment: payload.extra_payment.unwrap_or(0.0),
        rate_changes,
        start_month: payload.start_month.unwrap_or_else(|| config.start_month()),
    })
}

pub fn plan_request(mut payload: PlanPayload, config: &AppConfig) -> Result<PlanResponse, ApiError> {
    let inputs = plan_inputs_from_payload(&mut payload, config, true)?;
    let plan = generate_plan(&inputs)?;
    let months = run_monthly_trace(&inputs)?;
    let debts = summarize_payoffs(&inputs, &plan);
    Ok(PlanResponse {
        plan,
        debts,
        months,
    })
}

pub fn compare_request(
    mut payload: PlanPayload,
    config: &AppConfig,
) -> Result<StrategyComparison, ApiError> {
    let inputs = plan_inputs_from_payload(&mut payload, config, false)?;
    Ok(compare_strategies(&inputs))
}

pub fn solve_request(
    mut payload: PlanPayload,
    config: &AppConfig,
) -> Result<ExtraPaymentSolveResult, ApiError> {
    let inputs = plan_inputs_from_payload(&mut payload, config, true)?;
    let Some(target_months) = payload.target_months else {
        return Err(ApiError::BadRequest("target_months is required".to_string()));
    };
    if inputs.extra_payment != 0.0 {
        warn!(
            "solve request supplied extra_payment {}; the solved value replaces it",
            inputs.extra_payment
        );
    }
    let solve_config = ExtraPaymentSolveConfig {
        target_months,
        search_max: payload.search_max.unwrap_or(config.solver.search_max),
        tolerance: payload.tolerance.unwrap_or(config.solver.tolerance),
        max_iterations: payload.max_iterations.unwrap_or(config.solver.max_iterations),
        ..config.solver
    };
    Ok(solve_extra_payment(&inputs, solve_config)?)
}

pub fn router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/debt/plan", post(plan_handler))
        .route("/api/debt/compare", post(compare_handler))
        .route("/api/debt/solve", post(solve_handler))
        .fallback(not_found_handler)
        .with_state(config)
}

pub async fn run_http_server(config: AppConfig) -> std::io::Result<()> {
    let addr = config.addr;
    let app = router(Arc::new(config));

    let listener = TcpListener::bind(addr).await?;
    info!("debt planner API listening on http://{addr}");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn plan_handler(
    State(config): State<Arc<AppConfig>>,
    payload: Result<Json<PlanPayload>, JsonRejection>,
) -> Response {
    respond(payload.map_err(rejected).and_then(|Json(p)| plan_request(p, &config)))
}

async fn compare_handler(
    State(config): State<Arc<AppConfig>>,
    payload: Result<Json<PlanPayload>, JsonRejection>,
) -> Response {
    respond(payload.map_err(rejected).and_then(|Json(p)| compare_request(p, &config)))
}

async fn solve_handler(
    State(config): State<Arc<AppConfig>>,
    payload: Result<Json<PlanPayload>, JsonRejection>,
) -> Response {
    respond(payload.map_err(rejected).and_then(|Json(p)| solve_request(p, &config)))
}

fn rejected(rejection: JsonRejection) -> ApiError {
    ApiError::BadRequest(format!("Invalid API JSON payload: {}", rejection.body_text()))
}

fn respond<T: Serialize>(result: Result<T, ApiError>) -> Response {
    match result {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(err) => err.into_response(),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
