//! HTTP Endpoints
//!
//! REST API for the loan affordability calculator.

use std::time::Duration;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Json, Query, State,
    },
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use haus_core::{CalculatorInput, CalculatorResult, CurrencyFormat, PolicyViolation, ScheduleYear};

use crate::metrics::{metrics_handler, record_calculation, track_requests};
use crate::state::{AppState, MarketContext};
use crate::ServerError;

const DEV_ORIGIN: &str = "http://localhost:3000";

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let config = state.config.read();
    let cors_layer = build_cors_layer(
        &config.server.cors_origins,
        config.server.cors_enabled,
        config.environment.is_production(),
    );
    let timeout = Duration::from_secs(config.server.timeout_seconds);
    drop(config); // Release lock before building router

    Router::new()
        // Calculator
        .route("/api/calculator", post(calculate))
        .route("/api/calculator/schedule", post(schedule))
        .route("/api/stamp-duty", get(stamp_duty))
        .route("/api/lmi", get(lmi))
        .route("/api/market", get(market_info))
        // Health check
        .route("/health", get(health_check))
        // Prometheus metrics
        .route("/metrics", get(metrics_handler))
        // Admin endpoints
        .route("/admin/reload-config", post(reload_config))
        .route("/admin/reload-market", post(reload_market))
        .route_layer(middleware::from_fn(track_requests))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - If cors_enabled is false, returns permissive layer (for dev)
/// - If cors_origins is empty, defaults to localhost:3000 outside production
///   and allows no cross-origin requests in production
/// - Otherwise, uses the configured origins
fn build_cors_layer(origins: &[String], enabled: bool, production: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    let parsed_origins = if parsed_origins.is_empty() && production {
        tracing::warn!("No usable CORS origins configured in production; cross-origin requests are refused");
        parsed_origins
    } else if parsed_origins.is_empty() {
        tracing::info!("No usable CORS origins configured, defaulting to {}", DEV_ORIGIN);
        vec![HeaderValue::from_static(DEV_ORIGIN)]
    } else {
        tracing::info!("CORS configured with {} origins", parsed_origins.len());
        parsed_origins
    };

    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Out-of-policy input reported alongside a result
#[derive(Debug, Serialize)]
struct PolicyWarning {
    code: &'static str,
    message: String,
}

impl From<&PolicyViolation> for PolicyWarning {
    fn from(violation: &PolicyViolation) -> Self {
        Self {
            code: violation.code(),
            message: violation.to_string(),
        }
    }
}

/// Display strings for a result, in the market's currency
#[derive(Debug, Serialize)]
struct FormattedResult {
    property_price: String,
    deposit_amount: String,
    loan_amount: String,
    monthly_repayment: String,
    total_repayment: String,
    total_interest: String,
    stamp_duty: String,
    lmi_estimate: String,
    upfront_costs: String,
}

impl FormattedResult {
    fn new(currency: &CurrencyFormat, property_price: f64, result: &CalculatorResult) -> Self {
        Self {
            property_price: currency.format_compact(property_price),
            deposit_amount: currency.format(result.deposit_amount),
            loan_amount: currency.format(result.loan_amount),
            monthly_repayment: currency.format(result.monthly_repayment),
            total_repayment: currency.format_compact(result.total_repayment),
            total_interest: currency.format_compact(result.total_interest),
            stamp_duty: currency.format(result.stamp_duty),
            lmi_estimate: currency.format(result.lmi_estimate),
            upfront_costs: currency.format(result.upfront_costs),
        }
    }
}

#[derive(Debug, Serialize)]
struct CalculationResponse {
    market: String,
    result: CalculatorResult,
    formatted: FormattedResult,
    policy_warnings: Vec<PolicyWarning>,
}

/// Apply the market's input policy
///
/// Enforced: the first violation is an error. Advisory: violations come back
/// as warnings.
fn check_policy(
    state: &AppState,
    market: &MarketContext,
    input: &CalculatorInput,
) -> Result<Vec<PolicyWarning>, ServerError> {
    let enforce = state.get_config().market.enforce_input_policy;
    let violations = market.policy.violations(input);

    if enforce {
        return match violations.into_iter().next() {
            Some(violation) => Err(violation.into()),
            None => Ok(Vec::new()),
        };
    }

    if !violations.is_empty() {
        tracing::debug!(count = violations.len(), "Input outside market policy");
    }
    Ok(violations.iter().map(PolicyWarning::from).collect())
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServerError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ServerError::InvalidRequest(e.body_text()))
}

fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, ServerError> {
    params
        .map(|Query(query)| query)
        .map_err(|e| ServerError::InvalidRequest(e.body_text()))
}

/// POST /api/calculator
async fn calculate(
    State(state): State<AppState>,
    payload: Result<Json<CalculatorInput>, JsonRejection>,
) -> Result<Json<CalculationResponse>, ServerError> {
    let input = json_body(payload)?;
    let market = state.market();

    input.validate()?;
    let policy_warnings = check_policy(&state, &market, &input)?;
    let result = market.calculator.calculate(&input)?;
    record_calculation("full");

    Ok(Json(CalculationResponse {
        market: market.market_id().to_string(),
        formatted: FormattedResult::new(&market.currency, input.property_price, &result),
        result,
        policy_warnings,
    }))
}

#[derive(Debug, Serialize)]
struct ScheduleResponse {
    years: Vec<ScheduleYear>,
}

/// POST /api/calculator/schedule
async fn schedule(
    State(state): State<AppState>,
    payload: Result<Json<CalculatorInput>, JsonRejection>,
) -> Result<Json<ScheduleResponse>, ServerError> {
    let input = json_body(payload)?;
    let market = state.market();

    input.validate()?;
    check_policy(&state, &market, &input)?;
    let years = market.calculator.schedule(&input)?;
    record_calculation("schedule");

    Ok(Json(ScheduleResponse { years }))
}

#[derive(Debug, Deserialize)]
struct StampDutyQuery {
    property_price: f64,
}

/// GET /api/stamp-duty?property_price=
async fn stamp_duty(
    State(state): State<AppState>,
    params: Result<Query<StampDutyQuery>, QueryRejection>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let query = query_params(params)?;
    let market = state.market();

    let duty = market.calculator.stamp_duty(query.property_price)?;
    record_calculation("stamp_duty");

    Ok(Json(serde_json::json!({
        "jurisdiction": market.calculator.jurisdiction(),
        "property_price": query.property_price,
        "stamp_duty": duty,
        "formatted": market.currency.format(duty),
    })))
}

#[derive(Debug, Deserialize)]
struct LmiQuery {
    loan_amount: f64,
    deposit_percent: f64,
}

/// GET /api/lmi?loan_amount=&deposit_percent=
async fn lmi(
    State(state): State<AppState>,
    params: Result<Query<LmiQuery>, QueryRejection>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let query = query_params(params)?;
    let market = state.market();

    let assessment = market
        .calculator
        .lmi(query.loan_amount, query.deposit_percent)?;
    record_calculation("lmi");

    Ok(Json(serde_json::json!({
        "lmi_required": assessment.required,
        "lmi_estimate": assessment.estimate,
        "lvr_percent": assessment.lvr_percent,
        "rate_percent": assessment.rate * 100.0,
        "formatted": market.currency.format(assessment.estimate),
    })))
}

/// GET /api/market
///
/// Summary of the active market's tables, rates as percentages.
async fn market_info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let market = state.market();
    let config = &market.config;
    let enforce = state.get_config().market.enforce_input_policy;

    Json(serde_json::json!({
        "market_id": config.market_id,
        "display_name": config.display_name,
        "jurisdiction": config.jurisdiction(),
        "currency": config.currency,
        "stamp_duty": { "brackets": config.stamp_duty.brackets },
        "lmi": config.lmi,
        "input_policy": config.input_policy,
        "enforce_input_policy": enforce,
    }))
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let market = state.market();

    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "market": market.market_id(),
        "jurisdiction": market.calculator.jurisdiction(),
    }))
}

/// POST /admin/reload-config
///
/// Reloads settings from disk. CORS and timeout are only applied at startup.
async fn reload_config(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ServerError> {
    state.reload_config().map_err(|e| {
        tracing::error!(error = %e, "Config reload failed");
        e
    })?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Configuration reloaded successfully"
    })))
}

/// POST /admin/reload-market
///
/// Loads and validates the configured market; the active market is kept if
/// anything fails.
async fn reload_market(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let market = state.reload_market().map_err(|e| {
        tracing::error!(error = %e, "Market reload failed; keeping the active market");
        e
    })?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Market reloaded successfully",
        "market": market.market_id(),
    })))
}
