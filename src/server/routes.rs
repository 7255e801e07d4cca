use crate::db;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::response::Json;
use std::sync::Arc;

#[derive(serde::Deserialize)]
pub struct RunsQuery {
    pub ticker: Option<String>,
    pub limit: Option<usize>,
}

/// GET /api/report -- full report of this run, including every path
pub async fn get_report(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "run_id": state.run_id,
        "ticker": state.config.ticker,
        "eval_start": state.config.eval_start,
        "eval_end": state.config.eval_end,
        "report": state.report,
    }))
}

/// GET /api/summary -- headline scores only
pub async fn get_summary(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let r = &state.report;
    Json(serde_json::json!({
        "run_id": state.run_id,
        "ticker": state.config.ticker,
        "seed": r.seed.to_string(),
        "mu": r.params.mu,
        "sigma": r.params.sigma,
        "flat_correlation": r.flat.fit.correlation,
        "curved_correlation": r.curved.fit.correlation,
        "improvement_pct": r.improvement_pct,
        "curved_alpha": r.curved_alpha,
        "best_alpha": r.sweep.best_alpha,
        "best_correlation": r.sweep.best_correlation,
        "sweep": r.sweep.points,
    }))
}

/// GET /api/runs -- past runs from the DB (cold path)
pub async fn get_runs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RunsQuery>,
) -> Json<serde_json::Value> {
    let limit = params.limit.unwrap_or(20).min(200);
    match db::get_recent_runs(&state.db, params.ticker.as_deref(), limit) {
        Ok(runs) => Json(serde_json::json!({ "runs": runs })),
        Err(e) => Json(serde_json::json!({ "error": e.to_string() })),
    }
}

/// GET /api/counters -- simulation counters (lock-free reads)
pub async fn get_counters(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!(state.counters.snapshot()))
}
