mod config;
mod db;
mod errors;
mod experiment;
mod feeds;
mod models;
mod server;
mod state;

use crate::errors::{LabError, LabResult};
use crate::experiment::ExperimentReport;
use crate::feeds::yahoo::YahooClient;
use crate::feeds::PriceHistory;
use crate::state::{AppState, SimCounters};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("curvature_lab starting");

    // Load config
    let cfg = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    let experiment_cfg = match cfg.experiment() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    // Init database (price cache + run history)
    let db_pool = match db::init_db(&cfg.data_dir) {
        Ok(d) => d,
        Err(e) => {
            tracing::error!("database init error: {e}");
            std::process::exit(1);
        }
    };

    // ── One-shot data acquisition ──
    let history = match load_history(&cfg, &db_pool).await {
        Ok(h) => h,
        Err(e) => {
            tracing::error!(ticker = %cfg.ticker, "price history unavailable: {e}");
            std::process::exit(1);
        }
    };

    let prices = history.closes();
    let actual = history.evaluation_window(cfg.eval_start, cfg.eval_end);
    let eval_offset = history.warmup_len(cfg.eval_start);
    tracing::info!(
        ticker = %history.ticker,
        points = prices.len(),
        warmup = eval_offset,
        eval_points = actual.len(),
        "price history loaded"
    );

    // ── Core computation (CPU-bound, off the async workers) ──
    let counters = Arc::new(SimCounters::new());
    let worker_counters = counters.clone();
    let report = match tokio::task::spawn_blocking(move || {
        experiment::run_experiment(&prices, &actual, eval_offset, &experiment_cfg, &worker_counters)
    })
    .await
    {
        Ok(Ok(r)) => r,
        Ok(Err(e)) => {
            tracing::error!("experiment failed: {e}");
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("experiment task panicked: {e}");
            std::process::exit(1);
        }
    };

    print_report(&cfg.ticker, &report);

    let run_id = uuid::Uuid::new_v4().to_string();
    if let Err(e) = db::insert_run(&db_pool, &run_id, &cfg.ticker, &report) {
        tracing::warn!(run_id = %run_id, "failed to record run: {e}");
    }

    let Some(port) = cfg.server_port else {
        return;
    };

    // ── Optional dashboard API ──
    let app_state = AppState::new(cfg, db_pool, run_id, report, counters);

    let app = axum::Router::new()
        .route("/api/report", axum::routing::get(server::routes::get_report))
        .route("/api/summary", axum::routing::get(server::routes::get_summary))
        .route("/api/runs", axum::routing::get(server::routes::get_runs))
        .route("/api/counters", axum::routing::get(server::routes::get_counters))
        .fallback_service(
            tower_http::services::ServeDir::new("dashboard/dist")
                .fallback(tower_http::services::ServeFile::new("dashboard/dist/index.html")),
        )
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .with_state(app_state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("dashboard listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("bind error: {e}");
            std::process::exit(1);
        });

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
    }
}

/// Fetch from Yahoo and refresh the cache, or read the cache when offline.
async fn load_history(cfg: &config::AppConfig, db_pool: &db::DbPool) -> LabResult<PriceHistory> {
    if cfg.offline {
        tracing::info!(ticker = %cfg.ticker, "offline mode, reading cached prices");
        let cached = db::load_prices(db_pool, &cfg.ticker, cfg.history_start, cfg.eval_end)?;
        if cached.is_empty() {
            return Err(LabError::InsufficientData(format!(
                "no cached prices for {} between {} and {}; run once with OFFLINE=false",
                cfg.ticker, cfg.history_start, cfg.eval_end
            )));
        }
        return Ok(cached);
    }

    let client = YahooClient::new(&cfg.yahoo_base_url);
    let history = client
        .fetch_history(&cfg.ticker, cfg.history_start, cfg.eval_end)
        .await?;

    match db::store_prices(db_pool, &history) {
        Ok(n) => tracing::info!(rows = n, "price cache updated"),
        Err(e) => tracing::warn!("price cache update failed: {e}"),
    }

    Ok(history)
}

fn print_report(ticker: &str, report: &ExperimentReport) {
    let flat = report.flat.fit.correlation;
    let curved = report.curved.fit.correlation;

    println!(
        "{ticker}: mu={:.4} sigma={:.4} over {} days, {} paths per ensemble (seed {})",
        report.params.mu, report.params.sigma, report.history_points, report.members, report.seed
    );
    println!("Flat model correlation: {flat:.4}");
    println!("Curved model correlation: {curved:.4}");
    match report.improvement_pct {
        Some(pct) => println!("Curved model improved correlation by {pct:.2}% over flat model."),
        None => println!("Improvement undefined (flat correlation is zero)."),
    }

    let rejected = report.flat.ensemble.rejected + report.curved.ensemble.rejected;
    if rejected > 0 {
        println!("Excluded {rejected} non-finite ensemble members.");
    }

    println!(
        "\nSummary: flat={flat:.4} curved={curved:.4} improvement={} alpha={}",
        report
            .improvement_pct
            .map(|p| format!("{p:.2}%"))
            .unwrap_or_else(|| "n/a".into()),
        report.curved_alpha
    );

    println!(
        "\nBest alpha: {:.2} -> Correlation: {:.4}",
        report.sweep.best_alpha, report.sweep.best_correlation
    );
}
