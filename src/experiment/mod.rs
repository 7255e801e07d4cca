pub mod ensemble;
pub mod fit;
pub mod sweep;

use crate::errors::{LabError, LabResult};
use crate::models::flat::FlatModel;
use crate::models::returns::daily_returns;
use crate::models::risk_signal::{RiskSignal, DEFAULT_WINDOW};
use crate::models::ModelParams;
use crate::state::SimCounters;
use ensemble::{run_ensemble, Ensemble, DEFAULT_MEMBERS};
use fit::{evaluate_fit, improvement_pct, FitScore, DEFAULT_BURN_IN};
use sweep::{sweep, AlphaGrid, CurvedTrial, SweepOutcome};

/// Core-facing experiment settings. Never reads the environment.
#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    pub members: usize,
    /// Curvature used for the headline flat-vs-curved comparison
    pub curved_alpha: f64,
    pub grid: AlphaGrid,
    pub burn_in: usize,
    pub signal_window: usize,
    /// Base seed; None draws a fresh one per run
    pub seed: Option<u64>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            members: DEFAULT_MEMBERS,
            curved_alpha: 0.9,
            grid: AlphaGrid::default(),
            burn_in: DEFAULT_BURN_IN,
            signal_window: DEFAULT_WINDOW,
            seed: None,
        }
    }
}

/// One model's ensemble and its fit against the actual window.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ModelRun {
    pub ensemble: Ensemble,
    pub fit: FitScore,
}

/// Everything the presentation layer renders.
///
/// The flat ensemble, the headline curved ensemble and every sweep candidate
/// are all drawn from the same base seed: member k of each sees the same
/// shocks, so score differences come from the drift alone and a curved run
/// with alpha = 0 reproduces the flat run exactly.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExperimentReport {
    pub seed: u64,
    pub members: usize,
    pub burn_in: usize,
    /// Warm-up days before the evaluation window
    pub eval_offset: usize,
    pub history_points: usize,
    pub params: ModelParams,
    pub signal: RiskSignal,
    /// Evaluation-window prices the fits were computed against
    pub actual: Vec<f64>,
    pub flat: ModelRun,
    pub curved_alpha: f64,
    pub curved: ModelRun,
    /// None when the flat correlation is exactly zero
    pub improvement_pct: Option<f64>,
    pub sweep: SweepOutcome,
}

/// Run the full pipeline: returns -> parameters -> flat and curved ensembles ->
/// fits -> alpha sweep.
///
/// `prices` is the whole history (warm-up included); `actual` is the slice of
/// it inside the evaluation window, starting at history index `eval_offset`.
/// The warm-up must cover the burn-in.
pub fn run_experiment(
    prices: &[f64],
    actual: &[f64],
    eval_offset: usize,
    config: &ExperimentConfig,
    counters: &SimCounters,
) -> LabResult<ExperimentReport> {
    let returns = daily_returns(prices)?;
    if eval_offset < config.burn_in {
        return Err(LabError::InsufficientData(format!(
            "warm-up holds {eval_offset} trading days before the evaluation window, need at least {} (burn-in)",
            config.burn_in
        )));
    }
    if actual.len() < 2 {
        return Err(LabError::InsufficientData(format!(
            "evaluation window holds {} prices, need at least 2",
            actual.len()
        )));
    }

    let params = ModelParams::estimate(&returns)?;
    let signal = RiskSignal::from_returns(&returns, config.signal_window);
    let seed = config.seed.unwrap_or_else(rand::random);
    let start_price = prices[0];

    tracing::info!(
        points = prices.len(),
        eval_points = actual.len(),
        mu = params.mu,
        sigma = params.sigma,
        seed,
        window = signal.window(),
        "estimated model parameters"
    );

    // Flat baseline over the whole history
    let flat_model = FlatModel::new(start_price, prices.len(), params);
    let flat_ensemble = run_ensemble(&flat_model, config.members, seed, counters)?;
    let flat_fit = evaluate_fit(&flat_ensemble.mean, actual, eval_offset, config.burn_in)?;
    tracing::info!(
        corr = flat_fit.correlation,
        points = flat_fit.points,
        accepted = flat_ensemble.accepted(),
        "flat model fit"
    );

    let trial = CurvedTrial {
        start_price,
        params,
        signal: &signal,
        actual,
        eval_offset,
        burn_in: config.burn_in,
        members: config.members,
        seed,
        counters,
    };

    let (curved_ensemble, curved_fit) = trial.run(config.curved_alpha)?;
    tracing::info!(
        alpha = config.curved_alpha,
        corr = curved_fit.correlation,
        points = curved_fit.points,
        "curved model fit"
    );

    let improvement = improvement_pct(flat_fit.correlation, curved_fit.correlation);
    if improvement.is_none() {
        tracing::warn!("flat correlation is exactly zero, improvement undefined");
    }

    let outcome = sweep(&config.grid, &trial)?;
    tracing::info!(
        best_alpha = outcome.best_alpha,
        corr = outcome.best_correlation,
        candidates = outcome.points.len(),
        "calibration sweep finished"
    );

    Ok(ExperimentReport {
        seed,
        members: config.members,
        burn_in: config.burn_in,
        eval_offset,
        history_points: prices.len(),
        params,
        actual: actual.to_vec(),
        flat: ModelRun {
            ensemble: flat_ensemble,
            fit: flat_fit,
        },
        curved_alpha: config.curved_alpha,
        curved: ModelRun {
            ensemble: curved_ensemble,
            fit: curved_fit,
        },
        improvement_pct: improvement,
        sweep: outcome,
        signal,
    })
}
