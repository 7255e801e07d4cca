use crate::errors::{LabError, LabResult};
use crate::experiment::ensemble::{run_ensemble, Ensemble};
use crate::experiment::fit::{evaluate_fit, FitScore};
use crate::models::curved::CurvedModel;
use crate::models::risk_signal::RiskSignal;
use crate::models::ModelParams;
use crate::state::SimCounters;
use portable_atomic::Ordering;
use smallvec::SmallVec;

/// Upper bound on grid size; anything larger is a misconfiguration.
const MAX_GRID_POINTS: usize = 1_000;

/// Inclusive, evenly spaced grid of curvature coefficients.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AlphaGrid {
    values: SmallVec<[f64; 16]>,
}

impl AlphaGrid {
    /// start, start + step, ..., up to and including `end` (within rounding).
    /// Values are computed as start + k * step, never by repeated addition.
    pub fn new(start: f64, end: f64, step: f64) -> LabResult<Self> {
        if !start.is_finite() || !end.is_finite() || !step.is_finite() {
            return Err(LabError::Config(format!(
                "alpha grid bounds must be finite: start={start} end={end} step={step}"
            )));
        }
        if step <= 0.0 {
            return Err(LabError::Config(format!("alpha grid step must be positive: {step}")));
        }
        if end < start {
            return Err(LabError::Config(format!("alpha grid end {end} is below start {start}")));
        }

        // Checked as f64 first: a tiny step makes the ratio overflow usize
        let intervals = ((end - start) / step + 1e-9).floor();
        if !intervals.is_finite() || intervals >= MAX_GRID_POINTS as f64 {
            return Err(LabError::Config(format!(
                "alpha grid from {start} to {end} by {step} exceeds {MAX_GRID_POINTS} points"
            )));
        }
        let count = intervals as usize + 1;

        let values = (0..count)
            .map(|k| round_grid(start + k as f64 * step))
            .collect();
        Ok(Self { values })
    }

    #[cfg(test)]
    pub fn single(alpha: f64) -> Self {
        Self {
            values: smallvec::smallvec![alpha],
        }
    }

    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }
}

impl Default for AlphaGrid {
    /// 0.1 through 1.0 inclusive, step 0.1.
    fn default() -> Self {
        Self {
            values: (1..=10).map(|k| k as f64 / 10.0).collect(),
        }
    }
}

#[inline]
fn round_grid(v: f64) -> f64 {
    (v * 1e9).round() / 1e9
}

/// Everything needed to build and score a curved ensemble for one alpha.
/// Shared by the headline curved run and every sweep candidate, so a sweep
/// point is exactly the direct call with the same alpha and seed.
pub struct CurvedTrial<'a> {
    pub start_price: f64,
    pub params: ModelParams,
    pub signal: &'a RiskSignal,
    /// Evaluation-window prices
    pub actual: &'a [f64],
    /// History index of `actual[0]`
    pub eval_offset: usize,
    pub burn_in: usize,
    pub members: usize,
    pub seed: u64,
    pub counters: &'a SimCounters,
}

impl CurvedTrial<'_> {
    pub fn run(&self, alpha: f64) -> LabResult<(Ensemble, FitScore)> {
        let model = CurvedModel::new(self.start_price, alpha, self.params, self.signal);

        let inverted = model.inverted_steps();
        if inverted > 0 {
            tracing::warn!(
                alpha,
                inverted_steps = inverted,
                "drift modifier <= 0 on some steps (alpha * sharpe <= -1), drift sign flips"
            );
        }

        let ensemble = run_ensemble(&model, self.members, self.seed, self.counters)?;
        let fit = evaluate_fit(&ensemble.mean, self.actual, self.eval_offset, self.burn_in)?;
        Ok((ensemble, fit))
    }
}

/// Outcome of one grid point.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SweepPoint {
    pub alpha: f64,
    pub correlation: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SweepOutcome {
    pub best_alpha: f64,
    pub best_correlation: f64,
    pub points: SmallVec<[SweepPoint; 16]>,
}

/// Brute-force linear scan over the grid, keeping the strictly greatest
/// correlation (ties keep the earliest alpha). The objective is neither
/// smooth nor unimodal in alpha, so no smarter search is attempted.
///
/// Candidates whose ensemble is exhausted or whose correlation is undefined
/// are recorded and skipped; any other error aborts the sweep.
pub fn sweep(grid: &AlphaGrid, trial: &CurvedTrial<'_>) -> LabResult<SweepOutcome> {
    let mut best: Option<(f64, f64)> = None;
    let mut points: SmallVec<[SweepPoint; 16]> = SmallVec::with_capacity(grid.len());

    for &alpha in grid.values() {
        match trial.run(alpha) {
            Ok((_, fit)) => {
                tracing::debug!(alpha, corr = fit.correlation, "sweep candidate");
                if best.map_or(true, |(_, c)| fit.correlation > c) {
                    best = Some((alpha, fit.correlation));
                }
                points.push(SweepPoint {
                    alpha,
                    correlation: Some(fit.correlation),
                    error: None,
                });
            }
            Err(e @ (LabError::DegenerateCorrelation(_) | LabError::EnsembleExhausted { .. })) => {
                trial.counters.sweep_candidates_failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(alpha, error = %e, "sweep candidate skipped");
                points.push(SweepPoint {
                    alpha,
                    correlation: None,
                    error: Some(e.to_string()),
                });
            }
            Err(e) => return Err(e),
        }
    }

    let (best_alpha, best_correlation) = best.ok_or(LabError::EmptySweep)?;
    Ok(SweepOutcome {
        best_alpha,
        best_correlation,
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::returns::daily_returns;

    fn wavy_prices(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let t = i as f64;
                100.0 + 0.08 * t + 4.0 * (t / 17.0).sin() + 1.5 * (t * 1.3).sin()
            })
            .collect()
    }

    struct Fixture {
        prices: Vec<f64>,
        params: ModelParams,
        signal: RiskSignal,
        counters: SimCounters,
    }

    impl Fixture {
        fn new() -> Self {
            let prices = wavy_prices(282);
            let returns = daily_returns(&prices).expect("returns");
            let params = ModelParams::estimate(&returns).expect("params");
            let signal = RiskSignal::from_returns(&returns, 30);
            Self {
                prices,
                params,
                signal,
                counters: SimCounters::new(),
            }
        }

        fn trial(&self, seed: u64) -> CurvedTrial<'_> {
            CurvedTrial {
                start_price: self.prices[0],
                params: self.params,
                signal: &self.signal,
                actual: &self.prices[30..],
                eval_offset: 30,
                burn_in: 30,
                members: 20,
                seed,
                counters: &self.counters,
            }
        }
    }

    #[test]
    fn test_default_grid() {
        let g = AlphaGrid::default();
        assert_eq!(g.values(), &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0]);
        assert_eq!(AlphaGrid::new(0.1, 1.0, 0.1).expect("grid"), g);
    }

    #[test]
    fn test_grid_validation() {
        assert!(AlphaGrid::new(0.1, 1.0, 0.0).is_err());
        assert!(AlphaGrid::new(1.0, 0.1, 0.1).is_err());
        assert!(AlphaGrid::new(0.0, 1e6, 1e-3).is_err());
        assert!(AlphaGrid::new(0.0, 1.0, 1e-320).is_err(), "subnormal step must not overflow the count");
        assert!(AlphaGrid::new(-f64::MAX, f64::MAX, 1.0).is_err());
        assert_eq!(AlphaGrid::new(0.0, 0.999, 0.001).expect("grid").len(), MAX_GRID_POINTS);
        assert_eq!(AlphaGrid::new(0.5, 0.5, 0.1).expect("grid").values(), &[0.5]);
    }

    #[test]
    fn test_single_point_sweep_matches_direct_run() {
        let fx = Fixture::new();
        let trial = fx.trial(17);
        let outcome = sweep(&AlphaGrid::single(0.7), &trial).expect("sweep");
        let (_, direct) = trial.run(0.7).expect("direct");
        assert_eq!(outcome.best_alpha, 0.7);
        assert_eq!(outcome.best_correlation, direct.correlation);
        assert_eq!(outcome.points.len(), 1);
    }

    #[test]
    fn test_sweep_picks_maximum() {
        let fx = Fixture::new();
        let trial = fx.trial(5);
        let grid = AlphaGrid::new(0.0, 1.0, 0.25).expect("grid");
        let outcome = sweep(&grid, &trial).expect("sweep");
        assert_eq!(outcome.points.len(), 5);

        let max = outcome
            .points
            .iter()
            .filter_map(|p| p.correlation)
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(outcome.best_correlation, max);

        let first_at_max = outcome
            .points
            .iter()
            .find(|p| p.correlation == Some(max))
            .map(|p| p.alpha);
        assert_eq!(Some(outcome.best_alpha), first_at_max, "ties keep the earliest alpha");
    }

    #[test]
    fn test_ties_keep_earliest_alpha() {
        // Zero drift removes every alpha effect, so all candidates score the same
        let fx = Fixture::new();
        let mut trial = fx.trial(8);
        trial.params = ModelParams::new(0.0, fx.params.sigma);
        let grid = AlphaGrid::new(0.1, 0.5, 0.1).expect("grid");
        let outcome = sweep(&grid, &trial).expect("sweep");
        assert_eq!(outcome.best_alpha, 0.1);
    }

    #[test]
    fn test_all_degenerate_is_empty_sweep() {
        let fx = Fixture::new();
        let flat_actual = vec![100.0; 200];
        let mut trial = fx.trial(2);
        trial.actual = &flat_actual;
        let err = sweep(&AlphaGrid::new(0.1, 0.3, 0.1).expect("grid"), &trial).unwrap_err();
        assert!(matches!(err, LabError::EmptySweep), "got {err}");
        assert_eq!(fx.counters.snapshot().sweep_candidates_failed, 3);
    }
}
