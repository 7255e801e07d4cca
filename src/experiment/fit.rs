use crate::errors::{LabError, LabResult};
use statrs::statistics::Statistics;

/// Default number of leading simulated days skipped before comparison.
pub const DEFAULT_BURN_IN: usize = 30;

/// Pearson correlation between a mean path and the observed prices.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct FitScore {
    pub correlation: f64,
    /// Number of aligned points the correlation was computed over
    pub points: usize,
}

/// Compare a simulated mean path against the evaluation-window prices.
///
/// `eval_offset` is the history index of `actual[0]`, so simulated day i is
/// paired with history day i. Comparison starts at history day
/// max(`eval_offset`, `burn_in`) on both sides and runs to the shorter end.
pub fn evaluate_fit(
    mean_path: &[f64],
    actual: &[f64],
    eval_offset: usize,
    burn_in: usize,
) -> LabResult<FitScore> {
    let start = eval_offset.max(burn_in);
    let simulated = mean_path.get(start..).unwrap_or(&[]);
    let observed = actual.get(start - eval_offset..).unwrap_or(&[]);
    let points = simulated.len().min(observed.len());

    let correlation = pearson(&simulated[..points], &observed[..points])?;
    Ok(FitScore { correlation, points })
}

/// Pearson linear correlation coefficient.
///
/// Errors when the inputs differ in length, have fewer than 2 points, or when
/// either side has zero variance (correlation undefined).
pub fn pearson(x: &[f64], y: &[f64]) -> LabResult<f64> {
    if x.len() != y.len() {
        return Err(LabError::LengthMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    if x.len() < 2 {
        return Err(LabError::InsufficientData(format!(
            "correlation needs at least 2 aligned points, got {}",
            x.len()
        )));
    }

    let mean_x = x.iter().mean();
    let mean_y = y.iter().mean();

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (&a, &b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        let side = if sxx == 0.0 { "simulated" } else { "actual" };
        return Err(LabError::DegenerateCorrelation(format!(
            "{side} series is constant over {} points",
            x.len()
        )));
    }

    let r = sxy / (sxx.sqrt() * syy.sqrt());
    if !r.is_finite() {
        return Err(LabError::DegenerateCorrelation(format!("non-finite correlation {r}")));
    }

    Ok(r.clamp(-1.0, 1.0))
}

/// Relative improvement of curved over flat, in percent of |flat|.
/// None when the flat correlation is exactly zero.
#[inline]
pub fn improvement_pct(flat: f64, curved: f64) -> Option<f64> {
    if flat == 0.0 {
        return None;
    }
    Some(100.0 * (curved - flat) / flat.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_correlation() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v + 7.0).collect();
        let r = pearson(&x, &y).expect("defined");
        assert!((r - 1.0).abs() < 1e-12, "r={r}");

        let neg: Vec<f64> = x.iter().map(|v| -v).collect();
        let r = pearson(&x, &neg).expect("defined");
        assert!((r + 1.0).abs() < 1e-12, "r={r}");
    }

    #[test]
    fn test_known_value() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 1.0, 4.0, 3.0, 5.0];
        let r = pearson(&x, &y).expect("defined");
        assert!((r - 0.8).abs() < 1e-12, "r={r}");
    }

    #[test]
    fn test_joint_reordering_is_invariant() {
        let x = [1.0, 4.0, 2.0, 8.0, 5.0, 7.0];
        let y = [2.0, 3.0, 1.0, 9.0, 4.0, 8.0];
        let r = pearson(&x, &y).expect("defined");

        let order = [5, 0, 3, 1, 4, 2];
        let xs: Vec<f64> = order.iter().map(|&i| x[i]).collect();
        let ys: Vec<f64> = order.iter().map(|&i| y[i]).collect();
        let r_joint = pearson(&xs, &ys).expect("defined");
        assert!((r - r_joint).abs() < 1e-12, "joint reorder changed r: {r} vs {r_joint}");

        let y_only: Vec<f64> = order.iter().map(|&i| y[i]).collect();
        let r_indep = pearson(&x, &y_only).expect("defined");
        assert!((r - r_indep).abs() > 1e-6, "independent reorder should change r: {r} vs {r_indep}");
    }

    #[test]
    fn test_constant_series_is_degenerate() {
        let flat = vec![100.0; 252];
        let err = pearson(&flat, &flat).unwrap_err();
        assert!(matches!(err, LabError::DegenerateCorrelation(_)), "got {err}");

        let ramp: Vec<f64> = (0..252).map(|i| i as f64).collect();
        assert!(matches!(pearson(&ramp, &flat), Err(LabError::DegenerateCorrelation(_))));
    }

    #[test]
    fn test_too_few_points() {
        assert!(matches!(pearson(&[1.0], &[2.0]), Err(LabError::InsufficientData(_))));
        assert!(matches!(
            pearson(&[1.0, 2.0], &[2.0]),
            Err(LabError::LengthMismatch { left: 2, right: 1 })
        ));
    }

    #[test]
    fn test_evaluate_fit_skips_burn_in_and_aligns() {
        // Simulated path: 30 junk days, then a ramp that matches the actual window
        let mut mean_path = vec![500.0, 1.0, 250.0];
        mean_path.resize(30, 42.0);
        mean_path.extend((0..100).map(|i| 100.0 + i as f64));
        let actual: Vec<f64> = (0..80).map(|i| 10.0 + 0.5 * i as f64).collect();

        let fit = evaluate_fit(&mean_path, &actual, 30, 30).expect("defined");
        assert_eq!(fit.points, 80);
        assert!((fit.correlation - 1.0).abs() < 1e-12, "r={}", fit.correlation);
    }

    #[test]
    fn test_evaluate_fit_pairs_same_history_day() {
        // Non-monotone history so any day shift lowers the correlation
        let history: Vec<f64> = (0..273).map(|i| 100.0 + 5.0 * (i as f64 * 0.37).sin()).collect();

        // Short warm-up: both sides start at the burn-in day
        let fit = evaluate_fit(&history, &history[21..], 21, 30).expect("defined");
        assert_eq!(fit.points, 243);
        assert!((fit.correlation - 1.0).abs() < 1e-12, "r={}", fit.correlation);

        // Long warm-up: both sides start at the first evaluation day
        let fit = evaluate_fit(&history, &history[42..], 42, 30).expect("defined");
        assert_eq!(fit.points, 231);
        assert!((fit.correlation - 1.0).abs() < 1e-12, "r={}", fit.correlation);
    }

    #[test]
    fn test_evaluate_fit_burn_in_beyond_path() {
        let err = evaluate_fit(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], 0, 30).unwrap_err();
        assert!(matches!(err, LabError::InsufficientData(_)), "got {err}");
    }

    #[test]
    fn test_improvement_pct() {
        assert_eq!(improvement_pct(0.5, 0.75), Some(50.0));
        assert_eq!(improvement_pct(-0.5, 0.0), Some(100.0));
        assert_eq!(improvement_pct(0.0, 0.3), None);
    }
}
