use crate::models::TRADING_DAYS;
use statrs::statistics::Statistics;

/// Default trailing window (trading days) for the rolling Sharpe signal.
pub const DEFAULT_WINDOW: usize = 30;

/// Windows with a standard deviation below this are treated as zero-variance.
const MIN_WINDOW_STD: f64 = 1e-12;

/// Rolling risk-adjusted return signal aligned to a daily return series.
///
/// raw[j]    = mean(r[j-w+1..=j]) / sd(r[j-w+1..=j]) * sqrt(252)   (sample sd)
/// signal[0] = 0
/// signal[j] = raw[j-1]
///
/// The one-day lag means signal[j] only uses returns strictly before day j.
/// Undefined raw values (short window, zero variance) become 0.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RiskSignal {
    window: usize,
    values: Vec<f64>,
}

impl RiskSignal {
    pub fn from_returns(returns: &[f64], window: usize) -> Self {
        let n = returns.len();
        let mut values = Vec::with_capacity(n);

        if n > 0 {
            values.push(0.0);
        }
        for j in 1..n {
            values.push(raw_sharpe(returns, j - 1, window).unwrap_or(0.0));
        }

        Self { window, values }
    }

    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub fn window(&self) -> usize {
        self.window
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }
}

/// Annualized Sharpe of the window ending at `end` (inclusive), if defined.
fn raw_sharpe(returns: &[f64], end: usize, window: usize) -> Option<f64> {
    if window < 2 || end + 1 < window {
        return None;
    }

    let slice = &returns[end + 1 - window..=end];
    let mean = slice.iter().mean();
    let sd = slice.iter().std_dev();

    if !sd.is_finite() || sd < MIN_WINDOW_STD {
        return None;
    }

    let sharpe = mean / sd * TRADING_DAYS.sqrt();
    sharpe.is_finite().then_some(sharpe)
}
