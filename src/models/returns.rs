use crate::errors::{LabError, LabResult};
use crate::models::TRADING_DAYS;
use statrs::statistics::Statistics;

/// Annualized drift and volatility of a price process.
/// Stack-allocated, Copy.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ModelParams {
    /// Annualized drift (mean daily return x 252)
    pub mu: f64,
    /// Annualized volatility (population stdev of daily returns x sqrt(252))
    pub sigma: f64,
}

impl ModelParams {
    #[inline]
    pub fn new(mu: f64, sigma: f64) -> Self {
        debug_assert!(sigma >= 0.0, "volatility must be non-negative: {sigma}");
        Self { mu, sigma }
    }

    /// Estimate annualized parameters from a daily simple-return series.
    pub fn estimate(returns: &[f64]) -> LabResult<Self> {
        if returns.is_empty() {
            return Err(LabError::InsufficientData(
                "need at least one daily return to estimate drift and volatility".into(),
            ));
        }

        let mu = returns.iter().mean() * TRADING_DAYS;
        let sigma = returns.iter().population_std_dev() * TRADING_DAYS.sqrt();

        if !mu.is_finite() || !sigma.is_finite() {
            return Err(LabError::InsufficientData(format!(
                "non-finite parameter estimate: mu={mu}, sigma={sigma}"
            )));
        }

        Ok(Self::new(mu, sigma.max(0.0)))
    }
}

/// Simple daily returns: r[i] = (p[i+1] - p[i]) / p[i].
///
/// Fails on fewer than two prices or on any non-positive / non-finite price,
/// since every downstream stage divides by or takes logs of these values.
pub fn daily_returns(prices: &[f64]) -> LabResult<Vec<f64>> {
    if prices.len() < 2 {
        return Err(LabError::InsufficientData(format!(
            "need at least 2 prices to compute returns, got {}",
            prices.len()
        )));
    }

    if let Some((index, &value)) = prices
        .iter()
        .enumerate()
        .find(|(_, p)| !p.is_finite() || **p <= 0.0)
    {
        return Err(LabError::InvalidPrice { index, value });
    }

    Ok(prices.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect())
}
