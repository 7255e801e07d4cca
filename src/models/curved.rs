use crate::models::risk_signal::RiskSignal;
use crate::models::{lognormal_step, ModelParams, PathModel, ShockSource};

/// Geometric random walk whose drift is bent by the lagged rolling Sharpe signal.
///
/// drift_modifier(i) = 1 + alpha * signal[i-1]
/// mu_i              = mu * drift_modifier(i)
/// p[i]              = p[i-1] * exp((mu_i - sigma^2/2) dt + sigma sqrt(dt) Z_i)
///
/// Always spans the full history: signal.len() + 1 points. The modifier is
/// not clamped; when alpha * signal <= -1 the drift changes sign.
pub fn simulate_curved(
    start_price: f64,
    alpha: f64,
    params: &ModelParams,
    signal: &RiskSignal,
    shocks: &mut dyn ShockSource,
) -> Vec<f64> {
    let mut path = Vec::with_capacity(signal.len() + 1);
    path.push(start_price);

    let mut price = start_price;
    for &sharpe in signal.values() {
        let modified_mu = params.mu * (1.0 + alpha * sharpe);
        price = lognormal_step(price, modified_mu, params.sigma, shocks.next_shock());
        path.push(price);
    }
    path
}

/// Curved model bound to a start price, curvature and a shared signal.
/// Every path built from one model sees the same drift modulation.
#[derive(Debug, Clone, Copy)]
pub struct CurvedModel<'a> {
    pub start_price: f64,
    pub alpha: f64,
    pub params: ModelParams,
    pub signal: &'a RiskSignal,
}

impl<'a> CurvedModel<'a> {
    pub fn new(start_price: f64, alpha: f64, params: ModelParams, signal: &'a RiskSignal) -> Self {
        Self { start_price, alpha, params, signal }
    }

    /// Steps whose drift modifier is <= 0 (drift sign flipped or zeroed).
    pub fn inverted_steps(&self) -> usize {
        self.signal
            .values()
            .iter()
            .filter(|&&s| 1.0 + self.alpha * s <= 0.0)
            .count()
    }
}

impl PathModel for CurvedModel<'_> {
    #[inline]
    fn name(&self) -> &'static str {
        "Curved"
    }

    #[inline]
    fn path_len(&self) -> usize {
        self.signal.len() + 1
    }

    fn simulate(&self, shocks: &mut dyn ShockSource) -> Vec<f64> {
        simulate_curved(self.start_price, self.alpha, &self.params, self.signal, shocks)
    }
}
