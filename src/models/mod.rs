pub mod returns;
pub mod risk_signal;
pub mod shocks;
pub mod flat;
pub mod curved;

pub use returns::ModelParams;
pub use shocks::ShockSource;

/// Trading days per year used for every annualization.
pub const TRADING_DAYS: f64 = 252.0;

/// Daily time step in years.
pub const DT: f64 = 1.0 / TRADING_DAYS;

/// All price-path simulators implement this trait.
/// simulate() must draw all of its randomness from `shocks`, so the same
/// shock stream always reproduces the same path.
/// Send + Sync required for parallel ensembles.
pub trait PathModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Number of points every simulated path has.
    fn path_len(&self) -> usize;

    /// Generate one path, starting at the seed price.
    fn simulate(&self, shocks: &mut dyn ShockSource) -> Vec<f64>;
}

/// One step of the exact GBM discretization:
/// p * exp((mu - sigma^2/2) dt + sigma sqrt(dt) z).
///
/// Evolves in the log domain, so finite inputs keep the price positive
/// unless exp() itself underflows or overflows.
#[inline]
pub fn lognormal_step(price: f64, mu: f64, sigma: f64, z: f64) -> f64 {
    price * ((mu - 0.5 * sigma * sigma) * DT + sigma * DT.sqrt() * z).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_noise_step_is_pure_drift() {
        let p = lognormal_step(100.0, 0.252, 0.0, 0.0);
        let expected = 100.0 * (0.252 * DT).exp();
        assert!((p - expected).abs() < 1e-12, "step={p} expected={expected}");
    }

    #[test]
    fn test_step_stays_positive_for_large_negative_shock() {
        let p = lognormal_step(100.0, -5.0, 2.0, -8.0);
        assert!(p > 0.0, "price must stay positive: {p}");
    }
}
