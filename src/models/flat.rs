use crate::models::{lognormal_step, ModelParams, PathModel, ShockSource};

/// Constant-parameter geometric random walk.
///
/// p[0] = P0
/// p[i] = p[i-1] * exp((mu - sigma^2/2) dt + sigma sqrt(dt) Z_i),  i = 1..N-1
///
/// Consumes exactly N-1 draws.
pub fn simulate_flat(
    start_price: f64,
    steps: usize,
    params: &ModelParams,
    shocks: &mut dyn ShockSource,
) -> Vec<f64> {
    let mut path = Vec::with_capacity(steps);
    if steps == 0 {
        return path;
    }

    path.push(start_price);
    let mut price = start_price;
    for _ in 1..steps {
        price = lognormal_step(price, params.mu, params.sigma, shocks.next_shock());
        path.push(price);
    }
    path
}

/// Flat model bound to one start price and horizon.
#[derive(Debug, Clone, Copy)]
pub struct FlatModel {
    pub start_price: f64,
    pub steps: usize,
    pub params: ModelParams,
}

impl FlatModel {
    pub fn new(start_price: f64, steps: usize, params: ModelParams) -> Self {
        Self { start_price, steps, params }
    }
}

impl PathModel for FlatModel {
    #[inline]
    fn name(&self) -> &'static str {
        "Flat"
    }

    #[inline]
    fn path_len(&self) -> usize {
        self.steps
    }

    fn simulate(&self, shocks: &mut dyn ShockSource) -> Vec<f64> {
        simulate_flat(self.start_price, self.steps, &self.params, shocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::shocks::{GaussianShocks, ScriptedShocks};
    use crate::models::DT;

    #[test]
    fn test_zero_sigma_zero_draws_is_pure_drift() {
        let params = ModelParams::new(0.08, 0.0);
        for &p0 in &[0.5, 100.0, 4321.0] {
            let mut shocks = ScriptedShocks::constant(0.0);
            let path = simulate_flat(p0, 50, &params, &mut shocks);
            assert_eq!(path.len(), 50);
            for (i, &p) in path.iter().enumerate() {
                let expected = p0 * (params.mu * DT * i as f64).exp();
                assert!(
                    (p - expected).abs() <= 1e-9 * expected,
                    "step {i}: {p} vs {expected}"
                );
            }
        }
    }

    #[test]
    fn test_consumes_n_minus_one_draws() {
        let params = ModelParams::new(0.1, 0.2);
        let mut shocks = ScriptedShocks::constant(0.3);
        let path = simulate_flat(10.0, 20, &params, &mut shocks);
        assert_eq!(path.len(), 20);
        assert_eq!(shocks.consumed(), 19);
    }

    #[test]
    fn test_degenerate_horizons() {
        let params = ModelParams::new(0.1, 0.2);
        let mut shocks = ScriptedShocks::constant(0.0);
        assert!(simulate_flat(10.0, 0, &params, &mut shocks).is_empty());
        assert_eq!(simulate_flat(10.0, 1, &params, &mut shocks), vec![10.0]);
        assert_eq!(shocks.consumed(), 0);
    }

    #[test]
    fn test_constant_price_with_zero_params() {
        let params = ModelParams::new(0.0, 0.0);
        let mut shocks = ScriptedShocks::constant(0.0);
        let path = simulate_flat(100.0, 282, &params, &mut shocks);
        assert!(path.iter().all(|&p| p == 100.0), "flat model with zero params must stay at 100");
    }

    #[test]
    fn test_paths_strictly_positive() {
        let cases = [(-3.0, 0.0), (0.0, 1.5), (2.0, 0.8), (-0.5, 3.0)];
        for (seed, &(mu, sigma)) in cases.iter().enumerate() {
            let params = ModelParams::new(mu, sigma);
            let mut shocks = GaussianShocks::new(seed as u64);
            let path = simulate_flat(50.0, 252, &params, &mut shocks);
            assert!(path.iter().all(|&p| p > 0.0), "mu={mu} sigma={sigma} produced non-positive price");
        }
    }

    #[test]
    fn test_trait_matches_free_function() {
        let params = ModelParams::new(0.05, 0.2);
        let model = FlatModel::new(100.0, 30, params);
        let a = model.simulate(&mut GaussianShocks::new(3));
        let b = simulate_flat(100.0, 30, &params, &mut GaussianShocks::new(3));
        assert_eq!(a, b);
        assert_eq!(model.path_len(), 30);
    }
}
