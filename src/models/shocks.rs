use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, StandardNormal};

/// Source of the standard-normal innovations Z_i driving a path.
/// Simulators never own randomness; they pull one draw per step from here.
pub trait ShockSource {
    fn next_shock(&mut self) -> f64;
}

/// Seeded Gaussian innovations (ChaCha20 stream).
pub struct GaussianShocks {
    rng: ChaCha20Rng,
}

impl GaussianShocks {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    /// Independent stream for ensemble member `member` under a shared base seed.
    /// Depends only on (seed, member), never on which worker runs it.
    pub fn for_member(seed: u64, member: u64) -> Self {
        Self::new(seed.wrapping_add(member.wrapping_mul(0x9e37_79b9_7f4a_7c15)))
    }
}

impl ShockSource for GaussianShocks {
    #[inline]
    fn next_shock(&mut self) -> f64 {
        StandardNormal.sample(&mut self.rng)
    }
}

/// Replays a fixed list of draws, then repeats `fill` forever.
/// Used to drive simulators deterministically.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct ScriptedShocks {
    draws: Vec<f64>,
    pos: usize,
    fill: f64,
}

#[cfg(test)]
impl ScriptedShocks {
    pub fn new(draws: Vec<f64>, fill: f64) -> Self {
        Self { draws, pos: 0, fill }
    }

    /// Every draw equals `value`.
    pub fn constant(value: f64) -> Self {
        Self::new(Vec::new(), value)
    }

    /// Number of draws consumed so far.
    pub fn consumed(&self) -> usize {
        self.pos
    }
}

#[cfg(test)]
impl ShockSource for ScriptedShocks {
    #[inline]
    fn next_shock(&mut self) -> f64 {
        let z = self.draws.get(self.pos).copied().unwrap_or(self.fill);
        self.pos += 1;
        z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = GaussianShocks::new(7);
        let mut b = GaussianShocks::new(7);
        for _ in 0..50 {
            assert_eq!(a.next_shock(), b.next_shock());
        }
    }

    #[test]
    fn test_member_streams_differ() {
        let mut a = GaussianShocks::for_member(7, 0);
        let mut b = GaussianShocks::for_member(7, 1);
        let xs: Vec<f64> = (0..10).map(|_| a.next_shock()).collect();
        let ys: Vec<f64> = (0..10).map(|_| b.next_shock()).collect();
        assert_ne!(xs, ys, "member streams should be independent");
    }

    #[test]
    fn test_gaussian_moments() {
        let mut s = GaussianShocks::new(42);
        let n = 20_000;
        let draws: Vec<f64> = (0..n).map(|_| s.next_shock()).collect();
        let mean = draws.iter().sum::<f64>() / n as f64;
        let var = draws.iter().map(|z| (z - mean) * (z - mean)).sum::<f64>() / (n as f64 - 1.0);
        assert!(mean.abs() < 0.05, "mean={mean}");
        assert!((var - 1.0).abs() < 0.05, "var={var}");
    }

    #[test]
    fn test_scripted_replays_then_fills() {
        let mut s = ScriptedShocks::new(vec![1.0, -2.0], 0.5);
        assert_eq!(s.next_shock(), 1.0);
        assert_eq!(s.next_shock(), -2.0);
        assert_eq!(s.next_shock(), 0.5);
        assert_eq!(s.consumed(), 3);
    }
}
