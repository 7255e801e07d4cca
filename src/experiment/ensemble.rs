use crate::errors::{LabError, LabResult};
use crate::models::shocks::GaussianShocks;
use crate::models::PathModel;
use crate::state::SimCounters;
use portable_atomic::Ordering;
use rayon::prelude::*;

/// Default number of independent paths per ensemble.
pub const DEFAULT_MEMBERS: usize = 100;

/// A reduced set of independent simulations of one model.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Ensemble {
    pub model: &'static str,
    /// Element-wise arithmetic mean of the accepted paths
    pub mean: Vec<f64>,
    /// Accepted member paths, in member order
    pub paths: Vec<Vec<f64>>,
    /// Members dropped for non-finite or non-positive values
    pub rejected: usize,
}

impl Ensemble {
    #[inline]
    pub fn accepted(&self) -> usize {
        self.paths.len()
    }
}

/// Run `members` independent simulations of `model` and reduce them to a mean path.
///
/// Member k draws from its own stream derived from (seed, k), so the result is
/// identical whatever the rayon thread count. Paths containing a non-finite or
/// non-positive price are excluded from the mean and counted as rejected.
pub fn run_ensemble(
    model: &dyn PathModel,
    members: usize,
    seed: u64,
    counters: &SimCounters,
) -> LabResult<Ensemble> {
    let paths: Vec<Vec<f64>> = (0..members)
        .into_par_iter()
        .map(|member| {
            let mut shocks = GaussianShocks::for_member(seed, member as u64);
            model.simulate(&mut shocks)
        })
        .collect();

    counters.paths_simulated.fetch_add(members as u64, Ordering::Relaxed);

    let expected_len = model.path_len();
    let (accepted, dropped): (Vec<Vec<f64>>, Vec<Vec<f64>>) = paths
        .into_iter()
        .partition(|p| p.len() == expected_len && is_valid_path(p));
    let rejected = dropped.len();

    if rejected > 0 {
        counters.paths_rejected.fetch_add(rejected as u64, Ordering::Relaxed);
        tracing::warn!(
            model = model.name(),
            rejected,
            members,
            "excluded non-finite ensemble members"
        );
    }

    if accepted.is_empty() {
        return Err(LabError::EnsembleExhausted { members, rejected });
    }

    let mean = mean_path(&accepted, expected_len);
    counters.ensembles_built.fetch_add(1, Ordering::Relaxed);

    Ok(Ensemble {
        model: model.name(),
        mean,
        paths: accepted,
        rejected,
    })
}

#[inline]
fn is_valid_path(path: &[f64]) -> bool {
    path.iter().all(|&p| p.is_finite() && p > 0.0)
}

/// Element-wise mean of equal-length paths. `paths` must be non-empty.
fn mean_path(paths: &[Vec<f64>], len: usize) -> Vec<f64> {
    let mut sums = vec![0.0_f64; len];
    for path in paths {
        for (s, &p) in sums.iter_mut().zip(path) {
            *s += p;
        }
    }
    let k = paths.len() as f64;
    sums.iter_mut().for_each(|s| *s /= k);
    sums
}
