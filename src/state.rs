use crate::config::AppConfig;
use crate::db::DbPool;
use crate::experiment::ExperimentReport;
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ── Simulation Counters (lock-free, shared with rayon workers) ──

pub struct SimCounters {
    pub paths_simulated: AtomicU64,
    pub paths_rejected: AtomicU64,
    pub ensembles_built: AtomicU64,
    pub sweep_candidates_failed: AtomicU64,
}

impl SimCounters {
    pub fn new() -> Self {
        Self {
            paths_simulated: AtomicU64::new(0),
            paths_rejected: AtomicU64::new(0),
            ensembles_built: AtomicU64::new(0),
            sweep_candidates_failed: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            paths_simulated: self.paths_simulated.load(Ordering::Relaxed),
            paths_rejected: self.paths_rejected.load(Ordering::Relaxed),
            ensembles_built: self.ensembles_built.load(Ordering::Relaxed),
            sweep_candidates_failed: self.sweep_candidates_failed.load(Ordering::Relaxed),
        }
    }
}

impl Default for SimCounters {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct CounterSnapshot {
    pub paths_simulated: u64,
    pub paths_rejected: u64,
    pub ensembles_built: u64,
    pub sweep_candidates_failed: u64,
}

// ── Application shared state (read-only after the run) ──

pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,
    pub run_id: String,
    pub report: ExperimentReport,
    pub counters: Arc<SimCounters>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db: DbPool,
        run_id: String,
        report: ExperimentReport,
        counters: Arc<SimCounters>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            db,
            run_id,
            report,
            counters,
        })
    }
}
