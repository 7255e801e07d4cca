use crate::errors::{LabError, LabResult};
use crate::experiment::sweep::AlphaGrid;
use crate::experiment::ExperimentConfig;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ticker: String,
    /// First day fetched (start of the warm-up period)
    pub history_start: NaiveDate,
    pub eval_start: NaiveDate,
    pub eval_end: NaiveDate,
    pub yahoo_base_url: String,
    pub ensemble_size: usize,
    pub curved_alpha: f64,
    pub alpha_grid_start: f64,
    pub alpha_grid_end: f64,
    pub alpha_grid_step: f64,
    pub burn_in_days: usize,
    pub signal_window: usize,
    pub seed: Option<u64>,
    pub data_dir: PathBuf,
    /// Read prices from the local cache instead of the network
    pub offline: bool,
    /// Serve the dashboard API after the run when set
    pub server_port: Option<u16>,
}

impl AppConfig {
    pub fn from_env() -> LabResult<Self> {
        dotenvy::dotenv().ok();

        let cfg = Self {
            ticker: env_var_or("TICKER", "SPY"),
            // Two months of warm-up leaves ~40 trading days, enough for the burn-in
        history_start: parse_var("HISTORY_START", "2022-11-01")?,
            eval_start: parse_var("EVAL_START", "2023-01-01")?,
            eval_end: parse_var("EVAL_END", "2023-12-31")?,
            yahoo_base_url: env_var_or("YAHOO_BASE_URL", "https://query1.finance.yahoo.com"),
            ensemble_size: parse_var("ENSEMBLE_SIZE", "100")?,
            curved_alpha: parse_var("CURVED_ALPHA", "0.9")?,
            alpha_grid_start: parse_var("ALPHA_GRID_START", "0.1")?,
            alpha_grid_end: parse_var("ALPHA_GRID_END", "1.0")?,
            alpha_grid_step: parse_var("ALPHA_GRID_STEP", "0.1")?,
            burn_in_days: parse_var("BURN_IN_DAYS", "30")?,
            signal_window: parse_var("SIGNAL_WINDOW", "30")?,
            seed: parse_optional_var("SEED")?,
            data_dir: PathBuf::from(env_var_or("DATA_DIR", "data")),
            offline: parse_var("OFFLINE", "false")?,
            server_port: parse_optional_var("SERVER_PORT")?,
        };

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> LabResult<()> {
        if self.history_start >= self.eval_start {
            return Err(LabError::Config(format!(
                "HISTORY_START ({}) must precede EVAL_START ({})",
                self.history_start, self.eval_start
            )));
        }
        if self.eval_start > self.eval_end {
            return Err(LabError::Config(format!(
                "EVAL_START ({}) is after EVAL_END ({})",
                self.eval_start, self.eval_end
            )));
        }
        if self.ensemble_size == 0 {
            return Err(LabError::Config("ENSEMBLE_SIZE must be at least 1".into()));
        }
        if self.signal_window < 2 {
            return Err(LabError::Config("SIGNAL_WINDOW must be at least 2".into()));
        }
        if !self.curved_alpha.is_finite() {
            return Err(LabError::Config(format!("CURVED_ALPHA: {}", self.curved_alpha)));
        }
        self.alpha_grid()?;
        Ok(())
    }

    pub fn alpha_grid(&self) -> LabResult<AlphaGrid> {
        AlphaGrid::new(self.alpha_grid_start, self.alpha_grid_end, self.alpha_grid_step)
    }

    /// Core-facing subset of the configuration.
    pub fn experiment(&self) -> LabResult<ExperimentConfig> {
        Ok(ExperimentConfig {
            members: self.ensemble_size,
            curved_alpha: self.curved_alpha,
            grid: self.alpha_grid()?,
            burn_in: self.burn_in_days,
            signal_window: self.signal_window,
            seed: self.seed,
        })
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(key: &str, default: &str) -> LabResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_var_or(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| LabError::Config(format!("{key}: {e}")))
}

fn parse_optional_var<T>(key: &str) -> LabResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| LabError::Config(format!("{key}: {e}"))),
        _ => Ok(None),
    }
}
