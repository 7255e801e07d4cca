pub mod yahoo;

use crate::errors::{LabError, LabResult};
use chrono::NaiveDate;

/// One daily close.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Chronological daily closes for one instrument. Immutable once built.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PriceHistory {
    pub ticker: String,
    points: Vec<PricePoint>,
}

impl PriceHistory {
    /// Validates strictly increasing dates and strictly positive, finite closes.
    pub fn new(ticker: impl Into<String>, points: Vec<PricePoint>) -> LabResult<Self> {
        let ticker = ticker.into();

        for (index, p) in points.iter().enumerate() {
            if !p.close.is_finite() || p.close <= 0.0 {
                return Err(LabError::InvalidPrice { index, value: p.close });
            }
        }

        if let Some(w) = points.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(LabError::Feed(format!(
                "{ticker}: dates out of order ({} then {})",
                w[0].date, w[1].date
            )));
        }

        Ok(Self { ticker, points })
    }

    #[inline]
    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    /// Closes dated within [start, end], inclusive.
    pub fn evaluation_window(&self, start: NaiveDate, end: NaiveDate) -> Vec<f64> {
        self.points
            .iter()
            .filter(|p| p.date >= start && p.date <= end)
            .map(|p| p.close)
            .collect()
    }

    /// Number of points dated before `start` (the warm-up period).
    pub fn warmup_len(&self, start: NaiveDate) -> usize {
        self.points.iter().take_while(|p| p.date < start).count()
    }
}
