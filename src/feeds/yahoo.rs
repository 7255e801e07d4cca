use crate::errors::{LabError, LabResult};
use crate::feeds::{PriceHistory, PricePoint};
use chrono::{DateTime, Duration, NaiveDate};
use reqwest::Client;

/// Yahoo Finance v8 chart client. One-shot daily history download.
/// Failures are reported, never retried.
#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
}

impl YahooClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(15))
                .user_agent("Mozilla/5.0 (X11; Linux x86_64) curvature_lab/0.1")
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Daily closes for `ticker` dated in [start, end].
    pub async fn fetch_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LabResult<PriceHistory> {
        let period1 = start.and_hms_opt(0, 0, 0).map(|t| t.and_utc().timestamp()).unwrap_or(0);
        let period2 = (end + Duration::days(1))
            .and_hms_opt(0, 0, 0)
            .map(|t| t.and_utc().timestamp())
            .unwrap_or(0);

        let url = format!(
            "{}/v8/finance/chart/{ticker}?period1={period1}&period2={period2}&interval=1d&events=history&includeAdjustedClose=true",
            self.base_url
        );

        tracing::info!(ticker, %start, %end, "requesting daily history");

        let resp = self.client.get(&url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LabError::Feed(format!("HTTP {status}: {body}")));
        }

        let body: ChartResponse = resp
            .json()
            .await
            .map_err(|e| LabError::Parse(format!("chart {ticker}: {e}")))?;

        let history = parse_chart(ticker, body)?;
        Ok(history.trimmed(start, end))
    }
}

// Yahoo v8 chart response (fields we use):
// {
//   "chart": {
//     "result": [{
//       "meta": { "symbol": "SPY", "gmtoffset": -18000, ... },
//       "timestamp": [1669905000, ...],
//       "indicators": {
//         "quote": [{ "close": [407.38, null, ...], ... }],
//         "adjclose": [{ "adjclose": [394.51, null, ...] }]
//       }
//     }],
//     "error": null
//   }
// }

#[derive(serde::Deserialize)]
pub(crate) struct ChartResponse {
    chart: Chart,
}

#[derive(serde::Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(serde::Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(serde::Deserialize)]
struct ChartResult {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(serde::Deserialize)]
struct ChartMeta {
    gmtoffset: Option<i64>,
}

#[derive(serde::Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
    #[serde(default)]
    adjclose: Vec<AdjClose>,
}

#[derive(serde::Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(serde::Deserialize)]
struct AdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Turn a chart payload into a history. Prefers adjusted closes, falls back
/// to raw closes, and drops days whose value is missing.
pub(crate) fn parse_chart(ticker: &str, body: ChartResponse) -> LabResult<PriceHistory> {
    if let Some(err) = body.chart.error {
        return Err(LabError::Feed(format!(
            "{}: {}",
            err.code.unwrap_or_default(),
            err.description.unwrap_or_default()
        )));
    }

    let result = body
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| LabError::Feed(format!("no chart result for {ticker}")))?;

    let timestamps = result.timestamp.unwrap_or_default();
    let offset = result.meta.and_then(|m| m.gmtoffset).unwrap_or(0);

    let closes = match result.indicators.adjclose.into_iter().next() {
        Some(a) if !a.adjclose.is_empty() => a.adjclose,
        _ => result
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .unwrap_or_default(),
    };

    if closes.len() != timestamps.len() {
        return Err(LabError::Parse(format!(
            "{ticker}: {} timestamps but {} closes",
            timestamps.len(),
            closes.len()
        )));
    }

    let mut points = Vec::with_capacity(timestamps.len());
    let mut dropped = 0usize;
    for (&ts, close) in timestamps.iter().zip(closes) {
        let date = DateTime::from_timestamp(ts + offset, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| LabError::Parse(format!("{ticker}: bad timestamp {ts}")))?;
        match close {
            Some(c) if c.is_finite() && c > 0.0 => points.push(PricePoint { date, close: c }),
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        tracing::warn!(ticker, dropped, "dropped days with missing closes");
    }

    // Intraday refreshes can repeat the last session; keep the latest value per date
    points.dedup_by(|later, earlier| {
        if later.date == earlier.date {
            earlier.close = later.close;
            true
        } else {
            false
        }
    });

    PriceHistory::new(ticker, points)
}

impl PriceHistory {
    /// Copy restricted to dates within [start, end].
    fn trimmed(&self, start: NaiveDate, end: NaiveDate) -> PriceHistory {
        PriceHistory {
            ticker: self.ticker.clone(),
            points: self
                .points
                .iter()
                .filter(|p| p.date >= start && p.date <= end)
                .copied()
                .collect(),
        }
    }
}
