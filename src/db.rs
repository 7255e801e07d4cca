use crate::errors::{LabError, LabResult};
use crate::experiment::ExperimentReport;
use crate::feeds::{PriceHistory, PricePoint};
use chrono::NaiveDate;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub type DbPool = Arc<Mutex<Connection>>;

const DATE_FMT: &str = "%Y-%m-%d";

pub fn init_db(data_dir: &Path) -> LabResult<DbPool> {
    std::fs::create_dir_all(data_dir).map_err(|e| LabError::Database(format!("create dir: {e}")))?;
    let db_path = data_dir.join("curvature_lab.db");
    let conn = Connection::open(&db_path)?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

    let pool = migrate(conn)?;
    tracing::info!("database initialized at {}", db_path.display());
    Ok(pool)
}

fn migrate(conn: Connection) -> LabResult<DbPool> {
    let schema = include_str!("../migrations/001_init.sql");
    conn.execute_batch(schema)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// Upsert fetched closes into the price cache.
pub fn store_prices(db: &DbPool, history: &PriceHistory) -> LabResult<usize> {
    let mut conn = db.lock().map_err(|e| LabError::Database(format!("lock poisoned: {e}")))?;
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO prices (ticker, date, close) VALUES (?1, ?2, ?3)",
        )?;
        for p in history.points() {
            stmt.execute(rusqlite::params![
                history.ticker,
                p.date.format(DATE_FMT).to_string(),
                p.close
            ])?;
        }
    }
    tx.commit()?;
    Ok(history.len())
}

/// Cached closes for `ticker` dated within [start, end], oldest first.
pub fn load_prices(db: &DbPool, ticker: &str, start: NaiveDate, end: NaiveDate) -> LabResult<PriceHistory> {
    let conn = db.lock().map_err(|e| LabError::Database(format!("lock: {e}")))?;
    let mut stmt = conn.prepare(
        "SELECT date, close FROM prices WHERE ticker = ?1 AND date >= ?2 AND date <= ?3 ORDER BY date ASC",
    )?;
    let rows = stmt.query_map(
        rusqlite::params![
            ticker,
            start.format(DATE_FMT).to_string(),
            end.format(DATE_FMT).to_string()
        ],
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)),
    )?;

    let mut points = Vec::new();
    for row in rows {
        let (date, close) = row?;
        let date = NaiveDate::parse_from_str(&date, DATE_FMT)
            .map_err(|e| LabError::Database(format!("bad cached date {date}: {e}")))?;
        points.push(PricePoint { date, close });
    }

    PriceHistory::new(ticker, points)
}

/// Persist one experiment run and its sweep grid.
pub fn insert_run(db: &DbPool, run_id: &str, ticker: &str, report: &ExperimentReport) -> LabResult<()> {
    let mut conn = db.lock().map_err(|e| LabError::Database(format!("lock poisoned: {e}")))?;
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO runs (id, ticker, created_at, seed, members, mu, sigma, flat_corr, curved_corr, improvement_pct, curved_alpha, best_alpha, best_corr)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        rusqlite::params![
            run_id,
            ticker,
            chrono::Utc::now().to_rfc3339(),
            // u64 does not fit SQLite INTEGER
            report.seed.to_string(),
            report.members as i64,
            report.params.mu,
            report.params.sigma,
            report.flat.fit.correlation,
            report.curved.fit.correlation,
            report.improvement_pct,
            report.curved_alpha,
            report.sweep.best_alpha,
            report.sweep.best_correlation,
        ],
    )?;

    {
        let mut stmt = tx.prepare(
            "INSERT INTO sweep_points (run_id, alpha, corr, error) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for p in &report.sweep.points {
            stmt.execute(rusqlite::params![run_id, p.alpha, p.correlation, p.error])?;
        }
    }

    tx.commit()?;
    Ok(())
}

// ── Query helpers (for server REST reads) ──

pub fn get_recent_runs(db: &DbPool, ticker: Option<&str>, limit: usize) -> LabResult<Vec<RunRow>> {
    let conn = db.lock().map_err(|e| LabError::Database(format!("lock: {e}")))?;
    let (sql, params): (&str, Vec<Box<dyn rusqlite::types::ToSql>>) = match ticker {
        Some(t) => (
            "SELECT id, ticker, created_at, seed, members, mu, sigma, flat_corr, curved_corr, improvement_pct, curved_alpha, best_alpha, best_corr FROM runs WHERE ticker = ?1 ORDER BY created_at DESC LIMIT ?2",
            vec![Box::new(t.to_string()), Box::new(limit as i64)],
        ),
        None => (
            "SELECT id, ticker, created_at, seed, members, mu, sigma, flat_corr, curved_corr, improvement_pct, curved_alpha, best_alpha, best_corr FROM runs ORDER BY created_at DESC LIMIT ?1",
            vec![Box::new(limit as i64)],
        ),
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), |row| {
        Ok(RunRow {
            id: row.get(0)?,
            ticker: row.get(1)?,
            created_at: row.get(2)?,
            seed: row.get(3)?,
            members: row.get(4)?,
            mu: row.get(5)?,
            sigma: row.get(6)?,
            flat_corr: row.get(7)?,
            curved_corr: row.get(8)?,
            improvement_pct: row.get(9)?,
            curved_alpha: row.get(10)?,
            best_alpha: row.get(11)?,
            best_corr: row.get(12)?,
        })
    })?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

// ── Row types ──

#[derive(Debug, Clone, serde::Serialize)]
pub struct RunRow {
    pub id: String,
    pub ticker: String,
    pub created_at: String,
    pub seed: String,
    pub members: i64,
    pub mu: f64,
    pub sigma: f64,
    pub flat_corr: f64,
    pub curved_corr: f64,
    pub improvement_pct: Option<f64>,
    pub curved_alpha: f64,
    pub best_alpha: f64,
    pub best_corr: f64,
}
