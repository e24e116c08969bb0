//! SQLite implementation of [`PriceStore`] and [`PredictionStore`].
//!
//! `(symbol_id, date)` is unique in `price_bars`; bulk inserts use
//! `INSERT OR IGNORE` and single-day writes use `ON CONFLICT DO UPDATE`, so
//! every ingestion mode is idempotent at the row level.

use super::migrations::run_migrations;
use super::{
    DueForecast, PredictionStore, PriceStore, ResolvedAccuracy, StoreError, StoreProgress,
    SymbolCoverage, SymbolQuery,
};
use crate::domain::{
    Analyst, Forecast, Horizon, IngestStatus, NewAnalyst, NewPrediction, Prediction, PriceBar,
    Symbol, SymbolSeed,
};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

impl ToSql for IngestStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for IngestStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

impl ToSql for Horizon {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.days()))
    }
}

impl FromSql for Horizon {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let days = value.as_i64()?;
        Horizon::from_days(days).ok_or(FromSqlError::OutOfRange(days))
    }
}

fn ms_to_utc(col: usize, ms: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(col, ms))
}

fn volume_to_sql(volume: u64) -> Result<i64, StoreError> {
    i64::try_from(volume).map_err(|_| StoreError::VolumeOverflow(volume))
}

const SYMBOL_COLUMNS: &str = "id, ticker, name, sector, industry, ingest_status";

fn symbol_from_row(row: &Row<'_>) -> rusqlite::Result<Symbol> {
    Ok(Symbol {
        id: row.get(0)?,
        ticker: row.get(1)?,
        name: row.get(2)?,
        sector: row.get(3)?,
        industry: row.get(4)?,
        ingest_status: row.get(5)?,
    })
}

fn bar_from_row(row: &Row<'_>) -> rusqlite::Result<PriceBar> {
    let volume: i64 = row.get(5)?;
    Ok(PriceBar {
        date: row.get(0)?,
        open: row.get(1)?,
        high: row.get(2)?,
        low: row.get(3)?,
        close: row.get(4)?,
        volume: u64::try_from(volume)
            .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(5, volume))?,
    })
}

fn analyst_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Analyst> {
    Ok(Analyst {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        email: row.get(offset + 2)?,
        bio: row.get(offset + 3)?,
    })
}

const PREDICTION_COLUMNS: &str =
    "id, user_id, symbol_id, current_price, created_at_ms, is_locked, locked_at_ms";

/// Prediction row without its forecasts.
fn prediction_from_row(row: &Row<'_>) -> rusqlite::Result<Prediction> {
    let locked_at: Option<i64> = row.get(6)?;
    Ok(Prediction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        symbol_id: row.get(2)?,
        current_price: row.get(3)?,
        created_at: ms_to_utc(4, row.get(4)?)?,
        is_locked: row.get(5)?,
        locked_at: locked_at.map(|ms| ms_to_utc(6, ms)).transpose()?,
        forecasts: Vec::new(),
    })
}

/// Single-connection SQLite store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and apply migrations.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        tracing::debug!(path = %path.display(), "opened database");
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn attach_forecasts(conn: &Connection, prediction: &mut Prediction) -> rusqlite::Result<()> {
        let mut stmt = conn.prepare_cached(
            "SELECT horizon_days, predicted_price, target_date_ms, actual_price, accuracy
             FROM forecasts WHERE prediction_id = ?1 ORDER BY horizon_days",
        )?;
        prediction.forecasts = stmt
            .query_map([prediction.id], |row| {
                Ok(Forecast {
                    horizon: row.get(0)?,
                    predicted_price: row.get(1)?,
                    target_date: ms_to_utc(2, row.get(2)?)?,
                    actual_price: row.get(3)?,
                    accuracy: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(())
    }

    fn load_predictions(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Prediction>, StoreError> {
        let mut stmt = conn.prepare(sql)?;
        let mut predictions = stmt
            .query_map(params, prediction_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for prediction in &mut predictions {
            Self::attach_forecasts(conn, prediction)?;
        }
        Ok(predictions)
    }
}

impl PriceStore for SqliteStore {
    fn list_symbols(&self) -> Result<Vec<Symbol>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SYMBOL_COLUMNS} FROM symbols ORDER BY ticker"
        ))?;
        let symbols = stmt
            .query_map([], symbol_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(symbols)
    }

    fn find_symbol(&self, ticker: &str) -> Result<Option<Symbol>, StoreError> {
        let conn = self.conn();
        let symbol = conn
            .query_row(
                &format!("SELECT {SYMBOL_COLUMNS} FROM symbols WHERE ticker = ?1"),
                [ticker],
                symbol_from_row,
            )
            .optional()?;
        Ok(symbol)
    }

    fn symbol_by_id(&self, id: i64) -> Result<Option<Symbol>, StoreError> {
        let conn = self.conn();
        let symbol = conn
            .query_row(
                &format!("SELECT {SYMBOL_COLUMNS} FROM symbols WHERE id = ?1"),
                [id],
                symbol_from_row,
            )
            .optional()?;
        Ok(symbol)
    }

    fn seed_symbols(&self, seeds: &[SymbolSeed]) -> Result<usize, StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO symbols (ticker, name, sector, industry)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for seed in seeds {
                inserted += stmt.execute(params![seed.ticker, seed.name, seed.sector, seed.industry])?;
            }
        }
        tx.commit()?;
        tracing::info!(inserted, offered = seeds.len(), "seeded symbols");
        Ok(inserted)
    }

    fn search_symbols(&self, query: &SymbolQuery) -> Result<Vec<Symbol>, StoreError> {
        let pattern = query.text.as_ref().map(|t| {
            let escaped = t
                .to_lowercase()
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            format!("%{escaped}%")
        });
        let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);

        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SYMBOL_COLUMNS} FROM symbols
             WHERE (?1 IS NULL OR lower(ticker) LIKE ?1 ESCAPE '\\' OR lower(name) LIKE ?1 ESCAPE '\\')
               AND (?2 IS NULL OR sector = ?2)
             ORDER BY ticker
             LIMIT ?3"
        ))?;
        let symbols = stmt
            .query_map(params![pattern, query.sector, limit], symbol_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(symbols)
    }

    fn next_unpopulated_symbol(&self) -> Result<Option<Symbol>, StoreError> {
        let conn = self.conn();
        let symbol = conn
            .query_row(
                &format!(
                    "SELECT {SYMBOL_COLUMNS} FROM symbols s
                     WHERE s.ingest_status != ?1
                       AND NOT EXISTS (SELECT 1 FROM price_bars p WHERE p.symbol_id = s.id)
                     ORDER BY s.ticker
                     LIMIT 1"
                ),
                [IngestStatus::NoDataAvailable],
                symbol_from_row,
            )
            .optional()?;
        Ok(symbol)
    }

    fn insert_bars_skip_duplicates(
        &self,
        symbol_id: i64,
        bars: &[PriceBar],
    ) -> Result<usize, StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO price_bars (symbol_id, date, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for bar in bars {
                inserted += stmt.execute(params![
                    symbol_id,
                    bar.date,
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    volume_to_sql(bar.volume)?,
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn upsert_bar(&self, symbol_id: i64, bar: &PriceBar) -> Result<(), StoreError> {
        let volume = volume_to_sql(bar.volume)?;
        self.conn().execute(
            "INSERT INTO price_bars (symbol_id, date, open, high, low, close, volume)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(symbol_id, date) DO UPDATE SET
                open = excluded.open,
                high = excluded.high,
                low = excluded.low,
                close = excluded.close,
                volume = excluded.volume",
            params![symbol_id, bar.date, bar.open, bar.high, bar.low, bar.close, volume],
        )?;
        Ok(())
    }

    fn set_ingest_status(&self, symbol_id: i64, status: IngestStatus) -> Result<(), StoreError> {
        let changed = self.conn().execute(
            "UPDATE symbols SET ingest_status = ?1 WHERE id = ?2",
            params![status, symbol_id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("symbol {symbol_id}")));
        }
        Ok(())
    }

    fn latest_bar_date(&self, symbol_id: i64) -> Result<Option<NaiveDate>, StoreError> {
        let date = self.conn().query_row(
            "SELECT MAX(date) FROM price_bars WHERE symbol_id = ?1",
            [symbol_id],
            |row| row.get(0),
        )?;
        Ok(date)
    }

    fn bars_for_symbol(&self, symbol_id: i64) -> Result<Vec<PriceBar>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT date, open, high, low, close, volume FROM price_bars
             WHERE symbol_id = ?1 ORDER BY date",
        )?;
        let bars = stmt
            .query_map([symbol_id], bar_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(bars)
    }

    fn close_on_or_before(
        &self,
        symbol_id: i64,
        date: NaiveDate,
    ) -> Result<Option<(NaiveDate, f64)>, StoreError> {
        let found = self
            .conn()
            .query_row(
                "SELECT date, close FROM price_bars
                 WHERE symbol_id = ?1 AND date <= ?2
                 ORDER BY date DESC LIMIT 1",
                params![symbol_id, date],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(found)
    }

    fn progress(&self) -> Result<StoreProgress, StoreError> {
        let conn = self.conn();
        let count = |sql: &str| -> rusqlite::Result<u64> {
            let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n.max(0) as u64)
        };
        Ok(StoreProgress {
            total_symbols: count("SELECT COUNT(*) FROM symbols")?,
            symbols_with_data: count("SELECT COUNT(DISTINCT symbol_id) FROM price_bars")?,
            symbols_no_data: count(
                "SELECT COUNT(*) FROM symbols s WHERE s.ingest_status = 'no_data'
                 AND NOT EXISTS (SELECT 1 FROM price_bars p WHERE p.symbol_id = s.id)",
            )?,
            total_prices: count("SELECT COUNT(*) FROM price_bars")?,
        })
    }

    fn coverage(&self) -> Result<Vec<SymbolCoverage>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT s.ticker, s.name, s.ingest_status, COUNT(p.id), MIN(p.date), MAX(p.date)
             FROM symbols s LEFT JOIN price_bars p ON p.symbol_id = s.id
             GROUP BY s.id
             ORDER BY s.ticker",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let rows: i64 = row.get(3)?;
                Ok(SymbolCoverage {
                    ticker: row.get(0)?,
                    name: row.get(1)?,
                    status: row.get(2)?,
                    rows: rows.max(0) as u64,
                    first_date: row.get(4)?,
                    last_date: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

impl PredictionStore for SqliteStore {
    fn insert_user(&self, user: &NewAnalyst) -> Result<Analyst, StoreError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO users (name, email, bio) VALUES (?1, ?2, ?3)",
            params![user.name, user.email, user.bio],
        )?;
        Ok(Analyst {
            id: conn.last_insert_rowid(),
            name: user.name.clone(),
            email: user.email.clone(),
            bio: user.bio.clone(),
        })
    }

    fn get_user(&self, id: i64) -> Result<Option<Analyst>, StoreError> {
        let user = self
            .conn()
            .query_row(
                "SELECT id, name, email, bio FROM users WHERE id = ?1",
                [id],
                |row| analyst_from_row(row, 0),
            )
            .optional()?;
        Ok(user)
    }

    fn insert_prediction(
        &self,
        prediction: &NewPrediction,
        created_at: DateTime<Utc>,
    ) -> Result<Prediction, StoreError> {
        let forecasts = prediction.forecasts_at(created_at);

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO predictions (user_id, symbol_id, current_price, created_at_ms)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                prediction.user_id,
                prediction.symbol_id,
                prediction.current_price,
                created_at.timestamp_millis(),
            ],
        )?;
        let id = tx.last_insert_rowid();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO forecasts (prediction_id, horizon_days, predicted_price, target_date_ms)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for forecast in &forecasts {
                stmt.execute(params![
                    id,
                    forecast.horizon,
                    forecast.predicted_price,
                    forecast.target_date.timestamp_millis(),
                ])?;
            }
        }
        tx.commit()?;

        Ok(Prediction {
            id,
            user_id: prediction.user_id,
            symbol_id: prediction.symbol_id,
            current_price: prediction.current_price,
            created_at,
            is_locked: false,
            locked_at: None,
            forecasts,
        })
    }

    fn get_prediction(&self, id: i64) -> Result<Option<Prediction>, StoreError> {
        let conn = self.conn();
        let prediction = conn
            .query_row(
                &format!("SELECT {PREDICTION_COLUMNS} FROM predictions WHERE id = ?1"),
                [id],
                prediction_from_row,
            )
            .optional()?;
        match prediction {
            Some(mut p) => {
                Self::attach_forecasts(&conn, &mut p)?;
                Ok(Some(p))
            }
            None => Ok(None),
        }
    }

    fn delete_prediction(&self, id: i64) -> Result<bool, StoreError> {
        let deleted = self
            .conn()
            .execute("DELETE FROM predictions WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }

    fn lock_created_before(
        &self,
        cutoff: DateTime<Utc>,
        locked_at: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let locked = self.conn().execute(
            "UPDATE predictions SET is_locked = 1, locked_at_ms = ?1
             WHERE is_locked = 0 AND created_at_ms < ?2",
            params![locked_at.timestamp_millis(), cutoff.timestamp_millis()],
        )?;
        Ok(locked)
    }

    fn locked_predictions_for_symbol(&self, symbol_id: i64) -> Result<Vec<Prediction>, StoreError> {
        let conn = self.conn();
        Self::load_predictions(
            &conn,
            &format!(
                "SELECT {PREDICTION_COLUMNS} FROM predictions
                 WHERE symbol_id = ?1 AND is_locked = 1 ORDER BY id"
            ),
            [symbol_id],
        )
    }

    fn resolved_for_horizon(&self, horizon: Horizon) -> Result<Vec<ResolvedAccuracy>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT p.id, u.id, u.name, u.email, u.bio, f.accuracy
             FROM forecasts f
             JOIN predictions p ON p.id = f.prediction_id
             JOIN users u ON u.id = p.user_id
             WHERE p.is_locked = 1 AND f.horizon_days = ?1 AND f.accuracy IS NOT NULL
             ORDER BY p.id",
        )?;
        let rows = stmt
            .query_map([horizon], |row| {
                Ok(ResolvedAccuracy {
                    prediction_id: row.get(0)?,
                    analyst: analyst_from_row(row, 1)?,
                    accuracy: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn due_unresolved(&self, now: DateTime<Utc>) -> Result<Vec<DueForecast>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT f.prediction_id, p.symbol_id, f.horizon_days, f.predicted_price, f.target_date_ms
             FROM forecasts f
             JOIN predictions p ON p.id = f.prediction_id
             WHERE p.is_locked = 1 AND f.actual_price IS NULL AND f.target_date_ms <= ?1
             ORDER BY f.target_date_ms, f.prediction_id, f.horizon_days",
        )?;
        let rows = stmt
            .query_map([now.timestamp_millis()], |row| {
                Ok(DueForecast {
                    prediction_id: row.get(0)?,
                    symbol_id: row.get(1)?,
                    horizon: row.get(2)?,
                    predicted_price: row.get(3)?,
                    target_date: ms_to_utc(4, row.get(4)?)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn record_resolution(
        &self,
        prediction_id: i64,
        horizon: Horizon,
        actual_price: f64,
        accuracy: f64,
    ) -> Result<(), StoreError> {
        let changed = self.conn().execute(
            "UPDATE forecasts SET actual_price = ?1, accuracy = ?2
             WHERE prediction_id = ?3 AND horizon_days = ?4",
            params![actual_price, accuracy, prediction_id, horizon],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!(
                "{horizon} forecast of prediction {prediction_id}"
            )));
        }
        Ok(())
    }

    fn predictions_for_user(&self, user_id: i64) -> Result<Vec<Prediction>, StoreError> {
        let conn = self.conn();
        Self::load_predictions(
            &conn,
            &format!(
                "SELECT {PREDICTION_COLUMNS} FROM predictions
                 WHERE user_id = ?1 ORDER BY created_at_ms DESC, id DESC"
            ),
            [user_id],
        )
    }
}
