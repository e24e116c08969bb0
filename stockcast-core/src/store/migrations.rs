//! SQLite schema migrations.

use super::StoreError;
use rusqlite::Connection;

/// Apply every migration not yet recorded in the `migrations` table.
pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    run_migration(conn, "001_symbols", CREATE_SYMBOLS_TABLE)?;
    run_migration(conn, "002_price_bars", CREATE_PRICE_BARS_TABLE)?;
    run_migration(conn, "003_users", CREATE_USERS_TABLE)?;
    run_migration(conn, "004_predictions", CREATE_PREDICTIONS_TABLE)?;
    run_migration(conn, "005_forecasts", CREATE_FORECASTS_TABLE)?;

    tracing::debug!("database migrations completed");
    Ok(())
}

fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<(), StoreError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM migrations WHERE name = ?)",
        [name],
        |row| row.get(0),
    )?;

    if !exists {
        tracing::info!(migration = name, "running migration");
        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO migrations (name) VALUES (?)", [name])?;
    }

    Ok(())
}

const CREATE_SYMBOLS_TABLE: &str = r#"
CREATE TABLE symbols (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ticker TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    sector TEXT,
    industry TEXT,
    ingest_status TEXT NOT NULL DEFAULT 'not_started',
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);
CREATE INDEX IF NOT EXISTS idx_symbols_sector ON symbols(sector);
"#;

// Dates are ISO `YYYY-MM-DD` text so lexical order is date order.
const CREATE_PRICE_BARS_TABLE: &str = r#"
CREATE TABLE price_bars (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol_id INTEGER NOT NULL REFERENCES symbols(id) ON DELETE CASCADE,
    date TEXT NOT NULL,
    open REAL NOT NULL,
    high REAL NOT NULL,
    low REAL NOT NULL,
    close REAL NOT NULL,
    volume INTEGER NOT NULL,
    UNIQUE(symbol_id, date)
);
CREATE INDEX IF NOT EXISTS idx_price_bars_date ON price_bars(date);
"#;

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    bio TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

// Instants are epoch milliseconds.
const CREATE_PREDICTIONS_TABLE: &str = r#"
CREATE TABLE predictions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    symbol_id INTEGER NOT NULL REFERENCES symbols(id) ON DELETE CASCADE,
    current_price REAL NOT NULL,
    created_at_ms INTEGER NOT NULL,
    is_locked INTEGER NOT NULL DEFAULT 0,
    locked_at_ms INTEGER
);
CREATE INDEX IF NOT EXISTS idx_predictions_user ON predictions(user_id);
CREATE INDEX IF NOT EXISTS idx_predictions_symbol ON predictions(symbol_id);
CREATE INDEX IF NOT EXISTS idx_predictions_locked ON predictions(is_locked, created_at_ms);
"#;

const CREATE_FORECASTS_TABLE: &str = r#"
CREATE TABLE forecasts (
    prediction_id INTEGER NOT NULL REFERENCES predictions(id) ON DELETE CASCADE,
    horizon_days INTEGER NOT NULL,
    predicted_price REAL NOT NULL,
    target_date_ms INTEGER NOT NULL,
    actual_price REAL,
    accuracy REAL,
    PRIMARY KEY (prediction_id, horizon_days)
);
CREATE INDEX IF NOT EXISTS idx_forecasts_target ON forecasts(target_date_ms);
"#;
