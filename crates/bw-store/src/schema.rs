use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;

    // In-memory databases reject this; that is fine.
    if conn
        .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
        .is_ok()
    {
        tracing::info!("startup WAL checkpoint complete");
    }

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id         TEXT PRIMARY KEY,
            source     TEXT NOT NULL,
            started_at TEXT NOT NULL,
            ended_at   TEXT,
            ticks      INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS readings (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id     TEXT NOT NULL REFERENCES sessions(id),
            timestamp_ms   INTEGER NOT NULL,
            rate           REAL NOT NULL,
            depth          REAL NOT NULL,
            regularity     REAL NOT NULL,
            coherence      REAL NOT NULL,
            stress_level   REAL NOT NULL,
            confidence     REAL NOT NULL,
            frequency      INTEGER NOT NULL,
            recommendation TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS moments (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id   TEXT NOT NULL REFERENCES sessions(id),
            timestamp_ms INTEGER NOT NULL,
            coherence    REAL NOT NULL,
            tier         INTEGER NOT NULL,
            frequency    INTEGER NOT NULL,
            metrics      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_readings_session ON readings(session_id);
        CREATE INDEX IF NOT EXISTS idx_moments_session ON moments(session_id);
        ",
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}
