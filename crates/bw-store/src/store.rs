use std::fs;
use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use bw_core::constants::MOMENT_CAPACITY;
use bw_core::{
    BreathingMetrics, FrequencyRecommendation, Moment, Snapshot, TickReport, export_snapshot,
    now_iso8601,
};

use crate::error::{Result, StoreError};
use crate::schema;

/// One row of the session log.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionRecord {
    pub id: Uuid,
    pub source: String,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub ticks: u64,
    pub readings: u64,
}

pub struct Store {
    conn: Connection,
    moment_capacity: usize,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self {
            conn,
            moment_capacity: MOMENT_CAPACITY,
        })
    }

    /// Open `<dir>/breathwave.db`, creating the directory as needed.
    pub fn open_in_dir(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Self::open(&dir.join(crate::DB_FILE))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self {
            conn,
            moment_capacity: MOMENT_CAPACITY,
        })
    }

    /// Moments kept across the whole store; older ones are pruned on insert.
    pub fn set_moment_capacity(&mut self, capacity: usize) {
        self.moment_capacity = capacity.max(1);
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // --- Sessions ---

    pub fn begin_session(&self, source: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO sessions (id, source, started_at) VALUES (?1, ?2, ?3)",
            params![id.to_string(), source, now_iso8601()],
        )?;
        tracing::info!(session = %id, source, "session started");
        Ok(id)
    }

    pub fn end_session(&self, id: Uuid, ticks: u64) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE sessions SET ended_at = ?2, ticks = ?3 WHERE id = ?1",
            params![id.to_string(), now_iso8601(), ticks as i64],
        )?;
        if updated == 0 {
            return Err(StoreError::InvalidData(format!("unknown session {id}")));
        }
        tracing::info!(session = %id, ticks, "session ended");
        Ok(())
    }

    /// Persist the state a tick ended in.
    pub fn record_reading(&self, session: Uuid, report: &TickReport) -> Result<()> {
        let m = &report.metrics;
        let recommendation = serde_json::to_string(&report.recommendation)?;
        self.conn.execute(
            "INSERT INTO readings (session_id, timestamp_ms, rate, depth, regularity, coherence,
                                   stress_level, confidence, frequency, recommendation)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                session.to_string(),
                report.timestamp as i64,
                m.rate,
                m.depth,
                m.regularity,
                m.coherence,
                m.stress_level,
                report.confidence,
                report.recommendation.frequency,
                recommendation,
            ],
        )?;
        Ok(())
    }

    /// Append a moment and prune the log to the configured capacity.
    pub fn record_moment(&self, session: Uuid, moment: &Moment) -> Result<()> {
        let metrics = serde_json::to_string(&moment.metrics)?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO moments (session_id, timestamp_ms, coherence, tier, frequency, metrics)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session.to_string(),
                moment.timestamp as i64,
                moment.coherence,
                moment.tier,
                moment.frequency,
                metrics,
            ],
        )?;
        let pruned = tx.execute(
            "DELETE FROM moments WHERE id NOT IN
                (SELECT id FROM moments ORDER BY id DESC LIMIT ?1)",
            [self.moment_capacity as i64],
        )?;
        tx.commit()?;
        if pruned > 0 {
            tracing::debug!(pruned, "pruned memory log");
        }
        Ok(())
    }

    /// Newest first.
    pub fn list_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.id, s.source, s.started_at, s.ended_at, s.ticks,
                    (SELECT COUNT(*) FROM readings r WHERE r.session_id = s.id)
             FROM sessions s ORDER BY s.rowid DESC LIMIT ?1",
        )?;
        let rows: Vec<(String, String, String, Option<String>, i64, i64)> = stmt
            .query_map([limit as i64], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?
            .collect::<std::result::Result<_, _>>()?;

        rows.into_iter()
            .map(|(id, source, started_at, ended_at, ticks, readings)| {
                Ok(SessionRecord {
                    id: parse_uuid(&id)?,
                    source,
                    started_at,
                    ended_at,
                    ticks: ticks.max(0) as u64,
                    readings: readings.max(0) as u64,
                })
            })
            .collect()
    }

    pub fn latest_session(&self) -> Result<Option<SessionRecord>> {
        Ok(self.list_sessions(1)?.into_iter().next())
    }

    /// Most recent `limit` moments across all sessions, oldest first.
    pub fn load_moments(&self, limit: usize) -> Result<Vec<Moment>> {
        self.query_moments(
            "SELECT timestamp_ms, coherence, tier, frequency, metrics FROM
                (SELECT * FROM moments ORDER BY id DESC LIMIT ?1)
             ORDER BY id ASC",
            params![limit as i64],
        )
    }

    fn session_moments(&self, session: Uuid) -> Result<Vec<Moment>> {
        self.query_moments(
            "SELECT timestamp_ms, coherence, tier, frequency, metrics
             FROM moments WHERE session_id = ?1 ORDER BY id ASC",
            params![session.to_string()],
        )
    }

    fn query_moments(&self, sql: &str, args: impl rusqlite::Params) -> Result<Vec<Moment>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows: Vec<(i64, f64, u8, u32, String)> = stmt
            .query_map(args, |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ))
            })?
            .collect::<std::result::Result<_, _>>()?;

        rows.into_iter()
            .map(|(ts, coherence, tier, frequency, metrics)| {
                let metrics: BreathingMetrics = serde_json::from_str(&metrics)?;
                Ok(Moment {
                    timestamp: ts.max(0) as u64,
                    coherence,
                    tier,
                    metrics,
                    frequency,
                })
            })
            .collect()
    }

    /// Final state of a session: its last reading plus its moments.
    /// A session with no readings reports the initial defaults.
    pub fn session_snapshot(&self, session: Uuid) -> Result<Snapshot> {
        let last: Option<(f64, f64, f64, f64, f64, f64, String)> = self
            .conn
            .query_row(
                "SELECT rate, depth, regularity, coherence, stress_level, confidence, recommendation
                 FROM readings WHERE session_id = ?1 ORDER BY id DESC LIMIT 1",
                [session.to_string()],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                    ))
                },
            )
            .optional()?;

        let (metrics, confidence, recommendation) = match last {
            Some((rate, depth, regularity, coherence, stress_level, confidence, rec)) => {
                let recommendation: FrequencyRecommendation = serde_json::from_str(&rec)?;
                let metrics = BreathingMetrics {
                    rate,
                    depth,
                    regularity,
                    coherence,
                    stress_level,
                };
                (metrics, confidence, recommendation)
            }
            None => (
                BreathingMetrics::default(),
                0.0,
                FrequencyRecommendation::default(),
            ),
        };

        Ok(Snapshot::new(
            metrics,
            confidence,
            recommendation,
            self.session_moments(session)?,
        ))
    }

    /// Write the latest session's snapshot to `path` as JSON.
    pub fn export_latest(&self, path: &Path) -> Result<Uuid> {
        let session = self
            .latest_session()?
            .ok_or_else(|| StoreError::InvalidData("no recorded sessions".to_string()))?;
        let json = export_snapshot(&self.session_snapshot(session.id)?)?;
        fs::write(path, json)?;
        tracing::info!(session = %session.id, path = %path.display(), "snapshot exported");
        Ok(session.id)
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| StoreError::InvalidData(format!("bad UUID '{s}': {e}")))
}
