//! Outbound tracking of issued signals and source health.
//!
//! Recording is best-effort: implementations log and swallow their own
//! errors so a broken store never reaches the signal path.

use crate::types::{SignalRecord, SourceStatus};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info};

/// Sink for signal tracking rows and heartbeat snapshots.
///
/// Methods are synchronous; callers run them on a blocking task.
pub trait SignalRecorder: Send + Sync {
    fn record_signal(&self, record: &SignalRecord);

    fn record_status(&self, _instance_id: &str, _statuses: &[SourceStatus]) {}
}

/// Recorder that only writes log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRecorder;

impl SignalRecorder for LogRecorder {
    fn record_signal(&self, record: &SignalRecord) {
        info!(
            "Signal {}: {} {} {}% @ {} via {}",
            record.signal_id,
            record.asset,
            record.direction,
            record.confidence,
            record.entry_time,
            record.broker.as_deref().unwrap_or("AUTO")
        );
    }

    fn record_status(&self, instance_id: &str, statuses: &[SourceStatus]) {
        for status in statuses {
            debug!(
                "[{}] {} ({}) {}{}",
                instance_id,
                status.name,
                status.kind,
                status.status_label(),
                if status.preferred { " preferred" } else { "" }
            );
        }
    }
}

/// SQLite-backed recorder.
pub struct SqliteRecorder {
    conn: Mutex<Connection>,
}

impl SqliteRecorder {
    /// Open (or create) the tracking database at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        let recorder = Self {
            conn: Mutex::new(conn),
        };
        recorder.init_schema()?;
        info!("SQLite signal recorder initialized");
        Ok(recorder)
    }

    /// Create an in-memory recorder (for testing).
    pub fn new_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        let recorder = Self {
            conn: Mutex::new(conn),
        };
        recorder.init_schema()?;
        debug!("In-memory SQLite recorder initialized");
        Ok(recorder)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn init_schema(&self) -> Result<(), rusqlite::Error> {
        let conn = self.conn();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS signal_tracking (
                signal_id TEXT PRIMARY KEY,
                asset TEXT NOT NULL,
                broker TEXT,
                direction TEXT NOT NULL,
                confidence INTEGER NOT NULL,
                entry_time TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_signal_tracking_asset ON signal_tracking(asset)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS source_status (
                source TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                details TEXT,
                last_heartbeat INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    /// Number of tracked signals.
    pub fn signal_count(&self) -> usize {
        self.conn()
            .query_row("SELECT COUNT(*) FROM signal_tracking", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| n as usize)
            .unwrap_or(0)
    }

    /// Direction and confidence stored for `signal_id`.
    pub fn tracked_signal(&self, signal_id: &str) -> Option<(String, u8)> {
        let result = self.conn().query_row(
            "SELECT direction, confidence FROM signal_tracking WHERE signal_id = ?1",
            params![signal_id],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u8)),
        );

        match result {
            Ok(row) => Some(row),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => {
                error!("Error reading signal {}: {}", signal_id, e);
                None
            }
        }
    }

    /// Last reported status label for a source.
    pub fn source_status(&self, source: &str) -> Option<String> {
        self.conn()
            .query_row(
                "SELECT status FROM source_status WHERE source = ?1",
                params![source],
                |row| row.get(0),
            )
            .ok()
    }
}

impl SignalRecorder for SqliteRecorder {
    fn record_signal(&self, record: &SignalRecord) {
        let result = self.conn().execute(
            "INSERT OR REPLACE INTO signal_tracking
             (signal_id, asset, broker, direction, confidence, entry_time, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.signal_id,
                record.asset,
                record.broker,
                record.direction.to_string(),
                record.confidence as i64,
                record.entry_time.to_string(),
                chrono::Utc::now().timestamp(),
            ],
        );

        if let Err(e) = result {
            error!("Failed to record signal {}: {}", record.signal_id, e);
        }
    }

    fn record_status(&self, instance_id: &str, statuses: &[SourceStatus]) {
        let now = chrono::Utc::now().timestamp();
        let conn = self.conn();
        for status in statuses {
            let details = format!(
                "instance={} kind={} preferred={}",
                instance_id, status.kind, status.preferred
            );
            let result = conn.execute(
                "INSERT OR REPLACE INTO source_status (source, status, details, last_heartbeat)
                 VALUES (?1, ?2, ?3, ?4)",
                params![status.name, status.status_label(), details, now],
            );
            if let Err(e) = result {
                error!("Failed to record status for {}: {}", status.name, e);
            }
        }
    }
}
