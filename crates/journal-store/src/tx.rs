use std::cell::Cell;
use std::sync::MutexGuard;
use std::thread::sleep;
use std::time::Duration;

use rusqlite::{Connection, ErrorCode};

use crate::error::{Result, StoreError};

/// `BEGIN IMMEDIATE` retry schedule for `SQLITE_BUSY`/`SQLITE_LOCKED` (spec
/// §7 "Retries"). A blocking sleep is fine here: `begin()` already holds the
/// process-wide `Mutex<Connection>`, so nothing else can make progress
/// while we wait regardless.
const BEGIN_RETRY_BACKOFF_MS: [u64; 3] = [10, 40, 160];

/// One request's worth of mutations. Manual `BEGIN`/`COMMIT`/`ROLLBACK`
/// control rather than `rusqlite::Transaction` — the latter borrows the
/// `Connection` it wraps, which doesn't fit holding the `MutexGuard` and the
/// transaction in the same value across an async handler. Dropping a `Tx`
/// that was neither committed nor rolled back rolls back (best effort —
/// errors from the implicit rollback are swallowed, matching the semantics
/// of an ordinary Rust panic unwinding through an open transaction).
pub struct Tx<'a> {
    conn: MutexGuard<'a, Connection>,
    done: Cell<bool>,
}

impl<'a> Tx<'a> {
    pub(crate) fn begin(conn: MutexGuard<'a, Connection>) -> Result<Self> {
        let mut attempt = 0usize;
        loop {
            match conn.execute_batch("BEGIN IMMEDIATE") {
                Ok(()) => {
                    return Ok(Self {
                        conn,
                        done: Cell::new(false),
                    })
                }
                Err(e) if is_busy(&e) && attempt < BEGIN_RETRY_BACKOFF_MS.len() => {
                    sleep(Duration::from_millis(BEGIN_RETRY_BACKOFF_MS[attempt]));
                    attempt += 1;
                }
                Err(e) => return Err(StoreError::from(e)),
            }
        }
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn commit(self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        self.done.set(true);
        Ok(())
    }

    pub fn rollback(self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK")?;
        self.done.set(true);
        Ok(())
    }

    /// Run `f` inside a named savepoint; on error the savepoint (and only
    /// its writes) rolls back while the enclosing transaction continues.
    /// Used by tool handlers so one tool's failure doesn't abort the
    /// whole turn.
    ///
    /// Generic over the caller's error type (each crate boundary has its
    /// own, all `impl From<rusqlite::Error>`) rather than fixed to
    /// `StoreError`, since callers above `journal-store` run tool handlers
    /// that fail with their own error enums.
    pub fn savepoint<T, E: From<rusqlite::Error>>(
        &self,
        name: &str,
        f: impl FnOnce(&Connection) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E> {
        self.conn.execute_batch(&format!("SAVEPOINT {name}"))?;
        match f(&self.conn) {
            Ok(v) => {
                self.conn.execute_batch(&format!("RELEASE {name}"))?;
                Ok(v)
            }
            Err(e) => {
                self.conn
                    .execute_batch(&format!("ROLLBACK TO {name}; RELEASE {name}"))?;
                Err(e)
            }
        }
    }
}

impl Drop for Tx<'_> {
    fn drop(&mut self) {
        if !self.done.get() {
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}

fn is_busy(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if matches!(err.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}
