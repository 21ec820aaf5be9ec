use crate::app::ports::{LedgerEntry, LedgerPort, LedgerState, Reserved};
use crate::constants::LEDGER_DATE_FORMAT;
use crate::domain::NotificationEvent;
use crate::error::LedgerError;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Notification ledger in a local SQLite file.
///
/// The composite primary key is the uniqueness guarantee; every transition is
/// one conditional statement so several processes may share the file.
pub struct SqliteLedger {
    conn: Mutex<Connection>,
    reservation_timeout: Duration,
}

impl SqliteLedger {
    pub fn open<P: AsRef<Path>>(
        path: P,
        reservation_timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn, reservation_timeout)
    }

    pub fn open_in_memory(reservation_timeout: Duration) -> Result<Self, LedgerError> {
        Self::init(Connection::open_in_memory()?, reservation_timeout)
    }

    fn init(conn: Connection, reservation_timeout: Duration) -> Result<Self, LedgerError> {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            CREATE TABLE IF NOT EXISTS kgb_ledger (
                nip          TEXT    NOT NULL,
                tmt_lama     TEXT    NOT NULL,
                tmt_baru     TEXT    NOT NULL,
                state        TEXT    NOT NULL CHECK (state IN ('sending', 'sent')),
                reserved_at  INTEGER NOT NULL,
                sent_at      INTEGER,
                PRIMARY KEY (nip, tmt_lama, tmt_baru)
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            reservation_timeout,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, LedgerError> {
        self.conn.lock().map_err(|_| LedgerError::Poisoned)
    }
}

fn key(event: &NotificationEvent) -> (String, String, String) {
    (
        event.nip.clone(),
        event.base_date.format(LEDGER_DATE_FORMAT).to_string(),
        event.derived_date.format(LEDGER_DATE_FORMAT).to_string(),
    )
}

fn parse_date(value: &str) -> Result<NaiveDate, LedgerError> {
    NaiveDate::parse_from_str(value, LEDGER_DATE_FORMAT)
        .map_err(|e| LedgerError::Corrupt(format!("date {value:?}: {e}")))
}

fn parse_ts(value: i64) -> Result<DateTime<Utc>, LedgerError> {
    DateTime::<Utc>::from_timestamp(value, 0)
        .ok_or_else(|| LedgerError::Corrupt(format!("timestamp {value}")))
}

impl LedgerPort for SqliteLedger {
    fn already_notified(&self, event: &NotificationEvent) -> Result<bool, LedgerError> {
        let (nip, lama, baru) = key(event);
        let conn = self.lock()?;
        let found: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM kgb_ledger
              WHERE nip = ?1 AND tmt_lama = ?2 AND tmt_baru = ?3 AND state = 'sent')",
            params![nip, lama, baru],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    fn reserve(
        &self,
        event: &NotificationEvent,
        now: DateTime<Utc>,
    ) -> Result<Reserved, LedgerError> {
        let (nip, lama, baru) = key(event);
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT INTO kgb_ledger (nip, tmt_lama, tmt_baru, state, reserved_at)
             VALUES (?1, ?2, ?3, 'sending', ?4)
             ON CONFLICT(nip, tmt_lama, tmt_baru) DO NOTHING",
            params![nip, lama, baru, now.timestamp()],
        )?;
        if inserted == 1 {
            return Ok(Reserved::Fresh);
        }

        // A stale `sending` row means a previous attempt died mid-dispatch.
        let cutoff = (now - self.reservation_timeout).timestamp();
        let reclaimed = conn.execute(
            "UPDATE kgb_ledger SET reserved_at = ?4
              WHERE nip = ?1 AND tmt_lama = ?2 AND tmt_baru = ?3
                AND state = 'sending' AND reserved_at <= ?5",
            params![nip, lama, baru, now.timestamp(), cutoff],
        )?;
        if reclaimed == 1 {
            debug!(nip = %event.nip, "Reclaimed stale reservation");
            Ok(Reserved::Reclaimed)
        } else {
            Err(LedgerError::AlreadyReserved)
        }
    }

    fn commit(&self, event: &NotificationEvent, now: DateTime<Utc>) -> Result<(), LedgerError> {
        let (nip, lama, baru) = key(event);
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE kgb_ledger SET state = 'sent', sent_at = ?4
              WHERE nip = ?1 AND tmt_lama = ?2 AND tmt_baru = ?3 AND state = 'sending'",
            params![nip, lama, baru, now.timestamp()],
        )?;
        if updated == 1 {
            Ok(())
        } else {
            Err(LedgerError::NotReserved)
        }
    }

    fn release(&self, event: &NotificationEvent) -> Result<(), LedgerError> {
        let (nip, lama, baru) = key(event);
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM kgb_ledger
              WHERE nip = ?1 AND tmt_lama = ?2 AND tmt_baru = ?3 AND state = 'sending'",
            params![nip, lama, baru],
        )?;
        Ok(())
    }

    fn entries(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT nip, tmt_lama, tmt_baru, state, reserved_at, sent_at
               FROM kgb_ledger ORDER BY reserved_at, nip",
        )?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let state: String = row.get(3)?;
            let sent_at: Option<i64> = row.get(5)?;
            out.push(LedgerEntry {
                nip: row.get(0)?,
                base_date: parse_date(&row.get::<_, String>(1)?)?,
                derived_date: parse_date(&row.get::<_, String>(2)?)?,
                state: LedgerState::parse(&state)
                    .ok_or_else(|| LedgerError::Corrupt(format!("state {state:?}")))?,
                reserved_at: parse_ts(row.get(4)?)?,
                sent_at: sent_at.map(parse_ts).transpose()?,
            });
        }
        Ok(out)
    }
}
