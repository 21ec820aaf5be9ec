use crate::app::ports::{LedgerEntry, LedgerPort, LedgerState, Reserved};
use crate::domain::NotificationEvent;
use crate::error::LedgerError;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// In-memory ledger for development/testing. Same transitions as the SQLite one,
/// made atomic by holding the map lock for the whole check-and-set.
pub struct InMemoryLedger {
    entries: Arc<Mutex<HashMap<NotificationEvent, LedgerEntry>>>,
    reservation_timeout: Duration,
}

impl InMemoryLedger {
    pub fn new(reservation_timeout: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            reservation_timeout,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<NotificationEvent, LedgerEntry>>, LedgerError> {
        self.entries.lock().map_err(|_| LedgerError::Poisoned)
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new(Duration::seconds(crate::constants::DEFAULT_RESERVATION_TIMEOUT_SECS as i64))
    }
}

impl LedgerPort for InMemoryLedger {
    fn already_notified(&self, event: &NotificationEvent) -> Result<bool, LedgerError> {
        let entries = self.lock()?;
        Ok(entries.get(event).is_some_and(|e| e.state == LedgerState::Sent))
    }

    fn reserve(
        &self,
        event: &NotificationEvent,
        now: DateTime<Utc>,
    ) -> Result<Reserved, LedgerError> {
        let mut entries = self.lock()?;
        match entries.get_mut(event) {
            None => {
                entries.insert(
                    event.clone(),
                    LedgerEntry {
                        nip: event.nip.clone(),
                        base_date: event.base_date,
                        derived_date: event.derived_date,
                        state: LedgerState::Sending,
                        reserved_at: now,
                        sent_at: None,
                    },
                );
                Ok(Reserved::Fresh)
            }
            Some(entry)
                if entry.state == LedgerState::Sending
                    && entry.reserved_at <= now - self.reservation_timeout =>
            {
                entry.reserved_at = now;
                debug!(nip = %event.nip, "Reclaimed stale reservation");
                Ok(Reserved::Reclaimed)
            }
            Some(_) => Err(LedgerError::AlreadyReserved),
        }
    }

    fn commit(&self, event: &NotificationEvent, now: DateTime<Utc>) -> Result<(), LedgerError> {
        let mut entries = self.lock()?;
        match entries.get_mut(event) {
            Some(entry) if entry.state == LedgerState::Sending => {
                entry.state = LedgerState::Sent;
                entry.sent_at = Some(now);
                Ok(())
            }
            _ => Err(LedgerError::NotReserved),
        }
    }

    fn release(&self, event: &NotificationEvent) -> Result<(), LedgerError> {
        let mut entries = self.lock()?;
        if entries.get(event).is_some_and(|e| e.state == LedgerState::Sending) {
            entries.remove(event);
        }
        Ok(())
    }

    fn entries(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        let entries = self.lock()?;
        let mut out: Vec<LedgerEntry> = entries.values().cloned().collect();
        out.sort_by(|a, b| a.reserved_at.cmp(&b.reserved_at).then_with(|| a.nip.cmp(&b.nip)));
        Ok(out)
    }
}
