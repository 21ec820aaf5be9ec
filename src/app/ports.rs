use crate::domain::{NotificationEvent, Table};
use crate::error::{DispatchError, LedgerError, SourceError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

// Ingest-side ports
#[async_trait]
pub trait HttpClientPort: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpGetResult, SourceError>;
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Yields the roster as a header row plus data rows.
#[async_trait]
pub trait TableSourcePort: Send + Sync {
    async fn fetch_table(&self) -> Result<Table, SourceError>;

    /// Human-readable location for log lines.
    fn describe(&self) -> String;
}

// Ledger port

/// How a reservation was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reserved {
    /// No entry existed for the event.
    Fresh,
    /// A `sending` entry had outlived the reservation timeout and was taken over.
    Reclaimed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerState {
    Sending,
    Sent,
}

impl LedgerState {
    pub fn as_str(self) -> &'static str {
        match self {
            LedgerState::Sending => "sending",
            LedgerState::Sent => "sent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sending" => Some(LedgerState::Sending),
            "sent" => Some(LedgerState::Sent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub nip: String,
    pub base_date: NaiveDate,
    pub derived_date: NaiveDate,
    pub state: LedgerState,
    pub reserved_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

/// Durable exactly-once bookkeeping keyed by (nip, base date, derived date).
///
/// Every transition must be a single atomic statement against storage so
/// that concurrent scanners cannot both win a reservation.
pub trait LedgerPort: Send + Sync {
    /// True iff the event has been delivered (`sent`).
    fn already_notified(&self, event: &NotificationEvent) -> Result<bool, LedgerError>;

    /// Insert a `sending` entry if none exists. `Err(AlreadyReserved)` means do not send.
    fn reserve(
        &self,
        event: &NotificationEvent,
        now: DateTime<Utc>,
    ) -> Result<Reserved, LedgerError>;

    /// Mark a reserved event as delivered. Never reverted.
    fn commit(&self, event: &NotificationEvent, now: DateTime<Utc>) -> Result<(), LedgerError>;

    /// Drop a `sending` entry after a failed dispatch so the next scan retries.
    fn release(&self, event: &NotificationEvent) -> Result<(), LedgerError>;

    fn entries(&self) -> Result<Vec<LedgerEntry>, LedgerError>;
}

// Delivery port
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_text(&self, channel: &str, text: &str) -> Result<(), DispatchError>;

    /// Human-readable name for this channel (e.g., "webhook", "console").
    fn channel_name(&self) -> &str;
}
