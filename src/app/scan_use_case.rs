use crate::app::dispatch::Dispatcher;
use crate::app::ports::{LedgerPort, Reserved};
use crate::domain::{NotificationEvent, NotificationWindow, RosterRecord, ServiceIncrement, Table};
use crate::error::{LedgerError, SkipReason};
use crate::metrics::ScanMetrics;
use crate::normalize::{normalize, HeaderIndex};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, trace, warn};

/// Rules deciding which rows become reminders.
#[derive(Debug, Clone)]
pub struct EligibilityPolicy {
    pub increment: ServiceIncrement,
    pub window: NotificationWindow,
    pub date_format: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Reserve, send and commit.
    Live,
    /// Evaluate only; the ledger is read but never written and nothing is sent.
    DryRun,
}

/// Result of one full pass over the roster
#[derive(Debug, Default, Serialize)]
pub struct ScanReport {
    pub today: Option<NaiveDate>,
    pub total_rows: usize,
    pub non_data_rows: usize,
    pub skipped: usize,
    pub ineligible: usize,
    pub already_notified: usize,
    pub dispatched: Vec<NotificationEvent>,
    /// Eligible and not yet notified, reported by dry runs.
    pub pending: Vec<NotificationEvent>,
    /// Eligible but deferred to the next scan (ledger or dispatch failure).
    pub deferred: usize,
    pub errors: Vec<String>,
}

impl ScanReport {
    fn record(&mut self, outcome: RowOutcome) {
        match outcome {
            RowOutcome::NotDataRow => self.non_data_rows += 1,
            RowOutcome::Skipped(reason) => {
                self.skipped += 1;
                self.errors.push(reason.to_string());
            }
            RowOutcome::Ineligible => self.ineligible += 1,
            RowOutcome::AlreadyNotified => self.already_notified += 1,
            RowOutcome::WouldNotify(event) => self.pending.push(event),
            RowOutcome::Dispatched(event) => self.dispatched.push(event),
            RowOutcome::Deferred(message) => {
                self.deferred += 1;
                self.errors.push(message);
            }
        }
    }
}

enum RowOutcome {
    NotDataRow,
    Skipped(SkipReason),
    Ineligible,
    AlreadyNotified,
    WouldNotify(NotificationEvent),
    Dispatched(NotificationEvent),
    Deferred(String),
}

/// The scan entry point: normalize, derive, evaluate, reserve, send, commit.
///
/// Delivery is at-least-once with a bounded duplicate window: an event is
/// reserved before sending, committed after a successful send and released
/// after a failed one. A reservation orphaned by a crash becomes reclaimable
/// once the ledger's reservation timeout passes.
pub struct ScanUseCase {
    ledger: Arc<dyn LedgerPort>,
    dispatcher: Dispatcher,
    policy: EligibilityPolicy,
}

impl ScanUseCase {
    pub fn new(
        ledger: Arc<dyn LedgerPort>,
        dispatcher: Dispatcher,
        policy: EligibilityPolicy,
    ) -> Self {
        Self {
            ledger,
            dispatcher,
            policy,
        }
    }

    /// Process every row of `table` in source order.
    ///
    /// `now` fixes both the calendar day used for window checks and the
    /// ledger timestamps for the whole scan.
    #[instrument(skip_all, fields(today = %now.date_naive(), mode = ?mode))]
    pub async fn scan(&self, table: &Table, now: DateTime<Tz>, mode: ScanMode) -> ScanReport {
        let started = std::time::Instant::now();
        let today = now.date_naive();
        let now_utc = now.with_timezone(&Utc);
        let index = HeaderIndex::new(&table.header);

        let missing = index.missing_columns();
        if !missing.is_empty() {
            warn!(?missing, "Roster header lacks some columns; their values will be empty");
        }

        let mut report = ScanReport {
            today: Some(today),
            total_rows: table.rows.len(),
            ..ScanReport::default()
        };
        for row in &table.rows {
            let outcome = self.process_row(row, &index, today, now_utc, mode).await;
            report.record(outcome);
        }

        ScanMetrics::record_scan(started.elapsed().as_secs_f64());
        info!(
            rows = report.total_rows,
            skipped = report.skipped,
            ineligible = report.ineligible,
            already_notified = report.already_notified,
            dispatched = report.dispatched.len(),
            pending = report.pending.len(),
            deferred = report.deferred,
            "Scan finished"
        );
        report
    }

    async fn process_row(
        &self,
        row: &[String],
        index: &HeaderIndex,
        today: NaiveDate,
        now: DateTime<Utc>,
        mode: ScanMode,
    ) -> RowOutcome {
        let record = match normalize(row, index, &self.policy.date_format) {
            Ok(Some(record)) => record,
            Ok(None) => {
                trace!("Skipping non-data row");
                return RowOutcome::NotDataRow;
            }
            Err(reason) => return skipped(reason),
        };

        let increment = self.policy.increment;
        let Some(event) = NotificationEvent::derive(&record.nip, record.base_date, increment) else {
            return skipped(SkipReason::DateOverflow {
                nip: record.nip.clone(),
                base: record.base_date,
            });
        };

        if !self.policy.window.is_eligible(today, event.derived_date) {
            trace!(
                nip = %record.nip,
                tmt_baru = %event.derived_date,
                "Outside notification window"
            );
            return RowOutcome::Ineligible;
        }
        ScanMetrics::record_eligible();

        match mode {
            ScanMode::DryRun => match self.ledger.already_notified(&event) {
                Ok(true) => RowOutcome::AlreadyNotified,
                Ok(false) => {
                    info!(
                        no = %record.no(),
                        nip = %record.nip,
                        tmt_baru = %event.derived_date,
                        "Would notify"
                    );
                    RowOutcome::WouldNotify(event)
                }
                Err(e) => ledger_failure(&event, e),
            },
            ScanMode::Live => self.notify(&record, event, now).await,
        }
    }

    async fn notify(
        &self,
        record: &RosterRecord,
        event: NotificationEvent,
        now: DateTime<Utc>,
    ) -> RowOutcome {
        match self.ledger.reserve(&event, now) {
            Ok(Reserved::Fresh) => {}
            Ok(Reserved::Reclaimed) => {
                warn!(
                    nip = %event.nip,
                    tmt_baru = %event.derived_date,
                    "Retrying event left reserved by an interrupted attempt"
                );
            }
            Err(LedgerError::AlreadyReserved) => {
                debug!(no = %record.no(), nip = %event.nip, "Already notified");
                return RowOutcome::AlreadyNotified;
            }
            Err(e) => return ledger_failure(&event, e),
        }

        if let Err(e) = self.dispatcher.send(record, &event).await {
            ScanMetrics::record_dispatch_failure();
            error!(no = %record.no(), nip = %event.nip, "Failed to send notification: {}", e);
            if let Err(release_err) = self.ledger.release(&event) {
                ScanMetrics::record_ledger_error();
                error!(
                    nip = %event.nip,
                    "Failed to release reservation, retry waits for timeout: {}", release_err
                );
            }
            return RowOutcome::Deferred(format!("dispatch failed for NIP {}: {}", event.nip, e));
        }

        ScanMetrics::record_sent();
        if let Err(e) = self.ledger.commit(&event, now) {
            // The message went out; an uncommitted reservation may be reclaimed and re-sent later.
            ScanMetrics::record_ledger_error();
            error!(nip = %event.nip, "Notification sent but ledger commit failed: {}", e);
        }
        info!(
            no = %record.no(),
            nip = %event.nip,
            tmt_lama = %event.base_date,
            tmt_baru = %event.derived_date,
            "Notification sent"
        );
        RowOutcome::Dispatched(event)
    }
}

fn skipped(reason: SkipReason) -> RowOutcome {
    ScanMetrics::record_row_skipped();
    match &reason {
        SkipReason::MissingIdentity { .. } | SkipReason::MissingBaseDate { .. } => {
            warn!("Row skipped: {}", reason)
        }
        SkipReason::InvalidBaseDate { .. } | SkipReason::DateOverflow { .. } => {
            error!("Row skipped: {}", reason)
        }
    }
    RowOutcome::Skipped(reason)
}

fn ledger_failure(event: &NotificationEvent, e: LedgerError) -> RowOutcome {
    ScanMetrics::record_ledger_error();
    error!(nip = %event.nip, "Ledger unavailable, deferring to next scan: {}", e);
    RowOutcome::Deferred(format!("ledger error for NIP {}: {}", event.nip, e))
}
