use crate::app::ports::TableSourcePort;
use crate::app::scan_use_case::{ScanMode, ScanReport, ScanUseCase};
use crate::error::SourceError;
use crate::metrics::ScanMetrics;
use chrono::Utc;
use chrono_tz::Tz;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// One scheduler tick: fetch the roster and run a live scan.
///
/// A fetch failure abandons the whole tick; nothing is evaluated against a
/// partial table.
pub async fn run_tick(
    source: &dyn TableSourcePort,
    scan: &ScanUseCase,
    tz: Tz,
) -> Result<ScanReport, SourceError> {
    let table = match source.fetch_table().await {
        Ok(table) => table,
        Err(e) => {
            ScanMetrics::record_scan_failure();
            error!(source = %source.describe(), "Failed to fetch roster: {}", e);
            return Err(e);
        }
    };
    let now = Utc::now().with_timezone(&tz);
    Ok(scan.scan(&table, now, ScanMode::Live).await)
}

/// Run a scan every `interval` until `shutdown` resolves.
///
/// Ticks are sequential; a scan that outlasts the interval delays the next
/// tick instead of overlapping it. Shutdown is only observed between ticks,
/// so a message in flight is always committed or released before exit.
pub async fn run_scheduler<F>(
    source: &dyn TableSourcePort,
    scan: &ScanUseCase,
    tz: Tz,
    interval: Duration,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(source = %source.describe(), interval_secs = interval.as_secs(), "Scheduler started");

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                let _ = run_tick(source, scan, tz).await;
            }
        }
    }
    info!("Scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::dispatch::Dispatcher;
    use crate::app::ports::{LedgerPort, LedgerState, MessagingPort};
    use crate::app::scan_use_case::EligibilityPolicy;
    use crate::domain::{NotificationWindow, ServiceIncrement, Table};
    use crate::error::DispatchError;
    use crate::infra::memory_ledger::InMemoryLedger;
    use crate::templating::TemplateRenderer;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl TableSourcePort for CountingSource {
        async fn fetch_table(&self) -> Result<Table, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SourceError::Status {
                    url: "http://roster".into(),
                    status: 500,
                });
            }
            Table::from_rows(vec![vec!["NO".into(), "NAMA".into(), "NIP".into()]])
        }

        fn describe(&self) -> String {
            "counting".into()
        }
    }

    struct SilentMessenger;

    #[async_trait]
    impl MessagingPort for SilentMessenger {
        async fn send_text(&self, _channel: &str, _text: &str) -> Result<(), DispatchError> {
            Ok(())
        }

        fn channel_name(&self) -> &str {
            "silent"
        }
    }

    /// Counts a delivery as soon as the gateway accepts it, then stalls.
    struct SlowMessenger {
        delivered: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl MessagingPort for SlowMessenger {
        async fn send_text(&self, _channel: &str, _text: &str) -> Result<(), DispatchError> {
            self.delivered.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(())
        }

        fn channel_name(&self) -> &str {
            "slow"
        }
    }

    struct FixedSource(Table);

    #[async_trait]
    impl TableSourcePort for FixedSource {
        async fn fetch_table(&self) -> Result<Table, SourceError> {
            Ok(self.0.clone())
        }

        fn describe(&self) -> String {
            "fixed".into()
        }
    }

    fn scan() -> ScanUseCase {
        scan_with(Arc::new(InMemoryLedger::default()), Arc::new(SilentMessenger))
    }

    fn scan_with(ledger: Arc<dyn LedgerPort>, messenger: Arc<dyn MessagingPort>) -> ScanUseCase {
        ScanUseCase::new(
            ledger,
            Dispatcher::new(messenger, TemplateRenderer::default(), "group"),
            EligibilityPolicy {
                increment: ServiceIncrement::KGB,
                window: NotificationWindow::default(),
                date_format: "%d-%m-%Y".into(),
            },
        )
    }

    #[tokio::test]
    async fn test_tick_propagates_fetch_failure() {
        let source = CountingSource {
            calls: AtomicUsize::new(0),
            fail: true,
        };
        let result = run_tick(&source, &scan(), chrono_tz::Asia::Jakarta).await;
        assert!(matches!(result, Err(SourceError::Status { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_scheduler_stops_on_shutdown() {
        let source = CountingSource {
            calls: AtomicUsize::new(0),
            fail: false,
        };
        let scan = scan();
        let shutdown = tokio::time::sleep(Duration::from_millis(120));
        let every = Duration::from_millis(20);
        let run = run_scheduler(&source, &scan, chrono_tz::Asia::Jakarta, every, shutdown);
        tokio::time::timeout(Duration::from_secs(5), run).await.unwrap();
        // The first tick fires immediately, later ones every 20ms.
        assert!(source.calls.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_scheduler_keeps_running_after_failed_tick() {
        let source = CountingSource {
            calls: AtomicUsize::new(0),
            fail: true,
        };
        let scan = scan();
        let shutdown = tokio::time::sleep(Duration::from_millis(100));
        let every = Duration::from_millis(10);
        run_scheduler(&source, &scan, chrono_tz::Asia::Jakarta, every, shutdown).await;
        assert!(source.calls.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_shutdown_during_send_lets_the_tick_finish() {
        let tz = chrono_tz::Asia::Jakarta;
        let event_date = Utc::now().with_timezone(&tz).date_naive() + chrono::Days::new(10);
        let base = event_date.checked_sub_months(chrono::Months::new(24)).unwrap();
        let table = Table::from_rows(vec![
            vec!["NO".into(), "NAMA".into(), "NIP".into(), "TMT KGB LAMA/PANGKAT".into()],
            vec!["1".into(), "Aminah".into(), "1987".into(), base.format("%d-%m-%Y").to_string()],
        ])
        .unwrap();
        let source = FixedSource(table.clone());
        let ledger: Arc<dyn LedgerPort> = Arc::new(InMemoryLedger::default());
        let messenger = Arc::new(SlowMessenger {
            delivered: AtomicUsize::new(0),
            delay: Duration::from_millis(500),
        });
        let scan = scan_with(ledger.clone(), messenger.clone());

        let shutdown = tokio::time::sleep(Duration::from_millis(100));
        run_scheduler(&source, &scan, tz, Duration::from_secs(60), shutdown).await;

        assert_eq!(messenger.delivered.load(Ordering::SeqCst), 1);
        let entries = ledger.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].state, LedgerState::Sent);

        // Past the reservation timeout nothing is reclaimed or re-sent.
        let later = (Utc::now() + chrono::Duration::minutes(16)).with_timezone(&tz);
        let report = scan.scan(&table, later, ScanMode::Live).await;
        assert!(report.dispatched.is_empty());
        assert_eq!(report.already_notified, 1);
        assert_eq!(messenger.delivered.load(Ordering::SeqCst), 1);
    }
}
