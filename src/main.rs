use anyhow::{anyhow, Context};
use chrono::{NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use kgb_notifier::app::scan_use_case::{ScanMode, ScanReport};
use kgb_notifier::bootstrap::{build_services, open_ledger};
use kgb_notifier::config::{Config, SourceSetting};
use kgb_notifier::constants::{DEFAULT_CONFIG_FILE, DEFAULT_LOG_DIR, ROSTER_DATE_FORMAT};
use kgb_notifier::{logging, metrics, tasks};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "kgb_notifier")]
#[command(about = "Periodic salary-step (KGB) reminders from an employee roster")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Expose Prometheus metrics (port from KGB_METRICS_PORT)
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the roster on the configured interval until Ctrl-C
    Run,
    /// Run a single scan and print the report
    Scan {
        /// Evaluate and report without touching the ledger or sending
        #[arg(long)]
        dry_run: bool,
        /// Scan as if today were this date (DD-MM-YYYY)
        #[arg(long)]
        now: Option<String>,
    },
    /// Show or change the roster source
    Source {
        #[command(subcommand)]
        action: SourceAction,
    },
    /// Inspect the notification ledger
    Ledger {
        #[command(subcommand)]
        action: LedgerAction,
    },
}

#[derive(Subcommand)]
enum SourceAction {
    /// Print the stored source URL or path
    Show,
    /// Replace the stored source URL or path
    Set { value: String },
}

#[derive(Subcommand)]
enum LedgerAction {
    /// List every ledger entry with its state
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let _log_guard = logging::init_logging(Path::new(DEFAULT_LOG_DIR));

    let cli = Cli::parse();
    if cli.metrics {
        metrics::init_metrics();
    }

    let config = Config::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.command {
        Commands::Run => {
            let services = build_services(&config)?;
            println!(
                "🚀 Watching {} every {}s",
                services.source.describe(),
                config.schedule.interval_secs
            );
            tasks::run_scheduler(
                services.source.as_ref(),
                &services.scan,
                services.timezone,
                config.interval(),
                shutdown_signal(),
            )
            .await;
        }
        Commands::Scan { dry_run, now } => {
            let services = build_services(&config)?;
            let tz = services.timezone;
            let now = match now {
                Some(raw) => {
                    let date = NaiveDate::parse_from_str(raw.trim(), ROSTER_DATE_FORMAT)
                        .with_context(|| format!("--now expects DD-MM-YYYY, got {raw:?}"))?;
                    date.and_time(NaiveTime::MIN)
                        .and_local_timezone(tz)
                        .earliest()
                        .ok_or_else(|| anyhow!("{raw} has no midnight in {tz}"))?
                }
                None => Utc::now().with_timezone(&tz),
            };
            let mode = if dry_run { ScanMode::DryRun } else { ScanMode::Live };

            let table = services.source.fetch_table().await?;
            let report = services.scan.scan(&table, now, mode).await;
            print_report(&report, mode);
        }
        Commands::Source { action } => match action {
            SourceAction::Show => {
                let source = &config.source;
                let value = SourceSetting::load_or_init(&source.setting_file, &source.default)?;
                println!("{value}");
            }
            SourceAction::Set { value } => {
                SourceSetting::store(&config.source.setting_file, &value)?;
                info!(source = %value.trim(), "Source updated");
                println!("✅ Source set to {}", value.trim());
            }
        },
        Commands::Ledger { action } => match action {
            LedgerAction::List => {
                let ledger = open_ledger(&config)?;
                let entries = ledger.entries()?;
                if entries.is_empty() {
                    println!("Ledger is empty");
                }
                for entry in entries {
                    let sent = entry
                        .sent_at
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{}\t{}\t{}\t{}\treserved {}\tsent {}",
                        entry.nip,
                        entry.base_date.format(ROSTER_DATE_FORMAT),
                        entry.derived_date.format(ROSTER_DATE_FORMAT),
                        entry.state.as_str(),
                        entry.reserved_at.to_rfc3339(),
                        sent
                    );
                }
            }
        },
    }
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => {
            error!("Failed to listen for Ctrl-C, running until killed: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

fn print_report(report: &ScanReport, mode: ScanMode) {
    println!("\n📊 Scan Results:");
    if let Some(today) = report.today {
        println!("   Date: {}", today.format(ROSTER_DATE_FORMAT));
    }
    println!("   Rows: {}", report.total_rows);
    println!("   Skipped: {}", report.skipped);
    println!("   Outside window: {}", report.ineligible);
    println!("   Already notified: {}", report.already_notified);
    match mode {
        ScanMode::Live => println!("   Dispatched: {}", report.dispatched.len()),
        ScanMode::DryRun => println!("   Would notify: {}", report.pending.len()),
    }
    println!("   Deferred: {}", report.deferred);

    for event in report.dispatched.iter().chain(&report.pending) {
        println!(
            "   • NIP {}  {} → {}",
            event.nip,
            event.base_date.format(ROSTER_DATE_FORMAT),
            event.derived_date.format(ROSTER_DATE_FORMAT)
        );
    }
    if !report.errors.is_empty() {
        println!("\n⚠️  Errors encountered:");
        for error in &report.errors {
            println!("   - {}", error);
        }
    }
}
