//! Wiring of configured services for the binary.

use crate::app::dispatch::Dispatcher;
use crate::app::ports::{HttpClientPort, LedgerPort, MessagingPort, TableSourcePort};
use crate::app::scan_use_case::{EligibilityPolicy, ScanUseCase};
use crate::config::{Config, MessengerKind, SourceSetting};
use crate::error::{ConfigError, Result};
use crate::infra::console_messenger::ConsoleMessenger;
use crate::infra::http_client::ReqwestHttp;
use crate::infra::sqlite_ledger::SqliteLedger;
use crate::infra::table_source::source_for;
use crate::infra::webhook_messenger::WebhookMessenger;
use crate::templating::{TemplateRenderer, DEFAULT_TEMPLATE};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct Services {
    pub source: Arc<dyn TableSourcePort>,
    pub ledger: Arc<dyn LedgerPort>,
    pub scan: ScanUseCase,
    pub timezone: Tz,
}

/// Build every collaborator named by `config`. Any failure here is fatal.
pub fn build_services(config: &Config) -> Result<Services> {
    let timezone = config.timezone()?;
    let source = build_source(config)?;
    let ledger = open_ledger(config)?;
    let messenger = build_messenger(config)?;
    let renderer = TemplateRenderer::new(load_template(config)?)?;
    let dispatcher = Dispatcher::new(messenger, renderer, config.messaging.channel.clone());

    let policy = EligibilityPolicy {
        increment: config.increment(),
        window: config.window(),
        date_format: config.policy.date_format.clone(),
    };
    let scan = ScanUseCase::new(ledger.clone(), dispatcher, policy);

    Ok(Services {
        source,
        ledger,
        scan,
        timezone,
    })
}

pub fn build_source(config: &Config) -> Result<Arc<dyn TableSourcePort>> {
    let setting = SourceSetting::load_or_init(&config.source.setting_file, &config.source.default)?;
    let http: Arc<dyn HttpClientPort> =
        Arc::new(ReqwestHttp::new(Duration::from_secs(config.messaging.timeout_secs))?);
    let source = source_for(&setting, &config.source.sheet, &config.policy.date_format, http);
    info!(source = %source.describe(), "Roster source configured");
    Ok(source)
}

pub fn open_ledger(config: &Config) -> Result<Arc<dyn LedgerPort>> {
    let ledger = SqliteLedger::open(&config.ledger.path, config.reservation_timeout())?;
    info!(path = %config.ledger.path.display(), "Ledger opened");
    Ok(Arc::new(ledger))
}

fn build_messenger(config: &Config) -> Result<Arc<dyn MessagingPort>> {
    let messaging = &config.messaging;
    match messaging.kind {
        MessengerKind::Console => Ok(Arc::new(ConsoleMessenger)),
        MessengerKind::Webhook => {
            let endpoint = messaging.webhook_endpoint()?;
            let token = match messaging.token_env.as_deref() {
                Some(var) => match std::env::var(var) {
                    Ok(token) => Some(token),
                    Err(_) => {
                        warn!(var, "Token variable not set, sending without authorization");
                        None
                    }
                },
                None => None,
            };
            let timeout = Duration::from_secs(messaging.timeout_secs);
            let messenger = WebhookMessenger::new(endpoint, token, timeout)?;
            Ok(Arc::new(messenger))
        }
    }
}

fn load_template(config: &Config) -> Result<String> {
    match &config.messaging.template_path {
        Some(path) => {
            let template = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
            info!(path = %path.display(), "Using message template override");
            Ok(template)
        }
        None => Ok(DEFAULT_TEMPLATE.to_string()),
    }
}
