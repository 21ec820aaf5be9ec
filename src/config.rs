use crate::constants;
use crate::domain::{NotificationWindow, ServiceIncrement, WindowPolicy};
use crate::error::ConfigError;
use chrono_tz::Tz;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schedule: ScheduleConfig,
    pub policy: PolicyConfig,
    pub ledger: LedgerConfig,
    pub source: SourceConfig,
    pub messaging: MessagingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_secs: u64,
    pub timezone: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub window_months: u32,
    pub window: WindowPolicy,
    pub offset_years: u32,
    pub offset_months: u32,
    pub offset_days: u32,
    pub date_format: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub path: PathBuf,
    pub reservation_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub setting_file: PathBuf,
    pub sheet: String,
    pub default: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessengerKind {
    #[default]
    Webhook,
    Console,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    pub kind: MessengerKind,
    pub endpoint: Option<String>,
    pub channel: String,
    /// Name of the environment variable holding the gateway bearer token.
    pub token_env: Option<String>,
    pub template_path: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: constants::DEFAULT_INTERVAL_SECS,
            timezone: constants::DEFAULT_TIMEZONE.to_string(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        let inc = ServiceIncrement::KGB;
        Self {
            window_months: constants::DEFAULT_WINDOW_MONTHS,
            window: WindowPolicy::default(),
            offset_years: inc.years,
            offset_months: inc.months,
            offset_days: inc.days,
            date_format: constants::ROSTER_DATE_FORMAT.to_string(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(constants::DEFAULT_LEDGER_PATH),
            reservation_timeout_secs: constants::DEFAULT_RESERVATION_TIMEOUT_SECS,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            setting_file: PathBuf::from(constants::DEFAULT_SOURCE_SETTING_FILE),
            sheet: constants::DEFAULT_SHEET.to_string(),
            default: constants::DEFAULT_SOURCE.to_string(),
        }
    }
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            kind: MessengerKind::default(),
            endpoint: None,
            channel: constants::DEFAULT_CHANNEL.to_string(),
            token_env: None,
            template_path: None,
            timeout_secs: constants::DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl MessagingConfig {
    /// Gateway endpoint; only required once a webhook messenger is actually built.
    pub fn webhook_endpoint(&self) -> Result<&str, ConfigError> {
        match self.endpoint.as_deref().map(str::trim) {
            Some(endpoint) if !endpoint.is_empty() => Ok(endpoint),
            _ => Err(ConfigError::Invalid(
                "messaging.endpoint is required when messaging.kind = \"webhook\"".into(),
            )),
        }
    }
}

impl Config {
    /// Load `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(path = %path.display(), "No config file found, using defaults");
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schedule.interval_secs == 0 {
            return Err(ConfigError::Invalid("schedule.interval_secs must be at least 1".into()));
        }
        if self.policy.window_months == 0 {
            return Err(ConfigError::Invalid("policy.window_months must be at least 1".into()));
        }
        if self.increment().is_zero() {
            return Err(ConfigError::Invalid("policy offset must not be zero".into()));
        }
        if self.ledger.reservation_timeout_secs <= self.messaging.timeout_secs {
            // Reservations must outlive the send they guard.
            return Err(ConfigError::Invalid(format!(
                "ledger.reservation_timeout_secs ({}) must exceed messaging.timeout_secs ({})",
                self.ledger.reservation_timeout_secs, self.messaging.timeout_secs
            )));
        }
        if self.policy.date_format.trim().is_empty() {
            return Err(ConfigError::Invalid("policy.date_format must not be empty".into()));
        }
        self.timezone()?;
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        let name = self.schedule.timezone.trim();
        name.parse::<Tz>().map_err(|e| ConfigError::UnknownTimezone {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn increment(&self) -> ServiceIncrement {
        ServiceIncrement {
            years: self.policy.offset_years,
            months: self.policy.offset_months,
            days: self.policy.offset_days,
        }
    }

    pub fn window(&self) -> NotificationWindow {
        NotificationWindow::new(self.policy.window, self.policy.window_months)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.schedule.interval_secs)
    }

    pub fn reservation_timeout(&self) -> chrono::Duration {
        let secs = self.ledger.reservation_timeout_secs.min(u64::from(u32::MAX));
        chrono::Duration::seconds(secs as i64)
    }
}

/// The single externally configured roster location, kept in a one-line text file.
pub struct SourceSetting;

impl SourceSetting {
    /// Read the stored source, writing `default` on first run.
    pub fn load_or_init(path: &Path, default: &str) -> Result<String, ConfigError> {
        if !path.exists() {
            Self::store(path, default)?;
            info!(path = %path.display(), "Created source setting with built-in default");
            return Ok(default.to_string());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let value = content.trim();
        if value.is_empty() {
            return Err(ConfigError::Invalid(format!("{} is empty", path.display())));
        }
        Ok(value.to_string())
    }

    pub fn store(path: &Path, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ConfigError::Invalid("source must not be empty".into()));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.display().to_string(),
                source,
            })?;
        }
        fs::write(path, format!("{value}\n")).map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const WEBHOOK: &str = "[messaging]\nendpoint = \"http://localhost:3000/send\"\n";

    #[test]
    fn test_webhook_endpoint_is_required_when_used() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.messaging.kind, MessengerKind::Webhook);
        let err = config.messaging.webhook_endpoint().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("messaging.endpoint")));

        let config = Config::from_toml(WEBHOOK).unwrap();
        assert_eq!(config.messaging.webhook_endpoint().unwrap(), "http://localhost:3000/send");
    }

    #[test]
    fn test_console_messenger_needs_no_endpoint() {
        let config = Config::from_toml("[messaging]\nkind = \"console\"\n").unwrap();
        assert_eq!(config.messaging.kind, MessengerKind::Console);
        assert_eq!(config.increment(), ServiceIncrement::KGB);
        assert_eq!(config.window(), NotificationWindow::new(WindowPolicy::Anchored, 2));
        assert_eq!(config.timezone().unwrap(), chrono_tz::Asia::Jakarta);
        assert_eq!(config.messaging.channel, constants::DEFAULT_CHANNEL);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let toml = format!("{WEBHOOK}[policy]\nwindow = \"forward\"\nwindow_months = 3\n");
        let config = Config::from_toml(&toml).unwrap();
        assert_eq!(config.window(), NotificationWindow::new(WindowPolicy::Forward, 3));
        assert_eq!(config.policy.date_format, constants::ROSTER_DATE_FORMAT);
        assert_eq!(config.schedule.interval_secs, 60);
    }

    #[test]
    fn test_unknown_timezone_is_rejected() {
        let toml = format!("{WEBHOOK}[schedule]\ntimezone = \"Mars/Olympus\"\n");
        assert!(matches!(
            Config::from_toml(&toml),
            Err(ConfigError::UnknownTimezone { name, .. }) if name == "Mars/Olympus"
        ));
    }

    #[test]
    fn test_zero_values_are_rejected() {
        for extra in [
            "[policy]\nwindow_months = 0\n",
            "[policy]\noffset_years = 0\n",
            "[schedule]\ninterval_secs = 0\n",
            "[ledger]\nreservation_timeout_secs = 0\n",
        ] {
            let toml = format!("{WEBHOOK}{extra}");
            assert!(matches!(Config::from_toml(&toml), Err(ConfigError::Invalid(_))), "{extra}");
        }
    }

    #[test]
    fn test_reservation_timeout_must_outlast_send_timeout() {
        let too_short = "[ledger]\nreservation_timeout_secs = 30\n[messaging]\ntimeout_secs = 30\n";
        assert!(matches!(
            Config::from_toml(too_short),
            Err(ConfigError::Invalid(msg)) if msg.contains("reservation_timeout_secs")
        ));

        let ok = "[ledger]\nreservation_timeout_secs = 31\n[messaging]\ntimeout_secs = 30\n";
        let config = Config::from_toml(ok).unwrap();
        assert_eq!(config.reservation_timeout(), chrono::Duration::seconds(31));
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        assert!(matches!(Config::from_toml("[policy\n"), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_source_setting_created_on_first_run() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("source.txt");

        let first = SourceSetting::load_or_init(&path, "https://example.com/export.csv").unwrap();
        assert_eq!(first, "https://example.com/export.csv");
        assert!(path.exists());

        SourceSetting::store(&path, "  data.xlsx  ").unwrap();
        let second = SourceSetting::load_or_init(&path, "ignored").unwrap();
        assert_eq!(second, "data.xlsx");
    }

    #[test]
    fn test_empty_source_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("source.txt");
        assert!(SourceSetting::store(&path, "   ").is_err());
    }
}
