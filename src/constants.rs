//! Built-in defaults used when no config file or source setting exists yet.

/// Published CSV export of the roster sheet, used until `source set` stores another one.
pub const DEFAULT_SOURCE: &str =
    "https://docs.google.com/spreadsheets/d/1aUaVK6m6NMsw0hliH-wwlqb2ayLd6CHuT8F0rIUNvyM/export?format=csv&gid=0";

/// Sheet read from local spreadsheet files.
pub const DEFAULT_SHEET: &str = "KGB";

/// WhatsApp group receiving the reminders.
pub const DEFAULT_CHANNEL: &str = "120363399863476722@g.us";

pub const DEFAULT_TIMEZONE: &str = "Asia/Jakarta";

/// Calendar format of every date column in the roster.
pub const ROSTER_DATE_FORMAT: &str = "%d-%m-%Y";

/// Long format used in the rendered message, e.g. `15 March 2025`.
pub const MESSAGE_DATE_FORMAT: &str = "%d %B %Y";

/// Date format persisted in the ledger; lexically sortable.
pub const LEDGER_DATE_FORMAT: &str = "%Y-%m-%d";

pub const DEFAULT_LEDGER_PATH: &str = "session.db";
pub const DEFAULT_SOURCE_SETTING_FILE: &str = "source.txt";
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_LOG_DIR: &str = "logs";

pub const DEFAULT_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_WINDOW_MONTHS: u32 = 2;
pub const DEFAULT_RESERVATION_TIMEOUT_SECS: u64 = 15 * 60;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_METRICS_PORT: u16 = 9898;
