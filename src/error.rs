use thiserror::Error;

/// Why a roster row was excluded from eligibility processing.
#[derive(Error, Debug)]
pub enum SkipReason {
    #[error("missing NIP for row No {no:?}")]
    MissingIdentity { no: String },

    #[error("missing TMT KGB lama for NIP {nip}")]
    MissingBaseDate { nip: String },

    #[error("invalid TMT KGB lama {value:?} for NIP {nip}: {source}")]
    InvalidBaseDate {
        nip: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("TMT KGB lama {base} for NIP {nip} cannot be advanced by the service increment")]
    DateOverflow { nip: String, base: chrono::NaiveDate },
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("source returned status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet reading failed: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("sheet {sheet:?} not found in {path}")]
    MissingSheet { path: String, sheet: String },

    #[error("source table is empty")]
    EmptyTable,

    #[error("roster reader task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("event already reserved or notified")]
    AlreadyReserved,

    #[error("event has no pending reservation")]
    NotReserved,

    #[error("ledger storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger row is corrupt: {0}")]
    Corrupt(String),

    #[error("ledger lock poisoned")]
    Poisoned,
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("messaging gateway returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("template rendering failed: {0}")]
    Template(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unknown timezone {name:?}: {reason}")]
    UnknownTimezone { name: String, reason: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum KgbError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, KgbError>;
