pub mod console_messenger;
pub mod http_client;
pub mod memory_ledger;
pub mod quote_sanitizer;
pub mod sqlite_ledger;
pub mod table_source;
pub mod webhook_messenger;
