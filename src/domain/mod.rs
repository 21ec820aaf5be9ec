//! Domain value types for one roster scan.
//!
//! Everything here is transient: records and events are rebuilt from the
//! source table on every scan and only the ledger persists anything.

pub mod event;
pub mod record;
pub mod window;

pub use event::{NotificationEvent, ServiceIncrement};
pub use record::{Column, RosterRecord, Table};
pub use window::{NotificationWindow, WindowPolicy};
