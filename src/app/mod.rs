pub mod dispatch;
pub mod ports;
pub mod scan_use_case;
