//! Wireless M-Bus: the application frame entry point and the secure
//! payload layer shared with wired telegrams.

pub mod crypto;
pub mod frame;

pub use frame::WMBusMessage;
