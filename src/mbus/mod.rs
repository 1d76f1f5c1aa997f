//! Wired M-Bus: the EN 13757-2 data-link frame layer.

pub mod frame;

pub use frame::Frame;
