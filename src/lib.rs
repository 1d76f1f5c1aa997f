//! # mbus-telegram
//!
//! Decoder for M-Bus (Meter-Bus, EN 13757) telegrams, wired and wireless,
//! from the data-link frame envelope down to typed data records.
//!
//! The layers mirror the standard:
//! - [`mbus::frame`] validates the wired frame envelope (start markers,
//!   length fields, checksum) and yields the application payload.
//! - [`wmbus::frame`] does the same for a wireless application frame as a
//!   radio driver delivers it, CRC blocks already stripped.
//! - [`payload::variable_data`] dispatches on the CI field, runs the secure
//!   payload layer for encrypted telegrams and assembles the records.
//! - [`payload::record`], [`payload::vif`] and [`payload::data_encoding`]
//!   turn DIB/VIB chains and raw data fields into quantities, units,
//!   exponents and values.
//!
//! ## Example
//!
//! ```
//! use mbus_telegram::{decode_telegram, KeyStore, Value};
//!
//! // RSP_UD long frame with one BCD on-time record
//! let telegram = [
//!     0x68, 0x09, 0x09, 0x68, 0x08, 0x00, 0x78,
//!     0x0C, 0x22, 0x22, 0x37, 0x00, 0x00,
//!     0x07, 0x16,
//! ];
//! let data = decode_telegram(&telegram, &KeyStore::new()).unwrap();
//! assert_eq!(data.records.len(), 1);
//! match &data.records[0].value {
//!     Value::Bcd(hours) => assert_eq!(hours.to_i64(), 3722),
//!     other => panic!("unexpected value {:?}", other),
//! }
//! ```
//!
//! Encrypted telegrams (security mode 5) need the meter's AES key
//! registered in the [`KeyStore`] under its secondary address:
//!
//! ```ignore
//! let mut keys = KeyStore::new();
//! keys.insert(address, [0x00; 16]);
//! let message = decode_wmbus(&frame_bytes, &keys)?;
//! ```

pub mod address;
pub mod constants;
pub mod error;
pub mod mbus;
pub mod payload;
pub mod wmbus;

pub use address::{DeviceType, SecondaryAddress};
pub use error::{DecodingError, FrameError};
pub use mbus::frame::Frame;
pub use payload::data_encoding::Bcd;
pub use payload::record::{DataRecord, FunctionField, RawRecord, RawRecords, TimePoint, Value};
pub use payload::variable_data::{
    KeyStore, ShortHeader, StatusFlags, VariableDataStructure,
};
pub use payload::vif::{Description, Unit, VibInfo};
pub use wmbus::crypto::EncryptionMode;
pub use wmbus::frame::WMBusMessage;

/// Decodes a wired telegram: frame envelope and checksum first, then the
/// variable data structure of the payload. The buffer must hold exactly one
/// RSP_UD long frame.
pub fn decode_telegram(
    buffer: &[u8],
    keys: &KeyStore,
) -> Result<VariableDataStructure, DecodingError> {
    let frame = Frame::parse(buffer)?;
    frame.verify_checksum(buffer)?;
    VariableDataStructure::decode(frame.payload(), None, keys)
}

/// Decodes a wireless application frame, looking up AES keys by the link
/// layer address.
pub fn decode_wmbus(buffer: &[u8], keys: &KeyStore) -> Result<WMBusMessage, DecodingError> {
    WMBusMessage::decode(buffer, keys)
}
