//! Error types of the telegram decoder.
//!
//! Two taxonomies exist: [`FrameError`] for data-link level problems (start
//! markers, length fields, checksums) and [`DecodingError`] for
//! application-layer problems. Both are terminal for the telegram being
//! decoded; the decoder never retries. A frame error encountered on the
//! telegram entry path is wrapped into [`DecodingError::Frame`] so callers
//! deal with a single error type.

use thiserror::Error;

use crate::address::SecondaryAddress;
use crate::wmbus::crypto::EncryptionMode;

/// Errors detected while validating the data-link frame envelope.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The first byte is none of 0xE5 / 0x10 / 0x68.
    #[error("unknown frame start byte 0x{0:02X}")]
    UnknownStartByte(u8),

    /// Fewer bytes than the frame shape requires.
    #[error("truncated frame: need at least {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },

    /// The two length bytes of a long frame differ.
    #[error("length fields differ in long frame: 0x{length1:02X} != 0x{length2:02X}")]
    LengthFieldMismatch { length1: u8, length2: u8 },

    /// The declared length does not match the buffer size.
    #[error("declared length {declared} does not match frame size (expected {actual})")]
    LengthMismatch { declared: usize, actual: usize },

    /// A required start marker repetition is missing.
    #[error("expected start marker 0x68 at offset {offset}, found 0x{byte:02X}")]
    MissingStartMarker { offset: usize, byte: u8 },

    /// The declared length of a long frame is below the 3-byte minimum.
    #[error("invalid length field 0x{0:02X} in long frame")]
    InvalidLengthField(u8),

    /// The frame does not end with the 0x16 stop byte.
    #[error("missing stop byte 0x16, found 0x{0:02X}")]
    MissingStopByte(u8),

    /// Frame checksum does not add up.
    #[error("invalid checksum: frame carries 0x{expected:02X}, calculated 0x{calculated:02X}")]
    InvalidChecksum { expected: u8, calculated: u8 },
}

/// Errors detected while decoding the application layer of a telegram.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodingError {
    /// Data-link frame validation failed.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// The CI field selects a response format this decoder does not handle.
    #[error("unable to decode telegram with CI field 0x{ci:02X}")]
    UnsupportedControlInformation { ci: u8 },

    /// CI fields 0xA0..=0xB7 carry manufacturer specific structures.
    #[error("manufacturer specific CI field 0x{ci:02X}")]
    ManufacturerSpecificCi { ci: u8 },

    /// The payload ended in the middle of a record.
    #[error("premature end of data at offset {offset}")]
    UnexpectedEndOfData { offset: usize },

    /// More than 10 DIFE bytes chained via the extension bit.
    #[error("DIB exceeds 10 extension bytes at offset {offset}")]
    OversizedDib { offset: usize },

    /// More than 10 VIFE bytes chained via the extension bit.
    #[error("VIB exceeds 10 extension bytes at offset {offset}")]
    OversizedVib { offset: usize },

    /// LVAR length byte outside the ranges defined by EN 13757-3.
    #[error("unsupported LVAR field 0x{lvar:02X} at offset {offset}")]
    UnsupportedLvar { lvar: u8, offset: usize },

    /// Data field code without a defined width (0x0F).
    #[error("unknown data field code 0x{data_field:02X} in DIF")]
    UnknownDataField { data_field: u8 },

    /// VIF types 0x7E/0xFE and 0x7F/0xFF are not supported.
    #[error("unsupported VIF 0x{vif:02X}")]
    UnsupportedVif { vif: u8 },

    /// A VIF announcing an extension table was not followed by a VIFE.
    #[error("VIF 0x{vif:02X} requires an extension byte but the VIB ends")]
    MissingVife { vif: u8 },

    /// A user defined VIF announced a string the VIB does not contain.
    #[error("user defined VIF string missing or truncated")]
    InvalidUserDefinedVif,

    /// A type F/G time point with out-of-range calendar components.
    #[error("time point with out-of-range components: {}", hex::encode(.0))]
    InvalidTimePoint(Vec<u8>),

    /// Encrypted telegram but no key registered for the secondary address.
    #[error("no AES key registered for secondary address [{0}]")]
    MissingKey(SecondaryAddress),

    /// Encrypted wM-Bus telegram without a link layer secondary address.
    #[error("encrypted payload but no link layer secondary address available")]
    MissingLinkLayerAddress,

    /// Decrypted payload does not start with 0x2F 0x2F.
    #[error("decryption unsuccessful, wrong AES key or corrupt payload")]
    WrongKeyOrCorrupt,

    /// The short header declares an encryption mode this decoder does not handle.
    #[error("unsupported encryption mode {0:?}")]
    UnsupportedEncryption(EncryptionMode),

    /// More encrypted blocks declared than bytes available.
    #[error("{blocks} encrypted blocks exceed payload size {available}")]
    EncryptedLengthExceedsPayload { blocks: u8, available: usize },
}
