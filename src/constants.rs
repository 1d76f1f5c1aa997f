//! M-Bus Protocol Constants
//!
//! Wire-layout constants used throughout the decoder, based on the
//! EN 13757-2/3 standard.

/// Start/stop marker of a long (variable length) frame
pub const FRAME_START_LONG: u8 = 0x68;

/// Start marker of a short (fixed length) frame
pub const FRAME_START_SHORT: u8 = 0x10;

/// Single character frame (acknowledgement)
pub const FRAME_SINGLE_CHAR: u8 = 0xE5;

/// Stop byte terminating short and long frames
pub const FRAME_STOP: u8 = 0x16;

/// CI field: variable data response with long header (secondary address + short header)
pub const CI_LONG_HEADER: u8 = 0x72;

/// CI field: variable data response without header
pub const CI_NO_HEADER: u8 = 0x78;

/// CI field: variable data response with short header
pub const CI_SHORT_HEADER: u8 = 0x7A;

/// DIF mask for the data field (value width/type code)
pub const DIF_MASK_DATA_FIELD: u8 = 0x0F;

/// DIF mask for the function field
pub const DIF_MASK_FUNCTION: u8 = 0x30;

/// DIF mask for storage number bit 0
pub const DIF_MASK_STORAGE_NO: u8 = 0x40;

/// DIFE mask for storage number bits
pub const DIFE_MASK_STORAGE_NO: u8 = 0x0F;

/// DIFE mask for tariff bits
pub const DIFE_MASK_TARIFF: u8 = 0x30;

/// DIFE mask for subunit bit
pub const DIFE_MASK_SUBUNIT: u8 = 0x40;

/// DIF fill byte (skipped, not a record)
pub const DIF_IDLE_FILLER: u8 = 0x2F;

/// DIF sentinel: manufacturer specific data follows
pub const DIF_MANUFACTURER_SPECIFIC: u8 = 0x0F;

/// DIF sentinel: manufacturer specific data follows, more records in next telegram
pub const DIF_MORE_RECORDS_FOLLOW: u8 = 0x1F;

/// Extension bit chaining DIB and VIB bytes
pub const EXTENSION_BIT: u8 = 0x80;

/// Mask clearing the extension bit of a VIF/VIFE
pub const VIF_WITHOUT_EXTENSION: u8 = 0x7F;

/// VIF (masked): user defined description in a length-prefixed ASCII string
pub const VIF_USER_DEFINED: u8 = 0x7C;

/// VIF: alternate extension table (table 29 of DIN EN 13757-3:2011)
pub const VIF_EXTENSION_ALTERNATE: u8 = 0xFB;

/// VIF: main extension table (table 28 of DIN EN 13757-3:2011)
pub const VIF_EXTENSION_MAIN: u8 = 0xFD;

/// A DIB holds a DIF plus at most 10 DIFEs
pub const MAX_DIB_LENGTH: usize = 11;

/// A VIB holds a VIF plus at most 10 VIFEs
pub const MAX_VIB_LENGTH: usize = 11;

/// AES block size used by the wM-Bus encryption envelope
pub const AES_BLOCK_SIZE: usize = 16;

/// Marker pair expected at the start of a correctly decrypted payload
pub const DECRYPTION_CHECK_BYTES: [u8; 2] = [0x2F, 0x2F];
