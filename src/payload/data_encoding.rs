//! # M-Bus Data Encoding and Decoding
//!
//! Primitive value codecs shared by the record decoder: little-endian
//! two's-complement integers of the odd M-Bus widths, packed BCD, the two
//! incompatible date encodings (type G date, type F date and time) and
//! reversed ASCII strings.

use chrono::{NaiveDate, NaiveDateTime};
use nom::number::complete::{le_f32, le_i16, le_i32, le_i64};
use serde::Serialize;
use std::fmt;

use crate::error::DecodingError;

/// A packed BCD number as found on the wire: two digits per byte, least
/// significant byte first. Nibbles above 9 are not rejected (meters use 0xF
/// as a fill digit); they render as uppercase hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bcd {
    bytes: Vec<u8>,
}

impl Bcd {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Bcd {
            bytes: bytes.to_vec(),
        }
    }

    /// The raw wire bytes, least significant first.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Numeric value, treating every nibble as a decimal digit. Out-of-range
    /// nibbles contribute their face value times the decimal place, which
    /// matches how meters abuse the encoding. Variable-length BCD fields go
    /// up to 18 bytes (36 digits); values past the `i64` range saturate at
    /// `i64::MAX`.
    pub fn to_i64(&self) -> i64 {
        let mut value = 0i128;
        let mut factor = 1i128;
        for byte in &self.bytes {
            value = value.saturating_add(i128::from(byte & 0x0F).saturating_mul(factor));
            factor = factor.saturating_mul(10);
            value = value.saturating_add(i128::from((byte >> 4) & 0x0F).saturating_mul(factor));
            factor = factor.saturating_mul(10);
        }
        i64::try_from(value).unwrap_or(i64::MAX)
    }

    /// Digit string, most significant digit first.
    pub fn digits(&self) -> String {
        let mut out = String::with_capacity(self.bytes.len() * 2);
        for byte in self.bytes.iter().rev() {
            for nibble in [(byte >> 4) & 0x0F, byte & 0x0F] {
                out.push(
                    char::from_digit(u32::from(nibble), 16)
                        .unwrap_or('?')
                        .to_ascii_uppercase(),
                );
            }
        }
        out
    }
}

impl fmt::Display for Bcd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.digits())
    }
}

/// Encodes a digit string into packed BCD wire bytes (LSB first). Returns
/// `None` for odd-length or non-hex-digit input. Used by callers
/// constructing selection telegrams.
pub fn encode_bcd(digits: &str) -> Option<Vec<u8>> {
    if digits.len() % 2 != 0 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let mut out = Vec::with_capacity(digits.len() / 2);
    let bytes = digits.as_bytes();
    for pair in bytes.chunks_exact(2).rev() {
        let hi = (pair[0] as char).to_digit(16).unwrap_or(0) as u8;
        let lo = (pair[1] as char).to_digit(16).unwrap_or(0) as u8;
        out.push((hi << 4) | lo);
    }
    Some(out)
}

/// Decodes a little-endian two's-complement integer of 1, 2, 3, 4, 6 or 8
/// bytes. The 3- and 6-byte widths have no native type; they are sign
/// extended from the top bit of their highest byte.
pub fn decode_int(data: &[u8]) -> Result<i64, DecodingError> {
    let truncated = |_| DecodingError::UnexpectedEndOfData { offset: 0 };
    match data.len() {
        1 => Ok(i64::from(data[0] as i8)),
        2 => {
            let (_, v) = le_i16::<_, nom::error::Error<&[u8]>>(data).map_err(truncated)?;
            Ok(i64::from(v))
        }
        3 => Ok(sign_extend_le(data)),
        4 => {
            let (_, v) = le_i32::<_, nom::error::Error<&[u8]>>(data).map_err(truncated)?;
            Ok(i64::from(v))
        }
        6 => Ok(sign_extend_le(data)),
        8 => {
            let (_, v) = le_i64::<_, nom::error::Error<&[u8]>>(data).map_err(truncated)?;
            Ok(v)
        }
        _ => Err(DecodingError::UnknownDataField {
            data_field: data.len() as u8,
        }),
    }
}

fn sign_extend_le(data: &[u8]) -> i64 {
    let mut value = 0u64;
    for (i, byte) in data.iter().enumerate() {
        value |= u64::from(*byte) << (8 * i);
    }
    let bits = data.len() * 8;
    if data[data.len() - 1] & 0x80 != 0 {
        value |= u64::MAX << bits;
    }
    value as i64
}

/// Decodes a little-endian unsigned integer of up to 8 bytes.
pub fn decode_le_unsigned(data: &[u8]) -> u64 {
    let mut value = 0u64;
    for (i, byte) in data.iter().enumerate().take(8) {
        value |= u64::from(*byte) << (8 * i);
    }
    value
}

/// Decodes a 32-bit IEEE real (data field 0x05), little-endian like every
/// other M-Bus data field.
pub fn decode_real(data: &[u8]) -> Result<f64, DecodingError> {
    let (_, v) = le_f32::<_, nom::error::Error<&[u8]>>(data)
        .map_err(|_| DecodingError::UnexpectedEndOfData { offset: 0 })?;
    Ok(f64::from(v))
}

/// Decodes a type G (CP16) date: day in bits 0-4 of the first byte, month in
/// bits 0-3 of the second, year split over the remaining bits, epoch 2000.
///
/// An all-ones field is the EN 13757-3 "not set" marker and yields `None`.
pub fn decode_type_g(data: &[u8]) -> Result<Option<NaiveDate>, DecodingError> {
    if data == [0xFF, 0xFF] {
        return Ok(None);
    }
    let day = u32::from(data[0] & 0x1F);
    let month = u32::from(data[1] & 0x0F);
    let year = 2000 + i32::from((data[0] & 0xE0) >> 5) + i32::from((data[1] & 0xF0) >> 1);
    NaiveDate::from_ymd_opt(year, month, day)
        .map(Some)
        .ok_or_else(|| DecodingError::InvalidTimePoint(data.to_vec()))
}

/// Decodes a type F (CP32) date and time. The century nibble of 0 is read as
/// 1 (epoch 1900, so years land in 2000+ for current meters).
///
/// An all-ones field is the "not set" marker and yields `None`.
pub fn decode_type_f(data: &[u8]) -> Result<Option<NaiveDateTime>, DecodingError> {
    if data == [0xFF, 0xFF, 0xFF, 0xFF] {
        return Ok(None);
    }
    let minute = u32::from(data[0] & 0x3F);
    let hour = u32::from(data[1] & 0x1F);
    let day = u32::from(data[2] & 0x1F);
    let month = u32::from(data[3] & 0x0F);
    let year1 = i32::from((data[2] & 0xE0) >> 5);
    let year2 = i32::from((data[3] & 0xF0) >> 1);
    let mut century = i32::from((data[1] & 0x60) >> 5);
    if century == 0 {
        century = 1;
    }
    let year = 1900 + 100 * century + year1 + year2;
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .map(Some)
        .ok_or_else(|| DecodingError::InvalidTimePoint(data.to_vec()))
}

/// Decodes a string data field. M-Bus transmits text with the most
/// significant character last, so the bytes are reversed. Bytes are taken as
/// Latin-1 to never fail on vendor quirks.
pub fn decode_text_reversed(data: &[u8]) -> String {
    data.iter().rev().map(|&b| b as char).collect()
}
