//! # Data Record Scanning and Decoding
//!
//! Splits a variable data payload into raw records (DIB, VIB, data slice)
//! and decodes each one into a typed [`DataRecord`]. Scanning is a plain
//! cursor over the payload; nothing is copied until a record is decoded.

use serde::Serialize;
use std::fmt;

use super::data_encoding::{
    decode_int, decode_le_unsigned, decode_real, decode_text_reversed, decode_type_f,
    decode_type_g, Bcd,
};
use super::vif::{decode_vib, Description, Unit};
use crate::constants::{
    DIFE_MASK_STORAGE_NO, DIFE_MASK_SUBUNIT, DIFE_MASK_TARIFF, DIF_IDLE_FILLER,
    DIF_MASK_DATA_FIELD, DIF_MASK_FUNCTION, DIF_MASK_STORAGE_NO, DIF_MANUFACTURER_SPECIFIC,
    DIF_MORE_RECORDS_FOLLOW, EXTENSION_BIT, MAX_DIB_LENGTH, MAX_VIB_LENGTH, VIF_USER_DEFINED,
    VIF_WITHOUT_EXTENSION,
};
use crate::error::DecodingError;

/// Function field of a record: which of the device's registers the value
/// comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FunctionField {
    Instantaneous,
    Maximum,
    Minimum,
    Error,
}

/// A decoded calendar value, either a type G date or a type F date-time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum TimePoint {
    Date(chrono::NaiveDate),
    DateTime(chrono::NaiveDateTime),
}

/// A decoded record value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    /// No data attached (selection records, "not set" time points).
    None,
    Integer(i64),
    Real(f64),
    Text(String),
    Timestamp(TimePoint),
    Bcd(Bcd),
}

/// A record as sliced out of the payload, before any value decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord<'a> {
    /// DIF plus extension bytes.
    pub dib: &'a [u8],
    /// VIF, any user-defined description block, and extension bytes.
    pub vib: &'a [u8],
    pub data: &'a [u8],
    /// The length byte of a variable-length record, if there was one.
    pub lvar: Option<u8>,
    /// Byte offset of the DIF within the payload.
    pub offset: usize,
}

/// Iterator over the raw records of a payload. Yields records until the
/// input is exhausted or a manufacturer-data sentinel DIF terminates the
/// scan; any remaining bytes and the "more records follow" flag are then
/// available on the iterator itself.
pub struct RawRecords<'a> {
    input: &'a [u8],
    pos: usize,
    done: bool,
    manufacturer_data: Option<&'a [u8]>,
    more_records_follow: bool,
}

impl<'a> RawRecords<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        RawRecords {
            input,
            pos: 0,
            done: false,
            manufacturer_data: None,
            more_records_follow: false,
        }
    }

    /// Bytes after a manufacturer-data sentinel, once scanning finished.
    pub fn manufacturer_data(&self) -> Option<&'a [u8]> {
        self.manufacturer_data
    }

    /// True when the sentinel was `0x1F` and the device holds further
    /// records for a follow-up request.
    pub fn more_records_follow(&self) -> bool {
        self.more_records_follow
    }

    fn byte_at(&self, pos: usize) -> Result<u8, DecodingError> {
        self.input
            .get(pos)
            .copied()
            .ok_or(DecodingError::UnexpectedEndOfData { offset: pos })
    }

    fn scan_next(&mut self) -> Result<Option<RawRecord<'a>>, DecodingError> {
        while self.pos < self.input.len() && self.input[self.pos] == DIF_IDLE_FILLER {
            self.pos += 1;
        }
        let Some(&dif) = self.input.get(self.pos) else {
            return Ok(None);
        };
        if dif == DIF_MANUFACTURER_SPECIFIC || dif == DIF_MORE_RECORDS_FOLLOW {
            self.manufacturer_data = Some(&self.input[self.pos + 1..]);
            self.more_records_follow = dif == DIF_MORE_RECORDS_FOLLOW;
            return Ok(None);
        }
        let start = self.pos;

        let mut dib_len = 1;
        while self.byte_at(start + dib_len - 1)? & EXTENSION_BIT != 0 {
            dib_len += 1;
            if dib_len > MAX_DIB_LENGTH {
                return Err(DecodingError::OversizedDib { offset: start });
            }
        }
        let dib = &self.input[start..start + dib_len];
        self.pos = start + dib_len;

        let vib_start = self.pos;
        let vif = self.byte_at(self.pos)?;
        self.pos += 1;
        if vif & VIF_WITHOUT_EXTENSION == VIF_USER_DEFINED {
            let text_len = self.byte_at(self.pos)? as usize;
            if self.pos + 1 + text_len > self.input.len() {
                return Err(DecodingError::UnexpectedEndOfData { offset: self.pos });
            }
            self.pos += 1 + text_len;
        }
        let mut vib_count = 1;
        let mut last = vif;
        while last & EXTENSION_BIT != 0 {
            last = self.byte_at(self.pos)?;
            self.pos += 1;
            vib_count += 1;
            if vib_count > MAX_VIB_LENGTH {
                return Err(DecodingError::OversizedVib { offset: vib_start });
            }
        }
        let vib = &self.input[vib_start..self.pos];

        let (data_len, lvar) = match dif & DIF_MASK_DATA_FIELD {
            0x0D => {
                let lvar = self.byte_at(self.pos)?;
                self.pos += 1;
                (lvar_data_length(lvar, self.pos - 1)?, Some(lvar))
            }
            field => (fixed_data_length(field)?, None),
        };
        if self.pos + data_len > self.input.len() {
            return Err(DecodingError::UnexpectedEndOfData { offset: self.pos });
        }
        let data = &self.input[self.pos..self.pos + data_len];
        self.pos += data_len;

        Ok(Some(RawRecord {
            dib,
            vib,
            data,
            lvar,
            offset: start,
        }))
    }
}

impl<'a> Iterator for RawRecords<'a> {
    type Item = Result<RawRecord<'a>, DecodingError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.scan_next() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn fixed_data_length(field: u8) -> Result<usize, DecodingError> {
    Ok(match field {
        0x00 | 0x08 => 0,
        0x01 => 1,
        0x02 => 2,
        0x03 => 3,
        0x04 | 0x05 => 4,
        0x06 => 6,
        0x07 => 8,
        0x09 => 1,
        0x0A => 2,
        0x0B => 3,
        0x0C => 4,
        0x0E => 6,
        data_field => return Err(DecodingError::UnknownDataField { data_field }),
    })
}

fn lvar_data_length(lvar: u8, offset: usize) -> Result<usize, DecodingError> {
    Ok(match lvar {
        0x00..=0xBF => usize::from(lvar),
        0xC0..=0xC9 => 2 * usize::from(lvar - 0xC0),
        0xD0..=0xD9 => 2 * usize::from(lvar - 0xD0),
        0xE0..=0xEF => usize::from(lvar - 0xE0),
        0xF8 => 4,
        _ => return Err(DecodingError::UnsupportedLvar { lvar, offset }),
    })
}

/// A fully decoded data record. The original DIB, VIB and data bytes are
/// kept alongside the derived fields for diagnostic display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataRecord {
    /// DIF plus extension bytes, as read off the wire.
    pub dib: Vec<u8>,
    /// VIF, any user-defined description block, and extension bytes.
    pub vib: Vec<u8>,
    /// Raw data field bytes, length byte of variable-length records excluded.
    pub data: Vec<u8>,
    pub function: FunctionField,
    pub storage_number: u64,
    pub tariff: u32,
    pub subunit: u16,
    pub description: Description,
    /// Set when the VIF was user-defined (0x7C); `description` is then
    /// [`Description::UserDefined`].
    pub user_defined_description: Option<String>,
    pub unit: Option<Unit>,
    /// Decimal exponent to apply to `value`.
    pub exponent: i32,
    pub value: Value,
}

impl DataRecord {
    /// Decodes a raw record: DIB accumulation, VIB lookup, value decoding.
    pub fn decode(raw: &RawRecord<'_>) -> Result<Self, DecodingError> {
        let dif = raw.dib[0];
        let function = match (dif & DIF_MASK_FUNCTION) >> 4 {
            0 => FunctionField::Instantaneous,
            1 => FunctionField::Maximum,
            2 => FunctionField::Minimum,
            _ => FunctionField::Error,
        };
        let mut storage_number = u64::from((dif & DIF_MASK_STORAGE_NO) >> 6);
        let mut tariff = 0u32;
        let mut subunit = 0u16;
        for (i, dife) in raw.dib[1..].iter().enumerate() {
            subunit |= u16::from((dife & DIFE_MASK_SUBUNIT) >> 6) << i;
            tariff |= u32::from((dife & DIFE_MASK_TARIFF) >> 4) << (2 * i);
            storage_number |= u64::from(dife & DIFE_MASK_STORAGE_NO) << (4 * i + 1);
        }

        let info = decode_vib(raw.vib)?;
        let value = decode_value(dif & DIF_MASK_DATA_FIELD, raw, info.description)?;

        Ok(DataRecord {
            dib: raw.dib.to_vec(),
            vib: raw.vib.to_vec(),
            data: raw.data.to_vec(),
            function,
            storage_number,
            tariff,
            subunit,
            description: info.description,
            user_defined_description: info.user_defined,
            unit: info.unit,
            exponent: info.exponent,
            value,
        })
    }

    /// Numeric value with the decimal exponent applied, when the value is
    /// numeric at all.
    pub fn scaled_value(&self) -> Option<f64> {
        let base = match &self.value {
            Value::Integer(i) => *i as f64,
            Value::Bcd(b) => b.to_i64() as f64,
            Value::Real(r) => *r,
            _ => return None,
        };
        Some(base * 10f64.powi(self.exponent))
    }
}

fn decode_value(
    data_field: u8,
    raw: &RawRecord<'_>,
    description: Description,
) -> Result<Value, DecodingError> {
    if description == Description::Date && raw.data.len() == 2 {
        return Ok(match decode_type_g(raw.data)? {
            Some(date) => Value::Timestamp(TimePoint::Date(date)),
            None => Value::None,
        });
    }
    if description == Description::DateTime && raw.data.len() == 4 {
        return Ok(match decode_type_f(raw.data)? {
            Some(dt) => Value::Timestamp(TimePoint::DateTime(dt)),
            None => Value::None,
        });
    }
    if let Some(lvar) = raw.lvar {
        return Ok(decode_lvar_value(lvar, raw.data));
    }
    match data_field {
        0x00 | 0x08 => Ok(Value::None),
        0x01 | 0x02 | 0x03 | 0x04 | 0x06 | 0x07 => Ok(Value::Integer(decode_int(raw.data)?)),
        0x05 => Ok(Value::Real(decode_real(raw.data)?)),
        0x09..=0x0C | 0x0E => Ok(Value::Bcd(Bcd::from_bytes(raw.data))),
        data_field => Err(DecodingError::UnknownDataField { data_field }),
    }
}

fn decode_lvar_value(lvar: u8, data: &[u8]) -> Value {
    match lvar {
        0x00..=0xBF => Value::Text(decode_text_reversed(data)),
        0xC0..=0xD9 => Value::Bcd(Bcd::from_bytes(data)),
        _ => {
            if data.len() <= 8 {
                Value::Integer(decode_le_unsigned(data) as i64)
            } else {
                Value::Text(hex::encode_upper(data))
            }
        }
    }
}

impl fmt::Display for DataRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DIB:{} VIB:{} {:?} {:?} (storage {}, tariff {}, subunit {}): ",
            hex::encode_upper(&self.dib),
            hex::encode_upper(&self.vib),
            self.function,
            self.description,
            self.storage_number,
            self.tariff,
            self.subunit
        )?;
        match &self.value {
            Value::None => write!(f, "none")?,
            Value::Integer(i) => write!(f, "{}", i)?,
            Value::Real(r) => write!(f, "{}", r)?,
            Value::Text(t) => write!(f, "{:?}", t)?,
            Value::Timestamp(TimePoint::Date(d)) => write!(f, "{}", d)?,
            Value::Timestamp(TimePoint::DateTime(dt)) => write!(f, "{}", dt)?,
            Value::Bcd(b) => write!(f, "{}", b)?,
        }
        if self.exponent != 0 {
            write!(f, " * 10^{}", self.exponent)?;
        }
        if let Some(unit) = self.unit {
            write!(f, " {}", unit)?;
        }
        Ok(())
    }
}
