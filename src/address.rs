//! # Secondary Addressing
//!
//! The 8-byte secondary address (device id, manufacturer, version, device
//! type) as carried by the long header of wired telegrams and by the link
//! layer of wireless telegrams. The two transport the same fields in a
//! different byte order; both constructors preserve the original wire bytes
//! so an address can be hashed and compared exactly as received.

use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::DecodingError;
use crate::payload::data_encoding::Bcd;

/// Device type from the secondary address (EN 13757-3 table of medium
/// codes). Unlisted codes map to `Reserved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceType {
    Other,
    Oil,
    Electricity,
    Gas,
    Heat,
    Steam,
    WarmWater,
    Water,
    HeatCostAllocator,
    CompressedAir,
    CoolingLoadMeterOutlet,
    CoolingLoadMeterInlet,
    HeatInlet,
    HeatCoolingLoadMeter,
    BusSystemComponent,
    UnknownMedium,
    ColdWater,
    DualRegisterWaterMeter,
    Pressure,
    AdConverter,
    SmokeDetector,
    RoomSensor,
    GasDetector,
    Breaker,
    Valve,
    CustomerUnit,
    WasteWaterMeter,
    Garbage,
    RadioConverterSystemSide,
    RadioConverterMeterSide,
    Reserved,
}

impl DeviceType {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x00 => DeviceType::Other,
            0x01 => DeviceType::Oil,
            0x02 => DeviceType::Electricity,
            0x03 => DeviceType::Gas,
            0x04 => DeviceType::Heat,
            0x05 => DeviceType::Steam,
            0x06 => DeviceType::WarmWater,
            0x07 => DeviceType::Water,
            0x08 => DeviceType::HeatCostAllocator,
            0x09 => DeviceType::CompressedAir,
            0x0A => DeviceType::CoolingLoadMeterOutlet,
            0x0B => DeviceType::CoolingLoadMeterInlet,
            0x0C => DeviceType::HeatInlet,
            0x0D => DeviceType::HeatCoolingLoadMeter,
            0x0E => DeviceType::BusSystemComponent,
            0x0F => DeviceType::UnknownMedium,
            0x15 => DeviceType::WarmWater,
            0x16 => DeviceType::ColdWater,
            0x17 => DeviceType::DualRegisterWaterMeter,
            0x18 => DeviceType::Pressure,
            0x19 => DeviceType::AdConverter,
            0x1A => DeviceType::SmokeDetector,
            0x1B => DeviceType::RoomSensor,
            0x1C => DeviceType::GasDetector,
            0x20 => DeviceType::Breaker,
            0x21 => DeviceType::Valve,
            0x25 => DeviceType::CustomerUnit,
            0x28 => DeviceType::WasteWaterMeter,
            0x29 => DeviceType::Garbage,
            0x36 => DeviceType::RadioConverterSystemSide,
            0x37 => DeviceType::RadioConverterMeterSide,
            _ => DeviceType::Reserved,
        }
    }
}

/// Decodes the 2-byte manufacturer id into its three-letter FLAG code: three
/// 5-bit fields, each an offset from 'A' - 1.
pub fn decode_manufacturer(id: u16) -> String {
    let mut out = String::with_capacity(3);
    out.push((((id >> 10) & 0x1F) as u8 + 64) as char);
    out.push((((id >> 5) & 0x1F) as u8 + 64) as char);
    out.push(((id & 0x1F) as u8 + 64) as char);
    out
}

/// Encodes a three-letter FLAG code back into the 2-byte manufacturer id.
/// Returns `None` unless the code is exactly three uppercase letters.
pub fn encode_manufacturer(code: &str) -> Option<u16> {
    let bytes = code.as_bytes();
    if bytes.len() != 3 || !bytes.iter().all(|b| b.is_ascii_uppercase()) {
        return None;
    }
    Some(
        (u16::from(bytes[0] - 64) << 10) | (u16::from(bytes[1] - 64) << 5)
            | u16::from(bytes[2] - 64),
    )
}

/// The secondary address of a meter. Identity (equality, hashing) is defined
/// over the original wire bytes, so addresses parsed from different headers
/// of the same device compare equal while a corrupted id byte does not.
#[derive(Debug, Clone, Serialize)]
pub struct SecondaryAddress {
    bytes: [u8; 8],
    device_id: Bcd,
    manufacturer_id: u16,
    version: u8,
    device_type: DeviceType,
}

impl PartialEq for SecondaryAddress {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for SecondaryAddress {}

impl Hash for SecondaryAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl SecondaryAddress {
    /// Parses the address as laid out in the long header of a wired
    /// telegram: device id (4 bytes BCD, LSB first), manufacturer (2 bytes
    /// LE), version, device type.
    pub fn from_long_header(data: &[u8]) -> Result<Self, DecodingError> {
        if data.len() < 8 {
            return Err(DecodingError::UnexpectedEndOfData { offset: 0 });
        }
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&data[..8]);
        Ok(SecondaryAddress {
            bytes,
            device_id: Bcd::from_bytes(&data[..4]),
            manufacturer_id: u16::from(data[4]) | (u16::from(data[5]) << 8),
            version: data[6],
            device_type: DeviceType::from_code(data[7]),
        })
    }

    /// Parses the address as laid out in the wireless link layer:
    /// manufacturer (2 bytes LE) first, then device id, version, device
    /// type.
    pub fn from_link_layer(data: &[u8]) -> Result<Self, DecodingError> {
        if data.len() < 8 {
            return Err(DecodingError::UnexpectedEndOfData { offset: 0 });
        }
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&data[..8]);
        Ok(SecondaryAddress {
            bytes,
            device_id: Bcd::from_bytes(&data[2..6]),
            manufacturer_id: u16::from(data[0]) | (u16::from(data[1]) << 8),
            version: data[6],
            device_type: DeviceType::from_code(data[7]),
        })
    }

    /// The address bytes exactly as received. Also the per-device half of
    /// the AES initialization vector.
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.bytes
    }

    pub fn device_id(&self) -> &Bcd {
        &self.device_id
    }

    pub fn manufacturer_id(&self) -> u16 {
        self.manufacturer_id
    }

    pub fn manufacturer(&self) -> String {
        decode_manufacturer(self.manufacturer_id)
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }
}

impl fmt::Display for SecondaryAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id {} manufacturer {} version {} type {:?}",
            self.device_id,
            self.manufacturer(),
            self.version,
            self.device_type
        )
    }
}
