//! # VIF Decoding
//!
//! Turns a value information block (the VIF byte, optional extension table
//! byte and any trailing combinable VIFEs) into a physical quantity, unit
//! and decimal exponent. Codes outside the supported tables decode to
//! [`Description::NotSupported`] rather than failing the record, which is
//! how real multi-vendor buses have to be read.

use serde::Serialize;
use std::fmt;

use super::vif_tables::{self, UnitSpec, VifEntry};
use crate::constants::{
    VIF_EXTENSION_ALTERNATE, VIF_EXTENSION_MAIN, VIF_USER_DEFINED, VIF_WITHOUT_EXTENSION,
};
use crate::error::DecodingError;

const VIF_EXTENSION_ALTERNATE_MASKED: u8 = VIF_EXTENSION_ALTERNATE & VIF_WITHOUT_EXTENSION;
const VIF_EXTENSION_MAIN_MASKED: u8 = VIF_EXTENSION_MAIN & VIF_WITHOUT_EXTENSION;

/// The physical or administrative quantity a record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Description {
    Energy,
    Volume,
    Mass,
    OnTime,
    OperatingTime,
    Power,
    VolumeFlow,
    VolumeFlowExt,
    MassFlow,
    FlowTemperature,
    ReturnTemperature,
    TemperatureDifference,
    ExternalTemperature,
    Pressure,
    Date,
    DateTime,
    Hca,
    AveragingDuration,
    ActualityDuration,
    FabricationNo,
    ExtendedIdentification,
    Address,
    Voltage,
    Current,
    OperatingTimeBattery,
    ParameterSetId,
    ModelVersion,
    HardwareVersion,
    FirmwareVersion,
    Customer,
    ErrorFlags,
    ReactiveEnergy,
    ReactivePower,
    RelativeHumidity,
    Frequency,
    Phase,
    TemperatureLimit,
    MaxPower,
    UserDefined,
    Reserved,
    NotSupported,
}

/// Units of measurement, displayed with their conventional symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Unit {
    WattHour,
    Joule,
    CubicMetre,
    Kilogram,
    Second,
    Minute,
    Hour,
    Day,
    Month,
    Year,
    Watt,
    JoulePerHour,
    CubicMetrePerHour,
    CubicMetrePerMinute,
    CubicMetrePerSecond,
    KilogramPerHour,
    DegreeCelsius,
    Kelvin,
    Bar,
    Volt,
    Ampere,
    VarHour,
    Var,
    CalorificValue,
    CubicFeet,
    UsGallon,
    UsGallonPerMinute,
    UsGallonPerHour,
    Degree,
    Hertz,
    DegreeFahrenheit,
    Percent,
    Reserved,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Unit::WattHour => "Wh",
            Unit::Joule => "J",
            Unit::CubicMetre => "m^3",
            Unit::Kilogram => "kg",
            Unit::Second => "s",
            Unit::Minute => "min",
            Unit::Hour => "h",
            Unit::Day => "d",
            Unit::Month => "mo",
            Unit::Year => "a",
            Unit::Watt => "W",
            Unit::JoulePerHour => "J/h",
            Unit::CubicMetrePerHour => "m^3/h",
            Unit::CubicMetrePerMinute => "m^3/min",
            Unit::CubicMetrePerSecond => "m^3/s",
            Unit::KilogramPerHour => "kg/h",
            Unit::DegreeCelsius => "°C",
            Unit::Kelvin => "K",
            Unit::Bar => "bar",
            Unit::Volt => "V",
            Unit::Ampere => "A",
            Unit::VarHour => "varh",
            Unit::Var => "var",
            Unit::CalorificValue => "cal",
            Unit::CubicFeet => "ft^3",
            Unit::UsGallon => "gal",
            Unit::UsGallonPerMinute => "gal/min",
            Unit::UsGallonPerHour => "gal/h",
            Unit::Degree => "°",
            Unit::Hertz => "Hz",
            Unit::DegreeFahrenheit => "°F",
            Unit::Percent => "%",
            Unit::Reserved => "",
        };
        f.write_str(symbol)
    }
}

/// The decoded meaning of a value information block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VibInfo {
    pub description: Description,
    /// The plain-text description carried by a user-defined VIF (0x7C).
    pub user_defined: Option<String>,
    pub unit: Option<Unit>,
    /// Decimal exponent applied to the record value.
    pub exponent: i32,
}

impl VibInfo {
    fn not_supported() -> Self {
        VibInfo {
            description: Description::NotSupported,
            user_defined: None,
            unit: None,
            exponent: 0,
        }
    }

    fn from_entry(entry: &VifEntry, code: u8) -> Self {
        let unit = match entry.unit {
            UnitSpec::None => None,
            UnitSpec::Fixed(unit) => Some(unit),
            UnitSpec::TimeUnit => Some(match code & 0x03 {
                0 => Unit::Second,
                1 => Unit::Minute,
                2 => Unit::Hour,
                _ => Unit::Day,
            }),
            UnitSpec::BatteryTimeUnit => Some(match code & 0x03 {
                0 => Unit::Hour,
                1 => Unit::Day,
                2 => Unit::Month,
                _ => Unit::Year,
            }),
        };
        VibInfo {
            description: entry.description,
            user_defined: None,
            unit,
            exponent: i32::from(code & entry.exp_mask) + entry.exp_bias,
        }
    }
}

/// Decodes a complete value information block. `vib` starts at the VIF byte
/// and, for user-defined VIFs, includes the length byte and description
/// string. Combinable VIFEs trailing a resolved code are tolerated and
/// ignored.
pub fn decode_vib(vib: &[u8]) -> Result<VibInfo, DecodingError> {
    let vif = *vib.first().ok_or(DecodingError::UnexpectedEndOfData { offset: 0 })?;
    match vif & VIF_WITHOUT_EXTENSION {
        VIF_EXTENSION_ALTERNATE_MASKED => decode_extension(vib, vif, vif_tables::EXTENSION_FB, false),
        VIF_EXTENSION_MAIN_MASKED => decode_extension(vib, vif, vif_tables::EXTENSION_FD, true),
        VIF_USER_DEFINED => decode_user_defined(vib),
        0x7E | 0x7F => Err(DecodingError::UnsupportedVif { vif }),
        code => Ok(vif_tables::lookup(vif_tables::PRIMARY, code)
            .map(|entry| VibInfo::from_entry(entry, code))
            .unwrap_or_else(VibInfo::not_supported)),
    }
}

fn decode_extension(
    vib: &[u8],
    vif: u8,
    table: &[VifEntry],
    reserved_tail: bool,
) -> Result<VibInfo, DecodingError> {
    let vife = *vib.get(1).ok_or(DecodingError::MissingVife { vif })?;
    let code = vife & VIF_WITHOUT_EXTENSION;
    if let Some(entry) = vif_tables::lookup(table, code) {
        return Ok(VibInfo::from_entry(entry, code));
    }
    if reserved_tail && code >= 0x77 {
        return Ok(VibInfo {
            description: Description::Reserved,
            user_defined: None,
            unit: None,
            exponent: 0,
        });
    }
    Ok(VibInfo::not_supported())
}

fn decode_user_defined(vib: &[u8]) -> Result<VibInfo, DecodingError> {
    let length = *vib.get(1).ok_or(DecodingError::InvalidUserDefinedVif)? as usize;
    let text = vib
        .get(2..2 + length)
        .ok_or(DecodingError::InvalidUserDefinedVif)?;
    Ok(VibInfo {
        description: Description::UserDefined,
        user_defined: Some(super::data_encoding::decode_text_reversed(text)),
        unit: None,
        exponent: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_energy_with_exponent() {
        let info = decode_vib(&[0x07]).unwrap();
        assert_eq!(info.description, Description::Energy);
        assert_eq!(info.unit, Some(Unit::WattHour));
        assert_eq!(info.exponent, 4);
    }

    #[test]
    fn primary_volume() {
        let info = decode_vib(&[0x13]).unwrap();
        assert_eq!(info.description, Description::Volume);
        assert_eq!(info.unit, Some(Unit::CubicMetre));
        assert_eq!(info.exponent, -3);

        let info = decode_vib(&[0x15]).unwrap();
        assert_eq!(info.exponent, -1);
    }

    #[test]
    fn on_time_unit_from_low_bits() {
        let info = decode_vib(&[0x22]).unwrap();
        assert_eq!(info.description, Description::OnTime);
        assert_eq!(info.unit, Some(Unit::Hour));
        assert_eq!(info.exponent, 0);

        let info = decode_vib(&[0x26]).unwrap();
        assert_eq!(info.description, Description::OperatingTime);
        assert_eq!(info.unit, Some(Unit::Hour));
    }

    #[test]
    fn temperatures() {
        let info = decode_vib(&[0x5A]).unwrap();
        assert_eq!(info.description, Description::FlowTemperature);
        assert_eq!(info.unit, Some(Unit::DegreeCelsius));
        assert_eq!(info.exponent, -1);

        let info = decode_vib(&[0x62]).unwrap();
        assert_eq!(info.description, Description::TemperatureDifference);
        assert_eq!(info.unit, Some(Unit::Kelvin));
        assert_eq!(info.exponent, -1);
    }

    #[test]
    fn date_and_date_time_codes() {
        assert_eq!(decode_vib(&[0x6C]).unwrap().description, Description::Date);
        assert_eq!(
            decode_vib(&[0x6D]).unwrap().description,
            Description::DateTime
        );
    }

    #[test]
    fn address_ignores_trailing_combinable_vife() {
        let info = decode_vib(&[0xFA, 0x3D]).unwrap();
        assert_eq!(info.description, Description::Address);
    }

    #[test]
    fn first_extension_table() {
        assert_eq!(
            decode_vib(&[0xFD, 0x0C]).unwrap().description,
            Description::ModelVersion
        );
        assert_eq!(
            decode_vib(&[0xFD, 0x0B]).unwrap().description,
            Description::ParameterSetId
        );
        let volt = decode_vib(&[0xFD, 0x48]).unwrap();
        assert_eq!(volt.description, Description::Voltage);
        assert_eq!(volt.unit, Some(Unit::Volt));
        assert_eq!(volt.exponent, -1);
    }

    #[test]
    fn first_extension_reserved_and_unknown() {
        assert_eq!(
            decode_vib(&[0xFD, 0x7B]).unwrap().description,
            Description::Reserved
        );
        assert_eq!(
            decode_vib(&[0xFD, 0x73]).unwrap().description,
            Description::NotSupported
        );
    }

    #[test]
    fn alternate_extension_table() {
        let info = decode_vib(&[0xFB, 0x01]).unwrap();
        assert_eq!(info.description, Description::Energy);
        assert_eq!(info.unit, Some(Unit::WattHour));
        assert_eq!(info.exponent, 6);

        let info = decode_vib(&[0xFB, 0x1B]).unwrap();
        assert_eq!(info.description, Description::RelativeHumidity);
        assert_eq!(info.unit, Some(Unit::Percent));
        assert_eq!(info.exponent, 0);
    }

    #[test]
    fn user_defined_vif_reverses_text() {
        let info = decode_vib(&[0x7C, 0x06, 0x54, 0x54, 0x41, 0x42, 0x20, 0x25]).unwrap();
        assert_eq!(info.description, Description::UserDefined);
        assert_eq!(info.user_defined.as_deref(), Some("% BATT"));
    }

    #[test]
    fn unsupported_codes_fail() {
        assert!(matches!(
            decode_vib(&[0x7E]),
            Err(DecodingError::UnsupportedVif { vif: 0x7E })
        ));
        assert!(matches!(
            decode_vib(&[0xFD]),
            Err(DecodingError::MissingVife { vif: 0xFD })
        ));
    }

    #[test]
    fn unknown_primary_code_is_not_supported() {
        assert_eq!(
            decode_vib(&[0x6F]).unwrap().description,
            Description::NotSupported
        );
    }
}
