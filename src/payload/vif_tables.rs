//! # VIF Lookup Tables
//!
//! Ordered match tables for the primary VIF range and the two linear
//! extension tables (first extension 0xFD, alternate extension 0xFB).
//! Each entry matches when `vif & mask == value`; the first hit wins, so
//! narrower masks must precede wider ones covering the same codes.
//!
//! The exponent of a matching code is `(vif & exp_mask) + exp_bias`; codes
//! without a range encode a mask of 0 and carry the bias verbatim.

use super::vif::{Description, Unit};

/// How a table entry derives its unit from the matched code.
#[derive(Debug, Clone, Copy)]
pub(crate) enum UnitSpec {
    None,
    Fixed(Unit),
    /// Low two bits select second, minute, hour or day.
    TimeUnit,
    /// Low two bits select hour, day, month or year.
    BatteryTimeUnit,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct VifEntry {
    pub mask: u8,
    pub value: u8,
    pub description: Description,
    pub unit: UnitSpec,
    pub exp_mask: u8,
    pub exp_bias: i32,
}

const fn entry(
    mask: u8,
    value: u8,
    description: Description,
    unit: UnitSpec,
    exp_mask: u8,
    exp_bias: i32,
) -> VifEntry {
    VifEntry {
        mask,
        value,
        description,
        unit,
        exp_mask,
        exp_bias,
    }
}

const fn plain(mask: u8, value: u8, description: Description) -> VifEntry {
    entry(mask, value, description, UnitSpec::None, 0, 0)
}

/// Primary VIF table, indexed by the masked code (bit 7 stripped). The
/// dispatch codes 0x7B, 0x7C and 0x7D are handled before lookup and do not
/// appear here.
pub(crate) const PRIMARY: &[VifEntry] = &[
    entry(0x78, 0x00, Description::Energy, UnitSpec::Fixed(Unit::WattHour), 0x07, -3),
    entry(0x78, 0x08, Description::Energy, UnitSpec::Fixed(Unit::Joule), 0x07, 0),
    entry(0x78, 0x10, Description::Volume, UnitSpec::Fixed(Unit::CubicMetre), 0x07, -6),
    entry(0x78, 0x18, Description::Mass, UnitSpec::Fixed(Unit::Kilogram), 0x07, -3),
    entry(0x7C, 0x20, Description::OnTime, UnitSpec::TimeUnit, 0x00, 0),
    entry(0x7C, 0x24, Description::OperatingTime, UnitSpec::TimeUnit, 0x00, 0),
    entry(0x78, 0x28, Description::Power, UnitSpec::Fixed(Unit::Watt), 0x07, -3),
    entry(0x78, 0x30, Description::Power, UnitSpec::Fixed(Unit::JoulePerHour), 0x07, 0),
    entry(0x78, 0x38, Description::VolumeFlow, UnitSpec::Fixed(Unit::CubicMetrePerHour), 0x07, -6),
    entry(0x78, 0x40, Description::VolumeFlowExt, UnitSpec::Fixed(Unit::CubicMetrePerMinute), 0x07, -7),
    entry(0x78, 0x48, Description::VolumeFlowExt, UnitSpec::Fixed(Unit::CubicMetrePerSecond), 0x07, -9),
    entry(0x78, 0x50, Description::MassFlow, UnitSpec::Fixed(Unit::KilogramPerHour), 0x07, -3),
    entry(0x7C, 0x58, Description::FlowTemperature, UnitSpec::Fixed(Unit::DegreeCelsius), 0x03, -3),
    entry(0x7C, 0x5C, Description::ReturnTemperature, UnitSpec::Fixed(Unit::DegreeCelsius), 0x03, -3),
    entry(0x7C, 0x60, Description::TemperatureDifference, UnitSpec::Fixed(Unit::Kelvin), 0x03, -3),
    entry(0x7C, 0x64, Description::ExternalTemperature, UnitSpec::Fixed(Unit::DegreeCelsius), 0x03, -3),
    entry(0x7C, 0x68, Description::Pressure, UnitSpec::Fixed(Unit::Bar), 0x03, -3),
    plain(0x7F, 0x6C, Description::Date),
    plain(0x7F, 0x6D, Description::DateTime),
    entry(0x7F, 0x6E, Description::Hca, UnitSpec::Fixed(Unit::Reserved), 0x00, 0),
    plain(0x7F, 0x6F, Description::NotSupported),
    entry(0x7C, 0x70, Description::AveragingDuration, UnitSpec::TimeUnit, 0x00, 0),
    entry(0x7C, 0x74, Description::ActualityDuration, UnitSpec::TimeUnit, 0x00, 0),
    plain(0x7F, 0x78, Description::FabricationNo),
    plain(0x7F, 0x79, Description::ExtendedIdentification),
    plain(0x7F, 0x7A, Description::Address),
];

/// First extension table, reached through VIF 0xFD (or 0x7D): mostly
/// electrical and device-management quantities.
pub(crate) const EXTENSION_FD: &[VifEntry] = &[
    plain(0x7F, 0x0B, Description::ParameterSetId),
    plain(0x7F, 0x0C, Description::ModelVersion),
    plain(0x7F, 0x0D, Description::HardwareVersion),
    plain(0x7F, 0x0E, Description::FirmwareVersion),
    plain(0x7F, 0x11, Description::Customer),
    plain(0x7F, 0x17, Description::ErrorFlags),
    entry(0x70, 0x40, Description::Voltage, UnitSpec::Fixed(Unit::Volt), 0x0F, -9),
    entry(0x70, 0x50, Description::Current, UnitSpec::Fixed(Unit::Ampere), 0x0F, -12),
    entry(0x7C, 0x6C, Description::OperatingTimeBattery, UnitSpec::BatteryTimeUnit, 0x00, 0),
];

/// Alternate extension table, reached through VIF 0xFB (or 0x7B): the
/// second units for the primary quantities plus some US customary ranges.
pub(crate) const EXTENSION_FB: &[VifEntry] = &[
    entry(0x7E, 0x00, Description::Energy, UnitSpec::Fixed(Unit::WattHour), 0x01, 5),
    entry(0x7E, 0x02, Description::ReactiveEnergy, UnitSpec::Fixed(Unit::VarHour), 0x01, 3),
    entry(0x7E, 0x08, Description::Energy, UnitSpec::Fixed(Unit::Joule), 0x01, 8),
    entry(0x7C, 0x0C, Description::Energy, UnitSpec::Fixed(Unit::CalorificValue), 0x03, 5),
    entry(0x7E, 0x10, Description::Volume, UnitSpec::Fixed(Unit::CubicMetre), 0x01, 2),
    entry(0x7C, 0x14, Description::ReactivePower, UnitSpec::Fixed(Unit::Var), 0x03, 0),
    entry(0x7E, 0x18, Description::Mass, UnitSpec::Fixed(Unit::Kilogram), 0x01, 5),
    entry(0x7E, 0x1A, Description::RelativeHumidity, UnitSpec::Fixed(Unit::Percent), 0x01, -1),
    entry(0x7F, 0x20, Description::Volume, UnitSpec::Fixed(Unit::CubicFeet), 0x00, 0),
    entry(0x7F, 0x21, Description::Volume, UnitSpec::Fixed(Unit::CubicFeet), 0x00, -1),
    entry(0x7E, 0x22, Description::Volume, UnitSpec::Fixed(Unit::UsGallon), 0x01, -1),
    entry(0x7F, 0x24, Description::VolumeFlow, UnitSpec::Fixed(Unit::UsGallonPerMinute), 0x00, -3),
    entry(0x7F, 0x25, Description::VolumeFlow, UnitSpec::Fixed(Unit::UsGallonPerMinute), 0x00, 0),
    entry(0x7F, 0x26, Description::VolumeFlow, UnitSpec::Fixed(Unit::UsGallonPerHour), 0x00, 0),
    entry(0x7E, 0x28, Description::Power, UnitSpec::Fixed(Unit::Watt), 0x01, 5),
    entry(0x7E, 0x2A, Description::Phase, UnitSpec::Fixed(Unit::Degree), 0x00, -1),
    entry(0x7C, 0x2C, Description::Frequency, UnitSpec::Fixed(Unit::Hertz), 0x03, -3),
    entry(0x7E, 0x30, Description::Power, UnitSpec::Fixed(Unit::JoulePerHour), 0x01, 8),
    entry(0x7C, 0x58, Description::FlowTemperature, UnitSpec::Fixed(Unit::DegreeFahrenheit), 0x03, -3),
    entry(0x7C, 0x5C, Description::ReturnTemperature, UnitSpec::Fixed(Unit::DegreeFahrenheit), 0x03, -3),
    entry(0x7C, 0x60, Description::TemperatureDifference, UnitSpec::Fixed(Unit::DegreeFahrenheit), 0x03, -3),
    entry(0x7C, 0x64, Description::FlowTemperature, UnitSpec::Fixed(Unit::DegreeFahrenheit), 0x03, -3),
    entry(0x7C, 0x70, Description::TemperatureLimit, UnitSpec::Fixed(Unit::DegreeFahrenheit), 0x03, -3),
    entry(0x7C, 0x74, Description::TemperatureLimit, UnitSpec::Fixed(Unit::DegreeCelsius), 0x03, -3),
    entry(0x78, 0x78, Description::MaxPower, UnitSpec::Fixed(Unit::Watt), 0x07, -3),
];

pub(crate) fn lookup(table: &[VifEntry], code: u8) -> Option<&VifEntry> {
    table.iter().find(|e| code & e.mask == e.value)
}
