//! # Wireless Application Frame
//!
//! Decodes a wM-Bus application frame as it comes out of a radio driver
//! with the CRC blocks already stripped: length, control, the 8-byte link
//! layer address in wireless byte order, then the CI field and payload.
//! Radio framing (preamble, block CRCs, mode A/B chip rates) is the
//! receiver's business and never reaches this layer.

use log::debug;
use serde::Serialize;

use crate::address::SecondaryAddress;
use crate::error::{DecodingError, FrameError};
use crate::payload::variable_data::{KeyStore, VariableDataStructure};

/// A decoded wM-Bus application frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WMBusMessage {
    /// L-field as transmitted.
    pub length: u8,
    /// C-field, typically 0x44 (SND-NR).
    pub control: u8,
    pub link_layer_address: SecondaryAddress,
    pub variable_data: VariableDataStructure,
}

impl WMBusMessage {
    /// Decodes a frame. The link layer address is handed to the secure
    /// payload layer for key lookup and IV construction.
    pub fn decode(buffer: &[u8], keys: &KeyStore) -> Result<Self, DecodingError> {
        if buffer.len() < 11 {
            return Err(FrameError::Truncated {
                needed: 11,
                actual: buffer.len(),
            }
            .into());
        }
        let length = buffer[0];
        if usize::from(length) != buffer.len() - 1 {
            // Some receivers deliver padding after the frame; the L-field wins.
            debug!(
                "wM-Bus L-field {} does not match buffer size {}",
                length,
                buffer.len() - 1
            );
        }
        let control = buffer[1];
        let link_layer_address = SecondaryAddress::from_link_layer(&buffer[2..10])?;
        let variable_data =
            VariableDataStructure::decode(&buffer[10..], Some(&link_layer_address), keys)?;
        Ok(WMBusMessage {
            length,
            control,
            link_layer_address,
            variable_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::DeviceType;

    const DEMO: &[u8] = &[
        0x2C, 0x44, 0x65, 0x32, 0x82, 0x18, 0x51, 0x58, 0x2C, 0x06, 0x7A, 0xE1, 0x00, 0x00,
        0x00, 0x04, 0x6D, 0x19, 0x06, 0xD9, 0x18, 0x0C, 0x13, 0x34, 0x12, 0x00, 0x00, 0x42,
        0x6C, 0xBF, 0x1C, 0x4C, 0x13, 0x00, 0x00, 0x00, 0x00, 0x32, 0x6C, 0xFF, 0xFF, 0x01,
        0xFD, 0x73, 0x00,
    ];

    #[test]
    fn link_layer_fields() {
        let message = WMBusMessage::decode(DEMO, &KeyStore::new()).unwrap();
        assert_eq!(message.length, 0x2C);
        assert_eq!(message.control, 0x44);
        assert_eq!(message.link_layer_address.manufacturer(), "LSE");
        assert_eq!(message.link_layer_address.device_id().to_i64(), 58_51_18_82);
        assert_eq!(
            message.link_layer_address.device_type(),
            DeviceType::WarmWater
        );
    }

    #[test]
    fn truncated_frame() {
        assert!(matches!(
            WMBusMessage::decode(&DEMO[..8], &KeyStore::new()),
            Err(DecodingError::Frame(FrameError::Truncated { .. }))
        ));
    }
}
