//! # Variable Data Structure
//!
//! The application layer of a RSP_UD telegram: CI dispatch into the three
//! header layouts, decryption of mode 5 payloads, and assembly of the data
//! records. This is the module the two public entry points funnel into.

use bitflags::bitflags;
use log::debug;
use serde::Serialize;
use std::collections::HashMap;

use super::record::{DataRecord, RawRecords};
use crate::address::SecondaryAddress;
use crate::constants::{
    AES_BLOCK_SIZE, CI_LONG_HEADER, CI_NO_HEADER, CI_SHORT_HEADER, DECRYPTION_CHECK_BYTES,
};
use crate::error::DecodingError;
use crate::wmbus::crypto::{
    aes_cbc_decrypt, build_iv, encrypted_length, EncryptionMode,
};

/// AES-128 keys by the secondary address of the meter they belong to.
pub type KeyStore = HashMap<SecondaryAddress, [u8; 16]>;

bitflags! {
    /// Status byte of the short header. The low two bits are the
    /// application status counter (busy / error / alarm), the high three
    /// are manufacturer specific.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusFlags: u8 {
        const POWER_LOW = 0x04;
        const PERMANENT_ERROR = 0x08;
        const TEMPORARY_ERROR = 0x10;
        const MANUFACTURER_1 = 0x20;
        const MANUFACTURER_2 = 0x40;
        const MANUFACTURER_3 = 0x80;
    }
}

impl StatusFlags {
    /// The two application status bits: 0 none, 1 busy, 2 error, 3 alarm.
    pub fn application_status(raw: u8) -> u8 {
        raw & 0x03
    }
}

/// The 4-byte short header common to CI 0x72 and 0x7A responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShortHeader {
    pub access_number: u8,
    pub status: u8,
    pub encrypted_blocks: u8,
    pub encryption_mode: EncryptionMode,
}

impl ShortHeader {
    fn decode(data: &[u8]) -> Result<Self, DecodingError> {
        if data.len() < 4 {
            return Err(DecodingError::UnexpectedEndOfData { offset: 0 });
        }
        Ok(ShortHeader {
            access_number: data[0],
            status: data[1],
            encrypted_blocks: (data[2] & 0xF0) >> 4,
            encryption_mode: EncryptionMode::from_code(data[3]),
        })
    }

    pub fn status_flags(&self) -> StatusFlags {
        StatusFlags::from_bits_truncate(self.status)
    }
}

/// Decoded application layer of a telegram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableDataStructure {
    /// Secondary address from the long header, absent for CI 0x78/0x7A.
    pub secondary_address: Option<SecondaryAddress>,
    /// Short header, absent for CI 0x78.
    pub short_header: Option<ShortHeader>,
    pub records: Vec<DataRecord>,
    /// Opaque bytes after a manufacturer-data sentinel DIF.
    pub manufacturer_data: Option<Vec<u8>>,
    /// The device holds further records for a follow-up request.
    pub more_records_follow: bool,
}

impl VariableDataStructure {
    /// Decodes an APDU starting at the CI field. `link_layer_address` is
    /// the wireless link layer identity, used for key lookup and IV
    /// construction when the telegram has no long header of its own.
    pub fn decode(
        apdu: &[u8],
        link_layer_address: Option<&SecondaryAddress>,
        keys: &KeyStore,
    ) -> Result<Self, DecodingError> {
        let ci = *apdu
            .first()
            .ok_or(DecodingError::UnexpectedEndOfData { offset: 0 })?;
        debug!("decoding variable data structure, CI 0x{:02X}", ci);
        match ci {
            CI_LONG_HEADER => {
                if apdu.len() < 13 {
                    return Err(DecodingError::UnexpectedEndOfData { offset: apdu.len() });
                }
                let address = SecondaryAddress::from_long_header(&apdu[1..9])?;
                let header = ShortHeader::decode(&apdu[9..13])?;
                Self::with_header(&apdu[13..], Some(address), header, keys)
            }
            CI_SHORT_HEADER => {
                if apdu.len() < 5 {
                    return Err(DecodingError::UnexpectedEndOfData { offset: apdu.len() });
                }
                let header = ShortHeader::decode(&apdu[1..5])?;
                let mut vds =
                    Self::with_header(&apdu[5..], link_layer_address.cloned(), header, keys)?;
                vds.secondary_address = None;
                Ok(vds)
            }
            CI_NO_HEADER => Self::decode_records(&apdu[1..]),
            0xA0..=0xB7 => Err(DecodingError::ManufacturerSpecificCi { ci }),
            _ => Err(DecodingError::UnsupportedControlInformation { ci }),
        }
    }

    fn with_header(
        body: &[u8],
        address: Option<SecondaryAddress>,
        header: ShortHeader,
        keys: &KeyStore,
    ) -> Result<Self, DecodingError> {
        let mut vds = match header.encryption_mode {
            EncryptionMode::None => Self::decode_records(body)?,
            EncryptionMode::AesCbcIv => {
                let address = address
                    .as_ref()
                    .ok_or(DecodingError::MissingLinkLayerAddress)?;
                let key = keys
                    .get(address)
                    .ok_or_else(|| DecodingError::MissingKey(address.clone()))?;
                let plaintext = decrypt_payload(body, address, key, &header)?;
                Self::decode_records(&plaintext)?
            }
            mode => return Err(DecodingError::UnsupportedEncryption(mode)),
        };
        vds.secondary_address = address;
        vds.short_header = Some(header);
        Ok(vds)
    }

    fn decode_records(body: &[u8]) -> Result<Self, DecodingError> {
        let mut raw_records = RawRecords::new(body);
        let mut records = Vec::new();
        for raw in &mut raw_records {
            records.push(DataRecord::decode(&raw?)?);
        }
        Ok(VariableDataStructure {
            secondary_address: None,
            short_header: None,
            records,
            manufacturer_data: raw_records.manufacturer_data().map(|d| d.to_vec()),
            more_records_follow: raw_records.more_records_follow(),
        })
    }
}

fn decrypt_payload(
    body: &[u8],
    address: &SecondaryAddress,
    key: &[u8; 16],
    header: &ShortHeader,
) -> Result<Vec<u8>, DecodingError> {
    let length = encrypted_length(header.encrypted_blocks, body.len())?;
    debug!(
        "decrypting {} of {} payload bytes for [{}]",
        length,
        body.len(),
        address
    );
    let mut buffer = body.to_vec();
    let iv = build_iv(address, header.access_number);
    aes_cbc_decrypt(key, &iv, &mut buffer[..length]);
    if length >= AES_BLOCK_SIZE && buffer[..2] != DECRYPTION_CHECK_BYTES {
        return Err(DecodingError::WrongKeyOrCorrupt);
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::record::Value;
    use crate::payload::vif::Description;
    use crate::wmbus::crypto::aes_cbc_encrypt;

    fn no_keys() -> KeyStore {
        KeyStore::new()
    }

    #[test]
    fn no_header_records() {
        let apdu = [0x78, 0x02, 0x5A, 0x79, 0x02];
        let vds = VariableDataStructure::decode(&apdu, None, &no_keys()).unwrap();
        assert!(vds.secondary_address.is_none());
        assert!(vds.short_header.is_none());
        assert_eq!(vds.records.len(), 1);
        assert_eq!(vds.records[0].value, Value::Integer(633));
    }

    #[test]
    fn long_header_unencrypted() {
        let mut apdu = vec![0x72];
        apdu.extend_from_slice(&[0x71, 0x22, 0x23, 0x10, 0x65, 0x32, 0x18, 0x0E]);
        apdu.extend_from_slice(&[0x17, 0x00, 0x00, 0x00]);
        apdu.extend_from_slice(&[0x0C, 0x22, 0x22, 0x37, 0x00, 0x00]);
        let vds = VariableDataStructure::decode(&apdu, None, &no_keys()).unwrap();
        let address = vds.secondary_address.unwrap();
        assert_eq!(address.manufacturer(), "LSE");
        let header = vds.short_header.unwrap();
        assert_eq!(header.access_number, 0x17);
        assert_eq!(header.encryption_mode, EncryptionMode::None);
        assert_eq!(vds.records.len(), 1);
        assert_eq!(vds.records[0].description, Description::OnTime);
    }

    #[test]
    fn manufacturer_ci_is_reported() {
        assert!(matches!(
            VariableDataStructure::decode(&[0xA4], None, &no_keys()),
            Err(DecodingError::ManufacturerSpecificCi { ci: 0xA4 })
        ));
        assert!(matches!(
            VariableDataStructure::decode(&[0x55], None, &no_keys()),
            Err(DecodingError::UnsupportedControlInformation { ci: 0x55 })
        ));
    }

    #[test]
    fn status_byte_flags_and_application_status() {
        // unencrypted short header, status 0x26: application status "error",
        // power low and one manufacturer bit
        let apdu = [0x7A, 0x01, 0x26, 0x00, 0x00, 0x01, 0x22, 0x05];
        let vds = VariableDataStructure::decode(&apdu, None, &no_keys()).unwrap();
        let header = vds.short_header.unwrap();
        assert_eq!(header.status, 0x26);
        let flags = header.status_flags();
        assert!(flags.contains(StatusFlags::POWER_LOW));
        assert!(flags.contains(StatusFlags::MANUFACTURER_1));
        assert!(!flags.contains(StatusFlags::PERMANENT_ERROR));
        assert_eq!(StatusFlags::application_status(header.status), 2);
    }

    fn encrypted_apdu(key: &[u8; 16]) -> (Vec<u8>, SecondaryAddress) {
        let address =
            SecondaryAddress::from_link_layer(&[0x65, 0x32, 0x82, 0x18, 0x51, 0x58, 0x2C, 0x06])
                .unwrap();
        let mut body = vec![0x2F, 0x2F, 0x02, 0x5A, 0x79, 0x02];
        body.resize(32, 0x2F);
        let iv = build_iv(&address, 0xE1);
        aes_cbc_encrypt(key, &iv, &mut body);
        let mut apdu = vec![0x7A, 0xE1, 0x00, 0x20, 0x05];
        apdu.extend_from_slice(&body);
        (apdu, address)
    }

    #[test]
    fn short_header_encrypted_round_trip() {
        let key = [0x0A; 16];
        let (apdu, address) = encrypted_apdu(&key);
        let mut keys = KeyStore::new();
        keys.insert(address.clone(), key);
        let vds = VariableDataStructure::decode(&apdu, Some(&address), &keys).unwrap();
        assert_eq!(
            vds.short_header.unwrap().encryption_mode,
            EncryptionMode::AesCbcIv
        );
        assert_eq!(vds.records.len(), 1);
        assert_eq!(vds.records[0].description, Description::FlowTemperature);
        assert_eq!(vds.records[0].value, Value::Integer(633));
    }

    #[test]
    fn wrong_key_is_detected() {
        let key = [0x0A; 16];
        let (apdu, address) = encrypted_apdu(&key);
        let mut keys = KeyStore::new();
        keys.insert(address.clone(), [0x0B; 16]);
        assert_eq!(
            VariableDataStructure::decode(&apdu, Some(&address), &keys),
            Err(DecodingError::WrongKeyOrCorrupt)
        );
    }

    #[test]
    fn missing_key_names_the_address() {
        let key = [0x0A; 16];
        let (apdu, address) = encrypted_apdu(&key);
        assert!(matches!(
            VariableDataStructure::decode(&apdu, Some(&address), &no_keys()),
            Err(DecodingError::MissingKey(_))
        ));
    }

    #[test]
    fn encrypted_without_address_fails() {
        let key = [0x0A; 16];
        let (apdu, _) = encrypted_apdu(&key);
        assert_eq!(
            VariableDataStructure::decode(&apdu, None, &no_keys()),
            Err(DecodingError::MissingLinkLayerAddress)
        );
    }

    #[test]
    fn declared_blocks_bounded_by_payload() {
        let apdu = [0x7A, 0xE1, 0x00, 0x40, 0x05, 0x00, 0x00];
        let address =
            SecondaryAddress::from_link_layer(&[0x65, 0x32, 0x82, 0x18, 0x51, 0x58, 0x2C, 0x06])
                .unwrap();
        let mut keys = KeyStore::new();
        keys.insert(address.clone(), [0u8; 16]);
        assert!(matches!(
            VariableDataStructure::decode(&apdu, Some(&address), &keys),
            Err(DecodingError::EncryptedLengthExceedsPayload { blocks: 4, .. })
        ));
    }
}
