//! # Secure Payload Layer
//!
//! AES-128-CBC handling for encrypted short-header payloads (EN 13757-3
//! security mode 5). The initialization vector is derived from the meter's
//! secondary address and the access number of the telegram; only whole
//! 16-byte blocks are ever encrypted, trailing bytes stay in the clear.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes128;
use serde::Serialize;

use crate::address::SecondaryAddress;
use crate::constants::AES_BLOCK_SIZE;
use crate::error::DecodingError;

/// Encryption mode from the low nibble of the short header configuration.
/// Only `None` and `AesCbcIv` (mode 5) are decodable; the DES modes are
/// legacy and the remaining codes are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EncryptionMode {
    None,
    DesCbc,
    DesCbcIv,
    AesCbcIv,
    Reserved(u8),
}

impl EncryptionMode {
    pub fn from_code(code: u8) -> Self {
        match code & 0x0F {
            0x00 => EncryptionMode::None,
            0x02 => EncryptionMode::DesCbc,
            0x03 => EncryptionMode::DesCbcIv,
            0x05 => EncryptionMode::AesCbcIv,
            other => EncryptionMode::Reserved(other),
        }
    }
}

/// Builds the mode 5 initialization vector: the 8 secondary address bytes
/// as transmitted, followed by the access number repeated 8 times.
pub fn build_iv(address: &SecondaryAddress, access_number: u8) -> [u8; 16] {
    let mut iv = [access_number; 16];
    iv[..8].copy_from_slice(address.as_bytes());
    iv
}

/// Decrypts `buffer` in place with AES-128-CBC. The buffer length must be a
/// multiple of the block size; partial blocks are never passed in here.
pub fn aes_cbc_decrypt(key: &[u8; 16], iv: &[u8; 16], buffer: &mut [u8]) {
    debug_assert_eq!(buffer.len() % AES_BLOCK_SIZE, 0);
    let cipher = Aes128::new(GenericArray::from_slice(key));
    let mut chain = *iv;
    for block in buffer.chunks_exact_mut(AES_BLOCK_SIZE) {
        let mut ciphertext = [0u8; AES_BLOCK_SIZE];
        ciphertext.copy_from_slice(block);
        cipher.decrypt_block(GenericArray::from_mut_slice(block));
        for (b, c) in block.iter_mut().zip(chain.iter()) {
            *b ^= c;
        }
        chain = ciphertext;
    }
}

/// Encrypts `buffer` in place with AES-128-CBC. Counterpart of
/// [`aes_cbc_decrypt`], used to produce encrypted fixtures.
pub fn aes_cbc_encrypt(key: &[u8; 16], iv: &[u8; 16], buffer: &mut [u8]) {
    debug_assert_eq!(buffer.len() % AES_BLOCK_SIZE, 0);
    let cipher = Aes128::new(GenericArray::from_slice(key));
    let mut chain = *iv;
    for block in buffer.chunks_exact_mut(AES_BLOCK_SIZE) {
        for (b, c) in block.iter_mut().zip(chain.iter()) {
            *b ^= c;
        }
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
        chain.copy_from_slice(block);
    }
}

/// Checks the declared encrypted length against the payload and returns the
/// number of bytes covered by encryption.
pub fn encrypted_length(blocks: u8, available: usize) -> Result<usize, DecodingError> {
    let length = usize::from(blocks) * AES_BLOCK_SIZE;
    if length > available {
        return Err(DecodingError::EncryptedLengthExceedsPayload { blocks, available });
    }
    Ok(length)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> SecondaryAddress {
        SecondaryAddress::from_link_layer(&[0x65, 0x32, 0x82, 0x18, 0x51, 0x58, 0x2C, 0x06])
            .unwrap()
    }

    #[test]
    fn mode_codes() {
        assert_eq!(EncryptionMode::from_code(0x00), EncryptionMode::None);
        assert_eq!(EncryptionMode::from_code(0x05), EncryptionMode::AesCbcIv);
        assert_eq!(EncryptionMode::from_code(0xF5), EncryptionMode::AesCbcIv);
        assert_eq!(EncryptionMode::from_code(0x07), EncryptionMode::Reserved(7));
    }

    #[test]
    fn iv_layout() {
        let iv = build_iv(&address(), 0xE1);
        assert_eq!(&iv[..8], &[0x65, 0x32, 0x82, 0x18, 0x51, 0x58, 0x2C, 0x06]);
        assert_eq!(&iv[8..], &[0xE1; 8]);
    }

    #[test]
    fn cbc_round_trip() {
        let key = [0x11; 16];
        let iv = build_iv(&address(), 0x42);
        let plaintext: Vec<u8> = (0u8..32).collect();
        let mut buffer = plaintext.clone();
        aes_cbc_encrypt(&key, &iv, &mut buffer);
        assert_ne!(buffer, plaintext);
        aes_cbc_decrypt(&key, &iv, &mut buffer);
        assert_eq!(buffer, plaintext);
    }

    #[test]
    fn wrong_key_garbles() {
        let key = [0x11; 16];
        let iv = build_iv(&address(), 0x42);
        let mut buffer = vec![0x2F, 0x2F, 0x02, 0x5A, 0x79, 0x02, 0x2F, 0x2F,
                              0x2F, 0x2F, 0x2F, 0x2F, 0x2F, 0x2F, 0x2F, 0x2F];
        aes_cbc_encrypt(&key, &iv, &mut buffer);
        let mut wrong = buffer.clone();
        aes_cbc_decrypt(&[0x12; 16], &iv, &mut wrong);
        assert_ne!(&wrong[..2], &[0x2F, 0x2F]);
    }

    #[test]
    fn encrypted_length_bound() {
        assert_eq!(encrypted_length(2, 40).unwrap(), 32);
        assert!(matches!(
            encrypted_length(3, 40),
            Err(DecodingError::EncryptedLengthExceedsPayload {
                blocks: 3,
                available: 40
            })
        ));
    }
}
