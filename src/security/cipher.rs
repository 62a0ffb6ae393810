//! Field-level encryption for token claims and stored card data.
//!
//! Values are encrypted with AES-256 in full-block CFB mode under a fresh
//! random IV. The IV is prepended to the ciphertext and the whole buffer is
//! encoded as URL-safe base64.

use aes::cipher::{AsyncStreamCipher, KeyIvInit};
use base64::{Engine, engine::general_purpose::URL_SAFE};
use password_hash::rand_core::{OsRng, RngCore};
use thiserror::Error;

type Aes256CfbEnc = cfb_mode::Encryptor<aes::Aes256>;
type Aes256CfbDec = cfb_mode::Decryptor<aes::Aes256>;

pub const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("encryption key must be exactly {KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),
    #[error("ciphertext is not valid base64")]
    InvalidEncoding,
    #[error("ciphertext is shorter than one IV block")]
    TooShort,
    #[error("decrypted value is not valid UTF-8")]
    InvalidUtf8,
}

/// Reads raw key material. The key must be exactly [`KEY_LEN`] bytes.
pub fn parse_key(key: &str) -> Result<[u8; KEY_LEN], CipherError> {
    key.as_bytes()
        .try_into()
        .map_err(|_| CipherError::InvalidKeyLength(key.len()))
}

#[derive(Clone)]
pub struct FieldCipher {
    key: [u8; KEY_LEN],
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCipher").finish_non_exhaustive()
    }
}

impl FieldCipher {
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    pub fn from_key_str(key: &str) -> Result<Self, CipherError> {
        parse_key(key).map(Self::new)
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> String {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let mut buf = Vec::with_capacity(IV_LEN + plaintext.len());
        buf.extend_from_slice(&iv);
        buf.extend_from_slice(plaintext);
        Aes256CfbEnc::new(&self.key.into(), &iv.into()).encrypt(&mut buf[IV_LEN..]);

        URL_SAFE.encode(buf)
    }

    pub fn encrypt_str(&self, plaintext: &str) -> String {
        self.encrypt(plaintext.as_bytes())
    }

    pub fn decrypt(&self, encoded: &str) -> Result<Vec<u8>, CipherError> {
        let mut buf = URL_SAFE
            .decode(encoded)
            .map_err(|_| CipherError::InvalidEncoding)?;
        if buf.len() < IV_LEN {
            return Err(CipherError::TooShort);
        }

        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&buf[..IV_LEN]);
        let mut data = buf.split_off(IV_LEN);
        Aes256CfbDec::new(&self.key.into(), &iv.into()).decrypt(&mut data);
        Ok(data)
    }

    pub fn decrypt_string(&self, encoded: &str) -> Result<String, CipherError> {
        String::from_utf8(self.decrypt(encoded)?).map_err(|_| CipherError::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> FieldCipher {
        FieldCipher::from_key_str("0123456789abcdef0123456789abcdef").unwrap()
    }

    #[test]
    fn decrypts_what_it_encrypts() {
        let cipher = cipher();
        let token = cipher.encrypt_str("4111111111111111");
        assert_eq!(cipher.decrypt_string(&token).unwrap(), "4111111111111111");
    }

    #[test]
    fn each_call_uses_a_fresh_iv() {
        let cipher = cipher();
        assert_ne!(cipher.encrypt_str("admin"), cipher.encrypt_str("admin"));
    }

    #[test]
    fn ciphertext_hides_plaintext() {
        let cipher = cipher();
        let encoded = cipher.encrypt_str("superadmin");
        let raw = URL_SAFE.decode(&encoded).unwrap();
        assert_eq!(raw.len(), IV_LEN + "superadmin".len());
        assert_ne!(&raw[IV_LEN..], b"superadmin");
    }

    #[test]
    fn rejects_short_ciphertext() {
        let short = URL_SAFE.encode([1u8; 8]);
        assert_eq!(cipher().decrypt(&short), Err(CipherError::TooShort));
    }

    #[test]
    fn rejects_non_base64_input() {
        assert_eq!(cipher().decrypt("%%%"), Err(CipherError::InvalidEncoding));
    }

    #[test]
    fn rejects_wrong_key_length() {
        assert_eq!(
            FieldCipher::from_key_str("short").unwrap_err(),
            CipherError::InvalidKeyLength(5)
        );
    }

    #[test]
    fn other_key_does_not_recover_plaintext() {
        let encoded = cipher().encrypt_str("user");
        let other = FieldCipher::new([7u8; KEY_LEN]);
        assert_ne!(other.decrypt(&encoded).unwrap(), b"user");
    }
}
