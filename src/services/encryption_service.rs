use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use thiserror::Error;

const NONCE_SIZE: usize = 12; // AES-GCM standard nonce size

#[derive(Error, Debug)]
pub enum EncryptionError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
    #[error("Invalid key length")]
    InvalidKeyLength,
    #[error("Invalid hex encoding: {0}")]
    InvalidEncoding(String),
}

/// Symmetric encryption for monitor secrets at rest. Uses AES-256-GCM.
pub struct EncryptionService {
    cipher: Aes256Gcm,
}

impl EncryptionService {
    /// Creates a new EncryptionService with a 32-byte key.
    pub fn new(key: &[u8]) -> Result<Self, EncryptionError> {
        Ok(Self {
            cipher: Aes256Gcm::new_from_slice(key).map_err(|_| EncryptionError::InvalidKeyLength)?,
        })
    }

    /// Creates the service from a hex encoded 32-byte key, as found in configuration.
    pub fn from_hex_key(key_hex: &str) -> Result<Self, EncryptionError> {
        let key_bytes = hex::decode(key_hex.trim())
            .map_err(|e| EncryptionError::InvalidEncoding(e.to_string()))?;
        Self::new(&key_bytes)
    }

    /// Encrypts a plaintext byte slice.
    /// Prepends the 12-byte nonce to the ciphertext.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| EncryptionError::EncryptionFailed(e.to_string()))?;

        let mut result = nonce.to_vec();
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    /// Decrypts data produced by [`EncryptionService::encrypt`].
    pub fn decrypt(&self, encrypted_data: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        if encrypted_data.len() < NONCE_SIZE {
            return Err(EncryptionError::DecryptionFailed(
                "Invalid encrypted data: too short to contain a nonce".to_string(),
            ));
        }

        let (nonce_bytes, ciphertext) = encrypted_data.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| EncryptionError::DecryptionFailed(e.to_string()))
    }

    pub fn encrypt_to_hex(&self, plaintext: &[u8]) -> Result<String, EncryptionError> {
        self.encrypt(plaintext).map(hex::encode)
    }

    pub fn decrypt_from_hex(&self, cipher_hex: &str) -> Result<Vec<u8>, EncryptionError> {
        let encrypted_data =
            hex::decode(cipher_hex).map_err(|e| EncryptionError::InvalidEncoding(e.to_string()))?;
        self.decrypt(&encrypted_data)
    }
}
