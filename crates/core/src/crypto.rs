//! Integration credential sealing.
//!
//! Device passwords are stored as AES-256-GCM ciphertext under a per-tenant
//! key derived as `HMAC-SHA256(master, tenant_id)`.
//! Sealed layout: `nonce (12 bytes) || ciphertext || tag (16 bytes)`.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::types::DbId;

const KEY_LENGTH: usize = 32;
const NONCE_LENGTH: usize = 12;
const TAG_LENGTH: usize = 16;

type HmacSha256 = Hmac<Sha256>;

/// Errors raised while sealing or opening credentials.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("credential secret must not be empty")]
    EmptySecret,

    #[error("sealed credentials are too short")]
    TooShort,

    #[error("failed to encrypt credentials")]
    Encrypt,

    #[error("failed to decrypt credentials (wrong key or tampered data)")]
    Decrypt,

    #[error("decrypted credentials are not valid UTF-8")]
    NotUtf8,

    #[error("key derivation failed")]
    KeyDerivation,
}

/// Seals and opens integration passwords.
#[derive(Clone)]
pub struct CredentialCipher {
    master_key: [u8; KEY_LENGTH],
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCipher").finish_non_exhaustive()
    }
}

impl CredentialCipher {
    /// Build a cipher from an operator-supplied secret of any length.
    pub fn from_secret(secret: &str) -> Result<Self, CredentialError> {
        if secret.is_empty() {
            return Err(CredentialError::EmptySecret);
        }
        let digest = Sha256::digest(secret.as_bytes());
        let mut master_key = [0u8; KEY_LENGTH];
        master_key.copy_from_slice(&digest);
        Ok(Self { master_key })
    }

    fn tenant_cipher(&self, tenant_id: DbId) -> Result<Aes256Gcm, CredentialError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.master_key)
            .map_err(|_| CredentialError::KeyDerivation)?;
        mac.update(tenant_id.as_bytes());
        let key = mac.finalize().into_bytes();
        Aes256Gcm::new_from_slice(&key).map_err(|_| CredentialError::KeyDerivation)
    }

    /// Seal a plaintext password for `tenant_id`.
    pub fn seal(&self, tenant_id: DbId, plaintext: &str) -> Result<Vec<u8>, CredentialError> {
        let cipher = self.tenant_cipher(tenant_id)?;

        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        rand::rng().fill_bytes(&mut nonce_bytes);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| CredentialError::Encrypt)?;

        let mut sealed = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Open credentials sealed by [`seal`](Self::seal) for the same tenant.
    pub fn open(&self, tenant_id: DbId, sealed: &[u8]) -> Result<String, CredentialError> {
        if sealed.len() < NONCE_LENGTH + TAG_LENGTH {
            return Err(CredentialError::TooShort);
        }
        let cipher = self.tenant_cipher(tenant_id)?;
        let (nonce, ciphertext) = sealed.split_at(NONCE_LENGTH);

        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CredentialError::Decrypt)?;

        String::from_utf8(plaintext).map_err(|_| CredentialError::NotUtf8)
    }
}
