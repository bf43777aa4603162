//! Token encryption module
//!
//! Upstream OAuth tokens are stored encrypted with AES-256-GCM. The key is
//! derived once from the configured secret via SHA-256; ciphertexts are
//! stored as `nonce:tag:ciphertext` in hex. Values that do not parse or
//! authenticate decrypt to themselves, which keeps pre-encryption legacy
//! rows readable.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, Nonce};
use sha2::{Digest, Sha256};

use crate::error::EngineError;

/// GCM authentication tag length in bytes
const TAG_LEN: usize = 16;

/// AES-256-GCM cipher for tokens at rest
#[derive(Clone)]
pub struct TokenCipher {
    key: [u8; 32],
}

impl TokenCipher {
    /// Derives the 32-byte key from the configured secret
    pub fn from_secret(secret: &str) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        Self { key }
    }

    /// Encrypts a token to `nonce:tag:ciphertext` hex
    pub fn encrypt(&self, plaintext: &str) -> Result<String, EngineError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let sealed = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| EngineError::Configuration("token encryption failed".to_string()))?;

        // aes-gcm appends the tag to the ciphertext
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);

        Ok(format!(
            "{}:{}:{}",
            hex::encode(nonce),
            hex::encode(tag),
            hex::encode(ciphertext)
        ))
    }

    /// Decrypts a stored value; anything that fails to parse or
    /// authenticate is returned unchanged (legacy plaintext token)
    pub fn decrypt(&self, stored: &str) -> String {
        match self.try_decrypt(stored) {
            Some(plaintext) => plaintext,
            None => stored.to_string(),
        }
    }

    fn try_decrypt(&self, stored: &str) -> Option<String> {
        let parts: Vec<&str> = stored.split(':').collect();
        if parts.len() != 3 {
            return None;
        }

        let nonce_bytes = hex::decode(parts[0]).ok()?;
        let tag = hex::decode(parts[1]).ok()?;
        let ciphertext = hex::decode(parts[2]).ok()?;
        if nonce_bytes.len() != 12 || tag.len() != TAG_LEN {
            return None;
        }

        let mut sealed = ciphertext;
        sealed.extend_from_slice(&tag);

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), sealed.as_slice())
            .ok()?;

        String::from_utf8(plaintext).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let cipher = TokenCipher::from_secret("a-32-byte-development-secret!!!!");
        let stored = cipher.encrypt("ghs_exampletoken123").unwrap();

        assert_ne!(stored, "ghs_exampletoken123");
        assert_eq!(stored.split(':').count(), 3);
        assert_eq!(cipher.decrypt(&stored), "ghs_exampletoken123");
    }

    #[test]
    fn test_ciphertext_never_contains_plaintext() {
        let cipher = TokenCipher::from_secret("key");
        let stored = cipher.encrypt("supersecret").unwrap();
        assert!(!stored.contains("supersecret"));
    }

    #[test]
    fn test_legacy_plaintext_falls_through() {
        let cipher = TokenCipher::from_secret("key");
        assert_eq!(cipher.decrypt("ghs_plaintext"), "ghs_plaintext");
        // Colon-shaped but not valid hex/ciphertext
        assert_eq!(cipher.decrypt("aa:bb:cc"), "aa:bb:cc");
        assert_eq!(cipher.decrypt("not:hex at all:zz"), "not:hex at all:zz");
    }

    #[test]
    fn test_wrong_key_falls_through() {
        let cipher = TokenCipher::from_secret("key-one");
        let other = TokenCipher::from_secret("key-two");
        let stored = cipher.encrypt("token").unwrap();
        assert_eq!(other.decrypt(&stored), stored);
    }

    #[test]
    fn test_nonces_are_random() {
        let cipher = TokenCipher::from_secret("key");
        let a = cipher.encrypt("token").unwrap();
        let b = cipher.encrypt("token").unwrap();
        assert_ne!(a, b);
    }
}
