//! Content encryption algorithms (`enc` header values).
//!
//! Content encryption itself happens elsewhere; key management only needs to know how
//! large a CEK must be and which cipher backs each algorithm.

use zeroize::Zeroize;

use crate::engine::CryptoEngine;
use crate::error::*;

/// Content encryption algorithm identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContentEncryption {
    A128GCM,
    A192GCM,
    #[default]
    A256GCM,
    A128CbcHs256,
    A192CbcHs384,
    A256CbcHs512,
    /// ChaCha20-Poly1305 (draft)
    C20P,
    /// XChaCha20-Poly1305 (draft)
    XC20P,
}

impl ContentEncryption {
    pub const ALL: [ContentEncryption; 8] = [
        ContentEncryption::A128GCM,
        ContentEncryption::A192GCM,
        ContentEncryption::A256GCM,
        ContentEncryption::A128CbcHs256,
        ContentEncryption::A192CbcHs384,
        ContentEncryption::A256CbcHs512,
        ContentEncryption::C20P,
        ContentEncryption::XC20P,
    ];

    /// Get the JWE "enc" header value for this algorithm.
    pub fn alg_name(&self) -> &'static str {
        match self {
            ContentEncryption::A128GCM => "A128GCM",
            ContentEncryption::A192GCM => "A192GCM",
            ContentEncryption::A256GCM => "A256GCM",
            ContentEncryption::A128CbcHs256 => "A128CBC-HS256",
            ContentEncryption::A192CbcHs384 => "A192CBC-HS384",
            ContentEncryption::A256CbcHs512 => "A256CBC-HS512",
            ContentEncryption::C20P => "C20P",
            ContentEncryption::XC20P => "XC20P",
        }
    }

    /// Parse a content encryption algorithm from its JWE name.
    pub fn from_alg_name(name: &str) -> Result<Self, Error> {
        match Self::ALL.iter().find(|enc| enc.alg_name() == name) {
            Some(enc) => Ok(*enc),
            None => bail!(JWEError::UnsupportedAlgorithm(format!(
                "Unsupported JWE \"enc\" (Encryption Algorithm) header value: {}",
                name
            ))),
        }
    }

    /// Get the required key size in bytes.
    ///
    /// CBC-HMAC keys are the concatenation of the MAC key and the encryption key.
    pub fn key_size(&self) -> usize {
        match self {
            ContentEncryption::A128GCM => 16,
            ContentEncryption::A192GCM => 24,
            ContentEncryption::A256GCM => 32,
            ContentEncryption::A128CbcHs256 => 32,
            ContentEncryption::A192CbcHs384 => 48,
            ContentEncryption::A256CbcHs512 => 64,
            ContentEncryption::C20P | ContentEncryption::XC20P => 32,
        }
    }

    /// Get the IV size in bytes.
    pub fn iv_size(&self) -> usize {
        match self {
            ContentEncryption::A128CbcHs256
            | ContentEncryption::A192CbcHs384
            | ContentEncryption::A256CbcHs512 => 16,
            ContentEncryption::XC20P => 24,
            _ => 12,
        }
    }

    /// Get the authentication tag size in bytes.
    pub fn tag_size(&self) -> usize {
        match self {
            ContentEncryption::A192CbcHs384 => 24,
            ContentEncryption::A256CbcHs512 => 32,
            _ => 16,
        }
    }

    /// Name of the underlying cipher, as reported by crypto engines.
    pub fn cipher_name(&self) -> &'static str {
        match self {
            ContentEncryption::A128GCM => "aes-128-gcm",
            ContentEncryption::A192GCM => "aes-192-gcm",
            ContentEncryption::A256GCM => "aes-256-gcm",
            ContentEncryption::A128CbcHs256 => "aes-128-cbc",
            ContentEncryption::A192CbcHs384 => "aes-192-cbc",
            ContentEncryption::A256CbcHs512 => "aes-256-cbc",
            ContentEncryption::C20P => "chacha20-poly1305",
            ContentEncryption::XC20P => "xchacha20-poly1305",
        }
    }

    /// Draft algorithms are only usable when the engine reports their cipher.
    pub fn is_draft(&self) -> bool {
        matches!(self, ContentEncryption::C20P | ContentEncryption::XC20P)
    }

    /// Generate a random Content Encryption Key (CEK) for this algorithm.
    pub fn generate_cek(&self, engine: &dyn CryptoEngine) -> Result<ContentEncryptionKey, Error> {
        let mut cek = vec![0u8; self.key_size()];
        engine.fill_random(&mut cek)?;
        Ok(ContentEncryptionKey::new(cek))
    }

    /// Generate a random IV for this algorithm.
    pub fn generate_iv(&self, engine: &dyn CryptoEngine) -> Result<Vec<u8>, Error> {
        let mut iv = vec![0u8; self.iv_size()];
        engine.fill_random(&mut iv)?;
        Ok(iv)
    }
}

/// A Content Encryption Key (CEK) that is zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentEncryptionKey {
    key: Vec<u8>,
}

impl ContentEncryptionKey {
    /// Create a new CEK from bytes.
    pub fn new(key: Vec<u8>) -> Self {
        ContentEncryptionKey { key }
    }

    pub fn from_slice(key: &[u8]) -> Self {
        ContentEncryptionKey { key: key.to_vec() }
    }

    /// Get the key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }
}

impl std::fmt::Debug for ContentEncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentEncryptionKey")
            .field("len", &self.key.len())
            .finish_non_exhaustive()
    }
}

impl Drop for ContentEncryptionKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl AsRef<[u8]> for ContentEncryptionKey {
    fn as_ref(&self) -> &[u8] {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RustCryptoEngine;

    #[test]
    fn names_roundtrip() {
        for enc in ContentEncryption::ALL {
            assert_eq!(ContentEncryption::from_alg_name(enc.alg_name()).unwrap(), enc);
        }
        assert!(ContentEncryption::from_alg_name("A512GCM").is_err());
    }

    #[test]
    fn generated_cek_sizes() {
        let engine = RustCryptoEngine;
        for enc in ContentEncryption::ALL {
            let cek = enc.generate_cek(&engine).unwrap();
            assert_eq!(cek.len(), enc.key_size());
            assert_eq!(enc.generate_iv(&engine).unwrap().len(), enc.iv_size());
        }
        let a = ContentEncryption::A256GCM.generate_cek(&engine).unwrap();
        let b = ContentEncryption::A256GCM.generate_cek(&engine).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn only_chacha_variants_are_drafts() {
        for enc in ContentEncryption::ALL {
            assert_eq!(enc.is_draft(), enc.cipher_name().contains("chacha"));
        }
    }

    #[test]
    fn debug_hides_key_material() {
        let cek = ContentEncryptionKey::new(vec![0x42; 16]);
        assert!(!format!("{:?}", cek).contains("42"));
    }
}
