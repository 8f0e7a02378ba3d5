//! Crypto engines.
//!
//! Key management never touches a cryptographic backend directly. It goes through a
//! [`CryptoEngine`], which translates the crate's key representations into its own and
//! reports which curves and ciphers it can run.
//!
//! Two engines are provided: [`RustCryptoEngine`], built on RustCrypto and dalek crates,
//! and `BoringEngine`, built on BoringSSL (enabled by the default `optimal` feature).

use std::sync::Arc;

use crate::capability::CipherCapability;
use crate::error::*;
use crate::key::{Curve, EcPrivateKey, EcPublicKey};

#[cfg(all(
    feature = "boring",
    not(any(feature = "pure-rust", target_arch = "wasm32", target_arch = "wasm64"))
))]
mod boring_engine;
mod rust_crypto;

#[cfg(all(
    feature = "boring",
    not(any(feature = "pure-rust", target_arch = "wasm32", target_arch = "wasm64"))
))]
pub use boring_engine::BoringEngine;
pub use rust_crypto::RustCryptoEngine;

/// Backend for the cryptographic primitives key management relies on.
pub trait CryptoEngine: Send + Sync {
    /// Engine name, for logs.
    fn name(&self) -> &'static str;

    /// Return `true` if key agreement over `curve` is available.
    fn supports_curve(&self, curve: Curve) -> bool;

    /// Generate an ephemeral key pair.
    fn generate_key_pair(&self, curve: Curve) -> Result<EcPrivateKey, Error>;

    /// Raw Diffie-Hellman shared secret between `private_key` and `public_key`.
    fn diffie_hellman(
        &self,
        private_key: &EcPrivateKey,
        public_key: &EcPublicKey,
    ) -> Result<zeroize::Zeroizing<Vec<u8>>, Error>;

    fn sha256(&self, input: &[u8]) -> Result<[u8; 32], Error>;

    /// AES-GCM encryption. Returns `(ciphertext, tag)`.
    fn aes_gcm_encrypt(
        &self,
        key: &[u8],
        iv: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), Error>;

    /// AES-GCM decryption. Fails with [`JWEError::CryptoEngineFailure`] if the tag doesn't verify.
    fn aes_gcm_decrypt(
        &self,
        key: &[u8],
        iv: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, Error>;

    fn fill_random(&self, out: &mut [u8]) -> Result<(), Error>;

    /// Symmetric ciphers available on this engine.
    fn ciphers(&self) -> &CipherCapability;
}

/// The engine used when none is specified.
#[cfg(all(
    feature = "boring",
    not(any(feature = "pure-rust", target_arch = "wasm32", target_arch = "wasm64"))
))]
pub fn default_engine() -> Arc<dyn CryptoEngine> {
    Arc::new(BoringEngine)
}

/// The engine used when none is specified.
#[cfg(not(all(
    feature = "boring",
    not(any(feature = "pure-rust", target_arch = "wasm32", target_arch = "wasm64"))
)))]
pub fn default_engine() -> Arc<dyn CryptoEngine> {
    Arc::new(RustCryptoEngine)
}
