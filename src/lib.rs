//! JWE key management.
//!
//! This crate implements the key management layer of JSON Web Encryption (RFC 7516,
//! RFC 7518): given a key management algorithm (`alg`) and a content encryption algorithm
//! (`enc`), it produces or recovers the content encryption key (CEK).
//!
//! Supported algorithms:
//!
//! - `dir`
//! - `ECDH-ES`, `ECDH-ES+A128KW`, `ECDH-ES+A192KW`, `ECDH-ES+A256KW`
//! - `ECDH-1PU`, `ECDH-1PU+A128KW`, `ECDH-1PU+A192KW`, `ECDH-1PU+A256KW`
//! - `A128KW`, `A192KW`, `A256KW`
//! - `A128GCMKW`, `A192GCMKW`, `A256GCMKW`
//! - `PBES2-HS256+A128KW`, `PBES2-HS384+A192KW`, `PBES2-HS512+A256KW`
//! - `RSA1_5`, `RSA-OAEP`
//!
//! Cryptographic primitives are provided by a [`CryptoEngine`](engine::CryptoEngine).
//!
//! ```rust,ignore
//! use jwe_key_management::prelude::*;
//!
//! let recipient = EcPrivateKey::generate(Curve::P256)?;
//! let public_key: Key = recipient.export_public_key()?.clone().into();
//!
//! let res = encrypt_key_management(
//!     "ECDH-ES+A256KW", "A256GCM", &public_key, None, &KeyManagementParameters::default(), None,
//! )?;
//!
//! let cek = decrypt_key_management(
//!     "ECDH-ES+A256KW", "A256GCM", &recipient.into(), res.encrypted_key.as_deref(),
//!     res.parameters.as_ref().unwrap(), None,
//! )?;
//! assert_eq!(cek, res.cek);
//! ```

#![forbid(unsafe_code)]

pub mod algorithms;
pub mod capability;
pub mod common;
pub mod engine;
pub mod error;
pub mod header;
pub mod key;
pub mod key_management;

pub mod prelude {
    pub use crate::algorithms::{
        ContentEncryption, ContentEncryptionKey, KeyManagementAlgorithm, RsaPrivateKey,
        RsaPublicKey,
    };
    pub use crate::capability::CipherCapability;
    pub use crate::common::*;
    pub use crate::engine::{default_engine, CryptoEngine, RustCryptoEngine};
    pub use crate::error::{Error, JWEError};
    pub use crate::header::*;
    pub use crate::key::*;
    pub use crate::key_management::*;
}
