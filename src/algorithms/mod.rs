pub mod aes_gcm_kw;
pub mod aes_kw;
pub mod alg;
pub mod content;
pub mod ecdh;
pub mod pbes2;
pub mod rsa;

pub use self::alg::{AgreementScheme, KeyManagementAlgorithm, KeyManagementFamily};
pub use self::content::{ContentEncryption, ContentEncryptionKey};
pub use self::rsa::{RsaPrivateKey, RsaPublicKey};
