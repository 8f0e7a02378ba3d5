//! RSAES key encryption: RSA1_5 and RSA-OAEP.
//!
//! Note: RSA-OAEP-256, RSA-OAEP-384 and RSA-OAEP-512 are recognized but rejected, as the
//! boring/superboring crates do not expose the API to specify the OAEP hash function.

#[cfg(any(feature = "pure-rust", target_arch = "wasm32", target_arch = "wasm64"))]
use superboring as boring;

use boring::pkey::{Private, Public};
use boring::rsa::{Padding, Rsa};
use zeroize::Zeroize;

use super::alg::KeyManagementAlgorithm;
use super::content::ContentEncryptionKey;
use crate::error::*;

const MIN_RSA_MODULUS_BITS: u32 = 2048;

fn padding(alg: KeyManagementAlgorithm) -> Result<Padding, Error> {
    match alg {
        KeyManagementAlgorithm::Rsa1_5 => Ok(Padding::PKCS1),
        KeyManagementAlgorithm::RsaOaep => Ok(Padding::PKCS1_OAEP),
        KeyManagementAlgorithm::RsaOaep256
        | KeyManagementAlgorithm::RsaOaep384
        | KeyManagementAlgorithm::RsaOaep512 => bail!(JWEError::UnsupportedAlgorithm(format!(
            "{} (OAEP digest selection is not available)",
            alg.name()
        ))),
        _ => bail!(JWEError::UnsupportedAlgorithm(alg.name().to_string())),
    }
}

/// RSA public key, used to encrypt a CEK.
#[derive(Debug, Clone)]
pub struct RsaPublicKey {
    pk: Rsa<Public>,
}

impl RsaPublicKey {
    /// Create a key from DER (SPKI or PKCS#1).
    pub fn from_der(der: &[u8]) -> Result<Self, Error> {
        let pk = Rsa::<Public>::public_key_from_der(der)
            .or_else(|_| Rsa::<Public>::public_key_from_der_pkcs1(der))?;
        Self::validate_key_size(&pk)?;
        Ok(RsaPublicKey { pk })
    }

    /// Create a key from PEM (SPKI or PKCS#1).
    pub fn from_pem(pem: &str) -> Result<Self, Error> {
        let pem = pem.trim();
        let pk = Rsa::<Public>::public_key_from_pem(pem.as_bytes())
            .or_else(|_| Rsa::<Public>::public_key_from_pem_pkcs1(pem.as_bytes()))?;
        Self::validate_key_size(&pk)?;
        Ok(RsaPublicKey { pk })
    }

    pub fn to_der(&self) -> Result<Vec<u8>, Error> {
        self.pk.public_key_to_der().map_err(Into::into)
    }

    pub fn to_pem(&self) -> Result<String, Error> {
        let bytes = self.pk.public_key_to_pem()?;
        Ok(String::from_utf8(bytes)?)
    }

    pub fn modulus_bits(&self) -> u32 {
        self.pk.size() * 8
    }

    fn validate_key_size(pk: &Rsa<Public>) -> Result<(), Error> {
        ensure!(pk.size() * 8 >= MIN_RSA_MODULUS_BITS, JWEError::WeakKey);
        Ok(())
    }
}

/// RSA key pair, used to decrypt a CEK.
#[derive(Clone)]
pub struct RsaPrivateKey {
    sk: Rsa<Private>,
}

impl std::fmt::Debug for RsaPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaPrivateKey")
            .field("modulus_bits", &(self.sk.size() * 8))
            .finish_non_exhaustive()
    }
}

impl RsaPrivateKey {
    /// Create a key pair from a DER-encoded private key.
    pub fn from_der(der: &[u8]) -> Result<Self, Error> {
        let sk = Rsa::<Private>::private_key_from_der(der)?;
        Self::validate(sk)
    }

    /// Create a key pair from a PEM-encoded private key.
    pub fn from_pem(pem: &str) -> Result<Self, Error> {
        let pem = pem.trim();
        let sk = Rsa::<Private>::private_key_from_pem(pem.as_bytes())?;
        Self::validate(sk)
    }

    /// Generate a new RSA key pair.
    pub fn generate(modulus_bits: usize) -> Result<Self, Error> {
        match modulus_bits {
            2048 | 3072 | 4096 => {}
            _ => bail!(JWEError::UnsupportedRSAModulus),
        };
        let sk = Rsa::<Private>::generate(modulus_bits as u32)?;
        Ok(RsaPrivateKey { sk })
    }

    pub fn to_der(&self) -> Result<Vec<u8>, Error> {
        self.sk.private_key_to_der().map_err(Into::into)
    }

    pub fn to_pem(&self) -> Result<String, Error> {
        let bytes = self.sk.private_key_to_pem()?;
        Ok(String::from_utf8(bytes)?)
    }

    /// Get the public key.
    pub fn public_key(&self) -> Result<RsaPublicKey, Error> {
        let pk = Rsa::<Public>::from_public_components(self.sk.n().to_owned()?, self.sk.e().to_owned()?)?;
        Ok(RsaPublicKey { pk })
    }

    fn validate(sk: Rsa<Private>) -> Result<Self, Error> {
        if !sk.check_key()? {
            bail!(JWEError::InvalidKeyPair);
        }
        ensure!(sk.size() * 8 >= MIN_RSA_MODULUS_BITS, JWEError::WeakKey);
        Ok(RsaPrivateKey { sk })
    }
}

/// Encrypt `cek` with the recipient's public key.
pub fn encrypt(
    alg: KeyManagementAlgorithm,
    key: &RsaPublicKey,
    cek: &[u8],
) -> Result<Vec<u8>, Error> {
    let padding = padding(alg)?;
    let mut encrypted = vec![0u8; key.pk.size() as usize];
    let encrypted_len = key
        .pk
        .public_encrypt(cek, &mut encrypted, padding)
        .map_err(engine_failure)?;
    encrypted.truncate(encrypted_len);

    Ok(encrypted)
}

/// Decrypt a CEK encrypted by [`encrypt`].
pub fn decrypt(
    alg: KeyManagementAlgorithm,
    key: &RsaPrivateKey,
    encrypted_key: &[u8],
) -> Result<ContentEncryptionKey, Error> {
    let padding = padding(alg)?;
    let mut cek = vec![0u8; key.sk.size() as usize];
    let cek_len = match key.sk.private_decrypt(encrypted_key, &mut cek, padding) {
        Ok(len) => len,
        Err(_) => {
            cek.zeroize();
            bail!(JWEError::CryptoEngineFailure);
        }
    };
    cek.truncate(cek_len);

    Ok(ContentEncryptionKey::new(cek))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let sk = RsaPrivateKey::generate(2048).unwrap();
        let pk = sk.public_key().unwrap();
        assert_eq!(pk.modulus_bits(), 2048);
        for alg in [KeyManagementAlgorithm::Rsa1_5, KeyManagementAlgorithm::RsaOaep] {
            let cek = [0x33u8; 32];
            let encrypted = encrypt(alg, &pk, &cek).unwrap();
            assert_eq!(encrypted.len(), 256);
            let decrypted = decrypt(alg, &sk, &encrypted).unwrap();
            assert_eq!(decrypted.as_bytes(), &cek);
        }
    }

    #[test]
    fn oaep_with_sha2_is_unsupported() {
        let sk = RsaPrivateKey::generate(2048).unwrap();
        let pk = sk.public_key().unwrap();
        let err = encrypt(KeyManagementAlgorithm::RsaOaep256, &pk, &[0u8; 16]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<JWEError>(),
            Some(JWEError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn der_roundtrip_and_modulus_checks() {
        let sk = RsaPrivateKey::generate(2048).unwrap();
        let der = sk.to_der().unwrap();
        let imported = RsaPrivateKey::from_der(&der).unwrap();
        let pk = RsaPublicKey::from_der(&imported.public_key().unwrap().to_der().unwrap()).unwrap();
        let encrypted = encrypt(KeyManagementAlgorithm::RsaOaep, &pk, &[1u8; 16]).unwrap();
        assert!(decrypt(KeyManagementAlgorithm::RsaOaep, &sk, &encrypted).is_ok());

        let err = RsaPrivateKey::generate(1024).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<JWEError>(),
            Some(JWEError::UnsupportedRSAModulus)
        ));
    }
}
