use boring::bn::{BigNum, BigNumContext};
use boring::derive::Deriver;
use boring::ec::{EcGroup, EcKey, EcPoint, PointConversionForm};
use boring::nid::Nid;
use boring::pkey::{PKey, Private, Public};
use boring::symm::{Cipher, Crypter, Mode};
use zeroize::{Zeroize, Zeroizing};

use super::rust_crypto::{gcm_decrypt, gcm_encrypt, Aes192Gcm};
use super::CryptoEngine;
use crate::capability::CipherCapability;
use crate::error::*;
use crate::key::{Curve, EcPrivateKey, EcPublicKey};

const GCM_IV_LEN: usize = 12;
const GCM_TAG_LEN: usize = 16;

fn available_ciphers() -> Vec<&'static str> {
    ["aes-128-gcm", "aes-192-gcm", "aes-256-gcm"]
        .into_iter()
        .filter(|name| gcm_usable(name))
        .collect()
}

fn gcm_usable(name: &str) -> bool {
    let key_len = match name {
        "aes-128-gcm" => 16,
        "aes-192-gcm" => 24,
        "aes-256-gcm" => 32,
        _ => return false,
    };
    let key = vec![0u8; key_len];
    match gcm_cipher(&key) {
        Ok(GcmCipher::Boring(cipher)) => {
            Crypter::new(cipher, Mode::Encrypt, &key, Some(&[0u8; GCM_IV_LEN][..])).is_ok()
        }
        Ok(GcmCipher::Aes192) => {
            <Aes192Gcm as aes_gcm::aead::KeyInit>::new_from_slice(&key).is_ok()
        }
        Err(_) => false,
    }
}

static CIPHERS: CipherCapability = CipherCapability::new(available_ciphers);

/// Engine built on BoringSSL.
///
/// Supports P-256, P-384 and P-521 key agreement, and AES-GCM with 128, 192 and 256-bit
/// keys. 192-bit keys go through the RustCrypto AEAD.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoringEngine;

fn group(curve: Curve) -> Result<EcGroup, Error> {
    let nid = match curve {
        Curve::P256 => Nid::X9_62_PRIME256V1,
        Curve::P384 => Nid::SECP384R1,
        Curve::P521 => Nid::SECP521R1,
        _ => bail!(JWEError::UnsupportedCurve(curve.name().to_string())),
    };
    Ok(EcGroup::from_curve_name(nid).map_err(engine_failure)?)
}

fn public_pkey(public_key: &EcPublicKey) -> Result<PKey<Public>, Error> {
    let group = group(public_key.curve())?;
    let mut ctx = BigNumContext::new().map_err(engine_failure)?;
    let point = EcPoint::from_bytes(&group, public_key.raw_bytes(), &mut ctx)
        .map_err(|_| JWEError::InvalidPublicKey)?;
    let ec_key = EcKey::from_public_key(&group, &point).map_err(|_| JWEError::InvalidPublicKey)?;
    ec_key.check_key().map_err(|_| JWEError::InvalidPublicKey)?;
    Ok(PKey::from_ec_key(ec_key).map_err(engine_failure)?)
}

fn private_pkey(private_key: &EcPrivateKey) -> Result<PKey<Private>, Error> {
    let group = group(private_key.curve())?;
    let mut ctx = BigNumContext::new().map_err(engine_failure)?;
    let d = BigNum::from_slice(private_key.secret_bytes()).map_err(engine_failure)?;
    let point = EcPoint::from_bytes(&group, private_key.public_key().raw_bytes(), &mut ctx)
        .map_err(|_| JWEError::InvalidKeyPair)?;
    let ec_key =
        EcKey::from_private_components(&group, &d, &point).map_err(|_| JWEError::InvalidKeyPair)?;
    Ok(PKey::from_ec_key(ec_key).map_err(engine_failure)?)
}

enum GcmCipher {
    Boring(Cipher),
    Aes192,
}

fn gcm_cipher(key: &[u8]) -> Result<GcmCipher, Error> {
    match key.len() {
        16 => Ok(GcmCipher::Boring(Cipher::aes_128_gcm())),
        24 => Ok(GcmCipher::Aes192),
        32 => Ok(GcmCipher::Boring(Cipher::aes_256_gcm())),
        _ => bail!(JWEError::CryptoEngineFailure),
    }
}

impl CryptoEngine for BoringEngine {
    fn name(&self) -> &'static str {
        "boringssl"
    }

    fn supports_curve(&self, curve: Curve) -> bool {
        matches!(curve, Curve::P256 | Curve::P384 | Curve::P521)
    }

    fn generate_key_pair(&self, curve: Curve) -> Result<EcPrivateKey, Error> {
        let group = group(curve)?;
        let ec_key = EcKey::generate(&group).map_err(engine_failure)?;
        let mut ctx = BigNumContext::new().map_err(engine_failure)?;
        let public = ec_key
            .public_key()
            .to_bytes(&group, PointConversionForm::UNCOMPRESSED, &mut ctx)
            .map_err(engine_failure)?;
        let d = Zeroizing::new(ec_key.private_key().to_vec());
        let n = curve.field_size();
        ensure!(d.len() <= n, JWEError::CryptoEngineFailure);
        let mut padded = vec![0u8; n];
        padded[n - d.len()..].copy_from_slice(&d);
        Ok(EcPrivateKey::from_parts(
            padded,
            EcPublicKey::from_parts(curve, public),
        ))
    }

    fn diffie_hellman(
        &self,
        private_key: &EcPrivateKey,
        public_key: &EcPublicKey,
    ) -> Result<Zeroizing<Vec<u8>>, Error> {
        ensure!(
            public_key.curve() == private_key.curve(),
            JWEError::invalid_key_type("key agreement requires keys on the same curve")
        );
        let sk = private_pkey(private_key)?;
        let pk = public_pkey(public_key)?;
        let mut deriver = Deriver::new(&sk).map_err(engine_failure)?;
        deriver.set_peer(&pk).map_err(engine_failure)?;
        let shared = deriver.derive_to_vec().map_err(engine_failure)?;
        Ok(Zeroizing::new(shared))
    }

    fn sha256(&self, input: &[u8]) -> Result<[u8; 32], Error> {
        Ok(boring::sha::sha256(input))
    }

    fn aes_gcm_encrypt(
        &self,
        key: &[u8],
        iv: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), Error> {
        ensure!(iv.len() == GCM_IV_LEN, JWEError::CryptoEngineFailure);
        let cipher = match gcm_cipher(key)? {
            GcmCipher::Boring(cipher) => cipher,
            GcmCipher::Aes192 => return gcm_encrypt::<Aes192Gcm>(key, iv, aad, plaintext),
        };

        let mut crypter =
            Crypter::new(cipher, Mode::Encrypt, key, Some(iv)).map_err(engine_failure)?;
        crypter.aad_update(aad).map_err(engine_failure)?;

        let mut ciphertext = vec![0u8; plaintext.len() + cipher.block_size()];
        let mut count = crypter
            .update(plaintext, &mut ciphertext)
            .map_err(engine_failure)?;
        count += crypter
            .finalize(&mut ciphertext[count..])
            .map_err(engine_failure)?;
        ciphertext.truncate(count);

        let mut tag = vec![0u8; GCM_TAG_LEN];
        crypter.get_tag(&mut tag).map_err(engine_failure)?;

        Ok((ciphertext, tag))
    }

    fn aes_gcm_decrypt(
        &self,
        key: &[u8],
        iv: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, Error> {
        ensure!(
            iv.len() == GCM_IV_LEN && tag.len() == GCM_TAG_LEN,
            JWEError::CryptoEngineFailure
        );
        let cipher = match gcm_cipher(key)? {
            GcmCipher::Boring(cipher) => cipher,
            GcmCipher::Aes192 => return gcm_decrypt::<Aes192Gcm>(key, iv, aad, ciphertext, tag),
        };

        let mut crypter =
            Crypter::new(cipher, Mode::Decrypt, key, Some(iv)).map_err(engine_failure)?;
        crypter.aad_update(aad).map_err(engine_failure)?;
        crypter.set_tag(tag).map_err(engine_failure)?;

        let mut plaintext = vec![0u8; ciphertext.len() + cipher.block_size()];
        let mut count = crypter
            .update(ciphertext, &mut plaintext)
            .map_err(engine_failure)?;
        match crypter.finalize(&mut plaintext[count..]) {
            Ok(n) => count += n,
            Err(_) => {
                plaintext.zeroize();
                bail!(JWEError::CryptoEngineFailure);
            }
        }
        plaintext.truncate(count);

        Ok(plaintext)
    }

    fn fill_random(&self, out: &mut [u8]) -> Result<(), Error> {
        boring::rand::rand_bytes(out).map_err(engine_failure)?;
        Ok(())
    }

    fn ciphers(&self) -> &CipherCapability {
        &CIPHERS
    }
}
