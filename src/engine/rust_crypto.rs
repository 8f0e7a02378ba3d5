use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{AeadInPlace, KeyInit, Nonce, Tag};
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm};
use rand::RngCore;
use zeroize::{Zeroize, Zeroizing};

use super::CryptoEngine;
use crate::capability::CipherCapability;
use crate::error::*;
use crate::key::{Curve, EcPrivateKey, EcPublicKey};

pub(super) type Aes192Gcm = AesGcm<aes_gcm::aes::Aes192, U12>;

const GCM_IV_LEN: usize = 12;
const GCM_TAG_LEN: usize = 16;

fn available_ciphers() -> Vec<&'static str> {
    let candidates: [(&'static str, bool); 3] = [
        ("aes-128-gcm", Aes128Gcm::new_from_slice(&[0u8; 16]).is_ok()),
        ("aes-192-gcm", Aes192Gcm::new_from_slice(&[0u8; 24]).is_ok()),
        ("aes-256-gcm", Aes256Gcm::new_from_slice(&[0u8; 32]).is_ok()),
    ];
    candidates
        .into_iter()
        .filter_map(|(name, usable)| usable.then_some(name))
        .collect()
}

static CIPHERS: CipherCapability = CipherCapability::new(available_ciphers);

/// Engine built on the RustCrypto elliptic curve and AEAD crates, and `x25519-dalek`.
///
/// Supports P-256, P-384, P-521 and X25519 key agreement, and AES-GCM with 128, 192
/// and 256-bit keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCryptoEngine;

pub(super) fn gcm_encrypt<C: AeadInPlace + KeyInit>(
    key: &[u8],
    iv: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), Error> {
    let cipher = C::new_from_slice(key).map_err(engine_failure)?;
    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::<C>::from_slice(iv), aad, &mut buffer)
        .map_err(engine_failure)?;
    Ok((buffer, tag.to_vec()))
}

pub(super) fn gcm_decrypt<C: AeadInPlace + KeyInit>(
    key: &[u8],
    iv: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> Result<Vec<u8>, Error> {
    let cipher = C::new_from_slice(key).map_err(engine_failure)?;
    let mut buffer = ciphertext.to_vec();
    if cipher
        .decrypt_in_place_detached(
            Nonce::<C>::from_slice(iv),
            aad,
            &mut buffer,
            Tag::<C>::from_slice(tag),
        )
        .is_err()
    {
        buffer.zeroize();
        bail!(JWEError::CryptoEngineFailure);
    }
    Ok(buffer)
}

impl CryptoEngine for RustCryptoEngine {
    fn name(&self) -> &'static str {
        "rust-crypto"
    }

    fn supports_curve(&self, curve: Curve) -> bool {
        !matches!(curve, Curve::X448)
    }

    fn generate_key_pair(&self, curve: Curve) -> Result<EcPrivateKey, Error> {
        EcPrivateKey::generate(curve)
    }

    fn diffie_hellman(
        &self,
        private_key: &EcPrivateKey,
        public_key: &EcPublicKey,
    ) -> Result<Zeroizing<Vec<u8>>, Error> {
        let curve = private_key.curve();
        ensure!(
            public_key.curve() == curve,
            JWEError::invalid_key_type("key agreement requires keys on the same curve")
        );
        let shared = match curve {
            Curve::P256 => {
                let sk = p256::SecretKey::from_slice(private_key.secret_bytes())
                    .map_err(|_| JWEError::InvalidKeyPair)?;
                let pk = p256::PublicKey::from_sec1_bytes(public_key.raw_bytes())
                    .map_err(|_| JWEError::InvalidPublicKey)?;
                let shared = p256::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine());
                shared.raw_secret_bytes().to_vec()
            }
            Curve::P384 => {
                let sk = p384::SecretKey::from_slice(private_key.secret_bytes())
                    .map_err(|_| JWEError::InvalidKeyPair)?;
                let pk = p384::PublicKey::from_sec1_bytes(public_key.raw_bytes())
                    .map_err(|_| JWEError::InvalidPublicKey)?;
                let shared = p384::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine());
                shared.raw_secret_bytes().to_vec()
            }
            Curve::P521 => {
                let sk = p521::SecretKey::from_slice(private_key.secret_bytes())
                    .map_err(|_| JWEError::InvalidKeyPair)?;
                let pk = p521::PublicKey::from_sec1_bytes(public_key.raw_bytes())
                    .map_err(|_| JWEError::InvalidPublicKey)?;
                let shared = p521::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine());
                shared.raw_secret_bytes().to_vec()
            }
            Curve::X25519 => {
                let mut d: [u8; 32] = private_key
                    .secret_bytes()
                    .try_into()
                    .map_err(|_| JWEError::InvalidKeyPair)?;
                let pk: [u8; 32] = public_key
                    .raw_bytes()
                    .try_into()
                    .map_err(|_| JWEError::InvalidPublicKey)?;
                let sk = x25519_dalek::StaticSecret::from(d);
                d.zeroize();
                let shared = sk.diffie_hellman(&x25519_dalek::PublicKey::from(pk));
                ensure!(shared.was_contributory(), JWEError::CryptoEngineFailure);
                shared.as_bytes().to_vec()
            }
            Curve::X448 => bail!(JWEError::UnsupportedCurve(curve.name().to_string())),
        };
        Ok(Zeroizing::new(shared))
    }

    fn sha256(&self, input: &[u8]) -> Result<[u8; 32], Error> {
        Ok(hmac_sha256::Hash::hash(input))
    }

    fn aes_gcm_encrypt(
        &self,
        key: &[u8],
        iv: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), Error> {
        ensure!(iv.len() == GCM_IV_LEN, JWEError::CryptoEngineFailure);
        match key.len() {
            16 => gcm_encrypt::<Aes128Gcm>(key, iv, aad, plaintext),
            24 => gcm_encrypt::<Aes192Gcm>(key, iv, aad, plaintext),
            32 => gcm_encrypt::<Aes256Gcm>(key, iv, aad, plaintext),
            _ => bail!(JWEError::CryptoEngineFailure),
        }
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
        match key.len() {
            16 => gcm_decrypt::<Aes128Gcm>(key, iv, aad, ciphertext, tag),
            24 => gcm_decrypt::<Aes192Gcm>(key, iv, aad, ciphertext, tag),
            32 => gcm_decrypt::<Aes256Gcm>(key, iv, aad, ciphertext, tag),
            _ => bail!(JWEError::CryptoEngineFailure),
        }
    }

    fn fill_random(&self, out: &mut [u8]) -> Result<(), Error> {
        rand::thread_rng().fill_bytes(out);
        Ok(())
    }

    fn ciphers(&self) -> &CipherCapability {
        &CIPHERS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dh_agrees() {
        let engine = RustCryptoEngine;
        for curve in [Curve::P256, Curve::P384, Curve::P521, Curve::X25519] {
            let alice = engine.generate_key_pair(curve).unwrap();
            let bob = engine.generate_key_pair(curve).unwrap();
            let z1 = engine.diffie_hellman(&alice, bob.public_key()).unwrap();
            let z2 = engine.diffie_hellman(&bob, alice.public_key()).unwrap();
            assert_eq!(*z1, *z2);
            assert_eq!(z1.len(), curve.field_size());
        }
    }

    #[test]
    fn dh_rejects_mixed_curves() {
        let engine = RustCryptoEngine;
        let alice = engine.generate_key_pair(Curve::P256).unwrap();
        let bob = engine.generate_key_pair(Curve::P384).unwrap();
        assert!(engine.diffie_hellman(&alice, bob.public_key()).is_err());
    }

    #[test]
    fn x25519_low_order_point_is_rejected() {
        let engine = RustCryptoEngine;
        let alice = engine.generate_key_pair(Curve::X25519).unwrap();
        let zero = EcPublicKey::from_bytes(Curve::X25519, &[0u8; 32]).unwrap();
        let err = engine.diffie_hellman(&alice, &zero).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<JWEError>(),
            Some(JWEError::CryptoEngineFailure)
        ));
    }

    #[test]
    fn gcm_roundtrip() {
        let engine = RustCryptoEngine;
        for key_len in [16, 24, 32] {
            let key = vec![7u8; key_len];
            let iv = [1u8; 12];
            let (ct, tag) = engine.aes_gcm_encrypt(&key, &iv, b"aad", b"payload").unwrap();
            let pt = engine.aes_gcm_decrypt(&key, &iv, b"aad", &ct, &tag).unwrap();
            assert_eq!(pt, b"payload");
            assert!(engine.aes_gcm_decrypt(&key, &iv, b"other", &ct, &tag).is_err());
        }
        assert!(engine.aes_gcm_encrypt(&[0u8; 20], &[0u8; 12], b"", b"x").is_err());
    }

    #[test]
    fn sha256_empty() {
        let digest = RustCryptoEngine.sha256(b"").unwrap();
        assert_eq!(digest[..4], [0xe3, 0xb0, 0xc4, 0x42]);
    }

    #[test]
    fn cipher_capabilities() {
        let ciphers = RustCryptoEngine.ciphers();
        assert!(ciphers.supports("aes-192-gcm"));
        assert!(!ciphers.supports("aes-128-cbc"));
    }
}
