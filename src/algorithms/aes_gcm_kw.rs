//! Key wrapping with AES-GCM (A128GCMKW, A192GCMKW, A256GCMKW).

use ct_codecs::{Base64UrlSafeNoPadding, Encoder};

use super::alg::{KeyManagementAlgorithm, KeyManagementFamily};
use super::content::{ContentEncryption, ContentEncryptionKey};
use crate::engine::CryptoEngine;
use crate::error::*;
use crate::key::SecretKey;

/// A wrapped CEK, with the `iv` and `tag` header values needed to unwrap it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcmWrappedKey {
    pub encrypted_key: Vec<u8>,
    pub iv: String,
    pub tag: String,
}

/// `A128GCMKW` wraps with `A128GCM`, and so on.
fn wrapping_cipher(alg: KeyManagementAlgorithm) -> Result<ContentEncryption, Error> {
    ensure!(
        alg.family() == KeyManagementFamily::AesGcmKw,
        JWEError::UnsupportedAlgorithm(alg.name().to_string())
    );
    ContentEncryption::from_alg_name(&alg.name()[..7])
}

fn check_kek(
    engine: &dyn CryptoEngine,
    alg: KeyManagementAlgorithm,
    enc: ContentEncryption,
    key: &SecretKey,
) -> Result<(), Error> {
    ensure!(
        engine.ciphers().supports(enc.cipher_name()),
        JWEError::UnsupportedAlgorithm(format!(
            "{} is not supported by the {} engine",
            alg.name(),
            engine.name()
        ))
    );
    ensure!(
        key.len() == enc.key_size(),
        JWEError::invalid_key_type(format!(
            "{} requires a {}-bit key",
            alg.name(),
            enc.key_size() * 8
        ))
    );
    Ok(())
}

/// Encrypt `cek` with `key`. A random IV is generated when none is provided.
pub fn wrap(
    engine: &dyn CryptoEngine,
    alg: KeyManagementAlgorithm,
    key: &SecretKey,
    cek: &[u8],
    iv: Option<&[u8]>,
) -> Result<GcmWrappedKey, Error> {
    let enc = wrapping_cipher(alg)?;
    check_kek(engine, alg, enc, key)?;
    let iv = match iv {
        Some(iv) => {
            ensure!(
                iv.len() == enc.iv_size(),
                JWEError::precondition("AES-GCM key wrapping requires a 96-bit IV")
            );
            iv.to_vec()
        }
        None => enc.generate_iv(engine)?,
    };
    let (encrypted_key, tag) = engine.aes_gcm_encrypt(key.as_bytes(), &iv, &[], cek)?;
    Ok(GcmWrappedKey {
        encrypted_key,
        iv: Base64UrlSafeNoPadding::encode_to_string(&iv)?,
        tag: Base64UrlSafeNoPadding::encode_to_string(&tag)?,
    })
}

/// Decrypt a CEK wrapped by [`wrap`].
pub fn unwrap(
    engine: &dyn CryptoEngine,
    alg: KeyManagementAlgorithm,
    key: &SecretKey,
    encrypted_key: &[u8],
    iv: &[u8],
    tag: &[u8],
) -> Result<ContentEncryptionKey, Error> {
    let enc = wrapping_cipher(alg)?;
    check_kek(engine, alg, enc, key)?;
    ensure!(
        iv.len() == enc.iv_size(),
        JWEError::precondition("Invalid Initialization Vector length")
    );
    ensure!(
        tag.len() == enc.tag_size(),
        JWEError::precondition("Invalid Authentication Tag length")
    );
    let cek = engine.aes_gcm_decrypt(key.as_bytes(), iv, &[], encrypted_key, tag)?;
    Ok(ContentEncryptionKey::new(cek))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RustCryptoEngine;
    use ct_codecs::Decoder;

    const ALGS: [KeyManagementAlgorithm; 3] = [
        KeyManagementAlgorithm::A128GCMKW,
        KeyManagementAlgorithm::A192GCMKW,
        KeyManagementAlgorithm::A256GCMKW,
    ];

    fn decode(s: &str) -> Vec<u8> {
        Base64UrlSafeNoPadding::decode_to_vec(s, None).unwrap()
    }

    #[test]
    fn roundtrip() {
        let engine = RustCryptoEngine;
        for alg in ALGS {
            let key = SecretKey::generate(alg.kek_bits().unwrap() / 8);
            let cek = [0x5au8; 32];
            let wrapped = wrap(&engine, alg, &key, &cek, None).unwrap();
            assert_eq!(wrapped.encrypted_key.len(), cek.len());
            assert_eq!(decode(&wrapped.iv).len(), 12);
            assert_eq!(decode(&wrapped.tag).len(), 16);

            let unwrapped = unwrap(
                &engine,
                alg,
                &key,
                &wrapped.encrypted_key,
                &decode(&wrapped.iv),
                &decode(&wrapped.tag),
            )
            .unwrap();
            assert_eq!(unwrapped.as_bytes(), &cek);
        }
    }

    #[test]
    fn provided_iv_is_echoed() {
        let engine = RustCryptoEngine;
        let key = SecretKey::generate(16);
        let iv = [0x24u8; 12];
        let wrapped = wrap(&engine, KeyManagementAlgorithm::A128GCMKW, &key, &[1u8; 16], Some(&iv)).unwrap();
        assert_eq!(decode(&wrapped.iv), iv);

        let err = wrap(&engine, KeyManagementAlgorithm::A128GCMKW, &key, &[1u8; 16], Some(&iv[..8]))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<JWEError>(),
            Some(JWEError::PreconditionViolation(_))
        ));
    }

    #[test]
    fn tampered_tag_fails() {
        let engine = RustCryptoEngine;
        let alg = KeyManagementAlgorithm::A256GCMKW;
        let key = SecretKey::generate(32);
        let wrapped = wrap(&engine, alg, &key, &[7u8; 32], None).unwrap();
        let mut tag = decode(&wrapped.tag);
        tag[15] ^= 0x80;
        let err = unwrap(&engine, alg, &key, &wrapped.encrypted_key, &decode(&wrapped.iv), &tag)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<JWEError>(),
            Some(JWEError::CryptoEngineFailure)
        ));
    }

    #[test]
    fn wrong_key_size_is_rejected() {
        let engine = RustCryptoEngine;
        let key = SecretKey::generate(32);
        let err = wrap(&engine, KeyManagementAlgorithm::A128GCMKW, &key, &[0u8; 16], None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<JWEError>(),
            Some(JWEError::InvalidKeyType(_))
        ));
        assert!(wrap(&engine, KeyManagementAlgorithm::A128KW, &key, &[0u8; 16], None).is_err());
    }
}
