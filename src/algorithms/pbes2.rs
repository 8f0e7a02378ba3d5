//! Password-based key wrapping (RFC 7518 section 4.8).
//!
//! PBKDF2 derives the key encryption key from a password, salted with
//! `UTF8(alg) || 0x00 || p2s`, and the CEK is then wrapped with AES Key Wrap.

use ct_codecs::{Base64UrlSafeNoPadding, Encoder};
use pbkdf2::pbkdf2_hmac;
use sha2::{Sha256, Sha384, Sha512};
use zeroize::Zeroizing;

use super::aes_kw;
use super::alg::KeyManagementAlgorithm;
use super::content::ContentEncryptionKey;
use crate::error::*;
use crate::key::SecretKey;

/// Smallest accepted `p2s` salt input, in bytes.
pub const MIN_SALT_LEN: usize = 8;

type Pbkdf2 = fn(&[u8], &[u8], u32, &mut [u8]);

/// A wrapped CEK, with the `p2c` and `p2s` header values needed to unwrap it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pbes2WrappedKey {
    pub encrypted_key: Vec<u8>,
    pub p2c: u32,
    pub p2s: String,
}

fn pbkdf2(kdf: Pbkdf2, password: &[u8], salt: &[u8], iterations: u32, key_len: usize) -> Zeroizing<Vec<u8>> {
    let mut derived = Zeroizing::new(vec![0u8; key_len]);
    kdf(password, salt, iterations, &mut derived);
    derived
}

/// Derive the key encryption key, returning it with the key wrap algorithm it is for.
fn derive_kek(
    alg: KeyManagementAlgorithm,
    password: &SecretKey,
    p2c: u32,
    p2s: &[u8],
) -> Result<(KeyManagementAlgorithm, Zeroizing<Vec<u8>>), Error> {
    let kdf: Pbkdf2 = match alg {
        KeyManagementAlgorithm::Pbes2Hs256A128KW => pbkdf2_hmac::<Sha256>,
        KeyManagementAlgorithm::Pbes2Hs384A192KW => pbkdf2_hmac::<Sha384>,
        KeyManagementAlgorithm::Pbes2Hs512A256KW => pbkdf2_hmac::<Sha512>,
        _ => bail!(JWEError::UnsupportedAlgorithm(alg.name().to_string())),
    };
    ensure!(
        p2s.len() >= MIN_SALT_LEN,
        JWEError::precondition("PBES2 Salt Input must be 8 or more octets")
    );
    ensure!(
        p2c > 0,
        JWEError::precondition("PBES2 Count must be a positive integer")
    );
    let (kw, bits) = match (alg.key_wrap(), alg.kek_bits()) {
        (Some(kw), Some(bits)) => (kw, bits),
        _ => bail!(JWEError::UnsupportedAlgorithm(alg.name().to_string())),
    };

    let mut salt = Vec::with_capacity(alg.name().len() + 1 + p2s.len());
    salt.extend_from_slice(alg.name().as_bytes());
    salt.push(0);
    salt.extend_from_slice(p2s);

    Ok((kw, pbkdf2(kdf, password.as_bytes(), &salt, p2c, bits / 8)))
}

/// Wrap `cek` with a key derived from `password`.
pub fn wrap(
    alg: KeyManagementAlgorithm,
    password: &SecretKey,
    cek: &[u8],
    p2c: u32,
    p2s: &[u8],
) -> Result<Pbes2WrappedKey, Error> {
    let (kw, kek) = derive_kek(alg, password, p2c, p2s)?;
    let encrypted_key = aes_kw::wrap(kw, &kek, cek)?;
    Ok(Pbes2WrappedKey {
        encrypted_key,
        p2c,
        p2s: Base64UrlSafeNoPadding::encode_to_string(p2s)?,
    })
}

/// Unwrap a CEK wrapped by [`wrap`].
pub fn unwrap(
    alg: KeyManagementAlgorithm,
    password: &SecretKey,
    encrypted_key: &[u8],
    p2c: u32,
    p2s: &[u8],
) -> Result<ContentEncryptionKey, Error> {
    let (kw, kek) = derive_kek(alg, password, p2c, p2s)?;
    aes_kw::unwrap(kw, &kek, encrypted_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ct_codecs::Decoder;

    const ALGS: [KeyManagementAlgorithm; 3] = [
        KeyManagementAlgorithm::Pbes2Hs256A128KW,
        KeyManagementAlgorithm::Pbes2Hs384A192KW,
        KeyManagementAlgorithm::Pbes2Hs512A256KW,
    ];

    #[test]
    fn pbkdf2_hmac_sha256_vector() {
        let derived = pbkdf2(pbkdf2_hmac::<Sha256>, b"passwd", b"salt", 1, 64);
        let expected = [
            0x55, 0xac, 0x04, 0x6e, 0x56, 0xe3, 0x08, 0x9f, 0xec, 0x16, 0x91, 0xc2, 0x25, 0x44,
            0xb6, 0x05, 0xf9, 0x41, 0x85, 0x21, 0x6d, 0xde, 0x04, 0x65, 0xe6, 0x8b, 0x9d, 0x57,
            0xc2, 0x0d, 0xac, 0xbc, 0x49, 0xca, 0x9c, 0xcc, 0xf1, 0x79, 0xb6, 0x45, 0x99, 0x16,
            0x64, 0xb3, 0x9d, 0x77, 0xef, 0x31, 0x7c, 0x71, 0xb8, 0x45, 0xb1, 0xe3, 0x0b, 0xd5,
            0x09, 0x11, 0x20, 0x41, 0xd3, 0xa1, 0x97, 0x83,
        ];
        assert_eq!(&derived[..], &expected[..]);
    }

    #[test]
    fn roundtrip() {
        let password = SecretKey::from_bytes(b"Thus from my lips, by yours, my sin is purged.");
        let salt = [0x42u8; 16];
        for alg in ALGS {
            let cek = [9u8; 32];
            let wrapped = wrap(alg, &password, &cek, 100, &salt).unwrap();
            assert_eq!(wrapped.p2c, 100);
            assert_eq!(
                Base64UrlSafeNoPadding::decode_to_vec(&wrapped.p2s, None).unwrap(),
                salt
            );
            let unwrapped = unwrap(alg, &password, &wrapped.encrypted_key, 100, &salt).unwrap();
            assert_eq!(unwrapped.as_bytes(), &cek);

            let other = SecretKey::from_bytes(b"wrong password");
            assert!(unwrap(alg, &other, &wrapped.encrypted_key, 100, &salt).is_err());
            assert!(unwrap(alg, &password, &wrapped.encrypted_key, 101, &salt).is_err());
        }
    }

    #[test]
    fn short_salt_is_rejected() {
        let password = SecretKey::from_bytes(b"password");
        let err = wrap(ALGS[0], &password, &[0u8; 16], 10, &[0u8; 7]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<JWEError>(),
            Some(JWEError::PreconditionViolation(_))
        ));
        assert!(wrap(ALGS[0], &password, &[0u8; 16], 10, &[0u8; 8]).is_ok());
    }
}
