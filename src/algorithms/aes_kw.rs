//! AES Key Wrap (RFC 3394): A128KW, A192KW, A256KW.
//!
//! Also used to wrap the CEK with the key derived by ECDH-ES+AxxxKW, ECDH-1PU+AxxxKW and
//! PBES2.

use aes_kw::{KekAes128, KekAes192, KekAes256};
use zeroize::Zeroize;

use super::alg::{KeyManagementAlgorithm, KeyManagementFamily};
use super::content::ContentEncryptionKey;
use crate::error::*;

enum Kek {
    Aes128(KekAes128),
    Aes192(KekAes192),
    Aes256(KekAes256),
}

fn kek_from<const N: usize, K: From<[u8; N]>>(bytes: &[u8]) -> Result<K, Error> {
    let mut key: [u8; N] = bytes.try_into().map_err(engine_failure)?;
    let kek = K::from(key);
    key.zeroize();
    Ok(kek)
}

impl Kek {
    fn new(kek: &[u8]) -> Result<Self, Error> {
        Ok(match kek.len() {
            16 => Kek::Aes128(kek_from::<16, _>(kek)?),
            24 => Kek::Aes192(kek_from::<24, _>(kek)?),
            32 => Kek::Aes256(kek_from::<32, _>(kek)?),
            _ => bail!(JWEError::CryptoEngineFailure),
        })
    }

    fn wrap(&self, data: &[u8], out: &mut [u8]) -> Result<(), aes_kw::Error> {
        match self {
            Kek::Aes128(kek) => kek.wrap(data, out),
            Kek::Aes192(kek) => kek.wrap(data, out),
            Kek::Aes256(kek) => kek.wrap(data, out),
        }
    }

    fn unwrap(&self, data: &[u8], out: &mut [u8]) -> Result<(), aes_kw::Error> {
        match self {
            Kek::Aes128(kek) => kek.unwrap(data, out),
            Kek::Aes192(kek) => kek.unwrap(data, out),
            Kek::Aes256(kek) => kek.unwrap(data, out),
        }
    }
}

fn check_kek(alg: KeyManagementAlgorithm, kek: &[u8]) -> Result<(), Error> {
    ensure!(
        alg.family() == KeyManagementFamily::AesKw,
        JWEError::UnsupportedAlgorithm(alg.name().to_string())
    );
    let bits = alg.kek_bits().unwrap_or_default();
    ensure!(
        kek.len() * 8 == bits,
        JWEError::invalid_key_type(format!("{} requires a {}-bit key", alg.name(), bits))
    );
    Ok(())
}

/// Wrap `cek` with `kek`. The output is 8 bytes longer than the input.
pub fn wrap(alg: KeyManagementAlgorithm, kek: &[u8], cek: &[u8]) -> Result<Vec<u8>, Error> {
    check_kek(alg, kek)?;
    ensure!(
        cek.len() >= 16 && cek.len() % 8 == 0,
        JWEError::precondition("the key to wrap must be a multiple of 64 bits, and at least 128 bits")
    );
    let kek = Kek::new(kek)?;

    let mut wrapped = vec![0u8; cek.len() + 8];
    kek.wrap(cek, &mut wrapped).map_err(engine_failure)?;

    Ok(wrapped)
}

/// Unwrap a CEK. Fails with [`JWEError::CryptoEngineFailure`] if the integrity check fails.
pub fn unwrap(
    alg: KeyManagementAlgorithm,
    kek: &[u8],
    wrapped: &[u8],
) -> Result<ContentEncryptionKey, Error> {
    check_kek(alg, kek)?;
    ensure!(
        wrapped.len() >= 24 && wrapped.len() % 8 == 0,
        JWEError::CryptoEngineFailure
    );
    let kek = Kek::new(kek)?;

    let mut cek = vec![0u8; wrapped.len() - 8];
    if kek.unwrap(wrapped, &mut cek).is_err() {
        cek.zeroize();
        bail!(JWEError::CryptoEngineFailure);
    }

    Ok(ContentEncryptionKey::new(cek))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    #[test]
    fn rfc3394_vectors() {
        let cek = hex("00112233445566778899AABBCCDDEEFF");
        let cases = [
            (
                KeyManagementAlgorithm::A128KW,
                "000102030405060708090A0B0C0D0E0F",
                "1FA68B0A8112B447AEF34BD8FB5A7B829D3E862371D2CFE5",
            ),
            (
                KeyManagementAlgorithm::A192KW,
                "000102030405060708090A0B0C0D0E0F1011121314151617",
                "96778B25AE6CA435F92B5B97C050AED2468AB8A17AD84E5D",
            ),
            (
                KeyManagementAlgorithm::A256KW,
                "000102030405060708090A0B0C0D0E0F101112131415161718191A1B1C1D1E1F",
                "64E8C3F9CE0F5BA263E9777905818A2A93C8191E7D6E8AE7",
            ),
        ];
        for (alg, kek, expected) in cases {
            let kek = hex(kek);
            let wrapped = wrap(alg, &kek, &cek).unwrap();
            assert_eq!(wrapped, hex(expected));
            let unwrapped = unwrap(alg, &kek, &wrapped).unwrap();
            assert_eq!(unwrapped.as_bytes(), &cek[..]);
        }
    }

    #[test]
    fn corrupted_input_fails() {
        let kek = [1u8; 16];
        let mut wrapped = wrap(KeyManagementAlgorithm::A128KW, &kek, &[2u8; 32]).unwrap();
        wrapped[3] ^= 1;
        let err = unwrap(KeyManagementAlgorithm::A128KW, &kek, &wrapped).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<JWEError>(),
            Some(JWEError::CryptoEngineFailure)
        ));
    }

    #[test]
    fn key_size_must_match() {
        let err = wrap(KeyManagementAlgorithm::A256KW, &[0u8; 16], &[0u8; 16]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<JWEError>(),
            Some(JWEError::InvalidKeyType(_))
        ));
        assert!(wrap(KeyManagementAlgorithm::A128GCMKW, &[0u8; 16], &[0u8; 16]).is_err());
    }
}
