//! Keys accepted by the key management layer.
//!
//! Every key crosses the crate boundary in one common shape: elliptic-curve keys carry
//! their curve and raw encodings, symmetric keys carry their bytes, and crypto engines
//! translate these into their own native representations when they run.

use ct_codecs::{Base64UrlSafeNoPadding, Decoder, Encoder};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use crate::algorithms::alg::{KeyManagementAlgorithm, KeyManagementFamily};
use crate::algorithms::rsa::{RsaPrivateKey, RsaPublicKey};
use crate::error::*;

/// Named curves usable for key agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Curve {
    P256,
    P384,
    P521,
    X25519,
    X448,
}

impl Curve {
    /// The JWK `crv` value.
    pub fn name(&self) -> &'static str {
        match self {
            Curve::P256 => "P-256",
            Curve::P384 => "P-384",
            Curve::P521 => "P-521",
            Curve::X25519 => "X25519",
            Curve::X448 => "X448",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, Error> {
        match name {
            "P-256" => Ok(Curve::P256),
            "P-384" => Ok(Curve::P384),
            "P-521" => Ok(Curve::P521),
            "X25519" => Ok(Curve::X25519),
            "X448" => Ok(Curve::X448),
            _ => bail!(JWEError::UnsupportedCurve(name.to_string())),
        }
    }

    /// The JWK `kty` value.
    pub fn key_type_name(&self) -> &'static str {
        if self.is_okp() {
            "OKP"
        } else {
            "EC"
        }
    }

    /// Montgomery curves, whose public keys are a single coordinate.
    pub fn is_okp(&self) -> bool {
        matches!(self, Curve::X25519 | Curve::X448)
    }

    /// Size of a coordinate or scalar, in bytes.
    pub fn field_size(&self) -> usize {
        match self {
            Curve::P256 => 32,
            Curve::P384 => 48,
            Curve::P521 => 66,
            Curve::X25519 => 32,
            Curve::X448 => 56,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Public,
    Private,
    Secret,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUsage {
    Encrypt,
    Decrypt,
}

/// JWK representation of an elliptic-curve key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub crv: String,
    pub x: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
}

impl std::fmt::Debug for Jwk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Jwk")
            .field("kty", &self.kty)
            .field("crv", &self.crv)
            .field("x", &self.x)
            .field("y", &self.y)
            .finish_non_exhaustive()
    }
}

fn decode_coordinate(value: &str, error: JWEError) -> Result<Vec<u8>, Error> {
    Ok(Base64UrlSafeNoPadding::decode_to_vec(value, None).map_err(|_| error)?)
}

/// Public half of an elliptic-curve key pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcPublicKey {
    curve: Curve,
    raw: Vec<u8>,
}

impl EcPublicKey {
    /// Create a public key from its raw encoding.
    ///
    /// Weierstrass curves accept compressed or uncompressed SEC1 points; the key is kept
    /// uncompressed. Montgomery curves take the `u` coordinate.
    pub fn from_bytes(curve: Curve, raw: &[u8]) -> Result<Self, Error> {
        let raw = match curve {
            Curve::P256 => p256::PublicKey::from_sec1_bytes(raw)
                .map_err(|_| JWEError::InvalidPublicKey)?
                .to_encoded_point(false)
                .as_bytes()
                .to_vec(),
            Curve::P384 => p384::PublicKey::from_sec1_bytes(raw)
                .map_err(|_| JWEError::InvalidPublicKey)?
                .to_encoded_point(false)
                .as_bytes()
                .to_vec(),
            Curve::P521 => p521::PublicKey::from_sec1_bytes(raw)
                .map_err(|_| JWEError::InvalidPublicKey)?
                .to_encoded_point(false)
                .as_bytes()
                .to_vec(),
            Curve::X25519 | Curve::X448 => {
                ensure!(raw.len() == curve.field_size(), JWEError::InvalidPublicKey);
                raw.to_vec()
            }
        };
        Ok(EcPublicKey { curve, raw })
    }

    pub(crate) fn from_parts(curve: Curve, raw: Vec<u8>) -> Self {
        EcPublicKey { curve, raw }
    }

    /// Import a public key from a JWK.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, Error> {
        let curve = Curve::from_name(&jwk.crv)?;
        ensure!(jwk.kty == curve.key_type_name(), JWEError::InvalidPublicKey);
        let x = decode_coordinate(&jwk.x, JWEError::InvalidPublicKey)?;
        ensure!(x.len() == curve.field_size(), JWEError::InvalidPublicKey);
        if curve.is_okp() {
            return Self::from_bytes(curve, &x);
        }
        let y = jwk.y.as_deref().ok_or(JWEError::InvalidPublicKey)?;
        let y = decode_coordinate(y, JWEError::InvalidPublicKey)?;
        ensure!(y.len() == curve.field_size(), JWEError::InvalidPublicKey);

        let mut point = Vec::with_capacity(1 + x.len() + y.len());
        point.push(0x04);
        point.extend_from_slice(&x);
        point.extend_from_slice(&y);
        Self::from_bytes(curve, &point)
    }

    /// Export the public key as a JWK (`kty`, `crv`, `x`, and `y` for Weierstrass curves).
    pub fn to_jwk(&self) -> Result<Jwk, Error> {
        let (x, y) = if self.curve.is_okp() {
            (&self.raw[..], None)
        } else {
            let n = self.curve.field_size();
            (&self.raw[1..1 + n], Some(&self.raw[1 + n..]))
        };
        Ok(Jwk {
            kty: self.curve.key_type_name().to_string(),
            crv: self.curve.name().to_string(),
            x: Base64UrlSafeNoPadding::encode_to_string(x)?,
            y: y.map(Base64UrlSafeNoPadding::encode_to_string).transpose()?,
            d: None,
        })
    }

    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// Raw public key encoding: `0x04 || x || y` for Weierstrass curves, `x` for Montgomery curves.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw
    }
}

/// Elliptic-curve private key, with its public half.
#[derive(Clone)]
pub struct EcPrivateKey {
    d: Zeroizing<Vec<u8>>,
    public: EcPublicKey,
    extractable: bool,
}

impl std::fmt::Debug for EcPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcPrivateKey")
            .field("curve", &self.public.curve)
            .field("extractable", &self.extractable)
            .finish_non_exhaustive()
    }
}

impl EcPrivateKey {
    /// Generate a new key pair.
    pub fn generate(curve: Curve) -> Result<Self, Error> {
        let mut rng = rand::thread_rng();
        let (d, public) = match curve {
            Curve::P256 => {
                let sk = p256::SecretKey::random(&mut rng);
                let public = sk.public_key().to_encoded_point(false).as_bytes().to_vec();
                (sk.to_bytes().to_vec(), public)
            }
            Curve::P384 => {
                let sk = p384::SecretKey::random(&mut rng);
                let public = sk.public_key().to_encoded_point(false).as_bytes().to_vec();
                (sk.to_bytes().to_vec(), public)
            }
            Curve::P521 => {
                let sk = p521::SecretKey::random(&mut rng);
                let public = sk.public_key().to_encoded_point(false).as_bytes().to_vec();
                (sk.to_bytes().to_vec(), public)
            }
            Curve::X25519 => {
                let mut d = [0u8; 32];
                rng.fill_bytes(&mut d);
                let public = x25519_public(d);
                let out = (d.to_vec(), public);
                d.zeroize();
                out
            }
            Curve::X448 => bail!(JWEError::UnsupportedCurve(curve.name().to_string())),
        };
        Ok(Self::from_parts(d, EcPublicKey::from_parts(curve, public)))
    }

    /// Create a key pair from a raw private scalar.
    pub fn from_bytes(curve: Curve, d: &[u8]) -> Result<Self, Error> {
        let (d, public) = match curve {
            Curve::P256 => {
                let sk = p256::SecretKey::from_slice(d).map_err(|_| JWEError::InvalidKeyPair)?;
                let public = sk.public_key().to_encoded_point(false).as_bytes().to_vec();
                (sk.to_bytes().to_vec(), public)
            }
            Curve::P384 => {
                let sk = p384::SecretKey::from_slice(d).map_err(|_| JWEError::InvalidKeyPair)?;
                let public = sk.public_key().to_encoded_point(false).as_bytes().to_vec();
                (sk.to_bytes().to_vec(), public)
            }
            Curve::P521 => {
                let sk = p521::SecretKey::from_slice(d).map_err(|_| JWEError::InvalidKeyPair)?;
                let public = sk.public_key().to_encoded_point(false).as_bytes().to_vec();
                (sk.to_bytes().to_vec(), public)
            }
            Curve::X25519 => {
                let mut scalar: [u8; 32] = d.try_into().map_err(|_| JWEError::InvalidKeyPair)?;
                let public = x25519_public(scalar);
                scalar.zeroize();
                (d.to_vec(), public)
            }
            Curve::X448 => bail!(JWEError::UnsupportedCurve(curve.name().to_string())),
        };
        Ok(Self::from_parts(d, EcPublicKey::from_parts(curve, public)))
    }

    /// Import a private key from a JWK.
    ///
    /// The public coordinates must match the private scalar.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, Error> {
        let public = EcPublicKey::from_jwk(jwk).map_err(|_| JWEError::InvalidKeyPair)?;
        let d = jwk.d.as_deref().ok_or(JWEError::InvalidKeyPair)?;
        let d = Zeroizing::new(decode_coordinate(d, JWEError::InvalidKeyPair)?);
        let sk = Self::from_bytes(public.curve(), &d)?;
        ensure!(sk.public == public, JWEError::InvalidKeyPair);
        Ok(sk)
    }

    pub(crate) fn from_parts(d: Vec<u8>, public: EcPublicKey) -> Self {
        EcPrivateKey {
            d: Zeroizing::new(d),
            public,
            extractable: true,
        }
    }

    /// Mark the key as non-extractable: its public half can no longer be exported.
    pub fn non_extractable(mut self) -> Self {
        self.extractable = false;
        self
    }

    pub fn is_extractable(&self) -> bool {
        self.extractable
    }

    pub fn curve(&self) -> Curve {
        self.public.curve
    }

    /// Export the public half of the key pair.
    pub fn export_public_key(&self) -> Result<&EcPublicKey, Error> {
        ensure!(
            self.extractable,
            JWEError::invalid_key_type("the key is not extractable")
        );
        Ok(&self.public)
    }

    /// Public half, for crypto engine adapters.
    #[doc(hidden)]
    pub fn public_key(&self) -> &EcPublicKey {
        &self.public
    }

    /// Raw private scalar, for crypto engine adapters.
    #[doc(hidden)]
    pub fn secret_bytes(&self) -> &[u8] {
        &self.d
    }
}

fn x25519_public(d: [u8; 32]) -> Vec<u8> {
    let secret = x25519_dalek::StaticSecret::from(d);
    x25519_dalek::PublicKey::from(&secret).as_bytes().to_vec()
}

/// Symmetric key: a `dir` CEK, an AES key encryption key, or a PBES2 password.
#[derive(Clone)]
pub struct SecretKey {
    key: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("len", &self.key.len())
            .finish_non_exhaustive()
    }
}

impl SecretKey {
    pub fn from_bytes(key: &[u8]) -> Self {
        SecretKey {
            key: Zeroizing::new(key.to_vec()),
        }
    }

    /// Generate a random key of `len` bytes.
    pub fn generate(len: usize) -> Self {
        let mut key = Zeroizing::new(vec![0u8; len]);
        rand::thread_rng().fill_bytes(&mut key);
        SecretKey { key }
    }

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

/// Any key the key management layer accepts.
#[derive(Debug, Clone)]
pub enum Key {
    EcPublic(EcPublicKey),
    EcPrivate(EcPrivateKey),
    RsaPublic(RsaPublicKey),
    RsaPrivate(RsaPrivateKey),
    Secret(SecretKey),
}

impl Key {
    pub fn key_type(&self) -> KeyType {
        match self {
            Key::EcPublic(_) | Key::RsaPublic(_) => KeyType::Public,
            Key::EcPrivate(_) | Key::RsaPrivate(_) => KeyType::Private,
            Key::Secret(_) => KeyType::Secret,
        }
    }

    /// Curve of an elliptic-curve key.
    pub fn curve(&self) -> Option<Curve> {
        match self {
            Key::EcPublic(pk) => Some(pk.curve()),
            Key::EcPrivate(sk) => Some(sk.curve()),
            _ => None,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Key::EcPublic(_) => "an EC public key",
            Key::EcPrivate(_) => "an EC private key",
            Key::RsaPublic(_) => "an RSA public key",
            Key::RsaPrivate(_) => "an RSA private key",
            Key::Secret(_) => "a secret key",
        }
    }

    pub fn as_ec_public(&self) -> Result<&EcPublicKey, Error> {
        match self {
            Key::EcPublic(pk) => Ok(pk),
            other => bail!(JWEError::invalid_key_type(format!(
                "expected an EC public key, got {}",
                other.describe()
            ))),
        }
    }

    pub fn as_ec_private(&self) -> Result<&EcPrivateKey, Error> {
        match self {
            Key::EcPrivate(sk) => Ok(sk),
            other => bail!(JWEError::invalid_key_type(format!(
                "expected an EC private key, got {}",
                other.describe()
            ))),
        }
    }

    pub fn as_rsa_public(&self) -> Result<&RsaPublicKey, Error> {
        match self {
            Key::RsaPublic(pk) => Ok(pk),
            other => bail!(JWEError::invalid_key_type(format!(
                "expected an RSA public key, got {}",
                other.describe()
            ))),
        }
    }

    pub fn as_rsa_private(&self) -> Result<&RsaPrivateKey, Error> {
        match self {
            Key::RsaPrivate(sk) => Ok(sk),
            other => bail!(JWEError::invalid_key_type(format!(
                "expected an RSA private key, got {}",
                other.describe()
            ))),
        }
    }

    pub fn as_secret(&self) -> Result<&SecretKey, Error> {
        match self {
            Key::Secret(key) => Ok(key),
            other => bail!(JWEError::invalid_key_type(format!(
                "expected a secret key, got {}",
                other.describe()
            ))),
        }
    }
}

impl From<EcPublicKey> for Key {
    fn from(key: EcPublicKey) -> Self {
        Key::EcPublic(key)
    }
}

impl From<EcPrivateKey> for Key {
    fn from(key: EcPrivateKey) -> Self {
        Key::EcPrivate(key)
    }
}

impl From<RsaPublicKey> for Key {
    fn from(key: RsaPublicKey) -> Self {
        Key::RsaPublic(key)
    }
}

impl From<RsaPrivateKey> for Key {
    fn from(key: RsaPrivateKey) -> Self {
        Key::RsaPrivate(key)
    }
}

impl From<SecretKey> for Key {
    fn from(key: SecretKey) -> Self {
        Key::Secret(key)
    }
}

/// Check that `key` can be used with `alg` for `usage`.
pub fn check_key_type(
    alg: KeyManagementAlgorithm,
    key: &Key,
    usage: KeyUsage,
) -> Result<(), Error> {
    let valid = match (alg.family(), usage) {
        (
            KeyManagementFamily::Direct
            | KeyManagementFamily::AesKw
            | KeyManagementFamily::AesGcmKw
            | KeyManagementFamily::Pbes2,
            _,
        ) => matches!(key, Key::Secret(_)),
        (KeyManagementFamily::KeyAgreement, KeyUsage::Encrypt) => matches!(key, Key::EcPublic(_)),
        (KeyManagementFamily::KeyAgreement, KeyUsage::Decrypt) => {
            matches!(key, Key::EcPrivate(_))
        }
        (KeyManagementFamily::RsaEs, KeyUsage::Encrypt) => matches!(key, Key::RsaPublic(_)),
        (KeyManagementFamily::RsaEs, KeyUsage::Decrypt) => matches!(key, Key::RsaPrivate(_)),
    };
    ensure!(
        valid,
        JWEError::invalid_key_type(format!(
            "{} cannot be used with {} for {}",
            key.describe(),
            alg.name(),
            match usage {
                KeyUsage::Encrypt => "encryption",
                KeyUsage::Decrypt => "decryption",
            }
        ))
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jwk_roundtrip() {
        for curve in [Curve::P256, Curve::P384, Curve::P521, Curve::X25519] {
            let sk = EcPrivateKey::generate(curve).unwrap();
            let jwk = sk.export_public_key().unwrap().to_jwk().unwrap();
            assert_eq!(jwk.crv, curve.name());
            assert_eq!(jwk.kty, curve.key_type_name());
            assert_eq!(jwk.y.is_some(), !curve.is_okp());
            let pk = EcPublicKey::from_jwk(&jwk).unwrap();
            assert_eq!(&pk, sk.public_key());
        }
    }

    #[test]
    fn raw_public_encoding() {
        let sk = EcPrivateKey::generate(Curve::P384).unwrap();
        let raw = sk.public_key().raw_bytes();
        assert_eq!(raw.len(), 1 + 2 * 48);
        assert_eq!(raw[0], 0x04);

        let sk = EcPrivateKey::generate(Curve::X25519).unwrap();
        assert_eq!(sk.public_key().raw_bytes().len(), 32);
    }

    #[test]
    fn compressed_points_are_normalized() {
        let sk = EcPrivateKey::generate(Curve::P256).unwrap();
        let compressed = p256::PublicKey::from_sec1_bytes(sk.public_key().raw_bytes())
            .unwrap()
            .to_encoded_point(true);
        let pk = EcPublicKey::from_bytes(Curve::P256, compressed.as_bytes()).unwrap();
        assert_eq!(&pk, sk.public_key());
    }

    #[test]
    fn private_jwk_must_match() {
        let sk = EcPrivateKey::generate(Curve::P256).unwrap();
        let other = EcPrivateKey::generate(Curve::P256).unwrap();
        let mut jwk = other.public_key().to_jwk().unwrap();
        jwk.d = Some(Base64UrlSafeNoPadding::encode_to_string(sk.secret_bytes()).unwrap());
        assert!(EcPrivateKey::from_jwk(&jwk).is_err());

        let mut jwk = sk.public_key().to_jwk().unwrap();
        jwk.d = Some(Base64UrlSafeNoPadding::encode_to_string(sk.secret_bytes()).unwrap());
        let imported = EcPrivateKey::from_jwk(&jwk).unwrap();
        assert_eq!(imported.public_key(), sk.public_key());
    }

    #[test]
    fn non_extractable_keys_do_not_export() {
        let sk = EcPrivateKey::generate(Curve::P256).unwrap().non_extractable();
        let err = sk.export_public_key().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<JWEError>(),
            Some(JWEError::InvalidKeyType(_))
        ));
    }

    #[test]
    fn x448_is_recognized_but_unsupported() {
        assert_eq!(Curve::from_name("X448").unwrap(), Curve::X448);
        let err = EcPrivateKey::generate(Curve::X448).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<JWEError>(),
            Some(JWEError::UnsupportedCurve(_))
        ));
        assert!(Curve::from_name("secp256k1").is_err());
    }

    #[test]
    fn key_type_validation() {
        let secret: Key = SecretKey::generate(16).into();
        let sk = EcPrivateKey::generate(Curve::P256).unwrap();
        let pk: Key = sk.public_key().clone().into();
        let sk: Key = sk.into();

        assert_eq!(secret.key_type(), KeyType::Secret);
        assert_eq!(pk.key_type(), KeyType::Public);
        assert_eq!(sk.key_type(), KeyType::Private);

        let a128kw = KeyManagementAlgorithm::A128KW;
        let ecdh = KeyManagementAlgorithm::EcdhEs;
        assert!(check_key_type(a128kw, &secret, KeyUsage::Encrypt).is_ok());
        assert!(check_key_type(a128kw, &pk, KeyUsage::Encrypt).is_err());
        assert!(check_key_type(ecdh, &pk, KeyUsage::Encrypt).is_ok());
        assert!(check_key_type(ecdh, &sk, KeyUsage::Encrypt).is_err());
        assert!(check_key_type(ecdh, &sk, KeyUsage::Decrypt).is_ok());
        let err = check_key_type(ecdh, &secret, KeyUsage::Decrypt).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<JWEError>(),
            Some(JWEError::InvalidKeyType(_))
        ));
    }
}
