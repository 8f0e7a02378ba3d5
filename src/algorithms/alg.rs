//! Key management algorithm identifiers (`alg` header values).

use crate::error::*;

/// JWE key management algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyManagementAlgorithm {
    Dir,
    EcdhEs,
    EcdhEsA128KW,
    EcdhEsA192KW,
    EcdhEsA256KW,
    Ecdh1Pu,
    Ecdh1PuA128KW,
    Ecdh1PuA192KW,
    Ecdh1PuA256KW,
    Rsa1_5,
    RsaOaep,
    RsaOaep256,
    RsaOaep384,
    RsaOaep512,
    Pbes2Hs256A128KW,
    Pbes2Hs384A192KW,
    Pbes2Hs512A256KW,
    A128KW,
    A192KW,
    A256KW,
    A128GCMKW,
    A192GCMKW,
    A256GCMKW,
}

/// How an algorithm produces the content encryption key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyManagementFamily {
    Direct,
    KeyAgreement,
    RsaEs,
    Pbes2,
    AesKw,
    AesGcmKw,
}

/// Flavor of elliptic-curve key agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgreementScheme {
    /// Ephemeral-static (ECDH-ES)
    Es,
    /// One-pass unified model (ECDH-1PU), authenticating the sender
    OnePu,
}

impl KeyManagementAlgorithm {
    pub const ALL: [KeyManagementAlgorithm; 23] = [
        KeyManagementAlgorithm::Dir,
        KeyManagementAlgorithm::EcdhEs,
        KeyManagementAlgorithm::EcdhEsA128KW,
        KeyManagementAlgorithm::EcdhEsA192KW,
        KeyManagementAlgorithm::EcdhEsA256KW,
        KeyManagementAlgorithm::Ecdh1Pu,
        KeyManagementAlgorithm::Ecdh1PuA128KW,
        KeyManagementAlgorithm::Ecdh1PuA192KW,
        KeyManagementAlgorithm::Ecdh1PuA256KW,
        KeyManagementAlgorithm::Rsa1_5,
        KeyManagementAlgorithm::RsaOaep,
        KeyManagementAlgorithm::RsaOaep256,
        KeyManagementAlgorithm::RsaOaep384,
        KeyManagementAlgorithm::RsaOaep512,
        KeyManagementAlgorithm::Pbes2Hs256A128KW,
        KeyManagementAlgorithm::Pbes2Hs384A192KW,
        KeyManagementAlgorithm::Pbes2Hs512A256KW,
        KeyManagementAlgorithm::A128KW,
        KeyManagementAlgorithm::A192KW,
        KeyManagementAlgorithm::A256KW,
        KeyManagementAlgorithm::A128GCMKW,
        KeyManagementAlgorithm::A192GCMKW,
        KeyManagementAlgorithm::A256GCMKW,
    ];

    /// The JWE `alg` header value.
    pub fn name(&self) -> &'static str {
        match self {
            KeyManagementAlgorithm::Dir => "dir",
            KeyManagementAlgorithm::EcdhEs => "ECDH-ES",
            KeyManagementAlgorithm::EcdhEsA128KW => "ECDH-ES+A128KW",
            KeyManagementAlgorithm::EcdhEsA192KW => "ECDH-ES+A192KW",
            KeyManagementAlgorithm::EcdhEsA256KW => "ECDH-ES+A256KW",
            KeyManagementAlgorithm::Ecdh1Pu => "ECDH-1PU",
            KeyManagementAlgorithm::Ecdh1PuA128KW => "ECDH-1PU+A128KW",
            KeyManagementAlgorithm::Ecdh1PuA192KW => "ECDH-1PU+A192KW",
            KeyManagementAlgorithm::Ecdh1PuA256KW => "ECDH-1PU+A256KW",
            KeyManagementAlgorithm::Rsa1_5 => "RSA1_5",
            KeyManagementAlgorithm::RsaOaep => "RSA-OAEP",
            KeyManagementAlgorithm::RsaOaep256 => "RSA-OAEP-256",
            KeyManagementAlgorithm::RsaOaep384 => "RSA-OAEP-384",
            KeyManagementAlgorithm::RsaOaep512 => "RSA-OAEP-512",
            KeyManagementAlgorithm::Pbes2Hs256A128KW => "PBES2-HS256+A128KW",
            KeyManagementAlgorithm::Pbes2Hs384A192KW => "PBES2-HS384+A192KW",
            KeyManagementAlgorithm::Pbes2Hs512A256KW => "PBES2-HS512+A256KW",
            KeyManagementAlgorithm::A128KW => "A128KW",
            KeyManagementAlgorithm::A192KW => "A192KW",
            KeyManagementAlgorithm::A256KW => "A256KW",
            KeyManagementAlgorithm::A128GCMKW => "A128GCMKW",
            KeyManagementAlgorithm::A192GCMKW => "A192GCMKW",
            KeyManagementAlgorithm::A256GCMKW => "A256GCMKW",
        }
    }

    /// Parse an algorithm from its `alg` header value.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        match Self::ALL.iter().find(|alg| alg.name() == name) {
            Some(alg) => Ok(*alg),
            None => bail!(JWEError::UnsupportedAlgorithm(format!(
                "Invalid or unsupported \"alg\" (JWE Algorithm) header value: {}",
                name
            ))),
        }
    }

    pub fn family(&self) -> KeyManagementFamily {
        match self {
            KeyManagementAlgorithm::Dir => KeyManagementFamily::Direct,
            KeyManagementAlgorithm::EcdhEs
            | KeyManagementAlgorithm::EcdhEsA128KW
            | KeyManagementAlgorithm::EcdhEsA192KW
            | KeyManagementAlgorithm::EcdhEsA256KW
            | KeyManagementAlgorithm::Ecdh1Pu
            | KeyManagementAlgorithm::Ecdh1PuA128KW
            | KeyManagementAlgorithm::Ecdh1PuA192KW
            | KeyManagementAlgorithm::Ecdh1PuA256KW => KeyManagementFamily::KeyAgreement,
            KeyManagementAlgorithm::Rsa1_5
            | KeyManagementAlgorithm::RsaOaep
            | KeyManagementAlgorithm::RsaOaep256
            | KeyManagementAlgorithm::RsaOaep384
            | KeyManagementAlgorithm::RsaOaep512 => KeyManagementFamily::RsaEs,
            KeyManagementAlgorithm::Pbes2Hs256A128KW
            | KeyManagementAlgorithm::Pbes2Hs384A192KW
            | KeyManagementAlgorithm::Pbes2Hs512A256KW => KeyManagementFamily::Pbes2,
            KeyManagementAlgorithm::A128KW
            | KeyManagementAlgorithm::A192KW
            | KeyManagementAlgorithm::A256KW => KeyManagementFamily::AesKw,
            KeyManagementAlgorithm::A128GCMKW
            | KeyManagementAlgorithm::A192GCMKW
            | KeyManagementAlgorithm::A256GCMKW => KeyManagementFamily::AesGcmKw,
        }
    }

    /// Key agreement flavor, for the ECDH family.
    pub fn agreement_scheme(&self) -> Option<AgreementScheme> {
        match self {
            KeyManagementAlgorithm::EcdhEs
            | KeyManagementAlgorithm::EcdhEsA128KW
            | KeyManagementAlgorithm::EcdhEsA192KW
            | KeyManagementAlgorithm::EcdhEsA256KW => Some(AgreementScheme::Es),
            KeyManagementAlgorithm::Ecdh1Pu
            | KeyManagementAlgorithm::Ecdh1PuA128KW
            | KeyManagementAlgorithm::Ecdh1PuA192KW
            | KeyManagementAlgorithm::Ecdh1PuA256KW => Some(AgreementScheme::OnePu),
            _ => None,
        }
    }

    /// AES key wrap algorithm applied to the CEK.
    ///
    /// For composite algorithms, it is named by the last six characters of `alg`
    /// (`ECDH-ES+A128KW` wraps with `A128KW`). Direct agreement has none.
    pub fn key_wrap(&self) -> Option<KeyManagementAlgorithm> {
        let name = self.name();
        match self.family() {
            KeyManagementFamily::AesKw => Some(*self),
            KeyManagementFamily::KeyAgreement | KeyManagementFamily::Pbes2
                if name.ends_with("KW") =>
            {
                Self::from_name(&name[name.len() - 6..]).ok()
            }
            _ => None,
        }
    }

    /// Size of the key encryption key, in bits.
    pub fn kek_bits(&self) -> Option<usize> {
        match self {
            KeyManagementAlgorithm::EcdhEsA128KW
            | KeyManagementAlgorithm::Ecdh1PuA128KW
            | KeyManagementAlgorithm::Pbes2Hs256A128KW
            | KeyManagementAlgorithm::A128KW
            | KeyManagementAlgorithm::A128GCMKW => Some(128),
            KeyManagementAlgorithm::EcdhEsA192KW
            | KeyManagementAlgorithm::Ecdh1PuA192KW
            | KeyManagementAlgorithm::Pbes2Hs384A192KW
            | KeyManagementAlgorithm::A192KW
            | KeyManagementAlgorithm::A192GCMKW => Some(192),
            KeyManagementAlgorithm::EcdhEsA256KW
            | KeyManagementAlgorithm::Ecdh1PuA256KW
            | KeyManagementAlgorithm::Pbes2Hs512A256KW
            | KeyManagementAlgorithm::A256KW
            | KeyManagementAlgorithm::A256GCMKW => Some(256),
            _ => None,
        }
    }
}

impl std::fmt::Display for KeyManagementAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_roundtrip() {
        for alg in KeyManagementAlgorithm::ALL {
            assert_eq!(KeyManagementAlgorithm::from_name(alg.name()).unwrap(), alg);
        }
    }

    #[test]
    fn unknown_names_are_rejected() {
        for name in ["", "none", "ECDH-ES+A512KW", "dir ", "a128kw", "HS256"] {
            let err = KeyManagementAlgorithm::from_name(name).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<JWEError>(),
                Some(JWEError::UnsupportedAlgorithm(_))
            ));
        }
    }

    #[test]
    fn key_wrap_from_suffix() {
        use KeyManagementAlgorithm as Alg;

        assert_eq!(Alg::EcdhEsA128KW.key_wrap(), Some(Alg::A128KW));
        assert_eq!(Alg::Ecdh1PuA192KW.key_wrap(), Some(Alg::A192KW));
        assert_eq!(Alg::Pbes2Hs512A256KW.key_wrap(), Some(Alg::A256KW));
        assert_eq!(Alg::A256KW.key_wrap(), Some(Alg::A256KW));
        assert_eq!(Alg::EcdhEs.key_wrap(), None);
        assert_eq!(Alg::Ecdh1Pu.key_wrap(), None);
        assert_eq!(Alg::A128GCMKW.key_wrap(), None);
        assert_eq!(Alg::Dir.key_wrap(), None);
    }

    #[test]
    fn kek_bits_match_wrap_algorithm() {
        for alg in KeyManagementAlgorithm::ALL {
            if let Some(kw) = alg.key_wrap() {
                assert_eq!(alg.kek_bits(), kw.kek_bits());
                let name = alg.name();
                let bits: usize = name[name.len() - 5..name.len() - 2].parse().unwrap();
                assert_eq!(alg.kek_bits(), Some(bits));
            }
        }
    }
}
