use ct_codecs::{Base64UrlSafeNoPadding, Decoder};
use serde::{Deserialize, Serialize};

use crate::error::*;
use crate::key::{EcPrivateKey, Jwk};

/// JOSE header parameters produced by key management, and read back when decrypting.
///
/// Binary values are base64url-encoded without padding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderParameters {
    #[serde(rename = "epk", default, skip_serializing_if = "Option::is_none")]
    pub ephemeral_public_key: Option<Jwk>,

    #[serde(rename = "apu", default, skip_serializing_if = "Option::is_none")]
    pub agreement_party_u_info: Option<String>,

    #[serde(rename = "apv", default, skip_serializing_if = "Option::is_none")]
    pub agreement_party_v_info: Option<String>,

    #[serde(rename = "p2c", default, skip_serializing_if = "Option::is_none")]
    pub pbes2_count: Option<u32>,

    #[serde(rename = "p2s", default, skip_serializing_if = "Option::is_none")]
    pub pbes2_salt: Option<String>,

    #[serde(rename = "iv", default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,

    #[serde(rename = "tag", default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl HeaderParameters {
    pub fn is_empty(&self) -> bool {
        self == &HeaderParameters::default()
    }

    /// Decode a base64url header parameter, if present.
    pub(crate) fn decode(value: Option<&String>, name: &str) -> Result<Option<Vec<u8>>, Error> {
        match value {
            None => Ok(None),
            Some(value) => {
                let decoded = Base64UrlSafeNoPadding::decode_to_vec(value, None).map_err(|_| {
                    JWEError::precondition(format!("Failed to base64url decode the {}", name))
                })?;
                Ok(Some(decoded))
            }
        }
    }

    /// Decode a base64url header parameter that must be present.
    pub(crate) fn decode_required(value: Option<&String>, name: &str) -> Result<Vec<u8>, Error> {
        match Self::decode(value, name)? {
            Some(decoded) => Ok(decoded),
            None => bail!(JWEError::precondition(format!("JOSE Header {} missing", name))),
        }
    }
}

/// Inputs a caller may supply instead of letting key management generate them.
#[derive(Debug, Clone, Default)]
pub struct KeyManagementParameters {
    /// Ephemeral key pair for ECDH-ES/ECDH-1PU
    pub ephemeral_key: Option<EcPrivateKey>,

    /// Agreement PartyUInfo
    pub apu: Option<Vec<u8>>,

    /// Agreement PartyVInfo
    pub apv: Option<Vec<u8>>,

    /// PBES2 iteration count
    pub p2c: Option<u32>,

    /// PBES2 salt input
    pub p2s: Option<Vec<u8>>,

    /// Initialization vector for AES-GCM key wrapping
    pub iv: Option<Vec<u8>>,
}

impl KeyManagementParameters {
    pub fn with_ephemeral_key(mut self, ephemeral_key: EcPrivateKey) -> Self {
        self.ephemeral_key = Some(ephemeral_key);
        self
    }

    pub fn with_apu(mut self, apu: impl Into<Vec<u8>>) -> Self {
        self.apu = Some(apu.into());
        self
    }

    pub fn with_apv(mut self, apv: impl Into<Vec<u8>>) -> Self {
        self.apv = Some(apv.into());
        self
    }

    pub fn with_pbes2(mut self, p2c: u32, p2s: impl Into<Vec<u8>>) -> Self {
        self.p2c = Some(p2c);
        self.p2s = Some(p2s.into());
        self
    }

    pub fn with_iv(mut self, iv: impl Into<Vec<u8>>) -> Self {
        self.iv = Some(iv.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_only_present_parameters() {
        let params = HeaderParameters {
            pbes2_count: Some(2048),
            pbes2_salt: Some("c2FsdHNhbHQ".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(json, r#"{"p2c":2048,"p2s":"c2FsdHNhbHQ"}"#);
        assert!(HeaderParameters::default().is_empty());
        assert!(!params.is_empty());
    }

    #[test]
    fn parses_epk() {
        let json = r#"{"epk":{"kty":"OKP","crv":"X25519","x":"hSDwCYkwp1R0i33ctD73Wg2_Og0mOBr066SpjqqbTmo"},"apu":"QWxpY2U"}"#;
        let params: HeaderParameters = serde_json::from_str(json).unwrap();
        let epk = params.ephemeral_public_key.as_ref().unwrap();
        assert_eq!(epk.crv, "X25519");
        assert!(epk.y.is_none());
        let apu = HeaderParameters::decode(params.agreement_party_u_info.as_ref(), "apu").unwrap();
        assert_eq!(apu.as_deref(), Some(&b"Alice"[..]));
    }

    #[test]
    fn malformed_values_are_precondition_violations() {
        let bad = "not base64!".to_string();
        let err = HeaderParameters::decode(Some(&bad), "iv").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<JWEError>(),
            Some(JWEError::PreconditionViolation(_))
        ));
        let err = HeaderParameters::decode_required(None, "tag").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<JWEError>(),
            Some(JWEError::PreconditionViolation(_))
        ));
    }
}
