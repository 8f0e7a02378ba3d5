//! Key management dispatcher.
//!
//! Given an `alg` and an `enc`, produce the content encryption key (CEK), the JWE Encrypted
//! Key when the algorithm has one, and the JOSE header parameters the recipient needs.
//! Decryption reverses the process from the same inputs.

use std::sync::Arc;

use ct_codecs::{Base64UrlSafeNoPadding, Encoder};

use crate::algorithms::alg::{AgreementScheme, KeyManagementAlgorithm as Alg, KeyManagementFamily};
use crate::algorithms::content::{ContentEncryption, ContentEncryptionKey};
use crate::algorithms::{aes_gcm_kw, aes_kw, ecdh, pbes2, rsa};
use crate::common::KeyManagementOptions;
use crate::engine::{default_engine, CryptoEngine};
use crate::error::*;
use crate::header::{HeaderParameters, KeyManagementParameters};
use crate::key::{check_key_type, EcPublicKey, Key, KeyUsage};

/// Output of [`KeyManager::encrypt_key_management`].
#[derive(Debug)]
pub struct KeyManagementResult {
    /// Key to encrypt the content with
    pub cek: ContentEncryptionKey,

    /// JWE Encrypted Key; absent for `dir`, `ECDH-ES` and `ECDH-1PU`
    pub encrypted_key: Option<Vec<u8>>,

    /// JOSE header parameters to add to the protected header
    pub parameters: Option<HeaderParameters>,
}

/// Runs key management operations on a crypto engine.
#[derive(Clone)]
pub struct KeyManager {
    engine: Arc<dyn CryptoEngine>,
    options: KeyManagementOptions,
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("engine", &self.engine.name())
            .field("options", &self.options)
            .finish()
    }
}

impl Default for KeyManager {
    fn default() -> Self {
        KeyManager::new(default_engine())
    }
}

impl KeyManager {
    pub fn new(engine: Arc<dyn CryptoEngine>) -> Self {
        KeyManager {
            engine,
            options: KeyManagementOptions::default(),
        }
    }

    pub fn with_options(mut self, options: KeyManagementOptions) -> Self {
        self.options = options;
        self
    }

    pub fn engine(&self) -> &dyn CryptoEngine {
        self.engine.as_ref()
    }

    pub fn options(&self) -> &KeyManagementOptions {
        &self.options
    }

    /// Produce a CEK for `enc`, and protect it for the holder of `key`.
    ///
    /// - `provided_cek` replaces the generated CEK for algorithms that wrap or encrypt it.
    /// - `provided` supplies values that would otherwise be generated or left out
    ///   (ephemeral key, `apu`, `apv`, `p2c`, `p2s`, `iv`).
    /// - `sender_key` is the sender's static private key; required by `ECDH-1PU`
    ///   algorithms and rejected by `ECDH-ES` algorithms.
    pub fn encrypt_key_management(
        &self,
        alg: &str,
        enc: &str,
        key: &Key,
        provided_cek: Option<&[u8]>,
        provided: &KeyManagementParameters,
        sender_key: Option<&Key>,
    ) -> Result<KeyManagementResult, Error> {
        let alg = Alg::from_name(alg)?;
        let enc = self.content_encryption(enc)?;
        check_key_type(alg, key, KeyUsage::Encrypt)?;
        tracing::debug!(
            alg = alg.name(),
            enc = enc.alg_name(),
            engine = self.engine.name(),
            "encrypting content encryption key"
        );

        match alg.family() {
            KeyManagementFamily::Direct => {
                let secret = key.as_secret()?;
                check_direct_key(enc, secret.as_bytes())?;
                Ok(KeyManagementResult {
                    cek: ContentEncryptionKey::from_slice(secret.as_bytes()),
                    encrypted_key: None,
                    parameters: None,
                })
            }
            KeyManagementFamily::KeyAgreement => {
                self.encrypt_key_agreement(alg, enc, key, provided_cek, provided, sender_key)
            }
            KeyManagementFamily::RsaEs => {
                let cek = self.cek(enc, provided_cek)?;
                let encrypted_key = rsa::encrypt(alg, key.as_rsa_public()?, cek.as_bytes())?;
                Ok(KeyManagementResult {
                    cek,
                    encrypted_key: Some(encrypted_key),
                    parameters: None,
                })
            }
            KeyManagementFamily::Pbes2 => {
                let cek = self.cek(enc, provided_cek)?;
                let p2c = provided.p2c.unwrap_or(self.options.pbes2_count);
                let p2s = match &provided.p2s {
                    Some(p2s) => p2s.clone(),
                    None => {
                        let mut p2s = vec![0u8; self.options.pbes2_salt_len];
                        self.engine.fill_random(&mut p2s)?;
                        p2s
                    }
                };
                let wrapped = pbes2::wrap(alg, key.as_secret()?, cek.as_bytes(), p2c, &p2s)?;
                Ok(KeyManagementResult {
                    cek,
                    encrypted_key: Some(wrapped.encrypted_key),
                    parameters: Some(HeaderParameters {
                        pbes2_count: Some(wrapped.p2c),
                        pbes2_salt: Some(wrapped.p2s),
                        ..Default::default()
                    }),
                })
            }
            KeyManagementFamily::AesKw => {
                let cek = self.cek(enc, provided_cek)?;
                let encrypted_key = aes_kw::wrap(alg, key.as_secret()?.as_bytes(), cek.as_bytes())?;
                Ok(KeyManagementResult {
                    cek,
                    encrypted_key: Some(encrypted_key),
                    parameters: None,
                })
            }
            KeyManagementFamily::AesGcmKw => {
                let cek = self.cek(enc, provided_cek)?;
                let wrapped = aes_gcm_kw::wrap(
                    self.engine(),
                    alg,
                    key.as_secret()?,
                    cek.as_bytes(),
                    provided.iv.as_deref(),
                )?;
                Ok(KeyManagementResult {
                    cek,
                    encrypted_key: Some(wrapped.encrypted_key),
                    parameters: Some(HeaderParameters {
                        iv: Some(wrapped.iv),
                        tag: Some(wrapped.tag),
                        ..Default::default()
                    }),
                })
            }
        }
    }

    fn encrypt_key_agreement(
        &self,
        alg: Alg,
        enc: ContentEncryption,
        key: &Key,
        provided_cek: Option<&[u8]>,
        provided: &KeyManagementParameters,
        sender_key: Option<&Key>,
    ) -> Result<KeyManagementResult, Error> {
        let engine = self.engine();
        let sender_key = check_sender_key(alg, sender_key)?;
        let sender = sender_key.map(Key::as_ec_private).transpose()?;
        let recipient = key.as_ec_public()?;
        ensure!(
            ecdh::ecdh_allowed(engine, key),
            JWEError::UnsupportedCurve(format!(
                "ECDH with {} keys is not supported by the {} engine",
                recipient.curve().name(),
                engine.name()
            ))
        );
        if let Some(ephemeral) = &provided.ephemeral_key {
            ensure!(
                ephemeral.curve() == recipient.curve(),
                JWEError::invalid_key_type("the ephemeral key must be on the recipient's curve")
            );
        }
        let sender_public = match sender {
            Some(sender) => {
                ensure!(
                    sender.curve() == recipient.curve(),
                    JWEError::invalid_key_type("the sender key must be on the same curve")
                );
                match provided.apu {
                    Some(_) => None,
                    None => Some(sender.export_public_key()?),
                }
            }
            None => None,
        };

        let wrapped_cek = match alg.key_wrap() {
            Some(kw) => Some((kw, self.cek(enc, provided_cek)?)),
            None => None,
        };

        let generated;
        let ephemeral = match &provided.ephemeral_key {
            Some(ephemeral) => ephemeral,
            None => {
                generated = ecdh::generate_epk(engine, key)?;
                &generated
            }
        };
        let ephemeral_public = ephemeral.export_public_key()?;

        let apu = match (&provided.apu, sender_public) {
            (Some(apu), _) => apu.clone(),
            (None, Some(sender_public)) => {
                ecdh::default_1pu_apu(engine, sender_public, ephemeral_public)?.to_vec()
            }
            (None, None) => Vec::new(),
        };
        let apv = match (&provided.apv, sender) {
            (Some(apv), _) => apv.clone(),
            (None, Some(_)) => ecdh::default_1pu_apv(engine, recipient)?.to_vec(),
            (None, None) => Vec::new(),
        };

        let (algorithm, key_length_bits) = agreement_target(alg, enc)?;
        let shared = ecdh::derive_key(
            engine,
            recipient,
            ephemeral,
            algorithm,
            key_length_bits,
            &apu,
            &apv,
            sender_key,
        )?;

        let mut parameters = HeaderParameters {
            ephemeral_public_key: Some(ephemeral_public.to_jwk()?),
            ..Default::default()
        };
        if !apu.is_empty() {
            parameters.agreement_party_u_info = Some(Base64UrlSafeNoPadding::encode_to_string(&apu)?);
        }
        if !apv.is_empty() {
            parameters.agreement_party_v_info = Some(Base64UrlSafeNoPadding::encode_to_string(&apv)?);
        }

        let (cek, encrypted_key) = match wrapped_cek {
            Some((kw, cek)) => {
                let encrypted_key = aes_kw::wrap(kw, &shared, cek.as_bytes())?;
                (cek, Some(encrypted_key))
            }
            None => (ContentEncryptionKey::from_slice(&shared), None),
        };
        Ok(KeyManagementResult {
            cek,
            encrypted_key,
            parameters: Some(parameters),
        })
    }

    /// Recover the CEK for `enc` from the JWE Encrypted Key and header parameters.
    ///
    /// `sender_key` is the sender's static public key; required by `ECDH-1PU` algorithms and
    /// rejected by `ECDH-ES` algorithms.
    pub fn decrypt_key_management(
        &self,
        alg: &str,
        enc: &str,
        key: &Key,
        encrypted_key: Option<&[u8]>,
        header: &HeaderParameters,
        sender_key: Option<&Key>,
    ) -> Result<ContentEncryptionKey, Error> {
        let alg = Alg::from_name(alg)?;
        let enc = self.content_encryption(enc)?;
        check_key_type(alg, key, KeyUsage::Decrypt)?;
        tracing::debug!(
            alg = alg.name(),
            enc = enc.alg_name(),
            engine = self.engine.name(),
            "decrypting content encryption key"
        );

        match alg.family() {
            KeyManagementFamily::Direct => {
                ensure!(
                    encrypted_key.is_none(),
                    JWEError::precondition("Encountered unexpected JWE Encrypted Key")
                );
                let secret = key.as_secret()?;
                check_direct_key(enc, secret.as_bytes())?;
                Ok(ContentEncryptionKey::from_slice(secret.as_bytes()))
            }
            KeyManagementFamily::KeyAgreement => {
                self.decrypt_key_agreement(alg, enc, key, encrypted_key, header, sender_key)
            }
            KeyManagementFamily::RsaEs => {
                let encrypted_key = required_encrypted_key(encrypted_key)?;
                rsa::decrypt(alg, key.as_rsa_private()?, encrypted_key)
            }
            KeyManagementFamily::Pbes2 => {
                let encrypted_key = required_encrypted_key(encrypted_key)?;
                let p2c = header.pbes2_count.ok_or_else(|| {
                    JWEError::precondition("JOSE Header \"p2c\" (PBES2 Count) missing")
                })?;
                ensure!(
                    p2c <= self.options.max_pbes2_count,
                    JWEError::precondition("JOSE Header \"p2c\" (PBES2 Count) exceeds the maximum")
                );
                let p2s = HeaderParameters::decode_required(
                    header.pbes2_salt.as_ref(),
                    "\"p2s\" (PBES2 Salt)",
                )?;
                pbes2::unwrap(alg, key.as_secret()?, encrypted_key, p2c, &p2s)
            }
            KeyManagementFamily::AesKw => {
                let encrypted_key = required_encrypted_key(encrypted_key)?;
                aes_kw::unwrap(alg, key.as_secret()?.as_bytes(), encrypted_key)
            }
            KeyManagementFamily::AesGcmKw => {
                let encrypted_key = required_encrypted_key(encrypted_key)?;
                let iv = HeaderParameters::decode_required(
                    header.iv.as_ref(),
                    "\"iv\" (Initialization Vector)",
                )?;
                let tag = HeaderParameters::decode_required(
                    header.tag.as_ref(),
                    "\"tag\" (Authentication Tag)",
                )?;
                aes_gcm_kw::unwrap(self.engine(), alg, key.as_secret()?, encrypted_key, &iv, &tag)
            }
        }
    }

    fn decrypt_key_agreement(
        &self,
        alg: Alg,
        enc: ContentEncryption,
        key: &Key,
        encrypted_key: Option<&[u8]>,
        header: &HeaderParameters,
        sender_key: Option<&Key>,
    ) -> Result<ContentEncryptionKey, Error> {
        let engine = self.engine();
        let sender_key = check_sender_key(alg, sender_key)?;
        if let Some(sender) = sender_key {
            sender.as_ec_public()?;
        }
        let recipient = key.as_ec_private()?;
        ensure!(
            ecdh::ecdh_allowed(engine, key),
            JWEError::UnsupportedCurve(format!(
                "ECDH with {} keys is not supported by the {} engine",
                recipient.curve().name(),
                engine.name()
            ))
        );

        let kw = alg.key_wrap();
        let encrypted_key = match kw {
            Some(_) => Some(required_encrypted_key(encrypted_key)?),
            None => {
                ensure!(
                    encrypted_key.is_none(),
                    JWEError::precondition("Encountered unexpected JWE Encrypted Key")
                );
                None
            }
        };

        let epk = header.ephemeral_public_key.as_ref().ok_or_else(|| {
            JWEError::precondition("JOSE Header \"epk\" (Ephemeral Public Key) missing")
        })?;
        let epk = EcPublicKey::from_jwk(epk).map_err(|_| {
            JWEError::precondition("JOSE Header \"epk\" (Ephemeral Public Key) is invalid")
        })?;
        let apu = HeaderParameters::decode(
            header.agreement_party_u_info.as_ref(),
            "\"apu\" (Agreement PartyUInfo)",
        )?
        .unwrap_or_default();
        let apv = HeaderParameters::decode(
            header.agreement_party_v_info.as_ref(),
            "\"apv\" (Agreement PartyVInfo)",
        )?
        .unwrap_or_default();

        let (algorithm, key_length_bits) = agreement_target(alg, enc)?;
        let shared = ecdh::derive_key(
            engine,
            &epk,
            recipient,
            algorithm,
            key_length_bits,
            &apu,
            &apv,
            sender_key,
        )?;

        match (kw, encrypted_key) {
            (Some(kw), Some(encrypted_key)) => aes_kw::unwrap(kw, &shared, encrypted_key),
            _ => Ok(ContentEncryptionKey::from_slice(&shared)),
        }
    }

    fn content_encryption(&self, enc: &str) -> Result<ContentEncryption, Error> {
        let enc = ContentEncryption::from_alg_name(enc)?;
        if enc.is_draft() {
            ensure!(
                self.engine.ciphers().supports(enc.cipher_name()),
                JWEError::UnsupportedAlgorithm(format!(
                    "{} is not supported by the {} engine",
                    enc.alg_name(),
                    self.engine.name()
                ))
            );
        }
        Ok(enc)
    }

    fn cek(
        &self,
        enc: ContentEncryption,
        provided_cek: Option<&[u8]>,
    ) -> Result<ContentEncryptionKey, Error> {
        match provided_cek {
            Some(cek) => {
                ensure!(
                    cek.len() == enc.key_size(),
                    JWEError::precondition(format!(
                        "the provided CEK must be {} bits long for {}",
                        enc.key_size() * 8,
                        enc.alg_name()
                    ))
                );
                Ok(ContentEncryptionKey::from_slice(cek))
            }
            None => enc.generate_cek(self.engine()),
        }
    }
}

/// ECDH-1PU needs a sender key, ECDH-ES must not get one.
fn check_sender_key(alg: Alg, sender_key: Option<&Key>) -> Result<Option<&Key>, Error> {
    match (alg.agreement_scheme(), sender_key) {
        (Some(AgreementScheme::OnePu), None) => bail!(JWEError::precondition(format!(
            "{} requires a sender key",
            alg.name()
        ))),
        (Some(AgreementScheme::Es), Some(_)) => bail!(JWEError::precondition(format!(
            "{} does not take a sender key",
            alg.name()
        ))),
        _ => Ok(sender_key),
    }
}

/// AlgorithmID and key length for the Concat KDF: the `enc` value and CEK size for direct
/// agreement, the `alg` value and key wrap size otherwise.
fn agreement_target(alg: Alg, enc: ContentEncryption) -> Result<(&'static str, usize), Error> {
    match (alg.key_wrap(), alg.kek_bits()) {
        (None, _) => Ok((enc.alg_name(), enc.key_size() * 8)),
        (Some(_), Some(bits)) => Ok((alg.name(), bits)),
        (Some(_), None) => bail!(JWEError::UnsupportedAlgorithm(alg.name().to_string())),
    }
}

fn check_direct_key(enc: ContentEncryption, key: &[u8]) -> Result<(), Error> {
    ensure!(
        key.len() == enc.key_size(),
        JWEError::invalid_key_type(format!(
            "dir with {} requires a {}-bit key",
            enc.alg_name(),
            enc.key_size() * 8
        ))
    );
    Ok(())
}

fn required_encrypted_key(encrypted_key: Option<&[u8]>) -> Result<&[u8], Error> {
    Ok(encrypted_key.ok_or_else(|| JWEError::precondition("JWE Encrypted Key missing"))?)
}

/// [`KeyManager::encrypt_key_management`] on the default engine.
pub fn encrypt_key_management(
    alg: &str,
    enc: &str,
    key: &Key,
    provided_cek: Option<&[u8]>,
    provided: &KeyManagementParameters,
    sender_key: Option<&Key>,
) -> Result<KeyManagementResult, Error> {
    KeyManager::default().encrypt_key_management(alg, enc, key, provided_cek, provided, sender_key)
}

/// [`KeyManager::decrypt_key_management`] on the default engine.
pub fn decrypt_key_management(
    alg: &str,
    enc: &str,
    key: &Key,
    encrypted_key: Option<&[u8]>,
    header: &HeaderParameters,
    sender_key: Option<&Key>,
) -> Result<ContentEncryptionKey, Error> {
    KeyManager::default().decrypt_key_management(alg, enc, key, encrypted_key, header, sender_key)
}
