//! ECDH-ES and ECDH-1PU key agreement (RFC 7518 section 4.6, draft-madden-jose-ecdh-1pu).
//!
//! The shared secret `Z` is run through the Concat KDF from NIST SP 800-56A with SHA-256.
//! For ECDH-1PU, `Z` is the ephemeral-static secret followed by the static-static secret.

use zeroize::Zeroizing;

use crate::engine::CryptoEngine;
use crate::error::*;
use crate::key::{Curve, EcPrivateKey, EcPublicKey, Key};

const AGREEMENT_CURVES: [Curve; 5] = [
    Curve::P256,
    Curve::P384,
    Curve::P521,
    Curve::X25519,
    Curve::X448,
];

/// Return `true` if `key` is an elliptic-curve key whose curve the engine can use for
/// key agreement.
pub fn ecdh_allowed(engine: &dyn CryptoEngine, key: &Key) -> bool {
    match key.curve() {
        Some(curve) => AGREEMENT_CURVES.contains(&curve) && engine.supports_curve(curve),
        None => false,
    }
}

/// Generate an ephemeral key pair on the same curve as `key`.
pub fn generate_epk(engine: &dyn CryptoEngine, key: &Key) -> Result<EcPrivateKey, Error> {
    match key.curve() {
        Some(curve) => engine.generate_key_pair(curve),
        None => bail!(JWEError::UnsupportedAlgorithm(
            "Invalid or unsupported EPK".to_string()
        )),
    }
}

/// Default ECDH-1PU PartyUInfo: `SHA-256(raw(sender) || raw(ephemeral))`.
pub fn default_1pu_apu(
    engine: &dyn CryptoEngine,
    sender: &EcPublicKey,
    ephemeral: &EcPublicKey,
) -> Result<[u8; 32], Error> {
    let mut input = Vec::with_capacity(sender.raw_bytes().len() + ephemeral.raw_bytes().len());
    input.extend_from_slice(sender.raw_bytes());
    input.extend_from_slice(ephemeral.raw_bytes());
    engine.sha256(&input)
}

/// Default ECDH-1PU PartyVInfo: `SHA-256(raw(recipient))`.
pub fn default_1pu_apv(engine: &dyn CryptoEngine, recipient: &EcPublicKey) -> Result<[u8; 32], Error> {
    engine.sha256(recipient.raw_bytes())
}

enum Sender<'a> {
    Private(&'a EcPrivateKey),
    Public(&'a EcPublicKey),
}

/// Derive a key of `key_length_bits` bits from an ECDH agreement.
///
/// `algorithm` is the AlgorithmID bound into the derivation: the `enc` value for direct
/// agreement, the `alg` value when the derived key wraps the CEK.
///
/// Without a sender key, this is ECDH-ES. With one, this is ECDH-1PU: a sender private key
/// pairs with the recipient's public key (encryption side), a sender public key pairs with
/// the recipient's private key (decryption side).
#[allow(clippy::too_many_arguments)]
pub fn derive_key(
    engine: &dyn CryptoEngine,
    public_key: &EcPublicKey,
    private_key: &EcPrivateKey,
    algorithm: &str,
    key_length_bits: usize,
    apu: &[u8],
    apv: &[u8],
    sender_key: Option<&Key>,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let curve = private_key.curve();
    ensure!(
        public_key.curve() == curve,
        JWEError::invalid_key_type("key agreement requires keys on the same curve")
    );
    ensure!(
        engine.supports_curve(curve),
        JWEError::UnsupportedCurve(curve.name().to_string())
    );
    ensure!(
        key_length_bits > 0 && key_length_bits % 8 == 0,
        JWEError::precondition("derived key length must be a positive multiple of 8 bits")
    );

    let sender = match sender_key {
        None => None,
        Some(Key::EcPrivate(sk)) => Some(Sender::Private(sk)),
        Some(Key::EcPublic(pk)) => Some(Sender::Public(pk)),
        Some(_) => bail!(JWEError::invalid_key_type(
            "the sender key must be an elliptic-curve key"
        )),
    };
    if let Some(sender_curve) = sender_key.and_then(Key::curve) {
        ensure!(
            sender_curve == curve,
            JWEError::invalid_key_type("the sender key must be on the same curve")
        );
    }

    let z = match sender {
        None => engine.diffie_hellman(private_key, public_key)?,
        Some(sender) => {
            let static_agreement = move || match sender {
                Sender::Private(sk) => engine.diffie_hellman(sk, public_key),
                Sender::Public(pk) => engine.diffie_hellman(private_key, pk),
            };
            let (ze, zs) = both_agreements(
                || engine.diffie_hellman(private_key, public_key),
                static_agreement,
            )?;
            let mut z = Zeroizing::new(Vec::with_capacity(ze.len() + zs.len()));
            z.extend_from_slice(&ze);
            z.extend_from_slice(&zs);
            z
        }
    };

    let info = fixed_info(algorithm, apu, apv, key_length_bits);
    concat_kdf(engine, &z, key_length_bits, &info)
}

type Agreement = Result<Zeroizing<Vec<u8>>, Error>;

/// Run the ephemeral and static agreements of ECDH-1PU side by side.
#[cfg(not(any(target_arch = "wasm32", target_arch = "wasm64")))]
fn both_agreements(
    ephemeral: impl FnOnce() -> Agreement + Send,
    stat: impl FnOnce() -> Agreement + Send,
) -> Result<(Zeroizing<Vec<u8>>, Zeroizing<Vec<u8>>), Error> {
    std::thread::scope(|s| {
        let zs = s.spawn(stat);
        let ze = ephemeral();
        let zs = zs.join().map_err(|_| JWEError::CryptoEngineFailure)?;
        Ok((ze?, zs?))
    })
}

#[cfg(any(target_arch = "wasm32", target_arch = "wasm64"))]
fn both_agreements(
    ephemeral: impl FnOnce() -> Agreement,
    stat: impl FnOnce() -> Agreement,
) -> Result<(Zeroizing<Vec<u8>>, Zeroizing<Vec<u8>>), Error> {
    let ze = ephemeral()?;
    Ok((ze, stat()?))
}

fn length_and_input(out: &mut Vec<u8>, input: &[u8]) {
    out.extend_from_slice(&(input.len() as u32).to_be_bytes());
    out.extend_from_slice(input);
}

/// `AlgorithmID || PartyUInfo || PartyVInfo || SuppPubInfo`, each of the first three
/// prefixed by its 32-bit big-endian length.
pub fn fixed_info(algorithm: &str, apu: &[u8], apv: &[u8], key_length_bits: usize) -> Vec<u8> {
    let mut info = Vec::with_capacity(16 + algorithm.len() + apu.len() + apv.len());
    length_and_input(&mut info, algorithm.as_bytes());
    length_and_input(&mut info, apu);
    length_and_input(&mut info, apv);
    info.extend_from_slice(&(key_length_bits as u32).to_be_bytes());
    info
}

/// Concat KDF with SHA-256.
pub fn concat_kdf(
    engine: &dyn CryptoEngine,
    z: &[u8],
    key_length_bits: usize,
    fixed_info: &[u8],
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let key_len = key_length_bits / 8;
    let rounds = (key_len + 31) / 32;
    let mut derived = Zeroizing::new(Vec::with_capacity(rounds * 32));
    let mut input = Zeroizing::new(Vec::with_capacity(4 + z.len() + fixed_info.len()));
    for counter in 1..=(rounds as u32) {
        input.clear();
        input.extend_from_slice(&counter.to_be_bytes());
        input.extend_from_slice(z);
        input.extend_from_slice(fixed_info);
        derived.extend_from_slice(&engine.sha256(&input)?);
    }
    derived.truncate(key_len);
    Ok(derived)
}
