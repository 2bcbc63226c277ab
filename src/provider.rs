//! Signature primitive capability.
//!
//! The rest of the crate never calls an ML-DSA implementation directly; it
//! goes through [`SignatureScheme`], which exposes the three operations an
//! identity pipeline needs (keygen, sign, verify) over raw byte buffers.
//!
//! [`init`] performs the one-time provider bring-up: a pairwise consistency
//! test (generate a key pair, sign, verify) of every registered scheme. It is
//! idempotent and safe to call from several threads at once.

use std::sync::OnceLock;

use fips204::ml_dsa_65;
use fips204::traits::{SerDes, Signer, Verifier};
use tracing::{debug, warn};
use zeroize::{Zeroize, Zeroizing};

use crate::error::{PqCertKitError, Result};

/// ML-DSA-65 public key length in bytes.
pub const ML_DSA_65_PUBLIC_KEY_LEN: usize = ml_dsa_65::PK_LEN;
/// ML-DSA-65 private (expanded) key length in bytes.
pub const ML_DSA_65_PRIVATE_KEY_LEN: usize = ml_dsa_65::SK_LEN;
/// ML-DSA-65 signature length in bytes.
pub const ML_DSA_65_SIGNATURE_LEN: usize = ml_dsa_65::SIG_LEN;

/// An opaque digital signature primitive over raw key buffers.
pub trait SignatureScheme: Send + Sync {
    /// Human readable algorithm name.
    fn name(&self) -> &'static str;

    /// Exact length of an encoded public key.
    fn public_key_len(&self) -> usize;

    /// Exact length of an encoded private key.
    fn private_key_len(&self) -> usize;

    /// Exact length of a signature.
    fn signature_len(&self) -> usize;

    /// Generates a fresh `(public_key, private_key)` pair.
    fn keygen(&self) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>)>;

    /// Checks that `public_key` is a well-formed encoding.
    fn check_public_key(&self, public_key: &[u8]) -> Result<()>;

    /// Checks that `private_key` is a well-formed encoding.
    fn check_private_key(&self, private_key: &[u8]) -> Result<()>;

    /// Signs `message` as-is; any hashing is internal to the scheme.
    fn sign(&self, private_key: &[u8], message: &[u8]) -> Result<Vec<u8>>;

    /// Returns `Ok(false)` for a well-formed but invalid signature and an
    /// error when the key cannot be loaded.
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<bool>;
}

/// ML-DSA-65 (FIPS 204), pure mode with an empty context string.
#[derive(Debug, Clone, Copy, Default)]
pub struct MlDsa65;

impl MlDsa65 {
    fn load_public(public_key: &[u8]) -> Result<ml_dsa_65::PublicKey> {
        let bytes = <[u8; ML_DSA_65_PUBLIC_KEY_LEN]>::try_from(public_key).map_err(|_| {
            PqCertKitError::KeyLoadError(format!(
                "ML-DSA-65 public key must be {ML_DSA_65_PUBLIC_KEY_LEN} bytes, got {}",
                public_key.len()
            ))
        })?;
        ml_dsa_65::PublicKey::try_from_bytes(bytes)
            .map_err(|e| PqCertKitError::KeyLoadError(format!("ML-DSA-65 public key: {e}")))
    }

    fn load_private(private_key: &[u8]) -> Result<ml_dsa_65::PrivateKey> {
        let mut bytes = <[u8; ML_DSA_65_PRIVATE_KEY_LEN]>::try_from(private_key).map_err(|_| {
            PqCertKitError::KeyLoadError(format!(
                "ML-DSA-65 private key must be {ML_DSA_65_PRIVATE_KEY_LEN} bytes, got {}",
                private_key.len()
            ))
        })?;
        let loaded = ml_dsa_65::PrivateKey::try_from_bytes(bytes)
            .map_err(|e| PqCertKitError::KeyLoadError(format!("ML-DSA-65 private key: {e}")));
        bytes.zeroize();
        loaded
    }
}

impl SignatureScheme for MlDsa65 {
    fn name(&self) -> &'static str {
        "ML-DSA-65"
    }

    fn public_key_len(&self) -> usize {
        ML_DSA_65_PUBLIC_KEY_LEN
    }

    fn private_key_len(&self) -> usize {
        ML_DSA_65_PRIVATE_KEY_LEN
    }

    fn signature_len(&self) -> usize {
        ML_DSA_65_SIGNATURE_LEN
    }

    fn keygen(&self) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>)> {
        let mut rng = rand_core::OsRng;
        let (public, private) = ml_dsa_65::try_keygen_with_rng(&mut rng)
            .map_err(|e| PqCertKitError::primitive(format!("ML-DSA-65 keygen: {e}")))?;
        let mut encoded = private.into_bytes();
        let private = Zeroizing::new(encoded.to_vec());
        encoded.zeroize();
        Ok((public.into_bytes().to_vec(), private))
    }

    fn check_public_key(&self, public_key: &[u8]) -> Result<()> {
        Self::load_public(public_key).map(|_| ())
    }

    fn check_private_key(&self, private_key: &[u8]) -> Result<()> {
        Self::load_private(private_key).map(|_| ())
    }

    fn sign(&self, private_key: &[u8], message: &[u8]) -> Result<Vec<u8>> {
        let private = Self::load_private(private_key)?;
        let signature = private
            .try_sign(message, &[])
            .map_err(|e| PqCertKitError::SigningError(format!("ML-DSA-65 sign: {e}")))?;
        Ok(signature.to_vec())
    }

    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<bool> {
        let public = Self::load_public(public_key)?;
        let Ok(signature) = <[u8; ML_DSA_65_SIGNATURE_LEN]>::try_from(signature) else {
            return Ok(false);
        };
        Ok(public.verify(message, &signature, &[]))
    }
}

static PROVIDER_STATE: OnceLock<std::result::Result<(), String>> = OnceLock::new();

/// Brings the signature provider to an operational state.
///
/// The first call runs the pairwise consistency test; later calls return the
/// cached outcome.
pub fn init() -> Result<()> {
    PROVIDER_STATE
        .get_or_init(|| {
            debug!("running signature provider self-test");
            let outcome = pairwise_consistency_test(&MlDsa65);
            if let Err(e) = &outcome {
                warn!(error = %e, "signature provider self-test failed");
            }
            outcome.map_err(|e| e.to_string())
        })
        .clone()
        .map_err(PqCertKitError::PrimitiveFailure)
}

/// Returns true once [`init`] has completed successfully.
pub fn is_operational() -> bool {
    matches!(PROVIDER_STATE.get(), Some(Ok(())))
}

/// Generate a key pair, sign a fixed message and verify it.
fn pairwise_consistency_test(scheme: &dyn SignatureScheme) -> Result<()> {
    let msg = b"\x01\x02\x03\x04";

    let (public, private) = scheme.keygen()?;
    if public.len() != scheme.public_key_len() || private.len() != scheme.private_key_len() {
        return Err(PqCertKitError::primitive(format!(
            "{} PCT: unexpected key sizes",
            scheme.name()
        )));
    }

    let signature = scheme
        .sign(&private, msg)
        .map_err(|e| PqCertKitError::primitive(format!("{} PCT sign: {e}", scheme.name())))?;

    if !scheme.verify(&public, msg, &signature)? {
        return Err(PqCertKitError::primitive(format!(
            "{} PCT failed",
            scheme.name()
        )));
    }
    Ok(())
}
