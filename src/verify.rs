//! Signature and certificate chain verification.
//!
//! Verification never fails with an error: every outcome is a
//! [`Verification`], and a rejection carries a [`VerifyFailure`] with a
//! stable reason code.

use std::sync::Arc;

use der::Encode;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, warn};
use x509_cert::Version;

use crate::cert::extensions::{KeyUsages, is_recognized};
use crate::cert::{Certificate, SignatureAlgorithm};
use crate::clock::{Clock, SystemClock};
use crate::error::PqCertKitError;
use crate::key::PublicKey;

/// Why a verification was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyFailure {
    #[error("malformed public key: {0}")]
    MalformedPublicKey(String),

    #[error("signature is {actual} bytes, expected {expected}")]
    MalformedSignature { expected: usize, actual: usize },

    #[error("signature does not verify")]
    SignatureMismatch,

    #[error("malformed certificate: {0}")]
    MalformedCertificate(String),

    #[error("certificate issuer {issuer:?} does not match CA subject {ca_subject:?}")]
    IssuerNameMismatch { issuer: String, ca_subject: String },

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("unhandled critical extension {0}")]
    UnhandledCriticalExtension(String),

    #[error("issuer is not a CA: {0}")]
    IssuerNotCa(String),

    #[error("certificate is not yet valid")]
    CertificateNotYetValid,

    #[error("certificate has expired")]
    CertificateExpired,

    #[error("CA certificate is not yet valid")]
    CaNotYetValid,

    #[error("CA certificate has expired")]
    CaExpired,

    #[error("signature provider is unavailable: {0}")]
    ProviderUnavailable(String),
}

impl VerifyFailure {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            VerifyFailure::MalformedPublicKey(_) => "malformed_public_key",
            VerifyFailure::MalformedSignature { .. } => "malformed_signature",
            VerifyFailure::SignatureMismatch => "signature_mismatch",
            VerifyFailure::MalformedCertificate(_) => "malformed_certificate",
            VerifyFailure::IssuerNameMismatch { .. } => "issuer_name_mismatch",
            VerifyFailure::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            VerifyFailure::UnhandledCriticalExtension(_) => "unhandled_critical_extension",
            VerifyFailure::IssuerNotCa(_) => "issuer_not_ca",
            VerifyFailure::CertificateNotYetValid => "certificate_not_yet_valid",
            VerifyFailure::CertificateExpired => "certificate_expired",
            VerifyFailure::CaNotYetValid => "ca_not_yet_valid",
            VerifyFailure::CaExpired => "ca_expired",
            VerifyFailure::ProviderUnavailable(_) => "provider_unavailable",
        }
    }
}

/// Outcome of a signature or chain verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Valid,
    Invalid(VerifyFailure),
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verification::Valid)
    }

    /// The rejection reason, if any.
    pub fn failure(&self) -> Option<&VerifyFailure> {
        match self {
            Verification::Valid => None,
            Verification::Invalid(failure) => Some(failure),
        }
    }
}

impl From<std::result::Result<(), VerifyFailure>> for Verification {
    fn from(result: std::result::Result<(), VerifyFailure>) -> Self {
        match result {
            Ok(()) => Verification::Valid,
            Err(failure) => Verification::Invalid(failure),
        }
    }
}

type Check = std::result::Result<(), VerifyFailure>;

fn key_failure(err: PqCertKitError) -> VerifyFailure {
    match err {
        PqCertKitError::UnsupportedKeyType(alg) => VerifyFailure::UnsupportedAlgorithm(alg),
        other => VerifyFailure::MalformedPublicKey(other.to_string()),
    }
}

fn malformed(err: impl std::fmt::Display) -> VerifyFailure {
    VerifyFailure::MalformedCertificate(err.to_string())
}

fn check_signature(public_key: &PublicKey, message: &[u8], signature: &[u8]) -> Check {
    let expected = public_key.algorithm().scheme().signature_len();
    if signature.len() != expected {
        return Err(VerifyFailure::MalformedSignature {
            expected,
            actual: signature.len(),
        });
    }
    match public_key.verify(message, signature) {
        Ok(true) => Ok(()),
        Ok(false) => Err(VerifyFailure::SignatureMismatch),
        Err(e) => Err(key_failure(e)),
    }
}

fn report(context: &'static str, result: Check) -> Verification {
    if let Err(failure) = &result {
        warn!(reason = failure.code(), error = %failure, "{context} verification failed");
    }
    result.into()
}

/// Verifies `signature` over `message` with a raw ML-DSA-65 public key.
pub fn verify_message(public_key: &[u8], message: &[u8], signature: &[u8]) -> Verification {
    let result = PublicKey::from_bytes(public_key)
        .map_err(key_failure)
        .and_then(|key| check_signature(&key, message, signature));
    report("message signature", result)
}

/// Verifies `signature` over `message` with the subject key of a PEM certificate.
///
/// The certificate itself is not validated; use [`ChainVerifier`] for that.
pub fn verify_message_with_certificate(
    certificate_pem: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Verification {
    let result = Certificate::from_pem(certificate_pem)
        .map_err(malformed)
        .and_then(|cert| cert.public_key().map_err(key_failure))
        .and_then(|key| check_signature(&key, message, signature));
    report("message signature", result)
}

/// Checks that a certificate was issued by a single trusted CA certificate.
///
/// Nothing is cached between calls.
#[derive(Clone)]
pub struct ChainVerifier {
    clock: Arc<dyn Clock>,
}

impl Default for ChainVerifier {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl ChainVerifier {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Verifies PEM encoded inputs. Unparsable input is reported as
    /// `malformed_certificate`.
    pub fn verify_issued_by_pem(&self, certificate_pem: &[u8], ca_pem: &[u8]) -> Verification {
        let parsed = Certificate::from_pem(certificate_pem)
            .and_then(|cert| Ok((cert, Certificate::from_pem(ca_pem)?)))
            .map_err(malformed);
        match parsed {
            Ok((cert, ca)) => self.verify_issued_by(&cert, &ca),
            Err(failure) => report("certificate chain", Err(failure)),
        }
    }

    /// Verifies that `cert` was issued by `ca`.
    pub fn verify_issued_by(&self, cert: &Certificate, ca: &Certificate) -> Verification {
        let result = self.check(cert, ca);
        if result.is_ok() {
            debug!(subject = %cert.subject(), issuer = %ca.subject(), "certificate chain verified");
        }
        report("certificate chain", result)
    }

    fn check(&self, cert: &Certificate, ca: &Certificate) -> Check {
        let tbs = &cert.inner.tbs_certificate;
        let ca_tbs = &ca.inner.tbs_certificate;

        if tbs.issuer != ca_tbs.subject {
            return Err(VerifyFailure::IssuerNameMismatch {
                issuer: cert.issuer().to_string(),
                ca_subject: ca.subject().to_string(),
            });
        }

        if cert.inner.signature_algorithm != tbs.signature {
            return Err(VerifyFailure::UnsupportedAlgorithm(
                "outer and inner signature algorithms differ".to_string(),
            ));
        }
        let algorithm = SignatureAlgorithm::from_algorithm_identifier(&tbs.signature)
            .map_err(|e| VerifyFailure::UnsupportedAlgorithm(e.to_string()))?;

        let ca_key = ca.public_key().map_err(key_failure)?;
        if ca_key.algorithm() != algorithm {
            return Err(VerifyFailure::UnsupportedAlgorithm(format!(
                "certificate is signed with {algorithm} but the CA key is {}",
                ca_key.algorithm()
            )));
        }
        let signature = cert
            .inner
            .signature
            .as_bytes()
            .ok_or(VerifyFailure::SignatureMismatch)?;
        let tbs_der = tbs.to_der().map_err(malformed)?;
        check_signature(&ca_key, &tbs_der, signature)?;

        for c in [cert, ca] {
            if let Some(ext) = c
                .extensions()
                .iter()
                .find(|ext| ext.critical && !is_recognized(&ext.oid))
            {
                return Err(VerifyFailure::UnhandledCriticalExtension(ext.oid.to_string()));
            }
        }

        // a self-signed certificate checked against itself needs no CA flags
        if cert != ca {
            check_ca_capability(ca)?;
        }

        let now = self.clock.now();
        check_window(
            cert,
            now,
            VerifyFailure::CertificateNotYetValid,
            VerifyFailure::CertificateExpired,
        )?;
        check_window(
            ca,
            now,
            VerifyFailure::CaNotYetValid,
            VerifyFailure::CaExpired,
        )
    }
}

fn check_ca_capability(ca: &Certificate) -> Check {
    let basic_constraints = ca.basic_constraints().map_err(malformed)?;
    let key_usage = ca.key_usage().map_err(malformed)?;

    if let Some(bc) = basic_constraints {
        if !bc.is_ca {
            return Err(VerifyFailure::IssuerNotCa("basicConstraints cA is false".into()));
        }
    }
    if let Some(ku) = key_usage {
        if !ku.contains(KeyUsages::KeyCertSign) {
            return Err(VerifyFailure::IssuerNotCa("keyUsage lacks keyCertSign".into()));
        }
    }
    if basic_constraints.is_none()
        && key_usage.is_none()
        && ca.inner.tbs_certificate.version != Version::V1
    {
        return Err(VerifyFailure::IssuerNotCa(
            "no basicConstraints or keyUsage on a v3 certificate".into(),
        ));
    }
    Ok(())
}

fn check_window(
    cert: &Certificate,
    now: OffsetDateTime,
    not_yet_valid: VerifyFailure,
    expired: VerifyFailure,
) -> Check {
    if now < cert.not_before().map_err(malformed)? {
        return Err(not_yet_valid);
    }
    if now > cert.not_after().map_err(malformed)? {
        return Err(expired);
    }
    Ok(())
}

/// Verifies that `cert` was issued by `ca` against the system clock.
pub fn verify_issued_by(cert: &Certificate, ca: &Certificate) -> Verification {
    ChainVerifier::default().verify_issued_by(cert, ca)
}
