//! Flat call surface over caller-owned buffers.
//!
//! Keys, requests and certificates cross this boundary as raw bytes or PEM
//! text. Every output is written into a caller buffer; when the buffer is too
//! short the call fails with [`PqCertKitError::BufferTooSmall`], leaves the
//! buffer untouched and reports the size needed.
//!
//! Each entry point brings the signature provider up on first use.
//!
//! Errors are reported in the coarse classes of a foreign-function boundary:
//! an issuer key that does not match the issuer public key surfaces as
//! [`PqCertKitError::SigningError`]. The typed API in [`crate::issuer`]
//! reports it as [`PqCertKitError::KeyMismatch`].

use sha2::{Digest, Sha256};

use crate::buffer::write_output;
use crate::cert::Certificate;
use crate::cert::params::parse_subject;
use crate::csr::CertificateSigningRequest;
use crate::error::{PqCertKitError, Result};
use crate::issuer::CertificateIssuer;
use crate::key::{KeyPair, PrivateKey, PublicKey};
use crate::provider;
use crate::verify::{self, ChainVerifier, Verification, VerifyFailure};

/// Generates an ML-DSA-65 key pair (1952-byte public key, 4032-byte private key).
pub fn generate_keypair() -> Result<KeyPair> {
    provider::init()?;
    KeyPair::generate_ml_dsa_65()
}

/// Builds a PEM certificate request for `public_key` with the given subject
/// entries, signed with `private_key`.
pub fn build_csr<S: AsRef<str>>(
    private_key: &[u8],
    public_key: &[u8],
    subject_entries: &[S],
    out: &mut [u8],
) -> Result<usize> {
    provider::init()?;
    let subject = parse_subject(subject_entries)?;
    let private_key = PrivateKey::from_bytes(private_key)?;
    let public_key = PublicKey::from_bytes(public_key)?;
    let csr = CertificateSigningRequest::build(&private_key, &public_key, &subject)?;
    write_output(out, csr.to_pem()?.as_bytes())
}

/// Issues a self-signed PEM certificate from a PEM request.
///
/// A `private_key` that does not belong to the request's public key fails
/// with [`PqCertKitError::SigningError`].
pub fn issue_self_signed_certificate(
    csr_pem: &[u8],
    private_key: &[u8],
    validity_days: u32,
    out: &mut [u8],
) -> Result<usize> {
    CertificateIssuer::default().issue_self_signed_certificate(csr_pem, private_key, validity_days, out)
}

/// Issues a CA-signed PEM certificate from a PEM request.
///
/// A `ca_private_key` that does not belong to the CA certificate's public key
/// fails with [`PqCertKitError::SigningError`].
pub fn issue_ca_signed_certificate(
    csr_pem: &[u8],
    ca_certificate_pem: &[u8],
    ca_private_key: &[u8],
    validity_days: u32,
    out: &mut [u8],
) -> Result<usize> {
    CertificateIssuer::default().issue_ca_signed_certificate(
        csr_pem,
        ca_certificate_pem,
        ca_private_key,
        validity_days,
        out,
    )
}

impl CertificateIssuer {
    /// Buffer form of [`CertificateIssuer::issue_self_signed`].
    pub fn issue_self_signed_certificate(
        &self,
        csr_pem: &[u8],
        private_key: &[u8],
        validity_days: u32,
        out: &mut [u8],
    ) -> Result<usize> {
        provider::init()?;
        let csr = CertificateSigningRequest::from_pem(csr_pem)?;
        let key = PrivateKey::from_bytes(private_key)?;
        let cert = self
            .issue_self_signed(&csr, &key, validity_days)
            .map_err(signing_class)?;
        self.write_issued(&cert, out)
    }

    /// Buffer form of [`CertificateIssuer::issue_ca_signed`].
    pub fn issue_ca_signed_certificate(
        &self,
        csr_pem: &[u8],
        ca_certificate_pem: &[u8],
        ca_private_key: &[u8],
        validity_days: u32,
        out: &mut [u8],
    ) -> Result<usize> {
        provider::init()?;
        let csr = CertificateSigningRequest::from_pem(csr_pem)?;
        let ca_cert = parse_ca_certificate(ca_certificate_pem)?;
        let ca_key = PrivateKey::from_bytes(ca_private_key)?;
        let cert = self
            .issue_ca_signed(&csr, &ca_cert, &ca_key, validity_days)
            .map_err(signing_class)?;
        self.write_issued(&cert, out)
    }
}

fn signing_class(err: PqCertKitError) -> PqCertKitError {
    match err {
        PqCertKitError::KeyMismatch(msg) => PqCertKitError::SigningError(msg),
        other => other,
    }
}

fn parse_ca_certificate(pem: &[u8]) -> Result<Certificate> {
    Certificate::from_pem(pem).map_err(|e| match e {
        PqCertKitError::CertificateParseError(msg) => PqCertKitError::CaCertParseError(msg),
        other => other,
    })
}

/// Signs `message` and writes the 3309-byte signature into `out`.
pub fn sign_message(private_key: &[u8], message: &[u8], out: &mut [u8]) -> Result<usize> {
    provider::init()?;
    let key = PrivateKey::from_bytes(private_key)?;
    let required = key.algorithm().scheme().signature_len();
    if out.len() < required {
        return Err(PqCertKitError::BufferTooSmall { required });
    }
    let signature = key.sign(message).map_err(|e| match e {
        PqCertKitError::SigningError(msg) => PqCertKitError::PrimitiveFailure(msg),
        other => other,
    })?;
    write_output(out, &signature)
}

/// Verifies a message signature with a raw public key.
pub fn verify_message(public_key: &[u8], message: &[u8], signature: &[u8]) -> Verification {
    if let Err(failure) = provider_ready() {
        return Verification::Invalid(failure);
    }
    verify::verify_message(public_key, message, signature)
}

/// Verifies that a PEM certificate was issued by a PEM CA certificate.
pub fn verify_certificate_issued_by(certificate_pem: &[u8], ca_pem: &[u8]) -> Verification {
    if let Err(failure) = provider_ready() {
        return Verification::Invalid(failure);
    }
    ChainVerifier::default().verify_issued_by_pem(certificate_pem, ca_pem)
}

/// Writes the subject public key of a PEM certificate into `out` as a
/// `PUBLIC KEY` PEM document.
pub fn extract_public_key_from_certificate(certificate_pem: &[u8], out: &mut [u8]) -> Result<usize> {
    provider::init()?;
    let key = Certificate::from_pem(certificate_pem)?.public_key()?;
    write_output(out, key.to_pem()?.as_bytes())
}

/// Verifies a message signature with the subject key of a PEM certificate.
pub fn verify_message_with_certificate(
    certificate_pem: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Verification {
    if let Err(failure) = provider_ready() {
        return Verification::Invalid(failure);
    }
    verify::verify_message_with_certificate(certificate_pem, message, signature)
}

fn provider_ready() -> std::result::Result<(), VerifyFailure> {
    provider::init().map_err(|e| VerifyFailure::ProviderUnavailable(e.to_string()))
}

/// SHA-256 of `message`.
pub fn sha256_digest(message: &[u8]) -> [u8; 32] {
    Sha256::digest(message).into()
}
