//! # pqcertkit - Post-Quantum X.509 Identities in Pure Rust
//!
//! pqcertkit issues and validates ML-DSA-65 (FIPS 204) identities with
//! standard X.509 structures. It is built on the RustCrypto ASN.1 stack and
//! the `fips204` primitive, with no OpenSSL dependency (except for testing).
//!
//! ## Pipeline
//!
//! A certificate is issued in a fixed order:
//!
//! 1. generate a key pair ([`key::KeyPair`])
//! 2. build a PKCS#10 request from ordered `key=value` subject entries ([`csr`])
//! 3. verify the request's self-signature (proof of possession)
//! 4. verify that the signing key belongs to the issuer
//! 5. assemble and sign the certificate ([`issuer`])
//!
//! Steps 3 and 4 are never skipped, for self-signed and CA-signed issuance
//! alike. Chain checks against a single CA certificate live in [`verify`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pqcertkit::{
//!     cert::params::parse_subject,
//!     csr::CertificateSigningRequest,
//!     issuer::CertificateIssuer,
//!     key::KeyPair,
//!     verify::verify_issued_by,
//! };
//!
//! # fn main() -> Result<(), pqcertkit::error::PqCertKitError> {
//! pqcertkit::provider::init()?;
//!
//! let ca_key = KeyPair::generate_ml_dsa_65()?;
//! let ca_subject = parse_subject(&["CN=Example CA", "O=Example Corp", "C=US"])?;
//! let ca_csr = CertificateSigningRequest::build(ca_key.private_key(), ca_key.public_key(), &ca_subject)?;
//!
//! let issuer = CertificateIssuer::default();
//! let ca_cert = issuer.issue_self_signed(&ca_csr, ca_key.private_key(), 3650)?;
//!
//! let device_key = KeyPair::generate_ml_dsa_65()?;
//! let device_subject = parse_subject(&["CN=device-42"])?;
//! let device_csr = CertificateSigningRequest::build(
//!     device_key.private_key(),
//!     device_key.public_key(),
//!     &device_subject,
//! )?;
//! let device_cert = issuer.issue_ca_signed(&device_csr, &ca_cert, ca_key.private_key(), 365)?;
//!
//! assert!(verify_issued_by(&device_cert, &ca_cert).is_valid());
//! println!("{}", device_cert.to_pem()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Buffer API
//!
//! The functions re-exported at the crate root take raw key bytes and PEM
//! text and write their output into caller buffers. A buffer that is too
//! small yields [`error::PqCertKitError::BufferTooSmall`] with the size needed.
//!
//! ```rust,no_run
//! # fn main() -> Result<(), pqcertkit::error::PqCertKitError> {
//! let pair = pqcertkit::generate_keypair()?;
//! let (private_key, public_key) = (pair.private_key().as_bytes(), pair.public_key().as_bytes());
//!
//! let mut csr = vec![0u8; 16 * 1024];
//! let n = pqcertkit::build_csr(private_key, public_key, &["CN=Test User", "O=Test Org", "C=US"], &mut csr)?;
//!
//! let mut cert = vec![0u8; 16 * 1024];
//! let m = pqcertkit::issue_self_signed_certificate(&csr[..n], private_key, 30, &mut cert)?;
//! assert!(pqcertkit::verify_certificate_issued_by(&cert[..m], &cert[..m]).is_valid());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`provider`]: the ML-DSA-65 primitive and its start-up self-test
//! - [`key`]: key pairs, raw and PEM key import/export, message signing
//! - [`csr`]: certificate signing requests
//! - [`cert`]: certificates, subject names, validity and extensions
//! - [`issuer`]: the issuance pipeline and its self-signed and CA variants
//! - [`verify`]: message and certificate chain verification
//! - [`config`]: issuance policy loaded from TOML
//! - [`error`]: error type

pub mod api;
pub mod buffer;
pub mod cert;
pub mod clock;
pub mod config;
pub mod csr;
pub mod error;
pub mod issuer;
pub mod key;
pub mod pem_utils;
pub mod provider;
pub mod serial;
pub mod tbs_certificate;
pub mod verify;

pub use api::{
    build_csr, extract_public_key_from_certificate, generate_keypair, issue_ca_signed_certificate,
    issue_self_signed_certificate, sha256_digest, sign_message, verify_certificate_issued_by,
    verify_message, verify_message_with_certificate,
};
pub use verify::{Verification, VerifyFailure};
