#![allow(dead_code)]

use std::sync::Arc;

use pqcertkit::cert::Certificate;
use pqcertkit::cert::params::parse_subject;
use pqcertkit::clock::FixedClock;
use pqcertkit::csr::CertificateSigningRequest;
use pqcertkit::error::Result;
use pqcertkit::issuer::CertificateIssuer;
use pqcertkit::key::KeyPair;
use time::OffsetDateTime;

/// A CA certificate together with its key pair.
pub struct CaWithKey {
    pub cert: Certificate,
    pub key: KeyPair,
}

/// Builds a request for `pair` with the given subject entries.
pub fn request(pair: &KeyPair, subject: &[&str]) -> Result<CertificateSigningRequest> {
    let subject = parse_subject(subject)?;
    CertificateSigningRequest::build(pair.private_key(), pair.public_key(), &subject)
}

pub fn generate_ca_cert_with(issuer: &CertificateIssuer, common_name: &str) -> Result<CaWithKey> {
    let key = KeyPair::generate_ml_dsa_65()?;
    let cn = format!("CN={common_name}");
    let csr = request(&key, &[cn.as_str(), "O=Test Org"])?;
    let cert = issuer.issue_self_signed(&csr, key.private_key(), 3650)?;
    Ok(CaWithKey { cert, key })
}

pub fn generate_ca_cert() -> Result<CaWithKey> {
    generate_ca_cert_with(&CertificateIssuer::default(), "myca.local")
}

/// An issuer whose clock is stopped at `unix_timestamp`.
pub fn issuer_at(unix_timestamp: i64) -> CertificateIssuer {
    CertificateIssuer::builder()
        .clock(Arc::new(FixedClock(
            OffsetDateTime::from_unix_timestamp(unix_timestamp).unwrap(),
        )))
        .build()
        .unwrap()
}
