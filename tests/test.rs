mod util;

use der::Encode;
use pqcertkit::cert::Certificate;
use pqcertkit::cert::params::{ExtensionParam, SECONDS_PER_DAY, parse_subject};
use pqcertkit::clock::FixedClock;
use pqcertkit::config::{IssuancePolicy, SerialStrategy};
use pqcertkit::csr::CertificateSigningRequest;
use pqcertkit::error::{PqCertKitError, Result};
use pqcertkit::issuer::{CertificateIssuer, Issuer, SelfIssuer};
use pqcertkit::key::{KeyPair, PrivateKey, PublicKey};
use pqcertkit::verify::{ChainVerifier, verify_issued_by};
use pqcertkit::{Verification, VerifyFailure};
use std::sync::Arc;
use time::OffsetDateTime;
use x509_cert::name::Name;

const BUF: usize = 32 * 1024;

fn reason(outcome: &Verification) -> &'static str {
    outcome.failure().map(VerifyFailure::code).unwrap_or("valid")
}

/// Key pair → subject → CSR → 30 day self-signed certificate, entirely
/// through the buffer API.
#[test]
fn self_signed_scenario() -> Result<()> {
    let pair = pqcertkit::generate_keypair()?;
    let private_key = pair.private_key().as_bytes();
    let public_key = pair.public_key().as_bytes();
    assert_eq!(public_key.len(), 1952);
    assert_eq!(private_key.len(), 4032);

    let mut csr = vec![0u8; BUF];
    let n = pqcertkit::build_csr(
        private_key,
        public_key,
        &["CN=Test User", "O=Test Org", "C=US"],
        &mut csr,
    )?;
    let csr = &csr[..n];
    assert!(pqcertkit::csr::verify_csr_self_signature(csr)?);

    let mut out = vec![0u8; BUF];
    let m = pqcertkit::issue_self_signed_certificate(csr, private_key, 30, &mut out)?;
    let pem = &out[..m];
    assert!(!pem.is_empty());
    assert!(pem.starts_with(b"-----BEGIN CERTIFICATE-----"));
    assert!(pqcertkit::verify_certificate_issued_by(pem, pem).is_valid());

    let cert = Certificate::from_pem(pem)?;
    let request = CertificateSigningRequest::from_pem(csr)?;
    assert_eq!(cert.subject(), request.subject());
    assert_eq!(cert.issuer(), request.subject());
    assert_eq!(cert.inner.tbs_certificate.subject, *request.subject_name());
    assert_eq!(
        (cert.not_after()? - cert.not_before()?).whole_seconds(),
        30 * SECONDS_PER_DAY
    );
    assert_eq!(cert.serial_number().len(), 16);
    assert!(cert.is_ca());
    Ok(())
}

#[test]
fn csr_with_unrelated_public_key_fails_self_check() -> Result<()> {
    let signer = KeyPair::generate_ml_dsa_65()?;
    let unrelated = KeyPair::generate_ml_dsa_65()?;
    let subject = parse_subject(&["CN=mismatch"])?;

    let good = CertificateSigningRequest::build(signer.private_key(), signer.public_key(), &subject)?;
    assert!(good.verify_self_signature()?);

    let bad = CertificateSigningRequest::build(signer.private_key(), unrelated.public_key(), &subject)?;
    assert!(!bad.verify_self_signature()?);

    let err = CertificateIssuer::default()
        .issue_self_signed(&bad, signer.private_key(), 30)
        .unwrap_err();
    assert_eq!(err, PqCertKitError::InvalidCsrSignature);
    Ok(())
}

#[test]
fn ca_signed_certificate_verifies_against_its_ca() -> Result<()> {
    let ca = util::generate_ca_cert()?;
    let ca_pem = ca.cert.to_pem()?;

    let leaf = KeyPair::generate_ml_dsa_65()?;
    let csr = util::request(&leaf, &["CN=server.myca.local"])?.to_pem()?;

    let mut out = vec![0u8; BUF];
    let n = pqcertkit::issue_ca_signed_certificate(
        csr.as_bytes(),
        ca_pem.as_bytes(),
        ca.key.private_key().as_bytes(),
        365,
        &mut out,
    )?;
    let leaf_pem = &out[..n];
    assert!(pqcertkit::verify_certificate_issued_by(leaf_pem, ca_pem.as_bytes()).is_valid());

    let cert = Certificate::from_pem(leaf_pem)?;
    assert_eq!(cert.issuer(), ca.cert.subject());
    assert_eq!(cert.subject().get("CN"), Some("server.myca.local"));
    assert!(!cert.is_ca());
    assert!(cert.extensions().is_empty());

    // the CA does not verify against its own leaf
    let reversed = pqcertkit::verify_certificate_issued_by(ca_pem.as_bytes(), leaf_pem);
    assert_eq!(reason(&reversed), "issuer_name_mismatch");
    Ok(())
}

#[test]
fn unrelated_ca_is_rejected() -> Result<()> {
    let issuer = CertificateIssuer::default();
    let ca = util::generate_ca_cert_with(&issuer, "myca.local")?;
    let other_name = util::generate_ca_cert_with(&issuer, "other.local")?;
    let same_name = util::generate_ca_cert_with(&issuer, "myca.local")?;

    let leaf = KeyPair::generate_ml_dsa_65()?;
    let csr = util::request(&leaf, &["CN=leaf"])?;
    let cert = issuer.issue_ca_signed(&csr, &ca.cert, ca.key.private_key(), 30)?;

    assert!(verify_issued_by(&cert, &ca.cert).is_valid());
    assert_eq!(reason(&verify_issued_by(&cert, &other_name.cert)), "issuer_name_mismatch");
    assert_eq!(reason(&verify_issued_by(&cert, &same_name.cert)), "signature_mismatch");
    Ok(())
}

#[test]
fn validity_window_is_checked_against_the_clock() -> Result<()> {
    // 2020-01-01T00:00:00Z
    let issued_at = 1_577_836_800;
    let issuer = util::issuer_at(issued_at);
    let ca = util::generate_ca_cert_with(&issuer, "past-ca")?;

    let leaf = KeyPair::generate_ml_dsa_65()?;
    let cert = issuer.issue_ca_signed(&util::request(&leaf, &["CN=short"])?, &ca.cert, ca.key.private_key(), 1)?;

    let at = |t: i64| ChainVerifier::new(Arc::new(FixedClock(OffsetDateTime::from_unix_timestamp(t).unwrap())));

    assert!(at(issued_at).verify_issued_by(&cert, &ca.cert).is_valid());
    assert!(at(issued_at + SECONDS_PER_DAY).verify_issued_by(&cert, &ca.cert).is_valid());
    assert_eq!(
        reason(&at(issued_at + SECONDS_PER_DAY + 1).verify_issued_by(&cert, &ca.cert)),
        "certificate_expired"
    );
    assert_eq!(
        reason(&at(issued_at - 1).verify_issued_by(&cert, &ca.cert)),
        "certificate_not_yet_valid"
    );

    // the system clock is long past the leaf's single day
    assert_eq!(reason(&verify_issued_by(&cert, &ca.cert)), "certificate_expired");

    let ca_only = at(issued_at + 3651 * SECONDS_PER_DAY).verify_issued_by(&ca.cert, &ca.cert);
    assert_eq!(reason(&ca_only), "certificate_expired");
    Ok(())
}

#[test]
fn flipped_signature_bit_is_rejected() -> Result<()> {
    let ca = util::generate_ca_cert()?;
    let mut der = ca.cert.to_der()?;
    let last = der.len() - 1;
    der[last] ^= 0x01;

    let tampered = Certificate::from_der(&der)?;
    assert_eq!(reason(&verify_issued_by(&tampered, &ca.cert)), "signature_mismatch");
    assert_eq!(reason(&verify_issued_by(&tampered, &tampered)), "signature_mismatch");
    Ok(())
}

#[test]
fn leaf_cannot_act_as_ca() -> Result<()> {
    let issuer = CertificateIssuer::default();
    let ca = util::generate_ca_cert_with(&issuer, "root")?;

    let middle = KeyPair::generate_ml_dsa_65()?;
    let middle_cert =
        issuer.issue_ca_signed(&util::request(&middle, &["CN=middle"])?, &ca.cert, ca.key.private_key(), 30)?;

    let leaf = KeyPair::generate_ml_dsa_65()?;
    let leaf_cert = issuer.issue_ca_signed(
        &util::request(&leaf, &["CN=leaf"])?,
        &middle_cert,
        middle.private_key(),
        30,
    )?;
    assert_eq!(reason(&verify_issued_by(&leaf_cert, &middle_cert)), "issuer_not_ca");
    Ok(())
}

#[test]
fn ca_key_must_match_ca_certificate() -> Result<()> {
    let ca = util::generate_ca_cert()?;
    let impostor = KeyPair::generate_ml_dsa_65()?;
    let leaf = KeyPair::generate_ml_dsa_65()?;
    let csr = util::request(&leaf, &["CN=leaf"])?.to_pem()?;

    let mut out = vec![0u8; BUF];
    let err = pqcertkit::issue_ca_signed_certificate(
        csr.as_bytes(),
        ca.cert.to_pem()?.as_bytes(),
        impostor.private_key().as_bytes(),
        30,
        &mut out,
    )
    .unwrap_err();
    assert!(matches!(err, PqCertKitError::SigningError(_)));
    assert!(out.iter().all(|b| *b == 0));

    let csr = CertificateSigningRequest::from_pem(csr.as_bytes())?;
    let err = CertificateIssuer::default()
        .issue_ca_signed(&csr, &ca.cert, impostor.private_key(), 30)
        .unwrap_err();
    assert!(matches!(err, PqCertKitError::KeyMismatch(_)));
    Ok(())
}

#[test]
fn tampered_csr_is_rejected_by_the_ca() -> Result<()> {
    let ca = util::generate_ca_cert()?;
    let leaf = KeyPair::generate_ml_dsa_65()?;
    let mut csr = util::request(&leaf, &["CN=honest"])?;
    csr.inner.info.subject = parse_subject(&["CN=forged"])?.as_x509_name()?;

    let mut out = vec![0u8; BUF];
    let err = pqcertkit::issue_ca_signed_certificate(
        csr.to_pem()?.as_bytes(),
        ca.cert.to_pem()?.as_bytes(),
        ca.key.private_key().as_bytes(),
        30,
        &mut out,
    )
    .unwrap_err();
    assert_eq!(err, PqCertKitError::InvalidCsrSignature);
    Ok(())
}

#[test]
fn short_buffer_reports_required_size() -> Result<()> {
    let pair = pqcertkit::generate_keypair()?;
    let csr = util::request(&pair, &["CN=Test User", "O=Test Org", "C=US"])?.to_pem()?;
    let private_key = pair.private_key().as_bytes();

    let mut short = vec![0x5au8; 64];
    let required = match pqcertkit::issue_self_signed_certificate(csr.as_bytes(), private_key, 30, &mut short) {
        Err(PqCertKitError::BufferTooSmall { required }) => required,
        other => panic!("expected BufferTooSmall, got {other:?}"),
    };
    assert!(short.iter().all(|b| *b == 0x5a));
    assert!(required > 64);

    let mut exact = vec![0u8; required];
    let n = pqcertkit::issue_self_signed_certificate(csr.as_bytes(), private_key, 30, &mut exact)?;
    assert_eq!(n, required);
    assert!(pqcertkit::verify_certificate_issued_by(&exact, &exact).is_valid());
    Ok(())
}

#[test]
fn size_query_does_not_use_up_a_sequential_serial() -> Result<()> {
    let policy = IssuancePolicy::builder()
        .serial(SerialStrategy::Sequential { start: 0x7f })
        .build();
    let issuer = CertificateIssuer::from_policy(policy)?;
    let pair = pqcertkit::generate_keypair()?;
    let csr = util::request(&pair, &["CN=Test User"])?.to_pem()?;
    let private_key = pair.private_key().as_bytes();

    let required = match issuer.issue_self_signed_certificate(csr.as_bytes(), private_key, 30, &mut Vec::new()) {
        Err(PqCertKitError::BufferTooSmall { required }) => required,
        other => panic!("expected BufferTooSmall, got {other:?}"),
    };

    let mut exact = vec![0u8; required];
    let n = issuer.issue_self_signed_certificate(csr.as_bytes(), private_key, 30, &mut exact)?;
    assert_eq!(n, required);
    let first = Certificate::from_pem(&exact)?;
    assert_eq!(first.serial_number(), [0x01, 0, 0, 0, 0, 0, 0, 0, 0x7f]);

    // the next serial crosses a byte boundary without changing the size
    let mut again = vec![0u8; required];
    assert_eq!(
        issuer.issue_self_signed_certificate(csr.as_bytes(), private_key, 30, &mut again)?,
        required
    );
    let second = Certificate::from_pem(&again)?;
    assert_eq!(second.serial_number(), [0x01, 0, 0, 0, 0, 0, 0, 0, 0x80]);
    Ok(())
}

#[test]
fn message_signatures_round_trip() -> Result<()> {
    let pair = pqcertkit::generate_keypair()?;
    let public_key = pair.public_key().as_bytes();
    let mut signature = vec![0u8; 3309];

    for len in [1usize, 32, 4096, 1 << 20] {
        let message: Vec<u8> = (0..len).map(|i| (i * 31 % 251) as u8).collect();
        let n = pqcertkit::sign_message(pair.private_key().as_bytes(), &message, &mut signature)?;
        assert_eq!(n, 3309);
        assert!(pqcertkit::verify_message(public_key, &message, &signature).is_valid());

        for pos in [0, len / 2, len - 1] {
            let mut flipped = message.clone();
            flipped[pos] ^= 0x80;
            assert_eq!(
                reason(&pqcertkit::verify_message(public_key, &flipped, &signature)),
                "signature_mismatch"
            );
        }
    }

    // `signature` now covers the largest message
    let message: Vec<u8> = (0..(1usize << 20)).map(|i| (i * 31 % 251) as u8).collect();
    for pos in [0, 1000, 3308] {
        let mut flipped = signature.clone();
        flipped[pos] ^= 0x01;
        assert!(!pqcertkit::verify_message(public_key, &message, &flipped).is_valid());
    }
    Ok(())
}

#[test]
fn certificate_key_extraction_and_message_verification() -> Result<()> {
    let ca = util::generate_ca_cert()?;
    let pem = ca.cert.to_pem()?;

    let mut out = vec![0u8; BUF];
    let n = pqcertkit::extract_public_key_from_certificate(pem.as_bytes(), &mut out)?;
    let key_pem = std::str::from_utf8(&out[..n]).unwrap();
    assert!(key_pem.starts_with("-----BEGIN PUBLIC KEY-----"));
    assert_eq!(PublicKey::from_pem(key_pem)?, *ca.key.public_key());

    let signature = ca.key.sign(b"attested payload")?;
    assert!(pqcertkit::verify_message_with_certificate(pem.as_bytes(), b"attested payload", &signature).is_valid());
    assert!(!pqcertkit::verify_message_with_certificate(pem.as_bytes(), b"other payload", &signature).is_valid());
    assert_eq!(
        reason(&pqcertkit::verify_message_with_certificate(b"garbage", b"m", &signature)),
        "malformed_certificate"
    );
    Ok(())
}

#[test]
fn private_key_pem_round_trip_still_issues() -> Result<()> {
    let pair = KeyPair::generate_ml_dsa_65()?;
    let loaded = PrivateKey::from_pkcs8_pem(&pair.private_key().to_pkcs8_pem()?)?;
    let csr = util::request(&pair, &["CN=reloaded"])?;
    let cert = CertificateIssuer::default().issue_self_signed(&csr, &loaded, 10)?;
    assert!(verify_issued_by(&cert, &cert).is_valid());
    Ok(())
}

/// Self-issues with an extra critical extension no verifier knows about.
struct ExperimentalIssuer<'a>(SelfIssuer<'a>);

impl Issuer for ExperimentalIssuer<'_> {
    fn issuer_name(&self, request: &CertificateSigningRequest) -> Name {
        self.0.issuer_name(request)
    }

    fn signing_key(&self) -> &PrivateKey {
        self.0.signing_key()
    }

    fn issuer_public_key(&self, request: &CertificateSigningRequest) -> Result<PublicKey> {
        self.0.issuer_public_key(request)
    }

    fn extensions(&self) -> Result<Vec<ExtensionParam>> {
        let mut extensions = self.0.extensions()?;
        extensions.push(ExtensionParam {
            oid: const_oid::ObjectIdentifier::new_unwrap("1.3.6.1.4.1.55555.1"),
            critical: true,
            value: der::asn1::Null.to_der()?,
        });
        Ok(extensions)
    }
}

#[test]
fn unknown_critical_extension_is_rejected() -> Result<()> {
    let pair = KeyPair::generate_ml_dsa_65()?;
    let csr = util::request(&pair, &["CN=experimental"])?;
    let issuer = ExperimentalIssuer(SelfIssuer { key: pair.private_key() });
    let cert = CertificateIssuer::default().issue_with(&issuer, &csr, 30)?;

    assert_eq!(cert.extensions().len(), 3);
    assert_eq!(
        reason(&verify_issued_by(&cert, &cert)),
        "unhandled_critical_extension"
    );
    Ok(())
}
