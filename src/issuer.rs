use std::sync::Arc;

use bon::bon;
use der::Encode;
use der::asn1::BitString;
use tracing::{debug, info, warn};
use x509_cert::certificate::CertificateInner;
use x509_cert::name::Name;

use crate::buffer::write_output;
use crate::cert::Certificate;
use crate::cert::extensions::{BasicConstraints, KeyUsage};
use crate::cert::params::{ExtensionParam, Validity};
use crate::clock::{Clock, SystemClock};
use crate::config::IssuancePolicy;
use crate::csr::CertificateSigningRequest;
use crate::error::{PqCertKitError, Result};
use crate::key::{PrivateKey, PublicKey, check_key_binding};
use crate::serial::{SerialNumberAllocator, to_hex};
use crate::tbs_certificate::TbsCertificate;

/// Represents an entity capable of issuing certificates.
///
/// Implementations decide who the issuer is and which key signs; the
/// verification and assembly steps in [`Issuer::issue`] are shared.
pub trait Issuer {
    /// Returns the issuer name for a certificate issued from `request`.
    fn issuer_name(&self, request: &CertificateSigningRequest) -> Name;

    /// Returns the private key that signs issued certificates.
    fn signing_key(&self) -> &PrivateKey;

    /// Returns the public key the signing key must correspond to.
    fn issuer_public_key(&self, request: &CertificateSigningRequest) -> Result<PublicKey>;

    /// Returns the extensions attached to issued certificates.
    fn extensions(&self) -> Result<Vec<ExtensionParam>>;

    /// Issues a certificate for `request`.
    ///
    /// The request's self-signature is checked first, then the binding of the
    /// signing key to the issuer public key. Only then are the request's
    /// subject and public key copied into the certificate.
    fn issue(
        &self,
        request: &CertificateSigningRequest,
        validity: Validity,
        serial_number: Vec<u8>,
    ) -> Result<Certificate> {
        if !request.verify_self_signature()? {
            warn!(subject = %request.subject(), "refusing to issue for request with invalid signature");
            return Err(PqCertKitError::InvalidCsrSignature);
        }
        debug!("certificate request signature verified");

        let issuer_public_key = self.issuer_public_key(request)?;
        check_key_binding(self.signing_key(), &issuer_public_key)?;
        debug!("issuer key binding verified");

        let algorithm = self.signing_key().algorithm();
        let tbs_cert = TbsCertificate {
            serial_number,
            signature_algorithm: algorithm,
            issuer: self.issuer_name(request),
            validity,
            subject: request.subject_name().clone(),
            subject_public_key: request.public_key()?,
            extensions: self.extensions()?,
        };

        let tbs_cert_inner = tbs_cert.to_tbs_certificate_inner()?;
        let signature = self.signing_key().sign(&tbs_cert_inner.to_der()?)?;

        let cert = Certificate {
            inner: CertificateInner {
                tbs_certificate: tbs_cert_inner,
                signature_algorithm: algorithm.into(),
                signature: BitString::from_bytes(&signature)?,
            },
        };
        info!(
            serial = %to_hex(cert.serial_number()),
            subject = %cert.subject(),
            issuer = %cert.issuer(),
            "issued certificate"
        );
        Ok(cert)
    }
}

/// Issues a certificate to the requester, signed with the requester's own key.
///
/// The result is a CA certificate: it carries critical basicConstraints
/// (`cA=TRUE`) and keyUsage (keyCertSign, cRLSign).
pub struct SelfIssuer<'a> {
    pub key: &'a PrivateKey,
}

impl Issuer for SelfIssuer<'_> {
    fn issuer_name(&self, request: &CertificateSigningRequest) -> Name {
        request.subject_name().clone()
    }

    fn signing_key(&self) -> &PrivateKey {
        self.key
    }

    fn issuer_public_key(&self, request: &CertificateSigningRequest) -> Result<PublicKey> {
        request.public_key()
    }

    fn extensions(&self) -> Result<Vec<ExtensionParam>> {
        let basic_constraints = BasicConstraints {
            is_ca: true,
            max_path_length: None,
        };
        Ok(vec![
            ExtensionParam::from_extension(&basic_constraints, true)?,
            ExtensionParam::from_extension(&KeyUsage::certificate_authority(), true)?,
        ])
    }
}

/// Issues leaf certificates on behalf of a CA certificate and its private key.
pub struct CaIssuer<'a> {
    pub cert: &'a Certificate,
    pub key: &'a PrivateKey,
}

impl Issuer for CaIssuer<'_> {
    fn issuer_name(&self, _request: &CertificateSigningRequest) -> Name {
        self.cert.inner.tbs_certificate.subject.clone()
    }

    fn signing_key(&self) -> &PrivateKey {
        self.key
    }

    fn issuer_public_key(&self, _request: &CertificateSigningRequest) -> Result<PublicKey> {
        self.cert
            .public_key()
            .map_err(|e| PqCertKitError::CaCertParseError(e.to_string()))
    }

    fn extensions(&self) -> Result<Vec<ExtensionParam>> {
        Ok(Vec::new())
    }
}

/// Issues certificates under an [`IssuancePolicy`].
///
/// The clock and serial allocator are injected so that issuance is
/// reproducible in tests. Without an explicit allocator, serials follow the
/// policy's [`SerialStrategy`](crate::config::SerialStrategy).
pub struct CertificateIssuer {
    policy: IssuancePolicy,
    clock: Arc<dyn Clock>,
    serials: Arc<dyn SerialNumberAllocator>,
}

impl Default for CertificateIssuer {
    fn default() -> Self {
        let policy = IssuancePolicy::default();
        Self {
            serials: policy.serial.allocator(),
            clock: Arc::new(SystemClock),
            policy,
        }
    }
}

#[bon]
impl CertificateIssuer {
    /// Validates `policy` and assembles an issuer.
    #[builder]
    pub fn new(
        #[builder(default)] policy: IssuancePolicy,
        #[builder(default = Arc::new(SystemClock) as Arc<dyn Clock>)] clock: Arc<dyn Clock>,
        serials: Option<Arc<dyn SerialNumberAllocator>>,
    ) -> Result<Self> {
        policy.validate()?;
        let serials = serials.unwrap_or_else(|| policy.serial.allocator());
        Ok(Self {
            policy,
            clock,
            serials,
        })
    }
}

impl CertificateIssuer {
    /// Creates an issuer whose serial allocator follows `policy.serial`.
    pub fn from_policy(policy: IssuancePolicy) -> Result<Self> {
        Self::builder().policy(policy).build()
    }

    pub fn policy(&self) -> &IssuancePolicy {
        &self.policy
    }

    /// Issues a self-signed certificate from `request`, signed with `key`.
    ///
    /// `key` must be the private half of the request's public key.
    pub fn issue_self_signed(
        &self,
        request: &CertificateSigningRequest,
        key: &PrivateKey,
        validity_days: u32,
    ) -> Result<Certificate> {
        self.issue_with(&SelfIssuer { key }, request, validity_days)
    }

    /// Issues a leaf certificate from `request`, signed by the CA.
    ///
    /// `ca_key` must be the private half of `ca_cert`'s public key.
    pub fn issue_ca_signed(
        &self,
        request: &CertificateSigningRequest,
        ca_cert: &Certificate,
        ca_key: &PrivateKey,
        validity_days: u32,
    ) -> Result<Certificate> {
        let issuer = CaIssuer {
            cert: ca_cert,
            key: ca_key,
        };
        self.issue_with(&issuer, request, validity_days)
    }

    /// Issues a certificate with the policy's default validity.
    pub fn issue_default<I: Issuer>(
        &self,
        issuer: &I,
        request: &CertificateSigningRequest,
    ) -> Result<Certificate> {
        self.issue_with(issuer, request, self.policy.default_validity_days)
    }

    /// Issues a certificate through any [`Issuer`].
    pub fn issue_with<I: Issuer>(
        &self,
        issuer: &I,
        request: &CertificateSigningRequest,
        validity_days: u32,
    ) -> Result<Certificate> {
        self.policy.check_validity_days(validity_days)?;
        let validity = Validity::starting_at(self.clock.now(), validity_days)?;
        let serial_number = self.serials.next_serial()?;
        issuer
            .issue(request, validity, serial_number.clone())
            .inspect_err(|_| self.serials.release(&serial_number))
    }

    /// Writes `cert` into `out` as PEM.
    ///
    /// A certificate that does not fit is discarded, so its serial goes back
    /// to the allocator.
    pub(crate) fn write_issued(&self, cert: &Certificate, out: &mut [u8]) -> Result<usize> {
        write_output(out, cert.to_pem()?.as_bytes())
            .inspect_err(|_| self.serials.release(cert.serial_number()))
    }
}
