//! PKCS#10 certificate signing requests.
//!
//! A request carries the requester's subject and public key, signed with the
//! matching private key as proof of possession. Issuance never trusts the
//! subject or key of a request whose self-signature does not verify.

use der::asn1::BitString;
use der::{Decode, Encode};
use tracing::{debug, warn};
use x509_cert::name::Name;
use x509_cert::request::{CertReq, CertReqInfo, Version};
use x509_cert::spki::AlgorithmIdentifierOwned;

use crate::cert::SignatureAlgorithm;
use crate::cert::params::SubjectName;
use crate::error::{PqCertKitError, Result};
use crate::key::{PrivateKey, PublicKey};
use crate::pem_utils::{
    CERTIFICATE_REQUEST_LABEL, NEW_CERTIFICATE_REQUEST_LABEL, der_to_pem, pem_to_der,
};

/// A decoded certificate signing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateSigningRequest {
    pub inner: CertReq,
}

impl CertificateSigningRequest {
    /// Builds a request for `public_key` under `subject`, signed with `signing_key`.
    ///
    /// The two keys are not required to match; a mismatched pair produces a
    /// request whose self-signature does not verify.
    pub fn build(
        signing_key: &PrivateKey,
        public_key: &PublicKey,
        subject: &SubjectName,
    ) -> Result<Self> {
        let info = CertReqInfo {
            version: Version::V1,
            subject: subject.as_x509_name()?,
            public_key: public_key.as_spki()?,
            attributes: Default::default(),
        };
        let signature = signing_key.sign(&info.to_der()?)?;
        debug!(subject = %subject, algorithm = %signing_key.algorithm(), "built certificate request");

        Ok(Self {
            inner: CertReq {
                info,
                algorithm: AlgorithmIdentifierOwned::from(signing_key.algorithm()),
                signature: BitString::from_bytes(&signature)?,
            },
        })
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner =
            CertReq::from_der(der).map_err(|e| PqCertKitError::CsrParseError(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Decodes a request in PEM form. Both `CERTIFICATE REQUEST` and the
    /// legacy `NEW CERTIFICATE REQUEST` labels are accepted.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let der = pem_to_der(
            pem,
            &[CERTIFICATE_REQUEST_LABEL, NEW_CERTIFICATE_REQUEST_LABEL],
        )
        .map_err(PqCertKitError::CsrParseError)?;
        Self::from_der(&der)
    }

    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.inner.to_der()?)
    }

    pub fn to_pem(&self) -> Result<String> {
        Ok(der_to_pem(&self.to_der()?, CERTIFICATE_REQUEST_LABEL))
    }

    /// The subject as encoded in the request.
    pub fn subject_name(&self) -> &Name {
        &self.inner.info.subject
    }

    pub fn subject(&self) -> SubjectName {
        SubjectName::from_x509_name(&self.inner.info.subject)
    }

    /// The embedded public key. A key of the right type but the wrong size is
    /// a malformed request.
    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(&self.inner.info.public_key).map_err(|e| match e {
            PqCertKitError::KeyLoadError(msg) => PqCertKitError::CsrParseError(msg),
            other => other,
        })
    }

    pub fn signature_algorithm(&self) -> Result<SignatureAlgorithm> {
        SignatureAlgorithm::from_algorithm_identifier(&self.inner.algorithm)
    }

    /// Checks the proof of possession: the request signature must verify
    /// against the embedded public key over the DER of the request info.
    ///
    /// Returns `Ok(false)` for a well-formed request with a bad signature.
    pub fn verify_self_signature(&self) -> Result<bool> {
        let algorithm = self.signature_algorithm()?;
        let public_key = self.public_key()?;
        if public_key.algorithm() != algorithm {
            warn!(
                key = %public_key.algorithm(),
                signature = %algorithm,
                "certificate request key and signature algorithms differ"
            );
            return Ok(false);
        }
        let Some(signature) = self.inner.signature.as_bytes() else {
            warn!("certificate request signature has unused bits");
            return Ok(false);
        };

        let info = self.inner.info.to_der()?;
        let valid = public_key.verify(&info, signature)?;
        if !valid {
            warn!(subject = %self.subject(), "certificate request signature does not verify");
        }
        Ok(valid)
    }
}

/// Builds a self-signed certificate request.
pub fn build_csr(
    signing_key: &PrivateKey,
    public_key: &PublicKey,
    subject: &SubjectName,
) -> Result<CertificateSigningRequest> {
    CertificateSigningRequest::build(signing_key, public_key, subject)
}

/// Verifies the self-signature of a PEM encoded request.
pub fn verify_csr_self_signature(pem: &[u8]) -> Result<bool> {
    CertificateSigningRequest::from_pem(pem)?.verify_self_signature()
}
