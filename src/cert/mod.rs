pub mod extensions;
pub mod params;

use std::fmt;

use const_oid::ObjectIdentifier;
use der::{Decode, Encode};
use extensions::{BasicConstraints, KeyUsage, ToAndFromX509Extension};
use params::{ExtensionParam, SubjectName};
use time::OffsetDateTime;
use x509_cert::certificate::CertificateInner;

use crate::error::{PqCertKitError, Result};
use crate::key::PublicKey;
use crate::pem_utils::{CERTIFICATE_LABEL, der_to_pem, pem_to_der};
use crate::provider::{MlDsa65, SignatureScheme};

/// Object identifier of ML-DSA-65 (NIST CSOR, used for both keys and signatures).
pub const ID_ML_DSA_65: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.3.18");

/// Represents the supported signature algorithms for keys, requests and certificates.
///
/// Each variant is bound to exactly one [`SignatureScheme`]; any other
/// algorithm identifier is rejected with [`PqCertKitError::UnsupportedKeyType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    /// ML-DSA-65, pure mode.
    MlDsa65,
}

static ML_DSA_65: MlDsa65 = MlDsa65;

impl SignatureAlgorithm {
    /// Returns the algorithm OID.
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            SignatureAlgorithm::MlDsa65 => ID_ML_DSA_65,
        }
    }

    /// Returns the primitive that implements this algorithm.
    pub fn scheme(self) -> &'static dyn SignatureScheme {
        match self {
            SignatureAlgorithm::MlDsa65 => &ML_DSA_65,
        }
    }

    /// Maps an OID to a supported algorithm.
    pub fn from_oid(oid: ObjectIdentifier) -> Result<Self> {
        match oid {
            ID_ML_DSA_65 => Ok(SignatureAlgorithm::MlDsa65),
            other => Err(PqCertKitError::UnsupportedKeyType(other.to_string())),
        }
    }

    /// Maps an AlgorithmIdentifier to a supported algorithm.
    ///
    /// ML-DSA identifiers must not carry parameters.
    pub fn from_algorithm_identifier(
        id: &x509_cert::spki::AlgorithmIdentifierOwned,
    ) -> Result<Self> {
        let algorithm = Self::from_oid(id.oid)?;
        if id.parameters.is_some() {
            return Err(PqCertKitError::UnsupportedKeyType(format!(
                "{algorithm} with parameters"
            )));
        }
        Ok(algorithm)
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme().name())
    }
}

impl From<SignatureAlgorithm> for x509_cert::spki::AlgorithmIdentifierOwned {
    /// Converts a `SignatureAlgorithm` into an `AlgorithmIdentifierOwned`.
    ///
    /// # Returns
    /// An `AlgorithmIdentifierOwned` with the algorithm OID and absent parameters.
    fn from(value: SignatureAlgorithm) -> Self {
        x509_cert::spki::AlgorithmIdentifierOwned {
            oid: value.oid(),
            parameters: None,
        }
    }
}

/// Represents an X.509 certificate.
///
/// This struct provides methods to encode the certificate into DER or PEM
/// formats and to read back the fields the issuance pipeline sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: CertificateInner,
}

impl Certificate {
    /// Encodes the certificate into DER format.
    ///
    /// # Returns
    /// A byte vector containing the DER-encoded certificate.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| PqCertKitError::EncodingError(e.to_string()))
    }

    /// Encodes the certificate into PEM format.
    ///
    /// # Returns
    /// A string containing the PEM-encoded certificate.
    pub fn to_pem(&self) -> Result<String> {
        Ok(der_to_pem(&self.to_der()?, CERTIFICATE_LABEL))
    }

    /// Decodes a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = CertificateInner::from_der(der)
            .map_err(|e| PqCertKitError::CertificateParseError(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Decodes a PEM-encoded certificate.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let der = pem_to_der(pem, &[CERTIFICATE_LABEL])
            .map_err(PqCertKitError::CertificateParseError)?;
        Self::from_der(&der)
    }

    /// Serial number as big-endian two's complement bytes.
    pub fn serial_number(&self) -> &[u8] {
        self.inner.tbs_certificate.serial_number.as_bytes()
    }

    pub fn subject(&self) -> SubjectName {
        SubjectName::from_x509_name(&self.inner.tbs_certificate.subject)
    }

    pub fn issuer(&self) -> SubjectName {
        SubjectName::from_x509_name(&self.inner.tbs_certificate.issuer)
    }

    /// Start of the validity period.
    pub fn not_before(&self) -> Result<OffsetDateTime> {
        params::offset_date_time(&self.inner.tbs_certificate.validity.not_before)
    }

    /// End of the validity period.
    pub fn not_after(&self) -> Result<OffsetDateTime> {
        params::offset_date_time(&self.inner.tbs_certificate.validity.not_after)
    }

    /// The subject public key.
    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(&self.inner.tbs_certificate.subject_public_key_info)
    }

    /// True when the subject and issuer names are byte-for-byte equal.
    pub fn is_self_issued(&self) -> bool {
        self.inner.tbs_certificate.subject == self.inner.tbs_certificate.issuer
    }

    /// All extensions, in encoding order.
    pub fn extensions(&self) -> Vec<ExtensionParam> {
        self.inner
            .tbs_certificate
            .extensions
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(ExtensionParam::from_x509_extension)
            .collect()
    }

    /// Decodes the extension of type `E`, if present.
    pub fn extension<E: ToAndFromX509Extension>(&self) -> Result<Option<E>> {
        self.extensions()
            .iter()
            .find(|ext| ext.oid == E::OID)
            .map(|ext| ext.to_extension::<E>())
            .transpose()
    }

    /// The basicConstraints extension, if present.
    pub fn basic_constraints(&self) -> Result<Option<BasicConstraints>> {
        self.extension::<BasicConstraints>()
    }

    /// The keyUsage extension, if present.
    pub fn key_usage(&self) -> Result<Option<KeyUsage>> {
        self.extension::<KeyUsage>()
    }

    /// True when basicConstraints marks the certificate as a CA.
    pub fn is_ca(&self) -> bool {
        matches!(self.basic_constraints(), Ok(Some(bc)) if bc.is_ca)
    }
}
