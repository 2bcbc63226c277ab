use std::fmt;

use der::asn1::{BitString, OctetStringRef};
use der::{AnyRef, Decode, Encode, Reader, SliceReader, Tag, Tagged};
use pkcs8::PrivateKeyInfo;
use pkcs8::spki::AlgorithmIdentifierRef;
use tracing::debug;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::cert::SignatureAlgorithm;
use crate::error::{PqCertKitError, Result};
use crate::pem_utils::{PRIVATE_KEY_LABEL, PUBLIC_KEY_LABEL, der_to_pem, pem_to_der};

/// A raw public key together with the algorithm it belongs to.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    algorithm: SignatureAlgorithm,
    bytes: Vec<u8>,
}

impl PublicKey {
    /// Loads a raw ML-DSA-65 public key (1952 bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_algorithm_bytes(SignatureAlgorithm::MlDsa65, bytes)
    }

    /// Loads a raw public key for the given algorithm.
    pub fn from_algorithm_bytes(algorithm: SignatureAlgorithm, bytes: &[u8]) -> Result<Self> {
        algorithm.scheme().check_public_key(bytes)?;
        Ok(Self {
            algorithm,
            bytes: bytes.to_vec(),
        })
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns `Ok(false)` when `signature` does not verify over `message`.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool> {
        self.algorithm
            .scheme()
            .verify(&self.bytes, message, signature)
    }

    /// Wraps the key in a SubjectPublicKeyInfo structure.
    pub fn as_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        Ok(SubjectPublicKeyInfoOwned {
            algorithm: AlgorithmIdentifierOwned::from(self.algorithm),
            subject_public_key: BitString::from_bytes(&self.bytes)?,
        })
    }

    /// Extracts the key from a SubjectPublicKeyInfo structure.
    pub fn from_x509spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        let algorithm = SignatureAlgorithm::from_algorithm_identifier(&spki.algorithm)?;
        let bytes = spki.subject_public_key.as_bytes().ok_or_else(|| {
            PqCertKitError::KeyLoadError("public key bit string has unused bits".to_string())
        })?;
        Self::from_algorithm_bytes(algorithm, bytes)
    }

    /// Encodes the key as a `PUBLIC KEY` PEM document.
    pub fn to_pem(&self) -> Result<String> {
        let der = self.as_spki()?.to_der()?;
        Ok(der_to_pem(&der, PUBLIC_KEY_LABEL))
    }

    /// Decodes a `PUBLIC KEY` PEM document.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let der = pem_to_der(pem.as_bytes(), &[PUBLIC_KEY_LABEL])
            .map_err(PqCertKitError::KeyLoadError)?;
        let spki = SubjectPublicKeyInfoOwned::from_der(&der)
            .map_err(|e| PqCertKitError::KeyLoadError(e.to_string()))?;
        Self::from_x509spki(&spki)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("algorithm", &self.algorithm)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A raw private key together with the algorithm it belongs to.
///
/// The key bytes are wiped when the value is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey {
    #[zeroize(skip)]
    algorithm: SignatureAlgorithm,
    bytes: Vec<u8>,
}

impl PrivateKey {
    /// Loads a raw ML-DSA-65 private key (4032 bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_algorithm_bytes(SignatureAlgorithm::MlDsa65, bytes)
    }

    /// Loads a raw private key for the given algorithm.
    pub fn from_algorithm_bytes(algorithm: SignatureAlgorithm, bytes: &[u8]) -> Result<Self> {
        algorithm.scheme().check_private_key(bytes)?;
        Ok(Self {
            algorithm,
            bytes: bytes.to_vec(),
        })
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Signs `message` directly; no pre-hash is applied.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        self.algorithm.scheme().sign(&self.bytes, message)
    }

    /// Encodes the key as a PKCS#8 `PRIVATE KEY` PEM document.
    ///
    /// The inner private key uses the `expandedKey` form of RFC 9881.
    pub fn to_pkcs8_pem(&self) -> Result<String> {
        let expanded = Zeroizing::new(OctetStringRef::new(&self.bytes)?.to_der()?);
        let algorithm = AlgorithmIdentifierRef {
            oid: self.algorithm.oid(),
            parameters: None,
        };
        let der = Zeroizing::new(PrivateKeyInfo::new(algorithm, &expanded).to_der()?);
        Ok(der_to_pem(&der, PRIVATE_KEY_LABEL))
    }

    /// Decodes a PKCS#8 `PRIVATE KEY` PEM document.
    ///
    /// Accepts the `expandedKey` and `both` forms; a seed-only key cannot be
    /// loaded.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self> {
        let der = Zeroizing::new(
            pem_to_der(pem.as_bytes(), &[PRIVATE_KEY_LABEL]).map_err(PqCertKitError::KeyLoadError)?,
        );
        let info = PrivateKeyInfo::from_der(&der)
            .map_err(|e| PqCertKitError::KeyLoadError(e.to_string()))?;
        let algorithm = SignatureAlgorithm::from_oid(info.algorithm.oid)?;

        let inner = AnyRef::from_der(info.private_key)
            .map_err(|e| PqCertKitError::KeyLoadError(e.to_string()))?;
        let expanded = match inner.tag() {
            Tag::OctetString => inner.value(),
            Tag::Sequence => {
                expanded_from_both(inner.value()).map_err(|e| PqCertKitError::KeyLoadError(e.to_string()))?
            }
            tag => {
                return Err(PqCertKitError::KeyLoadError(format!(
                    "unsupported private key encoding (tag {tag}); only expanded keys can be loaded"
                )));
            }
        };
        Self::from_algorithm_bytes(algorithm, expanded)
    }
}

/// `both ::= SEQUENCE { seed OCTET STRING, expandedKey OCTET STRING }`
fn expanded_from_both(body: &[u8]) -> der::Result<&[u8]> {
    let mut reader = SliceReader::new(body)?;
    let _seed = OctetStringRef::decode(&mut reader)?;
    let expanded = OctetStringRef::decode(&mut reader)?;
    reader.finish(expanded.as_bytes())
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// A matching public and private key.
#[derive(Debug, Clone)]
pub struct KeyPair {
    public: PublicKey,
    private: PrivateKey,
}

impl KeyPair {
    /// Generate an ML-DSA-65 key pair from the operating system's CSPRNG.
    pub fn generate_ml_dsa_65() -> Result<Self> {
        let algorithm = SignatureAlgorithm::MlDsa65;
        let (public, mut private) = algorithm.scheme().keygen()?;
        debug!(algorithm = %algorithm, "generated key pair");
        Ok(Self {
            public: PublicKey {
                algorithm,
                bytes: public,
            },
            private: PrivateKey {
                algorithm,
                bytes: std::mem::take(&mut *private),
            },
        })
    }

    /// Pairs up already loaded keys. The match is not checked here; issuance
    /// verifies it before signing anything.
    pub fn from_parts(public: PublicKey, private: PrivateKey) -> Self {
        Self { public, private }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private
    }

    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        self.private.sign(message)
    }
}

/// Generates an ML-DSA-65 key pair.
pub fn generate_keypair() -> Result<KeyPair> {
    KeyPair::generate_ml_dsa_65()
}

/// Checks that `private` signs for `public` by signing and verifying a fixed challenge.
pub fn check_key_binding(private: &PrivateKey, public: &PublicKey) -> Result<()> {
    if private.algorithm() != public.algorithm() {
        return Err(PqCertKitError::KeyMismatch(format!(
            "private key is {} but public key is {}",
            private.algorithm(),
            public.algorithm()
        )));
    }
    let challenge = b"pqcertkit issuer key binding challenge";
    let signature = private.sign(challenge)?;
    if public.verify(challenge, &signature)? {
        Ok(())
    } else {
        Err(PqCertKitError::KeyMismatch(
            "private key does not correspond to the public key".to_string(),
        ))
    }
}
