//! use pqcertkit::error::PqCertKitError;

use thiserror::Error;

/// Result type alias using [`PqCertKitError`].
pub type Result<T> = std::result::Result<T, PqCertKitError>;

/// Represents errors that can occur in the pqcertkit library.
///
/// Verification outcomes are not errors: a signature or chain that does not
/// check out is reported through [`crate::verify::Verification`] instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PqCertKitError {
    /// The signature primitive failed (key generation, self-test).
    #[error("Signature primitive failure: {0}")]
    PrimitiveFailure(String),

    /// A subject entry is not of the form `key=value`.
    #[error("Malformed subject entry: {0:?}")]
    MalformedSubjectEntry(String),

    /// A raw or PEM key buffer could not be loaded.
    #[error("Failed to load key: {0}")]
    KeyLoadError(String),

    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// The signature primitive refused to sign.
    #[error("Signing failed: {0}")]
    SigningError(String),

    /// The input is not a structurally valid certificate request.
    #[error("Failed to parse certificate request: {0}")]
    CsrParseError(String),

    /// The certificate request's proof-of-possession signature is invalid.
    #[error("Certificate request signature is invalid")]
    InvalidCsrSignature,

    /// The CA certificate could not be parsed.
    #[error("Failed to parse CA certificate: {0}")]
    CaCertParseError(String),

    /// A certificate could not be parsed.
    #[error("Failed to parse certificate: {0}")]
    CertificateParseError(String),

    /// The signing private key does not belong to the expected issuer public key.
    #[error("Signing key does not match issuer public key: {0}")]
    KeyMismatch(String),

    /// The key or signature algorithm is not supported.
    #[error("Unsupported key type: {0}")]
    UnsupportedKeyType(String),

    /// The caller-provided output buffer is too small; nothing was written.
    #[error("Output buffer too small: {required} bytes required")]
    BufferTooSmall {
        /// Number of bytes the output needs.
        required: usize,
    },

    /// Error due to invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid issuance configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PqCertKitError {
    /// Create a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a primitive failure with the given message.
    pub fn primitive(msg: impl Into<String>) -> Self {
        Self::PrimitiveFailure(msg.into())
    }
}

impl From<der::Error> for PqCertKitError {
    /// Converts a `der::Error` raised while building a structure.
    fn from(err: der::Error) -> Self {
        PqCertKitError::EncodingError(err.to_string())
    }
}
