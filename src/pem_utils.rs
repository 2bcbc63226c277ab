/// PEM label of an X.509 certificate.
pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";
/// PEM label of a PKCS#10 certificate request.
pub const CERTIFICATE_REQUEST_LABEL: &str = "CERTIFICATE REQUEST";
/// Label some older tools write for PKCS#10 requests.
pub const NEW_CERTIFICATE_REQUEST_LABEL: &str = "NEW CERTIFICATE REQUEST";
/// PEM label of a SubjectPublicKeyInfo.
pub const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";
/// PEM label of a PKCS#8 private key.
pub const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";

/// Convert DER‑encoded data into a PEM‑encoded string with the provided label.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(
        &pem,
        pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF),
    )
}

/// Convert the first PEM block in `input` to DER‑encoded bytes.
///
/// The block's label must be one of `labels`.
pub fn pem_to_der(input: &[u8], labels: &[&str]) -> Result<Vec<u8>, String> {
    let pem = pem::parse(input).map_err(|e| e.to_string())?;
    if !labels.contains(&pem.tag()) {
        return Err(format!(
            "expected PEM label {:?}, found {:?}",
            labels[0],
            pem.tag()
        ));
    }
    Ok(pem.into_contents())
}
