use pqcertkit::cert::params::parse_subject;
use pqcertkit::csr::CertificateSigningRequest;
use pqcertkit::error::Result;
use pqcertkit::issuer::CertificateIssuer;
use pqcertkit::key::KeyPair;
use pqcertkit::verify::verify_issued_by;

fn main() -> Result<()> {
    pqcertkit::provider::init()?;
    let issuer = CertificateIssuer::default();

    // Self-signed CA
    let ca_key = KeyPair::generate_ml_dsa_65()?;
    let ca_subject = parse_subject(&["CN=My Test CA", "O=Example Corp", "C=US"])?;
    let ca_csr =
        CertificateSigningRequest::build(ca_key.private_key(), ca_key.public_key(), &ca_subject)?;
    let ca_cert = issuer.issue_self_signed(&ca_csr, ca_key.private_key(), 3650)?;

    println!("CA Certificate PEM:\n{}", ca_cert.to_pem()?);

    // Server key and request, signed by the CA
    let server_key = KeyPair::generate_ml_dsa_65()?;
    let server_subject = parse_subject(&["CN=myserver.local"])?;
    let server_csr = CertificateSigningRequest::build(
        server_key.private_key(),
        server_key.public_key(),
        &server_subject,
    )?;
    println!("Server CSR PEM:\n{}", server_csr.to_pem()?);

    let server_cert =
        issuer.issue_ca_signed(&server_csr, &ca_cert, ca_key.private_key(), 825)?;
    println!("Server Certificate PEM:\n{}", server_cert.to_pem()?);

    let outcome = verify_issued_by(&server_cert, &ca_cert);
    match outcome.failure() {
        None => println!("server certificate verifies against the CA"),
        Some(failure) => println!("verification failed: {} ({failure})", failure.code()),
    }

    Ok(())
}
