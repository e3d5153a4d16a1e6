//! TLS acceptor creation

use log::{debug, info, warn};
use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::PKey;
use openssl::ssl::{SslAcceptor, SslFiletype, SslMethod, SslVerifyMode};
use openssl::x509::extension::SubjectAlternativeName;
use openssl::x509::{X509Builder, X509NameBuilder};
use std::path::Path;

use crate::common::Result;

/// Validity of generated self-signed certificates
const SELF_SIGNED_DAYS: u32 = 30;

/// Create a TLS acceptor from PEM certificate and key files
///
/// Uses Mozilla's intermediate profile so that every mainstream browser
/// (and most interception products) can complete the handshake.
///
/// # Example
///
/// ```no_run
/// # use std::path::Path;
/// # use mitm_detector::tls::create_tls_acceptor;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let acceptor = create_tls_acceptor(
///     Path::new("certs/server.crt"),
///     Path::new("certs/server.key"),
/// )?;
/// # Ok(())
/// # }
/// ```
pub fn create_tls_acceptor(cert_path: &Path, key_path: &Path) -> Result<SslAcceptor> {
    let mut acceptor = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls())?;

    debug!("Loading certificate {:?} and key {:?}", cert_path, key_path);
    acceptor.set_certificate_chain_file(cert_path)?;
    acceptor.set_private_key_file(key_path, SslFiletype::PEM)?;
    acceptor.check_private_key()?;

    // Detection needs no client authentication.
    acceptor.set_verify(SslVerifyMode::NONE);

    info!("TLS acceptor ready with certificate {}", cert_path.display());
    Ok(acceptor.build())
}

/// Create a TLS acceptor with a freshly generated self-signed certificate
///
/// The certificate is an ECDSA P-256 certificate for `server_name`, valid
/// for 30 days. Meant for local testing; browsers will warn about it.
pub fn create_self_signed_acceptor(server_name: &str) -> Result<SslAcceptor> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1)?;
    let key = PKey::from_ec_key(EcKey::generate(&group)?)?;

    let mut name = X509NameBuilder::new()?;
    name.append_entry_by_nid(Nid::COMMONNAME, server_name)?;
    let name = name.build();

    let serial = {
        let mut serial = BigNum::new()?;
        serial.rand(64, MsbOption::MAYBE_ZERO, false)?;
        serial.to_asn1_integer()?
    };

    let mut builder = X509Builder::new()?;
    builder.set_version(2)?;
    builder.set_serial_number(&serial)?;
    builder.set_subject_name(&name)?;
    builder.set_issuer_name(&name)?;
    builder.set_pubkey(&key)?;
    let not_before = Asn1Time::days_from_now(0)?;
    builder.set_not_before(&not_before)?;
    let not_after = Asn1Time::days_from_now(SELF_SIGNED_DAYS)?;
    builder.set_not_after(&not_after)?;

    let san = SubjectAlternativeName::new()
        .dns(server_name)
        .build(&builder.x509v3_context(None, None))?;
    builder.append_extension(san)?;
    builder.sign(&key, MessageDigest::sha256())?;
    let cert = builder.build();

    let mut acceptor = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls())?;
    acceptor.set_private_key(&key)?;
    acceptor.set_certificate(&cert)?;
    acceptor.check_private_key()?;
    acceptor.set_verify(SslVerifyMode::NONE);

    warn!("Using a generated self-signed certificate for {}", server_name);
    Ok(acceptor.build())
}
