//! Permissive rustls server-certificate verifier.
//!
//! The TV presents a self-signed certificate that is unknown until pairing
//! completes, so chain validation is impossible by construction. The verifier
//! accepts any server certificate; security of the session rests on mutual
//! authentication — the TV only accepts the specific client certificate it
//! bound during pairing, and the pairing digest bound the TV's certificate in
//! turn. Handshake signature verification is still delegated to the rustls
//! ring crypto provider.
//!
//! Design references:
//! - KDE-Connect-style TOFU verifiers for self-signed peer certificates
//! - rustls `danger` module for custom verification

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::{DigitallySignedStruct, Error as TlsError, SignatureScheme};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};

/// Get the ring provider's supported signature verification algorithms.
fn ring_signature_algorithms() -> &'static rustls::crypto::WebPkiSupportedAlgorithms {
    use std::sync::LazyLock;
    static ALGORITHMS: LazyLock<rustls::crypto::WebPkiSupportedAlgorithms> = LazyLock::new(|| {
        rustls::crypto::ring::default_provider().signature_verification_algorithms
    });
    &ALGORITHMS
}

/// Server-certificate verifier that accepts any presented certificate.
///
/// The caller is expected to capture the presented leaf from the session
/// afterwards (it feeds the pairing digest).
#[derive(Debug, Default)]
pub struct PermissiveServerVerifier;

impl PermissiveServerVerifier {
    pub fn new() -> Self {
        Self
    }
}

impl ServerCertVerifier for PermissiveServerVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, TlsError> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        rustls::crypto::verify_tls12_signature(message, cert, dss, ring_signature_algorithms())
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        rustls::crypto::verify_tls13_signature(message, cert, dss, ring_signature_algorithms())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        ring_signature_algorithms().supported_schemes()
    }
}
