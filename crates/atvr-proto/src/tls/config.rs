//! TLS configuration builder for the client side of both ports.
//!
//! Constructs a `rustls::ClientConfig` with:
//! - the ring crypto provider, TLS 1.2 and 1.3 (TVs commonly negotiate 1.2)
//! - the client identity certificate and key (mutual auth)
//! - the permissive server verifier

use std::sync::Arc;

use rustls::client::danger::ServerCertVerifier;
use rustls_pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};

use crate::error::{ProtoError, Result};
use crate::identity::ClientIdentity;
use crate::tls::verifier::PermissiveServerVerifier;

/// Build the `rustls::ClientConfig` used for both the pairing and control
/// sessions.
///
/// The identity must be the persisted one: pairing binds this exact
/// certificate to the TV, and the control port presents it again.
pub fn build_client_tls_config(identity: &ClientIdentity) -> Result<rustls::ClientConfig> {
    let verifier: Arc<dyn ServerCertVerifier> = Arc::new(PermissiveServerVerifier::new());

    let cert_chain = vec![CertificateDer::from(identity.certificate.der().to_vec())];
    let private_key = private_key_from_keypair(identity)?;

    let config = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| ProtoError::TlsConfiguration(format!("TLS version config: {e}")))?
    .dangerous()
    .with_custom_certificate_verifier(verifier)
    .with_client_auth_cert(cert_chain, private_key)
    .map_err(|e| ProtoError::TlsConfiguration(format!("client cert config: {e}")))?;

    Ok(config)
}

/// Convert the identity keypair to a rustls `PrivateKeyDer`.
fn private_key_from_keypair(identity: &ClientIdentity) -> Result<PrivateKeyDer<'static>> {
    let pkcs8_bytes = identity.keypair.to_pkcs8_der()?;
    let pkcs8 = PrivatePkcs8KeyDer::from(pkcs8_bytes);
    Ok(PrivateKeyDer::Pkcs8(pkcs8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::LazyLock;

    const JAN_1_2025: i64 = 1735689600;

    static IDENTITY: LazyLock<ClientIdentity> =
        LazyLock::new(|| ClientIdentity::generate(JAN_1_2025).expect("identity generation"));

    #[test]
    fn client_config_builds_successfully() {
        let config = build_client_tls_config(&IDENTITY);
        assert!(config.is_ok());
    }

    #[test]
    fn client_config_has_no_alpn() {
        let config = build_client_tls_config(&IDENTITY).expect("config should build");
        assert!(config.alpn_protocols.is_empty());
    }
}
