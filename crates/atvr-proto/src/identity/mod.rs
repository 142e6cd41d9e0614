//! Client identity primitives: RSA-2048 keypair and self-signed certificate.
//!
//! The identity is generated once per installation and persisted. Pairing
//! hashes the certificate's public parameters into the secret digest, so the
//! identity presented on the pairing TLS session must be byte-identical to
//! the one presented on every later control session.

pub mod certificate;
pub mod keypair;

pub use certificate::Certificate;
pub use keypair::Keypair;

use crate::error::Result;

/// Subject label used for the certificate CN and SAN.
pub const IDENTITY_SUBJECT: &str = "atvremote";

/// A complete client identity: keypair plus its self-signed certificate.
pub struct ClientIdentity {
    pub keypair: Keypair,
    pub certificate: Certificate,
}

impl ClientIdentity {
    /// Generate a fresh identity with the given validity start.
    pub fn generate(now_epoch_secs: i64) -> Result<Self> {
        let keypair = Keypair::generate()?;
        let certificate = Certificate::generate(&keypair, IDENTITY_SUBJECT, now_epoch_secs)?;
        Ok(Self {
            keypair,
            certificate,
        })
    }

    /// Reassemble an identity from persisted PEM blocks.
    pub fn from_pem(key_pem: &str, cert_pem: &str) -> Result<Self> {
        Ok(Self {
            keypair: Keypair::from_pkcs8_pem(key_pem)?,
            certificate: Certificate::from_pem(cert_pem)?,
        })
    }
}
