//! RSA-2048 keypair generation and management.
//!
//! All cryptographic operations are delegated to the `rsa` crate. This module
//! is a thin wrapper providing the interface needed by the rest of
//! `atvr-proto`: PKCS#8 export for certificate generation and TLS, PEM
//! round-tripping for persistence, and the raw public parameters that feed
//! the pairing digest.

use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use rsa::rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;

use crate::error::{ProtoError, Result};
use crate::tls::cert_extract::RsaPublicParams;

/// RSA modulus size in bits. The pairing digest assumes a 256-byte modulus.
pub const KEY_BITS: usize = 2048;

/// An RSA identity keypair for this client installation.
///
/// The keypair is permanent: pairing binds its public half to the TV, so the
/// same key must be presented on every subsequent TLS session.
pub struct Keypair {
    private_key: RsaPrivateKey,
}

impl Keypair {
    /// Generate a new RSA-2048 keypair using the OS CSPRNG.
    pub fn generate() -> Result<Self> {
        let private_key = RsaPrivateKey::new(&mut OsRng, KEY_BITS)
            .map_err(|e| ProtoError::KeyGeneration(e.to_string()))?;
        Ok(Self { private_key })
    }

    /// Reconstruct a keypair from a PKCS#8 PEM string.
    ///
    /// Used when loading a persisted identity from disk.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| ProtoError::InvalidKey(e.to_string()))?;
        Ok(Self { private_key })
    }

    /// Returns the PKCS#8 PEM encoding for persistence.
    ///
    /// **Security:** the caller is responsible for storing this securely.
    pub fn to_pkcs8_pem(&self) -> Result<String> {
        let pem = self
            .private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| ProtoError::InvalidKey(e.to_string()))?;
        Ok(pem.to_string())
    }

    /// Returns the PKCS#8 DER encoding.
    ///
    /// This format is required by `rcgen` for X.509 certificate generation
    /// and by rustls for the TLS client key.
    pub fn to_pkcs8_der(&self) -> Result<Vec<u8>> {
        let doc = self
            .private_key
            .to_pkcs8_der()
            .map_err(|e| ProtoError::InvalidKey(e.to_string()))?;
        Ok(doc.as_bytes().to_vec())
    }

    /// The public modulus and exponent as big-endian bytes, no sign byte.
    ///
    /// Matches what [`crate::tls::cert_extract::extract_rsa_params`] yields
    /// for this key's certificate.
    pub fn public_params(&self) -> RsaPublicParams {
        RsaPublicParams {
            modulus: self.private_key.n().to_bytes_be(),
            exponent: self.private_key.e().to_bytes_be(),
        }
    }
}
