//! Self-signed X.509 certificate generation for the client identity.
//!
//! The certificate wraps the RSA identity key: common name and SAN carry the
//! client label, serial 1000, CA:TRUE, ten-year validity backdated one day.
//! The TV does not chain-validate it; it remembers the public key through the
//! pairing digest, so the certificate only needs to stay byte-stable across
//! sessions.
//!
//! Reference: `rcgen` crate (rustls team, MIT/Apache-2.0)
//! <https://github.com/rustls/rcgen>

use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa,
    KeyPair as RcgenKeyPair, SerialNumber, PKCS_RSA_SHA256,
};
use rustls_pki_types::PrivatePkcs8KeyDer;
use time::OffsetDateTime;

use crate::error::{ProtoError, Result};
use crate::identity::keypair::Keypair;

/// Certificate validity in days.
const VALIDITY_DAYS: i64 = 10 * 365;

/// Validity starts this many days in the past, tolerating clock skew between
/// client and TV.
const BACKDATE_DAYS: i64 = 1;

/// Fixed certificate serial number.
const SERIAL: u64 = 1000;

/// A self-signed X.509 certificate wrapping the RSA identity key.
pub struct Certificate {
    /// DER-encoded certificate bytes.
    cert_der: Vec<u8>,
    /// PEM-encoded certificate string.
    cert_pem: String,
}

impl Certificate {
    /// Generate a new self-signed certificate for the given identity keypair.
    ///
    /// `subject` becomes both the common name and the SAN DNS entry.
    /// Validity runs from one day before `now_epoch_secs` for ten years.
    pub fn generate(keypair: &Keypair, subject: &str, now_epoch_secs: i64) -> Result<Self> {
        // Export the identity key as PKCS#8 DER for rcgen.
        let pkcs8_der = keypair.to_pkcs8_der()?;
        let pkcs8_typed = PrivatePkcs8KeyDer::from(pkcs8_der);
        let rcgen_keypair =
            RcgenKeyPair::from_pkcs8_der_and_sign_algo(&pkcs8_typed, &PKCS_RSA_SHA256)
                .map_err(|e| ProtoError::CertificateGeneration(e.to_string()))?;

        let not_before = OffsetDateTime::from_unix_timestamp(now_epoch_secs - BACKDATE_DAYS * 86400)
            .map_err(|e| ProtoError::CertificateGeneration(format!("invalid not_before: {e}")))?;
        let not_after = OffsetDateTime::from_unix_timestamp(now_epoch_secs + VALIDITY_DAYS * 86400)
            .map_err(|e| ProtoError::CertificateGeneration(format!("invalid not_after: {e}")))?;

        let mut params = CertificateParams::new(vec![subject.to_string()])
            .map_err(|e| ProtoError::CertificateGeneration(format!("invalid cert params: {e}")))?;
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, subject);
        params.distinguished_name = dn;
        params.serial_number = Some(SerialNumber::from(SERIAL));
        params.is_ca = IsCa::Ca(BasicConstraints::Constrained(0));
        params.not_before = not_before;
        params.not_after = not_after;

        let cert = params
            .self_signed(&rcgen_keypair)
            .map_err(|e| ProtoError::CertificateGeneration(e.to_string()))?;

        Ok(Self {
            cert_der: cert.der().to_vec(),
            cert_pem: cert.pem(),
        })
    }

    /// Reconstruct a certificate from its PEM encoding.
    ///
    /// Used when loading a persisted identity from disk; the DER bytes must
    /// come out identical to what was generated, since the pairing digest
    /// binds them.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let (_, parsed) = x509_parser::pem::parse_x509_pem(pem.as_bytes())
            .map_err(|e| ProtoError::CertificateParse(e.to_string()))?;
        if parsed.label != "CERTIFICATE" {
            return Err(ProtoError::CertificateParse(format!(
                "expected a CERTIFICATE block, got {}",
                parsed.label
            )));
        }
        Ok(Self {
            cert_der: parsed.contents,
            cert_pem: pem.to_string(),
        })
    }

    /// Returns the DER-encoded certificate bytes.
    pub fn der(&self) -> &[u8] {
        &self.cert_der
    }

    /// Returns the PEM-encoded certificate string.
    pub fn pem(&self) -> &str {
        &self.cert_pem
    }
}
