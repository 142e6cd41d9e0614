//! Extract RSA public parameters from X.509 DER certificates.
//!
//! The pairing digest hashes the modulus and exponent of both endpoints: the
//! client's own certificate and the leaf the TV presented during the TLS
//! handshake. This module pulls both values out of a certificate's
//! SubjectPublicKeyInfo.
//!
//! Reference: `x509-parser` crate (rusticata, MIT/Apache-2.0)

use x509_parser::prelude::*;
use x509_parser::public_key::PublicKey;

use crate::error::{ProtoError, Result};

/// RSA public parameters as big-endian bytes.
///
/// The modulus is normalized: a single leading 0x00 (the ASN.1 INTEGER sign
/// byte) is stripped, leaving 256 bytes for RSA-2048. The exponent is kept
/// verbatim (typically the 3 bytes `01 00 01`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicParams {
    pub modulus: Vec<u8>,
    pub exponent: Vec<u8>,
}

/// Extract the RSA modulus and exponent from a DER-encoded X.509 certificate.
///
/// Returns an error if:
/// - The certificate cannot be parsed
/// - The SubjectPublicKeyInfo cannot be parsed
/// - The public key is not RSA
pub fn extract_rsa_params(cert_der: &[u8]) -> Result<RsaPublicParams> {
    let (_, cert) = X509Certificate::from_der(cert_der)
        .map_err(|e| ProtoError::KeyExtraction(format!("X.509 parse error: {e}")))?;

    let spki = cert.public_key();
    let parsed = spki
        .parsed()
        .map_err(|e| ProtoError::KeyExtraction(format!("SubjectPublicKeyInfo parse error: {e}")))?;

    match parsed {
        PublicKey::RSA(rsa) => Ok(RsaPublicParams {
            modulus: strip_sign_byte(rsa.modulus),
            exponent: rsa.exponent.to_vec(),
        }),
        _ => Err(ProtoError::KeyExtraction(
            "expected an RSA public key".to_string(),
        )),
    }
}

/// Drop a single leading 0x00 sign byte from an ASN.1 INTEGER encoding.
fn strip_sign_byte(bytes: &[u8]) -> Vec<u8> {
    match bytes {
        [0x00, rest @ ..] if !rest.is_empty() => rest.to_vec(),
        _ => bytes.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ClientIdentity;
    use std::sync::LazyLock;

    /// Reference epoch: 2025-01-01 00:00:00 UTC.
    const JAN_1_2025: i64 = 1735689600;

    static IDENTITY: LazyLock<ClientIdentity> =
        LazyLock::new(|| ClientIdentity::generate(JAN_1_2025).expect("identity generation"));

    #[test]
    fn extracted_params_match_keypair() {
        let extracted =
            extract_rsa_params(IDENTITY.certificate.der()).expect("extraction should succeed");
        assert_eq!(extracted, IDENTITY.keypair.public_params());
    }

    #[test]
    fn modulus_has_no_sign_byte() {
        let extracted =
            extract_rsa_params(IDENTITY.certificate.der()).expect("extraction should succeed");
        assert_eq!(extracted.modulus.len(), 256);
        assert_ne!(extracted.modulus[0], 0);
    }

    #[test]
    fn strip_sign_byte_only_removes_one_leading_zero() {
        assert_eq!(strip_sign_byte(&[0x00, 0xFF, 0x01]), vec![0xFF, 0x01]);
        assert_eq!(strip_sign_byte(&[0x00, 0x00, 0x01]), vec![0x00, 0x01]);
        assert_eq!(strip_sign_byte(&[0xFF, 0x01]), vec![0xFF, 0x01]);
        assert_eq!(strip_sign_byte(&[0x00]), vec![0x00]);
    }

    #[test]
    fn rejects_garbage_input() {
        assert!(extract_rsa_params(b"not a certificate").is_err());
    }

    #[test]
    fn rejects_empty_input() {
        assert!(extract_rsa_params(b"").is_err());
    }
}
