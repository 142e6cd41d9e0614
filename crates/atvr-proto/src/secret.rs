//! Pairing-secret derivation.
//!
//! The TV displays a six-hex-character code. The last four characters are two
//! raw bytes that feed the digest; the first two are a verification header
//! the TV computed the same way and uses to pick which code to display. The
//! header is never part of the hash input.
//!
//! ```text
//! secret = SHA-256(client_modulus || client_exponent ||
//!                  server_modulus || server_exponent || code_bytes)
//! ```
//!
//! Both moduli are the sign-byte-stripped big-endian integers from the
//! respective certificates. The full 32-byte digest is transmitted.

use sha2::{Digest, Sha256};

use crate::error::{ProtoError, Result};
use crate::tls::cert_extract::RsaPublicParams;

/// Length of the code displayed on the TV, in hex characters.
pub const CODE_LENGTH: usize = 6;

/// A parsed pairing code as entered by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairingCode {
    header: u8,
    code_bytes: [u8; 2],
}

impl PairingCode {
    /// Parse the six-hex-character code shown on the TV.
    ///
    /// Surrounding whitespace is tolerated; case is not significant.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.len() != CODE_LENGTH {
            return Err(ProtoError::InvalidPairingCode(format!(
                "expected {CODE_LENGTH} hex characters, got {}",
                trimmed.len()
            )));
        }
        let raw = hex::decode(trimmed)
            .map_err(|e| ProtoError::InvalidPairingCode(e.to_string()))?;
        Ok(Self {
            header: raw[0],
            code_bytes: [raw[1], raw[2]],
        })
    }

    /// The verification-header byte (first two hex characters).
    pub fn header(&self) -> u8 {
        self.header
    }

    /// The two code bytes that feed the digest (last four hex characters).
    pub fn code_bytes(&self) -> [u8; 2] {
        self.code_bytes
    }
}

/// Derive the 32-byte pairing secret from both endpoints' RSA parameters and
/// the user-entered code.
pub fn derive_secret(
    client: &RsaPublicParams,
    server: &RsaPublicParams,
    code: &PairingCode,
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(&client.modulus);
    hasher.update(&client.exponent);
    hasher.update(&server.modulus);
    hasher.update(&server.exponent);
    hasher.update(code.code_bytes());
    hasher.finalize().into()
}

/// The verification header this digest corresponds to, as the TV displays it.
///
/// Diagnostic only: a mismatch against [`PairingCode::header`] predicts a
/// status-402 rejection, but the header never enters the hash.
pub fn expected_header(digest: &[u8; 32]) -> String {
    format!("{:02X}", digest[0])
}
