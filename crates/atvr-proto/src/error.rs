//! Error types for the protocol layer.
//!
//! Wire-format statuses (200, 402) travel inside the pairing messages and are
//! defined in [`crate::wire`]. This module defines the Rust-native error types
//! used within crate boundaries.

use thiserror::Error;

/// Errors that can occur within the `atvr-proto` crate.
#[derive(Debug, Error)]
pub enum ProtoError {
    // --- Identity ---
    #[error("failed to generate RSA keypair: {0}")]
    KeyGeneration(String),

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("failed to generate X.509 certificate: {0}")]
    CertificateGeneration(String),

    #[error("certificate parse error: {0}")]
    CertificateParse(String),

    // --- Key-material extraction ---
    #[error("RSA parameter extraction failed: {0}")]
    KeyExtraction(String),

    // --- Pairing secret ---
    #[error("invalid pairing code: {0}")]
    InvalidPairingCode(String),

    // --- TLS ---
    #[error("TLS configuration error: {0}")]
    TlsConfiguration(String),

    // --- Framing ---
    #[error("frame length {len} exceeds maximum {max}")]
    FrameTooLarge { len: usize, max: usize },

    #[error("malformed frame length prefix")]
    MalformedLengthPrefix,

    // --- Serialization ---
    #[error("protobuf encode error: {0}")]
    ProtobufEncode(#[from] prost::EncodeError),

    #[error("protobuf decode error: {0}")]
    ProtobufDecode(#[from] prost::DecodeError),
}

/// Result type alias using [`ProtoError`].
pub type Result<T> = std::result::Result<T, ProtoError>;
