//! Android TV Remote Protocol v2 ("Polo v2") wire and crypto primitives.
//!
//! Shared protocol layer used by `atvr-client-core`:
//!
//! - Typed pairing and control messages with exact wire-format field numbers
//! - Length-delimited protobuf codec (varint, tag, framing)
//! - RSA-2048 identity and self-signed X.509 certificate primitives
//! - RSA public-parameter extraction from DER certificates
//! - Pairing-secret digest derivation
//! - TLS configuration (permissive verifier, mutual-auth client config)

pub mod codec;
pub mod error;
pub mod identity;
pub mod secret;
pub mod tls;
pub mod wire;
