//! TLS configuration for the pairing and control sessions.
//!
//! Provides the primitives the client transport needs:
//!
//! - RSA public-parameter extraction from X.509 DER certificates
//! - The permissive server-certificate verifier
//! - The mutual-auth `rustls::ClientConfig` builder

pub mod cert_extract;
pub mod config;
pub mod verifier;
