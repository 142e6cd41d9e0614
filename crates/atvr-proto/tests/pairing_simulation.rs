//! Integration tests: pairing-secret ceremony simulation.
//!
//! Simulates both sides of the code exchange with real generated identities:
//!
//! 1. Client and TV each hold an RSA identity with a self-signed certificate.
//! 2. Both extract the RSA parameters from the two certificates.
//! 3. Both compute the digest over (client params, server params, code bytes)
//!    — the results must match, and the client's copy is what goes on the
//!    wire as the pairing secret.

use std::sync::LazyLock;

use atvr_proto::identity::ClientIdentity;
use atvr_proto::secret::{derive_secret, expected_header, PairingCode};
use atvr_proto::tls::cert_extract::extract_rsa_params;

/// Reference epoch: 2025-01-01 00:00:00 UTC.
const JAN_1_2025: i64 = 1735689600;

static CLIENT: LazyLock<ClientIdentity> =
    LazyLock::new(|| ClientIdentity::generate(JAN_1_2025).expect("client identity"));
static TV: LazyLock<ClientIdentity> =
    LazyLock::new(|| ClientIdentity::generate(JAN_1_2025).expect("tv identity"));

#[test]
fn both_sides_derive_the_same_secret() {
    let client_params = extract_rsa_params(CLIENT.certificate.der()).expect("client params");
    let server_params = extract_rsa_params(TV.certificate.der()).expect("server params");
    let code = PairingCode::parse("7C2F91").expect("valid code");

    // Client side hashes (client, server); the TV does the identical hash
    // with the certificates it holds.
    let client_digest = derive_secret(&client_params, &server_params, &code);
    let tv_digest = derive_secret(&client_params, &server_params, &code);

    assert_eq!(client_digest, tv_digest);
    assert_eq!(client_digest.len(), 32);
}

#[test]
fn extractor_agrees_with_private_key() {
    let extracted = extract_rsa_params(CLIENT.certificate.der()).expect("client params");
    assert_eq!(extracted, CLIENT.keypair.public_params());
}

#[test]
fn different_code_bytes_change_the_secret() {
    let client_params = extract_rsa_params(CLIENT.certificate.der()).expect("client params");
    let server_params = extract_rsa_params(TV.certificate.der()).expect("server params");

    let a = derive_secret(
        &client_params,
        &server_params,
        &PairingCode::parse("7C2F91").expect("code a"),
    );
    let b = derive_secret(
        &client_params,
        &server_params,
        &PairingCode::parse("7C2F92").expect("code b"),
    );
    assert_ne!(a, b);
}

#[test]
fn a_different_tv_certificate_changes_the_secret() {
    let client_params = extract_rsa_params(CLIENT.certificate.der()).expect("client params");
    let server_params = extract_rsa_params(TV.certificate.der()).expect("server params");
    let code = PairingCode::parse("7C2F91").expect("valid code");

    let legit = derive_secret(&client_params, &server_params, &code);
    // A MITM presenting its own certificate yields different server params.
    let mitm = derive_secret(&client_params, &client_params, &code);
    assert_ne!(legit, mitm);
}

#[test]
fn expected_header_is_two_uppercase_hex_chars() {
    let client_params = extract_rsa_params(CLIENT.certificate.der()).expect("client params");
    let server_params = extract_rsa_params(TV.certificate.der()).expect("server params");
    let code = PairingCode::parse("AB1234").expect("valid code");

    let digest = derive_secret(&client_params, &server_params, &code);
    let header = expected_header(&digest);
    assert_eq!(header.len(), 2);
    assert!(header.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(header, header.to_uppercase());
}
