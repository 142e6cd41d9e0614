//! In-process TV simulator: a tokio TLS server that requires a client
//! certificate (accepting any, like a TV before pairing) and exchanges
//! length-prefixed protobuf frames.

use std::sync::Arc;

use bytes::{Buf, BytesMut};
use prost::Message;
use rustls::server::danger::{ClientCertVerified, ClientCertVerifier};
use rustls::client::danger::HandshakeSignatureValid;
use rustls::{DigitallySignedStruct, Error as TlsError, SignatureScheme};
use rustls_pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, UnixTime};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::server::TlsStream;
use tokio_rustls::TlsAcceptor;

use atvr_proto::codec;
use atvr_proto::identity::ClientIdentity;

/// Accepts any client certificate, as the TV does before pairing binds one.
#[derive(Debug)]
struct AcceptAnyClientCert;

impl ClientCertVerifier for AcceptAnyClientCert {
    fn root_hint_subjects(&self) -> &[rustls::DistinguishedName] {
        &[]
    }

    fn verify_client_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _now: UnixTime,
    ) -> Result<ClientCertVerified, TlsError> {
        Ok(ClientCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
        ]
    }

    fn offer_client_auth(&self) -> bool {
        true
    }

    fn client_auth_mandatory(&self) -> bool {
        true
    }
}

/// Server TLS config for the simulated TV.
pub fn server_tls_config(identity: &ClientIdentity) -> Arc<rustls::ServerConfig> {
    let cert_chain = vec![CertificateDer::from(identity.certificate.der().to_vec())];
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(
        identity.keypair.to_pkcs8_der().expect("pkcs8 export"),
    ));

    let config = rustls::ServerConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .expect("protocol versions")
    .with_client_cert_verifier(Arc::new(AcceptAnyClientCert))
    .with_single_cert(cert_chain, key)
    .expect("server certificate");

    Arc::new(config)
}

/// Accept one TLS connection on the listener.
pub async fn accept_tls(
    listener: &TcpListener,
    config: Arc<rustls::ServerConfig>,
) -> TlsStream<TcpStream> {
    let (tcp, _) = listener.accept().await.expect("tcp accept");
    TlsAcceptor::from(config)
        .accept(tcp)
        .await
        .expect("server handshake")
}

/// Read one length-prefixed message, buffering partial frames.
pub async fn read_message<M: Message + Default>(
    stream: &mut TlsStream<TcpStream>,
    buf: &mut BytesMut,
) -> M {
    loop {
        if let Some((msg, consumed)) =
            codec::decode_length_delimited::<M>(&buf[..]).expect("well-formed frame")
        {
            buf.advance(consumed);
            return msg;
        }
        let n = stream.read_buf(buf).await.expect("server read");
        assert!(n > 0, "client closed the connection mid-message");
    }
}

/// Write one length-prefixed message.
pub async fn write_message<M: Message>(stream: &mut TlsStream<TcpStream>, msg: &M) {
    let bytes = codec::encode_length_delimited(msg).expect("encode");
    stream.write_all(&bytes).await.expect("server write");
    stream.flush().await.expect("server flush");
}
