//! TCP + TLS transport with frame reassembly.
//!
//! `Transport::connect` opens a TCP connection, runs the rustls client
//! handshake with mutual authentication, captures the server's leaf
//! certificate, and spawns a receive loop. The loop appends whatever the
//! socket yields into a reassembly buffer and splits off complete
//! length-prefixed frames, dispatching each payload serially on an mpsc
//! channel. Frames survive any TCP chunking: several per segment, or one
//! spread over many.
//!
//! Dropping the transport aborts the receive loop and closes the session;
//! in-flight operations end with the channel, which callers treat as
//! cancellation rather than failure.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use prost::Message;
use rustls_pki_types::ServerName;
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

use atvr_proto::codec;

use crate::error::{ClientError, Result};

/// TLS port for the one-time pairing handshake.
pub const PAIRING_PORT: u16 = 6467;

/// TLS port for the ongoing remote-control session.
pub const CONTROL_PORT: u16 = 6466;

/// Bound on TCP connect and on the TLS handshake, each.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Receive chunk size for the read loop.
const READ_CHUNK: usize = 8192;

/// An established TLS session to one TV port.
pub struct Transport {
    writer: WriteHalf<TlsStream<TcpStream>>,
    frames: mpsc::Receiver<Vec<u8>>,
    peer_cert_der: Vec<u8>,
    peer: SocketAddr,
    read_task: JoinHandle<()>,
}

impl Transport {
    /// Open TCP + TLS to `(ip, port)` and start the receive loop.
    ///
    /// The TLS config must carry the client identity; any server certificate
    /// is accepted and its leaf is captured for the pairing digest.
    pub async fn connect(ip: Ipv4Addr, port: u16, tls: Arc<rustls::ClientConfig>) -> Result<Self> {
        let addr = SocketAddr::new(IpAddr::V4(ip), port);
        let tcp = timeout(CONNECT_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| ClientError::ConnectTimeout)??;
        tcp.set_nodelay(true).ok();

        // The permissive verifier ignores the name; rustls still requires one.
        let connector = TlsConnector::from(tls);
        let server_name = ServerName::from(IpAddr::V4(ip));
        let stream = timeout(CONNECT_TIMEOUT, connector.connect(server_name, tcp))
            .await
            .map_err(|_| ClientError::ConnectTimeout)?
            .map_err(|e| ClientError::TlsHandshake(e.to_string()))?;

        let peer_cert_der = stream
            .get_ref()
            .1
            .peer_certificates()
            .and_then(|certs| certs.first())
            .map(|cert| cert.as_ref().to_vec())
            .ok_or_else(|| ClientError::TlsHandshake("server presented no certificate".into()))?;

        debug!(%addr, "TLS session established");

        let (reader, writer) = tokio::io::split(stream);
        let (frame_tx, frames) = mpsc::channel(32);
        let read_task = tokio::spawn(read_loop(reader, frame_tx));

        Ok(Self {
            writer,
            frames,
            peer_cert_der,
            peer: addr,
            read_task,
        })
    }

    /// DER bytes of the leaf certificate the server presented.
    pub fn peer_certificate(&self) -> &[u8] {
        &self.peer_cert_der
    }

    /// Remote address of this session.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Send one message, length-prefixed.
    pub async fn send<M: Message>(&mut self, msg: &M) -> Result<()> {
        let bytes = codec::encode_length_delimited(msg)?;
        self.writer.write_all(&bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive the next reassembled frame payload.
    ///
    /// Returns `None` once the session has ended: peer close, read error, or
    /// a malformed stream the read loop bailed on.
    pub async fn next_frame(&mut self) -> Option<Vec<u8>> {
        self.frames.recv().await
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.read_task.abort();
    }
}

/// Receive loop: append socket bytes, split off complete frames, dispatch.
async fn read_loop(mut reader: ReadHalf<TlsStream<TcpStream>>, tx: mpsc::Sender<Vec<u8>>) {
    use tokio::io::AsyncReadExt;

    let mut buffer = BytesMut::with_capacity(READ_CHUNK);
    loop {
        match reader.read_buf(&mut buffer).await {
            Ok(0) => {
                debug!("peer closed the connection");
                return;
            }
            Ok(_) => {}
            Err(e) => {
                debug!(error = %e, "socket read failed");
                return;
            }
        }

        // Drain every complete frame; leave partial bytes for the next read.
        loop {
            let (payload, consumed) = match codec::read_frame(&buffer[..]) {
                Ok(Some((payload, consumed))) => (payload.to_vec(), consumed),
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "malformed frame, dropping connection");
                    return;
                }
            };
            buffer.advance(consumed);
            if tx.send(payload).await.is_err() {
                // Receiver dropped: the session is being torn down.
                return;
            }
        }
    }
}
