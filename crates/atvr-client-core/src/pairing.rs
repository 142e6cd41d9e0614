//! The four-step pairing handshake on port 6467.
//!
//! Client perspective:
//!
//! ```text
//! TlsReady -> send PairingRequest  -> await ack (status 200)
//!          -> send Options         -> await ack
//!          -> send Configuration   -> await ack
//!          -> (TV displays a code; UI collects it)
//!          -> send PairingSecret   -> await ack | 402 -> re-prompt
//! ```
//!
//! The secret is the SHA-256 digest over both endpoints' RSA parameters plus
//! the two code bytes; the client's certificate comes from the injected
//! identity, the TV's from the leaf captured during the TLS handshake. A 402
//! keeps the same TLS session alive and asks the user for a new code. Some
//! firmwares close the session instead of acknowledging a correct secret, so
//! a short watchdog treats silence as success.

use std::sync::Arc;
use std::time::Duration;

use prost::Message;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use atvr_proto::identity::ClientIdentity;
use atvr_proto::secret::{derive_secret, expected_header, PairingCode};
use atvr_proto::tls::cert_extract::extract_rsa_params;
use atvr_proto::wire::{status, PairingMessage, PROTOCOL_VERSION};

use crate::error::{ClientError, Result};
use crate::transport::Transport;

/// How long to wait for the secret ack before assuming success.
const SECRET_ACK_TIMEOUT: Duration = Duration::from_secs(3);

/// Tuning for one pairing exchange.
#[derive(Debug, Clone)]
pub struct PairingConfig {
    /// Name shown in the TV's pairing dialog.
    pub client_name: String,
    /// mDNS service name of the selected TV.
    pub service_name: String,
    /// Send a 31-byte truncated digest instead of the full 32 bytes. Known
    /// quirk of some firmwares; never enabled automatically.
    pub legacy_truncated_secret: bool,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            client_name: "atvremote".to_string(),
            service_name: String::new(),
            legacy_truncated_secret: false,
        }
    }
}

/// Updates surfaced to the supervisor while pairing runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingUpdate {
    /// The TV is displaying a code; the UI must collect it.
    CodeRequired,
    /// The submitted code was rejected; collect a new one.
    BadSecret,
}

/// Handshake steps that expect an acknowledgement.
#[derive(Debug, Clone, Copy)]
enum Step {
    Request,
    Options,
    Configuration,
}

/// Drives one pairing exchange over one transport.
pub struct PairingMachine {
    transport: Transport,
    identity: Arc<ClientIdentity>,
    config: PairingConfig,
    secrets: mpsc::Receiver<String>,
    updates: mpsc::Sender<PairingUpdate>,
}

impl PairingMachine {
    pub fn new(
        transport: Transport,
        identity: Arc<ClientIdentity>,
        config: PairingConfig,
        secrets: mpsc::Receiver<String>,
        updates: mpsc::Sender<PairingUpdate>,
    ) -> Self {
        Self {
            transport,
            identity,
            config,
            secrets,
            updates,
        }
    }

    /// Run the handshake to completion.
    ///
    /// On success the transport is dropped; the caller reconnects on the
    /// control port with the same identity.
    pub async fn run(mut self) -> Result<()> {
        self.transport
            .send(&PairingMessage::request(
                &self.config.client_name,
                &self.config.service_name,
            ))
            .await?;
        self.await_ack(Step::Request).await?;

        self.transport.send(&PairingMessage::options()).await?;
        self.await_ack(Step::Options).await?;

        self.transport.send(&PairingMessage::configuration()).await?;
        self.await_ack(Step::Configuration).await?;

        // The TV is now showing the code.
        self.updates.send(PairingUpdate::CodeRequired).await.ok();
        self.exchange_secret().await
    }

    /// Read and decode the next pairing message.
    async fn next_message(&mut self) -> Result<PairingMessage> {
        let frame = self
            .transport
            .next_frame()
            .await
            .ok_or_else(|| ClientError::ConnectionClosed("pairing session closed".into()))?;
        let msg = PairingMessage::decode(frame.as_slice())
            .map_err(atvr_proto::error::ProtoError::from)?;
        if msg.protocol_version != PROTOCOL_VERSION {
            debug!(version = msg.protocol_version, "unexpected protocol version");
        }
        Ok(msg)
    }

    /// Await the acknowledgement for one handshake step.
    ///
    /// The TV echoes the step's field after the version/status prefix; extra
    /// fields are tolerated, the status decides.
    async fn await_ack(&mut self, step: Step) -> Result<()> {
        let msg = self.next_message().await?;
        if msg.status != status::OK {
            return Err(ClientError::Status(msg.status));
        }
        let echoed = match step {
            Step::Request => msg.pairing_request.is_some(),
            Step::Options => msg.options.is_some(),
            Step::Configuration => msg.configuration.is_some(),
        };
        if !echoed {
            debug!(?step, "ack without the step's echo field");
        }
        Ok(())
    }

    /// Collect codes from the UI until one is accepted.
    async fn exchange_secret(&mut self) -> Result<()> {
        let client_params = extract_rsa_params(self.identity.certificate.der())?;
        let server_params = extract_rsa_params(self.transport.peer_certificate())?;

        loop {
            let raw = self.secrets.recv().await.ok_or(ClientError::Cancelled)?;
            let code = match PairingCode::parse(&raw) {
                Ok(code) => code,
                Err(e) => {
                    warn!(error = %e, "unusable pairing code");
                    self.updates.send(PairingUpdate::BadSecret).await.ok();
                    continue;
                }
            };

            let digest = derive_secret(&client_params, &server_params, &code);
            debug!(header = %expected_header(&digest), "derived pairing secret");

            let secret = if self.config.legacy_truncated_secret {
                digest[..31].to_vec()
            } else {
                digest.to_vec()
            };
            self.transport.send(&PairingMessage::secret(secret)).await?;

            match timeout(SECRET_ACK_TIMEOUT, self.next_message()).await {
                Ok(Ok(msg)) if msg.status == status::OK => {
                    info!("pairing complete");
                    return Ok(());
                }
                Ok(Ok(msg)) if msg.status == status::BAD_SECRET => {
                    info!("TV rejected the pairing secret");
                    self.updates.send(PairingUpdate::BadSecret).await.ok();
                    // Same TLS session; wait for a fresh code.
                    continue;
                }
                Ok(Ok(msg)) => return Err(ClientError::Status(msg.status)),
                // Some firmwares close the session instead of acking.
                Ok(Err(ClientError::ConnectionClosed(_))) | Err(_) => {
                    info!("no secret ack; assuming pairing succeeded");
                    return Ok(());
                }
                Ok(Err(e)) => return Err(e),
            }
        }
    }
}
