//! The remote-control session on port 6466.
//!
//! As soon as TLS is up the client sends its configure message; the session
//! is live once either the TV's configure (which gets acknowledged) or a bare
//! configure-ack arrives. From then on the machine echoes ping requests and
//! injects key events submitted through the key channel. The client never
//! originates pings — some TVs answer with INVALID_ARGUMENT and drop the
//! connection.

use std::time::Duration;

use prost::Message;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info};

use atvr_proto::wire::{
    DeviceInfo, RemoteMessage, DEFAULT_CONFIGURE_CODE, DIRECTION_PRESS, DIRECTION_RELEASE,
};

use crate::error::{ClientError, Result};
use crate::keycode;
use crate::transport::Transport;

/// Delay between the press and release halves of a key tap.
const KEY_RELEASE_DELAY: Duration = Duration::from_millis(50);

/// Updates surfaced to the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlUpdate {
    /// Configuration completed; the session is live.
    Configured,
}

/// Drives one control session over one transport.
pub struct ControlMachine {
    transport: Transport,
    client_name: String,
    keys: mpsc::Receiver<u32>,
    updates: mpsc::Sender<ControlUpdate>,
    configured: bool,
}

impl ControlMachine {
    pub fn new(
        transport: Transport,
        client_name: String,
        keys: mpsc::Receiver<u32>,
        updates: mpsc::Sender<ControlUpdate>,
    ) -> Self {
        Self {
            transport,
            client_name,
            keys,
            updates,
            configured: false,
        }
    }

    /// Run until the connection drops or the key channel closes.
    pub async fn run(mut self) -> Result<()> {
        self.transport
            .send(&RemoteMessage::configure(
                DEFAULT_CONFIGURE_CODE,
                DeviceInfo::for_client(&self.client_name),
            ))
            .await?;

        loop {
            tokio::select! {
                frame = self.transport.next_frame() => match frame {
                    Some(payload) => self.handle_frame(&payload).await?,
                    None => {
                        return Err(ClientError::ConnectionClosed(
                            "control session closed".into(),
                        ));
                    }
                },
                key = self.keys.recv() => match key {
                    Some(code) => self.tap_key(code).await?,
                    // Key channel gone: the supervisor dropped us.
                    None => return Err(ClientError::Cancelled),
                },
            }
        }
    }

    async fn handle_frame(&mut self, payload: &[u8]) -> Result<()> {
        let msg = RemoteMessage::decode(payload).map_err(atvr_proto::error::ProtoError::from)?;

        if let Some(configure) = msg.remote_configure {
            debug!(code1 = configure.code1, "TV configure");
            self.transport
                .send(&RemoteMessage::configure_ack(configure.code1))
                .await?;
            self.mark_configured().await;
        } else if let Some(ack) = msg.configure_ack {
            debug!(code1 = ack.code1, "configure acknowledged");
            self.mark_configured().await;
        } else if let Some(ping) = msg.ping_request {
            self.transport
                .send(&RemoteMessage::ping_response(ping.id))
                .await?;
        } else {
            debug!("ignoring unhandled control message");
        }
        Ok(())
    }

    async fn mark_configured(&mut self) {
        if !self.configured {
            self.configured = true;
            info!("control session configured");
            self.updates.send(ControlUpdate::Configured).await.ok();
        }
    }

    /// Inject one key tap: press, then release after a short hold.
    async fn tap_key(&mut self, code: u32) -> Result<()> {
        debug!(code, key = keycode::name(code), "key tap");
        self.transport
            .send(&RemoteMessage::key_inject(code, DIRECTION_PRESS))
            .await?;
        sleep(KEY_RELEASE_DELAY).await;
        self.transport
            .send(&RemoteMessage::key_inject(code, DIRECTION_RELEASE))
            .await?;
        Ok(())
    }
}
