//! Session supervisor: life-cycle for the single TV connection.
//!
//! Owns at most one transport and one active state machine at a time, plus
//! the identity, preferences, and discovery browser. The UI talks to it
//! through a [`SessionHandle`]: commands go down an mpsc channel, the latest
//! `(state, status, is_pairing, devices)` snapshot comes back on a watch
//! channel.
//!
//! Policies:
//!
//! - Bootstrap: reconnect to the persisted last device if one exists,
//!   otherwise publish `Searching` and wait for the UI to pick a TV.
//! - First connect to an unknown TV goes to the pairing port; known TVs go
//!   straight to the control port.
//! - Control-port loss: back off 2 s, retry the control port on the same
//!   address. Never falls back to the pairing port — that would re-prompt
//!   for a code on every transient loss.
//! - Pairing failure: surface as `Error`.
//! - Suspend cancels the transport and publishes `Paused`; resume waits 3 s
//!   for the OS network to settle, then bootstraps again.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use atvr_proto::identity::ClientIdentity;
use atvr_proto::tls::config::build_client_tls_config;

use crate::control::{ControlMachine, ControlUpdate};
use crate::discovery::{DeviceEndpoint, Discovery};
use crate::error::{ClientError, Result};
use crate::identity_store::IdentityStore;
use crate::pairing::{PairingConfig, PairingMachine, PairingUpdate};
use crate::prefs::PrefsStore;
use crate::transport::{Transport, CONTROL_PORT, PAIRING_PORT};

/// Delay before retrying the control port after a loss.
const CONTROL_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Delay after resume for the OS network stack to settle.
const RESUME_SETTLE_DELAY: Duration = Duration::from_secs(3);

/// Connection state published to the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Searching,
    Connecting,
    Connected,
    Paused,
    Error(String),
}

/// Latest session state, published through the watch channel.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub state: ConnectionState,
    pub status: String,
    /// The UI must collect a pairing code.
    pub is_pairing: bool,
    pub devices: Vec<DeviceEndpoint>,
}

/// Construction-time dependencies; defaults use the platform directories.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Name shown in the TV's pairing dialog; also the device-info model.
    pub client_name: Option<String>,
    /// Override the identity directory (tests, portable installs).
    pub identity_dir: Option<PathBuf>,
    /// Override the preferences file path.
    pub prefs_path: Option<PathBuf>,
}

/// Commands accepted from the UI.
#[derive(Debug)]
enum Command {
    Connect(DeviceEndpoint),
    ConnectNamed(String),
    ConnectToIp(Ipv4Addr),
    SubmitSecret(String),
    SendKey(u32),
    Disconnect,
    Suspend,
    Resume,
}

/// Events from connection tasks and timers back to the supervisor.
#[derive(Debug)]
enum LinkEvent {
    PairingCodeRequired,
    PairingBadSecret,
    Paired { ip: Ipv4Addr },
    PairingFailed { ip: Ipv4Addr, error: String },
    Configured { ip: Ipv4Addr },
    ControlLost { ip: Ipv4Addr, error: String },
    RetryControl { ip: Ipv4Addr },
    Settled,
}

/// Cloneable handle the UI layer holds.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// Connect to a resolved endpoint. Unknown TVs are paired first.
    pub async fn connect(&self, endpoint: DeviceEndpoint) -> Result<()> {
        self.send(Command::Connect(endpoint)).await
    }

    /// Resolve a discovered service by name (bounded) and connect.
    pub async fn connect_named(&self, service_name: &str) -> Result<()> {
        self.send(Command::ConnectNamed(service_name.to_string())).await
    }

    /// Connect straight to the control port of a known address.
    pub async fn connect_to_ip(&self, ip: Ipv4Addr) -> Result<()> {
        self.send(Command::ConnectToIp(ip)).await
    }

    /// Submit the six-hex-character code displayed by the TV.
    pub async fn submit_secret(&self, code: &str) -> Result<()> {
        self.send(Command::SubmitSecret(code.to_string())).await
    }

    /// Tap a key (press + release) on the connected TV.
    pub async fn send_key(&self, keycode: u32) -> Result<()> {
        self.send(Command::SendKey(keycode)).await
    }

    /// Tear down the active connection.
    pub async fn disconnect(&self) -> Result<()> {
        self.send(Command::Disconnect).await
    }

    /// The OS is about to sleep: cancel the transport, publish `Paused`.
    pub async fn suspend(&self) -> Result<()> {
        self.send(Command::Suspend).await
    }

    /// The OS woke up: settle, then reconnect as at startup.
    pub async fn resume(&self) -> Result<()> {
        self.send(Command::Resume).await
    }

    /// Subscribe to session snapshots.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    async fn send(&self, cmd: Command) -> Result<()> {
        self.commands
            .send(cmd)
            .await
            .map_err(|_| ClientError::Cancelled)
    }
}

/// The running connection, if any.
struct ActiveLink {
    ip: Ipv4Addr,
    port: u16,
    /// Pairing sessions accept codes here.
    secret_tx: Option<mpsc::Sender<String>>,
    /// Control sessions accept keycodes here.
    key_tx: Option<mpsc::Sender<u32>>,
    task: JoinHandle<()>,
}

/// The supervisor. Created via [`Session::spawn`]; lives on its own task
/// until every [`SessionHandle`] is dropped.
pub struct Session {
    identity: Arc<ClientIdentity>,
    tls: Arc<rustls::ClientConfig>,
    prefs: PrefsStore,
    discovery: Option<Discovery>,
    discovery_error: Option<String>,
    devices_rx: watch::Receiver<Vec<DeviceEndpoint>>,
    devices_live: bool,
    // Keeps the fallback watch channel open when discovery is unavailable.
    _devices_keepalive: Option<watch::Sender<Vec<DeviceEndpoint>>>,
    client_name: String,
    cmd_rx: mpsc::Receiver<Command>,
    events_tx: mpsc::Sender<LinkEvent>,
    events_rx: mpsc::Receiver<LinkEvent>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    link: Option<ActiveLink>,
    timer: Option<JoinHandle<()>>,
    suspended: bool,
}

impl Session {
    /// Load (or create) the identity, start discovery, and spawn the
    /// supervisor task. Returns the handle the UI layer keeps.
    pub async fn spawn(config: SessionConfig) -> Result<SessionHandle> {
        let store = match &config.identity_dir {
            Some(dir) => IdentityStore::at(dir.clone()),
            None => IdentityStore::at_default_location()?,
        };
        // First-run RSA generation can take a while; keep it off the runtime.
        let identity = tokio::task::spawn_blocking(move || store.load_or_create())
            .await
            .map_err(|e| ClientError::IdentityStore(e.to_string()))??;
        let identity = Arc::new(identity);
        let tls = Arc::new(build_client_tls_config(&identity)?);

        let prefs = match &config.prefs_path {
            Some(path) => PrefsStore::at(path.clone()),
            None => PrefsStore::at_default_location()?,
        };

        let (discovery, discovery_error, devices_rx, devices_keepalive) = match Discovery::start()
        {
            Ok(discovery) => {
                let rx = discovery.devices();
                (Some(discovery), None, rx, None)
            }
            Err(e) => {
                warn!(error = %e, "discovery unavailable");
                let (tx, rx) = watch::channel(Vec::new());
                (None, Some(e.to_string()), rx, Some(tx))
            }
        };

        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (events_tx, events_rx) = mpsc::channel(16);
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::default());

        let session = Session {
            identity,
            tls,
            prefs,
            discovery,
            discovery_error,
            devices_rx,
            devices_live: true,
            _devices_keepalive: devices_keepalive,
            client_name: config
                .client_name
                .unwrap_or_else(|| "atvremote".to_string()),
            cmd_rx,
            events_tx,
            events_rx,
            snapshot_tx,
            link: None,
            timer: None,
            suspended: false,
        };
        tokio::spawn(session.run());

        Ok(SessionHandle {
            commands: cmd_tx,
            snapshot: snapshot_rx,
        })
    }

    async fn run(mut self) {
        if let Some(note) = self.discovery_error.take() {
            self.publish_error(format!("discovery unavailable: {note}"));
        }
        self.bootstrap();

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    // Every handle dropped: shut down.
                    None => break,
                },
                Some(event) = self.events_rx.recv() => self.handle_event(event),
                changed = self.devices_rx.changed(), if self.devices_live => match changed {
                    Ok(()) => {
                        let devices = self.devices_rx.borrow_and_update().clone();
                        self.publish(move |s| s.devices = devices);
                    }
                    Err(_) => self.devices_live = false,
                },
            }
        }

        self.cancel_timer();
        self.drop_link();
        if let Some(discovery) = &self.discovery {
            discovery.shutdown();
        }
        debug!("session supervisor stopped");
    }

    /// Startup and post-resume policy.
    fn bootstrap(&mut self) {
        match self.prefs.last_device() {
            Some(ip) => {
                info!(%ip, "reconnecting to last device");
                self.start_control(ip);
            }
            None => {
                self.publish(|s| {
                    s.state = ConnectionState::Searching;
                    s.status = "searching for TVs".to_string();
                    s.is_pairing = false;
                });
            }
        }
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect(endpoint) => self.connect_endpoint(endpoint),
            Command::ConnectNamed(name) => self.connect_named(name).await,
            Command::ConnectToIp(ip) => {
                self.cancel_timer();
                self.start_control(ip);
            }
            Command::SubmitSecret(code) => {
                let tx = self.link.as_ref().and_then(|l| l.secret_tx.clone());
                match tx {
                    Some(tx) => {
                        let _ = tx.send(code).await;
                    }
                    None => debug!("no pairing in progress; ignoring code"),
                }
            }
            Command::SendKey(keycode) => {
                let tx = self.link.as_ref().and_then(|l| l.key_tx.clone());
                match tx {
                    Some(tx) => {
                        let _ = tx.send(keycode).await;
                    }
                    None => debug!(keycode, "not connected; dropping key"),
                }
            }
            Command::Disconnect => {
                self.cancel_timer();
                self.drop_link();
                self.publish(|s| {
                    s.state = ConnectionState::Disconnected;
                    s.status = "disconnected".to_string();
                    s.is_pairing = false;
                });
            }
            Command::Suspend => {
                self.suspended = true;
                self.cancel_timer();
                self.drop_link();
                self.publish(|s| {
                    s.state = ConnectionState::Paused;
                    s.status = "paused (OS sleeping)".to_string();
                    s.is_pairing = false;
                });
            }
            Command::Resume => {
                if !self.suspended {
                    return;
                }
                self.suspended = false;
                self.publish_state(ConnectionState::Connecting, "waking up");
                self.schedule(RESUME_SETTLE_DELAY, LinkEvent::Settled);
            }
        }
    }

    fn handle_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::PairingCodeRequired => {
                if self.link_is_port(PAIRING_PORT) {
                    self.publish(|s| {
                        s.is_pairing = true;
                        s.status = "enter the code displayed on the TV".to_string();
                    });
                }
            }
            LinkEvent::PairingBadSecret => {
                if self.link_is_port(PAIRING_PORT) {
                    self.publish(|s| {
                        s.is_pairing = true;
                        s.status = "code rejected, try again".to_string();
                    });
                }
            }
            LinkEvent::Paired { ip } => {
                if !self.link_is(ip, PAIRING_PORT) {
                    return;
                }
                info!(%ip, "paired; switching to the control port");
                self.drop_link();
                self.publish(|s| s.is_pairing = false);
                self.start_control(ip);
            }
            LinkEvent::PairingFailed { ip, error } => {
                if !self.link_is(ip, PAIRING_PORT) {
                    return;
                }
                self.drop_link();
                self.publish_error(format!("pairing failed: {error}"));
            }
            LinkEvent::Configured { ip } => {
                if !self.link_is(ip, CONTROL_PORT) {
                    return;
                }
                self.publish(|s| {
                    s.state = ConnectionState::Connected;
                    s.status = format!("connected to {ip}");
                    s.is_pairing = false;
                });
                // The only write of durable connection state.
                if let Err(e) = self.prefs.set_last_device(ip) {
                    warn!(error = %e, "could not persist last device");
                }
            }
            LinkEvent::ControlLost { ip, error } => {
                if !self.link_is(ip, CONTROL_PORT) {
                    return;
                }
                warn!(%ip, error, "control session lost");
                self.drop_link();
                self.publish_state(ConnectionState::Connecting, "connection lost, retrying");
                self.schedule(CONTROL_RETRY_DELAY, LinkEvent::RetryControl { ip });
            }
            LinkEvent::RetryControl { ip } => {
                if !self.suspended && self.link.is_none() {
                    self.start_control(ip);
                }
            }
            LinkEvent::Settled => {
                if !self.suspended && self.link.is_none() {
                    self.bootstrap();
                }
            }
        }
    }

    /// Pick the port for a freshly selected endpoint: pairing for unknown
    /// TVs, control for the one we already paired with.
    fn connect_endpoint(&mut self, endpoint: DeviceEndpoint) {
        self.cancel_timer();
        if self.prefs.last_device() == Some(endpoint.ip) {
            self.start_control(endpoint.ip);
        } else {
            self.start_pairing(endpoint);
        }
    }

    async fn connect_named(&mut self, name: String) {
        let Some(discovery) = &self.discovery else {
            self.publish_error("discovery unavailable".to_string());
            return;
        };
        self.publish_state(ConnectionState::Connecting, format!("resolving {name}"));
        let resolved = discovery.resolve(&name).await;
        match resolved {
            Ok(endpoint) => self.connect_endpoint(endpoint),
            Err(e) => self.publish_error(e.to_string()),
        }
    }

    fn start_pairing(&mut self, endpoint: DeviceEndpoint) {
        self.drop_link();
        let ip = endpoint.ip;
        self.publish_state(ConnectionState::Connecting, format!("pairing with {ip}"));

        let (secret_tx, secret_rx) = mpsc::channel(4);
        let (update_tx, mut update_rx) = mpsc::channel(4);
        let events = self.events_tx.clone();
        let tls = self.tls.clone();
        let identity = self.identity.clone();
        let config = PairingConfig {
            client_name: self.client_name.clone(),
            service_name: endpoint.service_name.clone(),
            legacy_truncated_secret: false,
        };

        let task = tokio::spawn(async move {
            let bridge = tokio::spawn({
                let events = events.clone();
                async move {
                    while let Some(update) = update_rx.recv().await {
                        let event = match update {
                            PairingUpdate::CodeRequired => LinkEvent::PairingCodeRequired,
                            PairingUpdate::BadSecret => LinkEvent::PairingBadSecret,
                        };
                        if events.send(event).await.is_err() {
                            return;
                        }
                    }
                }
            });

            let result = async {
                let transport = Transport::connect(ip, PAIRING_PORT, tls).await?;
                PairingMachine::new(transport, identity, config, secret_rx, update_tx)
                    .run()
                    .await
            }
            .await;

            // The machine (and its update sender) is gone; drain the bridge
            // so updates precede the terminal event.
            let _ = bridge.await;

            let event = match result {
                Ok(()) => LinkEvent::Paired { ip },
                Err(e) if e.is_cancelled() => return,
                Err(e) => LinkEvent::PairingFailed {
                    ip,
                    error: e.to_string(),
                },
            };
            let _ = events.send(event).await;
        });

        self.link = Some(ActiveLink {
            ip,
            port: PAIRING_PORT,
            secret_tx: Some(secret_tx),
            key_tx: None,
            task,
        });
    }

    fn start_control(&mut self, ip: Ipv4Addr) {
        self.drop_link();
        self.publish_state(ConnectionState::Connecting, format!("connecting to {ip}"));

        let (key_tx, key_rx) = mpsc::channel(16);
        let (update_tx, mut update_rx) = mpsc::channel(4);
        let events = self.events_tx.clone();
        let tls = self.tls.clone();
        let client_name = self.client_name.clone();

        let task = tokio::spawn(async move {
            let bridge = tokio::spawn({
                let events = events.clone();
                async move {
                    while let Some(ControlUpdate::Configured) = update_rx.recv().await {
                        if events.send(LinkEvent::Configured { ip }).await.is_err() {
                            return;
                        }
                    }
                }
            });

            let result = async {
                let transport = Transport::connect(ip, CONTROL_PORT, tls).await?;
                ControlMachine::new(transport, client_name, key_rx, update_tx)
                    .run()
                    .await
            }
            .await;

            let _ = bridge.await;

            match result {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {}
                Err(e) => {
                    let _ = events
                        .send(LinkEvent::ControlLost {
                            ip,
                            error: e.to_string(),
                        })
                        .await;
                }
            }
        });

        self.link = Some(ActiveLink {
            ip,
            port: CONTROL_PORT,
            secret_tx: None,
            key_tx: Some(key_tx),
            task,
        });
    }

    fn drop_link(&mut self) {
        if let Some(link) = self.link.take() {
            debug!(ip = %link.ip, port = link.port, "cancelling connection");
            link.task.abort();
        }
    }

    /// Replace any pending timer with one that fires `event` after `delay`.
    fn schedule(&mut self, delay: Duration, event: LinkEvent) {
        self.cancel_timer();
        let events = self.events_tx.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(event).await;
        }));
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    fn link_is(&self, ip: Ipv4Addr, port: u16) -> bool {
        self.link
            .as_ref()
            .is_some_and(|l| l.ip == ip && l.port == port)
    }

    fn link_is_port(&self, port: u16) -> bool {
        self.link.as_ref().is_some_and(|l| l.port == port)
    }

    fn publish<F: FnOnce(&mut SessionSnapshot)>(&self, f: F) {
        self.snapshot_tx.send_modify(f);
    }

    fn publish_state(&self, state: ConnectionState, status: impl Into<String>) {
        let status = status.into();
        self.publish(move |s| {
            s.state = state;
            s.status = status;
        });
    }

    fn publish_error(&self, message: String) {
        self.publish(move |s| {
            s.state = ConnectionState::Error(message.clone());
            s.status = message;
            s.is_pairing = false;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_snapshot_is_disconnected() {
        let snapshot = SessionSnapshot::default();
        assert_eq!(snapshot.state, ConnectionState::Disconnected);
        assert!(!snapshot.is_pairing);
        assert!(snapshot.devices.is_empty());
    }

    #[test]
    fn error_state_carries_the_message() {
        let state = ConnectionState::Error("pairing failed".to_string());
        assert_ne!(state, ConnectionState::Disconnected);
        if let ConnectionState::Error(message) = state {
            assert_eq!(message, "pairing failed");
        }
    }
}
