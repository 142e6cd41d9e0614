//! Headless Android TV remote client engine.
//!
//! Provides the networking core consumed by any UI shell (desktop app, TUI,
//! CLI):
//!
//! - mDNS browser discovering `_androidtvremote2._tcp` TVs
//! - TCP+TLS transport with mutual auth and frame reassembly
//! - The four-step pairing handshake (port 6467)
//! - The configure/ping/key-inject control session (port 6466)
//! - Identity and preference persistence
//! - A session supervisor with a command/snapshot handle for the UI
//!
//! Typical embedding:
//!
//! ```no_run
//! use atvr_client_core::{Session, SessionConfig, keycode};
//!
//! # async fn demo() -> Result<(), atvr_client_core::ClientError> {
//! let session = Session::spawn(SessionConfig::default()).await?;
//! let snapshots = session.subscribe();
//!
//! // ... user picks a device from snapshots.borrow().devices ...
//! # let endpoint = snapshots.borrow().devices[0].clone();
//! session.connect(endpoint).await?;
//! // When snapshot.is_pairing turns true, collect the code from the user:
//! session.submit_secret("7C2F91").await?;
//! session.send_key(keycode::KEYCODE_DPAD_CENTER).await?;
//! # Ok(())
//! # }
//! ```

pub mod control;
pub mod discovery;
pub mod error;
pub mod identity_store;
pub mod keycode;
pub mod pairing;
pub mod prefs;
pub mod session;
pub mod transport;

pub use discovery::{DeviceEndpoint, Discovery};
pub use error::ClientError;
pub use identity_store::IdentityStore;
pub use prefs::{Preferences, PrefsStore};
pub use session::{ConnectionState, Session, SessionConfig, SessionHandle, SessionSnapshot};
pub use transport::{Transport, CONTROL_PORT, PAIRING_PORT};
