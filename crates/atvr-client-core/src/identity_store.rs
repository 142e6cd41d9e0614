//! Load-or-create persistence for the client identity.
//!
//! The identity lives as `cert.pem` and `key.pem` under the platform data
//! directory. It is created once per installation; every later process start
//! loads the same bytes, because pairing bound this exact certificate to the
//! TV. Only an explicit [`IdentityStore::reset`] destroys it.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use atvr_proto::identity::ClientIdentity;

use crate::error::{ClientError, Result};

const CERT_FILE: &str = "cert.pem";
const KEY_FILE: &str = "key.pem";

/// Filesystem location of the persisted identity.
pub struct IdentityStore {
    dir: PathBuf,
}

impl IdentityStore {
    /// Store under the platform data directory
    /// (e.g. `~/.local/share/atvremote` on Linux).
    pub fn at_default_location() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "atvremote")
            .ok_or_else(|| ClientError::IdentityStore("no platform data directory".into()))?;
        Ok(Self {
            dir: dirs.data_dir().to_path_buf(),
        })
    }

    /// Store under an explicit directory (tests, portable installs).
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// True when both identity files are present.
    pub fn exists(&self) -> bool {
        self.dir.join(CERT_FILE).is_file() && self.dir.join(KEY_FILE).is_file()
    }

    /// Load the persisted identity, or generate and persist a fresh one.
    pub fn load_or_create(&self) -> Result<ClientIdentity> {
        if self.exists() {
            self.load()
        } else {
            self.create()
        }
    }

    /// Remove the persisted identity. The next [`Self::load_or_create`]
    /// generates a fresh one, which the TV will not recognize until re-paired.
    pub fn reset(&self) -> Result<()> {
        for file in [CERT_FILE, KEY_FILE] {
            let path = self.dir.join(file);
            match std::fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "removed identity file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(ClientError::IdentityStore(format!(
                        "removing {}: {e}",
                        path.display()
                    )));
                }
            }
        }
        Ok(())
    }

    fn load(&self) -> Result<ClientIdentity> {
        let key_pem = self.read(KEY_FILE)?;
        let cert_pem = self.read(CERT_FILE)?;
        debug!(dir = %self.dir.display(), "loaded client identity");
        Ok(ClientIdentity::from_pem(&key_pem, &cert_pem)?)
    }

    fn create(&self) -> Result<ClientIdentity> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        let identity = ClientIdentity::generate(now)?;

        std::fs::create_dir_all(&self.dir).map_err(|e| {
            ClientError::IdentityStore(format!("creating {}: {e}", self.dir.display()))
        })?;
        self.write(KEY_FILE, &identity.keypair.to_pkcs8_pem()?)?;
        self.write(CERT_FILE, identity.certificate.pem())?;
        self.restrict_key_permissions();

        info!(dir = %self.dir.display(), "generated new client identity");
        Ok(identity)
    }

    fn read(&self, file: &str) -> Result<String> {
        let path = self.dir.join(file);
        std::fs::read_to_string(&path)
            .map_err(|e| ClientError::IdentityStore(format!("reading {}: {e}", path.display())))
    }

    fn write(&self, file: &str, contents: &str) -> Result<()> {
        let path = self.dir.join(file);
        std::fs::write(&path, contents)
            .map_err(|e| ClientError::IdentityStore(format!("writing {}: {e}", path.display())))
    }

    #[cfg(unix)]
    fn restrict_key_permissions(&self) {
        use std::os::unix::fs::PermissionsExt;
        let path = self.dir.join(KEY_FILE);
        if let Err(e) = std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)) {
            debug!(path = %path.display(), error = %e, "could not restrict key permissions");
        }
    }

    #[cfg(not(unix))]
    fn restrict_key_permissions(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_or_create_is_stable_across_calls() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = IdentityStore::at(dir.path());

        assert!(!store.exists());
        let first = store.load_or_create().expect("create");
        assert!(store.exists());

        let second = store.load_or_create().expect("load");
        // The pairing digest binds these bytes; they must be identical.
        assert_eq!(first.certificate.der(), second.certificate.der());
        assert_eq!(
            first.keypair.public_params(),
            second.keypair.public_params()
        );
    }

    #[test]
    fn reset_discards_the_identity() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = IdentityStore::at(dir.path());

        let first = store.load_or_create().expect("create");
        store.reset().expect("reset");
        assert!(!store.exists());

        let second = store.load_or_create().expect("recreate");
        assert_ne!(first.certificate.der(), second.certificate.der());
    }

    #[test]
    fn reset_on_empty_store_is_a_noop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = IdentityStore::at(dir.path());
        store.reset().expect("reset should tolerate missing files");
    }
}
