//! mDNS/DNS-SD discovery of Android TVs on the local network.
//!
//! Browses `_androidtvremote2._tcp.local.` and publishes the set of resolved
//! endpoints through a watch channel. Zero results for any length of time is
//! normal; only a failed resolution of an explicitly selected service is an
//! error.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use mdns_sd::{ServiceDaemon, ServiceEvent};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::{ClientError, Result};

/// DNS-SD service type announced by TVs speaking remote protocol v2.
pub const SERVICE_TYPE: &str = "_androidtvremote2._tcp.local.";

/// Bound on resolving a selected service to an address.
pub const RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

/// A discovered, resolved TV endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEndpoint {
    /// Full mDNS service instance name.
    pub service_name: String,
    /// Advertised hostname, without the trailing dot.
    pub host: String,
    /// Resolved IPv4 address.
    pub ip: Ipv4Addr,
}

/// A running mDNS browser.
pub struct Discovery {
    daemon: ServiceDaemon,
    devices_rx: watch::Receiver<Vec<DeviceEndpoint>>,
}

impl Discovery {
    /// Start browsing. Events are consumed by a background task until the
    /// daemon is shut down.
    pub fn start() -> Result<Self> {
        let daemon = ServiceDaemon::new().map_err(|e| ClientError::Discovery(e.to_string()))?;
        let receiver = daemon
            .browse(SERVICE_TYPE)
            .map_err(|e| ClientError::Discovery(e.to_string()))?;

        let (devices_tx, devices_rx) = watch::channel(Vec::new());

        tokio::spawn(async move {
            let mut devices: HashMap<String, DeviceEndpoint> = HashMap::new();
            while let Ok(event) = receiver.recv_async().await {
                match event {
                    ServiceEvent::ServiceResolved(info) => {
                        let ipv4 = info.get_addresses().iter().find_map(|addr| match addr {
                            IpAddr::V4(v4) => Some(*v4),
                            IpAddr::V6(_) => None,
                        });
                        let Some(ip) = ipv4 else {
                            debug!(service = %info.get_fullname(), "resolved without an IPv4 address");
                            continue;
                        };
                        info!(service = %info.get_fullname(), %ip, "found TV");
                        devices.insert(
                            info.get_fullname().to_string(),
                            DeviceEndpoint {
                                service_name: info.get_fullname().to_string(),
                                host: info.get_hostname().trim_end_matches('.').to_string(),
                                ip,
                            },
                        );
                        let _ = devices_tx.send(sorted(&devices));
                    }
                    ServiceEvent::ServiceRemoved(_, fullname) => {
                        debug!(service = %fullname, "TV gone");
                        if devices.remove(&fullname).is_some() {
                            let _ = devices_tx.send(sorted(&devices));
                        }
                    }
                    _ => {}
                }
            }
            debug!("mDNS browser stopped");
        });

        Ok(Self { daemon, devices_rx })
    }

    /// Subscribe to the resolved-device list.
    pub fn devices(&self) -> watch::Receiver<Vec<DeviceEndpoint>> {
        self.devices_rx.clone()
    }

    /// Resolve a service instance name to an endpoint.
    ///
    /// Waits up to [`RESOLVE_TIMEOUT`] for the browser to resolve the name if
    /// it has not already.
    pub async fn resolve(&self, service_name: &str) -> Result<DeviceEndpoint> {
        let mut rx = self.devices_rx.clone();
        let deadline = tokio::time::Instant::now() + RESOLVE_TIMEOUT;
        loop {
            let found = rx
                .borrow()
                .iter()
                .find(|d| d.service_name == service_name)
                .cloned();
            if let Some(endpoint) = found {
                return Ok(endpoint);
            }
            match tokio::time::timeout_at(deadline, rx.changed()).await {
                Ok(Ok(())) => continue,
                Ok(Err(_)) => return Err(ClientError::Discovery("browser stopped".into())),
                Err(_) => return Err(ClientError::ResolveTimeout(service_name.to_string())),
            }
        }
    }

    /// Stop the browser and the mDNS daemon.
    pub fn shutdown(&self) {
        let _ = self.daemon.shutdown();
    }
}

fn sorted(devices: &HashMap<String, DeviceEndpoint>) -> Vec<DeviceEndpoint> {
    let mut list: Vec<DeviceEndpoint> = devices.values().cloned().collect();
    list.sort_by(|a, b| a.service_name.cmp(&b.service_name));
    list
}
