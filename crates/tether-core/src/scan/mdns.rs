//! mDNS discovery of devices advertising a local shell.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use tracing::debug;

use super::{DeviceCandidate, Discovery};

/// Service type devices advertise their shell under.
pub const SERVICE_TYPE: &str = "_ssh._tcp.local.";

/// Browses the local network until the timeout elapses. Every resolved
/// advertisement becomes one candidate; the liveness gate downstream
/// separates fleet devices from ordinary SSH hosts.
pub struct MdnsDiscovery;

#[async_trait]
impl Discovery for MdnsDiscovery {
    async fn discover(&self, timeout: Duration) -> anyhow::Result<Vec<DeviceCandidate>> {
        let daemon = ServiceDaemon::new().context("Failed to start the mDNS daemon")?;
        let receiver = daemon
            .browse(SERVICE_TYPE)
            .context("Failed to browse the local network")?;

        let deadline = Instant::now() + timeout;
        let mut seen: HashSet<String> = HashSet::new();
        let mut candidates = Vec::new();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let event = match tokio::time::timeout(remaining, receiver.recv_async()).await {
                Ok(Ok(event)) => event,
                // Daemon channel closed or deadline hit; either way the
                // pass is over.
                Ok(Err(_)) | Err(_) => break,
            };

            if let ServiceEvent::ServiceResolved(info) = event {
                let Some(address) = pick_address(&info) else {
                    continue;
                };
                if !seen.insert(address.clone()) {
                    debug!("duplicate advertisement for {address}");
                    continue;
                }
                let host = display_host(info.get_hostname());
                debug!("resolved {address} ({})", host.as_deref().unwrap_or("?"));
                candidates.push(DeviceCandidate::new(address, host));
            }
        }

        let _ = daemon.stop_browse(SERVICE_TYPE);
        let _ = daemon.shutdown();

        Ok(candidates)
    }
}

/// Prefer an IPv4 address; devices advertise both families and the probe
/// ports are reachable on either, but IPv4 reads better in prompts.
fn pick_address(info: &ServiceInfo) -> Option<String> {
    let addresses = info.get_addresses();
    addresses
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addresses.iter().next())
        .map(|ip| ip.to_string())
}

fn display_host(hostname: &str) -> Option<String> {
    let trimmed = hostname.trim_end_matches('.').trim_end_matches(".local");
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
