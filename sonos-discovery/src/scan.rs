//! Subnet scan fallback
//!
//! When multicast is filtered, probe every host of each local /24 for a
//! Sonos device description. The first host that answers like a Sonos
//! speaker wins and every outstanding probe is aborted.

use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use local_ip_address::list_afinet_netifas;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::device::DeviceDescription;
use crate::error::{DiscoveryError, Result};

/// Per-host HTTP timeout while scanning
const PROBE_TIMEOUT: Duration = Duration::from_millis(800);

const VIRTUAL_INTERFACE_PREFIXES: &[&str] = &[
    "lo", "docker", "veth", "br-", "virbr", "vmnet", "vbox", "tun", "tap", "utun",
];

fn is_virtual_interface(name: &str) -> bool {
    let name = name.to_lowercase();
    VIRTUAL_INTERFACE_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

/// Every other host address in the /24 of each usable local IPv4 interface.
pub fn candidate_hosts() -> Vec<Ipv4Addr> {
    let interfaces = match list_afinet_netifas() {
        Ok(list) => list,
        Err(e) => {
            warn!(error = %e, "Failed to list network interfaces");
            return Vec::new();
        }
    };

    let own: Vec<Ipv4Addr> = interfaces
        .into_iter()
        .filter(|(name, _)| !is_virtual_interface(name))
        .filter_map(|(name, addr)| match addr {
            IpAddr::V4(v4) if !v4.is_loopback() && !v4.is_link_local() => {
                debug!(interface = %name, ip = %v4, "Scanning interface subnet");
                Some(v4)
            }
            _ => None,
        })
        .collect();

    hosts_in_subnets(&own)
}

fn hosts_in_subnets(own: &[Ipv4Addr]) -> Vec<Ipv4Addr> {
    let mut hosts = BTreeSet::new();
    for ip in own {
        let [a, b, c, _] = ip.octets();
        for d in 1..=254u8 {
            hosts.insert(Ipv4Addr::new(a, b, c, d));
        }
    }
    for ip in own {
        hosts.remove(ip);
    }
    hosts.into_iter().collect()
}

/// Fetch the device description of `host` and report whether it is a Sonos
/// speaker.
pub async fn probe(http: &reqwest::Client, host: &str, port: u16) -> bool {
    let url = format!("http://{}:{}/xml/device_description.xml", host, port);
    let response = match http.get(&url).timeout(PROBE_TIMEOUT).send().await {
        Ok(r) if r.status().is_success() => r,
        _ => return false,
    };
    match response.text().await {
        Ok(body) => DeviceDescription::from_xml(&body)
            .map(|desc| desc.is_sonos_device())
            .unwrap_or(false),
        Err(_) => false,
    }
}

/// Probe `hosts` with at most `concurrency` requests in flight and return
/// the first one that answers as a Sonos speaker.
pub async fn scan_hosts(
    http: &reqwest::Client,
    hosts: Vec<String>,
    port: u16,
    concurrency: usize,
) -> Result<String> {
    if hosts.is_empty() {
        return Err(DiscoveryError::Network(
            "no local IPv4 subnet to scan".to_string(),
        ));
    }

    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();
    for host in hosts {
        let http = http.clone();
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await.ok()?;
            if probe(&http, &host, port).await {
                Some(host)
            } else {
                None
            }
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Some(host)) => {
                debug!(%host, "Subnet scan hit");
                tasks.abort_all();
                return Ok(host);
            }
            Ok(None) => {}
            Err(e) if e.is_cancelled() => {}
            Err(e) => debug!(error = %e, "Scan probe task failed"),
        }
    }

    Err(DiscoveryError::NoDevices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosts_in_subnets_excludes_own_addresses() {
        let own = [Ipv4Addr::new(192, 168, 1, 20)];
        let hosts = hosts_in_subnets(&own);
        assert_eq!(hosts.len(), 253);
        assert!(!hosts.contains(&own[0]));
        assert_eq!(hosts.first(), Some(&Ipv4Addr::new(192, 168, 1, 1)));
        assert_eq!(hosts.last(), Some(&Ipv4Addr::new(192, 168, 1, 254)));
    }

    #[test]
    fn test_hosts_in_shared_subnet_are_deduplicated() {
        let own = [Ipv4Addr::new(10, 0, 0, 2), Ipv4Addr::new(10, 0, 0, 3)];
        assert_eq!(hosts_in_subnets(&own).len(), 252);
    }

    #[test]
    fn test_virtual_interfaces_are_skipped() {
        assert!(is_virtual_interface("docker0"));
        assert!(is_virtual_interface("veth12ab"));
        assert!(!is_virtual_interface("en0"));
        assert!(!is_virtual_interface("wlan0"));
    }

    #[tokio::test]
    async fn test_scan_without_hosts_fails() {
        let http = reqwest::Client::new();
        let err = scan_hosts(&http, Vec::new(), 1400, 4).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Network(_)));
    }
}
