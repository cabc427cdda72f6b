//! Same-machine detection for WOPI hosts.

use std::net::IpAddr;

use tracing::{info, warn};

/// Resolve `host` and report whether it is one of this machine's interface
/// addresses. Resolution or enumeration failures count as "not local".
pub async fn is_localhost(host: &str) -> bool {
    let Some(target) = resolve(host).await else {
        return false;
    };

    let interfaces = match if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces,
        Err(e) => {
            warn!("Cannot list network interfaces: {}", e);
            return false;
        }
    };

    if interfaces.iter().any(|iface| iface.ip() == target) {
        info!(
            "WOPI host is on the same host as the WOPI client: \"{}\". Connection is allowed.",
            target
        );
        return true;
    }

    info!(
        "WOPI host is not on the same host as the WOPI client: \"{}\". Connection is not allowed.",
        target
    );
    false
}

/// First address `host` resolves to, falling back to parsing it as an IP literal.
async fn resolve(host: &str) -> Option<IpAddr> {
    let bare = strip_scope(host.trim_start_matches('[').trim_end_matches(']'));

    match tokio::net::lookup_host((bare, 0)).await {
        Ok(mut addrs) => {
            if let Some(addr) = addrs.next() {
                return Some(addr.ip());
            }
            warn!("DNS lookup of \"{}\" returned no address", host);
        }
        Err(e) => warn!("DNS lookup of \"{}\" failed: {}", host, e),
    }

    match bare.parse::<IpAddr>() {
        Ok(ip) => Some(ip),
        Err(e) => {
            warn!("\"{}\" is not an IP address: {}", host, e);
            None
        }
    }
}

/// Drop an IPv6 zone suffix (`fe80::1%eth0` -> `fe80::1`).
fn strip_scope(address: &str) -> &str {
    address.split('%').next().unwrap_or(address)
}
