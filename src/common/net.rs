//! Listen address parsing

use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

use crate::config::DEFAULT_PORT;

use super::error::{DetectorError, Result};

/// Whether `addr` ends in an explicit `:port`
fn has_port(addr: &str) -> bool {
    addr.rsplit_once(':')
        .map_or(false, |(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
}

/// Parse a listen address
///
/// Accepts `ip:port`, `host:port`, a bare IP or a bare host name. A missing
/// port defaults to [`DEFAULT_PORT`]. Names resolve to their first address.
pub fn parse_socket_addr(addr: &str) -> Result<SocketAddr> {
    let addr = addr.trim();
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        return Ok(socket_addr);
    }
    if let Ok(ip) = addr.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }
    if addr.is_empty() {
        return Err(DetectorError::Config("Empty listen address".to_string()));
    }

    let target = if has_port(addr) {
        addr.to_string()
    } else {
        format!("{}:{}", addr, DEFAULT_PORT)
    };
    target
        .to_socket_addrs()
        .map_err(|e| DetectorError::Config(format!("Failed to resolve address {}: {}", addr, e)))?
        .next()
        .ok_or_else(|| DetectorError::Config(format!("No address found for {}", addr)))
}
