//! Address resolution
//!
//! Resolves the server's own listening endpoint and the data endpoint a
//! client advertises. Both modes only yield IPv4 stream endpoints.

use log::debug;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::lookup_host;

use crate::error::ResolutionError;
use crate::protocol::Token;
use crate::utils::validation::is_valid_host;

/// Resolves `bind_address:port` into bindable IPv4 endpoints.
///
/// An empty address, `*` or `0.0.0.0` means any local address.
pub async fn resolve_bind(bind_address: &str, port: u16) -> Result<Vec<SocketAddr>, ResolutionError> {
    match bind_address.trim() {
        "" | "*" | "0.0.0.0" => Ok(vec![SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port)]),
        host => resolve_ipv4(host, port).await,
    }
}

/// Resolves an explicit `host:port` into connectable IPv4 endpoints.
pub async fn resolve_peer(host: &str, port: u16) -> Result<Vec<SocketAddr>, ResolutionError> {
    if !is_valid_host(host) {
        return Err(ResolutionError::InvalidHost(host.to_string()));
    }
    resolve_ipv4(host, port).await
}

async fn resolve_ipv4(host: &str, port: u16) -> Result<Vec<SocketAddr>, ResolutionError> {
    let target = format!("{}:{}", host, port);
    let addrs = lookup_host((host, port))
        .await
        .map_err(|source| ResolutionError::Lookup {
            target: target.clone(),
            source,
        })?;

    let v4: Vec<SocketAddr> = addrs.filter(SocketAddr::is_ipv4).collect();
    if v4.is_empty() {
        return Err(ResolutionError::NoIpv4Address(target));
    }

    debug!("Resolved {} to {:?}", target, v4);
    Ok(v4)
}

/// Parses an advertised data port, rejecting 0 and anything below `min_port`.
pub fn parse_port(raw: &str, min_port: u16) -> Result<u16, ResolutionError> {
    let port: u16 = raw
        .trim()
        .parse()
        .map_err(|_| ResolutionError::InvalidPort(raw.to_string()))?;

    if port == 0 || port < min_port {
        return Err(ResolutionError::PortOutOfRange { port, min: min_port });
    }
    Ok(port)
}

/// Where the server should open its data connection, as advertised by the
/// client. Both parts come from untrusted input and are validated here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTarget {
    host: String,
    port: u16,
}

impl DataTarget {
    pub fn parse(host: &Token, port: &Token, min_port: u16) -> Result<Self, ResolutionError> {
        let host = host.as_str().trim();
        if !is_valid_host(host) {
            return Err(ResolutionError::InvalidHost(host.to_string()));
        }
        let port = parse_port(port.as_str(), min_port)?;

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    /// Resolves the target. With `restrict_to` set, only endpoints on that
    /// IP are kept, so a client cannot point the server at a third host.
    pub async fn resolve(&self, restrict_to: Option<IpAddr>) -> Result<Vec<SocketAddr>, ResolutionError> {
        let endpoints = resolve_peer(&self.host, self.port).await?;

        let Some(expected) = restrict_to else {
            return Ok(endpoints);
        };
        let expected = canonical_ip(expected);

        let allowed: Vec<SocketAddr> = endpoints
            .into_iter()
            .filter(|addr| canonical_ip(addr.ip()) == expected)
            .collect();
        if allowed.is_empty() {
            return Err(ResolutionError::PeerMismatch {
                expected,
                host: self.host.clone(),
            });
        }
        Ok(allowed)
    }
}

impl fmt::Display for DataTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// A v4 peer accepted on a dual-stack socket shows up as ::ffff:a.b.c.d
fn canonical_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
        v4 => v4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Field;

    fn token(field: Field, value: &str) -> Token {
        Token::new(field, value).unwrap()
    }

    #[test]
    fn port_must_be_numeric_and_in_range() {
        assert_eq!(parse_port("30020", 1024).unwrap(), 30020);
        assert!(matches!(parse_port("http", 1024), Err(ResolutionError::InvalidPort(_))));
        assert!(matches!(parse_port("70000", 1024), Err(ResolutionError::InvalidPort(_))));
        assert!(matches!(
            parse_port("80", 1024),
            Err(ResolutionError::PortOutOfRange { port: 80, min: 1024 })
        ));
        assert!(matches!(parse_port("0", 0), Err(ResolutionError::PortOutOfRange { .. })));
    }

    #[test]
    fn data_target_rejects_malformed_hosts() {
        let port = token(Field::DataPort, "30020");
        for bad in ["", "bad host", "evil\tname", "a/b"] {
            let host = token(Field::Host, bad);
            assert!(
                matches!(
                    DataTarget::parse(&host, &port, 1024),
                    Err(ResolutionError::InvalidHost(_))
                ),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[tokio::test]
    async fn bind_mode_uses_any_address() {
        let addrs = resolve_bind("0.0.0.0", 4000).await.unwrap();
        assert_eq!(addrs, vec!["0.0.0.0:4000".parse::<SocketAddr>().unwrap()]);
    }

    #[tokio::test]
    async fn peer_mode_resolves_ipv4_literal() {
        let target = DataTarget::parse(&token(Field::Host, "127.0.0.1"), &token(Field::DataPort, "30020"), 1024)
            .unwrap();
        let addrs = target.resolve(None).await.unwrap();
        assert_eq!(addrs, vec!["127.0.0.1:30020".parse::<SocketAddr>().unwrap()]);
    }

    #[tokio::test]
    async fn restricted_target_must_match_control_peer() {
        let target = DataTarget::parse(&token(Field::Host, "127.0.0.2"), &token(Field::DataPort, "30020"), 1024)
            .unwrap();
        let peer: IpAddr = "127.0.0.1".parse().unwrap();

        let err = target.resolve(Some(peer)).await.unwrap_err();
        assert!(matches!(err, ResolutionError::PeerMismatch { .. }));
    }
}
