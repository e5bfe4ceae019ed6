use std::{
    net::{SocketAddr, ToSocketAddrs},
    time::Duration,
};

pub mod sync;

/// Message handed from a sink to its forwarder.
pub(crate) enum Message {
    /// One or more formatted StatsD lines that must be sent in the same payload.
    Record(Vec<u8>),

    /// Send everything queued so far, then stop.
    Shutdown,
}

/// Resolved address of the StatsD server.
#[derive(Clone, Debug)]
pub(crate) struct RemoteAddr(Vec<SocketAddr>);

impl RemoteAddr {
    /// Resolves the given address.
    ///
    /// # Errors
    ///
    /// If the address cannot be resolved, or resolves to no addresses at all, an error describing why is returned.
    pub fn resolve<A>(addr: A) -> Result<Self, String>
    where
        A: ToSocketAddrs,
    {
        let addrs = addr.to_socket_addrs().map_err(|e| e.to_string())?.collect::<Vec<_>>();
        if addrs.is_empty() {
            return Err("address did not resolve to any socket addresses".to_string());
        }

        Ok(RemoteAddr(addrs))
    }

    /// Returns the resolved socket addresses.
    pub fn addrs(&self) -> &[SocketAddr] {
        &self.0
    }

    /// Returns the transport ID for the remote address.
    pub const fn transport_id(&self) -> &'static str {
        "udp"
    }
}

impl From<SocketAddr> for RemoteAddr {
    fn from(addr: SocketAddr) -> Self {
        RemoteAddr(vec![addr])
    }
}

impl TryFrom<&str> for RemoteAddr {
    type Error = String;

    fn try_from(addr: &str) -> Result<Self, Self::Error> {
        RemoteAddr::resolve(addr)
    }
}

/// Forwarder configuration.
#[derive(Clone, Debug)]
pub(crate) struct ForwarderConfiguration {
    pub remote_addr: RemoteAddr,
    pub max_payload_len: usize,
    pub write_timeout: Duration,
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use super::RemoteAddr;

    #[test]
    fn resolves_socket_addresses() {
        let addr = RemoteAddr::try_from("127.0.0.1:8125").expect("should resolve");
        assert_eq!(addr.addrs(), [SocketAddr::from(([127, 0, 0, 1], 8125))]);

        let addr = RemoteAddr::resolve(("::1", 8125)).expect("should resolve");
        assert!(addr.addrs()[0].is_ipv6());
    }

    #[test]
    fn rejects_invalid_addresses() {
        assert!(RemoteAddr::try_from("127.0.0.1").is_err());
        assert!(RemoteAddr::try_from("127.0.0.1:notaport").is_err());
    }
}
