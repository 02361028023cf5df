//! Native AF_INET / AF_INET6 backend.
//!
//! Resolves the transport protocol for a request:
//!
//! | type        | accepted protocols                 | resolved          |
//! |-------------|------------------------------------|-------------------|
//! | `STREAM`    | 0, TCP                             | TCP               |
//! | `DGRAM`     | 0, UDP, ICMP (v4), ICMPv6 (v6)     | UDP or ICMP(v6)   |
//! | `RAW`       | any non-zero (needs `allow_raw`)   | as requested      |
//!
//! Everything else is `EPROTONOSUPPORT`.

use crate::socket::{
    Connection, Domain, Error, InetConfig, Result, SockType, SocketInterface, SocketParams,
};

use super::pool::{ConnPool, PoolSlot};

/// Transport protocol resolved for an inet endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InetProto {
    /// TCP stream.
    Tcp,
    /// UDP datagram.
    Udp,
    /// ICMP / ICMPv6 datagram (ping socket).
    Icmp,
    /// Raw IP with the given protocol number.
    Raw(i32),
}

impl InetProto {
    /// Get the IP protocol number.
    pub fn number(self, domain: Domain) -> i32 {
        match self {
            Self::Tcp => libc::IPPROTO_TCP,
            Self::Udp => libc::IPPROTO_UDP,
            Self::Icmp if domain == Domain::INET6 => libc::IPPROTO_ICMPV6,
            Self::Icmp => libc::IPPROTO_ICMP,
            Self::Raw(p) => p,
        }
    }
}

/// Backend-private state of an inet endpoint.
#[derive(Debug)]
pub struct InetConn {
    /// AF_INET or AF_INET6.
    pub domain: Domain,
    /// Resolved transport protocol.
    pub proto: InetProto,
    _slot: PoolSlot,
}

/// The native inet backend.
#[derive(Debug)]
pub struct InetBackend {
    allow_raw: bool,
    pool: ConnPool,
}

impl InetBackend {
    /// Create the backend from its configuration.
    pub fn new(config: &InetConfig) -> Self {
        Self {
            allow_raw: config.allow_raw,
            pool: ConnPool::new(config.max_conns),
        }
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &ConnPool {
        &self.pool
    }

    fn resolve(&self, params: &SocketParams) -> Result<InetProto> {
        let icmp = if params.domain == Domain::INET6 {
            libc::IPPROTO_ICMPV6
        } else {
            libc::IPPROTO_ICMP
        };

        let proto = match (params.ty, params.protocol) {
            (SockType::STREAM, 0) => InetProto::Tcp,
            (SockType::STREAM, p) if p == libc::IPPROTO_TCP => InetProto::Tcp,
            (SockType::DGRAM, 0) => InetProto::Udp,
            (SockType::DGRAM, p) if p == libc::IPPROTO_UDP => InetProto::Udp,
            (SockType::DGRAM, p) if p == icmp => InetProto::Icmp,
            (SockType::RAW, p) if p != 0 => {
                if !self.allow_raw {
                    return Err(Error::PermissionDenied);
                }
                InetProto::Raw(p)
            }
            _ => {
                return Err(Error::ProtocolNotSupported {
                    ty: params.ty.raw(),
                    protocol: params.protocol,
                });
            }
        };
        Ok(proto)
    }
}

impl SocketInterface for InetBackend {
    fn name(&self) -> &'static str {
        "inet"
    }

    fn setup(&self, params: &SocketParams) -> Result<Connection> {
        if params.domain != Domain::INET && params.domain != Domain::INET6 {
            return Err(Error::AddressFamilyNotSupported {
                domain: params.domain.raw(),
            });
        }

        let proto = self.resolve(params)?;
        let slot = self.pool.try_acquire()?;

        Ok(Connection::new(InetConn {
            domain: params.domain,
            proto,
            _slot: slot,
        }))
    }
}
