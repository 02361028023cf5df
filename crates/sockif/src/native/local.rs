//! Native AF_LOCAL (Unix domain) backend.
//!
//! Supports `SOCK_STREAM` and `SOCK_DGRAM` with protocol 0 only.

use crate::socket::{
    Connection, Domain, Error, LocalConfig, Result, SockType, SocketInterface, SocketParams,
};

use super::pool::{ConnPool, PoolSlot};

/// Backend-private state of a local endpoint.
#[derive(Debug)]
pub struct LocalConn {
    /// `STREAM` or `DGRAM`.
    pub ty: SockType,
    _slot: PoolSlot,
}

/// The native local backend.
#[derive(Debug)]
pub struct LocalBackend {
    pool: ConnPool,
}

impl LocalBackend {
    /// Create the backend from its configuration.
    pub fn new(config: &LocalConfig) -> Self {
        Self {
            pool: ConnPool::new(config.max_conns),
        }
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &ConnPool {
        &self.pool
    }
}

impl SocketInterface for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    fn setup(&self, params: &SocketParams) -> Result<Connection> {
        if params.domain != Domain::LOCAL {
            return Err(Error::AddressFamilyNotSupported {
                domain: params.domain.raw(),
            });
        }

        let supported = matches!(params.ty, SockType::STREAM | SockType::DGRAM);
        if !supported || params.protocol != 0 {
            return Err(Error::ProtocolNotSupported {
                ty: params.ty.raw(),
                protocol: params.protocol,
            });
        }

        let slot = self.pool.try_acquire()?;
        Ok(Connection::new(LocalConn {
            ty: params.ty,
            _slot: slot,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(ty: SockType, protocol: i32) -> SocketParams {
        SocketParams {
            domain: Domain::LOCAL,
            ty,
            protocol,
        }
    }

    #[test]
    fn stream_and_dgram() {
        let local = LocalBackend::new(&LocalConfig::default());
        for ty in [SockType::STREAM, SockType::DGRAM] {
            let conn = local.setup(&params(ty, 0)).unwrap();
            assert_eq!(conn.private::<LocalConn>().unwrap().ty, ty);
        }
        assert_eq!(local.pool().in_use(), 0);
    }

    #[test]
    fn nonzero_protocol_rejected() {
        let local = LocalBackend::new(&LocalConfig::default());
        let err = local.setup(&params(SockType::STREAM, 1)).unwrap_err();
        assert!(matches!(err, Error::ProtocolNotSupported { ty, protocol: 1 } if ty == libc::SOCK_STREAM));
    }

    #[test]
    fn other_types_rejected() {
        let local = LocalBackend::new(&LocalConfig::default());
        for ty in [SockType::RAW, SockType::SEQPACKET] {
            let err = local.setup(&params(ty, 0)).unwrap_err();
            assert_eq!(err.errno(), libc::EPROTONOSUPPORT);
        }
    }

    #[test]
    fn bounded_pool() {
        let local = LocalBackend::new(&LocalConfig {
            max_conns: Some(2),
            ..LocalConfig::default()
        });
        let _a = local.setup(&params(SockType::STREAM, 0)).unwrap();
        let _b = local.setup(&params(SockType::DGRAM, 0)).unwrap();
        let err = local.setup(&params(SockType::STREAM, 0)).unwrap_err();
        assert!(err.is_resource_exhausted());
    }
}
