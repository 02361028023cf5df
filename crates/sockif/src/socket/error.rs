//! Error types for socket creation and backend dispatch.

use std::io;

/// Result type for socket layer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while creating or managing an endpoint.
///
/// Backend errors are passed through unchanged by the lifecycle manager,
/// except for the fallback class (see [`Error::is_fallback`]).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed creation flags.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No backend claims the requested address family.
    #[error("address family not supported: {domain}")]
    AddressFamilyNotSupported {
        /// The requested domain.
        domain: i32,
    },

    /// The backend knows the family but rejects the type or protocol.
    #[error("protocol not supported: type {ty}, protocol {protocol}")]
    ProtocolNotSupported {
        /// The masked socket type.
        ty: i32,
        /// The requested protocol.
        protocol: i32,
    },

    /// Creating this kind of socket is not permitted.
    #[error("permission denied")]
    PermissionDenied,

    /// Process file table overflow.
    #[error("too many open files")]
    TooManyOpenFiles,

    /// The system-wide limit on open files has been reached.
    #[error("too many open files in system")]
    SystemFileLimit,

    /// Insufficient memory or buffer space for the connection state.
    #[error("out of memory")]
    OutOfMemory,

    /// Backend declines: not implemented (fallback class).
    #[error("function not implemented")]
    NotImplemented,

    /// Backend declines: operation not supported (fallback class).
    #[error("operation not supported")]
    NotSupported,

    /// Backend unreachable (fallback class).
    #[error("network is down")]
    NetworkDown,

    /// A backend round trip did not complete in time.
    #[error("timed out")]
    TimedOut,

    /// Any other errno reported by a backend.
    #[error("{message} (errno {errno})")]
    Errno {
        /// The positive errno value.
        errno: i32,
        /// Human-readable error message.
        message: String,
    },

    /// Daemon frame was truncated.
    #[error("message truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Expected frame length.
        expected: usize,
        /// Actual bytes received.
        actual: usize,
    },

    /// Daemon frame had an unexpected id or layout.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON configuration error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration is well-formed but inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create an error from a negated errno value, as returned by backends
    /// and the usrsock daemon (e.g. `-ENOMEM`).
    ///
    /// Positive values are accepted too and treated the same way.
    pub fn from_errno(errno: i32) -> Self {
        let errno = errno.saturating_abs();
        match errno {
            libc::EINVAL => Self::InvalidArgument("rejected by backend".into()),
            libc::EAFNOSUPPORT => Self::AddressFamilyNotSupported { domain: -1 },
            libc::EPROTONOSUPPORT => Self::ProtocolNotSupported {
                ty: -1,
                protocol: -1,
            },
            libc::EACCES => Self::PermissionDenied,
            libc::EMFILE => Self::TooManyOpenFiles,
            libc::ENFILE => Self::SystemFileLimit,
            libc::ENOMEM | libc::ENOBUFS => Self::OutOfMemory,
            libc::ENOSYS => Self::NotImplemented,
            libc::EOPNOTSUPP => Self::NotSupported,
            libc::ENETDOWN => Self::NetworkDown,
            libc::ETIMEDOUT => Self::TimedOut,
            _ => Self::Errno {
                errno,
                message: io::Error::from_raw_os_error(errno).to_string(),
            },
        }
    }

    /// Get the positive errno value for this error.
    ///
    /// Frame and configuration errors have no errno of their own and report
    /// `EIO` and `EINVAL` respectively.
    pub fn errno(&self) -> i32 {
        match self {
            Self::InvalidArgument(_) => libc::EINVAL,
            Self::AddressFamilyNotSupported { .. } => libc::EAFNOSUPPORT,
            Self::ProtocolNotSupported { .. } => libc::EPROTONOSUPPORT,
            Self::PermissionDenied => libc::EACCES,
            Self::TooManyOpenFiles => libc::EMFILE,
            Self::SystemFileLimit => libc::ENFILE,
            Self::OutOfMemory => libc::ENOMEM,
            Self::NotImplemented => libc::ENOSYS,
            Self::NotSupported => libc::EOPNOTSUPP,
            Self::NetworkDown => libc::ENETDOWN,
            Self::TimedOut => libc::ETIMEDOUT,
            Self::Errno { errno, .. } => *errno,
            Self::Truncated { .. } | Self::InvalidMessage(_) | Self::Io(_) => libc::EIO,
            Self::Json(_) | Self::InvalidConfig(_) => libc::EINVAL,
        }
    }

    /// Check if this error means "this backend declines, try another".
    ///
    /// The set is closed: `ENOSYS`, `EOPNOTSUPP` and `ENETDOWN`.
    pub fn is_fallback(&self) -> bool {
        matches!(
            self,
            Self::NotImplemented | Self::NotSupported | Self::NetworkDown
        )
    }

    /// Check if this is a resource exhaustion error (ENOMEM, EMFILE, ENFILE).
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(
            self,
            Self::OutOfMemory | Self::TooManyOpenFiles | Self::SystemFileLimit
        )
    }

    /// Check if this is a permission error.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_errno_known_codes() {
        assert!(matches!(
            Error::from_errno(-libc::ENOMEM),
            Error::OutOfMemory
        ));
        assert!(matches!(
            Error::from_errno(-libc::ENOBUFS),
            Error::OutOfMemory
        ));
        assert!(matches!(
            Error::from_errno(-libc::EMFILE),
            Error::TooManyOpenFiles
        ));
        assert!(matches!(
            Error::from_errno(-libc::ENFILE),
            Error::SystemFileLimit
        ));
        assert!(Error::from_errno(-libc::EACCES).is_permission_denied());
    }

    #[test]
    fn test_from_errno_accepts_positive() {
        assert!(matches!(
            Error::from_errno(libc::ENETDOWN),
            Error::NetworkDown
        ));
    }

    #[test]
    fn test_from_errno_unknown() {
        let err = Error::from_errno(-libc::ECONNREFUSED);
        assert_eq!(err.errno(), libc::ECONNREFUSED);
        assert!(err.to_string().contains("errno"));
        assert!(!err.is_fallback());
    }

    #[test]
    fn test_errno_mapping_is_stable() {
        for errno in [
            libc::EAFNOSUPPORT,
            libc::EPROTONOSUPPORT,
            libc::EACCES,
            libc::EMFILE,
            libc::ENFILE,
            libc::ENOMEM,
            libc::ENOSYS,
            libc::EOPNOTSUPP,
            libc::ENETDOWN,
            libc::ETIMEDOUT,
        ] {
            assert_eq!(Error::from_errno(-errno).errno(), errno);
        }
    }

    #[test]
    fn test_fallback_set_is_closed() {
        assert!(Error::NotImplemented.is_fallback());
        assert!(Error::NotSupported.is_fallback());
        assert!(Error::NetworkDown.is_fallback());

        assert!(!Error::OutOfMemory.is_fallback());
        assert!(!Error::TimedOut.is_fallback());
        assert!(!Error::PermissionDenied.is_fallback());
        assert!(!Error::AddressFamilyNotSupported { domain: 2 }.is_fallback());
        assert!(!Error::from_errno(-libc::ECONNREFUSED).is_fallback());
    }

    #[test]
    fn test_resource_exhausted() {
        assert!(Error::OutOfMemory.is_resource_exhausted());
        assert!(Error::TooManyOpenFiles.is_resource_exhausted());
        assert!(Error::SystemFileLimit.is_resource_exhausted());
        assert!(!Error::NetworkDown.is_resource_exhausted());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::AddressFamilyNotSupported { domain: 1 };
        assert_eq!(err.to_string(), "address family not supported: 1");

        let err = Error::ProtocolNotSupported {
            ty: 1,
            protocol: 17,
        };
        assert_eq!(err.to_string(), "protocol not supported: type 1, protocol 17");

        let err = Error::Truncated {
            expected: 12,
            actual: 4,
        };
        assert_eq!(
            err.to_string(),
            "message truncated: expected 12 bytes, got 4"
        );
    }
}
