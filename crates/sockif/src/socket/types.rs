//! Address family, socket type and creation flag types.
//!
//! Values follow the Linux ABI (`libc` constants), which is also what the
//! usrsock daemon speaks on the wire.

use std::fmt;
use std::str::FromStr;

use super::error::{Error, Result};

/// Bits of the `type` argument that carry the transport style.
pub const SOCK_TYPE_MASK: i32 = 0x0f;

/// Creation flag: non-blocking endpoint.
pub const SOCK_NONBLOCK: i32 = libc::SOCK_NONBLOCK;

/// Creation flag: close the descriptor on exec.
pub const SOCK_CLOEXEC: i32 = libc::SOCK_CLOEXEC;

/// Address family identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Domain(pub i32);

impl Domain {
    pub const UNSPEC: Self = Self(libc::AF_UNSPEC);
    pub const LOCAL: Self = Self(libc::AF_LOCAL);
    pub const INET: Self = Self(libc::AF_INET);
    pub const INET6: Self = Self(libc::AF_INET6);
    pub const NETLINK: Self = Self(libc::AF_NETLINK);
    pub const PACKET: Self = Self(libc::AF_PACKET);
    pub const CAN: Self = Self(libc::AF_CAN);
    pub const BLUETOOTH: Self = Self(libc::AF_BLUETOOTH);

    /// Get the raw value.
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Get the conventional short name, if this is a known family.
    pub fn name(self) -> Option<&'static str> {
        match self {
            Self::UNSPEC => Some("unspec"),
            Self::LOCAL => Some("local"),
            Self::INET => Some("inet"),
            Self::INET6 => Some("inet6"),
            Self::NETLINK => Some("netlink"),
            Self::PACKET => Some("packet"),
            Self::CAN => Some("can"),
            Self::BLUETOOTH => Some("bluetooth"),
            _ => None,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "af{}", self.0),
        }
    }
}

impl FromStr for Domain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let domain = match s.to_ascii_lowercase().as_str() {
            "unspec" => Self::UNSPEC,
            "local" | "unix" => Self::LOCAL,
            "inet" | "ipv4" => Self::INET,
            "inet6" | "ipv6" => Self::INET6,
            "netlink" => Self::NETLINK,
            "packet" => Self::PACKET,
            "can" => Self::CAN,
            "bluetooth" => Self::BLUETOOTH,
            other => Self(parse_int(other).ok_or_else(|| {
                Error::InvalidArgument(format!("unknown address family '{}'", s))
            })?),
        };
        Ok(domain)
    }
}

/// Transport style, with creation flags already masked off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SockType(pub i32);

impl SockType {
    pub const STREAM: Self = Self(libc::SOCK_STREAM);
    pub const DGRAM: Self = Self(libc::SOCK_DGRAM);
    pub const RAW: Self = Self(libc::SOCK_RAW);
    pub const RDM: Self = Self(libc::SOCK_RDM);
    pub const SEQPACKET: Self = Self(libc::SOCK_SEQPACKET);
    pub const PACKET: Self = Self(10);

    /// Get the raw value.
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Get the conventional short name, if this is a known type.
    pub fn name(self) -> Option<&'static str> {
        match self {
            Self::STREAM => Some("stream"),
            Self::DGRAM => Some("dgram"),
            Self::RAW => Some("raw"),
            Self::RDM => Some("rdm"),
            Self::SEQPACKET => Some("seqpacket"),
            Self::PACKET => Some("packet"),
            _ => None,
        }
    }
}

impl fmt::Display for SockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "type{}", self.0),
        }
    }
}

impl FromStr for SockType {
    type Err = Error;

    /// Parse a type name or a raw integer.
    ///
    /// Raw integers are returned as-is, flag bits included; masking happens
    /// in [`CreateRequest::new`].
    fn from_str(s: &str) -> Result<Self> {
        let ty = match s.to_ascii_lowercase().as_str() {
            "stream" => Self::STREAM,
            "dgram" | "datagram" => Self::DGRAM,
            "raw" => Self::RAW,
            "rdm" => Self::RDM,
            "seqpacket" => Self::SEQPACKET,
            "packet" => Self::PACKET,
            other => Self(parse_int(other).ok_or_else(|| {
                Error::InvalidArgument(format!("unknown socket type '{}'", s))
            })?),
        };
        Ok(ty)
    }
}

bitflags::bitflags! {
    /// Flags a caller may pass alongside the socket type at creation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SockFlags: i32 {
        /// Request non-blocking semantics.
        const NONBLOCK = SOCK_NONBLOCK;
        /// Close the descriptor on exec.
        const CLOEXEC = SOCK_CLOEXEC;
    }
}

/// A validated creation request.
///
/// Construction is the fail-fast precondition check: nothing downstream
/// ever sees a type with unknown bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateRequest {
    /// Requested address family.
    pub domain: Domain,
    /// Transport style with flags masked off.
    pub ty: SockType,
    /// Protocol selector within the family.
    pub protocol: i32,
    /// Creation flags from both the type word and the flags word.
    pub flags: SockFlags,
}

impl CreateRequest {
    /// Validate and split the raw creation arguments.
    ///
    /// `ty` may carry `SOCK_NONBLOCK` and `SOCK_CLOEXEC` in addition to the
    /// type bits; `flags` may carry only those two flags. Any other bit in
    /// either word is rejected with [`Error::InvalidArgument`].
    pub fn new(domain: i32, ty: i32, protocol: i32, flags: i32) -> Result<Self> {
        let allowed = SOCK_TYPE_MASK | SockFlags::all().bits();
        if ty & !allowed != 0 {
            return Err(Error::InvalidArgument(format!(
                "unknown bits {:#x} in socket type",
                ty & !allowed
            )));
        }

        let extra = SockFlags::from_bits(flags).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "unknown bits {:#x} in creation flags",
                flags & !SockFlags::all().bits()
            ))
        })?;

        Ok(Self {
            domain: Domain(domain),
            ty: SockType(ty & SOCK_TYPE_MASK),
            protocol,
            flags: SockFlags::from_bits_truncate(ty) | extra,
        })
    }

    /// Get the parameters handed to a backend's `setup`.
    pub fn params(&self) -> SocketParams {
        SocketParams {
            domain: self.domain,
            ty: self.ty,
            protocol: self.protocol,
        }
    }
}

/// What a backend sees when asked to set up an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketParams {
    /// Requested address family.
    pub domain: Domain,
    /// Transport style with flags masked off.
    pub ty: SockType,
    /// Protocol selector within the family.
    pub protocol: i32,
}

/// Parse a decimal or `0x`-prefixed hexadecimal integer.
fn parse_int(s: &str) -> Option<i32> {
    match s.strip_prefix("0x") {
        Some(hex) => i32::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}
