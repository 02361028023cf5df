//! usrsock frame layout.
//!
//! Frames are fixed-layout, host-endian structs. A request starts with a
//! [`ReqHeader`]; the daemon answers each request with one [`AckMsg`]
//! carrying the same transaction id.

use bytes::Bytes;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::socket::{Error, Result};

/// Request id: create a socket.
pub const REQ_SOCKET: u8 = 0;
/// Request id: close a socket.
pub const REQ_CLOSE: u8 = 1;

/// Message id: acknowledgement.
pub const MSG_ACK: u8 = 0;

/// Common request header.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct ReqHeader {
    /// Request id (`REQ_*`).
    pub reqid: u8,
    pub reserved: [u8; 3],
    /// Transaction id, echoed in the ack.
    pub xid: u32,
}

impl ReqHeader {
    /// Parse a header from the front of a frame.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        read_prefix(data)
    }
}

/// `SOCKET` request body.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct SocketReq {
    pub head: ReqHeader,
    pub domain: i32,
    pub ty: i32,
    pub protocol: i32,
}

/// `CLOSE` request body.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct CloseReq {
    pub head: ReqHeader,
    pub usockid: i32,
}

/// Acknowledgement frame.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct AckMsg {
    /// Message id (`MSG_ACK`).
    pub msgid: u8,
    pub flags: u8,
    pub reserved: [u8; 2],
    /// Transaction id of the request being answered.
    pub xid: u32,
    /// Daemon socket id (>= 0) or negated errno.
    pub result: i32,
}

/// Copy a `T` out of the front of `data`.
///
/// Frames arrive in `Bytes` buffers with no alignment guarantee, so this
/// reads by value instead of borrowing.
fn read_prefix<T: FromBytes>(data: &[u8]) -> Result<T> {
    T::read_from_prefix(data)
        .map(|(v, _)| v)
        .map_err(|_| Error::Truncated {
            expected: std::mem::size_of::<T>(),
            actual: data.len(),
        })
}

/// A decoded daemon request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Create a socket.
    Socket {
        xid: u32,
        domain: i32,
        ty: i32,
        protocol: i32,
    },
    /// Close a daemon socket.
    Close { xid: u32, usockid: i32 },
}

impl Request {
    /// Get the transaction id.
    pub fn xid(&self) -> u32 {
        match *self {
            Self::Socket { xid, .. } | Self::Close { xid, .. } => xid,
        }
    }

    /// Encode into a frame.
    pub fn encode(&self) -> Bytes {
        match *self {
            Self::Socket {
                xid,
                domain,
                ty,
                protocol,
            } => {
                let req = SocketReq {
                    head: header(REQ_SOCKET, xid),
                    domain,
                    ty,
                    protocol,
                };
                Bytes::copy_from_slice(req.as_bytes())
            }
            Self::Close { xid, usockid } => {
                let req = CloseReq {
                    head: header(REQ_CLOSE, xid),
                    usockid,
                };
                Bytes::copy_from_slice(req.as_bytes())
            }
        }
    }

    /// Decode a frame.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let head = ReqHeader::from_bytes(data)?;
        match head.reqid {
            REQ_SOCKET => {
                let req: SocketReq = read_prefix(data)?;
                Ok(Self::Socket {
                    xid: head.xid,
                    domain: req.domain,
                    ty: req.ty,
                    protocol: req.protocol,
                })
            }
            REQ_CLOSE => {
                let req: CloseReq = read_prefix(data)?;
                Ok(Self::Close {
                    xid: head.xid,
                    usockid: req.usockid,
                })
            }
            other => Err(Error::InvalidMessage(format!("unknown request id {}", other))),
        }
    }
}

fn header(reqid: u8, xid: u32) -> ReqHeader {
    ReqHeader {
        reqid,
        reserved: [0; 3],
        xid,
    }
}

/// A decoded acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub xid: u32,
    pub result: i32,
}

impl Ack {
    /// Create an acknowledgement.
    pub fn new(xid: u32, result: i32) -> Self {
        Self { xid, result }
    }

    /// Encode into a frame.
    pub fn encode(&self) -> Bytes {
        let msg = AckMsg {
            msgid: MSG_ACK,
            flags: 0,
            reserved: [0; 2],
            xid: self.xid,
            result: self.result,
        };
        Bytes::copy_from_slice(msg.as_bytes())
    }

    /// Decode a frame.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let msg: AckMsg = read_prefix(data)?;
        if msg.msgid != MSG_ACK {
            return Err(Error::InvalidMessage(format!(
                "expected ack, got message id {}",
                msg.msgid
            )));
        }
        Ok(Self {
            xid: msg.xid,
            result: msg.result,
        })
    }

    /// Check the transaction id and split the result into id or error.
    pub fn into_result(self, xid: u32) -> Result<i32> {
        if self.xid != xid {
            return Err(Error::InvalidMessage(format!(
                "ack for xid {} while waiting for {}",
                self.xid, xid
            )));
        }
        if self.result < 0 {
            return Err(Error::from_errno(self.result));
        }
        Ok(self.result)
    }
}
