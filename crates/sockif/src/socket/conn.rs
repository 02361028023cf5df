//! Per-endpoint connection state.

use std::any::Any;
use std::fmt;

bitflags::bitflags! {
    /// Flags held in the connection state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ConnFlags: u8 {
        /// Non-blocking semantics requested.
        const NONBLOCK = 0x01;
        /// Backend setup completed; the endpoint may be used.
        const INITD = 0x04;
    }
}

/// Backend-private state plus the flags the socket layer manages.
///
/// A backend's `setup` produces one of these with empty flags; the lifecycle
/// manager applies `NONBLOCK` and `INITD` afterwards, uniformly for every
/// backend.
pub struct Connection {
    flags: ConnFlags,
    private: Box<dyn Any + Send>,
}

impl Connection {
    /// Create connection state wrapping backend-private data.
    pub fn new<T: Any + Send>(private: T) -> Self {
        Self {
            flags: ConnFlags::empty(),
            private: Box::new(private),
        }
    }

    /// Get the current flags.
    pub fn flags(&self) -> ConnFlags {
        self.flags
    }

    /// Check if setup has completed.
    pub fn is_initialized(&self) -> bool {
        self.flags.contains(ConnFlags::INITD)
    }

    /// Borrow the backend-private data, if it has type `T`.
    pub fn private<T: Any>(&self) -> Option<&T> {
        self.private.downcast_ref()
    }

    /// Mutably borrow the backend-private data, if it has type `T`.
    pub fn private_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.private.downcast_mut()
    }

    /// Take the backend-private data out, if it has type `T`.
    ///
    /// Used by backends in `close` to recover their own state.
    pub fn into_private<T: Any>(self) -> Option<T> {
        self.private.downcast().ok().map(|b| *b)
    }

    pub(crate) fn insert_flags(&mut self, flags: ConnFlags) {
        self.flags.insert(flags);
    }

    pub(crate) fn set_flag(&mut self, flag: ConnFlags, value: bool) {
        self.flags.set(flag, value);
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}
