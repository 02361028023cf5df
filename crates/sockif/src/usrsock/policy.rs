//! Configurable daemon handler.

use std::collections::{BTreeSet, HashMap};

use crate::socket::{Domain, Error, PolicyAction, PolicyConfig, Result};

use super::daemon::DaemonHandler;

/// A [`DaemonHandler`] answering by address family.
///
/// Accepted sockets get increasing ids starting at 0; `close` of an id the
/// handler never handed out fails with `EBADF`.
#[derive(Debug, Clone, Default)]
pub struct PolicyHandler {
    default: PolicyAction,
    families: HashMap<Domain, PolicyAction>,
    next_id: i32,
    open: BTreeSet<i32>,
}

impl PolicyHandler {
    /// Create a handler with the same answer for every family.
    pub fn new(default: PolicyAction) -> Self {
        Self {
            default,
            ..Self::default()
        }
    }

    /// Build a handler from configuration.
    ///
    /// Family keys are names (`inet`, `local`, ...) or numbers.
    pub fn from_config(config: &PolicyConfig) -> Result<Self> {
        check_action(config.default)?;
        let mut handler = Self::new(config.default);
        for (key, action) in &config.families {
            check_action(*action)?;
            let domain: Domain = key.parse().map_err(|_| {
                Error::InvalidConfig(format!("usrsock.policy: unknown family '{}'", key))
            })?;
            handler.families.insert(domain, *action);
        }
        Ok(handler)
    }

    /// Override the answer for one family.
    pub fn family(mut self, domain: Domain, action: PolicyAction) -> Self {
        self.families.insert(domain, action);
        self
    }

    /// Get the answer for a family.
    pub fn action_for(&self, domain: Domain) -> PolicyAction {
        self.families.get(&domain).copied().unwrap_or(self.default)
    }

    /// Get the number of accepted sockets not yet closed.
    pub fn open_sockets(&self) -> usize {
        self.open.len()
    }

    /// Hand out the next id not currently open.
    fn allocate_id(&mut self) -> Option<i32> {
        if self.open.len() > i32::MAX as usize {
            return None;
        }
        loop {
            let id = self.next_id;
            self.next_id = self.next_id.wrapping_add(1) & i32::MAX;
            if self.open.insert(id) {
                return Some(id);
            }
        }
    }
}

fn check_action(action: PolicyAction) -> Result<()> {
    match action {
        PolicyAction::Errno(errno) if errno <= 0 => Err(Error::InvalidConfig(format!(
            "usrsock.policy: errno must be positive, got {}",
            errno
        ))),
        _ => Ok(()),
    }
}

impl DaemonHandler for PolicyHandler {
    fn socket(&mut self, domain: i32, _ty: i32, _protocol: i32) -> i32 {
        match self.action_for(Domain(domain)) {
            PolicyAction::Accept => match self.allocate_id() {
                Some(id) => id,
                None => -libc::ENFILE,
            },
            PolicyAction::Defer => -libc::ENOSYS,
            PolicyAction::Decline => -libc::EOPNOTSUPP,
            PolicyAction::Down => -libc::ENETDOWN,
            PolicyAction::Errno(errno) if errno > 0 => -errno,
            PolicyAction::Errno(_) => -libc::EINVAL,
        }
    }

    fn close(&mut self, usockid: i32) -> i32 {
        if self.open.remove(&usockid) {
            0
        } else {
            -libc::EBADF
        }
    }
}
