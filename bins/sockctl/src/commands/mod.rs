//! Command implementations for sockctl.

pub mod create;
pub mod families;
