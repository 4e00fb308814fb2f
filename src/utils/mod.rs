//! Shared utilities.

pub mod pidfile;
