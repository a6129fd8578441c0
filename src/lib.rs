//! Semantic configuration validation and zone assembly for a BIND-style
//! authoritative DNS server.
//!
//! This crate turns a parsed `named.conf` into validated, live zone
//! objects - arguably the hardest engineering problem in bringing such a
//! server up or reconfiguring it. It does not itself serve DNS traffic;
//! that's deliberately an external collaborator's concern.

pub mod assemble;
pub mod config;
pub mod control;
pub mod error;
pub mod keydir;
pub mod log;
pub mod reuse;
pub mod trust_anchor_check;
pub mod validate;
pub mod zonefile_registry;

pub use error::{CheckStatus, Diagnostic, Diagnostics, ErrorKind, ExitError};
