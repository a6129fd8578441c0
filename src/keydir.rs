//! Uniqueness of {key material location, policy} bindings across zones
//! (§4.1 "Key-directory uniqueness", component C9).

use camino::Utf8Path;
use isccfg_api::DnssecPolicyRef;
use isccfg_cfg::token::Location;
use isccfg_cfg::SymbolTable;

use crate::error::{Diagnostic, Diagnostics, ErrorKind};

/// Tracks, for every `<origin>/<effective key directory>` combination,
/// which policy claimed it first. A conflict arises only when the same
/// location is claimed under two *different* policies.
#[derive(Default)]
pub struct KeyDirectoryRegistry {
    table: SymbolTable<Box<str>, DnssecPolicyRef>,
}

impl KeyDirectoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `origin`'s effective key directory (explicit `directory`
    /// clause, falling back to the global `key-directory`, or "." when
    /// neither is set) under `policy`.
    pub fn register(
        &mut self,
        origin: &isccfg_api::StoredName,
        directory: Option<&Utf8Path>,
        policy: &DnssecPolicyRef,
        location: &Location,
        diags: &mut Diagnostics,
    ) {
        let dir = directory.map(|d| d.as_str()).unwrap_or(".");
        let key: Box<str> = format!("{origin}/{dir}").into();
        if let Err(prior) = self
            .table
            .define_or_merge(key, policy.clone(), location.clone(), |existing, new| existing == new)
        {
            diags.push(
                Diagnostic::error(
                    ErrorKind::SemanticConflict,
                    format!(
                        "key material for '{origin}' in '{dir}' is already claimed by a different dnssec-policy (first defined at {})",
                        prior.location
                    ),
                )
                .at(location.clone()),
            );
        }
    }
}
