//! `IPKeyList`: the parallel address/source/key/TLS vectors used by
//! `primaries`, `parental-agents`, and `also-notify`.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// One entry of an `IpKeyList`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IpKeyEntry {
    pub address: SocketAddr,
    pub source_address: Option<SocketAddr>,
    pub tsig_key: Option<Box<str>>,
    pub tls_profile: Option<Box<str>>,
}

/// A list of remote servers plus how to reach and authenticate each one.
///
/// Modeled as a `Vec` of records rather than four separate parallel
/// vectors: the data model is the same (each entry's fields line up),
/// this representation just can't go out of sync by construction.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IpKeyList {
    pub entries: Vec<IpKeyEntry>,
}

impl IpKeyList {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
