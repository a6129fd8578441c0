//! DNSSEC trust anchors: static (operator-pinned) and initializing
//! (RFC 5011 bootstrapping) keys and DS records.

use serde::{Deserialize, Serialize};

use crate::StoredName;

/// The four kinds of trust anchor the `trust-anchors` clause accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrustAnchorKind {
    StaticKey,
    InitialKey,
    StaticDs,
    InitialDs,
}

impl TrustAnchorKind {
    pub fn is_static(self) -> bool {
        matches!(self, Self::StaticKey | Self::StaticDs)
    }

    pub fn is_initializing(self) -> bool {
        matches!(self, Self::InitialKey | Self::InitialDs)
    }

    /// Whether this kind's data blob is DNSKEY-shaped (base64, three
    /// integers flags/protocol/algorithm) as opposed to DS-shaped (hex,
    /// three integers keytag/algorithm/digest-type).
    pub fn is_dnskey_form(self) -> bool {
        matches!(self, Self::StaticKey | Self::InitialKey)
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "static-key" => Self::StaticKey,
            "initial-key" => Self::InitialKey,
            "static-ds" => Self::StaticDs,
            "initial-ds" => Self::InitialDs,
            _ => return None,
        })
    }
}

/// A single trust anchor: `"<name>" <kind> <i1> <i2> <i3> "<data>";`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrustAnchor {
    pub owner: StoredName,
    pub kind: TrustAnchorKind,
    /// DNSKEY-form: flags. DS-form: keytag.
    pub i1: u16,
    /// DNSKEY-form: protocol. DS-form: algorithm.
    pub i2: u16,
    /// DNSKEY-form: algorithm. DS-form: digest-type.
    pub i3: u16,
    /// The decoded data blob (base64 for DNSKEY-form, hex for DS-form).
    pub data: Vec<u8>,
}

impl TrustAnchor {
    /// `true` iff this is an RSASHA1 (algorithm 5 or 7) key whose exponent
    /// encoding starts with the classic weak-exponent byte pattern: first
    /// byte `1`, second byte `3`.
    pub fn is_weak_rsa_exponent(&self) -> bool {
        const RSASHA1: u16 = 5;
        const RSASHA1_NSEC3_SHA1: u16 = 7;
        self.kind.is_dnskey_form()
            && matches!(self.i3, RSASHA1 | RSASHA1_NSEC3_SHA1)
            && self.data.first() == Some(&1)
            && self.data.get(1) == Some(&3)
    }
}
