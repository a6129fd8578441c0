//! DNSSEC signing configuration attached to a zone: the KASP reference,
//! NSEC3 parameters, and signing intervals.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// A reference to a DNSSEC policy (KASP). The three built-in names are
/// modeled as their own variants so that a hot-path comparison never has
/// to fall back to string equality.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DnssecPolicyRef {
    /// `dnssec-policy none;` - not using KASP at all.
    None,
    /// The built-in `default` policy.
    Default,
    /// The built-in `insecure` policy.
    Insecure,
    /// A user-defined policy name.
    Named(Box<str>),
}

impl DnssecPolicyRef {
    pub const RESERVED: [&'static str; 3] = ["none", "default", "insecure"];

    pub fn parse(name: &str) -> Self {
        match name {
            "none" => Self::None,
            "default" => Self::Default,
            "insecure" => Self::Insecure,
            other => Self::Named(other.into()),
        }
    }

    /// `true` unless this is `none`: i.e. a KASP is in effect.
    pub fn uses_kasp(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// NSEC3 parameters, taken from the KASP when one is in effect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Nsec3Params {
    pub iterations: u16,
    pub salt_length: u8,
    pub opt_out: bool,
}

/// Signature validity, refresh, and jitter, taken from the KASP.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningIntervals {
    pub signature_validity_secs: u32,
    pub signature_refresh_secs: u32,
    pub jitter_secs: u32,
}

impl Default for SigningIntervals {
    fn default() -> Self {
        // Mirrors BIND's compiled-in defaults: 30 days validity, refreshed
        // with 5 days left, no jitter.
        Self {
            signature_validity_secs: 30 * 86400,
            signature_refresh_secs: 5 * 86400,
            jitter_secs: 0,
        }
    }
}

/// The DNSSEC configuration attached to a zone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DnssecConfig {
    /// The policy the administrator actually configured (may be `None`).
    /// Coherence checks (P5) and KASP-affecting-reuse decisions (P7) look
    /// at this field.
    pub policy: DnssecPolicyRef,
    /// The built-in `default` policy, attached unconditionally by the
    /// assembler regardless of `policy` (§4.2 step 5), so the zone always
    /// has a fallback KASP to consult even when DNSSEC is unused.
    pub fallback_policy: DnssecPolicyRef,
    pub inline_signing: bool,
    pub nsec3: Option<Nsec3Params>,
    pub signing_intervals: SigningIntervals,
    pub key_directory: Option<Utf8PathBuf>,
    pub key_store: Option<Box<str>>,
}

impl Default for DnssecConfig {
    fn default() -> Self {
        Self {
            policy: DnssecPolicyRef::None,
            fallback_policy: DnssecPolicyRef::Default,
            inline_signing: false,
            nsec3: None,
            signing_intervals: SigningIntervals::default(),
            key_directory: None,
            key_store: None,
        }
    }
}
