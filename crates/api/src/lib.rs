//! The shared zone-lifecycle data model.
//!
//! These are the types the validator checks and the assembler produces:
//! `Zone` and everything hanging off it. Nothing here knows how to read
//! configuration text - that's `isccfg-cfg` - or how to run the checks
//! that populate it - that's `isccfg` itself.

pub mod acl;
pub mod dnssec;
pub mod ipkeylist;
pub mod limits;
pub mod ssu;
pub mod staticstub;
pub mod trust_anchor;
pub mod zone;

pub use acl::{AclElement, AclRef, InlineAcl, ScopedAcl};
pub use dnssec::{DnssecConfig, DnssecPolicyRef, Nsec3Params, SigningIntervals};
pub use ipkeylist::{IpKeyEntry, IpKeyList};
pub use limits::{Limits, SizeOrPercent};
pub use ssu::{MatchType, SsuRule, SsuRuleAction, SsuTable, TypeLimit};
pub use staticstub::{synthesize_static_stub_apex, SynthesizedRecord, StaticStubError, STATIC_STUB_TTL};
pub use trust_anchor::{TrustAnchor, TrustAnchorKind};
pub use zone::{
    BehaviorFlags, CheckDsMode, CheckNames, DatabaseBackend, FileBindings, IxfrFromDifferences,
    MasterFileFormat, MasterFileStyle, MinTransferRate, ServingPolicy, TransferPolicy,
    TransportScope, Zone, ZoneLifecycle, ZoneStatisticsLevel, ZoneType,
};

/// The name type used throughout the zone data model: an owned,
/// lowercase-canonicalized DNS name backed by a shared buffer.
pub type StoredName = domain::base::Name<bytes::Bytes>;
