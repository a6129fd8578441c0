//! The central `Zone` entity (§3) and its supporting types.

use std::net::SocketAddr;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::acl::AclRef;
use crate::dnssec::DnssecConfig;
use crate::ipkeylist::IpKeyList;
use crate::limits::Limits;
use crate::ssu::SsuTable;
use crate::StoredName;

/// The zone type tag (§3). Modeled as a closed enum so a hot-path match
/// never falls back to string comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneType {
    Primary,
    Secondary,
    Mirror,
    Stub,
    StaticStub,
    Hint,
    Forward,
    Redirect,
    Dlz,
    /// An alias binding the same zone object into an additional view.
    InView,
}

impl ZoneType {
    /// Accepts the two legacy synonyms (`master`/`slave`) alongside the
    /// current names, normalizing to the current tag: legacy synonyms
    /// are accepted on input, never emitted.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "primary" | "master" => Self::Primary,
            "secondary" | "slave" => Self::Secondary,
            "mirror" => Self::Mirror,
            "stub" => Self::Stub,
            "static-stub" => Self::StaticStub,
            "hint" => Self::Hint,
            "forward" => Self::Forward,
            "redirect" => Self::Redirect,
            "dlz" => Self::Dlz,
            "in-view" => Self::InView,
            _ => return None,
        })
    }

    /// Whether this type requires a non-empty primaries/masters list
    /// (§4.1 "Primary/secondary requirements"), for all names except the
    /// root zone under mirror (the documented asymmetry, §9).
    pub fn requires_primaries(self) -> bool {
        matches!(self, Self::Secondary | Self::Stub | Self::Mirror)
    }
}

/// The backing store selection (§4.2 step 3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DatabaseBackend {
    /// The default native database.
    Native,
    /// `dlz "<name>" <args…>`, already tokenized.
    Dlz { name: Box<str>, args: Vec<Box<str>> },
    /// `in-view` alias: a reference to another zone's live object.
    InView { target: StoredName },
}

impl Default for DatabaseBackend {
    fn default() -> Self {
        Self::Native
    }
}

/// On-disk text vs compiled binary zone-file encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MasterFileFormat {
    Text,
    Raw,
}

/// `masterfile-style`: only meaningful with [`MasterFileFormat::Text`]
/// (§4.1 "Validate serial-update-method...").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MasterFileStyle {
    Full,
    Relative,
}

/// File bindings (§3 "File bindings").
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FileBindings {
    pub file: Option<Utf8PathBuf>,
    /// Used once on load, never referenced again afterward.
    pub initial_file: Option<Utf8PathBuf>,
    pub journal: Option<Utf8PathBuf>,
    pub format: Option<MasterFileFormat>,
    pub style: Option<MasterFileStyle>,
}

/// `ixfr-from-differences`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IxfrFromDifferences {
    No,
    Yes,
    Primary,
    Secondary,
}

/// `min-transfer-rate-in`: bytes over a window of minutes (§3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinTransferRate {
    pub bytes: u64,
    pub minutes: u32,
}

/// `checkds`: whether DS records published at the parent should be
/// checked automatically once a zone has `parental-agents` configured
/// (§4.2 step 9).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckDsMode {
    Yes,
    No,
    /// Checked only on an explicit operator request; the value inferred
    /// for a primary/secondary zone that sets `parental-agents` but
    /// never sets `checkds` itself.
    Explicit,
}

/// Transfer-related configuration (§3 "Transfer policy").
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferPolicy {
    pub primaries: IpKeyList,
    pub parental_agents: IpKeyList,
    /// NEW (supplemented): `also-notify`'s own target list, distinct
    /// from `primaries` and from implicit notify of secondaries.
    pub also_notify: IpKeyList,
    pub notify_sources: Vec<SocketAddr>,
    pub transfer_sources: Vec<SocketAddr>,
    pub multi_primary: bool,
    pub transfer_idle_timeout_secs: Option<u32>,
    pub transfer_timeout_secs: Option<u32>,
    pub max_transfer_time_secs: Option<u32>,
    pub ixfr_from_differences: Option<IxfrFromDifferences>,
    pub min_transfer_rate_in: Option<MinTransferRate>,
    /// Disables the documented ×60 seconds conversion for legacy configs
    /// (§4.2 step 4).
    pub transfers_in_seconds: bool,
    pub checkds: Option<CheckDsMode>,
}

/// `tcp` or `tls`, as the transport qualifier on a scoped ACL.
pub use crate::acl::Transport as TransportScope;

/// Tri-state `check-names` (§3 "Behavior flags"), mapped at assembly time
/// to the two zone bits *check* and *check-fail* (§4.2 step 8).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckNames {
    Ignore,
    Warn,
    Fail,
}

impl CheckNames {
    /// The (check, check-fail) bit pair the assembler materializes.
    pub fn to_bits(self) -> (bool, bool) {
        match self {
            Self::Ignore => (false, false),
            Self::Warn => (true, false),
            Self::Fail => (true, true),
        }
    }
}

/// `zone-statistics`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneStatisticsLevel {
    None,
    TerseOnly,
    Full,
}

/// Behavior flags (§3 "Behavior flags").
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BehaviorFlags {
    pub check_names_primary: Option<CheckNames>,
    pub check_names_secondary: Option<CheckNames>,
    pub check_dup_records: Option<CheckNames>,
    pub check_mx: Option<CheckNames>,
    pub check_integrity: bool,
    pub zero_no_soa_ttl: bool,
    pub nsec3_test_zone: bool,
    pub provide_zoneversion: bool,
}

/// A single allow-* ACL attachment plus the serving policy fields that
/// aren't ACLs (§3 "Serving policy").
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ServingPolicy {
    pub allow_query: Option<AclRef>,
    pub allow_query_on: Option<AclRef>,
    pub allow_transfer: Vec<crate::acl::ScopedAcl>,
    pub allow_notify: Option<AclRef>,
    pub allow_update: Option<AclRef>,
    pub allow_update_forwarding: Option<AclRef>,
    pub update_policy: Option<SsuTable>,
    pub zone_statistics: Option<ZoneStatisticsLevel>,
}

impl ServingPolicy {
    /// P5: a zone accepts dynamic updates if it has a non-empty
    /// `allow-update` or an `update-policy`.
    pub fn accepts_dynamic_updates(&self) -> bool {
        self.allow_update.is_some() || self.update_policy.is_some()
    }
}

/// The zone's lifecycle state machine (§3 "Lifecycle").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneLifecycle {
    Configuring,
    Loading,
    Loaded,
    Refreshing,
    Unloading,
}

/// The central zone entity (§3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// Canonical lowercased origin name.
    pub origin: StoredName,
    pub class: domain::base::iana::Class,
    pub zone_type: ZoneType,
    pub backend: DatabaseBackend,
    pub files: FileBindings,
    pub transfer: TransferPolicy,
    pub serving: ServingPolicy,
    pub dnssec: DnssecConfig,
    pub limits: Limits,
    pub behavior: BehaviorFlags,
    pub lifecycle: ZoneLifecycle,
}

impl Zone {
    /// P1: whether `clause` (identified by the predicate closure's own
    /// notion of "present") is legal for this zone's type. Callers supply
    /// the zone-type/clause legality matrix entry for the clause in
    /// question; this helper just names the check point the validator
    /// calls into.
    pub fn clause_legal_for_type(zone_type: ZoneType, legal_types: &[ZoneType]) -> bool {
        legal_types.contains(&zone_type)
    }
}
