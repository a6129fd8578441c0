//! Per-zone resource limits, including the percent-vs-absolute fields
//! that must preserve their surface distinction.

use serde::{Deserialize, Serialize};

/// A size that may be given as an absolute count/byte value or as a
/// percentage (of some ambient total the caller defines, e.g. available
/// memory for `max-cache-size`, or the prior zone size for
/// `max-ixfr-ratio`). Kept as a tagged variant rather than coerced into
/// one numeric type, so a percentage is never silently reinterpreted as
/// an absolute count or vice versa.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum SizeOrPercent {
    Absolute(u64),
    Percent(f64),
}

/// Per-zone resource limits.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    pub max_records: Option<u32>,
    pub max_records_per_type: Option<u32>,
    pub max_types_per_name: Option<u32>,
    pub max_journal_size: Option<SizeOrPercent>,
    pub max_zone_ttl: Option<u32>,
    pub max_ixfr_ratio: Option<SizeOrPercent>,
}
