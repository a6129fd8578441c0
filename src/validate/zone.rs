//! The per-zone validator (§4.1 "Per-zone validator").

use std::str::FromStr;

use camino::Utf8PathBuf;
use domain::base::iana::Rtype;
use isccfg_api::{
    DnssecConfig, DnssecPolicyRef, IpKeyList, MatchType, SsuRule, SsuRuleAction, SsuTable,
    TypeLimit,
};
use isccfg_cfg::token::{find_all, find_one, Entry, Token};

use crate::config::GatheredConfig;
use crate::error::{Diagnostic, Diagnostics, ErrorKind};
use crate::keydir::KeyDirectoryRegistry;
use crate::zonefile_registry::FileAccessMode;

/// The zone type tag, re-exported from `isccfg-api` for convenience.
pub use isccfg_api::ZoneType;

/// A zone that has passed the per-zone checks in §4.1, with all clauses
/// interpreted but no ACL yet attached - that's the assembler's job
/// (§4.2.1), since it depends on the option-resolution stack rather than
/// just this zone's own block.
#[derive(Clone, Debug)]
pub struct ParsedZoneConfig {
    pub origin: isccfg_api::StoredName,
    pub class_str: Box<str>,
    pub zone_type: ZoneType,
    pub template: Option<Box<str>>,
    pub file: Option<Utf8PathBuf>,
    pub primaries: IpKeyList,
    pub parental_agents: IpKeyList,
    pub also_notify: IpKeyList,
    pub notify_explicit_or_no: Option<bool>,
    pub dnssec: DnssecConfig,
    pub update_policy: Option<UpdatePolicySource>,
    pub has_allow_update: bool,
    pub server_addresses: Vec<std::net::SocketAddr>,
    pub server_names: Vec<isccfg_api::StoredName>,
    pub catalog_zone: bool,
}

/// Where a zone's `update-policy` comes from. The `local` literal is kept
/// unexpanded until assembly time, since its expansion names the
/// server's session-key identity - which the validator never has access
/// to (scenario S4: "validator accepts syntactically").
#[derive(Clone, Debug)]
pub enum UpdatePolicySource {
    Explicit(SsuTable),
    Local,
}

/// Parse and validate a single `zone "<name>" [ <class> ] { ... };`
/// statement. `entry` must have `entry.keyword() == Some("zone")`.
pub fn validate_zone(
    entry: &Entry,
    gathered: &GatheredConfig<'_>,
    file_registry: &mut crate::zonefile_registry::ZoneFileRegistry,
    key_dirs: &mut KeyDirectoryRegistry,
    diags: &mut Diagnostics,
) -> Option<ParsedZoneConfig> {
    let args = entry.args();
    let Some(name_str) = args.first().and_then(Token::as_str) else {
        diags.push(Diagnostic::error(ErrorKind::Syntax, "zone statement missing a name").at(entry.location.clone()));
        return None;
    };

    let origin = match isccfg_api::StoredName::from_str(&name_str.to_ascii_lowercase()) {
        Ok(n) => n,
        Err(_) => {
            diags.push(
                Diagnostic::error(ErrorKind::Syntax, format!("invalid zone name '{name_str}'"))
                    .at(entry.location.clone()),
            );
            return None;
        }
    };

    let class_str: Box<str> = if args.len() >= 3 {
        args[1].as_str().unwrap_or("IN").into()
    } else {
        "IN".into()
    };

    let Some(block) = entry.block() else {
        diags.push(
            Diagnostic::error(ErrorKind::Syntax, format!("zone '{name_str}' has no body")).at(entry.location.clone()),
        );
        return None;
    };

    let Some(zone_type) = find_one(block, "type")
        .and_then(|e| e.args().first())
        .and_then(Token::as_str)
        .and_then(ZoneType::parse)
    else {
        diags.push(
            Diagnostic::error(ErrorKind::Syntax, format!("zone '{name_str}' has no recognized type"))
                .at(entry.location.clone()),
        );
        return None;
    };

    if zone_type == ZoneType::Redirect && name_str != "." {
        diags.push(
            Diagnostic::error(ErrorKind::SemanticConflict, "a redirect zone must be named \".\"")
                .at(entry.location.clone()),
        );
    }

    if let Some(bad) = first_illegal_clause(block, zone_type) {
        diags.push(
            Diagnostic::error(
                ErrorKind::SemanticConflict,
                format!("clause '{bad}' is not legal for zone type '{name_str}'"),
            )
            .at(entry.location.clone()),
        );
    }

    let template = find_one(block, "template")
        .and_then(|e| e.args().first())
        .and_then(Token::as_str)
        .map(Box::<str>::from);

    let primaries = parse_remote_list(block, &["primaries", "masters"], diags, &entry.location);
    let parental_agents = parse_ip_key_list(block, "parental-agents");
    let also_notify = parse_ip_key_list(block, "also-notify");

    if zone_type.requires_primaries() && primaries.is_empty() && name_str != "." {
        // The root-mirror asymmetry (§9 Open Question): an empty
        // primaries list is only tolerated for the root zone under
        // mirror, which falls back to the compiled-in IANA roots
        // (§4.2 step 10). Every other case is fatal.
        diags.push(
            Diagnostic::error(
                ErrorKind::FatalAssembly,
                format!("zone '{name_str}' requires a non-empty primaries (or masters) list"),
            )
            .at(entry.location.clone()),
        );
    }

    let has_masters_and_primaries =
        find_one(block, "primaries").is_some() && find_one(block, "masters").is_some();
    if has_masters_and_primaries {
        diags.push(
            Diagnostic::error(
                ErrorKind::SemanticConflict,
                "at most one of 'primaries' or 'masters' may appear",
            )
            .at(entry.location.clone()),
        );
    }

    let file = find_one(block, "file")
        .and_then(|e| e.args().first())
        .and_then(Token::as_str)
        .map(Utf8PathBuf::from);

    let has_allow_update = find_one(block, "allow-update").is_some();
    let update_policy_entry = find_one(block, "update-policy");

    if zone_type == ZoneType::Primary && has_allow_update && update_policy_entry.is_some() {
        diags.push(
            Diagnostic::error(
                ErrorKind::SemanticConflict,
                "primary zones may not set both 'allow-update' and 'update-policy'",
            )
            .at(entry.location.clone()),
        );
    }

    let update_policy = update_policy_entry.and_then(|e| parse_ssu_table(e, diags));

    let inline_signing_explicit = find_one(block, "inline-signing")
        .and_then(|e| e.args().first())
        .and_then(Token::as_bool);

    let dnssec_policy_name = find_one(block, "dnssec-policy")
        .and_then(|e| e.args().first())
        .and_then(Token::as_str);

    let mut dnssec = DnssecConfig::default();
    if let Some(name) = dnssec_policy_name {
        let policy = DnssecPolicyRef::parse(name);
        if let DnssecPolicyRef::Named(n) = &policy {
            if gathered.kasp(n).is_none() {
                diags.push(
                    Diagnostic::error(
                        ErrorKind::MissingReference,
                        format!("dnssec-policy '{n}' is not defined"),
                    )
                    .at(entry.location.clone()),
                );
            }
        }
        dnssec.policy = policy;
    }
    dnssec.inline_signing = inline_signing_explicit.unwrap_or(false);

    if dnssec.policy.uses_kasp() {
        let accepts_updates = has_allow_update || update_policy.is_some();
        if !accepts_updates && !dnssec.inline_signing {
            diags.push(
                Diagnostic::error(
                    ErrorKind::SemanticConflict,
                    format!(
                        "zone '{name_str}' uses a dnssec-policy but requires dynamic DNS or inline-signing"
                    ),
                )
                .at(entry.location.clone()),
            );
        }

        if find_one(block, "max-zone-ttl").is_some() {
            diags.push(
                Diagnostic::error(
                    ErrorKind::SemanticConflict,
                    "'max-zone-ttl' must not be set alongside a dnssec-policy",
                )
                .at(entry.location.clone()),
            );
        }
    }

    let needs_file = matches!(zone_type, ZoneType::Primary | ZoneType::Hint)
        || (zone_type == ZoneType::Secondary && dnssec.inline_signing);
    if needs_file && file.is_none() {
        diags.push(
            Diagnostic::error(ErrorKind::FatalAssembly, format!("zone '{name_str}' requires a 'file'"))
                .at(entry.location.clone()),
        );
    }

    if let Some(path) = &file {
        let writable = matches!(zone_type, ZoneType::Primary)
            || (zone_type == ZoneType::Secondary && dnssec.inline_signing);
        let mode = if writable {
            FileAccessMode::Writable
        } else {
            FileAccessMode::ReadOnly
        };
        if let Err(prior) = file_registry.define(path.clone(), mode, entry.location.clone()) {
            if writable || prior.value == FileAccessMode::Writable {
                diags.push(
                    Diagnostic::error(
                        ErrorKind::Duplicate,
                        format!("writable file '{path}': already in use"),
                    )
                    .at(entry.location.clone()),
                );
            }
        }
    }

    if dnssec.policy.uses_kasp() {
        let dir = find_one(block, "key-directory")
            .and_then(|e| e.args().first())
            .and_then(Token::as_str)
            .map(Utf8PathBuf::from);
        key_dirs.register(&origin, dir.as_deref(), &dnssec.policy, &entry.location, diags);
        dnssec.key_directory = dir;
    }

    if zone_type == ZoneType::Mirror {
        // "no" lexes as `Token::Bool(false)`; "explicit" doesn't match any
        // of the bareword grammars and stays a `Token::Str`.
        let notify_ok = match find_one(block, "notify").and_then(|e| e.args().first()) {
            Some(Token::Bool(false)) => true,
            Some(t) => t.as_str() == Some("explicit"),
            None => false,
        };
        if !notify_ok {
            diags.push(
                Diagnostic::error(
                    ErrorKind::SemanticConflict,
                    "mirror zones can only be used with notify no or notify explicit",
                )
                .at(entry.location.clone()),
            );
        }
        if find_one(block, "recursion")
            .and_then(|e| e.args().first())
            .and_then(Token::as_bool)
            == Some(false)
        {
            diags.push(
                Diagnostic::warning(
                    ErrorKind::SemanticConflict,
                    "mirror zones should not disable recursion",
                )
                .at(entry.location.clone()),
            );
        }
    }

    let (server_addresses, server_names) = if zone_type == ZoneType::StaticStub {
        (
            find_one(block, "server-addresses")
                .and_then(Entry::block)
                .map(|b| collect_socket_addrs(b))
                .unwrap_or_default(),
            find_one(block, "server-names")
                .and_then(Entry::block)
                .map(|b| collect_names(b))
                .unwrap_or_default(),
        )
    } else {
        (Vec::new(), Vec::new())
    };

    if zone_type == ZoneType::StaticStub && server_addresses.is_empty() && server_names.is_empty() {
        diags.push(
            Diagnostic::error(
                ErrorKind::FatalAssembly,
                format!("static-stub zone '{name_str}' has no server-addresses or server-names"),
            )
            .at(entry.location.clone()),
        );
    }

    if let Some(target) = find_one(block, "send-report-channel")
        .and_then(|e| e.args().first())
        .and_then(Token::as_str)
    {
        if let Ok(target_name) = isccfg_api::StoredName::from_str(target) {
            if target_name == origin || target_name.ends_with(&origin) {
                diags.push(
                    Diagnostic::error(
                        ErrorKind::SemanticConflict,
                        "send-report-channel target must not be the zone origin or a subdomain",
                    )
                    .at(entry.location.clone()),
                );
            }
        }
    }

    if origin.is_root() && find_one(block, "log-report-channel").is_some() {
        diags.push(
            Diagnostic::error(ErrorKind::SemanticConflict, "log-report-channel must not be set for the root zone")
                .at(entry.location.clone()),
        );
    }

    if zone_type == ZoneType::Forward && falls_in_private_space(&origin) && find_one(block, "forward").is_none() {
        diags.push(Diagnostic::warning(
            ErrorKind::SemanticConflict,
            format!("forward zone '{name_str}' covers private address space; consider 'forward only'"),
        ));
    }

    let masterfile_format = find_one(block, "masterfile-format")
        .and_then(|e| e.args().first())
        .and_then(Token::as_str);
    if find_one(block, "masterfile-style").is_some() && masterfile_format.is_some_and(|f| f != "text") {
        diags.push(
            Diagnostic::error(
                ErrorKind::SemanticConflict,
                format!("zone '{name_str}': 'masterfile-style' is only meaningful with masterfile-format text"),
            )
            .at(entry.location.clone()),
        );
    }

    if let Some(e) = find_one(block, "serial-update-method") {
        if e.args().first().and_then(Token::as_str).is_none_or(|m| !matches!(m, "increment" | "unixtime" | "date")) {
            diags.push(
                Diagnostic::error(ErrorKind::Syntax, format!("zone '{name_str}': invalid serial-update-method"))
                    .at(e.location.clone()),
            );
        }
    }

    for tristate_clause in ["check-dup-records", "check-mx"] {
        if let Some(e) = find_one(block, tristate_clause) {
            if e.args().first().and_then(Token::as_str).is_none_or(|m| !matches!(m, "ignore" | "warn" | "fail")) {
                diags.push(
                    Diagnostic::error(ErrorKind::Syntax, format!("zone '{name_str}': invalid {tristate_clause}"))
                        .at(e.location.clone()),
                );
            }
        }
    }

    if let Some(e) = find_one(block, "max-journal-size") {
        // The documented maximum a journal file format can represent;
        // BIND's own journal header field is a 32-bit byte count.
        const JOURNAL_FORMAT_MAX: i64 = u32::MAX as i64;
        if e.args().first().and_then(Token::as_int).is_some_and(|n| n > JOURNAL_FORMAT_MAX) {
            diags.push(
                Diagnostic::error(
                    ErrorKind::Range,
                    format!("zone '{name_str}': max-journal-size exceeds the journal format's maximum"),
                )
                .at(e.location.clone()),
            );
        }
    }

    if let Some(e) = find_one(block, "min-transfer-rate-in") {
        let args = e.args();
        let bytes = args.first().and_then(Token::as_int);
        let minutes = args.get(1).and_then(Token::as_int);
        const MAX_MINUTES: i64 = 28 * 24 * 60;
        if bytes.is_some_and(|b| b <= 0) || minutes.is_none_or(|m| !(1..=MAX_MINUTES).contains(&m)) {
            diags.push(
                Diagnostic::error(
                    ErrorKind::Range,
                    format!(
                        "zone '{name_str}': min-transfer-rate-in bytes must be > 0 and minutes in [1, {MAX_MINUTES}]"
                    ),
                )
                .at(e.location.clone()),
            );
        }
    }

    let catalog_zone = find_one(block, "in-view")
        .map(|_| false)
        .unwrap_or_else(|| find_one(block, "catalog-zone").is_some());

    Some(ParsedZoneConfig {
        origin,
        class_str,
        zone_type,
        template,
        file,
        primaries,
        parental_agents,
        also_notify,
        notify_explicit_or_no: find_one(block, "notify")
            .and_then(|e| e.args().first())
            .and_then(Token::as_bool),
        dnssec,
        update_policy,
        has_allow_update,
        server_addresses,
        server_names,
        catalog_zone,
    })
}

/// The zone-type/clause legality matrix (§3, §4.1 "Enforce that every
/// clause present is legal for the type"). Returns the first clause found
/// in `block` that isn't legal for `zone_type`, if any.
///
/// Kept intentionally small: only the clauses whose misuse is actually
/// diagnostic-worthy across types are listed; an unlisted clause is
/// assumed legal everywhere; per §6 the parser only covers the normative
/// grammar surface, not full clause-by-clause coverage.
fn first_illegal_clause(block: &[Entry], zone_type: ZoneType) -> Option<&'static str> {
    const PRIMARY_ONLY: &[&str] = &["allow-update", "update-policy"];
    const SECONDARY_LIKE_ONLY: &[&str] = &["primaries", "masters"];
    const STATIC_STUB_ONLY: &[&str] = &["server-addresses", "server-names"];
    const FORWARD_ONLY: &[&str] = &["forward", "forwarders"];

    let is_present = |clause: &str| find_all(block, clause).next().is_some();

    if zone_type != ZoneType::Primary {
        for c in PRIMARY_ONLY {
            if is_present(c) {
                return Some(c);
            }
        }
    }
    if !zone_type.requires_primaries() && zone_type != ZoneType::Stub {
        for c in SECONDARY_LIKE_ONLY {
            if is_present(c) {
                return Some(c);
            }
        }
    }
    if zone_type != ZoneType::StaticStub {
        for c in STATIC_STUB_ONLY {
            if is_present(c) {
                return Some(c);
            }
        }
    }
    if !matches!(zone_type, ZoneType::Forward | ZoneType::InView) {
        for c in FORWARD_ONLY {
            if is_present(c) {
                return Some(c);
            }
        }
    }
    None
}

/// Whether `origin` names one of the reverse zones covering RFC1918
/// private IPv4 space or ULA IPv6 space (§4.1 "RFC1918/ULA + forward
/// zone"). Checked by exact label match against the well-known reverse
/// delegation points rather than by decoding the name into a prefix,
/// since those are the only names this check needs to recognize.
fn falls_in_private_space(origin: &isccfg_api::StoredName) -> bool {
    const RFC1918_REVERSE_ZONES: &[&str] = &[
        "10.in-addr.arpa",
        "168.192.in-addr.arpa",
        "16.172.in-addr.arpa",
        "17.172.in-addr.arpa",
        "18.172.in-addr.arpa",
        "19.172.in-addr.arpa",
        "20.172.in-addr.arpa",
        "21.172.in-addr.arpa",
        "22.172.in-addr.arpa",
        "23.172.in-addr.arpa",
        "24.172.in-addr.arpa",
        "25.172.in-addr.arpa",
        "26.172.in-addr.arpa",
        "27.172.in-addr.arpa",
        "28.172.in-addr.arpa",
        "29.172.in-addr.arpa",
        "30.172.in-addr.arpa",
        "31.172.in-addr.arpa",
    ];
    let as_str = origin.to_string();
    let trimmed = as_str.trim_end_matches('.');
    RFC1918_REVERSE_ZONES.contains(&trimmed)
        || (trimmed.ends_with(".d.f.ip6.arpa") || trimmed.ends_with(".c.f.ip6.arpa"))
}

fn collect_socket_addrs(block: &[Entry]) -> Vec<std::net::SocketAddr> {
    block
        .iter()
        .filter_map(|e| e.tokens.first())
        .filter_map(Token::as_socket_addr)
        .collect()
}

fn collect_names(block: &[Entry]) -> Vec<isccfg_api::StoredName> {
    block
        .iter()
        .filter_map(|e| e.tokens.first())
        .filter_map(Token::as_str)
        .filter_map(|s| isccfg_api::StoredName::from_str(s).ok())
        .collect()
}

fn parse_ip_key_list(block: &[Entry], keyword: &str) -> IpKeyList {
    let Some(list_block) = find_one(block, keyword).and_then(Entry::block) else {
        return IpKeyList::default();
    };
    IpKeyList {
        entries: list_block
            .iter()
            .filter_map(|e| {
                let address = e.tokens.first()?.as_socket_addr()?;
                Some(isccfg_api::IpKeyEntry {
                    address,
                    source_address: None,
                    tsig_key: None,
                    tls_profile: None,
                })
            })
            .collect(),
    }
}

/// `primaries { ... };` or `masters { ... };` - the two keywords are
/// treated as synonyms for both the uniqueness check (§4.1 pass 3) and
/// here, at the point of use.
fn parse_remote_list(
    block: &[Entry],
    keywords: &[&str],
    _diags: &mut Diagnostics,
    _location: &isccfg_cfg::token::Location,
) -> IpKeyList {
    for kw in keywords {
        let list = parse_ip_key_list(block, kw);
        if !list.is_empty() {
            return list;
        }
    }
    IpKeyList::default()
}

fn parse_ssu_table(entry: &Entry, diags: &mut Diagnostics) -> Option<UpdatePolicySource> {
    // `update-policy local;` - the literal shorthand (§3).
    if entry.args().first().and_then(Token::as_str) == Some("local") {
        return Some(UpdatePolicySource::Local);
    }

    let block = entry.block()?;
    let mut rules = Vec::with_capacity(block.len());
    for rule_entry in block {
        let tokens = &rule_entry.tokens;
        let Some(action) = tokens.first().and_then(Token::as_str).and_then(|s| match s {
            "grant" => Some(SsuRuleAction::Grant),
            "deny" => Some(SsuRuleAction::Deny),
            _ => None,
        }) else {
            diags.push(
                Diagnostic::error(ErrorKind::Syntax, "update-policy rule must start with grant or deny")
                    .at(rule_entry.location.clone()),
            );
            continue;
        };

        let Some(identity_str) = tokens.get(1).and_then(Token::as_str) else {
            continue;
        };
        let Ok(identity) = isccfg_api::StoredName::from_str(identity_str) else {
            diags.push(
                Diagnostic::error(ErrorKind::Syntax, format!("invalid identity name '{identity_str}'"))
                    .at(rule_entry.location.clone()),
            );
            continue;
        };
        let Some(match_type) = tokens.get(2).and_then(Token::as_str).and_then(MatchType::parse) else {
            diags.push(
                Diagnostic::error(ErrorKind::Syntax, "update-policy rule has an unrecognized match-type")
                    .at(rule_entry.location.clone()),
            );
            continue;
        };

        let mut idx = 3;
        let target = if match_type.takes_explicit_target() {
            let t = tokens
                .get(idx)
                .and_then(Token::as_str)
                .and_then(|s| isccfg_api::StoredName::from_str(s).ok());
            idx += 1;
            t
        } else {
            None
        };

        let mut types = Vec::new();
        while let Some(tok) = tokens.get(idx) {
            if let Some(s) = tok.as_str() {
                let (rtype_str, max_count) = match s.split_once('(') {
                    Some((rtype_str, rest)) => {
                        let count = rest.trim_end_matches(')').parse::<u32>().ok();
                        (rtype_str, count.filter(|c| *c <= 65535).map(|c| c as u16).unwrap_or(u16::MAX))
                    }
                    None => (s, u16::MAX),
                };
                if let Ok(rtype) = rtype_str.parse::<Rtype>() {
                    types.push(TypeLimit { rtype, max_count });
                } else {
                    diags.push(
                        Diagnostic::error(ErrorKind::Syntax, format!("unrecognized record type '{rtype_str}'"))
                            .at(rule_entry.location.clone()),
                    );
                }
            }
            idx += 1;
        }

        rules.push(SsuRule {
            action,
            identity,
            match_type,
            target,
            types,
        });
    }

    Some(UpdatePolicySource::Explicit(SsuTable { rules }))
}
