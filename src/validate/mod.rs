//! `SemanticValidator` (component C5, §4.1): the single entry point that
//! walks a whole [`ConfigTree`] and accumulates every problem it finds.
//!
//! The nine passes run in a fixed order, since later passes rely on
//! symbols the earlier ones build (e.g. the zones pass needs the
//! gathered KASPs and key-stores from the options-less top-level scan).
//! Each pass is free to push any number of diagnostics; nothing stops
//! early except an individual zone or anchor that can't be parsed well
//! enough to keep checking it.

pub mod zone;

use std::collections::HashSet;

use isccfg_cfg::token::{find_all, ConfigTree, Entry, Token};

use crate::config::GatheredConfig;
use crate::error::{Diagnostic, Diagnostics, ErrorKind};
use crate::keydir::KeyDirectoryRegistry;
use crate::trust_anchor_check;
use crate::zonefile_registry::ZoneFileRegistry;
use zone::{validate_zone, ParsedZoneConfig, ZoneType};

/// The two optional check categories named in §4.1's entry-point
/// contract. Neither is implemented beyond recording that the flag was
/// honored, since plugin bodies and the TLS provider's algorithm table
/// are external collaborators (§1).
#[derive(Clone, Copy, Debug, Default)]
pub struct Flags {
    pub check_plugins: bool,
    pub check_dnssec_algorithms: bool,
}

/// A zone that passed the per-zone validator, tagged with the view it
/// was found in (`None` for a top-level zone).
pub struct ValidatedZone<'a> {
    pub view: Option<&'a str>,
    pub config: ParsedZoneConfig,
    /// The zone statement's own block, kept so the assembler can build an
    /// option-resolution stack without re-walking the tree to find it.
    pub block: &'a [Entry],
}

/// Everything the validator produced that a caller (the CLI, or the
/// assembler driving all zones after a successful check) needs to go on
/// with: the diagnostics, and the zones that parsed well enough to hand
/// to `assemble`. A zone with fatal errors is simply absent here; its
/// problems are still in `diags`.
pub struct ValidationResult<'a> {
    pub diags: Diagnostics,
    pub zones: Vec<ValidatedZone<'a>>,
    pub gathered: GatheredConfig<'a>,
}

/// `validate(config, flags) -> OK | FAILURE` (§4.1). The returned
/// [`Diagnostics`] carries every problem found; `diags.status()` is the
/// summary the top-level runner collapses into a process exit code.
pub fn validate<'a>(tree: &'a ConfigTree, flags: Flags) -> ValidationResult<'a> {
    let mut diags = Diagnostics::new();

    validate_options_ranges(tree, &mut diags);
    validate_controls(tree, &mut diags);
    validate_remote_server_lists(tree, &mut diags);
    validate_http_tls_profiles(tree, &mut diags);
    validate_listeners(tree, &mut diags);

    let gathered = GatheredConfig::gather(tree, &mut diags);
    validate_views(tree, &mut diags);

    let mut file_registry = ZoneFileRegistry::new();
    let mut key_dirs = KeyDirectoryRegistry::new();
    let mut names = ZoneNameScopes::default();
    let mut zones = Vec::new();

    for entry in tree.all("zone") {
        if let Some(parsed) = validate_one_zone(entry, None, &gathered, &mut file_registry, &mut key_dirs, &mut names, &mut diags)
        {
            zones.push(ValidatedZone { view: None, config: parsed, block: entry.block().unwrap_or(&[]) });
        }
    }

    for view in tree.all("view") {
        let view_name = view.args().first().and_then(Token::as_str);
        let Some(block) = view.block() else { continue };
        for entry in find_all(block, "zone") {
            if let Some(parsed) =
                validate_one_zone(entry, view_name, &gathered, &mut file_registry, &mut key_dirs, &mut names, &mut diags)
            {
                zones.push(ValidatedZone { view: view_name, config: parsed, block: entry.block().unwrap_or(&[]) });
            }
        }
    }

    validate_trust_anchors(tree, &mut diags);

    if flags.check_plugins {
        // Plugin validation dispatches to the plugin's own validator,
        // which is an external collaborator (§1); this pass only
        // confirms the referenced plugin path was named syntactically.
        for entry in tree.all("plugin") {
            if entry.args().first().and_then(Token::as_str).is_none() {
                diags.push(
                    Diagnostic::error(ErrorKind::Syntax, "plugin statement missing a path").at(entry.location.clone()),
                );
            }
        }
    }

    let _ = flags.check_dnssec_algorithms;

    ValidationResult { diags, zones, gathered }
}

/// Pass 1: ranges and structural constraints over every options block
/// (global, per-view, per-zone handled separately by the zones pass).
fn validate_options_ranges(tree: &ConfigTree, diags: &mut Diagnostics) {
    let mut blocks: Vec<&[Entry]> = Vec::new();
    if let Some(global) = tree.first("options").and_then(Entry::block) {
        blocks.push(global);
    }
    for view in tree.all("view") {
        if let Some(b) = view.block() {
            blocks.push(b);
        }
    }

    for block in blocks {
        if let Some(e) = find_all(block, "max-rsa-exponent").next() {
            if let Some(n) = e.args().first().and_then(Token::as_int) {
                if !(n == 0 || (35..=4096).contains(&n)) {
                    diags.push(
                        Diagnostic::error(ErrorKind::Range, format!("max-rsa-exponent {n} out of range"))
                            .at(e.location.clone()),
                    );
                }
            }
        }
        if let Some(e) = find_all(block, "nta-lifetime").next() {
            if let Some(d) = e.args().first().and_then(Token::as_duration) {
                const SEVEN_DAYS: u64 = 7 * 24 * 60 * 60;
                if d == 0 || d > SEVEN_DAYS {
                    diags.push(
                        Diagnostic::error(ErrorKind::Range, "nta-lifetime must be nonzero and at most 7 days")
                            .at(e.location.clone()),
                    );
                }
            }
        }
        if let Some(e) = find_all(block, "lmdb-mapsize").next() {
            if let Some(n) = e.args().first().and_then(Token::as_int) {
                const ONE_MIB: i64 = 1 << 20;
                const ONE_TIB: i64 = 1 << 40;
                if !(ONE_MIB..=ONE_TIB).contains(&n) {
                    diags.push(
                        Diagnostic::error(ErrorKind::Range, "lmdb-mapsize must be between 1 MiB and 1 TiB")
                            .at(e.location.clone()),
                    );
                }
            }
        }
        for port_clause in ["port", "query-source port", "controls port"] {
            if let Some(e) = find_all(block, port_clause).next() {
                if let Some(n) = e.args().first().and_then(Token::as_int) {
                    if !(0..65536).contains(&n) {
                        diags.push(
                            Diagnostic::error(ErrorKind::Range, format!("{port_clause} {n} is not a valid port"))
                                .at(e.location.clone()),
                        );
                    }
                }
            }
        }
        for name_clause in ["server-id", "empty-server"] {
            if let Some(e) = find_all(block, name_clause).next() {
                if e.args().first().and_then(Token::as_str).is_none_or(str::is_empty) {
                    diags.push(
                        Diagnostic::error(ErrorKind::Syntax, format!("{name_clause} must be a non-empty string"))
                            .at(e.location.clone()),
                    );
                }
            }
        }
        for channel in find_all(block, "channel") {
            if let Some(chblock) = channel.block() {
                let exclusive = ["file", "syslog", "null", "stderr"];
                let present = exclusive.iter().filter(|kw| find_all(chblock, kw).next().is_some()).count();
                if present != 1 {
                    diags.push(
                        Diagnostic::error(
                            ErrorKind::SemanticConflict,
                            "a log channel must set exactly one of file/syslog/null/stderr",
                        )
                        .at(channel.location.clone()),
                    );
                }
            }
        }
    }
}

/// Pass 2: controls - socket uniqueness (default port applied when
/// unset) and referenced key existence.
fn validate_controls(tree: &ConfigTree, diags: &mut Diagnostics) {
    const DEFAULT_CONTROL_PORT: u16 = 953;
    let key_names: HashSet<&str> = tree.all("key").filter_map(|e| e.args().first().and_then(Token::as_str)).collect();

    let mut sockets: isccfg_cfg::SymbolTable<std::net::SocketAddr, ()> = isccfg_cfg::SymbolTable::new();
    for controls in tree.all("controls") {
        let Some(block) = controls.block() else { continue };
        for inet in find_all(block, "inet") {
            let Some(mut addr) = inet.args().first().and_then(Token::as_socket_addr) else { continue };
            if addr.port() == 0 {
                addr.set_port(DEFAULT_CONTROL_PORT);
            }
            if let Err(prior) = sockets.define(addr, (), inet.location.clone()) {
                diags.push(
                    Diagnostic::error(
                        ErrorKind::Duplicate,
                        format!("duplicate controls socket {addr} (first defined at {})", prior.location),
                    )
                    .at(inet.location.clone()),
                );
            }
            if let Some(keys) = find_all(block, "keys").next().and_then(Entry::block) {
                for k in keys {
                    if let Some(name) = k.tokens.first().and_then(Token::as_str) {
                        if !key_names.contains(name) {
                            diags.push(
                                Diagnostic::error(ErrorKind::MissingReference, format!("key '{name}' is not defined"))
                                    .at(k.location.clone()),
                            );
                        }
                    }
                }
            }
        }
    }
}

/// Pass 3: `remote-servers`/`primaries`/`parental-agents`/`masters` list
/// names must be unique across the whole config, treating the four
/// keywords as synonyms for this check.
fn validate_remote_server_lists(tree: &ConfigTree, diags: &mut Diagnostics) {
    let mut names: isccfg_cfg::SymbolTable<Box<str>, ()> = isccfg_cfg::SymbolTable::new();
    for keyword in ["remote-servers", "primaries", "parental-agents", "masters"] {
        for entry in tree.all(keyword) {
            let Some(name) = entry.args().first().and_then(Token::as_str) else { continue };
            if let Err(prior) = names.define(name.into(), (), entry.location.clone()) {
                diags.push(
                    Diagnostic::error(
                        ErrorKind::Duplicate,
                        format!("remote-server list name '{name}' already used (first defined at {})", prior.location),
                    )
                    .at(entry.location.clone()),
                );
            }
        }
    }
}

/// Pass 4: `http`/`tls` profile names must be unique; `ephemeral` and
/// `none` are reserved; a TLS profile's key-file/cert-file pair must be
/// both-present or both-absent.
fn validate_http_tls_profiles(tree: &ConfigTree, diags: &mut Diagnostics) {
    const RESERVED: [&str; 2] = ["ephemeral", "none"];
    for keyword in ["http", "tls"] {
        let mut names: isccfg_cfg::SymbolTable<Box<str>, ()> = isccfg_cfg::SymbolTable::new();
        for entry in tree.all(keyword) {
            let Some(name) = entry.args().first().and_then(Token::as_str) else { continue };
            if RESERVED.contains(&name) {
                diags.push(
                    Diagnostic::error(ErrorKind::SemanticConflict, format!("'{name}' is a reserved {keyword} name"))
                        .at(entry.location.clone()),
                );
                continue;
            }
            if let Err(prior) = names.define(name.into(), (), entry.location.clone()) {
                diags.push(
                    Diagnostic::error(
                        ErrorKind::Duplicate,
                        format!("duplicate {keyword} name '{name}' (first defined at {})", prior.location),
                    )
                    .at(entry.location.clone()),
                );
            }

            if keyword == "tls" {
                if let Some(block) = entry.block() {
                    let has_key = find_all(block, "key-file").next().is_some();
                    let has_cert = find_all(block, "cert-file").next().is_some();
                    if has_key != has_cert {
                        diags.push(
                            Diagnostic::error(
                                ErrorKind::SemanticConflict,
                                format!("tls '{name}' must set both key-file and cert-file, or neither"),
                            )
                            .at(entry.location.clone()),
                        );
                    }
                }
            }
        }
    }
}

/// Pass 5: for each listener tuple, `tls none` forbids `proxy
/// encrypted`; `http` requires an explicit `tls` setting.
fn validate_listeners(tree: &ConfigTree, diags: &mut Diagnostics) {
    let tls_names: HashSet<&str> = tree.all("tls").filter_map(|e| e.args().first().and_then(Token::as_str)).collect();
    let http_names: HashSet<&str> = tree.all("http").filter_map(|e| e.args().first().and_then(Token::as_str)).collect();

    for listen in tree.all("listen-on").chain(tree.all("listen-on-v6")) {
        let args = listen.args();
        let tls_word = args
            .windows(2)
            .find(|w| w[0].as_str() == Some("tls"))
            .and_then(|w| w[1].as_str());
        let proxy_word = args
            .windows(2)
            .find(|w| w[0].as_str() == Some("proxy"))
            .and_then(|w| w[1].as_str());
        if tls_word == Some("none") && proxy_word == Some("encrypted") {
            diags.push(
                Diagnostic::error(ErrorKind::SemanticConflict, "'tls none' forbids 'proxy encrypted'")
                    .at(listen.location.clone()),
            );
        }
        if let Some(name) = tls_word {
            if !matches!(name, "none" | "ephemeral") && !tls_names.contains(name) {
                diags.push(
                    Diagnostic::error(ErrorKind::MissingReference, format!("tls profile '{name}' is not defined"))
                        .at(listen.location.clone()),
                );
            }
        }
        let http_word = args
            .windows(2)
            .find(|w| w[0].as_str() == Some("http"))
            .and_then(|w| w[1].as_str());
        if http_word.is_some() && tls_word.is_none() {
            diags.push(
                Diagnostic::error(ErrorKind::SemanticConflict, "'http' requires an explicit tls setting")
                    .at(listen.location.clone()),
            );
        }
        if let Some(name) = http_word {
            if !matches!(name, "none" | "ephemeral") && !http_names.contains(name) {
                diags.push(
                    Diagnostic::error(ErrorKind::MissingReference, format!("http profile '{name}' is not defined"))
                        .at(listen.location.clone()),
                );
            }
        }
    }
}

/// Pass 6: per-view ACL presence, `dns64` prefix shape, `rate-limit` and
/// `fetch-quota-params` bounds, and the `recursion`/`allow-recursion`
/// consistency warning.
fn validate_views(tree: &ConfigTree, diags: &mut Diagnostics) {
    let mut view_names: isccfg_cfg::SymbolTable<Box<str>, ()> = isccfg_cfg::SymbolTable::new();
    for view in tree.all("view") {
        let Some(name) = view.args().first().and_then(Token::as_str) else { continue };
        if let Err(prior) = view_names.define(name.into(), (), view.location.clone()) {
            diags.push(
                Diagnostic::error(
                    ErrorKind::Duplicate,
                    format!("duplicate view name '{name}' (first defined at {})", prior.location),
                )
                .at(view.location.clone()),
            );
        }
        let Some(block) = view.block() else { continue };

        for dns64 in find_all(block, "dns64") {
            let Some(prefix) = dns64.args().first() else { continue };
            if let Token::Prefix(p) = prefix {
                const VALID_LENGTHS: [u8; 6] = [32, 40, 48, 56, 64, 96];
                if !VALID_LENGTHS.contains(&p.len) {
                    diags.push(
                        Diagnostic::error(ErrorKind::Range, format!("dns64 prefix length /{} is not valid", p.len))
                            .at(dns64.location.clone()),
                    );
                }
            }
        }

        for rl in find_all(block, "fetch-quota-params") {
            for tok in rl.args() {
                if let Some(p) = tok.as_percentage() {
                    if !(0.0..=1.0).contains(&(p / 100.0)) {
                        diags.push(
                            Diagnostic::error(ErrorKind::Range, "fetch-quota-params value must be in [0,1]")
                                .at(rl.location.clone()),
                        );
                    }
                } else if let Some(n) = tok.as_int() {
                    if !(0.0..=1.0).contains(&(n as f64)) {
                        diags.push(
                            Diagnostic::error(ErrorKind::Range, "fetch-quota-params value must be in [0,1]")
                                .at(rl.location.clone()),
                        );
                    }
                }
            }
        }

        let recursion = find_all(block, "recursion").next().and_then(|e| e.args().first()).and_then(Token::as_bool);
        let allow_recursion_none =
            find_all(block, "allow-recursion").next().and_then(|e| e.args().first()).and_then(Token::as_str)
                == Some("none");
        if recursion == Some(true) && allow_recursion_none {
            diags.push(Diagnostic::warning(
                ErrorKind::SemanticConflict,
                format!("view '{name}' sets recursion yes but allow-recursion none"),
            ));
        }
    }
}

/// Pass 8: trust-anchor cross-validation (§4.4), plus the "both a
/// static root anchor and `dnssec-validation auto`" prohibition.
fn validate_trust_anchors(tree: &ConfigTree, diags: &mut Diagnostics) {
    let checker = trust_anchor_check::run(tree, diags);
    let _ = checker;

    for view in tree.all("view") {
        let Some(block) = view.block() else { continue };
        let auto = matches!(
            find_all(block, "dnssec-validation").next().and_then(|e| e.args().first()),
            Some(Token::Auto)
        );
        let has_static_root = find_all(block, "trust-anchors").filter_map(Entry::block).any(|ta| {
            ta.iter().any(|e| {
                e.tokens.first().and_then(Token::as_str) == Some(".")
                    && e.tokens.get(1).and_then(Token::as_str).is_some_and(|k| k.starts_with("static"))
            })
        });
        if auto && has_static_root {
            diags.push(
                Diagnostic::error(
                    ErrorKind::SemanticConflict,
                    "a static root trust anchor cannot be combined with dnssec-validation auto",
                )
                .at(view.location.clone()),
            );
        }
    }
}

/// P2: zone-name uniqueness within (view, class), with hint zones,
/// redirect zones, and all other types each forming their own scope.
#[derive(Default)]
struct ZoneNameScopes<'a> {
    table: isccfg_cfg::SymbolTable<(Option<&'a str>, u8, String, Box<str>), ()>,
}

fn scope_tag(zone_type: ZoneType) -> u8 {
    match zone_type {
        ZoneType::Hint => 0,
        ZoneType::Redirect => 1,
        _ => 2,
    }
}

#[allow(clippy::too_many_arguments)]
fn validate_one_zone<'a>(
    entry: &'a Entry,
    view: Option<&'a str>,
    gathered: &GatheredConfig<'a>,
    file_registry: &mut ZoneFileRegistry,
    key_dirs: &mut KeyDirectoryRegistry,
    names: &mut ZoneNameScopes<'a>,
    diags: &mut Diagnostics,
) -> Option<ParsedZoneConfig> {
    let parsed = validate_zone(entry, gathered, file_registry, key_dirs, diags)?;

    let key = (view, scope_tag(parsed.zone_type), parsed.origin.to_string(), parsed.class_str.clone());
    if let Err(prior) = names.table.define(key, (), entry.location.clone()) {
        diags.push(
            Diagnostic::error(
                ErrorKind::Duplicate,
                format!(
                    "zone '{}' is already defined in this scope (first defined at {})",
                    parsed.origin, prior.location
                ),
            )
            .at(entry.location.clone()),
        );
    }

    Some(parsed)
}
