//! End-to-end scenario tests (S1-S6) and targeted property checks
//! (P1-P8) driving the real parser and validator over `named.conf`-style
//! text, the way a `named-checkconf` invocation would.

use camino::Utf8PathBuf;
use isccfg::assemble::{self, acl::ViewAclCache, AssembleInputs, AssembledZone};
use isccfg::error::{Diagnostics, ErrorKind};
use isccfg::validate::{self, Flags};
use isccfg_cfg::OptionResolver;

fn has_error_containing(diags: &isccfg::error::Diagnostics, needle: &str) -> bool {
    diags.all().iter().any(|d| d.is_error() && d.message.contains(needle))
}

/// Validate `text`, then run `assemble` over its first zone, using a
/// fresh [`ViewAclCache`] and the server's own gathered session-key
/// identity unless `has_session_key` overrides it off.
fn assemble_first_zone(text: &str, has_session_key: bool) -> (Option<AssembledZone>, Diagnostics) {
    let path = Utf8PathBuf::from("named.conf");
    let tree = isccfg_cfg::parse(&path, text).expect("config parses");
    let result = validate::validate(&tree, Flags::default());
    assert!(!result.diags.has_errors(), "{:?}", result.diags.all());

    let zone = result.zones.into_iter().next().expect("at least one zone");
    let template_entries =
        zone.config.template.as_deref().and_then(|n| result.gathered.template(n)).map(|t| t.entries);
    let view_entries =
        zone.view.and_then(|n| result.gathered.views.iter().find(|v| v.name == n)).map(|v| v.entries);
    let stack = OptionResolver::new(vec![
        Some(zone.block),
        template_entries,
        view_entries,
        Some(result.gathered.global_options),
        None,
    ]);
    let cache = ViewAclCache::default();
    let session_key_name = result.gathered.session_key_name();

    let inputs = AssembleInputs {
        stack,
        gathered: &result.gathered,
        view_acl_cache: &cache,
        has_session_key,
        session_key_name,
        root_server_fallback: assemble::iana_root_servers(),
    };

    let mut diags = Diagnostics::new();
    let assembled = assemble::assemble(zone.config, &inputs, &mut diags);
    (assembled, diags)
}

// S1 - static-stub apex synthesis: the validator accepts the zone and
// hands back server-addresses/server-names for the assembler to turn
// into the apex records (P6 is exercised directly against
// `staticstub::synthesize_static_stub_apex` in `crates/api`).
#[test]
fn s1_static_stub_zone_validates() {
    let path = Utf8PathBuf::from("named.conf");
    let tree = isccfg_cfg::parse(
        &path,
        r#"
        zone "ex" {
            type static-stub;
            server-addresses { 192.0.2.1; 2001:db8::1; };
            server-names { ns.other.tld; };
        };
        "#,
    )
    .expect("config parses");
    let result = validate::validate(&tree, Flags::default());
    assert!(!result.diags.has_errors(), "{:?}", result.diags.all());
    assert_eq!(result.zones.len(), 1);
    let zone = &result.zones[0].config;
    assert_eq!(zone.server_addresses.len(), 2);
    assert_eq!(zone.server_names.len(), 1);
}

// S2 - a zone with a dnssec-policy but no dynamic-update path and no
// inline-signing is rejected citing the KASP requirement.
#[test]
fn s2_kasp_requires_signing() {
    let tree_path = Utf8PathBuf::from("named.conf");
    let tree = isccfg_cfg::parse(
        &tree_path,
        r#"
        dnssec-policy "default" { };
        zone "ex" {
            type primary;
            file "ex.db";
            dnssec-policy "default";
        };
        "#,
    )
    .expect("config parses");
    let result = validate::validate(&tree, Flags::default());
    assert!(result.diags.has_errors());
    assert!(has_error_containing(&result.diags, "dnssec-policy"));
}

// S2 control: the same zone with inline-signing enabled is accepted.
#[test]
fn s2_kasp_with_inline_signing_accepted() {
    let tree_path = Utf8PathBuf::from("named.conf");
    let tree = isccfg_cfg::parse(
        &tree_path,
        r#"
        dnssec-policy "default" { };
        zone "ex" {
            type primary;
            file "ex.db";
            dnssec-policy "default";
            inline-signing yes;
        };
        "#,
    )
    .expect("config parses");
    let result = validate::validate(&tree, Flags::default());
    assert!(!result.diags.has_errors(), "{:?}", result.diags.all());
}

// S3 - a mirror zone with `notify yes` is rejected.
#[test]
fn s3_mirror_zone_notify_yes_rejected() {
    let tree_path = Utf8PathBuf::from("named.conf");
    let tree = isccfg_cfg::parse(
        &tree_path,
        r#"
        zone "ex" {
            type mirror;
            primaries { 192.0.2.1; };
            notify yes;
        };
        "#,
    )
    .expect("config parses");
    let result = validate::validate(&tree, Flags::default());
    assert!(result.diags.has_errors());
    assert!(has_error_containing(
        &result.diags,
        "mirror zones can only be used with notify no or notify explicit"
    ));
}

// S3 control: `notify no` and `notify explicit` are both accepted.
#[test]
fn s3_mirror_zone_notify_no_or_explicit_accepted() {
    for notify in ["no", "explicit"] {
        let tree_path = Utf8PathBuf::from("named.conf");
        let text = format!(
            r#"
            zone "ex" {{
                type mirror;
                primaries {{ 192.0.2.1; }};
                notify {notify};
            }};
            "#
        );
        let tree = isccfg_cfg::parse(&tree_path, &text).expect("config parses");
        let result = validate::validate(&tree, Flags::default());
        assert!(!result.diags.has_errors(), "notify {notify}: {:?}", result.diags.all());
    }
}

// S4 - `update-policy local;` is accepted by the validator regardless of
// whether the server has a session key; that check is the assembler's
// job (§4.2 step 6), not the validator's.
#[test]
fn s4_update_policy_local_accepted_syntactically() {
    let tree_path = Utf8PathBuf::from("named.conf");
    let tree = isccfg_cfg::parse(
        &tree_path,
        r#"
        zone "ex" {
            type primary;
            file "ex.db";
            update-policy local;
        };
        "#,
    )
    .expect("config parses");
    let result = validate::validate(&tree, Flags::default());
    assert!(!result.diags.has_errors(), "{:?}", result.diags.all());
    let parsed = &result.zones[0].config;
    assert!(matches!(parsed.update_policy, Some(isccfg::validate::zone::UpdatePolicySource::Local)));
}

// S5 - two primary zones sharing a writable file are rejected.
#[test]
fn s5_duplicate_writable_file_rejected() {
    let tree_path = Utf8PathBuf::from("named.conf");
    let tree = isccfg_cfg::parse(
        &tree_path,
        r#"
        zone "a" { type primary; file "shared.db"; };
        zone "b" { type primary; file "shared.db"; };
        "#,
    )
    .expect("config parses");
    let result = validate::validate(&tree, Flags::default());
    assert!(result.diags.has_errors());
    assert!(has_error_containing(&result.diags, "shared.db': already in use"));
}

// S6 - a static root anchor in one scope and an initializing root
// anchor in another are rejected together.
#[test]
fn s6_trust_anchor_conflict_rejected() {
    let tree_path = Utf8PathBuf::from("named.conf");
    let tree = isccfg_cfg::parse(
        &tree_path,
        r#"
        trust-anchors {
            "." static-key 257 3 8 "AwEAAagAIKlVZrpC6Ia7gEzahOR+9W29euxhJhVVLOyQbSEW0O8gcCjF";
        };
        view "v" {
            match-clients { any; };
            trust-anchors {
                "." initial-key 257 3 8 "AwEAAagAIKlVZrpC6Ia7gEzahOR+9W29euxhJhVVLOyQbSEW0O8gcCjF";
            };
        };
        "#,
    )
    .expect("config parses");
    let result = validate::validate(&tree, Flags::default());
    assert!(result.diags.has_errors());
    assert!(has_error_containing(
        &result.diags,
        "static and initializing keys cannot be used for the same domain"
    ));
}

// P1 - a clause illegal for the zone's type is rejected (a hint zone may
// not declare primaries).
#[test]
fn p1_clause_illegal_for_zone_type_rejected() {
    let tree_path = Utf8PathBuf::from("named.conf");
    let tree = isccfg_cfg::parse(
        &tree_path,
        r#"
        zone "." {
            type hint;
            file "root.hint";
            primaries { 192.0.2.1; };
        };
        "#,
    )
    .expect("config parses");
    let result = validate::validate(&tree, Flags::default());
    assert!(result.diags.has_errors(), "{:?}", result.diags.all());
}

// P2 - the same zone name defined twice in the same (view, scope) is
// rejected; hint/redirect/other are separate scopes so a `.` hint and a
// `.` ordinary zone do not collide. Also check same names in distinct
// views is fine.
#[test]
fn p2_zone_name_uniqueness_scoped() {
    let tree_path = Utf8PathBuf::from("named.conf");
    let tree = isccfg_cfg::parse(
        &tree_path,
        r#"
        zone "ex" { type primary; file "a.db"; };
        zone "ex" { type primary; file "b.db"; };
        "#,
    )
    .expect("config parses");
    let result = validate::validate(&tree, Flags::default());
    assert!(result.diags.has_errors());
    assert!(has_error_containing(&result.diags, "is already defined in this scope"));

    let tree2 = isccfg_cfg::parse(
        &tree_path,
        r#"
        view "one" {
            match-clients { any; };
            zone "ex" { type primary; file "a.db"; };
        };
        view "two" {
            match-clients { none; };
            zone "ex" { type primary; file "b.db"; };
        };
        "#,
    )
    .expect("config parses");
    let result2 = validate::validate(&tree2, Flags::default());
    assert!(!result2.diags.has_errors(), "{:?}", result2.diags.all());
}

// P3 - a writable file may not be referenced by any other zone, even a
// read-only secondary.
#[test]
fn p3_writable_file_exclusivity_blocks_secondary_reference() {
    let tree_path = Utf8PathBuf::from("named.conf");
    let tree = isccfg_cfg::parse(
        &tree_path,
        r#"
        zone "a" { type primary; file "shared.db"; };
        zone "b" { type secondary; primaries { 192.0.2.1; }; file "shared.db"; };
        "#,
    )
    .expect("config parses");
    let result = validate::validate(&tree, Flags::default());
    assert!(result.diags.has_errors());
    assert!(has_error_containing(&result.diags, "already in use"));
}

// P4 - the same dichotomy as S6, checked against DS-form anchors too.
#[test]
fn p4_static_and_initializing_ds_conflict() {
    let tree_path = Utf8PathBuf::from("named.conf");
    let tree = isccfg_cfg::parse(
        &tree_path,
        r#"
        trust-anchors {
            "example." static-ds 12345 8 2 "0123456789ABCDEF0123456789ABCDEF0123456789ABCDEF0123456789ABCD";
            "example." initial-ds 12345 8 2 "0123456789ABCDEF0123456789ABCDEF0123456789ABCDEF0123456789ABCD";
        };
        "#,
    )
    .expect("config parses");
    let result = validate::validate(&tree, Flags::default());
    assert!(result.diags.has_errors());
    assert!(has_error_containing(
        &result.diags,
        "static and initializing keys cannot be used for the same domain"
    ));
}

// P8 - option resolution precedence: zone scope beats view scope beats
// global scope.
#[test]
fn p8_option_resolution_precedence() {
    let global: Vec<isccfg_cfg::token::Entry> = isccfg_cfg::parse(
        &Utf8PathBuf::from("g.conf"),
        "options { max-rsa-exponent 0; };",
    )
    .unwrap()
    .first("options")
    .unwrap()
    .block()
    .unwrap()
    .to_vec();
    let view: Vec<isccfg_cfg::token::Entry> =
        isccfg_cfg::parse(&Utf8PathBuf::from("v.conf"), "v { max-rsa-exponent 40; };")
            .unwrap()
            .first("v")
            .unwrap()
            .block()
            .unwrap()
            .to_vec();
    let zone: Vec<isccfg_cfg::token::Entry> =
        isccfg_cfg::parse(&Utf8PathBuf::from("z.conf"), "z { max-rsa-exponent 80; };")
            .unwrap()
            .first("z")
            .unwrap()
            .block()
            .unwrap()
            .to_vec();

    let stack = isccfg_cfg::OptionResolver::new(vec![Some(&zone), Some(&view), Some(&global)]);
    let winner = stack.resolve("max-rsa-exponent").and_then(|e| e.args().first()).and_then(isccfg_cfg::token::Token::as_int);
    assert_eq!(winner, Some(80));

    let stack_no_zone = isccfg_cfg::OptionResolver::new(vec![None, Some(&view), Some(&global)]);
    let winner = stack_no_zone.resolve("max-rsa-exponent").and_then(|e| e.args().first()).and_then(isccfg_cfg::token::Token::as_int);
    assert_eq!(winner, Some(40));
}

// A forward zone covering RFC1918 private space without an explicit
// `forward` mode gets a warning, not an error.
#[test]
fn forward_zone_over_private_space_warns_without_explicit_mode() {
    let tree_path = Utf8PathBuf::from("named.conf");
    let tree = isccfg_cfg::parse(
        &tree_path,
        r#"
        zone "10.in-addr.arpa" {
            type forward;
            forwarders { 192.0.2.53; };
        };
        "#,
    )
    .expect("config parses");
    let result = validate::validate(&tree, Flags::default());
    assert!(!result.diags.has_errors(), "{:?}", result.diags.all());
    assert!(result.diags.all().iter().any(|d| !d.is_error() && d.message.contains("private address space")));
}

// The same zone with an explicit `forward only;` clause gets no warning.
#[test]
fn forward_zone_with_explicit_mode_has_no_warning() {
    let tree_path = Utf8PathBuf::from("named.conf");
    let tree = isccfg_cfg::parse(
        &tree_path,
        r#"
        zone "10.in-addr.arpa" {
            type forward;
            forward only;
            forwarders { 192.0.2.53; };
        };
        "#,
    )
    .expect("config parses");
    let result = validate::validate(&tree, Flags::default());
    assert!(!result.diags.all().iter().any(|d| d.message.contains("private address space")));
}

// min-transfer-rate-in with zero bytes is rejected.
#[test]
fn min_transfer_rate_in_zero_bytes_rejected() {
    let tree_path = Utf8PathBuf::from("named.conf");
    let tree = isccfg_cfg::parse(
        &tree_path,
        r#"
        zone "ex" {
            type secondary;
            primaries { 192.0.2.1; };
            min-transfer-rate-in 0 10;
        };
        "#,
    )
    .expect("config parses");
    let result = validate::validate(&tree, Flags::default());
    assert!(has_error_containing(&result.diags, "min-transfer-rate-in"));
}

// masterfile-style is only meaningful with the text format.
#[test]
fn masterfile_style_with_raw_format_rejected() {
    let tree_path = Utf8PathBuf::from("named.conf");
    let tree = isccfg_cfg::parse(
        &tree_path,
        r#"
        zone "ex" {
            type primary;
            file "ex.db";
            masterfile-format raw;
            masterfile-style full;
        };
        "#,
    )
    .expect("config parses");
    let result = validate::validate(&tree, Flags::default());
    assert!(has_error_containing(&result.diags, "masterfile-style"));
}

// Valid, boring configuration with a view, an ACL, and a secondary zone
// should simply pass clean.
#[test]
fn clean_configuration_has_no_diagnostics() {
    let tree_path = Utf8PathBuf::from("named.conf");
    let tree = isccfg_cfg::parse(
        &tree_path,
        r#"
        acl "trusted" { 192.0.2.0/24; };
        options {
            allow-query { trusted; };
        };
        view "internal" {
            match-clients { trusted; };
            zone "ex" {
                type primary;
                file "ex.db";
            };
        };
        view "external" {
            match-clients { any; };
            zone "ex" {
                type secondary;
                primaries { 192.0.2.1; };
            };
        };
        "#,
    )
    .expect("config parses");
    let result = validate::validate(&tree, Flags::default());
    assert!(!result.diags.has_errors(), "{:?}", result.diags.all());
    assert_eq!(result.zones.len(), 2);
}

// S1, assembled: a static-stub zone's apex synthesizes without error and
// produces a served zone with no raw (inline-signing) counterpart.
#[test]
fn assemble_static_stub_zone_synthesizes_apex() {
    let (assembled, diags) = assemble_first_zone(
        r#"
        zone "ex" {
            type static-stub;
            server-addresses { 192.0.2.1; 2001:db8::1; };
            server-names { ns.other.tld; };
        };
        "#,
        false,
    );
    assert!(!diags.has_errors(), "{:?}", diags.all());
    let assembled = assembled.expect("static-stub zone assembles");
    assert_eq!(assembled.zone.zone_type, isccfg_api::ZoneType::StaticStub);
    assert!(assembled.raw.is_none());
}

// A root-zone mirror with no explicit primaries falls back to the
// compiled-in IANA root-server list.
#[test]
fn assemble_root_mirror_falls_back_to_iana_root_servers() {
    let (assembled, diags) = assemble_first_zone(
        r#"
        zone "." {
            type mirror;
            notify no;
        };
        "#,
        false,
    );
    assert!(!diags.has_errors(), "{:?}", diags.all());
    let assembled = assembled.expect("root mirror zone assembles");
    assert_eq!(assembled.zone.transfer.primaries.len(), assemble::iana_root_servers().len());
}

// S4, assembled: `update-policy local` expands to an SSU table naming the
// server's session-key identity when one is present.
#[test]
fn assemble_update_policy_local_expands_with_session_key() {
    let (assembled, diags) = assemble_first_zone(
        r#"
        zone "ex" {
            type primary;
            file "ex.db";
            update-policy local;
        };
        "#,
        true,
    );
    assert!(!diags.has_errors(), "{:?}", diags.all());
    let assembled = assembled.expect("zone assembles with a session key present");
    assert!(assembled.zone.serving.update_policy.is_some());
}

// S4, assembled: without a session key, `update-policy local` is a fatal
// assembly error (the validator already accepted it syntactically).
#[test]
fn assemble_update_policy_local_without_session_key_fails() {
    let (assembled, diags) = assemble_first_zone(
        r#"
        zone "ex" {
            type primary;
            file "ex.db";
            update-policy local;
        };
        "#,
        false,
    );
    assert!(assembled.is_none());
    assert!(has_error_containing(&diags, "no session key"));
}

// Inline-signing splits the zone into a served (signed) zone and a raw
// zone reading from the original file.
#[test]
fn assemble_inline_signing_splits_raw_and_signed_zones() {
    let (assembled, diags) = assemble_first_zone(
        r#"
        zone "ex" {
            type primary;
            file "ex.db";
            inline-signing yes;
        };
        "#,
        false,
    );
    assert!(!diags.has_errors(), "{:?}", diags.all());
    let assembled = assembled.expect("inline-signed zone assembles");
    let raw = assembled.raw.expect("inline-signing produces a raw zone");
    assert_eq!(raw.files.file.as_ref().unwrap().as_str(), "ex.db");
    assert_eq!(assembled.zone.files.file.as_ref().unwrap().as_str(), "ex.db.signed");
}

// checkds inference: a primary zone with parental-agents set but no
// explicit checkds defaults to "explicit" rather than being left unset.
#[test]
fn assemble_checkds_defaults_to_explicit_with_parental_agents() {
    let (assembled, diags) = assemble_first_zone(
        r#"
        zone "ex" {
            type primary;
            file "ex.db";
            parental-agents { 192.0.2.53; };
        };
        "#,
        false,
    );
    assert!(!diags.has_errors(), "{:?}", diags.all());
    let assembled = assembled.expect("zone assembles");
    assert_eq!(assembled.zone.transfer.checkds, Some(isccfg_api::CheckDsMode::Explicit));
}

// An explicit `checkds yes;` always wins over the parental-agents default.
#[test]
fn assemble_checkds_explicit_setting_wins() {
    let (assembled, diags) = assemble_first_zone(
        r#"
        zone "ex" {
            type primary;
            file "ex.db";
            parental-agents { 192.0.2.53; };
            checkds yes;
        };
        "#,
        false,
    );
    assert!(!diags.has_errors(), "{:?}", diags.all());
    let assembled = assembled.expect("zone assembles");
    assert_eq!(assembled.zone.transfer.checkds, Some(isccfg_api::CheckDsMode::Yes));
}

// Size/record limits are parsed through the same option-resolution stack
// as everything else, including a percentage form for max-journal-size.
#[test]
fn assemble_limits_parsed_from_option_stack() {
    let (assembled, diags) = assemble_first_zone(
        r#"
        zone "ex" {
            type primary;
            file "ex.db";
            max-records 1000;
            max-records-per-type 10;
            max-types-per-name 5;
            max-journal-size 50%;
            max-ixfr-ratio 25%;
        };
        "#,
        false,
    );
    assert!(!diags.has_errors(), "{:?}", diags.all());
    let assembled = assembled.expect("zone assembles");
    let limits = &assembled.zone.limits;
    assert_eq!(limits.max_records, Some(1000));
    assert_eq!(limits.max_records_per_type, Some(10));
    assert_eq!(limits.max_types_per_name, Some(5));
    assert_eq!(limits.max_journal_size, Some(isccfg_api::SizeOrPercent::Percent(50.0)));
    assert_eq!(limits.max_ixfr_ratio, Some(isccfg_api::SizeOrPercent::Percent(25.0)));
}

// A named dnssec-policy's nsec3param/signatures-* clauses populate the
// zone's NSEC3 parameters and signing intervals, overriding the
// zone-level default.
#[test]
fn assemble_dnssec_policy_populates_nsec3_and_intervals_from_kasp() {
    let (assembled, diags) = assemble_first_zone(
        r#"
        dnssec-policy "strict" {
            nsec3param iterations 10 optout no salt-length 8;
            signatures-validity 1209600;
            signatures-refresh 604800;
            signatures-jitter 43200;
        };
        zone "ex" {
            type primary;
            file "ex.db";
            inline-signing yes;
            dnssec-policy "strict";
        };
        "#,
        false,
    );
    assert!(!diags.has_errors(), "{:?}", diags.all());
    let assembled = assembled.expect("zone assembles");
    let nsec3 = assembled.zone.dnssec.nsec3.expect("kasp sets nsec3 params");
    assert_eq!(nsec3.iterations, 10);
    assert_eq!(nsec3.salt_length, 8);
    assert!(!nsec3.opt_out);
    assert_eq!(assembled.zone.dnssec.signing_intervals.signature_validity_secs, 1_209_600);
    assert_eq!(assembled.zone.dnssec.signing_intervals.signature_refresh_secs, 604_800);
    assert_eq!(assembled.zone.dnssec.signing_intervals.jitter_secs, 43_200);
}

// Sibling zones in the same view reuse the same view-level ACL rather
// than re-resolving it, and the cache is populated from whichever
// default scope (view, global, or builtin) actually supplied the ACL.
#[test]
fn assemble_view_acl_cache_shared_across_sibling_zones() {
    let path = Utf8PathBuf::from("named.conf");
    let tree = isccfg_cfg::parse(
        &path,
        r#"
        acl "trusted" { 192.0.2.0/24; };
        view "internal" {
            match-clients { trusted; };
            allow-query { trusted; };
            zone "a" { type primary; file "a.db"; };
            zone "b" { type primary; file "b.db"; };
        };
        "#,
    )
    .expect("config parses");
    let result = validate::validate(&tree, Flags::default());
    assert!(!result.diags.has_errors(), "{:?}", result.diags.all());
    assert_eq!(result.zones.len(), 2);

    let cache = ViewAclCache::default();
    let session_key_name = result.gathered.session_key_name();
    let mut zones = Vec::new();
    for zone in &result.zones {
        let view_entries = zone.view.and_then(|n| result.gathered.views.iter().find(|v| v.name == n)).map(|v| v.entries);
        let stack = OptionResolver::new(vec![
            Some(zone.block),
            None,
            view_entries,
            Some(result.gathered.global_options),
            None,
        ]);
        let inputs = AssembleInputs {
            stack,
            gathered: &result.gathered,
            view_acl_cache: &cache,
            has_session_key: session_key_name.is_some(),
            session_key_name: session_key_name.clone(),
            root_server_fallback: assemble::iana_root_servers(),
        };
        let mut diags = Diagnostics::new();
        let assembled = assemble::assemble(zone.config.clone(), &inputs, &mut diags);
        assert!(!diags.has_errors(), "{:?}", diags.all());
        zones.push(assembled.expect("zone assembles").zone);
    }

    assert_eq!(zones[0].serving.allow_query, zones[1].serving.allow_query);
    assert_eq!(cache.get("allow-query"), zones[0].serving.allow_query);
}
