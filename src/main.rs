//! `named-checkconf`: reads a `named.conf`-style file, runs the
//! semantic validator over it, logs every diagnostic found, and exits
//! with the status §6 documents (0 on success, non-zero on any
//! reported error).

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{crate_authors, crate_version, Arg, ArgAction, Command};
use isccfg::assemble::{self, acl::ViewAclCache, AssembleInputs};
use isccfg::error::ExitError;
use isccfg::validate::{self, Flags};
use isccfg_cfg::OptionResolver;

fn cli() -> Command {
    Command::new("named-checkconf")
        .version(crate_version!())
        .author(crate_authors!())
        .next_line_help(true)
        .arg(
            Arg::new("filename")
                .default_value("/etc/named.conf")
                .help("The configuration file to check"),
        )
        .arg(
            Arg::new("check_plugins")
                .long("check-plugins")
                .action(ArgAction::SetTrue)
                .help("Also validate referenced plugin paths"),
        )
        .arg(
            Arg::new("check_dnssec_algorithms")
                .long("check-dnssec-algorithms")
                .action(ArgAction::SetTrue)
                .help("Also validate DNSSEC algorithm support"),
        )
}

fn main() -> ExitCode {
    isccfg::log::init();

    let matches = cli().get_matches();
    let filename: &String = matches.get_one("filename").expect("has a default");
    let flags = Flags {
        check_plugins: matches.get_flag("check_plugins"),
        check_dnssec_algorithms: matches.get_flag("check_dnssec_algorithms"),
    };

    let path = Utf8PathBuf::from_path_buf(PathBuf::from(filename)).unwrap_or_else(|p| {
        eprintln!("named-checkconf: '{}' is not a valid UTF-8 path", p.display());
        std::process::exit(ExitError::FAILURE);
    });

    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("named-checkconf: couldn't read '{path}': {e}");
            return ExitCode::from(ExitError::FAILURE as u8);
        }
    };

    let tree = match isccfg_cfg::parse(&path, &text) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("{path}: {e}");
            return ExitCode::from(ExitError::FAILURE as u8);
        }
    };

    let mut result = validate::validate(&tree, flags);

    let mut assembled_count = 0;
    if result.diags.status().is_ok() {
        let session_key_name = result.gathered.session_key_name();
        let root_server_fallback = assemble::iana_root_servers();
        let mut view_caches: HashMap<Option<&str>, ViewAclCache> = HashMap::new();

        for zone in std::mem::take(&mut result.zones) {
            let template_entries =
                zone.config.template.as_deref().and_then(|name| result.gathered.template(name)).map(|t| t.entries);
            let view_entries =
                zone.view.and_then(|name| result.gathered.views.iter().find(|v| v.name == name)).map(|v| v.entries);

            let stack = OptionResolver::new(vec![
                Some(zone.block),
                template_entries,
                view_entries,
                Some(result.gathered.global_options),
                None,
            ]);
            let cache: &ViewAclCache = &*view_caches.entry(zone.view).or_default();

            let inputs = AssembleInputs {
                stack,
                gathered: &result.gathered,
                view_acl_cache: cache,
                has_session_key: session_key_name.is_some(),
                session_key_name: session_key_name.clone(),
                root_server_fallback: root_server_fallback.clone(),
            };

            if let Some(assembled) = assemble::assemble(zone.config, &inputs, &mut result.diags) {
                assembled_count += 1 + assembled.raw.is_some() as usize;
            }
        }
    }

    for diagnostic in result.diags.all() {
        isccfg::log::report("checkconf", diagnostic);
        if diagnostic.is_error() {
            eprintln!("{diagnostic}");
        } else {
            eprintln!("warning: {diagnostic}");
        }
    }

    let status = result.diags.status();
    if status.is_ok() {
        println!("{path}: {assembled_count} zones assembled OK");
    }
    ExitCode::from(ExitError::code(&status) as u8)
}
