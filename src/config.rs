//! Top-level configuration objects gathered from a parsed [`ConfigTree`]:
//! named templates, views, DNSSEC policies (KASPs), and key-stores.
//!
//! Everything here is a thin typed view over the raw tree - none of it
//! copies or re-interprets scalars beyond what's needed to hand a named
//! block to the next pass. The per-zone and per-view semantics live in
//! `validate`.

use std::str::FromStr;

use camino::Utf8PathBuf;
use isccfg_cfg::token::{ConfigTree, Entry, Token};
use isccfg_api::StoredName;

use crate::error::{Diagnostic, Diagnostics, ErrorKind};

/// A named `dnssec-policy "<name>" { ... };` block, not yet interpreted
/// beyond its name and raw entries - the per-zone validator (§4.1 "DNSSEC
/// policy coherence") pulls the fields it needs out of these.
#[derive(Clone, Debug)]
pub struct Kasp<'a> {
    pub name: &'a str,
    pub entries: &'a [Entry],
}

/// A named `key-store "<name>" { directory "<path>"; pkcs11-uri "<uri>"; };`
/// block.
#[derive(Clone, Debug, Default)]
pub struct KeyStore {
    pub name: Box<str>,
    pub directory: Option<Utf8PathBuf>,
    pub pkcs11_uri: Option<Box<str>>,
}

/// A named `template "<name>" { ... };` block.
#[derive(Clone, Debug)]
pub struct Template<'a> {
    pub name: &'a str,
    pub entries: &'a [Entry],
}

/// A named `view "<name>" [ <class> ] { ... };` block.
#[derive(Clone, Debug)]
pub struct View<'a> {
    pub name: &'a str,
    pub class: Option<&'a str>,
    pub entries: &'a [Entry],
}

/// Everything gathered from the top level of the tree in one pass, for
/// the later passes to consult by name.
#[derive(Clone, Debug, Default)]
pub struct GatheredConfig<'a> {
    pub global_options: &'a [Entry],
    pub templates: Vec<Template<'a>>,
    pub views: Vec<View<'a>>,
    pub kasps: Vec<Kasp<'a>>,
    pub key_stores: Vec<KeyStore>,
}

const EMPTY: &[Entry] = &[];

impl<'a> GatheredConfig<'a> {
    pub fn gather(tree: &'a ConfigTree, diags: &mut Diagnostics) -> Self {
        let global_options = tree.first("options").and_then(|e| e.block()).unwrap_or(EMPTY);

        let templates = tree
            .all("template")
            .filter_map(|e| {
                let name = e.args().first()?.as_str()?;
                let entries = e.block()?;
                Some(Template { name, entries })
            })
            .collect();

        let views = tree
            .all("view")
            .filter_map(|e| {
                let name = e.args().first()?.as_str()?;
                let class = e.args().get(1).and_then(|t| t.as_str());
                let entries = e.block()?;
                Some(View {
                    name,
                    class,
                    entries,
                })
            })
            .collect();

        let kasps = tree
            .all("dnssec-policy")
            .filter_map(|e| {
                let name = e.args().first()?.as_str()?;
                let entries = e.block()?;
                Some(Kasp { name, entries })
            })
            .collect();

        let mut key_stores = Vec::new();
        for e in tree.all("key-store") {
            let Some(name) = e.args().first().and_then(|t| t.as_str()) else {
                diags.push(
                    Diagnostic::error(ErrorKind::Syntax, "key-store requires a name").at(e.location.clone()),
                );
                continue;
            };
            if name == "key-directory" {
                diags.push(
                    Diagnostic::error(
                        ErrorKind::SemanticConflict,
                        "'key-directory' is a reserved key-store name",
                    )
                    .at(e.location.clone()),
                );
                continue;
            }
            let mut ks = KeyStore {
                name: name.into(),
                ..Default::default()
            };
            if let Some(block) = e.block() {
                if let Some(dir) = isccfg_cfg::find_one(block, "directory") {
                    if let Some(s) = dir.args().first().and_then(|t| t.as_str()) {
                        ks.directory = Some(Utf8PathBuf::from(s));
                    }
                }
                if let Some(uri) = isccfg_cfg::find_one(block, "pkcs11-uri") {
                    if let Some(s) = uri.args().first().and_then(|t| t.as_str()) {
                        ks.pkcs11_uri = Some(s.into());
                    }
                }
            }
            key_stores.push(ks);
        }

        Self {
            global_options,
            templates,
            views,
            kasps,
            key_stores,
        }
    }

    pub fn template(&self, name: &str) -> Option<&Template<'a>> {
        self.templates.iter().find(|t| t.name == name)
    }

    pub fn kasp(&self, name: &str) -> Option<&Kasp<'a>> {
        self.kasps.iter().find(|k| k.name == name)
    }

    pub fn key_store(&self, name: &str) -> Option<&KeyStore> {
        self.key_stores.iter().find(|k| &*k.name == name)
    }

    /// The server's session-key identity, used to expand `update-policy
    /// local` (§3). `session-keyfile none;` disables session-key
    /// generation entirely, in which case no identity is available;
    /// otherwise the name defaults to `local-ddns` unless overridden by
    /// `session-keyname`.
    pub fn session_key_name(&self) -> Option<StoredName> {
        if let Some(e) = isccfg_cfg::find_one(self.global_options, "session-keyfile") {
            let disabled = match e.args().first() {
                Some(Token::Bool(false)) => true,
                Some(t) => t.as_str() == Some("none"),
                None => false,
            };
            if disabled {
                return None;
            }
        }
        let name = isccfg_cfg::find_one(self.global_options, "session-keyname")
            .and_then(|e| e.args().first())
            .and_then(Token::as_str)
            .unwrap_or("local-ddns");
        StoredName::from_str(name).ok()
    }
}
