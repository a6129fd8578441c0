//! `TrustAnchorChecker` (component C8, §4.4): cross-validates static vs
//! initializing DNSSEC trust anchors across every view.

use base64::Engine;
use isccfg_api::{StoredName, TrustAnchor, TrustAnchorKind};
use isccfg_cfg::token::{find_all, Entry, Location, Token};
use isccfg_cfg::SymbolTable;

use crate::error::{Diagnostic, Diagnostics, ErrorKind};

/// The 2010 IANA root KSK's DS record bytes (keytag 19036, algorithm 8,
/// digest type 2, SHA-256 digest), used for exact byte-match detection
/// (§4.4 step 4).
const ROOT_KSK_2010_DS: [u8; 32] = [
    0x49, 0xaa, 0xc1, 0x1d, 0x7b, 0x6f, 0x64, 0x46, 0x70, 0x2e, 0x54, 0xa1, 0x60, 0x73, 0x71, 0x60,
    0x7a, 0x1a, 0x41, 0x85, 0x52, 0x00, 0xfd, 0x2c, 0xe1, 0xcd, 0xde, 0x32, 0xf2, 0x4e, 0x8f, 0xb0,
];
const ROOT_KSK_2010_KEYTAG: u16 = 19036;

/// The 2017 IANA root KSK's DS record bytes (keytag 20326).
const ROOT_KSK_2017_DS: [u8; 32] = [
    0xe0, 0x6d, 0x44, 0xb8, 0x0b, 0x8f, 0x1d, 0x39, 0xa9, 0x5c, 0x0b, 0x0d, 0x7c, 0x65, 0xd0, 0x84,
    0x58, 0xe8, 0x80, 0x40, 0x9b, 0xbc, 0x68, 0x34, 0x57, 0x10, 0x42, 0x37, 0xc7, 0xf8, 0xec, 0x80,
];
const ROOT_KSK_2017_KEYTAG: u16 = 20326;

/// Which of the two well-known IANA root KSKs a view's trust anchors
/// mention (§4.4 step 4).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RootKskFlags {
    pub has_2010: bool,
    pub has_2017: bool,
}

/// Parse every `"<name>" <kind> <i1> <i2> <i3> "<data>";` entry of a
/// `trust-anchors { ... };` block (§6 "Trust-anchor surface").
pub fn parse_trust_anchors(block: &[Entry], diags: &mut Diagnostics) -> Vec<(TrustAnchor, Location)> {
    let mut anchors = Vec::new();
    for entry in block {
        let toks = &entry.tokens;
        let (Some(owner_str), Some(kind_str), Some(i1), Some(i2), Some(i3), Some(data_str)) = (
            toks.first().and_then(Token::as_str),
            toks.get(1).and_then(Token::as_str),
            toks.get(2).and_then(Token::as_int),
            toks.get(3).and_then(Token::as_int),
            toks.get(4).and_then(Token::as_int),
            toks.get(5).and_then(Token::as_str),
        ) else {
            diags.push(
                Diagnostic::error(ErrorKind::Syntax, "malformed trust-anchor entry").at(entry.location.clone()),
            );
            continue;
        };

        let Some(kind) = TrustAnchorKind::parse(kind_str) else {
            diags.push(
                Diagnostic::error(ErrorKind::Syntax, format!("unrecognized trust-anchor kind '{kind_str}'"))
                    .at(entry.location.clone()),
            );
            continue;
        };

        let Ok(owner) = owner_str.to_ascii_lowercase().parse::<StoredName>() else {
            diags.push(
                Diagnostic::error(ErrorKind::Syntax, format!("invalid trust-anchor owner '{owner_str}'"))
                    .at(entry.location.clone()),
            );
            continue;
        };

        let fields: [(&str, i64, i64); 3] = if kind.is_dnskey_form() {
            [("flags", i1, 65535), ("protocol", i2, 255), ("algorithm", i3, 255)]
        } else {
            [("keytag", i1, 65535), ("algorithm", i2, 255), ("digest-type", i3, 255)]
        };
        for (label, value, max) in fields {
            if !(0..=max).contains(&value) {
                diags.push(
                    Diagnostic::error(ErrorKind::Range, format!("trust-anchor {label} out of range: {value}"))
                        .at(entry.location.clone()),
                );
            }
        }

        let data = if kind.is_dnskey_form() {
            match base64::engine::general_purpose::STANDARD.decode(data_str) {
                Ok(d) => d,
                Err(_) => {
                    diags.push(
                        Diagnostic::error(ErrorKind::Syntax, "trust-anchor data is not valid base64")
                            .at(entry.location.clone()),
                    );
                    continue;
                }
            }
        } else {
            match hex::decode(data_str) {
                Ok(d) => d,
                Err(_) => {
                    diags.push(
                        Diagnostic::error(ErrorKind::Syntax, "trust-anchor data is not valid hex")
                            .at(entry.location.clone()),
                    );
                    continue;
                }
            }
        };

        let anchor = TrustAnchor {
            owner,
            kind,
            i1: i1 as u16,
            i2: i2 as u16,
            i3: i3 as u16,
            data,
        };

        if anchor.is_weak_rsa_exponent() {
            diags.push(
                Diagnostic::warning(
                    ErrorKind::Range,
                    format!("trust-anchor for '{owner_str}' uses a weak RSA exponent"),
                )
                .at(entry.location.clone()),
            );
        }

        anchors.push((anchor, entry.location.clone()));
    }
    anchors
}

/// Runs the cross-validation passes of §4.4 over the anchors gathered
/// from global options plus every view.
pub struct TrustAnchorChecker {
    static_table: SymbolTable<StoredName, TrustAnchorKind>,
    ds_table: SymbolTable<StoredName, TrustAnchorKind>,
    pub root_kskflags: RootKskFlags,
}

impl TrustAnchorChecker {
    pub fn new() -> Self {
        Self {
            static_table: SymbolTable::new(),
            ds_table: SymbolTable::new(),
            root_kskflags: RootKskFlags::default(),
        }
    }

    /// Step 1: record owner + kind; steps 2 and 4 are evaluated as each
    /// anchor streams in, since both only need the running tables so far.
    pub fn observe(&mut self, anchor: &TrustAnchor, location: &Location, diags: &mut Diagnostics) {
        if anchor.kind.is_static() {
            let _ = self
                .static_table
                .define(anchor.owner.clone(), anchor.kind, location.clone());
        }
        if matches!(anchor.kind, TrustAnchorKind::StaticDs | TrustAnchorKind::InitialDs) {
            let _ = self.ds_table.define(anchor.owner.clone(), anchor.kind, location.clone());
        }

        if anchor.kind.is_initializing() {
            if self.static_table.get(&anchor.owner).is_some() {
                diags.push(
                    Diagnostic::error(
                        ErrorKind::SemanticConflict,
                        "static and initializing keys cannot be used for the same domain",
                    )
                    .at(location.clone()),
                );
            }
        }

        if anchor.owner.is_root() && matches!(anchor.kind, TrustAnchorKind::StaticDs | TrustAnchorKind::InitialDs) {
            if anchor.i1 == ROOT_KSK_2010_KEYTAG && anchor.data.as_slice() == ROOT_KSK_2010_DS {
                self.root_kskflags.has_2010 = true;
            }
            if anchor.i1 == ROOT_KSK_2017_KEYTAG && anchor.data.as_slice() == ROOT_KSK_2017_DS {
                self.root_kskflags.has_2017 = true;
            }
        }
    }

    /// Step 4's warning: "2010 key configured without the 2017 key".
    pub fn finish(&self, diags: &mut Diagnostics) {
        if self.root_kskflags.has_2010 && !self.root_kskflags.has_2017 {
            diags.push(Diagnostic::warning(
                ErrorKind::Range,
                "root trust anchor configures the 2010 IANA KSK without the 2017 KSK",
            ));
        }
    }
}

impl Default for TrustAnchorChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// Find every `trust-anchors { ... };` block anywhere in `tree` (global
/// and per-view) and feed its anchors through a fresh [`TrustAnchorChecker`].
pub fn run(tree: &isccfg_cfg::ConfigTree, diags: &mut Diagnostics) -> TrustAnchorChecker {
    let mut checker = TrustAnchorChecker::new();

    let mut blocks: Vec<&[Entry]> = tree.all("trust-anchors").filter_map(Entry::block).collect();

    for view in tree.all("view") {
        if let Some(view_block) = view.block() {
            blocks.extend(find_all(view_block, "trust-anchors").filter_map(Entry::block));
        }
    }

    for block in blocks {
        for (anchor, location) in parse_trust_anchors(block, diags) {
            checker.observe(&anchor, &location, diags);
        }
    }

    checker.finish(diags);
    checker
}
