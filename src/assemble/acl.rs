//! ACL attachment (§4.2.1 `configure_zone_acl`).

use isccfg_api::{AclElement, AclRef, InlineAcl, ScopedAcl, Transport};
use isccfg_cfg::token::{Entry, Token};
use isccfg_cfg::OptionResolver;

/// Interpret a single token as an [`AclRef`]: a built-in name, a
/// user-defined name, or an inline address-match list.
pub fn parse_acl_ref(tok: &Token) -> Option<AclRef> {
    match tok {
        Token::Str(s) => Some(match s.as_str() {
            "any" => AclRef::Any,
            "none" => AclRef::None,
            "localhost" => AclRef::Localhost,
            "localnets" => AclRef::Localnets,
            other => AclRef::Named(other.into()),
        }),
        Token::Block(entries) => Some(AclRef::Inline(parse_inline_acl(entries))),
        _ => None,
    }
}

/// Parse a `{ <elem>; ... }` address-match list.
pub fn parse_inline_acl(entries: &[Entry]) -> InlineAcl {
    InlineAcl {
        elements: entries.iter().filter_map(|e| parse_acl_element(e.tokens.first()?)).collect(),
    }
}

fn parse_acl_element(tok: &Token) -> Option<AclElement> {
    Some(match tok {
        Token::IpAddr(a) => AclElement::Addr(*a),
        Token::Prefix(p) => AclElement::Prefix(p.addr, p.len),
        Token::Str(s) => AclElement::Named(s.clone().into()),
        Token::Negated(inner) => AclElement::Negated(Box::new(parse_acl_element(inner)?)),
        Token::Block(entries) => AclElement::Nested(parse_inline_acl(entries)),
        _ => return None,
    })
}

/// Result of the ordered lookup in §4.2.1: the resolved ACL, plus
/// whether it came from the view level (and so should be cached on the
/// view for sibling zones to reuse) or was zone/template-specific (and
/// so must not be cached).
pub struct AclAttachment {
    pub acl: AclRef,
    pub from_view_or_deeper: bool,
}

/// `configure_zone_acl(zone, acl-kind)`: the fixed lookup order
/// [zone, template, view, global, builtin-default], returning the first
/// scope that defines `clause`.
pub fn attach_acl(stack: &OptionResolver<'_>, clause: &str, builtin_default: AclRef) -> AclAttachment {
    match stack.resolve_with_scope(clause) {
        Some((scope, entry)) => {
            let tok = entry.args().first();
            let acl = tok.and_then(parse_acl_ref).unwrap_or_else(|| builtin_default.clone());
            AclAttachment {
                acl,
                // Scope 0 is the zone itself, per the fixed stack order
                // built by the assembler (§4.2 step 1): only a zone-level
                // match must not be cached on the view.
                from_view_or_deeper: scope > 0,
            }
        }
        None => AclAttachment {
            acl: builtin_default,
            from_view_or_deeper: true,
        },
    }
}

/// A per-view cache of ACLs resolved from the view level or above
/// (global options, or the builtin default), so that every zone in the
/// same view that inherits e.g. `allow-query` from its view resolves it
/// once rather than re-walking the option stack per zone.
#[derive(Default)]
pub struct ViewAclCache {
    entries: std::cell::RefCell<std::collections::HashMap<&'static str, AclRef>>,
}

impl ViewAclCache {
    pub fn get(&self, clause: &'static str) -> Option<AclRef> {
        self.entries.borrow().get(clause).cloned()
    }

    pub fn insert(&self, clause: &'static str, acl: AclRef) {
        self.entries.borrow_mut().insert(clause, acl);
    }
}

/// `configure_zone_acl`, but consulting and populating a [`ViewAclCache`]
/// first: a zone-level override is never cached or read from the cache,
/// since it's specific to that one zone.
pub fn resolve_acl_cached(
    stack: &OptionResolver<'_>,
    cache: &ViewAclCache,
    clause: &'static str,
    builtin_default: AclRef,
) -> AclRef {
    if let Some(cached) = cache.get(clause) {
        return cached;
    }
    let attachment = attach_acl(stack, clause, builtin_default);
    if attachment.from_view_or_deeper {
        cache.insert(clause, attachment.acl.clone());
    }
    attachment.acl
}

/// `allow-transfer` may carry a `port-transport` prefix ahead of the ACL
/// itself: `allow-transfer port 853 transport tls { ... };`.
pub fn parse_scoped_acl(entry: &Entry) -> Option<ScopedAcl> {
    let args = entry.args();
    let mut idx = 0;
    let mut port = None;
    let mut transport = None;

    while idx + 1 < args.len() {
        match args[idx].as_str() {
            Some("port") => {
                port = args.get(idx + 1).and_then(Token::as_int).map(|p| p as u16);
                idx += 2;
            }
            Some("transport") => {
                transport = args.get(idx + 1).and_then(Token::as_str).and_then(|t| match t {
                    "tcp" => Some(Transport::Tcp),
                    "tls" => Some(Transport::Tls),
                    _ => None,
                });
                idx += 2;
            }
            _ => break,
        }
    }

    let acl = parse_acl_ref(args.get(idx)?)?;
    Some(ScopedAcl { port, transport, acl })
}
