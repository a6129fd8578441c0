//! ACL representation.
//!
//! The ACL *evaluator* is an external collaborator: this module only
//! carries enough shape to validate the grammar surface and to let the
//! assembler attach an ACL reference to a zone field. Resolving a named
//! ACL reference into a compiled matcher is someone else's job, reached
//! through [`AclResolver`].

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// A reference to an ACL, as it appears attached to a zone or view field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AclRef {
    /// A named ACL, a `remote-servers`/`primaries`/`parental-agents` list
    /// used as an ACL, or a view name (for `match-clients` et al).
    Named(Box<str>),
    /// An address-match-list written out inline.
    Inline(InlineAcl),
    /// The built-in ACL `any`.
    Any,
    /// The built-in ACL `none`.
    None,
    /// The built-in ACL `localhost`.
    Localhost,
    /// The built-in ACL `localnets`.
    Localnets,
}

impl AclRef {
    /// The four names that may not be redefined as a user ACL.
    pub const RESERVED: [&'static str; 4] = ["any", "none", "localhost", "localnets"];

    pub fn is_reserved_name(name: &str) -> bool {
        Self::RESERVED.contains(&name)
    }
}

/// An address-match-list written out inline, e.g. `{ 192.0.2.0/24; !10/8; }`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InlineAcl {
    pub elements: Vec<AclElement>,
}

/// One element of an address-match-list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AclElement {
    Addr(IpAddr),
    Prefix(IpAddr, u8),
    Key(Box<str>),
    Named(Box<str>),
    Nested(InlineAcl),
    Negated(Box<AclElement>),
}

/// Allow-transfer (and similar) fields may be scoped by port and transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transport {
    Tcp,
    Tls,
}

/// An ACL attachment scoped by an optional port and transport, as used by
/// `allow-transfer`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScopedAcl {
    pub port: Option<u16>,
    pub transport: Option<Transport>,
    pub acl: AclRef,
}

/// The single entry point into the (external) ACL subsystem: given a
/// reference, produce whatever opaque handle the serving layer uses to
/// evaluate it. The validator only needs to know whether a name resolves;
/// the assembler only needs to attach the resulting handle to a zone.
pub trait AclResolver {
    type Handle: Clone;

    /// Resolve a named ACL, or `None` if no such ACL (and no such
    /// `remote-servers`/view name usable as one) is defined.
    fn resolve_named(&self, name: &str) -> Option<Self::Handle>;

    /// Compile an inline address-match-list.
    fn resolve_inline(&self, acl: &InlineAcl) -> Self::Handle;

    /// The always-available built-ins.
    fn any(&self) -> Self::Handle;
    fn none(&self) -> Self::Handle;
    fn localhost(&self) -> Self::Handle;
    fn localnets(&self) -> Self::Handle;

    fn resolve(&self, r: &AclRef) -> Option<Self::Handle> {
        Some(match r {
            AclRef::Named(name) => return self.resolve_named(name),
            AclRef::Inline(acl) => self.resolve_inline(acl),
            AclRef::Any => self.any(),
            AclRef::None => self.none(),
            AclRef::Localhost => self.localhost(),
            AclRef::Localnets => self.localnets(),
        })
    }
}
