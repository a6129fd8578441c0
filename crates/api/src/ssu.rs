//! The Simple Secure Update table: the `update-policy` clause.

use domain::base::iana::Rtype;
use serde::{Deserialize, Serialize};

use crate::StoredName;

/// `grant` or `deny`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SsuRuleAction {
    Grant,
    Deny,
}

/// The match-type of an SSU rule. Modeled as a closed enum rather than a
/// string so that serving-path matching never falls back to a string
/// comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchType {
    Name,
    Subdomain,
    Wildcard,
    SelfMatch,
    SelfSub,
    SelfWild,
    SelfKrb5,
    SelfSubKrb5,
    SelfMs,
    SelfSubMs,
    SubDomainMs,
    SubDomainKrb5,
    SubDomainSelfMsRhs,
    SubDomainSelfKrb5Rhs,
    External,
    TcpSelf,
    SixToFourSelf,
    Local,
    ZoneSub,
}

impl MatchType {
    /// Match-types whose semantics require a placeholder identity name
    /// (conventionally written with a literal variable like `*`, per the
    /// "self*" family) rather than a concrete identity.
    pub fn uses_self_identity(self) -> bool {
        matches!(
            self,
            MatchType::SelfMatch
                | MatchType::SelfSub
                | MatchType::SelfWild
                | MatchType::SelfKrb5
                | MatchType::SelfSubKrb5
                | MatchType::SelfMs
                | MatchType::SelfSubMs
                | MatchType::TcpSelf
                | MatchType::SixToFourSelf
        )
    }

    /// Match-types that take a target name (as opposed to `zonesub`, which
    /// takes the zone origin implicitly).
    pub fn takes_explicit_target(self) -> bool {
        matches!(
            self,
            MatchType::Name
                | MatchType::Subdomain
                | MatchType::Wildcard
                | MatchType::SubDomainMs
                | MatchType::SubDomainKrb5
                | MatchType::SubDomainSelfMsRhs
                | MatchType::SubDomainSelfKrb5Rhs
                | MatchType::External
        )
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "name" => Self::Name,
            "subdomain" => Self::Subdomain,
            "wildcard" => Self::Wildcard,
            "self" => Self::SelfMatch,
            "self-sub" => Self::SelfSub,
            "self-wild" => Self::SelfWild,
            "self-krb5" => Self::SelfKrb5,
            "self-sub-krb5" => Self::SelfSubKrb5,
            "self-ms" => Self::SelfMs,
            "self-sub-ms" => Self::SelfSubMs,
            "subdomain-ms" => Self::SubDomainMs,
            "subdomain-krb5" => Self::SubDomainKrb5,
            "subdomain-self-ms-rhs" => Self::SubDomainSelfMsRhs,
            "subdomain-self-krb5-rhs" => Self::SubDomainSelfKrb5Rhs,
            "external" => Self::External,
            "tcp-self" => Self::TcpSelf,
            "6to4-self" => Self::SixToFourSelf,
            "local" => Self::Local,
            "zonesub" => Self::ZoneSub,
            _ => return None,
        })
    }
}

/// A `(rdatatype, max-count)` pair, the `TYPE(N)` syntax in an SSU rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeLimit {
    pub rtype: Rtype,
    /// `0..=65535`; `u16::MAX` is used when no `(N)` suffix was given,
    /// i.e. unlimited.
    pub max_count: u16,
}

/// One rule of an `update-policy` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SsuRule {
    pub action: SsuRuleAction,
    pub identity: StoredName,
    pub match_type: MatchType,
    /// The target name, or the zone origin itself for `zonesub`. `None`
    /// only for match-types that need no target at all.
    pub target: Option<StoredName>,
    pub types: Vec<TypeLimit>,
}

/// The full update-policy table for a zone.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SsuTable {
    pub rules: Vec<SsuRule>,
}

impl SsuTable {
    /// The expansion of the literal `update-policy local;` shorthand:
    /// "grant <session-key> local <origin> ANY". The session-key identity
    /// is filled in by the assembler, since it depends on whether the
    /// server has generated one.
    pub fn local(session_key: StoredName, origin: StoredName) -> Self {
        Self {
            rules: vec![SsuRule {
                action: SsuRuleAction::Grant,
                identity: session_key,
                match_type: MatchType::Local,
                target: Some(origin),
                types: Vec::new(),
            }],
        }
    }
}
