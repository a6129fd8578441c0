//! Option resolution: walking an ordered stack of scopes for the first
//! definition of a clause.
//!
//! The precedence order is fixed by the caller (zone, template, view,
//! global, built-in defaults) and never reordered here - this module only
//! implements the walk itself, so the order stays in one place and stays
//! stable, per the "implicit inheritance stack" design note.

use crate::token::{find_one, Entry};

/// An ordered stack of configuration scopes, innermost first.
///
/// `None` entries are skipped (e.g. a zone with no template, or a view
/// with no matching global block).
pub struct OptionResolver<'a> {
    scopes: Vec<Option<&'a [Entry]>>,
}

impl<'a> OptionResolver<'a> {
    pub fn new(scopes: Vec<Option<&'a [Entry]>>) -> Self {
        Self { scopes }
    }

    /// Resolve `clause`, returning the entry from the innermost scope that
    /// defines it, plus the index of that scope (0 = innermost).
    pub fn resolve_with_scope(&self, clause: &str) -> Option<(usize, &'a Entry)> {
        self.scopes.iter().enumerate().find_map(|(i, scope)| {
            scope.and_then(|block| find_one(block, clause)).map(|e| (i, e))
        })
    }

    /// Resolve `clause`, returning just the winning entry.
    pub fn resolve(&self, clause: &str) -> Option<&'a Entry> {
        self.resolve_with_scope(clause).map(|(_, e)| e)
    }

    /// Whether any scope in the stack defines `clause`.
    pub fn is_set(&self, clause: &str) -> bool {
        self.resolve(clause).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use camino::Utf8PathBuf;

    fn block(text: &str) -> crate::token::ConfigTree {
        parse(&Utf8PathBuf::from("t.conf"), text).unwrap()
    }

    #[test]
    fn stops_at_first_match() {
        let zone = block("x 1;");
        let view = block("x 2; y 9;");
        let global = block("x 3; y 4; z 5;");
        let resolver = OptionResolver::new(vec![
            Some(&zone.entries),
            Some(&view.entries),
            Some(&global.entries),
        ]);
        assert_eq!(resolver.resolve("x").unwrap().args()[0].as_int(), Some(1));
        assert_eq!(resolver.resolve("y").unwrap().args()[0].as_int(), Some(9));
        assert_eq!(resolver.resolve("z").unwrap().args()[0].as_int(), Some(5));
        assert!(resolver.resolve("w").is_none());
    }

    #[test]
    fn skips_absent_scopes() {
        let global = block("x 3;");
        let resolver = OptionResolver::new(vec![None, None, Some(&global.entries)]);
        assert_eq!(resolver.resolve("x").unwrap().args()[0].as_int(), Some(3));
    }
}
