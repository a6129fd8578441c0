//! A scoped symbol table with define-reject-if-exists semantics.
//!
//! Used throughout the validator for de-duplication: zone names within a
//! view, file paths, TLS/HTTP profile names, listener sockets, trust-anchor
//! owners, and key-directory bindings all go through a `SymbolTable`.

use std::borrow::Borrow;
use std::hash::Hash;

use crate::token::Location;

/// A single prior definition of a symbol, recorded for conflict reporting.
#[derive(Clone, Debug)]
pub struct Definition<V> {
    pub value: V,
    pub location: Location,
}

/// A symbol table over keys `K`, each mapped to an opaque associated value
/// `V` (e.g. the access mode of a file path, or the owner of a TLS
/// profile name).
#[derive(Debug)]
pub struct SymbolTable<K, V> {
    entries: foldhash::HashMap<K, Definition<V>>,
}

impl<K, V> Default for SymbolTable<K, V> {
    fn default() -> Self {
        Self {
            entries: foldhash::HashMap::default(),
        }
    }
}

impl<K, V> SymbolTable<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an existing definition.
    pub fn get<Q>(&self, key: &Q) -> Option<&Definition<V>>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries.get(key)
    }

    /// Define `key` if it is not already present. Returns `Ok(())` if the
    /// definition succeeded, or `Err` with the prior definition if `key`
    /// was already present.
    pub fn define(&mut self, key: K, value: V, location: Location) -> Result<(), &Definition<V>> {
        if self.entries.contains_key(&key) {
            // Two-step lookup to satisfy the borrow checker while still
            // returning a reference tied to `self`.
            return Err(self.entries.get(&key).unwrap());
        }
        self.entries.insert(key, Definition { value, location });
        Ok(())
    }

    /// Define `key`, allowing redefinition when `compatible` judges the
    /// existing and new values to coexist (e.g. two read-only uses of the
    /// same file path). Returns `Ok(())` if accepted, `Err` with the
    /// conflicting prior definition otherwise.
    pub fn define_or_merge(
        &mut self,
        key: K,
        value: V,
        location: Location,
        compatible: impl FnOnce(&V, &V) -> bool,
    ) -> Result<(), &Definition<V>>
    where
        K: Clone,
    {
        if let Some(existing) = self.entries.get(&key) {
            if compatible(&existing.value, &value) {
                return Ok(());
            }
            return Err(self.entries.get(&key).unwrap());
        }
        self.entries.insert(key, Definition { value, location });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    fn loc() -> Location {
        Location::new(Utf8PathBuf::from("t.conf"), 1)
    }

    #[test]
    fn rejects_redefinition() {
        let mut t: SymbolTable<String, ()> = SymbolTable::new();
        assert!(t.define("a".into(), (), loc()).is_ok());
        assert!(t.define("a".into(), (), loc()).is_err());
    }

    #[test]
    fn merge_allows_compatible_redefinition() {
        let mut t: SymbolTable<String, u8> = SymbolTable::new();
        assert!(t
            .define_or_merge("f".into(), 0, loc(), |_, _| true)
            .is_ok());
        assert!(t
            .define_or_merge("f".into(), 0, loc(), |_, _| true)
            .is_ok());
        assert!(t
            .define_or_merge("f".into(), 1, loc(), |_, _| false)
            .is_err());
    }
}
