//! Name-keyed table of constructors split by matrix symmetry.

use std::collections::BTreeMap;

use crate::error::LduError;

#[derive(Debug, Clone, Copy)]
struct Entry<F> {
    factory: F,
    symmetric: bool,
    asymmetric: bool,
}

/// Constructors of one kind (solver, preconditioner, ...) by type name.
///
/// Each name is registered for symmetric matrices, asymmetric ones or both.
/// Lookups fail with [`LduError::UnknownType`] listing the names valid for
/// the requested symmetry, in sorted order.
#[derive(Debug, Clone)]
pub struct SelectionTable<F> {
    kind: &'static str,
    entries: BTreeMap<String, Entry<F>>,
}

impl<F: Copy> SelectionTable<F> {
    pub fn new(kind: &'static str) -> Self {
        Self { kind, entries: BTreeMap::new() }
    }

    /// Register `name` for both symmetries.
    pub fn add(&mut self, name: &str, factory: F) -> &mut Self {
        self.insert(name, factory, true, true)
    }

    pub fn add_symmetric(&mut self, name: &str, factory: F) -> &mut Self {
        self.insert(name, factory, true, false)
    }

    pub fn add_asymmetric(&mut self, name: &str, factory: F) -> &mut Self {
        self.insert(name, factory, false, true)
    }

    fn insert(&mut self, name: &str, factory: F, symmetric: bool, asymmetric: bool) -> &mut Self {
        self.entries.insert(name.to_string(), Entry { factory, symmetric, asymmetric });
        self
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Names valid for the given symmetry.
    pub fn names(&self, symmetric: bool) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, e)| if symmetric { e.symmetric } else { e.asymmetric })
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn lookup(&self, name: &str, symmetric: bool) -> Result<F, LduError> {
        match self.entries.get(name) {
            Some(e) if (symmetric && e.symmetric) || (!symmetric && e.asymmetric) => Ok(e.factory),
            _ => Err(LduError::UnknownType {
                kind: self.kind,
                name: name.to_string(),
                valid: self.names(symmetric),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_respects_symmetry() {
        let mut t: SelectionTable<u8> = SelectionTable::new("widget");
        t.add("both", 1).add_symmetric("sym", 2).add_asymmetric("asym", 3);
        assert_eq!(t.lookup("both", true).unwrap(), 1);
        assert_eq!(t.lookup("both", false).unwrap(), 1);
        assert_eq!(t.lookup("sym", true).unwrap(), 2);
        assert_eq!(t.lookup("asym", false).unwrap(), 3);

        match t.lookup("asym", true) {
            Err(LduError::UnknownType { kind, name, valid }) => {
                assert_eq!(kind, "widget");
                assert_eq!(name, "asym");
                assert_eq!(valid, vec!["both".to_string(), "sym".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
