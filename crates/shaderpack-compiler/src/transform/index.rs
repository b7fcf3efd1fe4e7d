//! Identifier index over a translation unit

use std::collections::BTreeMap;
use std::ops::Bound;

use super::ast::TranslationUnit;

/// Occurrence counts of every identifier in a tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierIndex {
    counts: BTreeMap<String, usize>,
}

impl IdentifierIndex {
    pub fn build(unit: &TranslationUnit) -> Self {
        let mut counts = BTreeMap::new();
        unit.visit_identifiers(|name| *counts.entry(name.to_string()).or_insert(0) += 1);
        Self { counts }
    }

    pub fn has(&self, name: &str) -> bool {
        self.counts.contains_key(name)
    }

    pub fn count(&self, name: &str) -> usize {
        self.counts.get(name).copied().unwrap_or(0)
    }

    /// Returns every distinct identifier starting with `prefix`, in sorted order
    pub fn prefix_query<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.counts
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .map(|(name, _)| name.as_str())
            .take_while(move |name| name.starts_with(prefix))
    }
}
