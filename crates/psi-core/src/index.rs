//! # Rule Index
//!
//! Instance-owned table from a rule's handle to its decomposed parts.
//!
//! Entries are created once per successful registration and never change.
//! The first writer wins: a later insert for the same handle is dropped.

use crate::pattern::PatternQuery;
use crate::Handle;
use std::collections::BTreeMap;

/// The decomposition of one psi-rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PsiEntry {
    /// Context conditions, in registration order.
    pub context: Vec<Handle>,
    /// The action.
    pub action: Handle,
    /// The goal.
    pub goal: Handle,
    /// Satisfiability query compiled from `context` alone.
    pub query: PatternQuery,
}

/// Rule handle -> decomposition.
#[derive(Debug, Clone, Default)]
pub struct RuleIndex {
    entries: BTreeMap<Handle, PsiEntry>,
}

impl RuleIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry unless the rule is already indexed.
    ///
    /// Returns `true` if the entry was new.
    pub fn insert(&mut self, rule: Handle, entry: PsiEntry) -> bool {
        if let Some(existing) = self.entries.get(&rule) {
            if *existing != entry {
                tracing::warn!(%rule, "conflicting decomposition for indexed rule; keeping first");
            }
            return false;
        }
        self.entries.insert(rule, entry);
        true
    }

    /// Lookup a rule's entry.
    #[must_use]
    pub fn get(&self, rule: Handle) -> Option<&PsiEntry> {
        self.entries.get(&rule)
    }

    /// Check if a rule is indexed.
    #[must_use]
    pub fn contains(&self, rule: Handle) -> bool {
        self.entries.contains_key(&rule)
    }

    /// Evict a rule's entry. The rule's atoms stay in the store.
    pub fn remove(&mut self, rule: Handle) -> Option<PsiEntry> {
        self.entries.remove(&rule)
    }

    /// Number of indexed rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no rules are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indexed rule handles in ascending order.
    pub fn rules(&self) -> impl Iterator<Item = Handle> + '_ {
        self.entries.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(action: u64) -> PsiEntry {
        PsiEntry {
            context: vec![Handle(1), Handle(2)],
            action: Handle(action),
            goal: Handle(4),
            query: PatternQuery::default(),
        }
    }

    #[test]
    fn first_writer_wins() {
        let mut index = RuleIndex::new();

        assert!(index.insert(Handle(10), entry(3)));
        assert!(!index.insert(Handle(10), entry(5)));

        assert_eq!(index.len(), 1);
        assert_eq!(index.get(Handle(10)).map(|e| e.action), Some(Handle(3)));
    }

    #[test]
    fn remove_evicts_entry() {
        let mut index = RuleIndex::new();
        index.insert(Handle(10), entry(3));

        assert!(index.contains(Handle(10)));
        assert_eq!(index.remove(Handle(10)), Some(entry(3)));
        assert!(!index.contains(Handle(10)));
        assert!(index.is_empty());
        assert_eq!(index.remove(Handle(10)), None);
    }

    #[test]
    fn rules_in_handle_order() {
        let mut index = RuleIndex::new();
        index.insert(Handle(30), entry(3));
        index.insert(Handle(10), entry(3));
        index.insert(Handle(20), entry(3));

        let rules: Vec<_> = index.rules().collect();
        assert_eq!(rules, vec![Handle(10), Handle(20), Handle(30)]);
    }
}
