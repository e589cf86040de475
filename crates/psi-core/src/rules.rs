//! # Psi-Rules
//!
//! The component that binds to one atom store and owns the tag roots and
//! the rule index for it.
//!
//! A psi-rule is encoded as
//!
//! ```text
//! (ImplicationLink <tv>
//!     (SequentialAndLink context_1 ... context_n action)
//!     goal)
//! (MemberLink rule demand)
//! ```
//!
//! and indexed as `rule -> (context, action, goal, query)` so callers never
//! walk the encoding to decompose a rule.
//!
//! ## Concurrency
//!
//! Mutation takes `&mut self`. To share one component across threads, wrap
//! it in `Arc<RwLock<PsiRules<S>>>`; the write lock serialises registration
//! and index inserts for the same rule.

use crate::atomspace::AtomStore;
use crate::index::{PsiEntry, RuleIndex};
use crate::pattern::PatternQuery;
use crate::primitives::MAX_CONTEXT_LENGTH;
use crate::tags::{self, PsiRoots, TagKind};
use crate::{AtomType, Handle, PsiError, TruthValue};

/// Rule encoding, tag registry and rule index over one store.
#[derive(Debug)]
pub struct PsiRules<S: AtomStore> {
    /// The bound store.
    store: S,
    /// Category roots, resolved at construction.
    roots: PsiRoots,
    /// rule -> decomposition
    index: RuleIndex,
}

impl<S: AtomStore> PsiRules<S> {
    /// Bind to a store, resolving (or creating) the category roots.
    pub fn new(mut store: S) -> Result<Self, PsiError> {
        let roots = PsiRoots::resolve(&mut store)?;
        Ok(Self {
            store,
            roots,
            index: RuleIndex::new(),
        })
    }

    /// The bound store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the bound store, e.g. to assert facts.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Tear down the index and hand back the store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// The category roots.
    #[must_use]
    pub fn roots(&self) -> &PsiRoots {
        &self.roots
    }

    /// The rule index.
    #[must_use]
    pub fn index(&self) -> &RuleIndex {
        &self.index
    }

    // =========================================================================
    // TAG REGISTRY
    // =========================================================================

    /// Create or find the demand tag `name`.
    pub fn add_demand(&mut self, name: &str) -> Result<Handle, PsiError> {
        self.add_tag(TagKind::Demand, name)
    }

    /// Create or find the goal tag `name`.
    pub fn add_goal(&mut self, name: &str) -> Result<Handle, PsiError> {
        self.add_tag(TagKind::Goal, name)
    }

    /// Create or find the action category `name`.
    pub fn add_action_category(&mut self, name: &str) -> Result<Handle, PsiError> {
        self.add_tag(TagKind::Action, name)
    }

    /// Create or find a tag of any category.
    pub fn add_tag(&mut self, kind: TagKind, name: &str) -> Result<Handle, PsiError> {
        tags::add_tag(&mut self.store, self.roots.root(kind), name)
    }

    /// Every demand tag in the store.
    pub fn demands(&self) -> Result<Vec<Handle>, PsiError> {
        tags::tags_under(&self.store, self.roots.demand)
    }

    /// Every goal tag in the store.
    pub fn goals(&self) -> Result<Vec<Handle>, PsiError> {
        tags::tags_under(&self.store, self.roots.goal)
    }

    /// Check if `handle` is tagged as a demand.
    #[must_use]
    pub fn is_demand(&self, handle: Handle) -> bool {
        tags::is_tag(&self.store, self.roots.demand, handle)
    }

    // =========================================================================
    // REGISTRATION
    // =========================================================================

    /// Encode, register and index a psi-rule.
    ///
    /// Returns the handle of the `ImplicationLink`. Registering identical
    /// content again returns the same handle and leaves the index unchanged.
    ///
    /// # Errors
    ///
    /// - `InvalidHandle` if any input does not resolve in the store
    /// - `ActionInContext` if `action` also appears in `context`
    /// - `NotADemand` if `demand` is not a demand tag
    /// - `ContextTooLarge` / `InvalidPattern` if the context cannot be compiled
    /// - any store error, unchanged
    pub fn add_rule(
        &mut self,
        context: &[Handle],
        action: Handle,
        goal: Handle,
        tv: TruthValue,
        demand: Handle,
    ) -> Result<Handle, PsiError> {
        if context.len() > MAX_CONTEXT_LENGTH {
            return Err(PsiError::ContextTooLarge(context.len()));
        }
        for &handle in context.iter().chain([&action, &goal, &demand]) {
            if !self.store.contains(handle)? {
                return Err(PsiError::InvalidHandle(handle));
            }
        }
        if context.contains(&action) {
            return Err(PsiError::ActionInContext(action));
        }
        if !self.is_demand(demand) {
            return Err(PsiError::NotADemand(demand));
        }

        // Compile before writing so a bad context leaves the store untouched
        let query = PatternQuery::compile(&self.store, context)?;

        let mut antecedent = Vec::with_capacity(context.len().saturating_add(1));
        antecedent.extend_from_slice(context);
        antecedent.push(action);

        let conjunction = self
            .store
            .add_link(AtomType::SequentialAndLink, &antecedent)?;
        let rule = self
            .store
            .add_link(AtomType::ImplicationLink, &[conjunction, goal])?;
        self.store.set_truth_value(rule, tv)?;
        self.store.add_link(AtomType::MemberLink, &[rule, demand])?;

        let inserted = self.index.insert(
            rule,
            PsiEntry {
                context: context.to_vec(),
                action,
                goal,
                query,
            },
        );
        tracing::debug!(
            %rule,
            %action,
            %goal,
            %demand,
            context_len = context.len(),
            inserted,
            "psi-rule registered"
        );

        Ok(rule)
    }

    // =========================================================================
    // DECOMPOSITION ACCESSORS
    // =========================================================================

    /// The full index entry of a rule.
    pub fn entry(&self, rule: Handle) -> Result<&PsiEntry, PsiError> {
        self.index.get(rule).ok_or(PsiError::RuleNotIndexed(rule))
    }

    /// Context conditions of a rule, in registration order.
    pub fn get_context(&self, rule: Handle) -> Result<&[Handle], PsiError> {
        Ok(&self.entry(rule)?.context)
    }

    /// Action of a rule.
    pub fn get_action(&self, rule: Handle) -> Result<Handle, PsiError> {
        Ok(self.entry(rule)?.action)
    }

    /// Goal of a rule.
    pub fn get_goal(&self, rule: Handle) -> Result<Handle, PsiError> {
        Ok(self.entry(rule)?.goal)
    }

    /// Compiled satisfiability query of a rule's context.
    pub fn get_query(&self, rule: Handle) -> Result<&PatternQuery, PsiError> {
        Ok(&self.entry(rule)?.query)
    }

    // =========================================================================
    // RULE QUERIES
    // =========================================================================

    /// Check if a rule is indexed.
    #[must_use]
    pub fn is_rule(&self, rule: Handle) -> bool {
        self.index.contains(rule)
    }

    /// Indexed rules in ascending handle order.
    pub fn rules(&self) -> impl Iterator<Item = Handle> + '_ {
        self.index.rules()
    }

    /// Number of indexed rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.index.len()
    }

    /// Indexed rules that belong to `demand`, in ascending handle order.
    pub fn rules_for_demand(&self, demand: Handle) -> Result<Vec<Handle>, PsiError> {
        let mut rules = Vec::new();
        for link in self.store.incoming(demand)? {
            let Some(atom) = self.store.get_atom(link)? else {
                continue;
            };
            if atom.atom_type() != AtomType::MemberLink {
                continue;
            }
            match atom.outgoing() {
                [rule, set] if *set == demand && self.index.contains(*rule) => rules.push(*rule),
                _ => {}
            }
        }
        rules.sort_unstable();
        Ok(rules)
    }

    /// Evict a rule from the index. Its atoms stay in the store.
    pub fn remove_rule(&mut self, rule: Handle) -> Option<PsiEntry> {
        let removed = self.index.remove(rule);
        if removed.is_some() {
            tracing::debug!(%rule, "psi-rule evicted from index");
        }
        removed
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atomspace::AtomSpace;
    use crate::Atom;

    fn rules() -> PsiRules<AtomSpace> {
        PsiRules::new(AtomSpace::new()).expect("bind")
    }

    fn concept(rules: &mut PsiRules<AtomSpace>, name: &str) -> Handle {
        rules
            .store_mut()
            .add_node(AtomType::ConceptNode, name)
            .expect("concept")
    }

    #[test]
    fn add_rule_round_trips() {
        let mut psi = rules();
        let demand = psi.add_demand("Energy").expect("demand");
        let goal = psi.add_goal("StayCharged").expect("goal");
        let c1 = concept(&mut psi, "low-battery");
        let c2 = concept(&mut psi, "charger-visible");
        let action = concept(&mut psi, "seek-charger");

        let rule = psi
            .add_rule(&[c1, c2], action, goal, TruthValue::new(900, 800), demand)
            .expect("rule");

        assert_eq!(psi.get_context(rule).expect("context"), &[c1, c2]);
        assert_eq!(psi.get_action(rule).expect("action"), action);
        assert_eq!(psi.get_goal(rule).expect("goal"), goal);
        assert_eq!(psi.get_query(rule).expect("query").clauses().len(), 2);
    }

    #[test]
    fn encoding_matches_rule_shape() {
        let mut psi = rules();
        let demand = psi.add_demand("Energy").expect("demand");
        let goal = psi.add_goal("StayCharged").expect("goal");
        let c1 = concept(&mut psi, "c1");
        let action = concept(&mut psi, "act");
        let tv = TruthValue::new(700, 600);

        let rule = psi.add_rule(&[c1], action, goal, tv, demand).expect("rule");
        let store = psi.store();

        let conjunction = store
            .get_link(AtomType::SequentialAndLink, &[c1, action])
            .expect("conjunction");
        assert_eq!(
            store.get_atom(rule).expect("get"),
            Some(Atom::link(AtomType::ImplicationLink, vec![conjunction, goal]))
        );
        assert_eq!(store.truth_value(rule).expect("tv"), tv);
        assert!(store.link_exists(AtomType::MemberLink, &[rule, demand]));
    }

    #[test]
    fn duplicate_rule_returns_same_handle() {
        let mut psi = rules();
        let demand = psi.add_demand("Energy").expect("demand");
        let goal = psi.add_goal("StayCharged").expect("goal");
        let c1 = concept(&mut psi, "c1");
        let action = concept(&mut psi, "act");

        let first = psi
            .add_rule(&[c1], action, goal, TruthValue::TRUE, demand)
            .expect("rule");
        let atoms = psi.store().atom_count().expect("count");
        let second = psi
            .add_rule(&[c1], action, goal, TruthValue::TRUE, demand)
            .expect("rule");

        assert_eq!(first, second);
        assert_eq!(psi.rule_count(), 1);
        assert_eq!(psi.store().atom_count().expect("count"), atoms);
    }

    #[test]
    fn empty_context_is_allowed() {
        let mut psi = rules();
        let demand = psi.add_demand("Energy").expect("demand");
        let goal = psi.add_goal("Rest").expect("goal");
        let action = concept(&mut psi, "sleep");

        let rule = psi
            .add_rule(&[], action, goal, TruthValue::TRUE, demand)
            .expect("rule");

        assert!(psi.get_context(rule).expect("context").is_empty());
        let query = psi.get_query(rule).expect("query");
        assert!(query.is_satisfiable(psi.store()).expect("eval"));
    }

    #[test]
    fn unknown_handle_rejected_without_side_effects() {
        let mut psi = rules();
        let demand = psi.add_demand("Energy").expect("demand");
        let goal = psi.add_goal("StayCharged").expect("goal");
        let action = concept(&mut psi, "act");
        let atoms = psi.store().atom_count().expect("count");

        let result = psi.add_rule(&[Handle(999)], action, goal, TruthValue::TRUE, demand);
        assert!(matches!(result, Err(PsiError::InvalidHandle(Handle(999)))));

        let result = psi.add_rule(&[], Handle(998), goal, TruthValue::TRUE, demand);
        assert!(matches!(result, Err(PsiError::InvalidHandle(Handle(998)))));

        assert_eq!(psi.store().atom_count().expect("count"), atoms);
        assert_eq!(psi.rule_count(), 0);
    }

    #[test]
    fn action_inside_context_rejected() {
        let mut psi = rules();
        let demand = psi.add_demand("Energy").expect("demand");
        let goal = psi.add_goal("StayCharged").expect("goal");
        let c1 = concept(&mut psi, "c1");
        let action = concept(&mut psi, "act");

        let result = psi.add_rule(&[c1, action], action, goal, TruthValue::TRUE, demand);
        assert!(matches!(result, Err(PsiError::ActionInContext(a)) if a == action));
        assert_eq!(psi.rule_count(), 0);
    }

    #[test]
    fn demand_must_be_tagged() {
        let mut psi = rules();
        let goal = psi.add_goal("StayCharged").expect("goal");
        let action = concept(&mut psi, "act");
        let untagged = concept(&mut psi, "Energy");

        let result = psi.add_rule(&[], action, goal, TruthValue::TRUE, untagged);
        assert!(matches!(result, Err(PsiError::NotADemand(h)) if h == untagged));

        // A goal tag is not a demand either
        let result = psi.add_rule(&[], action, goal, TruthValue::TRUE, goal);
        assert!(matches!(result, Err(PsiError::NotADemand(_))));
    }

    #[test]
    fn roots_cannot_become_tags() {
        let mut psi = rules();

        assert!(matches!(
            psi.add_demand(crate::primitives::PSI_GOAL_ROOT),
            Err(PsiError::InvalidName(_))
        ));
        assert!(matches!(
            psi.add_goal(crate::primitives::PSI_GOAL_ROOT),
            Err(PsiError::InvalidName(_))
        ));
        assert!(!psi.is_demand(psi.roots().goal));
        assert!(psi.demands().expect("demands").is_empty());
    }

    #[test]
    fn context_length_bounded() {
        let mut psi = rules();
        let demand = psi.add_demand("Energy").expect("demand");
        let goal = psi.add_goal("StayCharged").expect("goal");
        let action = concept(&mut psi, "act");
        let c = concept(&mut psi, "c");
        let context = vec![c; MAX_CONTEXT_LENGTH + 1];

        let result = psi.add_rule(&context, action, goal, TruthValue::TRUE, demand);
        assert!(matches!(result, Err(PsiError::ContextTooLarge(_))));
    }

    #[test]
    fn missing_entry_is_an_error() {
        let psi = rules();
        assert!(matches!(
            psi.get_context(Handle(5)),
            Err(PsiError::RuleNotIndexed(Handle(5)))
        ));
        assert!(psi.get_action(Handle(5)).is_err());
        assert!(psi.get_goal(Handle(5)).is_err());
        assert!(psi.get_query(Handle(5)).is_err());
    }

    #[test]
    fn rules_grouped_by_demand() {
        let mut psi = rules();
        let energy = psi.add_demand("Energy").expect("demand");
        let social = psi.add_demand("Social").expect("demand");
        let goal = psi.add_goal("Ok").expect("goal");
        let a1 = concept(&mut psi, "a1");
        let a2 = concept(&mut psi, "a2");
        let a3 = concept(&mut psi, "a3");

        let r1 = psi.add_rule(&[], a1, goal, TruthValue::TRUE, energy).expect("rule");
        let r2 = psi.add_rule(&[], a2, goal, TruthValue::TRUE, social).expect("rule");
        let r3 = psi.add_rule(&[], a3, goal, TruthValue::TRUE, energy).expect("rule");

        assert_eq!(psi.rules_for_demand(energy).expect("rules"), vec![r1, r3]);
        assert_eq!(psi.rules_for_demand(social).expect("rules"), vec![r2]);
        assert_eq!(psi.demands().expect("demands"), vec![energy, social]);
        assert_eq!(psi.goals().expect("goals"), vec![goal]);
    }

    #[test]
    fn remove_rule_keeps_atoms() {
        let mut psi = rules();
        let demand = psi.add_demand("Energy").expect("demand");
        let goal = psi.add_goal("Ok").expect("goal");
        let action = concept(&mut psi, "act");
        let rule = psi
            .add_rule(&[], action, goal, TruthValue::TRUE, demand)
            .expect("rule");

        let removed = psi.remove_rule(rule).expect("removed");
        assert_eq!(removed.action, action);
        assert!(!psi.is_rule(rule));
        assert!(psi.store().contains(rule).expect("contains"));
        assert!(psi.rules_for_demand(demand).expect("rules").is_empty());

        // Re-registering restores the entry under the same handle
        let again = psi
            .add_rule(&[], action, goal, TruthValue::TRUE, demand)
            .expect("rule");
        assert_eq!(again, rule);
        assert!(psi.is_rule(rule));
    }

    #[test]
    fn into_store_hands_back_atoms() {
        let mut psi = rules();
        psi.add_action_category("locomotion").expect("category");
        let roots = *psi.roots();

        let store = psi.into_store();
        assert!(store.get_node(AtomType::ConceptNode, "locomotion").is_some());
        assert!(tags::is_tag(
            &store,
            roots.action,
            store
                .get_node(AtomType::ConceptNode, "locomotion")
                .unwrap_or(Handle(0))
        ));
    }
}
