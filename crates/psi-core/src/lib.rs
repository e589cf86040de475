//! # psi-core
//!
//! Psi-rule encoding and indexing over a hypergraph atom store.
//!
//! A psi-rule says: when every context condition holds and the action is
//! performed, the goal is expected to follow with some truth value. Each
//! rule also belongs to one demand. This crate:
//!
//! - Maintains the tag taxonomy (demands, goals, action categories)
//! - Writes rules into the store in their canonical link encoding
//! - Compiles each rule's context into a satisfiability query
//! - Keeps an instance-owned index from rule handle to its parts
//!
//! ## Architectural Constraints
//!
//! - The store is the source of truth for atoms; the index is the source
//!   of truth for decomposition
//! - Deterministic: `BTreeMap` only, integer truth values, no randomness
//! - No async, no network dependencies

// =============================================================================
// MODULES
// =============================================================================

pub mod atomspace;
pub mod index;
pub mod pattern;
pub mod primitives;
pub mod rules;
pub mod storage;
pub mod tags;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{Atom, AtomRecord, AtomType, Handle, PsiError, TruthValue};

// =============================================================================
// RE-EXPORTS: Store
// =============================================================================

pub use atomspace::{AtomSpace, AtomStore};
pub use storage::RedbAtomSpace;

// =============================================================================
// RE-EXPORTS: Rules
// =============================================================================

pub use index::{PsiEntry, RuleIndex};
pub use pattern::{Bindings, Clause, PatternQuery, Term};
pub use rules::PsiRules;
pub use tags::{PsiRoots, TagKind};
