//! # Core Type Definitions
//!
//! This module contains the atom model shared by every part of the index:
//! - Atom identity (`Handle`)
//! - Atom classification (`AtomType`) and content (`Atom`)
//! - Strength/confidence annotation (`TruthValue`)
//! - The persisted unit of a store (`AtomRecord`)
//! - Error types (`PsiError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`

use crate::primitives::{TRUTH_SCALE, TRUTH_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// ATOM IDENTITY
// =============================================================================

/// Store-assigned identity of an atom (node or link).
///
/// Equality and ordering are by identity, never by structural content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Handle(pub u64);

impl Handle {
    /// Get the raw identity value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "atom:{}", self.0)
    }
}

// =============================================================================
// ATOM TYPES
// =============================================================================

/// The closed set of atom types used by the rule encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AtomType {
    /// A named concept; tags and category roots are concepts.
    ConceptNode,
    /// A named predicate, evaluated over a list of arguments.
    PredicateNode,
    /// A pattern variable. Never bound by a grounding.
    VariableNode,
    /// Ordered argument list.
    ListLink,
    /// `(EvaluationLink predicate (ListLink args...))`
    EvaluationLink,
    /// `(InheritanceLink child parent)`: the "is-a" relation.
    InheritanceLink,
    /// `(MemberLink member set)`: rule-to-demand membership.
    MemberLink,
    /// `(ImplicationLink antecedent consequent)`
    ImplicationLink,
    /// Ordered conjunction; order is significant.
    SequentialAndLink,
    /// Unordered conjunction.
    AndLink,
}

impl AtomType {
    /// Check if atoms of this type are nodes (named, no outgoing set).
    #[must_use]
    pub const fn is_node(self) -> bool {
        matches!(
            self,
            Self::ConceptNode | Self::PredicateNode | Self::VariableNode
        )
    }

    /// Check if atoms of this type are links (outgoing set, no name).
    #[must_use]
    pub const fn is_link(self) -> bool {
        !self.is_node()
    }

    /// The canonical type name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ConceptNode => "ConceptNode",
            Self::PredicateNode => "PredicateNode",
            Self::VariableNode => "VariableNode",
            Self::ListLink => "ListLink",
            Self::EvaluationLink => "EvaluationLink",
            Self::InheritanceLink => "InheritanceLink",
            Self::MemberLink => "MemberLink",
            Self::ImplicationLink => "ImplicationLink",
            Self::SequentialAndLink => "SequentialAndLink",
            Self::AndLink => "AndLink",
        }
    }
}

impl fmt::Display for AtomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// ATOM
// =============================================================================

/// Structural content of an atom.
///
/// Two atoms with equal content are the same atom: stores deduplicate on
/// this value and hand back the existing `Handle`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Atom {
    /// A named node.
    Node { atom_type: AtomType, name: String },
    /// A link over an ordered outgoing set.
    Link {
        atom_type: AtomType,
        outgoing: Vec<Handle>,
    },
}

impl Atom {
    /// Create node content.
    #[must_use]
    pub fn node(atom_type: AtomType, name: impl Into<String>) -> Self {
        Self::Node {
            atom_type,
            name: name.into(),
        }
    }

    /// Create link content.
    #[must_use]
    pub fn link(atom_type: AtomType, outgoing: Vec<Handle>) -> Self {
        Self::Link {
            atom_type,
            outgoing,
        }
    }

    /// The type of this atom.
    #[must_use]
    pub fn atom_type(&self) -> AtomType {
        match self {
            Self::Node { atom_type, .. } | Self::Link { atom_type, .. } => *atom_type,
        }
    }

    /// The node name, or `None` for links.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Node { name, .. } => Some(name),
            Self::Link { .. } => None,
        }
    }

    /// The outgoing set. Empty for nodes.
    #[must_use]
    pub fn outgoing(&self) -> &[Handle] {
        match self {
            Self::Node { .. } => &[],
            Self::Link { outgoing, .. } => outgoing,
        }
    }

    /// Check if this atom is a `VariableNode`.
    #[must_use]
    pub fn is_variable(&self) -> bool {
        self.atom_type() == AtomType::VariableNode
    }
}

// =============================================================================
// TRUTH VALUE
// =============================================================================

/// Strength/confidence annotation of an atom.
///
/// Both components are per-mille integers in `0..=TRUTH_SCALE`.
/// The store only records them; arithmetic over truth values lives elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TruthValue {
    /// How true the atom is (per mille).
    pub strength: u16,
    /// How much evidence backs the strength (per mille).
    pub confidence: u16,
}

impl TruthValue {
    /// Value assigned to newly created atoms: full strength, no evidence.
    pub const DEFAULT: Self = Self {
        strength: TRUTH_SCALE,
        confidence: 0,
    };

    /// Full strength, full confidence.
    pub const TRUE: Self = Self {
        strength: TRUTH_SCALE,
        confidence: TRUTH_SCALE,
    };

    /// Zero strength, full confidence.
    pub const FALSE: Self = Self {
        strength: 0,
        confidence: TRUTH_SCALE,
    };

    /// Create a truth value, clamping both components to `TRUTH_SCALE`.
    #[must_use]
    pub fn new(strength: u16, confidence: u16) -> Self {
        Self {
            strength: strength.min(TRUTH_SCALE),
            confidence: confidence.min(TRUTH_SCALE),
        }
    }

    /// Check if the atom counts as currently true.
    ///
    /// Requires strength at or above `TRUTH_THRESHOLD` and some evidence.
    #[must_use]
    pub fn holds(self) -> bool {
        self.strength >= TRUTH_THRESHOLD && self.confidence > 0
    }
}

impl Default for TruthValue {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// =============================================================================
// ATOM RECORD
// =============================================================================

/// An atom together with its identity and truth value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomRecord {
    /// The store-assigned identity.
    pub handle: Handle,
    /// The structural content.
    pub atom: Atom,
    /// The current annotation.
    pub tv: TruthValue,
}

impl AtomRecord {
    /// Create a record carrying the default truth value.
    #[must_use]
    pub fn new(handle: Handle, atom: Atom) -> Self {
        Self {
            handle,
            atom,
            tv: TruthValue::DEFAULT,
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the psi-rule index.
///
/// - No silent failures
/// - Use `Result<T, PsiError>` for fallible operations
/// - Store failures are propagated unchanged, never translated
#[derive(Debug, Error)]
pub enum PsiError {
    /// An input handle does not resolve in the store.
    #[error("Atom not found: {0}")]
    InvalidHandle(Handle),

    /// An atom type was used where it is not allowed.
    #[error("Atom type {0} is not valid here")]
    InvalidAtomType(AtomType),

    /// A node name is empty or too long.
    #[error("Invalid node name: {0}")]
    InvalidName(String),

    /// A link has more outgoing atoms than allowed.
    #[error("Link arity {0} exceeds the maximum")]
    ArityExceeded(usize),

    /// The action of a rule also appears as a context condition.
    #[error("Action {0} must not appear in the rule context")]
    ActionInContext(Handle),

    /// The demand handle is not tagged as a demand.
    #[error("{0} is not a demand")]
    NotADemand(Handle),

    /// The rule context has more conditions than allowed.
    #[error("Context length {0} exceeds the maximum")]
    ContextTooLarge(usize),

    /// A context cannot be compiled into a query.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Query evaluation tried more candidates than allowed.
    #[error("Grounding search exceeded {0} candidate checks")]
    GroundingLimit(usize),

    /// A rule handle was never registered in this index.
    #[error("Rule not indexed: {0}")]
    RuleNotIndexed(Handle),

    /// The underlying store rejected an operation.
    #[error("Store error: {0}")]
    StoreError(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
