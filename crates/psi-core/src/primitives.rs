//! # Fixed Primitives
//!
//! Hardcoded constants for the psi-rule index.
//!
//! These are compiled into the binary and immutable at runtime.

// =============================================================================
// CATEGORY ROOTS
// =============================================================================

/// Name of the root concept every action category inherits from.
pub const PSI_ACTION_ROOT: &str = "psi-action";

/// Name of the root concept every goal tag inherits from.
pub const PSI_GOAL_ROOT: &str = "psi-goal";

/// Name of the root concept every demand tag inherits from.
pub const PSI_DEMAND_ROOT: &str = "psi-demand";

// =============================================================================
// TRUTH VALUES
// =============================================================================

/// Upper bound of the per-mille truth value components.
pub const TRUTH_SCALE: u16 = 1000;

/// Minimum strength for an atom to count as true.
///
/// - Ground clauses of a context hold only above this strength.
/// - Candidate groundings for variable clauses must also be above it.
pub const TRUTH_THRESHOLD: u16 = 500;

// =============================================================================
// COMPUTATIONAL BOUNDS
// =============================================================================

/// Maximum length of a node name.
pub const MAX_NAME_LENGTH: usize = 256;

/// Maximum number of outgoing atoms in a link.
pub const MAX_LINK_ARITY: usize = 1024;

/// Maximum number of conditions in a rule context.
///
/// The antecedent link holds the context plus the action, so this stays
/// below `MAX_LINK_ARITY`.
pub const MAX_CONTEXT_LENGTH: usize = 256;

/// Maximum nesting depth of a compiled clause.
pub const MAX_PATTERN_DEPTH: usize = 64;

/// Maximum number of candidate atoms tried while searching for a grounding.
///
/// All queries must be computationally bounded. Exceeding the budget is an
/// error, never a negative answer.
pub const MAX_GROUNDING_STEPS: usize = 1_000_000;
