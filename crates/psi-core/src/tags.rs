//! # Tag Registry
//!
//! Category markers (demands, goals, action categories) are concept nodes
//! linked to a fixed root concept by an `InheritanceLink`:
//!
//! ```text
//! (InheritanceLink (ConceptNode "Energy") (ConceptNode "psi-demand"))
//! ```
//!
//! Tag creation is idempotent by name: the node and the link are each
//! created at most once per category.

use crate::atomspace::AtomStore;
use crate::primitives::{PSI_ACTION_ROOT, PSI_DEMAND_ROOT, PSI_GOAL_ROOT};
use crate::{AtomType, Handle, PsiError};

/// The tag categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TagKind {
    /// Action categories.
    Action,
    /// Desired-state tags that rule consequents target.
    Goal,
    /// Motivational categories that group rules.
    Demand,
}

impl TagKind {
    /// All categories.
    pub const ALL: [Self; 3] = [Self::Action, Self::Goal, Self::Demand];

    /// Name of the root concept for this category.
    #[must_use]
    pub const fn root_name(self) -> &'static str {
        match self {
            Self::Action => PSI_ACTION_ROOT,
            Self::Goal => PSI_GOAL_ROOT,
            Self::Demand => PSI_DEMAND_ROOT,
        }
    }
}

/// Root category nodes, resolved once when binding to a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PsiRoots {
    /// Root of all action categories.
    pub action: Handle,
    /// Root of all goal tags.
    pub goal: Handle,
    /// Root of all demand tags.
    pub demand: Handle,
}

impl PsiRoots {
    /// Resolve all roots, creating them if needed.
    pub fn resolve<S: AtomStore + ?Sized>(store: &mut S) -> Result<Self, PsiError> {
        Ok(Self {
            action: store.add_node(AtomType::ConceptNode, TagKind::Action.root_name())?,
            goal: store.add_node(AtomType::ConceptNode, TagKind::Goal.root_name())?,
            demand: store.add_node(AtomType::ConceptNode, TagKind::Demand.root_name())?,
        })
    }

    /// Root handle for a category.
    #[must_use]
    pub const fn root(&self, kind: TagKind) -> Handle {
        match kind {
            TagKind::Action => self.action,
            TagKind::Goal => self.goal,
            TagKind::Demand => self.demand,
        }
    }
}

/// Create or find the tag `name` under `root`.
///
/// Root names are reserved and rejected with `InvalidName`.
pub fn add_tag<S: AtomStore + ?Sized>(
    store: &mut S,
    root: Handle,
    name: &str,
) -> Result<Handle, PsiError> {
    if TagKind::ALL.iter().any(|kind| kind.root_name() == name) {
        return Err(PsiError::InvalidName(format!("'{}' is a reserved root name", name)));
    }
    let tag = store.add_node(AtomType::ConceptNode, name)?;
    if !store.link_exists(AtomType::InheritanceLink, &[tag, root]) {
        store.add_link(AtomType::InheritanceLink, &[tag, root])?;
        tracing::debug!(%tag, %root, name, "tag created");
    }
    Ok(tag)
}

/// Check if `handle` is a tag directly under `root`.
pub fn is_tag<S: AtomStore + ?Sized>(store: &S, root: Handle, handle: Handle) -> bool {
    store.link_exists(AtomType::InheritanceLink, &[handle, root])
}

/// Every tag directly under `root`, in handle order.
pub fn tags_under<S: AtomStore + ?Sized>(store: &S, root: Handle) -> Result<Vec<Handle>, PsiError> {
    let mut tags = Vec::new();
    for link in store.incoming(root)? {
        let Some(atom) = store.get_atom(link)? else {
            continue;
        };
        if atom.atom_type() != AtomType::InheritanceLink {
            continue;
        }
        match atom.outgoing() {
            [tag, parent] if *parent == root => tags.push(*tag),
            _ => {}
        }
    }
    tags.sort_unstable();
    tags.dedup();
    Ok(tags)
}

// =============================================================================
// TESTS
// =============================================================================
