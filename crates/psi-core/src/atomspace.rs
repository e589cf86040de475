//! # Atom Store
//!
//! The hypergraph store interface consumed by the rule index, and a
//! deterministic in-memory implementation.
//!
//! All data structures use `BTreeMap` for deterministic ordering.

use crate::primitives::{MAX_LINK_ARITY, MAX_NAME_LENGTH};
use crate::{Atom, AtomRecord, AtomType, Handle, PsiError, TruthValue};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// ATOMSTORE TRAIT
// =============================================================================

/// The AtomStore trait defines the store operations the index relies on.
///
/// Stores assign identities and deduplicate by structure: adding content
/// that already exists returns the existing `Handle`.
///
/// All fallible operations return `Result<T, PsiError>` to support both
/// in-memory and persistent storage backends uniformly.
pub trait AtomStore {
    /// Insert a node. Returns the existing handle if the node already exists.
    fn add_node(&mut self, atom_type: AtomType, name: &str) -> Result<Handle, PsiError>;

    /// Insert a link. Returns the existing handle if the link already exists.
    ///
    /// Every outgoing handle must already be present in the store.
    fn add_link(&mut self, atom_type: AtomType, outgoing: &[Handle]) -> Result<Handle, PsiError>;

    /// Lookup an atom's content by handle.
    fn get_atom(&self, handle: Handle) -> Result<Option<Atom>, PsiError>;

    /// Check if a handle resolves in the store.
    fn contains(&self, handle: Handle) -> Result<bool, PsiError>;

    /// Find a node by type and name. Infallible (uses in-memory index).
    fn get_node(&self, atom_type: AtomType, name: &str) -> Option<Handle>;

    /// Find a link by type and outgoing set. Infallible (uses in-memory index).
    fn get_link(&self, atom_type: AtomType, outgoing: &[Handle]) -> Option<Handle>;

    /// Get the truth value of an atom.
    fn truth_value(&self, handle: Handle) -> Result<TruthValue, PsiError>;

    /// Replace the truth value of an atom.
    fn set_truth_value(&mut self, handle: Handle, tv: TruthValue) -> Result<(), PsiError>;

    /// Get every link whose outgoing set contains the atom, in handle order.
    fn incoming(&self, handle: Handle) -> Result<Vec<Handle>, PsiError>;

    /// Get every atom of the given type, in handle order.
    fn atoms_of_type(&self, atom_type: AtomType) -> Result<Vec<Handle>, PsiError>;

    /// Get the total number of atoms.
    fn atom_count(&self) -> Result<usize, PsiError>;

    /// Register arbitrary atom content, dispatching on its kind.
    fn register(&mut self, atom: &Atom) -> Result<Handle, PsiError> {
        match atom {
            Atom::Node { atom_type, name } => self.add_node(*atom_type, name),
            Atom::Link {
                atom_type,
                outgoing,
            } => self.add_link(*atom_type, outgoing),
        }
    }

    /// Check if a link of the given type over exactly these endpoints exists.
    fn link_exists(&self, atom_type: AtomType, endpoints: &[Handle]) -> bool {
        self.get_link(atom_type, endpoints).is_some()
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Validate node content before insertion.
pub(crate) fn validate_node(atom_type: AtomType, name: &str) -> Result<(), PsiError> {
    if !atom_type.is_node() {
        return Err(PsiError::InvalidAtomType(atom_type));
    }
    if name.is_empty() {
        return Err(PsiError::InvalidName("name is empty".to_string()));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(PsiError::InvalidName(format!(
            "{} bytes exceeds {}",
            name.len(),
            MAX_NAME_LENGTH
        )));
    }
    Ok(())
}

/// Validate link shape before insertion. Outgoing existence is checked by the backend.
pub(crate) fn validate_link(atom_type: AtomType, outgoing: &[Handle]) -> Result<(), PsiError> {
    if !atom_type.is_link() {
        return Err(PsiError::InvalidAtomType(atom_type));
    }
    if outgoing.len() > MAX_LINK_ARITY {
        return Err(PsiError::ArityExceeded(outgoing.len()));
    }
    Ok(())
}

// =============================================================================
// ATOMSPACE IMPLEMENTATION
// =============================================================================

/// The in-memory atom store.
///
/// Uses `BTreeMap` exclusively for deterministic ordering.
/// No `HashMap` allowed.
#[derive(Debug, Clone)]
pub struct AtomSpace {
    /// Atom storage: Handle -> record
    atoms: BTreeMap<Handle, AtomRecord>,

    /// Reverse lookup for nodes: (type, name) -> Handle
    node_index: BTreeMap<(AtomType, String), Handle>,

    /// Reverse lookup for links: (type, outgoing) -> Handle
    link_index: BTreeMap<(AtomType, Vec<Handle>), Handle>,

    /// Incoming sets: target -> links containing it
    incoming: BTreeMap<Handle, BTreeSet<Handle>>,

    /// Per-type membership
    type_index: BTreeMap<AtomType, BTreeSet<Handle>>,

    /// Next available handle
    next_handle: u64,
}

impl Default for AtomSpace {
    fn default() -> Self {
        Self {
            atoms: BTreeMap::new(),
            node_index: BTreeMap::new(),
            link_index: BTreeMap::new(),
            incoming: BTreeMap::new(),
            type_index: BTreeMap::new(),
            next_handle: 1,
        }
    }
}

impl AtomSpace {
    /// Create a new empty atom space.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all records in deterministic order.
    pub fn records(&self) -> impl Iterator<Item = &AtomRecord> {
        self.atoms.values()
    }

    /// Get the next handle that would be assigned.
    #[must_use]
    pub fn next_handle(&self) -> u64 {
        self.next_handle
    }

    fn allocate(&mut self, atom: Atom) -> Handle {
        let handle = Handle(self.next_handle);
        self.next_handle = self.next_handle.saturating_add(1);

        for target in atom.outgoing() {
            self.incoming.entry(*target).or_default().insert(handle);
        }
        self.type_index
            .entry(atom.atom_type())
            .or_default()
            .insert(handle);
        self.atoms.insert(handle, AtomRecord::new(handle, atom));
        handle
    }
}

impl AtomStore for AtomSpace {
    fn add_node(&mut self, atom_type: AtomType, name: &str) -> Result<Handle, PsiError> {
        validate_node(atom_type, name)?;

        // Return existing node if already present
        if let Some(handle) = self.get_node(atom_type, name) {
            return Ok(handle);
        }

        let handle = self.allocate(Atom::node(atom_type, name));
        self.node_index
            .insert((atom_type, name.to_string()), handle);
        Ok(handle)
    }

    fn add_link(&mut self, atom_type: AtomType, outgoing: &[Handle]) -> Result<Handle, PsiError> {
        validate_link(atom_type, outgoing)?;

        if let Some(missing) = outgoing.iter().find(|h| !self.atoms.contains_key(h)) {
            return Err(PsiError::InvalidHandle(*missing));
        }

        if let Some(handle) = self.get_link(atom_type, outgoing) {
            return Ok(handle);
        }

        let handle = self.allocate(Atom::link(atom_type, outgoing.to_vec()));
        self.link_index
            .insert((atom_type, outgoing.to_vec()), handle);
        Ok(handle)
    }

    fn get_atom(&self, handle: Handle) -> Result<Option<Atom>, PsiError> {
        Ok(self.atoms.get(&handle).map(|record| record.atom.clone()))
    }

    fn contains(&self, handle: Handle) -> Result<bool, PsiError> {
        Ok(self.atoms.contains_key(&handle))
    }

    fn get_node(&self, atom_type: AtomType, name: &str) -> Option<Handle> {
        self.node_index
            .get(&(atom_type, name.to_string()))
            .copied()
    }

    fn get_link(&self, atom_type: AtomType, outgoing: &[Handle]) -> Option<Handle> {
        self.link_index
            .get(&(atom_type, outgoing.to_vec()))
            .copied()
    }

    fn truth_value(&self, handle: Handle) -> Result<TruthValue, PsiError> {
        self.atoms
            .get(&handle)
            .map(|record| record.tv)
            .ok_or(PsiError::InvalidHandle(handle))
    }

    fn set_truth_value(&mut self, handle: Handle, tv: TruthValue) -> Result<(), PsiError> {
        let record = self
            .atoms
            .get_mut(&handle)
            .ok_or(PsiError::InvalidHandle(handle))?;
        record.tv = tv;
        Ok(())
    }

    fn incoming(&self, handle: Handle) -> Result<Vec<Handle>, PsiError> {
        if !self.atoms.contains_key(&handle) {
            return Err(PsiError::InvalidHandle(handle));
        }
        Ok(self
            .incoming
            .get(&handle)
            .map(|links| links.iter().copied().collect())
            .unwrap_or_default())
    }

    fn atoms_of_type(&self, atom_type: AtomType) -> Result<Vec<Handle>, PsiError> {
        Ok(self
            .type_index
            .get(&atom_type)
            .map(|handles| handles.iter().copied().collect())
            .unwrap_or_default())
    }

    fn atom_count(&self) -> Result<usize, PsiError> {
        Ok(self.atoms.len())
    }
}

// =============================================================================
// TESTS
// =============================================================================
