//! # Persistent Storage
//!
//! Disk-backed implementations of [`AtomStore`](crate::atomspace::AtomStore).

mod redb_atomspace;

pub use redb_atomspace::RedbAtomSpace;
