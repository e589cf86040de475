//! # redb-backed Atom Storage
//!
//! A disk-backed atom store using the redb embedded database, providing:
//! - ACID transactions (one per write)
//! - Crash safety (copy-on-write B-trees)
//! - Stable handles across reopen
//!
//! Atom records are postcard-encoded. The structural indexes needed for
//! deduplication and incoming-set queries are kept in memory and rebuilt
//! from the atoms table on open.

use crate::atomspace::{AtomStore, validate_link, validate_node};
use crate::{Atom, AtomRecord, AtomType, Handle, PsiError, TruthValue};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Table for atoms: Handle(u64) -> serialized AtomRecord bytes
const ATOMS: TableDefinition<u64, &[u8]> = TableDefinition::new("atoms");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const NEXT_HANDLE_KEY: &str = "next_handle";

fn io_error(e: impl std::fmt::Display) -> PsiError {
    PsiError::IoError(e.to_string())
}

/// A disk-backed atom store using redb.
pub struct RedbAtomSpace {
    /// The redb database handle.
    db: Database,
    /// (type, name) -> Handle
    node_index: BTreeMap<(AtomType, String), Handle>,
    /// (type, outgoing) -> Handle
    link_index: BTreeMap<(AtomType, Vec<Handle>), Handle>,
    /// target -> links containing it
    incoming: BTreeMap<Handle, BTreeSet<Handle>>,
    /// type -> atoms of that type
    type_index: BTreeMap<AtomType, BTreeSet<Handle>>,
    /// Next available handle.
    next_handle: u64,
}

impl std::fmt::Debug for RedbAtomSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbAtomSpace")
            .field("node_index_size", &self.node_index.len())
            .field("link_index_size", &self.link_index.len())
            .field("next_handle", &self.next_handle)
            .finish_non_exhaustive()
    }
}

impl RedbAtomSpace {
    /// Open or create an atom database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PsiError> {
        let db = Database::create(path.as_ref()).map_err(io_error)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io_error)?;
            let _ = write_txn.open_table(ATOMS).map_err(io_error)?;
            let _ = write_txn.open_table(METADATA).map_err(io_error)?;
            write_txn.commit().map_err(io_error)?;
        }

        let mut space = Self {
            db,
            node_index: BTreeMap::new(),
            link_index: BTreeMap::new(),
            incoming: BTreeMap::new(),
            type_index: BTreeMap::new(),
            next_handle: 1,
        };

        let read_txn = space.db.begin_read().map_err(io_error)?;

        space.next_handle = {
            let table = read_txn.open_table(METADATA).map_err(io_error)?;
            table
                .get(NEXT_HANDLE_KEY)
                .map_err(io_error)?
                .map(|v| v.value())
                .unwrap_or(1)
        };

        // Rebuild structural indexes
        let records = {
            let table = read_txn.open_table(ATOMS).map_err(io_error)?;
            let mut records = Vec::new();
            for entry in table.iter().map_err(io_error)? {
                let (_key, value) = entry.map_err(io_error)?;
                let record: AtomRecord = postcard::from_bytes(value.value())
                    .map_err(|e| PsiError::DeserializationError(e.to_string()))?;
                records.push(record);
            }
            records
        };
        drop(read_txn);

        for record in records {
            space.index_atom(record.handle, &record.atom);
        }

        tracing::debug!(
            atoms = space.type_index.values().map(BTreeSet::len).sum::<usize>(),
            next_handle = space.next_handle,
            "opened redb atom space"
        );

        Ok(space)
    }

    /// Compact the database (optional optimization).
    pub fn compact(&mut self) -> Result<(), PsiError> {
        self.db.compact().map_err(io_error)?;
        Ok(())
    }

    /// Get the next handle that would be assigned.
    #[must_use]
    pub fn next_handle(&self) -> u64 {
        self.next_handle
    }

    fn index_atom(&mut self, handle: Handle, atom: &Atom) {
        match atom {
            Atom::Node { atom_type, name } => {
                self.node_index.insert((*atom_type, name.clone()), handle);
            }
            Atom::Link {
                atom_type,
                outgoing,
            } => {
                self.link_index
                    .insert((*atom_type, outgoing.clone()), handle);
                for target in outgoing {
                    self.incoming.entry(*target).or_default().insert(handle);
                }
            }
        }
        self.type_index
            .entry(atom.atom_type())
            .or_default()
            .insert(handle);
    }

    fn read_record(&self, handle: Handle) -> Result<Option<AtomRecord>, PsiError> {
        let read_txn = self.db.begin_read().map_err(io_error)?;
        let table = read_txn.open_table(ATOMS).map_err(io_error)?;

        match table.get(handle.0).map_err(io_error)? {
            Some(data) => {
                let record: AtomRecord = postcard::from_bytes(data.value())
                    .map_err(|e| PsiError::DeserializationError(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Write a record, and optionally the handle counter, in one transaction.
    fn write_record(&self, record: &AtomRecord, next_handle: Option<u64>) -> Result<(), PsiError> {
        let bytes = postcard::to_allocvec(record)
            .map_err(|e| PsiError::SerializationError(e.to_string()))?;

        let write_txn = self.db.begin_write().map_err(io_error)?;
        {
            let mut atoms_table = write_txn.open_table(ATOMS).map_err(io_error)?;
            atoms_table
                .insert(record.handle.0, bytes.as_slice())
                .map_err(io_error)?;
        }
        if let Some(next) = next_handle {
            let mut meta_table = write_txn.open_table(METADATA).map_err(io_error)?;
            meta_table.insert(NEXT_HANDLE_KEY, next).map_err(io_error)?;
        }
        write_txn.commit().map_err(io_error)?;
        Ok(())
    }

    fn allocate(&mut self, atom: Atom) -> Result<Handle, PsiError> {
        let handle = Handle(self.next_handle);
        let next = self.next_handle.saturating_add(1);

        let record = AtomRecord::new(handle, atom);
        self.write_record(&record, Some(next))?;

        // Caches only change once the transaction committed
        self.next_handle = next;
        self.index_atom(handle, &record.atom);
        Ok(handle)
    }
}

// =============================================================================
// ATOMSTORE TRAIT IMPLEMENTATION
// =============================================================================

impl AtomStore for RedbAtomSpace {
    fn add_node(&mut self, atom_type: AtomType, name: &str) -> Result<Handle, PsiError> {
        validate_node(atom_type, name)?;
        if let Some(handle) = self.get_node(atom_type, name) {
            return Ok(handle);
        }
        self.allocate(Atom::node(atom_type, name))
    }

    fn add_link(&mut self, atom_type: AtomType, outgoing: &[Handle]) -> Result<Handle, PsiError> {
        validate_link(atom_type, outgoing)?;
        for target in outgoing {
            if !self.contains(*target)? {
                return Err(PsiError::InvalidHandle(*target));
            }
        }
        if let Some(handle) = self.get_link(atom_type, outgoing) {
            return Ok(handle);
        }
        self.allocate(Atom::link(atom_type, outgoing.to_vec()))
    }

    fn get_atom(&self, handle: Handle) -> Result<Option<Atom>, PsiError> {
        Ok(self.read_record(handle)?.map(|record| record.atom))
    }

    fn contains(&self, handle: Handle) -> Result<bool, PsiError> {
        let read_txn = self.db.begin_read().map_err(io_error)?;
        let table = read_txn.open_table(ATOMS).map_err(io_error)?;
        Ok(table.get(handle.0).map_err(io_error)?.is_some())
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
        self.read_record(handle)?
            .map(|record| record.tv)
            .ok_or(PsiError::InvalidHandle(handle))
    }

    fn set_truth_value(&mut self, handle: Handle, tv: TruthValue) -> Result<(), PsiError> {
        let mut record = self
            .read_record(handle)?
            .ok_or(PsiError::InvalidHandle(handle))?;
        if record.tv == tv {
            return Ok(());
        }
        record.tv = tv;
        self.write_record(&record, None)
    }

    fn incoming(&self, handle: Handle) -> Result<Vec<Handle>, PsiError> {
        if !self.contains(handle)? {
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
        let read_txn = self.db.begin_read().map_err(io_error)?;
        let table = read_txn.open_table(ATOMS).map_err(io_error)?;
        let count = table.len().map_err(io_error)?;
        Ok(count as usize)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn basic_operations() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");
        let mut space = RedbAtomSpace::open(&db_path).expect("open db");

        let a = space.add_node(AtomType::ConceptNode, "a").expect("add");
        let b = space.add_node(AtomType::ConceptNode, "b").expect("add");
        assert_ne!(a, b);

        let link = space
            .add_link(AtomType::InheritanceLink, &[a, b])
            .expect("link");
        assert_eq!(space.atom_count().expect("count"), 3);
        assert_eq!(
            space.get_atom(link).expect("get"),
            Some(Atom::link(AtomType::InheritanceLink, vec![a, b]))
        );
        assert_eq!(space.incoming(a).expect("incoming"), vec![link]);
    }

    #[test]
    fn deduplication() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");
        let mut space = RedbAtomSpace::open(&db_path).expect("open db");

        let first = space.add_node(AtomType::ConceptNode, "a").expect("add");
        let second = space.add_node(AtomType::ConceptNode, "a").expect("add");
        assert_eq!(first, second);

        let l1 = space.add_link(AtomType::ListLink, &[first]).expect("link");
        let l2 = space.add_link(AtomType::ListLink, &[first]).expect("link");
        assert_eq!(l1, l2);
        assert_eq!(space.atom_count().expect("count"), 2);
    }

    #[test]
    fn dangling_outgoing_rejected() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");
        let mut space = RedbAtomSpace::open(&db_path).expect("open db");

        let result = space.add_link(AtomType::ListLink, &[Handle(42)]);
        assert!(matches!(result, Err(PsiError::InvalidHandle(Handle(42)))));
        assert_eq!(space.atom_count().expect("count"), 0);
    }

    #[test]
    fn truth_value_persists() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        let handle = {
            let mut space = RedbAtomSpace::open(&db_path).expect("open db");
            let h = space.add_node(AtomType::PredicateNode, "p").expect("add");
            space
                .set_truth_value(h, TruthValue::new(900, 700))
                .expect("set");
            h
        };

        let space = RedbAtomSpace::open(&db_path).expect("reopen db");
        assert_eq!(
            space.truth_value(handle).expect("tv"),
            TruthValue::new(900, 700)
        );
    }

    #[test]
    fn recovery_indexes_after_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        let (a, b, link) = {
            let mut space = RedbAtomSpace::open(&db_path).expect("open db");
            let a = space.add_node(AtomType::ConceptNode, "a").expect("add");
            let b = space.add_node(AtomType::ConceptNode, "b").expect("add");
            let link = space
                .add_link(AtomType::MemberLink, &[a, b])
                .expect("link");
            (a, b, link)
        };
        // Space dropped here, simulating process exit

        let mut space = RedbAtomSpace::open(&db_path).expect("reopen db");
        assert_eq!(space.atom_count().expect("count"), 3);
        assert_eq!(space.get_node(AtomType::ConceptNode, "a"), Some(a));
        assert_eq!(space.get_link(AtomType::MemberLink, &[a, b]), Some(link));
        assert_eq!(space.incoming(b).expect("incoming"), vec![link]);
        assert_eq!(
            space.atoms_of_type(AtomType::ConceptNode).expect("type"),
            vec![a, b]
        );

        // Same content after restart keeps its identity
        let again = space
            .add_link(AtomType::MemberLink, &[a, b])
            .expect("link");
        assert_eq!(again, link);

        // New content continues after the last handle
        let c = space.add_node(AtomType::ConceptNode, "c").expect("add");
        assert_eq!(c, Handle(link.0 + 1));
    }

    #[test]
    fn recovery_compact_and_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        {
            let mut space = RedbAtomSpace::open(&db_path).expect("open db");
            for i in 0..50 {
                space
                    .add_node(AtomType::ConceptNode, &format!("n{i}"))
                    .expect("add");
            }
            space.compact().expect("compact");
        }

        let space = RedbAtomSpace::open(&db_path).expect("reopen db");
        assert_eq!(space.atom_count().expect("count"), 50);
        assert_eq!(space.next_handle(), 51);
    }
}
