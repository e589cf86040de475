//! # Pattern Module
//!
//! Compiled satisfiability queries over a rule context.
//!
//! - A context compiles into one clause per condition atom
//! - Fully ground sub-trees collapse to a single handle
//! - Compilation never adds atoms to the store
//! - Evaluation is depth-first and bounded by `MAX_GROUNDING_STEPS`

use crate::atomspace::AtomStore;
use crate::primitives::{MAX_GROUNDING_STEPS, MAX_PATTERN_DEPTH};
use crate::{Atom, AtomType, Handle, PsiError};
use std::collections::{BTreeMap, BTreeSet};

/// Variable bindings: VariableNode handle -> grounding handle.
pub type Bindings = BTreeMap<Handle, Handle>;

/// A compiled clause term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// A sub-tree without variables; matches only this exact atom.
    Ground(Handle),
    /// A pattern variable.
    Variable(Handle),
    /// A link with at least one variable below it.
    Link {
        atom_type: AtomType,
        outgoing: Vec<Term>,
    },
}

impl Term {
    fn is_ground(&self) -> bool {
        matches!(self, Self::Ground(_))
    }

    fn collect_variables(&self, into: &mut BTreeSet<Handle>) {
        match self {
            Self::Ground(_) => {}
            Self::Variable(v) => {
                into.insert(*v);
            }
            Self::Link { outgoing, .. } => {
                for term in outgoing {
                    term.collect_variables(into);
                }
            }
        }
    }
}

/// One compiled context condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    /// The context atom this clause was compiled from.
    pub source: Handle,
    /// The compiled term.
    pub term: Term,
}

/// A precompiled query asking "does this context hold right now?".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PatternQuery {
    clauses: Vec<Clause>,
    variables: BTreeSet<Handle>,
}

impl PatternQuery {
    /// Compile a context into a query.
    ///
    /// Ground clauses are placed ahead of variable clauses; relative order
    /// within each group follows the context.
    pub fn compile<S: AtomStore + ?Sized>(
        store: &S,
        context: &[Handle],
    ) -> Result<Self, PsiError> {
        let mut ground = Vec::new();
        let mut open = Vec::new();

        for &source in context {
            let term = compile_term(store, source, 0)?;
            match term {
                Term::Variable(_) => {
                    return Err(PsiError::InvalidPattern(format!(
                        "clause {source} is a bare variable"
                    )));
                }
                Term::Ground(_) => ground.push(Clause { source, term }),
                Term::Link { .. } => open.push(Clause { source, term }),
            }
        }

        let mut variables = BTreeSet::new();
        for clause in &open {
            clause.term.collect_variables(&mut variables);
        }

        ground.extend(open);
        Ok(Self {
            clauses: ground,
            variables,
        })
    }

    /// The compiled clauses in evaluation order.
    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// The variables appearing in the query.
    #[must_use]
    pub fn variables(&self) -> &BTreeSet<Handle> {
        &self.variables
    }

    /// Check if the query has no clauses (always satisfiable).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Search for variable bindings that make every clause hold.
    ///
    /// Depth-first over the clauses in evaluation order, stopping at the
    /// first complete grounding. Returns `Some(Bindings::new())` for a
    /// satisfied query without variables.
    ///
    /// # Errors
    ///
    /// `GroundingLimit` once more than `MAX_GROUNDING_STEPS` candidates
    /// have been tried. Store errors are propagated.
    pub fn find_grounding<S: AtomStore + ?Sized>(
        &self,
        store: &S,
    ) -> Result<Option<Bindings>, PsiError> {
        let mut steps = 0usize;
        let mut bindings = Bindings::new();
        if search(store, &self.clauses, &mut bindings, &mut steps)? {
            Ok(Some(bindings))
        } else {
            Ok(None)
        }
    }

    /// Check if the context currently holds against the store.
    pub fn is_satisfiable<S: AtomStore + ?Sized>(&self, store: &S) -> Result<bool, PsiError> {
        Ok(self.find_grounding(store)?.is_some())
    }
}

// =============================================================================
// COMPILATION
// =============================================================================

fn compile_term<S: AtomStore + ?Sized>(
    store: &S,
    handle: Handle,
    depth: usize,
) -> Result<Term, PsiError> {
    if depth > MAX_PATTERN_DEPTH {
        return Err(PsiError::InvalidPattern(format!(
            "nesting deeper than {MAX_PATTERN_DEPTH}"
        )));
    }

    let atom = store
        .get_atom(handle)?
        .ok_or(PsiError::InvalidHandle(handle))?;

    match atom {
        Atom::Node { atom_type, .. } if atom_type == AtomType::VariableNode => {
            Ok(Term::Variable(handle))
        }
        Atom::Node { .. } => Ok(Term::Ground(handle)),
        Atom::Link {
            atom_type,
            outgoing,
        } => {
            let terms = outgoing
                .iter()
                .map(|h| compile_term(store, *h, depth.saturating_add(1)))
                .collect::<Result<Vec<_>, _>>()?;
            if terms.iter().all(Term::is_ground) {
                Ok(Term::Ground(handle))
            } else {
                Ok(Term::Link {
                    atom_type,
                    outgoing: terms,
                })
            }
        }
    }
}

// =============================================================================
// MATCHING
// =============================================================================

/// Ground `clauses` in order, extending `bindings`.
///
/// On success `bindings` holds the full grounding; on failure it is left as
/// it was on entry.
fn search<S: AtomStore + ?Sized>(
    store: &S,
    clauses: &[Clause],
    bindings: &mut Bindings,
    steps: &mut usize,
) -> Result<bool, PsiError> {
    let Some((clause, rest)) = clauses.split_first() else {
        return Ok(true);
    };

    match &clause.term {
        Term::Ground(handle) => {
            if !store.truth_value(*handle)?.holds() {
                return Ok(false);
            }
            search(store, rest, bindings, steps)
        }
        Term::Variable(_) => Ok(false),
        Term::Link {
            atom_type,
            outgoing,
        } => {
            for candidate in candidates(store, *atom_type, outgoing, bindings)? {
                *steps = steps.saturating_add(1);
                if *steps > MAX_GROUNDING_STEPS {
                    tracing::debug!(clause = %clause.source, "grounding step limit reached");
                    return Err(PsiError::GroundingLimit(MAX_GROUNDING_STEPS));
                }
                if !store.truth_value(candidate)?.holds() {
                    continue;
                }
                let mut extended = bindings.clone();
                if unify_link(store, *atom_type, outgoing, candidate, &mut extended)?
                    && search(store, rest, &mut extended, steps)?
                {
                    *bindings = extended;
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

/// A term's identity under the current bindings.
enum Resolved {
    /// Fully determined and present in the store.
    Atom(Handle),
    /// Fully determined but absent, so nothing can match it.
    Missing,
    /// Still contains an unbound variable.
    Open,
}

fn resolve<S: AtomStore + ?Sized>(store: &S, term: &Term, bindings: &Bindings) -> Resolved {
    match term {
        Term::Ground(handle) => Resolved::Atom(*handle),
        Term::Variable(var) => bindings
            .get(var)
            .map_or(Resolved::Open, |bound| Resolved::Atom(*bound)),
        Term::Link {
            atom_type,
            outgoing,
        } => {
            let mut handles = Vec::with_capacity(outgoing.len());
            let mut open = false;
            for child in outgoing {
                match resolve(store, child, bindings) {
                    Resolved::Atom(handle) => handles.push(handle),
                    Resolved::Missing => return Resolved::Missing,
                    Resolved::Open => open = true,
                }
            }
            if open {
                Resolved::Open
            } else {
                store
                    .get_link(*atom_type, &handles)
                    .map_or(Resolved::Missing, Resolved::Atom)
            }
        }
    }
}

/// Candidate atoms for a link clause.
///
/// A fully bound clause has at most one candidate. Otherwise the smallest
/// incoming set among the resolved children is used, falling back to every
/// atom of the type when no child is resolved.
fn candidates<S: AtomStore + ?Sized>(
    store: &S,
    atom_type: AtomType,
    outgoing: &[Term],
    bindings: &Bindings,
) -> Result<Vec<Handle>, PsiError> {
    let mut resolved = Vec::with_capacity(outgoing.len());
    let mut open = false;
    for child in outgoing {
        match resolve(store, child, bindings) {
            Resolved::Atom(handle) => resolved.push(handle),
            Resolved::Missing => return Ok(Vec::new()),
            Resolved::Open => open = true,
        }
    }

    if !open {
        return Ok(store.get_link(atom_type, &resolved).into_iter().collect());
    }

    let mut anchor: Option<Vec<Handle>> = None;
    for handle in resolved {
        let incoming = store.incoming(handle)?;
        if anchor
            .as_ref()
            .is_none_or(|best| incoming.len() < best.len())
        {
            anchor = Some(incoming);
        }
    }
    match anchor {
        Some(incoming) => Ok(incoming),
        None => store.atoms_of_type(atom_type),
    }
}

fn unify_link<S: AtomStore + ?Sized>(
    store: &S,
    atom_type: AtomType,
    terms: &[Term],
    candidate: Handle,
    bindings: &mut Bindings,
) -> Result<bool, PsiError> {
    let Some(atom) = store.get_atom(candidate)? else {
        return Ok(false);
    };
    if atom.atom_type() != atom_type || atom.outgoing().len() != terms.len() {
        return Ok(false);
    }
    for (term, &target) in terms.iter().zip(atom.outgoing()) {
        if !unify(store, term, target, bindings)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn unify<S: AtomStore + ?Sized>(
    store: &S,
    term: &Term,
    candidate: Handle,
    bindings: &mut Bindings,
) -> Result<bool, PsiError> {
    match term {
        Term::Ground(handle) => Ok(*handle == candidate),
        Term::Variable(var) => {
            if let Some(&bound) = bindings.get(var) {
                return Ok(bound == candidate);
            }
            // Variables ground to content, never to other variables
            let is_variable = store
                .get_atom(candidate)?
                .is_some_and(|atom| atom.is_variable());
            if is_variable {
                return Ok(false);
            }
            bindings.insert(*var, candidate);
            Ok(true)
        }
        Term::Link {
            atom_type,
            outgoing,
        } => unify_link(store, *atom_type, outgoing, candidate, bindings),
    }
}

// =============================================================================
// TESTS
// =============================================================================
