//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//! Every command is generic over the store so the same code runs against
//! the in-memory and the redb backend.

use psi::{LoadReport, PsiConfig, Rulebook, load_rulebook};
use psi_core::primitives::MAX_PATTERN_DEPTH;
use psi_core::{Atom, AtomStore, AtomType, Handle, PsiError, PsiRules};
use std::path::{Path, PathBuf};

/// Output switches resolved from flags and config.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json_mode: bool,
    pub verbose: bool,
    pub quiet: bool,
}

// =============================================================================
// FILE VALIDATION
// =============================================================================

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), PsiError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| PsiError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(PsiError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize a path and require a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, PsiError> {
    let canonical = path.canonicalize().map_err(|e| {
        PsiError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(PsiError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Read and parse a rulebook after path and size checks.
pub fn read_rulebook(path: &Path, max_size: u64) -> Result<Rulebook, PsiError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, max_size)?;

    let text = std::fs::read_to_string(&validated)
        .map_err(|e| PsiError::IoError(format!("Read rulebook: {}", e)))?;
    Rulebook::from_toml(&text)
}

fn load_file<S: AtomStore>(
    psi: &mut PsiRules<S>,
    config: &PsiConfig,
    file: &Path,
) -> Result<LoadReport, PsiError> {
    let book = read_rulebook(file, config.max_rulebook_bytes)?;
    load_rulebook(psi, &book)
}

// =============================================================================
// LOAD COMMAND
// =============================================================================

/// Register a rulebook and print the rule handles.
pub fn cmd_load<S: AtomStore>(
    psi: &mut PsiRules<S>,
    config: &PsiConfig,
    output: Output,
    file: &Path,
) -> Result<(), PsiError> {
    let report = load_file(psi, config, file)?;

    if output.json_mode {
        let json = serde_json::json!({
            "file": file.to_string_lossy(),
            "facts": report.facts.len(),
            "rules": report.rules.iter().map(|h| h.value()).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        return Ok(());
    }

    for rule in &report.rules {
        println!("{}", rule);
    }
    if !output.quiet {
        println!(
            "Loaded {} facts and {} rules from {:?}",
            report.facts.len(),
            report.rules.len(),
            file
        );
    }

    Ok(())
}

// =============================================================================
// RULES COMMAND
// =============================================================================

/// Print each rule's decomposition, optionally restricted to one demand.
pub fn cmd_rules<S: AtomStore>(
    psi: &mut PsiRules<S>,
    config: &PsiConfig,
    output: Output,
    file: &Path,
    demand: Option<&str>,
) -> Result<(), PsiError> {
    load_file(psi, config, file)?;

    let rules = match demand {
        Some(name) => {
            let handle = psi
                .store()
                .get_node(AtomType::ConceptNode, name)
                .ok_or_else(|| PsiError::InvalidName(format!("unknown demand '{}'", name)))?;
            if !psi.is_demand(handle) {
                return Err(PsiError::NotADemand(handle));
            }
            psi.rules_for_demand(handle)?
        }
        None => psi.rules().collect(),
    };

    if output.json_mode {
        let mut entries = Vec::with_capacity(rules.len());
        for rule in &rules {
            let context = psi
                .get_context(*rule)?
                .iter()
                .map(|h| render(psi.store(), *h))
                .collect::<Result<Vec<_>, _>>()?;
            entries.push(serde_json::json!({
                "rule": rule.value(),
                "context": context,
                "action": render(psi.store(), psi.get_action(*rule)?)?,
                "goal": render(psi.store(), psi.get_goal(*rule)?)?,
                "truth": truth_json(psi.store(), *rule)?,
            }));
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "rules": entries }))
                .unwrap_or_default()
        );
        return Ok(());
    }

    for rule in &rules {
        println!("{}", rule);
        for condition in psi.get_context(*rule)? {
            println!("  when   {}", render(psi.store(), *condition)?);
        }
        println!("  do     {}", render(psi.store(), psi.get_action(*rule)?)?);
        println!("  expect {}", render(psi.store(), psi.get_goal(*rule)?)?);
        if output.verbose {
            let tv = psi.store().truth_value(*rule)?;
            println!("  truth  {}/{}", tv.strength, tv.confidence);
        }
    }
    if !output.quiet {
        println!("{} rules", rules.len());
    }

    Ok(())
}

// =============================================================================
// CHECK COMMAND
// =============================================================================

/// Evaluate each rule's context query against the store.
pub fn cmd_check<S: AtomStore>(
    psi: &mut PsiRules<S>,
    config: &PsiConfig,
    output: Output,
    file: &Path,
) -> Result<(), PsiError> {
    load_file(psi, config, file)?;

    let mut results = Vec::with_capacity(psi.rule_count());
    for rule in psi.rules() {
        let grounding = psi.get_query(rule)?.find_grounding(psi.store())?;
        results.push((rule, grounding));
    }
    let satisfied = results.iter().filter(|(_, g)| g.is_some()).count();
    tracing::info!(rules = results.len(), satisfied, "context check complete");

    if output.json_mode {
        let mut entries = Vec::with_capacity(results.len());
        for (rule, grounding) in &results {
            let bindings = match grounding {
                Some(bindings) => {
                    let mut map = serde_json::Map::new();
                    for (var, value) in bindings {
                        map.insert(render(psi.store(), *var)?, render(psi.store(), *value)?.into());
                    }
                    serde_json::Value::Object(map)
                }
                None => serde_json::Value::Null,
            };
            entries.push(serde_json::json!({
                "rule": rule.value(),
                "satisfied": grounding.is_some(),
                "bindings": bindings,
            }));
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "rules": entries }))
                .unwrap_or_default()
        );
        return Ok(());
    }

    for (rule, grounding) in &results {
        match grounding {
            Some(bindings) => {
                println!("{} satisfied", rule);
                for (var, value) in bindings {
                    println!(
                        "  {} = {}",
                        render(psi.store(), *var)?,
                        render(psi.store(), *value)?
                    );
                }
            }
            None => println!("{} unsatisfied", rule),
        }
    }
    if !output.quiet {
        println!("{}/{} rules satisfied", satisfied, results.len());
    }

    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show atom count and the demand and goal tags in the store.
pub fn cmd_status<S: AtomStore>(psi: &PsiRules<S>, output: Output) -> Result<(), PsiError> {
    let atoms = psi.store().atom_count()?;
    let demands = names(psi.store(), &psi.demands()?)?;
    let goals = names(psi.store(), &psi.goals()?)?;

    if output.json_mode {
        let json = serde_json::json!({
            "atom_count": atoms,
            "demands": demands,
            "goals": goals,
        });
        println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        return Ok(());
    }

    println!("Psi Store Status");
    println!("================");
    println!("Atoms:   {}", atoms);
    println!("Demands: {}", demands.join(", "));
    println!("Goals:   {}", goals.join(", "));

    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Render an atom as an s-expression; nodes render as their name.
pub fn render<S: AtomStore + ?Sized>(store: &S, handle: Handle) -> Result<String, PsiError> {
    let mut out = String::new();
    render_into(store, handle, 0, &mut out)?;
    Ok(out)
}

fn render_into<S: AtomStore + ?Sized>(
    store: &S,
    handle: Handle,
    depth: usize,
    out: &mut String,
) -> Result<(), PsiError> {
    if depth > MAX_PATTERN_DEPTH {
        out.push_str("...");
        return Ok(());
    }
    let atom = store
        .get_atom(handle)?
        .ok_or(PsiError::InvalidHandle(handle))?;

    match atom {
        Atom::Node { name, .. } => out.push_str(&name),
        Atom::Link {
            atom_type,
            outgoing,
        } => {
            out.push('(');
            out.push_str(atom_type.name());
            for child in outgoing {
                out.push(' ');
                render_into(store, child, depth.saturating_add(1), out)?;
            }
            out.push(')');
        }
    }
    Ok(())
}

fn names<S: AtomStore + ?Sized>(store: &S, handles: &[Handle]) -> Result<Vec<String>, PsiError> {
    handles.iter().map(|h| render(store, *h)).collect()
}

fn truth_json<S: AtomStore + ?Sized>(store: &S, rule: Handle) -> Result<serde_json::Value, PsiError> {
    let tv = store.truth_value(rule)?;
    Ok(serde_json::json!({
        "strength": tv.strength,
        "confidence": tv.confidence,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use psi_core::AtomSpace;

    #[test]
    fn render_nests_links() {
        let mut space = AtomSpace::new();
        let p = space.add_node(AtomType::PredicateNode, "seen").expect("p");
        let x = space.add_node(AtomType::VariableNode, "$x").expect("x");
        let list = space.add_link(AtomType::ListLink, &[x]).expect("list");
        let eval = space
            .add_link(AtomType::EvaluationLink, &[p, list])
            .expect("eval");

        assert_eq!(
            render(&space, eval).expect("render"),
            "(EvaluationLink seen (ListLink $x))"
        );
    }

    #[test]
    fn render_unknown_handle_fails() {
        let space = AtomSpace::new();
        assert!(matches!(
            render(&space, Handle(42)),
            Err(PsiError::InvalidHandle(Handle(42)))
        ));
    }

    #[test]
    fn oversized_rulebook_refused() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("book.toml");
        std::fs::write(&path, "[[rules]]\n").expect("write");

        let result = read_rulebook(&path, 4);
        assert!(matches!(result, Err(PsiError::IoError(_))));
    }

    #[test]
    fn directory_is_not_a_rulebook() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = read_rulebook(dir.path(), 1024);
        assert!(matches!(result, Err(PsiError::IoError(_))));
    }
}
