//! Integration tests for rulebook loading and configuration.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use psi::{PsiConfig, Rulebook, load_rulebook};
use psi_core::{AtomSpace, AtomStore, AtomType, PsiError, PsiRules, RedbAtomSpace, TruthValue};
use std::path::PathBuf;

const ROBOT: &str = include_str!("../rulebooks/robot.toml");

// =============================================================================
// SAMPLE RULEBOOK
// =============================================================================

#[test]
fn test_robot_rulebook_loads() {
    let book = Rulebook::from_toml(ROBOT).unwrap();
    let mut psi = PsiRules::new(AtomSpace::new()).unwrap();

    let report = load_rulebook(&mut psi, &book).unwrap();

    assert_eq!(report.facts.len(), 5);
    assert_eq!(report.rules.len(), 3);
    assert_eq!(psi.demands().unwrap().len(), 2);
    assert_eq!(psi.goals().unwrap().len(), 2);
}

#[test]
fn test_robot_rulebook_satisfiability() {
    let book = Rulebook::from_toml(ROBOT).unwrap();
    let mut psi = PsiRules::new(AtomSpace::new()).unwrap();
    let report = load_rulebook(&mut psi, &book).unwrap();

    let seek = report.rules[0];
    let dock = report.rules[1];
    let wave = report.rules[2];

    assert!(psi.get_query(seek).unwrap().is_satisfiable(psi.store()).unwrap());
    assert!(!psi.get_query(dock).unwrap().is_satisfiable(psi.store()).unwrap());

    // bob is visible with no confidence, so only alice grounds $who
    let bindings = psi
        .get_query(wave)
        .unwrap()
        .find_grounding(psi.store())
        .unwrap()
        .unwrap();
    let who = psi.store().get_node(AtomType::VariableNode, "$who").unwrap();
    let alice = psi.store().get_node(AtomType::ConceptNode, "alice").unwrap();
    assert_eq!(bindings.get(&who), Some(&alice));
}

#[test]
fn test_robot_rules_grouped_by_demand() {
    let book = Rulebook::from_toml(ROBOT).unwrap();
    let mut psi = PsiRules::new(AtomSpace::new()).unwrap();
    let report = load_rulebook(&mut psi, &book).unwrap();

    let energy = psi.store().get_node(AtomType::ConceptNode, "Energy").unwrap();
    let social = psi.store().get_node(AtomType::ConceptNode, "Social").unwrap();

    assert_eq!(
        psi.rules_for_demand(energy).unwrap(),
        vec![report.rules[0], report.rules[1]]
    );
    assert_eq!(psi.rules_for_demand(social).unwrap(), vec![report.rules[2]]);
}

#[test]
fn test_rule_truth_values_applied() {
    let book = Rulebook::from_toml(ROBOT).unwrap();
    let mut psi = PsiRules::new(AtomSpace::new()).unwrap();
    let report = load_rulebook(&mut psi, &book).unwrap();

    assert_eq!(
        psi.store().truth_value(report.rules[1]).unwrap(),
        TruthValue::new(950, 600)
    );
}

// =============================================================================
// PERSISTENCE
// =============================================================================

#[test]
fn test_reload_into_redb_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("psi.redb");
    let book = Rulebook::from_toml(ROBOT).unwrap();

    let (first, atoms) = {
        let mut psi = PsiRules::new(RedbAtomSpace::open(&path).unwrap()).unwrap();
        let report = load_rulebook(&mut psi, &book).unwrap();
        (report.rules, psi.store().atom_count().unwrap())
    };

    let mut psi = PsiRules::new(RedbAtomSpace::open(&path).unwrap()).unwrap();
    let report = load_rulebook(&mut psi, &book).unwrap();

    assert_eq!(report.rules, first);
    assert_eq!(psi.store().atom_count().unwrap(), atoms);
}

// =============================================================================
// ERRORS
// =============================================================================

#[test]
fn test_malformed_rulebook() {
    let result = Rulebook::from_toml("[[rules]]\ndemand = 3\n");
    assert!(matches!(result, Err(PsiError::DeserializationError(_))));
}

#[test]
fn test_action_inside_condition_is_allowed() {
    let book = Rulebook::from_toml(
        r#"
[[rules]]
demand = "Energy"
goal = "StayCharged"
action = "x"
context = [{ predicate = "p", arguments = ["x"] }]
"#,
    )
    .unwrap();
    let mut psi = PsiRules::new(AtomSpace::new()).unwrap();

    // the action concept appears only inside a condition, not as one
    assert!(load_rulebook(&mut psi, &book).is_ok());
}

// =============================================================================
// CONFIG
// =============================================================================

#[test]
fn test_config_from_explicit_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("psi.toml");
    std::fs::write(
        &path,
        "database = \"rules.redb\"\njson_mode = true\nmax_rulebook_bytes = 2048\n",
    )
    .unwrap();

    let config = PsiConfig::load(Some(path.as_path())).unwrap();

    assert_eq!(config.database, Some(PathBuf::from("rules.redb")));
    assert!(config.json_mode);
    assert_eq!(config.max_rulebook_bytes, 2048);
}

#[test]
fn test_config_missing_explicit_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = PsiConfig::load(Some(dir.path().join("absent.toml").as_path()));
    assert!(matches!(result, Err(PsiError::IoError(_))));
}

#[test]
fn test_root_name_as_demand_rejected() {
    let book = Rulebook::from_toml(
        r#"
[[rules]]
demand = "psi-goal"
goal = "StayCharged"
action = "act"
"#,
    )
    .unwrap();
    let mut psi = PsiRules::new(AtomSpace::new()).unwrap();

    let result = load_rulebook(&mut psi, &book);
    assert!(matches!(result, Err(PsiError::InvalidName(_))));
    assert!(psi.demands().unwrap().is_empty());
}
