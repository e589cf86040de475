//! # Rulebooks
//!
//! TOML files describing facts and psi-rules, loaded into a `PsiRules`
//! component.
//!
//! ```toml
//! [[facts]]
//! predicate = "battery-low"
//! arguments = ["robot"]
//!
//! [[rules]]
//! demand = "Energy"
//! goal = "StayCharged"
//! action = "seek-charger"
//! strength = 900
//! confidence = 800
//! context = [{ predicate = "battery-low", arguments = ["$who"] }]
//! ```
//!
//! A condition `(p a b)` encodes as
//! `(EvaluationLink (PredicateNode "p") (ListLink a b))`. Arguments starting
//! with `$` are variables; all others are concepts.

use psi_core::primitives::TRUTH_SCALE;
use psi_core::{AtomStore, AtomType, Handle, PsiError, PsiRules, TruthValue};
use serde::Deserialize;

/// Prefix marking an argument as a pattern variable.
pub const VARIABLE_PREFIX: char = '$';

// =============================================================================
// FILE FORMAT
// =============================================================================

/// A parsed rulebook.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rulebook {
    /// Facts asserted before any rule is registered.
    #[serde(default)]
    pub facts: Vec<FactSpec>,
    /// Rules, registered in file order.
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

/// One predicate application.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionSpec {
    /// Predicate name.
    pub predicate: String,
    /// Argument names; `$`-prefixed names are variables.
    #[serde(default)]
    pub arguments: Vec<String>,
}

/// A fact: a condition with a truth value.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FactSpec {
    /// Predicate name.
    pub predicate: String,
    /// Argument names.
    #[serde(default)]
    pub arguments: Vec<String>,
    /// Per-mille strength, full scale when omitted.
    #[serde(default = "full_scale")]
    pub strength: u16,
    /// Per-mille confidence, full scale when omitted so the fact holds.
    #[serde(default = "full_scale")]
    pub confidence: u16,
}

/// A psi-rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    /// Demand tag the rule belongs to; created if absent.
    pub demand: String,
    /// Goal tag; created if absent.
    pub goal: String,
    /// Action concept.
    pub action: String,
    /// Context conditions, in order.
    #[serde(default)]
    pub context: Vec<ConditionSpec>,
    /// Per-mille strength of the implication.
    #[serde(default = "full_scale")]
    pub strength: u16,
    /// Per-mille confidence of the implication.
    #[serde(default = "full_scale")]
    pub confidence: u16,
}

fn full_scale() -> u16 {
    TRUTH_SCALE
}

impl Rulebook {
    /// Parse a rulebook from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, PsiError> {
        toml::from_str(text).map_err(|e| PsiError::DeserializationError(e.to_string()))
    }
}

// =============================================================================
// LOADING
// =============================================================================

/// What a load wrote, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Fact atoms asserted.
    pub facts: Vec<Handle>,
    /// Rule handles, one per `[[rules]]` entry.
    pub rules: Vec<Handle>,
}

/// Assert every fact, then register every rule.
///
/// Stops at the first failure; atoms written before it stay in the store.
pub fn load_rulebook<S: AtomStore>(
    psi: &mut PsiRules<S>,
    book: &Rulebook,
) -> Result<LoadReport, PsiError> {
    let mut report = LoadReport::default();

    for fact in &book.facts {
        let atom = encode_condition(psi.store_mut(), &fact.predicate, &fact.arguments)?;
        psi.store_mut()
            .set_truth_value(atom, TruthValue::new(fact.strength, fact.confidence))?;
        report.facts.push(atom);
    }

    for (position, rule) in book.rules.iter().enumerate() {
        let demand = psi.add_demand(&rule.demand)?;
        let goal = psi.add_goal(&rule.goal)?;
        let action = psi.store_mut().add_node(AtomType::ConceptNode, &rule.action)?;

        let mut context = Vec::with_capacity(rule.context.len());
        for condition in &rule.context {
            context.push(encode_condition(
                psi.store_mut(),
                &condition.predicate,
                &condition.arguments,
            )?);
        }

        let tv = TruthValue::new(rule.strength, rule.confidence);
        let handle = psi.add_rule(&context, action, goal, tv, demand)?;
        tracing::debug!(position, rule = %handle, action = %rule.action, "rulebook entry loaded");
        report.rules.push(handle);
    }

    tracing::info!(
        facts = report.facts.len(),
        rules = report.rules.len(),
        "rulebook loaded"
    );
    Ok(report)
}

/// Encode `(predicate arguments...)` as an evaluation link.
///
/// Leaves the truth value untouched.
pub fn encode_condition<S: AtomStore + ?Sized>(
    store: &mut S,
    predicate: &str,
    arguments: &[String],
) -> Result<Handle, PsiError> {
    let predicate = store.add_node(AtomType::PredicateNode, predicate)?;
    let mut args = Vec::with_capacity(arguments.len());
    for argument in arguments {
        args.push(encode_argument(store, argument)?);
    }
    let list = store.add_link(AtomType::ListLink, &args)?;
    store.add_link(AtomType::EvaluationLink, &[predicate, list])
}

fn encode_argument<S: AtomStore + ?Sized>(store: &mut S, argument: &str) -> Result<Handle, PsiError> {
    if argument.starts_with(VARIABLE_PREFIX) {
        store.add_node(AtomType::VariableNode, argument)
    } else {
        store.add_node(AtomType::ConceptNode, argument)
    }
}

// =============================================================================
// TESTS
// =============================================================================
