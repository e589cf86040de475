//! # psi
//!
//! Library half of the `psi` binary: configuration and rulebook loading.

pub mod config;
pub mod rulebook;

pub use config::PsiConfig;
pub use rulebook::{LoadReport, Rulebook, load_rulebook};
