//! Semantic analyses over the untyped AST.
//!
//! Two passes run in order: [`names::NameAnalysis`] resolves identifiers and
//! declares symbols, then [`types::TypeAnalysis`] attaches and validates
//! types. Both collect their diagnostics instead of stopping at the first
//! error; the pipeline halts between stages when any were recorded.

pub mod names;
pub mod types;

pub use names::{NameAnalysis, NameInfo};
pub use types::TypeAnalysis;

use swarm_base::SwarmError;

use crate::ast::{Ast, NodeId};
use crate::symbol::Symbol;

/// Runs both analyses. Returns the name-analysis byproducts needed later in
/// the pipeline, or every diagnostic the failing stage produced.
pub fn analyze(
    ast: &mut Ast,
    root: NodeId,
    bindings: &[Symbol],
) -> Result<NameInfo, Vec<SwarmError>> {
    let info = NameAnalysis::run(ast, root, bindings)?;
    TypeAnalysis::run(ast, root, &info)?;
    Ok(info)
}
