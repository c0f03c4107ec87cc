//! Optimization passes over the typed AST.
//!
//! Two passes, independently toggleable from configuration: self-assignment
//! removal and constant propagation (which folds as it substitutes). Both
//! preserve the tags and positions of surviving nodes; folded expressions
//! take the position of the operator they replace.

mod propagate;
mod self_assign;

pub use propagate::{fold_expr, propagate_constants};
pub use self_assign::remove_self_assignments;

use crate::ast::{Ast, NodeId};

/// Runs the enabled passes in their pipeline order.
pub fn optimize(
    ast: &mut Ast,
    root: NodeId,
    remove_self_assigns: bool,
    constant_propagation: bool,
) {
    if remove_self_assigns {
        remove_self_assignments(ast, root);
    }
    if constant_propagation {
        propagate_constants(ast, root);
    }
}
