//! Self-assignment removal.
//!
//! Drops `x = x;` statements where both sides resolve to the same symbol.
//! Only the identifier-to-identifier shape qualifies: any other right-hand
//! side (a call in particular) may have observable effects and is kept.

use crate::ast::{Ast, NodeId, NodeKind};

pub fn remove_self_assignments(ast: &mut Ast, root: NodeId) {
    rewrite_body_of(ast, root);
}

fn is_self_assignment(ast: &Ast, stmt: NodeId) -> bool {
    let NodeKind::ExpressionStatement { expression } = ast.kind(stmt) else {
        return false;
    };
    let NodeKind::Assign { dest, value } = ast.kind(*expression) else {
        return false;
    };
    match (ast.kind(*dest), ast.kind(*value)) {
        (
            NodeKind::Identifier { symbol: Some(a), .. },
            NodeKind::Identifier { symbol: Some(b), .. },
        ) => a == b,
        _ => false,
    }
}

fn filtered(ast: &Ast, body: &[NodeId]) -> Vec<NodeId> {
    body.iter()
        .copied()
        .filter(|&stmt| !is_self_assignment(ast, stmt))
        .collect()
}

fn rewrite_body_of(ast: &mut Ast, node: NodeId) {
    let children: Vec<NodeId> = match ast.kind(node).clone() {
        NodeKind::Program { body } => {
            let kept = filtered(ast, &body);
            if let NodeKind::Program { body } = ast.kind_mut(node) {
                *body = kept.clone();
            }
            kept
        }
        NodeKind::Enumerate { body, .. } => {
            let kept = filtered(ast, &body);
            if let NodeKind::Enumerate { body, .. } = ast.kind_mut(node) {
                *body = kept.clone();
            }
            kept
        }
        NodeKind::With { body, .. } => {
            let kept = filtered(ast, &body);
            if let NodeKind::With { body, .. } = ast.kind_mut(node) {
                *body = kept.clone();
            }
            kept
        }
        NodeKind::If { body, .. } => {
            let kept = filtered(ast, &body);
            if let NodeKind::If { body, .. } = ast.kind_mut(node) {
                *body = kept.clone();
            }
            kept
        }
        NodeKind::While { body, .. } => {
            let kept = filtered(ast, &body);
            if let NodeKind::While { body, .. } = ast.kind_mut(node) {
                *body = kept.clone();
            }
            kept
        }
        NodeKind::Function { body, .. } => {
            let kept = filtered(ast, &body);
            if let NodeKind::Function { body, .. } = ast.kind_mut(node) {
                *body = kept.clone();
            }
            kept
        }
        NodeKind::ExpressionStatement { expression } => vec![expression],
        NodeKind::VariableDeclaration { value, .. } => vec![value],
        NodeKind::TypeBody {
            declarations,
            constructors,
            ..
        } => {
            let mut all = declarations;
            all.extend(constructors);
            all
        }
        NodeKind::Constructor { func, .. } => vec![func],
        NodeKind::Call { func, args, .. } => {
            let mut all = vec![func];
            all.extend(args);
            all
        }
        NodeKind::DeferCall { call } => vec![call],
        NodeKind::Assign { value, .. } => vec![value],
        _ => Vec::new(),
    };

    for child in children {
        rewrite_body_of(ast, child);
    }
}
