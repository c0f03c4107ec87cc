//! Constant folding and propagation.
//!
//! [`fold_expr`] reduces pure operators over literal operands; folds that
//! would turn a runtime error into a compile-time one (division or modulus
//! by a literal zero) are left alone so the error still surfaces at its
//! source position.
//!
//! [`propagate_constants`] substitutes uses of symbols that are bound
//! exactly once, to a literal, and never assigned again. Shared symbols are
//! never propagated: their value can change under this process's feet.

use std::collections::{HashMap, HashSet};

use crate::ast::{Ast, NodeId, NodeKind};
use crate::symbol::SymbolId;

/// Folds the expression rooted at `node`, returning the node that should
/// take its place (often `node` itself).
pub fn fold_expr(ast: &mut Ast, node: NodeId) -> NodeId {
    match ast.kind(node).clone() {
        NodeKind::And { left, right } => {
            let (l, r) = fold_pair(ast, node, left, right);
            match (ast.kind(l), ast.kind(r)) {
                (
                    NodeKind::BooleanLiteral { value: a },
                    NodeKind::BooleanLiteral { value: b },
                ) => {
                    let value = *a && *b;
                    let pos = ast.pos(node).clone();
                    ast.alloc(pos, NodeKind::BooleanLiteral { value })
                }
                _ => node,
            }
        }
        NodeKind::Or { left, right } => {
            let (l, r) = fold_pair(ast, node, left, right);
            match (ast.kind(l), ast.kind(r)) {
                (
                    NodeKind::BooleanLiteral { value: a },
                    NodeKind::BooleanLiteral { value: b },
                ) => {
                    let value = *a || *b;
                    let pos = ast.pos(node).clone();
                    ast.alloc(pos, NodeKind::BooleanLiteral { value })
                }
                _ => node,
            }
        }
        NodeKind::Not { exp } => {
            let e = fold_expr(ast, exp);
            if let NodeKind::Not { exp } = ast.kind_mut(node) {
                *exp = e;
            }
            match ast.kind(e) {
                NodeKind::BooleanLiteral { value } => {
                    let value = !*value;
                    let pos = ast.pos(node).clone();
                    ast.alloc(pos, NodeKind::BooleanLiteral { value })
                }
                _ => node,
            }
        }
        NodeKind::Negative { exp } => {
            let e = fold_expr(ast, exp);
            if let NodeKind::Negative { exp } = ast.kind_mut(node) {
                *exp = e;
            }
            match ast.kind(e) {
                NodeKind::NumberLiteral { value } => {
                    let value = -*value;
                    let pos = ast.pos(node).clone();
                    ast.alloc(pos, NodeKind::NumberLiteral { value })
                }
                _ => node,
            }
        }
        NodeKind::Add {
            left,
            right,
            concatenation,
        } => {
            let l = fold_expr(ast, left);
            let r = fold_expr(ast, right);
            if let NodeKind::Add { left, right, .. } = ast.kind_mut(node) {
                *left = l;
                *right = r;
            }
            match (ast.kind(l), ast.kind(r)) {
                (NodeKind::NumberLiteral { value: a }, NodeKind::NumberLiteral { value: b })
                    if !concatenation =>
                {
                    let value = a + b;
                    let pos = ast.pos(node).clone();
                    ast.alloc(pos, NodeKind::NumberLiteral { value })
                }
                (NodeKind::StringLiteral { value: a }, NodeKind::StringLiteral { value: b }) => {
                    let value = format!("{a}{b}");
                    let pos = ast.pos(node).clone();
                    ast.alloc(pos, NodeKind::StringLiteral { value })
                }
                _ => node,
            }
        }
        NodeKind::Subtract { left, right } => fold_arith(ast, node, left, right, |a, b| {
            Some(a - b)
        }),
        NodeKind::Multiply { left, right } => fold_arith(ast, node, left, right, |a, b| {
            Some(a * b)
        }),
        NodeKind::Divide { left, right } => fold_arith(ast, node, left, right, |a, b| {
            // Keep the runtime division-by-zero error at its source site.
            if b == 0.0 {
                None
            } else {
                Some(a / b)
            }
        }),
        NodeKind::Modulus { left, right } => fold_arith(ast, node, left, right, |a, b| {
            let (a, b) = (a.round() as i64, b.round() as i64);
            if b == 0 {
                None
            } else {
                Some((a % b) as f64)
            }
        }),
        NodeKind::Power { left, right } => fold_arith(ast, node, left, right, |a, b| {
            Some(a.powf(b))
        }),
        NodeKind::NthRoot { left, right } => fold_arith(ast, node, left, right, |n, x| {
            if n == 0.0 {
                None
            } else {
                Some(x.powf(1.0 / n))
            }
        }),
        NodeKind::NumericComparison {
            comparison,
            left,
            right,
        } => {
            let l = fold_expr(ast, left);
            let r = fold_expr(ast, right);
            if let NodeKind::NumericComparison { left, right, .. } = ast.kind_mut(node) {
                *left = l;
                *right = r;
            }
            match (ast.kind(l), ast.kind(r)) {
                (NodeKind::NumberLiteral { value: a }, NodeKind::NumberLiteral { value: b }) => {
                    let value = comparison.evaluate(*a, *b);
                    let pos = ast.pos(node).clone();
                    ast.alloc(pos, NodeKind::BooleanLiteral { value })
                }
                _ => node,
            }
        }
        NodeKind::Equals { left, right } => fold_equality(ast, node, left, right, false),
        NodeKind::NotEquals { left, right } => fold_equality(ast, node, left, right, true),
        _ => node,
    }
}

fn fold_pair(ast: &mut Ast, node: NodeId, left: NodeId, right: NodeId) -> (NodeId, NodeId) {
    let l = fold_expr(ast, left);
    let r = fold_expr(ast, right);
    match ast.kind_mut(node) {
        NodeKind::And { left, right }
        | NodeKind::Or { left, right }
        | NodeKind::Equals { left, right }
        | NodeKind::NotEquals { left, right } => {
            *left = l;
            *right = r;
        }
        _ => {}
    }
    (l, r)
}

fn fold_arith(
    ast: &mut Ast,
    node: NodeId,
    left: NodeId,
    right: NodeId,
    op: impl Fn(f64, f64) -> Option<f64>,
) -> NodeId {
    let l = fold_expr(ast, left);
    let r = fold_expr(ast, right);
    match ast.kind_mut(node) {
        NodeKind::Subtract { left, right }
        | NodeKind::Multiply { left, right }
        | NodeKind::Divide { left, right }
        | NodeKind::Modulus { left, right }
        | NodeKind::Power { left, right }
        | NodeKind::NthRoot { left, right } => {
            *left = l;
            *right = r;
        }
        _ => {}
    }
    match (ast.kind(l), ast.kind(r)) {
        (NodeKind::NumberLiteral { value: a }, NodeKind::NumberLiteral { value: b }) => {
            match op(*a, *b) {
                Some(value) => {
                    let pos = ast.pos(node).clone();
                    ast.alloc(pos, NodeKind::NumberLiteral { value })
                }
                None => node,
            }
        }
        _ => node,
    }
}

fn fold_equality(
    ast: &mut Ast,
    node: NodeId,
    left: NodeId,
    right: NodeId,
    negate: bool,
) -> NodeId {
    let (l, r) = fold_pair(ast, node, left, right);
    let outcome = match (ast.kind(l), ast.kind(r)) {
        (NodeKind::NumberLiteral { value: a }, NodeKind::NumberLiteral { value: b }) => {
            Some(a == b)
        }
        (NodeKind::StringLiteral { value: a }, NodeKind::StringLiteral { value: b }) => {
            Some(a == b)
        }
        (NodeKind::BooleanLiteral { value: a }, NodeKind::BooleanLiteral { value: b }) => {
            Some(a == b)
        }
        _ => None,
    };
    match outcome {
        Some(eq) => {
            let value = eq != negate;
            let pos = ast.pos(node).clone();
            ast.alloc(pos, NodeKind::BooleanLiteral { value })
        }
        None => node,
    }
}

/// Runs substitution plus folding over the whole program.
pub fn propagate_constants(ast: &mut Ast, root: NodeId) {
    let mut mutated = HashSet::new();
    collect_assigned(ast, root, &mut mutated);
    let mut env: HashMap<SymbolId, NodeId> = HashMap::new();
    propagate_stmt(ast, root, &mut env, &mutated);
}

/// Symbols that appear as the root of an assignment target anywhere below
/// `node`. Those are disqualified from propagation outright.
fn collect_assigned(ast: &Ast, node: NodeId, out: &mut HashSet<SymbolId>) {
    match ast.kind(node).clone() {
        NodeKind::Assign { dest, value } => {
            if let Some(sym) = ast.lval_root_symbol(dest) {
                out.insert(sym);
            }
            collect_assigned(ast, value, out);
        }
        NodeKind::Program { body }
        | NodeKind::Enumerate { body, .. }
        | NodeKind::With { body, .. }
        | NodeKind::If { body, .. }
        | NodeKind::While { body, .. }
        | NodeKind::Function { body, .. } => {
            for stmt in body {
                collect_assigned(ast, stmt, out);
            }
        }
        NodeKind::ExpressionStatement { expression } => collect_assigned(ast, expression, out),
        NodeKind::VariableDeclaration { value, .. } => collect_assigned(ast, value, out),
        NodeKind::Call { func, args, .. } => {
            collect_assigned(ast, func, out);
            for arg in args {
                collect_assigned(ast, arg, out);
            }
        }
        NodeKind::DeferCall { call } => collect_assigned(ast, call, out),
        NodeKind::TypeBody {
            declarations,
            constructors,
            ..
        } => {
            for decl in declarations {
                collect_assigned(ast, decl, out);
            }
            for ctor in constructors {
                collect_assigned(ast, ctor, out);
            }
        }
        NodeKind::Constructor { func, .. } => collect_assigned(ast, func, out),
        NodeKind::And { left, right }
        | NodeKind::Or { left, right }
        | NodeKind::Equals { left, right }
        | NodeKind::NotEquals { left, right }
        | NodeKind::NumericComparison { left, right, .. }
        | NodeKind::Add { left, right, .. }
        | NodeKind::Subtract { left, right }
        | NodeKind::Multiply { left, right }
        | NodeKind::Divide { left, right }
        | NodeKind::Modulus { left, right }
        | NodeKind::Power { left, right }
        | NodeKind::NthRoot { left, right } => {
            collect_assigned(ast, left, out);
            collect_assigned(ast, right, out);
        }
        NodeKind::Negative { exp } | NodeKind::Not { exp } => collect_assigned(ast, exp, out),
        NodeKind::Return { value: Some(value) } => collect_assigned(ast, value, out),
        NodeKind::EnumerationLiteral { actuals, .. } => {
            for actual in actuals {
                collect_assigned(ast, actual, out);
            }
        }
        NodeKind::MapLiteral { body, .. } => {
            for stmt in body {
                if let NodeKind::MapStatement { value, .. } = ast.kind(stmt) {
                    collect_assigned(ast, *value, out);
                }
            }
        }
        NodeKind::EnumerableAccess { path, index } => {
            collect_assigned(ast, path, out);
            collect_assigned(ast, index, out);
        }
        NodeKind::EnumerableAppend { path }
        | NodeKind::MapAccess { path, .. }
        | NodeKind::ClassAccess { path, .. } => collect_assigned(ast, path, out),
        _ => {}
    }
}

fn is_propagatable_literal(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::NumberLiteral { .. }
            | NodeKind::BooleanLiteral { .. }
            | NodeKind::StringLiteral { .. }
    )
}

fn subst_and_fold(
    ast: &mut Ast,
    node: NodeId,
    env: &HashMap<SymbolId, NodeId>,
    mutated: &HashSet<SymbolId>,
) -> NodeId {
    let substituted = substitute(ast, node, env, mutated);
    fold_expr(ast, substituted)
}

/// Replaces identifier reads bound in `env` with a copy of their literal,
/// recursing through expression structure. Assignment targets keep their
/// identifiers; only their index expressions are substituted.
fn substitute(
    ast: &mut Ast,
    node: NodeId,
    env: &HashMap<SymbolId, NodeId>,
    mutated: &HashSet<SymbolId>,
) -> NodeId {
    match ast.kind(node).clone() {
        NodeKind::Identifier { symbol: Some(sym), .. } => match env.get(&sym) {
            Some(&literal) => {
                let pos = ast.pos(node).clone();
                let kind = ast.kind(literal).clone();
                ast.alloc(pos, kind)
            }
            None => node,
        },
        NodeKind::Assign { dest, value } => {
            let new_value = subst_and_fold(ast, value, env, mutated);
            let new_dest = substitute_lval(ast, dest, env, mutated);
            if let NodeKind::Assign { dest, value } = ast.kind_mut(node) {
                *dest = new_dest;
                *value = new_value;
            }
            node
        }
        NodeKind::And { left, right }
        | NodeKind::Or { left, right }
        | NodeKind::Equals { left, right }
        | NodeKind::NotEquals { left, right }
        | NodeKind::NumericComparison { left, right, .. }
        | NodeKind::Add { left, right, .. }
        | NodeKind::Subtract { left, right }
        | NodeKind::Multiply { left, right }
        | NodeKind::Divide { left, right }
        | NodeKind::Modulus { left, right }
        | NodeKind::Power { left, right }
        | NodeKind::NthRoot { left, right } => {
            let l = substitute(ast, left, env, mutated);
            let r = substitute(ast, right, env, mutated);
            rewrite_binary(ast, node, l, r);
            node
        }
        NodeKind::Negative { exp } => {
            let e = substitute(ast, exp, env, mutated);
            if let NodeKind::Negative { exp } = ast.kind_mut(node) {
                *exp = e;
            }
            node
        }
        NodeKind::Not { exp } => {
            let e = substitute(ast, exp, env, mutated);
            if let NodeKind::Not { exp } = ast.kind_mut(node) {
                *exp = e;
            }
            node
        }
        NodeKind::Call { args, .. } => {
            let new_args: Vec<NodeId> = args
                .iter()
                .map(|&a| substitute(ast, a, env, mutated))
                .collect();
            if let NodeKind::Call { args, .. } = ast.kind_mut(node) {
                *args = new_args;
            }
            node
        }
        NodeKind::EnumerationLiteral { actuals, .. } => {
            let new_actuals: Vec<NodeId> = actuals
                .iter()
                .map(|&a| substitute(ast, a, env, mutated))
                .collect();
            if let NodeKind::EnumerationLiteral { actuals, .. } = ast.kind_mut(node) {
                *actuals = new_actuals;
            }
            node
        }
        NodeKind::MapLiteral { body, .. } => {
            for stmt in body {
                if let NodeKind::MapStatement { value, .. } = ast.kind(stmt).clone() {
                    let v = substitute(ast, value, env, mutated);
                    if let NodeKind::MapStatement { value, .. } = ast.kind_mut(stmt) {
                        *value = v;
                    }
                }
            }
            node
        }
        NodeKind::EnumerableAccess { path, index } => {
            let p = substitute_lval(ast, path, env, mutated);
            let i = substitute(ast, index, env, mutated);
            if let NodeKind::EnumerableAccess { path, index } = ast.kind_mut(node) {
                *path = p;
                *index = i;
            }
            node
        }
        // Closures may see their captures change; leave them alone.
        NodeKind::Function { .. } => node,
        _ => node,
    }
}

fn substitute_lval(
    ast: &mut Ast,
    node: NodeId,
    env: &HashMap<SymbolId, NodeId>,
    mutated: &HashSet<SymbolId>,
) -> NodeId {
    match ast.kind(node).clone() {
        NodeKind::Identifier { .. } => node,
        NodeKind::EnumerableAccess { path, index } => {
            let p = substitute_lval(ast, path, env, mutated);
            let i = substitute(ast, index, env, mutated);
            if let NodeKind::EnumerableAccess { path, index } = ast.kind_mut(node) {
                *path = p;
                *index = i;
            }
            node
        }
        NodeKind::EnumerableAppend { path } => {
            let p = substitute_lval(ast, path, env, mutated);
            if let NodeKind::EnumerableAppend { path } = ast.kind_mut(node) {
                *path = p;
            }
            node
        }
        NodeKind::MapAccess { path, .. } | NodeKind::ClassAccess { path, .. } => {
            let p = substitute_lval(ast, path, env, mutated);
            match ast.kind_mut(node) {
                NodeKind::MapAccess { path, .. } | NodeKind::ClassAccess { path, .. } => {
                    *path = p
                }
                _ => {}
            }
            node
        }
        _ => substitute(ast, node, env, mutated),
    }
}

fn rewrite_binary(ast: &mut Ast, node: NodeId, l: NodeId, r: NodeId) {
    match ast.kind_mut(node) {
        NodeKind::And { left, right }
        | NodeKind::Or { left, right }
        | NodeKind::Equals { left, right }
        | NodeKind::NotEquals { left, right }
        | NodeKind::NumericComparison { left, right, .. }
        | NodeKind::Add { left, right, .. }
        | NodeKind::Subtract { left, right }
        | NodeKind::Multiply { left, right }
        | NodeKind::Divide { left, right }
        | NodeKind::Modulus { left, right }
        | NodeKind::Power { left, right }
        | NodeKind::NthRoot { left, right } => {
            *left = l;
            *right = r;
        }
        _ => {}
    }
}

fn propagate_stmt(
    ast: &mut Ast,
    node: NodeId,
    env: &mut HashMap<SymbolId, NodeId>,
    mutated: &HashSet<SymbolId>,
) {
    match ast.kind(node).clone() {
        NodeKind::Program { body } => {
            for stmt in body {
                propagate_stmt(ast, stmt, env, mutated);
            }
        }
        NodeKind::ExpressionStatement { expression } => {
            let e = subst_and_fold(ast, expression, env, mutated);
            if let NodeKind::ExpressionStatement { expression } = ast.kind_mut(node) {
                *expression = e;
            }
        }
        NodeKind::VariableDeclaration { id, value, shared, .. } => {
            let v = subst_and_fold(ast, value, env, mutated);
            if let NodeKind::VariableDeclaration { value, .. } = ast.kind_mut(node) {
                *value = v;
            }
            if let Some(sym) = ast.identifier_symbol(id) {
                let symbol_shared = shared || ast.symbols.get(sym).shared;
                if !symbol_shared && !mutated.contains(&sym) && is_propagatable_literal(ast.kind(v))
                {
                    env.insert(sym, v);
                }
            }
        }
        NodeKind::Return { value: Some(value) } => {
            let v = subst_and_fold(ast, value, env, mutated);
            if let NodeKind::Return { value } = ast.kind_mut(node) {
                *value = Some(v);
            }
        }
        NodeKind::If { condition, body } => {
            let c = subst_and_fold(ast, condition, env, mutated);
            if let NodeKind::If { condition, .. } = ast.kind_mut(node) {
                *condition = c;
            }
            let mut child_env = env.clone();
            for stmt in body {
                propagate_stmt(ast, stmt, &mut child_env, mutated);
            }
        }
        NodeKind::While { condition, body } => {
            let c = subst_and_fold(ast, condition, env, mutated);
            if let NodeKind::While { condition, .. } = ast.kind_mut(node) {
                *condition = c;
            }
            let mut child_env = env.clone();
            for stmt in body {
                propagate_stmt(ast, stmt, &mut child_env, mutated);
            }
        }
        NodeKind::Enumerate { enumerable, body, .. } => {
            let e = subst_and_fold(ast, enumerable, env, mutated);
            if let NodeKind::Enumerate { enumerable, .. } = ast.kind_mut(node) {
                *enumerable = e;
            }
            let mut child_env = env.clone();
            for stmt in body {
                propagate_stmt(ast, stmt, &mut child_env, mutated);
            }
        }
        NodeKind::With { resource, body, .. } => {
            let r = subst_and_fold(ast, resource, env, mutated);
            if let NodeKind::With { resource, .. } = ast.kind_mut(node) {
                *resource = r;
            }
            let mut child_env = env.clone();
            for stmt in body {
                propagate_stmt(ast, stmt, &mut child_env, mutated);
            }
        }
        NodeKind::Function { body, .. } => {
            // Function bodies run under their own environment; captures are
            // resolved at call time, not propagation time.
            let mut func_env = HashMap::new();
            let mut func_mutated = HashSet::new();
            collect_assigned(ast, node, &mut func_mutated);
            let all_mutated: HashSet<SymbolId> =
                mutated.union(&func_mutated).copied().collect();
            for stmt in body {
                propagate_stmt(ast, stmt, &mut func_env, &all_mutated);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Symbol;
    use crate::types::Type;
    use swarm_base::Position;

    fn pos() -> Position {
        Position::unknown()
    }

    fn number(ast: &mut Ast, value: f64) -> NodeId {
        ast.alloc(pos(), NodeKind::NumberLiteral { value })
    }

    #[test]
    fn folds_nested_arithmetic() {
        let mut ast = Ast::new();
        let two = number(&mut ast, 2.0);
        let three = number(&mut ast, 3.0);
        let mul = ast.alloc(pos(), NodeKind::Multiply { left: two, right: three });
        let four = number(&mut ast, 4.0);
        let add = ast.alloc(
            pos(),
            NodeKind::Add {
                left: mul,
                right: four,
                concatenation: false,
            },
        );
        let folded = fold_expr(&mut ast, add);
        assert_eq!(ast.kind(folded), &NodeKind::NumberLiteral { value: 10.0 });
    }

    #[test]
    fn does_not_fold_division_by_literal_zero() {
        let mut ast = Ast::new();
        let one = number(&mut ast, 1.0);
        let zero = number(&mut ast, 0.0);
        let div = ast.alloc(pos(), NodeKind::Divide { left: one, right: zero });
        let folded = fold_expr(&mut ast, div);
        assert_eq!(folded, div);
    }

    #[test]
    fn folds_string_concatenation() {
        let mut ast = Ast::new();
        let a = ast.alloc(pos(), NodeKind::StringLiteral { value: "fo".into() });
        let b = ast.alloc(pos(), NodeKind::StringLiteral { value: "ur".into() });
        let add = ast.alloc(
            pos(),
            NodeKind::Add {
                left: a,
                right: b,
                concatenation: true,
            },
        );
        let folded = fold_expr(&mut ast, add);
        assert_eq!(
            ast.kind(folded),
            &NodeKind::StringLiteral { value: "four".into() }
        );
    }

    #[test]
    fn propagates_single_assignment_literals() {
        // number pi = 3.14; number n = pi * 2;
        let mut ast = Ast::new();
        let sym = ast.symbols.intern(Symbol::declared(
            "pi",
            Type::NUMBER,
            Position::unknown(),
            false,
        ));
        let pi_type = ast.alloc(pos(), NodeKind::TypeLiteral { value: Type::NUMBER });
        let pi_id = ast.alloc(
            pos(),
            NodeKind::Identifier {
                name: "pi".into(),
                symbol: Some(sym),
            },
        );
        let pi_lit = number(&mut ast, 3.14);
        let decl = ast.alloc(
            pos(),
            NodeKind::VariableDeclaration {
                type_node: pi_type,
                id: pi_id,
                value: pi_lit,
                shared: false,
            },
        );

        let use_id = ast.alloc(
            pos(),
            NodeKind::Identifier {
                name: "pi".into(),
                symbol: Some(sym),
            },
        );
        let two = number(&mut ast, 2.0);
        let mul = ast.alloc(pos(), NodeKind::Multiply { left: use_id, right: two });
        let stmt = ast.alloc(pos(), NodeKind::ExpressionStatement { expression: mul });

        let program = ast.alloc(pos(), NodeKind::Program { body: vec![decl, stmt] });
        propagate_constants(&mut ast, program);

        let NodeKind::Program { body } = ast.kind(program) else {
            panic!()
        };
        let NodeKind::ExpressionStatement { expression } = ast.kind(body[1]) else {
            panic!()
        };
        assert_eq!(ast.kind(*expression), &NodeKind::NumberLiteral { value: 6.28 });
    }

    #[test]
    fn reassigned_symbols_are_not_propagated() {
        // number x = 1; x = 2; (x + 0) stays symbolic
        let mut ast = Ast::new();
        let sym = ast.symbols.intern(Symbol::declared(
            "x",
            Type::NUMBER,
            Position::unknown(),
            false,
        ));
        let ident = |ast: &mut Ast| {
            ast.alloc(
                pos(),
                NodeKind::Identifier {
                    name: "x".into(),
                    symbol: Some(sym),
                },
            )
        };
        let tn = ast.alloc(pos(), NodeKind::TypeLiteral { value: Type::NUMBER });
        let id = ident(&mut ast);
        let one = number(&mut ast, 1.0);
        let decl = ast.alloc(
            pos(),
            NodeKind::VariableDeclaration {
                type_node: tn,
                id,
                value: one,
                shared: false,
            },
        );
        let dest = ident(&mut ast);
        let two = number(&mut ast, 2.0);
        let assign = ast.alloc(pos(), NodeKind::Assign { dest, value: two });
        let assign_stmt = ast.alloc(pos(), NodeKind::ExpressionStatement { expression: assign });

        let use_id = ident(&mut ast);
        let zero = number(&mut ast, 0.0);
        let add = ast.alloc(
            pos(),
            NodeKind::Add {
                left: use_id,
                right: zero,
                concatenation: false,
            },
        );
        let use_stmt = ast.alloc(pos(), NodeKind::ExpressionStatement { expression: add });

        let program = ast.alloc(
            pos(),
            NodeKind::Program {
                body: vec![decl, assign_stmt, use_stmt],
            },
        );
        propagate_constants(&mut ast, program);

        let NodeKind::Program { body } = ast.kind(program) else {
            panic!()
        };
        let NodeKind::ExpressionStatement { expression } = ast.kind(body[2]) else {
            panic!()
        };
        // still an Add over the identifier, not a folded literal
        assert!(matches!(ast.kind(*expression), NodeKind::Add { .. }));
    }
}
