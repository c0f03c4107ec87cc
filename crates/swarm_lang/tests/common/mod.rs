//! Builders for assembling programs the way the front-end would.
#![allow(dead_code)] // each test binary uses its own subset

use swarm_base::Position;
use swarm_lang::ast::{Ast, NodeId, NodeKind};
use swarm_lang::types::Type;

pub fn pos(line: usize, col: usize) -> Position {
    Position::new("test.swarm", line, line, col, col + 1)
}

pub fn ident(ast: &mut Ast, line: usize, name: &str) -> NodeId {
    ast.alloc(
        pos(line, 1),
        NodeKind::Identifier {
            name: name.into(),
            symbol: None,
        },
    )
}

pub fn number(ast: &mut Ast, line: usize, value: f64) -> NodeId {
    ast.alloc(pos(line, 1), NodeKind::NumberLiteral { value })
}

pub fn string(ast: &mut Ast, line: usize, value: &str) -> NodeId {
    ast.alloc(
        pos(line, 1),
        NodeKind::StringLiteral {
            value: value.into(),
        },
    )
}

pub fn type_literal(ast: &mut Ast, line: usize, ty: Type) -> NodeId {
    ast.alloc(pos(line, 1), NodeKind::TypeLiteral { value: ty })
}

/// `<ty> <name> = <value>;`, optionally `shared`.
pub fn var_decl(
    ast: &mut Ast,
    line: usize,
    ty: Type,
    name: &str,
    value: NodeId,
    shared: bool,
) -> NodeId {
    let type_node = type_literal(ast, line, ty);
    let id = ident(ast, line, name);
    ast.alloc(
        pos(line, 1),
        NodeKind::VariableDeclaration {
            type_node,
            id,
            value,
            shared,
        },
    )
}

pub fn expr_stmt(ast: &mut Ast, line: usize, expression: NodeId) -> NodeId {
    ast.alloc(pos(line, 1), NodeKind::ExpressionStatement { expression })
}

pub fn program(ast: &mut Ast, body: Vec<NodeId>) -> NodeId {
    ast.alloc(Position::unknown(), NodeKind::Program { body })
}

/// `[<items>] of <ty>` when `ty` is given.
pub fn enumeration(ast: &mut Ast, line: usize, items: Vec<NodeId>, ty: Option<Type>) -> NodeId {
    ast.alloc(
        pos(line, 1),
        NodeKind::EnumerationLiteral { actuals: items, ty },
    )
}

/// `{<key>: <value>, ...} of <ty>` when `ty` is given.
pub fn map_literal(
    ast: &mut Ast,
    line: usize,
    entries: Vec<(&str, NodeId)>,
    ty: Option<Type>,
) -> NodeId {
    let mut body = Vec::new();
    for (key, value) in entries {
        let key = ident(ast, line, key);
        body.push(ast.alloc(pos(line, 1), NodeKind::MapStatement { key, value }));
    }
    ast.alloc(pos(line, 1), NodeKind::MapLiteral { body, ty })
}

pub fn map_access(ast: &mut Ast, line: usize, path: NodeId, key: &str) -> NodeId {
    let end = ident(ast, line, key);
    ast.alloc(pos(line, 1), NodeKind::MapAccess { path, end })
}
