//! Builders for assembling analyzed programs in tests.
#![allow(dead_code)] // each test binary uses its own subset

use swarm_base::{Config, Position};
use swarm_lang::analysis;
use swarm_lang::ast::{Ast, NodeId, NodeKind};
use swarm_lang::types::Type;
use swarm_runtime::Prologue;

pub fn pos(line: usize) -> Position {
    Position::new("test.swarm", line, line, 1, 2)
}

pub fn local_config() -> Config {
    Config {
        force_local: true,
        ..Config::default()
    }
}

pub fn ident(ast: &mut Ast, line: usize, name: &str) -> NodeId {
    ast.alloc(
        pos(line),
        NodeKind::Identifier {
            name: name.into(),
            symbol: None,
        },
    )
}

pub fn number(ast: &mut Ast, line: usize, value: f64) -> NodeId {
    ast.alloc(pos(line), NodeKind::NumberLiteral { value })
}

pub fn string(ast: &mut Ast, line: usize, value: &str) -> NodeId {
    ast.alloc(
        pos(line),
        NodeKind::StringLiteral {
            value: value.into(),
        },
    )
}

pub fn boolean(ast: &mut Ast, line: usize, value: bool) -> NodeId {
    ast.alloc(pos(line), NodeKind::BooleanLiteral { value })
}

pub fn var_decl(
    ast: &mut Ast,
    line: usize,
    ty: Type,
    name: &str,
    value: NodeId,
    shared: bool,
) -> NodeId {
    let type_node = ast.alloc(pos(line), NodeKind::TypeLiteral { value: ty });
    let id = ident(ast, line, name);
    ast.alloc(
        pos(line),
        NodeKind::VariableDeclaration {
            type_node,
            id,
            value,
            shared,
        },
    )
}

pub fn expr_stmt(ast: &mut Ast, line: usize, expression: NodeId) -> NodeId {
    ast.alloc(pos(line), NodeKind::ExpressionStatement { expression })
}

pub fn assign(ast: &mut Ast, line: usize, dest: NodeId, value: NodeId) -> NodeId {
    ast.alloc(pos(line), NodeKind::Assign { dest, value })
}

pub fn add(ast: &mut Ast, line: usize, left: NodeId, right: NodeId) -> NodeId {
    ast.alloc(
        pos(line),
        NodeKind::Add {
            left,
            right,
            concatenation: false,
        },
    )
}

pub fn enumeration(ast: &mut Ast, line: usize, items: Vec<NodeId>, ty: Option<Type>) -> NodeId {
    ast.alloc(pos(line), NodeKind::EnumerationLiteral { actuals: items, ty })
}

pub fn map_literal(
    ast: &mut Ast,
    line: usize,
    entries: Vec<(&str, NodeId)>,
    ty: Option<Type>,
) -> NodeId {
    let mut body = Vec::new();
    for (key, value) in entries {
        let key = ident(ast, line, key);
        body.push(ast.alloc(pos(line), NodeKind::MapStatement { key, value }));
    }
    ast.alloc(pos(line), NodeKind::MapLiteral { body, ty })
}

pub fn map_access(ast: &mut Ast, line: usize, path: NodeId, key: &str) -> NodeId {
    let end = ident(ast, line, key);
    ast.alloc(pos(line), NodeKind::MapAccess { path, end })
}

pub fn program(ast: &mut Ast, body: Vec<NodeId>) -> NodeId {
    ast.alloc(Position::unknown(), NodeKind::Program { body })
}

/// Builds and analyzes a program with the standard prologue installed.
pub fn compiled(build: impl FnOnce(&mut Ast) -> NodeId) -> (Ast, NodeId) {
    let mut ast = Ast::new();
    let root = build(&mut ast);
    let bindings = Prologue::standard().symbols();
    analysis::analyze(&mut ast, root, &bindings).expect("program analyzes");
    (ast, root)
}

/// The symbol record bound to a declaration's identifier.
pub fn declared_symbol(ast: &Ast, decl: NodeId) -> swarm_lang::symbol::Symbol {
    let id = match ast.kind(decl) {
        NodeKind::VariableDeclaration { id, .. } => *id,
        other => panic!("not a declaration: {:?}", other.tag()),
    };
    let sym = ast.identifier_symbol(id).expect("declaration is bound");
    ast.symbols.get(sym).clone()
}
