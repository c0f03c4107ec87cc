//! End-to-end name and type analysis over built programs.

mod common;

use common::*;

use swarm_base::{NameErrorKind, SwarmError};
use swarm_lang::analysis;
use swarm_lang::ast::{Ast, NodeId, NodeKind, Formal};
use swarm_lang::types::Type;

fn analyze(ast: &mut Ast, root: NodeId) -> Result<(), Vec<SwarmError>> {
    analysis::analyze(ast, root, &[]).map(|_| ())
}

#[test]
fn declarations_bind_identifiers_to_one_symbol() {
    // number x = 1; x = x + 1;
    let mut ast = Ast::new();
    let one = number(&mut ast, 1, 1.0);
    let decl = var_decl(&mut ast, 1, Type::NUMBER, "x", one, false);

    let use_a = ident(&mut ast, 2, "x");
    let one_b = number(&mut ast, 2, 1.0);
    let add = ast.alloc(
        pos(2, 5),
        NodeKind::Add {
            left: use_a,
            right: one_b,
            concatenation: false,
        },
    );
    let dest = ident(&mut ast, 2, "x");
    let assign = ast.alloc(pos(2, 1), NodeKind::Assign { dest, value: add });
    let stmt = expr_stmt(&mut ast, 2, assign);
    let root = program(&mut ast, vec![decl, stmt]);

    analyze(&mut ast, root).expect("program analyzes");

    let declared = ast.identifier_symbol(use_a).expect("use is bound");
    assert_eq!(ast.identifier_symbol(dest), Some(declared));
    assert_eq!(ast.symbols.get(declared).ty, Type::NUMBER);
}

#[test]
fn undeclared_identifiers_are_reported_with_their_position() {
    let mut ast = Ast::new();
    let use_x = ident(&mut ast, 3, "ghost");
    let stmt = expr_stmt(&mut ast, 3, use_x);
    let root = program(&mut ast, vec![stmt]);

    let errors = analyze(&mut ast, root).unwrap_err();
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        SwarmError::Name { kind, position, .. } => {
            assert_eq!(*kind, NameErrorKind::Undeclared);
            assert_eq!(position.start_line, 3);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn redeclaration_in_the_same_frame_is_an_error() {
    let mut ast = Ast::new();
    let one = number(&mut ast, 1, 1.0);
    let first = var_decl(&mut ast, 1, Type::NUMBER, "x", one, false);
    let two = number(&mut ast, 2, 2.0);
    let second = var_decl(&mut ast, 2, Type::NUMBER, "x", two, false);
    let root = program(&mut ast, vec![first, second]);

    let errors = analyze(&mut ast, root).unwrap_err();
    assert!(errors.iter().any(|e| matches!(
        e,
        SwarmError::Name {
            kind: NameErrorKind::Redeclaration,
            ..
        }
    )));
}

#[test]
fn shared_flags_come_from_the_declaration_syntax() {
    // enumerable<number> e = [1,2]; shared enumerable<number> se = [1,2];
    let mut ast = Ast::new();
    let items_a = vec![number(&mut ast, 1, 1.0), number(&mut ast, 1, 2.0)];
    let lit_a = enumeration(&mut ast, 1, items_a, None);
    let decl_a = var_decl(&mut ast, 1, Type::enumerable(Type::NUMBER), "e", lit_a, false);

    let items_b = vec![number(&mut ast, 2, 1.0), number(&mut ast, 2, 2.0)];
    let lit_b = enumeration(&mut ast, 2, items_b, None);
    let decl_b = var_decl(&mut ast, 2, Type::enumerable(Type::NUMBER), "se", lit_b, true);

    let root = program(&mut ast, vec![decl_a, decl_b]);
    analyze(&mut ast, root).expect("program analyzes");

    let (id_a, id_b) = match (ast.kind(decl_a), ast.kind(decl_b)) {
        (
            NodeKind::VariableDeclaration { id: a, .. },
            NodeKind::VariableDeclaration { id: b, .. },
        ) => (*a, *b),
        _ => unreachable!(),
    };
    let sym_a = ast.symbols.get(ast.identifier_symbol(id_a).unwrap());
    let sym_b = ast.symbols.get(ast.identifier_symbol(id_b).unwrap());
    assert!(!sym_a.shared);
    assert!(sym_b.shared);
    assert_eq!(sym_a.ty, sym_b.ty);
    assert_eq!(sym_a.ty, Type::enumerable(Type::NUMBER));
}

#[test]
fn map_access_types_as_the_value_type() {
    // map<string> m = {a:"x", b:"y"} of string; string s = m[b];
    let mut ast = Ast::new();
    let x = string(&mut ast, 1, "x");
    let y = string(&mut ast, 1, "y");
    let map = map_literal(&mut ast, 1, vec![("a", x), ("b", y)], Some(Type::STRING));
    let decl_m = var_decl(&mut ast, 1, Type::map(Type::STRING), "m", map, false);

    let use_m = ident(&mut ast, 2, "m");
    let access = map_access(&mut ast, 2, use_m, "b");
    let decl_s = var_decl(&mut ast, 2, Type::STRING, "s", access, false);

    let root = program(&mut ast, vec![decl_m, decl_s]);
    analyze(&mut ast, root).expect("program analyzes");

    let id_s = match ast.kind(decl_s) {
        NodeKind::VariableDeclaration { id, .. } => *id,
        _ => unreachable!(),
    };
    let sym = ast.symbols.get(ast.identifier_symbol(id_s).unwrap());
    assert_eq!(sym.ty, Type::STRING);
    // The key identifier is a bare key, never resolved against scope.
    let end = match ast.kind(access) {
        NodeKind::MapAccess { end, .. } => *end,
        _ => unreachable!(),
    };
    assert!(ast.identifier_symbol(end).is_none());
}

#[test]
fn string_addition_sets_the_concatenation_flag() {
    let mut ast = Ast::new();
    let a = string(&mut ast, 1, "foo");
    let b = string(&mut ast, 1, "bar");
    let add = ast.alloc(
        pos(1, 1),
        NodeKind::Add {
            left: a,
            right: b,
            concatenation: false,
        },
    );
    let stmt = expr_stmt(&mut ast, 1, add);
    let root = program(&mut ast, vec![stmt]);
    analyze(&mut ast, root).expect("program analyzes");

    match ast.kind(add) {
        NodeKind::Add { concatenation, .. } => assert!(*concatenation),
        _ => unreachable!(),
    }
}

#[test]
fn mixed_operand_addition_is_collected_not_thrown() {
    // 1 + "x"; true && 2; — both reported in one pass
    let mut ast = Ast::new();
    let one = number(&mut ast, 1, 1.0);
    let x = string(&mut ast, 1, "x");
    let add = ast.alloc(
        pos(1, 1),
        NodeKind::Add {
            left: one,
            right: x,
            concatenation: false,
        },
    );
    let stmt1 = expr_stmt(&mut ast, 1, add);

    let t = ast.alloc(pos(2, 1), NodeKind::BooleanLiteral { value: true });
    let two = number(&mut ast, 2, 2.0);
    let and = ast.alloc(pos(2, 1), NodeKind::And { left: t, right: two });
    let stmt2 = expr_stmt(&mut ast, 2, and);

    let root = program(&mut ast, vec![stmt1, stmt2]);
    let errors = analyze(&mut ast, root).unwrap_err();
    assert!(errors.len() >= 2);
    assert!(errors.iter().all(|e| e.is_static()));
}

#[test]
fn enumerate_declares_a_typed_induction_variable() {
    // enumerable<string> e = ["a"]; enumerate e as item { item; }
    let mut ast = Ast::new();
    let a = string(&mut ast, 1, "a");
    let lit = enumeration(&mut ast, 1, vec![a], None);
    let decl = var_decl(&mut ast, 1, Type::enumerable(Type::STRING), "e", lit, false);

    let use_e = ident(&mut ast, 2, "e");
    let local = ident(&mut ast, 2, "item");
    let use_item = ident(&mut ast, 3, "item");
    let body_stmt = expr_stmt(&mut ast, 3, use_item);
    let enumerate = ast.alloc(
        pos(2, 1),
        NodeKind::Enumerate {
            enumerable: use_e,
            local,
            index: None,
            shared: true,
            body: vec![body_stmt],
        },
    );
    let root = program(&mut ast, vec![decl, enumerate]);
    analyze(&mut ast, root).expect("program analyzes");

    let sym = ast.symbols.get(ast.identifier_symbol(local).unwrap());
    assert_eq!(sym.ty, Type::STRING);
    // The induction variable takes the loop header's shared flag.
    assert!(sym.shared);
    assert_eq!(ast.identifier_symbol(use_item), ast.identifier_symbol(local));
}

#[test]
fn functions_record_their_captured_free_variables() {
    // number base = 10;
    // (number -> number) f = (number x) -> { return x + base; };
    let mut ast = Ast::new();
    let ten = number(&mut ast, 1, 10.0);
    let decl_base = var_decl(&mut ast, 1, Type::NUMBER, "base", ten, false);

    let formal_ty = type_literal(&mut ast, 2, Type::NUMBER);
    let formal_id = ident(&mut ast, 2, "x");
    let use_x = ident(&mut ast, 3, "x");
    let use_base = ident(&mut ast, 3, "base");
    let sum = ast.alloc(
        pos(3, 1),
        NodeKind::Add {
            left: use_x,
            right: use_base,
            concatenation: false,
        },
    );
    let ret = ast.alloc(pos(3, 1), NodeKind::Return { value: Some(sum) });
    let fn_ty = Type::lambda(Type::NUMBER, Type::NUMBER);
    let fn_type_node = type_literal(&mut ast, 2, fn_ty.clone());
    let func = ast.alloc(
        pos(2, 1),
        NodeKind::Function {
            type_node: fn_type_node,
            formals: vec![Formal {
                type_node: formal_ty,
                id: formal_id,
            }],
            body: vec![ret],
            captured: Vec::new(),
        },
    );
    let decl_f = var_decl(&mut ast, 2, fn_ty, "f", func, false);

    let root = program(&mut ast, vec![decl_base, decl_f]);
    analyze(&mut ast, root).expect("program analyzes");

    let base_sym = ast.identifier_symbol(use_base).unwrap();
    match ast.kind(func) {
        NodeKind::Function { captured, .. } => {
            assert_eq!(captured.as_slice(), &[base_sym]);
        }
        _ => unreachable!(),
    }
}

#[test]
fn shared_function_declarations_are_rejected() {
    let mut ast = Ast::new();
    let fn_ty = Type::lambda(Type::NUMBER, Type::NUMBER);
    let fn_type_node = type_literal(&mut ast, 1, fn_ty.clone());
    let func = ast.alloc(
        pos(1, 1),
        NodeKind::Function {
            type_node: fn_type_node,
            formals: Vec::new(),
            body: Vec::new(),
            captured: Vec::new(),
        },
    );
    let decl = var_decl(&mut ast, 1, fn_ty, "f", func, true);
    let root = program(&mut ast, vec![decl]);

    let errors = analyze(&mut ast, root).unwrap_err();
    assert!(errors.iter().any(|e| matches!(
        e,
        SwarmError::Name {
            kind: NameErrorKind::SharedViolation,
            ..
        }
    )));
}

#[test]
fn ambiguous_type_literals_fail_disambiguation() {
    let mut ast = Ast::new();
    let one = number(&mut ast, 1, 1.0);
    let decl = var_decl(
        &mut ast,
        1,
        Type::Ambiguous(vec![Type::NUMBER, Type::STRING]),
        "x",
        one,
        false,
    );
    let root = program(&mut ast, vec![decl]);

    let errors = analyze(&mut ast, root).unwrap_err();
    assert!(errors
        .iter()
        .any(|e| matches!(e, SwarmError::TypeAmbiguous { .. })));
}

#[test]
fn single_candidate_ambiguity_narrows_silently() {
    let mut ast = Ast::new();
    let one = number(&mut ast, 1, 1.0);
    let decl = var_decl(
        &mut ast,
        1,
        Type::Ambiguous(vec![Type::NUMBER]),
        "x",
        one,
        false,
    );
    let root = program(&mut ast, vec![decl]);
    analyze(&mut ast, root).expect("narrows to number");

    let id = match ast.kind(decl) {
        NodeKind::VariableDeclaration { id, .. } => *id,
        _ => unreachable!(),
    };
    let sym = ast.symbols.get(ast.identifier_symbol(id).unwrap());
    assert_eq!(sym.ty, Type::NUMBER);
}
