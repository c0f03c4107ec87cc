//! Interpreter semantics against the local store.

mod common;

use common::*;

use swarm_base::SwarmError;
use swarm_lang::ast::{Ast, Comparison, Formal, NodeId, NodeKind};
use swarm_lang::optimize;
use swarm_lang::types::Type;
use swarm_runtime::store::SymbolValueStore;
use swarm_runtime::{Interpreter, Value};

fn run(build: impl FnOnce(&mut Ast) -> NodeId) -> (Interpreter, Ast, NodeId, Value) {
    let (ast, root) = compiled(build);
    let mut interpreter = Interpreter::new(&local_config());
    let result = interpreter.run_program(&ast, root).expect("program runs");
    (interpreter, ast, root, result)
}

#[test]
fn addition_follows_ieee_754_doubles() {
    let (_, _, _, result) = run(|ast| {
        let a = number(ast, 1, 6.9);
        let b = number(ast, 1, 42.0);
        let sum = add(ast, 1, a, b);
        let stmt = expr_stmt(ast, 1, sum);
        program(ast, vec![stmt])
    });
    assert_eq!(result, Value::Number(6.9 + 42.0));
}

#[test]
fn map_literal_access_reads_the_keyed_entry() {
    // map<string> m = {a:"x", b:"y"} of string; string s = m[b];
    let mut decl_s = None;
    let (mut interpreter, ast, _, result) = run(|ast| {
        let x = string(ast, 1, "x");
        let y = string(ast, 1, "y");
        let map = map_literal(ast, 1, vec![("a", x), ("b", y)], Some(Type::STRING));
        let decl_m = var_decl(ast, 1, Type::map(Type::STRING), "m", map, false);
        let use_m = ident(ast, 2, "m");
        let access = map_access(ast, 2, use_m, "b");
        let decl = var_decl(ast, 2, Type::STRING, "s", access, false);
        decl_s = Some(decl);
        program(ast, vec![decl_m, decl])
    });
    assert_eq!(result, Value::Str("y".into()));

    let symbol = declared_symbol(&ast, decl_s.unwrap());
    assert_eq!(
        interpreter.locals.get(&symbol).unwrap(),
        Value::Str("y".into())
    );
}

#[test]
fn enumerate_binds_element_and_index() {
    // number total = 0;
    // enumerate [10, 20, 30] as item, i { total = total + item + i; }
    let mut decl_total = None;
    let (mut interpreter, ast, _, _) = run(|ast| {
        let zero = number(ast, 1, 0.0);
        let decl = var_decl(ast, 1, Type::NUMBER, "total", zero, false);
        decl_total = Some(decl);

        let items = vec![
            number(ast, 2, 10.0),
            number(ast, 2, 20.0),
            number(ast, 2, 30.0),
        ];
        let lit = enumeration(ast, 2, items, None);
        let local = ident(ast, 2, "item");
        let index = ident(ast, 2, "i");

        let use_total = ident(ast, 3, "total");
        let use_item = ident(ast, 3, "item");
        let use_i = ident(ast, 3, "i");
        let partial = add(ast, 3, use_total, use_item);
        let sum = add(ast, 3, partial, use_i);
        let dest = ident(ast, 3, "total");
        let update = assign(ast, 3, dest, sum);
        let body = expr_stmt(ast, 3, update);

        let enumerate = ast.alloc(
            pos(2),
            NodeKind::Enumerate {
                enumerable: lit,
                local,
                index: Some(index),
                shared: false,
                body: vec![body],
            },
        );
        program(ast, vec![decl, enumerate])
    });

    let symbol = declared_symbol(&ast, decl_total.unwrap());
    // 10+0 + 20+1 + 30+2
    assert_eq!(
        interpreter.locals.get(&symbol).unwrap(),
        Value::Number(63.0)
    );
}

#[test]
fn break_terminates_and_continue_skips() {
    // number n = 0;
    // enumerate [1, 2, 3, 4] as item {
    //   if item == 2 { continue; }
    //   if item == 4 { break; }
    //   n = n + item;
    // }
    let mut decl_n = None;
    let (mut interpreter, ast, _, _) = run(|ast| {
        let zero = number(ast, 1, 0.0);
        let decl = var_decl(ast, 1, Type::NUMBER, "n", zero, false);
        decl_n = Some(decl);

        let items = vec![
            number(ast, 2, 1.0),
            number(ast, 2, 2.0),
            number(ast, 2, 3.0),
            number(ast, 2, 4.0),
        ];
        let lit = enumeration(ast, 2, items, None);
        let local = ident(ast, 2, "item");

        let use_a = ident(ast, 3, "item");
        let two = number(ast, 3, 2.0);
        let is_two = ast.alloc(pos(3), NodeKind::Equals { left: use_a, right: two });
        let cont = ast.alloc(pos(3), NodeKind::Continue);
        let skip = ast.alloc(
            pos(3),
            NodeKind::If {
                condition: is_two,
                body: vec![cont],
            },
        );

        let use_b = ident(ast, 4, "item");
        let four = number(ast, 4, 4.0);
        let is_four = ast.alloc(pos(4), NodeKind::Equals { left: use_b, right: four });
        let brk = ast.alloc(pos(4), NodeKind::Break);
        let stop = ast.alloc(
            pos(4),
            NodeKind::If {
                condition: is_four,
                body: vec![brk],
            },
        );

        let use_n = ident(ast, 5, "n");
        let use_item = ident(ast, 5, "item");
        let sum = add(ast, 5, use_n, use_item);
        let dest = ident(ast, 5, "n");
        let update = assign(ast, 5, dest, sum);
        let accumulate = expr_stmt(ast, 5, update);

        let enumerate = ast.alloc(
            pos(2),
            NodeKind::Enumerate {
                enumerable: lit,
                local,
                index: None,
                shared: false,
                body: vec![skip, stop, accumulate],
            },
        );
        program(ast, vec![decl, enumerate])
    });

    let symbol = declared_symbol(&ast, decl_n.unwrap());
    // 1 + 3; 2 skipped, 4 breaks before accumulating
    assert_eq!(interpreter.locals.get(&symbol).unwrap(), Value::Number(4.0));
}

#[test]
fn while_reevaluates_its_condition_each_iteration() {
    // number n = 3; while n > 0 { n = n - 1; }
    let mut decl_n = None;
    let (mut interpreter, ast, _, _) = run(|ast| {
        let three = number(ast, 1, 3.0);
        let decl = var_decl(ast, 1, Type::NUMBER, "n", three, false);
        decl_n = Some(decl);

        let use_n = ident(ast, 2, "n");
        let zero = number(ast, 2, 0.0);
        let cond = ast.alloc(
            pos(2),
            NodeKind::NumericComparison {
                comparison: Comparison::GreaterThan,
                left: use_n,
                right: zero,
            },
        );
        let use_n2 = ident(ast, 3, "n");
        let one = number(ast, 3, 1.0);
        let sub = ast.alloc(pos(3), NodeKind::Subtract { left: use_n2, right: one });
        let dest = ident(ast, 3, "n");
        let update = assign(ast, 3, dest, sub);
        let body = expr_stmt(ast, 3, update);
        let while_stmt = ast.alloc(
            pos(2),
            NodeKind::While {
                condition: cond,
                body: vec![body],
            },
        );
        program(ast, vec![decl, while_stmt])
    });

    let symbol = declared_symbol(&ast, decl_n.unwrap());
    assert_eq!(interpreter.locals.get(&symbol).unwrap(), Value::Number(0.0));
}

#[test]
fn division_by_zero_is_a_runtime_error_with_position() {
    let (ast, root) = compiled(|ast| {
        let one = number(ast, 9, 1.0);
        let zero = number(ast, 9, 0.0);
        let div = ast.alloc(pos(9), NodeKind::Divide { left: one, right: zero });
        let stmt = expr_stmt(ast, 9, div);
        program(ast, vec![stmt])
    });
    let mut interpreter = Interpreter::new(&local_config());
    match interpreter.run_program(&ast, root) {
        Err(SwarmError::Runtime { position, message }) => {
            assert!(message.contains("division by zero"));
            assert_eq!(position.start_line, 9);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn modulus_operates_on_rounded_integers() {
    let (_, _, _, result) = run(|ast| {
        let a = number(ast, 1, 7.4); // rounds to 7
        let b = number(ast, 1, 2.6); // rounds to 3
        let rem = ast.alloc(pos(1), NodeKind::Modulus { left: a, right: b });
        let stmt = expr_stmt(ast, 1, rem);
        program(ast, vec![stmt])
    });
    assert_eq!(result, Value::Number(1.0));
}

#[test]
fn nested_aggregate_assignment_writes_through() {
    // enumerable<map<number>> e = [{a:1, b:2}] of map<number>; e[0][a] = 3;
    let mut decl_e = None;
    let (mut interpreter, ast, _, _) = run(|ast| {
        let one = number(ast, 1, 1.0);
        let two = number(ast, 1, 2.0);
        let inner = map_literal(ast, 1, vec![("a", one), ("b", two)], Some(Type::NUMBER));
        let lit = enumeration(ast, 1, vec![inner], Some(Type::map(Type::NUMBER)));
        let decl = var_decl(
            ast,
            1,
            Type::enumerable(Type::map(Type::NUMBER)),
            "e",
            lit,
            false,
        );
        decl_e = Some(decl);

        let use_e = ident(ast, 2, "e");
        let zero = number(ast, 2, 0.0);
        let elem = ast.alloc(
            pos(2),
            NodeKind::EnumerableAccess {
                path: use_e,
                index: zero,
            },
        );
        let keyed = map_access(ast, 2, elem, "a");
        let three = number(ast, 2, 3.0);
        let update = assign(ast, 2, keyed, three);
        let stmt = expr_stmt(ast, 2, update);
        program(ast, vec![decl, stmt])
    });

    let symbol = declared_symbol(&ast, decl_e.unwrap());
    let value = interpreter.locals.get(&symbol).unwrap();
    assert_eq!(
        value,
        Value::Enumeration(vec![Value::Map(vec![
            ("a".into(), Value::Number(3.0)),
            ("b".into(), Value::Number(2.0)),
        ])])
    );
}

#[test]
fn append_pushes_to_the_tail() {
    // enumerable<number> e = [1]; e[] = 2;
    let mut decl_e = None;
    let (mut interpreter, ast, _, _) = run(|ast| {
        let one = number(ast, 1, 1.0);
        let lit = enumeration(ast, 1, vec![one], None);
        let decl = var_decl(ast, 1, Type::enumerable(Type::NUMBER), "e", lit, false);
        decl_e = Some(decl);

        let use_e = ident(ast, 2, "e");
        let append = ast.alloc(pos(2), NodeKind::EnumerableAppend { path: use_e });
        let two = number(ast, 2, 2.0);
        let update = assign(ast, 2, append, two);
        let stmt = expr_stmt(ast, 2, update);
        program(ast, vec![decl, stmt])
    });

    let symbol = declared_symbol(&ast, decl_e.unwrap());
    assert_eq!(
        interpreter.locals.get(&symbol).unwrap(),
        Value::Enumeration(vec![Value::Number(1.0), Value::Number(2.0)])
    );
}

fn function_program(ast: &mut Ast) -> (NodeId, NodeId) {
    // number base = 100;
    // (number -> number -> number) f =
    //     (number x, number y) -> { return x + y + base; };
    let hundred = number(ast, 1, 100.0);
    let decl_base = var_decl(ast, 1, Type::NUMBER, "base", hundred, false);

    let fn_ty = Type::lambda_of(&[Type::NUMBER, Type::NUMBER], Type::NUMBER);
    let formal_x_ty = ast.alloc(pos(2), NodeKind::TypeLiteral { value: Type::NUMBER });
    let formal_x = ident(ast, 2, "x");
    let formal_y_ty = ast.alloc(pos(2), NodeKind::TypeLiteral { value: Type::NUMBER });
    let formal_y = ident(ast, 2, "y");

    let use_x = ident(ast, 3, "x");
    let use_y = ident(ast, 3, "y");
    let use_base = ident(ast, 3, "base");
    let xy = add(ast, 3, use_x, use_y);
    let total = add(ast, 3, xy, use_base);
    let ret = ast.alloc(pos(3), NodeKind::Return { value: Some(total) });

    let type_node = ast.alloc(pos(2), NodeKind::TypeLiteral { value: fn_ty.clone() });
    let func = ast.alloc(
        pos(2),
        NodeKind::Function {
            type_node,
            formals: vec![
                Formal {
                    type_node: formal_x_ty,
                    id: formal_x,
                },
                Formal {
                    type_node: formal_y_ty,
                    id: formal_y,
                },
            ],
            body: vec![ret],
            captured: Vec::new(),
        },
    );
    let decl_f = var_decl(ast, 2, fn_ty, "f", func, false);
    (decl_base, decl_f)
}

#[test]
fn calls_bind_parameters_and_captured_environment() {
    // ... f(1, 2) == 103
    let (_, _, _, result) = run(|ast| {
        let (decl_base, decl_f) = function_program(ast);
        let use_f = ident(ast, 4, "f");
        let one = number(ast, 4, 1.0);
        let two = number(ast, 4, 2.0);
        let call = ast.alloc(
            pos(4),
            NodeKind::Call {
                func: use_f,
                args: vec![one, two],
                ty: None,
            },
        );
        let stmt = expr_stmt(ast, 4, call);
        program(ast, vec![decl_base, decl_f, stmt])
    });
    assert_eq!(result, Value::Number(103.0));
}

#[test]
fn curried_application_produces_a_partial_value() {
    // f(1) is a function; f(1)(2) == 103
    let (_, _, _, result) = run(|ast| {
        let (decl_base, decl_f) = function_program(ast);
        let use_f = ident(ast, 4, "f");
        let one = number(ast, 4, 1.0);
        let partial = ast.alloc(
            pos(4),
            NodeKind::Call {
                func: use_f,
                args: vec![one],
                ty: None,
            },
        );
        let two = number(ast, 4, 2.0);
        let full = ast.alloc(
            pos(4),
            NodeKind::Call {
                func: partial,
                args: vec![two],
                ty: None,
            },
        );
        let stmt = expr_stmt(ast, 4, full);
        program(ast, vec![decl_base, decl_f, stmt])
    });
    assert_eq!(result, Value::Number(103.0));
}

#[test]
fn prologue_log_collects_output_lines() {
    let (interpreter, _, _, _) = run(|ast| {
        let use_log = ident(ast, 1, "log");
        let hello = string(ast, 1, "hello");
        let call = ast.alloc(
            pos(1),
            NodeKind::Call {
                func: use_log,
                args: vec![hello],
                ty: None,
            },
        );
        let stmt = expr_stmt(ast, 1, call);
        program(ast, vec![stmt])
    });
    assert_eq!(interpreter.output, vec!["hello".to_string()]);
}

#[test]
fn prologue_number_to_string_formats_like_display() {
    let (_, _, _, result) = run(|ast| {
        let use_fn = ident(ast, 1, "numberToString");
        let n = number(ast, 1, 42.0);
        let call = ast.alloc(
            pos(1),
            NodeKind::Call {
                func: use_fn,
                args: vec![n],
                ty: None,
            },
        );
        let stmt = expr_stmt(ast, 1, call);
        program(ast, vec![stmt])
    });
    assert_eq!(result, Value::Str("42".into()));
}

#[test]
fn with_writes_the_resource_back_on_exit() {
    // with fileContents(path) as contents { contents = "updated"; }
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("resource.txt");
    std::fs::write(&path, "original").unwrap();
    let path_str = path.to_string_lossy().to_string();

    let (_, _, _, _) = run(|ast| {
        let use_fc = ident(ast, 1, "fileContents");
        let path_lit = string(ast, 1, &path_str);
        let resource = ast.alloc(
            pos(1),
            NodeKind::Call {
                func: use_fc,
                args: vec![path_lit],
                ty: None,
            },
        );
        let local = ident(ast, 1, "contents");
        let dest = ident(ast, 2, "contents");
        let updated = string(ast, 2, "updated");
        let write = assign(ast, 2, dest, updated);
        let body = expr_stmt(ast, 2, write);
        let with = ast.alloc(
            pos(1),
            NodeKind::With {
                resource,
                local,
                shared: false,
                body: vec![body],
            },
        );
        program(ast, vec![with])
    });

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "updated");
}

#[test]
fn self_assignment_removal_preserves_final_stores() {
    // number x = 1; x = x; x = x + 1;
    let build = |ast: &mut Ast| -> (NodeId, NodeId) {
        let one = number(ast, 1, 1.0);
        let decl = var_decl(ast, 1, Type::NUMBER, "x", one, false);
        let d1 = ident(ast, 2, "x");
        let v1 = ident(ast, 2, "x");
        let self_assign = assign(ast, 2, d1, v1);
        let s1 = expr_stmt(ast, 2, self_assign);
        let d2 = ident(ast, 3, "x");
        let v2 = ident(ast, 3, "x");
        let one_b = number(ast, 3, 1.0);
        let sum = add(ast, 3, v2, one_b);
        let bump = assign(ast, 3, d2, sum);
        let s2 = expr_stmt(ast, 3, bump);
        let root = program(ast, vec![decl, s1, s2]);
        (root, decl)
    };

    let (plain_ast, plain_root, plain_decl) = {
        let mut decl = None;
        let (ast, root) = compiled(|ast| {
            let (root, d) = build(ast);
            decl = Some(d);
            root
        });
        (ast, root, decl.unwrap())
    };
    let (mut opt_ast, opt_root, opt_decl) = {
        let mut decl = None;
        let (ast, root) = compiled(|ast| {
            let (root, d) = build(ast);
            decl = Some(d);
            root
        });
        (ast, root, decl.unwrap())
    };
    optimize::remove_self_assignments(&mut opt_ast, opt_root);

    let mut plain = Interpreter::new(&local_config());
    plain.run_program(&plain_ast, plain_root).unwrap();
    let mut optimized = Interpreter::new(&local_config());
    optimized.run_program(&opt_ast, opt_root).unwrap();

    let plain_sym = declared_symbol(&plain_ast, plain_decl);
    let opt_sym = declared_symbol(&opt_ast, opt_decl);
    assert_eq!(
        plain.locals.get(&plain_sym).unwrap(),
        optimized.locals.get(&opt_sym).unwrap()
    );
    assert_eq!(plain.locals.get(&plain_sym).unwrap(), Value::Number(2.0));
}

#[test]
fn constant_propagation_is_a_no_op_without_literal_bindings() {
    // number x = 1 + f()... no literal single-assignments → tree unchanged
    let (mut ast, root) = compiled(|ast| {
        let d = ident(ast, 2, "x");
        let v = number(ast, 2, 2.0);
        let one = number(ast, 1, 1.0);
        let decl = var_decl(ast, 1, Type::NUMBER, "x", one, false);
        let update = assign(ast, 2, d, v);
        let stmt = expr_stmt(ast, 2, update);
        program(ast, vec![decl, stmt])
    });
    let before = swarm_lang::serialize::Serializer::to_json(&ast, root).unwrap();
    optimize::propagate_constants(&mut ast, root);
    let after = swarm_lang::serialize::Serializer::to_json(&ast, root).unwrap();
    // `x` is reassigned, so nothing propagates and the tree is unchanged.
    assert_eq!(before, after);
}

#[test]
fn deferred_calls_run_inline_under_force_local() {
    let (_, _, _, result) = run(|ast| {
        let use_fn = ident(ast, 1, "numberToString");
        let n = number(ast, 1, 7.0);
        let call = ast.alloc(
            pos(1),
            NodeKind::Call {
                func: use_fn,
                args: vec![n],
                ty: None,
            },
        );
        let defer = ast.alloc(pos(1), NodeKind::DeferCall { call });
        let stmt = expr_stmt(ast, 1, defer);
        program(ast, vec![stmt])
    });
    assert_eq!(result, Value::Str("7".into()));
}
