//! Distributed queue behavior against a live KV store.
//!
//! These tests exercise real Redis round trips and are ignored by default;
//! run them with `cargo test -- --ignored` against a local instance.

mod common;

use common::*;

use std::collections::BTreeMap;

use redis::Commands;
use swarm_base::Config;
use swarm_lang::ast::NodeKind;
use swarm_runtime::queue::{ExecutionQueue, JobStatus};
use swarm_runtime::store::{SharedSymbolValueStore, SymbolValueStore};
use swarm_runtime::{LocalSymbolValueStore, Value};

fn test_config(prefix: &str) -> Config {
    Config {
        redis_prefix: format!("swarm_test_{prefix}_"),
        ..Config::default()
    }
}

fn raw_connection(config: &Config) -> redis::Connection {
    redis::Client::open(config.redis_url())
        .unwrap()
        .get_connection()
        .unwrap()
}

#[test]
#[ignore = "requires a running Redis"]
fn queue_round_trip_reaches_success() {
    let config = test_config("roundtrip");
    let mut queue = ExecutionQueue::connect(&config).unwrap();
    queue.clear().unwrap();

    let (ast, add_node) = {
        let (ast, root) = compiled(|ast| {
            let a = number(ast, 1, 6.9);
            let b = number(ast, 1, 42.0);
            let sum = add(ast, 1, a, b);
            let stmt = expr_stmt(ast, 1, sum);
            program(ast, vec![stmt])
        });
        let NodeKind::Program { body } = ast.kind(root) else {
            panic!()
        };
        let NodeKind::ExpressionStatement { expression } = ast.kind(body[0]) else {
            panic!()
        };
        (ast.clone(), *expression)
    };

    let mut locals = LocalSymbolValueStore::new();
    let result = queue
        .evaluate(&ast, add_node, &mut locals, &BTreeMap::new())
        .unwrap();
    assert_eq!(result, Value::Number(6.9 + 42.0));
}

#[test]
#[ignore = "requires a running Redis"]
fn filter_mismatched_jobs_return_to_the_tail() {
    let mut config = test_config("filters");
    config.queue_filters =
        BTreeMap::from([("continent".to_string(), "Europe".to_string())]);
    let mut queue = ExecutionQueue::connect(&config).unwrap();
    queue.clear().unwrap();

    let (ast, node) = compiled(|ast| {
        let a = number(ast, 1, 1.0);
        let b = number(ast, 1, 2.0);
        add(ast, 1, a, b)
    });

    let job_filters =
        BTreeMap::from([("continent".to_string(), "Australia".to_string())]);
    let mut locals = LocalSymbolValueStore::new();
    let waiter = queue.queue(&ast, node, &mut locals, &job_filters).unwrap();

    // Not eligible here: the pop re-pushes and reports no work done.
    assert!(!queue.work_once().unwrap());
    assert!(!waiter.finished());
    assert_eq!(queue.get_status(waiter.id()), JobStatus::Pending);

    let mut conn = raw_connection(&config);
    let tail: Vec<String> = conn
        .lrange(config.key("job_queue"), -1, -1)
        .unwrap();
    assert_eq!(tail, vec![waiter.id().to_string()]);
}

#[test]
#[ignore = "requires a running Redis"]
fn matching_worker_processes_and_publishes_success() {
    let mut config = test_config("match");
    config.queue_filters = BTreeMap::from([
        ("continent".to_string(), "Australia".to_string()),
        ("rank".to_string(), "69".to_string()),
    ]);
    let mut queue = ExecutionQueue::connect(&config).unwrap();
    queue.clear().unwrap();

    let (ast, node) = compiled(|ast| {
        let a = number(ast, 1, 20.0);
        let b = number(ast, 1, 22.0);
        add(ast, 1, a, b)
    });

    // The job asks for a subset of what this worker advertises.
    let job_filters =
        BTreeMap::from([("continent".to_string(), "Australia".to_string())]);
    let mut locals = LocalSymbolValueStore::new();
    let waiter = queue.queue(&ast, node, &mut locals, &job_filters).unwrap();

    assert!(queue.work_once().unwrap());
    assert_eq!(queue.get_status(waiter.id()), JobStatus::Success);
    assert_eq!(
        queue.get_result(waiter.id()).unwrap(),
        Some(Value::Number(42.0))
    );
}

#[test]
#[ignore = "requires a running Redis"]
fn failed_jobs_record_their_reason_and_do_not_requeue() {
    let config = test_config("failure");
    let mut queue = ExecutionQueue::connect(&config).unwrap();
    queue.clear().unwrap();

    let (ast, node) = compiled(|ast| {
        let a = number(ast, 1, 1.0);
        let b = number(ast, 1, 0.0);
        ast.alloc(pos(1), NodeKind::Divide { left: a, right: b })
    });

    let mut locals = LocalSymbolValueStore::new();
    let waiter = queue
        .queue(&ast, node, &mut locals, &BTreeMap::new())
        .unwrap();

    assert!(queue.work_once().unwrap());
    assert_eq!(queue.get_status(waiter.id()), JobStatus::Failure);
    assert!(queue
        .get_failure_reason(waiter.id())
        .contains("division by zero"));

    // Failure is terminal: nothing went back on the queue.
    assert!(!queue.work_once().unwrap());
}

#[test]
#[ignore = "requires a running Redis"]
fn symbol_locks_are_reentrant_in_process_and_exclusive_across() {
    let config = test_config("locks");
    let mut store_a = SharedSymbolValueStore::connect(&config).unwrap();
    let mut store_b = SharedSymbolValueStore::connect(&config).unwrap();

    let (ast, decl) = {
        let mut decl = None;
        let (ast, _) = compiled(|ast| {
            let one = number(ast, 1, 1.0);
            let d = var_decl(ast, 1, swarm_lang::types::Type::NUMBER, "s", one, true);
            decl = Some(d);
            program(ast, vec![d])
        });
        (ast, decl.unwrap())
    };
    let symbol = declared_symbol(&ast, decl);

    // Nested acquisition within one process succeeds.
    store_a.lock(&symbol).unwrap();
    store_a.lock(&symbol).unwrap();

    // A second process cannot take the lock while it is held.
    assert!(!store_b.try_lock(&symbol).unwrap());

    store_a.unlock(&symbol).unwrap();
    assert!(!store_b.try_lock(&symbol).unwrap());

    store_a.unlock(&symbol).unwrap();
    assert!(store_b.try_lock(&symbol).unwrap());
    store_b.unlock(&symbol).unwrap();
}

#[test]
#[ignore = "requires a running Redis"]
fn shared_values_round_trip_between_stores() {
    let config = test_config("shared_values");
    let mut writer = SharedSymbolValueStore::connect(&config).unwrap();
    let mut reader = SharedSymbolValueStore::connect(&config).unwrap();

    let (ast, decl) = {
        let mut decl = None;
        let (ast, _) = compiled(|ast| {
            let items = vec![number(ast, 1, 1.0), number(ast, 1, 2.0)];
            let lit = enumeration(ast, 1, items, None);
            let d = var_decl(
                ast,
                1,
                swarm_lang::types::Type::enumerable(swarm_lang::types::Type::NUMBER),
                "se",
                lit,
                true,
            );
            decl = Some(d);
            program(ast, vec![d])
        });
        (ast, decl.unwrap())
    };
    let symbol = declared_symbol(&ast, decl);

    let value = Value::Enumeration(vec![Value::Number(1.0), Value::Number(2.0)]);
    writer.set(&symbol, value.clone()).unwrap();
    assert_eq!(reader.get(&symbol).unwrap(), value);
}
