//! The compile-and-execute pipeline.
//!
//! The lex/parse front-end is an external collaborator; the driver consumes
//! a program in the canonical AST JSON encoding. From there:
//! deserialize → name analysis → type analysis → optimization passes →
//! execute, either in-process or by shipping work through the queue.

use std::collections::BTreeMap;

use tracing::debug;

use swarm_base::{Config, SwarmError};
use swarm_lang::analysis;
use swarm_lang::ast::{Ast, NodeId, NodeKind};
use swarm_lang::optimize;
use swarm_lang::serialize::deserialize;
use swarm_runtime::queue::ExecutionQueue;
use swarm_runtime::{Interpreter, Prologue, Value};

pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Deserializes and analyzes a program, then runs the enabled
    /// optimization passes. Static diagnostics are returned together.
    pub fn compile(&self, source: &str) -> Result<(Ast, NodeId), Vec<SwarmError>> {
        let (mut ast, root) = deserialize(source).map_err(|e| vec![e])?;

        let bindings = if self.config.with_prologue {
            Prologue::standard().symbols()
        } else {
            Vec::new()
        };
        analysis::analyze(&mut ast, root, &bindings)?;

        optimize::optimize(
            &mut ast,
            root,
            self.config.remove_self_assigns,
            self.config.constant_propagation,
        );
        debug!(nodes = ast.len(), "program compiled");
        Ok((ast, root))
    }

    /// Runs the whole program in this process.
    pub fn run_local(&self, ast: &Ast, root: NodeId) -> Result<Value, SwarmError> {
        let mut interpreter = Interpreter::new(&self.config);
        interpreter.run_program(ast, root)
    }

    /// Runs the program by shipping each top-level statement through the
    /// queue. Declarations and plain assignments apply their returned value
    /// to the driver's bindings so later statements see them; shared state
    /// flows through the shared store as usual.
    pub fn run_remote(&self, ast: &Ast, root: NodeId) -> Result<Value, SwarmError> {
        let mut interpreter = Interpreter::new(&self.config);
        let mut queue = ExecutionQueue::connect(&self.config)?;
        let open_filters = BTreeMap::new();

        let NodeKind::Program { body } = ast.kind(root) else {
            return queue.evaluate(ast, root, &mut interpreter.locals, &open_filters);
        };

        let mut last = Value::Unit;
        for &stmt in body {
            match ast.kind(stmt) {
                NodeKind::VariableDeclaration { id, value, .. } => {
                    let result =
                        queue.evaluate(ast, *value, &mut interpreter.locals, &open_filters)?;
                    if let Some(sym) = ast.identifier_symbol(*id) {
                        let symbol = ast.symbols.get(sym).clone();
                        interpreter.bind(&symbol, result.clone())?;
                    }
                    last = result;
                }
                NodeKind::ExpressionStatement { expression } => {
                    let result =
                        queue.evaluate(ast, *expression, &mut interpreter.locals, &open_filters)?;
                    // A top-level assignment to a plain identifier also
                    // lands in the driver's bindings.
                    if let NodeKind::Assign { dest, .. } = ast.kind(*expression) {
                        if let NodeKind::Identifier { symbol: Some(sym), .. } = ast.kind(*dest) {
                            let symbol = ast.symbols.get(*sym).clone();
                            interpreter.bind(&symbol, result.clone())?;
                        }
                    }
                    last = result;
                }
                _ => {
                    last = queue.evaluate(ast, stmt, &mut interpreter.locals, &open_filters)?;
                }
            }
        }
        Ok(last)
    }
}
