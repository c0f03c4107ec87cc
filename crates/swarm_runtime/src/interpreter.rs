//! The tree-walking interpreter.
//!
//! Evaluation is post-order and value-driven: operators inspect the values
//! their operands produced rather than static node types, which is what lets
//! a deserialized subtree run on a worker without re-running the analyses.
//!
//! Symbol access routes by storage class: shared symbols read and write the
//! shared store, everything else stays in the local store. A mutation of a
//! shared aggregate (map/array/object element assignment) holds the root
//! symbol's lock across the whole read-modify-write.
//!
//! Numbers follow IEEE-754 double semantics; modulus operates on rounded
//! integers; division by zero is a runtime error at the operator's position.

use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::debug;

use swarm_base::{Config, Position, SwarmError};
use swarm_lang::ast::{Ast, NodeId, NodeKind};
use swarm_lang::symbol::Symbol;
use swarm_lang::types::Type;

use crate::prologue::Prologue;
use crate::queue::ExecutionQueue;
use crate::store::{
    LocalSymbolValueStore, SharedSymbolValueStore, SymbolValueStore,
};
use crate::value::{LambdaValue, ObjectValue, Resource, TypeDefValue, Value};

/// Control flow out of statement execution.
enum Flow {
    Normal(Value),
    Break,
    Continue,
    Return(Value),
}

pub struct Interpreter {
    config: Config,
    pub locals: LocalSymbolValueStore,
    shared: Option<SharedSymbolValueStore>,
    queue: Option<Box<ExecutionQueue>>,
    prologue: Prologue,
    /// Lines produced by the `log` builtin, in order.
    pub output: Vec<String>,
}

impl Interpreter {
    pub fn new(config: &Config) -> Self {
        Self::with_locals(config, LocalSymbolValueStore::new())
    }

    pub fn with_locals(config: &Config, locals: LocalSymbolValueStore) -> Self {
        let prologue = if config.with_prologue {
            Prologue::standard()
        } else {
            Prologue::empty()
        };
        Self {
            config: config.clone(),
            locals,
            shared: None,
            queue: None,
            prologue,
            output: Vec::new(),
        }
    }

    /// Evaluates any node: programs run statement by statement, statements
    /// run for effect, expressions produce their value.
    pub fn evaluate(&mut self, ast: &Ast, node: NodeId) -> Result<Value, SwarmError> {
        match ast.kind(node) {
            NodeKind::Program { .. } => self.run_program(ast, node),
            _ if ast.tag(node).is_statement() => match self.exec(ast, node)? {
                Flow::Normal(value) | Flow::Return(value) => Ok(value),
                _ => Ok(Value::Unit),
            },
            _ => self.eval(ast, node),
        }
    }

    /// Runs a program; the result is the last statement's value.
    pub fn run_program(&mut self, ast: &Ast, root: NodeId) -> Result<Value, SwarmError> {
        let NodeKind::Program { body } = ast.kind(root) else {
            return self.evaluate(ast, root);
        };
        let mut last = Value::Unit;
        for &stmt in body {
            match self.exec(ast, stmt)? {
                Flow::Normal(value) => last = value,
                Flow::Return(value) => return Ok(value),
                Flow::Break | Flow::Continue => break,
            }
        }
        Ok(last)
    }

    /// Binds a symbol in the store its storage class selects. The driver
    /// uses this to apply remotely-computed declaration values.
    pub fn bind(&mut self, symbol: &Symbol, value: Value) -> Result<(), SwarmError> {
        self.write_symbol(symbol, value)
    }

    fn shared_store(&mut self) -> Result<&mut SharedSymbolValueStore, SwarmError> {
        if self.shared.is_none() {
            self.shared = Some(SharedSymbolValueStore::connect(&self.config)?);
        }
        Ok(self.shared.as_mut().expect("shared store just connected"))
    }

    fn ensure_queue(&mut self) -> Result<(), SwarmError> {
        if self.queue.is_none() {
            self.queue = Some(Box::new(ExecutionQueue::connect(&self.config)?));
        }
        Ok(())
    }

    fn read_symbol(&mut self, symbol: &Symbol) -> Result<Value, SwarmError> {
        if symbol.is_prologue {
            return match self.prologue.get(&symbol.name) {
                Some(_) => Ok(Value::Host(symbol.name.clone())),
                None => Err(SwarmError::FreeSymbol {
                    name: symbol.name.clone(),
                }),
            };
        }
        if symbol.shared && !self.config.force_local {
            self.shared_store()?.get(symbol)
        } else {
            self.locals.get(symbol)
        }
    }

    fn write_symbol(&mut self, symbol: &Symbol, value: Value) -> Result<(), SwarmError> {
        if symbol.shared && !self.config.force_local {
            self.shared_store()?.set(symbol, value)
        } else {
            self.locals.set(symbol, value)
        }
    }

    // ─── statements ─────────────────────────────────────────────────

    fn exec_block(&mut self, ast: &Ast, body: &[NodeId]) -> Result<Flow, SwarmError> {
        for &stmt in body {
            match self.exec(ast, stmt)? {
                Flow::Normal(_) => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal(Value::Unit))
    }

    fn exec(&mut self, ast: &Ast, node: NodeId) -> Result<Flow, SwarmError> {
        match ast.kind(node) {
            NodeKind::Program { .. } => {
                let value = self.run_program(ast, node)?;
                Ok(Flow::Normal(value))
            }
            NodeKind::ExpressionStatement { expression } => {
                let value = self.eval(ast, *expression)?;
                Ok(Flow::Normal(value))
            }
            NodeKind::VariableDeclaration { id, value, .. } => {
                let evaluated = self.eval(ast, *value)?;
                let symbol = self.bound_symbol(ast, *id)?;
                self.write_symbol(&symbol, evaluated.clone())?;
                Ok(Flow::Normal(evaluated))
            }
            NodeKind::UninitializedVariableDeclaration { .. }
            | NodeKind::Use { .. }
            | NodeKind::Include { .. }
            | NodeKind::Constructor { .. } => Ok(Flow::Normal(Value::Unit)),
            NodeKind::Return { value } => {
                let value = match value {
                    Some(v) => self.eval(ast, *v)?,
                    None => Value::Unit,
                };
                Ok(Flow::Return(value))
            }
            NodeKind::Break => Ok(Flow::Break),
            NodeKind::Continue => Ok(Flow::Continue),
            NodeKind::If { condition, body } => {
                let cond = self.boolean(ast, *condition)?;
                if cond {
                    self.exec_block(ast, body)
                } else {
                    Ok(Flow::Normal(Value::Unit))
                }
            }
            NodeKind::While { condition, body } => {
                // Evaluate the condition afresh at the top of each iteration.
                loop {
                    if !self.boolean(ast, *condition)? {
                        break;
                    }
                    match self.exec_block(ast, body)? {
                        Flow::Break => break,
                        Flow::Continue | Flow::Normal(_) => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal(Value::Unit))
            }
            NodeKind::Enumerate {
                enumerable,
                local,
                index,
                body,
                ..
            } => {
                let items = match self.eval(ast, *enumerable)? {
                    Value::Enumeration(items) => items,
                    other => {
                        return Err(SwarmError::runtime(
                            ast.pos(*enumerable).clone(),
                            format!("cannot enumerate a {}", other.type_name()),
                        ))
                    }
                };
                let local_symbol = self.bound_symbol(ast, *local)?;
                let index_symbol = match index {
                    Some(ix) => Some(self.bound_symbol(ast, *ix)?),
                    None => None,
                };
                for (i, item) in items.into_iter().enumerate() {
                    self.write_symbol(&local_symbol, item)?;
                    if let Some(ix) = &index_symbol {
                        self.write_symbol(ix, Value::Number(i as f64))?;
                    }
                    match self.exec_block(ast, body)? {
                        Flow::Break => break,
                        Flow::Continue | Flow::Normal(_) => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal(Value::Unit))
            }
            NodeKind::With {
                resource,
                local,
                body,
                ..
            } => {
                let value = self.eval(ast, *resource)?;
                let local_symbol = self.bound_symbol(ast, *local)?;
                let opened = match value {
                    Value::Resource(resource) => {
                        let bound = self.open_resource(&resource, ast.pos(node))?;
                        self.write_symbol(&local_symbol, bound)?;
                        Some(resource)
                    }
                    other => {
                        self.write_symbol(&local_symbol, other)?;
                        None
                    }
                };

                let flow = self.exec_block(ast, body);

                // Release on every exit path, error included.
                if let Some(resource) = opened {
                    let closed = self.close_resource(&resource, &local_symbol, ast.pos(node));
                    let flow = flow?;
                    closed?;
                    return Ok(flow);
                }
                flow
            }
            // Statement expressions appearing bare.
            _ => {
                let value = self.eval(ast, node)?;
                Ok(Flow::Normal(value))
            }
        }
    }

    // ─── expressions ────────────────────────────────────────────────

    fn eval(&mut self, ast: &Ast, node: NodeId) -> Result<Value, SwarmError> {
        match ast.kind(node) {
            NodeKind::Identifier { .. } => {
                let symbol = self.bound_symbol(ast, node)?;
                self.read_symbol(&symbol)
            }
            NodeKind::BooleanLiteral { value } => Ok(Value::Boolean(*value)),
            NodeKind::StringLiteral { value } => Ok(Value::Str(value.clone())),
            NodeKind::NumberLiteral { value } => Ok(Value::Number(*value)),
            NodeKind::UnitLiteral => Ok(Value::Unit),
            NodeKind::TypeLiteral { value } => Ok(Value::Type(value.clone())),
            NodeKind::EnumerationLiteral { actuals, .. } => {
                let mut items = Vec::with_capacity(actuals.len());
                for &actual in actuals {
                    items.push(self.eval(ast, actual)?);
                }
                Ok(Value::Enumeration(items))
            }
            NodeKind::MapLiteral { body, .. } => {
                let mut entries = Vec::with_capacity(body.len());
                for &stmt in body {
                    let NodeKind::MapStatement { key, value } = ast.kind(stmt) else {
                        continue;
                    };
                    let evaluated = self.eval(ast, *value)?;
                    Value::map_set(&mut entries, ast.identifier_name(*key), evaluated);
                }
                Ok(Value::Map(entries))
            }
            NodeKind::MapStatement { value, .. } => self.eval(ast, *value),
            NodeKind::Assign { dest, value } => {
                let evaluated = self.eval(ast, *value)?;
                self.assign(ast, *dest, evaluated)
            }
            NodeKind::EnumerableAccess { path, index } => {
                let idx = self.index_value(ast, *index)?;
                let container = self.eval(ast, *path)?;
                match container {
                    Value::Enumeration(items) => items.get(idx).cloned().ok_or_else(|| {
                        SwarmError::runtime(
                            ast.pos(node).clone(),
                            format!("index {idx} out of bounds (length {})", items.len()),
                        )
                    }),
                    other => Err(SwarmError::runtime(
                        ast.pos(*path).clone(),
                        format!("cannot index a {}", other.type_name()),
                    )),
                }
            }
            NodeKind::EnumerableAppend { .. } => Err(SwarmError::runtime(
                ast.pos(node).clone(),
                "an append target can only be assigned to",
            )),
            NodeKind::MapAccess { path, end } => {
                let key = ast.identifier_name(*end);
                match self.eval(ast, *path)? {
                    Value::Map(entries) => {
                        Value::map_get(&entries, key).cloned().ok_or_else(|| {
                            SwarmError::runtime(
                                ast.pos(*end).clone(),
                                format!("map has no key `{key}`"),
                            )
                        })
                    }
                    other => Err(SwarmError::runtime(
                        ast.pos(*path).clone(),
                        format!("cannot key into a {}", other.type_name()),
                    )),
                }
            }
            NodeKind::ClassAccess { path, end } => {
                let member = ast.identifier_name(*end);
                match self.eval(ast, *path)? {
                    Value::Object(object) => {
                        object.property(member).cloned().ok_or_else(|| {
                            SwarmError::runtime(
                                ast.pos(*end).clone(),
                                format!("`{}` has no property `{member}`", object.ty.name),
                            )
                        })
                    }
                    other => Err(SwarmError::runtime(
                        ast.pos(*path).clone(),
                        format!("cannot access a member of a {}", other.type_name()),
                    )),
                }
            }
            NodeKind::Function { captured, .. } => {
                let (sub_ast, sub_node) = ast.extract_subtree(node);
                let mut snapshot = Vec::new();
                for &sym in captured {
                    let record = ast.symbols.get(sym).clone();
                    // Shared symbols read live from the shared store at call
                    // time; snapshot only process-local state.
                    if record.shared {
                        continue;
                    }
                    if let Some(value) = self.locals.try_get(&record)? {
                        snapshot.push((record, value));
                    }
                }
                Ok(Value::Lambda(LambdaValue {
                    ast: Rc::new(sub_ast),
                    node: sub_node,
                    captured: snapshot,
                    applied: Vec::new(),
                }))
            }
            NodeKind::TypeBody { value, .. } => {
                let ty = match value {
                    Some(Type::Object(obj)) => obj.clone(),
                    _ => {
                        return Err(SwarmError::runtime(
                            ast.pos(node).clone(),
                            "type body was not resolved to an object type",
                        ))
                    }
                };
                let (sub_ast, sub_node) = ast.extract_subtree(node);
                Ok(Value::TypeDef(TypeDefValue {
                    ty,
                    ast: Rc::new(sub_ast),
                    node: sub_node,
                }))
            }
            NodeKind::Call { func, args, .. } => {
                let callee = self.eval(ast, *func)?;
                let mut values = Vec::with_capacity(args.len());
                for &arg in args {
                    values.push(self.eval(ast, arg)?);
                }
                self.call_value(ast.pos(node), callee, values)
            }
            NodeKind::DeferCall { call } => {
                if self.config.force_local {
                    return self.eval(ast, *call);
                }
                let (sub_ast, sub_root) = ast.extract_subtree(*call);
                self.ensure_queue()?;
                let queue = self.queue.as_mut().expect("queue just connected");
                // Fire and forget: deferred calls may run on any worker.
                let waiter =
                    queue.queue(&sub_ast, sub_root, &mut self.locals, &BTreeMap::new())?;
                debug!(job = %waiter.id(), "deferred call queued");
                Ok(Value::Unit)
            }
            NodeKind::And { left, right } => {
                let l = self.boolean(ast, *left)?;
                let r = self.boolean(ast, *right)?;
                Ok(Value::Boolean(l && r))
            }
            NodeKind::Or { left, right } => {
                let l = self.boolean(ast, *left)?;
                let r = self.boolean(ast, *right)?;
                Ok(Value::Boolean(l || r))
            }
            NodeKind::Not { exp } => {
                let v = self.boolean(ast, *exp)?;
                Ok(Value::Boolean(!v))
            }
            NodeKind::Equals { left, right } => {
                let l = self.eval(ast, *left)?;
                let r = self.eval(ast, *right)?;
                Ok(Value::Boolean(l == r))
            }
            NodeKind::NotEquals { left, right } => {
                let l = self.eval(ast, *left)?;
                let r = self.eval(ast, *right)?;
                Ok(Value::Boolean(l != r))
            }
            NodeKind::NumericComparison {
                comparison,
                left,
                right,
            } => {
                let l = self.number(ast, *left)?;
                let r = self.number(ast, *right)?;
                Ok(Value::Boolean(comparison.evaluate(l, r)))
            }
            NodeKind::Add { left, right, .. } => {
                let l = self.eval(ast, *left)?;
                let r = self.eval(ast, *right)?;
                match (l, r) {
                    (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                    (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
                    (l, r) => Err(SwarmError::runtime(
                        ast.pos(node).clone(),
                        format!("cannot add {} and {}", l.type_name(), r.type_name()),
                    )),
                }
            }
            NodeKind::Subtract { left, right } => {
                let (l, r) = (self.number(ast, *left)?, self.number(ast, *right)?);
                Ok(Value::Number(l - r))
            }
            NodeKind::Multiply { left, right } => {
                let (l, r) = (self.number(ast, *left)?, self.number(ast, *right)?);
                Ok(Value::Number(l * r))
            }
            NodeKind::Divide { left, right } => {
                let (l, r) = (self.number(ast, *left)?, self.number(ast, *right)?);
                if r == 0.0 {
                    return Err(SwarmError::runtime(
                        ast.pos(node).clone(),
                        "division by zero",
                    ));
                }
                Ok(Value::Number(l / r))
            }
            NodeKind::Modulus { left, right } => {
                let (l, r) = (self.number(ast, *left)?, self.number(ast, *right)?);
                let (li, ri) = (l.round() as i64, r.round() as i64);
                if ri == 0 {
                    return Err(SwarmError::runtime(
                        ast.pos(node).clone(),
                        "modulus by zero",
                    ));
                }
                Ok(Value::Number((li % ri) as f64))
            }
            NodeKind::Power { left, right } => {
                let (l, r) = (self.number(ast, *left)?, self.number(ast, *right)?);
                Ok(Value::Number(l.powf(r)))
            }
            NodeKind::NthRoot { left, right } => {
                let (n, x) = (self.number(ast, *left)?, self.number(ast, *right)?);
                if n == 0.0 {
                    return Err(SwarmError::runtime(
                        ast.pos(node).clone(),
                        "zeroth root is undefined",
                    ));
                }
                Ok(Value::Number(x.powf(1.0 / n)))
            }
            NodeKind::Negative { exp } => {
                let v = self.number(ast, *exp)?;
                Ok(Value::Number(-v))
            }
            // Statements reached in expression position run for effect.
            _ => match self.exec(ast, node)? {
                Flow::Normal(value) | Flow::Return(value) => Ok(value),
                _ => Ok(Value::Unit),
            },
        }
    }

    // ─── helpers ────────────────────────────────────────────────────

    fn bound_symbol(&self, ast: &Ast, id: NodeId) -> Result<Symbol, SwarmError> {
        ast.identifier_symbol(id)
            .map(|s| ast.symbols.get(s).clone())
            .ok_or_else(|| SwarmError::runtime(
                ast.pos(id).clone(),
                format!("identifier `{}` was never resolved", ast.identifier_name(id)),
            ))
    }

    fn number(&mut self, ast: &Ast, node: NodeId) -> Result<f64, SwarmError> {
        match self.eval(ast, node)? {
            Value::Number(n) => Ok(n),
            other => Err(SwarmError::runtime(
                ast.pos(node).clone(),
                format!("expected a number, found {}", other.type_name()),
            )),
        }
    }

    fn boolean(&mut self, ast: &Ast, node: NodeId) -> Result<bool, SwarmError> {
        match self.eval(ast, node)? {
            Value::Boolean(b) => Ok(b),
            other => Err(SwarmError::runtime(
                ast.pos(node).clone(),
                format!("expected a boolean, found {}", other.type_name()),
            )),
        }
    }

    fn index_value(&mut self, ast: &Ast, node: NodeId) -> Result<usize, SwarmError> {
        let n = self.number(ast, node)?;
        if n < 0.0 {
            return Err(SwarmError::runtime(
                ast.pos(node).clone(),
                format!("negative index {n}"),
            ));
        }
        Ok(n as usize)
    }

    /// Writes `value` through the lval. For a shared aggregate the root
    /// symbol's lock is held across the read-modify-write.
    fn assign(&mut self, ast: &Ast, dest: NodeId, value: Value) -> Result<Value, SwarmError> {
        let locked_aggregate = ast.lval_is_shared(dest)
            && !self.config.force_local
            && !matches!(ast.kind(dest), NodeKind::Identifier { .. });

        if locked_aggregate {
            let root = ast
                .lval_root_symbol(dest)
                .map(|s| ast.symbols.get(s).clone())
                .ok_or_else(|| {
                    SwarmError::runtime(ast.pos(dest).clone(), "assignment target has no symbol")
                })?;
            self.shared_store()?.lock(&root)?;
            let written = self.write_lval(ast, dest, value.clone());
            let released = self.shared_store()?.unlock(&root);
            written?;
            released?;
        } else {
            self.write_lval(ast, dest, value.clone())?;
        }
        Ok(value)
    }

    fn write_lval(&mut self, ast: &Ast, lval: NodeId, value: Value) -> Result<(), SwarmError> {
        match ast.kind(lval) {
            NodeKind::Identifier { .. } => {
                let symbol = self.bound_symbol(ast, lval)?;
                self.write_symbol(&symbol, value)
            }
            NodeKind::EnumerableAccess { path, index } => {
                let idx = self.index_value(ast, *index)?;
                let container = self.eval(ast, *path)?;
                match container {
                    Value::Enumeration(mut items) => {
                        if idx >= items.len() {
                            return Err(SwarmError::runtime(
                                ast.pos(lval).clone(),
                                format!("index {idx} out of bounds (length {})", items.len()),
                            ));
                        }
                        items[idx] = value;
                        self.write_lval(ast, *path, Value::Enumeration(items))
                    }
                    other => Err(SwarmError::runtime(
                        ast.pos(*path).clone(),
                        format!("cannot index a {}", other.type_name()),
                    )),
                }
            }
            NodeKind::EnumerableAppend { path } => {
                let container = self.eval(ast, *path)?;
                match container {
                    Value::Enumeration(mut items) => {
                        items.push(value);
                        self.write_lval(ast, *path, Value::Enumeration(items))
                    }
                    other => Err(SwarmError::runtime(
                        ast.pos(*path).clone(),
                        format!("cannot append to a {}", other.type_name()),
                    )),
                }
            }
            NodeKind::MapAccess { path, end } => {
                let key = ast.identifier_name(*end).to_string();
                let container = self.eval(ast, *path)?;
                match container {
                    Value::Map(mut entries) => {
                        Value::map_set(&mut entries, &key, value);
                        self.write_lval(ast, *path, Value::Map(entries))
                    }
                    other => Err(SwarmError::runtime(
                        ast.pos(*path).clone(),
                        format!("cannot key into a {}", other.type_name()),
                    )),
                }
            }
            NodeKind::ClassAccess { path, end } => {
                let member = ast.identifier_name(*end).to_string();
                let container = self.eval(ast, *path)?;
                match container {
                    Value::Object(mut object) => {
                        object.set_property(&member, value);
                        self.write_lval(ast, *path, Value::Object(object))
                    }
                    other => Err(SwarmError::runtime(
                        ast.pos(*path).clone(),
                        format!("cannot access a member of a {}", other.type_name()),
                    )),
                }
            }
            other => Err(SwarmError::runtime(
                ast.pos(lval).clone(),
                format!("{:?} is not assignable", other.tag()),
            )),
        }
    }

    // ─── calls ──────────────────────────────────────────────────────

    fn call_value(
        &mut self,
        pos: &Position,
        callee: Value,
        args: Vec<Value>,
    ) -> Result<Value, SwarmError> {
        match callee {
            Value::Host(name) => self.call_prologue(&name, pos, args),
            Value::Lambda(mut lambda) => {
                lambda.applied.extend(args);
                let formals = match lambda.ast.kind(lambda.node) {
                    NodeKind::Function { formals, .. } => formals.len(),
                    _ => {
                        return Err(SwarmError::runtime(
                            pos.clone(),
                            "function value does not hold a function node",
                        ))
                    }
                };
                if lambda.applied.len() < formals {
                    // Partial application stays a value.
                    Ok(Value::Lambda(lambda))
                } else if lambda.applied.len() == formals {
                    self.invoke_lambda(&lambda)
                } else {
                    Err(SwarmError::runtime(
                        pos.clone(),
                        format!(
                            "too many arguments: {} applied to a function of {formals}",
                            lambda.applied.len()
                        ),
                    ))
                }
            }
            Value::TypeDef(def) => self.construct(&def, args, pos),
            other => Err(SwarmError::runtime(
                pos.clone(),
                format!("cannot call a {}", other.type_name()),
            )),
        }
    }

    fn call_prologue(
        &mut self,
        name: &str,
        pos: &Position,
        args: Vec<Value>,
    ) -> Result<Value, SwarmError> {
        let (handler, arity) = match self.prologue.get(name) {
            Some(entry) => (entry.handler, entry.arity),
            None => {
                return Err(SwarmError::runtime(
                    pos.clone(),
                    format!("unknown builtin `{name}`"),
                ))
            }
        };
        if args.len() != arity {
            return Err(SwarmError::runtime(
                pos.clone(),
                format!("`{name}` takes {arity} arguments, got {}", args.len()),
            ));
        }
        handler(self, pos, args)
    }

    /// Full application: a fresh local store seeded with the captured
    /// environment and the parameters, then the body runs to its `return`.
    fn invoke_lambda(&mut self, lambda: &LambdaValue) -> Result<Value, SwarmError> {
        let ast = &*lambda.ast;
        let NodeKind::Function { formals, body, .. } = ast.kind(lambda.node) else {
            return Err(SwarmError::runtime(
                ast.pos(lambda.node).clone(),
                "function value does not hold a function node",
            ));
        };

        let mut frame = LocalSymbolValueStore::new();
        for (symbol, value) in &lambda.captured {
            frame.set(symbol, value.clone())?;
        }
        for (formal, value) in formals.iter().zip(&lambda.applied) {
            let symbol = self.bound_symbol(ast, formal.id)?;
            frame.set(&symbol, value.clone())?;
        }

        let saved = std::mem::replace(&mut self.locals, frame);
        let result = (|| {
            for &stmt in body {
                match self.exec(ast, stmt)? {
                    Flow::Return(value) => return Ok(value),
                    _ => {}
                }
            }
            Ok(Value::Unit)
        })();
        self.locals = saved;
        result
    }

    /// Instantiates an object: parent constructors and property defaults
    /// evaluate in the caller's environment, then the chosen constructor
    /// body runs in a fresh frame seeded with the property symbols.
    fn construct(
        &mut self,
        def: &TypeDefValue,
        args: Vec<Value>,
        pos: &Position,
    ) -> Result<Value, SwarmError> {
        let ast = &*def.ast;
        let NodeKind::TypeBody {
            declarations,
            constructors,
            ..
        } = ast.kind(def.node)
        else {
            return Err(SwarmError::runtime(
                pos.clone(),
                "type value does not hold a type body",
            ));
        };

        let chosen = constructors
            .iter()
            .copied()
            .find(|&ctor| match ast.kind(ctor) {
                NodeKind::Constructor { func, .. } => match ast.kind(*func) {
                    NodeKind::Function { formals, .. } => formals.len() == args.len(),
                    _ => false,
                },
                _ => false,
            })
            .ok_or_else(|| {
                SwarmError::runtime(
                    pos.clone(),
                    format!(
                        "no constructor of `{}` takes {} arguments",
                        def.ty.name,
                        args.len()
                    ),
                )
            })?;
        let NodeKind::Constructor {
            func,
            parent_constructors,
            ..
        } = ast.kind(chosen)
        else {
            unreachable!("chosen node is a constructor");
        };

        // Parent properties first, in declaration order.
        let mut properties: Vec<(String, Value)> = Vec::new();
        for &parent_call in parent_constructors {
            match self.eval(ast, parent_call)? {
                Value::Object(parent) => {
                    for (name, value) in parent.properties {
                        match properties.iter_mut().find(|(n, _)| *n == name) {
                            Some(slot) => slot.1 = value,
                            None => properties.push((name, value)),
                        }
                    }
                }
                other => {
                    return Err(SwarmError::runtime(
                        ast.pos(parent_call).clone(),
                        format!(
                            "parent constructor produced a {}, not an object",
                            other.type_name()
                        ),
                    ))
                }
            }
        }

        // Own property defaults, evaluated in the caller's environment.
        let mut own: Vec<(Symbol, Value)> = Vec::new();
        for &decl in declarations {
            if let NodeKind::VariableDeclaration { id, value, .. } = ast.kind(decl) {
                let symbol = self.bound_symbol(ast, *id)?;
                let default = self.eval(ast, *value)?;
                own.push((symbol, default));
            }
        }

        // Run the constructor body in a fresh frame holding the properties.
        let NodeKind::Function { formals, body, .. } = ast.kind(*func) else {
            return Err(SwarmError::runtime(
                pos.clone(),
                "constructor does not hold a function node",
            ));
        };
        let mut frame = LocalSymbolValueStore::new();
        for (symbol, value) in &own {
            frame.set(symbol, value.clone())?;
        }
        for (formal, value) in formals.iter().zip(&args) {
            let symbol = self.bound_symbol(ast, formal.id)?;
            frame.set(&symbol, value.clone())?;
        }

        let saved = std::mem::replace(&mut self.locals, frame);
        let executed = (|| {
            for &stmt in body {
                if let Flow::Return(_) = self.exec(ast, stmt)? {
                    break;
                }
            }
            Ok(())
        })();

        // Collect the (possibly reassigned) property values back out.
        let mut collected = Vec::with_capacity(own.len());
        for (symbol, default) in &own {
            let value = self.locals.try_get(symbol)?.unwrap_or_else(|| default.clone());
            collected.push((symbol.name.clone(), value));
        }
        self.locals = saved;
        executed?;

        for (name, value) in collected {
            match properties.iter_mut().find(|(n, _)| *n == name) {
                Some(slot) => slot.1 = value,
                None => properties.push((name, value)),
            }
        }

        Ok(Value::Object(ObjectValue {
            ty: def.ty.clone(),
            properties,
        }))
    }

    // ─── resources ──────────────────────────────────────────────────

    fn open_resource(
        &mut self,
        resource: &Resource,
        pos: &Position,
    ) -> Result<Value, SwarmError> {
        match resource {
            Resource::FileContents { path } => {
                let contents = match std::fs::read_to_string(path) {
                    Ok(contents) => contents,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
                    Err(e) => {
                        return Err(SwarmError::runtime(
                            pos.clone(),
                            format!("cannot open `{path}`: {e}"),
                        ))
                    }
                };
                Ok(Value::Str(contents))
            }
        }
    }

    /// Writes the bound local's final value back to the resource.
    fn close_resource(
        &mut self,
        resource: &Resource,
        local: &Symbol,
        pos: &Position,
    ) -> Result<(), SwarmError> {
        match resource {
            Resource::FileContents { path } => {
                if let Some(Value::Str(contents)) = self.locals.try_get(local)? {
                    std::fs::write(path, contents).map_err(|e| {
                        SwarmError::runtime(pos.clone(), format!("cannot write `{path}`: {e}"))
                    })?;
                }
                Ok(())
            }
        }
    }
}
