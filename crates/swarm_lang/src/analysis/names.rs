//! Name analysis: scope management and identifier binding.
//!
//! A single traversal. Scopes open at blocks, function bodies, type bodies
//! and loop headers; identifiers resolve against the scope chain and are
//! bound to their symbols in place. Declarations register symbols with the
//! `shared` flag taken from the declaration syntax; the induction variable
//! of an `enumerate`/`with` takes the flag on the loop header.
//!
//! The pass also computes, for every function literal, the set of captured
//! free variables (used in the body, declared outside it) and records it on
//! the node for closure construction.
//!
//! Map keys and class member names are deliberately not resolved here: they
//! are bare identifiers whose meaning comes from the aggregate type.

use std::collections::{HashMap, HashSet};

use swarm_base::{NameErrorKind, Position, SwarmError};
use tracing::debug;

use crate::ast::{Ast, NodeId, NodeKind};
use crate::scope::ScopeStack;
use crate::symbol::{Symbol, SymbolId};
use crate::types::{Intrinsic, ObjectType, Type};

/// Facts produced by name analysis that later stages need.
#[derive(Debug, Default)]
pub struct NameInfo {
    /// For symbols declared from a type literal or type body: the type the
    /// symbol denotes. Used to resolve constructor calls and parent clauses.
    pub type_bindings: HashMap<String, Type>,
    /// Constructor signatures per object-type id, in declaration order.
    pub constructor_types: HashMap<String, Vec<Type>>,
}

struct FunctionFrame {
    declared: HashSet<SymbolId>,
    /// First-use order, deduplicated; keeps captured lists deterministic.
    used: Vec<SymbolId>,
}

pub struct NameAnalysis {
    scopes: ScopeStack,
    frames: Vec<FunctionFrame>,
    info: NameInfo,
    diagnostics: Vec<SwarmError>,
}

impl NameAnalysis {
    /// Resolves every identifier under `root`. `bindings` are pre-existing
    /// symbols (the prologue) installed into the outermost scope.
    pub fn run(
        ast: &mut Ast,
        root: NodeId,
        bindings: &[Symbol],
    ) -> Result<NameInfo, Vec<SwarmError>> {
        let mut pass = NameAnalysis {
            scopes: ScopeStack::new(),
            frames: vec![FunctionFrame {
                declared: HashSet::new(),
                used: Vec::new(),
            }],
            info: NameInfo::default(),
            diagnostics: Vec::new(),
        };

        pass.scopes.enter_scope();
        for binding in bindings {
            let id = ast.symbols.intern(binding.clone());
            // Prologue names shadowing each other is a setup bug, not a user
            // diagnostic.
            let _ = pass.scopes.declare(&binding.name, id);
        }

        pass.walk_stmt(ast, root);
        pass.scopes.leave_scope();

        debug!(symbols = ast.symbols.len(), "name analysis complete");
        if pass.diagnostics.is_empty() {
            Ok(pass.info)
        } else {
            Err(pass.diagnostics)
        }
    }

    fn error(&mut self, position: Position, kind: NameErrorKind, message: impl Into<String>) {
        self.diagnostics.push(SwarmError::Name {
            position,
            kind,
            message: message.into(),
        });
    }

    fn mark_used(&mut self, symbol: SymbolId) {
        let frame = self.frames.last_mut().expect("no open function frame");
        if !frame.used.contains(&symbol) {
            frame.used.push(symbol);
        }
    }

    fn declare_symbol(&mut self, ast: &mut Ast, id_node: NodeId, symbol: Symbol) -> SymbolId {
        let name = symbol.name.clone();
        let pos = ast.pos(id_node).clone();
        let sym_id = ast.symbols.intern(symbol);
        if self.scopes.declare(&name, sym_id).is_err() {
            self.error(pos, NameErrorKind::Redeclaration, name.clone());
        }
        self.frames
            .last_mut()
            .expect("no open function frame")
            .declared
            .insert(sym_id);
        ast.bind_identifier(id_node, sym_id);
        sym_id
    }

    /// Reads and statically disambiguates the type carried by a type-literal
    /// node, rewriting the node in place. Errors degrade to `ERROR` so the
    /// pass can continue.
    fn literal_type(&mut self, ast: &mut Ast, type_node: NodeId) -> Type {
        let (pos, ty) = match ast.kind(type_node) {
            NodeKind::TypeLiteral { value } => (ast.pos(type_node).clone(), value.clone()),
            NodeKind::TypeBody { value, .. } => {
                return value.clone().unwrap_or(Type::ERROR);
            }
            _ => return Type::ERROR,
        };
        match ty.disambiguate_statically() {
            Ok(concrete) => {
                if let NodeKind::TypeLiteral { value } = ast.kind_mut(type_node) {
                    *value = concrete.clone();
                }
                concrete
            }
            Err(message) => {
                self.diagnostics
                    .push(SwarmError::TypeAmbiguous { position: pos, message });
                Type::ERROR
            }
        }
    }

    fn walk_body(&mut self, ast: &mut Ast, body: &[NodeId]) {
        for &stmt in body {
            self.walk_stmt(ast, stmt);
        }
    }

    fn walk_stmt(&mut self, ast: &mut Ast, node: NodeId) {
        match ast.kind(node).clone() {
            NodeKind::Program { body } => self.walk_body(ast, &body),
            NodeKind::ExpressionStatement { expression } => self.walk_expr(ast, expression),
            NodeKind::VariableDeclaration {
                type_node,
                id,
                value,
                shared,
            } => {
                // The initializer is resolved before the name exists, so
                // `number x = x;` is an undeclared use.
                self.walk_expr(ast, value);
                let declared = self.literal_type(ast, type_node);

                if shared && declared.intrinsic() == Intrinsic::Lambda {
                    self.error(
                        ast.pos(node).clone(),
                        NameErrorKind::SharedViolation,
                        format!("function `{}` cannot be shared", ast.identifier_name(id)),
                    );
                }

                let symbol = Symbol::declared(
                    ast.identifier_name(id).to_string(),
                    declared,
                    ast.pos(id).clone(),
                    shared,
                );
                let uuid = symbol.uuid.clone();
                let name = symbol.name.clone();
                self.declare_symbol(ast, id, symbol);

                // Type declarations feed constructor-call resolution.
                let denoted = match ast.kind(value) {
                    NodeKind::TypeBody { value: Some(ty), .. } => Some((ty.clone(), true)),
                    NodeKind::TypeLiteral { value: ty } => Some((ty.clone(), false)),
                    _ => None,
                };
                if let Some((mut ty, from_body)) = denoted {
                    if from_body {
                        if let Type::Object(obj) = &mut ty {
                            if obj.name.is_empty() {
                                obj.name = name;
                            }
                        }
                        if let NodeKind::TypeBody { value: slot, .. } = ast.kind_mut(value) {
                            *slot = Some(ty.clone());
                        }
                    }
                    self.info.type_bindings.insert(uuid, ty);
                }
            }
            NodeKind::UninitializedVariableDeclaration { type_node, id } => {
                let declared = self.literal_type(ast, type_node);
                let symbol = Symbol::declared(
                    ast.identifier_name(id).to_string(),
                    declared,
                    ast.pos(id).clone(),
                    false,
                );
                self.declare_symbol(ast, id, symbol);
            }
            NodeKind::Use { ids } => {
                for id in ids {
                    self.resolve_identifier(ast, id);
                }
            }
            NodeKind::Include { path, .. } => self.walk_expr(ast, path),
            NodeKind::Return { value } => {
                if let Some(value) = value {
                    self.walk_expr(ast, value);
                }
            }
            NodeKind::Constructor {
                func,
                parent_constructors,
                ..
            } => {
                self.walk_expr(ast, func);
                for parent in parent_constructors {
                    self.walk_expr(ast, parent);
                }
            }
            NodeKind::Enumerate {
                enumerable,
                local,
                index,
                shared,
                body,
            } => {
                self.walk_expr(ast, enumerable);
                self.scopes.enter_scope();
                let symbol = Symbol::declared(
                    ast.identifier_name(local).to_string(),
                    Type::ERROR, // element type is filled in by type analysis
                    ast.pos(local).clone(),
                    shared,
                );
                self.declare_symbol(ast, local, symbol);
                if let Some(index) = index {
                    let symbol = Symbol::declared(
                        ast.identifier_name(index).to_string(),
                        Type::NUMBER,
                        ast.pos(index).clone(),
                        shared,
                    );
                    self.declare_symbol(ast, index, symbol);
                }
                self.walk_body(ast, &body);
                self.scopes.leave_scope();
            }
            NodeKind::With {
                resource,
                local,
                shared,
                body,
            } => {
                self.walk_expr(ast, resource);
                self.scopes.enter_scope();
                let symbol = Symbol::declared(
                    ast.identifier_name(local).to_string(),
                    Type::ERROR, // refined to the resource's value type later
                    ast.pos(local).clone(),
                    shared,
                );
                self.declare_symbol(ast, local, symbol);
                self.walk_body(ast, &body);
                self.scopes.leave_scope();
            }
            NodeKind::If { condition, body } | NodeKind::While { condition, body } => {
                self.walk_expr(ast, condition);
                self.scopes.enter_scope();
                self.walk_body(ast, &body);
                self.scopes.leave_scope();
            }
            NodeKind::Continue | NodeKind::Break => {}
            // Statement expressions appearing bare.
            _ => self.walk_expr(ast, node),
        }
    }

    fn resolve_identifier(&mut self, ast: &mut Ast, node: NodeId) {
        let name = ast.identifier_name(node).to_string();
        match self.scopes.lookup(&name) {
            Some(symbol) => {
                ast.bind_identifier(node, symbol);
                self.mark_used(symbol);
            }
            None => {
                self.error(ast.pos(node).clone(), NameErrorKind::Undeclared, name);
            }
        }
    }

    fn walk_expr(&mut self, ast: &mut Ast, node: NodeId) {
        match ast.kind(node).clone() {
            NodeKind::Identifier { .. } => self.resolve_identifier(ast, node),
            NodeKind::EnumerableAccess { path, index } => {
                self.walk_expr(ast, path);
                self.walk_expr(ast, index);
            }
            NodeKind::EnumerableAppend { path } => self.walk_expr(ast, path),
            // The trailing identifier is a bare key or member name; only the
            // path resolves against scope.
            NodeKind::MapAccess { path, .. } | NodeKind::ClassAccess { path, .. } => {
                self.walk_expr(ast, path)
            }
            NodeKind::TypeLiteral { .. } => {
                self.literal_type(ast, node);
            }
            NodeKind::BooleanLiteral { .. }
            | NodeKind::StringLiteral { .. }
            | NodeKind::NumberLiteral { .. }
            | NodeKind::UnitLiteral => {}
            NodeKind::EnumerationLiteral { actuals, ty } => {
                for actual in actuals {
                    self.walk_expr(ast, actual);
                }
                if let Some(ty) = ty {
                    self.disambiguate_slot(ast, node, ty);
                }
            }
            NodeKind::MapLiteral { body, ty } => {
                for stmt in body {
                    if let NodeKind::MapStatement { value, .. } = ast.kind(stmt) {
                        self.walk_expr(ast, *value);
                    }
                }
                if let Some(ty) = ty {
                    self.disambiguate_slot(ast, node, ty);
                }
            }
            NodeKind::MapStatement { value, .. } => self.walk_expr(ast, value),
            NodeKind::Assign { dest, value } => {
                self.walk_expr(ast, value);
                self.walk_expr(ast, dest);
            }
            NodeKind::Function {
                type_node,
                formals,
                body,
                ..
            } => {
                self.literal_type(ast, type_node);

                self.frames.push(FunctionFrame {
                    declared: HashSet::new(),
                    used: Vec::new(),
                });
                self.scopes.enter_scope();

                for formal in &formals {
                    let ty = self.literal_type(ast, formal.type_node);
                    let symbol = Symbol::declared(
                        ast.identifier_name(formal.id).to_string(),
                        ty,
                        ast.pos(formal.id).clone(),
                        false,
                    );
                    self.declare_symbol(ast, formal.id, symbol);
                }
                self.walk_body(ast, &body);

                self.scopes.leave_scope();
                let frame = self.frames.pop().expect("function frame underflow");
                let captured: Vec<SymbolId> = frame
                    .used
                    .iter()
                    .copied()
                    .filter(|s| !frame.declared.contains(s))
                    .filter(|s| !ast.symbols.get(*s).is_prologue)
                    .collect();
                for &symbol in &captured {
                    self.mark_used(symbol);
                }
                if let NodeKind::Function { captured: slot, .. } = ast.kind_mut(node) {
                    *slot = captured;
                }
            }
            NodeKind::TypeBody {
                declarations,
                parents,
                constructors,
                ..
            } => {
                let mut parent_ty: Option<ObjectType> = None;
                for parent in &parents {
                    if let NodeKind::Use { ids } = ast.kind(*parent).clone() {
                        for id in ids {
                            self.resolve_identifier(ast, id);
                            if let Some(sym) = ast.identifier_symbol(id) {
                                let uuid = &ast.symbols.get(sym).uuid;
                                match self.info.type_bindings.get(uuid) {
                                    Some(Type::Object(obj)) => parent_ty = Some(obj.clone()),
                                    _ => self.diagnostics.push(SwarmError::TypeMismatch {
                                        position: ast.pos(id).clone(),
                                        message: format!(
                                            "`{}` does not name an object type",
                                            ast.identifier_name(id)
                                        ),
                                    }),
                                }
                            }
                        }
                    }
                }

                self.scopes.enter_scope();
                self.walk_body(ast, &declarations);
                for &ctor in &constructors {
                    self.walk_stmt(ast, ctor);
                }
                self.scopes.leave_scope();

                let mut properties = Vec::new();
                for &decl in &declarations {
                    let id = match ast.kind(decl) {
                        NodeKind::VariableDeclaration { id, .. }
                        | NodeKind::UninitializedVariableDeclaration { id, .. } => *id,
                        _ => continue,
                    };
                    if let Some(sym) = ast.identifier_symbol(id) {
                        let sym = ast.symbols.get(sym);
                        properties.push((sym.name.clone(), sym.ty.clone()));
                    }
                }

                let object = ObjectType {
                    id: swarm_base::uuid4(),
                    name: String::new(), // patched by the enclosing declaration
                    properties,
                    parent: parent_ty.map(Box::new),
                };

                let mut ctor_types = Vec::new();
                for &ctor in &constructors {
                    if let NodeKind::Constructor { func, .. } = ast.kind(ctor) {
                        if let NodeKind::Function { type_node, .. } = ast.kind(*func) {
                            if let NodeKind::TypeLiteral { value } = ast.kind(*type_node) {
                                ctor_types.push(value.clone());
                            }
                        }
                    }
                }
                self.info
                    .constructor_types
                    .insert(object.id.clone(), ctor_types);

                if let NodeKind::TypeBody { value, .. } = ast.kind_mut(node) {
                    *value = Some(Type::Object(object));
                }
            }
            NodeKind::Call { func, args, .. } => {
                self.walk_expr(ast, func);
                for arg in args {
                    self.walk_expr(ast, arg);
                }
            }
            NodeKind::DeferCall { call } => self.walk_expr(ast, call),
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
                self.walk_expr(ast, left);
                self.walk_expr(ast, right);
            }
            NodeKind::Negative { exp } | NodeKind::Not { exp } => self.walk_expr(ast, exp),
            // Statements reached through expression positions (e.g. blocks
            // inside constructors) fall back to the statement walk.
            _ => self.walk_stmt(ast, node),
        }
    }

    fn disambiguate_slot(&mut self, ast: &mut Ast, node: NodeId, ty: Type) {
        match ty.disambiguate_statically() {
            Ok(concrete) => match ast.kind_mut(node) {
                NodeKind::EnumerationLiteral { ty, .. } | NodeKind::MapLiteral { ty, .. } => {
                    *ty = Some(concrete)
                }
                _ => {}
            },
            Err(message) => self.diagnostics.push(SwarmError::TypeAmbiguous {
                position: ast.pos(node).clone(),
                message,
            }),
        }
    }
}
