//! Type analysis: post-order typing and validation of the resolved AST.
//!
//! Expressions are typed strictly bottom-up. Most nodes derive their type
//! from their children or their bound symbol and nothing is stored; the
//! exceptions are calls (result type), collection literals (element type)
//! and `+` (the concatenation flag), which are written back onto the node so
//! a deserialized tree interprets identically on a remote worker.
//!
//! Errors are collected with their positions and reported together;
//! recovery substitutes `ERROR`, which downstream checks treat as
//! already-reported and stay quiet about.

use swarm_base::{Position, SwarmError};
use tracing::debug;

use crate::analysis::names::NameInfo;
use crate::ast::{Ast, NodeId, NodeKind};
use crate::types::Type;

pub struct TypeAnalysis<'a> {
    info: &'a NameInfo,
    diagnostics: Vec<SwarmError>,
    /// Declared return types of the enclosing function literals.
    return_types: Vec<Type>,
}

impl<'a> TypeAnalysis<'a> {
    pub fn run(ast: &mut Ast, root: NodeId, info: &'a NameInfo) -> Result<(), Vec<SwarmError>> {
        let mut pass = TypeAnalysis {
            info,
            diagnostics: Vec::new(),
            return_types: Vec::new(),
        };
        pass.stmt(ast, root);
        debug!(errors = pass.diagnostics.len(), "type analysis complete");
        if pass.diagnostics.is_empty() {
            Ok(())
        } else {
            Err(pass.diagnostics)
        }
    }

    fn mismatch(&mut self, position: Position, message: impl Into<String>) -> Type {
        self.diagnostics.push(SwarmError::TypeMismatch {
            position,
            message: message.into(),
        });
        Type::ERROR
    }

    /// Checks `actual` against `expected`, staying quiet when the operand
    /// already failed to type.
    fn require(&mut self, ast: &Ast, node: NodeId, actual: &Type, expected: &Type, what: &str) {
        if *actual == Type::ERROR || *actual == *expected {
            return;
        }
        self.mismatch(
            ast.pos(node).clone(),
            format!("{what} must be {expected}, found {actual}"),
        );
    }

    fn body(&mut self, ast: &mut Ast, body: &[NodeId]) {
        for &stmt in body {
            self.stmt(ast, stmt);
        }
    }

    fn stmt(&mut self, ast: &mut Ast, node: NodeId) {
        match ast.kind(node).clone() {
            NodeKind::Program { body } => self.body(ast, &body),
            NodeKind::ExpressionStatement { expression } => {
                self.expr(ast, expression);
            }
            NodeKind::VariableDeclaration { id, value, .. } => {
                let value_ty = self.expr(ast, value);
                let declared = ast
                    .identifier_symbol(id)
                    .map(|s| ast.symbols.get(s).ty.clone())
                    .unwrap_or(Type::ERROR);
                if declared != Type::ERROR
                    && value_ty != Type::ERROR
                    && !value_ty.is_assignable_to(&declared)
                {
                    self.mismatch(
                        ast.pos(node).clone(),
                        format!(
                            "cannot initialize `{}`: {} is not assignable to {}",
                            ast.identifier_name(id),
                            value_ty,
                            declared
                        ),
                    );
                }
            }
            NodeKind::UninitializedVariableDeclaration { .. }
            | NodeKind::Use { .. }
            | NodeKind::Continue
            | NodeKind::Break => {}
            NodeKind::Include { path, .. } => {
                self.expr(ast, path);
            }
            NodeKind::Return { value } => {
                let value_ty = match value {
                    Some(v) => self.expr(ast, v),
                    None => Type::VOID,
                };
                if let Some(expected) = self.return_types.last().cloned() {
                    if value_ty != Type::ERROR && !value_ty.is_assignable_to(&expected) {
                        self.mismatch(
                            ast.pos(node).clone(),
                            format!("return type {value_ty} does not match declared {expected}"),
                        );
                    }
                }
            }
            NodeKind::Constructor { func, parent_constructors, .. } => {
                self.expr(ast, func);
                for parent in parent_constructors {
                    self.expr(ast, parent);
                }
            }
            NodeKind::Enumerate {
                enumerable,
                local,
                body,
                ..
            } => {
                let enum_ty = self.expr(ast, enumerable);
                match enum_ty {
                    Type::Enumerable(element) => {
                        if let Some(sym) = ast.identifier_symbol(local) {
                            ast.symbols.get_mut(sym).ty = (*element).clone();
                        }
                    }
                    Type::Primitive(crate::types::Primitive::Error) => {}
                    other => {
                        self.mismatch(
                            ast.pos(enumerable).clone(),
                            format!("enumerate target must be enumerable, found {other}"),
                        );
                    }
                }
                self.body(ast, &body);
            }
            NodeKind::With {
                resource,
                local,
                body,
                ..
            } => {
                let resource_ty = self.expr(ast, resource);
                if let Some(sym) = ast.identifier_symbol(local) {
                    ast.symbols.get_mut(sym).ty = resource_ty;
                }
                self.body(ast, &body);
            }
            NodeKind::If { condition, body } | NodeKind::While { condition, body } => {
                let cond_ty = self.expr(ast, condition);
                self.require(ast, condition, &cond_ty, &Type::BOOLEAN, "condition");
                self.body(ast, &body);
            }
            _ => {
                self.expr(ast, node);
            }
        }
    }

    fn binary_numeric(&mut self, ast: &mut Ast, left: NodeId, right: NodeId, result: Type) -> Type {
        let lt = self.expr(ast, left);
        let rt = self.expr(ast, right);
        self.require(ast, left, &lt, &Type::NUMBER, "operand");
        self.require(ast, right, &rt, &Type::NUMBER, "operand");
        result
    }

    fn binary_boolean(&mut self, ast: &mut Ast, left: NodeId, right: NodeId) -> Type {
        let lt = self.expr(ast, left);
        let rt = self.expr(ast, right);
        self.require(ast, left, &lt, &Type::BOOLEAN, "operand");
        self.require(ast, right, &rt, &Type::BOOLEAN, "operand");
        Type::BOOLEAN
    }

    fn equality(&mut self, ast: &mut Ast, node: NodeId, left: NodeId, right: NodeId) -> Type {
        let lt = self.expr(ast, left);
        let rt = self.expr(ast, right);
        if lt != Type::ERROR && rt != Type::ERROR && lt != rt {
            self.mismatch(
                ast.pos(node).clone(),
                format!("cannot compare {lt} with {rt}"),
            );
        }
        Type::BOOLEAN
    }

    fn expr(&mut self, ast: &mut Ast, node: NodeId) -> Type {
        match ast.kind(node).clone() {
            NodeKind::Identifier { symbol, .. } => symbol
                .map(|s| ast.symbols.get(s).ty.clone())
                .unwrap_or(Type::ERROR),
            NodeKind::TypeLiteral { .. } | NodeKind::TypeBody { .. } => {
                if let NodeKind::TypeBody {
                    declarations,
                    constructors,
                    ..
                } = ast.kind(node).clone()
                {
                    self.body(ast, &declarations);
                    for ctor in constructors {
                        self.stmt(ast, ctor);
                    }
                }
                Type::TYPE
            }
            NodeKind::BooleanLiteral { .. } => Type::BOOLEAN,
            NodeKind::StringLiteral { .. } => Type::STRING,
            NodeKind::NumberLiteral { .. } => Type::NUMBER,
            NodeKind::UnitLiteral => Type::UNIT,
            NodeKind::EnumerationLiteral { actuals, ty } => {
                let mut element = ty;
                for &actual in &actuals {
                    let at = self.expr(ast, actual);
                    match &element {
                        Some(expected) => {
                            if at != Type::ERROR && !at.is_assignable_to(expected) {
                                self.mismatch(
                                    ast.pos(actual).clone(),
                                    format!("enumeration of {expected} cannot hold {at}"),
                                );
                            }
                        }
                        None => element = Some(at),
                    }
                }
                match element {
                    Some(element) => {
                        if let NodeKind::EnumerationLiteral { ty, .. } = ast.kind_mut(node) {
                            *ty = Some(element.clone());
                        }
                        Type::enumerable(element)
                    }
                    None => self.mismatch(
                        ast.pos(node).clone(),
                        "cannot infer the element type of an empty enumeration",
                    ),
                }
            }
            NodeKind::MapLiteral { body, ty } => {
                let mut element = ty;
                for &stmt in &body {
                    if let NodeKind::MapStatement { value, .. } = ast.kind(stmt).clone() {
                        let vt = self.expr(ast, value);
                        match &element {
                            Some(expected) => {
                                if vt != Type::ERROR && !vt.is_assignable_to(expected) {
                                    self.mismatch(
                                        ast.pos(value).clone(),
                                        format!("map of {expected} cannot hold {vt}"),
                                    );
                                }
                            }
                            None => element = Some(vt),
                        }
                    }
                }
                match element {
                    Some(element) => {
                        if let NodeKind::MapLiteral { ty, .. } = ast.kind_mut(node) {
                            *ty = Some(element.clone());
                        }
                        Type::map(element)
                    }
                    None => self.mismatch(
                        ast.pos(node).clone(),
                        "cannot infer the value type of an empty map",
                    ),
                }
            }
            NodeKind::MapStatement { value, .. } => self.expr(ast, value),
            NodeKind::Assign { dest, value } => {
                let value_ty = self.expr(ast, value);
                let dest_ty = self.expr(ast, dest);
                if dest_ty != Type::ERROR
                    && value_ty != Type::ERROR
                    && !value_ty.is_assignable_to(&dest_ty)
                {
                    self.mismatch(
                        ast.pos(node).clone(),
                        format!("{value_ty} is not assignable to {dest_ty}"),
                    );
                }
                value_ty
            }
            NodeKind::EnumerableAccess { path, index } => {
                let index_ty = self.expr(ast, index);
                self.require(ast, index, &index_ty, &Type::NUMBER, "index");
                match self.expr(ast, path) {
                    Type::Enumerable(element) => *element,
                    Type::Primitive(crate::types::Primitive::Error) => Type::ERROR,
                    other => self.mismatch(
                        ast.pos(path).clone(),
                        format!("indexed access needs an enumerable, found {other}"),
                    ),
                }
            }
            NodeKind::EnumerableAppend { path } => match self.expr(ast, path) {
                Type::Enumerable(element) => *element,
                Type::Primitive(crate::types::Primitive::Error) => Type::ERROR,
                other => self.mismatch(
                    ast.pos(path).clone(),
                    format!("append needs an enumerable, found {other}"),
                ),
            },
            NodeKind::MapAccess { path, .. } => match self.expr(ast, path) {
                Type::Map(element) => *element,
                Type::Primitive(crate::types::Primitive::Error) => Type::ERROR,
                other => self.mismatch(
                    ast.pos(path).clone(),
                    format!("keyed access needs a map, found {other}"),
                ),
            },
            NodeKind::ClassAccess { path, end } => {
                let member = ast.identifier_name(end).to_string();
                match self.expr(ast, path) {
                    Type::Object(object) => match object.property(&member) {
                        Some(ty) => ty.clone(),
                        None => self.mismatch(
                            ast.pos(end).clone(),
                            format!("`{}` has no property `{member}`", object.name),
                        ),
                    },
                    Type::Primitive(crate::types::Primitive::Error) => Type::ERROR,
                    other => self.mismatch(
                        ast.pos(path).clone(),
                        format!("member access needs an object, found {other}"),
                    ),
                }
            }
            NodeKind::Call { func, args, .. } => {
                let func_ty = self.expr(ast, func);
                let result = match func_ty {
                    Type::Lambda { .. } => self.apply(ast, node, func_ty, &args),
                    Type::Primitive(crate::types::Primitive::Type) => {
                        self.constructor_call(ast, node, func, &args)
                    }
                    Type::Primitive(crate::types::Primitive::Error) => Type::ERROR,
                    other => self.mismatch(
                        ast.pos(func).clone(),
                        format!("cannot call a value of type {other}"),
                    ),
                };
                if let NodeKind::Call { ty, .. } = ast.kind_mut(node) {
                    *ty = Some(result.clone());
                }
                result
            }
            NodeKind::DeferCall { call } => self.expr(ast, call),
            NodeKind::Function {
                type_node,
                formals,
                body,
                ..
            } => {
                let lambda = match ast.kind(type_node) {
                    NodeKind::TypeLiteral { value } => value.clone(),
                    _ => Type::ERROR,
                };

                // Peel one parameter per formal to find the declared return.
                let mut ret = lambda.clone();
                if formals.is_empty() {
                    if let Type::Lambda { ret: r, .. } = ret {
                        ret = *r;
                    }
                } else {
                    for _ in &formals {
                        match ret {
                            Type::Lambda { ret: r, .. } => ret = *r,
                            _ => break,
                        }
                    }
                }

                self.return_types.push(ret);
                self.body(ast, &body);
                self.return_types.pop();
                lambda
            }
            NodeKind::And { left, right } | NodeKind::Or { left, right } => {
                self.binary_boolean(ast, left, right)
            }
            NodeKind::Not { exp } => {
                let ty = self.expr(ast, exp);
                self.require(ast, exp, &ty, &Type::BOOLEAN, "operand");
                Type::BOOLEAN
            }
            NodeKind::Equals { left, right } | NodeKind::NotEquals { left, right } => {
                self.equality(ast, node, left, right)
            }
            NodeKind::NumericComparison { left, right, .. } => {
                self.binary_numeric(ast, left, right, Type::BOOLEAN)
            }
            NodeKind::Add { left, right, .. } => {
                let lt = self.expr(ast, left);
                let rt = self.expr(ast, right);
                if lt == Type::STRING && rt == Type::STRING {
                    if let NodeKind::Add { concatenation, .. } = ast.kind_mut(node) {
                        *concatenation = true;
                    }
                    Type::STRING
                } else {
                    self.require(ast, left, &lt, &Type::NUMBER, "operand");
                    self.require(ast, right, &rt, &Type::NUMBER, "operand");
                    Type::NUMBER
                }
            }
            NodeKind::Subtract { left, right }
            | NodeKind::Multiply { left, right }
            | NodeKind::Divide { left, right }
            | NodeKind::Modulus { left, right }
            | NodeKind::Power { left, right }
            | NodeKind::NthRoot { left, right } => {
                self.binary_numeric(ast, left, right, Type::NUMBER)
            }
            NodeKind::Negative { exp } => {
                let ty = self.expr(ast, exp);
                self.require(ast, exp, &ty, &Type::NUMBER, "operand");
                Type::NUMBER
            }
            other => {
                // Statements in expression position have no type.
                debug_assert!(other.tag().is_statement(), "untyped node {:?}", other.tag());
                self.stmt(ast, node);
                Type::UNIT
            }
        }
    }

    /// Applies curried arguments left to right. The result is the remaining
    /// lambda for partial application, or the final return.
    fn apply(&mut self, ast: &mut Ast, node: NodeId, func_ty: Type, args: &[NodeId]) -> Type {
        // Zero-argument invocation consumes the void parameter slot.
        if args.is_empty() {
            if let Type::Lambda { param, ret } = &func_ty {
                if **param == Type::VOID {
                    return (**ret).clone();
                }
            }
            return func_ty;
        }

        let mut current = func_ty;
        for &arg in args {
            let arg_ty = self.expr(ast, arg);
            match current {
                Type::Lambda { param, ret } => {
                    if arg_ty != Type::ERROR && !arg_ty.is_assignable_to(&param) {
                        self.mismatch(
                            ast.pos(arg).clone(),
                            format!("argument of type {arg_ty} where {param} is expected"),
                        );
                    }
                    current = *ret;
                }
                _ => {
                    return self.mismatch(
                        ast.pos(node).clone(),
                        "too many arguments in call",
                    );
                }
            }
        }
        current
    }

    /// A call whose callee types as `type` constructs an object. The callee
    /// must denote an object type and the arguments must satisfy one of its
    /// constructors.
    fn constructor_call(
        &mut self,
        ast: &mut Ast,
        node: NodeId,
        func: NodeId,
        args: &[NodeId],
    ) -> Type {
        let denoted = self.denoted_type(ast, func);
        let object = match denoted {
            Some(Type::Object(object)) => object,
            Some(other) => {
                return self.mismatch(
                    ast.pos(func).clone(),
                    format!("{other} cannot be constructed"),
                )
            }
            None => {
                return self.mismatch(
                    ast.pos(func).clone(),
                    "callee does not denote a constructible type",
                )
            }
        };

        let arg_types: Vec<Type> = args.iter().map(|&a| self.expr(ast, a)).collect();
        let ctors = self
            .info
            .constructor_types
            .get(&object.id)
            .cloned()
            .unwrap_or_default();

        let matches = ctors.iter().any(|ctor| {
            let mut current = ctor.clone();
            if arg_types.is_empty() {
                return matches!(&current, Type::Lambda { param, .. } if **param == Type::VOID);
            }
            for arg_ty in &arg_types {
                match current {
                    Type::Lambda { param, ret } => {
                        if *arg_ty != Type::ERROR && !arg_ty.is_assignable_to(&param) {
                            return false;
                        }
                        current = *ret;
                    }
                    _ => return false,
                }
            }
            !matches!(current, Type::Lambda { .. })
        });

        if !matches && !ctors.is_empty() {
            self.mismatch(
                ast.pos(node).clone(),
                format!("no constructor of `{}` accepts these arguments", object.name),
            );
        }
        Type::Object(object)
    }

    /// The type a callee expression denotes, for constructor resolution.
    fn denoted_type(&mut self, ast: &Ast, func: NodeId) -> Option<Type> {
        match ast.kind(func) {
            NodeKind::TypeLiteral { value } => Some(value.clone()),
            NodeKind::TypeBody { value, .. } => value.clone(),
            NodeKind::Identifier { symbol, .. } => symbol.and_then(|s| {
                self.info
                    .type_bindings
                    .get(&ast.symbols.get(s).uuid)
                    .cloned()
            }),
            _ => None,
        }
    }
}
