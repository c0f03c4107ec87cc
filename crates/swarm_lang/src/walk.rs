//! Generic AST traversal.
//!
//! [`Walk`] gives every pass the same shape: one handler per node tag, plus
//! a provided dispatcher that destructures the node and routes to the
//! handler. The dispatch is an exhaustive `match` on [`NodeKind`], so adding
//! a tag without teaching every pass about it is a compile error rather than
//! a runtime surprise.
//!
//! Passes that need to mutate the tree (the analyses) use explicit recursion
//! instead; this trait serves the read-only walks: symbol collection,
//! serialization and evaluation.

use crate::ast::{Ast, Comparison, Formal, NodeId, NodeKind};
use crate::symbol::SymbolId;
use crate::types::Type;

#[allow(clippy::too_many_arguments)]
pub trait Walk {
    type Output;

    fn walk(&mut self, ast: &Ast, node: NodeId) -> Self::Output {
        match ast.kind(node) {
            NodeKind::Program { body } => self.walk_program(ast, node, body),
            NodeKind::ExpressionStatement { expression } => {
                self.walk_expression_statement(ast, node, *expression)
            }
            NodeKind::Identifier { name, symbol } => {
                self.walk_identifier(ast, node, name, *symbol)
            }
            NodeKind::EnumerableAccess { path, index } => {
                self.walk_enumerable_access(ast, node, *path, *index)
            }
            NodeKind::EnumerableAppend { path } => {
                self.walk_enumerable_append(ast, node, *path)
            }
            NodeKind::MapAccess { path, end } => self.walk_map_access(ast, node, *path, *end),
            NodeKind::ClassAccess { path, end } => {
                self.walk_class_access(ast, node, *path, *end)
            }
            NodeKind::Include { path, identifiers } => {
                self.walk_include(ast, node, *path, identifiers)
            }
            NodeKind::TypeLiteral { value } => self.walk_type_literal(ast, node, value),
            NodeKind::BooleanLiteral { value } => self.walk_boolean_literal(ast, node, *value),
            NodeKind::StringLiteral { value } => self.walk_string_literal(ast, node, value),
            NodeKind::NumberLiteral { value } => self.walk_number_literal(ast, node, *value),
            NodeKind::UnitLiteral => self.walk_unit_literal(ast, node),
            NodeKind::EnumerationLiteral { actuals, ty } => {
                self.walk_enumeration_literal(ast, node, actuals, ty.as_ref())
            }
            NodeKind::MapStatement { key, value } => {
                self.walk_map_statement(ast, node, *key, *value)
            }
            NodeKind::MapLiteral { body, ty } => {
                self.walk_map_literal(ast, node, body, ty.as_ref())
            }
            NodeKind::Assign { dest, value } => self.walk_assign(ast, node, *dest, *value),
            NodeKind::VariableDeclaration {
                type_node,
                id,
                value,
                shared,
            } => self.walk_variable_declaration(ast, node, *type_node, *id, *value, *shared),
            NodeKind::UninitializedVariableDeclaration { type_node, id } => {
                self.walk_uninitialized_variable_declaration(ast, node, *type_node, *id)
            }
            NodeKind::Use { ids } => self.walk_use(ast, node, ids),
            NodeKind::Return { value } => self.walk_return(ast, node, *value),
            NodeKind::Function {
                type_node,
                formals,
                body,
                captured,
            } => self.walk_function(ast, node, *type_node, formals, body, captured),
            NodeKind::Constructor {
                name,
                func,
                parent_constructors,
            } => self.walk_constructor(ast, node, name, *func, parent_constructors),
            NodeKind::TypeBody {
                declarations,
                parents,
                constructors,
                value,
            } => self.walk_type_body(ast, node, declarations, parents, constructors, value.as_ref()),
            NodeKind::Call { func, args, ty } => {
                self.walk_call(ast, node, *func, args, ty.as_ref())
            }
            NodeKind::DeferCall { call } => self.walk_defer_call(ast, node, *call),
            NodeKind::And { left, right } => self.walk_and(ast, node, *left, *right),
            NodeKind::Or { left, right } => self.walk_or(ast, node, *left, *right),
            NodeKind::Equals { left, right } => self.walk_equals(ast, node, *left, *right),
            NodeKind::NumericComparison {
                comparison,
                left,
                right,
            } => self.walk_numeric_comparison(ast, node, *comparison, *left, *right),
            NodeKind::NotEquals { left, right } => {
                self.walk_not_equals(ast, node, *left, *right)
            }
            NodeKind::Add {
                left,
                right,
                concatenation,
            } => self.walk_add(ast, node, *left, *right, *concatenation),
            NodeKind::Subtract { left, right } => self.walk_subtract(ast, node, *left, *right),
            NodeKind::Multiply { left, right } => self.walk_multiply(ast, node, *left, *right),
            NodeKind::Divide { left, right } => self.walk_divide(ast, node, *left, *right),
            NodeKind::Modulus { left, right } => self.walk_modulus(ast, node, *left, *right),
            NodeKind::Power { left, right } => self.walk_power(ast, node, *left, *right),
            NodeKind::NthRoot { left, right } => self.walk_nth_root(ast, node, *left, *right),
            NodeKind::Negative { exp } => self.walk_negative(ast, node, *exp),
            NodeKind::Not { exp } => self.walk_not(ast, node, *exp),
            NodeKind::Enumerate {
                enumerable,
                local,
                index,
                shared,
                body,
            } => self.walk_enumerate(ast, node, *enumerable, *local, *index, *shared, body),
            NodeKind::With {
                resource,
                local,
                shared,
                body,
            } => self.walk_with(ast, node, *resource, *local, *shared, body),
            NodeKind::If { condition, body } => self.walk_if(ast, node, *condition, body),
            NodeKind::While { condition, body } => self.walk_while(ast, node, *condition, body),
            NodeKind::Continue => self.walk_continue(ast, node),
            NodeKind::Break => self.walk_break(ast, node),
        }
    }

    fn walk_program(&mut self, ast: &Ast, node: NodeId, body: &[NodeId]) -> Self::Output;
    fn walk_expression_statement(
        &mut self,
        ast: &Ast,
        node: NodeId,
        expression: NodeId,
    ) -> Self::Output;
    fn walk_identifier(
        &mut self,
        ast: &Ast,
        node: NodeId,
        name: &str,
        symbol: Option<SymbolId>,
    ) -> Self::Output;
    fn walk_enumerable_access(
        &mut self,
        ast: &Ast,
        node: NodeId,
        path: NodeId,
        index: NodeId,
    ) -> Self::Output;
    fn walk_enumerable_append(&mut self, ast: &Ast, node: NodeId, path: NodeId) -> Self::Output;
    fn walk_map_access(&mut self, ast: &Ast, node: NodeId, path: NodeId, end: NodeId)
        -> Self::Output;
    fn walk_class_access(
        &mut self,
        ast: &Ast,
        node: NodeId,
        path: NodeId,
        end: NodeId,
    ) -> Self::Output;
    fn walk_include(
        &mut self,
        ast: &Ast,
        node: NodeId,
        path: NodeId,
        identifiers: &[NodeId],
    ) -> Self::Output;
    fn walk_type_literal(&mut self, ast: &Ast, node: NodeId, value: &Type) -> Self::Output;
    fn walk_boolean_literal(&mut self, ast: &Ast, node: NodeId, value: bool) -> Self::Output;
    fn walk_string_literal(&mut self, ast: &Ast, node: NodeId, value: &str) -> Self::Output;
    fn walk_number_literal(&mut self, ast: &Ast, node: NodeId, value: f64) -> Self::Output;
    fn walk_unit_literal(&mut self, ast: &Ast, node: NodeId) -> Self::Output;
    fn walk_enumeration_literal(
        &mut self,
        ast: &Ast,
        node: NodeId,
        actuals: &[NodeId],
        ty: Option<&Type>,
    ) -> Self::Output;
    fn walk_map_statement(
        &mut self,
        ast: &Ast,
        node: NodeId,
        key: NodeId,
        value: NodeId,
    ) -> Self::Output;
    fn walk_map_literal(
        &mut self,
        ast: &Ast,
        node: NodeId,
        body: &[NodeId],
        ty: Option<&Type>,
    ) -> Self::Output;
    fn walk_assign(&mut self, ast: &Ast, node: NodeId, dest: NodeId, value: NodeId)
        -> Self::Output;
    fn walk_variable_declaration(
        &mut self,
        ast: &Ast,
        node: NodeId,
        type_node: NodeId,
        id: NodeId,
        value: NodeId,
        shared: bool,
    ) -> Self::Output;
    fn walk_uninitialized_variable_declaration(
        &mut self,
        ast: &Ast,
        node: NodeId,
        type_node: NodeId,
        id: NodeId,
    ) -> Self::Output;
    fn walk_use(&mut self, ast: &Ast, node: NodeId, ids: &[NodeId]) -> Self::Output;
    fn walk_return(&mut self, ast: &Ast, node: NodeId, value: Option<NodeId>) -> Self::Output;
    fn walk_function(
        &mut self,
        ast: &Ast,
        node: NodeId,
        type_node: NodeId,
        formals: &[Formal],
        body: &[NodeId],
        captured: &[SymbolId],
    ) -> Self::Output;
    fn walk_constructor(
        &mut self,
        ast: &Ast,
        node: NodeId,
        name: &str,
        func: NodeId,
        parent_constructors: &[NodeId],
    ) -> Self::Output;
    fn walk_type_body(
        &mut self,
        ast: &Ast,
        node: NodeId,
        declarations: &[NodeId],
        parents: &[NodeId],
        constructors: &[NodeId],
        value: Option<&Type>,
    ) -> Self::Output;
    fn walk_call(
        &mut self,
        ast: &Ast,
        node: NodeId,
        func: NodeId,
        args: &[NodeId],
        ty: Option<&Type>,
    ) -> Self::Output;
    fn walk_defer_call(&mut self, ast: &Ast, node: NodeId, call: NodeId) -> Self::Output;
    fn walk_and(&mut self, ast: &Ast, node: NodeId, left: NodeId, right: NodeId) -> Self::Output;
    fn walk_or(&mut self, ast: &Ast, node: NodeId, left: NodeId, right: NodeId) -> Self::Output;
    fn walk_equals(&mut self, ast: &Ast, node: NodeId, left: NodeId, right: NodeId)
        -> Self::Output;
    fn walk_numeric_comparison(
        &mut self,
        ast: &Ast,
        node: NodeId,
        comparison: Comparison,
        left: NodeId,
        right: NodeId,
    ) -> Self::Output;
    fn walk_not_equals(
        &mut self,
        ast: &Ast,
        node: NodeId,
        left: NodeId,
        right: NodeId,
    ) -> Self::Output;
    fn walk_add(
        &mut self,
        ast: &Ast,
        node: NodeId,
        left: NodeId,
        right: NodeId,
        concatenation: bool,
    ) -> Self::Output;
    fn walk_subtract(&mut self, ast: &Ast, node: NodeId, left: NodeId, right: NodeId)
        -> Self::Output;
    fn walk_multiply(&mut self, ast: &Ast, node: NodeId, left: NodeId, right: NodeId)
        -> Self::Output;
    fn walk_divide(&mut self, ast: &Ast, node: NodeId, left: NodeId, right: NodeId)
        -> Self::Output;
    fn walk_modulus(&mut self, ast: &Ast, node: NodeId, left: NodeId, right: NodeId)
        -> Self::Output;
    fn walk_power(&mut self, ast: &Ast, node: NodeId, left: NodeId, right: NodeId)
        -> Self::Output;
    fn walk_nth_root(&mut self, ast: &Ast, node: NodeId, left: NodeId, right: NodeId)
        -> Self::Output;
    fn walk_negative(&mut self, ast: &Ast, node: NodeId, exp: NodeId) -> Self::Output;
    fn walk_not(&mut self, ast: &Ast, node: NodeId, exp: NodeId) -> Self::Output;
    fn walk_enumerate(
        &mut self,
        ast: &Ast,
        node: NodeId,
        enumerable: NodeId,
        local: NodeId,
        index: Option<NodeId>,
        shared: bool,
        body: &[NodeId],
    ) -> Self::Output;
    fn walk_with(
        &mut self,
        ast: &Ast,
        node: NodeId,
        resource: NodeId,
        local: NodeId,
        shared: bool,
        body: &[NodeId],
    ) -> Self::Output;
    fn walk_if(&mut self, ast: &Ast, node: NodeId, condition: NodeId, body: &[NodeId])
        -> Self::Output;
    fn walk_while(
        &mut self,
        ast: &Ast,
        node: NodeId,
        condition: NodeId,
        body: &[NodeId],
    ) -> Self::Output;
    fn walk_continue(&mut self, ast: &Ast, node: NodeId) -> Self::Output;
    fn walk_break(&mut self, ast: &Ast, node: NodeId) -> Self::Output;
}
