//! Symbol collection over a subtree.
//!
//! Gathers every symbol referenced below a node, keyed by UUID. The map is
//! ordered (BTreeMap) so anything derived from it — the locals envelope in
//! particular — is deterministic. Map keys and class member names contribute
//! nothing: they carry no symbols by design.

use std::collections::BTreeMap;

use crate::ast::{Ast, Comparison, Formal, NodeId};
use crate::symbol::SymbolId;
use crate::types::Type;
use crate::walk::Walk;

/// `uuid → symbol` for one subtree.
pub type SymbolMap = BTreeMap<String, SymbolId>;

pub struct SymbolWalk;

impl SymbolWalk {
    /// Collects the symbols referenced by the subtree rooted at `node`.
    pub fn collect(ast: &Ast, node: NodeId) -> SymbolMap {
        SymbolWalk.walk(ast, node)
    }

    fn single(&self, ast: &Ast, symbol: Option<SymbolId>) -> SymbolMap {
        let mut map = SymbolMap::new();
        if let Some(id) = symbol {
            map.insert(ast.symbols.get(id).uuid.clone(), id);
        }
        map
    }

    fn merge(&mut self, ast: &Ast, nodes: &[NodeId], mut map: SymbolMap) -> SymbolMap {
        for &node in nodes {
            map.extend(self.walk(ast, node));
        }
        map
    }
}

impl Walk for SymbolWalk {
    type Output = SymbolMap;

    fn walk_program(&mut self, ast: &Ast, _node: NodeId, body: &[NodeId]) -> SymbolMap {
        self.merge(ast, body, SymbolMap::new())
    }

    fn walk_expression_statement(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        expression: NodeId,
    ) -> SymbolMap {
        self.walk(ast, expression)
    }

    fn walk_identifier(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        _name: &str,
        symbol: Option<SymbolId>,
    ) -> SymbolMap {
        self.single(ast, symbol)
    }

    fn walk_enumerable_access(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        path: NodeId,
        index: NodeId,
    ) -> SymbolMap {
        let map = self.walk(ast, path);
        self.merge(ast, &[index], map)
    }

    fn walk_enumerable_append(&mut self, ast: &Ast, _node: NodeId, path: NodeId) -> SymbolMap {
        self.walk(ast, path)
    }

    fn walk_map_access(&mut self, ast: &Ast, _node: NodeId, path: NodeId, _end: NodeId) -> SymbolMap {
        self.walk(ast, path)
    }

    fn walk_class_access(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        path: NodeId,
        _end: NodeId,
    ) -> SymbolMap {
        self.walk(ast, path)
    }

    fn walk_include(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        path: NodeId,
        _identifiers: &[NodeId],
    ) -> SymbolMap {
        self.walk(ast, path)
    }

    fn walk_type_literal(&mut self, _ast: &Ast, _node: NodeId, _value: &Type) -> SymbolMap {
        SymbolMap::new()
    }

    fn walk_boolean_literal(&mut self, _ast: &Ast, _node: NodeId, _value: bool) -> SymbolMap {
        SymbolMap::new()
    }

    fn walk_string_literal(&mut self, _ast: &Ast, _node: NodeId, _value: &str) -> SymbolMap {
        SymbolMap::new()
    }

    fn walk_number_literal(&mut self, _ast: &Ast, _node: NodeId, _value: f64) -> SymbolMap {
        SymbolMap::new()
    }

    fn walk_unit_literal(&mut self, _ast: &Ast, _node: NodeId) -> SymbolMap {
        SymbolMap::new()
    }

    fn walk_enumeration_literal(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        actuals: &[NodeId],
        _ty: Option<&Type>,
    ) -> SymbolMap {
        self.merge(ast, actuals, SymbolMap::new())
    }

    fn walk_map_statement(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        _key: NodeId,
        value: NodeId,
    ) -> SymbolMap {
        self.walk(ast, value)
    }

    fn walk_map_literal(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        body: &[NodeId],
        _ty: Option<&Type>,
    ) -> SymbolMap {
        self.merge(ast, body, SymbolMap::new())
    }

    fn walk_assign(&mut self, ast: &Ast, _node: NodeId, dest: NodeId, value: NodeId) -> SymbolMap {
        let map = self.walk(ast, dest);
        self.merge(ast, &[value], map)
    }

    fn walk_variable_declaration(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        _type_node: NodeId,
        id: NodeId,
        value: NodeId,
        _shared: bool,
    ) -> SymbolMap {
        let map = self.walk(ast, id);
        self.merge(ast, &[value], map)
    }

    fn walk_uninitialized_variable_declaration(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        _type_node: NodeId,
        id: NodeId,
    ) -> SymbolMap {
        self.walk(ast, id)
    }

    fn walk_use(&mut self, ast: &Ast, _node: NodeId, ids: &[NodeId]) -> SymbolMap {
        self.merge(ast, ids, SymbolMap::new())
    }

    fn walk_return(&mut self, ast: &Ast, _node: NodeId, value: Option<NodeId>) -> SymbolMap {
        match value {
            Some(value) => self.walk(ast, value),
            None => SymbolMap::new(),
        }
    }

    fn walk_function(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        _type_node: NodeId,
        _formals: &[Formal],
        body: &[NodeId],
        _captured: &[SymbolId],
    ) -> SymbolMap {
        self.merge(ast, body, SymbolMap::new())
    }

    fn walk_constructor(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        _name: &str,
        func: NodeId,
        parent_constructors: &[NodeId],
    ) -> SymbolMap {
        let map = self.walk(ast, func);
        self.merge(ast, parent_constructors, map)
    }

    fn walk_type_body(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        declarations: &[NodeId],
        _parents: &[NodeId],
        constructors: &[NodeId],
        _value: Option<&Type>,
    ) -> SymbolMap {
        let map = self.merge(ast, declarations, SymbolMap::new());
        self.merge(ast, constructors, map)
    }

    fn walk_call(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        func: NodeId,
        args: &[NodeId],
        _ty: Option<&Type>,
    ) -> SymbolMap {
        let map = self.walk(ast, func);
        self.merge(ast, args, map)
    }

    fn walk_defer_call(&mut self, ast: &Ast, _node: NodeId, call: NodeId) -> SymbolMap {
        self.walk(ast, call)
    }

    fn walk_and(&mut self, ast: &Ast, _node: NodeId, left: NodeId, right: NodeId) -> SymbolMap {
        let map = self.walk(ast, left);
        self.merge(ast, &[right], map)
    }

    fn walk_or(&mut self, ast: &Ast, node: NodeId, left: NodeId, right: NodeId) -> SymbolMap {
        self.walk_and(ast, node, left, right)
    }

    fn walk_equals(&mut self, ast: &Ast, node: NodeId, left: NodeId, right: NodeId) -> SymbolMap {
        self.walk_and(ast, node, left, right)
    }

    fn walk_numeric_comparison(
        &mut self,
        ast: &Ast,
        node: NodeId,
        _comparison: Comparison,
        left: NodeId,
        right: NodeId,
    ) -> SymbolMap {
        self.walk_and(ast, node, left, right)
    }

    fn walk_not_equals(
        &mut self,
        ast: &Ast,
        node: NodeId,
        left: NodeId,
        right: NodeId,
    ) -> SymbolMap {
        self.walk_and(ast, node, left, right)
    }

    fn walk_add(
        &mut self,
        ast: &Ast,
        node: NodeId,
        left: NodeId,
        right: NodeId,
        _concatenation: bool,
    ) -> SymbolMap {
        self.walk_and(ast, node, left, right)
    }

    fn walk_subtract(&mut self, ast: &Ast, node: NodeId, left: NodeId, right: NodeId) -> SymbolMap {
        self.walk_and(ast, node, left, right)
    }

    fn walk_multiply(&mut self, ast: &Ast, node: NodeId, left: NodeId, right: NodeId) -> SymbolMap {
        self.walk_and(ast, node, left, right)
    }

    fn walk_divide(&mut self, ast: &Ast, node: NodeId, left: NodeId, right: NodeId) -> SymbolMap {
        self.walk_and(ast, node, left, right)
    }

    fn walk_modulus(&mut self, ast: &Ast, node: NodeId, left: NodeId, right: NodeId) -> SymbolMap {
        self.walk_and(ast, node, left, right)
    }

    fn walk_power(&mut self, ast: &Ast, node: NodeId, left: NodeId, right: NodeId) -> SymbolMap {
        self.walk_and(ast, node, left, right)
    }

    fn walk_nth_root(&mut self, ast: &Ast, node: NodeId, left: NodeId, right: NodeId) -> SymbolMap {
        self.walk_and(ast, node, left, right)
    }

    fn walk_negative(&mut self, ast: &Ast, _node: NodeId, exp: NodeId) -> SymbolMap {
        self.walk(ast, exp)
    }

    fn walk_not(&mut self, ast: &Ast, _node: NodeId, exp: NodeId) -> SymbolMap {
        self.walk(ast, exp)
    }

    fn walk_enumerate(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        enumerable: NodeId,
        local: NodeId,
        index: Option<NodeId>,
        _shared: bool,
        body: &[NodeId],
    ) -> SymbolMap {
        let mut map = self.walk(ast, enumerable);
        map.extend(self.walk(ast, local));
        if let Some(index) = index {
            map.extend(self.walk(ast, index));
        }
        self.merge(ast, body, map)
    }

    fn walk_with(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        resource: NodeId,
        local: NodeId,
        _shared: bool,
        body: &[NodeId],
    ) -> SymbolMap {
        let mut map = self.walk(ast, resource);
        map.extend(self.walk(ast, local));
        self.merge(ast, body, map)
    }

    fn walk_if(&mut self, ast: &Ast, _node: NodeId, condition: NodeId, body: &[NodeId]) -> SymbolMap {
        let map = self.walk(ast, condition);
        self.merge(ast, body, map)
    }

    fn walk_while(
        &mut self,
        ast: &Ast,
        node: NodeId,
        condition: NodeId,
        body: &[NodeId],
    ) -> SymbolMap {
        self.walk_if(ast, node, condition, body)
    }

    fn walk_continue(&mut self, _ast: &Ast, _node: NodeId) -> SymbolMap {
        SymbolMap::new()
    }

    fn walk_break(&mut self, _ast: &Ast, _node: NodeId) -> SymbolMap {
        SymbolMap::new()
    }
}
