//! AST to JSON.

use serde_json::{json, Map, Value};

use swarm_base::{Position, SwarmError};

use crate::ast::{Ast, Comparison, Formal, NodeId};
use crate::symbol::{Symbol, SymbolId, SymbolKind};
use crate::types::{Primitive, Type};
use crate::walk::Walk;

use super::{symbol_kind, tag_name, value_type};

type EncodeResult = Result<Map<String, Value>, SwarmError>;

/// Encodes AST subtrees, symbols and types into the canonical JSON schema.
pub struct Serializer;

impl Serializer {
    /// Serializes the subtree rooted at `node` to a canonical JSON string.
    pub fn to_json(ast: &Ast, node: NodeId) -> Result<String, SwarmError> {
        let value = Self::node_to_value(ast, node)?;
        serde_json::to_string(&value).map_err(|e| SwarmError::serialization(e.to_string()))
    }

    pub fn node_to_value(ast: &Ast, node: NodeId) -> Result<Value, SwarmError> {
        let mut encoder = Serializer;
        encoder.encode(ast, node)
    }

    /// A symbol record. The storage class travels as the `shared` flag on
    /// the symbol's type object.
    pub fn symbol_to_value(symbol: &Symbol) -> Value {
        json!({
            "name": symbol.name,
            "uuid": symbol.uuid,
            "kind": match symbol.kind {
                SymbolKind::Variable => symbol_kind::VARIABLE,
                SymbolKind::Function => symbol_kind::FUNCTION,
            },
            "isPrologue": symbol.is_prologue,
            "type": Self::type_to_value(&symbol.ty, symbol.shared),
            "declaredAt": Self::position_to_value(&symbol.declared_at),
        })
    }

    pub fn position_to_value(pos: &Position) -> Value {
        json!({
            "startLine": pos.start_line,
            "endLine": pos.end_line,
            "startCol": pos.start_col,
            "endCol": pos.end_col,
        })
    }

    /// Encodes a type. `shared` lands on the outermost type object only;
    /// nested types always carry `false`.
    pub fn type_to_value(ty: &Type, shared: bool) -> Value {
        match ty {
            Type::Primitive(p) => {
                let tag = match p {
                    Primitive::Boolean => value_type::BOOLEAN,
                    Primitive::Number => value_type::NUMBER,
                    Primitive::String => value_type::STRING,
                    Primitive::Void => value_type::VOID,
                    Primitive::Type => value_type::TYPE,
                    Primitive::Unit => value_type::UNIT,
                    Primitive::Error => value_type::ERROR,
                };
                json!({ "valueType": tag, "shared": shared })
            }
            Type::Enumerable(concrete) => json!({
                "valueType": value_type::ENUMERABLE,
                "concrete": Self::type_to_value(concrete, false),
                "shared": shared,
            }),
            Type::Map(concrete) => json!({
                "valueType": value_type::MAP,
                "concrete": Self::type_to_value(concrete, false),
                "shared": shared,
            }),
            Type::Lambda { .. } => {
                // Curried chains flatten to an argument list plus the final
                // return, matching the wire's FunctionType shape.
                let mut arguments = Vec::new();
                let mut current = ty;
                while let Type::Lambda { param, ret } = current {
                    arguments.push(Self::type_to_value(param, false));
                    current = &**ret;
                }
                json!({
                    "valueType": value_type::LAMBDA,
                    "arguments": arguments,
                    "return": Self::type_to_value(current, false),
                    "shared": shared,
                })
            }
            Type::Object(obj) => json!({
                "valueType": value_type::OBJECT,
                "id": obj.id,
                "name": obj.name,
                "properties": obj
                    .properties
                    .iter()
                    .map(|(n, t)| json!([n, Self::type_to_value(t, false)]))
                    .collect::<Vec<_>>(),
                "parent": match &obj.parent {
                    Some(parent) => Self::type_to_value(&Type::Object((**parent).clone()), false),
                    None => Value::Null,
                },
                "shared": shared,
            }),
            Type::Ambiguous(constraints) => json!({
                "valueType": value_type::AMBIGUOUS,
                "constraints": constraints
                    .iter()
                    .map(|t| Self::type_to_value(t, false))
                    .collect::<Vec<_>>(),
                "shared": shared,
            }),
        }
    }

    fn encode(&mut self, ast: &Ast, node: NodeId) -> Result<Value, SwarmError> {
        let mut obj = self.walk(ast, node)?;
        obj.insert(
            "astNodeName".into(),
            Value::String(tag_name(ast.tag(node)).into()),
        );
        obj.insert("position".into(), Self::position_to_value(ast.pos(node)));
        Ok(Value::Object(obj))
    }

    fn encode_all(&mut self, ast: &Ast, nodes: &[NodeId]) -> Result<Value, SwarmError> {
        let mut out = Vec::with_capacity(nodes.len());
        for &node in nodes {
            out.push(self.encode(ast, node)?);
        }
        Ok(Value::Array(out))
    }

    fn number(value: f64) -> Result<Value, SwarmError> {
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .ok_or_else(|| {
                SwarmError::serialization(format!("number {value} has no JSON representation"))
            })
    }

    fn fields(pairs: Vec<(&str, Value)>) -> EncodeResult {
        let mut map = Map::new();
        for (key, value) in pairs {
            map.insert(key.into(), value);
        }
        Ok(map)
    }
}

impl Walk for Serializer {
    type Output = EncodeResult;

    fn walk_program(&mut self, ast: &Ast, _node: NodeId, body: &[NodeId]) -> Self::Output {
        Self::fields(vec![("body", self.encode_all(ast, body)?)])
    }

    fn walk_expression_statement(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        expression: NodeId,
    ) -> Self::Output {
        Self::fields(vec![("expression", self.encode(ast, expression)?)])
    }

    fn walk_identifier(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        name: &str,
        symbol: Option<SymbolId>,
    ) -> Self::Output {
        let symbol = match symbol {
            Some(id) => Self::symbol_to_value(ast.symbols.get(id)),
            None => Value::Null,
        };
        Self::fields(vec![
            ("name", Value::String(name.into())),
            ("symbol", symbol),
        ])
    }

    fn walk_enumerable_access(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        path: NodeId,
        index: NodeId,
    ) -> Self::Output {
        Self::fields(vec![
            ("path", self.encode(ast, path)?),
            ("index", self.encode(ast, index)?),
        ])
    }

    fn walk_enumerable_append(&mut self, ast: &Ast, _node: NodeId, path: NodeId) -> Self::Output {
        Self::fields(vec![("path", self.encode(ast, path)?)])
    }

    fn walk_map_access(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        path: NodeId,
        end: NodeId,
    ) -> Self::Output {
        Self::fields(vec![
            ("path", self.encode(ast, path)?),
            ("end", Value::String(ast.identifier_name(end).into())),
            ("end_pos", Self::position_to_value(ast.pos(end))),
        ])
    }

    fn walk_class_access(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        path: NodeId,
        end: NodeId,
    ) -> Self::Output {
        Self::fields(vec![
            ("path", self.encode(ast, path)?),
            ("end", Value::String(ast.identifier_name(end).into())),
            ("end_pos", Self::position_to_value(ast.pos(end))),
        ])
    }

    fn walk_include(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        path: NodeId,
        identifiers: &[NodeId],
    ) -> Self::Output {
        Self::fields(vec![
            ("path", self.encode(ast, path)?),
            ("identifiers", self.encode_all(ast, identifiers)?),
        ])
    }

    fn walk_type_literal(&mut self, _ast: &Ast, _node: NodeId, value: &Type) -> Self::Output {
        Self::fields(vec![("type", Self::type_to_value(value, false))])
    }

    fn walk_boolean_literal(&mut self, _ast: &Ast, _node: NodeId, value: bool) -> Self::Output {
        Self::fields(vec![("value", Value::Bool(value))])
    }

    fn walk_string_literal(&mut self, _ast: &Ast, _node: NodeId, value: &str) -> Self::Output {
        Self::fields(vec![("value", Value::String(value.into()))])
    }

    fn walk_number_literal(&mut self, _ast: &Ast, _node: NodeId, value: f64) -> Self::Output {
        Self::fields(vec![("value", Self::number(value)?)])
    }

    fn walk_unit_literal(&mut self, _ast: &Ast, _node: NodeId) -> Self::Output {
        Self::fields(vec![])
    }

    fn walk_enumeration_literal(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        actuals: &[NodeId],
        ty: Option<&Type>,
    ) -> Self::Output {
        Self::fields(vec![
            ("actuals", self.encode_all(ast, actuals)?),
            (
                "type",
                ty.map(|t| Self::type_to_value(t, false)).unwrap_or(Value::Null),
            ),
        ])
    }

    fn walk_map_statement(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        key: NodeId,
        value: NodeId,
    ) -> Self::Output {
        // The key has no symbol and no type of its own.
        Self::fields(vec![
            (
                "mapStatementIdentifier",
                Value::String(ast.identifier_name(key).into()),
            ),
            ("value", self.encode(ast, value)?),
        ])
    }

    fn walk_map_literal(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        body: &[NodeId],
        ty: Option<&Type>,
    ) -> Self::Output {
        Self::fields(vec![
            ("body", self.encode_all(ast, body)?),
            (
                "type",
                ty.map(|t| Self::type_to_value(t, false)).unwrap_or(Value::Null),
            ),
        ])
    }

    fn walk_assign(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        dest: NodeId,
        value: NodeId,
    ) -> Self::Output {
        Self::fields(vec![
            ("dest", self.encode(ast, dest)?),
            ("value", self.encode(ast, value)?),
        ])
    }

    fn walk_variable_declaration(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        type_node: NodeId,
        id: NodeId,
        value: NodeId,
        shared: bool,
    ) -> Self::Output {
        Self::fields(vec![
            ("typeNode", self.encode(ast, type_node)?),
            ("identifier", self.encode(ast, id)?),
            ("value", self.encode(ast, value)?),
            ("shared", Value::Bool(shared)),
        ])
    }

    fn walk_uninitialized_variable_declaration(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        type_node: NodeId,
        id: NodeId,
    ) -> Self::Output {
        Self::fields(vec![
            ("typeNode", self.encode(ast, type_node)?),
            ("identifier", self.encode(ast, id)?),
        ])
    }

    fn walk_use(&mut self, ast: &Ast, _node: NodeId, ids: &[NodeId]) -> Self::Output {
        Self::fields(vec![("identifiers", self.encode_all(ast, ids)?)])
    }

    fn walk_return(&mut self, ast: &Ast, _node: NodeId, value: Option<NodeId>) -> Self::Output {
        Self::fields(vec![(
            "value",
            match value {
                Some(v) => self.encode(ast, v)?,
                None => Value::Null,
            },
        )])
    }

    fn walk_function(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        type_node: NodeId,
        formals: &[Formal],
        body: &[NodeId],
        captured: &[SymbolId],
    ) -> Self::Output {
        let mut formal_values = Vec::with_capacity(formals.len());
        for formal in formals {
            formal_values.push(Value::Array(vec![
                self.encode(ast, formal.type_node)?,
                self.encode(ast, formal.id)?,
            ]));
        }
        Self::fields(vec![
            ("typeNode", self.encode(ast, type_node)?),
            ("formals", Value::Array(formal_values)),
            ("body", self.encode_all(ast, body)?),
            (
                "usedSymbols",
                Value::Array(
                    captured
                        .iter()
                        .map(|&s| Self::symbol_to_value(ast.symbols.get(s)))
                        .collect(),
                ),
            ),
        ])
    }

    fn walk_constructor(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        name: &str,
        func: NodeId,
        parent_constructors: &[NodeId],
    ) -> Self::Output {
        Self::fields(vec![
            ("name", Value::String(name.into())),
            ("func", self.encode(ast, func)?),
            (
                "parentConstructors",
                self.encode_all(ast, parent_constructors)?,
            ),
        ])
    }

    fn walk_type_body(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        declarations: &[NodeId],
        parents: &[NodeId],
        constructors: &[NodeId],
        value: Option<&Type>,
    ) -> Self::Output {
        Self::fields(vec![
            ("declarations", self.encode_all(ast, declarations)?),
            ("parents", self.encode_all(ast, parents)?),
            ("constructors", self.encode_all(ast, constructors)?),
            (
                "type",
                value
                    .map(|t| Self::type_to_value(t, false))
                    .unwrap_or(Value::Null),
            ),
        ])
    }

    fn walk_call(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        func: NodeId,
        args: &[NodeId],
        _ty: Option<&Type>,
    ) -> Self::Output {
        Self::fields(vec![
            ("func", self.encode(ast, func)?),
            ("arguments", self.encode_all(ast, args)?),
        ])
    }

    fn walk_defer_call(&mut self, ast: &Ast, _node: NodeId, call: NodeId) -> Self::Output {
        Self::fields(vec![("call", self.encode(ast, call)?)])
    }

    fn walk_and(&mut self, ast: &Ast, _node: NodeId, left: NodeId, right: NodeId) -> Self::Output {
        Self::fields(vec![
            ("left", self.encode(ast, left)?),
            ("right", self.encode(ast, right)?),
        ])
    }

    fn walk_or(&mut self, ast: &Ast, _node: NodeId, left: NodeId, right: NodeId) -> Self::Output {
        self.walk_and(ast, _node, left, right)
    }

    fn walk_equals(
        &mut self,
        ast: &Ast,
        node: NodeId,
        left: NodeId,
        right: NodeId,
    ) -> Self::Output {
        self.walk_and(ast, node, left, right)
    }

    fn walk_numeric_comparison(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        comparison: Comparison,
        left: NodeId,
        right: NodeId,
    ) -> Self::Output {
        Self::fields(vec![
            ("left", self.encode(ast, left)?),
            ("right", self.encode(ast, right)?),
            ("comparisonType", Value::String(comparison.as_str().into())),
        ])
    }

    fn walk_not_equals(
        &mut self,
        ast: &Ast,
        node: NodeId,
        left: NodeId,
        right: NodeId,
    ) -> Self::Output {
        self.walk_and(ast, node, left, right)
    }

    fn walk_add(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        left: NodeId,
        right: NodeId,
        concatenation: bool,
    ) -> Self::Output {
        Self::fields(vec![
            ("left", self.encode(ast, left)?),
            ("right", self.encode(ast, right)?),
            ("concatenation", Value::Bool(concatenation)),
        ])
    }

    fn walk_subtract(
        &mut self,
        ast: &Ast,
        node: NodeId,
        left: NodeId,
        right: NodeId,
    ) -> Self::Output {
        self.walk_and(ast, node, left, right)
    }

    fn walk_multiply(
        &mut self,
        ast: &Ast,
        node: NodeId,
        left: NodeId,
        right: NodeId,
    ) -> Self::Output {
        self.walk_and(ast, node, left, right)
    }

    fn walk_divide(
        &mut self,
        ast: &Ast,
        node: NodeId,
        left: NodeId,
        right: NodeId,
    ) -> Self::Output {
        self.walk_and(ast, node, left, right)
    }

    fn walk_modulus(
        &mut self,
        ast: &Ast,
        node: NodeId,
        left: NodeId,
        right: NodeId,
    ) -> Self::Output {
        self.walk_and(ast, node, left, right)
    }

    fn walk_power(
        &mut self,
        ast: &Ast,
        node: NodeId,
        left: NodeId,
        right: NodeId,
    ) -> Self::Output {
        self.walk_and(ast, node, left, right)
    }

    fn walk_nth_root(
        &mut self,
        ast: &Ast,
        node: NodeId,
        left: NodeId,
        right: NodeId,
    ) -> Self::Output {
        self.walk_and(ast, node, left, right)
    }

    fn walk_negative(&mut self, ast: &Ast, _node: NodeId, exp: NodeId) -> Self::Output {
        Self::fields(vec![("expression", self.encode(ast, exp)?)])
    }

    fn walk_not(&mut self, ast: &Ast, node: NodeId, exp: NodeId) -> Self::Output {
        self.walk_negative(ast, node, exp)
    }

    fn walk_enumerate(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        enumerable: NodeId,
        local: NodeId,
        index: Option<NodeId>,
        shared: bool,
        body: &[NodeId],
    ) -> Self::Output {
        Self::fields(vec![
            ("enumerable", self.encode(ast, enumerable)?),
            ("local", self.encode(ast, local)?),
            (
                "index",
                match index {
                    Some(i) => self.encode(ast, i)?,
                    None => Value::Null,
                },
            ),
            ("shared", Value::Bool(shared)),
            ("body", self.encode_all(ast, body)?),
        ])
    }

    fn walk_with(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        resource: NodeId,
        local: NodeId,
        shared: bool,
        body: &[NodeId],
    ) -> Self::Output {
        Self::fields(vec![
            ("resource", self.encode(ast, resource)?),
            ("local", self.encode(ast, local)?),
            ("shared", Value::Bool(shared)),
            ("body", self.encode_all(ast, body)?),
        ])
    }

    fn walk_if(
        &mut self,
        ast: &Ast,
        _node: NodeId,
        condition: NodeId,
        body: &[NodeId],
    ) -> Self::Output {
        Self::fields(vec![
            ("condition", self.encode(ast, condition)?),
            ("body", self.encode_all(ast, body)?),
        ])
    }

    fn walk_while(
        &mut self,
        ast: &Ast,
        node: NodeId,
        condition: NodeId,
        body: &[NodeId],
    ) -> Self::Output {
        self.walk_if(ast, node, condition, body)
    }

    fn walk_continue(&mut self, _ast: &Ast, _node: NodeId) -> Self::Output {
        Self::fields(vec![])
    }

    fn walk_break(&mut self, _ast: &Ast, _node: NodeId) -> Self::Output {
        Self::fields(vec![])
    }
}
