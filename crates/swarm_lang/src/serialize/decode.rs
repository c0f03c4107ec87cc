//! JSON to AST.
//!
//! The inverse of the encoder. Symbols are rebuilt keyed by UUID: the first
//! record seen for a UUID is constructed, and every later occurrence reuses
//! that instance, so identifier nodes in the decoded tree reference-share
//! one symbol record exactly as they did before serialization.

use serde_json::{Map, Value};

use swarm_base::{Position, SwarmError};

use crate::ast::{Ast, Comparison, Formal, NodeId, NodeKind};
use crate::symbol::{Symbol, SymbolId, SymbolKind};
use crate::types::{ObjectType, Type};

use super::{symbol_kind, value_type};

/// Decodes a canonical JSON string into a fresh, self-contained AST pool.
pub fn deserialize(input: &str) -> Result<(Ast, NodeId), SwarmError> {
    let json: Value =
        serde_json::from_str(input).map_err(|e| SwarmError::serialization(e.to_string()))?;
    let mut ast = Ast::new();
    let root = Deserializer::node(&mut ast, &json)?;
    Ok((ast, root))
}

pub struct Deserializer;

fn malformed(what: impl Into<String>) -> SwarmError {
    SwarmError::serialization(what.into())
}

fn obj<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>, SwarmError> {
    value
        .as_object()
        .ok_or_else(|| malformed(format!("expected an object for {what}")))
}

fn field<'a>(map: &'a Map<String, Value>, name: &str) -> Result<&'a Value, SwarmError> {
    map.get(name)
        .ok_or_else(|| malformed(format!("missing field `{name}`")))
}

fn str_field<'a>(map: &'a Map<String, Value>, name: &str) -> Result<&'a str, SwarmError> {
    field(map, name)?
        .as_str()
        .ok_or_else(|| malformed(format!("field `{name}` is not a string")))
}

fn bool_field(map: &Map<String, Value>, name: &str) -> Result<bool, SwarmError> {
    field(map, name)?
        .as_bool()
        .ok_or_else(|| malformed(format!("field `{name}` is not a boolean")))
}

fn f64_field(map: &Map<String, Value>, name: &str) -> Result<f64, SwarmError> {
    field(map, name)?
        .as_f64()
        .ok_or_else(|| malformed(format!("field `{name}` is not a number")))
}

fn u64_field(map: &Map<String, Value>, name: &str) -> Result<u64, SwarmError> {
    field(map, name)?
        .as_u64()
        .ok_or_else(|| malformed(format!("field `{name}` is not an integer")))
}

fn usize_field(map: &Map<String, Value>, name: &str) -> Result<usize, SwarmError> {
    Ok(u64_field(map, name)? as usize)
}

fn array_field<'a>(
    map: &'a Map<String, Value>,
    name: &str,
) -> Result<&'a Vec<Value>, SwarmError> {
    field(map, name)?
        .as_array()
        .ok_or_else(|| malformed(format!("field `{name}` is not an array")))
}

impl Deserializer {
    pub fn position(value: &Value) -> Result<Position, SwarmError> {
        let map = obj(value, "a position")?;
        Ok(Position::new(
            "",
            usize_field(map, "startLine")?,
            usize_field(map, "endLine")?,
            usize_field(map, "startCol")?,
            usize_field(map, "endCol")?,
        ))
    }

    /// Decodes a type object, returning the type and its `shared` flag.
    pub fn type_with_shared(value: &Value) -> Result<(Type, bool), SwarmError> {
        let map = obj(value, "a type")?;
        let shared = bool_field(map, "shared")?;
        let tag = u64_field(map, "valueType")?;
        let ty = match tag {
            value_type::BOOLEAN => Type::BOOLEAN,
            value_type::NUMBER => Type::NUMBER,
            value_type::STRING => Type::STRING,
            value_type::VOID => Type::VOID,
            value_type::TYPE => Type::TYPE,
            value_type::UNIT => Type::UNIT,
            value_type::ERROR => Type::ERROR,
            value_type::ENUMERABLE => {
                Type::enumerable(Self::type_with_shared(field(map, "concrete")?)?.0)
            }
            value_type::MAP => Type::map(Self::type_with_shared(field(map, "concrete")?)?.0),
            value_type::LAMBDA => {
                let mut params = Vec::new();
                for arg in array_field(map, "arguments")? {
                    params.push(Self::type_with_shared(arg)?.0);
                }
                let ret = Self::type_with_shared(field(map, "return")?)?.0;
                Type::lambda_of(&params, ret)
            }
            value_type::OBJECT => {
                let mut properties = Vec::new();
                for entry in array_field(map, "properties")? {
                    let pair = entry
                        .as_array()
                        .filter(|p| p.len() == 2)
                        .ok_or_else(|| malformed("object property is not a [name, type] pair"))?;
                    let name = pair[0]
                        .as_str()
                        .ok_or_else(|| malformed("property name is not a string"))?;
                    properties.push((name.to_string(), Self::type_with_shared(&pair[1])?.0));
                }
                let parent = match field(map, "parent")? {
                    Value::Null => None,
                    parent => match Self::type_with_shared(parent)?.0 {
                        Type::Object(obj) => Some(Box::new(obj)),
                        _ => return Err(malformed("object parent is not an object type")),
                    },
                };
                Type::Object(ObjectType {
                    id: str_field(map, "id")?.to_string(),
                    name: str_field(map, "name")?.to_string(),
                    properties,
                    parent,
                })
            }
            value_type::AMBIGUOUS => {
                let mut constraints = Vec::new();
                for c in array_field(map, "constraints")? {
                    constraints.push(Self::type_with_shared(c)?.0);
                }
                Type::Ambiguous(constraints)
            }
            other => return Err(malformed(format!("unknown valueType {other}"))),
        };
        Ok((ty, shared))
    }

    /// Decodes a symbol record, reusing the already-built instance when the
    /// UUID has been seen before in this pool.
    pub fn symbol(ast: &mut Ast, value: &Value) -> Result<SymbolId, SwarmError> {
        let map = obj(value, "a symbol")?;
        let uuid = str_field(map, "uuid")?.to_string();
        if let Some(existing) = ast.symbols.by_uuid(&uuid) {
            return Ok(existing);
        }

        let (ty, shared) = Self::type_with_shared(field(map, "type")?)?;
        let kind = match u64_field(map, "kind")? {
            symbol_kind::FUNCTION => SymbolKind::Function,
            _ => SymbolKind::Variable,
        };
        let symbol = Symbol {
            uuid,
            name: str_field(map, "name")?.to_string(),
            kind,
            ty,
            declared_at: Self::position(field(map, "declaredAt")?)?,
            shared,
            is_prologue: bool_field(map, "isPrologue")?,
        };
        Ok(ast.symbols.intern(symbol))
    }

    fn nodes(ast: &mut Ast, values: &[Value]) -> Result<Vec<NodeId>, SwarmError> {
        values.iter().map(|v| Self::node(ast, v)).collect()
    }

    fn opt_node(ast: &mut Ast, value: &Value) -> Result<Option<NodeId>, SwarmError> {
        match value {
            Value::Null => Ok(None),
            other => Ok(Some(Self::node(ast, other)?)),
        }
    }

    fn opt_type(value: &Value) -> Result<Option<Type>, SwarmError> {
        match value {
            Value::Null => Ok(None),
            other => Ok(Some(Self::type_with_shared(other)?.0)),
        }
    }

    /// Decodes one node object into the pool.
    pub fn node(ast: &mut Ast, value: &Value) -> Result<NodeId, SwarmError> {
        let map = obj(value, "a node")?;
        let name = str_field(map, "astNodeName")?;
        let pos = Self::position(field(map, "position")?)?;

        let kind = match name {
            "ProgramNode" => NodeKind::Program {
                body: Self::nodes(ast, array_field(map, "body")?)?,
            },
            "ExpressionStatementNode" => NodeKind::ExpressionStatement {
                expression: Self::node(ast, field(map, "expression")?)?,
            },
            "IdentifierNode" => {
                let symbol = match field(map, "symbol")? {
                    Value::Null => None,
                    sym => Some(Self::symbol(ast, sym)?),
                };
                NodeKind::Identifier {
                    name: str_field(map, "name")?.to_string(),
                    symbol,
                }
            }
            "EnumerableAccessNode" => NodeKind::EnumerableAccess {
                path: Self::node(ast, field(map, "path")?)?,
                index: Self::node(ast, field(map, "index")?)?,
            },
            "EnumerableAppendNode" => NodeKind::EnumerableAppend {
                path: Self::node(ast, field(map, "path")?)?,
            },
            "MapAccessNode" | "ClassAccessNode" => {
                let path = Self::node(ast, field(map, "path")?)?;
                let end_pos = Self::position(field(map, "end_pos")?)?;
                let end = ast.alloc(
                    end_pos,
                    NodeKind::Identifier {
                        name: str_field(map, "end")?.to_string(),
                        symbol: None,
                    },
                );
                if name == "MapAccessNode" {
                    NodeKind::MapAccess { path, end }
                } else {
                    NodeKind::ClassAccess { path, end }
                }
            }
            "IncludeStatementNode" => NodeKind::Include {
                path: Self::node(ast, field(map, "path")?)?,
                identifiers: Self::nodes(ast, array_field(map, "identifiers")?)?,
            },
            "TypeLiteral" => NodeKind::TypeLiteral {
                value: Self::type_with_shared(field(map, "type")?)?.0,
            },
            "BooleanLiteralExpressionNode" => NodeKind::BooleanLiteral {
                value: bool_field(map, "value")?,
            },
            "StringLiteralExpressionNode" => NodeKind::StringLiteral {
                value: str_field(map, "value")?.to_string(),
            },
            "NumberLiteralExpressionNode" => NodeKind::NumberLiteral {
                value: f64_field(map, "value")?,
            },
            "UnitNode" => NodeKind::UnitLiteral,
            "EnumerationLiteralExpressionNode" => NodeKind::EnumerationLiteral {
                actuals: Self::nodes(ast, array_field(map, "actuals")?)?,
                ty: Self::opt_type(field(map, "type")?)?,
            },
            "MapStatementNode" => {
                let key = ast.alloc(
                    pos.clone(),
                    NodeKind::Identifier {
                        name: str_field(map, "mapStatementIdentifier")?.to_string(),
                        symbol: None,
                    },
                );
                NodeKind::MapStatement {
                    key,
                    value: Self::node(ast, field(map, "value")?)?,
                }
            }
            "MapNode" => NodeKind::MapLiteral {
                body: Self::nodes(ast, array_field(map, "body")?)?,
                ty: Self::opt_type(field(map, "type")?)?,
            },
            "AssignExpressionNode" => {
                let dest = Self::node(ast, field(map, "dest")?)?;
                if !ast.tag(dest).is_lval() {
                    return Err(malformed("assignment target is not an lval"));
                }
                NodeKind::Assign {
                    dest,
                    value: Self::node(ast, field(map, "value")?)?,
                }
            }
            "VariableDeclarationNode" => NodeKind::VariableDeclaration {
                type_node: Self::node(ast, field(map, "typeNode")?)?,
                id: Self::node(ast, field(map, "identifier")?)?,
                value: Self::node(ast, field(map, "value")?)?,
                shared: bool_field(map, "shared")?,
            },
            "UninitializedVariableDeclarationNode" => NodeKind::UninitializedVariableDeclaration {
                type_node: Self::node(ast, field(map, "typeNode")?)?,
                id: Self::node(ast, field(map, "identifier")?)?,
            },
            "UseNode" => NodeKind::Use {
                ids: Self::nodes(ast, array_field(map, "identifiers")?)?,
            },
            "ReturnStatementNode" => NodeKind::Return {
                value: Self::opt_node(ast, field(map, "value")?)?,
            },
            "FunctionNode" => {
                let type_node = Self::node(ast, field(map, "typeNode")?)?;
                let mut formals = Vec::new();
                for formal in array_field(map, "formals")? {
                    let pair = formal
                        .as_array()
                        .filter(|p| p.len() == 2)
                        .ok_or_else(|| malformed("formal is not a [type, identifier] pair"))?;
                    formals.push(Formal {
                        type_node: Self::node(ast, &pair[0])?,
                        id: Self::node(ast, &pair[1])?,
                    });
                }
                let body = Self::nodes(ast, array_field(map, "body")?)?;
                let mut captured = Vec::new();
                for sym in array_field(map, "usedSymbols")? {
                    captured.push(Self::symbol(ast, sym)?);
                }
                NodeKind::Function {
                    type_node,
                    formals,
                    body,
                    captured,
                }
            }
            "ConstructorNode" => NodeKind::Constructor {
                name: str_field(map, "name")?.to_string(),
                func: Self::node(ast, field(map, "func")?)?,
                parent_constructors: Self::nodes(ast, array_field(map, "parentConstructors")?)?,
            },
            "TypeBodyNode" => NodeKind::TypeBody {
                declarations: Self::nodes(ast, array_field(map, "declarations")?)?,
                parents: Self::nodes(ast, array_field(map, "parents")?)?,
                constructors: Self::nodes(ast, array_field(map, "constructors")?)?,
                value: Self::opt_type(field(map, "type")?)?,
            },
            "CallExpressionNode" => NodeKind::Call {
                func: Self::node(ast, field(map, "func")?)?,
                args: Self::nodes(ast, array_field(map, "arguments")?)?,
                ty: None,
            },
            "DeferCallExpressionNode" => NodeKind::DeferCall {
                call: Self::node(ast, field(map, "call")?)?,
            },
            "AndNode" => NodeKind::And {
                left: Self::node(ast, field(map, "left")?)?,
                right: Self::node(ast, field(map, "right")?)?,
            },
            "OrNode" => NodeKind::Or {
                left: Self::node(ast, field(map, "left")?)?,
                right: Self::node(ast, field(map, "right")?)?,
            },
            "EqualsNode" => NodeKind::Equals {
                left: Self::node(ast, field(map, "left")?)?,
                right: Self::node(ast, field(map, "right")?)?,
            },
            "NotEqualsNode" => NodeKind::NotEquals {
                left: Self::node(ast, field(map, "left")?)?,
                right: Self::node(ast, field(map, "right")?)?,
            },
            "NumericComparisonExpressionNode" => {
                let comparison = Comparison::from_str(str_field(map, "comparisonType")?)
                    .ok_or_else(|| malformed("unknown comparisonType"))?;
                NodeKind::NumericComparison {
                    comparison,
                    left: Self::node(ast, field(map, "left")?)?,
                    right: Self::node(ast, field(map, "right")?)?,
                }
            }
            "AddNode" => NodeKind::Add {
                left: Self::node(ast, field(map, "left")?)?,
                right: Self::node(ast, field(map, "right")?)?,
                concatenation: bool_field(map, "concatenation")?,
            },
            "SubtractNode" => NodeKind::Subtract {
                left: Self::node(ast, field(map, "left")?)?,
                right: Self::node(ast, field(map, "right")?)?,
            },
            "MultiplyNode" => NodeKind::Multiply {
                left: Self::node(ast, field(map, "left")?)?,
                right: Self::node(ast, field(map, "right")?)?,
            },
            "DivideNode" => NodeKind::Divide {
                left: Self::node(ast, field(map, "left")?)?,
                right: Self::node(ast, field(map, "right")?)?,
            },
            "ModulusNode" => NodeKind::Modulus {
                left: Self::node(ast, field(map, "left")?)?,
                right: Self::node(ast, field(map, "right")?)?,
            },
            "PowerNode" => NodeKind::Power {
                left: Self::node(ast, field(map, "left")?)?,
                right: Self::node(ast, field(map, "right")?)?,
            },
            "NthRootNode" => NodeKind::NthRoot {
                left: Self::node(ast, field(map, "left")?)?,
                right: Self::node(ast, field(map, "right")?)?,
            },
            "NegativeExpressionNode" => NodeKind::Negative {
                exp: Self::node(ast, field(map, "expression")?)?,
            },
            "NotNode" => NodeKind::Not {
                exp: Self::node(ast, field(map, "expression")?)?,
            },
            "EnumerationStatement" => NodeKind::Enumerate {
                enumerable: Self::node(ast, field(map, "enumerable")?)?,
                local: Self::node(ast, field(map, "local")?)?,
                index: Self::opt_node(ast, field(map, "index")?)?,
                shared: bool_field(map, "shared")?,
                body: Self::nodes(ast, array_field(map, "body")?)?,
            },
            "WithStatement" => NodeKind::With {
                resource: Self::node(ast, field(map, "resource")?)?,
                local: Self::node(ast, field(map, "local")?)?,
                shared: bool_field(map, "shared")?,
                body: Self::nodes(ast, array_field(map, "body")?)?,
            },
            "IfStatement" => NodeKind::If {
                condition: Self::node(ast, field(map, "condition")?)?,
                body: Self::nodes(ast, array_field(map, "body")?)?,
            },
            "WhileStatement" => NodeKind::While {
                condition: Self::node(ast, field(map, "condition")?)?,
                body: Self::nodes(ast, array_field(map, "body")?)?,
            },
            "ContinueNode" => NodeKind::Continue,
            "BreakNode" => NodeKind::Break,
            other => return Err(malformed(format!("unknown astNodeName `{other}`"))),
        };

        Ok(ast.alloc(pos, kind))
    }
}
