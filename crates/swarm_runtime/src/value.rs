//! Runtime values.
//!
//! Every value is self-contained: closures and type definitions carry their
//! defining subtree in a private AST pool (shared behind an `Rc`), so a
//! value can outlive the program tree it came from and can be serialized
//! for the shared store or a job result without extra context.
//!
//! The wire shape of a value is the canonical encoding of the literal node
//! it corresponds to (a number is a `NumberLiteralExpressionNode`, a map is
//! a `MapNode`, ...), which is what keeps the shared store readable by every
//! process regardless of which language front-end produced the program.

use std::fmt;
use std::rc::Rc;

use serde_json::{json, Value as Json};

use swarm_base::SwarmError;
use swarm_lang::ast::{Ast, NodeId, NodeKind};
use swarm_lang::serialize::{Deserializer, Serializer};
use swarm_lang::symbol::Symbol;
use swarm_lang::types::{ObjectType, Type};

/// A function value: the defining node in its own pool, the environment it
/// captured, and any arguments already applied.
#[derive(Debug, Clone)]
pub struct LambdaValue {
    pub ast: Rc<Ast>,
    /// The `Function` node inside `ast`.
    pub node: NodeId,
    /// Snapshot of the captured free variables at closure creation.
    pub captured: Vec<(Symbol, Value)>,
    /// Curried arguments applied so far.
    pub applied: Vec<Value>,
}

impl PartialEq for LambdaValue {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.ast, &other.ast)
            && self.node == other.node
            && self.applied == other.applied
    }
}

/// A constructible type definition: the object type plus its defining
/// `TypeBody` subtree, which holds the property initializers and
/// constructors needed at instantiation time.
#[derive(Debug, Clone)]
pub struct TypeDefValue {
    pub ty: ObjectType,
    pub ast: Rc<Ast>,
    /// The `TypeBody` node inside `ast`.
    pub node: NodeId,
}

impl PartialEq for TypeDefValue {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty
    }
}

/// An instantiated object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectValue {
    pub ty: ObjectType,
    pub properties: Vec<(String, Value)>,
}

impl ObjectValue {
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn set_property(&mut self, name: &str, value: Value) {
        match self.properties.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.properties.push((name.to_string(), value)),
        }
    }
}

/// A prologue resource participating in scoped acquisition.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    /// File-backed string contents; opened by `with`, written back on exit.
    FileContents { path: String },
}

/// What an expression evaluates to.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Unit,
    Boolean(bool),
    Number(f64),
    Str(String),
    Enumeration(Vec<Value>),
    /// Insertion-ordered string-keyed entries; lookup ignores the order.
    Map(Vec<(String, Value)>),
    Lambda(LambdaValue),
    TypeDef(TypeDefValue),
    Object(ObjectValue),
    Type(Type),
    /// A built-in function, named into the prologue registry.
    Host(String),
    Resource(Resource),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Enumeration(_) => "enumerable",
            Value::Map(_) => "map",
            Value::Lambda(_) => "function",
            Value::TypeDef(_) | Value::Type(_) => "type",
            Value::Object(_) => "object",
            Value::Host(_) => "builtin",
            Value::Resource(_) => "resource",
        }
    }

    pub fn map_get<'a>(entries: &'a [(String, Value)], key: &str) -> Option<&'a Value> {
        entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn map_set(entries: &mut Vec<(String, Value)>, key: &str, value: Value) {
        match entries.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => entries.push((key.to_string(), value)),
        }
    }

    /// Encodes this value as the canonical JSON of its literal node.
    pub fn encode(&self) -> Result<Json, SwarmError> {
        // Synthesized values have no source counterpart.
        fn position() -> Json {
            json!({ "startLine": 0, "endLine": 0, "startCol": 0, "endCol": 0 })
        }
        Ok(match self {
            Value::Unit => json!({
                "astNodeName": "UnitNode",
                "position": position(),
            }),
            Value::Boolean(value) => json!({
                "astNodeName": "BooleanLiteralExpressionNode",
                "position": position(),
                "value": value,
            }),
            Value::Number(value) => {
                let number = serde_json::Number::from_f64(*value).ok_or_else(|| {
                    SwarmError::serialization(format!(
                        "number {value} has no JSON representation"
                    ))
                })?;
                json!({
                    "astNodeName": "NumberLiteralExpressionNode",
                    "position": position(),
                    "value": number,
                })
            }
            Value::Str(value) => json!({
                "astNodeName": "StringLiteralExpressionNode",
                "position": position(),
                "value": value,
            }),
            Value::Enumeration(items) => {
                let actuals = items
                    .iter()
                    .map(|v| v.encode())
                    .collect::<Result<Vec<_>, _>>()?;
                json!({
                    "astNodeName": "EnumerationLiteralExpressionNode",
                    "position": position(),
                    "actuals": actuals,
                    "type": Json::Null,
                })
            }
            Value::Map(entries) => {
                let mut body = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    body.push(json!({
                        "astNodeName": "MapStatementNode",
                        "position": position(),
                        "mapStatementIdentifier": key,
                        "value": value.encode()?,
                    }));
                }
                json!({
                    "astNodeName": "MapNode",
                    "position": position(),
                    "body": body,
                    "type": Json::Null,
                })
            }
            Value::Lambda(lambda) => {
                let mut node = Serializer::node_to_value(&lambda.ast, lambda.node)?;
                let map = node.as_object_mut().expect("function encodes to an object");
                let mut captured = Vec::with_capacity(lambda.captured.len());
                for (symbol, value) in &lambda.captured {
                    captured.push(json!([Serializer::symbol_to_value(symbol), value.encode()?]));
                }
                map.insert("capturedValues".into(), Json::Array(captured));
                map.insert(
                    "appliedValues".into(),
                    Json::Array(
                        lambda
                            .applied
                            .iter()
                            .map(|v| v.encode())
                            .collect::<Result<Vec<_>, _>>()?,
                    ),
                );
                node
            }
            Value::TypeDef(def) => Serializer::node_to_value(&def.ast, def.node)?,
            Value::Object(object) => {
                let mut properties = Vec::with_capacity(object.properties.len());
                for (name, value) in &object.properties {
                    properties.push(json!([name, value.encode()?]));
                }
                json!({
                    "astNodeName": "ObjectValueNode",
                    "position": position(),
                    "type": Serializer::type_to_value(&Type::Object(object.ty.clone()), false),
                    "properties": properties,
                })
            }
            Value::Type(ty) => json!({
                "astNodeName": "TypeLiteral",
                "position": position(),
                "type": Serializer::type_to_value(ty, false),
            }),
            Value::Host(name) => json!({
                "astNodeName": "PrologueFunctionNode",
                "position": position(),
                "name": name,
            }),
            Value::Resource(Resource::FileContents { path }) => json!({
                "astNodeName": "PrologueResourceNode",
                "position": position(),
                "resource": "fileContents",
                "path": path,
            }),
        })
    }

    pub fn encode_string(&self) -> Result<String, SwarmError> {
        serde_json::to_string(&self.encode()?)
            .map_err(|e| SwarmError::serialization(e.to_string()))
    }

    /// Decodes a value from its literal-node JSON.
    pub fn decode(json: &Json) -> Result<Value, SwarmError> {
        let malformed = |m: &str| SwarmError::serialization(m.to_string());
        let map = json
            .as_object()
            .ok_or_else(|| malformed("value is not an object"))?;
        let name = map
            .get("astNodeName")
            .and_then(|n| n.as_str())
            .ok_or_else(|| malformed("value has no astNodeName"))?;

        Ok(match name {
            "UnitNode" => Value::Unit,
            "BooleanLiteralExpressionNode" => Value::Boolean(
                map.get("value")
                    .and_then(|v| v.as_bool())
                    .ok_or_else(|| malformed("boolean literal without a boolean"))?,
            ),
            "NumberLiteralExpressionNode" => Value::Number(
                map.get("value")
                    .and_then(|v| v.as_f64())
                    .ok_or_else(|| malformed("number literal without a number"))?,
            ),
            "StringLiteralExpressionNode" => Value::Str(
                map.get("value")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| malformed("string literal without a string"))?
                    .to_string(),
            ),
            "EnumerationLiteralExpressionNode" => {
                let actuals = map
                    .get("actuals")
                    .and_then(|v| v.as_array())
                    .ok_or_else(|| malformed("enumeration literal without actuals"))?;
                Value::Enumeration(
                    actuals
                        .iter()
                        .map(Value::decode)
                        .collect::<Result<Vec<_>, _>>()?,
                )
            }
            "MapNode" => {
                let body = map
                    .get("body")
                    .and_then(|v| v.as_array())
                    .ok_or_else(|| malformed("map literal without a body"))?;
                let mut entries = Vec::with_capacity(body.len());
                for stmt in body {
                    let stmt = stmt
                        .as_object()
                        .ok_or_else(|| malformed("map entry is not an object"))?;
                    let key = stmt
                        .get("mapStatementIdentifier")
                        .and_then(|v| v.as_str())
                        .ok_or_else(|| malformed("map entry without a key"))?;
                    let value = stmt
                        .get("value")
                        .ok_or_else(|| malformed("map entry without a value"))?;
                    entries.push((key.to_string(), Value::decode(value)?));
                }
                Value::Map(entries)
            }
            "FunctionNode" => {
                let mut ast = Ast::new();
                let node = Deserializer::node(&mut ast, json)?;
                let mut captured = Vec::new();
                if let Some(entries) = map.get("capturedValues").and_then(|v| v.as_array()) {
                    for entry in entries {
                        let pair = entry
                            .as_array()
                            .filter(|p| p.len() == 2)
                            .ok_or_else(|| malformed("captured entry is not a pair"))?;
                        let id = Deserializer::symbol(&mut ast, &pair[0])?;
                        captured.push((ast.symbols.get(id).clone(), Value::decode(&pair[1])?));
                    }
                }
                let applied = match map.get("appliedValues").and_then(|v| v.as_array()) {
                    Some(values) => values
                        .iter()
                        .map(Value::decode)
                        .collect::<Result<Vec<_>, _>>()?,
                    None => Vec::new(),
                };
                Value::Lambda(LambdaValue {
                    ast: Rc::new(ast),
                    node,
                    captured,
                    applied,
                })
            }
            "TypeBodyNode" => {
                let mut ast = Ast::new();
                let node = Deserializer::node(&mut ast, json)?;
                let ty = match ast.kind(node) {
                    NodeKind::TypeBody {
                        value: Some(Type::Object(obj)),
                        ..
                    } => obj.clone(),
                    _ => return Err(malformed("type body value without an object type")),
                };
                Value::TypeDef(TypeDefValue {
                    ty,
                    ast: Rc::new(ast),
                    node,
                })
            }
            "ObjectValueNode" => {
                let ty = map
                    .get("type")
                    .ok_or_else(|| malformed("object value without a type"))?;
                let ty = match Deserializer::type_with_shared(ty)?.0 {
                    Type::Object(obj) => obj,
                    _ => return Err(malformed("object value with a non-object type")),
                };
                let entries = map
                    .get("properties")
                    .and_then(|v| v.as_array())
                    .ok_or_else(|| malformed("object value without properties"))?;
                let mut properties = Vec::with_capacity(entries.len());
                for entry in entries {
                    let pair = entry
                        .as_array()
                        .filter(|p| p.len() == 2)
                        .ok_or_else(|| malformed("object property is not a pair"))?;
                    let name = pair[0]
                        .as_str()
                        .ok_or_else(|| malformed("object property name is not a string"))?;
                    properties.push((name.to_string(), Value::decode(&pair[1])?));
                }
                Value::Object(ObjectValue { ty, properties })
            }
            "TypeLiteral" => {
                let ty = map
                    .get("type")
                    .ok_or_else(|| malformed("type literal without a type"))?;
                Value::Type(Deserializer::type_with_shared(ty)?.0)
            }
            "PrologueFunctionNode" => Value::Host(
                map.get("name")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| malformed("prologue function without a name"))?
                    .to_string(),
            ),
            "PrologueResourceNode" => Value::Resource(Resource::FileContents {
                path: map
                    .get("path")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| malformed("resource without a path"))?
                    .to_string(),
            }),
            other => {
                return Err(malformed(&format!("`{other}` does not encode a value")));
            }
        })
    }

    pub fn decode_string(input: &str) -> Result<Value, SwarmError> {
        let json: Json = serde_json::from_str(input)
            .map_err(|e| SwarmError::serialization(e.to_string()))?;
        Value::decode(&json)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            Value::Str(s) => write!(f, "{s}"),
            Value::Enumeration(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Map(entries) => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            Value::Lambda(_) => write!(f, "<function>"),
            Value::TypeDef(def) => write!(f, "<type {}>", def.ty.name),
            Value::Object(obj) => write!(f, "<{} instance>", obj.ty.name),
            Value::Type(ty) => write!(f, "<type {ty}>"),
            Value::Host(name) => write!(f, "<builtin {name}>"),
            Value::Resource(Resource::FileContents { path }) => {
                write!(f, "<resource fileContents {path}>")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_values_round_trip() {
        for value in [
            Value::Unit,
            Value::Boolean(true),
            Value::Number(48.9),
            Value::Str("y".into()),
        ] {
            let encoded = value.encode_string().unwrap();
            assert_eq!(Value::decode_string(&encoded).unwrap(), value);
        }
    }

    #[test]
    fn aggregate_values_round_trip() {
        let value = Value::Map(vec![
            ("a".into(), Value::Str("x".into())),
            ("b".into(), Value::Enumeration(vec![Value::Number(1.0), Value::Number(2.0)])),
        ]);
        let encoded = value.encode_string().unwrap();
        assert_eq!(Value::decode_string(&encoded).unwrap(), value);
    }

    #[test]
    fn map_set_replaces_existing_keys() {
        let mut entries = vec![("a".into(), Value::Number(1.0))];
        Value::map_set(&mut entries, "a", Value::Number(2.0));
        Value::map_set(&mut entries, "b", Value::Number(3.0));
        assert_eq!(entries.len(), 2);
        assert_eq!(Value::map_get(&entries, "a"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn number_display_drops_integral_fraction() {
        assert_eq!(Value::Number(42.0).to_string(), "42");
        assert_eq!(Value::Number(48.9).to_string(), "48.9");
    }
}
