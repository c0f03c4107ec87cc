//! Canonical JSON encoding of AST subtrees.
//!
//! Every node becomes an object carrying `astNodeName`, `position` and its
//! tag-specific fields. Identifiers embed the full symbol record; the first
//! occurrence of a symbol UUID on decode is authoritative and later
//! occurrences reference-share that record. Types are encoded by integer
//! `valueType` tag with recursive `concrete` (generics) and
//! `arguments`/`return` (lambdas) fields plus a `shared` flag, which is how
//! a symbol's storage class travels on the wire.
//!
//! The encoding is canonical: object keys are emitted in sorted order and
//! every field is derived deterministically from the tree, so
//! `encode(decode(s)) == s` byte for byte.

mod decode;
mod encode;
mod symbols;

pub use decode::{deserialize, Deserializer};
pub use encode::Serializer;
pub use symbols::{SymbolMap, SymbolWalk};

use crate::ast::Tag;

/// Integer tags for types on the wire.
pub(crate) mod value_type {
    pub const BOOLEAN: u64 = 0;
    pub const NUMBER: u64 = 1;
    pub const STRING: u64 = 2;
    pub const VOID: u64 = 3;
    pub const TYPE: u64 = 4;
    pub const UNIT: u64 = 5;
    pub const ERROR: u64 = 6;
    pub const ENUMERABLE: u64 = 7;
    pub const MAP: u64 = 8;
    pub const LAMBDA: u64 = 9;
    pub const OBJECT: u64 = 10;
    pub const AMBIGUOUS: u64 = 11;
}

/// Symbol kinds on the wire.
pub(crate) mod symbol_kind {
    pub const VARIABLE: u64 = 0;
    pub const FUNCTION: u64 = 1;
}

/// The `astNodeName` string for each tag.
pub fn tag_name(tag: Tag) -> &'static str {
    match tag {
        Tag::Program => "ProgramNode",
        Tag::ExpressionStatement => "ExpressionStatementNode",
        Tag::Identifier => "IdentifierNode",
        Tag::EnumerableAccess => "EnumerableAccessNode",
        Tag::EnumerableAppend => "EnumerableAppendNode",
        Tag::MapAccess => "MapAccessNode",
        Tag::ClassAccess => "ClassAccessNode",
        Tag::Include => "IncludeStatementNode",
        Tag::TypeLiteral => "TypeLiteral",
        Tag::BooleanLiteral => "BooleanLiteralExpressionNode",
        Tag::StringLiteral => "StringLiteralExpressionNode",
        Tag::NumberLiteral => "NumberLiteralExpressionNode",
        Tag::UnitLiteral => "UnitNode",
        Tag::EnumerationLiteral => "EnumerationLiteralExpressionNode",
        Tag::MapStatement => "MapStatementNode",
        Tag::MapLiteral => "MapNode",
        Tag::Assign => "AssignExpressionNode",
        Tag::VariableDeclaration => "VariableDeclarationNode",
        Tag::UninitializedVariableDeclaration => "UninitializedVariableDeclarationNode",
        Tag::Use => "UseNode",
        Tag::Return => "ReturnStatementNode",
        Tag::Function => "FunctionNode",
        Tag::Constructor => "ConstructorNode",
        Tag::TypeBody => "TypeBodyNode",
        Tag::Call => "CallExpressionNode",
        Tag::DeferCall => "DeferCallExpressionNode",
        Tag::And => "AndNode",
        Tag::Or => "OrNode",
        Tag::Equals => "EqualsNode",
        Tag::NumericComparison => "NumericComparisonExpressionNode",
        Tag::NotEquals => "NotEqualsNode",
        Tag::Add => "AddNode",
        Tag::Subtract => "SubtractNode",
        Tag::Multiply => "MultiplyNode",
        Tag::Divide => "DivideNode",
        Tag::Modulus => "ModulusNode",
        Tag::Power => "PowerNode",
        Tag::NthRoot => "NthRootNode",
        Tag::Negative => "NegativeExpressionNode",
        Tag::Not => "NotNode",
        Tag::Enumerate => "EnumerationStatement",
        Tag::With => "WithStatement",
        Tag::If => "IfStatement",
        Tag::While => "WhileStatement",
        Tag::Continue => "ContinueNode",
        Tag::Break => "BreakNode",
    }
}
