//! The Swarm language core: typed AST, semantic analyses and the canonical
//! wire encoding.
//!
//! The pipeline through this crate is:
//!
//! ```text
//! untyped AST ──▶ name analysis ──▶ type analysis ──▶ typed AST
//!                                                        │
//!                              optimization passes ◀─────┤
//!                                                        ▼
//!                                           canonical JSON (serialize)
//! ```
//!
//! The front-end that produces the untyped AST is an external collaborator;
//! trees enter this crate either through the [`ast`] builders or through
//! [`serialize::deserialize`]. Everything downstream — the distributed queue,
//! the stores, the interpreter — consumes the typed AST produced here.

pub mod analysis;
pub mod ast;
pub mod optimize;
pub mod scope;
pub mod serialize;
pub mod symbol;
pub mod types;
pub mod walk;

pub use ast::{Ast, Node, NodeId, NodeKind, Tag};
pub use symbol::{Symbol, SymbolId, SymbolKind, Symbols};
pub use types::{Intrinsic, ObjectType, Primitive, Type};
