//! The Swarm AST: a tagged node pool with typed handles.
//!
//! Nodes live in an [`Ast`] pool and reference one another by [`NodeId`].
//! The pool also owns the [`Symbols`] registry for the tree, so a single
//! `&Ast` is enough context to inspect, serialize or evaluate a program.
//! Dropping the pool drops every node at once; there is no per-node
//! reference counting.
//!
//! The tree is a DAG rooted at a `Program` node. Construction happens either
//! through the front-end seam (builders here) or through the deserializer.

use swarm_base::Position;

use crate::symbol::{SymbolId, Symbols};
use crate::types::Type;

/// Handle to a node inside an [`Ast`] pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The `>`, `>=`, `<`, `<=` family, kept on one node tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl Comparison {
    pub fn as_str(self) -> &'static str {
        match self {
            Comparison::LessThan => "LESS_THAN",
            Comparison::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
            Comparison::GreaterThan => "GREATER_THAN",
            Comparison::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
        }
    }

    pub fn from_str(s: &str) -> Option<Comparison> {
        match s {
            "LESS_THAN" => Some(Comparison::LessThan),
            "LESS_THAN_OR_EQUAL" => Some(Comparison::LessThanOrEqual),
            "GREATER_THAN" => Some(Comparison::GreaterThan),
            "GREATER_THAN_OR_EQUAL" => Some(Comparison::GreaterThanOrEqual),
            _ => None,
        }
    }

    pub fn evaluate(self, left: f64, right: f64) -> bool {
        match self {
            Comparison::LessThan => left < right,
            Comparison::LessThanOrEqual => left <= right,
            Comparison::GreaterThan => left > right,
            Comparison::GreaterThanOrEqual => left >= right,
        }
    }
}

/// One formal parameter: its declared type literal and its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Formal {
    pub type_node: NodeId,
    pub id: NodeId,
}

/// The node variants.
///
/// Child links are always `NodeId`s into the owning pool. Fields filled by
/// the analyses (`symbol`, `ty`, `concatenation`, `captured`) start empty.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Program {
        body: Vec<NodeId>,
    },
    ExpressionStatement {
        expression: NodeId,
    },
    Identifier {
        name: String,
        /// Bound by name analysis; identifiers used as map keys or class
        /// member names stay unbound by design.
        symbol: Option<SymbolId>,
    },
    EnumerableAccess {
        path: NodeId,
        index: NodeId,
    },
    EnumerableAppend {
        path: NodeId,
    },
    MapAccess {
        path: NodeId,
        /// Bare key identifier, not resolved against any scope.
        end: NodeId,
    },
    ClassAccess {
        path: NodeId,
        /// Member name identifier, resolved against the object's property
        /// set rather than the scope chain.
        end: NodeId,
    },
    Include {
        path: NodeId,
        identifiers: Vec<NodeId>,
    },
    TypeLiteral {
        value: Type,
    },
    BooleanLiteral {
        value: bool,
    },
    StringLiteral {
        value: String,
    },
    NumberLiteral {
        value: f64,
    },
    UnitLiteral,
    EnumerationLiteral {
        actuals: Vec<NodeId>,
        /// Element type, from an `of` clause or inference.
        ty: Option<Type>,
    },
    MapStatement {
        key: NodeId,
        value: NodeId,
    },
    MapLiteral {
        body: Vec<NodeId>,
        ty: Option<Type>,
    },
    Assign {
        dest: NodeId,
        value: NodeId,
    },
    VariableDeclaration {
        type_node: NodeId,
        id: NodeId,
        value: NodeId,
        shared: bool,
    },
    UninitializedVariableDeclaration {
        type_node: NodeId,
        id: NodeId,
    },
    Use {
        ids: Vec<NodeId>,
    },
    Return {
        value: Option<NodeId>,
    },
    Function {
        type_node: NodeId,
        formals: Vec<Formal>,
        body: Vec<NodeId>,
        /// Free variables of the body, recorded by name analysis for closure
        /// construction.
        captured: Vec<SymbolId>,
    },
    Constructor {
        name: String,
        func: NodeId,
        parent_constructors: Vec<NodeId>,
    },
    TypeBody {
        declarations: Vec<NodeId>,
        parents: Vec<NodeId>,
        constructors: Vec<NodeId>,
        /// The object type this body denotes, built during name analysis.
        value: Option<Type>,
    },
    Call {
        func: NodeId,
        args: Vec<NodeId>,
        /// Result type, filled by type analysis.
        ty: Option<Type>,
    },
    DeferCall {
        call: NodeId,
    },
    And {
        left: NodeId,
        right: NodeId,
    },
    Or {
        left: NodeId,
        right: NodeId,
    },
    Equals {
        left: NodeId,
        right: NodeId,
    },
    NumericComparison {
        comparison: Comparison,
        left: NodeId,
        right: NodeId,
    },
    NotEquals {
        left: NodeId,
        right: NodeId,
    },
    Add {
        left: NodeId,
        right: NodeId,
        /// Set by type analysis when both operands are strings.
        concatenation: bool,
    },
    Subtract {
        left: NodeId,
        right: NodeId,
    },
    Multiply {
        left: NodeId,
        right: NodeId,
    },
    Divide {
        left: NodeId,
        right: NodeId,
    },
    Modulus {
        left: NodeId,
        right: NodeId,
    },
    Power {
        left: NodeId,
        right: NodeId,
    },
    NthRoot {
        left: NodeId,
        right: NodeId,
    },
    Negative {
        exp: NodeId,
    },
    Not {
        exp: NodeId,
    },
    Enumerate {
        enumerable: NodeId,
        local: NodeId,
        index: Option<NodeId>,
        shared: bool,
        body: Vec<NodeId>,
    },
    With {
        resource: NodeId,
        local: NodeId,
        shared: bool,
        body: Vec<NodeId>,
    },
    If {
        condition: NodeId,
        body: Vec<NodeId>,
    },
    While {
        condition: NodeId,
        body: Vec<NodeId>,
    },
    Continue,
    Break,
}

/// Node tags, one per [`NodeKind`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Program,
    ExpressionStatement,
    Identifier,
    EnumerableAccess,
    EnumerableAppend,
    MapAccess,
    ClassAccess,
    Include,
    TypeLiteral,
    BooleanLiteral,
    StringLiteral,
    NumberLiteral,
    UnitLiteral,
    EnumerationLiteral,
    MapStatement,
    MapLiteral,
    Assign,
    VariableDeclaration,
    UninitializedVariableDeclaration,
    Use,
    Return,
    Function,
    Constructor,
    TypeBody,
    Call,
    DeferCall,
    And,
    Or,
    Equals,
    NumericComparison,
    NotEquals,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,
    Power,
    NthRoot,
    Negative,
    Not,
    Enumerate,
    With,
    If,
    While,
    Continue,
    Break,
}

impl Tag {
    pub fn is_statement(self) -> bool {
        matches!(
            self,
            Tag::ExpressionStatement
                | Tag::VariableDeclaration
                | Tag::UninitializedVariableDeclaration
                | Tag::Use
                | Tag::Include
                | Tag::Return
                | Tag::Constructor
                | Tag::Enumerate
                | Tag::With
                | Tag::If
                | Tag::While
                | Tag::Continue
                | Tag::Break
        )
    }

    pub fn is_expression(self) -> bool {
        matches!(
            self,
            Tag::Identifier
                | Tag::EnumerableAccess
                | Tag::EnumerableAppend
                | Tag::MapAccess
                | Tag::ClassAccess
                | Tag::TypeLiteral
                | Tag::BooleanLiteral
                | Tag::StringLiteral
                | Tag::NumberLiteral
                | Tag::UnitLiteral
                | Tag::EnumerationLiteral
                | Tag::MapLiteral
                | Tag::Assign
                | Tag::Function
                | Tag::TypeBody
                | Tag::Call
                | Tag::DeferCall
                | Tag::And
                | Tag::Or
                | Tag::Equals
                | Tag::NumericComparison
                | Tag::NotEquals
                | Tag::Add
                | Tag::Subtract
                | Tag::Multiply
                | Tag::Divide
                | Tag::Modulus
                | Tag::Power
                | Tag::NthRoot
                | Tag::Negative
                | Tag::Not
        )
    }

    pub fn is_lval(self) -> bool {
        matches!(
            self,
            Tag::Identifier
                | Tag::EnumerableAccess
                | Tag::EnumerableAppend
                | Tag::MapAccess
                | Tag::ClassAccess
        )
    }

    /// Literal nodes that are already values.
    pub fn is_value(self) -> bool {
        matches!(
            self,
            Tag::BooleanLiteral
                | Tag::StringLiteral
                | Tag::NumberLiteral
                | Tag::UnitLiteral
                | Tag::EnumerationLiteral
                | Tag::MapLiteral
        )
    }

    pub fn is_type(self) -> bool {
        matches!(self, Tag::TypeLiteral | Tag::TypeBody)
    }

    pub fn is_block(self) -> bool {
        matches!(self, Tag::Enumerate | Tag::With | Tag::If | Tag::While)
    }
}

impl NodeKind {
    pub fn tag(&self) -> Tag {
        match self {
            NodeKind::Program { .. } => Tag::Program,
            NodeKind::ExpressionStatement { .. } => Tag::ExpressionStatement,
            NodeKind::Identifier { .. } => Tag::Identifier,
            NodeKind::EnumerableAccess { .. } => Tag::EnumerableAccess,
            NodeKind::EnumerableAppend { .. } => Tag::EnumerableAppend,
            NodeKind::MapAccess { .. } => Tag::MapAccess,
            NodeKind::ClassAccess { .. } => Tag::ClassAccess,
            NodeKind::Include { .. } => Tag::Include,
            NodeKind::TypeLiteral { .. } => Tag::TypeLiteral,
            NodeKind::BooleanLiteral { .. } => Tag::BooleanLiteral,
            NodeKind::StringLiteral { .. } => Tag::StringLiteral,
            NodeKind::NumberLiteral { .. } => Tag::NumberLiteral,
            NodeKind::UnitLiteral => Tag::UnitLiteral,
            NodeKind::EnumerationLiteral { .. } => Tag::EnumerationLiteral,
            NodeKind::MapStatement { .. } => Tag::MapStatement,
            NodeKind::MapLiteral { .. } => Tag::MapLiteral,
            NodeKind::Assign { .. } => Tag::Assign,
            NodeKind::VariableDeclaration { .. } => Tag::VariableDeclaration,
            NodeKind::UninitializedVariableDeclaration { .. } => {
                Tag::UninitializedVariableDeclaration
            }
            NodeKind::Use { .. } => Tag::Use,
            NodeKind::Return { .. } => Tag::Return,
            NodeKind::Function { .. } => Tag::Function,
            NodeKind::Constructor { .. } => Tag::Constructor,
            NodeKind::TypeBody { .. } => Tag::TypeBody,
            NodeKind::Call { .. } => Tag::Call,
            NodeKind::DeferCall { .. } => Tag::DeferCall,
            NodeKind::And { .. } => Tag::And,
            NodeKind::Or { .. } => Tag::Or,
            NodeKind::Equals { .. } => Tag::Equals,
            NodeKind::NumericComparison { .. } => Tag::NumericComparison,
            NodeKind::NotEquals { .. } => Tag::NotEquals,
            NodeKind::Add { .. } => Tag::Add,
            NodeKind::Subtract { .. } => Tag::Subtract,
            NodeKind::Multiply { .. } => Tag::Multiply,
            NodeKind::Divide { .. } => Tag::Divide,
            NodeKind::Modulus { .. } => Tag::Modulus,
            NodeKind::Power { .. } => Tag::Power,
            NodeKind::NthRoot { .. } => Tag::NthRoot,
            NodeKind::Negative { .. } => Tag::Negative,
            NodeKind::Not { .. } => Tag::Not,
            NodeKind::Enumerate { .. } => Tag::Enumerate,
            NodeKind::With { .. } => Tag::With,
            NodeKind::If { .. } => Tag::If,
            NodeKind::While { .. } => Tag::While,
            NodeKind::Continue => Tag::Continue,
            NodeKind::Break => Tag::Break,
        }
    }
}

/// One AST node: a position plus its tagged payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub pos: Position,
    pub kind: NodeKind,
}

/// The node pool. Owns every node and the symbol registry of the tree.
#[derive(Debug, Default, Clone)]
pub struct Ast {
    nodes: Vec<Node>,
    pub symbols: Symbols,
    next_constructor: usize,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, pos: Position, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { pos, kind });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.index()].kind
    }

    pub fn pos(&self, id: NodeId) -> &Position {
        &self.nodes[id.index()].pos
    }

    pub fn tag(&self, id: NodeId) -> Tag {
        self.kind(id).tag()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Handles to every node, in allocation order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// The identifier's name. Panics on non-identifier nodes; call sites
    /// guard with the tag.
    pub fn identifier_name(&self, id: NodeId) -> &str {
        match self.kind(id) {
            NodeKind::Identifier { name, .. } => name,
            other => panic!("identifier_name on {:?}", other.tag()),
        }
    }

    pub fn identifier_symbol(&self, id: NodeId) -> Option<SymbolId> {
        match self.kind(id) {
            NodeKind::Identifier { symbol, .. } => *symbol,
            _ => None,
        }
    }

    pub fn bind_identifier(&mut self, id: NodeId, symbol: SymbolId) {
        if let NodeKind::Identifier { symbol: slot, .. } = self.kind_mut(id) {
            *slot = Some(symbol);
        }
    }

    /// Whether the lval ultimately names a shared symbol. Recurses through
    /// access paths to the leftmost identifier.
    pub fn lval_is_shared(&self, id: NodeId) -> bool {
        match self.kind(id) {
            NodeKind::Identifier { symbol, .. } => symbol
                .map(|s| self.symbols.get(s).shared)
                .unwrap_or(false),
            NodeKind::EnumerableAccess { path, .. }
            | NodeKind::EnumerableAppend { path }
            | NodeKind::MapAccess { path, .. }
            | NodeKind::ClassAccess { path, .. } => self.lval_is_shared(*path),
            _ => false,
        }
    }

    /// The leftmost identifier of an lval chain, i.e. the symbol whose
    /// aggregate a read-modify-write must lock.
    pub fn lval_root_symbol(&self, id: NodeId) -> Option<SymbolId> {
        match self.kind(id) {
            NodeKind::Identifier { symbol, .. } => *symbol,
            NodeKind::EnumerableAccess { path, .. }
            | NodeKind::EnumerableAppend { path }
            | NodeKind::MapAccess { path, .. }
            | NodeKind::ClassAccess { path, .. } => self.lval_root_symbol(*path),
            _ => None,
        }
    }

    /// Builds a type body from its raw declaration list, partitioning out
    /// `use` parents and constructors the way the grammar interleaves them.
    ///
    /// Only single inheritance is supported: at most one parent clause, each
    /// naming at most one identifier. A body without user constructors gets a
    /// synthesized zero-argument constructor returning void.
    pub fn type_body(
        &mut self,
        pos: Position,
        decls: Vec<NodeId>,
    ) -> Result<NodeId, String> {
        let mut declarations = Vec::new();
        let mut parents = Vec::new();
        let mut constructors = Vec::new();

        for decl in decls {
            match self.tag(decl) {
                Tag::Constructor => constructors.push(decl),
                Tag::Use => parents.push(decl),
                _ => declarations.push(decl),
            }
        }

        let parent_ids = parents
            .iter()
            .map(|&p| match self.kind(p) {
                NodeKind::Use { ids } => ids.len(),
                _ => 0,
            })
            .sum::<usize>();
        if parents.len() > 1 || parent_ids > 1 {
            return Err(format!("{pos} only single inheritance is supported"));
        }

        if constructors.is_empty() {
            let type_node = self.alloc(
                pos.clone(),
                NodeKind::TypeLiteral {
                    value: Type::lambda_of(&[], Type::VOID),
                },
            );
            let func = self.alloc(
                pos.clone(),
                NodeKind::Function {
                    type_node,
                    formals: Vec::new(),
                    body: Vec::new(),
                    captured: Vec::new(),
                },
            );
            constructors.push(self.constructor(pos.clone(), func, Vec::new()));
        }

        Ok(self.alloc(
            pos,
            NodeKind::TypeBody {
                declarations,
                parents,
                constructors,
                value: None,
            },
        ))
    }

    /// Allocates a constructor with a process-stable generated name.
    pub fn constructor(
        &mut self,
        pos: Position,
        func: NodeId,
        parent_constructors: Vec<NodeId>,
    ) -> NodeId {
        self.next_constructor += 1;
        let name = format!("constructor{}", self.next_constructor);
        self.alloc(
            pos,
            NodeKind::Constructor {
                name,
                func,
                parent_constructors,
            },
        )
    }

    /// Deep-copies the subtree rooted at `root` into a fresh, self-contained
    /// pool. Symbols referenced by the subtree are cloned into the new
    /// pool's registry, deduplicated by UUID, so the result can outlive (or
    /// travel without) the source tree. This is how closures capture their
    /// bodies.
    pub fn extract_subtree(&self, root: NodeId) -> (Ast, NodeId) {
        let mut dest = Ast::new();
        dest.next_constructor = self.next_constructor;
        let new_root = self.copy_into(root, &mut dest);
        (dest, new_root)
    }

    fn copy_symbol(&self, symbol: SymbolId, dest: &mut Ast) -> SymbolId {
        dest.symbols.intern(self.symbols.get(symbol).clone())
    }

    fn copy_all(&self, nodes: &[NodeId], dest: &mut Ast) -> Vec<NodeId> {
        nodes.iter().map(|&n| self.copy_into(n, dest)).collect()
    }

    fn copy_into(&self, node: NodeId, dest: &mut Ast) -> NodeId {
        let pos = self.pos(node).clone();
        let kind = match self.kind(node) {
            NodeKind::Program { body } => NodeKind::Program {
                body: self.copy_all(body, dest),
            },
            NodeKind::ExpressionStatement { expression } => NodeKind::ExpressionStatement {
                expression: self.copy_into(*expression, dest),
            },
            NodeKind::Identifier { name, symbol } => NodeKind::Identifier {
                name: name.clone(),
                symbol: symbol.map(|s| self.copy_symbol(s, dest)),
            },
            NodeKind::EnumerableAccess { path, index } => NodeKind::EnumerableAccess {
                path: self.copy_into(*path, dest),
                index: self.copy_into(*index, dest),
            },
            NodeKind::EnumerableAppend { path } => NodeKind::EnumerableAppend {
                path: self.copy_into(*path, dest),
            },
            NodeKind::MapAccess { path, end } => NodeKind::MapAccess {
                path: self.copy_into(*path, dest),
                end: self.copy_into(*end, dest),
            },
            NodeKind::ClassAccess { path, end } => NodeKind::ClassAccess {
                path: self.copy_into(*path, dest),
                end: self.copy_into(*end, dest),
            },
            NodeKind::Include { path, identifiers } => NodeKind::Include {
                path: self.copy_into(*path, dest),
                identifiers: self.copy_all(identifiers, dest),
            },
            NodeKind::TypeLiteral { value } => NodeKind::TypeLiteral {
                value: value.clone(),
            },
            NodeKind::BooleanLiteral { value } => NodeKind::BooleanLiteral { value: *value },
            NodeKind::StringLiteral { value } => NodeKind::StringLiteral {
                value: value.clone(),
            },
            NodeKind::NumberLiteral { value } => NodeKind::NumberLiteral { value: *value },
            NodeKind::UnitLiteral => NodeKind::UnitLiteral,
            NodeKind::EnumerationLiteral { actuals, ty } => NodeKind::EnumerationLiteral {
                actuals: self.copy_all(actuals, dest),
                ty: ty.clone(),
            },
            NodeKind::MapStatement { key, value } => NodeKind::MapStatement {
                key: self.copy_into(*key, dest),
                value: self.copy_into(*value, dest),
            },
            NodeKind::MapLiteral { body, ty } => NodeKind::MapLiteral {
                body: self.copy_all(body, dest),
                ty: ty.clone(),
            },
            NodeKind::Assign { dest: d, value } => NodeKind::Assign {
                dest: self.copy_into(*d, dest),
                value: self.copy_into(*value, dest),
            },
            NodeKind::VariableDeclaration {
                type_node,
                id,
                value,
                shared,
            } => NodeKind::VariableDeclaration {
                type_node: self.copy_into(*type_node, dest),
                id: self.copy_into(*id, dest),
                value: self.copy_into(*value, dest),
                shared: *shared,
            },
            NodeKind::UninitializedVariableDeclaration { type_node, id } => {
                NodeKind::UninitializedVariableDeclaration {
                    type_node: self.copy_into(*type_node, dest),
                    id: self.copy_into(*id, dest),
                }
            }
            NodeKind::Use { ids } => NodeKind::Use {
                ids: self.copy_all(ids, dest),
            },
            NodeKind::Return { value } => NodeKind::Return {
                value: value.map(|v| self.copy_into(v, dest)),
            },
            NodeKind::Function {
                type_node,
                formals,
                body,
                captured,
            } => NodeKind::Function {
                type_node: self.copy_into(*type_node, dest),
                formals: formals
                    .iter()
                    .map(|f| Formal {
                        type_node: self.copy_into(f.type_node, dest),
                        id: self.copy_into(f.id, dest),
                    })
                    .collect(),
                body: self.copy_all(body, dest),
                captured: captured
                    .iter()
                    .map(|&s| self.copy_symbol(s, dest))
                    .collect(),
            },
            NodeKind::Constructor {
                name,
                func,
                parent_constructors,
            } => NodeKind::Constructor {
                name: name.clone(),
                func: self.copy_into(*func, dest),
                parent_constructors: self.copy_all(parent_constructors, dest),
            },
            NodeKind::TypeBody {
                declarations,
                parents,
                constructors,
                value,
            } => NodeKind::TypeBody {
                declarations: self.copy_all(declarations, dest),
                parents: self.copy_all(parents, dest),
                constructors: self.copy_all(constructors, dest),
                value: value.clone(),
            },
            NodeKind::Call { func, args, ty } => NodeKind::Call {
                func: self.copy_into(*func, dest),
                args: self.copy_all(args, dest),
                ty: ty.clone(),
            },
            NodeKind::DeferCall { call } => NodeKind::DeferCall {
                call: self.copy_into(*call, dest),
            },
            NodeKind::And { left, right } => NodeKind::And {
                left: self.copy_into(*left, dest),
                right: self.copy_into(*right, dest),
            },
            NodeKind::Or { left, right } => NodeKind::Or {
                left: self.copy_into(*left, dest),
                right: self.copy_into(*right, dest),
            },
            NodeKind::Equals { left, right } => NodeKind::Equals {
                left: self.copy_into(*left, dest),
                right: self.copy_into(*right, dest),
            },
            NodeKind::NumericComparison {
                comparison,
                left,
                right,
            } => NodeKind::NumericComparison {
                comparison: *comparison,
                left: self.copy_into(*left, dest),
                right: self.copy_into(*right, dest),
            },
            NodeKind::NotEquals { left, right } => NodeKind::NotEquals {
                left: self.copy_into(*left, dest),
                right: self.copy_into(*right, dest),
            },
            NodeKind::Add {
                left,
                right,
                concatenation,
            } => NodeKind::Add {
                left: self.copy_into(*left, dest),
                right: self.copy_into(*right, dest),
                concatenation: *concatenation,
            },
            NodeKind::Subtract { left, right } => NodeKind::Subtract {
                left: self.copy_into(*left, dest),
                right: self.copy_into(*right, dest),
            },
            NodeKind::Multiply { left, right } => NodeKind::Multiply {
                left: self.copy_into(*left, dest),
                right: self.copy_into(*right, dest),
            },
            NodeKind::Divide { left, right } => NodeKind::Divide {
                left: self.copy_into(*left, dest),
                right: self.copy_into(*right, dest),
            },
            NodeKind::Modulus { left, right } => NodeKind::Modulus {
                left: self.copy_into(*left, dest),
                right: self.copy_into(*right, dest),
            },
            NodeKind::Power { left, right } => NodeKind::Power {
                left: self.copy_into(*left, dest),
                right: self.copy_into(*right, dest),
            },
            NodeKind::NthRoot { left, right } => NodeKind::NthRoot {
                left: self.copy_into(*left, dest),
                right: self.copy_into(*right, dest),
            },
            NodeKind::Negative { exp } => NodeKind::Negative {
                exp: self.copy_into(*exp, dest),
            },
            NodeKind::Not { exp } => NodeKind::Not {
                exp: self.copy_into(*exp, dest),
            },
            NodeKind::Enumerate {
                enumerable,
                local,
                index,
                shared,
                body,
            } => NodeKind::Enumerate {
                enumerable: self.copy_into(*enumerable, dest),
                local: self.copy_into(*local, dest),
                index: index.map(|i| self.copy_into(i, dest)),
                shared: *shared,
                body: self.copy_all(body, dest),
            },
            NodeKind::With {
                resource,
                local,
                shared,
                body,
            } => NodeKind::With {
                resource: self.copy_into(*resource, dest),
                local: self.copy_into(*local, dest),
                shared: *shared,
                body: self.copy_all(body, dest),
            },
            NodeKind::If { condition, body } => NodeKind::If {
                condition: self.copy_into(*condition, dest),
                body: self.copy_all(body, dest),
            },
            NodeKind::While { condition, body } => NodeKind::While {
                condition: self.copy_into(*condition, dest),
                body: self.copy_all(body, dest),
            },
            NodeKind::Continue => NodeKind::Continue,
            NodeKind::Break => NodeKind::Break,
        };
        dest.alloc(pos, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Symbol;

    fn pos() -> Position {
        Position::unknown()
    }

    #[test]
    fn tag_categories_partition_lvals() {
        assert!(Tag::Identifier.is_lval());
        assert!(Tag::MapAccess.is_lval());
        assert!(Tag::EnumerableAppend.is_lval());
        assert!(!Tag::Call.is_lval());
        assert!(Tag::Assign.is_expression());
        assert!(!Tag::Assign.is_statement());
        assert!(Tag::ExpressionStatement.is_statement());
        assert!(Tag::While.is_block());
        assert!(Tag::TypeBody.is_type());
    }

    #[test]
    fn type_body_synthesizes_a_default_constructor() {
        let mut ast = Ast::new();
        let body = ast.type_body(pos(), vec![]).unwrap();
        match ast.kind(body) {
            NodeKind::TypeBody { constructors, .. } => {
                assert_eq!(constructors.len(), 1);
                let ctor = constructors[0];
                match ast.kind(ctor) {
                    NodeKind::Constructor { func, .. } => match ast.kind(*func) {
                        NodeKind::Function { type_node, .. } => match ast.kind(*type_node) {
                            NodeKind::TypeLiteral { value } => {
                                assert_eq!(*value, Type::lambda(Type::VOID, Type::VOID));
                            }
                            other => panic!("unexpected {other:?}"),
                        },
                        other => panic!("unexpected {other:?}"),
                    },
                    other => panic!("unexpected {other:?}"),
                }
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn type_body_rejects_multiple_parents() {
        let mut ast = Ast::new();
        let a = ast.alloc(
            pos(),
            NodeKind::Identifier {
                name: "A".into(),
                symbol: None,
            },
        );
        let b = ast.alloc(
            pos(),
            NodeKind::Identifier {
                name: "B".into(),
                symbol: None,
            },
        );
        let use_node = ast.alloc(pos(), NodeKind::Use { ids: vec![a, b] });
        assert!(ast.type_body(pos(), vec![use_node]).is_err());
    }

    #[test]
    fn extract_subtree_carries_symbols_by_uuid() {
        let mut ast = Ast::new();
        let sym = ast.symbols.intern(Symbol::declared(
            "x",
            Type::NUMBER,
            Position::unknown(),
            false,
        ));
        let uuid = ast.symbols.get(sym).uuid.clone();
        let left = ast.alloc(
            pos(),
            NodeKind::Identifier {
                name: "x".into(),
                symbol: Some(sym),
            },
        );
        let right = ast.alloc(
            pos(),
            NodeKind::Identifier {
                name: "x".into(),
                symbol: Some(sym),
            },
        );
        let add = ast.alloc(
            pos(),
            NodeKind::Add {
                left,
                right,
                concatenation: false,
            },
        );

        let (copy, root) = ast.extract_subtree(add);
        assert_eq!(copy.len(), 3);
        assert_eq!(copy.symbols.len(), 1);
        match copy.kind(root) {
            NodeKind::Add { left, right, .. } => {
                let ls = copy.identifier_symbol(*left).unwrap();
                let rs = copy.identifier_symbol(*right).unwrap();
                assert_eq!(ls, rs);
                assert_eq!(copy.symbols.get(ls).uuid, uuid);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn lval_sharedness_recurses_to_the_root_identifier() {
        let mut ast = Ast::new();
        let sym = ast.symbols.intern(Symbol::declared(
            "e",
            Type::enumerable(Type::map(Type::NUMBER)),
            Position::unknown(),
            true,
        ));
        let base = ast.alloc(
            pos(),
            NodeKind::Identifier {
                name: "e".into(),
                symbol: Some(sym),
            },
        );
        let idx = ast.alloc(pos(), NodeKind::NumberLiteral { value: 0.0 });
        let access = ast.alloc(pos(), NodeKind::EnumerableAccess { path: base, index: idx });
        let key = ast.alloc(
            pos(),
            NodeKind::Identifier {
                name: "a".into(),
                symbol: None,
            },
        );
        let map_access = ast.alloc(pos(), NodeKind::MapAccess { path: access, end: key });

        assert!(ast.lval_is_shared(map_access));
        assert_eq!(ast.lval_root_symbol(map_access), Some(sym));
    }
}
