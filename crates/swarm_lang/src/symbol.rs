//! Semantic symbols and their registry.
//!
//! A symbol is created once, at its declaration site, and referenced from
//! many identifier nodes. The registry owns every record; nodes hold a
//! lightweight [`SymbolId`]. The UUID is the serialization identity: two
//! records with the same UUID denote the same symbol across processes, and
//! the registry deduplicates on it so a deserialized tree reference-shares
//! one record per UUID.

use std::collections::HashMap;

use swarm_base::{uuid4, Position};

use crate::types::{Intrinsic, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Function,
}

/// A resolved name. Identity (`uuid`) is stable forever; the type may be
/// refined while the analyses run, never after.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub uuid: String,
    pub name: String,
    pub kind: SymbolKind,
    pub ty: Type,
    pub declared_at: Position,
    /// `true` when the symbol's value lives in the shared store.
    pub shared: bool,
    /// `true` for built-in bindings installed by the prologue.
    pub is_prologue: bool,
}

impl Symbol {
    /// A user declaration. The kind follows the type: lambda-typed symbols
    /// are functions.
    pub fn declared(
        name: impl Into<String>,
        ty: Type,
        declared_at: Position,
        shared: bool,
    ) -> Self {
        let kind = match ty.intrinsic() {
            Intrinsic::Lambda => SymbolKind::Function,
            _ => SymbolKind::Variable,
        };
        Self {
            uuid: uuid4(),
            name: name.into(),
            kind,
            ty,
            declared_at,
            shared,
            is_prologue: false,
        }
    }

    /// A built-in binding. Prologue symbols are never shared and never
    /// persisted to a value store.
    pub fn prologue(name: impl Into<String>, ty: Type) -> Self {
        let mut sym = Self::declared(name, ty, Position::unknown(), false);
        sym.is_prologue = true;
        sym
    }
}

/// Handle to a symbol record inside a [`Symbols`] registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Owner of every symbol record in one program context.
#[derive(Debug, Default, Clone)]
pub struct Symbols {
    records: Vec<Symbol>,
    by_uuid: HashMap<String, SymbolId>,
}

impl Symbols {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a record, reusing the existing entry when the UUID is
    /// already present. This is what makes deserialized identifier nodes
    /// share one symbol instance.
    pub fn intern(&mut self, symbol: Symbol) -> SymbolId {
        if let Some(&id) = self.by_uuid.get(&symbol.uuid) {
            return id;
        }
        let id = SymbolId(self.records.len() as u32);
        self.by_uuid.insert(symbol.uuid.clone(), id);
        self.records.push(symbol);
        id
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.records[id.index()]
    }

    /// Type refinement during analysis goes through here; identity fields
    /// must not change.
    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.records[id.index()]
    }

    pub fn by_uuid(&self, uuid: &str) -> Option<SymbolId> {
        self.by_uuid.get(uuid).copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolId(i as u32), s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_the_same_uuid_reuses_the_record() {
        let mut symbols = Symbols::new();
        let a = Symbol::declared("x", Type::NUMBER, Position::unknown(), false);
        let uuid = a.uuid.clone();
        let id1 = symbols.intern(a.clone());
        let id2 = symbols.intern(a);
        assert_eq!(id1, id2);
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols.by_uuid(&uuid), Some(id1));
    }

    #[test]
    fn lambda_typed_symbols_are_functions() {
        let f = Symbol::declared(
            "f",
            Type::lambda(Type::NUMBER, Type::NUMBER),
            Position::unknown(),
            false,
        );
        assert_eq!(f.kind, SymbolKind::Function);

        let v = Symbol::declared("v", Type::NUMBER, Position::unknown(), true);
        assert_eq!(v.kind, SymbolKind::Variable);
        assert!(v.shared);
    }

    #[test]
    fn prologue_symbols_are_flagged() {
        let sym = Symbol::prologue("log", Type::lambda(Type::STRING, Type::VOID));
        assert!(sym.is_prologue);
        assert!(!sym.shared);
    }
}
