//! The in-memory store.
//!
//! Values are keyed by symbol UUID, so two symbol records denoting the same
//! symbol (for instance across a serialization round trip) read and write
//! the same slot. Locks are no-ops that always succeed: the local store is
//! confined to one thread.
//!
//! This module also owns the locals envelope, the serialized environment
//! that travels with a queued job:
//! `{"entries": [[<symbol>, <value-node>], ...]}`, entries sorted by UUID.

use std::collections::HashMap;

use serde_json::{json, Value as Json};
use tracing::debug;

use swarm_base::SwarmError;
use swarm_lang::ast::Ast;
use swarm_lang::serialize::{Deserializer, Serializer, SymbolMap};
use swarm_lang::symbol::Symbol;

use super::SymbolValueStore;
use crate::value::Value;

#[derive(Debug, Default)]
pub struct LocalSymbolValueStore {
    map: HashMap<String, Value>,
}

impl LocalSymbolValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Serializes the values of `symbols` (those that are bound) into a
    /// locals envelope. The symbol map is ordered, so the envelope is
    /// deterministic for a given store.
    pub fn serialize_locals(
        &mut self,
        ast: &Ast,
        symbols: &SymbolMap,
    ) -> Result<String, SwarmError> {
        let mut entries = Vec::new();
        for (_uuid, &id) in symbols {
            let symbol = ast.symbols.get(id);
            if symbol.is_prologue {
                continue;
            }
            if let Some(value) = self.try_get(symbol)? {
                entries.push(json!([
                    Serializer::symbol_to_value(symbol),
                    value.encode()?
                ]));
            }
        }
        serde_json::to_string(&json!({ "entries": entries }))
            .map_err(|e| SwarmError::serialization(e.to_string()))
    }

    /// Rebuilds a store from a locals envelope, interning the symbols into
    /// `ast` so the deserialized tree and the store agree on identities.
    pub fn deserialize_locals(&mut self, ast: &mut Ast, payload: &str) -> Result<(), SwarmError> {
        let json: Json = serde_json::from_str(payload)
            .map_err(|e| SwarmError::serialization(e.to_string()))?;
        let entries = json
            .get("entries")
            .and_then(|e| e.as_array())
            .ok_or_else(|| SwarmError::serialization("locals envelope has no entries"))?;

        for entry in entries {
            let pair = entry
                .as_array()
                .filter(|p| p.len() == 2)
                .ok_or_else(|| SwarmError::serialization("locals entry is not a pair"))?;
            let id = Deserializer::symbol(ast, &pair[0])?;
            let value = Value::decode(&pair[1])?;
            let symbol = ast.symbols.get(id).clone();
            self.set(&symbol, value)?;
        }
        debug!(entries = entries.len(), "deserialized local environment");
        Ok(())
    }
}

impl SymbolValueStore for LocalSymbolValueStore {
    fn set(&mut self, symbol: &Symbol, value: Value) -> Result<(), SwarmError> {
        self.map.insert(symbol.uuid.clone(), value);
        Ok(())
    }

    fn try_get(&mut self, symbol: &Symbol) -> Result<Option<Value>, SwarmError> {
        Ok(self.map.get(&symbol.uuid).cloned())
    }

    fn try_lock(&mut self, _symbol: &Symbol) -> Result<bool, SwarmError> {
        Ok(true)
    }

    fn lock(&mut self, _symbol: &Symbol) -> Result<(), SwarmError> {
        Ok(())
    }

    fn unlock(&mut self, _symbol: &Symbol) -> Result<(), SwarmError> {
        Ok(())
    }
}
