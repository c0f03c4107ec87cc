//! Lexical scope stack used by name analysis.
//!
//! A stack of frames, each mapping a name to the symbol declared under it.
//! Lookup walks outward from the innermost frame; declaring a name that
//! already exists in the *current* frame is a redeclaration error, while
//! shadowing an outer frame is allowed.

use std::collections::HashMap;

use crate::symbol::SymbolId;

#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<HashMap<String, SymbolId>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn leave_scope(&mut self) {
        self.scopes.pop();
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Binds `name` in the current frame. Returns the previously-declared
    /// symbol as an error when the frame already holds the name.
    pub fn declare(&mut self, name: &str, symbol: SymbolId) -> Result<(), SymbolId> {
        let frame = self
            .scopes
            .last_mut()
            .expect("declare called with no open scope");
        if let Some(&existing) = frame.get(name) {
            return Err(existing);
        }
        frame.insert(name.to_string(), symbol);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        for frame in self.scopes.iter().rev() {
            if let Some(&id) = frame.get(name) {
                return Some(id);
            }
        }
        None
    }
}
