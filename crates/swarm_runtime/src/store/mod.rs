//! Symbol value stores.
//!
//! One contract, two implementations: [`LocalSymbolValueStore`] keeps values
//! in process memory with no-op locks, [`SharedSymbolValueStore`] keeps them
//! in the shared KV store guarded by named advisory locks. The interpreter
//! routes each access by the symbol's storage class.

mod local;
mod shared;

pub use local::LocalSymbolValueStore;
pub use shared::SharedSymbolValueStore;

use swarm_base::SwarmError;
use swarm_lang::symbol::Symbol;

use crate::value::Value;

pub trait SymbolValueStore {
    /// Sets the value of the symbol in the store.
    fn set(&mut self, symbol: &Symbol, value: Value) -> Result<(), SwarmError>;

    /// Gets the value of the symbol, or `None` when it is unbound.
    fn try_get(&mut self, symbol: &Symbol) -> Result<Option<Value>, SwarmError>;

    /// Gets the value of the symbol; unbound access is a `FREE_SYMBOL` error.
    fn get(&mut self, symbol: &Symbol) -> Result<Value, SwarmError> {
        self.try_get(symbol)?.ok_or_else(|| SwarmError::FreeSymbol {
            name: symbol.name.clone(),
        })
    }

    fn try_lock(&mut self, symbol: &Symbol) -> Result<bool, SwarmError>;

    fn lock(&mut self, symbol: &Symbol) -> Result<(), SwarmError>;

    fn unlock(&mut self, symbol: &Symbol) -> Result<(), SwarmError>;
}

/// Scoped acquisition: the symbol's lock is held across `f` and released on
/// every exit path, error included.
pub fn with_locked_symbol<T>(
    store: &mut dyn SymbolValueStore,
    symbol: &Symbol,
    f: impl FnOnce(&mut dyn SymbolValueStore) -> Result<T, SwarmError>,
) -> Result<T, SwarmError> {
    store.lock(symbol)?;
    let outcome = f(store);
    let released = store.unlock(symbol);
    match outcome {
        Ok(value) => released.map(|_| value),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarm_base::Position;
    use swarm_lang::types::Type;

    fn symbol(name: &str) -> Symbol {
        Symbol::declared(name, Type::NUMBER, Position::unknown(), false)
    }

    #[test]
    fn with_locked_symbol_releases_on_error() {
        let mut store = LocalSymbolValueStore::new();
        let sym = symbol("x");
        let result: Result<(), _> = with_locked_symbol(&mut store, &sym, |_| {
            Err(SwarmError::FreeSymbol { name: "x".into() })
        });
        assert!(result.is_err());
        // Local locks are free; a second acquisition must still succeed.
        assert!(store.try_lock(&sym).unwrap());
    }

    #[test]
    fn get_raises_free_symbol_for_unbound_reads() {
        let mut store = LocalSymbolValueStore::new();
        let sym = symbol("ghost");
        match store.get(&sym) {
            Err(SwarmError::FreeSymbol { name }) => assert_eq!(name, "ghost"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
