//! The shared store.
//!
//! Each symbol's value lives as the canonical JSON of its literal node at
//! `<prefix>semantic_symbol_value_<uuid>` in the KV store, so any process —
//! driver or worker — reads and writes the same slots. Locking goes through
//! the named lock manager; the lock name for a symbol is
//! `<prefix>semantic_symbol_lock_<uuid>`.

use redis::Commands;
use tracing::debug;

use swarm_base::{Config, SwarmError};
use swarm_lang::symbol::Symbol;

use super::SymbolValueStore;
use crate::lock::LockManager;
use crate::queue::kv_error;
use crate::value::Value;

pub struct SharedSymbolValueStore {
    conn: redis::Connection,
    prefix: String,
    locks: LockManager,
}

impl SharedSymbolValueStore {
    pub fn connect(config: &Config) -> Result<Self, SwarmError> {
        let client = redis::Client::open(config.redis_url()).map_err(kv_error)?;
        let conn = client.get_connection().map_err(kv_error)?;
        debug!(host = %config.redis_host, port = config.redis_port, "shared store connected");
        Ok(Self {
            conn,
            prefix: config.redis_prefix.clone(),
            locks: LockManager::new(config.lock_sleep_us, config.lock_max_retries),
        })
    }

    fn symbol_key(&self, uuid: &str) -> String {
        format!("{}semantic_symbol_value_{}", self.prefix, uuid)
    }

    fn lock_name(&self, uuid: &str) -> String {
        format!("{}semantic_symbol_lock_{}", self.prefix, uuid)
    }
}

impl SymbolValueStore for SharedSymbolValueStore {
    fn set(&mut self, symbol: &Symbol, value: Value) -> Result<(), SwarmError> {
        let payload = value.encode_string()?;
        let _: () = self
            .conn
            .set(self.symbol_key(&symbol.uuid), payload)
            .map_err(kv_error)?;
        Ok(())
    }

    fn try_get(&mut self, symbol: &Symbol) -> Result<Option<Value>, SwarmError> {
        let payload: Option<String> = self
            .conn
            .get(self.symbol_key(&symbol.uuid))
            .map_err(kv_error)?;
        match payload {
            Some(payload) => Ok(Some(Value::decode_string(&payload)?)),
            None => Ok(None),
        }
    }

    fn try_lock(&mut self, symbol: &Symbol) -> Result<bool, SwarmError> {
        let name = self.lock_name(&symbol.uuid);
        self.locks.try_acquire(&mut self.conn, &name)
    }

    fn lock(&mut self, symbol: &Symbol) -> Result<(), SwarmError> {
        let name = self.lock_name(&symbol.uuid);
        self.locks.acquire(&mut self.conn, &name)
    }

    fn unlock(&mut self, symbol: &Symbol) -> Result<(), SwarmError> {
        let name = self.lock_name(&symbol.uuid);
        self.locks.release(&mut self.conn, &name)
    }
}
