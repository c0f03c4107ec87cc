//! Named advisory locks over the shared KV store.
//!
//! A [`Lock`] is reentrant within one process (holder counting) and
//! mutually exclusive across processes (SETNX of `lock:<name>` with a
//! process-unique holder id). Acquisition spins with a bounded sleep;
//! exhausting the retry budget is a `LOCK_TIMEOUT`.
//!
//! The [`LockManager`] is the process-local registry: one `Lock` per name,
//! created on first use and dropped once its holder count reaches zero.

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use redis::Commands;
use tracing::{debug, warn};

use swarm_base::{uuid4, SwarmError};

use crate::queue::kv_error;

#[derive(Debug)]
pub struct Lock {
    name: String,
    holder_uuid: String,
    holders: u64,
}

impl Lock {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            holder_uuid: uuid4(),
            holders: 0,
        }
    }

    fn kv_key(&self) -> String {
        format!("lock:{}", self.name)
    }

    pub fn held(&self) -> bool {
        self.holders > 0
    }

    /// One SETNX attempt. Succeeds iff no other holder has the key.
    fn try_to_acquire(&mut self, conn: &mut redis::Connection) -> Result<bool, SwarmError> {
        let acquired: bool = conn.set_nx(self.kv_key(), &self.holder_uuid).map_err(kv_error)?;
        Ok(acquired)
    }

    fn acquire(
        &mut self,
        conn: &mut redis::Connection,
        sleep_us: u64,
        max_retries: u64,
    ) -> Result<(), SwarmError> {
        if self.held() {
            self.holders += 1;
            return Ok(());
        }
        let mut retries = 0;
        while !self.try_to_acquire(conn)? {
            retries += 1;
            if retries > max_retries {
                return Err(SwarmError::LockTimeout {
                    name: self.name.clone(),
                });
            }
            thread::sleep(Duration::from_micros(sleep_us));
        }
        self.holders += 1;
        debug!(lock = %self.name, "acquired");
        Ok(())
    }

    /// Drops one holder. On the last release, the key is deleted only when
    /// it still carries our holder id.
    fn release(&mut self, conn: &mut redis::Connection) -> Result<bool, SwarmError> {
        if !self.held() {
            warn!(lock = %self.name, "release of a lock not held by this process");
            return Ok(false);
        }
        self.holders -= 1;
        if self.held() {
            return Ok(false);
        }
        let current: Option<String> = conn.get(self.kv_key()).map_err(kv_error)?;
        if current.as_deref() == Some(self.holder_uuid.as_str()) {
            let _: () = conn.del(self.kv_key()).map_err(kv_error)?;
        }
        debug!(lock = %self.name, "released");
        Ok(true)
    }
}

/// Process-local registry of named locks.
#[derive(Debug, Default)]
pub struct LockManager {
    locks: HashMap<String, Lock>,
    sleep_us: u64,
    max_retries: u64,
}

impl LockManager {
    pub fn new(sleep_us: u64, max_retries: u64) -> Self {
        Self {
            locks: HashMap::new(),
            sleep_us,
            max_retries,
        }
    }

    fn entry(&mut self, name: &str) -> &mut Lock {
        self.locks
            .entry(name.to_string())
            .or_insert_with(|| Lock::new(name))
    }

    pub fn try_acquire(
        &mut self,
        conn: &mut redis::Connection,
        name: &str,
    ) -> Result<bool, SwarmError> {
        let lock = self.entry(name);
        if lock.held() {
            lock.holders += 1;
            return Ok(true);
        }
        let acquired = lock.try_to_acquire(conn)?;
        if acquired {
            lock.holders += 1;
        }
        Ok(acquired)
    }

    pub fn acquire(
        &mut self,
        conn: &mut redis::Connection,
        name: &str,
    ) -> Result<(), SwarmError> {
        let (sleep_us, max_retries) = (self.sleep_us, self.max_retries);
        self.entry(name).acquire(conn, sleep_us, max_retries)
    }

    /// Releases one hold; the registry entry is dropped once fully released.
    pub fn release(&mut self, conn: &mut redis::Connection, name: &str) -> Result<(), SwarmError> {
        let fully_released = match self.locks.get_mut(name) {
            Some(lock) => lock.release(conn)?,
            None => {
                warn!(lock = %name, "release of an unknown lock");
                return Ok(());
            }
        };
        if fully_released {
            self.locks.remove(name);
        }
        Ok(())
    }

    pub fn held(&self, name: &str) -> bool {
        self.locks.get(name).map(|l| l.held()).unwrap_or(false)
    }
}
