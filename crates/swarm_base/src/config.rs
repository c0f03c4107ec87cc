//! Process-wide configuration.
//!
//! The reference implementation kept these as mutable globals; here they live
//! in one [`Config`] value constructed by the driver and passed explicitly to
//! the queue, the stores and the interpreter. The only true process singleton
//! left is the `THREAD_EXIT` flag in the runtime crate, which the signal
//! handler must reach without a context pointer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tuning knobs and switches for one Swarm process.
///
/// Sleep intervals are microseconds, matching the cooperative polling design:
/// worker and waiter threads sleep between polls rather than busy-spin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub debug: bool,
    pub verbose: bool,
    /// Evaluate everything in-process, never touching the shared queue.
    pub force_local: bool,
    /// Install the prologue (built-in bindings) into the root scope.
    pub with_prologue: bool,

    pub redis_host: String,
    pub redis_port: u16,
    /// Every key this process writes to the KV store starts with this prefix.
    pub redis_prefix: String,

    pub queue_sleep_us: u64,
    pub lock_sleep_us: u64,
    pub lock_max_retries: u64,
    pub waiter_sleep_us: u64,

    pub enumeration_unrolling_limit: usize,

    /// Capability filters advertised by this worker. A job is eligible here
    /// only if every one of its filter entries matches this map exactly.
    pub queue_filters: BTreeMap<String, String>,

    pub max_threads: usize,

    pub remove_self_assigns: bool,
    pub constant_propagation: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            verbose: false,
            force_local: false,
            with_prologue: true,
            redis_host: "localhost".into(),
            redis_port: 6379,
            redis_prefix: "swarm_".into(),
            queue_sleep_us: 1_000,
            lock_sleep_us: 1_000,
            lock_max_retries: 1_000_000,
            waiter_sleep_us: 1_000,
            enumeration_unrolling_limit: 200,
            queue_filters: BTreeMap::new(),
            max_threads: 4,
            remove_self_assigns: true,
            constant_propagation: true,
        }
    }
}

impl Config {
    /// Connection URL for the redis client.
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/", self.redis_host, self.redis_port)
    }

    /// Prefixes a key with this process's namespace.
    pub fn key(&self, suffix: &str) -> String {
        format!("{}{}", self.redis_prefix, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_tuning() {
        let config = Config::default();
        assert_eq!(config.redis_port, 6379);
        assert_eq!(config.redis_prefix, "swarm_");
        assert_eq!(config.lock_max_retries, 1_000_000);
        assert!(config.with_prologue);
        assert!(config.remove_self_assigns);
    }

    #[test]
    fn key_applies_prefix() {
        let config = Config::default();
        assert_eq!(config.key("job_queue"), "swarm_job_queue");
    }
}
