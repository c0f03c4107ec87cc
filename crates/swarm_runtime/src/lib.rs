//! The Swarm runtime: evaluation of typed ASTs, locally or across a fleet of
//! worker processes coordinated through a shared KV store.
//!
//! The moving parts:
//!
//! - [`value::Value`]: what expressions evaluate to
//! - [`store`]: the symbol-value store contract and its local/shared
//!   implementations
//! - [`lock::LockManager`]: named advisory locks over the KV store
//! - [`queue::ExecutionQueue`]: the distributed job queue
//! - [`queue::waiter`]: completion notification via one subscriber thread
//! - [`interpreter::Interpreter`]: the tree-walking evaluator
//! - [`prologue::Prologue`]: built-in host bindings
//!
//! The only process-wide singletons are [`THREAD_EXIT`], which the signal
//! handler must reach without a context pointer, and the subscriber thread
//! spawned lazily by the first waiter. Everything else takes its
//! configuration explicitly.

use std::sync::atomic::AtomicBool;

pub mod interpreter;
pub mod lock;
pub mod prologue;
pub mod queue;
pub mod store;
pub mod value;

pub use interpreter::Interpreter;
pub use prologue::Prologue;
pub use queue::{ExecutionQueue, JobStatus};
pub use store::{LocalSymbolValueStore, SharedSymbolValueStore, SymbolValueStore};
pub use value::Value;

/// Set by the signal handler; worker and subscriber loops observe it between
/// polls and terminate cleanly.
pub static THREAD_EXIT: AtomicBool = AtomicBool::new(false);
