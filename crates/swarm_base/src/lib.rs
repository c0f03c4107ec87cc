//! Structural atoms shared by every layer of the Swarm compiler and runtime.
//!
//! This crate has no knowledge of the language itself. It provides:
//!
//! - [`Position`]: source locations attached to AST nodes and symbols
//! - [`uuid4`]: identifier generation, with a deterministic mode for
//!   reproducible serialization tests
//! - [`Config`]: the process-wide configuration object, threaded explicitly
//!   through the pipeline rather than read from globals
//! - [`SwarmError`]: the single error taxonomy used across the workspace

pub mod config;
pub mod error;
pub mod position;
pub mod uuid;

pub use config::Config;
pub use error::{NameErrorKind, SwarmError};
pub use position::Position;
pub use uuid::{set_deterministic_uuids, uuid4};
