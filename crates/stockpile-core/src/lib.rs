//! stockpile-core - Core library for Stockpile
//!
//! This crate contains the shared models, database layer, and the
//! optimistic-concurrency write path used by the API server and the CLI:
//! version-conditional writes, the role-aware write guard, the conflict
//! resolution protocol, and the client-side offline edit queue.

pub mod db;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod models;
pub mod policy;
pub mod queue;
pub mod resolve;


pub use error::{Error, Result};
pub use models::{Actor, Product, ProductId, Role};
