//! Persistence port and its SQLite adapter.
//!
//! # Responsibility
//! - Define the row-level contract the entity layer consumes.
//! - Isolate SQL details from entity reconstruction and permission checks.
//!
//! # Invariants
//! - Backends never store or hand out the reserved genesis id.

pub mod sqlite_storage;
pub mod storage;
