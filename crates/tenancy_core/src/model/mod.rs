//! Entity model of the tenancy hierarchy.
//!
//! # Responsibility
//! - Define domains, users and documents with their permission rules.
//! - Define identity comparison and the attribute bag shared by entities.
//!
//! # Invariants
//! - Id `0` denotes the genesis domain and genesis user only.
//! - Identity is id equality for persisted entities, instance equality for
//!   drafts.

pub mod attributes;
pub mod document;
pub mod domain;
pub mod error;
pub mod identity;
pub mod user;
