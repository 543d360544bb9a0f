//! Document type contracts.
//!
//! A document type is a pluggable capability: it names itself with a slug,
//! narrows the structural permissions of its documents and may render a
//! routed path.

pub mod document_type;
pub mod registry;
