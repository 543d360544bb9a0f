//! Document type capability contract.
//!
//! Each document kind plugs its own policy into the generic structural
//! checks of `Document`. Types are independent implementations registered by
//! slug; none of them inherits from another.

use crate::context::Environment;
use crate::model::attributes::Attributes;
use crate::model::document::Document;
use crate::model::domain::Domain;
use crate::model::user::User;

/// Facts a type hook decides on.
#[derive(Clone, Copy)]
pub struct DocumentAccess<'a> {
    /// Acting user; `None` for anonymous public reads.
    pub actor: Option<&'a User>,
    pub owner: &'a User,
    pub origin: &'a Domain,
    pub data: &'a Attributes,
}

/// Per-kind policy and lifecycle hooks.
///
/// Permission hooks default to granting, except public reads which must be
/// opted into.
pub trait DocumentType {
    /// Stable slug. Must not change after registration.
    fn slug(&self) -> &str;

    fn is_creatable(&self, _access: &DocumentAccess<'_>) -> bool {
        true
    }

    fn is_readable_by_public(&self, _access: &DocumentAccess<'_>) -> bool {
        false
    }

    fn is_readable(&self, _access: &DocumentAccess<'_>) -> bool {
        true
    }

    fn is_editable(&self, _access: &DocumentAccess<'_>) -> bool {
        true
    }

    fn is_deletable(&self, _access: &DocumentAccess<'_>) -> bool {
        true
    }

    /// Called after a new row was inserted and the id assigned.
    fn on_insert(&self, _env: &Environment, _document: &Document) {}

    /// Called after an existing row was updated.
    fn on_update(&self, _env: &Environment, _document: &Document) {}

    /// Renders the remaining request path. `None` falls back to not-found.
    fn render(&self, _env: &Environment, _rest: &str) -> Option<String> {
        None
    }
}
