//! By-slug registry of document types.

use crate::extension::document_type::DocumentType;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

static SLUG_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9_-]*$").expect("slug pattern is a valid regex")
});

/// Returns whether `value` is a valid document type slug.
pub fn is_valid_slug(value: &str) -> bool {
    SLUG_PATTERN.is_match(value)
}

/// Type registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRegistryError {
    InvalidSlug(String),
    DuplicateSlug(String),
}

impl Display for TypeRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSlug(value) => write!(f, "document type slug is invalid: {value}"),
            Self::DuplicateSlug(value) => {
                write!(f, "document type slug already registered: {value}")
            }
        }
    }
}

impl Error for TypeRegistryError {}

/// Registered document types of one context.
#[derive(Default)]
pub struct DocumentTypeRegistry {
    types: BTreeMap<String, Rc<dyn DocumentType>>,
}

impl DocumentTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one type under its slug.
    pub fn register(&mut self, doc_type: Rc<dyn DocumentType>) -> Result<(), TypeRegistryError> {
        let slug = doc_type.slug().to_string();
        if !is_valid_slug(&slug) {
            return Err(TypeRegistryError::InvalidSlug(slug));
        }
        if self.types.contains_key(slug.as_str()) {
            return Err(TypeRegistryError::DuplicateSlug(slug));
        }
        self.types.insert(slug, doc_type);
        Ok(())
    }

    pub fn get(&self, slug: &str) -> Option<Rc<dyn DocumentType>> {
        self.types.get(slug).cloned()
    }

    /// Returns sorted slugs.
    pub fn slugs(&self) -> Vec<String> {
        self.types.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{is_valid_slug, DocumentTypeRegistry, TypeRegistryError};
    use crate::extension::document_type::DocumentType;
    use std::rc::Rc;

    struct Named(&'static str);

    impl DocumentType for Named {
        fn slug(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn slug_pattern() {
        assert!(is_valid_slug("pages"));
        assert!(is_valid_slug("blog-post_2"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("Pages"));
        assert!(!is_valid_slug("-lead"));
        assert!(!is_valid_slug("a/b"));
    }

    #[test]
    fn registers_and_resolves_by_slug() {
        let mut registry = DocumentTypeRegistry::new();
        registry.register(Rc::new(Named("pages"))).expect("register pages");
        registry.register(Rc::new(Named("files"))).expect("register files");

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.slugs(), vec!["files".to_string(), "pages".to_string()]);
        assert_eq!(registry.get("pages").expect("pages").slug(), "pages");
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn rejects_duplicate_and_invalid_slugs() {
        let mut registry = DocumentTypeRegistry::new();
        registry.register(Rc::new(Named("pages"))).expect("register pages");

        let err = registry
            .register(Rc::new(Named("pages")))
            .expect_err("duplicate must fail");
        assert_eq!(err, TypeRegistryError::DuplicateSlug("pages".to_string()));

        let err = registry
            .register(Rc::new(Named("Bad Slug")))
            .expect_err("invalid slug must fail");
        assert_eq!(err, TypeRegistryError::InvalidSlug("Bad Slug".to_string()));
    }
}
