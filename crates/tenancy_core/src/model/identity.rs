//! Identity and equality shared by every entity kind.
//!
//! # Invariants
//! - Two entities are the same when both carry an id and the ids match.
//! - Without ids, only the very same instance is the same entity, so two
//!   drafts with identical fields never compare equal.

use std::fmt::{Display, Formatter};

/// Storage-assigned numeric identifier.
pub type EntityId = i64;

/// Reserved identifier of the genesis domain and genesis user.
pub const GENESIS_ID: EntityId = 0;

/// Entity kind, used to key caches and construction guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    Domain,
    User,
    Document,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::User => "user",
            Self::Document => "document",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value identity by assigned id, falling back to instance identity.
pub trait Identity {
    /// Assigned id, `None` while the entity is a draft.
    fn id(&self) -> Option<EntityId>;

    /// Whether the entity has a storage id (genesis counts as persisted).
    fn is_persisted(&self) -> bool {
        self.id().is_some()
    }

    /// Whether `self` and `other` denote the same entity.
    fn is(&self, other: &Self) -> bool
    where
        Self: Sized,
    {
        match (self.id(), other.id()) {
            (Some(left), Some(right)) => left == right,
            _ => std::ptr::eq(self, other),
        }
    }

    /// Whether any element of `items` is the same entity as `self`.
    fn is_in<I, R>(&self, items: I) -> bool
    where
        Self: Sized,
        I: IntoIterator<Item = R>,
        R: AsRef<Self>,
    {
        items.into_iter().any(|item| self.is(item.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::{EntityId, Identity};
    use std::rc::Rc;

    struct Probe {
        id: Option<EntityId>,
    }

    impl Identity for Probe {
        fn id(&self) -> Option<EntityId> {
            self.id
        }
    }

    #[test]
    fn persisted_entities_compare_by_id() {
        let left = Probe { id: Some(3) };
        let right = Probe { id: Some(3) };
        let other = Probe { id: Some(4) };
        assert!(left.is(&right));
        assert!(!left.is(&other));
    }

    #[test]
    fn drafts_compare_by_instance() {
        let left = Probe { id: None };
        let right = Probe { id: None };
        assert!(left.is(&left));
        assert!(!left.is(&right));
    }

    #[test]
    fn draft_never_matches_persisted_entity() {
        let draft = Probe { id: None };
        let stored = Probe { id: Some(1) };
        assert!(!draft.is(&stored));
        assert!(!stored.is(&draft));
    }

    #[test]
    fn is_in_reduces_over_shared_handles() {
        let items = vec![Rc::new(Probe { id: Some(1) }), Rc::new(Probe { id: Some(2) })];
        assert!(Probe { id: Some(2) }.is_in(&items));
        assert!(!Probe { id: Some(5) }.is_in(&items));
        assert!(!Probe { id: None }.is_in(&items));
        assert!(!Probe { id: Some(1) }.is_in(Vec::<Rc<Probe>>::new()));
    }
}
