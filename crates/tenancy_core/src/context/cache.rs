//! Session-scoped lookup cache.
//!
//! # Responsibility
//! - Memoize resolved entities per kind, section and key.
//! - Let secondary lookups pick a deterministic winner on collisions.
//!
//! # Invariants
//! - Lists are append-only; the most recently saved entry is last.
//! - An empty list means "never resolved": callers fall through to storage.
//! - Colliding keys resolve to the entry with the smallest id.

use crate::model::document::Document;
use crate::model::domain::Domain;
use crate::model::identity::Identity;
use crate::model::user::User;
use std::collections::HashMap;
use std::rc::Rc;

/// Primary index by id.
pub const SECTION_ID: &str = "id";
/// Domain name index.
pub const SECTION_NAME: &str = "name";
/// Document type index.
pub const SECTION_TYPE: &str = "type";

/// Section -> key -> ordered entries, for one entity kind.
pub struct EntityCache<T> {
    sections: HashMap<&'static str, HashMap<String, Vec<Rc<T>>>>,
}

impl<T> Default for EntityCache<T> {
    fn default() -> Self {
        Self {
            sections: HashMap::new(),
        }
    }
}

impl<T: Identity> EntityCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one entry. Does not deduplicate.
    pub fn save(&mut self, section: &'static str, key: impl Into<String>, entity: Rc<T>) {
        self.sections
            .entry(section)
            .or_default()
            .entry(key.into())
            .or_default()
            .push(entity);
    }

    /// Appends only when `key` was already populated in `section`.
    ///
    /// Used for fresh inserts: an unpopulated key must keep falling through to
    /// storage so the next lookup sees every row.
    pub fn save_if_indexed(&mut self, section: &'static str, key: &str, entity: Rc<T>) -> bool {
        match self
            .sections
            .get_mut(section)
            .and_then(|keys| keys.get_mut(key))
        {
            Some(entries) if !entries.is_empty() => {
                entries.push(entity);
                true
            }
            _ => false,
        }
    }

    /// Returns all entries for `key`, or an empty list.
    pub fn get(&self, section: &str, key: &str) -> Vec<Rc<T>> {
        self.sections
            .get(section)
            .and_then(|keys| keys.get(key))
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the most recently saved entry for `key`.
    pub fn latest(&self, section: &str, key: &str) -> Option<Rc<T>> {
        self.sections
            .get(section)
            .and_then(|keys| keys.get(key))
            .and_then(|entries| entries.last().cloned())
    }

    pub fn contains(&self, section: &str, key: &str) -> bool {
        self.sections
            .get(section)
            .and_then(|keys| keys.get(key))
            .is_some_and(|entries| !entries.is_empty())
    }

    /// Removes every entry that is this very instance. Returns the count.
    pub fn evict(&mut self, entity: &T) -> usize {
        let mut removed = 0;
        for keys in self.sections.values_mut() {
            for entries in keys.values_mut() {
                let before = entries.len();
                entries.retain(|candidate| !std::ptr::eq(candidate.as_ref(), entity));
                removed += before - entries.len();
            }
            keys.retain(|_, entries| !entries.is_empty());
        }
        removed
    }
}

/// Picks the entry with the smallest id; drafts lose to persisted entries.
pub fn first_created<T: Identity>(entries: &[Rc<T>]) -> Option<Rc<T>> {
    entries
        .iter()
        .filter(|entry| entry.id().is_some())
        .min_by_key(|entry| entry.id())
        .or_else(|| entries.first())
        .cloned()
}

/// Per-kind caches of one session.
#[derive(Default)]
pub struct LookupCache {
    pub domains: EntityCache<Domain>,
    pub users: EntityCache<User>,
    pub documents: EntityCache<Document>,
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::{first_created, EntityCache, SECTION_ID, SECTION_NAME};
    use crate::model::identity::{EntityId, Identity};
    use std::rc::Rc;

    struct Probe(Option<EntityId>);

    impl Identity for Probe {
        fn id(&self) -> Option<EntityId> {
            self.0
        }
    }

    #[test]
    fn get_returns_empty_list_when_absent() {
        let cache: EntityCache<Probe> = EntityCache::new();
        assert!(cache.get(SECTION_ID, "1").is_empty());
        assert!(!cache.contains(SECTION_ID, "1"));
        assert!(cache.latest(SECTION_ID, "1").is_none());
    }

    #[test]
    fn save_appends_without_dedup() {
        let mut cache = EntityCache::new();
        let probe = Rc::new(Probe(Some(1)));
        cache.save(SECTION_ID, "1", probe.clone());
        cache.save(SECTION_ID, "1", probe.clone());
        assert_eq!(cache.get(SECTION_ID, "1").len(), 2);
    }

    #[test]
    fn save_if_indexed_skips_unpopulated_keys() {
        let mut cache = EntityCache::new();
        assert!(!cache.save_if_indexed(SECTION_NAME, "alpha", Rc::new(Probe(Some(4)))));
        assert!(cache.get(SECTION_NAME, "alpha").is_empty());

        cache.save(SECTION_NAME, "alpha", Rc::new(Probe(Some(2))));
        assert!(cache.save_if_indexed(SECTION_NAME, "alpha", Rc::new(Probe(Some(4)))));
        assert_eq!(cache.get(SECTION_NAME, "alpha").len(), 2);
    }

    #[test]
    fn first_created_prefers_smallest_id() {
        let entries = vec![
            Rc::new(Probe(Some(9))),
            Rc::new(Probe(None)),
            Rc::new(Probe(Some(3))),
        ];
        let winner = first_created(&entries).expect("winner");
        assert_eq!(winner.id(), Some(3));
        assert!(first_created::<Probe>(&[]).is_none());
    }

    #[test]
    fn evict_removes_only_the_same_instance() {
        let mut cache = EntityCache::new();
        let kept = Rc::new(Probe(Some(1)));
        let dropped = Rc::new(Probe(Some(1)));
        cache.save(SECTION_ID, "1", kept.clone());
        cache.save(SECTION_ID, "1", dropped.clone());
        cache.save(SECTION_NAME, "n", dropped.clone());

        assert_eq!(cache.evict(&dropped), 2);
        let remaining = cache.get(SECTION_ID, "1");
        assert_eq!(remaining.len(), 1);
        assert!(Rc::ptr_eq(&remaining[0], &kept));
        assert!(!cache.contains(SECTION_NAME, "n"));
    }
}
