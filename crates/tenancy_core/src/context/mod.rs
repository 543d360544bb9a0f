//! Resolution context of one session.
//!
//! # Responsibility
//! - Own the storage port, the lookup cache and the construction guard.
//! - Seed the genesis domain and genesis user exactly once.
//! - Resolve the current domain once and hold the signed-in user.
//!
//! # Invariants
//! - One `Environment` per session; it is deliberately `!Send` (`Rc`,
//!   `RefCell`), so overlapping sessions cannot share caches.
//! - Genesis entities are pre-seeded in the cache under id `0`, so the
//!   reserved id never reaches the storage port through lookups.

pub mod cache;
pub mod guard;

use crate::extension::document_type::DocumentType;
use crate::extension::registry::{DocumentTypeRegistry, TypeRegistryError};
use crate::model::attributes::Attributes;
use crate::model::domain::Domain;
use crate::model::identity::{EntityId, EntityKind, Identity, GENESIS_ID};
use crate::model::user::User;
use crate::repo::storage::{StoragePort, StorageResult};
use cache::{LookupCache, SECTION_ID, SECTION_NAME};
use guard::{ConstructionGuard, ConstructionToken};
use log::info;
use once_cell::unsync::OnceCell;
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;
use uuid::Uuid;

/// Default name of the genesis domain.
pub const DEFAULT_GENESIS_NAME: &str = "genesis";

/// Seed of the genesis domain supplied by the hosting environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenesisSeed {
    pub name: String,
    pub data: Attributes,
}

impl Default for GenesisSeed {
    fn default() -> Self {
        Self {
            name: DEFAULT_GENESIS_NAME.to_string(),
            data: Attributes::new(),
        }
    }
}

/// Session-scoped resolution context threaded through every lookup.
pub struct Environment {
    session_id: Uuid,
    storage: Box<dyn StoragePort>,
    types: DocumentTypeRegistry,
    cache: RefCell<LookupCache>,
    guard: RefCell<ConstructionGuard>,
    genesis_domain: Rc<Domain>,
    genesis_user: Rc<User>,
    current_domain: OnceCell<Rc<Domain>>,
    current_user: RefCell<Option<Rc<User>>>,
}

impl Environment {
    /// Creates a session over `storage` and seeds the genesis entities.
    pub fn new(storage: Box<dyn StoragePort>, seed: GenesisSeed) -> Self {
        let session_id = Uuid::new_v4();
        let genesis_user = Rc::new(User::genesis_instance());
        let genesis_domain = Rc::new(Domain::genesis_instance(
            seed.name,
            seed.data,
            Rc::clone(&genesis_user),
        ));

        let mut cache = LookupCache::new();
        let genesis_key = GENESIS_ID.to_string();
        cache
            .users
            .save(SECTION_ID, genesis_key.clone(), Rc::clone(&genesis_user));
        cache
            .domains
            .save(SECTION_ID, genesis_key, Rc::clone(&genesis_domain));
        cache.domains.save(
            SECTION_NAME,
            genesis_domain.name(),
            Rc::clone(&genesis_domain),
        );

        info!(
            "event=session_open module=context status=ok session={} genesis={}",
            session_id,
            genesis_domain.name()
        );

        Self {
            session_id,
            storage,
            types: DocumentTypeRegistry::new(),
            cache: RefCell::new(cache),
            guard: RefCell::new(ConstructionGuard::new()),
            genesis_domain,
            genesis_user,
            current_domain: OnceCell::new(),
            current_user: RefCell::new(None),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn storage(&self) -> &dyn StoragePort {
        self.storage.as_ref()
    }

    /// Ends the session and hands the storage port back.
    pub fn into_storage(self) -> Box<dyn StoragePort> {
        info!(
            "event=session_close module=context status=ok session={}",
            self.session_id
        );
        self.storage
    }

    /// Registers one document type for this session.
    pub fn register_type(
        &mut self,
        doc_type: Rc<dyn DocumentType>,
    ) -> Result<(), TypeRegistryError> {
        let slug = doc_type.slug().to_string();
        self.types.register(doc_type)?;
        info!(
            "event=type_register module=context status=ok session={} slug={slug}",
            self.session_id
        );
        Ok(())
    }

    pub fn document_type(&self, slug: &str) -> Option<Rc<dyn DocumentType>> {
        self.types.get(slug)
    }

    pub fn types(&self) -> &DocumentTypeRegistry {
        &self.types
    }

    pub fn genesis_domain(&self) -> Rc<Domain> {
        Rc::clone(&self.genesis_domain)
    }

    pub fn genesis_user(&self) -> Rc<User> {
        Rc::clone(&self.genesis_user)
    }

    /// Resolves the session's current domain by name, once.
    ///
    /// Unknown names fall back to genesis. Later calls return the domain
    /// resolved first, whatever name they pass.
    pub fn enter(&self, name: &str) -> StorageResult<Rc<Domain>> {
        if let Some(current) = self.current_domain.get() {
            return Ok(Rc::clone(current));
        }
        let resolved = Domain::get_by_name(self, name)?.unwrap_or_else(|| self.genesis_domain());
        info!(
            "event=session_enter module=context status=ok session={} name={name} domain_id={:?}",
            self.session_id,
            resolved.id()
        );
        Ok(Rc::clone(self.current_domain.get_or_init(|| resolved)))
    }

    /// Current domain; genesis until `enter` resolved another one.
    pub fn current_domain(&self) -> Rc<Domain> {
        self.current_domain
            .get()
            .cloned()
            .unwrap_or_else(|| self.genesis_domain())
    }

    pub fn sign_in(&self, user: Rc<User>) {
        *self.current_user.borrow_mut() = Some(user);
    }

    pub fn sign_out(&self) {
        self.current_user.borrow_mut().take();
    }

    pub fn current_user(&self) -> Option<Rc<User>> {
        self.current_user.borrow().clone()
    }

    /// Read access to the session cache.
    pub fn cache(&self) -> Ref<'_, LookupCache> {
        self.cache.borrow()
    }

    pub(crate) fn cache_mut(&self) -> RefMut<'_, LookupCache> {
        self.cache.borrow_mut()
    }

    /// Marks a row as being reconstructed; `None` when it already is.
    pub(crate) fn begin_construction(
        &self,
        kind: EntityKind,
        id: EntityId,
    ) -> Option<ConstructionToken<'_>> {
        ConstructionToken::begin(&self.guard, kind, id)
    }
}
