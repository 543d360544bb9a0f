//! Document entity: typed content owned by a user and anchored to a domain.
//!
//! # Invariants
//! - `doc_type`, `owner` and `origin` are fixed at construction.
//! - Every permission combines the structural origin check with the type's
//!   own hook.
//! - Type-scoped lookups only ever return and cache rows the viewer can read.

use crate::context::cache::{SECTION_ID, SECTION_TYPE};
use crate::context::Environment;
use crate::extension::document_type::{DocumentAccess, DocumentType};
use crate::model::attributes::{AttributeError, Attributes};
use crate::model::domain::Domain;
use crate::model::error::{EntityError, EntityResult};
use crate::model::identity::{EntityId, EntityKind, Identity, GENESIS_ID};
use crate::model::user::User;
use crate::repo::storage::{DocumentRow, StorageError, StorageResult};
use log::{debug, info, warn};
use std::cell::{Cell, Ref, RefCell};
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

pub struct Document {
    id: Cell<Option<EntityId>>,
    doc_type: Rc<dyn DocumentType>,
    owner: Rc<User>,
    origin: Rc<Domain>,
    data: RefCell<Attributes>,
}

impl Identity for Document {
    fn id(&self) -> Option<EntityId> {
        self.id.get()
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id.get())
            .field("type", &self.doc_type.slug())
            .field("owner", &self.owner.id())
            .field("origin", &self.origin.id())
            .field("data", &self.data.borrow())
            .finish()
    }
}

impl Document {
    /// Creates a draft document.
    pub fn create(
        doc_type: Rc<dyn DocumentType>,
        owner: Rc<User>,
        origin: Rc<Domain>,
    ) -> Rc<Document> {
        Rc::new(Self {
            id: Cell::new(None),
            doc_type,
            owner,
            origin,
            data: RefCell::new(Attributes::new()),
        })
    }

    /// Documents of one type visible to the session viewer, cache first.
    ///
    /// A signed-in viewer sees what `is_readable` grants; an anonymous one
    /// sees what is public from the current domain.
    pub fn get_by_type(env: &Environment, slug: &str) -> StorageResult<Vec<Rc<Document>>> {
        let cached = env.cache().documents.get(SECTION_TYPE, slug);
        if !cached.is_empty() {
            return Ok(cached);
        }

        let viewer = env.current_user();
        let public_domain = env.current_domain();
        let mut visible = Vec::new();
        for row in env.storage().get_documents_by_type(slug)? {
            let Some(document) = Self::resolve_row(env, row)? else {
                continue;
            };
            let readable = match viewer.as_deref() {
                Some(user) => document.is_readable(env, user),
                None => document.is_readable_by_public(env, &public_domain),
            };
            if readable {
                visible.push(document);
            } else {
                debug!(
                    "event=row_filtered module=document status=skipped id={:?} type={slug}",
                    document.id()
                );
            }
        }

        let mut cache = env.cache_mut();
        for document in &visible {
            if let Some(id) = document.id() {
                if !cache.documents.contains(SECTION_ID, &id.to_string()) {
                    cache
                        .documents
                        .save(SECTION_ID, id.to_string(), Rc::clone(document));
                }
            }
            cache
                .documents
                .save(SECTION_TYPE, slug, Rc::clone(document));
        }
        Ok(visible)
    }

    /// Visible documents of one type whose `key` equals `value`.
    pub fn get_by_data(
        env: &Environment,
        slug: &str,
        key: &str,
        value: &str,
    ) -> StorageResult<Vec<Rc<Document>>> {
        Ok(Self::get_by_type(env, slug)?
            .into_iter()
            .filter(|document| document.data().get(key) == Some(value))
            .collect())
    }

    /// Builds (or reuses) the instance for a row without caching it.
    fn resolve_row(env: &Environment, row: DocumentRow) -> StorageResult<Option<Rc<Document>>> {
        if row.id == GENESIS_ID {
            return Err(StorageError::ReservedId { table: "documents" });
        }
        let cached = env.cache().documents.latest(SECTION_ID, &row.id.to_string());
        if cached.is_some() {
            return Ok(cached);
        }
        let Some(_token) = env.begin_construction(EntityKind::Document, row.id) else {
            return Ok(None);
        };

        let Some(doc_type) = env.document_type(&row.doc_type) else {
            warn!(
                "event=row_skipped module=document status=skipped id={} type={} reason=type_unregistered",
                row.id, row.doc_type
            );
            return Ok(None);
        };
        let Some(origin) = Domain::get_by_id(env, row.origin_id)? else {
            warn!(
                "event=row_skipped module=document status=skipped id={} origin_id={} reason=origin_unresolved",
                row.id, row.origin_id
            );
            return Ok(None);
        };
        let Some(owner) = User::get_by_id(env, row.owner_id)? else {
            warn!(
                "event=row_skipped module=document status=skipped id={} owner_id={} reason=owner_unresolved",
                row.id, row.owner_id
            );
            return Ok(None);
        };

        Ok(Some(Rc::new(Self {
            id: Cell::new(Some(row.id)),
            doc_type,
            owner,
            origin,
            data: RefCell::new(Attributes::from_stored(row.data)),
        })))
    }

    pub fn doc_type(&self) -> &Rc<dyn DocumentType> {
        &self.doc_type
    }

    pub fn slug(&self) -> &str {
        self.doc_type.slug()
    }

    pub fn owner(&self) -> &Rc<User> {
        &self.owner
    }

    pub fn origin(&self) -> &Rc<Domain> {
        &self.origin
    }

    pub fn data(&self) -> Ref<'_, Attributes> {
        self.data.borrow()
    }

    pub fn set_data(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Option<String>, AttributeError> {
        self.data.borrow_mut().set(key, value)
    }

    pub fn remove_data(&self, key: &str) -> Option<String> {
        self.data.borrow_mut().remove(key)
    }

    fn access<'a>(&'a self, actor: Option<&'a User>, data: &'a Attributes) -> DocumentAccess<'a> {
        DocumentAccess {
            actor,
            owner: &self.owner,
            origin: &self.origin,
            data,
        }
    }

    /// Whether `actor` may write below this document's origin.
    pub fn origin_is_writable(&self, env: &Environment, actor: &User) -> bool {
        if actor.is_genesis() {
            return true;
        }
        let Some(actor_origin) = actor.origin(env) else {
            return false;
        };
        let Some(grand_origin) = actor_origin.parent() else {
            return false;
        };
        self.origin.is(grand_origin) || self.origin.is_editable(env, actor)
    }

    pub fn is_creatable(&self, env: &Environment, actor: &User) -> bool {
        if !self.is_editable(env, actor) {
            return false;
        }
        let data = self.data.borrow();
        self.doc_type.is_creatable(&self.access(Some(actor), &data))
    }

    /// Whether anonymous visitors of `domain` may read this document.
    pub fn is_readable_by_public(&self, env: &Environment, domain: &Domain) -> bool {
        if !self.origin.origin(env).is_in(domain.ancestry(env)) {
            return false;
        }
        let data = self.data.borrow();
        self.doc_type.is_readable_by_public(&self.access(None, &data))
    }

    pub fn is_readable(&self, env: &Environment, actor: &User) -> bool {
        if !self.origin.is_readable(env, actor) {
            return false;
        }
        let granted = {
            let data = self.data.borrow();
            self.doc_type.is_readable(&self.access(Some(actor), &data))
        };
        granted
            || actor
                .origin(env)
                .is_some_and(|actor_origin| self.is_readable_by_public(env, &actor_origin))
    }

    pub fn is_editable(&self, env: &Environment, actor: &User) -> bool {
        if !self.origin_is_writable(env, actor) {
            return false;
        }
        let data = self.data.borrow();
        self.doc_type.is_editable(&self.access(Some(actor), &data))
    }

    pub fn is_deletable(&self, env: &Environment, actor: &User) -> bool {
        if !self.origin_is_writable(env, actor) {
            return false;
        }
        let data = self.data.borrow();
        self.doc_type.is_deletable(&self.access(Some(actor), &data))
    }

    /// Persists this document on behalf of `actor`, then runs the type's
    /// lifecycle hook. `Ok(false)` when denied.
    pub fn save(self: &Rc<Self>, env: &Environment, actor: &User) -> EntityResult<bool> {
        if let Some(id) = self.id() {
            if !self.is_editable(env, actor) {
                debug!("event=document_save module=document status=denied id={id}");
                return Ok(false);
            }
            env.storage().update_document(id, &self.data())?;
            info!(
                "event=document_save module=document status=ok mode=update id={id} type={}",
                self.slug()
            );
            self.doc_type.on_update(env, self);
            return Ok(true);
        }

        if !self.is_creatable(env, actor) {
            debug!(
                "event=document_save module=document status=denied mode=insert type={}",
                self.slug()
            );
            return Ok(false);
        }
        let origin_id = self.origin.id().ok_or(EntityError::DraftReference {
            kind: EntityKind::Document,
            relation: "origin",
        })?;
        let owner_id = self.owner.id().ok_or(EntityError::DraftReference {
            kind: EntityKind::Document,
            relation: "owner",
        })?;

        let id = env.storage().insert_document(
            origin_id,
            owner_id,
            self.slug(),
            &self.data(),
        )?;
        self.id.set(Some(id));
        {
            let mut cache = env.cache_mut();
            cache
                .documents
                .save(SECTION_ID, id.to_string(), Rc::clone(self));
            cache
                .documents
                .save_if_indexed(SECTION_TYPE, self.slug(), Rc::clone(self));
        }
        info!(
            "event=document_save module=document status=ok mode=insert id={id} type={} origin_id={origin_id}",
            self.slug()
        );
        self.doc_type.on_insert(env, self);
        Ok(true)
    }

    /// Deletes this document's row on behalf of `actor` and reverts it to
    /// draft.
    pub fn delete(&self, env: &Environment, actor: &User) -> EntityResult<bool> {
        let Some(id) = self.id() else {
            return Ok(false);
        };
        if !self.is_deletable(env, actor) {
            debug!("event=document_delete module=document status=denied id={id}");
            return Ok(false);
        }

        env.storage().delete_document(id)?;
        env.cache_mut().documents.evict(self);
        self.id.set(None);
        info!("event=document_delete module=document status=ok id={id}");
        Ok(true)
    }
}
