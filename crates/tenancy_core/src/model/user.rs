//! User (principal) entity.
//!
//! A stored user references its origin domain by id and resolves it on
//! demand. Domains resolve their owner user eagerly, so resolving the user's
//! origin lazily is what lets "domain owned by a user registered in that same
//! domain" load without tripping the construction guard.

use crate::context::cache::SECTION_ID;
use crate::context::Environment;
use crate::model::attributes::{AttributeError, Attributes};
use crate::model::domain::Domain;
use crate::model::error::{EntityError, EntityResult};
use crate::model::identity::{EntityId, EntityKind, Identity, GENESIS_ID};
use crate::repo::storage::{StorageError, StorageResult, UserRow};
use log::{debug, info, warn};
use std::cell::{Cell, Ref, RefCell};
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

enum OriginLink {
    /// Genesis user.
    Unset,
    /// Stored user; resolved through the session cache.
    Id(EntityId),
    /// Draft user created against a domain instance.
    Domain(Rc<Domain>),
}

pub struct User {
    id: Cell<Option<EntityId>>,
    origin: OriginLink,
    data: RefCell<Attributes>,
}

impl Identity for User {
    fn id(&self) -> Option<EntityId> {
        self.id.get()
    }
}

impl Debug for User {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id.get())
            .field("origin", &self.origin_id())
            .field("data", &self.data.borrow())
            .finish()
    }
}

impl User {
    pub(crate) fn genesis_instance() -> Self {
        Self {
            id: Cell::new(Some(GENESIS_ID)),
            origin: OriginLink::Unset,
            data: RefCell::new(Attributes::new()),
        }
    }

    /// The session's root user.
    pub fn genesis(env: &Environment) -> Rc<User> {
        env.genesis_user()
    }

    /// Creates a draft user registered under `origin`.
    pub fn create(origin: Rc<Domain>) -> Rc<User> {
        Rc::new(Self {
            id: Cell::new(None),
            origin: OriginLink::Domain(origin),
            data: RefCell::new(Attributes::new()),
        })
    }

    /// Resolves one user by id, cache first.
    pub fn get_by_id(env: &Environment, id: EntityId) -> StorageResult<Option<Rc<User>>> {
        if id == GENESIS_ID {
            return Ok(Some(env.genesis_user()));
        }
        let cached = env.cache().users.latest(SECTION_ID, &id.to_string());
        if cached.is_some() {
            return Ok(cached);
        }

        let mut found = None;
        for row in env.storage().get_user_by_id(id)? {
            if let Some(user) = Self::resolve_row(env, row)? {
                found = Some(user);
            }
        }
        Ok(found)
    }

    fn resolve_row(env: &Environment, row: UserRow) -> StorageResult<Option<Rc<User>>> {
        if row.id == GENESIS_ID {
            return Err(StorageError::ReservedId { table: "users" });
        }
        let key = row.id.to_string();
        let cached = env.cache().users.latest(SECTION_ID, &key);
        if cached.is_some() {
            return Ok(cached);
        }
        let Some(_token) = env.begin_construction(EntityKind::User, row.id) else {
            return Ok(None);
        };

        let user = Rc::new(Self {
            id: Cell::new(Some(row.id)),
            origin: OriginLink::Id(row.origin_id),
            data: RefCell::new(Attributes::from_stored(row.data)),
        });
        env.cache_mut().users.save(SECTION_ID, key, Rc::clone(&user));
        debug!("event=row_resolved module=user status=ok id={}", row.id);
        Ok(Some(user))
    }

    pub fn is_genesis(&self) -> bool {
        self.id() == Some(GENESIS_ID)
    }

    /// Id of the origin domain, if known.
    pub fn origin_id(&self) -> Option<EntityId> {
        match &self.origin {
            OriginLink::Unset => None,
            OriginLink::Id(id) => Some(*id),
            OriginLink::Domain(domain) => domain.id(),
        }
    }

    /// Origin domain. `None` for genesis or when the stored origin no longer
    /// resolves.
    pub fn origin(&self, env: &Environment) -> Option<Rc<Domain>> {
        match &self.origin {
            OriginLink::Unset => None,
            OriginLink::Domain(domain) => Some(Rc::clone(domain)),
            OriginLink::Id(id) => match Domain::get_by_id(env, *id) {
                Ok(domain) => domain,
                Err(err) => {
                    warn!(
                        "event=origin_resolve module=user status=error user_id={:?} origin_id={id} error={err}",
                        self.id()
                    );
                    None
                }
            },
        }
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

    /// Whether `actor` may create this user.
    ///
    /// Self-registration compares identities, so for a draft it only holds
    /// when `actor` is this very instance.
    pub fn is_creatable(&self, env: &Environment, actor: &User) -> bool {
        let Some(origin) = self.origin(env) else {
            return false;
        };
        origin.is_editable(env, actor) || (self.is(actor) && origin.users_can_register())
    }

    /// Users may always edit themselves.
    pub fn is_editable(&self, env: &Environment, actor: &User) -> bool {
        self.is(actor) || self.is_creatable(env, actor)
    }

    pub fn is_readable(&self, env: &Environment, actor: &User) -> bool {
        self.is_editable(env, actor)
    }

    pub fn is_deletable(&self, env: &Environment, actor: &User) -> bool {
        self.is_editable(env, actor)
    }

    /// Persists this user on behalf of `actor`; `Ok(false)` when denied.
    pub fn save(self: &Rc<Self>, env: &Environment, actor: &User) -> EntityResult<bool> {
        if self.is_genesis() {
            return Err(EntityError::ReservedId(EntityKind::User));
        }

        if let Some(id) = self.id() {
            if !self.is_editable(env, actor) {
                debug!("event=user_save module=user status=denied id={id}");
                return Ok(false);
            }
            env.storage().update_user(id, &self.data())?;
            info!("event=user_save module=user status=ok mode=update id={id}");
            return Ok(true);
        }

        if !self.is_creatable(env, actor) {
            debug!("event=user_save module=user status=denied mode=insert");
            return Ok(false);
        }
        let origin_id = self.origin_id().ok_or(EntityError::DraftReference {
            kind: EntityKind::User,
            relation: "origin",
        })?;

        let id = env.storage().insert_user(origin_id, &self.data())?;
        self.id.set(Some(id));
        env.cache_mut()
            .users
            .save(SECTION_ID, id.to_string(), Rc::clone(self));
        info!("event=user_save module=user status=ok mode=insert id={id} origin_id={origin_id}");
        Ok(true)
    }

    /// Deletes this user's row on behalf of `actor` and reverts it to draft.
    pub fn delete(&self, env: &Environment, actor: &User) -> EntityResult<bool> {
        if self.is_genesis() {
            return Err(EntityError::ReservedId(EntityKind::User));
        }
        let Some(id) = self.id() else {
            return Ok(false);
        };
        if !self.is_deletable(env, actor) {
            debug!("event=user_delete module=user status=denied id={id}");
            return Ok(false);
        }

        env.storage().delete_user(id)?;
        env.cache_mut().users.evict(self);
        self.id.set(None);
        info!("event=user_delete module=user status=ok id={id}");
        Ok(true)
    }
}
