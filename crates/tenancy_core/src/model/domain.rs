//! Domain (tenant) entity.
//!
//! # Responsibility
//! - Model one node of the tenancy hierarchy with its owner and origin.
//! - Resolve domains by id or name through the session cache.
//! - Decide create/read/update/delete rights, including depth quotas.
//!
//! # Invariants
//! - Genesis is the only domain without a parent; its origin is itself.
//! - A reconstructed domain's origin and owner are resolved before the domain
//!   exists, so origin chains are finite and acyclic.
//! - `id`, `data` are the only mutable parts.

use crate::context::cache::{first_created, SECTION_ID, SECTION_NAME};
use crate::context::Environment;
use crate::model::attributes::{
    AttributeError, Attributes, DEPTH_ALLOWED_KEY, USERS_CAN_REGISTER_KEY,
};
use crate::model::error::{EntityError, EntityResult};
use crate::model::identity::{EntityId, EntityKind, Identity, GENESIS_ID};
use crate::model::user::User;
use crate::repo::storage::{DomainRow, StorageError, StorageResult};
use log::{debug, info, warn};
use std::cell::{Cell, Ref, RefCell};
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Quota sentinel meaning "no depth limit".
pub const UNLIMITED_DEPTH: i64 = -1;

pub struct Domain {
    id: Cell<Option<EntityId>>,
    name: String,
    owner: Rc<User>,
    /// `None` only for genesis.
    origin: Option<Rc<Domain>>,
    data: RefCell<Attributes>,
}

impl Identity for Domain {
    fn id(&self) -> Option<EntityId> {
        self.id.get()
    }
}

impl Debug for Domain {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Domain")
            .field("id", &self.id.get())
            .field("name", &self.name)
            .field("owner", &self.owner.id())
            .field("origin", &self.origin.as_ref().map(|origin| origin.id()))
            .field("data", &self.data.borrow())
            .finish()
    }
}

impl Domain {
    pub(crate) fn genesis_instance(name: String, data: Attributes, owner: Rc<User>) -> Self {
        Self {
            id: Cell::new(Some(GENESIS_ID)),
            name,
            owner,
            origin: None,
            data: RefCell::new(data),
        }
    }

    /// The session's root domain.
    pub fn genesis(env: &Environment) -> Rc<Domain> {
        env.genesis_domain()
    }

    /// Creates a draft domain under `origin`.
    pub fn create(
        name: &str,
        owner: Rc<User>,
        origin: Rc<Domain>,
    ) -> EntityResult<Rc<Domain>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EntityError::InvalidName);
        }
        Ok(Rc::new(Self {
            id: Cell::new(None),
            name: name.to_string(),
            owner,
            origin: Some(origin),
            data: RefCell::new(Attributes::new()),
        }))
    }

    /// Resolves one domain by id, cache first.
    pub fn get_by_id(env: &Environment, id: EntityId) -> StorageResult<Option<Rc<Domain>>> {
        if id == GENESIS_ID {
            return Ok(Some(env.genesis_domain()));
        }
        let cached = env.cache().domains.latest(SECTION_ID, &id.to_string());
        if cached.is_some() {
            return Ok(cached);
        }

        let mut found = None;
        for row in env.storage().get_domain_by_id(id)? {
            if let Some(domain) = Self::resolve_row(env, row)? {
                found = Some(domain);
            }
        }
        Ok(found)
    }

    /// Resolves one domain by name. Reused names resolve to the oldest row.
    ///
    /// The name is trimmed the same way `create` trims it.
    pub fn get_by_name(env: &Environment, name: &str) -> StorageResult<Option<Rc<Domain>>> {
        let name = name.trim();
        let cached = env.cache().domains.get(SECTION_NAME, name);
        if !cached.is_empty() {
            return Ok(first_created(&cached));
        }

        let mut resolved = Vec::new();
        for row in env.storage().get_domain_by_name(name)? {
            if let Some(domain) = Self::resolve_row(env, row)? {
                resolved.push(domain);
            }
        }

        let mut cache = env.cache_mut();
        for domain in &resolved {
            cache.domains.save(SECTION_NAME, name, Rc::clone(domain));
        }
        Ok(first_created(&resolved))
    }

    fn resolve_row(env: &Environment, row: DomainRow) -> StorageResult<Option<Rc<Domain>>> {
        if row.id == GENESIS_ID {
            return Err(StorageError::ReservedId { table: "domains" });
        }
        let key = row.id.to_string();
        let cached = env.cache().domains.latest(SECTION_ID, &key);
        if cached.is_some() {
            return Ok(cached);
        }

        let Some(_token) = env.begin_construction(EntityKind::Domain, row.id) else {
            return Ok(None);
        };
        let Some(origin) = Self::get_by_id(env, row.origin_id)? else {
            warn!(
                "event=row_skipped module=domain status=skipped id={} origin_id={} reason=origin_unresolved",
                row.id, row.origin_id
            );
            return Ok(None);
        };
        let Some(owner) = User::get_by_id(env, row.owner_id)? else {
            warn!(
                "event=row_skipped module=domain status=skipped id={} owner_id={} reason=owner_unresolved",
                row.id, row.owner_id
            );
            return Ok(None);
        };

        let domain = Rc::new(Self {
            id: Cell::new(Some(row.id)),
            name: row.name,
            owner,
            origin: Some(origin),
            data: RefCell::new(Attributes::from_stored(row.data)),
        });
        env.cache_mut()
            .domains
            .save(SECTION_ID, key, Rc::clone(&domain));
        debug!("event=row_resolved module=domain status=ok id={}", row.id);
        Ok(Some(domain))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &Rc<User> {
        &self.owner
    }

    /// Origin domain; genesis resolves to itself.
    pub fn origin(&self, env: &Environment) -> Rc<Domain> {
        match &self.origin {
            Some(origin) => Rc::clone(origin),
            None => env.genesis_domain(),
        }
    }

    /// Origin as a real parent: `None` for genesis.
    pub fn parent(&self) -> Option<&Rc<Domain>> {
        self.origin.as_ref()
    }

    pub fn is_genesis(&self) -> bool {
        self.origin.is_none()
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

    /// Quota declared on this domain alone (`-1` = unlimited).
    pub fn declared_depth_allowed(&self) -> i64 {
        self.data.borrow().int_or(DEPTH_ALLOWED_KEY, UNLIMITED_DEPTH)
    }

    /// Whether visitors may register themselves as users of this domain.
    pub fn users_can_register(&self) -> bool {
        self.data.borrow().flag_or(USERS_CAN_REGISTER_KEY, true)
    }

    /// Successive origins, starting at this domain's origin and ending with
    /// genesis.
    pub fn ancestry(&self, env: &Environment) -> Vec<Rc<Domain>> {
        let mut chain: Vec<Rc<Domain>> = Vec::new();
        let mut cursor = self.origin(env);
        while !cursor.is_in(&chain) {
            let next = cursor.origin(env);
            chain.push(cursor);
            cursor = next;
        }
        chain
    }

    /// Number of further origination levels `user` may open below this
    /// domain; `-1` means unlimited, `0` means none.
    pub fn depth_allowed(&self, env: &Environment, user: &User) -> i64 {
        if user.is_genesis() {
            return UNLIMITED_DEPTH;
        }

        // Users registered directly under genesis get no quota where they
        // hold no rights.
        let grand_origin = user
            .origin(env)
            .and_then(|origin| origin.parent().cloned());
        if grand_origin.is_none() && !self.is_editable(env, user) {
            return 0;
        }

        let own = self.declared_depth_allowed();
        let Some(origin) = self.parent() else {
            return own;
        };

        let mut parent_max = origin.depth_allowed(env, &self.owner) - 1;
        if parent_max < 0 {
            parent_max += 1;
        }

        if own < 0 {
            parent_max
        } else if parent_max < 0 {
            own
        } else {
            own.min(parent_max)
        }
    }

    pub fn is_creatable(&self, env: &Environment, user: &User) -> bool {
        let Some(origin) = self.parent() else {
            return false;
        };
        origin.depth_allowed(env, user) != 0
            && (self.owner.is(user) || origin.is_editable(env, user))
    }

    pub fn is_editable(&self, env: &Environment, user: &User) -> bool {
        user.is_genesis() || self.is_creatable(env, user)
    }

    pub fn is_deletable(&self, env: &Environment, user: &User) -> bool {
        self.is_editable(env, user)
    }

    pub fn is_readable(&self, env: &Environment, user: &User) -> bool {
        if self.is_genesis() || self.is_editable(env, user) {
            return true;
        }
        match user.origin(env) {
            Some(user_origin) => self.origin(env).is_in(user_origin.ancestry(env)),
            None => false,
        }
    }

    /// Persists this domain on behalf of `user`.
    ///
    /// Returns `Ok(false)` without side effects when `user` lacks the right.
    pub fn save(self: &Rc<Self>, env: &Environment, user: &User) -> EntityResult<bool> {
        let Some(origin) = self.parent() else {
            return Err(EntityError::ReservedId(EntityKind::Domain));
        };

        if let Some(id) = self.id() {
            if !self.is_editable(env, user) {
                debug!("event=domain_save module=domain status=denied id={id}");
                return Ok(false);
            }
            env.storage().update_domain(id, &self.data())?;
            info!("event=domain_save module=domain status=ok mode=update id={id}");
            return Ok(true);
        }

        if !self.is_creatable(env, user) {
            debug!(
                "event=domain_save module=domain status=denied mode=insert name={}",
                self.name
            );
            return Ok(false);
        }
        let origin_id = origin.id().ok_or(EntityError::DraftReference {
            kind: EntityKind::Domain,
            relation: "origin",
        })?;
        let owner_id = self.owner.id().ok_or(EntityError::DraftReference {
            kind: EntityKind::Domain,
            relation: "owner",
        })?;

        let id = env
            .storage()
            .insert_domain(&self.name, origin_id, owner_id, &self.data())?;
        self.id.set(Some(id));

        let mut cache = env.cache_mut();
        cache
            .domains
            .save(SECTION_ID, id.to_string(), Rc::clone(self));
        cache
            .domains
            .save_if_indexed(SECTION_NAME, &self.name, Rc::clone(self));
        info!("event=domain_save module=domain status=ok mode=insert id={id} origin_id={origin_id}");
        Ok(true)
    }

    /// Deletes this domain's row on behalf of `user` and reverts it to draft.
    pub fn delete(&self, env: &Environment, user: &User) -> EntityResult<bool> {
        if self.is_genesis() {
            return Err(EntityError::ReservedId(EntityKind::Domain));
        }
        let Some(id) = self.id() else {
            return Ok(false);
        };
        if !self.is_deletable(env, user) {
            debug!("event=domain_delete module=domain status=denied id={id}");
            return Ok(false);
        }

        env.storage().delete_domain(id)?;
        env.cache_mut().domains.evict(self);
        self.id.set(None);
        info!("event=domain_delete module=domain status=ok id={id}");
        Ok(true)
    }
}
