#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;
use tenancy_core::repo::storage::{DocumentRow, DomainRow, UserRow};
use tenancy_core::{
    Attributes, Domain, EntityId, Environment, GenesisSeed, SqliteStorage, StoragePort,
    StorageResult, User,
};

/// Storage wrapper counting lookup calls that reach the backend.
pub struct CountingStorage {
    inner: SqliteStorage,
    reads: Rc<Cell<usize>>,
}

impl CountingStorage {
    pub fn new(inner: SqliteStorage) -> (Self, Rc<Cell<usize>>) {
        let reads = Rc::new(Cell::new(0));
        (
            Self {
                inner,
                reads: Rc::clone(&reads),
            },
            reads,
        )
    }

    fn count(&self) {
        self.reads.set(self.reads.get() + 1);
    }
}

impl StoragePort for CountingStorage {
    fn get_documents_by_type(&self, doc_type: &str) -> StorageResult<Vec<DocumentRow>> {
        self.count();
        self.inner.get_documents_by_type(doc_type)
    }

    fn get_domain_by_id(&self, id: EntityId) -> StorageResult<Vec<DomainRow>> {
        self.count();
        self.inner.get_domain_by_id(id)
    }

    fn get_domain_by_name(&self, name: &str) -> StorageResult<Vec<DomainRow>> {
        self.count();
        self.inner.get_domain_by_name(name)
    }

    fn get_user_by_id(&self, id: EntityId) -> StorageResult<Vec<UserRow>> {
        self.count();
        self.inner.get_user_by_id(id)
    }

    fn insert_document(
        &self,
        origin_id: EntityId,
        owner_id: EntityId,
        doc_type: &str,
        data: &Attributes,
    ) -> StorageResult<EntityId> {
        self.inner
            .insert_document(origin_id, owner_id, doc_type, data)
    }

    fn insert_domain(
        &self,
        name: &str,
        origin_id: EntityId,
        owner_id: EntityId,
        data: &Attributes,
    ) -> StorageResult<EntityId> {
        self.inner.insert_domain(name, origin_id, owner_id, data)
    }

    fn insert_user(&self, origin_id: EntityId, data: &Attributes) -> StorageResult<EntityId> {
        self.inner.insert_user(origin_id, data)
    }

    fn update_document(&self, id: EntityId, data: &Attributes) -> StorageResult<()> {
        self.inner.update_document(id, data)
    }

    fn update_domain(&self, id: EntityId, data: &Attributes) -> StorageResult<()> {
        self.inner.update_domain(id, data)
    }

    fn update_user(&self, id: EntityId, data: &Attributes) -> StorageResult<()> {
        self.inner.update_user(id, data)
    }

    fn delete_document(&self, id: EntityId) -> StorageResult<()> {
        self.inner.delete_document(id)
    }

    fn delete_domain(&self, id: EntityId) -> StorageResult<()> {
        self.inner.delete_domain(id)
    }

    fn delete_user(&self, id: EntityId) -> StorageResult<()> {
        self.inner.delete_user(id)
    }
}

pub fn fresh_env() -> Environment {
    Environment::new(
        Box::new(SqliteStorage::open_in_memory().unwrap()),
        GenesisSeed::default(),
    )
}

/// Starts a new session over the storage of `env`, dropping its cache.
pub fn reopen(env: Environment) -> Environment {
    Environment::new(env.into_storage(), GenesisSeed::default())
}

/// Saves a domain as the genesis user and returns it.
pub fn saved_domain(
    env: &Environment,
    name: &str,
    owner: &Rc<User>,
    origin: &Rc<Domain>,
    depth_allowed: Option<i64>,
) -> Rc<Domain> {
    let domain = Domain::create(name, Rc::clone(owner), Rc::clone(origin)).unwrap();
    if let Some(depth) = depth_allowed {
        domain
            .set_data("depth_allowed", depth.to_string())
            .unwrap();
    }
    assert!(domain.save(env, &env.genesis_user()).unwrap());
    domain
}

/// Saves a user registered under `origin` as the genesis user.
pub fn saved_user(env: &Environment, origin: &Rc<Domain>) -> Rc<User> {
    let user = User::create(Rc::clone(origin));
    assert!(user.save(env, &env.genesis_user()).unwrap());
    user
}
