//! Construction-in-progress guard.
//!
//! Rows are reconstructed recursively (a domain needs its origin domain and
//! owner user first). An id that is already being reconstructed further up the
//! call stack is treated as unresolved, which turns a cyclic stored graph into
//! "not found" instead of unbounded recursion.

use crate::model::identity::{EntityId, EntityKind};
use log::debug;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

/// Ids currently being reconstructed, per entity kind.
#[derive(Debug, Default)]
pub struct ConstructionGuard {
    in_progress: BTreeMap<EntityKind, BTreeSet<EntityId>>,
}

impl ConstructionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `id` as in progress. Returns `false` when it already was.
    pub fn enter(&mut self, kind: EntityKind, id: EntityId) -> bool {
        self.in_progress.entry(kind).or_default().insert(id)
    }

    pub fn leave(&mut self, kind: EntityKind, id: EntityId) {
        if let Some(ids) = self.in_progress.get_mut(&kind) {
            ids.remove(&id);
        }
    }

    pub fn is_in_progress(&self, kind: EntityKind, id: EntityId) -> bool {
        self.in_progress
            .get(&kind)
            .is_some_and(|ids| ids.contains(&id))
    }
}

/// Scope marker; leaves the guard when dropped.
pub struct ConstructionToken<'a> {
    guard: &'a RefCell<ConstructionGuard>,
    kind: EntityKind,
    id: EntityId,
}

impl<'a> ConstructionToken<'a> {
    /// Enters `id` on `guard`, or returns `None` when it is already in progress.
    pub fn begin(
        guard: &'a RefCell<ConstructionGuard>,
        kind: EntityKind,
        id: EntityId,
    ) -> Option<Self> {
        if !guard.borrow_mut().enter(kind, id) {
            debug!("event=construction_cycle module=context status=skipped kind={kind} id={id}");
            return None;
        }
        Some(Self { guard, kind, id })
    }
}

impl Drop for ConstructionToken<'_> {
    fn drop(&mut self) {
        self.guard.borrow_mut().leave(self.kind, self.id);
    }
}
