// src/stage/registry.rs

//! Registry of stage processes that have been spawned but not yet reaped.
//!
//! The cancellation controller owns one registry per run and signals the
//! process group of every entry during teardown. Stage handles add
//! themselves on spawn and remove themselves once their exit status has
//! been collected, so an entry always refers to a pid that cannot have
//! been recycled yet.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::types::Engine;

#[derive(Debug, Clone, Default)]
pub struct ProcessRegistry {
    live: Arc<Mutex<BTreeMap<u32, Engine>>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<u32, Engine>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, pid: u32, engine: Engine) {
        self.lock().insert(pid, engine);
    }

    pub fn unregister(&self, pid: u32) {
        self.lock().remove(&pid);
    }

    /// Snapshot of `(pid, engine)` for every unreaped stage.
    pub fn live(&self) -> Vec<(u32, Engine)> {
        self.lock().iter().map(|(pid, e)| (*pid, *e)).collect()
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.lock().contains_key(&pid)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }
}
