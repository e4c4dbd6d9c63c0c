//! Thread-local arena backing every [`ResolvedLocVector`] handle.
//!
//! Storage is keyed by a monotonically increasing id. Ids are never reused,
//! so an id below the next free one that is missing from the arena was
//! released, and any other id was never issued on this thread.
//!
//! The registry itself is only borrowed for lookups and never while caller
//! code runs; callers hold an `Rc` to the storage of one vector instead.
//!
//! [`ResolvedLocVector`]: crate::vector::ResolvedLocVector

use crate::resolved::ResolvedLoc;
use crate::vector::errors::HandleError;
use crate::vector::OpaqueValue;
use std::cell::RefCell;
use std::collections::HashMap;
use std::num::NonZeroU64;
use std::rc::Rc;

pub(crate) type Storage = Rc<RefCell<Vec<ResolvedLoc>>>;

thread_local! {
    static REGISTRY: RefCell<Registry> = RefCell::new(Registry::new());
}

struct Registry {
    next_id: NonZeroU64,
    live: HashMap<u64, Storage>,
}

impl Registry {
    fn new() -> Self {
        Registry {
            next_id: NonZeroU64::MIN,
            live: HashMap::new(),
        }
    }

    fn insert(&mut self, locs: Vec<ResolvedLoc>) -> OpaqueValue {
        let handle = OpaqueValue(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        tracing::trace!(
            handle = handle.get(),
            len = locs.len(),
            "registered resolved location vector"
        );
        self.live.insert(handle.get(), Rc::new(RefCell::new(locs)));
        handle
    }

    fn get(&self, handle: OpaqueValue) -> Result<Storage, HandleError> {
        match self.live.get(&handle.get()) {
            Some(storage) => Ok(Rc::clone(storage)),
            None => Err(self.missing(handle)),
        }
    }

    fn remove(&mut self, handle: OpaqueValue) -> Result<Storage, HandleError> {
        match self.live.remove(&handle.get()) {
            Some(storage) => {
                tracing::trace!(handle = handle.get(), "released resolved location vector");
                Ok(storage)
            }
            None => {
                let error = self.missing(handle);
                tracing::warn!(%error, "rejected release of resolved location vector");
                Err(error)
            }
        }
    }

    fn missing(&self, handle: OpaqueValue) -> HandleError {
        if handle.get() < self.next_id.get() {
            HandleError::Released { handle }
        } else {
            HandleError::Unknown { handle }
        }
    }
}

pub(crate) fn insert(locs: Vec<ResolvedLoc>) -> OpaqueValue {
    REGISTRY.with_borrow_mut(|registry| registry.insert(locs))
}

pub(crate) fn lookup(handle: OpaqueValue) -> Result<Storage, HandleError> {
    REGISTRY.with_borrow(|registry| registry.get(handle))
}

/// Remove `handle` from the registry and return its contents.
///
/// If a reader on this thread still holds the storage (a release from inside
/// `with_unbridged`), the contents are copied out and the reader's view stays
/// intact until it returns.
pub(crate) fn release(handle: OpaqueValue) -> Result<Vec<ResolvedLoc>, HandleError> {
    let storage = REGISTRY.with_borrow_mut(|registry| registry.remove(handle))?;
    Ok(match Rc::try_unwrap(storage) {
        Ok(cell) => cell.into_inner(),
        Err(shared) => shared.borrow().clone(),
    })
}

/// Number of vectors currently allocated on this thread.
pub fn live_vector_count() -> usize {
    REGISTRY.with_borrow(|registry| registry.live.len())
}
