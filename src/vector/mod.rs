//! Ownership container for bulk resolution results.
//!
//! A [`ResolvedLocVector`] is a handle to a heap-allocated sequence of
//! [`ResolvedLoc`] held in a thread-local registry. The handle can cross a
//! boundary into a runtime that cannot manage Rust memory as a plain integer
//! ([`OpaqueValue`]); that side reads through it and releases it exactly once.
//!
//! Lifecycle:
//!
//! 1. create with [`ResolvedLocVector::empty`], [`ResolvedLocVector::from_slice`]
//!    or [`run_name_matcher`](crate::matcher::run_name_matcher)
//! 2. any number of reads and [`push_back`](ResolvedLocVector::push_back) calls
//! 3. one [`destroy`](ResolvedLocVector::destroy) (or
//!    [`into_vec`](ResolvedLocVector::into_vec))
//!
//! Any use after step 3 returns [`HandleError::Released`].
//!
//! # Example
//!
//! ```
//! use name_locator::{ResolvedLoc, ResolvedLocVector};
//!
//! let vector = ResolvedLocVector::empty();
//! vector.push_back(ResolvedLoc::placeholder())?;
//!
//! let handle = vector.opaque_value();
//! let same = ResolvedLocVector::from_opaque_value(handle);
//! assert_eq!(same.len()?, 1);
//!
//! same.destroy()?;
//! assert!(vector.len().is_err());
//! # Ok::<(), name_locator::HandleError>(())
//! ```

pub mod errors;
pub mod registry;

pub use errors::HandleError;
pub use registry::live_vector_count;

use crate::resolved::ResolvedLoc;
use serde::Serialize;
use std::fmt;
use std::num::NonZeroU64;

/// Boundary representation of a [`ResolvedLocVector`]. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct OpaqueValue(pub(crate) NonZeroU64);

impl OpaqueValue {
    /// Decode a raw boundary value; `0` is the null handle.
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(OpaqueValue)
    }

    /// Raw boundary value.
    pub fn into_raw(self) -> u64 {
        self.0.get()
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for OpaqueValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to a registry-owned `Vec<ResolvedLoc>`.
///
/// Copying the handle does not copy the storage. All copies refer to the same
/// sequence and all become invalid once any of them is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedLocVector {
    handle: OpaqueValue,
}

impl ResolvedLocVector {
    pub fn empty() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Allocate a new vector holding a copy of `locs`.
    pub fn from_slice(locs: &[ResolvedLoc]) -> Self {
        Self::from_vec(locs.to_vec())
    }

    /// Move `locs` into a new registry allocation.
    pub fn from_vec(locs: Vec<ResolvedLoc>) -> Self {
        ResolvedLocVector {
            handle: registry::insert(locs),
        }
    }

    /// Recover the vector behind a previously issued opaque value.
    ///
    /// Does not copy or validate; the first access reports a stale value.
    pub fn from_opaque_value(handle: OpaqueValue) -> Self {
        ResolvedLocVector { handle }
    }

    /// The boundary value for this vector. Ownership does not move.
    pub fn opaque_value(&self) -> OpaqueValue {
        self.handle
    }

    /// Append `loc`. Fails with [`HandleError::Reentrant`] when called from a
    /// `with_unbridged` closure over the same vector.
    pub fn push_back(&self, loc: ResolvedLoc) -> Result<(), HandleError> {
        let storage = registry::lookup(self.handle)?;
        let mut locs = storage
            .try_borrow_mut()
            .map_err(|_| HandleError::Reentrant)?;
        locs.push(loc);
        Ok(())
    }

    /// Run `f` over the current contents without transferring ownership.
    pub fn with_unbridged<F, R>(&self, f: F) -> Result<R, HandleError>
    where
        F: FnOnce(&[ResolvedLoc]) -> R,
    {
        let storage = registry::lookup(self.handle)?;
        let locs = storage.try_borrow().map_err(|_| HandleError::Reentrant)?;
        Ok(f(locs.as_slice()))
    }

    pub fn to_vec(&self) -> Result<Vec<ResolvedLoc>, HandleError> {
        self.with_unbridged(<[ResolvedLoc]>::to_vec)
    }

    pub fn len(&self) -> Result<usize, HandleError> {
        self.with_unbridged(<[ResolvedLoc]>::len)
    }

    pub fn is_empty(&self) -> Result<bool, HandleError> {
        self.with_unbridged(<[ResolvedLoc]>::is_empty)
    }

    pub fn get(&self, index: usize) -> Result<Option<ResolvedLoc>, HandleError> {
        self.with_unbridged(|locs| locs.get(index).cloned())
    }

    /// Whether the handle still refers to live storage.
    pub fn is_live(&self) -> bool {
        registry::lookup(self.handle).is_ok()
    }

    /// Release the storage. Every copy of this handle is invalid afterwards.
    pub fn destroy(self) -> Result<(), HandleError> {
        registry::release(self.handle).map(drop)
    }

    /// Release the handle and take the storage back as an owned `Vec`.
    pub fn into_vec(self) -> Result<Vec<ResolvedLoc>, HandleError> {
        registry::release(self.handle)
    }
}
