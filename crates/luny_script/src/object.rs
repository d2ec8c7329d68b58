//! Object handles.
//!
//! A script never owns the game object it is attached to. It carries an
//! [`ObjectHandle`] through every block call so blocks know who they act on,
//! and the host maps handles back to its own objects.

use std::fmt;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// A non-owning reference to a host game object.
///
/// Raw id `0` is reserved for [`ObjectHandle::INVALID`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectHandle(u64);

impl ObjectHandle {
    /// The null handle. Never issued by an allocator.
    pub const INVALID: ObjectHandle = ObjectHandle(0);

    /// Wrap a raw host id.
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// The raw host id.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }

    /// Returns `true` unless this is [`ObjectHandle::INVALID`].
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({})", self.0)
    }
}

/// Issues handles for a host and tracks how many of them are alive.
///
/// Ids are never reused, so a stale handle can never alias a newer object.
#[derive(Debug, Default)]
pub struct ObjectAllocator {
    last: u64,
    live: IndexSet<ObjectHandle>,
}

impl ObjectAllocator {
    /// An allocator whose first handle is `Object(1)`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next handle.
    pub fn allocate(&mut self) -> ObjectHandle {
        self.last += 1;
        let handle = ObjectHandle(self.last);
        self.live.insert(handle);
        handle
    }

    /// Mark `handle` as gone. Returns `false` for handles this allocator
    /// never issued or already released.
    pub fn release(&mut self, handle: ObjectHandle) -> bool {
        self.live.shift_remove(&handle)
    }

    /// Returns `true` if `handle` was issued and not yet released.
    #[must_use]
    pub fn is_live(&self, handle: ObjectHandle) -> bool {
        self.live.contains(&handle)
    }

    /// Handles issued and not yet released.
    #[must_use]
    pub fn live(&self) -> u64 {
        self.live.len() as u64
    }

    /// Handles issued over the allocator's lifetime.
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.last
    }
}
