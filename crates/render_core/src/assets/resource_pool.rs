//! Keyed resource pool with reference-counted handles
//!
//! A [`ResourcePool`] guarantees at most one live instance per key. Lookups
//! hand out [`Handle`]s; a handle is a counted claim on the pooled instance,
//! not an owner of its destruction. When the last handle goes away the entry
//! stays resident (so it can be re-requested without rebuilding) until the
//! pool is swept with [`ResourcePool::release_all_unused`].
//!
//! Each entry carries a claim counter shared with its handles. Only handles
//! move it, so the count stays exact even after the pool itself is gone.

use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::ops::Deref;
use std::rc::Rc;

/// Pooled instance plus the number of handles claiming it
struct Resident<R> {
    resource: Rc<R>,
    claims: Rc<Cell<usize>>,
}

impl<R> Resident<R> {
    fn new(resource: R) -> Self {
        Self {
            resource: Rc::new(resource),
            claims: Rc::new(Cell::new(0)),
        }
    }

    fn claim(&self) -> Handle<R> {
        Handle::new(Rc::clone(&self.resource), Rc::clone(&self.claims))
    }

    fn outstanding(&self) -> usize {
        self.claims.get()
    }
}

/// Counted claim on a pooled (or always-shared) resource
pub struct Handle<R> {
    resource: Rc<R>,
    claims: Rc<Cell<usize>>,
}

impl<R> Handle<R> {
    fn new(resource: Rc<R>, claims: Rc<Cell<usize>>) -> Self {
        claims.set(claims.get() + 1);
        Self { resource, claims }
    }

    /// Number of live handles (this one included) referencing the same entry
    pub fn handle_count(&self) -> usize {
        self.claims.get()
    }

    /// Whether both handles refer to the same resource instance
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.resource, &other.resource)
    }
}

impl<R> Clone for Handle<R> {
    fn clone(&self) -> Self {
        Self::new(Rc::clone(&self.resource), Rc::clone(&self.claims))
    }
}

impl<R> Drop for Handle<R> {
    fn drop(&mut self) {
        self.claims.set(self.claims.get().saturating_sub(1));
    }
}

impl<R> Deref for Handle<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.resource
    }
}

impl<R> AsRef<R> for Handle<R> {
    fn as_ref(&self) -> &R {
        &self.resource
    }
}

impl<R: fmt::Debug> fmt::Debug for Handle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("resource", &self.resource)
            .field("handles", &self.handle_count())
            .finish()
    }
}

/// Keyed cache enforcing one instance per key
///
/// Construction is lazy: the factory passed to [`get_or_create`] runs only
/// when the key is absent. Factories may look up other pools; a lookup on
/// this same pool from inside its own factory is rejected at compile time
/// because every lookup borrows the pool mutably.
///
/// [`get_or_create`]: ResourcePool::get_or_create
pub struct ResourcePool<K, R> {
    entries: HashMap<K, Resident<R>>,
}

impl<K, R> ResourcePool<K, R>
where
    K: Eq + Hash,
{
    /// Create an empty pool
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Return a handle to the entry for `key`, building it with `factory` if
    /// the pool has none yet
    pub fn get_or_create<F>(&mut self, key: K, factory: F) -> Handle<R>
    where
        F: FnOnce() -> R,
    {
        self.entries
            .entry(key)
            .or_insert_with(|| Resident::new(factory()))
            .claim()
    }

    /// Fallible variant of [`get_or_create`](Self::get_or_create)
    ///
    /// A failing factory leaves the pool untouched and its error is returned
    /// as-is; nothing half-built is cached.
    pub fn get_or_try_create<F, E>(&mut self, key: K, factory: F) -> Result<Handle<R>, E>
    where
        F: FnOnce() -> Result<R, E>,
    {
        if let Some(resident) = self.entries.get(&key) {
            return Ok(resident.claim());
        }

        let resident = Resident::new(factory()?);
        let handle = resident.claim();
        self.entries.insert(key, resident);
        Ok(handle)
    }

    /// Destroy every entry without outstanding handles
    ///
    /// `on_still_in_use` observes each entry that survives the sweep.
    /// Returns the number of entries destroyed.
    pub fn release_all_unused<F>(&mut self, mut on_still_in_use: F) -> usize
    where
        F: FnMut(&K, &R),
    {
        let before = self.entries.len();
        self.entries.retain(|key, resident| {
            if resident.outstanding() > 0 {
                on_still_in_use(key, &resident.resource);
                true
            } else {
                false
            }
        });
        before - self.entries.len()
    }

    /// Number of resident entries, referenced or not
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an entry for `key` is resident
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Outstanding handle count for `key`, if resident
    pub fn outstanding(&self, key: &K) -> Option<usize> {
        self.entries.get(key).map(Resident::outstanding)
    }
}

impl<K: Eq + Hash, R> Default for ResourcePool<K, R> {
    fn default() -> Self {
        Self::new()
    }
}

/// A single always-shared resource living outside any keyed pool
///
/// Built lazily on first request and released only by
/// [`release_if_unused`](Self::release_if_unused), following the same
/// counting rule as a pool entry.
pub struct SharedSlot<R> {
    resident: Option<Resident<R>>,
}

impl<R> SharedSlot<R> {
    /// Create an empty slot
    pub const fn new() -> Self {
        Self { resident: None }
    }

    /// Return a handle to the instance, building it on first request
    pub fn get_or_init<F>(&mut self, init: F) -> Handle<R>
    where
        F: FnOnce() -> R,
    {
        self.resident.get_or_insert_with(|| Resident::new(init())).claim()
    }

    /// Destroy the instance if no handle references it.
    /// Returns `true` when an instance was destroyed.
    pub fn release_if_unused(&mut self) -> bool {
        match &self.resident {
            Some(resident) if resident.outstanding() == 0 => {
                self.resident = None;
                true
            }
            _ => false,
        }
    }

    /// Whether the instance currently exists
    pub fn is_resident(&self) -> bool {
        self.resident.is_some()
    }

    /// Outstanding handle count, if resident
    pub fn outstanding(&self) -> Option<usize> {
        self.resident.as_ref().map(Resident::outstanding)
    }
}

impl<R> Default for SharedSlot<R> {
    fn default() -> Self {
        Self::new()
    }
}
