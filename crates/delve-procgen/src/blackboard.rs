//! Typed key/value store shared by the stages of one generation run.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use ahash::AHashMap;
use delve_common::Aabb;

/// Names a blackboard slot and the type stored in it.
pub struct BlackboardKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> BlackboardKey<T> {
    /// Declares a key.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// Slot name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for BlackboardKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for BlackboardKey<T> {}

impl<T> fmt::Debug for BlackboardKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlackboardKey({})", self.name)
    }
}

/// Building parcels, written by parcel stages under the `"parcels"` capability.
pub const PARCELS: BlackboardKey<Vec<Aabb>> = BlackboardKey::new("parcels");

/// Generation-scoped store. Reads with the wrong type behave as absent.
#[derive(Default)]
pub struct Blackboard {
    slots: AHashMap<&'static str, Box<dyn Any + Send>>,
}

impl fmt::Debug for Blackboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.slots.keys().collect();
        names.sort();
        f.debug_struct("Blackboard").field("slots", &names).finish()
    }
}

impl Blackboard {
    /// Creates an empty blackboard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value, replacing any previous one.
    pub fn set<T: Any + Send>(&mut self, key: BlackboardKey<T>, value: T) {
        self.slots.insert(key.name, Box::new(value));
    }

    /// Reads a value.
    #[must_use]
    pub fn get<T: Any + Send>(&self, key: BlackboardKey<T>) -> Option<&T> {
        self.slots.get(key.name).and_then(|v| v.downcast_ref())
    }

    /// Reads a value or returns the fallback.
    #[must_use]
    pub fn get_or<'a, T: Any + Send>(&'a self, key: BlackboardKey<T>, fallback: &'a T) -> &'a T {
        self.get(key).unwrap_or(fallback)
    }

    /// Whether a value of the key's type is present.
    #[must_use]
    pub fn has<T: Any + Send>(&self, key: BlackboardKey<T>) -> bool {
        self.get(key).is_some()
    }

    /// Removes and returns a value.
    pub fn remove<T: Any + Send>(&mut self, key: BlackboardKey<T>) -> Option<T> {
        let boxed = self.slots.remove(key.name)?;
        match boxed.downcast::<T>() {
            Ok(value) => Some(*value),
            Err(other) => {
                self.slots.insert(key.name, other);
                None
            },
        }
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slot is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
