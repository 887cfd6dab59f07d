//! Live entity storage interface and a minimal in-memory implementation.
//!
//! Generation never touches live entities. Chunks hold pure-data spawn
//! records and only activation turns them into entities through an
//! [`EntityStore`].

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use delve_common::{EntityHandle, StableId, Vec3};
use serde::{Deserialize, Serialize};

/// A type-erased component instance.
pub type BoxedComponent = Box<dyn Any + Send>;

/// World position component attached to every materialized spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
    /// Z coordinate
    pub z: i32,
}

impl From<Vec3> for Position {
    fn from(pos: Vec3) -> Self {
        Self {
            x: pos.x,
            y: pos.y,
            z: pos.z,
        }
    }
}

/// Zero-argument constructor of one component.
#[derive(Clone)]
pub struct ComponentFactory(Arc<dyn Fn() -> BoxedComponent + Send + Sync>);

impl ComponentFactory {
    /// Wraps a constructor closure.
    pub fn new<C, F>(build: F) -> Self
    where
        C: Any + Send,
        F: Fn() -> C + Send + Sync + 'static,
    {
        Self(Arc::new(move || Box::new(build()) as BoxedComponent))
    }

    /// Factory that clones a prototype value.
    pub fn cloned<C>(prototype: C) -> Self
    where
        C: Any + Clone + Send + Sync,
    {
        Self::new(move || prototype.clone())
    }

    /// Builds a fresh component.
    #[must_use]
    pub fn build(&self) -> BoxedComponent {
        (self.0)()
    }
}

impl fmt::Debug for ComponentFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ComponentFactory(..)")
    }
}

/// Live entity store owned outside the generation core.
pub trait EntityStore {
    /// Creates an entity owning the given components.
    fn create_entity(&mut self, components: Vec<BoxedComponent>) -> EntityHandle;

    /// Destroys an entity. Returns `false` if it did not exist.
    fn destroy_entity(&mut self, handle: EntityHandle) -> bool;

    /// Whether the handle refers to a live entity.
    fn exists(&self, handle: EntityHandle) -> bool;
}

/// Simple entity registry: handles are never reused.
pub struct EntityRegistry {
    next_handle: u64,
    entities: AHashMap<EntityHandle, Vec<BoxedComponent>>,
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("next_handle", &self.next_handle)
            .field("live", &self.entities.len())
            .finish()
    }
}

impl EntityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            entities: AHashMap::new(),
        }
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether no entities are alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// First component of type `T` on an entity.
    #[must_use]
    pub fn get<T: Any>(&self, handle: EntityHandle) -> Option<&T> {
        self.entities
            .get(&handle)?
            .iter()
            .find_map(|component| component.downcast_ref::<T>())
    }

    /// Iterates live handles in no particular order.
    pub fn handles(&self) -> impl Iterator<Item = EntityHandle> + '_ {
        self.entities.keys().copied()
    }

    /// Finds the live entity carrying a stable id.
    #[must_use]
    pub fn find_by_guid(&self, guid: &str) -> Option<EntityHandle> {
        self.handles()
            .find(|&handle| self.get::<StableId>(handle).is_some_and(|id| id.guid == guid))
    }
}

impl EntityStore for EntityRegistry {
    fn create_entity(&mut self, components: Vec<BoxedComponent>) -> EntityHandle {
        let handle = EntityHandle::from_raw(self.next_handle);
        self.next_handle += 1;
        self.entities.insert(handle, components);
        handle
    }

    fn destroy_entity(&mut self, handle: EntityHandle) -> bool {
        self.entities.remove(&handle).is_some()
    }

    fn exists(&self, handle: EntityHandle) -> bool {
        self.entities.contains_key(&handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Name(&'static str);

    #[test]
    fn test_handles_not_reused() {
        let mut store = EntityRegistry::new();
        let a = store.create_entity(Vec::new());
        assert!(store.destroy_entity(a));
        let b = store.create_entity(Vec::new());
        assert_ne!(a, b);
        assert!(!store.exists(a));
        assert!(!store.destroy_entity(a));
    }

    #[test]
    fn test_typed_lookup() {
        let mut store = EntityRegistry::new();
        let factory = ComponentFactory::cloned(Name("rat"));
        let handle = store.create_entity(vec![
            Box::new(StableId::new("abc")),
            Box::new(Position::from(Vec3::xy(3, 4))),
            factory.build(),
        ]);
        assert_eq!(store.get::<Name>(handle), Some(&Name("rat")));
        assert_eq!(store.get::<Position>(handle).map(|p| (p.x, p.y)), Some((3, 4)));
        assert_eq!(store.find_by_guid("abc"), Some(handle));
        assert_eq!(store.find_by_guid("zzz"), None);
    }

    #[test]
    fn test_factory_builds_fresh_values() {
        let factory = ComponentFactory::new(|| vec![1_u8, 2, 3]);
        let first = factory.build();
        let second = factory.build();
        assert_eq!(first.downcast_ref::<Vec<u8>>(), second.downcast_ref::<Vec<u8>>());
    }
}
