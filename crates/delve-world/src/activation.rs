//! Materializing deferred spawns when chunks become active.

use tracing::debug;

use crate::chunk::Chunk;
use crate::entities::{BoxedComponent, EntityStore, Position};

/// Materializes every deferred spawn of a chunk that is not already live.
///
/// Each entity receives its `StableId`, a [`Position`] at anchor + offset,
/// then one component per factory in order. The spawn list is kept so the
/// chunk can be reactivated later. Returns the number of entities created.
pub fn materialize_chunk_spawns(chunk: &mut Chunk, store: &mut dyn EntityStore) -> usize {
    let mut created = 0;
    for (world_pos, spawn) in &chunk.spawns {
        if chunk.materialized.contains_key(&spawn.stable_id.guid) {
            continue;
        }
        let mut components: Vec<BoxedComponent> = Vec::with_capacity(spawn.components.len() + 2);
        components.push(Box::new(spawn.stable_id.clone()));
        components.push(Box::new(Position::from(*world_pos + spawn.local_pos)));
        components.extend(spawn.components.iter().map(|factory| factory.build()));

        let handle = store.create_entity(components);
        chunk.materialized.insert(spawn.stable_id.guid.clone(), handle);
        created += 1;
    }
    if created > 0 {
        debug!("Materialized {created} entities in chunk {}", chunk.key());
    }
    created
}

/// Destroys the live entities of a chunk and clears its materialized set.
///
/// Handles that no longer exist are skipped. Spawn records stay in place.
/// Returns the number of entities destroyed.
pub fn cleanup_chunk_entities(chunk: &mut Chunk, store: &mut dyn EntityStore) -> usize {
    let mut destroyed = 0;
    for (_, handle) in chunk.materialized.drain() {
        if store.exists(handle) && store.destroy_entity(handle) {
            destroyed += 1;
        }
    }
    if destroyed > 0 {
        debug!("Destroyed {destroyed} entities in chunk {}", chunk.key());
    }
    destroyed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edits::{EntitySpawn, Edits};
    use crate::entities::{ComponentFactory, EntityRegistry};
    use crate::realm::Realm;
    use delve_common::{ChunkKey, StableId, Vec3};

    #[derive(Debug, Clone, PartialEq)]
    struct Hostile;

    fn realm_with_spawns() -> Realm {
        let mut realm = Realm::new();
        let mut edits = Edits::new();
        edits.add_spawn(
            Vec3::xy(4, 4),
            EntitySpawn::new(StableId::new("rat"))
                .with_offset(Vec3::xy(1, 2))
                .with_component(ComponentFactory::cloned(Hostile)),
        );
        edits.add_spawn(Vec3::xy(10, 10), EntitySpawn::new(StableId::new("chest")));
        assert!(realm.commit(&edits).is_clean());
        realm
    }

    #[test]
    fn test_materialize_places_at_anchor_plus_offset() {
        let mut realm = realm_with_spawns();
        let mut store = EntityRegistry::new();
        assert_eq!(realm.activate_chunk(ChunkKey::default(), &mut store), 2);

        let rat = store.find_by_guid("rat").unwrap();
        assert_eq!(store.get::<Position>(rat), Some(&Position { x: 5, y: 6, z: 0 }));
        assert_eq!(store.get::<Hostile>(rat), Some(&Hostile));
        assert!(store.get::<Hostile>(store.find_by_guid("chest").unwrap()).is_none());
    }

    #[test]
    fn test_reactivation_is_noop() {
        let mut realm = realm_with_spawns();
        let mut store = EntityRegistry::new();
        realm.activate_chunk(ChunkKey::default(), &mut store);
        assert_eq!(realm.activate_chunk(ChunkKey::default(), &mut store), 0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_deactivate_then_reactivate() {
        let mut realm = realm_with_spawns();
        let mut store = EntityRegistry::new();
        realm.activate_chunk(ChunkKey::default(), &mut store);
        let first = store.find_by_guid("rat").unwrap();

        assert_eq!(realm.deactivate_chunk(ChunkKey::default(), &mut store), 2);
        assert!(store.is_empty());
        let chunk = realm.chunk(ChunkKey::default()).unwrap();
        assert_eq!(chunk.spawns().len(), 2);
        assert_eq!(chunk.materialized_count(), 0);

        assert_eq!(realm.activate_chunk(ChunkKey::default(), &mut store), 2);
        let second = store.find_by_guid("rat").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_cleanup_tolerates_missing_entities() {
        let mut realm = realm_with_spawns();
        let mut store = EntityRegistry::new();
        realm.activate_chunk(ChunkKey::default(), &mut store);
        let rat = store.find_by_guid("rat").unwrap();
        store.destroy_entity(rat);

        assert_eq!(realm.deactivate_chunk(ChunkKey::default(), &mut store), 1);
        assert_eq!(realm.deactivate_chunk(ChunkKey::default(), &mut store), 0);
    }

    #[test]
    fn test_new_spawns_while_active_materialize_once() {
        let mut realm = realm_with_spawns();
        let mut store = EntityRegistry::new();
        realm.activate_chunk(ChunkKey::default(), &mut store);

        let mut more = Edits::new();
        more.add_spawn(Vec3::xy(12, 12), EntitySpawn::new(StableId::new("bat")));
        realm.commit(&more);

        assert_eq!(realm.activate_chunk(ChunkKey::default(), &mut store), 1);
        assert_eq!(store.len(), 3);
    }
}
