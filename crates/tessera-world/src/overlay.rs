//! Persistence overlay: stored per-cell changes merged into generated chunks.
//!
//! A change record for a cell always wins over procedural output for that
//! cell. Records are looked up by cell key only, never by entity identity,
//! so applying the same set twice yields the same chunk.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tessera_common::{CellCoord, ChunkCoord, OverlayError, StoreError, WorldId};
use tracing::{debug, info};

use crate::chunk::Chunk;
use crate::entity::{EntityCatalog, EntityKind, EntityMetadata, ImageConfig, PlacedEntity};

/// An entity as stored in a cell change record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedEntity {
    /// Entity kind
    #[serde(rename = "type")]
    pub kind: EntityKind,
    /// Metadata, absent when the entity uses catalog defaults
    #[serde(default)]
    pub metadata: Option<EntityMetadata>,
}

impl PersistedEntity {
    /// Creates a stored entity using catalog defaults.
    #[must_use]
    pub const fn plain(kind: EntityKind) -> Self {
        Self {
            kind,
            metadata: None,
        }
    }
}

/// What the store says about one cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "entities", rename_all = "snake_case")]
pub enum CellChangeRecord {
    /// Everything at the cell was removed
    Empty,
    /// The cell holds exactly these entities
    Replace(Vec<PersistedEntity>),
}

impl CellChangeRecord {
    /// Returns the replacement entities (none for an emptied cell).
    #[must_use]
    pub fn entities(&self) -> &[PersistedEntity] {
        match self {
            Self::Empty => &[],
            Self::Replace(entities) => entities,
        }
    }
}

/// Change records for one chunk, keyed by local cell.
pub type ChunkChanges = BTreeMap<CellCoord, CellChangeRecord>;

/// External store of player-caused cell changes.
///
/// Calls block from the world's point of view. An error and an empty map
/// both mean "no overrides" to the caller.
pub trait ChangeSource {
    /// Fetches every change record for a chunk.
    fn get_chunk_changes(
        &self,
        world_id: WorldId,
        chunk: ChunkCoord,
    ) -> Result<ChunkChanges, StoreError>;
}

impl<S: ChangeSource + ?Sized> ChangeSource for Rc<RefCell<S>> {
    fn get_chunk_changes(
        &self,
        world_id: WorldId,
        chunk: ChunkCoord,
    ) -> Result<ChunkChanges, StoreError> {
        self.borrow().get_chunk_changes(world_id, chunk)
    }
}

/// Reconciles a generated chunk with its stored change records.
///
/// Every record is bounds-checked before the chunk is touched; an
/// out-of-bounds cell aborts the apply and leaves the chunk unchanged.
pub fn apply(
    chunk: &mut Chunk,
    changes: &ChunkChanges,
    catalog: &EntityCatalog,
) -> Result<(), OverlayError> {
    if changes.is_empty() {
        return Ok(());
    }

    let coord = chunk.coord();
    let size = chunk.chunk_size();
    if let Some(cell) = changes.keys().find(|cell| !cell.is_within(size)) {
        return Err(OverlayError::CellOutOfBounds {
            chunk_x: coord.x,
            chunk_y: coord.y,
            cell_x: cell.x,
            cell_y: cell.y,
            chunk_size: size,
        });
    }

    let replacements: Vec<PlacedEntity> = changes
        .iter()
        .flat_map(|(cell, record)| {
            let tile = coord.tile_at(*cell, size);
            let center = chunk.cell_center(*cell);
            record.entities().iter().map(move |stored| {
                let entity = PlacedEntity::new(stored.kind, tile, center, catalog.get(stored.kind));
                match &stored.metadata {
                    Some(metadata) => entity.with_metadata(metadata.clone()),
                    None => entity,
                }
            })
        })
        .collect();

    let entities = chunk.entities_mut();
    let before = entities.len();
    entities.retain(|entity| {
        let overridden = entity.tile.to_chunk_coord(size) == coord
            && changes.contains_key(&entity.tile.to_cell_coord(size));
        !overridden
    });
    let removed = before - entities.len();
    let added = replacements.len();
    entities.extend(replacements);

    debug!(
        "Applied {} cell changes to chunk {coord}: -{removed} +{added} entities",
        changes.len()
    );
    Ok(())
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}

/// In-memory cell change store.
///
/// Stands in for a database-backed store: records are grouped per world,
/// then per chunk, then per cell.
#[derive(Debug, Clone, Default)]
pub struct MemoryChangeStore {
    worlds: BTreeMap<WorldId, BTreeMap<ChunkCoord, ChunkChanges>>,
}

impl MemoryChangeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the record of a cell.
    pub fn set_cell(
        &mut self,
        world_id: WorldId,
        chunk: ChunkCoord,
        cell: CellCoord,
        record: CellChangeRecord,
    ) {
        self.worlds
            .entry(world_id)
            .or_default()
            .entry(chunk)
            .or_default()
            .insert(cell, record);
    }

    /// Records that everything at a cell was removed.
    pub fn mark_cell_empty(&mut self, world_id: WorldId, chunk: ChunkCoord, cell: CellCoord) {
        self.set_cell(world_id, chunk, cell, CellChangeRecord::Empty);
    }

    /// Adds an entity to a cell, on top of whatever the cell already stores.
    ///
    /// A cell without a record starts empty: procedural content there is
    /// replaced, not extended.
    pub fn add_entity_to_cell(
        &mut self,
        world_id: WorldId,
        chunk: ChunkCoord,
        cell: CellCoord,
        entity: PersistedEntity,
    ) {
        let cells = self.worlds.entry(world_id).or_default().entry(chunk).or_default();
        match cells.get_mut(&cell) {
            Some(CellChangeRecord::Replace(entities)) => entities.push(entity),
            _ => {
                cells.insert(cell, CellChangeRecord::Replace(vec![entity]));
            },
        }
    }

    /// Removes a cell's record, returning it to procedural content.
    pub fn clear_cell(
        &mut self,
        world_id: WorldId,
        chunk: ChunkCoord,
        cell: CellCoord,
    ) -> Option<CellChangeRecord> {
        let cells = self.worlds.get_mut(&world_id)?.get_mut(&chunk)?;
        let removed = cells.remove(&cell);
        if cells.is_empty() {
            if let Some(chunks) = self.worlds.get_mut(&world_id) {
                chunks.remove(&chunk);
            }
        }
        removed
    }

    /// Returns the record of a cell, if any.
    #[must_use]
    pub fn cell_state(
        &self,
        world_id: WorldId,
        chunk: ChunkCoord,
        cell: CellCoord,
    ) -> Option<&CellChangeRecord> {
        self.worlds.get(&world_id)?.get(&chunk)?.get(&cell)
    }

    /// Iterates every chunk with changes in a world.
    pub fn all_changes(
        &self,
        world_id: WorldId,
    ) -> impl Iterator<Item = (ChunkCoord, &ChunkChanges)> + '_ {
        self.worlds
            .get(&world_id)
            .into_iter()
            .flat_map(|chunks| chunks.iter().map(|(coord, cells)| (*coord, cells)))
    }

    /// Number of changed cells in a world.
    #[must_use]
    pub fn change_count(&self, world_id: WorldId) -> usize {
        self.all_changes(world_id).map(|(_, cells)| cells.len()).sum()
    }

    /// Stores a custom appearance for an entity, replacing its cell's content
    /// with that single entity.
    pub fn modify_entity_image_config(
        &mut self,
        world_id: WorldId,
        entity: &PlacedEntity,
        chunk_size: u32,
        image_config: ImageConfig,
        modifier: &str,
    ) -> Result<(), StoreError> {
        image_config.validate()?;

        let chunk = entity.tile.to_chunk_coord(chunk_size);
        let cell = entity.tile.to_cell_coord(chunk_size);
        let metadata = EntityMetadata {
            image_config: Some(image_config),
            modification_time: Some(now_millis()),
            modifier: Some(modifier.to_string()),
            ..EntityMetadata::default()
        };
        self.set_cell(
            world_id,
            chunk,
            cell,
            CellChangeRecord::Replace(vec![PersistedEntity {
                kind: entity.kind,
                metadata: Some(metadata),
            }]),
        );

        info!(
            "Modified image config for {} at chunk {chunk} cell {cell}",
            entity.kind
        );
        Ok(())
    }

    /// Resets an entity to catalog defaults, dropping any custom appearance.
    pub fn reset_entity_to_default(
        &mut self,
        world_id: WorldId,
        entity: &PlacedEntity,
        chunk_size: u32,
    ) {
        let chunk = entity.tile.to_chunk_coord(chunk_size);
        let cell = entity.tile.to_cell_coord(chunk_size);
        self.set_cell(
            world_id,
            chunk,
            cell,
            CellChangeRecord::Replace(vec![PersistedEntity::plain(entity.kind)]),
        );
        info!("Reset {} to default config at chunk {chunk} cell {cell}", entity.kind);
    }
}

impl ChangeSource for MemoryChangeStore {
    fn get_chunk_changes(
        &self,
        world_id: WorldId,
        chunk: ChunkCoord,
    ) -> Result<ChunkChanges, StoreError> {
        Ok(self
            .worlds
            .get(&world_id)
            .and_then(|chunks| chunks.get(&chunk))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::BiomeMap;
    use crate::chunk::ChunkGenerator;
    use crate::config::{PlacementProfile, WorldConfig};
    use tessera_common::{TileCoord, WorldPos};

    const WORLD: WorldId = WorldId::from_raw(1);

    /// Config where every tile gets exactly one grass tuft and nothing else.
    fn dense_config() -> WorldConfig {
        let mut grass = PlacementProfile::grass();
        grass.min_chance = 1.0;
        grass.max_chance = 1.0;
        let mut config = WorldConfig::new(12345, 16, 32, 4, 0.5).expect("valid config");
        config.placement_profiles = BTreeMap::from([(EntityKind::Grass, grass)]);
        config.validate().expect("valid profiles");
        config
    }

    fn generate(config: &WorldConfig, coord: ChunkCoord) -> Chunk {
        let biomes = BiomeMap::build(config);
        let catalog = EntityCatalog::new();
        ChunkGenerator::new(config, &biomes, &catalog).generate(coord)
    }

    fn cell_kinds(chunk: &Chunk, cell: CellCoord) -> Vec<EntityKind> {
        chunk.entities_at(cell).map(|e| e.kind).collect()
    }

    #[test]
    fn test_empty_record_removes_procedural_entity() {
        let config = dense_config();
        let mut chunk = generate(&config, ChunkCoord::new(1, 1));
        let cell = CellCoord::new(5, 5);
        assert!(cell_kinds(&chunk, cell).contains(&EntityKind::Grass));

        let changes = ChunkChanges::from([(cell, CellChangeRecord::Empty)]);
        apply(&mut chunk, &changes, &EntityCatalog::new()).expect("apply succeeds");

        assert!(cell_kinds(&chunk, cell).is_empty());
        assert_eq!(cell_kinds(&chunk, CellCoord::new(5, 6)), vec![EntityKind::Grass]);
    }

    #[test]
    fn test_replace_record_yields_exactly_one_rock() {
        let config = dense_config();
        let mut chunk = generate(&config, ChunkCoord::new(1, 1));
        let cell = CellCoord::new(5, 5);

        let changes = ChunkChanges::from([(
            cell,
            CellChangeRecord::Replace(vec![PersistedEntity::plain(EntityKind::Rock)]),
        )]);
        apply(&mut chunk, &changes, &EntityCatalog::new()).expect("apply succeeds");

        assert_eq!(cell_kinds(&chunk, cell), vec![EntityKind::Rock]);
        let rock = chunk.entities_at(cell).next().expect("rock present");
        assert_eq!(rock.tile, TileCoord::new(21, 21));
        assert_eq!(rock.world_pos, WorldPos::new(688.0, 688.0));
        assert!(rock.collidable);
        assert!(rock.metadata.is_none());
    }

    #[test]
    fn test_apply_is_idempotent() {
        let config = dense_config();
        let changes = ChunkChanges::from([
            (CellCoord::new(0, 0), CellChangeRecord::Empty),
            (
                CellCoord::new(3, 9),
                CellChangeRecord::Replace(vec![
                    PersistedEntity::plain(EntityKind::WoodBlock),
                    PersistedEntity::plain(EntityKind::Tree),
                ]),
            ),
        ]);
        let catalog = EntityCatalog::new();

        let mut once = generate(&config, ChunkCoord::new(2, 0));
        apply(&mut once, &changes, &catalog).expect("first apply");
        let after_once = once.entities().to_vec();
        apply(&mut once, &changes, &catalog).expect("second apply");
        assert_eq!(once.entities(), after_once.as_slice());

        let mut fresh = generate(&config, ChunkCoord::new(2, 0));
        apply(&mut fresh, &changes, &catalog).expect("fresh apply");
        assert_eq!(fresh.entities(), after_once.as_slice());
    }

    #[test]
    fn test_out_of_bounds_cell_is_reported_and_chunk_untouched() {
        let config = dense_config();
        let mut chunk = generate(&config, ChunkCoord::new(0, 0));
        let before = chunk.entities().to_vec();

        let changes = ChunkChanges::from([
            (CellCoord::new(1, 1), CellChangeRecord::Empty),
            (CellCoord::new(16, 2), CellChangeRecord::Empty),
        ]);
        let err = apply(&mut chunk, &changes, &EntityCatalog::new()).expect_err("must fail");

        assert_eq!(
            err,
            OverlayError::CellOutOfBounds {
                chunk_x: 0,
                chunk_y: 0,
                cell_x: 16,
                cell_y: 2,
                chunk_size: 16,
            }
        );
        assert_eq!(chunk.entities(), before.as_slice());
    }

    #[test]
    fn test_metadata_image_config_reaches_entity() {
        let config = dense_config();
        let mut chunk = generate(&config, ChunkCoord::new(0, 1));
        let cell = CellCoord::new(2, 3);
        let metadata = EntityMetadata {
            image_config: Some(ImageConfig {
                size: 40.0,
                fixed_screen_angle: 0.0,
                draw_offset_x: 0.0,
                draw_offset_y: -12.0,
                custom_image_data: None,
            }),
            ..EntityMetadata::default()
        };
        let changes = ChunkChanges::from([(
            cell,
            CellChangeRecord::Replace(vec![PersistedEntity {
                kind: EntityKind::Rock,
                metadata: Some(metadata.clone()),
            }]),
        )]);
        apply(&mut chunk, &changes, &EntityCatalog::new()).expect("apply succeeds");

        let rock = chunk.entities_at(cell).next().expect("rock present");
        assert_eq!(rock.fixed_screen_angle, Some(0.0));
        assert_eq!(rock.render_offset, (0.0, -12.0));
        assert_eq!(rock.metadata.as_ref(), Some(&metadata));
    }

    #[test]
    fn test_store_add_entity_accumulates() {
        let mut store = MemoryChangeStore::new();
        let chunk = ChunkCoord::new(3, 4);
        let cell = CellCoord::new(1, 2);

        store.add_entity_to_cell(WORLD, chunk, cell, PersistedEntity::plain(EntityKind::WoodBlock));
        store.add_entity_to_cell(WORLD, chunk, cell, PersistedEntity::plain(EntityKind::Rock));
        assert_eq!(
            store.cell_state(WORLD, chunk, cell).map(|r| r.entities().len()),
            Some(2)
        );

        store.mark_cell_empty(WORLD, chunk, cell);
        assert_eq!(store.cell_state(WORLD, chunk, cell), Some(&CellChangeRecord::Empty));

        store.add_entity_to_cell(WORLD, chunk, cell, PersistedEntity::plain(EntityKind::Tree));
        assert_eq!(
            store.cell_state(WORLD, chunk, cell),
            Some(&CellChangeRecord::Replace(vec![PersistedEntity::plain(EntityKind::Tree)]))
        );
    }

    #[test]
    fn test_store_groups_changes_per_chunk_and_world() {
        let mut store = MemoryChangeStore::new();
        let other = WorldId::from_raw(2);
        store.mark_cell_empty(WORLD, ChunkCoord::new(0, 0), CellCoord::new(1, 1));
        store.mark_cell_empty(WORLD, ChunkCoord::new(0, 0), CellCoord::new(2, 1));
        store.mark_cell_empty(WORLD, ChunkCoord::new(1, 0), CellCoord::new(0, 0));
        store.mark_cell_empty(other, ChunkCoord::new(0, 0), CellCoord::new(1, 1));

        assert_eq!(store.change_count(WORLD), 3);
        assert_eq!(store.all_changes(WORLD).count(), 2);
        assert_eq!(store.change_count(other), 1);

        let fetched = store
            .get_chunk_changes(WORLD, ChunkCoord::new(0, 0))
            .expect("memory store never fails");
        assert_eq!(fetched.len(), 2);
        assert!(store
            .get_chunk_changes(WORLD, ChunkCoord::new(9, 9))
            .expect("memory store never fails")
            .is_empty());

        assert!(store.clear_cell(WORLD, ChunkCoord::new(1, 0), CellCoord::new(0, 0)).is_some());
        assert_eq!(store.all_changes(WORLD).count(), 1);
        assert!(store.clear_cell(WORLD, ChunkCoord::new(1, 0), CellCoord::new(0, 0)).is_none());
    }

    #[test]
    fn test_modify_and_reset_entity_image_config() {
        let mut store = MemoryChangeStore::new();
        let tree = PlacedEntity::new(
            EntityKind::Tree,
            TileCoord::new(20, 3),
            WorldPos::new(656.0, 112.0),
            crate::entity::EntityDefaults::builtin(EntityKind::Tree),
        );
        let image = ImageConfig {
            size: 64.0,
            fixed_screen_angle: 10.0,
            draw_offset_x: 0.0,
            draw_offset_y: -48.0,
            custom_image_data: Some("data:image/png;base64,AAAA".into()),
        };

        store
            .modify_entity_image_config(WORLD, &tree, 16, image.clone(), "player")
            .expect("valid image config");
        let record = store
            .cell_state(WORLD, ChunkCoord::new(1, 0), CellCoord::new(4, 3))
            .expect("record stored");
        let stored = &record.entities()[0];
        assert_eq!(stored.kind, EntityKind::Tree);
        let metadata = stored.metadata.as_ref().expect("metadata stored");
        assert_eq!(metadata.image_config.as_ref(), Some(&image));
        assert_eq!(metadata.modifier.as_deref(), Some("player"));
        assert!(metadata.modification_time.is_some());

        let mut bad = image;
        bad.size = -1.0;
        assert!(matches!(
            store.modify_entity_image_config(WORLD, &tree, 16, bad, "player"),
            Err(StoreError::InvalidImageConfig(_))
        ));

        store.reset_entity_to_default(WORLD, &tree, 16);
        assert_eq!(
            store.cell_state(WORLD, ChunkCoord::new(1, 0), CellCoord::new(4, 3)),
            Some(&CellChangeRecord::Replace(vec![PersistedEntity::plain(EntityKind::Tree)]))
        );
    }

    #[test]
    fn test_record_json_shape() {
        let record: CellChangeRecord = serde_json::from_str(
            r#"{"state": "replace", "entities": [{"type": "wood_block", "metadata": null}]}"#,
        )
        .expect("record parses");
        assert_eq!(
            record,
            CellChangeRecord::Replace(vec![PersistedEntity::plain(EntityKind::WoodBlock)])
        );
        let empty: CellChangeRecord =
            serde_json::from_str(r#"{"state": "empty"}"#).expect("empty parses");
        assert_eq!(empty, CellChangeRecord::Empty);
    }
}
