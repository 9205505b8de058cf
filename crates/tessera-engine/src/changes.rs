//! Loading stored cell changes from a JSON export.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tessera_common::{CellCoord, ChunkCoord, WorldId};
use tessera_world::{CellChangeRecord, MemoryChangeStore};
use tracing::info;

/// One stored cell change as it appears in the export file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    /// Chunk holding the cell
    pub chunk: ChunkCoord,
    /// Cell within the chunk
    pub cell: CellCoord,
    /// What the cell holds
    pub record: CellChangeRecord,
}

/// Reads an export file into an in-memory store for one world.
pub fn load_changes(path: &Path, world_id: WorldId) -> Result<MemoryChangeStore> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading change file {}", path.display()))?;
    let entries: Vec<ChangeEntry> = serde_json::from_str(&contents)
        .with_context(|| format!("parsing change file {}", path.display()))?;

    let mut store = MemoryChangeStore::new();
    for entry in entries {
        store.set_cell(world_id, entry.chunk, entry.cell, entry.record);
    }
    info!(
        "Loaded {} cell changes for {world_id} from {}",
        store.change_count(world_id),
        path.display()
    );
    Ok(store)
}
