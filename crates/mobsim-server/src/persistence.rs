//! On-disk mob persistence: one JSON file per chunk.

use std::path::{Path, PathBuf};

use mobsim_ai::{AiError, MobRecord, PersistenceSink};
use mobsim_world::ChunkPos;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct ChunkFile {
    chunk: ChunkPos,
    mobs: Vec<MobRecord>,
}

/// Stores the mobs of each unloaded chunk as `chunk_<x>_<z>.json`.
#[derive(Debug)]
pub struct JsonChunkStore {
    dir: PathBuf,
}

impl JsonChunkStore {
    pub fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, chunk: ChunkPos) -> PathBuf {
        self.dir.join(format!("chunk_{}_{}.json", chunk.x, chunk.z))
    }

    fn read(&self, path: &Path) -> Result<Vec<MobRecord>, AiError> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(path).map_err(|e| io_error(path, e))?;
        let file: ChunkFile = serde_json::from_str(&data)
            .map_err(|e| AiError::Persistence(format!("{}: {e}", path.display())))?;
        Ok(file.mobs)
    }

    /// Chunks that currently have a file on disk.
    pub fn stored_chunks(&self) -> Result<Vec<ChunkPos>, AiError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| io_error(&self.dir, e))?;
        let mut chunks = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_error(&self.dir, e))?;
            if let Some(chunk) = entry.file_name().to_str().and_then(parse_file_name) {
                chunks.push(chunk);
            }
        }
        chunks.sort();
        Ok(chunks)
    }
}

fn parse_file_name(name: &str) -> Option<ChunkPos> {
    let rest = name.strip_prefix("chunk_")?.strip_suffix(".json")?;
    let (x, z) = rest.split_once('_')?;
    Some(ChunkPos::new(x.parse().ok()?, z.parse().ok()?))
}

fn io_error(path: &Path, e: std::io::Error) -> AiError {
    AiError::Persistence(format!("{}: {e}", path.display()))
}

impl PersistenceSink for JsonChunkStore {
    fn store(&mut self, chunk: ChunkPos, records: Vec<MobRecord>) -> Result<(), AiError> {
        if records.is_empty() {
            return Ok(());
        }
        let path = self.path(chunk);
        let mut mobs = self.read(&path)?;
        mobs.extend(records);
        let json = serde_json::to_string_pretty(&ChunkFile { chunk, mobs })
            .map_err(|e| AiError::Persistence(e.to_string()))?;

        // Write beside the target, then swap it in.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| io_error(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| io_error(&path, e))?;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    fn take(&mut self, chunk: ChunkPos) -> Result<Vec<MobRecord>, AiError> {
        let path = self.path(chunk);
        let mobs = self.read(&path)?;
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| io_error(&path, e))?;
        }
        Ok(mobs)
    }
}
