//! On-disk per-package cache: `index.scip` (real SCIP protobuf) +
//! `manifest.json`. `index.scip` reuses exactly the
//! `protobuf::Message` machinery already proven in the teacher's
//! `graph/export/scip.rs`, generalized to a lossless round trip since SCIP is
//! now the cache's source of truth rather than a lossy export target.

pub mod manifest;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use protobuf::Message;

use crate::error::{IndexError, IndexResult};
use crate::index::ScipIndex;
use crate::model::scip_convert;
use manifest::Manifest;

const INDEX_FILE: &str = "index.scip";
const MANIFEST_FILE: &str = "manifest.json";

pub struct Cache {
    pub dir: PathBuf,
    pub max_size_bytes: u64,
}

pub struct LoadedCache {
    pub index: ScipIndex,
    pub file_hashes: HashMap<String, String>,
}

impl Cache {
    pub fn new(dir: impl Into<PathBuf>, max_size_bytes: u64) -> Self {
        Cache {
            dir: dir.into(),
            max_size_bytes,
        }
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    /// Load the cache iff both files exist, parse, and the manifest is
    /// compatible. Any failure degrades to "absent", never an
    /// error — cache-read errors degrade silently to a fresh build.
    pub fn load(&self, project_root: &Path, source_root: Option<PathBuf>) -> Option<LoadedCache> {
        let manifest_bytes = std::fs::read(self.manifest_path()).ok()?;
        let manifest: Manifest = serde_json::from_slice(&manifest_bytes).ok()?;
        if !manifest.is_compatible() {
            return None;
        }

        let index_bytes = std::fs::read(self.index_path()).ok()?;
        if index_bytes.len() as u64 > self.max_size_bytes {
            return None;
        }
        let raw = scip::types::Index::parse_from_bytes(&index_bytes).ok()?;

        let index = ScipIndex::from_scip(&raw, project_root.to_path_buf(), source_root);
        Some(LoadedCache {
            index,
            file_hashes: manifest.file_hashes,
        })
    }

    /// Serialize all documents back to a SCIP Index message and write
    /// atomically (write-to-temp + rename). Hashes are stored
    /// as relative paths.
    pub fn save(&self, index: &ScipIndex, file_hashes: &HashMap<String, String>) -> IndexResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| IndexError::io(&self.dir, e))?;

        let documents: Vec<_> = index.documents().cloned().collect();
        let raw = scip_convert::build_index(&index.project_root.to_string_lossy(), &documents);
        let bytes = raw.write_to_bytes()?;

        if bytes.len() as u64 > self.max_size_bytes {
            return Err(IndexError::CorruptCache {
                path: self.index_path(),
                reason: format!("serialized index exceeds {} bytes", self.max_size_bytes),
            });
        }

        atomic_write(&self.index_path(), &bytes)?;

        let manifest = Manifest::new(file_hashes.clone());
        let manifest_bytes = serde_json::to_vec_pretty(&manifest).map_err(|e| IndexError::CorruptCache {
            path: self.manifest_path(),
            reason: e.to_string(),
        })?;
        atomic_write(&self.manifest_path(), &manifest_bytes)?;

        Ok(())
    }
}

fn atomic_write(path: &Path, bytes: &[u8]) -> IndexResult<()> {
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, bytes).map_err(|e| IndexError::io(&tmp_path, e))?;
    std::fs::rename(&tmp_path, path).map_err(|e| IndexError::io(path, e))?;
    Ok(())
}
