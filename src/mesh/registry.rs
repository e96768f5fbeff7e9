//! Level → bundle lookup.
//!
//! Every operator in a network needs the bundle of one specific level.
//! Instead of each layer formatting file paths on its own, the caller
//! builds one `MeshRegistry` and hands it to every constructor.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::bundle::MeshBundle;
use super::io::{bundle_file_name, read_mesh_bundle, BundleError};
use crate::types::MeshLevel;

/// Where a level's bundle comes from.
#[derive(Clone, Debug)]
pub enum BundleSource {
    /// Parsed from disk on every [`MeshRegistry::load`]
    File(PathBuf),
    /// Already in memory, shared between operators
    Loaded(Arc<MeshBundle>),
}

/// Mapping from mesh level to bundle source.
#[derive(Clone, Debug, Default)]
pub struct MeshRegistry {
    entries: BTreeMap<MeshLevel, BundleSource>,
}

impl MeshRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `<dir>/icosphere_<level>.json` for every level in `levels`.
    ///
    /// Files are not touched until they are loaded, so a missing file is
    /// reported by the operator that needs it.
    pub fn from_dir(dir: &Path, levels: impl IntoIterator<Item = MeshLevel>) -> Self {
        let mut registry = Self::new();
        for level in levels {
            registry.insert_file(level, dir.join(bundle_file_name(level)));
        }
        registry
    }

    pub fn insert_file(&mut self, level: MeshLevel, path: PathBuf) -> &mut Self {
        self.entries.insert(level, BundleSource::File(path));
        self
    }

    /// Register an in-memory bundle under its own level.
    pub fn insert_bundle(&mut self, bundle: MeshBundle) -> &mut Self {
        self.entries
            .insert(bundle.level, BundleSource::Loaded(Arc::new(bundle)));
        self
    }

    /// Registered levels in ascending order.
    pub fn levels(&self) -> impl Iterator<Item = MeshLevel> + '_ {
        self.entries.keys().copied()
    }

    pub fn source(&self, level: MeshLevel) -> Option<&BundleSource> {
        self.entries.get(&level)
    }

    /// Fetch the bundle for `level`, reading it from disk if needed.
    pub fn load(&self, level: MeshLevel) -> Result<Arc<MeshBundle>, BundleError> {
        match self.entries.get(&level) {
            Some(BundleSource::Loaded(bundle)) => Ok(Arc::clone(bundle)),
            Some(BundleSource::File(path)) => {
                let bundle = read_mesh_bundle(path)?;
                if bundle.level != level {
                    return Err(BundleError::Invalid {
                        level,
                        reason: format!(
                            "{} declares level {}",
                            path.display(),
                            bundle.level
                        ),
                    });
                }
                tracing::debug!(
                    level = level.get(),
                    path = %path.display(),
                    nv = bundle.nv,
                    nf = bundle.nf,
                    nnz_grad = bundle.grad.nnz(),
                    "loaded mesh bundle"
                );
                Ok(Arc::new(bundle))
            }
            None => Err(BundleError::UnknownLevel(level)),
        }
    }

    /// Parse every file-backed entry once and keep the result in memory.
    ///
    /// A full network asks for the same level many times; preloading turns
    /// those repeated reads into shared references.
    pub fn preload(&mut self) -> Result<(), BundleError> {
        let levels: Vec<MeshLevel> = self.levels().collect();
        for level in levels {
            if let Some(BundleSource::File(_)) = self.entries.get(&level) {
                let bundle = self.load(level)?;
                self.entries.insert(level, BundleSource::Loaded(bundle));
            }
        }
        Ok(())
    }
}
