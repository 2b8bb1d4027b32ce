//! One JSON model slot per classifier kind.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{Classifier, ClassifierError, ModelKind};

/// Version written into every saved model.
pub const MODEL_FORMAT_VERSION: u32 = 1;

const MODEL_EXTENSION: &str = "json";

/// On-disk model artifact.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct SavedModel {
    pub(crate) format_version: u32,
    pub(crate) classifier: Classifier,
}

/// Directory holding the saved model slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Slot path for `kind`: `<dir>/<SlotName>.json`.
    pub fn path_for(&self, kind: ModelKind) -> PathBuf {
        self.dir
            .join(format!("{}.{MODEL_EXTENSION}", kind.slot_name()))
    }

    /// Kinds that currently have a saved slot.
    pub fn saved_kinds(&self) -> Vec<ModelKind> {
        ModelKind::ALL
            .into_iter()
            .filter(|kind| self.path_for(*kind).is_file())
            .collect()
    }

    pub(crate) fn save(&self, classifier: &Classifier) -> Result<PathBuf, ClassifierError> {
        let kind = classifier.kind();
        let path = self.path_for(kind);
        let artifact = SavedModelRef {
            format_version: MODEL_FORMAT_VERSION,
            classifier,
        };
        let bytes = serde_json::to_vec(&artifact)
            .map_err(|source| ClassifierError::Serialize { kind, source })?;
        crate::persist::atomic_write(&path, &bytes).map_err(|source| {
            ClassifierError::ModelWrite {
                path: path.clone(),
                source,
            }
        })?;
        tracing::info!("Saved {kind} model to {}", path.display());
        Ok(path)
    }

    pub(crate) fn read(path: &Path) -> Result<SavedModel, ClassifierError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ClassifierError::ModelMissing {
                    path: path.to_path_buf(),
                });
            }
            Err(source) => {
                return Err(ClassifierError::ModelRead {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let saved: SavedModel =
            serde_json::from_slice(&bytes).map_err(|source| ClassifierError::ModelCorrupt {
                path: path.to_path_buf(),
                source,
            })?;
        if saved.format_version != MODEL_FORMAT_VERSION {
            return Err(ClassifierError::UnsupportedFormat {
                path: path.to_path_buf(),
                version: saved.format_version,
            });
        }
        Ok(saved)
    }
}

#[derive(Serialize)]
struct SavedModelRef<'a> {
    format_version: u32,
    classifier: &'a Classifier,
}
