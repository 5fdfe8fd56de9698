use std::path::{Path, PathBuf};

use docflow_core::FileSelection;

use crate::{ResourceStore, SubmissionError, Upload};

/// Resolves a page selection into the bytes that get uploaded.
///
/// Uploads are read back from the resource store; samples are read from the
/// samples directory on demand.
#[derive(Debug, Clone)]
pub struct InputResolver {
    samples_dir: PathBuf,
    store: ResourceStore,
}

impl InputResolver {
    pub fn new(samples_dir: PathBuf, store: ResourceStore) -> Self {
        Self { samples_dir, store }
    }

    pub fn samples_dir(&self) -> &Path {
        &self.samples_dir
    }

    pub async fn resolve(&self, source: &FileSelection) -> Result<Upload, SubmissionError> {
        match source {
            FileSelection::Upload(file) => {
                let resource = self.store.get(file.preview).ok_or_else(|| {
                    SubmissionError::Input(format!("{} was already released", file.preview))
                })?;
                Ok(Upload {
                    filename: file.name.clone(),
                    bytes: resource.bytes,
                })
            }
            FileSelection::Sample(sample) => {
                let path = self.samples_dir.join(sample.path);
                let bytes = tokio::fs::read(&path)
                    .await
                    .map_err(|err| SubmissionError::Input(format!("{}: {err}", path.display())))?;
                Ok(Upload {
                    filename: sample.name.to_string(),
                    bytes: bytes.into(),
                })
            }
        }
    }
}
