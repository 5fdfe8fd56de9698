//! In-memory resource store and result materialization.
//!
//! Every resource is addressed by a [`ResourceHandle`] and stays alive until
//! it is revoked. The page state machine tracks which handles it owns and
//! emits release effects on reset, replacement and stale completions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use docflow_core::{BinaryResult, Operation, ResourceHandle, TaskResult, PDF_MIME};
use engine_logging::{engine_trace, engine_warn};

use crate::persist::{AtomicFileWriter, PersistError};
use crate::TaskPayload;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResource {
    pub bytes: Bytes,
    pub mime: String,
    pub filename: String,
}

/// Cheaply cloneable handle to a shared store.
#[derive(Debug, Clone, Default)]
pub struct ResourceStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    next: AtomicU64,
    resources: Mutex<HashMap<ResourceHandle, StoredResource>>,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, resource: StoredResource) -> ResourceHandle {
        let handle = ResourceHandle::new(self.inner.next.fetch_add(1, Ordering::Relaxed) + 1);
        engine_trace!(
            "Created {} ({} bytes, {})",
            handle,
            resource.bytes.len(),
            resource.mime
        );
        self.lock().insert(handle, resource);
        handle
    }

    pub fn get(&self, handle: ResourceHandle) -> Option<StoredResource> {
        self.lock().get(&handle).cloned()
    }

    /// Returns whether the handle was live.
    pub fn revoke(&self, handle: ResourceHandle) -> bool {
        let removed = self.lock().remove(&handle).is_some();
        if removed {
            engine_trace!("Revoked {}", handle);
        } else {
            engine_warn!("Revoke of unknown {}", handle);
        }
        removed
    }

    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    /// Stores a user-provided PDF and returns its preview handle.
    pub fn store_upload(&self, filename: impl Into<String>, bytes: Bytes) -> ResourceHandle {
        self.create(StoredResource {
            bytes,
            mime: PDF_MIME.to_string(),
            filename: filename.into(),
        })
    }

    /// Turns a terminal payload into a page-owned result.
    ///
    /// Documents are stored under the operation's MIME type; extracted fields
    /// pass through untouched and hold no resource.
    pub fn materialize(&self, operation: Operation, payload: TaskPayload) -> TaskResult {
        match payload {
            TaskPayload::Fields(fields) => TaskResult::Structured(fields),
            TaskPayload::Document { bytes, filename } => {
                let mime = operation.result_mime().unwrap_or(PDF_MIME).to_string();
                let size = bytes.len() as u64;
                let handle = self.create(StoredResource {
                    bytes,
                    mime: mime.clone(),
                    filename: filename.clone(),
                });
                TaskResult::Binary(BinaryResult {
                    handle,
                    filename,
                    mime,
                    size,
                })
            }
        }
    }

    /// Writes a stored resource to `dir/filename`.
    pub fn save(
        &self,
        handle: ResourceHandle,
        dir: &Path,
        filename: &str,
    ) -> Result<PathBuf, PersistError> {
        let resource = self.get(handle).ok_or(PersistError::UnknownResource(handle))?;
        AtomicFileWriter::new(dir.to_path_buf()).write(filename, &resource.bytes)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ResourceHandle, StoredResource>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.inner
            .resources
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
