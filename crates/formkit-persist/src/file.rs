//! JSON-file repository
//!
//! One JSON array per collection in a data directory: `nodes.json`,
//! `forms.json` and `workflows.json`. Every call is a read-modify-write of
//! the whole file, serialized by a single lock. Files are replaced through
//! a temporary sibling so a crash never leaves a half-written array.

use crate::error::{PersistError, Result};
use crate::records::{FormReference, WorkflowDraft, WorkflowRecord};
use crate::repository::{require_ids, NodeRepository, WorkflowRepository};
use chrono::Utc;
use formkit_schema::{NodeId, NodeRecord};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Node records file name
pub const NODES_FILE: &str = "nodes.json";
/// Form catalog file name
pub const FORMS_FILE: &str = "forms.json";
/// Workflow list file name
pub const WORKFLOWS_FILE: &str = "workflows.json";

/// Repository backed by JSON files in one directory
#[derive(Debug)]
pub struct JsonFileRepository {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileRepository {
    /// Use `dir` as the data directory; it is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    /// Data directory
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        let path = self.dir.join(name);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PersistError::io_error(path, e)),
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|e| PersistError::serialization(path, e))
    }

    async fn write<T: Serialize>(&self, name: &str, items: &[T]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PersistError::io_error(&self.dir, e))?;

        let path = self.dir.join(name);
        let text = serde_json::to_string_pretty(items)
            .map_err(|e| PersistError::serialization(&path, e))?;
        let staging = self.dir.join(format!(".{name}.tmp"));
        tokio::fs::write(&staging, text)
            .await
            .map_err(|e| PersistError::io_error(&staging, e))?;
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(|e| PersistError::io_error(&path, e))?;
        tracing::debug!(path = %path.display(), count = items.len(), "collection written");
        Ok(())
    }
}

#[async_trait::async_trait]
impl NodeRepository for JsonFileRepository {
    async fn get_all_node_records(&self) -> Result<Vec<NodeRecord>> {
        let _guard = self.lock.lock().await;
        self.read(NODES_FILE).await
    }

    async fn save_node_records(&self, records: &[NodeRecord]) -> Result<()> {
        require_ids(records)?;
        let _guard = self.lock.lock().await;
        let mut stored: Vec<NodeRecord> = self.read(NODES_FILE).await?;
        for record in records {
            match stored.iter_mut().find(|existing| existing.id() == record.id()) {
                Some(existing) => existing.data = record.data.clone(),
                None => stored.push(NodeRecord::from(record.data.clone())),
            }
        }
        self.write(NODES_FILE, &stored).await
    }

    async fn delete_node_records(&self, ids: &[NodeId]) -> Result<usize> {
        let _guard = self.lock.lock().await;
        let mut stored: Vec<NodeRecord> = self.read(NODES_FILE).await?;
        let before = stored.len();
        stored.retain(|record| !record.id().is_some_and(|id| ids.contains(id)));
        let removed = before - stored.len();
        if removed > 0 {
            self.write(NODES_FILE, &stored).await?;
        }
        Ok(removed)
    }

    async fn get_form_references(&self) -> Result<Vec<FormReference>> {
        let _guard = self.lock.lock().await;
        self.read(FORMS_FILE).await
    }

    async fn save_form_reference(&self, reference: FormReference) -> Result<FormReference> {
        let _guard = self.lock.lock().await;
        let mut forms: Vec<FormReference> = self.read(FORMS_FILE).await?;
        let now = Utc::now();
        let stored = match forms.iter_mut().find(|form| form.id == reference.id) {
            Some(existing) => {
                *existing = reference.upsert_over(Some(&*existing), now);
                existing.clone()
            }
            None => {
                let stored = reference.upsert_over(None, now);
                forms.push(stored.clone());
                stored
            }
        };
        self.write(FORMS_FILE, &forms).await?;
        Ok(stored)
    }

    async fn delete_form_reference(&self, id: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut forms: Vec<FormReference> = self.read(FORMS_FILE).await?;
        let before = forms.len();
        forms.retain(|form| form.id != id);
        if forms.len() == before {
            return Ok(false);
        }
        self.write(FORMS_FILE, &forms).await?;
        Ok(true)
    }
}

#[async_trait::async_trait]
impl WorkflowRepository for JsonFileRepository {
    async fn list_workflows(&self) -> Result<Vec<WorkflowRecord>> {
        let _guard = self.lock.lock().await;
        self.read(WORKFLOWS_FILE).await
    }

    async fn save_workflow(&self, draft: WorkflowDraft) -> Result<WorkflowRecord> {
        let _guard = self.lock.lock().await;
        let mut workflows: Vec<WorkflowRecord> = self.read(WORKFLOWS_FILE).await?;
        let now = Utc::now();
        let record = match draft.id.clone() {
            Some(id) => {
                let existing = workflows
                    .iter_mut()
                    .find(|workflow| workflow.id == id)
                    .ok_or_else(|| PersistError::not_found("workflow", id))?;
                *existing = draft.into_record(Some(&*existing), now);
                existing.clone()
            }
            None => {
                let record = draft.into_record(None, now);
                workflows.push(record.clone());
                record
            }
        };
        self.write(WORKFLOWS_FILE, &workflows).await?;
        Ok(record)
    }

    async fn delete_workflow(&self, id: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut workflows: Vec<WorkflowRecord> = self.read(WORKFLOWS_FILE).await?;
        let before = workflows.len();
        workflows.retain(|workflow| workflow.id != id);
        if workflows.len() == before {
            return Ok(false);
        }
        self.write(WORKFLOWS_FILE, &workflows).await?;
        Ok(true)
    }
}
