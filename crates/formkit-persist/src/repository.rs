//! Repository traits
//!
//! The editor core talks to storage only through these traits. Calls are
//! async; implementations must be shareable across tasks.

use crate::error::Result;
use crate::records::{FormReference, WorkflowDraft, WorkflowRecord};
use formkit_schema::{NodeId, NodeRecord};

/// Node records and the form catalog
#[async_trait::async_trait]
pub trait NodeRepository: Send + Sync {
    /// Every stored node record, in first-save order
    async fn get_all_node_records(&self) -> Result<Vec<NodeRecord>>;

    /// Upsert records by id
    ///
    /// Records without an id are rejected with
    /// [`PersistError::MissingId`](crate::PersistError::MissingId) before
    /// anything is written.
    async fn save_node_records(&self, records: &[NodeRecord]) -> Result<()>;

    /// Remove records by id; returns how many were present
    ///
    /// Unknown ids are skipped.
    async fn delete_node_records(&self, ids: &[NodeId]) -> Result<usize>;

    /// Every form reference, in first-save order
    async fn get_form_references(&self) -> Result<Vec<FormReference>>;

    /// Upsert a form reference by id
    ///
    /// An existing entry keeps its `created_at`; `updated_at` becomes now.
    /// Returns the stored entry.
    async fn save_form_reference(&self, reference: FormReference) -> Result<FormReference>;

    /// Remove a form reference; `false` when there was none
    ///
    /// The form's node records are left in place.
    async fn delete_form_reference(&self, id: &str) -> Result<bool>;
}

/// Workflow list
#[async_trait::async_trait]
pub trait WorkflowRepository: Send + Sync {
    /// Every workflow, in creation order
    async fn list_workflows(&self) -> Result<Vec<WorkflowRecord>>;

    /// Create (no id: version 1) or update (id: version + 1)
    ///
    /// Updating an unknown id fails with
    /// [`PersistError::NotFound`](crate::PersistError::NotFound).
    async fn save_workflow(&self, draft: WorkflowDraft) -> Result<WorkflowRecord>;

    /// Remove a workflow; `false` when there was none
    async fn delete_workflow(&self, id: &str) -> Result<bool>;
}

/// Reject a batch containing records without ids
pub(crate) fn require_ids(records: &[NodeRecord]) -> Result<()> {
    if records.iter().any(|record| record.id().is_none()) {
        return Err(crate::PersistError::MissingId("node"));
    }
    Ok(())
}
