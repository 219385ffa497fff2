//! In-memory repository
//!
//! Backs tests and the CLI when no data directory is used. Entries carry a
//! sequence number so listings come back in first-save order.

use crate::error::{PersistError, Result};
use crate::records::{FormReference, WorkflowDraft, WorkflowRecord};
use crate::repository::{require_ids, NodeRepository, WorkflowRepository};
use chrono::Utc;
use dashmap::DashMap;
use formkit_schema::{NodeId, NodeRecord};
use std::sync::atomic::{AtomicU64, Ordering};

/// Repository held entirely in concurrent maps
#[derive(Debug, Default)]
pub struct MemoryRepository {
    nodes: DashMap<NodeId, (u64, NodeRecord)>,
    forms: DashMap<String, (u64, FormReference)>,
    workflows: DashMap<String, (u64, WorkflowRecord)>,
    sequence: AtomicU64,
}

impl MemoryRepository {
    /// Create empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored node records
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn next_seq(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }
}

fn ordered<K, V: Clone>(map: &DashMap<K, (u64, V)>) -> Vec<V>
where
    K: Eq + std::hash::Hash,
{
    let mut entries: Vec<(u64, V)> = map.iter().map(|entry| entry.value().clone()).collect();
    entries.sort_by_key(|(seq, _)| *seq);
    entries.into_iter().map(|(_, value)| value).collect()
}

#[async_trait::async_trait]
impl NodeRepository for MemoryRepository {
    async fn get_all_node_records(&self) -> Result<Vec<NodeRecord>> {
        Ok(ordered(&self.nodes))
    }

    async fn save_node_records(&self, records: &[NodeRecord]) -> Result<()> {
        require_ids(records)?;
        for record in records {
            let Some(id) = record.id() else { continue };
            let mut stored = record.clone();
            stored.children.clear();
            let seq = self.nodes.get(id).map_or_else(|| self.next_seq(), |entry| entry.0);
            self.nodes.insert(id.clone(), (seq, stored));
        }
        tracing::debug!(count = records.len(), "node records saved");
        Ok(())
    }

    async fn delete_node_records(&self, ids: &[NodeId]) -> Result<usize> {
        let removed = ids.iter().filter(|id| self.nodes.remove(*id).is_some()).count();
        tracing::debug!(removed, "node records deleted");
        Ok(removed)
    }

    async fn get_form_references(&self) -> Result<Vec<FormReference>> {
        Ok(ordered(&self.forms))
    }

    async fn save_form_reference(&self, reference: FormReference) -> Result<FormReference> {
        let previous = self.forms.get(&reference.id).map(|entry| entry.value().clone());
        let seq = previous.as_ref().map_or_else(|| self.next_seq(), |(seq, _)| *seq);
        let stored = reference.upsert_over(previous.as_ref().map(|(_, form)| form), Utc::now());
        self.forms.insert(stored.id.clone(), (seq, stored.clone()));
        Ok(stored)
    }

    async fn delete_form_reference(&self, id: &str) -> Result<bool> {
        Ok(self.forms.remove(id).is_some())
    }
}

#[async_trait::async_trait]
impl WorkflowRepository for MemoryRepository {
    async fn list_workflows(&self) -> Result<Vec<WorkflowRecord>> {
        Ok(ordered(&self.workflows))
    }

    async fn save_workflow(&self, draft: WorkflowDraft) -> Result<WorkflowRecord> {
        let previous = match &draft.id {
            Some(id) => Some(
                self.workflows
                    .get(id)
                    .map(|entry| entry.value().clone())
                    .ok_or_else(|| PersistError::not_found("workflow", id.as_str()))?,
            ),
            None => None,
        };
        let seq = previous.as_ref().map_or_else(|| self.next_seq(), |(seq, _)| *seq);
        let record = draft.into_record(previous.as_ref().map(|(_, workflow)| workflow), Utc::now());
        self.workflows.insert(record.id.clone(), (seq, record.clone()));
        Ok(record)
    }

    async fn delete_workflow(&self, id: &str) -> Result<bool> {
        Ok(self.workflows.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formkit_schema::{NodeData, Widget};
    use pretty_assertions::assert_eq;

    fn record(id: &str, title: &str) -> NodeRecord {
        let mut data = NodeData::new(Widget::ShortText);
        data.id = Some(NodeId::new(id));
        data.title = Some(title.to_string());
        NodeRecord::from(data)
    }

    #[tokio::test]
    async fn node_upsert_keeps_first_save_order() {
        let repo = MemoryRepository::new();
        repo.save_node_records(&[record("a", "A"), record("b", "B")]).await.unwrap();
        repo.save_node_records(&[record("a", "A2"), record("c", "C")]).await.unwrap();

        let stored = repo.get_all_node_records().await.unwrap();
        let titles: Vec<_> = stored.iter().map(|r| r.data.title.clone().unwrap()).collect();
        assert_eq!(titles, vec!["A2", "B", "C"]);
    }

    #[tokio::test]
    async fn records_without_ids_are_rejected() {
        let repo = MemoryRepository::new();
        let anonymous = NodeRecord::from(NodeData::new(Widget::ShortText));
        let err = repo
            .save_node_records(&[record("a", "A"), anonymous])
            .await
            .unwrap_err();
        assert!(matches!(err, PersistError::MissingId("node")));
        assert_eq!(repo.node_count(), 0);
    }

    #[tokio::test]
    async fn node_delete_counts_present_ids() {
        let repo = MemoryRepository::new();
        repo.save_node_records(&[record("a", "A"), record("b", "B")]).await.unwrap();

        let removed = repo
            .delete_node_records(&[NodeId::new("a"), NodeId::new("missing")])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        let stored = repo.get_all_node_records().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id(), Some(&NodeId::new("b")));
    }

    #[tokio::test]
    async fn workflow_update_of_unknown_id_fails() {
        let repo = MemoryRepository::new();
        let err = repo
            .save_workflow(WorkflowDraft::new("W", "<xml/>").for_id("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, PersistError::NotFound { kind: "workflow", .. }));
        assert!(repo.list_workflows().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let repo = MemoryRepository::new();
        repo.save_form_reference(FormReference::new("f1", "F", NodeId::new("f1")))
            .await
            .unwrap();
        assert!(repo.delete_form_reference("f1").await.unwrap());
        assert!(!repo.delete_form_reference("f1").await.unwrap());
    }
}
