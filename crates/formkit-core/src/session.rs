//! Editor session
//!
//! Owns the editable [`FormDocument`] and talks to storage. Edits go
//! through [`EditorSession::document_mut`]; saves and loads cross the
//! async boundary here.
//!
//! # Save semantics
//!
//! [`EditorSession::save`] takes a snapshot synchronously when called and
//! returns a `'static` future owning it. Edits made while the future is in
//! flight are not part of that save.

use crate::config::EditorConfig;
use crate::error::{EditorError, Result};
use crate::view::{project, ViewNode};
use formkit_persist::{FormReference, NodeRepository};
use formkit_rules::{Answers, FieldError, FieldValidator};
use formkit_schema::{NodeId, NodeRecord, SchemaNode};
use formkit_store::FormDocument;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;

/// Stored ids reachable from `root` through parent links but absent from
/// `current`
fn stale_ids(root: &NodeId, stored: &[NodeRecord], current: &[NodeRecord]) -> Vec<NodeId> {
    let mut by_parent: HashMap<&NodeId, Vec<&NodeId>> = HashMap::new();
    for record in stored {
        if let (Some(id), Some(parent)) = (record.id(), record.data.parent_id.as_ref()) {
            by_parent.entry(parent).or_default().push(id);
        }
    }
    let live: HashSet<&NodeId> = current.iter().filter_map(NodeRecord::id).collect();

    let mut stale = Vec::new();
    let mut seen: HashSet<&NodeId> = HashSet::from([root]);
    let mut queue: VecDeque<&NodeId> = VecDeque::from([root]);
    while let Some(id) = queue.pop_front() {
        for child in by_parent.get(id).into_iter().flatten() {
            if !seen.insert(*child) {
                continue;
            }
            if !live.contains(*child) {
                stale.push((*child).clone());
            }
            queue.push_back(*child);
        }
    }
    stale
}

/// One open form bound to a repository
pub struct EditorSession {
    document: FormDocument,
    repository: Arc<dyn NodeRepository>,
    validator: FieldValidator,
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("root", &self.document.root_id())
            .field("nodes", &self.document.len())
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}

impl EditorSession {
    /// Create session with an empty document
    #[must_use]
    pub fn new(config: &EditorConfig, repository: Arc<dyn NodeRepository>) -> Self {
        let document = FormDocument::new()
            .with_factory(config.node_factory())
            .with_options(config.document_options());
        Self {
            document,
            repository,
            validator: config.validator(),
        }
    }

    /// Start a new form from the default template
    ///
    /// `overrides` are merged over the template before ids are assigned.
    /// Returns the new root id.
    pub fn new_form(&mut self, overrides: Option<SchemaNode>) -> Option<NodeId> {
        let template = self.document.factory().form_template(overrides);
        let root = self.document.replace_document(Some(template));
        tracing::info!(root = ?root, "new form started");
        root
    }

    /// Current document
    #[inline]
    #[must_use]
    pub fn document(&self) -> &FormDocument {
        &self.document
    }

    /// Current document for editing
    #[inline]
    pub fn document_mut(&mut self) -> &mut FormDocument {
        &mut self.document
    }

    /// Validator in use
    #[inline]
    #[must_use]
    pub fn validator(&self) -> &FieldValidator {
        &self.validator
    }

    /// Persist the document as it is now
    ///
    /// Node records are upserted first. Stored records that hang under this
    /// root but are no longer in the document are then deleted, and the
    /// form reference is written last. The returned future does not borrow
    /// the session.
    pub fn save(&self) -> impl Future<Output = Result<FormReference>> + Send + 'static {
        let snapshot = self.document.snapshot();
        let repository = Arc::clone(&self.repository);

        async move {
            let tree = snapshot.tree().ok_or(EditorError::NoDocument)?;
            let reference = FormReference::for_root(&tree).ok_or(EditorError::NoDocument)?;
            let records = snapshot.records();

            let result: formkit_persist::Result<FormReference> = async {
                let stored = repository.get_all_node_records().await?;
                let stale = stale_ids(&reference.root_node_id, &stored, &records);
                repository.save_node_records(&records).await?;
                if !stale.is_empty() {
                    let removed = repository.delete_node_records(&stale).await?;
                    tracing::debug!(removed, "stale node records pruned");
                }
                repository.save_form_reference(reference).await
            }
            .await;

            match result {
                Ok(stored) => {
                    tracing::info!(form = %stored.id, nodes = records.len(), "form saved");
                    Ok(stored)
                }
                Err(e) => {
                    tracing::error!(error = %e, "form save failed");
                    Err(e.into())
                }
            }
        }
    }

    /// Replace the document with the stored form rooted at `root_id`
    ///
    /// # Errors
    /// - [`EditorError::Persist`] if the records cannot be read
    /// - [`EditorError::Mutation`] if no stored record has `root_id`
    pub async fn load(&mut self, root_id: &NodeId) -> Result<NodeId> {
        let records = self.repository.get_all_node_records().await.map_err(|e| {
            tracing::error!(error = %e, "node records could not be read");
            e
        })?;
        let root = self.document.load_records(root_id, &records)?;
        tracing::info!(root = %root, nodes = self.document.len(), "form loaded");
        Ok(root)
    }

    /// Presentation view for `answers`
    #[must_use]
    pub fn view(&self, answers: &Answers) -> Option<ViewNode> {
        project(&self.document, answers)
    }

    /// Validate every visible input against `answers`
    ///
    /// Nodes under a hidden or invisible ancestor are skipped. Returns only
    /// nodes with errors, in display order.
    #[must_use]
    pub fn validate(&self, answers: &Answers) -> IndexMap<NodeId, Vec<FieldError>> {
        validate_document(&self.document, &self.validator, answers)
    }
}

/// Validate every input of `document` that is visible for `answers`
///
/// Visibility is resolved through ancestors, so inputs of a hidden section
/// are never reported.
#[must_use]
pub fn validate_document(
    document: &FormDocument,
    validator: &FieldValidator,
    answers: &Answers,
) -> IndexMap<NodeId, Vec<FieldError>> {
    let Some(view) = project(document, answers) else {
        return IndexMap::new();
    };
    let visible = view
        .visible_ids()
        .into_iter()
        .filter_map(|id| document.get(id))
        .map(|record| &record.data);
    validator.validate_answers(visible, answers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use formkit_persist::MemoryRepository;
    use formkit_schema::Widget;
    use serde_json::json;

    fn session() -> (EditorSession, Arc<MemoryRepository>) {
        let repo = Arc::new(MemoryRepository::new());
        let session = EditorSession::new(&EditorConfig::default(), repo.clone());
        (session, repo)
    }

    #[tokio::test]
    async fn save_without_document_fails() {
        let (session, repo) = session();
        let err = session.save().await.unwrap_err();
        assert!(matches!(err, EditorError::NoDocument));
        assert_eq!(repo.node_count(), 0);
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let (mut session, repo) = session();
        let root = session.new_form(None).unwrap();
        let reference = session.save().await.unwrap();
        assert_eq!(reference.root_node_id, root);
        assert_eq!(reference.name, "Observation Tool Title");
        assert_eq!(repo.node_count(), session.document().len());

        let before = session.document().tree();
        session.document_mut().replace_document(None);
        session.load(&root).await.unwrap();
        assert_eq!(session.document().tree().map(|t| t.data), before.map(|t| t.data));
    }

    #[tokio::test]
    async fn removed_nodes_stay_removed_after_reload() {
        let (mut session, repo) = session();
        let root = session.new_form(None).unwrap();
        session.save().await.unwrap();

        let section = session.document().top_level()[0].id().cloned().unwrap();
        let header = session.document().children_of(&section)[0].id().cloned().unwrap();
        session.document_mut().remove_subtree(&header).unwrap();
        let expected = session.document().len();
        session.save().await.unwrap();
        assert_eq!(repo.node_count(), expected);

        session.document_mut().replace_document(None);
        session.load(&root).await.unwrap();
        assert_eq!(session.document().len(), expected);
        assert!(session.document().get(&header).is_none());
    }

    #[test]
    fn stale_ids_stop_at_other_forms() {
        let record = |id: &str, parent: Option<&str>| {
            let mut data = formkit_schema::NodeData::new(Widget::Section);
            data.id = Some(NodeId::new(id));
            data.parent_id = parent.map(NodeId::new);
            NodeRecord::from(data)
        };
        let stored = vec![
            record("r", None),
            record("s", Some("r")),
            record("q", Some("s")),
            record("other", None),
            record("other-s", Some("other")),
        ];
        let current = vec![record("r", None)];

        let stale = stale_ids(&NodeId::new("r"), &stored, &current);
        assert_eq!(stale, vec![NodeId::new("s"), NodeId::new("q")]);
    }

    #[tokio::test]
    async fn load_of_unknown_root_keeps_document() {
        let (mut session, _repo) = session();
        let root = session.new_form(None).unwrap();
        let err = session.load(&NodeId::new("missing")).await.unwrap_err();
        assert!(matches!(err, EditorError::Mutation(_)));
        assert_eq!(session.document().root_id(), Some(&root));
    }

    #[test]
    fn validate_skips_hidden_branches() {
        let (mut session, _repo) = session();
        session.new_form(None);
        let section = session.document().top_level()[1].id().cloned().unwrap();
        let question = SchemaNode::widget(Widget::ShortText).with_id("name").required();
        session.document_mut().add_child(&section, question, None).unwrap();

        let errors = session.validate(&Answers::new());
        assert_eq!(errors[&NodeId::new("name")][0].message, "This field is required");

        session
            .document_mut()
            .update_node_property(&section, "x-hidden", json!(true))
            .unwrap();
        assert!(session.validate(&Answers::new()).is_empty());
    }
}
