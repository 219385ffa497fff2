use formkit_persist::{
    FormReference, JsonFileRepository, NodeRepository, PersistError, WorkflowDraft,
    WorkflowRepository, FORMS_FILE, NODES_FILE,
};
use formkit_schema::{flatten, reconstruct, NodeFactory, NodeId, NodeRecord, SequentialIds};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn template() -> formkit_schema::SchemaNode {
    NodeFactory::with_id_source(Arc::new(SequentialIds::new("n"))).form_template(None)
}

#[tokio::test]
async fn missing_files_read_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonFileRepository::new(dir.path().join("data"));

    assert!(repo.get_all_node_records().await.unwrap().is_empty());
    assert!(repo.get_form_references().await.unwrap().is_empty());
    assert!(repo.list_workflows().await.unwrap().is_empty());
    assert!(!repo.delete_workflow("w1").await.unwrap());
}

#[tokio::test]
async fn saved_records_reconstruct_the_document() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonFileRepository::new(dir.path());
    let document = template();
    let root = document.id().cloned().unwrap();

    let records: Vec<NodeRecord> = flatten(&document).into_values().collect();
    repo.save_node_records(&records).await.unwrap();

    let text = std::fs::read_to_string(dir.path().join(NODES_FILE)).unwrap();
    assert!(!text.contains("\"properties\""));

    let loaded = repo.get_all_node_records().await.unwrap();
    assert_eq!(loaded.len(), records.len());
    let rebuilt = reconstruct(&root, &loaded).unwrap();
    assert_eq!(rebuilt.subtree_len(), document.subtree_len());
    assert_eq!(rebuilt.data.title, document.data.title);
}

#[tokio::test]
async fn node_delete_rewrites_only_on_change() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonFileRepository::new(dir.path());
    let records: Vec<NodeRecord> = flatten(&template()).into_values().collect();
    repo.save_node_records(&records).await.unwrap();

    let gone = records[0].id().cloned().unwrap();
    assert_eq!(repo.delete_node_records(&[gone.clone()]).await.unwrap(), 1);
    assert_eq!(repo.delete_node_records(&[gone.clone()]).await.unwrap(), 0);

    let loaded = repo.get_all_node_records().await.unwrap();
    assert_eq!(loaded.len(), records.len() - 1);
    assert!(loaded.iter().all(|record| record.id() != Some(&gone)));

    let empty = tempfile::tempdir().unwrap();
    let untouched = JsonFileRepository::new(empty.path().join("data"));
    assert_eq!(untouched.delete_node_records(&[gone]).await.unwrap(), 0);
    assert!(!empty.path().join("data").join(NODES_FILE).exists());
}

#[tokio::test]
async fn node_save_is_an_upsert() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonFileRepository::new(dir.path());
    let records: Vec<NodeRecord> = flatten(&template()).into_values().collect();
    repo.save_node_records(&records).await.unwrap();

    let mut edited = records[0].clone();
    edited.data.title = Some("Edited".into());
    repo.save_node_records(&[edited]).await.unwrap();

    let loaded = repo.get_all_node_records().await.unwrap();
    assert_eq!(loaded.len(), records.len());
    assert_eq!(loaded[0].data.title.as_deref(), Some("Edited"));
}

#[tokio::test]
async fn form_reference_upsert_preserves_created_at() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonFileRepository::new(dir.path());

    let first = repo
        .save_form_reference(FormReference::new("f1", "Survey", NodeId::new("f1")))
        .await
        .unwrap();
    let second = repo
        .save_form_reference(FormReference::new("f1", "Survey v2", NodeId::new("f1")))
        .await
        .unwrap();

    assert_eq!(second.created_at, first.created_at);
    assert!(second.updated_at >= first.updated_at);

    let forms = repo.get_form_references().await.unwrap();
    assert_eq!(forms.len(), 1);
    assert_eq!(forms[0].name, "Survey v2");

    assert!(repo.delete_form_reference("f1").await.unwrap());
    assert!(repo.get_form_references().await.unwrap().is_empty());
}

#[tokio::test]
async fn workflow_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonFileRepository::new(dir.path());

    let created = repo
        .save_workflow(WorkflowDraft::new("Approval", "<definitions/>"))
        .await
        .unwrap();
    assert_eq!(created.version, 1);

    let updated = repo
        .save_workflow(WorkflowDraft::new("Approval", "<definitions id=\"2\"/>").for_id(&created.id))
        .await
        .unwrap();
    assert_eq!(updated.version, 2);

    let err = repo
        .save_workflow(WorkflowDraft::new("Ghost", "").for_id("nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, PersistError::NotFound { .. }));

    assert_eq!(repo.list_workflows().await.unwrap(), vec![updated]);
    assert!(repo.delete_workflow(&created.id).await.unwrap());
}

#[tokio::test]
async fn malformed_file_is_reported_with_its_path() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(FORMS_FILE), "{not json").unwrap();
    let repo = JsonFileRepository::new(dir.path());

    let err = repo.get_form_references().await.unwrap_err();
    match err {
        PersistError::Serialization { path, .. } => assert!(path.ends_with(FORMS_FILE)),
        other => panic!("unexpected error: {other}"),
    }
}
