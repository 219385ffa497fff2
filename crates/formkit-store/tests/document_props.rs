use formkit_schema::{flatten, NodeFactory, NodeId, SchemaNode, SequentialIds, Widget};
use formkit_store::{FormDocument, MutationError};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Op {
    AddQuestion { parent: usize, position: usize },
    AddSection,
    Remove(usize),
    Clone(usize),
    Move { node: usize, target: usize },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (any::<usize>(), 0usize..4)
            .prop_map(|(parent, position)| Op::AddQuestion { parent, position }),
        1 => Just(Op::AddSection),
        2 => any::<usize>().prop_map(Op::Remove),
        2 => any::<usize>().prop_map(Op::Clone),
        1 => (any::<usize>(), any::<usize>())
            .prop_map(|(node, target)| Op::Move { node, target }),
    ]
}

fn pick(doc: &FormDocument, n: usize) -> NodeId {
    let mut ids: Vec<NodeId> = doc.ids().cloned().collect();
    ids.sort();
    ids[n % ids.len()].clone()
}

fn apply(doc: &mut FormDocument, op: &Op) -> Result<(), MutationError> {
    match *op {
        Op::AddQuestion { parent, position } => {
            let parent = pick(doc, parent);
            let question = SchemaNode::widget(Widget::ShortText).with_title("Q");
            doc.add_child(&parent, question, Some(position)).map(drop)
        }
        Op::AddSection => doc
            .add_tab(SchemaNode::widget(Widget::Section).with_title("S"), None)
            .map(drop),
        Op::Remove(n) => {
            let id = pick(doc, n);
            doc.remove_subtree(&id).map(drop)
        }
        Op::Clone(n) => {
            let id = pick(doc, n);
            doc.clone_subtree(&id, None).map(drop)
        }
        Op::Move { node, target } => {
            let id = pick(doc, node);
            let target = pick(doc, target);
            doc.move_node(&id, &target, None)
        }
    }
}

fn template_doc() -> FormDocument {
    let mut doc = FormDocument::new();
    let template = doc.factory().form_template(None);
    doc.replace_document(Some(template));
    doc
}

proptest! {
    #[test]
    fn prop_index_matches_reachable_set(ops in prop::collection::vec(arb_op(), 1..40)) {
        let mut doc = template_doc();
        for op in &ops {
            let before = doc.records();
            if apply(&mut doc, op).is_err() {
                prop_assert_eq!(doc.records(), before);
            }
            prop_assert!(doc.check_consistency().is_ok(), "{:?}", doc.check_consistency());

            let tree = doc.tree().unwrap();
            prop_assert_eq!(tree.subtree_len(), doc.len());
            let reachable: HashSet<NodeId> = flatten(&tree).into_keys().collect();
            let indexed: HashSet<NodeId> = doc.ids().cloned().collect();
            prop_assert_eq!(reachable, indexed);
        }
    }

    #[test]
    fn prop_clone_remaps_whole_batch(extra in 0usize..6, nested in any::<bool>()) {
        let mut doc = template_doc();
        let section = doc.top_level()[0].id().cloned().unwrap();
        let mut parent = section.clone();
        for _ in 0..extra {
            let id = doc
                .add_child(&parent, SchemaNode::widget(Widget::Number), None)
                .unwrap();
            if nested {
                parent = id;
            }
        }

        let originals: HashSet<NodeId> = doc.ids().cloned().collect();
        let descendants = doc.descendants_of(&section).len();
        let copy = doc.clone_subtree(&section, None).unwrap();

        let batch: Vec<NodeId> = std::iter::once(copy.clone())
            .chain(doc.descendants_of(&copy))
            .collect();
        prop_assert_eq!(batch.len(), descendants + 1);
        prop_assert!(batch.iter().all(|id| !originals.contains(id)));

        let batch_set: HashSet<&NodeId> = batch.iter().collect();
        for id in &batch[1..] {
            let parent = doc.get(id).unwrap().parent_id().unwrap();
            prop_assert!(batch_set.contains(parent));
        }
        prop_assert_eq!(doc.get(&copy).unwrap().parent_id(), doc.root_id());
    }

    #[test]
    fn prop_ids_stay_unique(ops in prop::collection::vec(arb_op(), 1..30)) {
        let mut doc = template_doc();
        for op in &ops {
            let _ = apply(&mut doc, op);
        }
        let records = doc.records();
        let distinct: HashSet<_> = records.iter().filter_map(|r| r.id()).collect();
        prop_assert_eq!(distinct.len(), records.len());
    }
}

#[test]
fn add_then_remove_scenario() {
    let factory = NodeFactory::new();
    let document = factory.build(
        SchemaNode::widget(Widget::Root).with_child(
            "section",
            SchemaNode::widget(Widget::Section)
                .with_child("header", SchemaNode::widget(Widget::Header)),
        ),
    );
    assert_eq!(flatten(&document).len(), 3);

    let mut doc = FormDocument::new().with_factory(factory);
    doc.replace_document(Some(document));
    let section = doc.top_level()[0].id().cloned().unwrap();
    let header = doc.children_of(&section)[0].id().cloned().unwrap();

    doc.add_child(&section, SchemaNode::widget(Widget::ShortText), None)
        .unwrap();
    assert_eq!(doc.len(), 4);
    assert_eq!(doc.get(&section).unwrap().children.len(), 2);

    let removed = doc.remove_subtree(&header).unwrap();
    assert_eq!(removed, vec![header]);
    assert_eq!(doc.len(), 3);
}

#[test]
fn last_tab_guard_is_a_no_op() {
    let mut doc = template_doc();
    let first = doc.top_level()[0].id().cloned().unwrap();
    doc.remove_tab(&first).unwrap();

    let only = doc.top_level()[0].id().cloned().unwrap();
    let before = doc.records();
    assert!(matches!(
        doc.remove_tab(&only),
        Err(MutationError::LastTopLevelSection(_))
    ));
    assert_eq!(doc.records(), before);
    assert_eq!(doc.top_level().len(), 1);
}

fn sequential_factory() -> NodeFactory {
    NodeFactory::with_id_source(Arc::new(SequentialIds::new("n")))
}

#[test]
fn clone_skips_ids_already_loaded() {
    let mut source = FormDocument::new().with_factory(sequential_factory());
    let template = source.factory().form_template(None);
    source.replace_document(Some(template));
    let records = source.records();
    let root = records
        .iter()
        .find(|r| r.data.parent_id.is_none())
        .and_then(|r| r.id().cloned())
        .unwrap();

    // Same prefix, fresh counter: the first ids minted are all taken.
    let mut doc = FormDocument::new().with_factory(sequential_factory());
    doc.load_records(&root, &records).unwrap();
    let before = doc.len();
    let section = doc.top_level()[0].id().cloned().unwrap();
    let subtree = 1 + doc.children_of(&section).len();

    let copy = doc.clone_subtree(&section, None).unwrap();

    assert!(records.iter().all(|r| r.id() != Some(&copy)));
    assert_eq!(doc.len(), before + subtree);
    assert_eq!(doc.root_id(), Some(&root));
    let distinct: HashSet<_> = doc.records().iter().filter_map(|r| r.id().cloned()).collect();
    assert_eq!(distinct.len(), doc.len());
    doc.check_consistency().unwrap();
}

#[test]
fn priority_is_not_editable_by_key() {
    let mut doc = template_doc();
    let section = doc.top_level()[0].id().cloned().unwrap();
    let before = doc.records();

    assert!(matches!(
        doc.update_node_property(&section, "x-priority", json!(5)),
        Err(MutationError::Property(_))
    ));
    assert_eq!(doc.records(), before);
    doc.check_consistency().unwrap();
}
