//! Three-way merge tests

use canvas_document::{Artboard, CanvasDocument, Node, NodeKind, PropertyValue, Rect};
use canvas_merge::{merge_documents, ConflictType, MergeConfig, MergeError, Strategy};

fn landing() -> CanvasDocument {
    CanvasDocument::new(
        "Landing",
        vec![Artboard::new("ab", "Desktop").with_children(vec![
            Node::frame("hero", "Hero")
                .with_frame(Rect::new(0.0, 0.0, 1280.0, 600.0))
                .with_children(vec![
                    Node::text("title", "Title", "Welcome").with_semantic_key("hero.title"),
                    Node::text("cta", "CTA", "Go"),
                ]),
            Node::text("footer", "Footer", "(c)"),
        ])],
    )
}

fn hero(doc: &mut CanvasDocument) -> &mut Node {
    &mut doc.artboards[0].children[0]
}

fn hero_children(doc: &mut CanvasDocument) -> &mut Vec<Node> {
    hero(doc).children_mut().expect("hero is a frame")
}

fn footer(doc: &mut CanvasDocument) -> &mut Node {
    &mut doc.artboards[0].children[1]
}

fn set_content(node: &mut Node, text: &str) {
    node.kind = NodeKind::Text {
        content: text.to_string(),
    };
}

#[test]
fn test_disjoint_edits_contain_both_sides() {
    let base = landing();

    let mut local = base.clone();
    hero_children(&mut local)[0].name = "Headline".to_string();

    let mut remote = base.clone();
    set_content(footer(&mut remote), "(c) 2026");
    hero_children(&mut remote).push(Node::text("badge", "Badge", "New"));

    let outcome = merge_documents(&base, &local, &remote, &MergeConfig::default()).unwrap();

    let mut expected = base.clone();
    hero_children(&mut expected)[0].name = "Headline".to_string();
    set_content(footer(&mut expected), "(c) 2026");
    hero_children(&mut expected).push(Node::text("badge", "Badge", "New"));

    assert_eq!(outcome.document, expected);
    assert!(outcome.conflicts.is_empty());
    assert!(outcome.is_clean());
}

#[test]
fn test_scalar_conflict_prefers_remote() {
    let base = landing();
    let mut local = base.clone();
    set_content(&mut hero_children(&mut local)[1], "Start");
    let mut remote = base.clone();
    set_content(&mut hero_children(&mut remote)[1], "Begin");

    let outcome = merge_documents(&base, &local, &remote, &MergeConfig::default()).unwrap();

    assert_eq!(outcome.conflicts.len(), 1);
    assert_eq!(outcome.conflicts[0].id, "cta:content");
    assert_eq!(outcome.conflicts[0].conflict_type, ConflictType::ModifyModify);

    let resolution = &outcome.resolutions[0];
    assert_eq!(resolution.strategy, Strategy::PreferRemote);
    assert!(resolution.applied);
    assert!(outcome.review_queue().is_empty());

    assert_eq!(outcome.document, remote);
}

#[test]
fn test_frame_edits_merge_field_by_field() {
    let base = landing();
    let mut local = base.clone();
    hero(&mut local).frame.x = 10.0;
    let mut remote = base.clone();
    hero(&mut remote).frame.width = 1000.0;

    let outcome = merge_documents(&base, &local, &remote, &MergeConfig::default()).unwrap();

    assert_eq!(outcome.resolutions.len(), 1);
    assert_eq!(outcome.resolutions[0].strategy, Strategy::MergeBoth);
    assert_eq!(outcome.resolutions[0].confidence, 0.9);
    assert_eq!(outcome.document.artboards[0].children[0].frame, Rect::new(10.0, 0.0, 1000.0, 600.0));
}

#[test]
fn test_delete_vs_modify_goes_to_review_and_keeps_base() {
    let base = landing();
    let mut local = base.clone();
    local.artboards[0].children.remove(1);
    let mut remote = base.clone();
    set_content(footer(&mut remote), "(c) 2026");

    let outcome = merge_documents(&base, &local, &remote, &MergeConfig::default()).unwrap();

    assert_eq!(outcome.conflicts.len(), 1);
    assert_eq!(outcome.conflicts[0].id, "footer:existence");
    assert_eq!(outcome.conflicts[0].conflict_type, ConflictType::DeleteModify);

    let queue = outcome.review_queue();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].strategy, Strategy::Manual);
    assert_eq!(queue[0].resolved_value, None);
    assert!(!queue[0].applied);

    assert_eq!(outcome.document, base);
    assert!(!outcome.is_clean());
}

#[test]
fn test_configured_policy_can_accept_the_delete() {
    let base = landing();
    let mut local = base.clone();
    local.artboards[0].children.remove(1);
    let mut remote = base.clone();
    set_content(footer(&mut remote), "(c) 2026");

    let config = MergeConfig::default()
        .with_threshold(0.5)
        .with_policy(ConflictType::DeleteModify, vec![Strategy::PreferLocal]);
    let outcome = merge_documents(&base, &local, &remote, &config).unwrap();

    assert!(outcome.resolutions[0].applied);
    assert_eq!(outcome.document, local);
}

#[test]
fn test_removed_container_survives_when_child_was_edited() {
    let base = landing();
    let mut local = base.clone();
    local.artboards[0].children.remove(0);
    let mut remote = base.clone();
    hero_children(&mut remote)[1].name = "Call to action".to_string();

    let outcome = merge_documents(&base, &local, &remote, &MergeConfig::default()).unwrap();

    assert_eq!(outcome.conflicts.len(), 1);
    assert_eq!(outcome.conflicts[0].id, "cta:existence");

    assert_eq!(outcome.rejected.len(), 1);
    assert_eq!(outcome.rejected[0].node_id, "hero");
    assert!(outcome.rejected[0].reason.contains("cta"));

    // the hero stays for review; its other child is still removed
    let mut expected = base.clone();
    hero_children(&mut expected).remove(0);
    assert_eq!(outcome.document, expected);
}

#[test]
fn test_removed_container_with_new_child_stays_for_review() {
    let base = landing();
    let mut local = base.clone();
    local.artboards[0].children.remove(0);
    let mut remote = base.clone();
    hero_children(&mut remote).push(Node::text("badge", "Badge", "New"));

    let outcome = merge_documents(&base, &local, &remote, &MergeConfig::default()).unwrap();

    assert_eq!(outcome.conflicts.len(), 1);
    assert_eq!(outcome.conflicts[0].id, "hero:existence");
    assert_eq!(outcome.review_queue().len(), 1);
    assert!(outcome.rejected.is_empty(), "{:#?}", outcome.rejected);

    // title and cta stay with the hero until someone decides
    assert_eq!(outcome.document, base);

    let config = MergeConfig::default()
        .with_threshold(0.5)
        .with_policy(ConflictType::DeleteModify, vec![Strategy::PreferLocal]);
    let outcome = merge_documents(&base, &local, &remote, &config).unwrap();
    assert!(outcome.resolutions[0].applied);
    assert_eq!(outcome.document, local);
}

#[test]
fn test_removed_artboard_with_new_child_stays_for_review() {
    let mut base = landing();
    base.artboards.push(Artboard::new("mobile", "Mobile"));

    let mut local = base.clone();
    local.artboards[0].children.push(Node::text("new", "New", "Hi"));
    let mut remote = base.clone();
    remote.artboards.remove(0);

    let outcome = merge_documents(&base, &local, &remote, &MergeConfig::default()).unwrap();

    let ids: Vec<&str> = outcome.conflicts.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["ab:existence"]);
    assert_eq!(outcome.review_queue().len(), 1);
    assert!(outcome.rejected.is_empty(), "{:#?}", outcome.rejected);
    assert_eq!(outcome.document, base);
}

#[test]
fn test_type_change_keeps_concurrent_field_edits() {
    let base = landing();
    let mut local = base.clone();
    *footer(&mut local) = Node::image("footer", "Footer", "logo.png");
    let mut remote = base.clone();
    *footer(&mut remote) =
        Node::text("footer", "Footer 2026", "(c)").with_style("color", PropertyValue::Color("#fff".into()));

    let outcome = merge_documents(&base, &local, &remote, &MergeConfig::default()).unwrap();

    assert_eq!(outcome.conflicts.len(), 1);
    assert_eq!(outcome.conflicts[0].id, "footer:type");
    assert_eq!(outcome.resolutions[0].strategy, Strategy::MergeBoth);
    assert!(outcome.resolutions[0].applied);
    assert!(outcome.is_clean());

    let mut expected = base.clone();
    *footer(&mut expected) =
        Node::image("footer", "Footer 2026", "logo.png").with_style("color", PropertyValue::Color("#fff".into()));
    assert_eq!(outcome.document, expected);

    // the other way round lands on the same node
    let outcome = merge_documents(&base, &remote, &local, &MergeConfig::default()).unwrap();
    assert_eq!(outcome.document, expected);
}

#[test]
fn test_type_change_below_threshold_changes_nothing() {
    let base = landing();
    let mut local = base.clone();
    *footer(&mut local) = Node::image("footer", "Footer", "logo.png");
    let mut remote = base.clone();
    footer(&mut remote).name = "Footer 2026".to_string();

    let config = MergeConfig::default().with_threshold(0.95);
    let outcome = merge_documents(&base, &local, &remote, &config).unwrap();

    assert_eq!(outcome.review_queue().len(), 1);
    assert_eq!(outcome.document, base);
}

#[test]
fn test_move_vs_move_prefers_remote() {
    let base = landing();

    let mut local = base.clone();
    let moved = local.artboards[0].children.remove(1);
    hero_children(&mut local).insert(0, moved);

    let mut remote = base.clone();
    remote.artboards[0].children.swap(0, 1);

    let outcome = merge_documents(&base, &local, &remote, &MergeConfig::default()).unwrap();

    assert_eq!(outcome.conflicts.len(), 1);
    assert_eq!(outcome.conflicts[0].id, "footer:position");
    assert_eq!(outcome.conflicts[0].conflict_type, ConflictType::MoveMove);
    assert_eq!(outcome.document, remote);
}

#[test]
fn test_add_vs_add() {
    let base = landing();

    let mut local = base.clone();
    hero_children(&mut local).push(Node::text("badge", "Badge", "New"));

    // Same node on both sides converges
    let outcome = merge_documents(&base, &local, &local.clone(), &MergeConfig::default()).unwrap();
    assert!(outcome.conflicts.is_empty());
    assert_eq!(outcome.document, local);

    // Different content needs a human
    let mut remote = base.clone();
    hero_children(&mut remote).push(Node::text("badge", "Badge", "Hot"));

    let outcome = merge_documents(&base, &local, &remote, &MergeConfig::default()).unwrap();
    assert_eq!(outcome.conflicts.len(), 1);
    assert_eq!(outcome.conflicts[0].conflict_type, ConflictType::AddAdd);
    assert_eq!(outcome.review_queue().len(), 1);
    assert_eq!(outcome.document, base);
}

#[test]
fn test_semantic_key_collision_is_rejected_not_fatal() {
    let base = landing();
    let mut local = base.clone();
    hero_children(&mut local).push(Node::text("a", "Promo", "Sale").with_semantic_key("hero.promo"));
    let mut remote = base.clone();
    hero_children(&mut remote).push(Node::text("b", "Promo", "Deal").with_semantic_key("hero.promo"));

    let outcome = merge_documents(&base, &local, &remote, &MergeConfig::default()).unwrap();

    assert_eq!(outcome.rejected.len(), 1);
    assert_eq!(outcome.rejected[0].node_id, "b");
    assert_eq!(outcome.rejected[0].conflict_id, None);
    assert_eq!(outcome.document, local);
}

#[test]
fn test_recreated_node_keeps_remote_edit() {
    let base = landing();
    let mut local = base.clone();
    hero_children(&mut local)[0].id = "title-2".to_string();
    let mut remote = base.clone();
    hero_children(&mut remote)[0].name = "Headline".to_string();

    let outcome = merge_documents(&base, &local, &remote, &MergeConfig::default()).unwrap();

    let title = &outcome.document.artboards[0].children[0].children()[0];
    assert_eq!(title.id, "title-2");
    assert_eq!(title.name, "Headline");
    assert!(outcome.is_clean());
}

#[test]
fn test_leaf_becomes_container_before_children_move_in() {
    let base = landing();
    let mut local = base.clone();
    let cta = hero_children(&mut local).remove(1);
    *footer(&mut local) = Node::frame("footer", "Footer").with_children(vec![cta]);

    let outcome = merge_documents(&base, &local, &base, &MergeConfig::default()).unwrap();

    assert!(outcome.rejected.is_empty(), "{:#?}", outcome.rejected);
    assert_eq!(outcome.document, local);
}

#[test]
fn test_invalid_input_is_an_error() {
    let base = landing();
    let mut remote = base.clone();
    remote.artboards[0].children.push(Node::text("footer", "Again", "dup"));

    match merge_documents(&base, &base, &remote, &MergeConfig::default()) {
        Err(MergeError::InvalidInput { side, .. }) => assert_eq!(side, "remote"),
        other => panic!("expected InvalidInput, got {:?}", other),
    }
}

#[test]
fn test_node_ceiling_is_checked_first() {
    let base = landing();
    let config = MergeConfig::default().with_max_nodes(3);

    assert!(matches!(
        merge_documents(&base, &base, &base, &config),
        Err(MergeError::DocumentTooLarge { side: "base", nodes: 4, limit: 3 })
    ));
}
