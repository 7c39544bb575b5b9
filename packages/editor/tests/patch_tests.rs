//! Patch application tests

use canvas_document::{Artboard, CanvasDocument, Node, PropertyValue, Rect};
use canvas_editor::{
    apply_patch, apply_patch_recorded, apply_patches, invert_patches, BatchPolicy, Patch, PatchError,
    PatchOp,
};
use serde_json::json;

fn hero_doc() -> CanvasDocument {
    CanvasDocument::new(
        "Landing",
        vec![Artboard::new("ab-desktop", "Desktop").with_children(vec![
            Node::frame("hero", "Hero").with_frame(Rect::new(0.0, 0.0, 1280.0, 600.0)),
            Node::text("subtitle", "Subtitle", "Build faster"),
        ])],
    )
}

fn names(doc: &CanvasDocument) -> Vec<&str> {
    doc.artboards[0].children.iter().map(|n| n.name.as_str()).collect()
}

#[test]
fn test_move_reorders_siblings() {
    let doc = hero_doc();
    let patch: Patch = serde_json::from_value(json!({
        "op": "move",
        "from": "/artboards/0/children/0",
        "path": "/artboards/0/children/1"
    }))
    .unwrap();

    let moved = apply_patch(&doc, &patch).unwrap();
    assert_eq!(names(&moved), vec!["Subtitle", "Hero"]);
    assert_eq!(names(&doc), vec!["Hero", "Subtitle"], "input must be untouched");
}

#[test]
fn test_replace_name_leaves_siblings_alone() {
    let doc = hero_doc();
    let patch: Patch = serde_json::from_value(json!({
        "op": "replace",
        "path": "/artboards/0/children/0/name",
        "value": "Updated Hero"
    }))
    .unwrap();

    let updated = apply_patch(&doc, &patch).unwrap();
    assert_eq!(updated.artboards[0].children[0].name, "Updated Hero");
    assert_eq!(updated.artboards[0].children[1], doc.artboards[0].children[1]);
}

#[test]
fn test_failed_test_leaves_document_identical() {
    let doc = hero_doc();
    let before = serde_json::to_string(&doc).unwrap();

    let patch = Patch::test("/artboards/0/children/0/name", json!("Not Hero"));
    match apply_patch(&doc, &patch) {
        Err(PatchError::TestFailed { actual, .. }) => assert_eq!(actual, json!("Hero")),
        other => panic!("Expected TestFailed, got {:?}", other),
    }

    assert_eq!(serde_json::to_string(&doc).unwrap(), before);
}

#[test]
fn test_numbers_compare_numerically() {
    let doc = hero_doc();
    let patch = Patch::test("/artboards/0/children/0/frame/width", json!(1280));
    assert!(apply_patch(&doc, &patch).is_ok());
}

#[test]
fn test_add_node_shifts_siblings() {
    let doc = hero_doc();
    let node = Node::text("eyebrow", "Eyebrow", "New").with_semantic_key("hero.eyebrow");

    let updated = apply_patch(
        &doc,
        &Patch::add("/artboards/0/children/1", serde_json::to_value(&node).unwrap()),
    )
    .unwrap();

    assert_eq!(names(&updated), vec!["Hero", "Eyebrow", "Subtitle"]);
}

#[test]
fn test_add_style_member() {
    let doc = hero_doc();
    let updated = apply_patch(
        &doc,
        &Patch::add(
            "/artboards/0/children/0/style",
            json!({ "fill": { "type": "color", "value": "#ff0000" } }),
        ),
    )
    .unwrap();
    let updated = apply_patch(
        &updated,
        &Patch::add("/artboards/0/children/0/style/opacity", json!({ "type": "number", "value": 0.5 })),
    )
    .unwrap();

    let style = updated.artboards[0].children[0].style.as_ref().unwrap();
    assert_eq!(style.get("opacity"), Some(&PropertyValue::Number(0.5)));
    assert_eq!(style.len(), 2);
}

#[test]
fn test_unresolvable_paths() {
    let doc = hero_doc();

    assert_eq!(
        apply_patch(&doc, &Patch::remove("/artboards/0/children/7")),
        Err(PatchError::PathNotFound("/artboards/0/children/7".to_string()))
    );
    assert!(matches!(
        apply_patch(&doc, &Patch::replace("/artboards/3/name", json!("x"))),
        Err(PatchError::PathNotFound(_))
    ));
    assert!(matches!(
        apply_patch(&doc, &Patch::remove("/artboards/0/children/0/style/missing")),
        Err(PatchError::PathNotFound(_))
    ));
}

#[test]
fn test_patch_that_breaks_invariants_is_rejected() {
    let doc = hero_doc();

    // Duplicate id
    let clash = Node::text("hero", "Clash", "x");
    let result = apply_patch(
        &doc,
        &Patch::add("/artboards/0/children/-", serde_json::to_value(&clash).unwrap()),
    );
    assert!(matches!(result, Err(PatchError::Validation(_))));

    // Last artboard
    let result = apply_patch(&doc, &Patch::remove("/artboards/0"));
    assert!(matches!(result, Err(PatchError::Validation(_))));

    // Negative size
    let result = apply_patch(&doc, &Patch::replace("/artboards/0/children/0/frame/width", json!(-5)));
    assert!(matches!(result, Err(PatchError::Validation(_))));
}

#[test]
fn test_move_across_containers() {
    let doc = hero_doc();
    let moved = apply_patch(
        &doc,
        &Patch::move_from("/artboards/0/children/1", "/artboards/0/children/0/children/0"),
    )
    .unwrap();

    assert_eq!(moved.artboards[0].children.len(), 1);
    assert_eq!(moved.artboards[0].children[0].children()[0].id, "subtitle");
}

#[test]
fn test_artboard_level_operations() {
    let doc = hero_doc();
    let mobile = Artboard::new("ab-mobile", "Mobile");

    let updated = apply_patch(&doc, &Patch::add("/artboards/-", serde_json::to_value(&mobile).unwrap())).unwrap();
    assert_eq!(updated.artboards.len(), 2);

    let updated = apply_patch(&updated, &Patch::move_from("/artboards/1", "/artboards/0")).unwrap();
    assert_eq!(updated.artboards[0].id, "ab-mobile");

    let updated = apply_patch(&updated, &Patch::replace("/name", json!("Renamed"))).unwrap();
    assert_eq!(updated.name, "Renamed");
}

#[test]
fn test_batch_abort_reports_failing_patch() {
    let doc = hero_doc();
    let patches = vec![
        Patch::replace("/artboards/0/children/0/name", json!("A")),
        Patch::test("/artboards/0/children/0/name", json!("B")),
        Patch::replace("/artboards/0/children/1/name", json!("C")),
    ];

    let error = apply_patches(&doc, &patches, BatchPolicy::Abort).unwrap_err();
    assert_eq!(error.index, 1);
    assert_eq!(error.op, PatchOp::Test);
    assert!(error.source.is_test_failure());
}

#[test]
fn test_batch_skip_failed_tests() {
    let doc = hero_doc();
    let patches = vec![
        Patch::replace("/artboards/0/children/0/name", json!("A")),
        Patch::test("/artboards/0/children/0/name", json!("B")),
        Patch::replace("/artboards/0/children/1/name", json!("C")),
    ];

    let outcome = apply_patches(&doc, &patches, BatchPolicy::SkipFailedTests).unwrap();
    assert_eq!(outcome.skipped, vec![1]);
    assert_eq!(names(&outcome.document), vec!["A", "C"]);
    assert_eq!(outcome.recorded.len(), 2);

    // Non-test failures still abort
    let patches = vec![Patch::remove("/artboards/0/children/9")];
    assert!(apply_patches(&doc, &patches, BatchPolicy::SkipFailedTests).is_err());
}

#[test]
fn test_recorded_inverse_restores_original() {
    let doc = hero_doc();
    let patches = vec![
        Patch::add(
            "/artboards/0/children/-",
            serde_json::to_value(Node::image("logo", "Logo", "logo.png")).unwrap(),
        ),
        Patch::move_from("/artboards/0/children/2", "/artboards/0/children/0/children/0"),
        Patch::replace("/artboards/0/children/1/content", json!("Ship it")),
        Patch::remove("/artboards/0/children/0/children/0"),
        Patch::copy_from("/artboards/0/children/1", "/artboards/0/children/0"),
        Patch::add("/artboards/0/children/1/data", json!({ "role": { "type": "string", "value": "banner" } })),
    ];

    let outcome = apply_patches(&doc, &patches, BatchPolicy::Abort).unwrap();
    let inverses = invert_patches(&outcome.recorded).unwrap();
    let restored = apply_patches(&outcome.document, &inverses, BatchPolicy::Abort).unwrap();

    assert_eq!(restored.document, doc);
}

#[test]
fn test_recorded_patch_carries_pre_image() {
    let doc = hero_doc();
    let applied = apply_patch_recorded(&doc, &Patch::remove("/artboards/0/children/1")).unwrap();

    let old = applied.recorded.old_value.unwrap();
    assert_eq!(old["id"], "subtitle");
    assert_eq!(old["content"], "Build faster");
}
