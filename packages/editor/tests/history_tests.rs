//! Undo/redo sequences over mixed patch kinds

use canvas_document::{Artboard, CanvasDocument, Node};
use canvas_editor::{BatchPolicy, History, Patch};
use serde_json::json;

fn doc() -> CanvasDocument {
    CanvasDocument::new(
        "Landing",
        vec![Artboard::new("ab", "Desktop").with_children(vec![
            Node::frame("hero", "Hero").with_children(vec![Node::text("title", "Title", "Welcome")]),
            Node::text("subtitle", "Subtitle", "Build faster"),
            Node::image("logo", "Logo", "logo.png"),
        ])],
    )
}

#[test]
fn test_undo_each_step_in_reverse() -> anyhow::Result<()> {
    let original = doc();
    let mut history = History::new();

    let s1 = history.apply(&original, &Patch::move_from("/artboards/0/children/2", "/artboards/0/children/0"))?;
    let s2 = history.apply(&s1, &Patch::remove("/artboards/0/children/1/children/0"))?;
    let s3 = history.apply(&s2, &Patch::copy_from("/artboards/0/children/2", "/artboards/0/children/1/children/-"))?;
    assert_eq!(history.undo_levels(), 3);

    let back2 = history.undo(&s3)?.expect("undo copy");
    assert_eq!(back2, s2);
    let back1 = history.undo(&back2)?.expect("undo remove");
    assert_eq!(back1, s1);
    let back0 = history.undo(&back1)?.expect("undo move");
    assert_eq!(back0, original);
    assert!(!history.can_undo());
    assert_eq!(history.redo_levels(), 3);

    Ok(())
}

#[test]
fn test_apply_all_is_one_undo_step() -> anyhow::Result<()> {
    let original = doc();
    let mut history = History::new();

    let patches = vec![
        Patch::replace("/artboards/0/children/0/name", json!("Banner")),
        Patch::test("/artboards/0/children/0/name", json!("Nope")),
        Patch::add("/artboards/0/children/1/data", json!({ "tone": { "type": "string", "value": "calm" } })),
    ];
    let edited = history.apply_all(&original, &patches, BatchPolicy::SkipFailedTests)?;
    assert_eq!(history.undo_levels(), 1);

    let undone = history.undo(&edited)?.expect("undo batch");
    assert_eq!(undone, original);

    let redone = history.redo(&undone)?.expect("redo batch");
    assert_eq!(redone, edited);

    Ok(())
}

#[test]
fn test_apply_all_failure_records_nothing() {
    let mut history = History::new();
    let patches = vec![
        Patch::replace("/artboards/0/children/0/name", json!("Banner")),
        Patch::remove("/artboards/0/children/42"),
    ];

    let error = history.apply_all(&doc(), &patches, BatchPolicy::Abort).unwrap_err();
    assert_eq!(error.index, 1);
    assert_eq!(history.undo_levels(), 0);
}

#[test]
fn test_apply_all_joins_open_batch() -> anyhow::Result<()> {
    let original = doc();
    let mut history = History::new();

    history.begin_batch();
    let step = history.apply(&original, &Patch::replace("/name", json!("Draft")))?;
    let step = history.apply_all(
        &step,
        &[Patch::replace("/artboards/0/name", json!("Wide"))],
        BatchPolicy::Abort,
    )?;
    history.end_batch();

    assert_eq!(history.undo_levels(), 1);
    assert_eq!(history.undo(&step)?, Some(original));

    Ok(())
}
