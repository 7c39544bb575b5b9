//! # Patch Inversion
//!
//! Inverses are computed from the patch alone, so `remove` and `replace`
//! need the pre-image in `oldValue`. Patches returned by
//! [`crate::apply_patch_recorded`] always carry it.
//!
//! ```text
//! add     → remove   (value becomes oldValue)
//! remove  → add      (needs oldValue)
//! replace → replace  (value and oldValue swap)
//! move    → move     (from and path swap)
//! copy    → remove   (at the destination)
//! test    → test
//! ```

use crate::errors::PatchError;
use crate::patch::{Patch, PatchOp};

pub fn invert_patch(patch: &Patch) -> Result<Patch, PatchError> {
    let missing_pre_image = || PatchError::MissingPreImage {
        op: patch.op.clone(),
        path: patch.path.clone(),
    };

    if matches!(patch.op, PatchOp::Add | PatchOp::Move | PatchOp::Copy) && ends_in_append(&patch.path) {
        return Err(PatchError::InvalidPath {
            path: patch.path.clone(),
            reason: "append position must be resolved before inverting".to_string(),
        });
    }

    match &patch.op {
        PatchOp::Add => {
            let mut inverse = Patch::remove(&patch.path);
            inverse.old_value = patch.value.clone();
            Ok(inverse)
        }
        PatchOp::Remove => {
            let old_value = patch.old_value.clone().ok_or_else(missing_pre_image)?;
            Ok(Patch::add(&patch.path, old_value))
        }
        PatchOp::Replace => {
            let old_value = patch.old_value.clone().ok_or_else(missing_pre_image)?;
            let mut inverse = Patch::replace(&patch.path, old_value);
            inverse.old_value = patch.value.clone();
            Ok(inverse)
        }
        PatchOp::Move => {
            let from = patch.from.clone().ok_or_else(|| PatchError::MissingFrom {
                op: patch.op.clone(),
                path: patch.path.clone(),
            })?;
            Ok(Patch::move_from(&patch.path, from))
        }
        PatchOp::Copy => {
            let mut inverse = Patch::remove(&patch.path);
            inverse.old_value = patch.value.clone();
            Ok(inverse)
        }
        PatchOp::Test => Ok(patch.clone()),
        PatchOp::Unknown(op) => Err(PatchError::UnknownOperation(op.clone())),
    }
}

/// Inverse of a patch list: each patch inverted, in reverse order
pub fn invert_patches(patches: &[Patch]) -> Result<Vec<Patch>, PatchError> {
    patches.iter().rev().map(invert_patch).collect()
}

fn ends_in_append(path: &str) -> bool {
    path.rsplit('/').next() == Some("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inverse_table() {
        let add = Patch::add("/artboards/0/children/1", json!({ "id": "n" }));
        let inverse = invert_patch(&add).unwrap();
        assert_eq!(inverse.op, PatchOp::Remove);
        assert_eq!(inverse.old_value, Some(json!({ "id": "n" })));

        let replace = Patch::replace("/name", json!("New")).with_old_value(json!("Old"));
        let inverse = invert_patch(&replace).unwrap();
        assert_eq!(inverse.value, Some(json!("Old")));
        assert_eq!(inverse.old_value, Some(json!("New")));

        let moved = Patch::move_from("/artboards/0/children/0", "/artboards/0/children/1");
        let inverse = invert_patch(&moved).unwrap();
        assert_eq!(inverse.from.as_deref(), Some("/artboards/0/children/1"));
        assert_eq!(inverse.path, "/artboards/0/children/0");

        let test = Patch::test("/name", json!("Landing"));
        assert_eq!(invert_patch(&test).unwrap(), test);
    }

    #[test]
    fn test_double_inversion_is_identity() {
        let patches = vec![
            Patch::add("/artboards/0/children/0", json!({ "id": "n" })),
            Patch::remove("/artboards/0/children/2").with_old_value(json!({ "id": "m" })),
            Patch::replace("/name", json!("B")).with_old_value(json!("A")),
            Patch::move_from("/artboards/0/children/0", "/artboards/1/children/0"),
            Patch::test("/name", json!("B")),
        ];

        for patch in &patches {
            let twice = invert_patch(&invert_patch(patch).unwrap()).unwrap();
            assert_eq!(&twice, patch);
        }

        let once = invert_patches(&patches).unwrap();
        assert_eq!(once[0], patches[4]);
        assert_eq!(once[4].op, PatchOp::Remove);
        assert_eq!(invert_patches(&once).unwrap(), patches);
    }

    #[test]
    fn test_missing_pre_image() {
        assert!(matches!(
            invert_patch(&Patch::remove("/artboards/0/children/0")),
            Err(PatchError::MissingPreImage { .. })
        ));
        assert!(matches!(
            invert_patch(&Patch::replace("/name", json!("x"))),
            Err(PatchError::MissingPreImage { .. })
        ));
    }

    #[test]
    fn test_list_inverse_is_reversed() {
        let patches = vec![
            Patch::replace("/name", json!("B")).with_old_value(json!("A")),
            Patch::replace("/name", json!("C")).with_old_value(json!("B")),
        ];

        let inverses = invert_patches(&patches).unwrap();
        assert_eq!(inverses[0].value, Some(json!("B")));
        assert_eq!(inverses[1].value, Some(json!("A")));
    }
}
