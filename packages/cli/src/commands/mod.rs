pub mod diff;
pub mod merge;
pub mod patch;
pub mod validate;

pub use diff::{diff, DiffArgs};
pub use merge::{merge, MergeArgs};
pub use patch::{patch, PatchArgs};
pub use validate::{validate, ValidateArgs};

use anyhow::{Context, Result};
use canvas_document::CanvasDocument;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Cannot parse {}", path.display()))
}

/// Read a document and check it against the schema
pub(crate) fn read_document(path: &Path) -> Result<CanvasDocument> {
    let doc: CanvasDocument = read_json(path)?;
    doc.validate()
        .with_context(|| format!("{} is not a valid document", path.display()))?;
    Ok(doc)
}

/// Pretty JSON to `output`, or stdout when no path is given
pub(crate) fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, json + "\n").with_context(|| format!("Cannot write {}", path.display()))
        }
        None => {
            println!("{}", json);
            Ok(())
        }
    }
}
