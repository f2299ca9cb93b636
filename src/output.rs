//! Document loading and output layout
//!
//! ```text
//! <dir>/canonical.json
//! <dir>/index.html
//! <dir>/variants/{template}_v{id}.html   (all-variants mode)
//! ```
//!
//! Writers take already-rendered pages; nothing here renders.

use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::errors::{ErrorCode, PipelineError};
use crate::hashing::{compute_document_hash, sha256_hex};
use crate::render::RenderedPage;
use crate::schema::CanonicalDocument;
use crate::validation::validate;

pub const CANONICAL_FILE: &str = "canonical.json";
pub const INDEX_FILE: &str = "index.html";
pub const VARIANTS_DIR: &str = "variants";

/// Read a file as JSON without interpreting it
pub fn read_json(path: &Path) -> Result<Value, PipelineError> {
    let raw = fs::read_to_string(path).map_err(|e| {
        let code = if e.kind() == std::io::ErrorKind::NotFound {
            ErrorCode::FileNotFound
        } else {
            ErrorCode::FileReadFailed
        };
        PipelineError::io(code, path, e)
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        PipelineError::io(ErrorCode::JsonParseFailed, path, &e)
            .with_detail("line", e.line())
            .with_detail("column", e.column())
    })
}

/// Load and validate a persisted canonical document
pub fn load_document(path: &Path) -> Result<CanonicalDocument, PipelineError> {
    let value = read_json(path)?;
    let doc = validate(&value).map_err(|e| e.with_detail("path", path.display().to_string()))?;
    info!(
        path = %path.display(),
        product = %doc.project.product_name,
        schema_version = %doc.meta.schema_version,
        "loaded canonical document"
    );
    Ok(doc)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub sha256: String,
    pub bytes: usize,
}

/// What one invocation wrote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputManifest {
    pub directory: PathBuf,
    pub document_hash: String,
    pub files: Vec<WrittenFile>,
}

fn write_file(path: &Path, contents: &str) -> Result<WrittenFile, PipelineError> {
    fs::write(path, contents).map_err(|e| PipelineError::io(ErrorCode::FileWriteFailed, path, e))?;
    debug!(path = %path.display(), bytes = contents.len(), "wrote file");
    Ok(WrittenFile {
        path: path.to_path_buf(),
        sha256: sha256_hex(contents.as_bytes()),
        bytes: contents.len(),
    })
}

fn create_dir(path: &Path) -> Result<(), PipelineError> {
    fs::create_dir_all(path).map_err(|e| PipelineError::io(ErrorCode::FileWriteFailed, path, e))
}

/// Persist the document, the index page and any variant pages under `dir`.
/// The document is validated first; nothing is written when it fails.
pub fn write_outputs(
    dir: &Path,
    doc: &CanonicalDocument,
    index: &RenderedPage,
    variants: &[RenderedPage],
) -> Result<OutputManifest, PipelineError> {
    let serialize_err = |e: serde_json::Error| {
        PipelineError::io(ErrorCode::FileWriteFailed, &dir.join(CANONICAL_FILE), e)
    };
    // a written canonical.json must load back
    let value = serde_json::to_value(doc).map_err(serialize_err)?;
    validate(&value)?;

    let canonical = doc.to_json().map_err(serialize_err)?;
    let document_hash = compute_document_hash(doc).map_err(serialize_err)?;

    create_dir(dir)?;
    let mut files = vec![
        write_file(&dir.join(CANONICAL_FILE), &canonical)?,
        write_file(&dir.join(INDEX_FILE), &index.html)?,
    ];

    if !variants.is_empty() {
        let variants_dir = dir.join(VARIANTS_DIR);
        create_dir(&variants_dir)?;
        for page in variants {
            files.push(write_file(&variants_dir.join(page.file_name()), &page.html)?);
        }
    }

    info!(directory = %dir.display(), files = files.len(), "outputs written");
    Ok(OutputManifest {
        directory: dir.to_path_buf(),
        document_hash,
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_document(&dir.path().join("absent.json")).unwrap_err();
        assert_eq!(err.code, ErrorCode::FileNotFound);
    }

    #[test]
    fn test_bad_json_reports_position() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\n  \"meta\": ").unwrap();
        let err = load_document(file.path()).unwrap_err();
        assert_eq!(err.code, ErrorCode::JsonParseFailed);
        assert_eq!(err.details["line"], 2);
    }

    #[test]
    fn test_invalid_document_is_validation_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"meta\": {{}}}}").unwrap();
        let err = load_document(file.path()).unwrap_err();
        assert_eq!(err.code, ErrorCode::SchemaValidation);
    }
}
