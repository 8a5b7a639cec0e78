//! Deterministic, atomic serialization of composed documents.
//!
//! Every artifact is rendered to bytes before anything touches the disk.
//! Writes go to a temporary file in the destination directory which is then
//! renamed over the target, so readers only ever see the previous or the new
//! complete file. A replaced file keeps its permissions; a new one gets
//! `0644` on Unix.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use stackweave_common::error::{Result, StackweaveError};
use stackweave_common::types::OutputFormat;

use crate::node::Node;

/// A rendered document waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Destination path.
    pub path: PathBuf,
    /// Serialized content.
    pub bytes: Vec<u8>,
    /// Hex-encoded SHA-256 of `bytes`.
    pub digest: String,
}

/// What happened to an artifact on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitOutcome {
    /// The file was created or replaced.
    Written,
    /// The file already held identical content and was left alone.
    Unchanged,
}

impl fmt::Display for EmitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Written => write!(f, "written"),
            Self::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Result of emitting one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emitted {
    /// Destination path.
    pub path: PathBuf,
    /// Hex-encoded SHA-256 of the content.
    pub digest: String,
    /// Whether the file was rewritten.
    pub outcome: EmitOutcome,
}

/// Serializes `document` in canonical key order.
///
/// JSON output is pretty-printed with two-space indentation and ends with a
/// newline.
///
/// # Errors
///
/// Returns `StackweaveError::Serialization` if the serializer fails.
pub fn render(document: &Node, format: OutputFormat) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Json => {
            let mut bytes = serde_json::to_vec_pretty(document)?;
            bytes.push(b'\n');
            Ok(bytes)
        }
        OutputFormat::Yaml => Ok(serde_yaml::to_string(document)?.into_bytes()),
    }
}

/// Hex-encoded SHA-256 of `bytes`.
#[must_use]
pub fn digest(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Renders `document` into an artifact destined for `path`.
///
/// # Errors
///
/// Returns `StackweaveError::Serialization` if rendering fails.
pub fn prepare(path: &Path, document: &Node, format: OutputFormat) -> Result<Artifact> {
    let bytes = render(document, format)?;
    Ok(Artifact {
        path: path.to_path_buf(),
        digest: digest(&bytes),
        bytes,
    })
}

/// Writes one artifact atomically, skipping the write when the destination
/// already holds the same content.
///
/// # Errors
///
/// Returns `StackweaveError::Io` if the directory, temporary file or rename
/// fails. The previous file is left in place in every failure case.
pub fn write_atomic(artifact: &Artifact) -> Result<Emitted> {
    let path = &artifact.path;
    if let Ok(existing) = std::fs::read(path) {
        if digest(&existing) == artifact.digest {
            tracing::info!(path = %path.display(), digest = %artifact.digest, "artifact unchanged");
            return Ok(Emitted {
                path: path.clone(),
                digest: artifact.digest.clone(),
                outcome: EmitOutcome::Unchanged,
            });
        }
    }

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| StackweaveError::io(parent, e))?;

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(|e| StackweaveError::io(parent, e))?;
    temp.write_all(&artifact.bytes)
        .map_err(|e| StackweaveError::io(temp.path(), e))?;
    if let Some(permissions) = target_permissions(path) {
        temp.as_file()
            .set_permissions(permissions)
            .map_err(|e| StackweaveError::io(temp.path(), e))?;
    }
    temp.as_file()
        .sync_all()
        .map_err(|e| StackweaveError::io(temp.path(), e))?;
    let _ = temp
        .persist(path)
        .map_err(|e| StackweaveError::io(path, e.error))?;

    tracing::info!(path = %path.display(), digest = %artifact.digest, bytes = artifact.bytes.len(), "artifact written");
    Ok(Emitted {
        path: path.clone(),
        digest: artifact.digest.clone(),
        outcome: EmitOutcome::Written,
    })
}

/// Permissions the written file should end up with: those of the file being
/// replaced, or the default for a new file. Temporary files are created
/// owner-only, so this is applied before the rename.
fn target_permissions(path: &Path) -> Option<std::fs::Permissions> {
    std::fs::metadata(path)
        .map(|meta| meta.permissions())
        .ok()
        .or_else(default_permissions)
}

#[cfg(unix)]
fn default_permissions() -> Option<std::fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
const fn default_permissions() -> Option<std::fs::Permissions> {
    None
}

/// Writes every artifact in order.
///
/// # Errors
///
/// Returns the first write failure.
pub fn emit_all(artifacts: &[Artifact]) -> Result<Vec<Emitted>> {
    artifacts.iter().map(write_atomic).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc() -> Node {
        Node::from(json!({"Resources": {"B": {"Type": "T"}, "A": {"Type": "T"}}}))
    }

    #[test]
    fn json_render_is_sorted_and_newline_terminated() {
        let text = String::from_utf8(render(&doc(), OutputFormat::Json).expect("render")).expect("utf8");
        assert!(text.ends_with("}\n"));
        let a = text.find("\"A\"").expect("A");
        let b = text.find("\"B\"").expect("B");
        assert!(a < b, "keys not sorted: {text}");
    }

    #[test]
    fn yaml_render_parses_back() {
        let bytes = render(&doc(), OutputFormat::Yaml).expect("render");
        let back: serde_json::Value = serde_yaml::from_slice(&bytes).expect("yaml");
        assert_eq!(back, json!({"Resources": {"A": {"Type": "T"}, "B": {"Type": "T"}}}));
    }

    #[test]
    fn digest_is_sha256_hex() {
        assert_eq!(
            digest(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn write_creates_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("build").join("template.json");
        let artifact = prepare(&path, &doc(), OutputFormat::Json).expect("prepare");
        let emitted = write_atomic(&artifact).expect("write");
        assert_eq!(emitted.outcome, EmitOutcome::Written);
        assert_eq!(std::fs::read(&path).expect("read"), artifact.bytes);
    }

    #[test]
    fn second_identical_write_is_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("api.json");
        let artifact = prepare(&path, &doc(), OutputFormat::Json).expect("prepare");
        let _ = write_atomic(&artifact).expect("first write");
        let second = write_atomic(&artifact).expect("second write");
        assert_eq!(second.outcome, EmitOutcome::Unchanged);
    }

    #[test]
    fn changed_content_replaces_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("api.json");
        std::fs::write(&path, "stale").expect("seed");
        let artifact = prepare(&path, &doc(), OutputFormat::Json).expect("prepare");
        let emitted = write_atomic(&artifact).expect("write");
        assert_eq!(emitted.outcome, EmitOutcome::Written);
        assert_ne!(std::fs::read_to_string(&path).expect("read"), "stale");
    }

    #[test]
    fn failed_write_keeps_previous_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").expect("seed");
        let artifact = prepare(&blocker.join("out.json"), &doc(), OutputFormat::Json).expect("prepare");
        let err = write_atomic(&artifact).unwrap_err();
        assert!(matches!(err, StackweaveError::Io { .. }));
        assert_eq!(std::fs::read_to_string(&blocker).expect("read"), "file");
    }

    #[cfg(unix)]
    #[test]
    fn new_file_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("template.json");
        let artifact = prepare(&path, &doc(), OutputFormat::Json).expect("prepare");
        let _ = write_atomic(&artifact).expect("write");
        let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn replaced_file_keeps_its_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("template.json");
        std::fs::write(&path, "stale").expect("seed");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640)).expect("chmod");

        let artifact = prepare(&path, &doc(), OutputFormat::Json).expect("prepare");
        let emitted = write_atomic(&artifact).expect("write");
        assert_eq!(emitted.outcome, EmitOutcome::Written);
        let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }
}
