// src/fs/paths.rs

use std::path::{Component, Path, PathBuf};

/// Normalize a path into its canonical in-memory form: absolute (resolved
/// against `base_dir` when relative) and lexically cleaned (`.` removed,
/// `..` collapsed).
///
/// This is purely lexical; the path does not have to exist. All path
/// comparisons in this crate go through this form so that the same file is
/// never tracked or watched under two spellings.
pub fn normalize_path(base_dir: &Path, path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    };

    let mut cleaned = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Lexical `..`: popping at the root is a no-op.
                cleaned.pop();
            }
            other => cleaned.push(other),
        }
    }
    cleaned
}

/// String form of a path with forward slashes, used for substring and
/// boundary-prefix comparisons.
pub fn path_str(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
