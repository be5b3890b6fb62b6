//! Copying `<source>/static/` into the output.
//!
//! Images referenced from content are rewritten to `/static/…` by the
//! Markdown renderer, so this tree is copied verbatim to `<output>/static/`.
//! Hidden entries (dotfiles, `.git`, editor droppings) are skipped, and a
//! hidden directory is skipped with everything under it.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

pub const STATIC_DIR: &str = "static";

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub files: usize,
    pub directories: usize,
    pub bytes: u64,
}

impl fmt::Display for CopyStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files in {} directories ({} bytes)",
            self.files, self.directories, self.bytes
        )
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

/// Copy `src` into `dst` recursively. A missing `src` copies nothing.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<CopyStats, AssetError> {
    let mut stats = CopyStats::default();
    if !src.is_dir() {
        return Ok(stats);
    }

    let walker = WalkDir::new(src)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e));
    for entry in walker {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
            if entry.depth() > 0 {
                stats.directories += 1;
            }
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let bytes = fs::copy(entry.path(), &target).map_err(|source| AssetError::Copy {
                from: entry.path().to_path_buf(),
                to: target.clone(),
                source,
            })?;
            stats.files += 1;
            stats.bytes += bytes;
        }
    }
    Ok(stats)
}

/// Copy `<source>/static/` to `<output>/static/`.
pub fn copy_static(source_root: &Path, output_dir: &Path) -> Result<CopyStats, AssetError> {
    copy_tree(&source_root.join(STATIC_DIR), &output_dir.join(STATIC_DIR))
}
