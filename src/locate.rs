use crate::error::{Result, SweepError};
use crate::model::RepositoryRef;
use ignore::{DirEntry, Walk, WalkBuilder};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

pub const METADATA_DIR: &str = ".git";

/// Lazy depth-first pre-order walk yielding every `.git` marker under a root.
///
/// Siblings are visited in file-name order and symlinks are not followed.
/// The walk never descends into a marker. The first filesystem error is
/// yielded once and ends the sequence.
pub struct Repositories {
    walk: Walk,
    root: PathBuf,
    failed: bool,
}

pub fn repositories<P: AsRef<Path>>(root: P) -> Repositories {
    let root = root.as_ref().to_path_buf();
    let walk = WalkBuilder::new(&root)
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| !inside_marker(entry))
        .build();

    Repositories {
        walk,
        root,
        failed: false,
    }
}

fn inside_marker(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .path()
            .parent()
            .and_then(Path::file_name)
            .map_or(false, |name| name == OsStr::new(METADATA_DIR))
}

fn error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.as_path()),
        ignore::Error::Loop { child, .. } => Some(child.as_path()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        ignore::Error::Partial(errs) => errs.iter().find_map(error_path),
        _ => None,
    }
}

impl Iterator for Repositories {
    type Item = Result<RepositoryRef>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            match self.walk.next()? {
                Ok(entry) => {
                    if entry.file_name() == OsStr::new(METADATA_DIR) {
                        return Some(Ok(RepositoryRef::new(entry.into_path())));
                    }
                }
                Err(err) => {
                    self.failed = true;
                    let path = error_path(&err)
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    return Some(Err(SweepError::Filesystem { path, source: err }));
                }
            }
        }
    }
}
