use crate::error::{Result, SweepError};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::path::{is_separator, Path, PathBuf};

/// A discovered repository, identified by its `.git` marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    pub path: PathBuf,
    pub name: String,
}

impl RepositoryRef {
    pub fn new(path: PathBuf) -> Self {
        let name = project_name(&path);
        Self { path, name }
    }

    /// Directory the VCS tool runs in: the parent of the marker.
    pub fn workdir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

/// Second-to-last path segment of a marker path, or "" when there is none.
pub fn project_name(path: &Path) -> String {
    let text = path.to_string_lossy();
    let segments: Vec<&str> = text.split(is_separator).collect();
    if segments.len() < 2 {
        return String::new();
    }
    segments[segments.len() - 2].to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
    pub short_hash: String,
    pub author: String,
    pub timestamp: DateTime<FixedOffset>,
    pub message: String,
    pub project: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchGroup {
    pub project: String,
    pub matches: Vec<String>,
}

/// Half-open commit window `[after, before)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateWindow {
    pub after: DateTime<FixedOffset>,
    pub before: DateTime<FixedOffset>,
}

impl DateWindow {
    pub fn new(after: DateTime<FixedOffset>, before: DateTime<FixedOffset>) -> Result<Self> {
        if after >= before {
            return Err(SweepError::InvalidDate(format!(
                "Invalid window: after ({}) is not before ({})",
                after.to_rfc3339(),
                before.to_rfc3339()
            )));
        }
        Ok(Self { after, before })
    }

    pub fn contains(&self, timestamp: &DateTime<FixedOffset>) -> bool {
        timestamp >= &self.after && timestamp < &self.before
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Commits { author: String, window: DateWindow },
    Branches { pattern: String },
}
