pub mod tool;

pub use tool::{GitCli, VcsTool};

use crate::decode::ENTRY_TEMPLATE;
use crate::error::ToolError;
use crate::model::{Query, RepositoryRef};
use chrono::SecondsFormat;
use std::path::Path;

/// Renders the git arguments for a query.
pub fn query_args(query: &Query) -> Vec<String> {
    match query {
        Query::Commits { author, window } => vec![
            "log".to_string(),
            format!("--author={author}"),
            format!("--after={}", window.after.to_rfc3339_opts(SecondsFormat::Secs, false)),
            format!("--before={}", window.before.to_rfc3339_opts(SecondsFormat::Secs, false)),
            format!("--pretty=format:{ENTRY_TEMPLATE}"),
        ],
        Query::Branches { pattern } => vec![
            "branch".to_string(),
            "--all".to_string(),
            "--no-color".to_string(),
            "--list".to_string(),
            format!("*{pattern}*"),
        ],
    }
}

pub fn run_query<T: VcsTool + ?Sized>(
    tool: &T,
    repo: &RepositoryRef,
    query: &Query,
) -> Result<Vec<u8>, ToolError> {
    tool.invoke(repo.workdir(), &query_args(query))
}

/// `git config user.name`, trimmed; `None` when unset or blank.
pub fn configured_user<T: VcsTool + ?Sized>(tool: &T, cwd: &Path) -> Option<String> {
    let out = tool
        .invoke(cwd, &["config".to_string(), "user.name".to_string()])
        .ok()?;
    let name = String::from_utf8_lossy(&out).trim().to_string();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}
