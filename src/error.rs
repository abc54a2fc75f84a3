use crate::decode::DecodeError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SweepError>;

#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: ignore::Error,
    },
    #[error("Tool invocation failed in {}: {source}", repo.display())]
    ToolInvocation {
        repo: PathBuf,
        #[source]
        source: ToolError,
    },
    #[error("Decode error in project '{project}': {source}")]
    Decode {
        project: String,
        #[source]
        source: DecodeError,
    },
    #[error("Delivery to {sink} failed: {source}")]
    Delivery {
        sink: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SweepError {
    /// Errors scoped to a single repository, which the aggregator may skip over.
    pub fn is_repository_scoped(&self) -> bool {
        matches!(self, SweepError::ToolInvocation { .. } | SweepError::Decode { .. })
    }
}

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {}", describe_exit(.code))]
    Exit { program: String, code: Option<i32> },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}
