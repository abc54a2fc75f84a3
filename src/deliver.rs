use crate::config::DEFAULT_PAGER;
use crate::error::{Result, SweepError};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Where a finished report goes. Exactly one per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    /// Scrolling pager command line, e.g. `less -R`.
    Pager(String),
    File(PathBuf),
    Stdout,
}

impl Sink {
    /// `--save` wins; otherwise page only when stdout is an interactive terminal.
    pub fn choose(save_to: Option<PathBuf>, no_pager: bool, pager: Option<String>, is_term: bool) -> Self {
        if let Some(path) = save_to {
            return Sink::File(path);
        }
        if no_pager || !is_term {
            return Sink::Stdout;
        }
        Sink::Pager(pager_command(pager))
    }

    pub fn deliver(&self, report: &str) -> Result<()> {
        match self {
            Sink::Pager(command) => page(command, report),
            Sink::File(path) => fs::write(path, report).map_err(|source| SweepError::Delivery {
                sink: path.display().to_string(),
                source,
            }),
            Sink::Stdout => {
                let mut stdout = io::stdout().lock();
                stdout
                    .write_all(report.as_bytes())
                    .and_then(|_| stdout.flush())
                    .or_else(ignore_broken_pipe)
                    .map_err(|source| SweepError::Delivery {
                        sink: "stdout".to_string(),
                        source,
                    })
            }
        }
    }
}

/// Explicit pager, then `$PAGER`, then `less`.
pub fn pager_command(explicit: Option<String>) -> String {
    explicit
        .or_else(|| std::env::var("PAGER").ok())
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| DEFAULT_PAGER.to_string())
}

fn page(command: &str, report: &str) -> Result<()> {
    let delivery_error = |source| SweepError::Delivery {
        sink: command.to_string(),
        source,
    };

    let mut parts = command.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| delivery_error(io::Error::new(io::ErrorKind::InvalidInput, "empty pager command")))?;

    let mut child = Command::new(program)
        .args(parts)
        .stdin(Stdio::piped())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(delivery_error)?;

    if let Some(mut stdin) = child.stdin.take() {
        // quitting the pager early closes the pipe
        stdin
            .write_all(report.as_bytes())
            .or_else(ignore_broken_pipe)
            .map_err(delivery_error)?;
    }

    let status = child.wait().map_err(delivery_error)?;
    if !status.success() {
        return Err(delivery_error(io::Error::other(format!(
            "pager exited with {status}"
        ))));
    }
    Ok(())
}

fn ignore_broken_pipe(err: io::Error) -> io::Result<()> {
    if err.kind() == io::ErrorKind::BrokenPipe {
        Ok(())
    } else {
        Err(err)
    }
}
