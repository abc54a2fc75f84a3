use crate::error::ToolError;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Capability to run the version-control tool inside a working directory.
pub trait VcsTool: Send + Sync {
    /// Runs the tool with `args` in `workdir`, returning raw stdout.
    ///
    /// Stderr is discarded. Empty stdout is not an error.
    fn invoke(&self, workdir: &Path, args: &[String]) -> Result<Vec<u8>, ToolError>;
}

/// The `git` binary found on `PATH` (or an explicit program path).
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl GitCli {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("git"),
        }
    }

    pub fn with_program<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl VcsTool for GitCli {
    fn invoke(&self, workdir: &Path, args: &[String]) -> Result<Vec<u8>, ToolError> {
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|source| ToolError::Spawn {
                program: self.program_name(),
                source,
            })?;

        if !output.status.success() {
            return Err(ToolError::Exit {
                program: self.program_name(),
                code: output.status.code(),
            });
        }

        Ok(output.stdout)
    }
}
