//! Subprocess-backed [`DocumentCompiler`].

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use pipeline::{BuildLayout, CompileOutcome, DocumentCompiler};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::latex::{LatexRenderer, RenderError};

/// A fixed command line: program plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Runs a compiler binary with the workspace as its working directory.
///
/// Standard output and standard error are captured in full. When `timeout`
/// elapses first the child is killed and [`CompileOutcome::TimedOut`] is
/// returned.
#[derive(Debug, Clone)]
pub struct ProcessCompiler {
    command: CommandSpec,
    layout: BuildLayout,
    timeout: Duration,
    renderer: Option<LatexRenderer>,
}

impl ProcessCompiler {
    pub fn new(command: CommandSpec, layout: BuildLayout, timeout: Duration) -> Self {
        Self {
            command,
            layout,
            timeout,
            renderer: None,
        }
    }

    /// Renders the staged template with [`LatexRenderer`] before running the command.
    pub fn with_latex_renderer(mut self, renderer: LatexRenderer) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn command(&self) -> &CommandSpec {
        &self.command
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn run(&self, workspace: &Path) -> std::io::Result<CompileOutcome> {
        let child = Command::new(&self.command.program)
            .args(&self.command.args)
            .current_dir(workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                warn!(command = %self.command, timeout_secs = self.timeout.as_secs_f64(), "compiler timed out, killed");
                return Ok(CompileOutcome::TimedOut { after: self.timeout });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            debug!(command = %self.command, "compiler exited successfully");
            let log = if stderr.is_empty() { stdout } else { format!("{stdout}{stderr}") };
            return Ok(CompileOutcome::Succeeded { log });
        }

        let diagnostics = if stderr.trim().is_empty() { stdout } else { stderr };
        Ok(CompileOutcome::Failed {
            exit_code: output.status.code(),
            diagnostics,
        })
    }
}

#[async_trait]
impl DocumentCompiler for ProcessCompiler {
    fn layout(&self) -> &BuildLayout {
        &self.layout
    }

    async fn compile(&self, workspace: &Path) -> std::io::Result<CompileOutcome> {
        if let Some(renderer) = &self.renderer {
            match renderer
                .render(workspace, &self.layout.template_file, &self.layout.data_file)
                .await
            {
                Ok(()) => {}
                Err(RenderError::Io(e)) => return Err(e),
                Err(e) => {
                    return Ok(CompileOutcome::Failed {
                        exit_code: None,
                        diagnostics: e.to_string(),
                    })
                }
            }
        }
        self.run(workspace).await
    }
}
