//! MJML to HTML compilation
//!
//! Compilation is delegated to an external MJML compiler. The default
//! implementation runs a command (the `mjml` CLI unless configured otherwise),
//! feeds the template on stdin and reads the HTML from stdout.

use crate::project_config::CompilerConfig;
use std::io::Write;
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;

/// Errors that can occur while compiling MJML
#[derive(Error, Debug)]
pub enum CompileError {
    /// The compiler process could not be started
    #[error("Failed to start MJML compiler '{program}': {source}")]
    Spawn {
        /// Program that was run
        program: String,
        /// Error from starting the process
        #[source]
        source: std::io::Error,
    },

    /// Writing the template or reading the output failed
    #[error("I/O error while talking to MJML compiler '{program}': {source}")]
    Io {
        /// Program that was run
        program: String,
        /// Error from the pipe
        #[source]
        source: std::io::Error,
    },

    /// The compiler exited unsuccessfully
    #[error("MJML compiler '{program}' exited with {status}: {stderr}")]
    Failed {
        /// Program that was run
        program: String,
        /// Exit status of the process
        status: ExitStatus,
        /// Trimmed stderr of the process
        stderr: String,
    },

    /// The output is not UTF-8
    #[error("MJML compiler '{program}' produced output that is not valid UTF-8")]
    Utf8 {
        /// Program that was run
        program: String,
    },

    /// The compiler succeeded but wrote nothing
    #[error("MJML compiler '{program}' produced no output")]
    EmptyOutput {
        /// Program that was run
        program: String,
    },
}

/// Something that turns MJML source into HTML
pub trait MjmlCompiler: Send + Sync {
    /// Compile one MJML document
    fn compile(&self, mjml: &str) -> Result<String, CompileError>;
}

/// Compiles by running an external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandCompiler {
    /// Program to run
    pub program: String,
    /// Arguments passed to the program
    pub args: Vec<String>,
}

impl CommandCompiler {
    /// Create a compiler for the given command line
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Create a compiler from the `[compiler]` config section
    pub fn from_config(config: &CompilerConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }

    fn io_error(&self, source: std::io::Error) -> CompileError {
        CompileError::Io {
            program: self.program.clone(),
            source,
        }
    }
}

impl MjmlCompiler for CommandCompiler {
    fn compile(&self, mjml: &str) -> Result<String, CompileError> {
        log::debug!("Running {} {}", self.program, self.args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CompileError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Feed stdin from a separate thread so a large output cannot block on a full pipe
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| self.io_error(std::io::Error::other("stdin was not captured")))?;
        let input = mjml.to_owned();
        let writer = std::thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child.wait_with_output().map_err(|e| self.io_error(e))?;

        if !output.status.success() {
            return Err(CompileError::Failed {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        writer
            .join()
            .map_err(|_| self.io_error(std::io::Error::other("stdin writer panicked")))?
            .map_err(|e| self.io_error(e))?;

        let html = String::from_utf8(output.stdout).map_err(|_| CompileError::Utf8 {
            program: self.program.clone(),
        })?;

        if html.trim().is_empty() {
            return Err(CompileError::EmptyOutput {
                program: self.program.clone(),
            });
        }

        Ok(html)
    }
}
