use async_trait::async_trait;
use std::io;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Captured result of an external command
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Runs external programs
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` and capture its output. A missing program
    /// is an `io::ErrorKind::NotFound` error.
    async fn output(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput>;

    /// Run `program` attached to the terminal so it can prompt the user
    async fn interactive(&self, program: &str, args: &[&str]) -> io::Result<bool>;
}

/// Runs programs on the host system
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn output(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput> {
        debug!("Running {} {}", program, args.join(" "));
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn interactive(&self, program: &str, args: &[&str]) -> io::Result<bool> {
        debug!("Running interactively {} {}", program, args.join(" "));
        let status = Command::new(program).args(args).status().await?;
        Ok(status.success())
    }
}
