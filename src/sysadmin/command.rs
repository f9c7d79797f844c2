use std::process::Stdio;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::utils::shell::quote;
use crate::CommandError;
use crate::SshConfig;

/// ssh reserves this exit code for its own failures
const SSH_ERROR_EXIT_CODE: i32 = 255;

/// What a finished command printed and how it ended
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Executes shell commands on the machine hosting Tamr.
///
/// A non-zero exit is not an error at this level; see
/// [`crate::InstanceAdmin::run_command`] for success enforcement.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync + 'static {
    async fn run(
        &self,
        command: &str,
        input: Option<Vec<u8>>,
    ) -> std::result::Result<CommandOutput, CommandError>;

    /// Where commands run, e.g. `local` or `tamr@10.0.0.5`
    fn describe(&self) -> String;
}

/// Runs commands through `sh -c` on this machine
#[derive(Debug, Default)]
pub struct LocalCommandRunner;

#[async_trait]
impl CommandRunner for LocalCommandRunner {
    async fn run(
        &self,
        command: &str,
        input: Option<Vec<u8>>,
    ) -> std::result::Result<CommandOutput, CommandError> {
        let mut process = Command::new("sh");
        process.arg("-c").arg(command);
        spawn_and_collect(process, command, &self.describe(), input).await
    }

    fn describe(&self) -> String {
        "local".to_string()
    }
}

/// Runs commands on a remote machine through the system `ssh` client.
///
/// Batch mode is always on: authentication must not prompt.
#[derive(Debug, Clone)]
pub struct SshCommandRunner {
    config: SshConfig,
}

impl SshCommandRunner {
    pub fn new(config: SshConfig) -> Self {
        SshCommandRunner { config }
    }

    pub(crate) fn destination(&self) -> String {
        match &self.config.user {
            Some(user) => format!("{}@{}", user, self.config.host),
            None => self.config.host.clone(),
        }
    }

    /// Arguments passed to `ssh`, the remote command last
    pub(crate) fn ssh_args(
        &self,
        command: &str,
    ) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-p".to_string(),
            self.config.port.to_string(),
        ];
        if let Some(identity) = &self.config.identity_file {
            args.push("-i".to_string());
            args.push(identity.display().to_string());
        }
        args.push(self.destination());
        args.push("--".to_string());
        args.push(command.to_string());
        args
    }
}

#[async_trait]
impl CommandRunner for SshCommandRunner {
    async fn run(
        &self,
        command: &str,
        input: Option<Vec<u8>>,
    ) -> std::result::Result<CommandOutput, CommandError> {
        let mut process = Command::new("ssh");
        process.args(self.ssh_args(command));
        let output = spawn_and_collect(process, command, &self.describe(), input).await?;
        if output.exit_code == Some(SSH_ERROR_EXIT_CODE) {
            return Err(CommandError::Connection {
                target: self.describe(),
                message: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }

    fn describe(&self) -> String {
        self.destination()
    }
}

async fn spawn_and_collect(
    mut process: Command,
    command: &str,
    target: &str,
    input: Option<Vec<u8>>,
) -> std::result::Result<CommandOutput, CommandError> {
    let spawn_error = |source: std::io::Error| CommandError::Spawn {
        command: command.to_string(),
        target: target.to_string(),
        source,
    };

    process
        .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    let mut child = process.spawn().map_err(spawn_error)?;

    if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
        stdin.write_all(&input).await.map_err(spawn_error)?;
        // closing stdin lets the command see EOF
        drop(stdin);
    }

    let output = child.wait_with_output().await.map_err(spawn_error)?;
    Ok(CommandOutput {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Runs commands as another bash user
#[derive(Clone, PartialEq, Eq)]
pub struct Impersonation {
    pub username: String,
    /// `sudo` is used when absent
    pub password: Option<String>,
}

impl std::fmt::Debug for Impersonation {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Impersonation")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Impersonation {
    pub fn new(
        username: impl Into<String>,
        password: Option<String>,
    ) -> Self {
        Impersonation {
            username: username.into(),
            password,
        }
    }

    /// Wraps `command` so it runs as the impersonated user.
    ///
    /// Returns the command line and the bytes to feed on stdin.
    pub fn wrap(
        &self,
        command: &str,
    ) -> (String, Option<Vec<u8>>) {
        match &self.password {
            None => (
                format!("sudo su - {} -c {}", self.username, quote(command)),
                None,
            ),
            Some(password) => (
                format!("su - {} -c {}", self.username, quote(command)),
                Some(password.as_bytes().to_vec()),
            ),
        }
    }
}
