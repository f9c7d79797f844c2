use std::sync::Arc;

use tracing::debug;
use tracing::info;
use tracing::instrument;

use super::CommandOutput;
use super::CommandRunner;
use super::Impersonation;
use super::LocalCommandRunner;
use super::SshCommandRunner;
use crate::utils::async_task::task_with_timeout_and_exponential_backoff;
use crate::BackoffPolicy;
use crate::CommandError;
use crate::InstanceConfig;
use crate::RetryPolicies;

/// Runs administration commands against one Tamr installation
pub struct InstanceAdmin {
    runner: Arc<dyn CommandRunner>,
    install_dir: String,
    impersonation: Option<Impersonation>,
    verbose: bool,
    retry: BackoffPolicy,
}

impl InstanceAdmin {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        install_dir: impl Into<String>,
    ) -> Self {
        InstanceAdmin {
            runner,
            install_dir: install_dir.into(),
            impersonation: None,
            verbose: false,
            retry: RetryPolicies::default().admin_command,
        }
    }

    /// Local shell, or ssh when `instance.ssh` is set
    pub fn from_config(
        config: &InstanceConfig,
        retry: &RetryPolicies,
    ) -> Self {
        let runner: Arc<dyn CommandRunner> = match &config.ssh {
            Some(ssh) => Arc::new(SshCommandRunner::new(ssh.clone())),
            None => Arc::new(LocalCommandRunner),
        };
        let impersonation = config
            .impersonation_username
            .as_ref()
            .map(|user| Impersonation::new(user.clone(), config.impersonation_password.clone()));

        InstanceAdmin::new(runner, config.install_dir.clone())
            .with_impersonation(impersonation)
            .with_verbose(config.verbose)
            .with_retry(retry.admin_command)
    }

    pub fn with_impersonation(
        mut self,
        impersonation: Option<Impersonation>,
    ) -> Self {
        self.impersonation = impersonation;
        self
    }

    pub fn with_verbose(
        mut self,
        verbose: bool,
    ) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_retry(
        mut self,
        retry: BackoffPolicy,
    ) -> Self {
        self.retry = retry;
        self
    }

    pub fn install_dir(&self) -> &str {
        &self.install_dir
    }

    /// Path of a script or tool relative to `{install_dir}/tamr`
    pub fn tamr_path(
        &self,
        relative: &str,
    ) -> String {
        format!("{}/tamr/{}", self.install_dir.trim_end_matches('/'), relative)
    }

    /// Runs `command` as the configured user.
    ///
    /// Connection failures and attempt timeouts are retried. With `enforce_success`
    /// a non-zero exit becomes [`CommandError::NonZeroExit`].
    pub async fn run_command(
        &self,
        command: &str,
        enforce_success: bool,
    ) -> std::result::Result<CommandOutput, CommandError> {
        let (command, input) = match &self.impersonation {
            Some(impersonation) => impersonation.wrap(command),
            None => (command.to_string(), None),
        };
        let target = self.runner.describe();
        self.log(format_args!("Running command on {}: {}", target, command));

        let runner = self.runner.clone();
        let output = task_with_timeout_and_exponential_backoff(
            || {
                let runner = runner.clone();
                let command = command.clone();
                let input = input.clone();
                async move { runner.run(&command, input).await }
            },
            self.retry,
        )
        .await?;

        self.log(format_args!(
            "Command ended with exit code {:?}.\nSTDOUT: {}\nSTDERR: {}",
            output.exit_code,
            output.stdout.trim(),
            output.stderr.trim()
        ));

        if enforce_success && !output.success() {
            return Err(match output.exit_code {
                Some(exit_code) => CommandError::NonZeroExit {
                    target,
                    command,
                    exit_code,
                    stdout: output.stdout.trim().to_string(),
                    stderr: output.stderr.trim().to_string(),
                },
                None => CommandError::Terminated { command, target },
            });
        }
        Ok(output)
    }

    /// Starts the dependencies (optional) and then Tamr
    #[instrument(skip(self))]
    pub async fn start_tamr(
        &self,
        include_dependencies: bool,
    ) -> std::result::Result<(), CommandError> {
        if include_dependencies {
            info!("Starting Tamr dependencies.");
            self.run_command(&self.tamr_path("start-dependencies.sh"), true).await?;
        }
        info!("Starting Tamr software.");
        self.run_command(&self.tamr_path("start-unify.sh"), true).await?;
        Ok(())
    }

    /// Stops Tamr and then the dependencies (optional)
    #[instrument(skip(self))]
    pub async fn stop_tamr(
        &self,
        include_dependencies: bool,
    ) -> std::result::Result<(), CommandError> {
        info!("Stopping Tamr software.");
        self.run_command(&self.tamr_path("stop-unify.sh"), true).await?;
        if include_dependencies {
            info!("Stopping Tamr dependencies.");
            self.run_command(&self.tamr_path("stop-dependencies.sh"), true).await?;
        }
        Ok(())
    }

    pub async fn restart_tamr(
        &self,
        include_dependencies: bool,
    ) -> std::result::Result<(), CommandError> {
        self.stop_tamr(include_dependencies).await?;
        self.start_tamr(include_dependencies).await
    }

    fn log(
        &self,
        message: std::fmt::Arguments<'_>,
    ) {
        if self.verbose {
            info!("{}", message);
        } else {
            debug!("{}", message);
        }
    }
}
