use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use super::invalid;
use crate::Result;

/// Where the Tamr instance lives and how to act on it
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct InstanceConfig {
    /// Tamr base URL for the REST API, e.g. `http://10.0.0.5:9100`
    #[serde(default)]
    pub base_url: Option<String>,

    /// Basic-auth user for the REST API
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Full path to the directory where Tamr is installed, e.g. `/data/tamr-home`
    #[serde(default)]
    pub install_dir: String,

    /// Run instance commands over ssh instead of the local shell
    #[serde(default)]
    pub ssh: Option<SshConfig>,

    /// Bash user to run instance commands as, usually the Tamr install user
    #[serde(default)]
    pub impersonation_username: Option<String>,

    /// Password for `impersonation_username`. `sudo` is used when absent.
    #[serde(default)]
    pub impersonation_password: Option<String>,

    /// Log full commands and their output at INFO instead of DEBUG
    #[serde(default)]
    pub verbose: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SshConfig {
    pub host: String,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default = "default_ssh_port")]
    pub port: u16,

    /// Private key passed to `ssh -i`
    #[serde(default)]
    pub identity_file: Option<PathBuf>,
}

impl InstanceConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.install_dir.is_empty() && !Path::new(&self.install_dir).is_absolute() {
            return Err(invalid(format!(
                "instance.install_dir must be an absolute path, got {}",
                self.install_dir
            )));
        }
        if self.impersonation_password.is_some() && self.impersonation_username.is_none() {
            return Err(invalid(
                "instance.impersonation_password requires instance.impersonation_username".into(),
            ));
        }
        if let Some(url) = &self.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(invalid(format!("instance.base_url must be an http(s) URL, got {url}")));
            }
        }
        if let Some(ssh) = &self.ssh {
            if ssh.host.is_empty() {
                return Err(invalid("instance.ssh.host cannot be empty".into()));
            }
        }
        Ok(())
    }
}

fn default_ssh_port() -> u16 {
    22
}
