use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Directory receiving `tbox.log`. Logs go to stderr when absent.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}
