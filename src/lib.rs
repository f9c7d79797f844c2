//! Client-side toolbox for operating a Tamr instance.
//!
//! * [`JobMonitor`] / [`monitor_job`]: follow a remote job and notify state
//!   changes through Slack, Teams or email.
//! * [`ConfigReconciler`]: apply configuration changes and report every key
//!   that actually changed, including the ones the host derives.
//! * [`InstanceAdmin`]: run commands and start/stop scripts on the instance,
//!   locally or over ssh.
mod config;
mod errors;
mod job;
pub mod metrics;
mod monitor;
mod notify;
mod reconcile;
mod sysadmin;
pub mod utils;

pub use config::*;
pub use errors::*;
pub use job::*;
pub use monitor::*;
pub use notify::*;
pub use reconcile::*;
pub use sysadmin::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
