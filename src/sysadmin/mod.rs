//! Instance administration: shell commands on the Tamr host, start/stop
//! scripts, and the configuration accessor built on the admin tool.
mod command;
mod config_store;
mod config_value;
mod instance;

pub use command::*;
pub use config_store::*;
pub use config_value::*;
pub use instance::*;

#[cfg(test)]
mod config_value_test;
