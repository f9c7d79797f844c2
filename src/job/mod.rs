//! Remote job (Tamr operation) model and query client.
mod client;
mod state;
mod tamr_client;
pub use client::*;
pub use state::*;
pub use tamr_client::*;
