//! Config reconciliation: apply a batch of values, then diff the host
//! configuration before and after to learn what really changed.
mod change_set;
mod reconciler;

pub use change_set::*;
pub use reconciler::*;
