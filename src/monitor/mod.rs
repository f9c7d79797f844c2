//! Job state monitoring.
//!
//! A [`JobMonitor`] turns repeated polls of the job service into a lazy,
//! finite stream: one [`MonitorEvent::Transition`] per observed state change
//! into a notify state, closed by a single [`MonitorEvent::Exit`].
//!
//! ```text
//!   poll ──► TransitionTracker ──► Transition? ──► notify filter ──► stream
//!    ▲                                                 │
//!    └──── sleep(poll_interval) ◄── non-terminal ◄─────┘
//!          (raced against deadline and cancellation)
//! ```
mod job_monitor;
mod transition;
pub use job_monitor::*;
pub use transition::*;

#[cfg(test)]
mod transition_test;
