//! camtrack-control: the tracking control loop
//!
//! One cooperative loop owns every stateful component (frame source,
//! detector, position filter, link manager, overlay) and drives them at a
//! fixed tick rate until the user asks it to stop.

pub mod error;
pub mod shutdown;
pub mod control_loop;

pub use error::ControlError;
pub use shutdown::{shutdown_channel, ShutdownSignal, ShutdownTrigger};
pub use control_loop::{ControlLoop, ExitReason, LoopStats, RunSummary, TickOutcome};
