//! Drain-accumulate-dispatch cycle: notification dispatch and the cycle scheduler.

pub mod dispatcher;
pub mod scheduler;
