//! Scenarios, grouped by the component they drive.
//!
//! - `readiness` - dual-signal readiness against live endpoints
//! - `load` - batch sizing and failure accounting against live endpoints
//! - `orchestrator` - full runs: reports, skips, teardown, interrupts

pub mod orchestrator;
pub mod readiness;
