//! # API Route Modules
//!
//! - `executions`: manual runs: all active rules, one rule, or one rule
//!   over an explicit member subset. All share the engine-wide execution
//!   guard with the scheduler.
//! - `rules`: the rule catalogue, activation toggles, and dry-run previews.
//! - `change_logs`: the audit trail of category transitions, newest first.
//! - `stats`: dashboard counts.
//! - `scheduler`: status, start/stop/toggle, and interval configuration.

pub mod change_logs;
pub mod executions;
pub mod rules;
pub mod scheduler;
pub mod stats;
