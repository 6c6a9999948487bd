//! # Keeper Process
//!
//! Low-level process operations for the keeper watchdog.
//!
//! This crate provides:
//! - [`ChildHandle`]: start, wait, kill and release one child process
//! - PID-level termination ([`force_kill`])
//! - Process existence checks ([`process_exists`])

pub mod check;
pub mod execute;
pub mod terminate;

pub use check::*;
pub use execute::*;
pub use terminate::*;
