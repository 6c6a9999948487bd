//! # Keeper Common
//!
//! Error types shared across the keeper crates.
//!
//! Every crate that touches an OS process reports failures through
//! [`ProcessError`], so the supervisor can log them uniformly without
//! caring which layer produced them.

pub mod errors;

pub use errors::{ProcessError, ProcessResult};
