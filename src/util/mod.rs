//! Utility functions and helpers
//!
//! ## Modules
//!
//! - [`retry`] - Retry logic for transient backend failures

pub mod retry;
