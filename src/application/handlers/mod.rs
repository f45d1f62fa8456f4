//! Command handlers.

pub mod billing;
