//! Adapters - concrete implementations of the ports.

pub mod gateway;
pub mod http;
pub mod memory;
pub mod postgres;
