//! FitBook - booking and payment reconciliation engine.
//!
//! Reconciles the platform's local booking records (appointments and
//! subscriptions) with the asynchronous, at-least-once event stream of an
//! external payment gateway, without double-charging, losing confirmations,
//! or letting a client act on money that was never received.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
