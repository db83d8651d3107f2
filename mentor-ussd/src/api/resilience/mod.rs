//! Outbound call hardening
//!
//! Timeout configuration and concurrency limiting for the detached calls the
//! dispatcher makes to the profile API and the SMS gateway.

pub mod concurrency;
pub mod config;

pub use concurrency::ConcurrencyLimiter;
pub use config::{HttpConfig, ResilienceConfig};
