//! Outbound HTTP collaborators
//!
//! The profile persistence API and the SMS gateway are both reached only from
//! detached dispatcher tasks, never from the USSD response path.

pub mod profile;
pub mod resilience;
pub mod sms;

pub use profile::{MenteeSetup, ProfileApiClient, ProfileSink};
pub use resilience::{ConcurrencyLimiter, ResilienceConfig};
pub use sms::{LogOnlySink, NotificationSink, SmsClient, normalize_phone};
