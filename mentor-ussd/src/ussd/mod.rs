//! USSD protocol layer
//!
//! Everything here is derived from the accumulated transcript; no session
//! state is held between requests.

pub mod catalog;
pub mod codec;
pub mod handler;
pub mod menu;

pub use catalog::ResourceCache;
pub use codec::{Transcript, UssdResponse};
pub use handler::{SessionRequest, UssdHandler};
pub use menu::{AgePolicy, Menu};
