//! Gateway request handling: decode, respond, hand off side effects

use log::debug;
use std::collections::HashMap;

use super::codec::{Transcript, UssdResponse};
use super::menu::{Menu, MenuAction};
use crate::services::dispatch::{DispatchHandle, Dispatcher};

/// One gateway callback, as posted by the USSD aggregator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionRequest {
    pub session_id: String,
    pub service_code: String,
    pub phone_number: String,
    pub text: String,
}

impl SessionRequest {
    /// Build from decoded form fields; absent fields are empty
    pub fn from_form(fields: &HashMap<String, String>) -> Self {
        let field = |name: &str| fields.get(name).cloned().unwrap_or_default();
        Self {
            session_id: field("sessionId"),
            service_code: field("serviceCode"),
            phone_number: field("phoneNumber"),
            text: field("text"),
        }
    }
}

#[derive(Clone)]
pub struct UssdHandler {
    menu: Menu,
    dispatcher: Option<Dispatcher>,
}

impl UssdHandler {
    pub fn new(menu: Menu, dispatcher: Dispatcher) -> Self {
        Self {
            menu,
            dispatcher: Some(dispatcher),
        }
    }

    /// Menu only; side effects are logged and dropped
    pub fn offline(menu: Menu) -> Self {
        Self {
            menu,
            dispatcher: None,
        }
    }

    /// Render the reply without waiting on any side effect.
    /// Spawned effects are watched from a separate task so panics are logged.
    pub fn handle(&self, request: &SessionRequest) -> UssdResponse {
        let (response, effects) = self.handle_detached(request);
        if !effects.is_empty() {
            tokio::spawn(effects.join());
        }
        response
    }

    /// Same as `handle`, also returning the spawned side-effect tasks
    pub fn handle_detached(&self, request: &SessionRequest) -> (UssdResponse, DispatchHandle) {
        let transcript = Transcript::parse(&request.text);
        debug!(
            "USSD session {} from {:?}: depth {}",
            request.session_id,
            request.phone_number,
            transcript.depth()
        );

        let outcome = self.menu.respond(&transcript);
        let handle = match (&self.dispatcher, outcome.action) {
            (_, MenuAction::None) => DispatchHandle::default(),
            (Some(dispatcher), MenuAction::Register(draft)) => {
                dispatcher.dispatch_registration(&request.phone_number, draft)
            }
            (Some(dispatcher), MenuAction::SetLanguage(language)) => {
                dispatcher.dispatch_language(&request.phone_number, language)
            }
            (None, action) => {
                debug!("Offline mode, dropping {:?}", action);
                DispatchHandle::default()
            }
        };

        (outcome.response, handle)
    }
}
