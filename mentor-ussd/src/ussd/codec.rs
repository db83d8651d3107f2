//! Session transcript codec and gateway response framing
//!
//! The gateway resends the whole conversation on every request as a single
//! `*`-joined string. Parsing is total: nothing is validated here, every token
//! is handed to the menu state machine exactly as the caller typed it.

use std::fmt;

/// Separator the gateway places between successive user inputs
pub const SEPARATOR: char = '*';

/// Separator between choices inside a single multi-select token
pub const CHOICE_SEPARATOR: char = ',';

/// Ordered, immutable history of user inputs for one session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    tokens: Vec<String>,
}

impl Transcript {
    /// Split the accumulated gateway text into tokens.
    /// An empty string is the start of a session and yields no tokens.
    pub fn parse(text: &str) -> Self {
        if text.is_empty() {
            return Self::default();
        }

        Self {
            tokens: text.split(SEPARATOR).map(str::to_string).collect(),
        }
    }

    /// Number of inputs the caller has submitted so far
    pub fn depth(&self) -> usize {
        self.tokens.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    #[cfg(test)]
    pub fn token(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    /// Transcript the gateway would send after the caller submits `input`
    pub fn extended(&self, input: &str) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.push(input.to_string());
        Self { tokens }
    }

    /// Serialize back into gateway form
    pub fn to_text(&self) -> String {
        self.tokens.join(&SEPARATOR.to_string())
    }
}

/// Split a multi-select token ("1, 3,4") into trimmed choices, keeping order and blanks
pub fn split_choices(token: &str) -> Vec<&str> {
    token.split(CHOICE_SEPARATOR).map(str::trim).collect()
}

/// Response returned to the gateway for a single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UssdResponse {
    /// Session stays open; the gateway prompts the caller again
    Continue(String),
    /// Session ends; no further requests arrive for this session id
    End(String),
}

impl UssdResponse {
    pub fn con(body: impl Into<String>) -> Self {
        UssdResponse::Continue(body.into())
    }

    pub fn end(body: impl Into<String>) -> Self {
        UssdResponse::End(body.into())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UssdResponse::End(_))
    }

    pub fn body(&self) -> &str {
        match self {
            UssdResponse::Continue(body) | UssdResponse::End(body) => body,
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            UssdResponse::Continue(_) => "CON",
            UssdResponse::End(_) => "END",
        }
    }
}

impl fmt::Display for UssdResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.prefix(), self.body())
    }
}
