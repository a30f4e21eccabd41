//! UI-agnostic view state
//!
//! The client shows exactly one of two views. Everything a front end needs
//! to decide what to draw is a function of the current [`View`].

use serde::{Deserialize, Serialize};

pub const HOME_WELCOME: &str = "Welcome! Are you new here? Awesome, you can...";
pub const CHAT_WELCOME: &str = "You are connected";
pub const LOGIN_MESSAGE: &str = "Log in below, or register a new account.";
pub const BAD_CREDENTIALS: &str = "Bad password or username, please try again";
pub const REGISTERED: &str = "You have been successfully registered, you can log in.";
pub const NOT_CONNECTED: &str = "Not connected";
pub const CONNECTION_CLOSED: &str = "The connection was closed by the server.";

/// Which of the two mutually exclusive views is current
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum View {
    #[default]
    Home,
    Chat,
}

impl View {
    pub fn welcome(&self) -> &'static str {
        match self {
            View::Home => HOME_WELCOME,
            View::Chat => CHAT_WELCOME,
        }
    }

    /// Login message, login form and register form
    pub fn shows_auth_forms(&self) -> bool {
        matches!(self, View::Home)
    }

    /// Message list and chat input
    pub fn shows_chat(&self) -> bool {
        matches!(self, View::Chat)
    }

    /// Disconnect control
    pub fn shows_exit(&self) -> bool {
        matches!(self, View::Chat)
    }
}

/// Append-only list of received messages, in receipt order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatLog {
    entries: Vec<String>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: impl Into<String>) {
        self.entries.push(text.into());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_views_are_mutually_exclusive() {
        for view in [View::Home, View::Chat] {
            assert_ne!(view.shows_auth_forms(), view.shows_chat());
            assert_eq!(view.shows_chat(), view.shows_exit());
        }
        assert_eq!(View::default(), View::Home);
        assert_eq!(View::Chat.welcome(), "You are connected");
    }

    #[test]
    fn test_chat_log_keeps_receipt_order() {
        let mut log = ChatLog::new();
        log.push("first");
        log.push("hi there");
        log.push("hi there");

        assert_eq!(log.len(), 3);
        assert_eq!(log.entries(), &["first", "hi there", "hi there"]);
        assert_eq!(log.last(), Some("hi there"));
    }
}
