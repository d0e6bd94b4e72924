//! Conversation widget state machine.
//!
//! The widget owns an append-only transcript and the `sending`/`error`
//! flags. Handlers never perform I/O: [`Conversation::submit`] returns a
//! [`ChatCommand`] describing the call to make, and the caller feeds the
//! outcome back through [`Conversation::resolve`].

use crate::canned::{canned_reply, reply_delay};
use crate::config::ChatMode;
use crate::error::{TransportError, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Identifier attached to every issued call, strictly increasing per widget.
pub type RequestId = u64;

/// First message of every new conversation.
pub const GREETING: &str = "Hi! I'm CaféBot ☕ Ask me anything about coffee, \
brewing methods, and more.";

/// Bot text when the endpoint answered without an answer.
pub const NO_ANSWER_REPLY: &str = "Sorry, I couldn't process your request.";

/// Bot text when the call failed.
pub const APOLOGY_REPLY: &str = "Sorry, I'm having trouble answering right now. \
Please try again later.";

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The person typing.
    User,
    /// CaféBot.
    Bot,
}

/// A single transcript entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Message text.
    pub text: String,
    /// Who wrote it.
    pub sender: Sender,
    /// Whether this is a failure notice.
    #[serde(default)]
    pub is_error: bool,
    /// When the message was appended.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
            is_error: false,
            timestamp: Utc::now(),
        }
    }

    /// Create a bot message.
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Bot,
            is_error: false,
            timestamp: Utc::now(),
        }
    }

    /// Create a bot failure notice.
    pub fn bot_error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::bot(text)
        }
    }
}

/// JSON body sent to the chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// The user's question as typed.
    pub question: String,
    /// Caller identity sent with every question.
    pub user_id: String,
    /// Random UUID, fresh per request.
    pub session_id: String,
}

impl ChatRequest {
    /// Build a request with a fresh session id.
    pub fn new(question: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            user_id: user_id.into(),
            session_id: Uuid::new_v4().to_string(),
        }
    }
}

/// JSON body returned by the chat endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    /// The answer text; older deployments call it `respuesta`.
    #[serde(default, alias = "respuesta")]
    pub answer: Option<String>,
}

impl ChatReply {
    /// A reply carrying an answer.
    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            answer: Some(text.into()),
        }
    }
}

/// Work the caller must perform after a successful submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// POST the request to the chat endpoint.
    Ask {
        /// Id to pass back to [`Conversation::resolve`].
        request_id: RequestId,
        /// Body to send.
        request: ChatRequest,
    },
    /// Wait `delay`, then resolve with `reply`.
    Simulate {
        /// Id to pass back to [`Conversation::resolve`].
        request_id: RequestId,
        /// Canned answer text.
        reply: String,
        /// Simulated thinking time.
        delay: Duration,
    },
}

impl ChatCommand {
    /// The request id this command resolves.
    pub fn request_id(&self) -> RequestId {
        match self {
            Self::Ask { request_id, .. } | Self::Simulate { request_id, .. } => *request_id,
        }
    }
}

/// What happened to a resolved outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The outcome was appended to the transcript.
    Applied,
    /// A newer request had been issued; the outcome was dropped.
    Stale,
}

/// Construction-time settings, usually from [`crate::Config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSettings {
    /// Remote endpoint or canned replies.
    pub mode: ChatMode,
    /// Sent as `userId` on every request.
    pub user_id: String,
    /// Bounds of the random canned reply delay.
    pub canned_delay: (Duration, Duration),
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            mode: ChatMode::Remote,
            user_id: "web_user".into(),
            canned_delay: (Duration::from_millis(1000), Duration::from_millis(2000)),
        }
    }
}

/// The chat widget.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
    sending: bool,
    error: bool,
    next_request: RequestId,
    latest: Option<RequestId>,
    settings: ConversationSettings,
}

impl Conversation {
    /// Create a conversation seeded with the greeting.
    pub fn new(settings: ConversationSettings) -> Self {
        Self {
            messages: vec![Message::bot(GREETING)],
            sending: false,
            error: false,
            next_request: 1,
            latest: None,
            settings,
        }
    }

    /// The transcript, in display order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Whether a reply is outstanding (typing indicator).
    pub fn is_sending(&self) -> bool {
        self.sending
    }

    /// Whether the last exchange failed.
    pub fn has_error(&self) -> bool {
        self.error
    }

    /// Reply mode this widget runs in.
    pub fn mode(&self) -> ChatMode {
        self.settings.mode
    }

    /// Footer status line.
    pub fn status_text(&self) -> &'static str {
        if self.sending {
            "CaféBot is typing..."
        } else if self.error {
            "Connection error"
        } else {
            "Ready to help"
        }
    }

    /// Submit user text.
    ///
    /// Appends the user message and enters `sending` before returning, so
    /// the message is visible before any call resolves. Empty or
    /// whitespace-only text changes nothing.
    pub fn submit(&mut self, text: &str) -> Result<ChatCommand, ValidationError> {
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyInput);
        }

        self.messages.push(Message::user(text));
        self.sending = true;

        let request_id = self.next_request;
        self.next_request += 1;
        self.latest = Some(request_id);

        let command = match self.settings.mode {
            ChatMode::Remote => ChatCommand::Ask {
                request_id,
                request: ChatRequest::new(text, self.settings.user_id.clone()),
            },
            ChatMode::Canned => ChatCommand::Simulate {
                request_id,
                reply: canned_reply(text).to_string(),
                delay: reply_delay(self.settings.canned_delay),
            },
        };
        debug!(request_id, mode = ?self.settings.mode, "chat request issued");
        Ok(command)
    }

    /// Apply the outcome of a call.
    pub fn resolve(
        &mut self,
        request_id: RequestId,
        outcome: Result<ChatReply, TransportError>,
    ) -> Resolution {
        if self.latest != Some(request_id) {
            debug!(request_id, latest = ?self.latest, "dropping stale chat response");
            return Resolution::Stale;
        }
        self.latest = None;
        self.sending = false;

        match outcome {
            Ok(reply) => {
                let text = reply
                    .answer
                    .filter(|answer| !answer.trim().is_empty())
                    .unwrap_or_else(|| NO_ANSWER_REPLY.to_string());
                self.error = false;
                self.messages.push(Message::bot(text));
            }
            Err(err) => {
                warn!(request_id, error = %err, "chat request failed");
                self.error = true;
                self.messages.push(Message::bot_error(APOLOGY_REPLY));
            }
        }
        Resolution::Applied
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(ConversationSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canned::SHIPPING_REPLY;

    fn remote() -> Conversation {
        Conversation::default()
    }

    fn canned() -> Conversation {
        Conversation::new(ConversationSettings {
            mode: ChatMode::Canned,
            canned_delay: (Duration::ZERO, Duration::ZERO),
            ..ConversationSettings::default()
        })
    }

    #[test]
    fn test_starts_with_greeting() {
        let conv = remote();
        assert_eq!(conv.messages().len(), 1);
        assert_eq!(conv.messages()[0].sender, Sender::Bot);
        assert_eq!(conv.status_text(), "Ready to help");
    }

    #[test]
    fn test_submit_appends_user_message_before_resolution() {
        let mut conv = remote();
        for text in ["hi", "  padded  ", "¿qué tal?"] {
            let before = conv.messages().len();
            let command = conv.submit(text).unwrap();

            assert_eq!(conv.messages().len(), before + 1);
            let last = conv.messages().last().unwrap();
            assert_eq!(last.sender, Sender::User);
            assert_eq!(last.text, text);
            assert!(conv.is_sending());
            assert_eq!(conv.status_text(), "CaféBot is typing...");
            assert!(matches!(command, ChatCommand::Ask { .. }));
        }
    }

    #[test]
    fn test_empty_input_is_noop() {
        let mut conv = remote();
        for text in ["", " ", "\t\n  "] {
            assert_eq!(conv.submit(text), Err(ValidationError::EmptyInput));
        }
        assert_eq!(conv.messages().len(), 1);
        assert!(!conv.is_sending());
    }

    #[test]
    fn test_request_body_fields() {
        let mut conv = remote();
        let ChatCommand::Ask { request, .. } = conv.submit("best grind for V60?").unwrap() else {
            panic!("expected Ask");
        };
        assert_eq!(request.question, "best grind for V60?");
        assert_eq!(request.user_id, "web_user");
        assert!(Uuid::parse_str(&request.session_id).is_ok());

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["question"], "best grind for V60?");
        assert_eq!(json["userId"], "web_user");
        assert!(json["sessionId"].is_string());
    }

    #[test]
    fn test_session_id_fresh_per_call() {
        let a = ChatRequest::new("a", "u");
        let b = ChatRequest::new("a", "u");
        assert_ne!(a.session_id, b.session_id);
    }

    #[test]
    fn test_success_appends_answer() {
        let mut conv = remote();
        let command = conv.submit("hello").unwrap();
        let resolution = conv.resolve(command.request_id(), Ok(ChatReply::answer("X")));

        assert_eq!(resolution, Resolution::Applied);
        let last = conv.messages().last().unwrap();
        assert_eq!(last.text, "X");
        assert_eq!(last.sender, Sender::Bot);
        assert!(!last.is_error);
        assert!(!conv.is_sending());
    }

    #[test]
    fn test_missing_answer_uses_fallback() {
        let mut conv = remote();
        let command = conv.submit("hello").unwrap();
        conv.resolve(command.request_id(), Ok(ChatReply::default()));

        let last = conv.messages().last().unwrap();
        assert_eq!(last.text, NO_ANSWER_REPLY);
        assert!(!last.is_error);
    }

    #[test]
    fn test_failure_appends_error_and_sets_flag() {
        let mut conv = remote();
        let command = conv.submit("hello").unwrap();
        conv.resolve(
            command.request_id(),
            Err(TransportError::Network("connection refused".into())),
        );

        let last = conv.messages().last().unwrap();
        assert!(last.is_error);
        assert!(!last.text.is_empty());
        assert!(conv.has_error());
        assert_eq!(conv.status_text(), "Connection error");

        // Error flag persists until the next successful exchange.
        let command = conv.submit("again").unwrap();
        assert!(conv.has_error());
        conv.resolve(command.request_id(), Ok(ChatReply::answer("ok")));
        assert!(!conv.has_error());
    }

    #[test]
    fn test_stale_response_is_dropped() {
        let mut conv = remote();
        let first = conv.submit("first").unwrap();
        let second = conv.submit("second").unwrap();
        assert!(second.request_id() > first.request_id());

        // Second resolves first; the late first response must not land.
        assert_eq!(
            conv.resolve(second.request_id(), Ok(ChatReply::answer("two"))),
            Resolution::Applied
        );
        assert_eq!(
            conv.resolve(first.request_id(), Ok(ChatReply::answer("one"))),
            Resolution::Stale
        );

        let texts: Vec<&str> = conv.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(&texts[1..], ["first", "second", "two"]);
    }

    #[test]
    fn test_sending_stays_on_until_latest_resolves() {
        let mut conv = remote();
        let first = conv.submit("first").unwrap();
        let second = conv.submit("second").unwrap();

        conv.resolve(first.request_id(), Ok(ChatReply::answer("one")));
        assert!(conv.is_sending());

        conv.resolve(second.request_id(), Ok(ChatReply::answer("two")));
        assert!(!conv.is_sending());
    }

    #[test]
    fn test_canned_mode_simulates() {
        let mut conv = canned();
        let command = conv.submit("Do you offer free shipping?").unwrap();
        let ChatCommand::Simulate { reply, delay, .. } = &command else {
            panic!("expected Simulate");
        };
        assert_eq!(reply, SHIPPING_REPLY);
        assert_eq!(*delay, Duration::ZERO);
    }

    #[test]
    fn test_reply_alias() {
        let reply: ChatReply = serde_json::from_str(r#"{"respuesta":"hola"}"#).unwrap();
        assert_eq!(reply.answer.as_deref(), Some("hola"));

        let reply: ChatReply = serde_json::from_str("{}").unwrap();
        assert!(reply.answer.is_none());
    }
}
