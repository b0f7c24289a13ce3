//! Conversation — the client-side node state machine.
//!
//! ARCHITECTURE
//! ============
//! A single mutable current-node register with no history stack: every
//! transition is responder-driven, and whatever node comes back replaces
//! the register wholesale. The driver owns the append-only message log and
//! the transient per-turn input buffers; the host renders them and calls
//! the mutators.
//!
//! TRADE-OFFS
//! ==========
//! A turn in flight blocks further sends instead of letting late replies
//! race each other into the register. The host decides whether to disable
//! its send control or surface the `Busy` rejection.

use std::sync::Arc;

use protocol::{ChatMessage, ContinueChatRequest, NodeResponse, StartChatRequest};

use crate::input::{InputError, MediaBehavior, TurnInput, compute_user_input};
use crate::transport::{ChatTransport, TransportError};

const START_ERROR_NOTICE: &str = "Error starting workflow. Please try again.";
const TURN_ERROR_NOTICE: &str = "Error processing workflow. Please try again.";

// =============================================================================
// IDENTITY AND CREDENTIALS
// =============================================================================

/// Host-supplied identity, fixed for the widget's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub workflow_id: String,
    pub session_id: String,
    pub current_node_id: String,
    pub token: String,
}

/// Responder-assigned credentials, set exactly once by a successful start
/// and echoed on every turn thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCredentials {
    pub chat_session_id: String,
    pub chat_token: String,
}

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConversationError {
    #[error("chat already started")]
    AlreadyStarted,
    #[error("chat not started")]
    NotStarted,
    #[error("a turn is already in flight")]
    Busy,
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

// =============================================================================
// OBSERVERS
// =============================================================================

type InputObserver = Box<dyn Fn(&str) + Send>;
type LoadingObserver = Box<dyn Fn(bool) + Send>;
type MessagesObserver = Box<dyn Fn(&[ChatMessage]) + Send>;

/// Host introspection hooks, invoked synchronously on every change of the
/// watched state. Never used for control flow.
#[derive(Default)]
struct Observers {
    input: Option<InputObserver>,
    loading: Option<LoadingObserver>,
    messages: Option<MessagesObserver>,
}

// =============================================================================
// CONVERSATION
// =============================================================================

pub struct Conversation {
    transport: Arc<dyn ChatTransport>,
    identity: SessionIdentity,
    credentials: Option<ChatCredentials>,
    current_node: Option<NodeResponse>,
    messages: Vec<ChatMessage>,
    input: TurnInput,
    error: Option<String>,
    in_flight: bool,
    media_behavior: MediaBehavior,
    observers: Observers,
}

impl Conversation {
    #[must_use]
    pub fn new(transport: Arc<dyn ChatTransport>, identity: SessionIdentity) -> Self {
        Self {
            transport,
            identity,
            credentials: None,
            current_node: None,
            messages: Vec::new(),
            input: TurnInput::default(),
            error: None,
            in_flight: false,
            media_behavior: MediaBehavior::default(),
            observers: Observers::default(),
        }
    }

    /// Configure how passive media nodes are advanced past.
    #[must_use]
    pub fn with_media_behavior(mut self, behavior: MediaBehavior) -> Self {
        self.media_behavior = behavior;
        self
    }

    // -------------------------------------------------------------------------
    // observers
    // -------------------------------------------------------------------------

    pub fn observe_user_input(&mut self, observer: impl Fn(&str) + Send + 'static) {
        self.observers.input = Some(Box::new(observer));
    }

    pub fn observe_loading(&mut self, observer: impl Fn(bool) + Send + 'static) {
        self.observers.loading = Some(Box::new(observer));
    }

    pub fn observe_messages(&mut self, observer: impl Fn(&[ChatMessage]) + Send + 'static) {
        self.observers.messages = Some(Box::new(observer));
    }

    fn notify_input(&self) {
        if let Some(observer) = &self.observers.input {
            observer(&self.input.text);
        }
    }

    fn notify_messages(&self) {
        if let Some(observer) = &self.observers.messages {
            observer(&self.messages);
        }
    }

    fn set_loading(&mut self, loading: bool) {
        self.in_flight = loading;
        if let Some(observer) = &self.observers.loading {
            observer(loading);
        }
    }

    // -------------------------------------------------------------------------
    // accessors
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn current_node(&self) -> Option<&NodeResponse> {
        self.current_node.as_ref()
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn credentials(&self) -> Option<&ChatCredentials> {
        self.credentials.as_ref()
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.credentials.is_some()
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// The visible validation/turn error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn input(&self) -> &TurnInput {
        &self.input
    }

    // -------------------------------------------------------------------------
    // input mutators
    // -------------------------------------------------------------------------

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.input.text = text.into();
        self.notify_input();
    }

    pub fn set_date(&mut self, date: time::Date) {
        self.input.date = Some(date);
    }

    pub fn set_phone_country(&mut self, country: impl Into<String>) {
        self.input.phone_country = country.into();
    }

    pub fn set_phone_digits(&mut self, digits: impl Into<String>) {
        self.input.phone_digits = digits.into();
    }

    /// Pick a dropdown option by id from the current node. Returns whether
    /// the id was found.
    pub fn choose_option(&mut self, id: &str) -> bool {
        let Some(node) = &self.current_node else {
            return false;
        };
        let protocol::NodeBody::Dropdown(data) = &node.body else {
            return false;
        };
        let Some(option) = data.options.iter().find(|o| o.id == id).cloned() else {
            return false;
        };
        self.input.choice = Some(option);
        true
    }

    /// Toggle a button-grid option by id on the current node. Returns the
    /// option's selected state after the call, or `None` if the id is not
    /// part of the current node.
    pub fn toggle_button(&mut self, id: &str) -> Option<bool> {
        let Some(node) = &self.current_node else {
            return None;
        };
        let protocol::NodeBody::Buttons(data) = &node.body else {
            return None;
        };
        let option = data.buttonlist.iter().find(|o| o.id == id).cloned()?;
        Some(self.input.toggle_selection(&option))
    }

    // -------------------------------------------------------------------------
    // protocol operations
    // -------------------------------------------------------------------------

    /// Open the session. One-shot: a second call is rejected without any
    /// network traffic.
    ///
    /// # Errors
    ///
    /// [`ConversationError::AlreadyStarted`] after a successful start,
    /// [`ConversationError::Busy`] while a call is outstanding, and
    /// [`ConversationError::Transport`] on failure — in which case a
    /// system-authored error message is appended and the driver stays in
    /// the not-started state so the host may retry.
    pub async fn start(&mut self) -> Result<(), ConversationError> {
        if self.credentials.is_some() {
            return Err(ConversationError::AlreadyStarted);
        }
        if self.in_flight {
            return Err(ConversationError::Busy);
        }

        let req = StartChatRequest {
            workflow_id: self.identity.workflow_id.clone(),
            session_id: self.identity.session_id.clone(),
            current_node_id: self.identity.current_node_id.clone(),
            token: self.identity.token.clone(),
        };

        self.set_loading(true);
        let result = self.transport.clone().start_chat(&req).await;
        self.set_loading(false);

        match result {
            Ok(reply) => {
                self.credentials = Some(ChatCredentials {
                    chat_session_id: reply.chat_session_id,
                    chat_token: reply.chat_token,
                });
                self.push_message(ChatMessage::system(reply.node.message.clone()));
                self.current_node = Some(reply.node);
                Ok(())
            }
            Err(err) => {
                self.push_message(ChatMessage::system(failure_notice(&err, START_ERROR_NOTICE)));
                Err(err.into())
            }
        }
    }

    /// Send the current turn: validate the buffers against the active node
    /// type, append the user message, and exchange it for the next node.
    ///
    /// # Errors
    ///
    /// [`ConversationError::Input`] when validation fails (the visible
    /// error is set, nothing is appended, no network call is made);
    /// [`ConversationError::Busy`]/[`NotStarted`](ConversationError::NotStarted)
    /// for state violations; [`ConversationError::Transport`] when the
    /// exchange fails — the current node and buffers stay untouched and a
    /// system-authored error message is appended.
    pub async fn send(&mut self) -> Result<(), ConversationError> {
        if self.in_flight {
            return Err(ConversationError::Busy);
        }
        let Some(credentials) = self.credentials.clone() else {
            return Err(ConversationError::NotStarted);
        };
        let Some(node) = &self.current_node else {
            return Err(ConversationError::NotStarted);
        };

        let user_input = match compute_user_input(&node.body, &self.input, &self.media_behavior) {
            Ok(value) => value,
            Err(err) => {
                self.error = Some(err.to_string());
                return Err(err.into());
            }
        };
        self.error = None;

        self.push_message(ChatMessage::user(user_input.clone()));

        let req = ContinueChatRequest {
            workflow_id: self.identity.workflow_id.clone(),
            session_id: self.identity.session_id.clone(),
            current_node_id: self.identity.current_node_id.clone(),
            token: self.identity.token.clone(),
            chat_session_id: credentials.chat_session_id,
            chat_token: credentials.chat_token,
            user_input,
        };

        self.set_loading(true);
        let result = self.transport.clone().continue_chat(&req).await;
        self.set_loading(false);

        match result {
            Ok(next) => {
                self.push_message(ChatMessage::system(next.message.clone()));
                self.current_node = Some(next);
                self.input.clear();
                self.notify_input();
                Ok(())
            }
            Err(err) => {
                self.push_message(ChatMessage::system(failure_notice(&err, TURN_ERROR_NOTICE)));
                Err(err.into())
            }
        }
    }

    fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.notify_messages();
    }
}

/// Responder-authored `{error}` text is surfaced verbatim with an `Error:`
/// prefix; transport-level failures get the generic retry notice.
fn failure_notice(err: &TransportError, generic: &str) -> String {
    match err.application_message() {
        Some(message) => format!("Error: {message}"),
        None => generic.to_owned(),
    }
}

#[cfg(test)]
#[path = "conversation_test.rs"]
mod tests;
