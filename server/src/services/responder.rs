//! Responder — computes the next conversation node for a session.
//!
//! DESIGN
//! ======
//! Handlers depend on the `Responder` trait only; the concrete next-node
//! logic is swappable. `MockResponder` is the development fixture: a
//! keyword rule engine over an in-memory session store. The production
//! path is `UpstreamResponder` in `services::upstream`, which forwards to
//! the real workflow engine. The contract both must honor is the shape of
//! `NodeResponse`, not any particular dispatch rule.

use async_trait::async_trait;
use protocol::{
    AudioData, ButtonOption, ButtonsData, ContinueChatRequest, DateData, DropdownData, FileData,
    LabelData, LinkData, LocationData, NodeBody, NodeResponse, NumberData, PhoneData,
    StartChatReply, StartChatRequest, TextData, VideoData,
};

use crate::services::session::{SessionError, SessionStore};

const WELCOME_MESSAGE: &str = "Welcome to the chat! How can I help you today?";
const PLACEHOLDER_MEDIA_URL: &str = "https://via.placeholder.com/150";

// =============================================================================
// ERROR TYPE
// =============================================================================

/// Errors surfaced by either responder implementation.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat session not found for chatSessionId: {0}")]
    SessionNotFound(String),
    #[error("chat token does not match this session")]
    TokenMismatch,
    /// The upstream answered with a flat `{error}` body.
    #[error("{0}")]
    Application(String),
    /// The upstream answered with a non-success HTTP status.
    #[error("proxy error: status {status}")]
    UpstreamStatus { status: u16, body: String },
    /// The upstream request never produced a response.
    #[error("upstream request failed: {0}")]
    UpstreamRequest(String),
    /// The upstream body could not be decoded as a node.
    #[error("upstream response parse failed: {0}")]
    UpstreamParse(String),
    /// The forwarding HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

impl From<SessionError> for ChatError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(id) => Self::SessionNotFound(id),
            SessionError::TokenMismatch => Self::TokenMismatch,
        }
    }
}

// =============================================================================
// TRAIT
// =============================================================================

/// Computes conversation turns. Implemented by the mock rule engine and by
/// the upstream reverse proxy.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Open a session and return the initial node plus its credentials.
    async fn start_chat(
        &self,
        workflow_id: &str,
        req: &StartChatRequest,
    ) -> Result<StartChatReply, ChatError>;

    /// Advance a session by one turn.
    async fn continue_chat(
        &self,
        workflow_id: &str,
        req: &ContinueChatRequest,
    ) -> Result<NodeResponse, ChatError>;
}

// =============================================================================
// MOCK RESPONDER
// =============================================================================

/// Rule-based responder for local development.
pub struct MockResponder {
    sessions: SessionStore,
}

impl MockResponder {
    #[must_use]
    pub fn new(sessions: SessionStore) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl Responder for MockResponder {
    async fn start_chat(
        &self,
        workflow_id: &str,
        req: &StartChatRequest,
    ) -> Result<StartChatReply, ChatError> {
        let initial = NodeResponse::new(
            req.current_node_id.clone(),
            WELCOME_MESSAGE,
            NodeBody::Text(TextData::default()),
        );
        let (chat_session_id, chat_token) = self.sessions.create(workflow_id, initial.clone());
        Ok(StartChatReply { chat_session_id, chat_token, node: initial })
    }

    async fn continue_chat(
        &self,
        _workflow_id: &str,
        req: &ContinueChatRequest,
    ) -> Result<NodeResponse, ChatError> {
        let next = respond_to(&req.user_input);
        self.sessions
            .advance(&req.chat_session_id, &req.chat_token, &req.user_input, next.clone())?;
        Ok(next)
    }
}

// =============================================================================
// RULE ENGINE
// =============================================================================

fn echo_message(user_input: &str) -> String {
    format!("You said: {user_input}. How can I help you further?")
}

fn numbered_options(label: &str) -> Vec<ButtonOption> {
    (1..=5)
        .map(|i| ButtonOption::new(i.to_string(), format!("{label} {i}")))
        .collect()
}

/// Pick the next node for a user input.
///
/// Case-insensitive substring dispatch over a fixed keyword list; the
/// first matching rule wins, so "date number" is a NUMBER turn. Anything
/// unmatched echoes back as a free-text node.
pub(crate) fn respond_to(user_input: &str) -> NodeResponse {
    let lowered = user_input.to_lowercase();
    let has = |keyword: &str| lowered.contains(keyword);

    if has("text") {
        NodeResponse::new(
            "text_node",
            echo_message(user_input),
            NodeBody::Text(TextData { text: user_input.to_owned() }),
        )
    } else if has("number") {
        NodeResponse::new(
            "number_node",
            echo_message(user_input),
            NodeBody::Number(NumberData { number: user_input.to_owned() }),
        )
    } else if has("label") {
        NodeResponse::new(
            "label_node",
            echo_message(user_input),
            NodeBody::Label(LabelData { label: user_input.to_owned() }),
        )
    } else if has("dropdown") {
        NodeResponse::new(
            "dropdown_node",
            "Please select an option:",
            NodeBody::Dropdown(DropdownData { options: numbered_options("Option") }),
        )
    } else if has("date") {
        NodeResponse::new(
            "date_node",
            "Please select a date:",
            NodeBody::Date(DateData {
                date: "2021-01-01".into(),
                time: "12:00:00".into(),
                timezone: "America/New_York".into(),
            }),
        )
    } else if has("phone") {
        NodeResponse::new(
            "phone_node",
            "Please enter your phone number:",
            NodeBody::Phone(PhoneData { country_code: "+1".into(), phone: "1234567890".into() }),
        )
    } else if has("button list") {
        NodeResponse::new(
            "buttons_list",
            "Please select 1 or more options:",
            NodeBody::Buttons(ButtonsData { buttonlist: numbered_options("Button") }),
        )
    } else if has("picture") || has("image") {
        let mut node = NodeResponse::new(
            "image_node",
            "Please select an image:",
            NodeBody::Image(protocol::ImageData::default()),
        );
        node.url = Some(PLACEHOLDER_MEDIA_URL.into());
        node.alt = Some("Image".into());
        node.width = Some(150);
        node.height = Some(150);
        node.caption = Some("Image caption".into());
        node
    } else if has("video") {
        NodeResponse::new(
            "video_node",
            "Please select a video:",
            NodeBody::Video(VideoData {
                video: PLACEHOLDER_MEDIA_URL.into(),
                alt: "Video".into(),
                width: 150,
                height: 150,
                caption: "Video caption".into(),
            }),
        )
    } else if has("audio") {
        NodeResponse::new(
            "audio_node",
            "Please select an audio:",
            NodeBody::Audio(AudioData {
                audio: PLACEHOLDER_MEDIA_URL.into(),
                title: "Audio title".into(),
                artist: "Audio artist".into(),
                album: "Audio album".into(),
                duration: "03:45".into(),
            }),
        )
    } else if has("file") {
        NodeResponse::new(
            "file_node",
            "Please select a file:",
            NodeBody::File(FileData {
                file: PLACEHOLDER_MEDIA_URL.into(),
                title: "File title".into(),
                size: "1234567890".into(),
                content_type: "application/pdf".into(),
            }),
        )
    } else if has("location") {
        NodeResponse::new(
            "location_node",
            "Please select a location:",
            NodeBody::Location(LocationData {
                latitude: 123.456,
                longitude: 78.910,
                name: "Location name".into(),
                address: "Location address".into(),
            }),
        )
    } else if has("link") {
        NodeResponse::new("link_node", "Please select a link:", NodeBody::Link(LinkData::default()))
    } else {
        NodeResponse::new(
            "text_node",
            echo_message(user_input),
            NodeBody::Text(TextData { text: user_input.to_owned() }),
        )
    }
}

#[cfg(test)]
#[path = "responder_test.rs"]
mod tests;
