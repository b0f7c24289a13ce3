//! Shared wire types for the workflow chat protocol.
//!
//! This crate owns the JSON representation exchanged between the `driver`
//! and the `server` (or any upstream workflow engine speaking the same
//! contract). The central type is [`NodeResponse`]: one step of the guided
//! conversation, whose `type` tag selects a typed payload decoded from the
//! `data` map. Legacy tag spellings from older widget builds are accepted
//! on input and normalized on output.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

// =============================================================================
// TIME
// =============================================================================

/// Current time as milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

// =============================================================================
// MESSAGES
// =============================================================================

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    /// Responder-authored (welcome text, node prompts, error notices).
    System,
    /// The end user's computed turn input.
    User,
}

/// One entry in the append-only conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message author; serialized as `type` for wire compatibility.
    #[serde(rename = "type")]
    pub author: Author,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl ChatMessage {
    /// A system-authored message stamped with the current time.
    pub fn system(content: impl Into<String>) -> Self {
        Self { author: Author::System, content: content.into(), timestamp: now_ms() }
    }

    /// A user-authored message stamped with the current time.
    pub fn user(content: impl Into<String>) -> Self {
        Self { author: Author::User, content: content.into(), timestamp: now_ms() }
    }
}

// =============================================================================
// OPTIONS
// =============================================================================

/// One selectable option in a dropdown or button-grid node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonOption {
    /// Unique within the owning list.
    pub id: String,
    pub label: String,
    /// Driver-local toggle state; responders always send `false`.
    pub selected: bool,
    pub variant: String,
}

impl Default for ButtonOption {
    fn default() -> Self {
        Self { id: String::new(), label: String::new(), selected: false, variant: "default".into() }
    }
}

impl ButtonOption {
    /// A plain option with the `default` variant.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self { id: id.into(), label: label.into(), ..Self::default() }
    }
}

// =============================================================================
// NODE PAYLOADS
// =============================================================================

/// Payload of a free-text node. Responders echo the user's input here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextData {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
}

/// Payload of a numeric-input node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumberData {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub number: String,
}

/// Payload of a read-only label node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelData {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub label: String,
}

/// Payload of an email-input node. No fields observed on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailData {}

/// Payload of a phone-input node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PhoneData {
    pub country_code: String,
    pub phone: String,
}

/// Payload of a date-picker node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateData {
    pub date: String,
    pub time: String,
    pub timezone: String,
}

/// Payload of a single-select dropdown node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropdownData {
    /// `menu` is the key older responders used for the same list.
    #[serde(alias = "menu")]
    pub options: Vec<ButtonOption>,
}

/// Payload of a multi-select button-grid node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonsData {
    pub buttonlist: Vec<ButtonOption>,
}

/// Payload of an image node. The media attributes ride at the top level of
/// the [`NodeResponse`], not inside `data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageData {}

/// Payload of a video node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoData {
    pub video: String,
    pub alt: String,
    pub width: u32,
    pub height: u32,
    pub caption: String,
}

/// Payload of an audio node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioData {
    pub audio: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration: String,
}

/// Payload of a file node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileData {
    pub file: String,
    pub title: String,
    pub size: String,
    /// MIME type; serialized as `type` on the wire.
    #[serde(rename = "type")]
    pub content_type: String,
}

/// Payload of a location node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationData {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    pub address: String,
}

/// Payload of a link node. No fields observed on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkData {}

// =============================================================================
// NODE BODY
// =============================================================================

/// Typed `type` + `data` pair of a [`NodeResponse`].
///
/// Serialization emits the canonical tag and the payload under `data`.
/// Deserialization accepts legacy tag aliases, and maps tags this build
/// does not know to [`NodeBody::Other`] so a newer responder never breaks
/// an older driver (which falls back to free-text input).
#[derive(Debug, Clone, PartialEq)]
pub enum NodeBody {
    Text(TextData),
    Number(NumberData),
    Label(LabelData),
    Email(EmailData),
    Phone(PhoneData),
    Date(DateData),
    Dropdown(DropdownData),
    Buttons(ButtonsData),
    Image(ImageData),
    Video(VideoData),
    Audio(AudioData),
    File(FileData),
    Location(LocationData),
    Link(LinkData),
    /// Unrecognized node type, kept verbatim.
    Other { tag: String, data: Value },
}

impl NodeBody {
    /// The canonical wire tag for this body.
    #[must_use]
    pub fn wire_tag(&self) -> &str {
        match self {
            Self::Text(_) => "TEXT_MESSAGE",
            Self::Number(_) => "NUMBER",
            Self::Label(_) => "LABEL",
            Self::Email(_) => "EMAIL",
            Self::Phone(_) => "PHONE_OPTION",
            Self::Date(_) => "DATE_OPTION",
            Self::Dropdown(_) => "DROPDOWN",
            Self::Buttons(_) => "BUTTONS_LIST",
            Self::Image(_) => "IMAGE",
            Self::Video(_) => "VIDEO",
            Self::Audio(_) => "AUDIO",
            Self::File(_) => "FILE",
            Self::Location(_) => "LOCATION",
            Self::Link(_) => "LINK",
            Self::Other { tag, .. } => tag,
        }
    }

    /// Passive media nodes render content but collect no input of their own.
    #[must_use]
    pub fn is_media(&self) -> bool {
        matches!(self, Self::Image(_) | Self::Video(_) | Self::Audio(_) | Self::File(_))
    }

    fn data_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Text(d) => serde_json::to_value(d),
            Self::Number(d) => serde_json::to_value(d),
            Self::Label(d) => serde_json::to_value(d),
            Self::Email(d) => serde_json::to_value(d),
            Self::Phone(d) => serde_json::to_value(d),
            Self::Date(d) => serde_json::to_value(d),
            Self::Dropdown(d) => serde_json::to_value(d),
            Self::Buttons(d) => serde_json::to_value(d),
            Self::Image(d) => serde_json::to_value(d),
            Self::Video(d) => serde_json::to_value(d),
            Self::Audio(d) => serde_json::to_value(d),
            Self::File(d) => serde_json::to_value(d),
            Self::Location(d) => serde_json::to_value(d),
            Self::Link(d) => serde_json::to_value(d),
            Self::Other { data, .. } => Ok(data.clone()),
        }
    }

    fn from_raw(tag: String, data: Value) -> Result<Self, serde_json::Error> {
        // Older responders omit `data` entirely on payload-free nodes.
        let data = if data.is_null() { Value::Object(serde_json::Map::new()) } else { data };
        let body = match tag.as_str() {
            "TEXT_MESSAGE" | "MENU_INPUT_OPTION" | "MENU_TEXT_OPTION" => {
                Self::Text(serde_json::from_value(data)?)
            }
            "NUMBER" | "MENU_NUMBER_OPTION" => Self::Number(serde_json::from_value(data)?),
            "LABEL" => Self::Label(serde_json::from_value(data)?),
            "EMAIL" | "MENU_EMAIL_OPTION" => Self::Email(serde_json::from_value(data)?),
            "PHONE_OPTION" | "MENU_PHONE_OPTION" => Self::Phone(serde_json::from_value(data)?),
            "DATE_OPTION" | "MENU_DATE_OPTION" => Self::Date(serde_json::from_value(data)?),
            "DROPDOWN" => Self::Dropdown(serde_json::from_value(data)?),
            "BUTTONS_LIST" | "BUTTONS_NODE" | "BUTTON_LIST" => {
                Self::Buttons(serde_json::from_value(data)?)
            }
            "IMAGE" => Self::Image(serde_json::from_value(data)?),
            "VIDEO" => Self::Video(serde_json::from_value(data)?),
            "AUDIO" => Self::Audio(serde_json::from_value(data)?),
            "FILE" => Self::File(serde_json::from_value(data)?),
            "LOCATION" => Self::Location(serde_json::from_value(data)?),
            "LINK" => Self::Link(serde_json::from_value(data)?),
            _ => Self::Other { tag, data },
        };
        Ok(body)
    }
}

impl Serialize for NodeBody {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let data = self.data_value().map_err(serde::ser::Error::custom)?;
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", self.wire_tag())?;
        map.serialize_entry("data", &data)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for NodeBody {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawBody {
            #[serde(rename = "type")]
            tag: String,
            #[serde(default)]
            data: Value,
        }

        let raw = RawBody::deserialize(deserializer)?;
        Self::from_raw(raw.tag, raw.data).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// NODE RESPONSE
// =============================================================================

/// One step of the guided conversation: the unit exchanged each turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeResponse {
    pub node_id: String,
    /// Prompt shown to the user as a system message.
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<bool>,
    // Media attributes live at the top level; only image nodes set them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(flatten)]
    pub body: NodeBody,
}

impl NodeResponse {
    /// A node with no validation hint and no media attributes.
    pub fn new(node_id: impl Into<String>, message: impl Into<String>, body: NodeBody) -> Self {
        Self {
            node_id: node_id.into(),
            message: message.into(),
            validation: None,
            url: None,
            alt: None,
            width: None,
            height: None,
            caption: None,
            body,
        }
    }
}

// =============================================================================
// REQUESTS AND REPLIES
// =============================================================================

/// Body of `POST /api/v1/start-chat/{workflow_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartChatRequest {
    pub workflow_id: String,
    pub session_id: String,
    pub current_node_id: String,
    pub token: String,
}

/// Body of `POST /api/v1/continue-chat/{workflow_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueChatRequest {
    pub workflow_id: String,
    pub session_id: String,
    pub current_node_id: String,
    pub token: String,
    pub chat_session_id: String,
    pub chat_token: String,
    pub user_input: String,
}

/// Successful `start-chat` reply: the initial node flattened together with
/// the per-session credentials the driver must echo on every later turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartChatReply {
    pub chat_session_id: String,
    pub chat_token: String,
    #[serde(flatten)]
    pub node: NodeResponse,
}

/// Flat application-level error body, returned with any status code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
