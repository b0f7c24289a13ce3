use super::*;
use serde_json::json;

// =============================================================================
// now_ms
// =============================================================================

#[test]
fn now_ms_is_past_2020() {
    // 2020-01-01T00:00:00Z in ms.
    assert!(now_ms() > 1_577_836_800_000);
}

// =============================================================================
// ChatMessage
// =============================================================================

#[test]
fn chat_message_system_serializes_type_field() {
    let msg = ChatMessage::system("hello");
    let value = serde_json::to_value(&msg).unwrap();
    assert_eq!(value["type"], "system");
    assert_eq!(value["content"], "hello");
    assert!(value["timestamp"].is_i64());
}

#[test]
fn chat_message_user_round_trip() {
    let msg = ChatMessage::user("42");
    let json = serde_json::to_string(&msg).unwrap();
    let restored: ChatMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, msg);
    assert_eq!(restored.author, Author::User);
}

// =============================================================================
// ButtonOption
// =============================================================================

#[test]
fn button_option_new_uses_default_variant() {
    let opt = ButtonOption::new("1", "Option 1");
    assert_eq!(opt.variant, "default");
    assert!(!opt.selected);
}

#[test]
fn button_option_deserializes_with_missing_fields() {
    let opt: ButtonOption = serde_json::from_value(json!({ "id": "2", "label": "Two" })).unwrap();
    assert_eq!(opt.id, "2");
    assert!(!opt.selected);
    assert_eq!(opt.variant, "default");
}

// =============================================================================
// NodeBody tags
// =============================================================================

#[test]
fn text_body_serializes_canonical_tag_and_data() {
    let node = NodeResponse::new("text_node", "hi", NodeBody::Text(TextData { text: "yo".into() }));
    let value = serde_json::to_value(&node).unwrap();
    assert_eq!(value["type"], "TEXT_MESSAGE");
    assert_eq!(value["data"]["text"], "yo");
    assert_eq!(value["nodeId"], "text_node");
}

#[test]
fn empty_text_serializes_empty_data_map() {
    let node = NodeResponse::new("n", "welcome", NodeBody::Text(TextData::default()));
    let value = serde_json::to_value(&node).unwrap();
    assert_eq!(value["data"], json!({}));
}

#[test]
fn date_tag_deserializes() {
    let node: NodeResponse = serde_json::from_value(json!({
        "type": "DATE_OPTION",
        "nodeId": "date_node",
        "data": { "date": "2021-01-01", "time": "12:00:00", "timezone": "America/New_York" },
        "message": "Please select a date:"
    }))
    .unwrap();
    let NodeBody::Date(data) = &node.body else {
        panic!("expected date body, got {:?}", node.body);
    };
    assert_eq!(data.date, "2021-01-01");
    assert_eq!(data.timezone, "America/New_York");
}

#[test]
fn legacy_menu_date_alias_deserializes() {
    let node: NodeResponse = serde_json::from_value(json!({
        "type": "MENU_DATE_OPTION",
        "nodeId": "n",
        "data": {},
        "message": "pick"
    }))
    .unwrap();
    assert!(matches!(node.body, NodeBody::Date(_)));
    // Canonical tag on re-serialization.
    let value = serde_json::to_value(&node).unwrap();
    assert_eq!(value["type"], "DATE_OPTION");
}

#[test]
fn legacy_buttons_node_alias_deserializes() {
    let node: NodeResponse = serde_json::from_value(json!({
        "type": "BUTTONS_NODE",
        "nodeId": "n",
        "data": { "buttonlist": [{ "id": "1", "label": "One", "selected": false, "variant": "default" }] },
        "message": "pick"
    }))
    .unwrap();
    let NodeBody::Buttons(data) = &node.body else {
        panic!("expected buttons body");
    };
    assert_eq!(data.buttonlist.len(), 1);
    assert_eq!(data.buttonlist[0].label, "One");
}

#[test]
fn dropdown_accepts_legacy_menu_key() {
    let node: NodeResponse = serde_json::from_value(json!({
        "type": "DROPDOWN",
        "nodeId": "n",
        "data": { "menu": [{ "id": "1", "label": "Option 1" }] },
        "message": "choose"
    }))
    .unwrap();
    let NodeBody::Dropdown(data) = &node.body else {
        panic!("expected dropdown body");
    };
    assert_eq!(data.options.len(), 1);
}

#[test]
fn unknown_tag_falls_back_to_other() {
    let node: NodeResponse = serde_json::from_value(json!({
        "type": "CAROUSEL",
        "nodeId": "n",
        "data": { "cards": [1, 2, 3] },
        "message": "scroll"
    }))
    .unwrap();
    let NodeBody::Other { tag, data } = &node.body else {
        panic!("expected other body");
    };
    assert_eq!(tag, "CAROUSEL");
    assert_eq!(data["cards"], json!([1, 2, 3]));
    assert_eq!(node.body.wire_tag(), "CAROUSEL");
}

#[test]
fn missing_data_key_defaults_payload() {
    let node: NodeResponse = serde_json::from_value(json!({
        "type": "EMAIL",
        "nodeId": "n",
        "message": "email please"
    }))
    .unwrap();
    assert!(matches!(node.body, NodeBody::Email(_)));
}

#[test]
fn media_predicate_covers_passive_nodes() {
    assert!(NodeBody::Image(ImageData::default()).is_media());
    assert!(NodeBody::Video(VideoData::default()).is_media());
    assert!(NodeBody::Audio(AudioData::default()).is_media());
    assert!(NodeBody::File(FileData::default()).is_media());
    assert!(!NodeBody::Text(TextData::default()).is_media());
    assert!(!NodeBody::Buttons(ButtonsData::default()).is_media());
}

// =============================================================================
// NodeResponse media attributes
// =============================================================================

#[test]
fn image_node_parses_top_level_media_fields() {
    let node: NodeResponse = serde_json::from_value(json!({
        "type": "IMAGE",
        "nodeId": "image_node",
        "url": "https://via.placeholder.com/150",
        "alt": "Image",
        "width": 150,
        "height": 150,
        "caption": "Image caption",
        "data": {},
        "message": "Please select an image:"
    }))
    .unwrap();
    assert!(matches!(node.body, NodeBody::Image(_)));
    assert_eq!(node.url.as_deref(), Some("https://via.placeholder.com/150"));
    assert_eq!(node.width, Some(150));
    assert_eq!(node.caption.as_deref(), Some("Image caption"));
}

#[test]
fn media_fields_absent_are_not_serialized() {
    let node = NodeResponse::new("n", "hi", NodeBody::Link(LinkData::default()));
    let value = serde_json::to_value(&node).unwrap();
    assert!(value.get("url").is_none());
    assert!(value.get("validation").is_none());
}

#[test]
fn node_response_round_trip() {
    let node = NodeResponse::new(
        "phone_node",
        "Please enter your phone number:",
        NodeBody::Phone(PhoneData { country_code: "+1".into(), phone: "1234567890".into() }),
    );
    let json = serde_json::to_string(&node).unwrap();
    let restored: NodeResponse = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, node);
}

#[test]
fn phone_data_uses_camel_case_country_code() {
    let node = NodeResponse::new(
        "n",
        "m",
        NodeBody::Phone(PhoneData { country_code: "+44".into(), phone: String::new() }),
    );
    let value = serde_json::to_value(&node).unwrap();
    assert_eq!(value["data"]["countryCode"], "+44");
}

#[test]
fn file_data_content_type_serializes_as_type() {
    let data = FileData {
        file: "https://example.com/f.pdf".into(),
        title: "File title".into(),
        size: "1234567890".into(),
        content_type: "application/pdf".into(),
    };
    let value = serde_json::to_value(&data).unwrap();
    assert_eq!(value["type"], "application/pdf");
}

// =============================================================================
// Requests and replies
// =============================================================================

#[test]
fn start_chat_request_uses_camel_case() {
    let req = StartChatRequest {
        workflow_id: "wf".into(),
        session_id: "s".into(),
        current_node_id: "n0".into(),
        token: "t".into(),
    };
    let value = serde_json::to_value(&req).unwrap();
    assert_eq!(value["workflowId"], "wf");
    assert_eq!(value["currentNodeId"], "n0");
}

#[test]
fn start_chat_reply_flattens_node_fields() {
    let reply: StartChatReply = serde_json::from_value(json!({
        "chatSessionId": "abc",
        "chatToken": "def",
        "type": "TEXT_MESSAGE",
        "nodeId": "n0",
        "data": {},
        "message": "Welcome to the chat! How can I help you today?"
    }))
    .unwrap();
    assert_eq!(reply.chat_session_id, "abc");
    assert_eq!(reply.chat_token, "def");
    assert!(matches!(reply.node.body, NodeBody::Text(_)));
    assert_eq!(reply.node.message, "Welcome to the chat! How can I help you today?");

    let value = serde_json::to_value(&reply).unwrap();
    assert_eq!(value["chatSessionId"], "abc");
    assert_eq!(value["type"], "TEXT_MESSAGE");
}

#[test]
fn continue_chat_request_round_trip() {
    let req = ContinueChatRequest {
        workflow_id: "wf".into(),
        session_id: "s".into(),
        current_node_id: "n0".into(),
        token: "t".into(),
        chat_session_id: "cs".into(),
        chat_token: "ct".into(),
        user_input: "date please".into(),
    };
    let json = serde_json::to_string(&req).unwrap();
    let restored: ContinueChatRequest = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, req);
    assert!(json.contains("\"userInput\""));
}

#[test]
fn error_reply_parses() {
    let reply: ErrorReply = serde_json::from_str(r#"{"error":"Chat session not found"}"#).unwrap();
    assert_eq!(reply.error, "Chat session not found");
}
