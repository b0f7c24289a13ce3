use super::*;
use protocol::{
    ButtonOption, ButtonsData, DateData, DropdownData, NodeBody, NumberData, StartChatReply,
    TextData,
};
use std::sync::Mutex;
use time::{Date, Month};

// =============================================================================
// MockTransport
// =============================================================================

#[derive(Default)]
struct MockTransport {
    start_replies: Mutex<Vec<Result<StartChatReply, TransportError>>>,
    continue_replies: Mutex<Vec<Result<NodeResponse, TransportError>>>,
    continue_requests: Mutex<Vec<ContinueChatRequest>>,
    start_calls: Mutex<usize>,
}

impl MockTransport {
    fn scripted(
        start: Vec<Result<StartChatReply, TransportError>>,
        turns: Vec<Result<NodeResponse, TransportError>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            start_replies: Mutex::new(start),
            continue_replies: Mutex::new(turns),
            ..Self::default()
        })
    }

    fn continue_requests(&self) -> Vec<ContinueChatRequest> {
        self.continue_requests.lock().unwrap().clone()
    }

    fn start_calls(&self) -> usize {
        *self.start_calls.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl ChatTransport for MockTransport {
    async fn start_chat(&self, _req: &StartChatRequest) -> Result<StartChatReply, TransportError> {
        *self.start_calls.lock().unwrap() += 1;
        let mut replies = self.start_replies.lock().unwrap();
        if replies.is_empty() {
            Err(TransportError::Request("unscripted start".into()))
        } else {
            replies.remove(0)
        }
    }

    async fn continue_chat(&self, req: &ContinueChatRequest) -> Result<NodeResponse, TransportError> {
        self.continue_requests.lock().unwrap().push(req.clone());
        let mut replies = self.continue_replies.lock().unwrap();
        if replies.is_empty() {
            Err(TransportError::Request("unscripted turn".into()))
        } else {
            replies.remove(0)
        }
    }
}

// =============================================================================
// fixtures
// =============================================================================

fn identity() -> SessionIdentity {
    SessionIdentity {
        workflow_id: "wf".into(),
        session_id: "host-session".into(),
        current_node_id: "node-0".into(),
        token: "widget-token".into(),
    }
}

fn text_node(node_id: &str, message: &str) -> NodeResponse {
    NodeResponse::new(node_id, message, NodeBody::Text(TextData::default()))
}

fn welcome_reply() -> StartChatReply {
    StartChatReply {
        chat_session_id: "cs-1".into(),
        chat_token: "ct-1".into(),
        node: text_node("node-0", "Welcome to the chat! How can I help you today?"),
    }
}

fn reply_with(node: NodeResponse) -> StartChatReply {
    StartChatReply { chat_session_id: "cs-1".into(), chat_token: "ct-1".into(), node }
}

/// A conversation already started on the given initial node.
async fn started(
    initial: NodeResponse,
    turns: Vec<Result<NodeResponse, TransportError>>,
) -> (Conversation, Arc<MockTransport>) {
    let transport = MockTransport::scripted(vec![Ok(reply_with(initial))], turns);
    let mut conversation = Conversation::new(transport.clone(), identity());
    conversation.start().await.unwrap();
    (conversation, transport)
}

// =============================================================================
// start
// =============================================================================

#[tokio::test]
async fn start_populates_credentials_and_message() {
    let transport = MockTransport::scripted(vec![Ok(welcome_reply())], vec![]);
    let mut conversation = Conversation::new(transport.clone(), identity());

    conversation.start().await.unwrap();

    let credentials = conversation.credentials().unwrap();
    assert_eq!(credentials.chat_session_id, "cs-1");
    assert_eq!(credentials.chat_token, "ct-1");
    assert_eq!(conversation.messages().len(), 1);
    assert_eq!(conversation.messages()[0].author, protocol::Author::System);
    assert_eq!(conversation.messages()[0].content, "Welcome to the chat! How can I help you today?");
    assert_eq!(conversation.current_node().unwrap().node_id, "node-0");
}

#[tokio::test]
async fn start_twice_is_rejected_without_network() {
    let transport = MockTransport::scripted(vec![Ok(welcome_reply()), Ok(welcome_reply())], vec![]);
    let mut conversation = Conversation::new(transport.clone(), identity());
    conversation.start().await.unwrap();

    let err = conversation.start().await.unwrap_err();
    assert!(matches!(err, ConversationError::AlreadyStarted));
    assert_eq!(transport.start_calls(), 1);
    assert_eq!(conversation.messages().len(), 1);
}

#[tokio::test]
async fn start_failure_leaves_driver_not_started() {
    let transport = MockTransport::scripted(
        vec![Err(TransportError::Request("connection refused".into())), Ok(welcome_reply())],
        vec![],
    );
    let mut conversation = Conversation::new(transport.clone(), identity());

    let err = conversation.start().await.unwrap_err();
    assert!(matches!(err, ConversationError::Transport(_)));
    assert!(!conversation.is_started());
    assert_eq!(conversation.messages().len(), 1);
    assert_eq!(conversation.messages()[0].content, "Error starting workflow. Please try again.");

    // The host may retry; the second attempt succeeds.
    conversation.start().await.unwrap();
    assert!(conversation.is_started());
}

#[tokio::test]
async fn start_application_error_is_surfaced_verbatim() {
    let transport = MockTransport::scripted(
        vec![Err(TransportError::Application("workflow not published".into()))],
        vec![],
    );
    let mut conversation = Conversation::new(transport, identity());

    conversation.start().await.unwrap_err();
    assert_eq!(conversation.messages()[0].content, "Error: workflow not published");
}

// =============================================================================
// send — state guards
// =============================================================================

#[tokio::test]
async fn send_before_start_is_rejected() {
    let transport = MockTransport::scripted(vec![], vec![]);
    let mut conversation = Conversation::new(transport.clone(), identity());

    let err = conversation.send().await.unwrap_err();
    assert!(matches!(err, ConversationError::NotStarted));
    assert!(transport.continue_requests().is_empty());
}

#[tokio::test]
async fn send_while_in_flight_is_rejected() {
    let (mut conversation, transport) = started(text_node("n0", "hi"), vec![]).await;
    conversation.set_text("hello");
    conversation.in_flight = true;

    let err = conversation.send().await.unwrap_err();
    assert!(matches!(err, ConversationError::Busy));
    assert!(transport.continue_requests().is_empty());
}

// =============================================================================
// send — validation
// =============================================================================

#[tokio::test]
async fn invalid_number_blocks_the_network_call() {
    let initial = NodeResponse::new("number_node", "digits?", NodeBody::Number(NumberData::default()));
    let (mut conversation, transport) = started(initial, vec![]).await;
    conversation.set_text("12a");

    let err = conversation.send().await.unwrap_err();
    assert!(matches!(err, ConversationError::Input(InputError::InvalidNumber)));
    assert_eq!(conversation.error(), Some("Please enter digits only."));
    assert!(transport.continue_requests().is_empty());
    // Only the start message; the invalid turn appended nothing.
    assert_eq!(conversation.messages().len(), 1);
}

#[tokio::test]
async fn zero_button_selections_is_a_no_op() {
    let initial = NodeResponse::new(
        "buttons_list",
        "pick",
        NodeBody::Buttons(ButtonsData {
            buttonlist: vec![ButtonOption::new("1", "Button 1"), ButtonOption::new("2", "Button 2")],
        }),
    );
    let (mut conversation, transport) = started(initial, vec![]).await;

    let err = conversation.send().await.unwrap_err();
    assert!(matches!(err, ConversationError::Input(InputError::NoSelection)));
    assert!(transport.continue_requests().is_empty());
    assert_eq!(conversation.messages().len(), 1);
}

#[tokio::test]
async fn validation_error_clears_after_a_valid_send() {
    let initial = NodeResponse::new("number_node", "digits?", NodeBody::Number(NumberData::default()));
    let (mut conversation, _transport) = started(initial, vec![Ok(text_node("next", "thanks"))]).await;

    conversation.set_text("12a");
    conversation.send().await.unwrap_err();
    assert!(conversation.error().is_some());

    conversation.set_text("42");
    conversation.send().await.unwrap();
    assert!(conversation.error().is_none());
}

// =============================================================================
// send — success
// =============================================================================

#[tokio::test]
async fn successful_turn_appends_and_resets() {
    let next = NodeResponse::new("date_node", "Please select a date:", NodeBody::Date(DateData::default()));
    let (mut conversation, transport) = started(text_node("n0", "welcome"), vec![Ok(next)]).await;
    conversation.set_text("  date please  ");

    conversation.send().await.unwrap();

    // [system welcome, user input, system reply] in order.
    let contents: Vec<&str> = conversation.messages().iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, ["welcome", "date please", "Please select a date:"]);
    assert_eq!(conversation.messages()[1].author, protocol::Author::User);

    // The node register was replaced wholesale and the buffers reset.
    assert_eq!(conversation.current_node().unwrap().node_id, "date_node");
    assert!(conversation.input().text.is_empty());

    let requests = transport.continue_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].user_input, "date please");
    assert_eq!(requests[0].chat_session_id, "cs-1");
    assert_eq!(requests[0].chat_token, "ct-1");
}

#[tokio::test]
async fn button_turn_joins_labels_in_selection_order() {
    let initial = NodeResponse::new(
        "buttons_list",
        "pick",
        NodeBody::Buttons(ButtonsData {
            buttonlist: vec![
                ButtonOption::new("1", "Button 1"),
                ButtonOption::new("2", "Button 2"),
                ButtonOption::new("3", "Button 3"),
            ],
        }),
    );
    let (mut conversation, transport) = started(initial, vec![Ok(text_node("next", "ok"))]).await;

    assert_eq!(conversation.toggle_button("3"), Some(true));
    assert_eq!(conversation.toggle_button("1"), Some(true));
    assert_eq!(conversation.toggle_button("missing"), None);

    conversation.send().await.unwrap();
    assert_eq!(transport.continue_requests()[0].user_input, "Button 3, Button 1");
    assert!(conversation.input().selections.is_empty());
}

#[tokio::test]
async fn toggling_a_button_off_removes_it_from_the_turn() {
    let initial = NodeResponse::new(
        "buttons_list",
        "pick",
        NodeBody::Buttons(ButtonsData {
            buttonlist: vec![ButtonOption::new("1", "Button 1"), ButtonOption::new("2", "Button 2")],
        }),
    );
    let (mut conversation, transport) = started(initial, vec![Ok(text_node("next", "ok"))]).await;

    conversation.toggle_button("1");
    conversation.toggle_button("2");
    assert_eq!(conversation.toggle_button("1"), Some(false));

    conversation.send().await.unwrap();
    assert_eq!(transport.continue_requests()[0].user_input, "Button 2");
}

#[tokio::test]
async fn dropdown_turn_sends_the_chosen_label() {
    let initial = NodeResponse::new(
        "dropdown_node",
        "choose",
        NodeBody::Dropdown(DropdownData {
            options: vec![ButtonOption::new("1", "Option 1"), ButtonOption::new("2", "Option 2")],
        }),
    );
    let (mut conversation, transport) = started(initial, vec![Ok(text_node("next", "ok"))]).await;

    assert!(conversation.choose_option("2"));
    assert!(!conversation.choose_option("missing"));

    conversation.send().await.unwrap();
    assert_eq!(transport.continue_requests()[0].user_input, "Option 2");
    assert!(conversation.input().choice.is_none());
}

#[tokio::test]
async fn date_turn_sends_formatted_date() {
    let initial = NodeResponse::new("date_node", "pick", NodeBody::Date(DateData::default()));
    let (mut conversation, transport) = started(initial, vec![Ok(text_node("next", "ok"))]).await;

    conversation.set_date(Date::from_calendar_date(2021, Month::March, 7).unwrap());
    conversation.send().await.unwrap();

    assert_eq!(transport.continue_requests()[0].user_input, "03-07-2021");
    assert!(conversation.input().date.is_none());
}

#[tokio::test]
async fn phone_turn_sends_combined_number() {
    let initial = NodeResponse::new(
        "phone_node",
        "number?",
        NodeBody::Phone(protocol::PhoneData::default()),
    );
    let (mut conversation, transport) = started(initial, vec![Ok(text_node("next", "ok"))]).await;

    conversation.set_phone_country("+1");
    conversation.set_phone_digits("1234567890");
    conversation.send().await.unwrap();

    assert_eq!(transport.continue_requests()[0].user_input, "+11234567890");
    assert!(conversation.input().phone_digits.is_empty());
}

// =============================================================================
// send — failure
// =============================================================================

#[tokio::test]
async fn failed_turn_preserves_node_and_buffers() {
    let (mut conversation, _transport) = started(
        text_node("n0", "welcome"),
        vec![Err(TransportError::Request("timeout".into()))],
    )
    .await;
    conversation.set_text("hello");

    let err = conversation.send().await.unwrap_err();
    assert!(matches!(err, ConversationError::Transport(_)));

    // User message stays, one error notice appended, state untouched.
    let contents: Vec<&str> = conversation.messages().iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, ["welcome", "hello", "Error processing workflow. Please try again."]);
    assert_eq!(conversation.current_node().unwrap().node_id, "n0");
    assert_eq!(conversation.input().text, "hello");
}

#[tokio::test]
async fn application_error_turn_is_surfaced_verbatim() {
    let (mut conversation, _transport) = started(
        text_node("n0", "welcome"),
        vec![Err(TransportError::Application("Chat session not found".into()))],
    )
    .await;
    conversation.set_text("hello");

    conversation.send().await.unwrap_err();
    assert_eq!(conversation.messages().last().unwrap().content, "Error: Chat session not found");
}

#[tokio::test]
async fn failed_turn_allows_a_retry_with_the_same_input() {
    let (mut conversation, transport) = started(
        text_node("n0", "welcome"),
        vec![
            Err(TransportError::Request("timeout".into())),
            Ok(text_node("next", "made it")),
        ],
    )
    .await;
    conversation.set_text("hello");

    conversation.send().await.unwrap_err();
    conversation.send().await.unwrap();

    let requests = transport.continue_requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].user_input, "hello");
    assert_eq!(requests[1].user_input, "hello");
    assert_eq!(conversation.current_node().unwrap().node_id, "next");
}

// =============================================================================
// media behavior
// =============================================================================

fn image_node() -> NodeResponse {
    NodeResponse::new("image_node", "look", NodeBody::Image(protocol::ImageData::default()))
}

#[tokio::test]
async fn media_free_text_falls_through_to_text_input() {
    let transport = MockTransport::scripted(
        vec![Ok(reply_with(image_node()))],
        vec![Ok(text_node("next", "ok"))],
    );
    let mut conversation = Conversation::new(transport.clone(), identity());
    conversation.start().await.unwrap();

    conversation.set_text("continue");
    conversation.send().await.unwrap();
    assert_eq!(transport.continue_requests()[0].user_input, "continue");
}

#[tokio::test]
async fn media_auto_acknowledge_needs_no_input() {
    let transport = MockTransport::scripted(
        vec![Ok(reply_with(image_node()))],
        vec![Ok(text_node("next", "ok"))],
    );
    let mut conversation = Conversation::new(transport.clone(), identity())
        .with_media_behavior(MediaBehavior::AutoAcknowledge("ok".into()));
    conversation.start().await.unwrap();

    conversation.send().await.unwrap();
    assert_eq!(transport.continue_requests()[0].user_input, "ok");
}

#[tokio::test]
async fn media_blocked_rejects_the_send() {
    let transport = MockTransport::scripted(vec![Ok(reply_with(image_node()))], vec![]);
    let mut conversation =
        Conversation::new(transport.clone(), identity()).with_media_behavior(MediaBehavior::Blocked);
    conversation.start().await.unwrap();

    conversation.set_text("anything");
    let err = conversation.send().await.unwrap_err();
    assert!(matches!(err, ConversationError::Input(InputError::MediaBlocked)));
    assert!(transport.continue_requests().is_empty());
}

// =============================================================================
// observers
// =============================================================================

#[tokio::test]
async fn loading_observer_sees_true_then_false() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (mut conversation, _transport) =
        started(text_node("n0", "welcome"), vec![Ok(text_node("next", "ok"))]).await;
    let sink = seen.clone();
    conversation.observe_loading(move |loading| sink.lock().unwrap().push(loading));

    conversation.set_text("hello");
    conversation.send().await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![true, false]);
}

#[tokio::test]
async fn input_observer_sees_edits_and_the_reset() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (mut conversation, _transport) =
        started(text_node("n0", "welcome"), vec![Ok(text_node("next", "ok"))]).await;
    let sink = seen.clone();
    conversation.observe_user_input(move |text| sink.lock().unwrap().push(text.to_owned()));

    conversation.set_text("hel");
    conversation.set_text("hello");
    conversation.send().await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec!["hel".to_owned(), "hello".into(), String::new()]);
}

#[tokio::test]
async fn messages_observer_fires_per_append() {
    let counts = Arc::new(Mutex::new(Vec::new()));
    let transport = MockTransport::scripted(
        vec![Ok(welcome_reply())],
        vec![Ok(text_node("next", "ok"))],
    );
    let mut conversation = Conversation::new(transport, identity());
    let sink = counts.clone();
    conversation.observe_messages(move |messages| sink.lock().unwrap().push(messages.len()));

    conversation.start().await.unwrap();
    conversation.set_text("hello");
    conversation.send().await.unwrap();

    // start appends one; send appends user then system.
    assert_eq!(*counts.lock().unwrap(), vec![1, 2, 3]);
}
