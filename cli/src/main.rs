//! Interactive terminal host for the conversation driver.
//!
//! Line protocol per node type: free text for text-ish nodes, an option id
//! for dropdowns, space-separated ids for button grids, `YYYY-MM-DD` for
//! dates, and `+CC NUMBER` for phone nodes. `/quit` exits.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::Parser;
use driver::{Conversation, ConversationError, HttpTransport, MediaBehavior, SessionIdentity};
use protocol::NodeBody;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

const DATE_INPUT_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("transport setup failed: {0}")]
    Transport(#[from] driver::TransportError),
    #[error("stdin read failed: {0}")]
    Io(#[from] io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "chat-cli", about = "Terminal host for the workflow chat driver")]
struct Cli {
    #[arg(long, env = "CHAT_API_URL", default_value = "http://127.0.0.1:3001")]
    api_url: String,

    #[arg(long, env = "CHAT_WORKFLOW_ID", default_value = "demo-workflow")]
    workflow_id: String,

    #[arg(long, env = "CHAT_SESSION_ID", default_value = "cli-session")]
    session_id: String,

    #[arg(long, env = "CHAT_NODE_ID", default_value = "node-0")]
    current_node_id: String,

    #[arg(long, env = "CHAT_TOKEN", default_value = "dev-token")]
    token: String,

    /// Auto-acknowledge media nodes instead of asking for free text.
    #[arg(long)]
    acknowledge_media: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let transport = Arc::new(HttpTransport::new(cli.api_url.clone())?);
    let identity = SessionIdentity {
        workflow_id: cli.workflow_id,
        session_id: cli.session_id,
        current_node_id: cli.current_node_id,
        token: cli.token,
    };

    let media_behavior = if cli.acknowledge_media {
        MediaBehavior::AutoAcknowledge("ok".into())
    } else {
        MediaBehavior::FreeText
    };
    let mut conversation = Conversation::new(transport, identity).with_media_behavior(media_behavior);

    let mut printed = 0;
    if conversation.start().await.is_err() {
        print_new_messages(&conversation, &mut printed);
        return Ok(());
    }
    print_new_messages(&conversation, &mut printed);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print_prompt(&conversation);
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let line = line.trim();
        if line == "/quit" {
            break;
        }
        if line.is_empty() {
            continue;
        }

        stage_input(&mut conversation, line);
        match conversation.send().await {
            Ok(()) => {}
            Err(ConversationError::Input(err)) => println!("! {err}"),
            // Transport failures already appended a notice; state guards
            // should be unreachable in this single-threaded loop.
            Err(_) => {}
        }
        print_new_messages(&conversation, &mut printed);
    }

    Ok(())
}

enum Affordance {
    Dropdown,
    Buttons,
    Date,
    Phone,
    Text,
}

fn affordance(conversation: &Conversation) -> Option<Affordance> {
    let node = conversation.current_node()?;
    Some(match &node.body {
        NodeBody::Dropdown(_) => Affordance::Dropdown,
        NodeBody::Buttons(_) => Affordance::Buttons,
        NodeBody::Date(_) => Affordance::Date,
        NodeBody::Phone(_) => Affordance::Phone,
        _ => Affordance::Text,
    })
}

/// Map one input line onto the driver's buffers for the active node.
fn stage_input(conversation: &mut Conversation, line: &str) {
    let Some(kind) = affordance(conversation) else {
        return;
    };
    match kind {
        Affordance::Dropdown => {
            if !conversation.choose_option(line) {
                println!("! no option with id {line:?}");
            }
        }
        Affordance::Buttons => {
            for id in line.split_whitespace() {
                if conversation.toggle_button(id).is_none() {
                    println!("! no button with id {id:?}");
                }
            }
        }
        Affordance::Date => match time::Date::parse(line, DATE_INPUT_FORMAT) {
            Ok(date) => conversation.set_date(date),
            Err(_) => println!("! expected YYYY-MM-DD"),
        },
        Affordance::Phone => {
            let mut parts = line.split_whitespace();
            conversation.set_phone_country(parts.next().unwrap_or_default());
            conversation.set_phone_digits(parts.next().unwrap_or_default());
        }
        Affordance::Text => conversation.set_text(line),
    }
}

fn print_prompt(conversation: &Conversation) {
    let Some(node) = conversation.current_node() else {
        return;
    };
    match &node.body {
        NodeBody::Dropdown(data) => {
            for option in &data.options {
                println!("  [{}] {}", option.id, option.label);
            }
            print!("choose an id> ");
        }
        NodeBody::Buttons(data) => {
            for option in &data.buttonlist {
                println!("  [{}] {}", option.id, option.label);
            }
            print!("toggle ids, space-separated> ");
        }
        NodeBody::Date(_) => print!("date (YYYY-MM-DD)> "),
        NodeBody::Phone(_) => print!("phone (+CC NUMBER)> "),
        NodeBody::Number(_) => print!("number> "),
        NodeBody::Email(_) => print!("email> "),
        _ => print!("> "),
    }
    let _ = io::stdout().flush();
}

fn print_new_messages(conversation: &Conversation, printed: &mut usize) {
    for message in &conversation.messages()[*printed..] {
        let who = match message.author {
            protocol::Author::System => "bot",
            protocol::Author::User => "you",
        };
        println!("{who}: {}", message.content);
    }
    *printed = conversation.messages().len();
}
