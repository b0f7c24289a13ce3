//! Embeddable conversation driver for the workflow chat protocol.
//!
//! The driver is the headless half of a chat widget: it tracks the active
//! node, validates user input for that node's type, and exchanges turns
//! with a responder over [`transport::ChatTransport`]. Rendering is the
//! host's job; the driver exposes the current node, the message log, and
//! observer hooks to react to state changes.

pub mod conversation;
pub mod input;
pub mod transport;

pub use conversation::{ChatCredentials, Conversation, ConversationError, SessionIdentity};
pub use input::{InputError, MediaBehavior, TurnInput};
pub use transport::{ChatTransport, HttpTransport, TransportError};
