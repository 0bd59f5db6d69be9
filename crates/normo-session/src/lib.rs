//! normo-session: Conversation session management
//!
//! This crate owns the client-side view of a conversation: which conversation is
//! active, its messages, the catalog of known conversations and the loading/error
//! status. It mediates every call to the chat gateway and keeps the active
//! conversation id in a local session store so a session can be resumed.

pub mod error;
pub mod events;
pub mod manager;
pub mod state;
pub mod store;

pub use error::{Error, Result};
pub use events::SessionEvent;
pub use manager::{Delivery, SessionManager};
pub use state::{ChatMessage, ConversationState, MessageIds};
pub use store::{CURRENT_CONVERSATION_KEY, FileSessionStore, MemorySessionStore, SessionStore};
