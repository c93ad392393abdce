//! Campaign chat over the realtime collaborator.

pub mod chat;
pub mod connection;
pub mod session;

pub use chat::{ChatFeed, ChatMessage, MergeOutcome, MessageKey};
pub use connection::{LoopbackConnection, LoopbackHub, RealtimeConnection, RealtimeEvent};
pub use session::{Identity, Session};
