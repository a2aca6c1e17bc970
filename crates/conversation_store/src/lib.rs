//! Durable, append-only conversation log.
//!
//! One pretty-printed JSON document per conversation, named by its id and
//! rewritten wholesale on every append. The store owns durability only; the
//! caller owns the [`ConversationHistory`] value and its lifetime.

mod error;
mod paths;
mod schema;
mod store;

pub use error::ConversationStoreError;
pub use paths::{conversation_file_name, validate_conversation_id, CONVERSATION_FILE_EXTENSION};
pub use schema::ConversationHistory;
pub use store::ConversationStore;
