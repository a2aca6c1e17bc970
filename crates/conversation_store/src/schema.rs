use chat_provider::Message;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::ConversationStoreError;

/// Unit of persistence and of agent-loop invocation.
///
/// `messages` only ever grows; insertion order is the chat turn order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationHistory {
    pub id: String,
    pub started_at: String,
    pub messages: Vec<Message>,
}

impl ConversationHistory {
    /// Creates an empty conversation with a fresh random id, stamped now.
    pub fn new() -> Result<Self, ConversationStoreError> {
        let started_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(ConversationStoreError::ClockFormat)?;

        Ok(Self::with_id(uuid::Uuid::new_v4().to_string(), started_at))
    }

    #[must_use]
    pub fn with_id(id: impl Into<String>, started_at: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            started_at: started_at.into(),
            messages: Vec::new(),
        }
    }

    /// Parsed start time, when `started_at` is valid RFC3339.
    #[must_use]
    pub fn started_at_time(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::parse(&self.started_at, &Rfc3339).ok()
    }
}
