use crate::error::ConversationStoreError;

pub const CONVERSATION_FILE_EXTENSION: &str = "json";

/// Rejects ids that could escape the history directory or collide with temp files.
pub fn validate_conversation_id(id: &str) -> Result<(), ConversationStoreError> {
    let valid = !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(ConversationStoreError::InvalidId { id: id.to_string() })
    }
}

#[must_use]
pub fn conversation_file_name(id: &str) -> String {
    format!("{id}.{CONVERSATION_FILE_EXTENSION}")
}
