use std::cmp::Reverse;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chat_provider::Message;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::ConversationStoreError;
use crate::paths::{conversation_file_name, validate_conversation_id, CONVERSATION_FILE_EXTENSION};
use crate::schema::ConversationHistory;

/// File-backed conversation store rooted at one history directory.
///
/// There is no locking: a single writer per conversation is assumed, which the
/// agent loop guarantees by refusing concurrent runs.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    root: PathBuf,
}

impl ConversationStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, id: &str) -> Result<PathBuf, ConversationStoreError> {
        validate_conversation_id(id)?;
        Ok(self.root.join(conversation_file_name(id)))
    }

    /// Rewrites the whole conversation document.
    ///
    /// The document is written to a sibling temp file first and renamed over
    /// the target, so readers never observe a truncated file.
    pub async fn save(&self, conversation: &ConversationHistory) -> Result<(), ConversationStoreError> {
        let path = self.path_for(&conversation.id)?;
        let serialized = serde_json::to_string_pretty(conversation)
            .map_err(|source| ConversationStoreError::json_serialize(&path, source))?;

        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| ConversationStoreError::io("creating history directory", &self.root, source))?;

        let temp_path = path.with_extension(format!("{CONVERSATION_FILE_EXTENSION}.tmp"));
        fs::write(&temp_path, serialized)
            .await
            .map_err(|source| ConversationStoreError::io("writing conversation temp file", &temp_path, source))?;
        fs::rename(&temp_path, &path)
            .await
            .map_err(|source| ConversationStoreError::io("replacing conversation file", &path, source))?;

        debug!(
            conversation_id = %conversation.id,
            messages = conversation.messages.len(),
            "conversation saved"
        );
        Ok(())
    }

    /// Appends `message` and durably rewrites the document before returning.
    ///
    /// On a failed write the message stays appended in memory; the next
    /// successful append persists it.
    pub async fn append(
        &self,
        conversation: &mut ConversationHistory,
        message: Message,
    ) -> Result<(), ConversationStoreError> {
        conversation.messages.push(message);
        self.save(conversation).await
    }

    /// Loads one conversation. Returns `Ok(None)` when no file exists for `id`.
    pub async fn load(&self, id: &str) -> Result<Option<ConversationHistory>, ConversationStoreError> {
        let path = self.path_for(id)?;
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConversationStoreError::io("reading conversation file", &path, source));
            }
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| ConversationStoreError::json_parse(&path, source))
    }

    /// Lists every readable conversation, newest first.
    ///
    /// A missing history directory yields an empty list. Files that cannot be
    /// read or parsed are skipped with a warning.
    pub async fn list(&self) -> Result<Vec<ConversationHistory>, ConversationStoreError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(ConversationStoreError::io("listing history directory", &self.root, source));
            }
        };

        let mut conversations = Vec::new();
        loop {
            let entry = entries
                .next_entry()
                .await
                .map_err(|source| ConversationStoreError::io("listing history directory", &self.root, source))?;
            let Some(entry) = entry else {
                break;
            };

            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(CONVERSATION_FILE_EXTENSION) {
                continue;
            }

            let parsed = match fs::read_to_string(&path).await {
                Ok(raw) => serde_json::from_str::<ConversationHistory>(&raw)
                    .map_err(|error| error.to_string()),
                Err(error) => Err(error.to_string()),
            };

            match parsed {
                Ok(conversation) => conversations.push(conversation),
                Err(error) => warn!(path = %path.display(), %error, "skipping unreadable conversation file"),
            }
        }

        // Unparsable timestamps sort last.
        conversations.sort_by_cached_key(|conversation| {
            Reverse((conversation.started_at_time(), conversation.started_at.clone()))
        });
        Ok(conversations)
    }
}
