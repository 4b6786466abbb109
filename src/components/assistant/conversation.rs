use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Messages sent to the model per request, not counting the system prompt
pub const HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Per-user chat history kept in memory
#[derive(Debug, Default)]
pub struct ConversationStore {
    histories: RwLock<HashMap<String, Vec<ChatMessage>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, dropping anything older than the prompt window
    pub async fn push(&self, user_id: &str, message: ChatMessage) {
        let mut histories = self.histories.write().await;
        let history = histories.entry(user_id.to_string()).or_default();
        history.push(message);
        if history.len() > HISTORY_LIMIT {
            let excess = history.len() - HISTORY_LIMIT;
            history.drain(..excess);
        }
    }

    /// The most recent messages, oldest first
    pub async fn recent(&self, user_id: &str) -> Vec<ChatMessage> {
        self.histories
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn clear(&self, user_id: &str) {
        self.histories.write().await.remove(user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_history_keeps_last_ten() {
        let store = ConversationStore::new();
        for i in 0..13 {
            store.push("u1", ChatMessage::user(format!("m{}", i))).await;
        }

        let recent = store.recent("u1").await;
        assert_eq!(recent.len(), HISTORY_LIMIT);
        assert_eq!(recent[0].content, "m3");
        assert_eq!(recent[9].content, "m12");
    }

    #[tokio::test]
    async fn test_histories_are_per_user() {
        let store = ConversationStore::new();
        store.push("u1", ChatMessage::user("hi")).await;
        store.push("u2", ChatMessage::assistant("hello")).await;

        assert_eq!(store.recent("u1").await, vec![ChatMessage::user("hi")]);
        store.clear("u2").await;
        assert!(store.recent("u2").await.is_empty());
    }
}
