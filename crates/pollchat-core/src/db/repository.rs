//! `SQLite` implementation of the storage contracts

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use rusqlite::{params, OptionalExtension, Row};
use tokio::sync::Mutex;

use super::Database;
use crate::error::{Error, Result};
use crate::models::{
    Conversation, ConversationId, ConversationStatus, Message, MessageRole, Poll, PollId,
};
use crate::store::{ConversationStore, PollStore};

const CONVERSATION_COLUMNS: &str = "id, title, owner_id, status, created_at, updated_at,
    first_message, message_count, is_favorite, favorite_rank, tags, linked_poll_id,
    back_reference_id, metadata";

/// Conversation row before JSON columns are decoded
struct ConversationRow {
    id: String,
    title: String,
    owner_id: String,
    status: String,
    created_at: i64,
    updated_at: i64,
    first_message: String,
    message_count: u32,
    is_favorite: bool,
    favorite_rank: Option<u32>,
    tags: String,
    linked_poll_id: Option<String>,
    back_reference_id: Option<String>,
    metadata: String,
}

impl ConversationRow {
    fn parse(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            owner_id: row.get(2)?,
            status: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
            first_message: row.get(6)?,
            message_count: row.get(7)?,
            is_favorite: row.get(8)?,
            favorite_rank: row.get(9)?,
            tags: row.get(10)?,
            linked_poll_id: row.get(11)?,
            back_reference_id: row.get(12)?,
            metadata: row.get(13)?,
        })
    }
}

impl TryFrom<ConversationRow> for Conversation {
    type Error = Error;

    fn try_from(row: ConversationRow) -> Result<Self> {
        let tags: BTreeSet<String> = serde_json::from_str(&row.tags)?;
        let metadata: BTreeMap<String, serde_json::Value> = serde_json::from_str(&row.metadata)?;

        Ok(Self {
            id: row.id.into(),
            title: row.title,
            owner_id: row.owner_id,
            status: ConversationStatus::parse(&row.status).unwrap_or_default(),
            created_at: row.created_at,
            updated_at: row.updated_at,
            first_message: row.first_message,
            message_count: row.message_count,
            is_favorite: row.is_favorite,
            favorite_rank: row.favorite_rank,
            tags,
            linked_poll_id: row.linked_poll_id.map(PollId::from),
            back_reference_id: row.back_reference_id.map(ConversationId::from),
            metadata,
        })
    }
}

fn parse_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    let id: String = row.get(0)?;
    let conversation_id: String = row.get(1)?;
    let role: String = row.get(2)?;
    Ok(Message {
        id: id.into(),
        conversation_id: conversation_id.into(),
        role: MessageRole::parse(&role).unwrap_or_default(),
        content: row.get(3)?,
        timestamp: row.get(4)?,
    })
}

fn parse_poll(row: &Row<'_>) -> rusqlite::Result<Poll> {
    let id: String = row.get(0)?;
    let conversation_id: String = row.get(1)?;
    Ok(Poll {
        id: id.into(),
        conversation_id: conversation_id.into(),
        title: row.get(2)?,
        owner_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Conversation and poll store over one `SQLite` database
pub struct SqliteStore {
    db: Mutex<Database>,
}

impl SqliteStore {
    /// Open (and migrate) a store at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    /// Open an in-memory store (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// Wrap an already opened database
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }
}

impl ConversationStore for SqliteStore {
    async fn get_conversation(&self, id: &ConversationId) -> Result<Option<Conversation>> {
        let db = self.db.lock().await;
        let row = db
            .connection()
            .query_row(
                &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?"),
                params![id.as_str()],
                ConversationRow::parse,
            )
            .optional()?;
        row.map(Conversation::try_from).transpose()
    }

    async fn list_conversations(&self, owner_id: &str) -> Result<Vec<Conversation>> {
        if owner_id.is_empty() {
            return Ok(Vec::new());
        }

        let db = self.db.lock().await;
        let mut stmt = db.connection().prepare(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations
             WHERE owner_id = ?
             ORDER BY updated_at DESC"
        ))?;
        let rows = stmt
            .query_map(params![owner_id], ConversationRow::parse)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(Conversation::try_from).collect()
    }

    async fn delete_conversation(&self, id: &ConversationId) -> Result<()> {
        let db = self.db.lock().await;
        db.connection().execute(
            "DELETE FROM conversations WHERE id = ?",
            params![id.as_str()],
        )?;
        Ok(())
    }

    async fn get_messages(&self, conversation_id: &ConversationId) -> Result<Vec<Message>> {
        let db = self.db.lock().await;
        let mut stmt = db.connection().prepare(
            "SELECT id, conversation_id, role, content, timestamp
             FROM messages
             WHERE conversation_id = ?
             ORDER BY timestamp ASC, rowid ASC",
        )?;
        let messages = stmt
            .query_map(params![conversation_id.as_str()], parse_message)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(messages)
    }

    async fn delete_messages(&self, conversation_id: &ConversationId) -> Result<()> {
        let db = self.db.lock().await;
        db.connection().execute(
            "DELETE FROM messages WHERE conversation_id = ?",
            params![conversation_id.as_str()],
        )?;
        Ok(())
    }

    async fn update_conversation(&self, conversation: &Conversation) -> Result<Conversation> {
        {
            let db = self.db.lock().await;
            let rows = db.connection().execute(
                "UPDATE conversations SET
                    title = ?, owner_id = ?, status = ?, created_at = ?, updated_at = ?,
                    first_message = ?, message_count = ?, is_favorite = ?, favorite_rank = ?,
                    tags = ?, linked_poll_id = ?, back_reference_id = ?, metadata = ?
                 WHERE id = ?",
                params![
                    conversation.title,
                    conversation.owner_id,
                    conversation.status.as_str(),
                    conversation.created_at,
                    conversation.updated_at,
                    conversation.first_message,
                    conversation.message_count,
                    conversation.is_favorite,
                    conversation.favorite_rank,
                    serde_json::to_string(&conversation.tags)?,
                    conversation.linked_poll_id.as_ref().map(PollId::as_str),
                    conversation.back_reference_id.as_ref().map(ConversationId::as_str),
                    serde_json::to_string(&conversation.metadata)?,
                    conversation.id.as_str(),
                ],
            )?;

            if rows == 0 {
                tracing::debug!(
                    conversation_id = %conversation.id,
                    "Update changed no rows (missing or stale write)"
                );
            }
        }

        // A stale write is dropped by the LWW trigger; the stored row wins
        self.get_conversation(&conversation.id)
            .await?
            .ok_or_else(|| Error::NotFound(conversation.id.to_string()))
    }

    async fn insert_conversation(&self, conversation: &Conversation) -> Result<()> {
        let db = self.db.lock().await;
        db.connection().execute(
            &format!(
                "INSERT INTO conversations ({CONVERSATION_COLUMNS})
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    owner_id = excluded.owner_id,
                    status = excluded.status,
                    created_at = excluded.created_at,
                    updated_at = excluded.updated_at,
                    first_message = excluded.first_message,
                    message_count = excluded.message_count,
                    is_favorite = excluded.is_favorite,
                    favorite_rank = excluded.favorite_rank,
                    tags = excluded.tags,
                    linked_poll_id = excluded.linked_poll_id,
                    back_reference_id = excluded.back_reference_id,
                    metadata = excluded.metadata"
            ),
            params![
                conversation.id.as_str(),
                conversation.title,
                conversation.owner_id,
                conversation.status.as_str(),
                conversation.created_at,
                conversation.updated_at,
                conversation.first_message,
                conversation.message_count,
                conversation.is_favorite,
                conversation.favorite_rank,
                serde_json::to_string(&conversation.tags)?,
                conversation.linked_poll_id.as_ref().map(PollId::as_str),
                conversation.back_reference_id.as_ref().map(ConversationId::as_str),
                serde_json::to_string(&conversation.metadata)?,
            ],
        )?;
        Ok(())
    }

    async fn insert_messages(&self, messages: &[Message]) -> Result<()> {
        let db = self.db.lock().await;
        let tx = db.connection().unchecked_transaction()?;
        for message in messages {
            tx.execute(
                "INSERT OR IGNORE INTO messages (id, conversation_id, role, content, timestamp)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    message.id.as_str(),
                    message.conversation_id.as_str(),
                    message.role.as_str(),
                    message.content,
                    message.timestamp,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

impl PollStore for SqliteStore {
    async fn find_poll_by_conversation_id(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<Poll>> {
        let db = self.db.lock().await;
        let poll = db
            .connection()
            .query_row(
                "SELECT id, conversation_id, title, owner_id, created_at
                 FROM polls WHERE conversation_id = ?
                 ORDER BY created_at ASC
                 LIMIT 1",
                params![conversation_id.as_str()],
                parse_poll,
            )
            .optional()?;
        Ok(poll)
    }

    async fn get_poll(&self, id: &PollId) -> Result<Option<Poll>> {
        let db = self.db.lock().await;
        let poll = db
            .connection()
            .query_row(
                "SELECT id, conversation_id, title, owner_id, created_at
                 FROM polls WHERE id = ?",
                params![id.as_str()],
                parse_poll,
            )
            .optional()?;
        Ok(poll)
    }

    async fn delete_poll(&self, id: &PollId) -> Result<()> {
        let db = self.db.lock().await;
        db.connection()
            .execute("DELETE FROM polls WHERE id = ?", params![id.as_str()])?;
        Ok(())
    }

    async fn insert_poll(&self, poll: &Poll) -> Result<()> {
        let db = self.db.lock().await;
        db.connection().execute(
            "INSERT OR REPLACE INTO polls (id, conversation_id, title, owner_id, created_at)
             VALUES (?, ?, ?, ?, ?)",
            params![
                poll.id.as_str(),
                poll.conversation_id.as_str(),
                poll.title,
                poll.owner_id,
                poll.created_at,
            ],
        )?;
        Ok(())
    }
}
