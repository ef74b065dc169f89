//! SQLite conversation repository implementation.
//!
//! Implements `ConversationRepository` from `chatline-core` using sqlx with
//! split read/write pools: raw queries, private Row structs, reads on the
//! reader pool, and every write inside a transaction on the single writer.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteConnection;

use chatline_core::chat::repository::{ConversationRepository, next_message_timestamp};
use chatline_types::chat::{
    Conversation, ConversationId, Exchange, ExchangeTarget, Message, MessageId, Sender, UserId,
};
use chatline_types::error::RepositoryError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ConversationRepository`.
#[derive(Clone)]
pub struct SqliteConversationRepository {
    pool: DatabasePool,
}

impl SqliteConversationRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct ConversationRow {
    id: i64,
    user_id: i64,
    created_at: String,
}

impl ConversationRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_conversation(self) -> Result<Conversation, RepositoryError> {
        Ok(Conversation {
            id: ConversationId(self.id),
            user_id: UserId(self.user_id),
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

struct MessageRow {
    id: i64,
    conversation_id: i64,
    sender: String,
    content: String,
    timestamp: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            conversation_id: row.try_get("conversation_id")?,
            sender: row.try_get("sender")?,
            content: row.try_get("content")?,
            timestamp: row.try_get("timestamp")?,
        })
    }

    fn into_message(self) -> Result<Message, RepositoryError> {
        let sender: Sender = self
            .sender
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(Message {
            id: MessageId(self.id),
            conversation_id: ConversationId(self.conversation_id),
            sender,
            content: self.content,
            timestamp: parse_datetime(&self.timestamp)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Fixed-width so lexicographic order in SQL matches chronological order.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn query_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

async fn fetch_conversation(
    conn: &mut SqliteConnection,
    conversation_id: ConversationId,
) -> Result<Option<Conversation>, RepositoryError> {
    let row = sqlx::query("SELECT * FROM conversations WHERE id = ?")
        .bind(conversation_id.0)
        .fetch_optional(&mut *conn)
        .await
        .map_err(query_err)?;

    match row {
        Some(row) => {
            let conv_row = ConversationRow::from_row(&row).map_err(query_err)?;
            Ok(Some(conv_row.into_conversation()?))
        }
        None => Ok(None),
    }
}

async fn insert_conversation(
    conn: &mut SqliteConnection,
    user_id: UserId,
) -> Result<Conversation, RepositoryError> {
    let created_at = Utc::now();
    let result = sqlx::query("INSERT INTO conversations (user_id, created_at) VALUES (?, ?)")
        .bind(user_id.0)
        .bind(format_datetime(&created_at))
        .execute(&mut *conn)
        .await
        .map_err(query_err)?;

    Ok(Conversation {
        id: ConversationId(result.last_insert_rowid()),
        user_id,
        created_at: parse_datetime(&format_datetime(&created_at))?,
    })
}

/// Insert a message, clamping its timestamp to the conversation's latest.
async fn insert_message(
    conn: &mut SqliteConnection,
    conversation_id: ConversationId,
    sender: Sender,
    content: &str,
) -> Result<Message, RepositoryError> {
    let latest: Option<String> = sqlx::query_scalar(
        "SELECT timestamp FROM messages WHERE conversation_id = ? ORDER BY id DESC LIMIT 1",
    )
    .bind(conversation_id.0)
    .fetch_optional(&mut *conn)
    .await
    .map_err(query_err)?;

    let latest = latest.as_deref().map(parse_datetime).transpose()?;
    let timestamp = format_datetime(&next_message_timestamp(latest));

    let result = sqlx::query(
        "INSERT INTO messages (conversation_id, sender, content, timestamp) VALUES (?, ?, ?, ?)",
    )
    .bind(conversation_id.0)
    .bind(sender.to_string())
    .bind(content)
    .bind(&timestamp)
    .execute(&mut *conn)
    .await
    .map_err(query_err)?;

    Ok(Message {
        id: MessageId(result.last_insert_rowid()),
        conversation_id,
        sender,
        content: content.to_string(),
        timestamp: parse_datetime(&timestamp)?,
    })
}

// ---------------------------------------------------------------------------
// ConversationRepository implementation
// ---------------------------------------------------------------------------

impl ConversationRepository for SqliteConversationRepository {
    async fn create_conversation(&self, user_id: UserId) -> Result<Conversation, RepositoryError> {
        let mut conn = self.pool.writer.acquire().await.map_err(query_err)?;
        insert_conversation(&mut conn, user_id).await
    }

    async fn get_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let mut conn = self.pool.reader.acquire().await.map_err(query_err)?;
        fetch_conversation(&mut conn, conversation_id).await
    }

    async fn append_message(
        &self,
        conversation_id: ConversationId,
        sender: Sender,
        content: &str,
    ) -> Result<Message, RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        if fetch_conversation(&mut tx, conversation_id).await?.is_none() {
            return Err(RepositoryError::NotFound);
        }
        let message = insert_message(&mut tx, conversation_id, sender, content).await?;

        tx.commit().await.map_err(query_err)?;
        Ok(message)
    }

    async fn list_conversations(&self, user_id: UserId) -> Result<Vec<Conversation>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM conversations WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id.0)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        let mut conversations = Vec::with_capacity(rows.len());
        for row in &rows {
            let conv_row = ConversationRow::from_row(row).map_err(query_err)?;
            conversations.push(conv_row.into_conversation()?);
        }

        Ok(conversations)
    }

    async fn list_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, RepositoryError> {
        let mut conn = self.pool.reader.acquire().await.map_err(query_err)?;

        if fetch_conversation(&mut conn, conversation_id).await?.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let rows = sqlx::query("SELECT * FROM messages WHERE conversation_id = ? ORDER BY id ASC")
            .bind(conversation_id.0)
            .fetch_all(&mut *conn)
            .await
            .map_err(query_err)?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            let msg_row = MessageRow::from_row(row).map_err(query_err)?;
            messages.push(msg_row.into_message()?);
        }

        Ok(messages)
    }

    async fn record_exchange(
        &self,
        target: ExchangeTarget,
        user_content: &str,
        bot_content: &str,
    ) -> Result<Exchange, RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        let conversation = match target {
            ExchangeTarget::Existing(conversation_id) => fetch_conversation(&mut tx, conversation_id)
                .await?
                .ok_or(RepositoryError::NotFound)?,
            ExchangeTarget::New(user_id) => insert_conversation(&mut tx, user_id).await?,
        };

        let user_message = insert_message(&mut tx, conversation.id, Sender::User, user_content).await?;
        let bot_message = insert_message(&mut tx, conversation.id, Sender::Bot, bot_content).await?;

        // Dropping `tx` on any early return above rolls everything back.
        tx.commit().await.map_err(query_err)?;

        Ok(Exchange {
            conversation,
            user_message,
            bot_message,
        })
    }
}
