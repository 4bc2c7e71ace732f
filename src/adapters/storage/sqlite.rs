/// SQLite storage adapter
///
/// Implements StoragePort for SQLite database operations.
/// Timestamps are stored as RFC 3339 text, embedding vectors as JSON arrays.
use crate::domain::models::{Conversation, EmbeddingRecord, Phrase, Role, Sentiment, Summary};
use crate::error::{AppError, Result};
use crate::ports::storage::{NewConversation, StoragePort};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// SQLite storage implementation
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Create a new SQLite storage with the given database path
    pub fn new(db_path: PathBuf) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        // Enable foreign keys
        conn.execute("PRAGMA foreign_keys = ON", [])?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run database migrations
    pub fn run_migrations(&self) -> Result<()> {
        use rusqlite_migration::{Migrations, M};

        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../../migrations/001_initial.sql"
        ))]);

        let mut conn = self.lock();
        migrations
            .to_latest(&mut conn)
            .map_err(|e| AppError::Database(rusqlite::Error::ToSqlConversionFailure(Box::new(e))))?;

        Ok(())
    }

    // Recover the connection if another holder panicked
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn parse_time(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

#[async_trait]
impl StoragePort for SqliteStorage {
    async fn create_conversation(&self, conversation: &NewConversation) -> Result<String> {
        let conn = self.lock();
        let id = uuid::Uuid::new_v4().to_string();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO conversations (id, audio_id, company_id, start_time, end_time)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                conversation.audio_id,
                conversation.company_id,
                conversation.start_time.to_rfc3339(),
                conversation.end_time.to_rfc3339(),
            ],
        )?;

        if inserted == 1 {
            return Ok(id);
        }

        conn.execute(
            "UPDATE conversations SET company_id = ?2, start_time = ?3, end_time = ?4
             WHERE audio_id = ?1",
            params![
                conversation.audio_id,
                conversation.company_id,
                conversation.start_time.to_rfc3339(),
                conversation.end_time.to_rfc3339(),
            ],
        )?;
        let existing: String = conn.query_row(
            "SELECT id FROM conversations WHERE audio_id = ?1",
            params![conversation.audio_id],
            |row| row.get(0),
        )?;
        log::info!(
            "Audio {} already stored as conversation {}",
            conversation.audio_id,
            existing
        );
        Ok(existing)
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>> {
        let conn = self.lock();
        let conversation = conn
            .query_row(
                "SELECT id, audio_id, company_id, start_time, end_time
                 FROM conversations WHERE id = ?1",
                params![id],
                |row| {
                    let start: String = row.get(3)?;
                    let end: String = row.get(4)?;
                    Ok(Conversation {
                        id: row.get(0)?,
                        audio_id: row.get(1)?,
                        company_id: row.get(2)?,
                        start_time: parse_time(3, &start)?,
                        end_time: parse_time(4, &end)?,
                    })
                },
            )
            .optional()?;
        Ok(conversation)
    }

    async fn clear_analysis(&self, conversation_id: &str) -> Result<()> {
        let conn = self.lock();

        let tx = conn.unchecked_transaction()?;
        for table in [
            "messages",
            "conversation_chunks",
            "conversation_topics",
            "participants",
        ] {
            tx.execute(
                &format!("DELETE FROM {} WHERE conversation_id = ?1", table),
                params![conversation_id],
            )?;
        }
        tx.commit()?;

        Ok(())
    }

    async fn create_summary(&self, conversation_id: &str, summary: &Summary) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT OR REPLACE INTO summaries (conversation_id, issue, resolution)
             VALUES (?1, ?2, ?3)",
            params![conversation_id, summary.issue, summary.resolution],
        )?;
        Ok(())
    }

    async fn get_summary(&self, conversation_id: &str) -> Result<Option<Summary>> {
        let conn = self.lock();
        let summary = conn
            .query_row(
                "SELECT issue, resolution FROM summaries WHERE conversation_id = ?1",
                params![conversation_id],
                |row| {
                    Ok(Summary {
                        issue: row.get(0)?,
                        resolution: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(summary)
    }

    async fn find_or_create_topic(&self, topic: &str) -> Result<i64> {
        let conn = self.lock();
        conn.execute(
            "INSERT OR IGNORE INTO topics (topic) VALUES (?1)",
            params![topic],
        )?;
        let id = conn.query_row(
            "SELECT id FROM topics WHERE topic = ?1",
            params![topic],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    async fn link_topic(&self, topic_id: i64, conversation_id: &str) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT OR IGNORE INTO conversation_topics (topic_id, conversation_id) VALUES (?1, ?2)",
            params![topic_id, conversation_id],
        )?;
        Ok(())
    }

    async fn get_topics(&self, conversation_id: &str) -> Result<Vec<String>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT t.topic FROM topics t
             JOIN conversation_topics ct ON ct.topic_id = t.id
             WHERE ct.conversation_id = ?1 ORDER BY t.topic",
        )?;
        let rows = stmt.query_map(params![conversation_id], |row| row.get(0))?;

        let mut topics = Vec::new();
        for topic in rows {
            topics.push(topic?);
        }
        Ok(topics)
    }

    async fn add_participants(&self, conversation_id: &str, user_ids: &[String]) -> Result<usize> {
        let conn = self.lock();
        let mut added = 0;

        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO participants (conversation_id, user_id) VALUES (?1, ?2)",
            )?;
            for user_id in user_ids {
                added += stmt.execute(params![conversation_id, user_id])?;
            }
        }
        tx.commit()?;

        Ok(added)
    }

    async fn get_participants(&self, conversation_id: &str) -> Result<Vec<String>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT user_id FROM participants WHERE conversation_id = ?1 ORDER BY user_id",
        )?;
        let rows = stmt.query_map(params![conversation_id], |row| row.get(0))?;

        let mut participants = Vec::new();
        for participant in rows {
            participants.push(participant?);
        }
        Ok(participants)
    }

    async fn create_message(
        &self,
        conversation_id: &str,
        position: usize,
        phrase: &Phrase,
    ) -> Result<i64> {
        let conn = self.lock();
        conn.execute(
            "INSERT OR REPLACE INTO messages
                (conversation_id, position, speaker, role, text, start_ms, confidence,
                 positive, negative, neutral)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                conversation_id,
                position as i64,
                phrase.speaker,
                phrase.role.map(|role| role.to_string()),
                phrase.text,
                phrase.start_ms,
                phrase.confidence,
                phrase.sentiment.positive,
                phrase.sentiment.negative,
                phrase.sentiment.neutral,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Phrase>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT speaker, role, text, start_ms, confidence, positive, negative, neutral
             FROM messages WHERE conversation_id = ?1 ORDER BY position",
        )?;

        let rows = stmt.query_map(params![conversation_id], |row| {
            let role: Option<String> = row.get(1)?;
            Ok(Phrase {
                speaker: row.get(0)?,
                role: role.as_deref().and_then(Role::from_label),
                text: row.get(2)?,
                start_ms: row.get(3)?,
                confidence: row.get(4)?,
                sentiment: Sentiment {
                    positive: row.get(5)?,
                    negative: row.get(6)?,
                    neutral: row.get(7)?,
                },
            })
        })?;

        let mut messages = Vec::new();
        for message in rows {
            messages.push(message?);
        }
        Ok(messages)
    }

    async fn create_chunks(&self, conversation_id: &str, chunks: &[EmbeddingRecord]) -> Result<usize> {
        let conn = self.lock();

        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO conversation_chunks (conversation_id, chunk_index, content, embedding)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;

            for chunk in chunks {
                stmt.execute(params![
                    conversation_id,
                    chunk.chunk_index as i64,
                    chunk.content,
                    serde_json::to_string(&chunk.vector)?,
                ])?;
            }
        }
        tx.commit()?;

        Ok(chunks.len())
    }

    async fn get_chunks(&self, conversation_id: &str) -> Result<Vec<EmbeddingRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT chunk_index, content, embedding FROM conversation_chunks
             WHERE conversation_id = ?1 ORDER BY chunk_index",
        )?;
        let rows = stmt.query_map(params![conversation_id], chunk_from_row)?;

        let mut chunks = Vec::new();
        for chunk in rows {
            chunks.push(chunk?);
        }
        Ok(chunks)
    }

    async fn list_chunks(&self, company_id: Option<String>) -> Result<Vec<EmbeddingRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT ch.chunk_index, ch.content, ch.embedding
             FROM conversation_chunks ch
             JOIN conversations c ON c.id = ch.conversation_id
             WHERE ?1 IS NULL OR c.company_id = ?1
             ORDER BY ch.conversation_id, ch.chunk_index",
        )?;
        let rows = stmt.query_map(params![company_id], chunk_from_row)?;

        let mut chunks = Vec::new();
        for chunk in rows {
            chunks.push(chunk?);
        }
        Ok(chunks)
    }

    async fn latest_chunks(&self, company_id: &str) -> Result<Vec<EmbeddingRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT chunk_index, content, embedding FROM conversation_chunks
             WHERE conversation_id = (
                 SELECT id FROM conversations WHERE company_id = ?1
                 ORDER BY start_time DESC, created_at DESC LIMIT 1
             )
             ORDER BY chunk_index",
        )?;
        let rows = stmt.query_map(params![company_id], chunk_from_row)?;

        let mut chunks = Vec::new();
        for chunk in rows {
            chunks.push(chunk?);
        }
        Ok(chunks)
    }
}

fn chunk_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EmbeddingRecord> {
    let index: i64 = row.get(0)?;
    let embedding: String = row.get(2)?;
    let vector = serde_json::from_str(&embedding)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
    Ok(EmbeddingRecord {
        chunk_index: index as usize,
        content: row.get(1)?,
        vector,
    })
}
