//! L1a: conversation create/get/append/delete. Messages are append-only;
//! ordering rides on the UNIQUE (conversation_id, position) constraint.

use rusqlite::{params, Connection, OptionalExtension};

use engram_core::errors::EngramResult;
use engram_core::models::{
    Conversation, ConversationParticipants, ConversationType, Message, MessageRole,
};
use engram_core::now_ms;

use super::{enum_str, parse_enum};
use crate::to_storage_err;

pub fn insert_conversation(conn: &Connection, conversation: &Conversation) -> EngramResult<()> {
    conn.execute(
        "INSERT INTO conversations (
            conversation_id, memory_space_id, conversation_type,
            user_id, participant_id, message_count, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            conversation.conversation_id,
            conversation.memory_space_id,
            enum_str(&conversation.conversation_type)?,
            conversation.participants.user_id,
            conversation.participants.participant_id,
            conversation.message_count as i64,
            conversation.created_at,
            conversation.updated_at,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Load a conversation with its messages ordered by position.
pub fn get_conversation(
    conn: &Connection,
    conversation_id: &str,
) -> EngramResult<Option<Conversation>> {
    let header = conn
        .query_row(
            "SELECT conversation_id, memory_space_id, conversation_type,
                    user_id, participant_id, message_count, created_at, updated_at
             FROM conversations WHERE conversation_id = ?1",
            params![conversation_id],
            |row| Ok(row_to_conversation(row)),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;

    match header.transpose()? {
        Some(mut conversation) => {
            conversation.messages = load_messages(conn, conversation_id)?;
            Ok(Some(conversation))
        }
        None => Ok(None),
    }
}

fn load_messages(conn: &Connection, conversation_id: &str) -> EngramResult<Vec<Message>> {
    let mut stmt = conn
        .prepare(
            "SELECT message_id, role, content, timestamp, dedup_key
             FROM messages WHERE conversation_id = ?1 ORDER BY position",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![conversation_id], |row| Ok(row_to_message(row)))
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.into_iter().collect()
}

/// Atomic append: assigns the next position, bumps message_count and
/// updated_at in the same transaction managed by the caller. Returns the
/// stored message, or the existing one when `dedup_key` already appended.
pub fn append_message(
    conn: &Connection,
    conversation_id: &str,
    message: &Message,
) -> EngramResult<AppendOutcome> {
    if let Some(dedup_key) = &message.dedup_key {
        let existing = conn
            .query_row(
                "SELECT message_id, role, content, timestamp, dedup_key
                 FROM messages WHERE conversation_id = ?1 AND dedup_key = ?2",
                params![conversation_id, dedup_key],
                |row| Ok(row_to_message(row)),
            )
            .optional()
            .map_err(|e| to_storage_err(e.to_string()))?;
        if let Some(found) = existing.transpose()? {
            return Ok(AppendOutcome {
                message: found,
                deduplicated: true,
            });
        }
    }

    let position: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM messages WHERE conversation_id = ?1",
            params![conversation_id],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    conn.execute(
        "INSERT INTO messages (message_id, conversation_id, position, role, content, timestamp, dedup_key)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            message.id,
            conversation_id,
            position,
            enum_str(&message.role)?,
            message.content,
            message.timestamp,
            message.dedup_key,
        ],
    )
    .map_err(|e| {
        if crate::is_conflict(&e) {
            engram_core::EngramError::Storage(engram_core::errors::StorageError::WriteConflict {
                table: "messages",
            })
        } else {
            to_storage_err(e.to_string())
        }
    })?;

    conn.execute(
        "UPDATE conversations SET message_count = message_count + 1, updated_at = ?2
         WHERE conversation_id = ?1",
        params![conversation_id, now_ms()],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    Ok(AppendOutcome {
        message: message.clone(),
        deduplicated: false,
    })
}

/// Result of an append; `deduplicated` means the message already existed
/// under the same dedup key and nothing was written.
#[derive(Debug, Clone)]
pub struct AppendOutcome {
    pub message: Message,
    pub deduplicated: bool,
}

pub fn list_conversations_in_space(
    conn: &Connection,
    memory_space_id: &str,
) -> EngramResult<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT conversation_id FROM conversations WHERE memory_space_id = ?1")
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![memory_space_id], |row| row.get::<_, String>(0))
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows)
}

/// Delete a conversation and its messages. References from memories and
/// facts are cleared, not cascaded — those entities survive.
pub fn delete_conversation(conn: &Connection, conversation_id: &str) -> EngramResult<usize> {
    conn.execute(
        "UPDATE memories SET conversation_id = NULL, message_ids = '[]' WHERE conversation_id = ?1",
        params![conversation_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "UPDATE facts SET conversation_id = NULL, message_id = NULL WHERE conversation_id = ?1",
        params![conversation_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "DELETE FROM messages WHERE conversation_id = ?1",
        params![conversation_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "DELETE FROM conversations WHERE conversation_id = ?1",
        params![conversation_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))
}

fn row_to_conversation(row: &rusqlite::Row<'_>) -> EngramResult<Conversation> {
    let type_str: String = row.get(2).map_err(|e| to_storage_err(e.to_string()))?;
    Ok(Conversation {
        conversation_id: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
        memory_space_id: row.get(1).map_err(|e| to_storage_err(e.to_string()))?,
        conversation_type: parse_enum::<ConversationType>("conversation_type", &type_str)?,
        participants: ConversationParticipants {
            user_id: row.get(3).map_err(|e| to_storage_err(e.to_string()))?,
            participant_id: row.get(4).map_err(|e| to_storage_err(e.to_string()))?,
        },
        messages: Vec::new(),
        message_count: row.get::<_, i64>(5).map_err(|e| to_storage_err(e.to_string()))? as usize,
        created_at: row.get(6).map_err(|e| to_storage_err(e.to_string()))?,
        updated_at: row.get(7).map_err(|e| to_storage_err(e.to_string()))?,
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> EngramResult<Message> {
    let role_str: String = row.get(1).map_err(|e| to_storage_err(e.to_string()))?;
    Ok(Message {
        id: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
        role: parse_enum::<MessageRole>("role", &role_str)?,
        content: row.get(2).map_err(|e| to_storage_err(e.to_string()))?,
        timestamp: row.get(3).map_err(|e| to_storage_err(e.to_string()))?,
        dedup_key: row.get(4).map_err(|e| to_storage_err(e.to_string()))?,
    })
}
