//! Users, agents, and participant role bindings.

use rusqlite::{params, Connection, OptionalExtension};

use engram_core::errors::EngramResult;
use engram_core::models::{Agent, Participant, ParticipantKind, User};

use super::{enum_str, parse_enum};
use crate::to_storage_err;

// ─── Users ───────────────────────────────────────────────────────────────────

pub fn insert_user(conn: &Connection, user: &User) -> EngramResult<()> {
    let metadata = serde_json::to_string(&user.metadata).map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "INSERT INTO users (user_id, display_name, email, metadata, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user.user_id, user.display_name, user.email, metadata, user.created_at],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get_user(conn: &Connection, user_id: &str) -> EngramResult<Option<User>> {
    let result = conn
        .query_row(
            "SELECT user_id, display_name, email, metadata, created_at FROM users WHERE user_id = ?1",
            params![user_id],
            |row| Ok(row_to_user(row)),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    result.transpose()
}

pub fn update_user(conn: &Connection, user: &User) -> EngramResult<usize> {
    let metadata = serde_json::to_string(&user.metadata).map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "UPDATE users SET display_name = ?2, email = ?3, metadata = ?4 WHERE user_id = ?1",
        params![user.user_id, user.display_name, user.email, metadata],
    )
    .map_err(|e| to_storage_err(e.to_string()))
}

pub fn delete_user(conn: &Connection, user_id: &str) -> EngramResult<usize> {
    conn.execute("DELETE FROM users WHERE user_id = ?1", params![user_id])
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Clear weak references to a user in spaces it does not own.
pub fn clear_user_references(conn: &Connection, user_id: &str) -> EngramResult<usize> {
    let mut cleared = conn
        .execute(
            "UPDATE memories SET user_id = NULL WHERE user_id = ?1",
            params![user_id],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    cleared += conn
        .execute(
            "UPDATE conversations SET user_id = NULL WHERE user_id = ?1",
            params![user_id],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    cleared += conn
        .execute(
            "UPDATE contexts SET user_id = NULL WHERE user_id = ?1",
            params![user_id],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    cleared += conn
        .execute(
            "DELETE FROM participants WHERE kind = 'user' AND subject_id = ?1",
            params![user_id],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(cleared)
}

fn row_to_user(row: &rusqlite::Row<'_>) -> EngramResult<User> {
    let metadata_json: String = row.get(3).map_err(|e| to_storage_err(e.to_string()))?;
    Ok(User {
        user_id: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
        display_name: row.get(1).map_err(|e| to_storage_err(e.to_string()))?,
        email: row.get(2).map_err(|e| to_storage_err(e.to_string()))?,
        metadata: serde_json::from_str(&metadata_json)
            .map_err(|e| to_storage_err(format!("parse user metadata: {e}")))?,
        created_at: row.get(4).map_err(|e| to_storage_err(e.to_string()))?,
    })
}

// ─── Agents ──────────────────────────────────────────────────────────────────

pub fn insert_agent(conn: &Connection, agent: &Agent) -> EngramResult<()> {
    let capabilities =
        serde_json::to_string(&agent.capabilities).map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "INSERT INTO agents (agent_id, name, capabilities, provider, registered_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![agent.agent_id, agent.name, capabilities, agent.provider, agent.registered_at],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get_agent(conn: &Connection, agent_id: &str) -> EngramResult<Option<Agent>> {
    let result = conn
        .query_row(
            "SELECT agent_id, name, capabilities, provider, registered_at FROM agents WHERE agent_id = ?1",
            params![agent_id],
            |row| Ok(row_to_agent(row)),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    result.transpose()
}

pub fn list_agents(conn: &Connection) -> EngramResult<Vec<Agent>> {
    let mut stmt = conn
        .prepare(
            "SELECT agent_id, name, capabilities, provider, registered_at
             FROM agents ORDER BY registered_at DESC",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| Ok(row_to_agent(row)))
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.into_iter().collect()
}

pub fn delete_agent(conn: &Connection, agent_id: &str) -> EngramResult<usize> {
    conn.execute("DELETE FROM agents WHERE agent_id = ?1", params![agent_id])
        .map_err(|e| to_storage_err(e.to_string()))
}

fn row_to_agent(row: &rusqlite::Row<'_>) -> EngramResult<Agent> {
    let capabilities_json: String = row.get(2).map_err(|e| to_storage_err(e.to_string()))?;
    Ok(Agent {
        agent_id: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
        name: row.get(1).map_err(|e| to_storage_err(e.to_string()))?,
        capabilities: serde_json::from_str(&capabilities_json)
            .map_err(|e| to_storage_err(format!("parse capabilities: {e}")))?,
        provider: row.get(3).map_err(|e| to_storage_err(e.to_string()))?,
        registered_at: row.get(4).map_err(|e| to_storage_err(e.to_string()))?,
    })
}

// ─── Participants ────────────────────────────────────────────────────────────

pub fn insert_participant(conn: &Connection, participant: &Participant) -> EngramResult<()> {
    conn.execute(
        "INSERT INTO participants (participant_id, memory_space_id, kind, subject_id, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            participant.participant_id,
            participant.memory_space_id,
            enum_str(&participant.kind)?,
            participant.subject_id,
            participant.role,
            participant.created_at,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get_participant(
    conn: &Connection,
    participant_id: &str,
) -> EngramResult<Option<Participant>> {
    let result = conn
        .query_row(
            "SELECT participant_id, memory_space_id, kind, subject_id, role, created_at
             FROM participants WHERE participant_id = ?1",
            params![participant_id],
            |row| Ok(row_to_participant(row)),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    result.transpose()
}

pub fn list_participants(conn: &Connection, memory_space_id: &str) -> EngramResult<Vec<Participant>> {
    let mut stmt = conn
        .prepare(
            "SELECT participant_id, memory_space_id, kind, subject_id, role, created_at
             FROM participants WHERE memory_space_id = ?1 ORDER BY created_at",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![memory_space_id], |row| Ok(row_to_participant(row)))
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.into_iter().collect()
}

pub fn delete_participants_in_space(conn: &Connection, memory_space_id: &str) -> EngramResult<usize> {
    conn.execute(
        "DELETE FROM participants WHERE memory_space_id = ?1",
        params![memory_space_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))
}

fn row_to_participant(row: &rusqlite::Row<'_>) -> EngramResult<Participant> {
    let kind_str: String = row.get(2).map_err(|e| to_storage_err(e.to_string()))?;
    Ok(Participant {
        participant_id: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
        memory_space_id: row.get(1).map_err(|e| to_storage_err(e.to_string()))?,
        kind: parse_enum::<ParticipantKind>("kind", &kind_str)?,
        subject_id: row.get(3).map_err(|e| to_storage_err(e.to_string()))?,
        role: row.get(4).map_err(|e| to_storage_err(e.to_string()))?,
        created_at: row.get(5).map_err(|e| to_storage_err(e.to_string()))?,
    })
}
