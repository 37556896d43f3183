//! L3: structured belief insert, query, supersession pointers, delete.
//! Default read paths see only `status = 'active'` rows; superseded and
//! duplicate facts need an explicit status flag.

use rusqlite::{params, Connection, OptionalExtension};

use engram_core::errors::EngramResult;
use engram_core::models::{Fact, FactQuery, FactSourceRef, FactStatus, FactType, Slots};

use super::{enum_str, parse_enum};
use crate::to_storage_err;

const FACT_COLUMNS: &str = "fact_id, memory_space_id, fact, fact_type, subject, predicate, \
     object, slots, confidence, source_type, conversation_id, message_id, memory_id, tags, \
     status, supersedes, superseded_by, created_at";

pub fn insert_fact(conn: &Connection, fact: &Fact) -> EngramResult<()> {
    let slots = serde_json::to_string(&fact.slots).map_err(|e| to_storage_err(e.to_string()))?;
    let tags = serde_json::to_string(&fact.tags).map_err(|e| to_storage_err(e.to_string()))?;
    let supersedes =
        serde_json::to_string(&fact.supersedes).map_err(|e| to_storage_err(e.to_string()))?;
    let source_ref = fact.source_ref.clone().unwrap_or_default();

    conn.execute(
        "INSERT INTO facts (
            fact_id, memory_space_id, fact, fact_type, subject, predicate, object,
            slots, confidence, source_type, conversation_id, message_id, memory_id,
            tags, status, supersedes, superseded_by, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        params![
            fact.fact_id,
            fact.memory_space_id,
            fact.fact,
            enum_str(&fact.fact_type)?,
            fact.subject,
            fact.predicate,
            fact.object,
            slots,
            fact.confidence as i64,
            fact.source_type,
            source_ref.conversation_id,
            source_ref.message_id,
            source_ref.memory_id,
            tags,
            enum_str(&fact.status)?,
            supersedes,
            fact.superseded_by,
            fact.created_at,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    if fact.status == FactStatus::Active {
        conn.execute(
            "INSERT INTO facts_fts (fact, fact_id, memory_space_id) VALUES (?1, ?2, ?3)",
            params![fact.fact, fact.fact_id, fact.memory_space_id],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    }

    Ok(())
}

pub fn get_fact(conn: &Connection, fact_id: &str) -> EngramResult<Option<Fact>> {
    let result = conn
        .query_row(
            &format!("SELECT {FACT_COLUMNS} FROM facts WHERE fact_id = ?1"),
            params![fact_id],
            |row| Ok(row_to_fact(row)),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    result.transpose()
}

/// List facts in a space. `status = None` means active-only.
pub fn list_facts(
    conn: &Connection,
    memory_space_id: &str,
    status: Option<FactStatus>,
    limit: usize,
) -> EngramResult<Vec<Fact>> {
    let status_str = enum_str(&status.unwrap_or(FactStatus::Active))?;
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {FACT_COLUMNS} FROM facts
             WHERE memory_space_id = ?1 AND status = ?2
             ORDER BY created_at DESC, fact_id DESC LIMIT ?3"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![memory_space_id, status_str, limit as i64], |row| {
            Ok(row_to_fact(row))
        })
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.into_iter().collect()
}

/// Structured query: any combination of triple parts, tags, status.
pub fn query_facts(
    conn: &Connection,
    memory_space_id: &str,
    query: &FactQuery,
) -> EngramResult<Vec<Fact>> {
    let status_str = enum_str(&query.status.unwrap_or(FactStatus::Active))?;
    let limit = query.limit.unwrap_or(100);

    let mut sql = format!(
        "SELECT {FACT_COLUMNS} FROM facts WHERE memory_space_id = ?1 AND status = ?2"
    );
    let mut args: Vec<Box<dyn rusqlite::ToSql>> =
        vec![Box::new(memory_space_id.to_string()), Box::new(status_str)];

    if let Some(subject) = &query.subject {
        args.push(Box::new(subject.clone()));
        sql.push_str(&format!(" AND subject = ?{}", args.len()));
    }
    if let Some(predicate) = &query.predicate {
        args.push(Box::new(predicate.clone()));
        sql.push_str(&format!(" AND predicate = ?{}", args.len()));
    }
    if let Some(object) = &query.object {
        args.push(Box::new(object.clone()));
        sql.push_str(&format!(" AND object = ?{}", args.len()));
    }
    if let Some(tags) = &query.tags {
        for tag in tags {
            args.push(Box::new(format!("%\"{tag}\"%")));
            sql.push_str(&format!(" AND tags LIKE ?{}", args.len()));
        }
    }

    args.push(Box::new(limit as i64));
    sql.push_str(&format!(
        " ORDER BY confidence DESC, created_at DESC LIMIT ?{}",
        args.len()
    ));

    let mut stmt = conn.prepare(&sql).map_err(|e| to_storage_err(e.to_string()))?;
    let params_ref: Vec<&dyn rusqlite::ToSql> = args.iter().map(|a| a.as_ref()).collect();
    let rows = stmt
        .query_map(params_ref.as_slice(), |row| Ok(row_to_fact(row)))
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.into_iter().collect()
}

/// Active facts sharing a normalized (subject, predicate, fact_type) head.
/// The belief-revision matcher refines these by slot keys and tags.
pub fn find_by_signature(
    conn: &Connection,
    memory_space_id: &str,
    subject: &str,
    predicate: &str,
    fact_type: FactType,
) -> EngramResult<Vec<Fact>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {FACT_COLUMNS} FROM facts
             WHERE memory_space_id = ?1 AND status = 'active'
               AND LOWER(TRIM(subject)) = ?2 AND LOWER(TRIM(predicate)) = ?3 AND fact_type = ?4"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(
            params![
                memory_space_id,
                subject.trim().to_lowercase(),
                predicate.trim().to_lowercase(),
                enum_str(&fact_type)?,
            ],
            |row| Ok(row_to_fact(row)),
        )
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.into_iter().collect()
}

/// Active facts sharing at least one tag with the candidate.
pub fn find_by_tags(
    conn: &Connection,
    memory_space_id: &str,
    tags: &[String],
) -> EngramResult<Vec<Fact>> {
    let mut out: Vec<Fact> = Vec::new();
    for tag in tags {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {FACT_COLUMNS} FROM facts
                 WHERE memory_space_id = ?1 AND status = 'active' AND tags LIKE ?2"
            ))
            .map_err(|e| to_storage_err(e.to_string()))?;
        let rows = stmt
            .query_map(params![memory_space_id, format!("%\"{tag}\"%")], |row| {
                Ok(row_to_fact(row))
            })
            .map_err(|e| to_storage_err(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| to_storage_err(e.to_string()))?;
        for row in rows {
            let fact = row?;
            if !out.iter().any(|f| f.fact_id == fact.fact_id) {
                out.push(fact);
            }
        }
    }
    Ok(out)
}

/// Mark a fact superseded by `new_fact_id` and drop it from the text index.
pub fn mark_superseded(conn: &Connection, fact_id: &str, new_fact_id: &str) -> EngramResult<()> {
    conn.execute(
        "UPDATE facts SET status = 'superseded', superseded_by = ?2 WHERE fact_id = ?1",
        params![fact_id, new_fact_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute("DELETE FROM facts_fts WHERE fact_id = ?1", params![fact_id])
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Merge an UPDATE decision into the surviving fact.
pub fn merge_update(
    conn: &Connection,
    fact_id: &str,
    confidence: u8,
    source_type: &str,
    source_ref: &Option<FactSourceRef>,
    tags: &[String],
) -> EngramResult<()> {
    let existing = get_fact(conn, fact_id)?
        .ok_or_else(|| engram_core::EngramError::not_found("fact", fact_id))?;

    let mut merged_tags = existing.tags.clone();
    for tag in tags {
        if !merged_tags.contains(tag) {
            merged_tags.push(tag.clone());
        }
    }
    let tags_json =
        serde_json::to_string(&merged_tags).map_err(|e| to_storage_err(e.to_string()))?;
    let source_ref = source_ref.clone().unwrap_or_default();

    conn.execute(
        "UPDATE facts SET confidence = ?2, source_type = ?3, conversation_id = ?4,
                message_id = ?5, memory_id = ?6, tags = ?7
         WHERE fact_id = ?1",
        params![
            fact_id,
            confidence as i64,
            source_type,
            source_ref.conversation_id,
            source_ref.message_id,
            source_ref.memory_id,
            tags_json,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Retract without physical delete (archive-only forget).
pub fn retract_fact(conn: &Connection, fact_id: &str) -> EngramResult<usize> {
    let changed = conn
        .execute(
            "UPDATE facts SET status = 'retracted' WHERE fact_id = ?1 AND status != 'retracted'",
            params![fact_id],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute("DELETE FROM facts_fts WHERE fact_id = ?1", params![fact_id])
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(changed)
}

/// Hard-delete a fact, rewriting `supersedes` arrays that reference it.
/// Deleting a superseded fact never resurrects anything.
pub fn delete_fact(conn: &Connection, fact_id: &str) -> EngramResult<usize> {
    // Rewrite supersedes pointers in facts that superseded this one.
    let mut stmt = conn
        .prepare("SELECT fact_id, supersedes FROM facts WHERE supersedes LIKE ?1")
        .map_err(|e| to_storage_err(e.to_string()))?;
    let referencing: Vec<(String, String)> = stmt
        .query_map(params![format!("%\"{fact_id}\"%")], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    for (referrer_id, supersedes_json) in referencing {
        let mut supersedes: Vec<String> = serde_json::from_str(&supersedes_json)
            .map_err(|e| to_storage_err(format!("parse supersedes: {e}")))?;
        supersedes.retain(|id| id != fact_id);
        let rewritten =
            serde_json::to_string(&supersedes).map_err(|e| to_storage_err(e.to_string()))?;
        conn.execute(
            "UPDATE facts SET supersedes = ?2 WHERE fact_id = ?1",
            params![referrer_id, rewritten],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    }

    conn.execute("DELETE FROM facts_fts WHERE fact_id = ?1", params![fact_id])
        .map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute("DELETE FROM facts WHERE fact_id = ?1", params![fact_id])
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Facts whose source points at a given memory.
pub fn list_by_memory(conn: &Connection, memory_id: &str) -> EngramResult<Vec<Fact>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {FACT_COLUMNS} FROM facts WHERE memory_id = ?1"))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![memory_id], |row| Ok(row_to_fact(row)))
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.into_iter().collect()
}

/// Delete facts extracted from a given memory (vector-delete cascade).
pub fn delete_by_memory(conn: &Connection, memory_id: &str) -> EngramResult<usize> {
    let mut stmt = conn
        .prepare("SELECT fact_id FROM facts WHERE memory_id = ?1")
        .map_err(|e| to_storage_err(e.to_string()))?;
    let ids: Vec<String> = stmt
        .query_map(params![memory_id], |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut deleted = 0;
    for fact_id in ids {
        deleted += delete_fact(conn, &fact_id)?;
    }
    Ok(deleted)
}

/// Facts extracted from any of the given conversations.
pub fn list_by_conversations(
    conn: &Connection,
    memory_space_id: &str,
    conversation_ids: &[String],
) -> EngramResult<Vec<Fact>> {
    let mut out = Vec::new();
    for conversation_id in conversation_ids {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {FACT_COLUMNS} FROM facts
                 WHERE memory_space_id = ?1 AND conversation_id = ?2 AND status = 'active'"
            ))
            .map_err(|e| to_storage_err(e.to_string()))?;
        let rows = stmt
            .query_map(params![memory_space_id, conversation_id], |row| {
                Ok(row_to_fact(row))
            })
            .map_err(|e| to_storage_err(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| to_storage_err(e.to_string()))?;
        for row in rows {
            out.push(row?);
        }
    }
    Ok(out)
}

/// Delete every fact in a space. Returns the count removed.
pub fn purge_space(conn: &Connection, memory_space_id: &str) -> EngramResult<usize> {
    let deleted = conn
        .execute(
            "DELETE FROM facts WHERE memory_space_id = ?1",
            params![memory_space_id],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "DELETE FROM facts_fts WHERE memory_space_id = ?1",
        params![memory_space_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(deleted)
}

/// Parse a row from the facts table into a Fact.
pub(crate) fn row_to_fact(row: &rusqlite::Row<'_>) -> EngramResult<Fact> {
    let fact_type_str: String = row.get(3).map_err(|e| to_storage_err(e.to_string()))?;
    let slots_json: String = row.get(7).map_err(|e| to_storage_err(e.to_string()))?;
    let conversation_id: Option<String> = row.get(10).map_err(|e| to_storage_err(e.to_string()))?;
    let message_id: Option<String> = row.get(11).map_err(|e| to_storage_err(e.to_string()))?;
    let memory_id: Option<String> = row.get(12).map_err(|e| to_storage_err(e.to_string()))?;
    let tags_json: String = row.get(13).map_err(|e| to_storage_err(e.to_string()))?;
    let status_str: String = row.get(14).map_err(|e| to_storage_err(e.to_string()))?;
    let supersedes_json: String = row.get(15).map_err(|e| to_storage_err(e.to_string()))?;

    let slots: Slots = serde_json::from_str(&slots_json)
        .map_err(|e| to_storage_err(format!("parse slots: {e}")))?;
    let tags: Vec<String> = serde_json::from_str(&tags_json)
        .map_err(|e| to_storage_err(format!("parse tags: {e}")))?;
    let supersedes: Vec<String> = serde_json::from_str(&supersedes_json)
        .map_err(|e| to_storage_err(format!("parse supersedes: {e}")))?;

    let source_ref = if conversation_id.is_some() || message_id.is_some() || memory_id.is_some() {
        Some(FactSourceRef {
            conversation_id,
            message_id,
            memory_id,
        })
    } else {
        None
    };

    Ok(Fact {
        fact_id: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
        memory_space_id: row.get(1).map_err(|e| to_storage_err(e.to_string()))?,
        fact: row.get(2).map_err(|e| to_storage_err(e.to_string()))?,
        fact_type: parse_enum::<FactType>("fact_type", &fact_type_str)?,
        subject: row.get(4).map_err(|e| to_storage_err(e.to_string()))?,
        predicate: row.get(5).map_err(|e| to_storage_err(e.to_string()))?,
        object: row.get(6).map_err(|e| to_storage_err(e.to_string()))?,
        slots,
        confidence: row.get::<_, i64>(8).map_err(|e| to_storage_err(e.to_string()))? as u8,
        source_type: row.get(9).map_err(|e| to_storage_err(e.to_string()))?,
        source_ref,
        tags,
        status: parse_enum::<FactStatus>("status", &status_str)?,
        supersedes,
        superseded_by: row.get(16).map_err(|e| to_storage_err(e.to_string()))?,
        created_at: row.get(17).map_err(|e| to_storage_err(e.to_string()))?,
    })
}
