//! Lexical retrieval over live memory content and active fact statements,
//! backed by the FTS5 shadow tables.

use rusqlite::{params, Connection};

use engram_core::errors::EngramResult;
use engram_core::models::{Fact, MemoryRecord, RecallFilters};

use super::memory_ops;
use crate::to_storage_err;

#[derive(Debug, Clone)]
pub struct LexicalHit {
    pub memory: MemoryRecord,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct FactTextHit {
    pub fact: Fact,
    pub score: f64,
}

/// Normalize an FTS5 bm25 rank (more negative = better) into [0, 1).
pub fn normalize_rank(rank: f64) -> f64 {
    let s = (-rank).max(0.0);
    s / (1.0 + s)
}

/// Escape a free-text query into an FTS5 OR-of-terms match expression.
/// Every token is quoted so user punctuation cannot break the query syntax.
pub fn fts_match_expr(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{}\"", t.replace('"', "")))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

/// Full-text search over live memory content within one space.
pub fn search_memories(
    conn: &Connection,
    memory_space_id: &str,
    query: &str,
    limit: usize,
    filters: &RecallFilters,
) -> EngramResult<Vec<LexicalHit>> {
    let Some(match_expr) = fts_match_expr(query) else {
        return Ok(Vec::new());
    };

    let mut stmt = conn
        .prepare(
            "SELECT memory_id, rank FROM memories_fts
             WHERE memories_fts MATCH ?1 AND memory_space_id = ?2
             ORDER BY rank LIMIT ?3",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let scored: Vec<(String, f64)> = stmt
        .query_map(params![match_expr, memory_space_id, limit.saturating_mul(4) as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut hits = Vec::new();
    for (memory_id, rank) in scored {
        if let Some(memory) = memory_ops::get_live(conn, &memory_id)? {
            if memory.memory_space_id != memory_space_id {
                continue;
            }
            if let Some(tags) = &filters.tags {
                if !tags.iter().any(|tag| memory.tags.contains(tag)) {
                    continue;
                }
            }
            if let Some(content_type) = filters.content_type {
                if memory.content_type != content_type {
                    continue;
                }
            }
            if let Some(min_importance) = filters.min_importance {
                if memory.importance < min_importance {
                    continue;
                }
            }
            hits.push(LexicalHit {
                memory,
                score: normalize_rank(rank),
            });
        }
        if hits.len() >= limit {
            break;
        }
    }
    Ok(hits)
}

/// Full-text search over active fact statements within one space.
pub fn search_facts_text(
    conn: &Connection,
    memory_space_id: &str,
    query: &str,
    limit: usize,
) -> EngramResult<Vec<FactTextHit>> {
    let Some(match_expr) = fts_match_expr(query) else {
        return Ok(Vec::new());
    };

    let mut stmt = conn
        .prepare(
            "SELECT fact_id FROM facts_fts
             WHERE facts_fts MATCH ?1 AND memory_space_id = ?2
             ORDER BY rank LIMIT ?3",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let ids: Vec<String> = stmt
        .query_map(params![match_expr, memory_space_id, limit as i64], |row| {
            row.get::<_, String>(0)
        })
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut hits = Vec::new();
    for fact_id in ids {
        if let Some(fact) = super::fact_ops::get_fact(conn, &fact_id)? {
            hits.push(FactTextHit { fact, score: 0.5 });
        }
    }
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::{fts_match_expr, normalize_rank};

    #[test]
    fn match_expr_quotes_terms() {
        assert_eq!(
            fts_match_expr("alice typescript").as_deref(),
            Some("\"alice\" OR \"typescript\"")
        );
        assert_eq!(fts_match_expr("   "), None);
    }

    #[test]
    fn rank_normalization_bounds() {
        assert!(normalize_rank(-10.0) > normalize_rank(-1.0));
        assert_eq!(normalize_rank(0.5), 0.0);
        assert!(normalize_rank(-100.0) < 1.0);
    }
}
