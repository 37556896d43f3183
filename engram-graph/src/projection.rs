//! Projection conventions: how canonical entities become labeled nodes and
//! typed edges. Ids are deterministic so every write has an exact inverse.

use engram_core::models::{Context, Conversation, Fact, MemoryRecord, MemorySpace};
use engram_core::traits::{GraphEdge, GraphNode};

pub const LABEL_SPACE: &str = "MemorySpace";
pub const LABEL_CONVERSATION: &str = "Conversation";
pub const LABEL_MEMORY: &str = "Memory";
pub const LABEL_FACT: &str = "Fact";
pub const LABEL_CONTEXT: &str = "Context";
pub const LABEL_USER: &str = "User";
pub const LABEL_ENTITY: &str = "Entity";

pub const EDGE_CONTAINS: &str = "CONTAINS";
pub const EDGE_CHILD_OF: &str = "CHILD_OF";
pub const EDGE_TRIGGERED_BY: &str = "TRIGGERED_BY";
pub const EDGE_INVOLVES: &str = "INVOLVES";
pub const EDGE_REFERENCES: &str = "REFERENCES";
pub const EDGE_EXTRACTED_FROM: &str = "EXTRACTED_FROM";
pub const EDGE_MENTIONS: &str = "MENTIONS";
pub const EDGE_SUPERSEDES: &str = "SUPERSEDES";
pub const EDGE_SENT_TO: &str = "SENT_TO";

pub fn space_node_id(memory_space_id: &str) -> String {
    format!("space:{memory_space_id}")
}

pub fn conversation_node_id(conversation_id: &str) -> String {
    format!("conversation:{conversation_id}")
}

pub fn memory_node_id(memory_id: &str) -> String {
    format!("memory:{memory_id}")
}

pub fn fact_node_id(fact_id: &str) -> String {
    format!("fact:{fact_id}")
}

pub fn context_node_id(context_id: &str) -> String {
    format!("context:{context_id}")
}

pub fn user_node_id(user_id: &str) -> String {
    format!("user:{user_id}")
}

/// Entities are re-used across facts by normalized name.
pub fn entity_node_id(name: &str) -> String {
    format!("entity:{}", name.trim().to_lowercase())
}

/// Reverse of `memory_node_id` and friends; used by graph-sourced recall to
/// map traversal hits back into canonical layers.
pub fn parse_node_id(node_id: &str) -> Option<(&str, &str)> {
    node_id.split_once(':')
}

pub fn edge_id(edge_type: &str, from: &str, to: &str) -> String {
    format!("{edge_type}:{from}->{to}")
}

fn edge(edge_type: &str, from: String, to: String) -> GraphEdge {
    GraphEdge {
        id: edge_id(edge_type, &from, &to),
        edge_type: edge_type.to_string(),
        from,
        to,
        properties: serde_json::Value::Null,
    }
}

/// Entity names mentioned by a fact: its subject and object strings. No
/// deeper extraction — names are matched, never inferred.
pub fn fact_entities(fact: &Fact) -> Vec<String> {
    let mut entities = Vec::new();
    for value in [&fact.subject, &fact.object].into_iter().flatten() {
        let normalized = value.trim().to_lowercase();
        if !normalized.is_empty() && !entities.contains(&normalized) {
            entities.push(normalized);
        }
    }
    entities
}

pub fn space_node(space: &MemorySpace) -> GraphNode {
    GraphNode {
        id: space_node_id(&space.memory_space_id),
        label: LABEL_SPACE.to_string(),
        properties: serde_json::json!({
            "memorySpaceId": space.memory_space_id,
            "name": space.name,
        }),
    }
}

pub fn conversation_node(conversation: &Conversation) -> GraphNode {
    GraphNode {
        id: conversation_node_id(&conversation.conversation_id),
        label: LABEL_CONVERSATION.to_string(),
        properties: serde_json::json!({
            "conversationId": conversation.conversation_id,
            "memorySpaceId": conversation.memory_space_id,
            "messageCount": conversation.message_count,
        }),
    }
}

pub fn memory_node(memory: &MemoryRecord) -> GraphNode {
    GraphNode {
        id: memory_node_id(&memory.memory_id),
        label: LABEL_MEMORY.to_string(),
        properties: serde_json::json!({
            "memoryId": memory.memory_id,
            "memorySpaceId": memory.memory_space_id,
            "importance": memory.importance,
        }),
    }
}

pub fn fact_node(fact: &Fact) -> GraphNode {
    GraphNode {
        id: fact_node_id(&fact.fact_id),
        label: LABEL_FACT.to_string(),
        properties: serde_json::json!({
            "factId": fact.fact_id,
            "memorySpaceId": fact.memory_space_id,
            "fact": fact.fact,
            "confidence": fact.confidence,
        }),
    }
}

pub fn context_node(context: &Context) -> GraphNode {
    GraphNode {
        id: context_node_id(&context.context_id),
        label: LABEL_CONTEXT.to_string(),
        properties: serde_json::json!({
            "contextId": context.context_id,
            "memorySpaceId": context.memory_space_id,
            "purpose": context.purpose,
            "depth": context.depth,
        }),
    }
}

pub fn entity_node(name: &str) -> GraphNode {
    GraphNode {
        id: entity_node_id(name),
        label: LABEL_ENTITY.to_string(),
        properties: serde_json::json!({ "name": name.trim().to_lowercase() }),
    }
}

pub fn contains_edge(memory_space_id: &str, child_node_id: String) -> GraphEdge {
    edge(EDGE_CONTAINS, space_node_id(memory_space_id), child_node_id)
}

pub fn references_edge(memory_id: &str, conversation_id: &str) -> GraphEdge {
    edge(
        EDGE_REFERENCES,
        memory_node_id(memory_id),
        conversation_node_id(conversation_id),
    )
}

pub fn extracted_from_edge(fact_id: &str, conversation_id: &str) -> GraphEdge {
    edge(
        EDGE_EXTRACTED_FROM,
        fact_node_id(fact_id),
        conversation_node_id(conversation_id),
    )
}

pub fn mentions_edge(fact_id: &str, entity_name: &str) -> GraphEdge {
    edge(EDGE_MENTIONS, fact_node_id(fact_id), entity_node_id(entity_name))
}

pub fn supersedes_edge(new_fact_id: &str, old_fact_id: &str) -> GraphEdge {
    edge(EDGE_SUPERSEDES, fact_node_id(new_fact_id), fact_node_id(old_fact_id))
}

pub fn child_of_edge(child_context_id: &str, parent_context_id: &str) -> GraphEdge {
    edge(
        EDGE_CHILD_OF,
        context_node_id(child_context_id),
        context_node_id(parent_context_id),
    )
}

pub fn triggered_by_edge(context_id: &str, conversation_id: &str) -> GraphEdge {
    edge(
        EDGE_TRIGGERED_BY,
        context_node_id(context_id),
        conversation_node_id(conversation_id),
    )
}

pub fn involves_edge(context_id: &str, user_id: &str) -> GraphEdge {
    edge(EDGE_INVOLVES, context_node_id(context_id), user_node_id(user_id))
}

pub fn sent_to_edge(from_space_id: &str, to_space_id: &str) -> GraphEdge {
    edge(EDGE_SENT_TO, space_node_id(from_space_id), space_node_id(to_space_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_ids_are_normalized() {
        assert_eq!(entity_node_id("  Alice "), "entity:alice");
        assert_eq!(entity_node_id("Alice"), entity_node_id("alice"));
    }

    #[test]
    fn edge_ids_are_deterministic() {
        let a = mentions_edge("f1", "Alice");
        let b = mentions_edge("f1", "alice");
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn parse_node_id_round_trips() {
        assert_eq!(parse_node_id(&memory_node_id("m1")), Some(("memory", "m1")));
        assert_eq!(parse_node_id("plain"), None);
    }
}
