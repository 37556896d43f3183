//! Slot signatures: the normalized identity a belief is matched under.

use engram_core::models::{Fact, FactType};

/// Normalized `(subject, predicate, fact_type)` head plus declared slot keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSignature {
    pub subject: Option<String>,
    pub predicate: Option<String>,
    pub fact_type: FactType,
    pub slot_keys: Vec<String>,
}

pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

impl SlotSignature {
    pub fn of(fact: &Fact) -> Self {
        let mut slot_keys: Vec<String> = fact.slots.keys().map(|k| normalize(k)).collect();
        slot_keys.sort();
        Self {
            subject: fact.subject.as_deref().map(normalize),
            predicate: fact.predicate.as_deref().map(normalize),
            fact_type: fact.fact_type,
            slot_keys,
        }
    }

    /// True when the triple head is present enough to index on.
    pub fn has_triple_head(&self) -> bool {
        self.subject.is_some() && self.predicate.is_some()
    }

    /// Signature equality, optionally ignoring slot keys when slot matching
    /// is disabled.
    pub fn matches(&self, other: &SlotSignature, slot_matching: bool) -> bool {
        if self.subject != other.subject
            || self.predicate != other.predicate
            || self.fact_type != other.fact_type
        {
            return false;
        }
        !slot_matching || self.slot_keys == other.slot_keys
    }
}

/// Normalized object equality; both absent counts as equal.
pub fn same_object(a: &Fact, b: &Fact) -> bool {
    match (&a.object, &b.object) {
        (Some(x), Some(y)) => normalize(x) == normalize(y),
        (None, None) => normalize(&a.fact) == normalize(&b.fact),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::models::Fact;

    fn fact(subject: &str, predicate: &str, object: &str) -> Fact {
        Fact {
            fact_id: "f".into(),
            memory_space_id: "s".into(),
            fact: format!("{subject} {predicate} {object}"),
            fact_type: FactType::Preference,
            subject: Some(subject.into()),
            predicate: Some(predicate.into()),
            object: Some(object.into()),
            slots: Default::default(),
            confidence: 80,
            source_type: "manual".into(),
            source_ref: None,
            tags: vec![],
            status: Default::default(),
            supersedes: vec![],
            superseded_by: None,
            created_at: 0,
        }
    }

    #[test]
    fn signature_normalizes_case_and_whitespace() {
        let a = SlotSignature::of(&fact(" Alice ", "Prefers", "TypeScript"));
        let b = SlotSignature::of(&fact("alice", "prefers", "Python"));
        assert!(a.matches(&b, true));
    }

    #[test]
    fn object_comparison_is_case_insensitive() {
        assert!(same_object(
            &fact("a", "p", "TypeScript"),
            &fact("a", "p", "typescript")
        ));
        assert!(!same_object(
            &fact("a", "p", "TypeScript"),
            &fact("a", "p", "Python")
        ));
    }
}
