//! Tiered candidate matching: exact triple > slot-only > tag-only, ties
//! resolved by highest confidence then newest creation time.

use engram_core::models::Fact;

use crate::signature::{same_object, SlotSignature};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchTier {
    ExactTriple = 0,
    SlotOnly = 1,
    TagOnly = 2,
}

#[derive(Debug, Clone)]
pub struct RankedMatch {
    pub fact: Fact,
    pub tier: MatchTier,
}

/// Rank signature-level and tag-level matches against the candidate.
/// `signature_matches` share the candidate's (subject, predicate, fact_type)
/// head; `tag_matches` merely overlap on tags and only ever rank TagOnly.
pub fn rank_matches(
    candidate: &Fact,
    signature_matches: Vec<Fact>,
    tag_matches: Vec<Fact>,
    slot_matching: bool,
) -> Vec<RankedMatch> {
    let candidate_signature = SlotSignature::of(candidate);
    let mut ranked: Vec<RankedMatch> = Vec::new();

    for fact in signature_matches {
        if fact.fact_id == candidate.fact_id {
            continue;
        }
        let signature = SlotSignature::of(&fact);
        if !candidate_signature.matches(&signature, slot_matching) {
            continue;
        }
        let tier = if same_object(candidate, &fact) {
            MatchTier::ExactTriple
        } else {
            MatchTier::SlotOnly
        };
        ranked.push(RankedMatch { fact, tier });
    }

    for fact in tag_matches {
        if fact.fact_id == candidate.fact_id {
            continue;
        }
        if ranked.iter().any(|m| m.fact.fact_id == fact.fact_id) {
            continue;
        }
        ranked.push(RankedMatch {
            fact,
            tier: MatchTier::TagOnly,
        });
    }

    ranked.sort_by(|a, b| {
        a.tier
            .cmp(&b.tier)
            .then_with(|| b.fact.confidence.cmp(&a.fact.confidence))
            .then_with(|| b.fact.created_at.cmp(&a.fact.created_at))
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::models::{FactStatus, FactType};

    fn fact(id: &str, object: &str, confidence: u8, created_at: i64) -> Fact {
        Fact {
            fact_id: id.into(),
            memory_space_id: "s".into(),
            fact: format!("alice prefers {object}"),
            fact_type: FactType::Preference,
            subject: Some("alice".into()),
            predicate: Some("prefers".into()),
            object: Some(object.into()),
            slots: Default::default(),
            confidence,
            source_type: "manual".into(),
            source_ref: None,
            tags: vec![],
            status: FactStatus::Active,
            supersedes: vec![],
            superseded_by: None,
            created_at,
        }
    }

    #[test]
    fn exact_triple_outranks_slot_only() {
        let candidate = fact("cand", "typescript", 90, 100);
        let ranked = rank_matches(
            &candidate,
            vec![fact("slot", "python", 99, 200), fact("exact", "typescript", 10, 50)],
            vec![],
            true,
        );
        assert_eq!(ranked[0].fact.fact_id, "exact");
        assert_eq!(ranked[0].tier, MatchTier::ExactTriple);
        assert_eq!(ranked[1].tier, MatchTier::SlotOnly);
    }

    #[test]
    fn ties_break_on_confidence_then_recency() {
        let candidate = fact("cand", "typescript", 90, 100);
        let ranked = rank_matches(
            &candidate,
            vec![
                fact("low_old", "python", 50, 10),
                fact("high", "rust", 80, 10),
                fact("low_new", "go", 50, 99),
            ],
            vec![],
            true,
        );
        let ids: Vec<_> = ranked.iter().map(|m| m.fact.fact_id.as_str()).collect();
        assert_eq!(ids, vec!["high", "low_new", "low_old"]);
    }
}
