//! Rule-based classification and validation of external classifier verdicts.

use engram_core::models::{ClassifierVerdict, Fact, RevisionAction};

use crate::matcher::{MatchTier, RankedMatch};
use crate::signature::same_object;

/// Classify the candidate against the best-ranked match.
///
/// Same object with a new confidence or source merges (UPDATE); same object
/// with identical confidence and source is absorbed (NONE); a different
/// object on a real signature match supersedes. Tag-only matches never carry
/// the same belief identity, so the candidate is simply added.
pub fn rule_classify(candidate: &Fact, best: &RankedMatch) -> RevisionAction {
    if best.tier == MatchTier::TagOnly {
        return RevisionAction::Add;
    }
    if same_object(candidate, &best.fact) {
        if candidate.confidence == best.fact.confidence
            && candidate.source_type == best.fact.source_type
        {
            RevisionAction::None
        } else {
            RevisionAction::Update
        }
    } else {
        RevisionAction::Supersede
    }
}

/// Validate an external verdict: the action must be in the closed set and
/// `supersedes` must reference presented matches only. Returns None on
/// anything invalid, signalling rule-based fallback.
pub fn validate_verdict(
    verdict: &ClassifierVerdict,
    matches: &[RankedMatch],
) -> Option<(RevisionAction, Vec<String>)> {
    let action = match verdict.action.to_uppercase().as_str() {
        "ADD" => RevisionAction::Add,
        "UPDATE" => RevisionAction::Update,
        "SUPERSEDE" => RevisionAction::Supersede,
        "NONE" => RevisionAction::None,
        _ => return None,
    };

    for id in &verdict.supersedes {
        if !matches.iter().any(|m| &m.fact.fact_id == id) {
            return None;
        }
    }

    if action == RevisionAction::Supersede && verdict.supersedes.is_empty() {
        return None;
    }

    Some((action, verdict.supersedes.clone()))
}
