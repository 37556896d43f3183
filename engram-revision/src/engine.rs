//! RevisionEngine — matches, classifies, and commits one candidate belief.

use std::sync::Arc;

use tracing::{debug, warn};

use engram_core::config::RevisionConfig;
use engram_core::errors::EngramResult;
use engram_core::models::{Fact, FactStatus, NewFact, RevisionAction, RevisionDecision};
use engram_core::traits::IRevisionClassifier;
use engram_core::{mint_id, now_ms};

use engram_storage::queries::fact_ops;
use engram_storage::StorageEngine;

use crate::classifier::{rule_classify, validate_verdict};
use crate::matcher::{rank_matches, RankedMatch};
use crate::signature::SlotSignature;

/// Drives the belief-revision write path for one storage engine.
pub struct RevisionEngine {
    storage: Arc<StorageEngine>,
    config: RevisionConfig,
    classifier: Option<Arc<dyn IRevisionClassifier>>,
}

impl RevisionEngine {
    pub fn new(
        storage: Arc<StorageEngine>,
        config: RevisionConfig,
        classifier: Option<Arc<dyn IRevisionClassifier>>,
    ) -> Self {
        Self {
            storage,
            config,
            classifier,
        }
    }

    /// Store a candidate fact, running belief revision before commit.
    /// Deterministic for identical inputs; the NONE outcome is absorbing.
    pub async fn store_fact(
        &self,
        memory_space_id: &str,
        input: NewFact,
    ) -> EngramResult<RevisionDecision> {
        let candidate = Fact {
            fact_id: mint_id("fact"),
            memory_space_id: memory_space_id.to_string(),
            fact: input.fact,
            fact_type: input.fact_type,
            subject: input.subject,
            predicate: input.predicate,
            object: input.object,
            slots: input.slots,
            confidence: input.confidence.min(100),
            source_type: input.source_type,
            source_ref: input.source_ref,
            tags: input.tags,
            status: FactStatus::Active,
            supersedes: Vec::new(),
            superseded_by: None,
            created_at: now_ms(),
        };

        if !self.config.enabled {
            self.storage.facts().insert(&candidate)?;
            return Ok(RevisionDecision {
                action: RevisionAction::Add,
                fact_id: candidate.fact_id,
                superseded: Vec::new(),
            });
        }

        let ranked = self.find_matches(&candidate)?;

        let (action, supersede_ids) = match ranked.first() {
            None => (RevisionAction::Add, Vec::new()),
            Some(best) => self.decide(&candidate, best, &ranked).await,
        };

        self.commit(candidate, action, supersede_ids, &ranked)
    }

    fn find_matches(&self, candidate: &Fact) -> EngramResult<Vec<RankedMatch>> {
        let signature = SlotSignature::of(candidate);
        let pool = self.storage.pool();

        let signature_matches = if signature.has_triple_head() {
            let subject = candidate.subject.clone().unwrap_or_default();
            let predicate = candidate.predicate.clone().unwrap_or_default();
            let fact_type = candidate.fact_type;
            let space = candidate.memory_space_id.clone();
            pool.readers.with_conn(|conn| {
                fact_ops::find_by_signature(conn, &space, &subject, &predicate, fact_type)
            })?
        } else {
            Vec::new()
        };

        let tag_matches = if candidate.tags.is_empty() {
            Vec::new()
        } else {
            let space = candidate.memory_space_id.clone();
            let tags = candidate.tags.clone();
            pool.readers
                .with_conn(|conn| fact_ops::find_by_tags(conn, &space, &tags))?
        };

        Ok(rank_matches(
            candidate,
            signature_matches,
            tag_matches,
            self.config.slot_matching,
        ))
    }

    async fn decide(
        &self,
        candidate: &Fact,
        best: &RankedMatch,
        ranked: &[RankedMatch],
    ) -> (RevisionAction, Vec<String>) {
        if self.config.llm_resolution {
            if let Some(classifier) = &self.classifier {
                let match_facts: Vec<Fact> = ranked.iter().map(|m| m.fact.clone()).collect();
                match classifier.classify(candidate, &match_facts).await {
                    Ok(verdict) => match validate_verdict(&verdict, ranked) {
                        Some(validated) => return validated,
                        None => {
                            warn!(
                                action = %verdict.action,
                                "classifier verdict outside closed set, using rule-based"
                            );
                        }
                    },
                    Err(e) => {
                        warn!("classifier failed: {e}, using rule-based");
                    }
                }
            }
        }

        let action = rule_classify(candidate, best);
        let supersedes = if action == RevisionAction::Supersede {
            vec![best.fact.fact_id.clone()]
        } else {
            Vec::new()
        };
        (action, supersedes)
    }

    fn commit(
        &self,
        mut candidate: Fact,
        action: RevisionAction,
        supersede_ids: Vec<String>,
        ranked: &[RankedMatch],
    ) -> EngramResult<RevisionDecision> {
        let pool = self.storage.pool();
        let decision = match action {
            RevisionAction::Add => {
                self.storage.facts().insert(&candidate)?;
                RevisionDecision {
                    action,
                    fact_id: candidate.fact_id,
                    superseded: Vec::new(),
                }
            }
            RevisionAction::Update => {
                let target = ranked[0].fact.fact_id.clone();
                pool.writer.with_txn(|conn| {
                    fact_ops::merge_update(
                        conn,
                        &target,
                        candidate.confidence,
                        &candidate.source_type,
                        &candidate.source_ref,
                        &candidate.tags,
                    )
                })?;
                RevisionDecision {
                    action,
                    fact_id: target,
                    superseded: Vec::new(),
                }
            }
            RevisionAction::None => {
                // Absorbed: keep an audit row, invisible to default queries.
                candidate.status = FactStatus::Duplicate;
                self.storage.facts().insert(&candidate)?;
                RevisionDecision {
                    action,
                    fact_id: ranked[0].fact.fact_id.clone(),
                    superseded: Vec::new(),
                }
            }
            RevisionAction::Supersede => {
                candidate.supersedes = supersede_ids.clone();
                let new_id = candidate.fact_id.clone();
                pool.writer.with_txn(|conn| {
                    fact_ops::insert_fact(conn, &candidate)?;
                    for old_id in &supersede_ids {
                        fact_ops::mark_superseded(conn, old_id, &new_id)?;
                    }
                    Ok(())
                })?;
                RevisionDecision {
                    action,
                    fact_id: new_id,
                    superseded: supersede_ids,
                }
            }
        };

        debug!(
            action = ?decision.action,
            fact_id = %decision.fact_id,
            superseded = decision.superseded.len(),
            "belief revision committed"
        );
        Ok(decision)
    }
}
