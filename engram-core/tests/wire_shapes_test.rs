//! Serde wire shapes: enum spellings and event payload fields are part of
//! the public contract consumed by bridges.

use engram_core::models::*;

#[test]
fn enum_spellings_match_the_wire_contract() {
    assert_eq!(serde_json::to_string(&SpaceType::Personal).unwrap(), "\"personal\"");
    assert_eq!(
        serde_json::to_string(&ConversationType::UserAgent).unwrap(),
        "\"user-agent\""
    );
    assert_eq!(serde_json::to_string(&ConversationType::A2a).unwrap(), "\"a2a\"");
    assert_eq!(serde_json::to_string(&ContentType::Summarized).unwrap(), "\"summarized\"");
    assert_eq!(serde_json::to_string(&FactStatus::Superseded).unwrap(), "\"superseded\"");
    assert_eq!(serde_json::to_string(&FactType::Preference).unwrap(), "\"preference\"");
    assert_eq!(serde_json::to_string(&RevisionAction::Supersede).unwrap(), "\"SUPERSEDE\"");
    assert_eq!(serde_json::to_string(&LayerStatus::InProgress).unwrap(), "\"in_progress\"");
    assert_eq!(
        serde_json::to_string(&OrchestrationLayer::MemorySpace).unwrap(),
        "\"memorySpace\""
    );
}

#[test]
fn layer_update_omits_absent_optionals() {
    let update = LayerUpdate::new("orch_1", OrchestrationLayer::Facts, LayerStatus::Complete);
    let wire = serde_json::to_value(&update).unwrap();
    assert!(wire.get("error").is_none());
    assert!(wire.get("revision_action").is_none());
    assert_eq!(wire["layer"], "facts");
    assert_eq!(wire["status"], "complete");
}

#[test]
fn extracted_fact_deserializes_with_defaults() {
    let parsed: ExtractedFact =
        serde_json::from_str(r#"{ "fact": "Alice prefers TypeScript" }"#).unwrap();
    assert_eq!(parsed.fact_type, FactType::Knowledge);
    assert_eq!(parsed.confidence, 50);
    assert!(parsed.slots.is_empty());
}
