mod embedding_provider;
mod fact_extractor;
mod graph_adapter;
mod observer;
mod revision_classifier;

pub use embedding_provider::IEmbeddingProvider;
pub use fact_extractor::IFactExtractor;
pub use graph_adapter::{
    GraphBatchOp, GraphEdge, GraphNode, GraphQuery, IGraphAdapter, TraversalHit,
};
pub use observer::IOrchestrationObserver;
pub use revision_classifier::IRevisionClassifier;
