//! Retrieval and ranking pipeline: partition fan-out, score dedup,
//! document-backed filtering, the expanding retrieval loop, relevance
//! feedback, reranking, pair combination and result merging.

pub mod combine;
pub mod dedup;
pub mod expand;
pub mod fanout;
pub mod feedback;
pub mod filters;
pub mod merge;
pub mod rerank;
pub mod remote;
pub mod selector;

pub use combine::{Combiner, PairCandidate};
pub use dedup::{dedupe_by_score, dedupe_results};
pub use expand::ExpandingRetriever;
pub use fanout::FanoutSearcher;
pub use feedback::FeedbackAdjuster;
pub use filters::{
    parse_keyword_filters, DateField, DateFilter, DocTypeFilter, Filter, FilterChain,
    JurisdictionFilter, KeywordFilter,
};
pub use merge::{merge_federated, merge_single_paired, FederatedEntry, Merged};
pub use remote::ExtensionClient;
pub use rerank::rerank_results;
pub use selector::IndexSelector;
