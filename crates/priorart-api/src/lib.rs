//! Request-level surface of the search service: parameter validation,
//! the search engine orchestrator, mode routing and response assembly.

pub mod assemble;
pub mod engine;
pub mod params;
pub mod routes;

pub use assemble::ResultAssembler;
pub use engine::{SearchEngine, SearchEngineBuilder, SearchResponse};
pub use params::{DateTypeParam, DocTypeParam, SearchParams};
pub use routes::{routes, Route, RouteKind, SearchMode};
