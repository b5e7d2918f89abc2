//! Vector index partitions and their catalog.
//!
//! A partition is one ANN structure (flat or IVF) plus an item
//! resolver mapping dense integer ids to external document ids. The
//! catalog discovers partition files on disk, loads them lazily and
//! caches them for the process lifetime.

pub mod backend;
pub mod catalog;
pub mod flat;
pub mod ivf;
pub mod partition;

pub use backend::{AnnBackend, BackendKind};
pub use catalog::IndexCatalog;
pub use flat::FlatIndex;
pub use ivf::IvfIndex;
pub use partition::Partition;
