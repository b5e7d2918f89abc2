//! Shared wiring for the demo binaries: load the config, read the
//! corpus, and assemble a search engine over the fake collaborators.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use priorart_api::SearchEngine;
use priorart_core::config::Config;
use priorart_core::fakes::{
    FixedClassifier, HashingEmbedder, LexicalReranker, StaticDocumentStore, WordFeatureExtractor,
};
use priorart_core::types::DocumentRecord;
use priorart_index::IndexCatalog;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

pub fn load_corpus(path: &Path) -> anyhow::Result<Vec<DocumentRecord>> {
    let file = File::open(path)
        .map_err(|e| anyhow::anyhow!("cannot open corpus {}: {}", path.display(), e))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Engine over the demo collaborators: hashing embedder, in-memory
/// store, word-overlap reranker, no classifier routing.
pub fn build_engine(
    corpus: &Path,
    indexes: &Path,
    floor: Option<f32>,
) -> anyhow::Result<SearchEngine> {
    let mut config = Config::load()?.app()?;
    if let Some(floor) = floor {
        config.search.min_similarity = floor;
    }
    // The demo classifier knows nothing; route to every partition.
    config.search.smart_selection = false;

    let records = load_corpus(corpus)?;
    let dim = config.index.dim;
    let catalog = Arc::new(IndexCatalog::discover(indexes)?);
    anyhow::ensure!(
        !catalog.available().is_empty(),
        "no partitions found in {}",
        indexes.display()
    );

    SearchEngine::builder(config)
        .catalog(catalog)
        .embedder(Arc::new(HashingEmbedder::new(dim)))
        .classifier(Arc::new(FixedClassifier::new(Vec::new())))
        .store(Arc::new(StaticDocumentStore::from_records(records)))
        .features(Arc::new(WordFeatureExtractor::new(dim)))
        .reranker(Arc::new(LexicalReranker))
        .build()
}
