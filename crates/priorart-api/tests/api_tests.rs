//! End-to-end tests of the engine operations over a temp index and
//! the deterministic fakes.

use std::path::Path;
use std::sync::Arc;

use priorart_core::config::AppConfig;
use priorart_core::fakes::{
    patent, FixedClassifier, HashingEmbedder, LexicalReranker, StaticDocumentStore,
    WordFeatureExtractor,
};
use priorart_core::traits::{Reranker, TextEmbedder};
use priorart_core::types::DocumentRecord;
use priorart_core::Error;
use priorart_index::partition::{items_path, write_items};
use priorart_index::{FlatIndex, IndexCatalog};
use priorart_api::{SearchEngine, SearchParams};

const DIM: usize = 64;

fn record(
    id: &str,
    title: &str,
    abstract_text: &str,
    publication: &str,
    priority: &str,
) -> DocumentRecord {
    let mut doc = patent(id, title, abstract_text);
    doc.publication_date = Some(publication.to_string());
    doc.priority_date = Some(priority.to_string());
    doc.first_claim = Some(format!("1. {abstract_text}"));
    doc
}

fn corpus() -> Vec<DocumentRecord> {
    vec![
        record("US1A", "Phased antenna array", "A phased antenna array for millimeter wave beamforming.", "2012-03-01", "2010-06-01"),
        record("US2A", "Beam steering controller", "A controller that steers antenna beams toward mobile receivers.", "2014-07-15", "2013-01-20"),
        record("EP3B1", "Channel estimator", "A channel estimation circuit for antenna receivers.", "2011-11-30", "2009-04-02"),
        record("US4A", "Beamforming codebook", "A codebook of beamforming weights for antenna arrays.", "2016-02-10", "2015-05-05"),
        record("US5A", "Solar tracker", "A solar panel tracker following the sun.", "2013-08-08", "2012-12-01"),
        record("US6A", "Battery pack", "A battery pack with thermal protection.", "2015-01-01", "2014-03-03"),
        record("US7A", "Antenna radome", "A weatherproof radome protecting antenna elements.", "2010-05-05", "2008-09-09"),
        record("US8A", "Adaptive equalizer", "An adaptive equalizer for antenna diversity receivers.", "2017-09-09", "2016-10-10"),
    ]
}

fn write_partition(dir: &Path, id: &str, embedder: &HashingEmbedder, docs: &[&DocumentRecord]) {
    let mut vectors = Vec::new();
    let mut items = Vec::new();
    for doc in docs {
        vectors.push(embedder.embed(&doc.abstract_text).expect("embed"));
        items.push(doc.id.clone());
    }
    let index_file = dir.join(format!("{id}.flat"));
    FlatIndex::write(&index_file, DIM, &vectors).expect("write index");
    write_items(&items_path(&index_file), &items).expect("write items");
}

fn engine_with_reranker(dir: &Path, reranker: Arc<dyn Reranker>) -> SearchEngine {
    let embedder = Arc::new(HashingEmbedder::new(DIM));
    let docs = corpus();
    // Antenna documents under H04W, the energy pair under Y02E.
    let (energy, antenna): (Vec<&DocumentRecord>, Vec<&DocumentRecord>) = docs
        .iter()
        .partition(|d| d.id == "US5A" || d.id == "US6A");
    write_partition(dir, "H04W.patent", &embedder, &antenna);
    write_partition(dir, "Y02E.patent", &embedder, &energy);
    let catalog = Arc::new(IndexCatalog::discover(dir).expect("discover"));

    let mut config = AppConfig::default();
    // The hashing embedder produces modest similarities; the deployed
    // floor would drop everything.
    config.search.min_similarity = 0.01;

    SearchEngine::builder(config)
        .catalog(catalog)
        .embedder(embedder)
        .classifier(Arc::new(FixedClassifier::new(vec!["H04W".to_string()])))
        .store(Arc::new(StaticDocumentStore::from_records(docs)))
        .features(Arc::new(WordFeatureExtractor::new(DIM)))
        .reranker(reranker)
        .build()
        .expect("engine")
}

fn engine(dir: &Path) -> SearchEngine {
    engine_with_reranker(dir, Arc::new(LexicalReranker))
}

#[tokio::test]
async fn empty_query_is_a_bad_request() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let engine = engine(tmp.path());
    let err = engine
        .search(&SearchParams::new("   "))
        .await
        .expect_err("should fail");
    assert!(matches!(err, Error::BadRequest(_)));
}

#[tokio::test]
async fn oversized_window_is_a_bad_request() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let engine = engine(tmp.path());
    let mut params = SearchParams::new("antenna");
    params.n = 501;
    assert!(matches!(
        engine.search(&params).await,
        Err(Error::BadRequest(_))
    ));
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let engine = engine(tmp.path());
    let mut params = SearchParams::new("antenna beamforming array");
    params.n = 5;
    let response = engine.search(&params).await.expect("search");
    assert!(!response.results.is_empty());
    assert!(response.results.len() <= 5);
    // The reranker puts the full-overlap abstract on top.
    let top = response.results[0]["abstract"].as_str().expect("abstract");
    assert!(top.to_lowercase().contains("antenna"));
    for result in &response.results {
        assert!(result["score"].as_f64().expect("score") > 0.01);
    }
    assert_eq!(response.query, "antenna beamforming array");
}

#[tokio::test]
async fn pagination_slices_the_same_ranking() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let engine = engine(tmp.path());
    let mut full = SearchParams::new("antenna receivers");
    full.n = 6;
    let all = engine.search(&full).await.expect("search");

    let mut page = SearchParams::new("antenna receivers");
    page.n = 3;
    page.offset = 3;
    let paged = engine.search(&page).await.expect("search");

    let ids = |r: &priorart_api::SearchResponse| {
        r.results
            .iter()
            .map(|v| v["id"].as_str().unwrap_or_default().to_string())
            .collect::<Vec<_>>()
    };
    let all_ids = ids(&all);
    let page_ids = ids(&paged);
    assert_eq!(page_ids, all_ids[3..3 + page_ids.len()].to_vec());
}

#[tokio::test]
async fn date_filter_bounds_every_result() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let engine = engine(tmp.path());
    let mut params = SearchParams::new("antenna");
    params.n = 8;
    params.dtype = priorart_api::DateTypeParam::Publication;
    params.after = Some("2012-01-01".to_string());
    params.before = Some("2015-12-31".to_string());
    let response = engine.search(&params).await.expect("search");
    assert!(!response.results.is_empty());
    for result in &response.results {
        let date = result["publication_date"].as_str().expect("date");
        assert!(date >= "2012-01-01" && date <= "2015-12-31", "date {date} out of window");
    }
}

#[tokio::test]
async fn backtick_filters_constrain_and_clean_the_query() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let engine = engine(tmp.path());
    let mut params = SearchParams::new("antenna `beamforming`");
    params.n = 8;
    let response = engine.search(&params).await.expect("search");
    assert_eq!(response.query, "antenna beamforming");
    for result in &response.results {
        let text = format!(
            "{} {}",
            result["title"].as_str().unwrap_or_default(),
            result["abstract"].as_str().unwrap_or_default()
        )
        .to_lowercase();
        assert!(text.contains("beamforming"));
    }
}

#[derive(Default)]
struct CountingReranker {
    calls: std::sync::atomic::AtomicUsize,
}

impl Reranker for CountingReranker {
    fn rank(&self, _query: &str, documents: &[String]) -> anyhow::Result<Vec<usize>> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok((0..documents.len()).collect())
    }
}

#[tokio::test]
async fn reranking_gates_on_the_requested_count_not_the_offset() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let counter = Arc::new(CountingReranker::default());
    let engine = engine_with_reranker(tmp.path(), Arc::clone(&counter) as Arc<dyn Reranker>);
    // Small n with a deep offset stays under the rerank window.
    let mut params = SearchParams::new("antenna");
    params.n = 2;
    params.offset = 150;
    engine.search(&params).await.expect("search");
    assert!(counter.calls.load(std::sync::atomic::Ordering::SeqCst) > 0);
}

#[tokio::test]
async fn partition_override_scopes_the_search() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let engine = engine(tmp.path());
    // The classifier routes to H04W; the override must win.
    let mut params = SearchParams::new("solar battery energy");
    params.n = 8;
    params.idx = Some("Y02E".to_string());
    let response = engine.search(&params).await.expect("search");
    assert!(!response.results.is_empty());
    for result in &response.results {
        let index = result["index"].as_str().expect("index");
        assert!(index.starts_with("Y02E"), "result from partition {index}");
    }
}

#[tokio::test]
async fn jurisdiction_filter_keeps_only_listed_codes() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let engine = engine(tmp.path());
    let mut params = SearchParams::new("antenna receivers");
    params.n = 8;
    params.jur = Some("EP".to_string());
    let response = engine.search(&params).await.expect("search");
    assert!(!response.results.is_empty());
    for result in &response.results {
        let id = result["id"].as_str().expect("id");
        assert!(id.starts_with("EP"), "unexpected jurisdiction for {id}");
    }
}

#[tokio::test]
async fn combination_results_are_exclusive_pairs() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let engine = engine(tmp.path());
    let mut params = SearchParams::new("antenna beamforming codebook");
    params.n = 3;
    let response = engine.search_combinations(&params).await.expect("search");
    assert!(!response.results.is_empty());
    let mut seen = std::collections::HashSet::new();
    for pair in &response.results {
        let members = pair.as_array().expect("pair array");
        assert_eq!(members.len(), 2);
        for member in members {
            let id = member["id"].as_str().expect("id").to_string();
            assert!(seen.insert(id), "document reused across pairs");
        }
    }
}

#[tokio::test]
async fn combined_results_interleave_by_score() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let engine = engine(tmp.path());
    let mut params = SearchParams::new("antenna beamforming");
    params.n = 6;
    let response = engine.search_combined(&params).await.expect("search");
    assert!(!response.results.is_empty());
    assert!(response.results.len() <= 6);
    let mut singles = 0;
    for entry in &response.results {
        match entry.as_array() {
            Some(pair) => assert_eq!(pair.len(), 2),
            None => {
                assert!(entry["id"].as_str().is_some());
                singles += 1;
            }
        }
    }
    // Singles dominate when pairs add no extra coverage, but at least
    // the single list must survive the merge.
    assert!(singles > 0);
}

#[tokio::test]
async fn similar_uses_the_first_claim() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let engine = engine(tmp.path());
    let response = engine.similar("US1A", 5).await.expect("similar");
    // The claim text is the abstract, so the patent itself ranks first.
    assert_eq!(response.results[0]["id"], "US1A");
    assert!(matches!(
        engine.similar("US404X", 5).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn prior_art_cuts_off_at_the_priority_date() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let engine = engine(tmp.path());
    // US2A's priority date is 2013-01-20.
    let response = engine.prior_art("US2A", 8).await.expect("prior art");
    for result in &response.results {
        let date = result["priority_date"].as_str().expect("date");
        assert!(date <= "2013-01-20", "priority date {date} is after the cutoff");
    }
}

#[tokio::test]
async fn incoming_extension_is_disallowed_by_default() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let engine = engine(tmp.path());
    assert!(matches!(
        engine.extension_search(&SearchParams::new("antenna")).await,
        Err(Error::NotAllowed(_))
    ));
}

#[tokio::test]
async fn dispatch_routes_by_path() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let engine = engine(tmp.path());
    let params = SearchParams::new("antenna");
    assert!(engine.dispatch("/search/102", &params).await.is_ok());
    assert!(matches!(
        engine.dispatch("/similar", &params).await,
        Err(Error::BadRequest(_))
    ));
    assert!(matches!(
        engine.dispatch("/no/such/route", &params).await,
        Err(Error::NotFound(_))
    ));
}
