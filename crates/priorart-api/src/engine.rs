//! The search engine orchestrator: wires the index catalog, the
//! collaborator seams and the retrieval pipeline into the request
//! operations the routes expose.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::error;

use priorart_core::config::AppConfig;
use priorart_core::traits::{
    CategoryClassifier, DocumentStore, FeatureExtractor, Reranker, SnippetProvider, TextEmbedder,
};
use priorart_core::types::{RelevanceFeedback, SearchResult};
use priorart_core::Error;
use priorart_index::{IndexCatalog, Partition};
use priorart_retrieval::{
    dedupe_results, merge_federated, merge_single_paired, parse_keyword_filters, rerank_results,
    Combiner, DateFilter, DocTypeFilter, ExpandingRetriever, ExtensionClient, FanoutSearcher,
    FeedbackAdjuster, FilterChain, IndexSelector, JurisdictionFilter, Merged,
};
use priorart_retrieval::merge::FederatedEntry;

use crate::assemble::ResultAssembler;
use crate::params::SearchParams;

/// Size of the single-reference pool the pair combiner draws from.
const COMBINATION_POOL: usize = 100;

/// Prefix priming the embedding model's query mode.
const QUERY_PREFIX: &str = "[query] ";

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<Value>,
    pub query: String,
    pub latent_query: String,
}

pub struct SearchEngine {
    catalog: Arc<IndexCatalog>,
    selector: IndexSelector,
    embedder: Arc<dyn TextEmbedder>,
    store: Arc<dyn DocumentStore>,
    features: Arc<dyn FeatureExtractor>,
    snippets: Option<Arc<dyn SnippetProvider>>,
    reranker: Option<Arc<dyn Reranker>>,
    extensions: Option<ExtensionClient>,
    fanout: FanoutSearcher,
    config: AppConfig,
}

/// Explicit wiring of every collaborator; nothing global.
pub struct SearchEngineBuilder {
    config: AppConfig,
    catalog: Option<Arc<IndexCatalog>>,
    embedder: Option<Arc<dyn TextEmbedder>>,
    classifier: Option<Arc<dyn CategoryClassifier>>,
    store: Option<Arc<dyn DocumentStore>>,
    features: Option<Arc<dyn FeatureExtractor>>,
    snippets: Option<Arc<dyn SnippetProvider>>,
    reranker: Option<Arc<dyn Reranker>>,
}

impl SearchEngineBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            catalog: None,
            embedder: None,
            classifier: None,
            store: None,
            features: None,
            snippets: None,
            reranker: None,
        }
    }

    pub fn catalog(mut self, catalog: Arc<IndexCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn TextEmbedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn classifier(mut self, classifier: Arc<dyn CategoryClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn features(mut self, features: Arc<dyn FeatureExtractor>) -> Self {
        self.features = Some(features);
        self
    }

    pub fn snippets(mut self, snippets: Arc<dyn SnippetProvider>) -> Self {
        self.snippets = Some(snippets);
        self
    }

    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn build(self) -> anyhow::Result<SearchEngine> {
        let config = self.config;
        let catalog = self.catalog.ok_or_else(|| anyhow::anyhow!("catalog not set"))?;
        let embedder = self.embedder.ok_or_else(|| anyhow::anyhow!("embedder not set"))?;
        let classifier = self
            .classifier
            .ok_or_else(|| anyhow::anyhow!("classifier not set"))?;
        let store = self.store.ok_or_else(|| anyhow::anyhow!("document store not set"))?;
        let features = self
            .features
            .ok_or_else(|| anyhow::anyhow!("feature extractor not set"))?;

        let extensions = if config.federation.allow_outgoing
            && !config.federation.extensions.is_empty()
        {
            Some(ExtensionClient::new(
                config.federation.extensions.clone(),
                Duration::from_secs(config.federation.timeout_secs),
            )?)
        } else {
            None
        };
        let selector = IndexSelector::new(
            Arc::clone(&catalog),
            classifier,
            config.search.smart_selection,
            config.search.max_categories,
            config.search.max_partitions,
        );
        let fanout = FanoutSearcher::new(config.search.concurrency, config.search.min_similarity);

        Ok(SearchEngine {
            catalog,
            selector,
            embedder,
            store,
            features,
            snippets: self.snippets,
            reranker: self.reranker,
            extensions,
            fanout,
            config,
        })
    }
}

/// Query text with its filters split off and its vector prepared.
struct PreparedQuery {
    clean_query: String,
    vector: Vec<f32>,
    filters: FilterChain,
    feedback: RelevanceFeedback,
}

impl SearchEngine {
    pub fn builder(config: AppConfig) -> SearchEngineBuilder {
        SearchEngineBuilder::new(config)
    }

    /// Single-reference (novelty-style) search.
    pub async fn search(&self, params: &SearchParams) -> priorart_core::Result<SearchResponse> {
        self.with_deadline(self.search_single(params))
            .await
            .map_err(to_api_error)
    }

    /// Reference-pair (obviousness-style) search.
    pub async fn search_combinations(
        &self,
        params: &SearchParams,
    ) -> priorart_core::Result<SearchResponse> {
        self.with_deadline(self.combinations(params))
            .await
            .map_err(to_api_error)
    }

    /// Singles and pairs interleaved into one ranked list.
    pub async fn search_combined(
        &self,
        params: &SearchParams,
    ) -> priorart_core::Result<SearchResponse> {
        self.with_deadline(self.combined(params))
            .await
            .map_err(to_api_error)
    }

    /// Documents similar to a known patent, queried by its first claim.
    pub async fn similar(&self, pn: &str, n: usize) -> priorart_core::Result<SearchResponse> {
        let run = async {
            let (params, _) = self.claim_query(pn, n)?;
            self.search_single(&params).await
        };
        self.with_deadline(run).await.map_err(to_api_error)
    }

    /// Prior art for a known patent: its first claim as the query,
    /// cut off at the patent's priority date.
    pub async fn prior_art(&self, pn: &str, n: usize) -> priorart_core::Result<SearchResponse> {
        let run = async {
            let (mut params, doc) = self.claim_query(pn, n)?;
            let priority_date = doc.priority_date.clone().ok_or_else(|| {
                anyhow::Error::new(Error::not_found(format!(
                    "patent {pn} has no priority date"
                )))
            })?;
            params.before = Some(priority_date);
            params.dtype = crate::params::DateTypeParam::Priority;
            self.search_single(&params).await
        };
        self.with_deadline(run).await.map_err(to_api_error)
    }

    /// Whole-request deadline: an overrun drops the outstanding
    /// sub-searches and surfaces as a server error.
    async fn with_deadline<T>(
        &self,
        fut: impl std::future::Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        let limit = Duration::from_secs(self.config.search.request_timeout_secs);
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!(
                "request exceeded the {}s deadline",
                limit.as_secs()
            )),
        }
    }

    /// Entry point for searches arriving from peer deployments.
    pub async fn extension_search(
        &self,
        params: &SearchParams,
    ) -> priorart_core::Result<SearchResponse> {
        if !self.config.federation.allow_incoming {
            return Err(Error::NotAllowed(
                "incoming extension requests are disabled".to_string(),
            ));
        }
        self.search(params).await
    }

    async fn search_single(&self, params: &SearchParams) -> anyhow::Result<SearchResponse> {
        params
            .validate(self.config.search.max_result_limit)
            .map_err(anyhow::Error::new)?;
        let window = (params.n + params.offset).min(self.config.search.max_result_limit);

        let prepared = self.prepare(params)?;
        let partitions = self.partitions_for(params, &prepared.clean_query).await;
        let results = self.retrieve(&prepared, &partitions, window).await?;
        let results = self.maybe_rerank(&prepared.clean_query, results, params.n);

        let assembler = self.assembler(params);
        let mut local: Vec<FederatedEntry> = results
            .into_iter()
            .take(window)
            .map(|r| assembler.entry(&prepared.clean_query, r))
            .collect();
        if let Some(client) = &self.extensions {
            let mut lists = client.search_all(&forwarded_params(params)).await;
            lists.insert(0, std::mem::take(&mut local));
            local = merge_federated(lists);
        }

        let results = local
            .into_iter()
            .skip(params.offset)
            .take(params.n)
            .map(|entry| entry.payload)
            .collect();
        Ok(SearchResponse {
            results,
            query: prepared.clean_query,
            latent_query: params.lq.clone(),
        })
    }

    async fn combinations(&self, params: &SearchParams) -> anyhow::Result<SearchResponse> {
        let (clean_query, _, pairs) = self.pair_pool(params).await?;
        let assembler = self.assembler(params);
        let results = pairs
            .into_iter()
            .skip(params.offset)
            .take(params.n)
            .map(|(a, b)| assembler.assemble_pair(&clean_query, a, b))
            .collect();
        Ok(SearchResponse {
            results,
            query: clean_query,
            latent_query: params.lq.clone(),
        })
    }

    async fn combined(&self, params: &SearchParams) -> anyhow::Result<SearchResponse> {
        let window = (params.n + params.offset).min(self.config.search.max_result_limit);
        let (clean_query, pool, pairs) = self.pair_pool(params).await?;
        let singles: Vec<SearchResult> = pool.into_iter().take(window).collect();
        let pairs: Vec<(SearchResult, SearchResult)> = pairs.into_iter().take(window).collect();

        let assembler = self.assembler(params);
        let results = merge_single_paired(singles, pairs)
            .into_iter()
            .skip(params.offset)
            .take(params.n)
            .map(|entry| match entry {
                Merged::Single(r) => assembler.assemble(&clean_query, r),
                Merged::Pair(p) => assembler.assemble_pair(&clean_query, p.0, p.1),
            })
            .collect();
        Ok(SearchResponse {
            results,
            query: clean_query,
            latent_query: params.lq.clone(),
        })
    }

    /// Shared 103 front half: a bounded single-reference pool plus the
    /// ranked exclusive pairs drawn from it.
    #[allow(clippy::type_complexity)]
    async fn pair_pool(
        &self,
        params: &SearchParams,
    ) -> anyhow::Result<(String, Vec<SearchResult>, Vec<(SearchResult, SearchResult)>)> {
        params
            .validate(self.config.search.max_result_limit)
            .map_err(anyhow::Error::new)?;
        let window = (params.n + params.offset).min(self.config.search.max_result_limit);

        let prepared = self.prepare(params)?;
        let partitions = self.partitions_for(params, &prepared.clean_query).await;
        let mut pool = self
            .retrieve(&prepared, &partitions, COMBINATION_POOL)
            .await?;
        pool.truncate(COMBINATION_POOL);
        if pool.len() < 2 {
            return Ok((prepared.clean_query, pool, Vec::new()));
        }

        let abstracts: Vec<String> = pool.iter().map(|r| r.doc.abstract_text.clone()).collect();
        let combiner = Combiner::new(self.features.as_ref(), &prepared.clean_query, &abstracts)
            .map_err(|e| anyhow::Error::new(Error::bad_request(e.to_string())))?;
        let pairs = combiner
            .best_pairs(window)
            .into_iter()
            .map(|p| (pool[p.first].clone(), pool[p.second].clone()))
            .collect();
        Ok((prepared.clean_query, pool, pairs))
    }

    /// Expanding retrieval plus the final result-level dedup.
    async fn retrieve(
        &self,
        prepared: &PreparedQuery,
        partitions: &[Arc<Partition>],
        window: usize,
    ) -> anyhow::Result<Vec<SearchResult>> {
        let retriever = ExpandingRetriever::new(
            &self.fanout,
            self.store.as_ref(),
            self.config.search.min_similarity,
            self.config.search.max_result_limit,
        );
        let pool = retriever
            .retrieve(&prepared.vector, partitions, window, &prepared.filters)
            .await?;
        Ok(dedupe_results(pool, &prepared.feedback))
    }

    fn prepare(&self, params: &SearchParams) -> anyhow::Result<PreparedQuery> {
        let feedback = RelevanceFeedback::from_blob(&params.lq);
        let (clean_query, keyword_filters) = parse_keyword_filters(&params.q)
            .map_err(|e| anyhow::Error::new(Error::bad_request(e.to_string())))?;
        if clean_query.trim().is_empty() {
            return Err(anyhow::Error::new(Error::bad_request(
                "query contains only filters",
            )));
        }

        let mut vector = self.embedder.embed(&format!("{QUERY_PREFIX}{clean_query}"))?;
        if !feedback.is_empty() {
            let adjuster = FeedbackAdjuster::new(
                self.embedder.as_ref(),
                self.store.as_ref(),
                self.config.search.feedback_alpha,
                self.config.search.feedback_beta,
                self.config.search.feedback_gamma,
            );
            vector = adjuster.adjust(&vector, &feedback);
        }

        let mut filters = FilterChain::new();
        if let Some(doc_type) = params.doc_type.as_filter() {
            filters.push(Box::new(DocTypeFilter::new(doc_type)));
        }
        if params.after.is_some() || params.before.is_some() {
            let date_filter = DateFilter::new(
                params.dtype.as_field(),
                params.after.as_deref(),
                params.before.as_deref(),
            )
            .map_err(|e| anyhow::Error::new(Error::bad_request(e.to_string())))?;
            filters.push(Box::new(date_filter));
        }
        for filter in keyword_filters {
            filters.push(Box::new(filter));
        }
        if let Some(codes) = params.jur.as_deref() {
            let jurisdictions = JurisdictionFilter::new(codes);
            if !jurisdictions.is_empty() {
                filters.push(Box::new(jurisdictions));
            }
        }

        Ok(PreparedQuery {
            clean_query,
            vector,
            filters,
            feedback,
        })
    }

    async fn partitions_for(&self, params: &SearchParams, query: &str) -> Vec<Arc<Partition>> {
        match params.idx.as_deref() {
            Some(idx) if !idx.eq_ignore_ascii_case("auto") => self.catalog.get(idx).await,
            _ => self.selector.select(query).await,
        }
    }

    /// Reranking is gated on the requested result count, not the
    /// paginated window, so a deep offset does not switch the ranking
    /// model mid-scroll.
    fn maybe_rerank(
        &self,
        query: &str,
        results: Vec<SearchResult>,
        requested: usize,
    ) -> Vec<SearchResult> {
        match &self.reranker {
            Some(reranker) if requested < self.config.search.rerank_window => {
                rerank_results(reranker.as_ref(), query, results)
            }
            _ => results,
        }
    }

    fn assembler(&self, params: &SearchParams) -> ResultAssembler<'_> {
        ResultAssembler::new(
            self.snippets.as_deref(),
            self.config.api.image_base_url.as_deref(),
            params.snip,
            params.maps,
        )
    }

    fn claim_query(
        &self,
        pn: &str,
        n: usize,
    ) -> anyhow::Result<(SearchParams, priorart_core::types::DocumentRecord)> {
        let doc = self
            .store
            .get(pn)?
            .ok_or_else(|| anyhow::Error::new(Error::not_found(format!("patent {pn}"))))?;
        let claim = doc
            .first_claim
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                anyhow::Error::new(Error::not_found(format!("patent {pn} has no first claim")))
            })?;
        let mut params = SearchParams::new(strip_claim_number(claim));
        params.n = n;
        Ok((params, doc))
    }
}

/// Request parameters forwarded to peer deployments.
fn forwarded_params(params: &SearchParams) -> Vec<(String, String)> {
    let doc_type = match params.doc_type {
        crate::params::DocTypeParam::Patent => "patent",
        crate::params::DocTypeParam::Npl => "npl",
        crate::params::DocTypeParam::Any => "any",
    };
    vec![
        ("q".to_string(), params.q.clone()),
        ("n".to_string(), params.n.to_string()),
        ("type".to_string(), doc_type.to_string()),
    ]
}

/// Claims are stored with their number prefix (`1. An apparatus...`);
/// the prefix is noise for embedding.
fn strip_claim_number(claim: &str) -> String {
    let trimmed = claim.trim_start();
    let after_digits = trimmed.trim_start_matches(|c: char| c.is_ascii_digit());
    if after_digits.len() == trimmed.len() {
        return claim.trim().to_string();
    }
    let rest = after_digits.trim_start();
    let rest = rest
        .strip_prefix('.')
        .or_else(|| rest.strip_prefix(')'))
        .unwrap_or(rest);
    rest.trim().to_string()
}

/// Outermost error boundary: pipeline errors that carry a request
/// taxonomy pass through, everything else becomes a server error.
fn to_api_error(e: anyhow::Error) -> Error {
    match e.downcast::<Error>() {
        Ok(api_error) => api_error,
        Err(other) => {
            error!(error = %other, "unhandled failure while serving request");
            Error::Server(other.to_string())
        }
    }
}
