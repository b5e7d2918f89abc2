//! Response assembly: enrich ranked results with presentation fields
//! and serialize them into the wire shape.

use serde_json::{json, Value};
use tracing::debug;

use priorart_core::traits::SnippetProvider;
use priorart_core::types::SearchResult;
use priorart_retrieval::merge::FederatedEntry;

pub struct ResultAssembler<'a> {
    snippets: Option<&'a dyn SnippetProvider>,
    image_base: Option<&'a str>,
    want_snippets: bool,
    want_mappings: bool,
}

impl<'a> ResultAssembler<'a> {
    pub fn new(
        snippets: Option<&'a dyn SnippetProvider>,
        image_base: Option<&'a str>,
        want_snippets: bool,
        want_mappings: bool,
    ) -> Self {
        Self {
            snippets,
            image_base,
            want_snippets,
            want_mappings,
        }
    }

    /// Serialize one result. Snippet and mapping generation is
    /// best-effort; a provider failure leaves the field null.
    pub fn assemble(&self, query: &str, mut result: SearchResult) -> Value {
        let text = result
            .doc
            .full_text
            .clone()
            .unwrap_or_else(|| result.doc.abstract_text.clone());
        if let Some(provider) = self.snippets {
            if self.want_snippets {
                result.snippet = match provider.extract(query, &text) {
                    Ok(snippet) => Some(snippet),
                    Err(e) => {
                        debug!(doc = %result.doc.id, error = %e, "snippet extraction failed");
                        None
                    }
                };
            }
            if self.want_mappings {
                result.mapping = match provider.map(query, &text) {
                    Ok(mapping) => Some(mapping),
                    Err(e) => {
                        debug!(doc = %result.doc.id, error = %e, "element mapping failed");
                        None
                    }
                };
            }
        }
        if result.doc.is_patent() {
            result.image = self
                .image_base
                .map(|base| format!("{}/{}/thumbnails/1", base.trim_end_matches('/'), result.doc.id));
        }

        json!({
            "id": result.doc.id,
            "title": result.doc.title,
            "abstract": result.doc.abstract_text,
            "type": result.doc.doc_type,
            "publication_date": result.doc.publication_date,
            "filing_date": result.doc.filing_date,
            "priority_date": result.doc.priority_date,
            "www_link": result.doc.www_link,
            "index": result.partition_id,
            "score": result.score,
            "snippet": result.snippet,
            "mapping": result.mapping,
            "image": result.image,
        })
    }

    /// A reference pair serializes as a two-element array.
    pub fn assemble_pair(&self, query: &str, first: SearchResult, second: SearchResult) -> Value {
        Value::Array(vec![
            self.assemble(query, first),
            self.assemble(query, second),
        ])
    }

    /// Wrap a local result for the federated merge: score and abstract
    /// drive ordering and dedup, the serialized payload passes through.
    pub fn entry(&self, query: &str, result: SearchResult) -> FederatedEntry {
        let score = result.score;
        let abstract_text = result.doc.abstract_text.clone();
        FederatedEntry {
            score,
            abstract_text,
            payload: self.assemble(query, result),
        }
    }
}
