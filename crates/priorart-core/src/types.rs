//! Domain types shared by the index, retrieval and API layers.

use serde::{Deserialize, Serialize};

/// Dense query/document embedding. Dimensionality is a deployment
/// constant (`index.dim` in the config), never hardcoded.
pub type QueryVector = Vec<f32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    Patent,
    Npl,
}

/// Bibliographic record fetched from the document store.
///
/// Dates are ISO `YYYY-MM-DD` strings, parsed on demand by the date
/// filters. `title` is optional because the backing database has
/// defects; results without a title are dropped during deduplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(rename = "type")]
    pub doc_type: DocType,
    #[serde(default)]
    pub publication_date: Option<String>,
    #[serde(default)]
    pub filing_date: Option<String>,
    #[serde(default)]
    pub priority_date: Option<String>,
    #[serde(default)]
    pub full_text: Option<String>,
    #[serde(default)]
    pub first_claim: Option<String>,
    #[serde(default)]
    pub www_link: Option<String>,
}

impl DocumentRecord {
    /// Two-letter country code prefix of the document id (patents).
    pub fn jurisdiction(&self) -> &str {
        self.id.get(..2).unwrap_or("")
    }

    pub fn is_patent(&self) -> bool {
        self.doc_type == DocType::Patent
    }
}

/// Raw hit from one vector index partition. Ephemeral; carries only
/// what the dedup/filter stages need before records are fetched.
///
/// `score` is cosine similarity, higher is better. This is the single
/// internal convention; backend adapters convert whatever their
/// structure reports.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredHit {
    pub doc_id: String,
    pub partition_id: String,
    pub score: f32,
}

/// A scored hit enriched with its document record and optional
/// presentation fields. Owned by one request, never shared.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub doc: DocumentRecord,
    pub partition_id: String,
    pub score: f32,
    pub snippet: Option<String>,
    pub mapping: Option<Vec<MappingEntry>>,
    pub image: Option<String>,
}

impl SearchResult {
    pub fn new(doc: DocumentRecord, partition_id: String, score: f32) -> Self {
        Self {
            doc,
            partition_id,
            score,
            snippet: None,
            mapping: None,
            image: None,
        }
    }

    pub fn from_hit(hit: &ScoredHit, doc: DocumentRecord) -> Self {
        Self::new(doc, hit.partition_id.clone(), hit.score)
    }
}

/// One element-mapping entry produced by the snippet extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingEntry {
    pub query_phrase: String,
    pub doc_phrase: String,
}

/// Explicit relevant/irrelevant document feedback attached to a query
/// as an opaque JSON blob (the `lq` parameter).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelevanceFeedback {
    #[serde(default)]
    pub relevant: Vec<String>,
    #[serde(default)]
    pub irrelevant: Vec<String>,
}

impl RelevanceFeedback {
    /// Lenient parse: anything that is not a JSON object with the
    /// expected arrays yields empty feedback, never an error.
    pub fn from_blob(blob: &str) -> Self {
        serde_json::from_str(blob).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.relevant.is_empty() && self.irrelevant.is_empty()
    }

    /// Whether `id` was already judged by the user in either set.
    pub fn contains(&self, id: &str) -> bool {
        self.relevant.iter().any(|x| x == id) || self.irrelevant.iter().any(|x| x == id)
    }
}

/// L2-normalize a vector in place. No-op on the zero vector.
pub fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-12 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Dot product; equals cosine similarity when both sides are normalized.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Cosine distance in `[0, 2]`; used by the pair combiner's coverage
/// matrix where lower is better.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na <= 1e-12 || nb <= 1e-12 {
        return 1.0;
    }
    1.0 - dot(a, b) / (na * nb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_parses_valid_blob() {
        let fb = RelevanceFeedback::from_blob(r#"{"relevant":["US123A"],"irrelevant":["EP9B"]}"#);
        assert_eq!(fb.relevant, vec!["US123A"]);
        assert_eq!(fb.irrelevant, vec!["EP9B"]);
        assert!(fb.contains("US123A"));
        assert!(fb.contains("EP9B"));
        assert!(!fb.contains("GB1C"));
    }

    #[test]
    fn feedback_tolerates_garbage() {
        assert!(RelevanceFeedback::from_blob("").is_empty());
        assert!(RelevanceFeedback::from_blob("not json").is_empty());
        assert!(RelevanceFeedback::from_blob("[1,2,3]").is_empty());
        assert!(RelevanceFeedback::from_blob(r#"{"other":true}"#).is_empty());
    }

    #[test]
    fn jurisdiction_is_id_prefix() {
        let doc = DocumentRecord {
            id: "US7654321B2".to_string(),
            title: Some("t".to_string()),
            abstract_text: "a".to_string(),
            doc_type: DocType::Patent,
            publication_date: None,
            filing_date: None,
            priority_date: None,
            full_text: None,
            first_claim: None,
            www_link: None,
        };
        assert_eq!(doc.jurisdiction(), "US");
    }

    #[test]
    fn normalize_produces_unit_vector() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        assert!((dot(&v, &v) - 1.0).abs() < 1e-6);
    }
}
