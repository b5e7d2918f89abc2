//! Validated search request parameters.

use chrono::NaiveDate;
use serde::Deserialize;

use priorart_core::types::DocType;
use priorart_core::{Error, Result};
use priorart_retrieval::filters::DateField;

/// Requested document type. `Any` disables the type filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocTypeParam {
    Patent,
    Npl,
    Any,
}

impl DocTypeParam {
    pub fn as_filter(self) -> Option<DocType> {
        match self {
            DocTypeParam::Patent => Some(DocType::Patent),
            DocTypeParam::Npl => Some(DocType::Npl),
            DocTypeParam::Any => None,
        }
    }
}

/// Which record date the `after`/`before` window applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateTypeParam {
    Publication,
    Filing,
    Priority,
}

impl DateTypeParam {
    pub fn as_field(self) -> DateField {
        match self {
            DateTypeParam::Publication => DateField::Publication,
            DateTypeParam::Filing => DateField::Filing,
            DateTypeParam::Priority => DateField::Priority,
        }
    }
}

/// One search request. Deserializes from the query-string shape the
/// routes expose; defaults follow the original protocol.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// Query text; may embed backtick keyword filters.
    pub q: String,
    /// Opaque relevance-feedback JSON blob.
    pub lq: String,
    /// Number of results to return.
    pub n: usize,
    /// Pagination offset into the ranked list.
    pub offset: usize,
    #[serde(rename = "type")]
    pub doc_type: DocTypeParam,
    /// Partition selector override; `auto` keeps smart selection.
    pub idx: Option<String>,
    /// Attach extracted snippets to results.
    pub snip: bool,
    /// Attach element mappings to results.
    pub maps: bool,
    /// Inclusive lower date bound, ISO `YYYY-MM-DD`.
    pub after: Option<String>,
    /// Inclusive upper date bound, ISO `YYYY-MM-DD`.
    pub before: Option<String>,
    pub dtype: DateTypeParam,
    /// Comma-separated jurisdiction allow-list, e.g. `"US,EP"`.
    pub jur: Option<String>,
    /// Patent number for the similar / prior-art routes.
    pub pn: Option<String>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            q: String::new(),
            lq: String::new(),
            n: 10,
            offset: 0,
            doc_type: DocTypeParam::Patent,
            idx: None,
            snip: false,
            maps: false,
            after: None,
            before: None,
            dtype: DateTypeParam::Priority,
            jur: None,
            pn: None,
        }
    }
}

impl SearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            q: query.into(),
            ..Self::default()
        }
    }

    /// Reject malformed requests before any work is done.
    pub fn validate(&self, max_results: usize) -> Result<()> {
        if self.q.trim().is_empty() {
            return Err(Error::bad_request("query text cannot be empty"));
        }
        if self.n == 0 {
            return Err(Error::bad_request("n must be at least 1"));
        }
        if self.n > max_results {
            return Err(Error::bad_request(format!(
                "n must not exceed {max_results}"
            )));
        }
        for bound in [&self.after, &self.before].into_iter().flatten() {
            if NaiveDate::parse_from_str(bound, "%Y-%m-%d").is_err() {
                return Err(Error::bad_request(format!(
                    "invalid date {bound:?} (expected YYYY-MM-DD)"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_protocol() {
        let p = SearchParams::new("antenna");
        assert_eq!(p.n, 10);
        assert_eq!(p.offset, 0);
        assert_eq!(p.doc_type, DocTypeParam::Patent);
        assert_eq!(p.dtype, DateTypeParam::Priority);
        assert!(!p.snip && !p.maps);
        assert!(p.validate(500).is_ok());
    }

    #[test]
    fn rejects_empty_query_and_bad_window() {
        assert!(SearchParams::new("  ").validate(500).is_err());
        let mut p = SearchParams::new("antenna");
        p.n = 0;
        assert!(p.validate(500).is_err());
        p.n = 501;
        assert!(p.validate(500).is_err());
    }

    #[test]
    fn rejects_malformed_dates() {
        let mut p = SearchParams::new("antenna");
        p.after = Some("2010-13-40".to_string());
        assert!(p.validate(500).is_err());
        p.after = Some("2010-01-01".to_string());
        p.before = Some("01/01/2012".to_string());
        assert!(p.validate(500).is_err());
        p.before = Some("2012-01-01".to_string());
        assert!(p.validate(500).is_ok());
    }

    #[test]
    fn deserializes_from_query_shape() {
        let p: SearchParams = serde_json::from_str(
            r#"{"q":"fuel cell","n":25,"type":"npl","dtype":"filing","snip":true}"#,
        )
        .expect("params");
        assert_eq!(p.q, "fuel cell");
        assert_eq!(p.n, 25);
        assert_eq!(p.doc_type, DocTypeParam::Npl);
        assert_eq!(p.dtype, DateTypeParam::Filing);
        assert!(p.snip);
    }
}
