//! Document-backed result filters.
//!
//! Filters run after score dedup, once bibliographic records are in
//! hand. Every filter fails closed: a record missing the field a
//! filter needs is excluded rather than waved through.

use std::collections::HashSet;

use chrono::NaiveDate;
use regex::{Regex, RegexBuilder};
use tracing::debug;

use priorart_core::traits::DocumentStore;
use priorart_core::types::{DocType, DocumentRecord, ScoredHit, SearchResult};

pub trait Filter: Send + Sync {
    fn passes(&self, doc: &DocumentRecord) -> bool;
}

/// Which date field of the record a [`DateFilter`] inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Publication,
    Filing,
    Priority,
}

impl DateField {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "publication" => Some(Self::Publication),
            "filing" => Some(Self::Filing),
            "priority" => Some(Self::Priority),
            _ => None,
        }
    }
}

/// Inclusive date-window filter over one of the record's date fields.
pub struct DateFilter {
    field: DateField,
    after: Option<NaiveDate>,
    before: Option<NaiveDate>,
}

impl DateFilter {
    /// Bounds are ISO `YYYY-MM-DD` strings; an unparseable bound is a
    /// construction error, not a silent no-op.
    pub fn new(
        field: DateField,
        after: Option<&str>,
        before: Option<&str>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            field,
            after: after.map(parse_iso_date).transpose()?,
            before: before.map(parse_iso_date).transpose()?,
        })
    }

    pub fn is_unbounded(&self) -> bool {
        self.after.is_none() && self.before.is_none()
    }
}

fn parse_iso_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("invalid date: {s:?} (expected YYYY-MM-DD)"))
}

impl Filter for DateFilter {
    fn passes(&self, doc: &DocumentRecord) -> bool {
        let raw = match self.field {
            DateField::Publication => doc.publication_date.as_deref(),
            DateField::Filing => doc.filing_date.as_deref(),
            DateField::Priority => doc.priority_date.as_deref(),
        };
        // Fail closed on a missing or malformed record date.
        let Some(date) = raw.and_then(|s| parse_iso_date(s).ok()) else {
            return false;
        };
        if self.after.is_some_and(|bound| date < bound) {
            return false;
        }
        if self.before.is_some_and(|bound| date > bound) {
            return false;
        }
        true
    }
}

/// Whole-word keyword filter with a small wildcard grammar:
/// `*` matches any word-character run, `?` one optional word
/// character, `_` one optional underscore/hyphen/space. A leading `-`
/// negates the filter. Matching is case-insensitive over the title and
/// abstract.
pub struct KeywordFilter {
    pattern: Regex,
    negated: bool,
}

impl KeywordFilter {
    pub fn new(keyword: &str) -> anyhow::Result<Self> {
        let (negated, word) = match keyword.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, keyword),
        };
        anyhow::ensure!(!word.is_empty(), "empty keyword filter");
        let mut pattern = String::from(r"\b");
        let mut prev_wildcard = None;
        for c in word.chars() {
            let wildcard = match c {
                '*' => Some(r"\w*"),
                '?' => Some(r"\w?"),
                '_' => Some(r"[_\-\s]?"),
                _ => None,
            };
            match wildcard {
                Some(expansion) => {
                    // Runs of the same wildcard collapse to one.
                    if prev_wildcard != Some(c) {
                        pattern.push_str(expansion);
                    }
                    prev_wildcard = Some(c);
                }
                None => {
                    pattern.push_str(&regex::escape(&c.to_string()));
                    prev_wildcard = None;
                }
            }
        }
        pattern.push_str(r"\b");
        let pattern = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| anyhow::anyhow!("invalid keyword filter {keyword:?}: {e}"))?;
        Ok(Self { pattern, negated })
    }
}

impl Filter for KeywordFilter {
    fn passes(&self, doc: &DocumentRecord) -> bool {
        let title = doc.title.as_deref().unwrap_or("");
        let text = format!("{} {}", title, doc.abstract_text);
        self.pattern.is_match(&text) != self.negated
    }
}

/// Keeps only documents whose id starts with one of the given
/// two-letter country codes.
pub struct JurisdictionFilter {
    allowed: HashSet<String>,
}

impl JurisdictionFilter {
    /// Codes come comma-separated from the request, e.g. `"US,EP"`.
    pub fn new(codes: &str) -> Self {
        Self {
            allowed: codes
                .split(',')
                .map(|c| c.trim().to_uppercase())
                .filter(|c| !c.is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

impl Filter for JurisdictionFilter {
    fn passes(&self, doc: &DocumentRecord) -> bool {
        self.allowed.contains(doc.jurisdiction())
    }
}

pub struct DocTypeFilter {
    doc_type: DocType,
}

impl DocTypeFilter {
    pub fn new(doc_type: DocType) -> Self {
        Self { doc_type }
    }
}

impl Filter for DocTypeFilter {
    fn passes(&self, doc: &DocumentRecord) -> bool {
        doc.doc_type == self.doc_type
    }
}

/// Ordered conjunction of filters applied to fetched records.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: Box<dyn Filter>) {
        self.filters.push(filter);
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn passes(&self, doc: &DocumentRecord) -> bool {
        self.filters.iter().all(|f| f.passes(doc))
    }

    /// Fetch records for `hits` and keep the ones that pass every
    /// filter, in order, short-circuiting once `max_keep` survive.
    /// A hit whose record cannot be fetched is excluded.
    pub fn apply(
        &self,
        hits: &[ScoredHit],
        store: &dyn DocumentStore,
        max_keep: usize,
    ) -> anyhow::Result<Vec<SearchResult>> {
        let ids: Vec<String> = hits.iter().map(|h| h.doc_id.clone()).collect();
        let records = store.get_many(&ids)?;
        let mut kept = Vec::with_capacity(max_keep.min(hits.len()));
        for (hit, record) in hits.iter().zip(records) {
            if kept.len() == max_keep {
                break;
            }
            let Some(doc) = record else {
                debug!(doc = %hit.doc_id, "no record for hit, excluding");
                continue;
            };
            if self.passes(&doc) {
                kept.push(SearchResult::from_hit(hit, doc));
            }
        }
        Ok(kept)
    }
}

/// Extract backtick keyword filters from a raw query.
///
/// `` beamforming `antenna` `-drone` `` yields filters for `antenna`
/// and `-drone`; negated tokens are removed from the query text while
/// positive tokens stay in place (without the backticks) so they still
/// contribute to the embedding.
pub fn parse_keyword_filters(query: &str) -> anyhow::Result<(String, Vec<KeywordFilter>)> {
    // Unwrap: the pattern is a literal and compiles.
    #[allow(clippy::unwrap_used)]
    let token_re = Regex::new(r"`(-?[\w*?]+)`").unwrap();

    let mut filters = Vec::new();
    for cap in token_re.captures_iter(query) {
        filters.push(KeywordFilter::new(&cap[1])?);
    }

    let mut cleaned = String::with_capacity(query.len());
    let mut last = 0;
    for m in token_re.find_iter(query) {
        cleaned.push_str(&query[last..m.start()]);
        let token = &query[m.start() + 1..m.end() - 1];
        if !token.starts_with('-') {
            cleaned.push_str(token);
        }
        last = m.end();
    }
    cleaned.push_str(&query[last..]);
    let cleaned = cleaned.replace('`', " ");
    Ok((cleaned.split_whitespace().collect::<Vec<_>>().join(" "), filters))
}
