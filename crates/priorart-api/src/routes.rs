//! Route table mapping request paths to engine operations.
//!
//! Modes are tagged variants dispatched through one table, so adding
//! an operation means adding a row here and an arm below.

use priorart_core::{Error, Result};

use crate::engine::{SearchEngine, SearchResponse};
use crate::params::SearchParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// One reference per result (novelty).
    Single,
    /// Two complementary references per result (obviousness).
    Combination,
    /// Singles and pairs interleaved.
    Combined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Search(SearchMode),
    Similar,
    PriorArt,
    Extension,
}

#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub path: &'static str,
    pub kind: RouteKind,
}

pub fn routes() -> &'static [Route] {
    &[
        Route {
            path: "/search/102",
            kind: RouteKind::Search(SearchMode::Single),
        },
        Route {
            path: "/search/103",
            kind: RouteKind::Search(SearchMode::Combination),
        },
        Route {
            path: "/search/combined",
            kind: RouteKind::Search(SearchMode::Combined),
        },
        Route {
            path: "/similar",
            kind: RouteKind::Similar,
        },
        Route {
            path: "/prior-art",
            kind: RouteKind::PriorArt,
        },
        Route {
            path: "/extension",
            kind: RouteKind::Extension,
        },
    ]
}

impl SearchEngine {
    /// Serve a request by path through the route table.
    pub async fn dispatch(&self, path: &str, params: &SearchParams) -> Result<SearchResponse> {
        let route = routes()
            .iter()
            .find(|r| r.path == path)
            .ok_or_else(|| Error::not_found(format!("no route {path}")))?;
        match route.kind {
            RouteKind::Search(SearchMode::Single) => self.search(params).await,
            RouteKind::Search(SearchMode::Combination) => self.search_combinations(params).await,
            RouteKind::Search(SearchMode::Combined) => self.search_combined(params).await,
            RouteKind::Similar => {
                let pn = required_pn(params)?;
                self.similar(pn, params.n).await
            }
            RouteKind::PriorArt => {
                let pn = required_pn(params)?;
                self.prior_art(pn, params.n).await
            }
            RouteKind::Extension => self.extension_search(params).await,
        }
    }
}

fn required_pn(params: &SearchParams) -> Result<&str> {
    params
        .pn
        .as_deref()
        .filter(|pn| !pn.trim().is_empty())
        .ok_or_else(|| Error::bad_request("pn (patent number) is required"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_every_mode_once() {
        let table = routes();
        assert_eq!(table.len(), 6);
        let mut paths: Vec<&str> = table.iter().map(|r| r.path).collect();
        paths.sort_unstable();
        paths.dedup();
        assert_eq!(paths.len(), 6);
        assert!(table
            .iter()
            .any(|r| r.kind == RouteKind::Search(SearchMode::Combined)));
    }

    #[test]
    fn pn_is_required_for_patent_routes() {
        let params = SearchParams::new("q");
        assert!(required_pn(&params).is_err());
        let mut params = SearchParams::new("q");
        params.pn = Some("US1A".to_string());
        assert_eq!(required_pn(&params).expect("pn"), "US1A");
    }
}
