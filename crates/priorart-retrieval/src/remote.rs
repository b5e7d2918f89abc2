//! Outgoing federation: fan the query out to peer deployments and
//! fold their results into the local list.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::merge::FederatedEntry;

/// Body shape of a peer's `/extension` response. Unknown fields are
/// ignored; entries without a score or abstract are dropped.
#[derive(Debug, Deserialize)]
struct ExtensionResponse {
    #[serde(default)]
    results: Vec<Value>,
}

pub struct ExtensionClient {
    http: reqwest::Client,
    hosts: Vec<String>,
}

impl ExtensionClient {
    pub fn new(hosts: Vec<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, hosts })
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Query every configured peer concurrently. A peer that errors,
    /// times out or answers non-200 contributes nothing; federation
    /// never fails a local search.
    pub async fn search_all(&self, params: &[(String, String)]) -> Vec<Vec<FederatedEntry>> {
        let requests = self.hosts.iter().map(|host| self.search_one(host, params));
        futures::future::join_all(requests).await
    }

    async fn search_one(&self, host: &str, params: &[(String, String)]) -> Vec<FederatedEntry> {
        let url = format!("{}/extension", host.trim_end_matches('/'));
        let response = match self.http.get(&url).query(params).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(host = %host, error = %e, "extension request failed, skipping");
                return Vec::new();
            }
        };
        if !response.status().is_success() {
            warn!(host = %host, status = %response.status(), "extension answered non-200, skipping");
            return Vec::new();
        }
        let body: ExtensionResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(host = %host, error = %e, "extension response unparseable, skipping");
                return Vec::new();
            }
        };
        body.results
            .into_iter()
            .filter_map(|value| match entry_from_value(&value) {
                Some(entry) => Some(entry),
                None => {
                    warn!(host = %host, "extension result lacks score/abstract, dropping");
                    None
                }
            })
            .collect()
    }
}

fn entry_from_value(value: &Value) -> Option<FederatedEntry> {
    let score = value.get("score")?.as_f64()? as f32;
    let abstract_text = value.get("abstract")?.as_str()?.to_string();
    Some(FederatedEntry {
        score,
        abstract_text,
        payload: value.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entry_requires_score_and_abstract() {
        assert!(entry_from_value(&json!({"score": 0.8, "abstract": "a"})).is_some());
        assert!(entry_from_value(&json!({"score": 0.8})).is_none());
        assert!(entry_from_value(&json!({"abstract": "a"})).is_none());
        assert!(entry_from_value(&json!({"score": "high", "abstract": "a"})).is_none());
    }

    #[test]
    fn entry_passes_extra_fields_through() {
        let value = json!({"score": 0.8, "abstract": "a", "id": "US1A", "vendor": "peer"});
        let entry = entry_from_value(&value).expect("entry");
        assert_eq!(entry.payload["vendor"], "peer");
    }

    #[tokio::test]
    async fn unreachable_host_contributes_nothing() {
        let client = ExtensionClient::new(
            vec!["http://127.0.0.1:1".to_string()],
            Duration::from_millis(200),
        )
        .expect("client");
        let lists = client
            .search_all(&[("q".to_string(), "antenna".to_string())])
            .await;
        assert_eq!(lists.len(), 1);
        assert!(lists[0].is_empty());
    }
}
