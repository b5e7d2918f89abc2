//! Smart partition routing: classify the query into technology
//! categories and search only the matching partitions.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::warn;

use priorart_core::traits::CategoryClassifier;
use priorart_index::{IndexCatalog, Partition};

pub struct IndexSelector {
    catalog: Arc<IndexCatalog>,
    classifier: Arc<dyn CategoryClassifier>,
    smart: bool,
    max_categories: usize,
    max_partitions: usize,
}

impl IndexSelector {
    pub fn new(
        catalog: Arc<IndexCatalog>,
        classifier: Arc<dyn CategoryClassifier>,
        smart: bool,
        max_categories: usize,
        max_partitions: usize,
    ) -> Self {
        Self {
            catalog,
            classifier,
            smart,
            max_categories,
            max_partitions,
        }
    }

    /// Partitions to search for `query`, in classifier confidence
    /// order. Smart routing degrades to every partition whenever the
    /// classifier fails or its categories match nothing; a broad
    /// search beats an empty one.
    pub async fn select(&self, query: &str) -> Vec<Arc<Partition>> {
        if !self.smart {
            return self.catalog.get("*").await;
        }
        let categories = match self.classifier.classify(query) {
            Ok(categories) if !categories.is_empty() => categories,
            Ok(_) => {
                warn!("classifier returned no categories, searching every partition");
                return self.catalog.get("*").await;
            }
            Err(e) => {
                warn!(error = %e, "classifier failed, searching every partition");
                return self.catalog.get("*").await;
            }
        };

        // Capped both ways: on predicted categories and on the
        // accumulated partitions, since one broad category prefix can
        // expand into many partitions.
        let mut seen: HashSet<String> = HashSet::new();
        let mut selected = Vec::new();
        for category in categories.iter().take(self.max_categories) {
            if selected.len() >= self.max_partitions {
                break;
            }
            for partition in self.catalog.get(category).await {
                if selected.len() >= self.max_partitions {
                    break;
                }
                if seen.insert(partition.id().to_string()) {
                    selected.push(partition);
                }
            }
        }
        if selected.is_empty() {
            warn!(
                categories = ?categories,
                "no partition matches the predicted categories, searching every partition"
            );
            return self.catalog.get("*").await;
        }
        selected
    }
}
