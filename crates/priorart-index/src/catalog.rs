//! Partition discovery and the process-lifetime partition cache.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::backend::BackendKind;
use crate::partition::{items_path, Partition};

/// Discovers partition files in a directory and hands out loaded
/// [`Partition`]s.
///
/// Loading is expensive (seconds for large partitions), so loaded
/// partitions are cached for the process lifetime — a deliberate trade
/// of memory for latency; partition count and sizes are bounded at
/// deployment time. Concurrent first access to the same partition is
/// single-flighted through a per-id `OnceCell`: the slot map lock is
/// held only to fetch the cell, never across the disk load.
pub struct IndexCatalog {
    discovered: BTreeMap<String, (BackendKind, PathBuf)>,
    slots: Mutex<HashMap<String, Arc<OnceCell<Arc<Partition>>>>>,
}

impl IndexCatalog {
    /// Scan `dir` for index files of the enabled backend types with a
    /// sibling items file.
    pub fn discover(dir: &Path) -> anyhow::Result<Self> {
        let mut discovered = BTreeMap::new();
        for entry in walkdir::WalkDir::new(dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            let Some(kind) = BackendKind::from_path(path) else {
                continue;
            };
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !items_path(path).is_file() {
                warn!(partition = id, "index file has no items resolver, skipping");
                continue;
            }
            discovered.insert(id.to_string(), (kind, path.to_path_buf()));
        }
        debug!(dir = %dir.display(), partitions = discovered.len(), "catalog scan complete");
        Ok(Self {
            discovered,
            slots: Mutex::new(HashMap::new()),
        })
    }

    pub fn available(&self) -> BTreeSet<String> {
        self.discovered.keys().cloned().collect()
    }

    /// Resolve a selector to loaded partitions.
    ///
    /// `"*"` and `"all"` return every discovered partition; any other
    /// value is a prefix match against discovered ids (so `"H04W"`
    /// matches `H04W.patent` and `H04W.npl`). Unknown selectors yield
    /// an empty list, not an error. Partitions that fail to load are
    /// excluded with a warning.
    pub async fn get(&self, selector: &str) -> Vec<Arc<Partition>> {
        let ids: Vec<String> = if selector == "*" || selector.eq_ignore_ascii_case("all") {
            self.discovered.keys().cloned().collect()
        } else {
            self.discovered
                .keys()
                .filter(|id| id.starts_with(selector))
                .cloned()
                .collect()
        };

        let mut partitions = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(partition) = self.load(&id).await {
                partitions.push(partition);
            }
        }
        partitions
    }

    async fn load(&self, id: &str) -> Option<Arc<Partition>> {
        let (kind, path) = self.discovered.get(id)?.clone();
        let cell = {
            let mut slots = self.slots.lock().ok()?;
            slots
                .entry(id.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let id_owned = id.to_string();
        let loaded = cell
            .get_or_try_init(|| async {
                let id = id_owned.clone();
                debug!(partition = %id, path = %path.display(), "loading partition");
                let partition =
                    tokio::task::spawn_blocking(move || Partition::load(&id, kind, &path))
                        .await
                        .map_err(anyhow::Error::from)??;
                Ok::<_, anyhow::Error>(Arc::new(partition))
            })
            .await;

        match loaded {
            Ok(partition) => Some(Arc::clone(partition)),
            Err(e) => {
                warn!(partition = id, error = %e, "failed to load partition, excluding");
                None
            }
        }
    }
}
