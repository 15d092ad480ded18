//! Flow storage with optional file persistence.
//!
//! The backend owns the real copy of every flow. This store is a local
//! stand-in for tooling and tests: it keeps flows in memory, assigns ids the
//! way the backend would, and can mirror them to a directory of JSON files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};
use crate::types::{AutomationFlow, FlowStatus};

/// Summary of a stored flow (for listing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowMetadata {
    pub id: i64,
    pub name: String,
    pub status: FlowStatus,
    pub node_count: usize,
}

/// In-memory flow store with optional file persistence.
///
/// # Example
///
/// ```ignore
/// let mut store = FlowStore::with_persistence(".flows");
/// store.load_from_disk()?;
///
/// let id = store.insert(flow, Utc::now())?;
/// ```
#[derive(Debug, Default)]
pub struct FlowStore {
    /// Stored flows, keyed by ID.
    flows: BTreeMap<i64, AutomationFlow>,
    /// Optional path for file persistence.
    persist_path: Option<PathBuf>,
}

impl FlowStore {
    /// Create a new in-memory store without persistence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that persists to the given directory.
    ///
    /// The directory will be created if it doesn't exist when saving.
    pub fn with_persistence(path: impl AsRef<Path>) -> Self {
        Self {
            flows: BTreeMap::new(),
            persist_path: Some(path.as_ref().to_path_buf()),
        }
    }

    /// Load all flows from the persistence directory.
    ///
    /// Files that cannot be read or parsed, or hold a flow without an id, are
    /// skipped with a warning.
    /// Returns the number of flows loaded.
    pub fn load_from_disk(&mut self) -> Result<usize> {
        let Some(ref path) = self.persist_path else {
            return Ok(0);
        };

        if !path.exists() {
            return Ok(0);
        }

        let mut count = 0;
        for entry in std::fs::read_dir(path)? {
            let file_path = entry?.path();
            if file_path.extension().map_or(true, |e| e != "json") {
                continue;
            }

            let content = match std::fs::read_to_string(&file_path) {
                Ok(content) => content,
                Err(e) => {
                    log::warn!("Failed to read flow from {:?}: {}", file_path, e);
                    continue;
                }
            };
            match serde_json::from_str::<AutomationFlow>(&content) {
                Ok(flow) => match flow.id {
                    Some(id) => {
                        log::info!("Loaded flow {} '{}' from {:?}", id, flow.name, file_path);
                        self.flows.insert(id, flow);
                        count += 1;
                    }
                    None => log::warn!("Skipping flow without id in {:?}", file_path),
                },
                Err(e) => {
                    log::warn!("Failed to parse flow from {:?}: {}", file_path, e);
                }
            }
        }
        Ok(count)
    }

    fn file_path(&self, id: i64) -> Option<PathBuf> {
        self.persist_path
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", id)))
    }

    fn save_to_disk(&self, id: i64, flow: &AutomationFlow) -> Result<()> {
        let Some(file_path) = self.file_path(id) else {
            return Ok(());
        };

        if let Some(dir) = file_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&file_path, serde_json::to_string_pretty(flow)?)?;
        log::debug!("Saved flow {} to {:?}", id, file_path);
        Ok(())
    }

    fn delete_from_disk(&self, id: i64) -> Result<()> {
        let Some(file_path) = self.file_path(id) else {
            return Ok(());
        };

        if file_path.exists() {
            std::fs::remove_file(&file_path)?;
            log::debug!("Deleted flow {} from {:?}", id, file_path);
        }
        Ok(())
    }

    /// Insert or update a flow.
    ///
    /// A flow without an id gets the next free one and a creation time.
    /// Returns the flow's id.
    pub fn insert(&mut self, mut flow: AutomationFlow, now: DateTime<Utc>) -> Result<i64> {
        let id = match flow.id {
            Some(id) => id,
            None => {
                let id = self.flows.keys().next_back().map_or(1, |last| last + 1);
                flow.id = Some(id);
                id
            }
        };
        if flow.created_at.is_none() {
            flow.created_at = Some(now);
        }
        flow.updated_at = Some(now);

        self.save_to_disk(id, &flow)?;
        self.flows.insert(id, flow);
        Ok(id)
    }

    /// Get a flow by ID.
    pub fn get(&self, id: i64) -> Option<&AutomationFlow> {
        self.flows.get(&id)
    }

    /// Get a flow by ID, failing if it is missing.
    pub fn require(&self, id: i64) -> Result<&AutomationFlow> {
        self.flows.get(&id).ok_or(FlowError::NotFound(id))
    }

    /// Remove a flow by ID.
    ///
    /// Returns the removed flow if it existed.
    pub fn remove(&mut self, id: i64) -> Result<Option<AutomationFlow>> {
        self.delete_from_disk(id)?;
        Ok(self.flows.remove(&id))
    }

    /// List all flows, ordered by id.
    pub fn list(&self) -> Vec<FlowMetadata> {
        self.flows
            .iter()
            .map(|(&id, flow)| FlowMetadata {
                id,
                name: flow.name.clone(),
                status: flow.status,
                node_count: flow.nodes.len(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IdGenerator;
    use crate::mutations::{add_message_node, create_empty_flow};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn sample_flow(name: &str) -> AutomationFlow {
        let mut ids = IdGenerator::new();
        let mut flow = create_empty_flow(&mut ids, 1, "ws");
        flow.name = name.to_string();
        add_message_node(&flow, &mut ids, None)
    }

    #[test]
    fn test_in_memory_store() {
        let mut store = FlowStore::new();

        let first = store.insert(sample_flow("First"), at(10)).unwrap();
        let second = store.insert(sample_flow("Second"), at(20)).unwrap();
        assert_eq!((first, second), (1, 2));

        let stored = store.get(first).unwrap();
        assert_eq!(stored.id, Some(1));
        assert_eq!(stored.created_at, Some(at(10)));
        assert!(store.get(99).is_none());
        assert!(matches!(store.require(99), Err(FlowError::NotFound(99))));

        let list = store.list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].name, "Second");
        assert_eq!(list[1].node_count, 2);

        let removed = store.remove(first).unwrap();
        assert!(removed.is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_update_keeps_creation_time() {
        let mut store = FlowStore::new();
        let id = store.insert(sample_flow("Flow"), at(10)).unwrap();

        let mut edited = store.get(id).unwrap().clone();
        edited.name = "Renamed".to_string();
        assert_eq!(store.insert(edited, at(50)).unwrap(), id);

        let stored = store.get(id).unwrap();
        assert_eq!(stored.name, "Renamed");
        assert_eq!(stored.created_at, Some(at(10)));
        assert_eq!(stored.updated_at, Some(at(50)));
    }

    #[test]
    fn test_persistent_store() {
        let temp_dir = TempDir::new().unwrap();
        let persist_path = temp_dir.path().join("flows");

        let original = {
            let mut store = FlowStore::with_persistence(&persist_path);
            let id = store.insert(sample_flow("Persisted"), at(10)).unwrap();
            store.get(id).unwrap().clone()
        };

        std::fs::write(persist_path.join("broken.json"), "{not json").unwrap();
        std::fs::write(persist_path.join("notes.txt"), "ignored").unwrap();

        let mut store = FlowStore::with_persistence(&persist_path);
        assert_eq!(store.load_from_disk().unwrap(), 1);
        assert_eq!(store.get(1), Some(&original));

        store.remove(1).unwrap();
        assert!(!persist_path.join("1.json").exists());
    }

    #[test]
    fn test_load_skips_unreadable_files() {
        let temp_dir = TempDir::new().unwrap();
        {
            let mut store = FlowStore::with_persistence(temp_dir.path());
            store.insert(sample_flow("Readable"), at(10)).unwrap();
        }
        std::fs::write(temp_dir.path().join("corrupt.json"), [0xff, 0xfe, 0x00, 0x7b]).unwrap();

        let mut store = FlowStore::with_persistence(temp_dir.path());
        assert_eq!(store.load_from_disk().unwrap(), 1);
        assert_eq!(store.get(1).unwrap().name, "Readable");
    }
}
