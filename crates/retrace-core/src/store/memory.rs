//! In-memory store, for tests and ephemeral runs

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::RetraceResult;
use crate::eval::EvalConfig;
use crate::record::CallRecord;
use crate::store::{ConfigStore, RecordStore, VersionSelector, VersionedConfig};

/// Keeps everything in process memory. All data is lost on drop.
pub struct MemoryStore {
    records: RwLock<HashMap<(String, String), Vec<CallRecord>>>,
    configs: RwLock<HashMap<String, Vec<EvalConfig>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            configs: RwLock::new(HashMap::new()),
        }
    }

    /// Session names present for a project, in no particular order
    pub async fn sessions(&self, project: &str) -> Vec<String> {
        self.records
            .read()
            .await
            .keys()
            .filter(|(p, _)| p == project)
            .map(|(_, s)| s.clone())
            .collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn append(
        &self,
        project: &str,
        session: &str,
        records: &[CallRecord],
    ) -> RetraceResult<()> {
        let mut guard = self.records.write().await;
        guard
            .entry((project.to_string(), session.to_string()))
            .or_default()
            .extend_from_slice(records);
        Ok(())
    }

    async fn query(
        &self,
        project: &str,
        session: &str,
        tag_id: Option<&str>,
    ) -> RetraceResult<Vec<CallRecord>> {
        let guard = self.records.read().await;
        let all = guard
            .get(&(project.to_string(), session.to_string()))
            .cloned()
            .unwrap_or_default();
        Ok(match tag_id {
            Some(tag) => all.into_iter().filter(|r| r.tag_id == tag).collect(),
            None => all,
        })
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn get_config(
        &self,
        project: &str,
        selector: VersionSelector,
    ) -> RetraceResult<Option<VersionedConfig>> {
        let guard = self.configs.read().await;
        let Some(versions) = guard.get(project) else {
            return Ok(None);
        };
        let picked = match selector {
            VersionSelector::Latest => versions
                .last()
                .map(|config| (versions.len() as u32, config)),
            VersionSelector::Exact(version) => version
                .checked_sub(1)
                .and_then(|i| versions.get(i as usize))
                .map(|config| (version, config)),
        };
        Ok(picked.map(|(version, config)| VersionedConfig {
            version,
            config: config.clone(),
        }))
    }

    async fn put_config(&self, project: &str, config: &EvalConfig) -> RetraceResult<u32> {
        let mut guard = self.configs.write().await;
        let versions = guard.entry(project.to_string()).or_default();
        versions.push(config.clone());
        Ok(versions.len() as u32)
    }
}
