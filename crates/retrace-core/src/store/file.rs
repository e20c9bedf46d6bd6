//! Filesystem store: JSONL record logs and versioned config documents

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{RetraceError, RetraceResult};
use crate::eval::EvalConfig;
use crate::record::CallRecord;
use crate::store::{ConfigStore, RecordStore, VersionSelector, VersionedConfig};

/// Append-only store on the local filesystem. Records land one JSON object
/// per line in `<root>/<project>/records/<session>.jsonl`; configs land as
/// `<root>/<project>/configs/v{N}.json`. Version assignment scans the
/// configs directory, so concurrent writers to the same project should sit
/// behind a single store instance.
pub struct JsonlStore {
    root: PathBuf,
}

impl JsonlStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn records_path(&self, project: &str, session: &str) -> PathBuf {
        self.root
            .join(sanitize(project))
            .join("records")
            .join(format!("{}.jsonl", sanitize(session)))
    }

    fn configs_dir(&self, project: &str) -> PathBuf {
        self.root.join(sanitize(project)).join("configs")
    }

    fn config_path(&self, project: &str, version: u32) -> PathBuf {
        self.configs_dir(project).join(format!("v{}.json", version))
    }

    async fn latest_version(&self, project: &str) -> RetraceResult<u32> {
        let dir = self.configs_dir(project);
        if !dir.exists() {
            return Ok(0);
        }
        let mut entries = fs::read_dir(&dir).await?;
        let mut latest = 0;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(version) = parse_version(&entry.file_name().to_string_lossy()) {
                latest = latest.max(version);
            }
        }
        Ok(latest)
    }

    async fn read_config(
        &self,
        project: &str,
        version: u32,
    ) -> RetraceResult<Option<VersionedConfig>> {
        let path = self.config_path(project, version);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(RetraceError::storage_with_context(
                    format!("failed to read config: {}", e),
                    path.display().to_string(),
                ));
            }
        };
        let config: EvalConfig = serde_json::from_str(&raw).map_err(|e| {
            RetraceError::serialization_with_context(
                format!("invalid config document: {}", e),
                path.display().to_string(),
            )
        })?;
        Ok(Some(VersionedConfig { version, config }))
    }
}

#[async_trait]
impl RecordStore for JsonlStore {
    async fn append(
        &self,
        project: &str,
        session: &str,
        records: &[CallRecord],
    ) -> RetraceResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let path = self.records_path(project, session);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut lines = String::new();
        for record in records {
            lines.push_str(&serde_json::to_string(record)?);
            lines.push('\n');
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(lines.as_bytes()).await?;
        file.flush().await?;
        debug!(count = records.len(), path = %path.display(), "appended records");
        Ok(())
    }

    async fn query(
        &self,
        project: &str,
        session: &str,
        tag_id: Option<&str>,
    ) -> RetraceResult<Vec<CallRecord>> {
        let path = self.records_path(project, session);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut records = Vec::new();
        for (number, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<CallRecord>(line) {
                Ok(record) => {
                    if tag_id.is_none_or(|tag| record.tag_id == tag) {
                        records.push(record);
                    }
                }
                Err(e) => {
                    warn!(
                        line = number + 1,
                        path = %path.display(),
                        error = %e,
                        "skipping corrupt record line"
                    );
                }
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl ConfigStore for JsonlStore {
    async fn get_config(
        &self,
        project: &str,
        selector: VersionSelector,
    ) -> RetraceResult<Option<VersionedConfig>> {
        let version = match selector {
            VersionSelector::Latest => match self.latest_version(project).await? {
                0 => return Ok(None),
                latest => latest,
            },
            VersionSelector::Exact(version) => version,
        };
        self.read_config(project, version).await
    }

    async fn put_config(&self, project: &str, config: &EvalConfig) -> RetraceResult<u32> {
        let dir = self.configs_dir(project);
        fs::create_dir_all(&dir).await?;
        let version = self.latest_version(project).await? + 1;
        let raw = serde_json::to_string_pretty(config)?;
        fs::write(self.config_path(project, version), raw).await?;
        debug!(project, version, "stored config version");
        Ok(version)
    }
}

/// Keep path components to a safe character set
fn sanitize(component: &str) -> String {
    component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn parse_version(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix('v')?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, JsonlStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonlStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn test_append_then_query_round_trip() {
        let (_dir, store) = store();
        let records = vec![
            CallRecord::new("Svc.compute").with_arg("x", serde_json::json!(1)),
            CallRecord::new("Svc.other"),
            CallRecord::new("Svc.compute").with_arg("x", serde_json::json!(2)),
        ];
        store.append("proj", "run-1", &records).await.unwrap();

        let all = store.query("proj", "run-1", None).await.unwrap();
        assert_eq!(all, records);

        let filtered = store
            .query("proj", "run-1", Some("Svc.compute"))
            .await
            .unwrap();
        assert_eq!(filtered.len(), 2);
    }

    #[tokio::test]
    async fn test_appends_accumulate_in_order() {
        let (_dir, store) = store();
        let first = CallRecord::new("a.one");
        let second = CallRecord::new("b.two");
        store
            .append("proj", "run-1", std::slice::from_ref(&first))
            .await
            .unwrap();
        store
            .append("proj", "run-1", std::slice::from_ref(&second))
            .await
            .unwrap();

        let all = store.query("proj", "run-1", None).await.unwrap();
        assert_eq!(all, vec![first, second]);
    }

    #[tokio::test]
    async fn test_corrupt_lines_are_skipped() {
        let (_dir, store) = store();
        store
            .append("proj", "run-1", &[CallRecord::new("a.one")])
            .await
            .unwrap();

        let path = store.records_path("proj", "run-1");
        let mut raw = fs::read_to_string(&path).await.unwrap();
        raw.push_str("{not json}\n");
        raw.push_str(&serde_json::to_string(&CallRecord::new("b.two")).unwrap());
        raw.push('\n');
        fs::write(&path, raw).await.unwrap();

        let all = store.query("proj", "run-1", None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].tag_id, "b.two");
    }

    #[tokio::test]
    async fn test_missing_session_queries_empty() {
        let (_dir, store) = store();
        let got = store.query("proj", "never-ran", None).await.unwrap();
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn test_config_versions_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = JsonlStore::new(dir.path());
            assert_eq!(
                store.put_config("proj", &EvalConfig::default()).await.unwrap(),
                1
            );
            assert_eq!(
                store.put_config("proj", &EvalConfig::default()).await.unwrap(),
                2
            );
        }
        let reopened = JsonlStore::new(dir.path());
        let latest = reopened
            .get_config("proj", VersionSelector::Latest)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.version, 2);
        assert_eq!(
            reopened.put_config("proj", &EvalConfig::default()).await.unwrap(),
            3
        );
        assert!(
            reopened
                .get_config("proj", VersionSelector::Exact(99))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_path_components_are_sanitized() {
        let (_dir, store) = store();
        store
            .append("pro/ject", "run: one", &[CallRecord::new("a.one")])
            .await
            .unwrap();
        let got = store.query("pro/ject", "run: one", None).await.unwrap();
        assert_eq!(got.len(), 1);
    }
}
