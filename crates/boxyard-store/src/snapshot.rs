use crate::layout::StoreLayout;
use crate::{fsync_dir, StoreError};
use boxyard_schema::{Application, EnvBox, EnvId, Environment, SourceDigest};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// Stored form of an environment after its last successful deploy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvSnapshot {
    pub env_id: EnvId,
    pub name: String,
    pub namespace: String,
    pub work_dir: PathBuf,
    pub boxes: Vec<BoxRecord>,
    pub deployed_at: String,
    /// blake3 checksum for integrity verification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoxRecord {
    pub name: String,
    pub box_type: String,
    pub namespace: String,
    pub chart: String,
    pub values: String,
    pub work_dir: PathBuf,
    pub source_digest: SourceDigest,
    pub applications: Vec<ApplicationRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplicationRecord {
    pub name: String,
    pub chart: String,
    pub staged_file: PathBuf,
}

impl EnvSnapshot {
    /// Capture a fully staged environment. Every box must carry a working
    /// directory and a source digest, every application a staged file.
    pub fn capture(env: &Environment, deployed_at: String) -> Result<Self, StoreError> {
        let work_dir = env
            .work_dir
            .clone()
            .ok_or_else(|| StoreError::Incomplete(format!("environment '{}' is not staged", env.id)))?;
        let boxes = env
            .boxes
            .iter()
            .map(BoxRecord::capture)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            env_id: env.id.clone(),
            name: env.name.clone(),
            namespace: env.namespace.clone(),
            work_dir,
            boxes,
            deployed_at,
            checksum: None,
        })
    }

    pub fn find_box(&self, name: &str) -> Option<&BoxRecord> {
        self.boxes.iter().find(|b| b.name == name)
    }

    pub fn box_names(&self) -> Vec<String> {
        self.boxes.iter().map(|b| b.name.clone()).collect()
    }

    fn compute_checksum(&self) -> Result<String, StoreError> {
        let mut copy = self.clone();
        copy.checksum = None;
        let json = serde_json::to_string_pretty(&copy)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

impl BoxRecord {
    fn capture(b: &EnvBox) -> Result<Self, StoreError> {
        let work_dir = b
            .work_dir
            .clone()
            .ok_or_else(|| StoreError::Incomplete(format!("box '{}' is not staged", b.name)))?;
        let source_digest = b
            .source_digest
            .clone()
            .ok_or_else(|| StoreError::Incomplete(format!("box '{}' has no source digest", b.name)))?;
        let applications = b
            .applications
            .iter()
            .map(|app| {
                let staged_file = app.staged_file.clone().ok_or_else(|| {
                    StoreError::Incomplete(format!(
                        "application '{}' of box '{}' is not staged",
                        app.name, b.name
                    ))
                })?;
                Ok(ApplicationRecord {
                    name: app.name.clone(),
                    chart: app.chart.clone(),
                    staged_file,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        Ok(Self {
            name: b.name.clone(),
            box_type: b.box_type.clone(),
            namespace: b.namespace.clone(),
            chart: b.chart.clone(),
            values: b.values.clone(),
            work_dir,
            source_digest,
            applications,
        })
    }

    /// Rebuild the in-memory box as it was deployed, staged paths included.
    pub fn to_env_box(&self) -> EnvBox {
        EnvBox {
            name: self.name.clone(),
            box_type: self.box_type.clone(),
            namespace: self.namespace.clone(),
            chart: self.chart.clone(),
            values: self.values.clone(),
            applications: self
                .applications
                .iter()
                .map(|app| Application {
                    name: app.name.clone(),
                    chart: app.chart.clone(),
                    work_dir: app.staged_file.parent().map(PathBuf::from),
                    staged_file: Some(app.staged_file.clone()),
                })
                .collect(),
            work_dir: Some(self.work_dir.clone()),
            source_digest: Some(self.source_digest.clone()),
        }
    }
}

/// Key-value store of environment snapshots, keyed by environment id.
///
/// `put` replaces a snapshot as a whole; readers never observe a partial write.
pub trait SnapshotStore {
    fn exists(&self, env_id: &str) -> Result<bool, StoreError>;

    fn get(&self, env_id: &str) -> Result<EnvSnapshot, StoreError>;

    fn put(&self, snapshot: &EnvSnapshot) -> Result<(), StoreError>;

    fn delete(&self, env_id: &str) -> Result<(), StoreError>;

    fn list(&self) -> Result<Vec<EnvSnapshot>, StoreError>;
}

/// Snapshot ids double as file names, so they are restricted to a safe charset.
pub fn validate_env_id(env_id: &str) -> Result<(), StoreError> {
    if env_id.is_empty() || env_id.len() > 128 {
        return Err(StoreError::InvalidId(
            "environment id must be 1-128 characters".to_owned(),
        ));
    }
    if env_id.starts_with('.') {
        return Err(StoreError::InvalidId(
            "environment id must not start with '.'".to_owned(),
        ));
    }
    if !env_id
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.')
    {
        return Err(StoreError::InvalidId(
            "environment id must match [a-zA-Z0-9_.-]".to_owned(),
        ));
    }
    Ok(())
}

/// One JSON file per environment under `store/snapshots/`.
pub struct FileSnapshotStore {
    layout: StoreLayout,
}

impl FileSnapshotStore {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    /// Like `list()`, but returns per-entry `Result`s so callers (e.g.
    /// `doctor`) can surface individual corruption errors.
    #[allow(clippy::type_complexity)]
    pub fn list_with_errors(
        &self,
    ) -> Result<Vec<Result<EnvSnapshot, (String, StoreError)>>, StoreError> {
        let dir = self.layout.snapshots_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut results = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                let name = entry.file_name();
                let name_str = name.to_str().unwrap_or("").to_owned();
                if !name_str.is_empty() && !name_str.starts_with('.') {
                    match self.get(&name_str) {
                        Ok(snapshot) => results.push(Ok(snapshot)),
                        Err(e) => results.push(Err((name_str, e))),
                    }
                }
            }
        }
        Ok(results)
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn exists(&self, env_id: &str) -> Result<bool, StoreError> {
        validate_env_id(env_id)?;
        Ok(self.layout.snapshot_path(env_id).is_file())
    }

    fn get(&self, env_id: &str) -> Result<EnvSnapshot, StoreError> {
        validate_env_id(env_id)?;
        let path = self.layout.snapshot_path(env_id);
        if !path.exists() {
            return Err(StoreError::EnvNotFound(env_id.to_owned()));
        }
        let content = fs::read_to_string(&path)?;
        let snapshot: EnvSnapshot = serde_json::from_str(&content)?;

        if let Some(ref expected) = snapshot.checksum {
            let actual = snapshot.compute_checksum()?;
            if actual != *expected {
                return Err(StoreError::IntegrityFailure {
                    env_id: env_id.to_owned(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        Ok(snapshot)
    }

    fn put(&self, snapshot: &EnvSnapshot) -> Result<(), StoreError> {
        validate_env_id(&snapshot.env_id)?;
        let dir = self.layout.snapshots_dir();
        fs::create_dir_all(&dir)?;
        let dest = self.layout.snapshot_path(&snapshot.env_id);

        let mut with_checksum = snapshot.clone();
        with_checksum.checksum = Some(with_checksum.compute_checksum()?);
        let content = serde_json::to_string_pretty(&with_checksum)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&dest).map_err(|e| StoreError::Io(e.error))?;
        fsync_dir(&dir)?;

        Ok(())
    }

    fn delete(&self, env_id: &str) -> Result<(), StoreError> {
        validate_env_id(env_id)?;
        let path = self.layout.snapshot_path(env_id);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<EnvSnapshot>, StoreError> {
        let mut results = Vec::new();
        for entry in self.list_with_errors()? {
            match entry {
                Ok(snapshot) => results.push(snapshot),
                Err((name, e)) => {
                    tracing::warn!("skipping corrupted snapshot '{name}': {e}");
                }
            }
        }
        results.sort_by(|a, b| a.env_id.cmp(&b.env_id));
        Ok(results)
    }
}
