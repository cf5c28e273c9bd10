use crate::ids::IdSource;
use boxyard_schema::{EnvBox, Environment, SourceDigest};
use boxyard_store::{BoxRecord, EnvSnapshot};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const CHART_DESCRIPTOR: &str = "Chart.yaml";
pub const VALUES_DESCRIPTOR: &str = "values.yaml";
pub const TEMPLATES_DIR: &str = "templates";

const DIR_ID_LEN: usize = 8;
const TEMPLATE_ID_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("cannot create {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("cannot copy {} to {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    #[error("cannot read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("box '{0}' was left without a staged directory")]
    Unstaged(String),
}

fn create_dir(path: &Path) -> Result<(), StagingError> {
    fs::create_dir_all(path).map_err(|source| StagingError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

fn copy_file(from: &Path, to: &Path) -> Result<(), StagingError> {
    fs::copy(from, to).map_err(|source| StagingError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Draw ids until the resulting path does not exist yet.
fn fresh_path(parent: &Path, ids: &mut dyn IdSource, len: usize, suffix: &str) -> PathBuf {
    loop {
        let candidate = parent.join(format!("{}{suffix}", ids.next_id(len)));
        if !candidate.exists() {
            return candidate;
        }
    }
}

/// blake3 digest over the chart, values and application sources of a box.
pub fn source_digest(env_box: &EnvBox, source_root: &Path) -> Result<SourceDigest, StagingError> {
    let mut hasher = blake3::Hasher::new();
    let mut feed = |label: &str, relative: &str| -> Result<(), StagingError> {
        let path = source_root.join(relative);
        let bytes = fs::read(&path).map_err(|source| StagingError::Read { path, source })?;
        hasher.update(label.as_bytes());
        hasher.update(&(bytes.len() as u64).to_le_bytes());
        hasher.update(&bytes);
        Ok(())
    };
    feed("chart", &env_box.chart)?;
    feed("values", &env_box.values)?;
    for app in &env_box.applications {
        feed(&format!("app:{}", app.name), &app.chart)?;
    }
    Ok(SourceDigest::new(hasher.finalize().to_hex().to_string()))
}

/// A snapshot record counts as already staged when it has the same name and
/// source digest and its staged files are still on disk.
fn staged_record<'a>(snapshot: &'a EnvSnapshot, env_box: &EnvBox) -> Option<&'a BoxRecord> {
    snapshot.find_box(&env_box.name).filter(|record| {
        Some(&record.source_digest) == env_box.source_digest.as_ref()
            && record.work_dir.join(CHART_DESCRIPTOR).is_file()
            && record.work_dir.join(VALUES_DESCRIPTOR).is_file()
            && record.applications.iter().all(|a| a.staged_file.is_file())
    })
}

fn adopt(env_box: &mut EnvBox, record: &BoxRecord) {
    let restored = record.to_env_box();
    env_box.work_dir = restored.work_dir;
    for (app, staged) in env_box.applications.iter_mut().zip(restored.applications) {
        app.work_dir = staged.work_dir;
        app.staged_file = staged.staged_file;
    }
}

fn stage_box(
    env_box: &mut EnvBox,
    work_dir: &Path,
    source_root: &Path,
    ids: &mut dyn IdSource,
) -> Result<(), StagingError> {
    let box_dir = fresh_path(work_dir, ids, DIR_ID_LEN, "");
    create_dir(&box_dir)?;
    copy_file(
        &source_root.join(&env_box.chart),
        &box_dir.join(CHART_DESCRIPTOR),
    )?;
    copy_file(
        &source_root.join(&env_box.values),
        &box_dir.join(VALUES_DESCRIPTOR),
    )?;

    let templates = box_dir.join(TEMPLATES_DIR);
    for app in &mut env_box.applications {
        create_dir(&templates)?;
        let dest = fresh_path(&templates, ids, TEMPLATE_ID_LEN, ".yaml");
        copy_file(&source_root.join(&app.chart), &dest)?;
        app.work_dir = Some(templates.clone());
        app.staged_file = Some(dest);
    }

    debug!("staged box '{}' into {}", env_box.name, box_dir.display());
    env_box.work_dir = Some(box_dir);
    Ok(())
}

/// Materialize every box of `environment` into its working directory.
///
/// A previously deployed environment reuses the working directory recorded in
/// `previous`; a new one gets a fresh directory under `work_root`. When every
/// box is already staged per the snapshot nothing is written and the boxes
/// take their staged paths from it. Otherwise boxes with a matching record
/// keep their staged files and the rest are staged fresh. Copy failures abort
/// immediately and leave what was written.
pub fn stage(
    environment: &mut Environment,
    source_root: &Path,
    work_root: &Path,
    previous: Option<&EnvSnapshot>,
    ids: &mut dyn IdSource,
) -> Result<PathBuf, StagingError> {
    let work_dir = if let Some(snapshot) = previous {
        debug!(
            "reusing working directory {} of environment {}",
            snapshot.work_dir.display(),
            environment.id
        );
        snapshot.work_dir.clone()
    } else {
        let dir = fresh_path(work_root, ids, DIR_ID_LEN, "");
        create_dir(&dir)?;
        dir
    };
    environment.work_dir = Some(work_dir.clone());

    for b in &mut environment.boxes {
        b.source_digest = Some(source_digest(b, source_root)?);
    }

    let mut restaged = 0;
    for b in &mut environment.boxes {
        match previous.and_then(|snapshot| staged_record(snapshot, b)) {
            Some(record) => {
                debug!("box '{}' is already staged", b.name);
                adopt(b, record);
            }
            None => {
                stage_box(b, &work_dir, source_root, ids)?;
                restaged += 1;
            }
        }
    }
    if restaged == 0 && previous.is_some() {
        info!(
            "environment {} is already staged; nothing written",
            environment.id
        );
    }

    if let Some(b) = environment.boxes.iter().find(|b| !b.is_staged()) {
        return Err(StagingError::Unstaged(b.name.clone()));
    }
    Ok(work_dir)
}
