//! On-disk storage for the step journals of failed runs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flowline_step::StepJournal;

/// Journals live in `<data_dir>/journals/<workflow_id>.json`.
pub struct JournalStore {
  dir: PathBuf,
}

impl JournalStore {
  pub fn new(data_dir: &Path) -> Self {
    Self {
      dir: data_dir.join("journals"),
    }
  }

  pub fn path(&self, workflow_id: &str) -> PathBuf {
    let file_name: String = workflow_id
      .chars()
      .map(|c| {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
          c
        } else {
          '_'
        }
      })
      .collect();
    self.dir.join(format!("{}.json", file_name))
  }

  /// Load the saved journal, or an empty one if none was saved.
  pub async fn load(&self, workflow_id: &str) -> Result<StepJournal> {
    let path = self.path(workflow_id);
    let exists = tokio::fs::try_exists(&path)
      .await
      .with_context(|| format!("failed to check journal: {}", path.display()))?;
    if !exists {
      return Ok(StepJournal::new());
    }
    let content = tokio::fs::read_to_string(&path)
      .await
      .with_context(|| format!("failed to read journal: {}", path.display()))?;
    serde_json::from_str(&content)
      .with_context(|| format!("failed to parse journal: {}", path.display()))
  }

  /// The journal a run starts from.
  ///
  /// Resumed runs get the saved journal. Fresh runs discard it, so a later
  /// failure can never mix old steps into the journal it saves.
  pub async fn start_run(&self, workflow_id: &str, resume: bool) -> Result<StepJournal> {
    if resume {
      self.load(workflow_id).await
    } else {
      self.remove(workflow_id).await?;
      Ok(StepJournal::new())
    }
  }

  pub async fn save(&self, workflow_id: &str, journal: &StepJournal) -> Result<PathBuf> {
    tokio::fs::create_dir_all(&self.dir)
      .await
      .with_context(|| format!("failed to create journal directory: {}", self.dir.display()))?;
    let path = self.path(workflow_id);
    let content = serde_json::to_string_pretty(journal)?;
    tokio::fs::write(&path, content)
      .await
      .with_context(|| format!("failed to write journal: {}", path.display()))?;
    Ok(path)
  }

  /// Remove the saved journal. Missing journals are fine.
  pub async fn remove(&self, workflow_id: &str) -> Result<()> {
    let path = self.path(workflow_id);
    match tokio::fs::remove_file(&path).await {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e).with_context(|| format!("failed to remove journal: {}", path.display())),
    }
  }
}
