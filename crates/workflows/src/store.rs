//! Directory-backed workflow template store.
//!
//! Each `*.json` file in the workflows directory becomes one named
//! template keyed by its filename stem.  A malformed file is logged and
//! skipped so one bad template never takes the whole bot down.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::template::WorkflowTemplate;

/// Description reported when a template file carries none.
const NO_DESCRIPTION: &str = "No description available";

/// Errors from template lookup and persistence.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// The requested workflow name is not registered.
    #[error("Workflow \"{0}\" is not registered")]
    NotFound(String),

    /// Writing a template file failed.
    #[error("Failed to write workflow template: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing a template failed.
    #[error("Failed to serialize workflow template: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Summary of one registered template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowInfo {
    /// Template name (filename stem).
    pub name: String,
    /// Number of nodes in the graph.
    pub node_count: usize,
    /// Template description, or a placeholder when absent.
    pub description: String,
}

/// In-memory registry of templates backed by a directory of JSON files.
pub struct WorkflowStore {
    dir: PathBuf,
    templates: HashMap<String, WorkflowTemplate>,
}

impl WorkflowStore {
    /// Scan `dir` and load every parseable `*.json` template.
    ///
    /// The directory is created if missing.  Unreadable or malformed
    /// files are logged and skipped; the load itself never fails.
    pub async fn load_all(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let mut templates = HashMap::new();

        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            tracing::error!(dir = %dir.display(), error = %e, "Cannot create workflows directory");
            return Self { dir, templates };
        }

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(dir = %dir.display(), error = %e, "Cannot read workflows directory");
                return Self { dir, templates };
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            match load_template(&path).await {
                Ok(template) => {
                    tracing::info!(name, "Loaded workflow");
                    templates.insert(name.to_owned(), template);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping malformed workflow file");
                }
            }
        }

        Self { dir, templates }
    }

    /// Persist a template to `{dir}/{name}.json` and register it.
    ///
    /// Overwrites any existing template of the same name, on disk and
    /// in memory.
    pub async fn add(
        &mut self,
        name: &str,
        template: WorkflowTemplate,
    ) -> Result<(), TemplateError> {
        let path = self.dir.join(format!("{name}.json"));
        let bytes = serde_json::to_vec_pretty(&template)?;
        tokio::fs::write(&path, bytes).await?;

        self.templates.insert(name.to_owned(), template);
        tracing::info!(name, "Added workflow");
        Ok(())
    }

    /// Look up a registered template.
    pub fn get(&self, name: &str) -> Option<&WorkflowTemplate> {
        self.templates.get(name)
    }

    /// Summary of a registered template.
    pub fn info(&self, name: &str) -> Result<WorkflowInfo, TemplateError> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| TemplateError::NotFound(name.to_owned()))?;

        Ok(WorkflowInfo {
            name: name.to_owned(),
            node_count: template.node_count(),
            description: template
                .description()
                .unwrap_or(NO_DESCRIPTION)
                .to_owned(),
        })
    }

    /// Registered template names, sorted for stable presentation.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.templates.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// True when no templates are registered.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// The backing directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Read and parse a single template file.
async fn load_template(path: &Path) -> Result<WorkflowTemplate, TemplateError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_template() -> WorkflowTemplate {
        serde_json::from_value(json!({
            "description": "text to image",
            "nodes": [
                {"type": "text", "inputs": {"text": ""}},
                {"type": "sampler", "inputs": {"steps": 20}}
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn missing_directory_is_created_empty() {
        let dir = tempfile::tempdir().unwrap();
        let workflows_dir = dir.path().join("workflows");

        let store = WorkflowStore::load_all(&workflows_dir).await;

        assert!(store.is_empty());
        assert!(workflows_dir.is_dir());
    }

    #[tokio::test]
    async fn malformed_file_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{oops").unwrap();
        std::fs::write(
            dir.path().join("good.json"),
            serde_json::to_vec(&sample_template()).unwrap(),
        )
        .unwrap();

        let store = WorkflowStore::load_all(dir.path()).await;

        assert_eq!(store.names(), vec!["good".to_owned()]);
    }

    #[tokio::test]
    async fn non_json_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a workflow").unwrap();

        let store = WorkflowStore::load_all(dir.path()).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn info_reports_counts_and_placeholder_description() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = WorkflowStore::load_all(dir.path()).await;

        store.add("described", sample_template()).await.unwrap();
        let undescribed: WorkflowTemplate = serde_json::from_value(json!({
            "nodes": [{"type": "text", "inputs": {}}]
        }))
        .unwrap();
        store.add("bare", undescribed).await.unwrap();

        let info = store.info("described").unwrap();
        assert_eq!(info.node_count, 2);
        assert_eq!(info.description, "text to image");

        let info = store.info("bare").unwrap();
        assert_eq!(info.node_count, 1);
        assert_eq!(info.description, NO_DESCRIPTION);
    }

    #[tokio::test]
    async fn info_unknown_name_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorkflowStore::load_all(dir.path()).await;

        let err = store.info("nope").unwrap_err();
        assert!(matches!(err, TemplateError::NotFound(name) if name == "nope"));
    }

    #[tokio::test]
    async fn add_overwrites_existing_template() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = WorkflowStore::load_all(dir.path()).await;
        store.add("wf", sample_template()).await.unwrap();

        let replacement: WorkflowTemplate = serde_json::from_value(json!({
            "nodes": [{"type": "image", "inputs": {}}]
        }))
        .unwrap();
        store.add("wf", replacement.clone()).await.unwrap();

        assert_eq!(store.get("wf"), Some(&replacement));
        assert_eq!(store.len(), 1);
    }
}
