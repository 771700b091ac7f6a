//! Prompt template store
//!
//! Loads `.prompt` files from a directory once at startup. Each file becomes
//! a template keyed by its file stem. Templates may contain `{{key}}`
//! placeholders that are filled from a JSON context at lookup time.

use anyhow::{Context, Result};
use sdk::errors::EngineError;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// File extension of template files
pub const PROMPT_EXTENSION: &str = "prompt";

/// Templates shipped with the binary
pub const BUNDLED: [(&str, &str); 2] = [
    (
        "medical_processor",
        include_str!("../../../prompts/medical_processor.prompt"),
    ),
    (
        "patient_summary",
        include_str!("../../../prompts/patient_summary.prompt"),
    ),
];

/// Write the bundled templates into `dir`, keeping any file already there
///
/// Returns the number of templates written.
pub fn seed_bundled(dir: &Path) -> std::io::Result<usize> {
    std::fs::create_dir_all(dir)?;

    let mut written = 0;
    for (name, body) in BUNDLED {
        let path = dir.join(format!("{}.{}", name, PROMPT_EXTENSION));
        if path.exists() {
            continue;
        }
        std::fs::write(&path, body)?;
        written += 1;
    }
    Ok(written)
}

/// A named template body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub name: String,
    pub body: String,
}

impl PromptTemplate {
    /// Fill placeholders for every key present in `context`
    ///
    /// String values are inserted without quotes, other values as JSON text.
    /// Placeholders without a matching key are left as they are.
    pub fn render(&self, context: &Map<String, Value>) -> String {
        let mut rendered = self.body.clone();
        for (key, value) in context {
            let placeholder = format!("{{{{{}}}}}", key);
            let replacement = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            rendered = rendered.replace(&placeholder, &replacement);
        }
        rendered
    }
}

/// Read-only collection of prompt templates
#[derive(Debug, Clone, Default)]
pub struct PromptStore {
    prompts_dir: PathBuf,
    templates: BTreeMap<String, PromptTemplate>,
}

impl PromptStore {
    /// Load every `.prompt` file directly inside `prompts_dir`
    ///
    /// A missing directory yields an empty store. Unreadable files are
    /// skipped with a warning.
    pub async fn load(prompts_dir: &Path) -> Result<Self> {
        let mut store = Self {
            prompts_dir: prompts_dir.to_path_buf(),
            templates: BTreeMap::new(),
        };

        if !prompts_dir.is_dir() {
            info!(
                "Prompts directory {} does not exist; no prompts loaded",
                prompts_dir.display()
            );
            return Ok(store);
        }

        let mut entries = fs::read_dir(prompts_dir)
            .await
            .context("Failed to read prompts directory")?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|s| s.to_str()) != Some(PROMPT_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                warn!("Skipping prompt with non UTF-8 name: {}", path.display());
                continue;
            };

            match fs::read_to_string(&path).await {
                Ok(body) => {
                    debug!("Loaded prompt: {} from {}", name, path.display());
                    store.templates.insert(
                        name.to_string(),
                        PromptTemplate {
                            name: name.to_string(),
                            body,
                        },
                    );
                }
                Err(e) => {
                    warn!("Failed to read prompt {}: {}", path.display(), e);
                }
            }
        }

        info!(
            "Loaded {} prompt(s) from {}",
            store.templates.len(),
            prompts_dir.display()
        );
        Ok(store)
    }

    /// Build a store from in-memory templates
    pub fn from_templates(templates: impl IntoIterator<Item = PromptTemplate>) -> Self {
        Self {
            prompts_dir: PathBuf::new(),
            templates: templates
                .into_iter()
                .map(|t| (t.name.clone(), t))
                .collect(),
        }
    }

    /// Rendered template
    pub fn render(&self, name: &str, context: &Map<String, Value>) -> Result<String, EngineError> {
        self.templates
            .get(name)
            .map(|template| template.render(context))
            .ok_or_else(|| EngineError::PromptNotFound(name.to_string()))
    }

    /// Rendered template, or the not-found message for unknown names
    pub fn get(&self, name: &str, context: &Map<String, Value>) -> String {
        self.render(name, context).unwrap_or_else(|e| e.to_string())
    }

    pub fn lookup(&self, name: &str) -> Option<&PromptTemplate> {
        self.templates.get(name)
    }

    /// Template names, sorted
    pub fn list(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn prompts_dir(&self) -> &Path {
        &self.prompts_dir
    }
}

/// Human-readable description advertised by `prompts/list`
pub fn describe(name: &str) -> String {
    format!("Prompt for {}", name.replace('_', " "))
}
