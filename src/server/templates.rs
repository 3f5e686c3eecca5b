//! Template rendering using minijinja with embedded templates.

use minijinja::{Environment, Error as JinjaError, ErrorKind};
use rust_embed::Embed;
use serde::Serialize;

use crate::storage::{human_size, FileEntry};

/// Embedded HTML templates.
#[derive(Embed)]
#[folder = "templates/"]
pub struct Templates;

/// A template engine for rendering the file pages.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Create a new template engine with embedded templates.
    pub fn new() -> Result<Self, JinjaError> {
        let mut env = Environment::new();

        // Load embedded templates
        for file in Templates::iter() {
            let filename = file.to_string();
            if let Some(content) = Templates::get(&filename) {
                let template_str = std::str::from_utf8(content.data.as_ref())
                    .map_err(|_| JinjaError::from(ErrorKind::InvalidOperation))?;
                env.add_template_owned(filename, template_str.to_string())?;
            }
        }

        Ok(Self { env })
    }

    /// Render the landing page with upload form and file table.
    pub fn render_index(&self, title: &str, files: &[FileRow]) -> Result<String, JinjaError> {
        let template = self.env.get_template("index.html")?;
        template.render(minijinja::context! { title => title, files => files })
    }

    /// Render the bare file index (just links).
    pub fn render_file_index(&self, title: &str, files: &[FileRow]) -> Result<String, JinjaError> {
        let template = self.env.get_template("files.html")?;
        template.render(minijinja::context! { title => title, files => files })
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new().expect("failed to initialize template engine")
    }
}

/// A view model for rendering a file in templates.
#[derive(Debug, Clone, Serialize)]
pub struct FileRow {
    /// Bare file name
    pub name: String,
    /// Size formatted for display
    pub size_human: String,
    /// Modification time formatted for display, "-" if unknown
    pub modified: String,
}

impl FileRow {
    /// Create a view model from a storage entry.
    pub fn from_entry(entry: &FileEntry) -> Self {
        Self {
            name: entry.name.clone(),
            size_human: human_size(entry.size),
            modified: entry
                .modified
                .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}
