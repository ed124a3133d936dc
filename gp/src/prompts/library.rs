//! Prompt Library
//!
//! Loads prompt templates from an override directory or falls back to the
//! embedded defaults, then renders them with Handlebars.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;

/// Line separating the system half of a template from the user half
pub const USER_MARKER: &str = "---user---";

/// Rendered (system, user) prompt pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

impl PromptPair {
    /// Split a rendered template at the user marker line
    pub fn split(rendered: &str) -> Option<Self> {
        let mut system = Vec::new();
        let mut user = Vec::new();
        let mut seen_marker = false;

        for line in rendered.lines() {
            if !seen_marker && line.trim() == USER_MARKER {
                seen_marker = true;
                continue;
            }
            if seen_marker {
                user.push(line);
            } else {
                system.push(line);
            }
        }

        seen_marker.then(|| Self {
            system: system.join("\n").trim().to_string(),
            user: user.join("\n").trim().to_string(),
        })
    }
}

/// Loads and renders prompt templates
pub struct PromptLibrary {
    hbs: Handlebars<'static>,
    /// Directory holding `{name}.pmt` overrides
    override_dir: Option<PathBuf>,
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::embedded_only()
    }
}

impl PromptLibrary {
    /// Library that only uses embedded prompts
    pub fn embedded_only() -> Self {
        debug!("PromptLibrary::embedded_only: called");
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        Self { hbs, override_dir: None }
    }

    /// Library that prefers `{dir}/{name}.pmt` when it exists
    pub fn with_override_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        debug!(?dir, "PromptLibrary::with_override_dir: called");
        let mut library = Self::embedded_only();
        if dir.is_dir() {
            library.override_dir = Some(dir.to_path_buf());
        } else {
            debug!(?dir, "PromptLibrary::with_override_dir: directory missing, using embedded");
        }
        library
    }

    /// Load a template by name
    ///
    /// Checks the override directory first, then the embedded set.
    fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLibrary::load_template: called");
        if let Some(ref dir) = self.override_dir {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLibrary::load_template: found override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read prompt override {}: {}", path.display(), e));
            }
        }

        embedded::get_embedded(name)
            .map(str::to_string)
            .ok_or_else(|| eyre!("Prompt template not found: {}", name))
    }

    /// Render a template into a prompt pair
    pub fn render<T: Serialize>(&self, name: &str, context: &T) -> Result<PromptPair> {
        debug!(%name, "PromptLibrary::render: called");
        let template = self.load_template(name)?;
        let rendered = self
            .hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", name, e))?;

        PromptPair::split(&rendered).ok_or_else(|| eyre!("Template {} has no {} line", name, USER_MARKER))
    }
}
