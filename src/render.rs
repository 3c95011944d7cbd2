//! View rendering
//!
//! Handlers render views by name, without the file extension. The default
//! [`ViewRenderer`] hands `<dir>/<name>.<extension>` to a minijinja
//! environment; `.html` views are autoescaped.

use bytes::Bytes;
use minijinja::{path_loader, Environment, ErrorKind};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::RwLock;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::ViewsConfig;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid view name: {0:?}")]
    InvalidViewName(String),

    #[error("view not found: {0}")]
    NotFound(String),

    #[error("failed to render view {view}: {source}")]
    Template {
        view: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("view environment lock poisoned")]
    LockPoisoned,
}

/// Template rendering keyed by view name
pub trait Renderer: Send + Sync {
    fn render(&self, view: &str, args: &Value) -> Result<Bytes, RenderError>;

    /// Drop any cached state so the next render sees fresh sources
    fn reload(&self) {}
}

pub struct ViewRenderer {
    extension: String,
    cache_enabled: bool,
    env: RwLock<Environment<'static>>,
}

impl ViewRenderer {
    pub fn new(dir: impl Into<PathBuf>, extension: &str, cache: bool) -> Self {
        let mut env = Environment::new();
        env.set_loader(path_loader(dir.into()));

        Self {
            extension: extension.trim_start_matches('.').to_string(),
            cache_enabled: cache,
            env: RwLock::new(env),
        }
    }

    pub fn from_config(cfg: &ViewsConfig) -> Self {
        Self::new(cfg.dir.clone(), &cfg.extension, cfg.cache)
    }

    fn template_name(&self, view: &str) -> String {
        format!("{}.{}", view, self.extension)
    }
}

impl Renderer for ViewRenderer {
    fn render(&self, view: &str, args: &Value) -> Result<Bytes, RenderError> {
        validate_view_name(view)?;

        if !self.cache_enabled {
            self.env
                .write()
                .map_err(|_| RenderError::LockPoisoned)?
                .clear_templates();
        }

        let env = self.env.read().map_err(|_| RenderError::LockPoisoned)?;
        let name = self.template_name(view);

        let map_err = |e: minijinja::Error| match e.kind() {
            ErrorKind::TemplateNotFound => RenderError::NotFound(view.to_string()),
            _ => RenderError::Template {
                view: view.to_string(),
                source: e,
            },
        };

        let template = env.get_template(&name).map_err(map_err)?;
        let content = template.render(args).map_err(map_err)?;

        debug!(view = %view, bytes = content.len(), "Rendered view");
        Ok(Bytes::from(content))
    }

    fn reload(&self) {
        if let Ok(mut env) = self.env.write() {
            env.clear_templates();
            info!("View cache cleared");
        }
    }
}

/// View names are relative paths of `[A-Za-z0-9_-]` segments separated by `/`
fn validate_view_name(view: &str) -> Result<(), RenderError> {
    let valid = !view.is_empty()
        && view.split('/').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        });

    if valid {
        Ok(())
    } else {
        Err(RenderError::InvalidViewName(view.to_string()))
    }
}
