pub mod health;
pub mod metrics_handler;
pub mod pages;

use std::sync::Arc;

use crate::{config::Config, render::Renderer, snowflake::IdGenerator};

/// State shared by every page handler
#[derive(Clone)]
pub struct AppState {
    pub ids: Arc<dyn IdGenerator>,
    pub renderer: Arc<dyn Renderer>,
    /// Maximum request body size in bytes
    pub body_limit: usize,
}

impl AppState {
    pub fn new(ids: Arc<dyn IdGenerator>, renderer: Arc<dyn Renderer>, config: &Config) -> Self {
        Self {
            ids,
            renderer,
            body_limit: config.server.body_limit_bytes,
        }
    }
}
