// src/state.rs

use std::sync::Arc;

use crate::config::Config;

/// Shared by every session the binary hosts.
pub struct AppState<G: ?Sized> {
    pub config: Config,
    pub grader: Arc<G>,
}

impl<G: ?Sized> AppState<G> {
    pub fn new(config: Config, grader: Arc<G>) -> Self {
        Self { config, grader }
    }
}

impl<G: ?Sized> Clone for AppState<G> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            grader: Arc::clone(&self.grader),
        }
    }
}
