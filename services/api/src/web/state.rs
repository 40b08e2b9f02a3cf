//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use copilot_core::ports::{ContentStore, GenerationService};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers. The store owns every path under the content and backup trees;
/// handlers go through it for all file access.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ContentStore>,
    pub generator: Arc<dyn GenerationService>,
    pub config: Arc<Config>,
}
