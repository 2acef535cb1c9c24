use std::sync::Arc;

use crate::analyze::Analyzer;

/// Shared handler state. Cloned per request; the analyzer itself is shared.
#[derive(Clone, Debug)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
}

impl AppState {
    pub fn new(analyzer: Analyzer) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
        }
    }
}
