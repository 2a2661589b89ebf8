//! Server state.

use snipvault_core::SnippetService;
use std::sync::Arc;

/// State shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SnippetService>,
}

impl AppState {
    pub fn new(service: SnippetService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
