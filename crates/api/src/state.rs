use std::sync::Arc;

use cardsign_pipeline::Orchestrator;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`. Cheaply cloneable.
#[derive(Clone)]
pub struct AppState {
    /// The webhook-processing pipeline.
    pub orchestrator: Arc<Orchestrator>,
}
