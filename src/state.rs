use std::sync::Arc;

use crate::{
    db::Cache,
    movies::MovieCatalog,
    services::{catalog::CatalogClient, feedback::FeedbackCoordinator, sync::SyncScheduler},
    store::ProfileStore,
};

/// Shared application state handed to every handler.
///
/// All collaborators are constructed once at startup and shared; nothing in
/// here takes a process-wide lock.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProfileStore>,
    pub catalog: Arc<dyn CatalogClient>,
    pub movies: Arc<MovieCatalog>,
    pub cache: Cache,
    pub feedback: Arc<FeedbackCoordinator>,
    pub scheduler: Arc<SyncScheduler>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        catalog: Arc<dyn CatalogClient>,
        movies: Arc<MovieCatalog>,
        cache: Cache,
        scheduler: Arc<SyncScheduler>,
    ) -> Self {
        let feedback = Arc::new(FeedbackCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&catalog),
            Arc::clone(&movies),
        ));

        Self {
            store,
            catalog,
            movies,
            cache,
            feedback,
            scheduler,
        }
    }
}
