//! Shared application state for all routes. Built once at startup, read-only afterwards.

use crate::config::ResolvedModel;
use crate::error::ConfigError;
use crate::filters::FilterPipeline;
use crate::handlers::{ControllerRegistry, ExampleController};
use crate::routes::{compose, ExampleRoutes, RouteTable};
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub model: Arc<ResolvedModel>,
    pub store: Arc<dyn Store>,
    pub filters: Arc<FilterPipeline>,
    pub routes: Arc<RouteTable>,
    pub controllers: Arc<ControllerRegistry>,
}

impl AppState {
    /// Fails when a route names a controller or method that is not registered.
    pub fn new(
        model: ResolvedModel,
        store: Arc<dyn Store>,
        filters: FilterPipeline,
        routes: RouteTable,
        controllers: ControllerRegistry,
    ) -> Result<Self, ConfigError> {
        controllers.check(&routes)?;
        tracing::info!(routes = routes.len(), entities = model.entities.len(), "application state ready");
        Ok(AppState {
            model: Arc::new(model),
            store,
            filters: Arc::new(filters),
            routes: Arc::new(routes),
            controllers: Arc::new(controllers),
        })
    }

    /// WordPress content filters with the example routes and controller.
    pub fn with_example(model: ResolvedModel, store: Arc<dyn Store>) -> Result<Self, ConfigError> {
        let routes = RouteTable::new(compose(Vec::new(), &[&ExampleRoutes]));
        let mut controllers = ControllerRegistry::new();
        controllers.register(ExampleController);
        Self::new(model, store, FilterPipeline::wordpress_defaults(), routes, controllers)
    }
}
