//! Controllers invoked through the route table, and the request dispatcher.

pub mod example;

pub use example::ExampleController;

use crate::error::{AppError, ConfigError};
use crate::filters::FilterPipeline;
use crate::routes::RouteTable;
use crate::service::Session;
use crate::state::AppState;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// What a controller method gets for one request.
pub struct RequestContext<'a> {
    pub session: Session<'a>,
    pub filters: &'a FilterPipeline,
}

/// Named set of methods reachable from routes. Methods run on a blocking thread.
pub trait Controller: Send + Sync {
    fn name(&self) -> &str;

    fn methods(&self) -> &[&'static str];

    /// Invoke `method` with the positional route parameters.
    fn call(&self, method: &str, ctx: &RequestContext<'_>, params: &[String]) -> Result<Value, AppError>;
}

#[derive(Clone, Default)]
pub struct ControllerRegistry {
    controllers: HashMap<String, Arc<dyn Controller>>,
}

impl std::fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.controllers.keys()).finish()
    }
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, controller: impl Controller + 'static) -> &mut Self {
        self.controllers.insert(controller.name().to_string(), Arc::new(controller));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Controller>> {
        self.controllers.get(name)
    }

    /// Every route must name a registered controller and one of its methods.
    pub fn check(&self, routes: &RouteTable) -> Result<(), ConfigError> {
        for route in routes.routes() {
            let controller = self.get(&route.controller).ok_or_else(|| ConfigError::MissingReference {
                kind: "controller",
                id: format!("{} ({})", route.controller, route.pattern),
            })?;
            if !controller.methods().iter().any(|m| *m == route.method) {
                return Err(ConfigError::MissingReference {
                    kind: "controller method",
                    id: format!("{}::{} ({})", route.controller, route.method, route.pattern),
                });
            }
        }
        Ok(())
    }
}

/// Match `path` against the route table and run the controller method. Blocks on store access.
pub fn dispatch(state: &AppState, path: &str) -> Result<Value, AppError> {
    let matched = state
        .routes
        .resolve(path)
        .ok_or_else(|| AppError::NotFound(format!("no route for {}", path)))?;
    let route = matched.route;
    let controller = state
        .controllers
        .get(&route.controller)
        .ok_or_else(|| ConfigError::MissingReference {
            kind: "controller",
            id: route.controller.clone(),
        })?;
    tracing::debug!(
        route = %route.pattern,
        controller = %route.controller,
        method = %route.method,
        params = ?matched.params,
        "dispatch"
    );
    let ctx = RequestContext {
        session: Session::new(&state.model, state.store.as_ref()),
        filters: &state.filters,
    };
    controller.call(&route.method, &ctx, &matched.params)
}
