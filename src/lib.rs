//! wpmvc: declarative WordPress entity relationships, lazy per-request resolution,
//! and controller routes composed from contributors.

pub mod config;
pub mod error;
pub mod filters;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;
pub mod wordpress;

pub use config::{load_from_path, resolve, FullConfig, ResolvedEntity, ResolvedModel, Settings};
pub use error::{AppError, ConfigError};
pub use filters::FilterPipeline;
pub use handlers::{Controller, ControllerRegistry, RequestContext};
pub use response::success_one_ok;
pub use routes::{app_router, compose, ExampleRoutes, RouteContributor, RouteSpec, RouteTable};
pub use service::{Record, Related, Session};
pub use state::AppState;
pub use store::{MemoryStore, PgStore, Store};
