//! Route composition, the route table and the axum router that serves it.

pub mod app;
pub mod common;
pub mod example;
pub mod table;

pub use app::app_router;
pub use common::common_routes;
pub use example::ExampleRoutes;
pub use table::{compose, RouteContributor, RouteMatch, RoutePattern, RouteSpec, RouteTable, Segment, PLACEHOLDER};
