//! Lazy relationship resolution and derived collections over resolved relations.

mod derived;
mod session;
pub use derived::filter_project;
pub use session::{Record, Related, Session};
