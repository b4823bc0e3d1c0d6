//! WordPress core schema and the post helpers built on it.

pub mod post;
mod schema;

pub use post::{categories, post_controls, render_content, tags, Control, ControlKind};
pub use schema::{model, schema};
