//! Example controller: greeting, post page data and post author.

use super::{Controller, RequestContext};
use crate::error::{AppError, ConfigError};
use crate::service::Record;
use crate::wordpress::{categories, post_controls, render_content, tags};
use serde_json::{json, Value};

pub const CONTROLLER: &str = "swpMVC_Example_Controller";

const METHODS: [&str; 3] = ["hello", "show_post", "post_author"];

#[derive(Clone, Copy, Debug, Default)]
pub struct ExampleController;

impl Controller for ExampleController {
    fn name(&self) -> &str {
        CONTROLLER
    }

    fn methods(&self) -> &[&'static str] {
        &METHODS
    }

    fn call(&self, method: &str, ctx: &RequestContext<'_>, params: &[String]) -> Result<Value, AppError> {
        match method {
            "hello" => Ok(hello(params)),
            "show_post" => show_post(ctx, post_id(params)?),
            "post_author" => post_author(ctx, post_id(params)?),
            other => Err(ConfigError::MissingReference {
                kind: "controller method",
                id: format!("{}::{}", CONTROLLER, other),
            }
            .into()),
        }
    }
}

fn post_id(params: &[String]) -> Result<&str, AppError> {
    params
        .first()
        .map(String::as_str)
        .ok_or_else(|| AppError::BadRequest("missing post id".into()))
}

/// Echo the positional parameters.
pub fn hello(params: &[String]) -> Value {
    json!({
        "message": "Hello from the example controller",
        "params": params,
    })
}

fn names(terms: &[Record<'_>]) -> Vec<Value> {
    terms.iter().filter_map(|t| t.get("name").cloned()).collect()
}

fn find_post<'a>(ctx: &RequestContext<'a>, id: &str) -> Result<Record<'a>, AppError> {
    ctx.session
        .find("Post", id)?
        .ok_or_else(|| AppError::NotFound(format!("post {}", id)))
}

/// Post with rendered body, tag names, category names and its editable fields.
pub fn show_post(ctx: &RequestContext<'_>, id: &str) -> Result<Value, AppError> {
    let post = find_post(ctx, id)?;
    Ok(json!({
        "post": post.to_json(),
        "content": render_content(&post, ctx.filters),
        "tags": names(&tags(&post)?),
        "categories": names(&categories(&post)?),
        "controls": post_controls(),
    }))
}

/// The post's author, without sensitive columns.
pub fn post_author(ctx: &RequestContext<'_>, id: &str) -> Result<Value, AppError> {
    let post = find_post(ctx, id)?;
    let author = post
        .one("user")?
        .ok_or_else(|| AppError::NotFound(format!("author of post {}", id)))?;
    Ok(author.to_json())
}
