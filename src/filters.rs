//! Named content filters applied to rendered text.

use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Filter over a piece of text.
pub type ContentFilter = Arc<dyn Fn(String) -> String + Send + Sync>;

/// Hook name applied to post bodies before display.
pub const THE_CONTENT: &str = "the_content";

/// Filters keyed by hook name. Built at startup, shared read-only across requests.
#[derive(Clone, Default)]
pub struct FilterPipeline {
    filters: HashMap<String, Vec<ContentFilter>>,
}

impl std::fmt::Debug for FilterPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<(&str, usize)> = self.filters.iter().map(|(k, v)| (k.as_str(), v.len())).collect();
        names.sort_unstable();
        f.debug_struct("FilterPipeline").field("filters", &names).finish()
    }
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pipeline with the paragraph filter registered on `the_content`.
    pub fn wordpress_defaults() -> Self {
        let mut pipeline = Self::new();
        pipeline.add_filter(THE_CONTENT, autop);
        pipeline
    }

    /// Register `filter` under `name`; filters for a name run in registration order.
    pub fn add_filter<F>(&mut self, name: &str, filter: F) -> &mut Self
    where
        F: Fn(String) -> String + Send + Sync + 'static,
    {
        self.filters.entry(name.to_string()).or_default().push(Arc::new(filter));
        self
    }

    pub fn has_filter(&self, name: &str) -> bool {
        self.filters.get(name).is_some_and(|f| !f.is_empty())
    }

    /// Run every filter registered under `name`. Unknown names return `value` unchanged.
    pub fn apply_filter(&self, name: &str, value: impl Into<String>) -> String {
        let value = value.into();
        match self.filters.get(name) {
            Some(filters) => {
                tracing::trace!(filter = %name, count = filters.len(), "applying filters");
                filters.iter().fold(value, |acc, f| f(acc))
            }
            None => value,
        }
    }
}

fn blank_lines() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("static regex"))
}

fn block_start() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^<(?:p|div|pre|blockquote|ul|ol|li|table|h[1-6]|hr|figure|section|article)[\s/>]")
            .expect("static regex")
    })
}

/// Wrap blank-line separated blocks in `<p>` and turn remaining single newlines into `<br />`.
/// Blocks that already open with a block-level tag are left as written.
pub fn autop(text: String) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::new();
    for block in blank_lines().split(text.trim()) {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }
        if block_start().is_match(block) {
            out.push_str(block);
        } else {
            out.push_str("<p>");
            out.push_str(&block.replace('\n', "<br />\n"));
            out.push_str("</p>");
        }
        out.push('\n');
    }
    out
}
