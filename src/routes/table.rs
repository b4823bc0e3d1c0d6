//! Route table composed from contributors at startup and matched first-wins per request.

use serde::{Deserialize, Serialize};

/// Segment placeholder binding one path segment positionally.
pub const PLACEHOLDER: &str = ":p";

/// One route: a path pattern and the controller method it dispatches to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSpec {
    #[serde(rename = "route")]
    pub pattern: String,
    pub controller: String,
    pub method: String,
}

impl RouteSpec {
    pub fn new(pattern: &str, controller: &str, method: &str) -> Self {
        RouteSpec {
            pattern: pattern.to_string(),
            controller: controller.to_string(),
            method: method.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param,
}

/// A pattern split on `/`; empty segments (leading, trailing or doubled slashes) are ignored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutePattern {
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s == PLACEHOLDER {
                    Segment::Param
                } else {
                    Segment::Literal(s.to_string())
                }
            })
            .collect();
        RoutePattern { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Positional parameters when `path` matches segment for segment.
    pub fn matches(&self, path: &str) -> Option<Vec<String>> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut params = Vec::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) if lit == part => {}
                Segment::Literal(_) => return None,
                Segment::Param => params.push(part.to_string()),
            }
        }
        Some(params)
    }
}

/// Supplies routes to the table. Contributors are consulted once, at composition.
pub trait RouteContributor {
    fn name(&self) -> &str;

    fn routes(&self) -> Vec<RouteSpec>;
}

/// Append each contributor's routes to `base`, in contributor order.
pub fn compose(base: Vec<RouteSpec>, contributors: &[&dyn RouteContributor]) -> Vec<RouteSpec> {
    contributors.iter().fold(base, |mut routes, contributor| {
        let added = contributor.routes();
        tracing::info!(contributor = %contributor.name(), added = added.len(), total = routes.len() + added.len(), "routes contributed");
        routes.extend(added);
        routes
    })
}

#[derive(Debug)]
pub struct RouteMatch<'t> {
    pub route: &'t RouteSpec,
    pub params: Vec<String>,
}

/// Composed routes with their parsed patterns, in declaration order.
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    entries: Vec<(RouteSpec, RoutePattern)>,
}

impl RouteTable {
    pub fn new(routes: Vec<RouteSpec>) -> Self {
        let entries = routes
            .into_iter()
            .map(|r| {
                let pattern = RoutePattern::parse(&r.pattern);
                (r, pattern)
            })
            .collect();
        RouteTable { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn routes(&self) -> impl Iterator<Item = &RouteSpec> {
        self.entries.iter().map(|(r, _)| r)
    }

    /// First declared route matching `path`.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch<'_>> {
        self.entries.iter().find_map(|(route, pattern)| {
            pattern.matches(path).map(|params| RouteMatch { route, params })
        })
    }
}
