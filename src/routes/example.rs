//! Routes contributed by the example plugin.

use crate::handlers::example::CONTROLLER;
use crate::routes::{RouteContributor, RouteSpec};

const HELLO_PATTERNS: [&str; 6] = [
    "/swpmvc/hello/there/:p",
    "/swpmvc/hello/there/:p/:p",
    "/swpmvc/hello/:p",
    "/swpmvc/hello",
    "/swpmvc/hello/:p/:p",
    "/swpmvc/hello/test/route",
];

/// Six `hello` routes, then the post and post-author routes.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExampleRoutes;

impl RouteContributor for ExampleRoutes {
    fn name(&self) -> &str {
        "example"
    }

    fn routes(&self) -> Vec<RouteSpec> {
        let mut routes: Vec<RouteSpec> = HELLO_PATTERNS
            .iter()
            .map(|p| RouteSpec::new(p, CONTROLLER, "hello"))
            .collect();
        routes.push(RouteSpec::new("/swpmvc/post/:p", CONTROLLER, "show_post"));
        routes.push(RouteSpec::new("/swpmvc/post/:p/author", CONTROLLER, "post_author"));
        routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::{compose, RouteTable};

    #[test]
    fn contributes_eight_routes_after_existing_ones() {
        let base = vec![RouteSpec::new("/existing", "Other", "index")];
        let routes = compose(base, &[&ExampleRoutes]);
        assert_eq!(routes.len(), 9);
        assert_eq!(routes[0].pattern, "/existing");
        assert!(routes[1..7].iter().all(|r| r.controller == CONTROLLER && r.method == "hello"));
        assert_eq!(routes[7], RouteSpec::new("/swpmvc/post/:p", CONTROLLER, "show_post"));
        assert_eq!(routes[8], RouteSpec::new("/swpmvc/post/:p/author", CONTROLLER, "post_author"));
    }

    #[test]
    fn hello_routes_shadow_in_declaration_order() {
        let table = RouteTable::new(ExampleRoutes.routes());
        // "/swpmvc/hello/there/x" is claimed by the first pattern, not "/swpmvc/hello/:p/:p".
        let m = table.resolve("/swpmvc/hello/there/x").unwrap();
        assert_eq!(m.route.pattern, "/swpmvc/hello/there/:p");
        assert_eq!(m.params, vec!["x"]);
        // The literal route is shadowed by "/swpmvc/hello/:p/:p".
        let m = table.resolve("/swpmvc/hello/test/route").unwrap();
        assert_eq!(m.route.pattern, "/swpmvc/hello/:p/:p");
        assert_eq!(m.params, vec!["test", "route"]);
        let m = table.resolve("/swpmvc/post/5/author").unwrap();
        assert_eq!(m.route.method, "post_author");
    }
}
