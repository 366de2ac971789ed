//! Route table
//!
//! A flat map from literal path to `(method, handler)`. Lookup is exact
//! string equality on the path and on the method; there are no path
//! parameters. The literal key `/*` is consulted when a path has no entry
//! of its own.

use crate::Method;
use std::collections::HashMap;

/// Key of the catch-all route
pub const FALLBACK: &str = "/*";

/// A registered route
#[derive(Debug, Clone)]
pub struct Route<H> {
    pub method: Method,
    pub handler: H,
}

/// Path to route mapping
#[derive(Debug)]
pub struct Routes<H> {
    table: HashMap<String, Route<H>>,
}

impl<H> Routes<H> {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Register a route, returning the one it replaced
    ///
    /// One route per path: registering a path again overwrites it, even
    /// with a different method.
    pub fn insert(&mut self, path: impl Into<String>, method: Method, handler: H) -> Option<Route<H>> {
        self.table.insert(path.into(), Route { method, handler })
    }

    /// Find the handler for a path and raw method text
    pub fn find(&self, path: &str, method: &str) -> Option<&H> {
        let route = self.table.get(path).or_else(|| self.table.get(FALLBACK))?;
        (route.method.as_str() == method).then_some(&route.handler)
    }

    /// Get the route registered at exactly this key
    pub fn get(&self, path: &str) -> Option<&Route<H>> {
        self.table.get(path)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Registered paths
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(|s| s.as_str())
    }
}

impl<H> Default for Routes<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let mut routes: Routes<&str> = Routes::new();
        routes.insert("/", Method::Get, "home");
        routes.insert("/users", Method::Post, "create_user");

        assert_eq!(routes.find("/", "GET"), Some(&"home"));
        assert_eq!(routes.find("/users", "POST"), Some(&"create_user"));
    }

    #[test]
    fn test_method_mismatch() {
        let mut routes: Routes<&str> = Routes::new();
        routes.insert("/users", Method::Get, "users");

        assert_eq!(routes.find("/users", "POST"), None);
        assert_eq!(routes.find("/users", "get"), None);
        assert_eq!(routes.find("/users", "HEAD"), None);
    }

    #[test]
    fn test_no_normalization() {
        let mut routes: Routes<&str> = Routes::new();
        routes.insert("/about", Method::Get, "about");

        assert_eq!(routes.find("/about/", "GET"), None);
        assert_eq!(routes.find("/About", "GET"), None);
        assert_eq!(routes.find("about", "GET"), None);
    }

    #[test]
    fn test_last_registration_wins() {
        let mut routes: Routes<&str> = Routes::new();
        assert!(routes.insert("/", Method::Get, "first").is_none());
        let replaced = routes.insert("/", Method::Post, "second").unwrap();

        assert_eq!(replaced.handler, "first");
        assert_eq!(routes.len(), 1);
        assert_eq!(routes.find("/", "GET"), None);
        assert_eq!(routes.find("/", "POST"), Some(&"second"));
    }

    #[test]
    fn test_fallback_route() {
        let mut routes: Routes<&str> = Routes::new();
        routes.insert("/", Method::Get, "home");
        routes.insert(FALLBACK, Method::Get, "spa");

        assert_eq!(routes.find("/", "GET"), Some(&"home"));
        assert_eq!(routes.find("/deep/link", "GET"), Some(&"spa"));
        assert_eq!(routes.find("/deep/link", "POST"), None);
    }

    #[test]
    fn test_exact_entry_shadows_fallback() {
        let mut routes: Routes<&str> = Routes::new();
        routes.insert("/api", Method::Post, "api");
        routes.insert(FALLBACK, Method::Get, "spa");

        assert_eq!(routes.find("/api", "GET"), None);
    }
}
