//! Typed per-request context
//!
//! Middleware contributes named entries; handlers look them up by name and
//! type. A lookup with the wrong type behaves like a missing entry.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

type Entry = Box<dyn Any + Send + Sync>;

/// Named, typed values attached to a request
#[derive(Default)]
pub struct Context {
    entries: HashMap<String, Entry>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning true if an entry with that name was replaced
    pub fn insert<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) -> bool {
        self.entries.insert(name.into(), Box::new(value)).is_some()
    }

    /// Get a value by name and type
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<&T> {
        self.entries.get(name).and_then(|v| v.downcast_ref::<T>())
    }

    /// Get a mutable value by name and type
    pub fn get_mut<T: Any + Send + Sync>(&mut self, name: &str) -> Option<&mut T> {
        self.entries.get_mut(name).and_then(|v| v.downcast_mut::<T>())
    }

    /// Remove a value by name and type
    ///
    /// An entry of a different type is left in place.
    pub fn remove<T: Any + Send + Sync>(&mut self, name: &str) -> Option<T> {
        if !self.entries.get(name).is_some_and(|v| v.is::<T>()) {
            return None;
        }
        self.entries
            .remove(name)
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }

    /// Check whether an entry with this name exists (any type)
    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|s| s.as_str())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut ctx = Context::new();
        assert!(!ctx.insert("cookies", vec!["cookie".to_string()]));

        assert!(ctx.has("cookies"));
        assert_eq!(
            ctx.get::<Vec<String>>("cookies").map(|v| v.len()),
            Some(1)
        );
        assert!(!ctx.has("session"));
    }

    #[test]
    fn test_wrong_type_is_absent() {
        let mut ctx = Context::new();
        ctx.insert("count", 3u32);

        assert!(ctx.get::<String>("count").is_none());
        assert!(ctx.remove::<String>("count").is_none());
        assert_eq!(ctx.get::<u32>("count"), Some(&3));
    }

    #[test]
    fn test_overwrite_and_remove() {
        let mut ctx = Context::new();
        ctx.insert("user", "alice".to_string());
        assert!(ctx.insert("user", "bob".to_string()));

        if let Some(user) = ctx.get_mut::<String>("user") {
            user.push('!');
        }
        assert_eq!(ctx.remove::<String>("user").as_deref(), Some("bob!"));
        assert!(ctx.is_empty());
    }
}
