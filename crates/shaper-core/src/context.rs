use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// Per-call bag of caller data shared with translators and factories.
///
/// Values are stored type-erased under string keys and read back with their
/// concrete type; a lookup with the wrong type behaves like a missing key.
#[derive(Default)]
pub struct Context {
    entries: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, returning `true` if an existing entry was replaced.
    pub fn insert<K, T>(&mut self, key: K, value: T) -> bool
    where
        K: Into<String>,
        T: Any + Send + Sync,
    {
        self.entries.insert(key.into(), Box::new(value)).is_some()
    }

    pub fn with<K, T>(mut self, key: K, value: T) -> Self
    where
        K: Into<String>,
        T: Any + Send + Sync,
    {
        self.insert(key, value);
        self
    }

    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.entries.get(key)?.downcast_ref::<T>()
    }

    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.entries.get_mut(key)?.downcast_mut::<T>()
    }

    pub fn remove<T: Any>(&mut self, key: &str) -> Option<T> {
        let boxed = self.entries.remove(key)?;
        match boxed.downcast::<T>() {
            Ok(value) => Some(*value),
            Err(other) => {
                // Wrong type: put it back untouched
                self.entries.insert(key.to_string(), other);
                None
            }
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.entries.keys().collect();
        keys.sort();
        f.debug_struct("Context").field("keys", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_round_trip() {
        let mut ctx = Context::new().with("locale", String::from("en-GB"));
        assert_eq!(ctx.get::<String>("locale").map(String::as_str), Some("en-GB"));
        assert!(ctx.get::<u32>("locale").is_none());
        assert!(ctx.insert("locale", String::from("fr-FR")));
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn remove_with_wrong_type_keeps_entry() {
        let mut ctx = Context::new().with("hits", 3u32);
        assert_eq!(ctx.remove::<String>("hits"), None);
        assert!(ctx.contains_key("hits"));
        assert_eq!(ctx.remove::<u32>("hits"), Some(3));
        assert!(ctx.is_empty());
    }

    #[test]
    fn translators_can_count_through_get_mut() {
        let mut ctx = Context::new().with("calls", 0usize);
        for _ in 0..2 {
            if let Some(calls) = ctx.get_mut::<usize>("calls") {
                *calls += 1;
            }
        }
        assert_eq!(ctx.get::<usize>("calls"), Some(&2));
    }
}
