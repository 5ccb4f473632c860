//! Object cache
//!
//! Last known value of every watched property. Written only by signal
//! dispatch (and the initial seed); read by sensors and policies so they
//! never block on the bus.

use std::collections::HashMap;

use crate::types::{PropertyKey, PropertyValue};

/// Mapping of (path, interface, property) to the last value seen
#[derive(Debug, Default, Clone)]
pub struct ObjectCache {
    entries: HashMap<PropertyKey, PropertyValue>,
}

impl ObjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the value for `key`
    pub fn set(&mut self, key: PropertyKey, value: PropertyValue) {
        self.entries.insert(key, value);
    }

    /// Last value for `key`; `None` means unknown
    pub fn get(&self, key: &PropertyKey) -> Option<&PropertyValue> {
        self.entries.get(key)
    }

    /// Convenience lookup without building a `PropertyKey`
    pub fn get_property(
        &self,
        path: &str,
        interface: &str,
        property: &str,
    ) -> Option<&PropertyValue> {
        self.entries.get(&PropertyKey::new(path, interface, property))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_key_is_unknown() {
        let cache = ObjectCache::new();
        assert!(cache.get(&PropertyKey::tach_input("fan0_0")).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_set_overwrites() {
        let mut cache = ObjectCache::new();
        let key = PropertyKey::tach_input("fan0_0");

        cache.set(key.clone(), PropertyValue::Double(1000.0));
        cache.set(key.clone(), PropertyValue::Double(0.0));

        assert_eq!(cache.get(&key), Some(&PropertyValue::Double(0.0)));
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.get_property(&key.path, &key.interface, &key.property),
            Some(&PropertyValue::Double(0.0))
        );
    }
}
