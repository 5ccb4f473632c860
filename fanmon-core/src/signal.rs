//! Signal handlers feeding the object cache
//!
//! Each handler checks one incoming bus event against one watched
//! property and, on a match, writes the new value into the cache.
//! A `false` return means the event did not concern that property; it is
//! not an error and leaves the cache untouched.

use crate::cache::ObjectCache;
use crate::types::{BusEvent, InterfaceMap, PropertyKey, PropertyMap};

/// Handle a properties-changed notification for `interface`
pub fn properties_changed(
    interface: &str,
    changed: &PropertyMap,
    obj: &PropertyKey,
    cache: &mut ObjectCache,
) -> bool {
    if interface != obj.interface {
        return false;
    }

    let Some(value) = changed.get(&obj.property) else {
        return false;
    };

    cache.set(obj.clone(), value.clone());
    true
}

/// Handle an interfaces-added notification on `path`
pub fn interfaces_added(
    path: &str,
    interfaces: &InterfaceMap,
    obj: &PropertyKey,
    cache: &mut ObjectCache,
) -> bool {
    if path != obj.path {
        return false;
    }

    let Some(props) = interfaces.get(&obj.interface) else {
        return false;
    };

    let Some(value) = props.get(&obj.property) else {
        return false;
    };

    cache.set(obj.clone(), value.clone());
    true
}

/// Route an event to the matching handler.
///
/// Properties-changed events are scoped by object path the way a bus
/// match rule would scope them, so an event for another object never
/// reaches the handler.
pub fn dispatch(event: &BusEvent, obj: &PropertyKey, cache: &mut ObjectCache) -> bool {
    match event {
        BusEvent::PropertiesChanged {
            path,
            interface,
            changed,
        } => *path == obj.path && properties_changed(interface, changed, obj, cache),
        BusEvent::InterfacesAdded { path, interfaces } => {
            interfaces_added(path, interfaces, obj, cache)
        }
    }
}
