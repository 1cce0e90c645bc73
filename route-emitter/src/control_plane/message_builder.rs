//! Derives the minimal register/unregister batch from an entry transition.

use crate::control_plane::messages::{MessagesToEmit, RegistryMessage};
use crate::control_plane::routable_entry::{Endpoint, RoutableEntry, Routes};

/// Registrations implied by moving a key from `existing` to `new_entry`.
///
/// With no hostnames nothing can be registered. A brand-new entry, or one
/// whose hostname set changed, re-registers every endpoint under the full
/// hostname set; re-registration is idempotent at the router. Otherwise only
/// endpoints the old entry did not already cover are registered, where an
/// evacuating instance is covered by its live replacement and vice versa.
pub fn registrations_for(
    existing: Option<&RoutableEntry>,
    new_entry: &RoutableEntry,
) -> MessagesToEmit {
    let mut messages = MessagesToEmit::default();

    if new_entry.hostnames.is_empty() {
        return messages;
    }

    let routes = new_entry.routes();

    let hostnames_changed = match existing {
        Some(existing) => existing.hostnames != new_entry.hostnames,
        None => true,
    };

    for endpoint in new_entry.sorted_endpoints() {
        let already_covered = !hostnames_changed
            && existing.is_some_and(|existing| existing.has_endpoint(endpoint));
        if !already_covered {
            messages
                .registrations
                .push(RegistryMessage::for_endpoint(endpoint, &routes));
        }
    }

    messages
}

/// Unregistrations implied by moving a key from `existing` to `new_entry`.
///
/// Endpoints that disappeared are unregistered under the old hostname set.
/// An evacuating endpoint whose live replacement is present in the new entry
/// is left alone; it keeps serving until explicitly removed. Endpoints that
/// remain are unregistered only for hostnames that disappeared.
pub fn unregistrations_for(existing: &RoutableEntry, new_entry: &RoutableEntry) -> MessagesToEmit {
    let mut messages = MessagesToEmit::default();

    if existing.endpoints.is_empty() {
        return messages;
    }

    let old_routes = existing.routes();
    let mut remaining: Vec<&Endpoint> = Vec::new();

    for endpoint in existing.sorted_endpoints() {
        if endpoint_survives(endpoint, new_entry) {
            remaining.push(endpoint);
        } else if !existing.hostnames.is_empty() {
            messages
                .unregistrations
                .push(RegistryMessage::for_endpoint(endpoint, &old_routes));
        }
    }

    let mut lost_hostnames: Vec<String> = existing
        .hostnames
        .difference(&new_entry.hostnames)
        .cloned()
        .collect();
    lost_hostnames.sort();

    if !lost_hostnames.is_empty() {
        let lost_routes = Routes {
            hostnames: lost_hostnames,
            log_guid: existing.log_guid.clone(),
            route_service_url: existing.route_service_url.clone(),
            modification_tag: existing.modification_tag.clone(),
        };

        for endpoint in remaining {
            messages
                .unregistrations
                .push(RegistryMessage::for_endpoint(endpoint, &lost_routes));
        }
    }

    messages
}

fn endpoint_survives(endpoint: &Endpoint, new_entry: &RoutableEntry) -> bool {
    let key = endpoint.key();
    if new_entry.endpoints.contains_key(&key) {
        return true;
    }

    // An evacuating endpoint with a live replacement keeps serving traffic;
    // a removed live endpoint is unregistered even if its evacuating twin
    // remains.
    endpoint.evacuating && new_entry.endpoints.contains_key(&key.twin())
}
