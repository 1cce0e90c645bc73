//! The live routing table: concurrent state, mutation primitives, and swap.

use crate::control_plane::message_builder::{registrations_for, unregistrations_for};
use crate::control_plane::messages::MessagesToEmit;
use crate::control_plane::routable_entry::{Endpoint, RoutableEntry, Routes};
use crate::models::{ActualLrpGroup, ActualLrpRoutingInfo, DesiredSchedulingInfo, ModificationTag};
use crate::observability::{events, fields};
use crate::routing::by_routing_key::{
    endpoints_by_routing_key, endpoints_from_actual, routes_by_routing_key, routes_from_desired,
    RoutingKey,
};
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use tracing::{debug, warn};

const COMPONENT: &str = "routing_table";

/// In-memory mapping from routing key to its routable entry. The entry map
/// is guarded by one mutex; every operation, including reads, acquires it.
/// The watcher event loop is the only mutator, so lock contention is limited
/// to concurrent reads.
#[derive(Debug, Default)]
pub struct RoutingTable {
    entries: Mutex<HashMap<RoutingKey, RoutableEntry>>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of hostname bindings across all entries.
    pub async fn route_count(&self) -> usize {
        let entries = self.entries.lock().await;
        entries.values().map(|entry| entry.hostnames.len()).sum()
    }

    /// Atomically replaces the entry map with a freshly built one.
    ///
    /// Everything in the new table is registered (idempotent at the router);
    /// endpoints and hostnames present before but missing now are
    /// unregistered against what the old entries knew.
    pub async fn swap(&self, new_table: TempTable) -> MessagesToEmit {
        let new_entries = new_table.entries;
        let mut entries = self.entries.lock().await;

        let mut messages = MessagesToEmit::default();
        for key in sorted_keys(&new_entries) {
            messages.merge(registrations_for(None, &new_entries[key]));
        }
        for key in sorted_keys(&entries) {
            let new_entry = new_entries.get(key).cloned().unwrap_or_default();
            messages.merge(unregistrations_for(&entries[key], &new_entry));
        }

        *entries = new_entries;
        messages
    }

    /// Full registration snapshot of the current state.
    pub async fn messages_to_emit(&self) -> MessagesToEmit {
        let entries = self.entries.lock().await;

        let mut messages = MessagesToEmit::default();
        for key in sorted_keys(&entries) {
            messages.merge(registrations_for(None, &entries[key]));
        }
        messages
    }

    /// Replaces the hostname bindings for a key. Applies only when the
    /// incoming tag strictly succeeds the stored one; endpoints are left
    /// intact either way.
    pub async fn set_routes(&self, key: RoutingKey, routes: Routes) -> MessagesToEmit {
        let mut entries = self.entries.lock().await;

        let current = entries.get(&key).cloned().unwrap_or_default();
        if !current
            .modification_tag
            .succeeded_by(&routes.modification_tag)
        {
            return MessagesToEmit::default();
        }

        let mut new_entry = RoutableEntry::from_routes(&routes);
        new_entry.endpoints = current.endpoints.clone();

        let messages = entry_diff(&current, &new_entry);
        entries.insert(key, new_entry);
        messages
    }

    /// Clears the hostname bindings for a key when the tag equals or
    /// succeeds the stored one. Endpoints are retained so a later
    /// `set_routes` re-pairs them without churn.
    pub async fn remove_routes(
        &self,
        key: &RoutingKey,
        modification_tag: &ModificationTag,
    ) -> MessagesToEmit {
        let mut entries = self.entries.lock().await;

        let Some(current) = entries.get(key).cloned() else {
            return MessagesToEmit::default();
        };
        if !current
            .modification_tag
            .equal_or_succeeded_by(modification_tag)
        {
            return MessagesToEmit::default();
        }

        let new_entry = RoutableEntry {
            endpoints: current.endpoints.clone(),
            modification_tag: modification_tag.clone(),
            ..Default::default()
        };

        let messages = entry_diff(&current, &new_entry);
        entries.insert(key.clone(), new_entry);
        messages
    }

    /// Inserts or replaces an endpoint, keyed by `(instance, evacuating)`.
    /// A stored endpoint is only replaced when the incoming tag equals or
    /// succeeds its tag; stale arrivals leave the table untouched.
    pub async fn add_endpoint(&self, key: RoutingKey, endpoint: Endpoint) -> MessagesToEmit {
        let mut entries = self.entries.lock().await;

        let current = entries.entry(key).or_default();
        if let Some(existing) = current.endpoints.get(&endpoint.key()) {
            if !existing
                .modification_tag
                .equal_or_succeeded_by(&endpoint.modification_tag)
            {
                return MessagesToEmit::default();
            }
        }

        let old_entry = current.clone();
        current.endpoints.insert(endpoint.key(), endpoint);
        entry_diff(&old_entry, current)
    }

    /// Deletes an endpoint when the provided tag equals or succeeds the
    /// stored one.
    pub async fn remove_endpoint(&self, key: &RoutingKey, endpoint: &Endpoint) -> MessagesToEmit {
        let mut entries = self.entries.lock().await;

        let Some(current) = entries.get_mut(key) else {
            return MessagesToEmit::default();
        };
        let Some(existing) = current.endpoints.get(&endpoint.key()) else {
            return MessagesToEmit::default();
        };
        if !existing
            .modification_tag
            .equal_or_succeeded_by(&endpoint.modification_tag)
        {
            return MessagesToEmit::default();
        }

        let old_entry = current.clone();
        current.endpoints.remove(&endpoint.key());
        entry_diff(&old_entry, current)
    }

    /// Applies a desired record wholesale, one `set_routes` per entry in its
    /// `cf-router` blob. A malformed blob contributes nothing.
    pub async fn set_routes_from_desired(
        &self,
        desired: &DesiredSchedulingInfo,
    ) -> MessagesToEmit {
        let mut messages = MessagesToEmit::default();
        for (key, routes) in extract_desired_routes(desired) {
            messages.merge(self.set_routes(key, routes).await);
        }
        messages
    }

    /// Applies a desired-record transition: routes from `after` are set, and
    /// keys that vanished are cleared under `after`'s tag. A key vanishes
    /// when the blob no longer lists it, and also when the record's port
    /// list drops its container port even though the blob still mentions it.
    pub async fn update_routes_from_desired(
        &self,
        before: &DesiredSchedulingInfo,
        after: &DesiredSchedulingInfo,
    ) -> MessagesToEmit {
        debug!(
            component = COMPONENT,
            process_guid = %after.process_guid,
            routes = %fields::format_router_routes(&after.routes),
            "desired record changed"
        );

        let after_routes = extract_desired_routes(after);
        let after_keys: HashSet<RoutingKey> =
            after_routes.iter().map(|(key, _)| key.clone()).collect();
        let after_ports: HashSet<u32> = after.ports.iter().copied().collect();

        let mut messages = MessagesToEmit::default();
        for (key, routes) in after_routes {
            messages.merge(self.set_routes(key, routes).await);
        }

        for (key, _) in extract_desired_routes(before) {
            if !after_keys.contains(&key) || !after_ports.contains(&key.container_port) {
                debug!(
                    component = COMPONENT,
                    routing_key = %fields::format_routing_key(&key),
                    "removing routes for vanished key"
                );
                messages.merge(self.remove_routes(&key, &after.modification_tag).await);
            }
        }

        messages
    }

    /// Clears every key a desired record contributed, under the record's tag.
    pub async fn remove_routes_from_desired(
        &self,
        desired: &DesiredSchedulingInfo,
    ) -> MessagesToEmit {
        let mut messages = MessagesToEmit::default();
        for (key, _) in extract_desired_routes(desired) {
            messages.merge(self.remove_routes(&key, &desired.modification_tag).await);
        }
        messages
    }

    /// Adds one endpoint per port mapping of a routable actual record.
    /// Records without port mappings contribute nothing.
    pub async fn add_endpoints_from_actual(
        &self,
        routing_info: &ActualLrpRoutingInfo,
    ) -> MessagesToEmit {
        let mut messages = MessagesToEmit::default();
        for (container_port, endpoint) in extract_actual_endpoints(routing_info) {
            let key = RoutingKey::new(routing_info.actual.process_guid.clone(), container_port);
            messages.merge(self.add_endpoint(key, endpoint).await);
        }
        messages
    }

    /// Removes one endpoint per port mapping of a routable actual record.
    pub async fn remove_endpoints_from_actual(
        &self,
        routing_info: &ActualLrpRoutingInfo,
    ) -> MessagesToEmit {
        let mut messages = MessagesToEmit::default();
        for (container_port, endpoint) in extract_actual_endpoints(routing_info) {
            let key = RoutingKey::new(routing_info.actual.process_guid.clone(), container_port);
            messages.merge(self.remove_endpoint(&key, &endpoint).await);
        }
        messages
    }
}

fn extract_desired_routes(desired: &DesiredSchedulingInfo) -> Vec<(RoutingKey, Routes)> {
    match routes_from_desired(desired) {
        Ok(routes) => routes,
        Err(err) => {
            warn!(
                event = events::ROUTING_INFO_INVALID,
                component = COMPONENT,
                process_guid = %desired.process_guid,
                err = %err,
                "desired record contributes no routes"
            );
            Vec::new()
        }
    }
}

fn extract_actual_endpoints(routing_info: &ActualLrpRoutingInfo) -> HashMap<u32, Endpoint> {
    match endpoints_from_actual(routing_info) {
        Ok(endpoints) => endpoints,
        Err(err) => {
            debug!(
                event = events::ENDPOINTS_MISSING_PORTS,
                component = COMPONENT,
                process_guid = %routing_info.actual.process_guid,
                err = %err,
                "actual record contributes no endpoints"
            );
            HashMap::new()
        }
    }
}

fn entry_diff(old_entry: &RoutableEntry, new_entry: &RoutableEntry) -> MessagesToEmit {
    let mut messages = registrations_for(Some(old_entry), new_entry);
    messages.merge(unregistrations_for(old_entry, new_entry));
    messages
}

fn sorted_keys(entries: &HashMap<RoutingKey, RoutableEntry>) -> Vec<&RoutingKey> {
    let mut keys: Vec<&RoutingKey> = entries.keys().collect();
    keys.sort_by(|a, b| {
        (&a.process_guid, a.container_port).cmp(&(&b.process_guid, b.container_port))
    });
    keys
}

/// A table under construction during bulk sync. Single-writer, unlocked; it
/// becomes shared state only at the moment `RoutingTable::swap` consumes it.
#[derive(Debug, Default)]
pub struct TempTable {
    entries: HashMap<RoutingKey, RoutableEntry>,
}

impl TempTable {
    pub fn new(
        routes_by_key: HashMap<RoutingKey, Routes>,
        endpoints_by_key: HashMap<RoutingKey, Vec<Endpoint>>,
    ) -> Self {
        let mut entries = HashMap::new();

        for (key, routes) in routes_by_key {
            entries.insert(key, RoutableEntry::from_routes(&routes));
        }

        for (key, endpoints) in endpoints_by_key {
            let entry: &mut RoutableEntry = entries.entry(key).or_default();
            for endpoint in endpoints {
                entry.endpoints.insert(endpoint.key(), endpoint);
            }
        }

        Self { entries }
    }

    /// Builds the table from the two bulk snapshot fetches.
    pub fn from_snapshots(
        scheduling_infos: &[DesiredSchedulingInfo],
        actual_groups: &[ActualLrpGroup],
    ) -> Self {
        Self::new(
            routes_by_routing_key(scheduling_infos),
            endpoints_by_routing_key(actual_groups),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{RoutingTable, TempTable};
    use crate::control_plane::messages::{MessagesToEmit, RegistryMessage};
    use crate::control_plane::routable_entry::{Endpoint, Routes};
    use crate::models::{
        ActualLrp, ActualLrpGroup, ActualLrpRoutingInfo, ActualLrpState, DesiredSchedulingInfo,
        ModificationTag, PortMapping,
    };
    use crate::routing::by_routing_key::RoutingKey;
    use crate::routing::cf_routes::{routing_info_from_cf_routes, CfRoute, CF_ROUTER};
    use std::collections::HashMap;

    const HOSTNAME_1: &str = "foo.example.com";
    const HOSTNAME_2: &str = "bar.example.com";
    const HOSTNAME_3: &str = "baz.example.com";
    const LOG_GUID: &str = "some-log-guid";

    fn key() -> RoutingKey {
        RoutingKey::new("some-process-guid", 8080)
    }

    fn older_tag() -> ModificationTag {
        ModificationTag::new("abc", 0)
    }

    fn current_tag() -> ModificationTag {
        ModificationTag::new("abc", 1)
    }

    fn newer_tag() -> ModificationTag {
        ModificationTag::new("def", 0)
    }

    fn endpoint(instance_guid: &str, host: &str, port: u32) -> Endpoint {
        Endpoint {
            instance_guid: instance_guid.to_string(),
            host: host.to_string(),
            port,
            container_port: 8080,
            evacuating: false,
            modification_tag: current_tag(),
            ..Default::default()
        }
    }

    fn endpoint_1() -> Endpoint {
        endpoint("ig-1", "1.1.1.1", 11)
    }

    fn endpoint_2() -> Endpoint {
        endpoint("ig-2", "2.2.2.2", 22)
    }

    fn endpoint_3() -> Endpoint {
        endpoint("ig-3", "3.3.3.3", 33)
    }

    fn evacuating_1() -> Endpoint {
        Endpoint {
            evacuating: true,
            ..endpoint_1()
        }
    }

    fn routes(hostnames: &[&str], modification_tag: ModificationTag) -> Routes {
        Routes {
            hostnames: hostnames.iter().map(|name| name.to_string()).collect(),
            log_guid: LOG_GUID.to_string(),
            route_service_url: None,
            modification_tag,
        }
    }

    fn temp_table(hostnames: &[&str], endpoints: &[Endpoint]) -> TempTable {
        let mut routes_by_key = HashMap::new();
        if !hostnames.is_empty() {
            routes_by_key.insert(key(), routes(hostnames, ModificationTag::default()));
        }
        let mut endpoints_by_key = HashMap::new();
        if !endpoints.is_empty() {
            endpoints_by_key.insert(key(), endpoints.to_vec());
        }
        TempTable::new(routes_by_key, endpoints_by_key)
    }

    fn registration(endpoint: &Endpoint, hostnames: &[&str]) -> RegistryMessage {
        RegistryMessage::for_endpoint(
            endpoint,
            &routes(hostnames, ModificationTag::default()),
        )
    }

    fn assert_same_messages(actual: &[RegistryMessage], expected: &[RegistryMessage]) {
        let mut actual = actual.to_vec();
        let mut expected = expected.to_vec();
        let by_wire = |message: &RegistryMessage| {
            serde_json::to_string(message).expect("message serializes")
        };
        actual.sort_by_key(by_wire);
        expected.sort_by_key(by_wire);
        assert_eq!(actual, expected);
    }

    fn assert_messages(
        messages: &MessagesToEmit,
        registrations: &[RegistryMessage],
        unregistrations: &[RegistryMessage],
    ) {
        assert_same_messages(&messages.registrations, registrations);
        assert_same_messages(&messages.unregistrations, unregistrations);
    }

    #[tokio::test]
    async fn swap_of_a_new_key_with_routes_and_endpoints_registers_each_pairing() {
        let table = RoutingTable::new();

        let messages = table
            .swap(temp_table(&[HOSTNAME_1, HOSTNAME_2], &[endpoint_1(), endpoint_2()]))
            .await;

        assert_messages(
            &messages,
            &[
                registration(&endpoint_1(), &[HOSTNAME_1, HOSTNAME_2]),
                registration(&endpoint_2(), &[HOSTNAME_1, HOSTNAME_2]),
            ],
            &[],
        );
    }

    #[tokio::test]
    async fn swap_with_only_routes_emits_nothing_until_endpoints_arrive() {
        let table = RoutingTable::new();

        let messages = table.swap(temp_table(&[HOSTNAME_1], &[])).await;
        assert!(messages.is_empty());

        let messages = table.swap(temp_table(&[HOSTNAME_1], &[endpoint_1()])).await;
        assert_messages(
            &messages,
            &[registration(&endpoint_1(), &[HOSTNAME_1])],
            &[],
        );
    }

    #[tokio::test]
    async fn swap_with_only_endpoints_emits_nothing_until_routes_arrive() {
        let table = RoutingTable::new();

        let messages = table.swap(temp_table(&[], &[endpoint_1()])).await;
        assert!(messages.is_empty());

        let messages = table.swap(temp_table(&[HOSTNAME_1], &[endpoint_1()])).await;
        assert_messages(
            &messages,
            &[registration(&endpoint_1(), &[HOSTNAME_1])],
            &[],
        );
    }

    #[tokio::test]
    async fn swap_with_no_changes_reregisters_everything() {
        let table = RoutingTable::new();
        table
            .swap(temp_table(&[HOSTNAME_1, HOSTNAME_2], &[endpoint_1(), endpoint_2()]))
            .await;

        let messages = table
            .swap(temp_table(&[HOSTNAME_1, HOSTNAME_2], &[endpoint_1(), endpoint_2()]))
            .await;

        assert_messages(
            &messages,
            &[
                registration(&endpoint_1(), &[HOSTNAME_1, HOSTNAME_2]),
                registration(&endpoint_2(), &[HOSTNAME_1, HOSTNAME_2]),
            ],
            &[],
        );
    }

    #[tokio::test]
    async fn swap_that_loses_routes_unregisters_them_for_every_endpoint() {
        let table = RoutingTable::new();
        table
            .swap(temp_table(&[HOSTNAME_1, HOSTNAME_2], &[endpoint_1(), endpoint_2()]))
            .await;

        let messages = table
            .swap(temp_table(&[HOSTNAME_1], &[endpoint_1(), endpoint_2()]))
            .await;

        assert_messages(
            &messages,
            &[
                registration(&endpoint_1(), &[HOSTNAME_1]),
                registration(&endpoint_2(), &[HOSTNAME_1]),
            ],
            &[
                registration(&endpoint_1(), &[HOSTNAME_2]),
                registration(&endpoint_2(), &[HOSTNAME_2]),
            ],
        );
    }

    #[tokio::test]
    async fn swap_that_loses_endpoints_unregisters_them() {
        let table = RoutingTable::new();
        table
            .swap(temp_table(&[HOSTNAME_1, HOSTNAME_2], &[endpoint_1(), endpoint_2()]))
            .await;

        let messages = table
            .swap(temp_table(&[HOSTNAME_1, HOSTNAME_2], &[endpoint_1()]))
            .await;

        assert_messages(
            &messages,
            &[registration(&endpoint_1(), &[HOSTNAME_1, HOSTNAME_2])],
            &[registration(&endpoint_2(), &[HOSTNAME_1, HOSTNAME_2])],
        );
    }

    #[tokio::test]
    async fn swap_that_loses_both_routes_and_endpoints_splits_the_unregistrations() {
        let table = RoutingTable::new();
        table
            .swap(temp_table(&[HOSTNAME_1, HOSTNAME_2], &[endpoint_1(), endpoint_2()]))
            .await;

        let messages = table.swap(temp_table(&[HOSTNAME_1], &[endpoint_1()])).await;

        assert_messages(
            &messages,
            &[registration(&endpoint_1(), &[HOSTNAME_1])],
            &[
                registration(&endpoint_1(), &[HOSTNAME_2]),
                registration(&endpoint_2(), &[HOSTNAME_1, HOSTNAME_2]),
            ],
        );
    }

    #[tokio::test]
    async fn swap_that_gains_routes_but_loses_endpoints_registers_and_unregisters() {
        let table = RoutingTable::new();
        table
            .swap(temp_table(&[HOSTNAME_1, HOSTNAME_2], &[endpoint_1(), endpoint_2()]))
            .await;

        let messages = table
            .swap(temp_table(&[HOSTNAME_1, HOSTNAME_2, HOSTNAME_3], &[endpoint_1()]))
            .await;

        assert_messages(
            &messages,
            &[registration(&endpoint_1(), &[HOSTNAME_1, HOSTNAME_2, HOSTNAME_3])],
            &[registration(&endpoint_2(), &[HOSTNAME_1, HOSTNAME_2])],
        );
    }

    #[tokio::test]
    async fn swap_to_an_empty_table_unregisters_the_missing_pairings() {
        let table = RoutingTable::new();
        table
            .swap(temp_table(&[HOSTNAME_1, HOSTNAME_2], &[endpoint_1(), endpoint_2()]))
            .await;

        let messages = table.swap(TempTable::default()).await;

        assert_messages(
            &messages,
            &[],
            &[
                registration(&endpoint_1(), &[HOSTNAME_1, HOSTNAME_2]),
                registration(&endpoint_2(), &[HOSTNAME_1, HOSTNAME_2]),
            ],
        );
    }

    #[tokio::test]
    async fn swap_keeps_an_evacuating_endpoint_and_its_live_twin_registered() {
        let table = RoutingTable::new();
        table
            .swap(temp_table(
                &[HOSTNAME_1, HOSTNAME_2],
                &[endpoint_1(), endpoint_2(), evacuating_1()],
            ))
            .await;

        let messages = table
            .swap(temp_table(&[HOSTNAME_1, HOSTNAME_2], &[endpoint_2(), evacuating_1()]))
            .await;

        // The removed live instance is unregistered; the evacuating twin
        // keeps serving until it is removed itself.
        assert_messages(
            &messages,
            &[
                registration(&endpoint_2(), &[HOSTNAME_1, HOSTNAME_2]),
                registration(&evacuating_1(), &[HOSTNAME_1, HOSTNAME_2]),
            ],
            &[registration(&endpoint_1(), &[HOSTNAME_1, HOSTNAME_2])],
        );
    }

    #[tokio::test]
    async fn mutations_on_an_empty_table_emit_nothing() {
        let table = RoutingTable::new();

        assert!(table
            .set_routes(key(), routes(&[HOSTNAME_1, HOSTNAME_2], current_tag()))
            .await
            .is_empty());
        assert!(table.remove_routes(&key(), &current_tag()).await.is_empty());
        assert!(table.add_endpoint(key(), endpoint_1()).await.is_empty());
        assert!(table.remove_endpoint(&key(), &endpoint_1()).await.is_empty());
    }

    async fn populated_table() -> RoutingTable {
        let table = RoutingTable::new();
        table
            .set_routes(key(), routes(&[HOSTNAME_1, HOSTNAME_2], current_tag()))
            .await;
        table.add_endpoint(key(), endpoint_1()).await;
        table.add_endpoint(key(), endpoint_2()).await;
        table
    }

    #[tokio::test]
    async fn set_routes_with_unchanged_hostnames_emits_nothing() {
        let table = populated_table().await;

        let messages = table
            .set_routes(key(), routes(&[HOSTNAME_1, HOSTNAME_2], current_tag()))
            .await;

        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn set_routes_with_an_older_tag_is_dropped() {
        let table = populated_table().await;

        let messages = table
            .set_routes(
                key(),
                routes(&[HOSTNAME_1, HOSTNAME_2, HOSTNAME_3], older_tag()),
            )
            .await;

        assert!(messages.is_empty());
        assert_eq!(table.route_count().await, 2);
    }

    #[tokio::test]
    async fn set_routes_with_a_newer_tag_registers_added_hostnames() {
        let table = populated_table().await;

        let messages = table
            .set_routes(
                key(),
                routes(&[HOSTNAME_1, HOSTNAME_2, HOSTNAME_3], newer_tag()),
            )
            .await;

        assert_messages(
            &messages,
            &[
                registration(&endpoint_1(), &[HOSTNAME_1, HOSTNAME_2, HOSTNAME_3]),
                registration(&endpoint_2(), &[HOSTNAME_1, HOSTNAME_2, HOSTNAME_3]),
            ],
            &[],
        );
    }

    #[tokio::test]
    async fn set_routes_with_a_newer_tag_unregisters_removed_hostnames() {
        let table = populated_table().await;

        let messages = table
            .set_routes(key(), routes(&[HOSTNAME_1], newer_tag()))
            .await;

        assert_messages(
            &messages,
            &[
                registration(&endpoint_1(), &[HOSTNAME_1]),
                registration(&endpoint_2(), &[HOSTNAME_1]),
            ],
            &[
                registration(&endpoint_1(), &[HOSTNAME_2]),
                registration(&endpoint_2(), &[HOSTNAME_2]),
            ],
        );
    }

    #[tokio::test]
    async fn remove_routes_with_an_equal_or_newer_tag_unregisters_everything() {
        let table = populated_table().await;

        let messages = table.remove_routes(&key(), &newer_tag()).await;

        assert_messages(
            &messages,
            &[],
            &[
                registration(&endpoint_1(), &[HOSTNAME_1, HOSTNAME_2]),
                registration(&endpoint_2(), &[HOSTNAME_1, HOSTNAME_2]),
            ],
        );
        assert_eq!(table.route_count().await, 0);
    }

    #[tokio::test]
    async fn remove_routes_retains_endpoints_for_a_later_set_routes() {
        let table = populated_table().await;
        table.remove_routes(&key(), &newer_tag()).await;

        let messages = table
            .set_routes(key(), routes(&[HOSTNAME_1], ModificationTag::new("ghi", 0)))
            .await;

        assert_messages(
            &messages,
            &[
                registration(&endpoint_1(), &[HOSTNAME_1]),
                registration(&endpoint_2(), &[HOSTNAME_1]),
            ],
            &[],
        );
    }

    #[tokio::test]
    async fn remove_routes_with_an_older_tag_is_dropped() {
        let table = populated_table().await;

        let messages = table.remove_routes(&key(), &older_tag()).await;

        assert!(messages.is_empty());
        assert_eq!(table.route_count().await, 2);
    }

    #[tokio::test]
    async fn add_endpoint_registers_the_new_pairings() {
        let table = populated_table().await;

        let messages = table.add_endpoint(key(), endpoint_3()).await;

        assert_messages(
            &messages,
            &[registration(&endpoint_3(), &[HOSTNAME_1, HOSTNAME_2])],
            &[],
        );
    }

    #[tokio::test]
    async fn add_endpoint_with_the_same_tag_emits_nothing() {
        let table = populated_table().await;

        assert!(table.add_endpoint(key(), endpoint_1()).await.is_empty());
    }

    #[tokio::test]
    async fn add_endpoint_with_an_older_tag_is_dropped() {
        let table = populated_table().await;

        let stale = Endpoint {
            host: "9.9.9.9".to_string(),
            modification_tag: older_tag(),
            ..endpoint_1()
        };

        assert!(table.add_endpoint(key(), stale).await.is_empty());

        // The stale address must not survive in the snapshot either.
        let snapshot = table.messages_to_emit().await;
        assert!(snapshot
            .registrations
            .iter()
            .all(|message| message.host != "9.9.9.9"));
    }

    #[tokio::test]
    async fn add_endpoint_for_an_evacuating_twin_emits_nothing() {
        let table = populated_table().await;

        assert!(table.add_endpoint(key(), evacuating_1()).await.is_empty());
    }

    #[tokio::test]
    async fn remove_endpoint_with_an_equal_tag_unregisters_it() {
        let table = populated_table().await;

        let messages = table.remove_endpoint(&key(), &endpoint_2()).await;

        assert_messages(
            &messages,
            &[],
            &[registration(&endpoint_2(), &[HOSTNAME_1, HOSTNAME_2])],
        );
    }

    #[tokio::test]
    async fn remove_endpoint_with_a_newer_tag_unregisters_it() {
        let table = populated_table().await;

        let newer = Endpoint {
            modification_tag: newer_tag(),
            ..endpoint_2()
        };
        let messages = table.remove_endpoint(&key(), &newer).await;

        assert_messages(
            &messages,
            &[],
            &[registration(&endpoint_2(), &[HOSTNAME_1, HOSTNAME_2])],
        );
    }

    #[tokio::test]
    async fn remove_endpoint_with_an_older_tag_is_dropped() {
        let table = populated_table().await;

        let stale = Endpoint {
            modification_tag: older_tag(),
            ..endpoint_2()
        };

        assert!(table.remove_endpoint(&key(), &stale).await.is_empty());
    }

    #[tokio::test]
    async fn removing_a_live_endpoint_keeps_its_evacuating_twin_registered() {
        let table = populated_table().await;
        table.add_endpoint(key(), evacuating_1()).await;

        let messages = table.remove_endpoint(&key(), &endpoint_1()).await;

        assert_messages(
            &messages,
            &[],
            &[registration(&endpoint_1(), &[HOSTNAME_1, HOSTNAME_2])],
        );

        let snapshot = table.messages_to_emit().await;
        assert!(snapshot
            .registrations
            .iter()
            .any(|message| message.private_instance_id.as_deref() == Some("ig-1")));
    }

    #[tokio::test]
    async fn add_then_remove_with_the_same_tag_restores_the_prior_endpoints() {
        let table = populated_table().await;

        table.add_endpoint(key(), endpoint_3()).await;
        let before = table.messages_to_emit().await;
        table.add_endpoint(key(), endpoint_3()).await;
        table.remove_endpoint(&key(), &endpoint_3()).await;
        table.add_endpoint(key(), endpoint_3()).await;
        let after = table.messages_to_emit().await;

        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn messages_to_emit_pairs_every_hostname_with_every_endpoint() {
        let table = populated_table().await;

        let messages = table.messages_to_emit().await;

        assert_messages(
            &messages,
            &[
                registration(&endpoint_1(), &[HOSTNAME_1, HOSTNAME_2]),
                registration(&endpoint_2(), &[HOSTNAME_1, HOSTNAME_2]),
            ],
            &[],
        );
    }

    #[tokio::test]
    async fn messages_to_emit_is_empty_without_routes_or_without_endpoints() {
        let table = RoutingTable::new();
        table
            .set_routes(key(), routes(&[HOSTNAME_1], current_tag()))
            .await;
        assert!(table.messages_to_emit().await.is_empty());

        let table = RoutingTable::new();
        table.add_endpoint(key(), endpoint_1()).await;
        assert!(table.messages_to_emit().await.is_empty());
    }

    #[tokio::test]
    async fn route_count_sums_hostnames_across_processes() {
        let table = RoutingTable::new();
        assert_eq!(table.route_count().await, 0);

        table
            .set_routes(
                RoutingKey::new("pg-a", 8080),
                routes(&[HOSTNAME_1, HOSTNAME_2], current_tag()),
            )
            .await;
        table
            .set_routes(
                RoutingKey::new("pg-b", 8080),
                routes(&[HOSTNAME_1, HOSTNAME_2], current_tag()),
            )
            .await;

        assert_eq!(table.route_count().await, 4);
    }

    #[tokio::test]
    async fn temp_table_from_snapshots_builds_the_cold_start_state() {
        let desired = DesiredSchedulingInfo {
            process_guid: "pg".to_string(),
            log_guid: "lg".to_string(),
            ports: vec![8080],
            routes: routing_info_from_cf_routes(&[CfRoute {
                hostnames: vec!["a.com".to_string()],
                port: 8080,
                route_service_url: None,
            }]),
            ..Default::default()
        };
        let actual = ActualLrpGroup::from_instance(ActualLrp {
            process_guid: "pg".to_string(),
            instance_guid: "ig-1".to_string(),
            address: "1.1.1.1".to_string(),
            ports: vec![PortMapping::new(11, 8080)],
            state: ActualLrpState::Running,
            ..Default::default()
        });

        let table = RoutingTable::new();
        let messages = table
            .swap(TempTable::from_snapshots(&[desired], &[actual]))
            .await;

        assert_eq!(messages.registrations.len(), 1);
        assert!(messages.unregistrations.is_empty());
        let message = &messages.registrations[0];
        assert_eq!(message.uris, vec!["a.com".to_string()]);
        assert_eq!(message.host, "1.1.1.1");
        assert_eq!(message.port, 11);
        assert_eq!(message.app, "lg");
    }

    fn desired_record(
        ports: &[u32],
        cf_routes: &[CfRoute],
        modification_tag: ModificationTag,
    ) -> DesiredSchedulingInfo {
        DesiredSchedulingInfo {
            process_guid: key().process_guid,
            log_guid: LOG_GUID.to_string(),
            ports: ports.to_vec(),
            routes: routing_info_from_cf_routes(cf_routes),
            modification_tag,
        }
    }

    fn cf_route(hostnames: &[&str], port: u32) -> CfRoute {
        CfRoute {
            hostnames: hostnames.iter().map(|name| name.to_string()).collect(),
            port,
            route_service_url: None,
        }
    }

    fn routable_info(actual: ActualLrp, evacuating: bool) -> ActualLrpRoutingInfo {
        ActualLrpRoutingInfo { actual, evacuating }
    }

    fn running_actual(instance_guid: &str, host: &str, ports: &[(u32, u32)]) -> ActualLrp {
        ActualLrp {
            process_guid: key().process_guid,
            instance_guid: instance_guid.to_string(),
            address: host.to_string(),
            domain: "tests".to_string(),
            ports: ports
                .iter()
                .map(|&(host_port, container_port)| PortMapping::new(host_port, container_port))
                .collect(),
            state: ActualLrpState::Running,
            modification_tag: current_tag(),
        }
    }

    #[tokio::test]
    async fn set_routes_from_desired_sets_every_blob_entry() {
        let table = RoutingTable::new();

        table
            .set_routes_from_desired(&desired_record(
                &[8080, 9090],
                &[
                    cf_route(&[HOSTNAME_1, HOSTNAME_2], 8080),
                    cf_route(&[HOSTNAME_3], 9090),
                ],
                current_tag(),
            ))
            .await;

        assert_eq!(table.route_count().await, 3);
    }

    #[tokio::test]
    async fn set_routes_from_desired_skips_a_malformed_blob() {
        let table = RoutingTable::new();

        let mut record = desired_record(&[8080], &[], current_tag());
        record
            .routes
            .insert(CF_ROUTER.to_string(), serde_json::json!("not routes"));

        let messages = table.set_routes_from_desired(&record).await;

        assert!(messages.is_empty());
        assert_eq!(table.route_count().await, 0);
    }

    #[tokio::test]
    async fn update_routes_from_desired_registers_changed_hostnames() {
        let table = populated_table().await;

        let before = desired_record(&[8080], &[cf_route(&[HOSTNAME_1, HOSTNAME_2], 8080)], current_tag());
        let after = desired_record(
            &[8080],
            &[cf_route(&[HOSTNAME_1, HOSTNAME_2, HOSTNAME_3], 8080)],
            ModificationTag::new("abcd", 1),
        );

        let messages = table.update_routes_from_desired(&before, &after).await;

        assert_messages(
            &messages,
            &[
                registration(&endpoint_1(), &[HOSTNAME_1, HOSTNAME_2, HOSTNAME_3]),
                registration(&endpoint_2(), &[HOSTNAME_1, HOSTNAME_2, HOSTNAME_3]),
            ],
            &[],
        );
    }

    #[tokio::test]
    async fn update_routes_from_desired_removes_keys_dropped_from_the_blob() {
        let table = RoutingTable::new();
        let before = desired_record(
            &[8080, 9090],
            &[cf_route(&[HOSTNAME_1], 8080), cf_route(&[HOSTNAME_2], 9090)],
            current_tag(),
        );
        table.set_routes_from_desired(&before).await;
        assert_eq!(table.route_count().await, 2);

        let after = desired_record(
            &[8080, 9090],
            &[cf_route(&[HOSTNAME_1], 8080)],
            ModificationTag::new("abcd", 1),
        );

        table.update_routes_from_desired(&before, &after).await;

        assert_eq!(table.route_count().await, 1);
    }

    #[tokio::test]
    async fn update_routes_from_desired_removes_keys_whose_port_left_the_record() {
        let table = RoutingTable::new();
        let before = desired_record(&[8080], &[cf_route(&[HOSTNAME_1], 8080)], current_tag());
        table.set_routes_from_desired(&before).await;
        assert_eq!(table.route_count().await, 1);

        // The blob still lists port 8080, but the record's ports no longer do.
        let after = desired_record(
            &[],
            &[cf_route(&[HOSTNAME_1], 8080)],
            ModificationTag::new("abcd", 1),
        );

        table.update_routes_from_desired(&before, &after).await;

        assert_eq!(table.route_count().await, 0);
    }

    #[tokio::test]
    async fn remove_routes_from_desired_clears_every_extracted_key() {
        let table = RoutingTable::new();
        let record = desired_record(
            &[8080, 9090],
            &[cf_route(&[HOSTNAME_1], 8080), cf_route(&[HOSTNAME_2], 9090)],
            current_tag(),
        );
        table.set_routes_from_desired(&record).await;

        let mut removed = record;
        removed.modification_tag = ModificationTag::new("defg", 2);
        table.remove_routes_from_desired(&removed).await;

        assert_eq!(table.route_count().await, 0);
    }

    #[tokio::test]
    async fn add_endpoints_from_actual_covers_every_port_mapping() {
        let table = RoutingTable::new();
        table
            .set_routes_from_desired(&desired_record(
                &[8080, 9090],
                &[cf_route(&[HOSTNAME_1], 8080), cf_route(&[HOSTNAME_2], 9090)],
                current_tag(),
            ))
            .await;

        let messages = table
            .add_endpoints_from_actual(&routable_info(
                running_actual("ig-1", "1.1.1.1", &[(11000, 8080), (22000, 9090)]),
                false,
            ))
            .await;

        assert_eq!(messages.registrations.len(), 2);
    }

    #[tokio::test]
    async fn add_endpoints_from_actual_without_port_mappings_contributes_nothing() {
        let table = populated_table().await;

        let messages = table
            .add_endpoints_from_actual(&routable_info(running_actual("ig-9", "9.9.9.9", &[]), false))
            .await;

        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn remove_endpoints_from_actual_unregisters_every_port_mapping() {
        let table = populated_table().await;

        let messages = table
            .remove_endpoints_from_actual(&routable_info(
                running_actual("ig-1", "1.1.1.1", &[(11, 8080)]),
                false,
            ))
            .await;

        assert_messages(
            &messages,
            &[],
            &[registration(&endpoint_1(), &[HOSTNAME_1, HOSTNAME_2])],
        );
    }
}
