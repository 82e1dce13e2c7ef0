//! Resolving a blueprint into live, wired component instances.
//!
//! Building happens in three stages that mirror how configuration errors
//! should surface: `configure` resolves every vertex to one component
//! class, `connect_components` wires every connection, and `realize`
//! checks readiness and hands over the executable [`Network`].

use std::collections::HashMap;
use std::rc::Rc;

use rf_blueprint::{Blueprint, ConnectionRef};
use rf_components::interfaces::NAME_OF_INTERFACE;
use rf_components::{Component, ComponentCatalog, ComponentHandle, InterfaceKind};
use rf_core::Criterion;

use crate::error::{NetworkError, NetworkResult};
use crate::network::Network;
use crate::selector::ComponentSelector;

pub struct NetworkBuilder {
    blueprint: Blueprint,
    catalog: ComponentCatalog,
    instances: HashMap<String, ComponentHandle>,
    configured: bool,
    connected: bool,
}

impl NetworkBuilder {
    pub fn new(blueprint: Blueprint, catalog: ComponentCatalog) -> Self {
        Self {
            blueprint,
            catalog,
            instances: HashMap::new(),
            configured: false,
            connected: false,
        }
    }

    pub fn blueprint(&self) -> &Blueprint {
        &self.blueprint
    }

    /// Resolve every blueprint vertex to exactly one catalog entry.
    ///
    /// Vertex properties become selection criteria. On top of those,
    /// interface compatibility propagates along connections: an edge
    /// naming an interface constrains its upstream side to provide it and
    /// its downstream side to accept it. Vertices that end up ambiguous
    /// or exhausted are reported together in `UnresolvedComponents`.
    pub fn configure(&mut self) -> NetworkResult<()> {
        let mut selectors: Vec<ComponentSelector> = Vec::new();
        let mut by_name: HashMap<String, usize> = HashMap::new();

        for (name, properties) in self.blueprint.components() {
            let mut selector = ComponentSelector::new(name, &self.catalog);
            for criterion in Criterion::from_map(properties) {
                selector
                    .add_criterion(&criterion)
                    .map_err(|source| NetworkError::InvalidCriteria {
                        component: name.to_owned(),
                        source,
                    })?;
            }
            by_name.insert(name.to_owned(), selectors.len());
            selectors.push(selector);
        }

        for connection in self.blueprint.connections() {
            let Some(names) = connection.properties.get(NAME_OF_INTERFACE) else {
                continue;
            };
            for interface in names {
                let kind = interface_kind(interface, &connection)?;
                let up = *by_name.get(connection.upstream).ok_or_else(|| {
                    NetworkError::MissingComponent {
                        name: connection.upstream.to_owned(),
                    }
                })?;
                let down = *by_name.get(connection.downstream).ok_or_else(|| {
                    NetworkError::MissingComponent {
                        name: connection.downstream.to_owned(),
                    }
                })?;
                selectors[up].require_providing_interface(kind).map_err(|source| {
                    NetworkError::InvalidCriteria {
                        component: connection.upstream.to_owned(),
                        source,
                    }
                })?;
                selectors[down].require_accepting_interface(kind).map_err(|source| {
                    NetworkError::InvalidCriteria {
                        component: connection.downstream.to_owned(),
                        source,
                    }
                })?;
            }
        }

        let mut ambiguous: Vec<(String, usize)> = Vec::new();
        let mut exhausted: Vec<String> = Vec::new();
        let mut instances = HashMap::new();
        for selector in &mut selectors {
            let count = selector.candidate_count();
            match selector.component() {
                Some(handle) => {
                    tracing::debug!(
                        component = %selector.instance_name(),
                        class = selector.resolved_class().unwrap_or(""),
                        "component resolved"
                    );
                    instances.insert(selector.instance_name().to_owned(), handle);
                }
                None if count == 0 => {
                    tracing::warn!(
                        component = %selector.instance_name(),
                        "no candidate satisfies the criteria"
                    );
                    exhausted.push(selector.instance_name().to_owned());
                }
                None => {
                    tracing::warn!(
                        component = %selector.instance_name(),
                        candidates = count,
                        "selection is ambiguous"
                    );
                    ambiguous.push((selector.instance_name().to_owned(), count));
                }
            }
        }
        if !ambiguous.is_empty() || !exhausted.is_empty() {
            return Err(NetworkError::UnresolvedComponents { ambiguous, exhausted });
        }

        self.instances = instances;
        self.configured = true;
        Ok(())
    }

    /// Wire every blueprint connection between the resolved instances.
    ///
    /// A connection carries the interfaces its `NameOfInterface` property
    /// names, or, absent that, the unique interface the upstream side
    /// provides and the downstream side accepts.
    pub fn connect_components(&mut self) -> NetworkResult<()> {
        if !self.configured {
            return Err(NetworkError::NotConfigured);
        }
        for connection in self.blueprint.connections() {
            let upstream = self.instances.get(connection.upstream).ok_or_else(|| {
                NetworkError::MissingComponent {
                    name: connection.upstream.to_owned(),
                }
            })?;
            let downstream = self.instances.get(connection.downstream).ok_or_else(|| {
                NetworkError::MissingComponent {
                    name: connection.downstream.to_owned(),
                }
            })?;
            // A component cannot feed itself; catching it here also keeps
            // the wiring below free of aliased borrows.
            if Rc::ptr_eq(upstream, downstream) {
                return Err(NetworkError::CycleDetected);
            }
            let kinds = connection_kinds(&connection, &*upstream.borrow(), &*downstream.borrow())?;
            for kind in kinds {
                tracing::debug!(
                    upstream = %connection.upstream,
                    downstream = %connection.downstream,
                    connection = %connection.name,
                    %kind,
                    "wiring connection"
                );
                downstream
                    .borrow_mut()
                    .accept_connection(kind, connection.name, upstream)
                    .map_err(|source| NetworkError::ConnectionRejected {
                        upstream: connection.upstream.to_owned(),
                        downstream: connection.downstream.to_owned(),
                        connection: connection.name.to_owned(),
                        source,
                    })?;
            }
        }
        self.connected = true;
        Ok(())
    }

    /// Check readiness and hand over the executable network.
    pub fn realize(self) -> NetworkResult<Network> {
        if !(self.configured && self.connected) {
            return Err(NetworkError::NotConfigured);
        }
        let mut missing: Vec<String> = self
            .instances
            .iter()
            .filter(|(_, handle)| !handle.borrow().connected_ok())
            .map(|(name, _)| name.clone())
            .collect();
        missing.sort();
        if !missing.is_empty() {
            return Err(NetworkError::NotFullyConnected { components: missing });
        }
        let order = self
            .blueprint
            .execution_order()
            .map_err(|_| NetworkError::CycleDetected)?;
        tracing::info!(
            blueprint = %self.blueprint.name(),
            components = order.len(),
            "network realized"
        );
        Ok(Network::new(
            self.blueprint.name().to_owned(),
            self.instances,
            order,
        ))
    }

    /// All three stages in one call.
    pub fn build(mut self) -> NetworkResult<Network> {
        self.configure()?;
        self.connect_components()?;
        self.realize()
    }

    /// Resolved (vertex, class) pairs after a successful `configure`, in
    /// blueprint order.
    pub fn resolutions(&self) -> Vec<(String, &'static str)> {
        self.blueprint
            .component_names()
            .into_iter()
            .filter_map(|name| {
                self.instances
                    .get(name)
                    .map(|handle| (name.to_owned(), handle.borrow().class_name()))
            })
            .collect()
    }
}

fn interface_kind(name: &str, connection: &ConnectionRef<'_>) -> NetworkResult<InterfaceKind> {
    InterfaceKind::from_name(name).ok_or_else(|| NetworkError::UnknownInterface {
        name: name.to_owned(),
        upstream: connection.upstream.to_owned(),
        downstream: connection.downstream.to_owned(),
    })
}

/// The interface kinds one connection carries.
fn connection_kinds(
    connection: &ConnectionRef<'_>,
    upstream: &dyn Component,
    downstream: &dyn Component,
) -> NetworkResult<Vec<InterfaceKind>> {
    if let Some(names) = connection.properties.get(NAME_OF_INTERFACE) {
        let mut kinds = Vec::with_capacity(names.len());
        for name in names {
            kinds.push(interface_kind(name, connection)?);
        }
        return Ok(kinds);
    }
    let shared: Vec<InterfaceKind> = upstream
        .provides()
        .iter()
        .copied()
        .filter(|kind| downstream.accepts().contains(kind))
        .collect();
    match shared.as_slice() {
        [] => Err(NetworkError::ConnectionUnsatisfiable {
            upstream: connection.upstream.to_owned(),
            downstream: connection.downstream.to_owned(),
            connection: connection.name.to_owned(),
        }),
        [kind] => Ok(vec![*kind]),
        _ => Err(NetworkError::AmbiguousConnection {
            upstream: connection.upstream.to_owned(),
            downstream: connection.downstream.to_owned(),
            connection: connection.name.to_owned(),
            candidates: shared.iter().map(|kind| kind.name().to_owned()).collect(),
        }),
    }
}
