//! The blueprint's directed labeled multigraph.

use std::collections::HashMap;

use rf_core::{ParameterMap, RfError, RfResult};

/// A named component vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Vertex {
    pub(crate) name: String,
    pub(crate) properties: ParameterMap,
}

/// A directed connection between two vertices, identified by the
/// (upstream, downstream, name) triple. Endpoints are arena indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Edge {
    pub(crate) upstream: usize,
    pub(crate) downstream: usize,
    pub(crate) name: String,
    pub(crate) properties: ParameterMap,
}

/// Borrowed view of one connection, endpoints resolved to names.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionRef<'a> {
    pub upstream: &'a str,
    pub downstream: &'a str,
    pub name: &'a str,
    pub properties: &'a ParameterMap,
}

/// Directed labeled multigraph of named components.
///
/// The graph stores:
/// - A vertex arena in insertion order plus a name index.
/// - A flat edge list in insertion order. Parallel edges between the same
///   vertex pair are allowed and distinguished by connection name (the
///   default name is the empty string); at most one edge exists per
///   (upstream, downstream, name) triple.
///
/// Vertex removal swap-removes from the arena and patches the affected
/// indices, so no stale references can survive a deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) index: HashMap<String, usize>,
    pub(crate) edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of components.
    pub fn component_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of connections, parallel edges counted individually.
    pub fn connection_count(&self) -> usize {
        self.edges.len()
    }

    /// Insert a component or replace the property map of an existing one.
    pub fn set_component<N: Into<String>>(&mut self, name: N, properties: ParameterMap) {
        let name = name.into();
        match self.index.get(&name) {
            Some(&i) => self.vertices[i].properties = properties,
            None => self.insert_vertex(name, properties),
        }
    }

    /// The property map of a named component.
    ///
    /// A missing component is reported at error level and returned as
    /// `NotFound`: callers asking for a specific component are entitled to
    /// assume it exists.
    pub fn component(&self, name: &str) -> RfResult<&ParameterMap> {
        match self.index.get(name) {
            Some(&i) => Ok(&self.vertices[i].properties),
            None => {
                tracing::error!("component '{}' not present in blueprint", name);
                Err(RfError::NotFound {
                    entity: "component",
                    name: name.to_owned(),
                })
            }
        }
    }

    pub fn component_exists(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Remove a component and every connection touching it.
    ///
    /// Returns `true` when the component existed, `false` for a no-op.
    pub fn delete_component(&mut self, name: &str) -> bool {
        let Some(&i) = self.index.get(name) else {
            return false;
        };
        self.index.remove(name);
        self.edges
            .retain(|e| e.upstream != i && e.downstream != i);
        let last = self.vertices.len() - 1;
        self.vertices.swap_remove(i);
        if i != last {
            // The former tail vertex now lives at slot i.
            self.index.insert(self.vertices[i].name.clone(), i);
            for e in &mut self.edges {
                if e.upstream == last {
                    e.upstream = i;
                }
                if e.downstream == last {
                    e.downstream = i;
                }
            }
        }
        true
    }

    /// Component names in insertion order.
    pub fn component_names(&self) -> Vec<&str> {
        self.vertices.iter().map(|v| v.name.as_str()).collect()
    }

    /// Iterate components as (name, properties) in insertion order.
    pub fn components(&self) -> impl Iterator<Item = (&str, &ParameterMap)> {
        self.vertices
            .iter()
            .map(|v| (v.name.as_str(), &v.properties))
    }

    /// Insert a connection or replace the property map of the existing
    /// (upstream, downstream, name) edge.
    ///
    /// Both endpoints must already exist; otherwise nothing is stored, a
    /// warning is emitted and `false` is returned.
    pub fn set_connection(
        &mut self,
        upstream: &str,
        downstream: &str,
        name: &str,
        properties: ParameterMap,
    ) -> bool {
        let (Some(&up), Some(&down)) = (self.index.get(upstream), self.index.get(downstream))
        else {
            tracing::warn!(
                "connection '{}' ignored: endpoint missing",
                connection_label(upstream, downstream, name)
            );
            return false;
        };
        match self.find_edge(up, down, name) {
            Some(i) => self.edges[i].properties = properties,
            None => self.edges.push(Edge {
                upstream: up,
                downstream: down,
                name: name.to_owned(),
                properties,
            }),
        }
        true
    }

    /// The property map of the (upstream, downstream, name) connection.
    pub fn connection(&self, upstream: &str, downstream: &str, name: &str) -> RfResult<&ParameterMap> {
        match self.edge_index(upstream, downstream, name) {
            Some(i) => Ok(&self.edges[i].properties),
            None => Err(RfError::NotFound {
                entity: "connection",
                name: connection_label(upstream, downstream, name),
            }),
        }
    }

    pub fn connection_exists(&self, upstream: &str, downstream: &str, name: &str) -> bool {
        self.edge_index(upstream, downstream, name).is_some()
    }

    /// Remove one connection. Returns `true` when an edge was removed.
    pub fn delete_connection(&mut self, upstream: &str, downstream: &str, name: &str) -> bool {
        match self.edge_index(upstream, downstream, name) {
            Some(i) => {
                self.edges.remove(i);
                true
            }
            None => false,
        }
    }

    /// Names of all parallel connections between a vertex pair, in
    /// insertion order.
    pub fn connection_names(&self, upstream: &str, downstream: &str) -> Vec<&str> {
        let (Some(&up), Some(&down)) = (self.index.get(upstream), self.index.get(downstream))
        else {
            return Vec::new();
        };
        self.edges
            .iter()
            .filter(|e| e.upstream == up && e.downstream == down)
            .map(|e| e.name.as_str())
            .collect()
    }

    /// Upstream neighbor names over all incoming connections of `name`.
    /// Parallel edges repeat their endpoint.
    pub fn input_names(&self, name: &str) -> Vec<&str> {
        let Some(&i) = self.index.get(name) else {
            return Vec::new();
        };
        self.edges
            .iter()
            .filter(|e| e.downstream == i)
            .map(|e| self.vertices[e.upstream].name.as_str())
            .collect()
    }

    /// Downstream neighbor names over all outgoing connections of `name`.
    pub fn output_names(&self, name: &str) -> Vec<&str> {
        let Some(&i) = self.index.get(name) else {
            return Vec::new();
        };
        self.edges
            .iter()
            .filter(|e| e.upstream == i)
            .map(|e| self.vertices[e.downstream].name.as_str())
            .collect()
    }

    /// Iterate connections in insertion order.
    pub fn connections(&self) -> impl Iterator<Item = ConnectionRef<'_>> {
        self.edges.iter().map(|e| ConnectionRef {
            upstream: self.vertices[e.upstream].name.as_str(),
            downstream: self.vertices[e.downstream].name.as_str(),
            name: e.name.as_str(),
            properties: &e.properties,
        })
    }

    /// Union-merge another graph into this one, atomically.
    ///
    /// Components and connections absent here are copied in; ones present
    /// in both merge property maps under the per-key compatibility rule.
    /// On any conflict the graph is restored to its pre-call state and
    /// `false` is returned; no partial merge is ever observable.
    pub fn compose_with(&mut self, other: &Graph) -> bool {
        let snapshot = self.clone();
        if let Err(err) = self.try_compose(other) {
            tracing::warn!("compose rejected, state restored: {}", err);
            *self = snapshot;
            return false;
        }
        true
    }

    fn try_compose(&mut self, other: &Graph) -> RfResult<()> {
        for vertex in &other.vertices {
            match self.index.get(&vertex.name) {
                Some(&i) => self.vertices[i].properties.merge_from(&vertex.properties)?,
                None => self.insert_vertex(vertex.name.clone(), vertex.properties.clone()),
            }
        }
        for edge in &other.edges {
            let upstream = other.vertices[edge.upstream].name.as_str();
            let downstream = other.vertices[edge.downstream].name.as_str();
            match self.edge_index(upstream, downstream, &edge.name) {
                Some(i) => self.edges[i].properties.merge_from(&edge.properties)?,
                None => {
                    // Both endpoints exist after the vertex pass.
                    let up = self.index[upstream];
                    let down = self.index[downstream];
                    self.edges.push(Edge {
                        upstream: up,
                        downstream: down,
                        name: edge.name.clone(),
                        properties: edge.properties.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn insert_vertex(&mut self, name: String, properties: ParameterMap) {
        let i = self.vertices.len();
        self.index.insert(name.clone(), i);
        self.vertices.push(Vertex { name, properties });
    }

    fn find_edge(&self, upstream: usize, downstream: usize, name: &str) -> Option<usize> {
        self.edges
            .iter()
            .position(|e| e.upstream == upstream && e.downstream == downstream && e.name == name)
    }

    fn edge_index(&self, upstream: &str, downstream: &str, name: &str) -> Option<usize> {
        let up = *self.index.get(upstream)?;
        let down = *self.index.get(downstream)?;
        self.find_edge(up, down, name)
    }
}

/// Human-readable identity of a connection for messages.
pub(crate) fn connection_label(upstream: &str, downstream: &str, name: &str) -> String {
    if name.is_empty() {
        format!("{upstream} -> {downstream}")
    } else {
        format!("{upstream} -> {downstream} ({name})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pm(entries: &[(&str, &[&str])]) -> ParameterMap {
        let mut map = ParameterMap::new();
        for (key, values) in entries {
            map.insert(*key, values.iter().copied());
        }
        map
    }

    fn sample() -> Graph {
        let mut g = Graph::new();
        g.set_component("Fixed", pm(&[("NameOfClass", &["ImageSource"])]));
        g.set_component("Moving", pm(&[("NameOfClass", &["ImageSource"])]));
        g.set_component("Metric", pm(&[("NameOfClass", &["SsdMetric"])]));
        assert!(g.set_connection("Fixed", "Metric", "fixed", pm(&[])));
        assert!(g.set_connection("Moving", "Metric", "moving", pm(&[])));
        g
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut g = Graph::new();
        let props = pm(&[("Dimensionality", &["3"]), ("PixelType", &["float"])]);
        g.set_component("Metric", props.clone());
        assert_eq!(g.component("Metric").unwrap(), &props);
    }

    #[test]
    fn set_component_replaces_not_merges() {
        let mut g = Graph::new();
        g.set_component("A", pm(&[("Old", &["1"]), ("Keep", &["x"])]));
        g.set_component("A", pm(&[("New", &["2"])]));
        let props = g.component("A").unwrap();
        assert!(props.get("Old").is_none());
        assert!(props.get("Keep").is_none());
        assert_eq!(props.single("New"), Some("2"));
        assert_eq!(g.component_count(), 1);
    }

    #[test]
    fn missing_component_is_not_found() {
        let g = Graph::new();
        let err = g.component("Ghost").unwrap_err();
        assert_eq!(
            err,
            RfError::NotFound {
                entity: "component",
                name: "Ghost".to_string()
            }
        );
    }

    #[test]
    fn delete_component_reports_whether_present() {
        let mut g = sample();
        assert!(g.delete_component("Moving"));
        assert!(!g.delete_component("Moving"));
        assert!(!g.component_exists("Moving"));
        assert_eq!(g.component_count(), 2);
    }

    #[test]
    fn delete_component_drops_incident_connections() {
        let mut g = sample();
        g.delete_component("Metric");
        assert_eq!(g.connection_count(), 0);
        assert!(g.input_names("Metric").is_empty());
    }

    #[test]
    fn delete_keeps_unrelated_connections_resolvable() {
        // Deleting the first-inserted vertex exercises the swap-remove
        // index fixup: "Metric" moves into the vacated arena slot.
        let mut g = sample();
        assert!(g.delete_component("Fixed"));
        assert_eq!(g.input_names("Metric"), vec!["Moving"]);
        assert!(g.connection_exists("Moving", "Metric", "moving"));
        assert_eq!(g.component_names(), vec!["Metric", "Moving"]);
    }

    #[test]
    fn set_connection_requires_both_endpoints() {
        let mut g = Graph::new();
        g.set_component("A", pm(&[]));
        assert!(!g.set_connection("A", "Ghost", "", pm(&[])));
        assert!(!g.set_connection("Ghost", "A", "", pm(&[])));
        assert_eq!(g.connection_count(), 0);
    }

    #[test]
    fn parallel_connections_coexist_by_name() {
        let mut g = Graph::new();
        g.set_component("Metric", pm(&[]));
        g.set_component("Optimizer", pm(&[]));
        assert!(g.set_connection("Metric", "Optimizer", "value", pm(&[("A", &["1"])])));
        assert!(g.set_connection("Metric", "Optimizer", "derivative", pm(&[])));
        assert_eq!(g.connection_count(), 2);
        assert_eq!(
            g.connection_names("Metric", "Optimizer"),
            vec!["value", "derivative"]
        );

        // Same triple again: overwrite, not duplicate.
        assert!(g.set_connection("Metric", "Optimizer", "value", pm(&[("A", &["2"])])));
        assert_eq!(g.connection_count(), 2);
        let props = g.connection("Metric", "Optimizer", "value").unwrap();
        assert_eq!(props.single("A"), Some("2"));
    }

    #[test]
    fn unnamed_and_named_connections_are_distinct() {
        let mut g = Graph::new();
        g.set_component("A", pm(&[]));
        g.set_component("B", pm(&[]));
        assert!(g.set_connection("A", "B", "", pm(&[])));
        assert!(g.set_connection("A", "B", "x", pm(&[])));
        assert!(g.connection_exists("A", "B", ""));
        assert!(g.connection_exists("A", "B", "x"));
        assert!(!g.connection_exists("A", "B", "y"));
        assert!(g.delete_connection("A", "B", ""));
        assert!(!g.delete_connection("A", "B", ""));
        assert_eq!(g.connection_count(), 1);
    }

    #[test]
    fn input_and_output_names_follow_direction() {
        let g = sample();
        assert_eq!(g.input_names("Metric"), vec!["Fixed", "Moving"]);
        assert!(g.output_names("Metric").is_empty());
        assert_eq!(g.output_names("Fixed"), vec!["Metric"]);
        assert!(g.input_names("Fixed").is_empty());
        assert!(g.input_names("Ghost").is_empty());
    }

    #[test]
    fn compose_unions_disjoint_graphs() {
        let mut a = sample();
        let mut b = Graph::new();
        b.set_component("Optimizer", pm(&[("NameOfClass", &["GradientDescentOptimizer"])]));
        b.set_component("Metric", pm(&[("Dimensionality", &["2"])]));
        b.set_connection("Metric", "Optimizer", "value", pm(&[]));

        assert!(a.compose_with(&b));
        assert_eq!(a.component_count(), 4);
        assert_eq!(a.connection_count(), 3);
        // Shared component got the union of both maps.
        let metric = a.component("Metric").unwrap();
        assert_eq!(metric.single("NameOfClass"), Some("SsdMetric"));
        assert_eq!(metric.single("Dimensionality"), Some("2"));
    }

    #[test]
    fn compose_conflict_rolls_back_completely() {
        let mut a = sample();
        let before = a.clone();

        let mut b = Graph::new();
        b.set_component("Extra", pm(&[]));
        b.set_component("Metric", pm(&[("NameOfClass", &["NccMetric"])]));

        assert!(!a.compose_with(&b));
        assert_eq!(a, before);
        assert!(!a.component_exists("Extra"));
    }

    #[test]
    fn compose_conflict_on_connection_rolls_back() {
        let mut a = sample();
        let before = a.clone();

        let mut b = Graph::new();
        b.set_component("Fixed", pm(&[("NameOfClass", &["ImageSource"])]));
        b.set_component("Metric", pm(&[]));
        b.set_connection("Fixed", "Metric", "fixed", pm(&[("NameOfInterface", &["Image"])]));
        // Compatible so far; now poison one edge property.
        let mut c = b.clone();
        c.set_connection("Fixed", "Metric", "fixed", pm(&[("NameOfInterface", &["Mismatch"])]));

        assert!(a.compose_with(&b));
        assert!(!a.compose_with(&c));
        let after = {
            let mut g = before.clone();
            assert!(g.compose_with(&b));
            g
        };
        assert_eq!(a, after);
    }

    use proptest::prelude::*;

    fn arb_props() -> impl Strategy<Value = ParameterMap> {
        prop::collection::btree_map(
            "[A-D]",
            prop::collection::vec("[a-b]{1,2}", 1..3),
            0..3,
        )
        .prop_map(|m| m.into_iter().collect())
    }

    fn arb_graph() -> impl Strategy<Value = Graph> {
        let vertex_names = prop::sample::subsequence(
            vec!["Fixed", "Moving", "Metric", "Optimizer", "Transform"],
            0..=5,
        );
        (vertex_names, prop::collection::vec(arb_props(), 5))
            .prop_flat_map(|(names, props)| {
                let mut g = Graph::new();
                for (name, p) in names.iter().zip(props) {
                    g.set_component(*name, p);
                }
                let n = names.len();
                let edges = prop::collection::vec(
                    (0..5usize, 0..5usize, "[ab]?", arb_props()),
                    0..4,
                );
                (Just((g, names)), edges).prop_map(move |((mut g, names), edges)| {
                    for (u, d, name, p) in edges {
                        if n > 0 {
                            let up = names[u % n];
                            let down = names[d % n];
                            g.set_connection(up, down, &name, p);
                        }
                    }
                    g
                })
            })
    }

    proptest! {
        // Compose either succeeds with every donor entry present, or fails
        // leaving the target exactly as it was.
        #[test]
        fn compose_is_atomic(mut a in arb_graph(), b in arb_graph()) {
            let before = a.clone();
            if a.compose_with(&b) {
                for (name, _) in b.components() {
                    prop_assert!(a.component_exists(name));
                }
                for c in b.connections() {
                    prop_assert!(a.connection_exists(c.upstream, c.downstream, c.name));
                }
            } else {
                prop_assert_eq!(&a, &before);
            }
        }

        // Composing a graph with itself never conflicts and changes nothing.
        #[test]
        fn compose_with_self_is_identity(mut g in arb_graph()) {
            let before = g.clone();
            prop_assert!(g.compose_with(&before));
            prop_assert_eq!(g, before);
        }
    }
}
