//! Graphviz export and ordering analysis over a petgraph mirror.
//!
//! The blueprint's own adjacency structure stays authoritative; a
//! throwaway `DiGraph` carrying arena indices is built per call.

use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::{BlueprintError, BlueprintResult};
use crate::graph::Graph;

fn mirror(graph: &Graph) -> DiGraph<usize, usize> {
    let mut di = DiGraph::new();
    let nodes: Vec<NodeIndex> = (0..graph.vertices.len()).map(|i| di.add_node(i)).collect();
    for (i, edge) in graph.edges.iter().enumerate() {
        di.add_edge(nodes[edge.upstream], nodes[edge.downstream], i);
    }
    di
}

/// Component names sorted so that every connection points forward.
pub(crate) fn execution_order(graph: &Graph) -> BlueprintResult<Vec<String>> {
    use petgraph::algo::toposort;

    let di = mirror(graph);
    let sorted = toposort(&di, None).map_err(|_| BlueprintError::CycleDetected)?;
    Ok(sorted
        .into_iter()
        .map(|idx| graph.vertices[di[idx]].name.clone())
        .collect())
}

/// Render the blueprint in graphviz dot syntax. Diagnostic output only,
/// never re-parsed.
pub(crate) fn to_dot(graph: &Graph) -> String {
    use petgraph::dot::{Config, Dot};

    let di = mirror(graph);
    let edge_attrs = |_: &DiGraph<usize, usize>,
                      edge: petgraph::graph::EdgeReference<'_, usize>| {
        let e = &graph.edges[*edge.weight()];
        let mut label = e.name.clone();
        if !e.properties.is_empty() {
            if !label.is_empty() {
                label.push('\n');
            }
            label.push_str(&e.properties.to_string());
        }
        format!("label = \"{}\"", escape(&label))
    };
    let node_attrs = |_: &DiGraph<usize, usize>, (_, &v): (NodeIndex, &usize)| {
        let vertex = &graph.vertices[v];
        let mut label = vertex.name.clone();
        if !vertex.properties.is_empty() {
            label.push('\n');
            label.push_str(&vertex.properties.to_string());
        }
        format!("label = \"{}\"", escape(&label))
    };
    format!(
        "{:?}",
        Dot::with_attr_getters(
            &di,
            &[Config::NodeNoLabel, Config::EdgeNoLabel],
            &edge_attrs,
            &node_attrs,
        )
    )
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
