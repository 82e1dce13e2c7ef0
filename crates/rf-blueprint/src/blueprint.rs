//! The blueprint aggregate: a named multigraph with a logging scope.

use std::path::Path;

use rf_core::{ParameterMap, RfResult};

use crate::error::BlueprintResult;
use crate::graph::{ConnectionRef, Graph};
use crate::{dot, file};

/// A pipeline description: named components, named parallel connections,
/// and their property maps.
///
/// Every operation runs inside the blueprint's tracing span, so log events
/// from concurrently-held blueprints stay distinguishable without any
/// process-global logger state.
#[derive(Debug, Clone)]
pub struct Blueprint {
    name: String,
    graph: Graph,
    span: tracing::Span,
}

impl Blueprint {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let span = tracing::info_span!("blueprint", name = %name);
        Self {
            name,
            graph: Graph::new(),
            span,
        }
    }

    /// Load a blueprint from a property-tree file, named after the file
    /// stem. Includes are resolved relative to the file.
    pub fn from_file(path: impl AsRef<Path>) -> BlueprintResult<Self> {
        let path = path.as_ref();
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("blueprint");
        let mut blueprint = Self::new(stem);
        blueprint.merge_from_file(path)?;
        Ok(blueprint)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read access to the underlying multigraph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Merge a blueprint file (plus its includes) into this blueprint.
    ///
    /// Unlike [`compose_with`](Self::compose_with), a merge conflict here
    /// is a fatal error and the blueprint may be left partially merged;
    /// callers reload from scratch after fixing the file.
    pub fn merge_from_file(&mut self, path: impl AsRef<Path>) -> BlueprintResult<()> {
        let _scope = self.span.enter();
        let path = path.as_ref();
        tracing::info!("merging blueprint file '{}'", path.display());
        file::merge_into(&mut self.graph, path)
    }

    /// Atomic union-merge of another blueprint; see [`Graph::compose_with`].
    pub fn compose_with(&mut self, other: &Blueprint) -> bool {
        let _scope = self.span.enter();
        self.graph.compose_with(&other.graph)
    }

    pub fn set_component(&mut self, name: impl Into<String>, properties: ParameterMap) {
        let _scope = self.span.enter();
        self.graph.set_component(name, properties);
    }

    pub fn component(&self, name: &str) -> RfResult<&ParameterMap> {
        let _scope = self.span.enter();
        self.graph.component(name)
    }

    pub fn component_exists(&self, name: &str) -> bool {
        self.graph.component_exists(name)
    }

    pub fn delete_component(&mut self, name: &str) -> bool {
        let _scope = self.span.enter();
        self.graph.delete_component(name)
    }

    pub fn component_names(&self) -> Vec<&str> {
        self.graph.component_names()
    }

    pub fn components(&self) -> impl Iterator<Item = (&str, &ParameterMap)> {
        self.graph.components()
    }

    pub fn component_count(&self) -> usize {
        self.graph.component_count()
    }

    pub fn set_connection(
        &mut self,
        upstream: &str,
        downstream: &str,
        name: &str,
        properties: ParameterMap,
    ) -> bool {
        let _scope = self.span.enter();
        self.graph.set_connection(upstream, downstream, name, properties)
    }

    pub fn connection(
        &self,
        upstream: &str,
        downstream: &str,
        name: &str,
    ) -> RfResult<&ParameterMap> {
        let _scope = self.span.enter();
        self.graph.connection(upstream, downstream, name)
    }

    pub fn connection_exists(&self, upstream: &str, downstream: &str, name: &str) -> bool {
        self.graph.connection_exists(upstream, downstream, name)
    }

    pub fn delete_connection(&mut self, upstream: &str, downstream: &str, name: &str) -> bool {
        let _scope = self.span.enter();
        self.graph.delete_connection(upstream, downstream, name)
    }

    pub fn connection_names(&self, upstream: &str, downstream: &str) -> Vec<&str> {
        self.graph.connection_names(upstream, downstream)
    }

    pub fn connection_count(&self) -> usize {
        self.graph.connection_count()
    }

    pub fn connections(&self) -> impl Iterator<Item = ConnectionRef<'_>> {
        self.graph.connections()
    }

    pub fn input_names(&self, name: &str) -> Vec<&str> {
        self.graph.input_names(name)
    }

    pub fn output_names(&self, name: &str) -> Vec<&str> {
        self.graph.output_names(name)
    }

    /// Component names in an order where every connection points forward.
    pub fn execution_order(&self) -> BlueprintResult<Vec<String>> {
        let _scope = self.span.enter();
        dot::execution_order(&self.graph)
    }

    /// Render the blueprint as graphviz dot.
    pub fn to_dot(&self) -> String {
        dot::to_dot(&self.graph)
    }

    /// Write the dot rendering to a file.
    pub fn write_dot(&self, path: impl AsRef<Path>) -> BlueprintResult<()> {
        std::fs::write(path, self.to_dot())?;
        Ok(())
    }
}

/// Blueprints compare by name and content; the logging span is identity,
/// not state.
impl PartialEq for Blueprint {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.graph == other.graph
    }
}
