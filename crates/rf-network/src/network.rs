//! The realized pipeline: resolved instances plus an execution order.

use std::collections::HashMap;

use rf_components::ComponentHandle;

use crate::error::{NetworkError, NetworkResult};

/// An executable component network.
///
/// Produced by [`NetworkBuilder::realize`]; every instance has passed its
/// readiness check and the execution order is a topological order of the
/// blueprint, so each component runs after everything it is wired to.
///
/// [`NetworkBuilder::realize`]: crate::builder::NetworkBuilder::realize
pub struct Network {
    name: String,
    instances: HashMap<String, ComponentHandle>,
    order: Vec<String>,
}

impl Network {
    pub(crate) fn new(
        name: String,
        instances: HashMap<String, ComponentHandle>,
        order: Vec<String>,
    ) -> Self {
        Self {
            name,
            instances,
            order,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn component_count(&self) -> usize {
        self.instances.len()
    }

    /// Component names in execution order (sources first).
    pub fn execution_order(&self) -> &[String] {
        &self.order
    }

    /// The live instance behind a blueprint vertex, for loading inputs and
    /// inspecting results.
    pub fn component(&self, name: &str) -> Option<&ComponentHandle> {
        self.instances.get(name)
    }

    /// Run every component once, in execution order.
    pub fn run(&mut self) -> NetworkResult<()> {
        for name in &self.order {
            let handle = self
                .instances
                .get(name)
                .ok_or_else(|| NetworkError::MissingComponent { name: name.clone() })?;
            tracing::debug!(component = %name, "running component");
            handle
                .borrow_mut()
                .run()
                .map_err(|source| NetworkError::Component {
                    component: name.clone(),
                    source,
                })?;
        }
        Ok(())
    }
}
