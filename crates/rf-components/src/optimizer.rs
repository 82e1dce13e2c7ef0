//! Optimizers minimizing a wired metric over transform parameters.
//!
//! Both optimizers start from the zero parameter vector, run a bounded
//! number of iterations when the network executes them, and publish their
//! result through the Parameters interface.

use std::any::Any;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use nalgebra::DVector;
use rf_core::{Criterion, ParameterMap};

use crate::catalog::CatalogEntry;
use crate::common::{class_template, positive_count, positive_float};
use crate::component::{Component, ComponentHandle, require_capability};
use crate::error::{ComponentError, ComponentResult};
use crate::interfaces::{InterfaceKind, ParametersProvider};

const NUMBER_OF_ITERATIONS: &str = "NumberOfIterations";
const STEP_SIZE: &str = "StepSize";
const SIMPLEX_DELTA: &str = "SimplexDelta";

/// Iterations stop early once the gradient is this flat.
const GRADIENT_TOLERANCE: f64 = 1e-9;

fn by_value(a: &(DVector<f64>, f64), b: &(DVector<f64>, f64)) -> Ordering {
    a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal)
}

/// Fixed-step gradient descent.
///
/// Needs both the metric value (for the parameter count and the reported
/// final value) and the metric derivative (for the descent direction), so
/// it only pairs with differentiable metrics.
///
/// Runtime criteria: `NumberOfIterations`, `StepSize`.
pub struct GradientDescentOptimizer {
    instance_name: String,
    template: ParameterMap,
    metric_value: Option<ComponentHandle>,
    metric_derivative: Option<ComponentHandle>,
    iterations: usize,
    step_size: f64,
    result: DVector<f64>,
    final_value: Option<f64>,
}

impl GradientDescentOptimizer {
    const CLASS: &'static str = "GradientDescentOptimizer";
    const ACCEPTS: &'static [InterfaceKind] =
        &[InterfaceKind::MetricValue, InterfaceKind::MetricDerivative];
    const PROVIDES: &'static [InterfaceKind] = &[InterfaceKind::Parameters];

    pub fn new(instance_name: impl Into<String>) -> Self {
        Self {
            instance_name: instance_name.into(),
            template: class_template(Self::CLASS),
            metric_value: None,
            metric_derivative: None,
            iterations: 100,
            step_size: 0.1,
            result: DVector::zeros(0),
            final_value: None,
        }
    }

    pub fn catalog_entry() -> CatalogEntry {
        CatalogEntry::new(
            Self::CLASS,
            class_template(Self::CLASS),
            Self::ACCEPTS,
            Self::PROVIDES,
            |name| Rc::new(RefCell::new(GradientDescentOptimizer::new(name))) as ComponentHandle,
        )
    }

    /// The metric value at the optimized parameters, once run.
    pub fn final_value(&self) -> Option<f64> {
        self.final_value
    }
}

impl Component for GradientDescentOptimizer {
    fn instance_name(&self) -> &str {
        &self.instance_name
    }

    fn class_name(&self) -> &'static str {
        Self::CLASS
    }

    fn template_properties(&self) -> &ParameterMap {
        &self.template
    }

    fn meets_criterion(&mut self, criterion: &Criterion) -> bool {
        match criterion.key.as_str() {
            NUMBER_OF_ITERATIONS => match positive_count(criterion) {
                Some(n) => {
                    self.iterations = n;
                    true
                }
                None => false,
            },
            STEP_SIZE => match positive_float(criterion) {
                Some(step) => {
                    self.step_size = step;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    fn accepts(&self) -> &'static [InterfaceKind] {
        Self::ACCEPTS
    }

    fn provides(&self) -> &'static [InterfaceKind] {
        Self::PROVIDES
    }

    fn accept_connection(
        &mut self,
        kind: InterfaceKind,
        _connection: &str,
        provider: &ComponentHandle,
    ) -> ComponentResult<()> {
        match kind {
            InterfaceKind::MetricValue => {
                require_capability(provider, kind, Self::CLASS)?;
                self.metric_value = Some(provider.clone());
                Ok(())
            }
            InterfaceKind::MetricDerivative => {
                require_capability(provider, kind, Self::CLASS)?;
                self.metric_derivative = Some(provider.clone());
                Ok(())
            }
            other => Err(ComponentError::UnsupportedInterface {
                class: Self::CLASS,
                kind: other,
            }),
        }
    }

    fn connected_ok(&self) -> bool {
        self.metric_value.is_some() && self.metric_derivative.is_some()
    }

    fn run(&mut self) -> ComponentResult<()> {
        let value_handle = self
            .metric_value
            .clone()
            .ok_or(ComponentError::NotConnected {
                class: Self::CLASS,
                what: "metric value input",
            })?;
        let derivative_handle =
            self.metric_derivative
                .clone()
                .ok_or(ComponentError::NotConnected {
                    class: Self::CLASS,
                    what: "metric derivative input",
                })?;
        let value_provider = value_handle.borrow();
        let value = value_provider
            .as_metric_value()
            .ok_or(ComponentError::MissingCapability {
                class: Self::CLASS,
                kind: InterfaceKind::MetricValue,
            })?;
        let derivative_provider = derivative_handle.borrow();
        let derivative =
            derivative_provider
                .as_metric_derivative()
                .ok_or(ComponentError::MissingCapability {
                    class: Self::CLASS,
                    kind: InterfaceKind::MetricDerivative,
                })?;

        let mut parameters = DVector::zeros(value.parameter_count());
        for _ in 0..self.iterations {
            let gradient = derivative.derivative_at(&parameters)?;
            if gradient.norm() < GRADIENT_TOLERANCE {
                break;
            }
            parameters -= gradient * self.step_size;
        }
        self.final_value = Some(value.value_at(&parameters)?);
        self.result = parameters;
        Ok(())
    }

    fn as_parameters(&self) -> Option<&dyn ParametersProvider> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl ParametersProvider for GradientDescentOptimizer {
    fn parameters(&self) -> DVector<f64> {
        self.result.clone()
    }
}

/// Derivative-free Nelder-Mead simplex search.
///
/// Only needs the metric value, so it pairs with any metric. The initial
/// simplex spans `SimplexDelta` along each parameter axis from the origin.
///
/// Runtime criteria: `NumberOfIterations`, `SimplexDelta`.
pub struct NelderMeadOptimizer {
    instance_name: String,
    template: ParameterMap,
    metric_value: Option<ComponentHandle>,
    iterations: usize,
    simplex_delta: f64,
    result: DVector<f64>,
    final_value: Option<f64>,
}

impl NelderMeadOptimizer {
    const CLASS: &'static str = "NelderMeadOptimizer";
    const ACCEPTS: &'static [InterfaceKind] = &[InterfaceKind::MetricValue];
    const PROVIDES: &'static [InterfaceKind] = &[InterfaceKind::Parameters];

    pub fn new(instance_name: impl Into<String>) -> Self {
        Self {
            instance_name: instance_name.into(),
            template: class_template(Self::CLASS),
            metric_value: None,
            iterations: 200,
            simplex_delta: 1.0,
            result: DVector::zeros(0),
            final_value: None,
        }
    }

    pub fn catalog_entry() -> CatalogEntry {
        CatalogEntry::new(
            Self::CLASS,
            class_template(Self::CLASS),
            Self::ACCEPTS,
            Self::PROVIDES,
            |name| Rc::new(RefCell::new(NelderMeadOptimizer::new(name))) as ComponentHandle,
        )
    }

    /// The metric value at the optimized parameters, once run.
    pub fn final_value(&self) -> Option<f64> {
        self.final_value
    }
}

impl Component for NelderMeadOptimizer {
    fn instance_name(&self) -> &str {
        &self.instance_name
    }

    fn class_name(&self) -> &'static str {
        Self::CLASS
    }

    fn template_properties(&self) -> &ParameterMap {
        &self.template
    }

    fn meets_criterion(&mut self, criterion: &Criterion) -> bool {
        match criterion.key.as_str() {
            NUMBER_OF_ITERATIONS => match positive_count(criterion) {
                Some(n) => {
                    self.iterations = n;
                    true
                }
                None => false,
            },
            SIMPLEX_DELTA => match positive_float(criterion) {
                Some(delta) => {
                    self.simplex_delta = delta;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    fn accepts(&self) -> &'static [InterfaceKind] {
        Self::ACCEPTS
    }

    fn provides(&self) -> &'static [InterfaceKind] {
        Self::PROVIDES
    }

    fn accept_connection(
        &mut self,
        kind: InterfaceKind,
        _connection: &str,
        provider: &ComponentHandle,
    ) -> ComponentResult<()> {
        match kind {
            InterfaceKind::MetricValue => {
                require_capability(provider, kind, Self::CLASS)?;
                self.metric_value = Some(provider.clone());
                Ok(())
            }
            other => Err(ComponentError::UnsupportedInterface {
                class: Self::CLASS,
                kind: other,
            }),
        }
    }

    fn connected_ok(&self) -> bool {
        self.metric_value.is_some()
    }

    fn run(&mut self) -> ComponentResult<()> {
        let value_handle = self
            .metric_value
            .clone()
            .ok_or(ComponentError::NotConnected {
                class: Self::CLASS,
                what: "metric value input",
            })?;
        let value_provider = value_handle.borrow();
        let metric = value_provider
            .as_metric_value()
            .ok_or(ComponentError::MissingCapability {
                class: Self::CLASS,
                kind: InterfaceKind::MetricValue,
            })?;

        let n = metric.parameter_count();
        let origin = DVector::zeros(n);
        if n == 0 {
            self.final_value = Some(metric.value_at(&origin)?);
            self.result = origin;
            return Ok(());
        }

        // Initial simplex: the origin plus one offset vertex per axis.
        let mut simplex: Vec<(DVector<f64>, f64)> = Vec::with_capacity(n + 1);
        let origin_value = metric.value_at(&origin)?;
        simplex.push((origin, origin_value));
        for axis in 0..n {
            let mut vertex = DVector::zeros(n);
            vertex[axis] = self.simplex_delta;
            let vertex_value = metric.value_at(&vertex)?;
            simplex.push((vertex, vertex_value));
        }

        for _ in 0..self.iterations {
            simplex.sort_by(by_value);
            let best_value = simplex[0].1;
            let worst_index = simplex.len() - 1;

            // Centroid of every vertex except the worst.
            let mut centroid = DVector::zeros(n);
            for (vertex, _) in &simplex[..worst_index] {
                centroid += vertex;
            }
            centroid /= worst_index as f64;

            let worst = simplex[worst_index].0.clone();
            let reflected = &centroid * 2.0 - &worst;
            let reflected_value = metric.value_at(&reflected)?;

            if reflected_value < best_value {
                let expanded = &centroid * 3.0 - &worst * 2.0;
                let expanded_value = metric.value_at(&expanded)?;
                simplex[worst_index] = if expanded_value < reflected_value {
                    (expanded, expanded_value)
                } else {
                    (reflected, reflected_value)
                };
            } else if reflected_value < simplex[worst_index - 1].1 {
                simplex[worst_index] = (reflected, reflected_value);
            } else {
                let contracted = (&centroid + &worst) * 0.5;
                let contracted_value = metric.value_at(&contracted)?;
                if contracted_value < simplex[worst_index].1 {
                    simplex[worst_index] = (contracted, contracted_value);
                } else {
                    // Shrink everything toward the best vertex.
                    let best_vertex = simplex[0].0.clone();
                    for entry in simplex.iter_mut().skip(1) {
                        entry.0 = (&entry.0 + &best_vertex) * 0.5;
                        entry.1 = metric.value_at(&entry.0)?;
                    }
                }
            }
        }

        simplex.sort_by(by_value);
        let (best_vertex, best_value) = simplex.swap_remove(0);
        self.final_value = Some(best_value);
        self.result = best_vertex;
        Ok(())
    }

    fn as_parameters(&self) -> Option<&dyn ParametersProvider> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl ParametersProvider for NelderMeadOptimizer {
    fn parameters(&self) -> DVector<f64> {
        self.result.clone()
    }
}
