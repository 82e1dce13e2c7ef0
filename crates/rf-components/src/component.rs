//! The component object trait.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use nalgebra::DVector;
use rf_core::{Criterion, ParameterMap};

use crate::error::{ComponentError, ComponentResult};
use crate::interfaces::{
    ImageProvider, InterfaceKind, MetricDerivativeProvider, MetricValueProvider,
    ParametersProvider, TransformationProvider,
};

/// Shared handle to a live component instance.
///
/// Instances are exclusively owned by their selector until resolution;
/// afterwards the realized network and the components wired to them share
/// ownership.
pub type ComponentHandle = Rc<RefCell<dyn Component>>;

/// A pipeline building block: metric, optimizer, transform, source, sink.
///
/// Selection interrogates candidates through `template_properties` and
/// `meets_criterion`; wiring goes through `accept_connection`; execution
/// through `run`. Capability accessors default to `None` and are overridden
/// by components that actually provide the interface.
pub trait Component {
    /// The blueprint vertex name this instance was created for.
    fn instance_name(&self) -> &str;

    fn class_name(&self) -> &'static str;

    /// Fixed identity properties (class name, dimensionality, pixel type),
    /// set at construction and never changed.
    fn template_properties(&self) -> &ParameterMap;

    /// Component-specific runtime criteria: numeric parameters, options.
    ///
    /// A satisfied criterion is also *stored* as configuration, so the
    /// surviving instance ends up configured by the blueprint properties
    /// that selected it. Unknown keys and unparseable values reject the
    /// candidate.
    fn meets_criterion(&mut self, criterion: &Criterion) -> bool;

    /// Interface kinds this component can consume.
    fn accepts(&self) -> &'static [InterfaceKind];

    /// Interface kinds this component offers.
    fn provides(&self) -> &'static [InterfaceKind];

    /// Attach an upstream provider for `kind`.
    ///
    /// The connection name doubles as the input role where a component has
    /// several same-kind slots (metrics name their image inputs `fixed`
    /// and `moving`).
    fn accept_connection(
        &mut self,
        kind: InterfaceKind,
        connection: &str,
        provider: &ComponentHandle,
    ) -> ComponentResult<()>;

    /// Whether every required input has been attached.
    fn connected_ok(&self) -> bool {
        true
    }

    /// One execution step, driven in topological order. Passive components
    /// keep the default no-op.
    fn run(&mut self) -> ComponentResult<()> {
        Ok(())
    }

    fn as_image(&self) -> Option<&dyn ImageProvider> {
        None
    }

    fn as_metric_value(&self) -> Option<&dyn MetricValueProvider> {
        None
    }

    fn as_metric_derivative(&self) -> Option<&dyn MetricDerivativeProvider> {
        None
    }

    fn as_parameters(&self) -> Option<&dyn ParametersProvider> {
        None
    }

    fn as_transformation(&self) -> Option<&dyn TransformationProvider> {
        None
    }

    /// Concrete-type access for drivers and tests.
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Whether a component actually exposes the accessor for `kind`.
///
/// Declared `provides()` sets and implemented accessors must agree; wiring
/// checks the accessor, selection checks the declaration.
pub fn capability_present(component: &dyn Component, kind: InterfaceKind) -> bool {
    match kind {
        InterfaceKind::Image => component.as_image().is_some(),
        InterfaceKind::MetricValue => component.as_metric_value().is_some(),
        InterfaceKind::MetricDerivative => component.as_metric_derivative().is_some(),
        InterfaceKind::Parameters => component.as_parameters().is_some(),
        InterfaceKind::Transformation => component.as_transformation().is_some(),
    }
}

/// Check at wiring time that a provider exposes the accessor for `kind`
/// before `class` stores the handle.
pub fn require_capability(
    provider: &ComponentHandle,
    kind: InterfaceKind,
    class: &'static str,
) -> ComponentResult<()> {
    if capability_present(&*provider.borrow(), kind) {
        Ok(())
    } else {
        Err(ComponentError::MissingCapability { class, kind })
    }
}

/// Pull the image out of a wired provider slot.
pub fn pull_image(
    slot: &Option<ComponentHandle>,
    class: &'static str,
    what: &'static str,
) -> ComponentResult<DVector<f64>> {
    let handle = slot
        .as_ref()
        .ok_or(ComponentError::NotConnected { class, what })?;
    let provider = handle.borrow();
    let image = provider
        .as_image()
        .ok_or(ComponentError::MissingCapability {
            class,
            kind: InterfaceKind::Image,
        })?
        .image();
    Ok(image)
}
