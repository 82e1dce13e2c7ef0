//! Spatial transforms steering the resampling of a moving image.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use nalgebra::DVector;
use rf_core::{Criterion, ParameterMap};

use crate::catalog::CatalogEntry;
use crate::common::dimensional_template;
use crate::component::{Component, ComponentHandle, require_capability};
use crate::error::{ComponentError, ComponentResult};
use crate::interfaces::{InterfaceKind, TransformationProvider};

const CLASS: &str = "AffineTransform";
const ACCEPTS: &[InterfaceKind] = &[InterfaceKind::Parameters];
const PROVIDES: &[InterfaceKind] = &[InterfaceKind::Transformation];

/// Affine point mapping with an identity linear part: a translation along
/// the signal axis, steered by a single parameter.
///
/// The Parameters input is optional. Wired to an optimizer, the transform
/// adopts the optimized parameters when run; unwired it stays at the
/// identity (or whatever [`set_parameters`] loaded), which is what a
/// resample-only pipeline wants.
///
/// [`set_parameters`]: AffineTransform::set_parameters
pub struct AffineTransform<const D: usize> {
    instance_name: String,
    template: ParameterMap,
    parameters_source: Option<ComponentHandle>,
    parameters: DVector<f64>,
}

impl<const D: usize> AffineTransform<D> {
    pub fn new(instance_name: impl Into<String>) -> Self {
        Self {
            instance_name: instance_name.into(),
            template: dimensional_template(CLASS, D),
            parameters_source: None,
            parameters: DVector::zeros(1),
        }
    }

    pub fn catalog_entry() -> CatalogEntry {
        CatalogEntry::new(CLASS, dimensional_template(CLASS, D), ACCEPTS, PROVIDES, |name| {
            Rc::new(RefCell::new(AffineTransform::<D>::new(name))) as ComponentHandle
        })
    }

    /// Load transform parameters directly, bypassing any wired provider.
    pub fn set_parameters(&mut self, parameters: DVector<f64>) {
        self.parameters = parameters;
    }

    fn translation(parameters: &DVector<f64>) -> f64 {
        parameters.get(0).copied().unwrap_or(0.0)
    }
}

impl<const D: usize> Component for AffineTransform<D> {
    fn instance_name(&self) -> &str {
        &self.instance_name
    }

    fn class_name(&self) -> &'static str {
        CLASS
    }

    fn template_properties(&self) -> &ParameterMap {
        &self.template
    }

    fn meets_criterion(&mut self, _criterion: &Criterion) -> bool {
        false
    }

    fn accepts(&self) -> &'static [InterfaceKind] {
        ACCEPTS
    }

    fn provides(&self) -> &'static [InterfaceKind] {
        PROVIDES
    }

    fn accept_connection(
        &mut self,
        kind: InterfaceKind,
        _connection: &str,
        provider: &ComponentHandle,
    ) -> ComponentResult<()> {
        match kind {
            InterfaceKind::Parameters => {
                require_capability(provider, InterfaceKind::Parameters, CLASS)?;
                self.parameters_source = Some(provider.clone());
                Ok(())
            }
            other => Err(ComponentError::UnsupportedInterface { class: CLASS, kind: other }),
        }
    }

    fn run(&mut self) -> ComponentResult<()> {
        if let Some(handle) = &self.parameters_source {
            let provider = handle.borrow();
            let parameters = provider
                .as_parameters()
                .ok_or(ComponentError::MissingCapability {
                    class: CLASS,
                    kind: InterfaceKind::Parameters,
                })?
                .parameters();
            self.parameters = parameters;
        }
        Ok(())
    }

    fn as_transformation(&self) -> Option<&dyn TransformationProvider> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<const D: usize> TransformationProvider for AffineTransform<D> {
    fn parameter_count(&self) -> usize {
        1
    }

    fn map_point_at(&self, x: f64, parameters: &DVector<f64>) -> f64 {
        x + Self::translation(parameters)
    }

    fn map_point(&self, x: f64) -> f64 {
        x + Self::translation(&self.parameters)
    }
}
