//! Resamplers producing the registered image from a moving image and a
//! transform.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use nalgebra::DVector;
use rf_core::{Criterion, ParameterMap};

use crate::catalog::CatalogEntry;
use crate::common::{image_template, sample_linear};
use crate::component::{Component, ComponentHandle, pull_image, require_capability};
use crate::error::{ComponentError, ComponentResult};
use crate::interfaces::{ImageProvider, InterfaceKind};

const CLASS: &str = "LinearResampler";
const ACCEPTS: &[InterfaceKind] = &[InterfaceKind::Image, InterfaceKind::Transformation];
const PROVIDES: &[InterfaceKind] = &[InterfaceKind::Image];

/// Samples the moving image through the wired transform's point mapping,
/// with linear interpolation.
///
/// Each output position `x` takes the moving image's value at the mapped
/// point `T(x)`, so the output lives in the fixed image's space. Until run,
/// the provided image is empty.
pub struct LinearResampler<const D: usize> {
    instance_name: String,
    template: ParameterMap,
    moving: Option<ComponentHandle>,
    transform: Option<ComponentHandle>,
    image: DVector<f64>,
}

impl<const D: usize> LinearResampler<D> {
    pub fn new(instance_name: impl Into<String>) -> Self {
        Self {
            instance_name: instance_name.into(),
            template: image_template(CLASS, D),
            moving: None,
            transform: None,
            image: DVector::zeros(0),
        }
    }

    pub fn catalog_entry() -> CatalogEntry {
        CatalogEntry::new(CLASS, image_template(CLASS, D), ACCEPTS, PROVIDES, |name| {
            Rc::new(RefCell::new(LinearResampler::<D>::new(name))) as ComponentHandle
        })
    }
}

impl<const D: usize> Component for LinearResampler<D> {
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
            InterfaceKind::Image => {
                require_capability(provider, InterfaceKind::Image, CLASS)?;
                self.moving = Some(provider.clone());
                Ok(())
            }
            InterfaceKind::Transformation => {
                require_capability(provider, InterfaceKind::Transformation, CLASS)?;
                self.transform = Some(provider.clone());
                Ok(())
            }
            other => Err(ComponentError::UnsupportedInterface { class: CLASS, kind: other }),
        }
    }

    fn connected_ok(&self) -> bool {
        self.moving.is_some() && self.transform.is_some()
    }

    fn run(&mut self) -> ComponentResult<()> {
        let moving = pull_image(&self.moving, CLASS, "moving image input")?;
        let transform_handle =
            self.transform
                .as_ref()
                .ok_or(ComponentError::NotConnected {
                    class: CLASS,
                    what: "transform input",
                })?;
        let provider = transform_handle.borrow();
        let transform = provider
            .as_transformation()
            .ok_or(ComponentError::MissingCapability {
                class: CLASS,
                kind: InterfaceKind::Transformation,
            })?;
        self.image =
            DVector::from_fn(moving.len(), |i, _| {
                sample_linear(&moving, transform.map_point(i as f64))
            });
        Ok(())
    }

    fn as_image(&self) -> Option<&dyn ImageProvider> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<const D: usize> ImageProvider for LinearResampler<D> {
    fn image(&self) -> DVector<f64> {
        self.image.clone()
    }
}
