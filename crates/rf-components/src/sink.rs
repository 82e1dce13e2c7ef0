//! Image sinks: the observation points at the end of a pipeline.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use nalgebra::DVector;
use rf_core::{Criterion, ParameterMap};

use crate::catalog::CatalogEntry;
use crate::common::image_template;
use crate::component::{Component, ComponentHandle, pull_image, require_capability};
use crate::error::{ComponentError, ComponentResult};
use crate::interfaces::InterfaceKind;

const CLASS: &str = "ImageSink";
const ACCEPTS: &[InterfaceKind] = &[InterfaceKind::Image];

/// Pulls the image of its upstream provider when run and keeps it for the
/// driver to inspect.
pub struct ImageSink<const D: usize> {
    instance_name: String,
    template: ParameterMap,
    source: Option<ComponentHandle>,
    image: Option<DVector<f64>>,
}

impl<const D: usize> ImageSink<D> {
    pub fn new(instance_name: impl Into<String>) -> Self {
        Self {
            instance_name: instance_name.into(),
            template: image_template(CLASS, D),
            source: None,
            image: None,
        }
    }

    pub fn catalog_entry() -> CatalogEntry {
        CatalogEntry::new(CLASS, image_template(CLASS, D), ACCEPTS, &[], |name| {
            Rc::new(RefCell::new(ImageSink::<D>::new(name))) as ComponentHandle
        })
    }

    /// The image observed during the last run, if any.
    pub fn image(&self) -> Option<&DVector<f64>> {
        self.image.as_ref()
    }
}

impl<const D: usize> Component for ImageSink<D> {
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
        &[]
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
                self.source = Some(provider.clone());
                Ok(())
            }
            other => Err(ComponentError::UnsupportedInterface { class: CLASS, kind: other }),
        }
    }

    fn connected_ok(&self) -> bool {
        self.source.is_some()
    }

    fn run(&mut self) -> ComponentResult<()> {
        self.image = Some(pull_image(&self.source, CLASS, "image input")?);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
