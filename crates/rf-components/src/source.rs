//! Image sources: the entry points of a registration pipeline.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use nalgebra::DVector;
use rf_core::{Criterion, ParameterMap};

use crate::catalog::CatalogEntry;
use crate::common::image_template;
use crate::component::{Component, ComponentHandle};
use crate::error::{ComponentError, ComponentResult};
use crate::interfaces::{ImageProvider, InterfaceKind};

const CLASS: &str = "ImageSource";
const PROVIDES: &[InterfaceKind] = &[InterfaceKind::Image];

/// Holds an image and feeds it to whatever is wired downstream.
///
/// The image payload is loaded by the driver through [`set_image`]
/// (typically after the network is realized); until then the source
/// provides an empty signal.
///
/// [`set_image`]: ImageSource::set_image
pub struct ImageSource<const D: usize> {
    instance_name: String,
    template: ParameterMap,
    image: DVector<f64>,
}

impl<const D: usize> ImageSource<D> {
    pub fn new(instance_name: impl Into<String>) -> Self {
        Self {
            instance_name: instance_name.into(),
            template: image_template(CLASS, D),
            image: DVector::zeros(0),
        }
    }

    pub fn catalog_entry() -> CatalogEntry {
        CatalogEntry::new(CLASS, image_template(CLASS, D), &[], PROVIDES, |name| {
            Rc::new(RefCell::new(ImageSource::<D>::new(name))) as ComponentHandle
        })
    }

    /// Load the signal this source feeds into the pipeline.
    pub fn set_image(&mut self, image: DVector<f64>) {
        self.image = image;
    }
}

impl<const D: usize> Component for ImageSource<D> {
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
        // Sources are pure template identity; no runtime knobs.
        false
    }

    fn accepts(&self) -> &'static [InterfaceKind] {
        &[]
    }

    fn provides(&self) -> &'static [InterfaceKind] {
        PROVIDES
    }

    fn accept_connection(
        &mut self,
        kind: InterfaceKind,
        _connection: &str,
        _provider: &ComponentHandle,
    ) -> ComponentResult<()> {
        Err(ComponentError::UnsupportedInterface { class: CLASS, kind })
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

impl<const D: usize> ImageProvider for ImageSource<D> {
    fn image(&self) -> DVector<f64> {
        self.image.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provides_the_loaded_image() {
        let mut source = ImageSource::<2>::new("FixedSource");
        assert_eq!(source.image().len(), 0);
        source.set_image(DVector::from_vec(vec![1.0, 2.0, 3.0]));
        assert_eq!(source.image(), DVector::from_vec(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn rejects_incoming_connections() {
        let mut source = ImageSource::<2>::new("FixedSource");
        let provider: ComponentHandle = Rc::new(RefCell::new(ImageSource::<2>::new("other")));
        let err = source
            .accept_connection(InterfaceKind::Image, "", &provider)
            .unwrap_err();
        assert!(matches!(err, ComponentError::UnsupportedInterface { .. }));
    }

    #[test]
    fn template_reflects_the_dimensionality() {
        let mut source = ImageSource::<3>::new("s");
        assert_eq!(source.template_properties().single("Dimensionality"), Some("3"));
        assert!(!source.meets_criterion(&Criterion::single("NumberOfIterations", "5")));
    }
}
