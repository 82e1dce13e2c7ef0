//! The component catalog: every class the framework can instantiate.
//!
//! The catalog is an ordered runtime registry. Template properties are
//! queryable without instantiation, so selection can rule classes out
//! cheaply; instances are only created for candidates that survive into
//! runtime-criterion territory.

use rf_core::ParameterMap;

use crate::component::ComponentHandle;
use crate::interfaces::InterfaceKind;
use crate::metric::{NccMetric, SsdMetric};
use crate::optimizer::{GradientDescentOptimizer, NelderMeadOptimizer};
use crate::resampler::LinearResampler;
use crate::sink::ImageSink;
use crate::source::ImageSource;
use crate::transform::AffineTransform;

/// One instantiable component class.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    class_name: &'static str,
    template_properties: ParameterMap,
    accepts: &'static [InterfaceKind],
    provides: &'static [InterfaceKind],
    factory: fn(&str) -> ComponentHandle,
}

impl CatalogEntry {
    pub fn new(
        class_name: &'static str,
        template_properties: ParameterMap,
        accepts: &'static [InterfaceKind],
        provides: &'static [InterfaceKind],
        factory: fn(&str) -> ComponentHandle,
    ) -> Self {
        Self {
            class_name,
            template_properties,
            accepts,
            provides,
            factory,
        }
    }

    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    pub fn template_properties(&self) -> &ParameterMap {
        &self.template_properties
    }

    pub fn accepts(&self) -> &'static [InterfaceKind] {
        self.accepts
    }

    pub fn provides(&self) -> &'static [InterfaceKind] {
        self.provides
    }

    /// Create a live instance for the named blueprint vertex.
    pub fn instantiate(&self, instance_name: &str) -> ComponentHandle {
        (self.factory)(instance_name)
    }
}

/// Ordered collection of [`CatalogEntry`]; registration order is selection
/// order, which keeps resolution deterministic.
#[derive(Debug, Clone, Default)]
pub struct ComponentCatalog {
    entries: Vec<CatalogEntry>,
}

impl ComponentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog of every built-in component class, in 2-D and 3-D variants
    /// where dimensionality applies.
    pub fn with_defaults() -> Self {
        Self::from_entries([
            ImageSource::<2>::catalog_entry(),
            ImageSource::<3>::catalog_entry(),
            ImageSink::<2>::catalog_entry(),
            ImageSink::<3>::catalog_entry(),
            SsdMetric::<2>::catalog_entry(),
            SsdMetric::<3>::catalog_entry(),
            NccMetric::<2>::catalog_entry(),
            NccMetric::<3>::catalog_entry(),
            GradientDescentOptimizer::catalog_entry(),
            NelderMeadOptimizer::catalog_entry(),
            AffineTransform::<2>::catalog_entry(),
            AffineTransform::<3>::catalog_entry(),
            LinearResampler::<2>::catalog_entry(),
            LinearResampler::<3>::catalog_entry(),
        ])
    }

    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn register(&mut self, entry: CatalogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
