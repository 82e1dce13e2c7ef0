//! rf-components: the component library of the registration framework.
//!
//! Contains:
//! - interfaces (interface kinds + provider traits exchanged over connections)
//! - component (the object trait every component implements)
//! - catalog (the instantiable class registry selection draws from)
//! - source / sink (image entry and observation points)
//! - metric (SSD and NCC dissimilarity measures)
//! - optimizer (gradient descent and Nelder-Mead)
//! - transform / resampler (point mapping and image resampling)
//! - common (template builders, criterion parsing, signal sampling)
//! - error (component error types)

pub mod catalog;
pub mod common;
pub mod component;
pub mod error;
pub mod interfaces;
pub mod metric;
pub mod optimizer;
pub mod resampler;
pub mod sink;
pub mod source;
pub mod transform;

pub use catalog::{CatalogEntry, ComponentCatalog};
pub use component::{Component, ComponentHandle, capability_present};
pub use error::{ComponentError, ComponentResult};
pub use interfaces::InterfaceKind;
pub use metric::{NccMetric, SsdMetric};
pub use optimizer::{GradientDescentOptimizer, NelderMeadOptimizer};
pub use resampler::LinearResampler;
pub use sink::ImageSink;
pub use source::ImageSource;
pub use transform::AffineTransform;
