//! Capability interfaces exchanged over blueprint connections.
//!
//! Interface kinds are the vocabulary of `NameOfInterface` connection
//! properties and of accepting/providing selection criteria. The provider
//! traits are the typed calls a downstream component makes against an
//! upstream one after wiring.

use core::fmt;

use nalgebra::DVector;

use crate::error::ComponentResult;

/// Property key carrying a component's class identity.
pub const NAME_OF_CLASS: &str = "NameOfClass";

/// Template property key carrying a component's dimensionality.
pub const DIMENSIONALITY: &str = "Dimensionality";

/// Template property key carrying a component's pixel type.
pub const PIXEL_TYPE: &str = "PixelType";

/// Connection property key selecting the interface(s) a connection carries.
pub const NAME_OF_INTERFACE: &str = "NameOfInterface";

/// Reserved criterion key: candidate must accept the named interface.
pub const HAS_ACCEPTING_INTERFACE: &str = "HasAcceptingInterface";

/// Reserved criterion key: candidate must provide the named interface.
pub const HAS_PROVIDING_INTERFACE: &str = "HasProvidingInterface";

/// The closed set of connection capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceKind {
    /// An image payload (toy 1-D signal; real image I/O is out of scope).
    Image,
    /// Similarity value evaluated at candidate transform parameters.
    MetricValue,
    /// Similarity gradient evaluated at candidate transform parameters.
    MetricDerivative,
    /// Optimized transform parameters.
    Parameters,
    /// Point-mapping capability of a transform.
    Transformation,
}

impl InterfaceKind {
    pub const ALL: [InterfaceKind; 5] = [
        InterfaceKind::Image,
        InterfaceKind::MetricValue,
        InterfaceKind::MetricDerivative,
        InterfaceKind::Parameters,
        InterfaceKind::Transformation,
    ];

    /// The stable name used in blueprints and criteria.
    pub fn name(self) -> &'static str {
        match self {
            InterfaceKind::Image => "Image",
            InterfaceKind::MetricValue => "MetricValue",
            InterfaceKind::MetricDerivative => "MetricDerivative",
            InterfaceKind::Parameters => "Parameters",
            InterfaceKind::Transformation => "Transformation",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for InterfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Produces an image.
pub trait ImageProvider {
    fn image(&self) -> DVector<f64>;
}

/// Evaluates a dissimilarity measure at candidate transform parameters.
/// Lower is better; optimizers minimize.
///
/// Evaluation pulls the provider's own wired inputs, so it can fail when
/// those are missing.
pub trait MetricValueProvider {
    /// Length of the parameter vector this metric expects.
    fn parameter_count(&self) -> usize;

    fn value_at(&self, parameters: &DVector<f64>) -> ComponentResult<f64>;
}

/// Evaluates the dissimilarity gradient at candidate transform parameters.
pub trait MetricDerivativeProvider {
    fn derivative_at(&self, parameters: &DVector<f64>) -> ComponentResult<DVector<f64>>;
}

/// Exposes an optimization result.
pub trait ParametersProvider {
    fn parameters(&self) -> DVector<f64>;
}

/// Maps points along the signal axis.
pub trait TransformationProvider {
    /// Length of the parameter vector this transform is steered by.
    fn parameter_count(&self) -> usize;

    /// Map a point under explicitly supplied parameters (used by metrics
    /// probing candidate parameters during optimization).
    fn map_point_at(&self, x: f64, parameters: &DVector<f64>) -> f64;

    /// Map a point under the transform's resolved parameters.
    fn map_point(&self, x: f64) -> f64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in InterfaceKind::ALL {
            assert_eq!(InterfaceKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(InterfaceKind::from_name("DisplacementField"), None);
        assert_eq!(InterfaceKind::from_name(""), None);
    }

    #[test]
    fn display_matches_name() {
        assert_eq!(InterfaceKind::MetricDerivative.to_string(), "MetricDerivative");
    }
}
