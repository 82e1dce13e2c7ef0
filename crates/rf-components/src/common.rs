//! Shared helpers for the component library: template-property builders,
//! criterion value parsing, and signal sampling.

use nalgebra::DVector;
use rf_core::{Criterion, ParameterMap};

use crate::interfaces::{DIMENSIONALITY, NAME_OF_CLASS, PIXEL_TYPE};

/// Template identity for a class with no further template parameters.
pub(crate) fn class_template(class_name: &str) -> ParameterMap {
    let mut map = ParameterMap::new();
    map.insert_single(NAME_OF_CLASS, class_name);
    map
}

/// Template identity for a dimension-templated class.
pub(crate) fn dimensional_template(class_name: &str, dimensionality: usize) -> ParameterMap {
    let mut map = class_template(class_name);
    map.insert_single(DIMENSIONALITY, dimensionality.to_string());
    map
}

/// Template identity for a pixel-carrying, dimension-templated class.
pub(crate) fn image_template(class_name: &str, dimensionality: usize) -> ParameterMap {
    let mut map = dimensional_template(class_name, dimensionality);
    map.insert_single(PIXEL_TYPE, "float");
    map
}

/// The criterion's value parsed as a positive count.
///
/// `None` unless the criterion is single-valued and parses to a value
/// greater than zero; callers reject the criterion in that case.
pub(crate) fn positive_count(criterion: &Criterion) -> Option<usize> {
    criterion
        .single_value()?
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
}

/// The criterion's value parsed as a strictly positive, finite float.
pub(crate) fn positive_float(criterion: &Criterion) -> Option<f64> {
    criterion
        .single_value()?
        .parse::<f64>()
        .ok()
        .filter(|x| x.is_finite() && *x > 0.0)
}

/// Sample a signal at a fractional position with linear interpolation.
/// Positions outside the signal clamp to the nearest edge sample; an
/// empty signal samples to zero everywhere.
pub fn sample_linear(signal: &DVector<f64>, position: f64) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    let last = (signal.len() - 1) as f64;
    let position = position.clamp(0.0, last);
    let lo = position.floor() as usize;
    let hi = position.ceil() as usize;
    let frac = position - lo as f64;
    signal[lo] * (1.0 - frac) + signal[hi] * frac
}

/// A smooth bump signal for demos and tests: a unit-height gaussian of
/// width `sigma` centered at `center`, sampled at `len` integer positions.
pub fn gaussian_signal(len: usize, center: f64, sigma: f64) -> DVector<f64> {
    DVector::from_fn(len, |i, _| {
        let d = (i as f64 - center) / sigma;
        (-0.5 * d * d).exp()
    })
}
