//! Similarity metrics comparing a fixed image against a transformed
//! moving image.
//!
//! Both metrics are dissimilarity measures: lower is better, optimizers
//! minimize. Their Transformation input is optional; without one they fall
//! back to a built-in single-parameter translation model, which keeps the
//! metric usable in pipelines that have no explicit transform component.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use nalgebra::DVector;
use rf_core::{Criterion, ParameterMap};

use crate::catalog::CatalogEntry;
use crate::common::{image_template, sample_linear};
use crate::component::{Component, ComponentHandle, pull_image, require_capability};
use crate::error::{ComponentError, ComponentResult};
use crate::interfaces::{InterfaceKind, MetricDerivativeProvider, MetricValueProvider};

/// Connection name routing an image provider into the fixed-image slot.
pub const ROLE_FIXED: &str = "fixed";

/// Connection name routing an image provider into the moving-image slot.
pub const ROLE_MOVING: &str = "moving";

const ACCEPTS: &[InterfaceKind] = &[InterfaceKind::Image, InterfaceKind::Transformation];

/// Step for the central-difference gradient of [`SsdMetric`].
const DERIVATIVE_STEP: f64 = 1e-3;

/// The wired inputs shared by the metric models.
///
/// Image connections are routed by role (the connection name), since a
/// metric has two same-kind image slots.
#[derive(Default)]
struct MetricInputs {
    fixed: Option<ComponentHandle>,
    moving: Option<ComponentHandle>,
    transform: Option<ComponentHandle>,
}

impl MetricInputs {
    fn accept(
        &mut self,
        class: &'static str,
        kind: InterfaceKind,
        connection: &str,
        provider: &ComponentHandle,
    ) -> ComponentResult<()> {
        match kind {
            InterfaceKind::Image => {
                require_capability(provider, InterfaceKind::Image, class)?;
                match connection {
                    ROLE_FIXED => self.fixed = Some(provider.clone()),
                    ROLE_MOVING => self.moving = Some(provider.clone()),
                    other => {
                        return Err(ComponentError::UnknownRole {
                            class,
                            kind,
                            role: other.to_owned(),
                        });
                    }
                }
                Ok(())
            }
            InterfaceKind::Transformation => {
                require_capability(provider, InterfaceKind::Transformation, class)?;
                self.transform = Some(provider.clone());
                Ok(())
            }
            other => Err(ComponentError::UnsupportedInterface { class, kind: other }),
        }
    }

    fn connected(&self) -> bool {
        self.fixed.is_some() && self.moving.is_some()
    }

    fn fixed_image(&self, class: &'static str) -> ComponentResult<DVector<f64>> {
        pull_image(&self.fixed, class, "fixed image input")
    }

    fn moving_image(&self, class: &'static str) -> ComponentResult<DVector<f64>> {
        pull_image(&self.moving, class, "moving image input")
    }

    fn parameter_count(&self) -> usize {
        match &self.transform {
            Some(handle) => handle
                .borrow()
                .as_transformation()
                .map_or(1, |t| t.parameter_count()),
            None => 1,
        }
    }

    /// Map a fixed-image position into moving-image space under candidate
    /// parameters, through the wired transform or the built-in translation.
    fn mapped_point(
        &self,
        class: &'static str,
        x: f64,
        parameters: &DVector<f64>,
    ) -> ComponentResult<f64> {
        match &self.transform {
            Some(handle) => {
                let provider = handle.borrow();
                let transform =
                    provider
                        .as_transformation()
                        .ok_or(ComponentError::MissingCapability {
                            class,
                            kind: InterfaceKind::Transformation,
                        })?;
                Ok(transform.map_point_at(x, parameters))
            }
            None => Ok(x + parameters.get(0).copied().unwrap_or(0.0)),
        }
    }

    /// The moving image resampled into fixed-image space, one sample per
    /// fixed-image position.
    fn resample_moving(
        &self,
        class: &'static str,
        len: usize,
        parameters: &DVector<f64>,
    ) -> ComponentResult<DVector<f64>> {
        let moving = self.moving_image(class)?;
        let mut resampled = DVector::zeros(len);
        for i in 0..len {
            let mapped = self.mapped_point(class, i as f64, parameters)?;
            resampled[i] = sample_linear(&moving, mapped);
        }
        Ok(resampled)
    }
}

/// Sum of squared differences between the fixed image and the transformed
/// moving image. Provides both the value and (by central differences) the
/// derivative, so gradient-based optimizers can drive it.
pub struct SsdMetric<const D: usize> {
    instance_name: String,
    template: ParameterMap,
    inputs: MetricInputs,
}

impl<const D: usize> SsdMetric<D> {
    const CLASS: &'static str = "SsdMetric";
    const PROVIDES: &'static [InterfaceKind] =
        &[InterfaceKind::MetricValue, InterfaceKind::MetricDerivative];

    pub fn new(instance_name: impl Into<String>) -> Self {
        Self {
            instance_name: instance_name.into(),
            template: image_template(Self::CLASS, D),
            inputs: MetricInputs::default(),
        }
    }

    pub fn catalog_entry() -> CatalogEntry {
        CatalogEntry::new(
            Self::CLASS,
            image_template(Self::CLASS, D),
            ACCEPTS,
            Self::PROVIDES,
            |name| Rc::new(RefCell::new(SsdMetric::<D>::new(name))) as ComponentHandle,
        )
    }
}

impl<const D: usize> Component for SsdMetric<D> {
    fn instance_name(&self) -> &str {
        &self.instance_name
    }

    fn class_name(&self) -> &'static str {
        Self::CLASS
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
        Self::PROVIDES
    }

    fn accept_connection(
        &mut self,
        kind: InterfaceKind,
        connection: &str,
        provider: &ComponentHandle,
    ) -> ComponentResult<()> {
        self.inputs.accept(Self::CLASS, kind, connection, provider)
    }

    fn connected_ok(&self) -> bool {
        self.inputs.connected()
    }

    fn as_metric_value(&self) -> Option<&dyn MetricValueProvider> {
        Some(self)
    }

    fn as_metric_derivative(&self) -> Option<&dyn MetricDerivativeProvider> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<const D: usize> MetricValueProvider for SsdMetric<D> {
    fn parameter_count(&self) -> usize {
        self.inputs.parameter_count()
    }

    fn value_at(&self, parameters: &DVector<f64>) -> ComponentResult<f64> {
        let fixed = self.inputs.fixed_image(Self::CLASS)?;
        let resampled = self
            .inputs
            .resample_moving(Self::CLASS, fixed.len(), parameters)?;
        let mut sum = 0.0;
        for i in 0..fixed.len() {
            let diff = fixed[i] - resampled[i];
            sum += diff * diff;
        }
        Ok(sum)
    }
}

impl<const D: usize> MetricDerivativeProvider for SsdMetric<D> {
    fn derivative_at(&self, parameters: &DVector<f64>) -> ComponentResult<DVector<f64>> {
        let mut gradient = DVector::zeros(parameters.len());
        for axis in 0..parameters.len() {
            let mut plus = parameters.clone();
            plus[axis] += DERIVATIVE_STEP;
            let mut minus = parameters.clone();
            minus[axis] -= DERIVATIVE_STEP;
            gradient[axis] =
                (self.value_at(&plus)? - self.value_at(&minus)?) / (2.0 * DERIVATIVE_STEP);
        }
        Ok(gradient)
    }
}

/// Negated normalized cross correlation. Invariant to intensity scale and
/// offset, but derivative-free: it provides MetricValue only, pairing with
/// optimizers that do not need a gradient.
pub struct NccMetric<const D: usize> {
    instance_name: String,
    template: ParameterMap,
    inputs: MetricInputs,
}

impl<const D: usize> NccMetric<D> {
    const CLASS: &'static str = "NccMetric";
    const PROVIDES: &'static [InterfaceKind] = &[InterfaceKind::MetricValue];

    pub fn new(instance_name: impl Into<String>) -> Self {
        Self {
            instance_name: instance_name.into(),
            template: image_template(Self::CLASS, D),
            inputs: MetricInputs::default(),
        }
    }

    pub fn catalog_entry() -> CatalogEntry {
        CatalogEntry::new(
            Self::CLASS,
            image_template(Self::CLASS, D),
            ACCEPTS,
            Self::PROVIDES,
            |name| Rc::new(RefCell::new(NccMetric::<D>::new(name))) as ComponentHandle,
        )
    }
}

impl<const D: usize> Component for NccMetric<D> {
    fn instance_name(&self) -> &str {
        &self.instance_name
    }

    fn class_name(&self) -> &'static str {
        Self::CLASS
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
        Self::PROVIDES
    }

    fn accept_connection(
        &mut self,
        kind: InterfaceKind,
        connection: &str,
        provider: &ComponentHandle,
    ) -> ComponentResult<()> {
        self.inputs.accept(Self::CLASS, kind, connection, provider)
    }

    fn connected_ok(&self) -> bool {
        self.inputs.connected()
    }

    fn as_metric_value(&self) -> Option<&dyn MetricValueProvider> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<const D: usize> MetricValueProvider for NccMetric<D> {
    fn parameter_count(&self) -> usize {
        self.inputs.parameter_count()
    }

    fn value_at(&self, parameters: &DVector<f64>) -> ComponentResult<f64> {
        let fixed = self.inputs.fixed_image(Self::CLASS)?;
        let n = fixed.len();
        if n == 0 {
            return Ok(0.0);
        }
        let resampled = self.inputs.resample_moving(Self::CLASS, n, parameters)?;
        let mean_fixed = fixed.mean();
        let mean_resampled = resampled.mean();
        let mut covariance = 0.0;
        let mut var_fixed = 0.0;
        let mut var_resampled = 0.0;
        for i in 0..n {
            let df = fixed[i] - mean_fixed;
            let dm = resampled[i] - mean_resampled;
            covariance += df * dm;
            var_fixed += df * df;
            var_resampled += dm * dm;
        }
        let denominator = (var_fixed * var_resampled).sqrt();
        if denominator <= f64::EPSILON {
            // A constant image correlates with nothing.
            return Ok(0.0);
        }
        Ok(-(covariance / denominator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::gaussian_signal;
    use crate::source::ImageSource;
    use crate::transform::AffineTransform;

    fn source_with(name: &str, image: DVector<f64>) -> ComponentHandle {
        let mut source = ImageSource::<2>::new(name);
        source.set_image(image);
        Rc::new(RefCell::new(source))
    }

    fn wired_ssd(fixed: DVector<f64>, moving: DVector<f64>) -> SsdMetric<2> {
        let mut metric = SsdMetric::<2>::new("Metric");
        let fixed = source_with("FixedSource", fixed);
        let moving = source_with("MovingSource", moving);
        metric
            .accept_connection(InterfaceKind::Image, ROLE_FIXED, &fixed)
            .unwrap();
        metric
            .accept_connection(InterfaceKind::Image, ROLE_MOVING, &moving)
            .unwrap();
        metric
    }

    #[test]
    fn identical_images_score_zero_at_identity() {
        let image = gaussian_signal(32, 16.0, 3.0);
        let metric = wired_ssd(image.clone(), image);
        let value = metric.value_at(&DVector::zeros(1)).unwrap();
        assert!(value.abs() < 1e-12);
    }

    #[test]
    fn ssd_is_minimal_at_the_aligning_translation() {
        let fixed = gaussian_signal(32, 18.0, 3.0);
        let moving = gaussian_signal(32, 14.0, 3.0);
        let metric = wired_ssd(fixed, moving);
        let aligned = metric.value_at(&DVector::from_vec(vec![-4.0])).unwrap();
        let identity = metric.value_at(&DVector::zeros(1)).unwrap();
        let overshoot = metric.value_at(&DVector::from_vec(vec![-8.0])).unwrap();
        // Not exactly zero: positions mapped past the edge clamp to the
        // boundary sample.
        assert!(aligned < 1e-8, "aligned SSD should vanish, got {aligned}");
        assert!(identity > aligned);
        assert!(overshoot > aligned);
    }

    #[test]
    fn ssd_gradient_points_toward_the_optimum() {
        let fixed = gaussian_signal(32, 18.0, 3.0);
        let moving = gaussian_signal(32, 14.0, 3.0);
        let metric = wired_ssd(fixed, moving);
        // The optimum is at -4; from 0 the descent direction is negative.
        let gradient = metric.derivative_at(&DVector::zeros(1)).unwrap();
        assert_eq!(gradient.len(), 1);
        assert!(gradient[0] > 0.0, "expected positive slope, got {}", gradient[0]);
        // Near the optimum the gradient flattens out.
        let near = metric.derivative_at(&DVector::from_vec(vec![-4.0])).unwrap();
        assert!(near[0].abs() < gradient[0].abs());
    }

    #[test]
    fn wired_transform_replaces_the_builtin_model() {
        let fixed = gaussian_signal(32, 18.0, 3.0);
        let moving = gaussian_signal(32, 14.0, 3.0);
        let mut metric = wired_ssd(fixed, moving);
        let transform: ComponentHandle = Rc::new(RefCell::new(AffineTransform::<2>::new("T")));
        metric
            .accept_connection(InterfaceKind::Transformation, "", &transform)
            .unwrap();
        assert_eq!(metric.parameter_count(), 1);
        let aligned = metric.value_at(&DVector::from_vec(vec![-4.0])).unwrap();
        assert!(aligned < 1e-8);
    }

    #[test]
    fn image_connections_need_a_known_role() {
        let mut metric = SsdMetric::<2>::new("Metric");
        let source = source_with("s", DVector::zeros(4));
        let err = metric
            .accept_connection(InterfaceKind::Image, "template", &source)
            .unwrap_err();
        assert!(matches!(err, ComponentError::UnknownRole { .. }));
        let err = metric
            .accept_connection(InterfaceKind::Image, "", &source)
            .unwrap_err();
        assert!(matches!(err, ComponentError::UnknownRole { .. }));
    }

    #[test]
    fn half_wired_metric_is_not_connected() {
        let mut metric = SsdMetric::<2>::new("Metric");
        assert!(!metric.connected_ok());
        let source = source_with("s", DVector::zeros(4));
        metric
            .accept_connection(InterfaceKind::Image, ROLE_FIXED, &source)
            .unwrap();
        assert!(!metric.connected_ok());
        let err = metric.value_at(&DVector::zeros(1)).unwrap_err();
        assert!(matches!(err, ComponentError::NotConnected { .. }));
    }

    #[test]
    fn ncc_rewards_correlation_regardless_of_scale() {
        let fixed = gaussian_signal(32, 18.0, 3.0);
        let moving = gaussian_signal(32, 14.0, 3.0) * 2.5;
        let mut metric = NccMetric::<2>::new("Metric");
        let fixed_src = source_with("FixedSource", fixed);
        let moving_src = source_with("MovingSource", moving);
        metric
            .accept_connection(InterfaceKind::Image, ROLE_FIXED, &fixed_src)
            .unwrap();
        metric
            .accept_connection(InterfaceKind::Image, ROLE_MOVING, &moving_src)
            .unwrap();
        let aligned = metric.value_at(&DVector::from_vec(vec![-4.0])).unwrap();
        let identity = metric.value_at(&DVector::zeros(1)).unwrap();
        assert!(aligned < -0.999, "perfect alignment should reach -1, got {aligned}");
        assert!(identity > aligned);
    }

    #[test]
    fn ncc_of_a_flat_image_is_zero() {
        let fixed = DVector::from_element(16, 3.0);
        let moving = gaussian_signal(16, 8.0, 2.0);
        let mut metric = NccMetric::<2>::new("Metric");
        let fixed_src = source_with("f", fixed);
        let moving_src = source_with("m", moving);
        metric
            .accept_connection(InterfaceKind::Image, ROLE_FIXED, &fixed_src)
            .unwrap();
        metric
            .accept_connection(InterfaceKind::Image, ROLE_MOVING, &moving_src)
            .unwrap();
        assert_eq!(metric.value_at(&DVector::zeros(1)).unwrap(), 0.0);
    }
}
