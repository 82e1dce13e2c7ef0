//! End-to-end registration pipelines: configure, connect, realize, run.

use nalgebra::DVector;

use rf_blueprint::Blueprint;
use rf_components::common::gaussian_signal;
use rf_components::{ComponentCatalog, ImageSink, ImageSource};
use rf_core::ParameterMap;
use rf_network::{Network, NetworkBuilder, NetworkError};

fn pm(entries: &[(&str, &[&str])]) -> ParameterMap {
    let mut map = ParameterMap::new();
    for (key, values) in entries {
        map.insert(*key, values.iter().copied());
    }
    map
}

/// The canonical seven-component registration blueprint.
///
/// Sources feed an SSD metric by role; the metric drives a gradient
/// descent optimizer over two labeled parallel connections; the optimized
/// parameters steer a transform that the resampler applies to the moving
/// image, ending in a sink.
fn registration_blueprint() -> Blueprint {
    let mut bp = Blueprint::new("registration");
    bp.set_component("FixedSource", pm(&[("NameOfClass", &["ImageSource"]), ("Dimensionality", &["2"])]));
    bp.set_component("MovingSource", pm(&[("NameOfClass", &["ImageSource"]), ("Dimensionality", &["2"])]));
    bp.set_component(
        "Metric",
        pm(&[("NameOfClass", &["SsdMetric"]), ("Dimensionality", &["2"])]),
    );
    bp.set_component(
        "Optimizer",
        pm(&[
            ("NameOfClass", &["GradientDescentOptimizer"]),
            ("NumberOfIterations", &["150"]),
            ("StepSize", &["0.5"]),
        ]),
    );
    bp.set_component(
        "Transform",
        pm(&[("NameOfClass", &["AffineTransform"]), ("Dimensionality", &["2"])]),
    );
    bp.set_component(
        "Resampler",
        pm(&[("NameOfClass", &["LinearResampler"]), ("Dimensionality", &["2"])]),
    );
    bp.set_component("Sink", pm(&[("NameOfClass", &["ImageSink"]), ("Dimensionality", &["2"])]));

    bp.set_connection("FixedSource", "Metric", "fixed", pm(&[]));
    bp.set_connection("MovingSource", "Metric", "moving", pm(&[]));
    bp.set_connection(
        "Metric",
        "Optimizer",
        "value",
        pm(&[("NameOfInterface", &["MetricValue"])]),
    );
    bp.set_connection(
        "Metric",
        "Optimizer",
        "derivative",
        pm(&[("NameOfInterface", &["MetricDerivative"])]),
    );
    bp.set_connection("Optimizer", "Transform", "", pm(&[]));
    bp.set_connection("Transform", "Resampler", "", pm(&[]));
    bp.set_connection("MovingSource", "Resampler", "", pm(&[]));
    bp.set_connection("Resampler", "Sink", "", pm(&[]));
    bp
}

fn set_source_image(network: &Network, name: &str, image: DVector<f64>) {
    let handle = network.component(name).unwrap();
    let mut component = handle.borrow_mut();
    component
        .as_any_mut()
        .downcast_mut::<ImageSource<2>>()
        .unwrap()
        .set_image(image);
}

fn sink_image(network: &Network, name: &str) -> DVector<f64> {
    let handle = network.component(name).unwrap();
    let component = handle.borrow();
    component
        .as_any()
        .downcast_ref::<ImageSink<2>>()
        .unwrap()
        .image()
        .cloned()
        .unwrap()
}

#[test]
fn configure_resolves_every_vertex() {
    let mut builder =
        NetworkBuilder::new(registration_blueprint(), ComponentCatalog::with_defaults());
    builder.configure().unwrap();
    assert_eq!(
        builder.resolutions(),
        vec![
            ("FixedSource".to_string(), "ImageSource"),
            ("MovingSource".to_string(), "ImageSource"),
            ("Metric".to_string(), "SsdMetric"),
            ("Optimizer".to_string(), "GradientDescentOptimizer"),
            ("Transform".to_string(), "AffineTransform"),
            ("Resampler".to_string(), "LinearResampler"),
            ("Sink".to_string(), "ImageSink"),
        ]
    );
}

#[test]
fn registration_pipeline_recovers_the_shift() {
    let mut network =
        NetworkBuilder::new(registration_blueprint(), ComponentCatalog::with_defaults())
            .build()
            .unwrap();

    let fixed = gaussian_signal(32, 18.0, 3.0);
    set_source_image(&network, "FixedSource", fixed.clone());
    set_source_image(&network, "MovingSource", gaussian_signal(32, 14.0, 3.0));

    network.run().unwrap();

    // The optimizer found the aligning translation...
    let optimizer = network.component("Optimizer").unwrap().borrow();
    let parameters = optimizer.as_parameters().unwrap().parameters();
    assert_eq!(parameters.len(), 1);
    assert!(
        (parameters[0] + 4.0).abs() < 0.01,
        "expected a translation near -4, got {}",
        parameters[0]
    );
    drop(optimizer);

    // ...and the resampled moving image matches the fixed one at the sink.
    let result = sink_image(&network, "Sink");
    let residual = (&result - &fixed).norm();
    assert!(residual < 0.05, "registration residual too large: {residual}");
}

#[test]
fn execution_order_respects_the_wiring() {
    let network = NetworkBuilder::new(registration_blueprint(), ComponentCatalog::with_defaults())
        .build()
        .unwrap();
    let order = network.execution_order();
    let position = |name: &str| order.iter().position(|n| n == name).unwrap();
    assert_eq!(order.len(), 7);
    assert!(position("FixedSource") < position("Metric"));
    assert!(position("MovingSource") < position("Metric"));
    assert!(position("Metric") < position("Optimizer"));
    assert!(position("Optimizer") < position("Transform"));
    assert!(position("Transform") < position("Resampler"));
    assert!(position("MovingSource") < position("Resampler"));
    assert!(position("Resampler") < position("Sink"));
}

#[test]
fn ncc_with_nelder_mead_also_converges() {
    let mut bp = registration_blueprint();
    bp.set_component(
        "Metric",
        pm(&[("NameOfClass", &["NccMetric"]), ("Dimensionality", &["2"])]),
    );
    bp.set_component(
        "Optimizer",
        pm(&[
            ("NameOfClass", &["NelderMeadOptimizer"]),
            ("NumberOfIterations", &["60"]),
            ("SimplexDelta", &["1.0"]),
        ]),
    );
    // NCC has no derivative; a single unlabeled connection suffices since
    // MetricValue is the only interface both sides can agree on.
    assert!(bp.delete_connection("Metric", "Optimizer", "derivative"));
    assert!(bp.delete_connection("Metric", "Optimizer", "value"));
    bp.set_connection("Metric", "Optimizer", "", pm(&[]));

    let mut network = NetworkBuilder::new(bp, ComponentCatalog::with_defaults())
        .build()
        .unwrap();
    let fixed = gaussian_signal(32, 18.0, 3.0);
    set_source_image(&network, "FixedSource", fixed.clone());
    // NCC ignores intensity scale, so a brighter moving image still aligns.
    set_source_image(&network, "MovingSource", gaussian_signal(32, 14.0, 3.0) * 2.0);

    network.run().unwrap();

    let optimizer = network.component("Optimizer").unwrap().borrow();
    let parameters = optimizer.as_parameters().unwrap().parameters();
    assert!(
        (parameters[0] + 4.0).abs() < 0.01,
        "expected a translation near -4, got {}",
        parameters[0]
    );
    drop(optimizer);

    let result = sink_image(&network, "Sink");
    // The sink sees the *resampled moving* image: twice the fixed one.
    let residual = (&result - &(&fixed * 2.0)).norm();
    assert!(residual < 0.1, "registration residual too large: {residual}");
}

#[test]
fn missing_dimensionality_reports_ambiguity() {
    let mut bp = registration_blueprint();
    bp.set_component("Metric", pm(&[("NameOfClass", &["SsdMetric"])]));
    let mut builder = NetworkBuilder::new(bp, ComponentCatalog::with_defaults());
    match builder.configure() {
        Err(NetworkError::UnresolvedComponents { ambiguous, exhausted }) => {
            assert_eq!(ambiguous, vec![("Metric".to_string(), 2)]);
            assert!(exhausted.is_empty());
        }
        other => panic!("expected unresolved components, got {other:?}"),
    }
}

#[test]
fn unknown_class_reports_exhaustion() {
    let mut bp = registration_blueprint();
    bp.set_component("Metric", pm(&[("NameOfClass", &["WarpFieldMetric"])]));
    let mut builder = NetworkBuilder::new(bp, ComponentCatalog::with_defaults());
    match builder.configure() {
        Err(NetworkError::UnresolvedComponents { ambiguous, exhausted }) => {
            assert!(ambiguous.is_empty());
            assert_eq!(exhausted, vec!["Metric".to_string()]);
        }
        other => panic!("expected unresolved components, got {other:?}"),
    }
}

#[test]
fn edge_interface_criteria_narrow_the_endpoints() {
    // Leave the optimizer class open: NumberOfIterations alone keeps both
    // optimizers alive, and the labeled derivative edge then forces one
    // that *accepts* MetricDerivative, which only the gradient optimizer
    // does.
    let mut bp = registration_blueprint();
    bp.set_component("Optimizer", pm(&[("NumberOfIterations", &["150"])]));
    let mut builder = NetworkBuilder::new(bp, ComponentCatalog::with_defaults());
    builder.configure().unwrap();
    let resolutions = builder.resolutions();
    assert!(resolutions.contains(&("Optimizer".to_string(), "GradientDescentOptimizer")));
}

#[test]
fn unknown_interface_name_fails_configuration() {
    let mut bp = registration_blueprint();
    bp.set_connection(
        "Metric",
        "Optimizer",
        "value",
        pm(&[("NameOfInterface", &["DisplacementField"])]),
    );
    let mut builder = NetworkBuilder::new(bp, ComponentCatalog::with_defaults());
    match builder.configure() {
        Err(NetworkError::UnknownInterface { name, upstream, downstream }) => {
            assert_eq!(name, "DisplacementField");
            assert_eq!(upstream, "Metric");
            assert_eq!(downstream, "Optimizer");
        }
        other => panic!("expected an unknown interface error, got {other:?}"),
    }
}

#[test]
fn unlabeled_connection_with_two_shared_interfaces_is_ambiguous() {
    let mut bp = registration_blueprint();
    assert!(bp.delete_connection("Metric", "Optimizer", "value"));
    assert!(bp.delete_connection("Metric", "Optimizer", "derivative"));
    // SsdMetric provides both MetricValue and MetricDerivative and the
    // gradient optimizer accepts both, so the wiring cannot choose.
    bp.set_connection("Metric", "Optimizer", "", pm(&[]));
    let mut builder = NetworkBuilder::new(bp, ComponentCatalog::with_defaults());
    builder.configure().unwrap();
    match builder.connect_components() {
        Err(NetworkError::AmbiguousConnection { candidates, .. }) => {
            assert_eq!(candidates, vec!["MetricValue", "MetricDerivative"]);
        }
        other => panic!("expected an ambiguous connection, got {other:?}"),
    }
}

#[test]
fn connection_without_common_ground_is_unsatisfiable() {
    let mut bp = Blueprint::new("mismatch");
    bp.set_component(
        "Source",
        pm(&[("NameOfClass", &["ImageSource"]), ("Dimensionality", &["2"])]),
    );
    bp.set_component(
        "Transform",
        pm(&[("NameOfClass", &["AffineTransform"]), ("Dimensionality", &["2"])]),
    );
    // A transform accepts parameters, not images.
    bp.set_connection("Source", "Transform", "", pm(&[]));
    let mut builder = NetworkBuilder::new(bp, ComponentCatalog::with_defaults());
    builder.configure().unwrap();
    assert!(matches!(
        builder.connect_components(),
        Err(NetworkError::ConnectionUnsatisfiable { .. })
    ));
}

#[test]
fn explicit_interface_the_downstream_rejects_names_the_edge() {
    let mut bp = registration_blueprint();
    // Claim the optimizer should receive an image over the value edge.
    bp.set_connection(
        "Metric",
        "Optimizer",
        "value",
        pm(&[("NameOfInterface", &["Transformation"])]),
    );
    let mut builder = NetworkBuilder::new(bp, ComponentCatalog::with_defaults());
    // The edge criterion already rules the metric out at configure time.
    match builder.configure() {
        Err(NetworkError::UnresolvedComponents { exhausted, .. }) => {
            assert!(exhausted.contains(&"Metric".to_string()));
            assert!(exhausted.contains(&"Optimizer".to_string()));
        }
        other => panic!("expected unresolved components, got {other:?}"),
    }
}

#[test]
fn half_wired_metric_fails_realization() {
    let mut bp = registration_blueprint();
    assert!(bp.delete_connection("MovingSource", "Metric", "moving"));
    let mut builder = NetworkBuilder::new(bp, ComponentCatalog::with_defaults());
    builder.configure().unwrap();
    builder.connect_components().unwrap();
    match builder.realize() {
        Err(NetworkError::NotFullyConnected { components }) => {
            assert_eq!(components, vec!["Metric".to_string()]);
        }
        other => {
            panic!("expected a readiness failure, got {:?}", other.err());
        }
    }
}

#[test]
fn self_connection_is_rejected_as_a_cycle() {
    let mut bp = Blueprint::new("selfloop");
    bp.set_component(
        "Resampler",
        pm(&[("NameOfClass", &["LinearResampler"]), ("Dimensionality", &["2"])]),
    );
    bp.set_connection("Resampler", "Resampler", "", pm(&[]));
    let mut builder = NetworkBuilder::new(bp, ComponentCatalog::with_defaults());
    builder.configure().unwrap();
    assert!(matches!(
        builder.connect_components(),
        Err(NetworkError::CycleDetected)
    ));
}

#[test]
fn cyclic_wiring_fails_realization() {
    let mut bp = Blueprint::new("cycle");
    bp.set_component(
        "Transform",
        pm(&[("NameOfClass", &["AffineTransform"]), ("Dimensionality", &["2"])]),
    );
    for name in ["First", "Second"] {
        bp.set_component(
            name,
            pm(&[("NameOfClass", &["LinearResampler"]), ("Dimensionality", &["2"])]),
        );
        bp.set_connection("Transform", name, "", pm(&[]));
    }
    // Two resamplers feeding each other: each edge wires fine, the order
    // does not exist.
    bp.set_connection(
        "First",
        "Second",
        "",
        pm(&[("NameOfInterface", &["Image"])]),
    );
    bp.set_connection(
        "Second",
        "First",
        "",
        pm(&[("NameOfInterface", &["Image"])]),
    );
    let mut builder = NetworkBuilder::new(bp, ComponentCatalog::with_defaults());
    builder.configure().unwrap();
    builder.connect_components().unwrap();
    assert!(matches!(builder.realize(), Err(NetworkError::CycleDetected)));
}
