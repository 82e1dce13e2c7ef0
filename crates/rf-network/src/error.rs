//! Network-level error types.

use rf_components::ComponentError;
use rf_core::RfError;
use thiserror::Error;

pub type NetworkResult<T> = Result<T, NetworkError>;

fn edge_label(upstream: &str, downstream: &str, name: &str) -> String {
    if name.is_empty() {
        format!("{upstream} -> {downstream}")
    } else {
        format!("{upstream} -> {downstream} ({name})")
    }
}

fn unresolved_summary(ambiguous: &[(String, usize)], exhausted: &[String]) -> String {
    let mut parts: Vec<String> = ambiguous
        .iter()
        .map(|(name, count)| format!("{name} is ambiguous ({count} candidates)"))
        .collect();
    parts.extend(exhausted.iter().map(|name| format!("{name} has no candidate")));
    parts.join("; ")
}

#[derive(Error, Debug)]
pub enum NetworkError {
    /// Selection finished without every vertex narrowing to exactly one
    /// class. Both failure modes are reported together so one fix-compile
    /// cycle can address all of them.
    #[error("unresolved components: {}", unresolved_summary(.ambiguous, .exhausted))]
    UnresolvedComponents {
        ambiguous: Vec<(String, usize)>,
        exhausted: Vec<String>,
    },

    #[error("invalid criteria for component \"{component}\": {source}")]
    InvalidCriteria { component: String, source: RfError },

    #[error("connection {} names unknown interface \"{name}\"", edge_label(.upstream, .downstream, ""))]
    UnknownInterface {
        name: String,
        upstream: String,
        downstream: String,
    },

    #[error("no interface can serve connection {}", edge_label(.upstream, .downstream, .connection))]
    ConnectionUnsatisfiable {
        upstream: String,
        downstream: String,
        connection: String,
    },

    #[error(
        "multiple interfaces could serve connection {}: {}",
        edge_label(.upstream, .downstream, .connection),
        .candidates.join(", ")
    )]
    AmbiguousConnection {
        upstream: String,
        downstream: String,
        connection: String,
        candidates: Vec<String>,
    },

    #[error("wiring connection {} failed: {source}", edge_label(.upstream, .downstream, .connection))]
    ConnectionRejected {
        upstream: String,
        downstream: String,
        connection: String,
        source: ComponentError,
    },

    #[error("components are missing required inputs: {}", .components.join(", "))]
    NotFullyConnected { components: Vec<String> },

    #[error("component \"{name}\" has no resolved instance")]
    MissingComponent { name: String },

    #[error("component \"{component}\" failed: {source}")]
    Component {
        component: String,
        source: ComponentError,
    },

    #[error("blueprint contains a cycle")]
    CycleDetected,

    #[error("network builder has not completed the previous stage")]
    NotConfigured,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_report_names_every_vertex() {
        let err = NetworkError::UnresolvedComponents {
            ambiguous: vec![("Metric".to_string(), 2)],
            exhausted: vec!["Optimizer".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("Metric is ambiguous (2 candidates)"));
        assert!(message.contains("Optimizer has no candidate"));
    }

    #[test]
    fn edge_errors_name_both_endpoints() {
        let err = NetworkError::ConnectionUnsatisfiable {
            upstream: "Metric".to_string(),
            downstream: "Optimizer".to_string(),
            connection: "value".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "no interface can serve connection Metric -> Optimizer (value)"
        );
        let unnamed = NetworkError::ConnectionUnsatisfiable {
            upstream: "A".to_string(),
            downstream: "B".to_string(),
            connection: String::new(),
        };
        assert_eq!(unnamed.to_string(), "no interface can serve connection A -> B");
    }
}
