//! Error types for component wiring and execution.

use thiserror::Error;

use crate::interfaces::InterfaceKind;

#[derive(Error, Debug, Clone)]
pub enum ComponentError {
    #[error("{class} does not accept {kind} connections")]
    UnsupportedInterface {
        class: &'static str,
        kind: InterfaceKind,
    },

    #[error("provider wired into {class} does not expose {kind}")]
    MissingCapability {
        class: &'static str,
        kind: InterfaceKind,
    },

    #[error("{class}: unrecognized {kind} connection role \"{role}\"")]
    UnknownRole {
        class: &'static str,
        kind: InterfaceKind,
        role: String,
    },

    #[error("{class} is not fully connected: {what}")]
    NotConnected {
        class: &'static str,
        what: &'static str,
    },
}

pub type ComponentResult<T> = Result<T, ComponentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_names_the_interface() {
        let err = ComponentError::UnsupportedInterface {
            class: "ImageSink",
            kind: InterfaceKind::MetricValue,
        };
        assert!(err.to_string().contains("MetricValue"));
        assert!(err.to_string().contains("ImageSink"));
    }
}
