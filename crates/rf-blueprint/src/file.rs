//! Property-tree blueprint documents (JSON or YAML) with includes.
//!
//! A document lists `Component` and `Connection` blocks plus an optional
//! `Include` list of further files. Includes load depth-first in listed
//! order before the including file's own content, so later files refine
//! earlier ones; repeated inclusion of compatible content is harmless,
//! while contradictory redefinitions abort the load.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use rf_core::ParameterMap;

use crate::error::{BlueprintError, BlueprintResult};
use crate::graph::{Graph, connection_label};

#[derive(Debug, Deserialize)]
struct BlueprintDoc {
    #[serde(default, rename = "Include")]
    include: Vec<String>,
    #[serde(default, rename = "Component")]
    components: Vec<ComponentEntry>,
    #[serde(default, rename = "Connection")]
    connections: Vec<ConnectionEntry>,
}

#[derive(Debug, Deserialize)]
struct ComponentEntry {
    #[serde(rename = "Name")]
    name: String,
    #[serde(flatten)]
    properties: BTreeMap<String, PropertyValue>,
}

#[derive(Debug, Deserialize)]
struct ConnectionEntry {
    #[serde(rename = "Out")]
    upstream: String,
    #[serde(rename = "In")]
    downstream: String,
    #[serde(default, rename = "Name")]
    name: String,
    #[serde(flatten)]
    properties: BTreeMap<String, PropertyValue>,
}

/// A property is a scalar or a list of scalars; everything becomes
/// strings in the ParameterMap.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PropertyValue {
    One(Scalar),
    Many(Vec<Scalar>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Integer(i) => i.to_string(),
            Scalar::Float(x) => x.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

impl PropertyValue {
    fn into_values(self) -> Vec<String> {
        match self {
            PropertyValue::One(scalar) => vec![scalar.into_string()],
            PropertyValue::Many(list) => list.into_iter().map(Scalar::into_string).collect(),
        }
    }
}

fn to_parameter_map(properties: BTreeMap<String, PropertyValue>) -> ParameterMap {
    properties
        .into_iter()
        .map(|(key, value)| (key, value.into_values()))
        .collect()
}

/// Merge a blueprint file (plus its includes) into `graph`.
///
/// Conflicts are fatal here, unlike compose: a file that contradicts
/// already-loaded content is a configuration bug, and the caller retries
/// the whole load after fixing it.
pub(crate) fn merge_into(graph: &mut Graph, path: &Path) -> BlueprintResult<()> {
    let mut in_progress = Vec::new();
    merge_recursive(graph, path, &mut in_progress)
}

fn merge_recursive(
    graph: &mut Graph,
    path: &Path,
    in_progress: &mut Vec<PathBuf>,
) -> BlueprintResult<()> {
    let canonical = path.canonicalize().map_err(|err| {
        BlueprintError::InvalidConfiguration {
            reason: format!("cannot resolve blueprint file {}: {}", path.display(), err),
        }
    })?;
    if in_progress.contains(&canonical) {
        return Err(BlueprintError::InvalidConfiguration {
            reason: format!("include cycle through {}", canonical.display()),
        });
    }
    in_progress.push(canonical.clone());

    let doc = parse_document(&canonical)?;
    let base = canonical.parent().map(Path::to_path_buf).unwrap_or_default();
    for include in &doc.include {
        tracing::debug!("including blueprint file '{}'", include);
        merge_recursive(graph, &base.join(include), in_progress)?;
    }
    apply_document(graph, doc, &canonical)?;

    in_progress.pop();
    Ok(())
}

fn parse_document(path: &Path) -> BlueprintResult<BlueprintDoc> {
    let text = std::fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(serde_json::from_str(&text)?),
        Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&text)?),
        other => Err(BlueprintError::InvalidConfiguration {
            reason: format!(
                "unsupported blueprint extension '{}' for {}",
                other.unwrap_or(""),
                path.display()
            ),
        }),
    }
}

fn apply_document(graph: &mut Graph, doc: BlueprintDoc, path: &Path) -> BlueprintResult<()> {
    for entry in doc.components {
        let properties = to_parameter_map(entry.properties);
        if graph.component_exists(&entry.name) {
            let mut merged = graph.component(&entry.name)?.clone();
            merged.merge_from(&properties)?;
            graph.set_component(entry.name, merged);
        } else {
            graph.set_component(entry.name, properties);
        }
    }
    for entry in doc.connections {
        let properties = to_parameter_map(entry.properties);
        if graph.connection_exists(&entry.upstream, &entry.downstream, &entry.name) {
            let mut merged = graph
                .connection(&entry.upstream, &entry.downstream, &entry.name)?
                .clone();
            merged.merge_from(&properties)?;
            graph.set_connection(&entry.upstream, &entry.downstream, &entry.name, merged);
        } else if !graph.set_connection(&entry.upstream, &entry.downstream, &entry.name, properties)
        {
            return Err(BlueprintError::InvalidConfiguration {
                reason: format!(
                    "connection {} in {} references a missing component",
                    connection_label(&entry.upstream, &entry.downstream, &entry.name),
                    path.display()
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_normalize_to_strings() {
        let doc: BlueprintDoc = serde_json::from_str(
            r#"{
                "Component": [
                    {
                        "Name": "Metric",
                        "NameOfClass": "SsdMetric",
                        "Dimensionality": 2,
                        "StepSize": 0.25,
                        "Smoothing": true,
                        "Schedule": [8, 4, 2]
                    }
                ]
            }"#,
        )
        .unwrap();
        let entry = doc.components.into_iter().next().unwrap();
        let map = to_parameter_map(entry.properties);
        assert_eq!(map.single("NameOfClass"), Some("SsdMetric"));
        assert_eq!(map.single("Dimensionality"), Some("2"));
        assert_eq!(map.single("StepSize"), Some("0.25"));
        assert_eq!(map.single("Smoothing"), Some("true"));
        assert_eq!(
            map.get("Schedule"),
            Some(&["8".to_string(), "4".to_string(), "2".to_string()][..])
        );
    }

    #[test]
    fn nested_values_are_rejected() {
        let result: Result<BlueprintDoc, _> = serde_json::from_str(
            r#"{"Component": [{"Name": "A", "Bad": {"nested": 1}}]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn connection_defaults_to_unnamed() {
        let doc: BlueprintDoc = serde_yaml::from_str(
            "Connection:\n  - Out: Metric\n    In: Optimizer\n",
        )
        .unwrap();
        assert_eq!(doc.connections[0].name, "");
        assert_eq!(doc.connections[0].upstream, "Metric");
    }
}
