//! Selection criteria and the template-property check.

use crate::error::{RfError, RfResult};
use crate::params::ParameterMap;

/// One selection requirement: a property key plus the value list a
/// candidate must match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criterion {
    pub key: String,
    pub values: Vec<String>,
}

impl Criterion {
    pub fn new<K, V>(key: K, values: V) -> Self
    where
        K: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        Self {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Single-valued criterion.
    pub fn single<K, V>(key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            key: key.into(),
            values: vec![value.into()],
        }
    }

    /// The value when this criterion is single-valued.
    pub fn single_value(&self) -> Option<&str> {
        match self.values.as_slice() {
            [value] => Some(value.as_str()),
            _ => None,
        }
    }

    /// One criterion per entry of a property map, in key order.
    pub fn from_map(map: &ParameterMap) -> Vec<Criterion> {
        map.iter()
            .map(|(key, values)| Criterion::new(key, values.iter().cloned()))
            .collect()
    }
}

/// Outcome of checking one criterion against a candidate's template
/// properties.
///
/// `Unknown` means the criterion key is not a template property at all;
/// the caller must consult the candidate's runtime criteria before
/// concluding a mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriterionOutcome {
    Satisfied,
    Failed,
    Unknown,
}

/// Check a criterion against fixed template properties.
///
/// Template identity keys (class name, dimensionality, pixel type) are
/// single-valued; checking a multi-valued criterion against one is a usage
/// error, not a mismatch.
pub fn check_template_properties(
    template: &ParameterMap,
    criterion: &Criterion,
) -> RfResult<CriterionOutcome> {
    let Some(expected) = template.get(&criterion.key) else {
        return Ok(CriterionOutcome::Unknown);
    };
    let Some(value) = criterion.single_value() else {
        return Err(RfError::InvalidArg {
            what: format!(
                "criterion \"{}\" has {} values; template properties are single-valued",
                criterion.key,
                criterion.values.len()
            ),
        });
    };
    match expected {
        [only] if only.as_str() == value => Ok(CriterionOutcome::Satisfied),
        _ => Ok(CriterionOutcome::Failed),
    }
}
