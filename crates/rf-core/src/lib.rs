//! rf-core: stable foundation for regflow.
//!
//! Contains:
//! - params (ParameterMap: string-keyed multi-valued property maps)
//! - criteria (Criterion + tri-state template-property check)
//! - error (shared error types)

pub mod criteria;
pub mod error;
pub mod params;

// Re-exports: nice ergonomics for downstream crates
pub use criteria::{Criterion, CriterionOutcome, check_template_properties};
pub use error::{RfError, RfResult};
pub use params::{MergeOutcome, ParameterMap};
