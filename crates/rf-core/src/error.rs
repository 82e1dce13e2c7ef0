use thiserror::Error;

pub type RfResult<T> = Result<T, RfError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RfError {
    #[error("{entity} not found: {name}")]
    NotFound { entity: &'static str, name: String },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error("Conflicting values for property \"{key}\"")]
    MergeConflict { key: String },
}
