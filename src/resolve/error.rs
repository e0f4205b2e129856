//! Error types for template evaluation

use thiserror::Error;

/// Errors that can occur while evaluating intrinsics
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResolveError {
    /// `Fn::FindInMap` against a mapping the template does not declare
    #[error("mapping '{map}' is not declared")]
    UnknownMapping { map: String },

    /// `Fn::FindInMap` keys with no entry
    #[error("mapping '{map}' has no entry for [{top}, {second}]")]
    MissingMappingKey {
        map: String,
        top: String,
        second: String,
    },

    /// A name that is neither a parameter, a pseudo parameter nor a resource
    #[error("unknown reference '{name}'")]
    UnknownReference { name: String },

    /// `Fn::Select` index past the end of the list
    #[error("Fn::Select index {index} out of range for list of {len}")]
    SelectOutOfRange { index: usize, len: usize },

    /// An intrinsic applied to a value of the wrong shape
    #[error("{function} expects {expected}")]
    TypeMismatch {
        function: &'static str,
        expected: &'static str,
    },
}

impl ResolveError {
    pub fn missing_key(map: &str, top: &str, second: &str) -> Self {
        Self::MissingMappingKey {
            map: map.to_string(),
            top: top.to_string(),
            second: second.to_string(),
        }
    }

    pub fn unknown(name: impl Into<String>) -> Self {
        Self::UnknownReference { name: name.into() }
    }
}
