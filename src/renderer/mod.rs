//! Output rendering for templates, resolved stacks and the parameter schema

mod schema;

pub use schema::render_schema;

use serde::Serialize;
use thiserror::Error;

/// Serialization format of emitted documents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

/// Errors that can occur while serializing output
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Serialize a document (template or resolved view) in `format`
pub fn emit<T: Serialize>(document: &T, format: OutputFormat) -> Result<String, EmitError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(document)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(document)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{Template, Value};

    #[test]
    fn test_yaml_keeps_long_form_intrinsics() {
        let yaml = emit(&Value::import("VPC-ID"), OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("Fn::ImportValue"));
        assert!(yaml.trim_end().ends_with("VPC-ID"));
    }

    #[test]
    fn test_json_template_header() {
        let json = emit(&Template::new("test"), OutputFormat::Json).unwrap();
        assert!(json.starts_with("{\n  \"AWSTemplateFormatVersion\": \"2010-09-09\""));
    }
}
