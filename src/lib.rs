//! rds-template - CloudFormation synthesis for a managed PostgreSQL instance
//!
//! This library validates deployment parameters, assembles a template with
//! a DB subnet group, a security group and a PostgreSQL DB instance, checks
//! its references and evaluates it into a resolved stack view.
//!
//! # Example
//!
//! ```rust
//! use rds_template::{synthesize, ParameterValues, ResolveContext, StackConfig, SynthConfig};
//!
//! let values = ParameterValues::new()
//!     .with("master_user_password", "secret1")
//!     .with("db_instance_identifier", "pg-test-01");
//! let config = SynthConfig::new()
//!     .with_stack(StackConfig::default().with_cidrs(["10.0.0.0/16"]))
//!     .with_context(ResolveContext::new().with_stack_name("orders"));
//!
//! let synthesis = synthesize(&values, &config).unwrap();
//! assert!(synthesis.template.resources.contains_key("DBInstance"));
//! ```

pub mod config;
pub mod error;
pub mod params;
pub mod renderer;
pub mod resolve;
pub mod stack;
pub mod sub;
pub mod template;

pub use config::{ConfigError, StackConfig};
pub use error::{ParameterError, SubError};
pub use params::{ParameterSchema, ParameterValues, ValidatedParameters};
pub use renderer::{emit, OutputFormat};
pub use resolve::{evaluate, ResolveContext, ResolveError, Resolved, ResolvedStack};
pub use stack::build_template;
pub use template::{Template, TemplateError};

use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during synthesis
#[derive(Debug, Error)]
pub enum SynthError {
    /// Supplied parameter values failed validation
    #[error("parameter errors: {}", join(.0))]
    Parameters(Vec<ParameterError>),

    /// Invalid stack configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Malformed `Fn::Sub` string
    #[error("substitution errors: {}", join(.0))]
    Sub(Vec<SubError>),

    /// Dangling or duplicate names in the assembled template
    #[error("template errors: {}", join(.0))]
    Template(Vec<TemplateError>),

    /// Evaluation of the template failed
    #[error("evaluation error: {0}")]
    Resolve(#[from] ResolveError),
}

impl From<Vec<ParameterError>> for SynthError {
    fn from(errors: Vec<ParameterError>) -> Self {
        SynthError::Parameters(errors)
    }
}

impl From<Vec<SubError>> for SynthError {
    fn from(errors: Vec<SubError>) -> Self {
        SynthError::Sub(errors)
    }
}

impl From<Vec<TemplateError>> for SynthError {
    fn from(errors: Vec<TemplateError>) -> Self {
        SynthError::Template(errors)
    }
}

impl From<TemplateError> for SynthError {
    fn from(error: TemplateError) -> Self {
        SynthError::Template(vec![error])
    }
}

fn join<E: std::fmt::Display>(errors: &[E]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Configuration for the complete synthesis pipeline
#[derive(Debug, Clone, Default)]
pub struct SynthConfig {
    /// Network, ingress, engine, sizing and tagging settings
    pub stack: StackConfig,
    /// Deployment facts used to evaluate the template
    pub context: ResolveContext,
}

impl SynthConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the stack configuration
    pub fn with_stack(mut self, stack: StackConfig) -> Self {
        self.stack = stack;
        self
    }

    /// Set the deployment context
    pub fn with_context(mut self, context: ResolveContext) -> Self {
        self.context = context;
        self
    }
}

/// Result of a successful synthesis
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub template: Template,
    pub parameters: ValidatedParameters,
    pub resolved: ResolvedStack,
}

/// Validate parameters, assemble the template and evaluate it.
///
/// Parameter errors abort before any resource is declared; all of them are
/// reported together.
pub fn synthesize(values: &ParameterValues, config: &SynthConfig) -> Result<Synthesis, SynthError> {
    config.stack.validate()?;
    let schema = ParameterSchema::for_stack(&config.stack)?;

    // Validate supplied values
    let parameters = schema.validate(values)?;
    debug!(parameters = schema.len(), "parameters validated");

    // Assemble and check
    let template = build_template(&config.stack, &parameters)?;
    template.check_references()?;

    // Evaluate against the deployment context
    let resolved = evaluate(&template, &parameters, &config.context)?;
    info!(
        stack = config.context.stack_name.as_deref().unwrap_or("<unnamed>"),
        "synthesis complete"
    );

    Ok(Synthesis {
        template,
        parameters,
        resolved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::names;

    fn config() -> SynthConfig {
        SynthConfig::new().with_stack(StackConfig::default().with_cidrs(["10.0.0.0/16"]))
    }

    fn required() -> ParameterValues {
        ParameterValues::new()
            .with(names::MASTER_USER_PASSWORD, "secret1")
            .with(names::DB_INSTANCE_IDENTIFIER, "pg-test-01")
    }

    #[test]
    fn test_synthesize_defaults() {
        let synthesis = synthesize(&required(), &config()).unwrap();
        let db = synthesis.resolved.resource("DBInstance").unwrap();
        assert_eq!(db.property("DBInstanceClass").and_then(Resolved::as_str), Some("db.t3.small"));
        assert_eq!(db.property("AllocatedStorage").and_then(Resolved::as_int), Some(30));
    }

    #[test]
    fn test_parameter_errors_abort() {
        let result = synthesize(&ParameterValues::new(), &config());
        assert!(matches!(result, Err(SynthError::Parameters(ref e)) if e.len() == 2));
    }

    #[test]
    fn test_missing_cidrs_is_config_error() {
        let result = synthesize(&required(), &SynthConfig::new());
        assert!(matches!(
            result,
            Err(SynthError::Config(ConfigError::EmptyIngress { field: "cidrs" }))
        ));
    }

    #[test]
    fn test_error_message_lists_every_problem() {
        let err = synthesize(&ParameterValues::new(), &config()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("master_user_password"));
        assert!(message.contains("db_instance_identifier"));
    }
}
