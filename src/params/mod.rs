//! Parameter intake: declarations, supplied values and validation

mod schema;
mod values;

pub use schema::{AllowedPattern, ParameterSchema, ParameterSpec};
pub use values::{parse_override, ParameterValues, Supplied, SuppliedValue, ValuesError};

use std::fmt;

use tracing::debug;

use crate::error::ParameterError;

/// Logical ids of the template parameters
pub mod names {
    pub const DB_INSTANCE_CLASS: &str = "db_instance_class";
    pub const ALLOCATED_STORAGE: &str = "allocated_storage";
    pub const MASTER_USERNAME: &str = "master_username";
    pub const MASTER_USER_PASSWORD: &str = "master_user_password";
    pub const DB_INSTANCE_IDENTIFIER: &str = "db_instance_identifier";
    pub const DB_NAME: &str = "db_name";
    pub const MULTI_AZ: &str = "multi_az";
    pub const TAG_FUNCTION: &str = "TagFunction";
    pub const TAG_COST_CENTRE: &str = "TagCostCentre";
    pub const TAG_ENVIRONMENT: &str = "TagEnvironment";
    pub const TAG_OWNER: &str = "TagOwner";
    pub const TAG_MANAGED_BY: &str = "TagManagedBy";
}

/// Where an effective value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Supplied,
    Default,
}

/// A parameter's value after validation
#[derive(Clone, PartialEq)]
pub struct EffectiveParameter {
    pub name: String,
    pub value: String,
    pub source: ValueSource,
    pub no_echo: bool,
}

impl fmt::Debug for EffectiveParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = if self.no_echo { "****" } else { self.value.as_str() };
        f.debug_struct("EffectiveParameter")
            .field("name", &self.name)
            .field("value", &value)
            .field("source", &self.source)
            .finish()
    }
}

/// Every declared parameter with a value that satisfies its constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedParameters {
    entries: Vec<EffectiveParameter>,
}

impl ValidatedParameters {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entry(name).map(|p| p.value.as_str())
    }

    pub fn entry(&self, name: &str) -> Option<&EffectiveParameter> {
        self.entries.iter().find(|p| p.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EffectiveParameter> {
        self.entries.iter()
    }
}

impl ParameterSchema {
    /// Check supplied values against every declaration.
    ///
    /// All violations are collected; on success every declared parameter
    /// has an effective value. An empty value for a required parameter
    /// counts as missing.
    pub fn validate(
        &self,
        values: &ParameterValues,
    ) -> Result<ValidatedParameters, Vec<ParameterError>> {
        let mut errors = Vec::new();
        let mut entries = Vec::with_capacity(self.len());

        for (name, supplied) in values.iter() {
            if self.get(name).is_none() {
                errors.push(ParameterError::Unknown {
                    name: name.to_string(),
                    span: supplied.span.clone(),
                });
            }
        }

        for spec in self.iter() {
            match check_one(spec, values.get(&spec.name)) {
                Ok(entry) => entries.push(entry),
                Err(err) => errors.push(err),
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        for entry in &entries {
            debug!(parameter = %entry.name, source = ?entry.source, "parameter accepted");
        }
        Ok(ValidatedParameters { entries })
    }
}

fn check_one(
    spec: &ParameterSpec,
    supplied: Option<&SuppliedValue>,
) -> Result<EffectiveParameter, ParameterError> {
    let span = supplied.and_then(|s| s.span.clone());

    let (value, source) = match supplied.map(|s| &s.value) {
        Some(Supplied::Unsupported(found)) => {
            return Err(ParameterError::UnsupportedType {
                name: spec.name.clone(),
                found: found.to_string(),
                span,
            });
        }
        Some(Supplied::Text(text)) if !(text.is_empty() && spec.is_required()) => {
            (text.clone(), ValueSource::Supplied)
        }
        _ => match &spec.default {
            Some(default) => (default.clone(), ValueSource::Default),
            None => {
                return Err(ParameterError::Missing {
                    name: spec.name.clone(),
                })
            }
        },
    };

    if !spec.allowed_values.is_empty() && !spec.allowed_values.contains(&value) {
        return Err(ParameterError::NotAllowed {
            name: spec.name.clone(),
            value: (!spec.no_echo).then(|| value.clone()),
            allowed: spec.allowed_values.clone(),
            span,
        });
    }

    if let Some(pattern) = &spec.allowed_pattern {
        if !pattern.is_match(&value) {
            return Err(ParameterError::PatternMismatch {
                name: spec.name.clone(),
                pattern: pattern.as_str().to_string(),
                constraint: spec.constraint_description.clone(),
                span,
            });
        }
    }

    Ok(EffectiveParameter {
        name: spec.name.clone(),
        value,
        source,
        no_echo: spec.no_echo,
    })
}
