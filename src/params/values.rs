//! Supplied parameter values
//!
//! Values come from a TOML document (scalars only) and from `KEY=VALUE`
//! overrides. Values read from a file remember their byte span so that
//! validation errors can point at them.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::error::Span;

/// Errors that can occur when reading a parameters file or override
#[derive(Error, Debug)]
pub enum ValuesError {
    #[error("Failed to parse parameters TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("invalid override '{0}': expected KEY=VALUE")]
    InvalidOverride(String),
}

/// A value as supplied by the caller
#[derive(Debug, Clone, PartialEq)]
pub enum Supplied {
    Text(String),
    /// A TOML value that has no string form (array, table, datetime)
    Unsupported(&'static str),
}

#[derive(Clone, PartialEq)]
pub struct SuppliedValue {
    pub value: Supplied,
    pub span: Option<Span>,
}

/// Values supplied for template parameters, keyed by parameter name
#[derive(Clone, Default)]
pub struct ParameterValues {
    entries: BTreeMap<String, SuppliedValue>,
}

impl ParameterValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read values from a TOML document of `name = value` pairs.
    ///
    /// Booleans become `True`/`False` to match the allowed values of flag
    /// parameters; integers and floats use their decimal form.
    pub fn from_toml_str(content: &str) -> Result<Self, ValuesError> {
        let parsed: BTreeMap<String, toml::Spanned<toml::Value>> = toml::from_str(content)?;
        let entries = parsed
            .into_iter()
            .map(|(name, spanned)| {
                let span = spanned.span();
                let value = match spanned.into_inner() {
                    toml::Value::String(s) => Supplied::Text(s),
                    toml::Value::Integer(i) => Supplied::Text(i.to_string()),
                    toml::Value::Float(f) => Supplied::Text(f.to_string()),
                    toml::Value::Boolean(b) => {
                        Supplied::Text(if b { "True" } else { "False" }.to_string())
                    }
                    toml::Value::Datetime(_) => Supplied::Unsupported("datetime"),
                    toml::Value::Array(_) => Supplied::Unsupported("array"),
                    toml::Value::Table(_) => Supplied::Unsupported("table"),
                };
                (
                    name,
                    SuppliedValue {
                        value,
                        span: Some(span),
                    },
                )
            })
            .collect();
        Ok(Self { entries })
    }

    /// Set a value, replacing any earlier one
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(
            name.into(),
            SuppliedValue {
                value: Supplied::Text(value.into()),
                span: None,
            },
        );
    }

    /// Builder form of [`ParameterValues::set`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Apply `KEY=VALUE` overrides on top of the current values
    pub fn apply_overrides<I, S>(&mut self, overrides: I) -> Result<(), ValuesError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for item in overrides {
            let (name, value) = parse_override(item.as_ref())?;
            self.set(name, value);
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&SuppliedValue> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SuppliedValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Split `KEY=VALUE` at the first `=`
pub fn parse_override(item: &str) -> Result<(String, String), ValuesError> {
    match item.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(ValuesError::InvalidOverride(item.to_string())),
    }
}

// Supplied values may hold secrets, so Debug only lists the names
impl fmt::Debug for ParameterValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

impl fmt::Debug for SuppliedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuppliedValue")
            .field("span", &self.span)
            .finish_non_exhaustive()
    }
}
