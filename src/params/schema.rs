//! Parameter declarations and their constraints

use regex::Regex;
use tracing::warn;

use crate::config::{ConfigError, StackConfig};
use crate::params::names;

/// A CloudFormation `AllowedPattern`: the whole value must match
#[derive(Debug, Clone)]
pub struct AllowedPattern {
    source: String,
    regex: Regex,
}

impl AllowedPattern {
    pub fn new(source: impl Into<String>) -> Result<Self, regex::Error> {
        let source = source.into();
        let regex = Regex::new(&format!("^(?:{})$", source))?;
        Ok(Self { source, regex })
    }

    /// The pattern as written in the template
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

/// One declared template parameter
#[derive(Debug, Clone)]
pub struct ParameterSpec {
    pub name: String,
    pub description: String,
    pub default: Option<String>,
    pub allowed_values: Vec<String>,
    pub allowed_pattern: Option<AllowedPattern>,
    pub constraint_description: Option<String>,
    /// Value is a secret: never echoed, logged or shown
    pub no_echo: bool,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            default: None,
            allowed_values: Vec::new(),
            allowed_pattern: None,
            constraint_description: None,
            no_echo: false,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Attach an allowed pattern, compiled up front so a bad pattern fails early
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self, ConfigError> {
        let compiled = AllowedPattern::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            name: self.name.clone(),
            source,
        })?;
        self.allowed_pattern = Some(compiled);
        Ok(self)
    }

    pub fn with_constraint_description(mut self, text: impl Into<String>) -> Self {
        self.constraint_description = Some(text.into());
        self
    }

    pub fn no_echo(mut self) -> Self {
        self.no_echo = true;
        self
    }

    /// Required parameters have no default and must be supplied
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// The ordered set of parameters the template declares
#[derive(Debug, Clone)]
pub struct ParameterSchema {
    specs: Vec<ParameterSpec>,
}

impl ParameterSchema {
    /// Build the parameter declarations for a stack configuration
    pub fn for_stack(config: &StackConfig) -> Result<Self, ConfigError> {
        let engine = &config.engine;
        let tags = &config.tags;

        let tier_help = config
            .sizing
            .classes
            .iter()
            .map(|c| match &c.description {
                Some(d) => format!("{} = {}", c.tier, d),
                None => format!("{} = {}", c.tier, c.class),
            })
            .collect::<Vec<_>>()
            .join(" | ");

        for code in &tags.cost_centres {
            if !code.contains('-') {
                warn!(cost_centre = %code, "cost centre has no '-' label; the whole value becomes the tag");
            }
        }

        let specs = vec![
            ParameterSpec::new(names::DB_INSTANCE_CLASS, format!("{}.", tier_help))
                .with_default(config.sizing.default_tier.clone())
                .with_allowed_values(config.sizing.classes.iter().map(|c| c.tier.clone())),
            ParameterSpec::new(names::ALLOCATED_STORAGE, "Please enter the storage size.")
                .with_default(engine.default_storage.to_string())
                .with_allowed_values(engine.storage_options.iter().map(u32::to_string)),
            ParameterSpec::new(
                names::MASTER_USERNAME,
                format!(
                    "Please enter the username. Default username is {}.",
                    engine.default_master_username
                ),
            )
            .with_default(engine.default_master_username.clone()),
            ParameterSpec::new(names::MASTER_USER_PASSWORD, "Please enter the password.").no_echo(),
            ParameterSpec::new(
                names::DB_INSTANCE_IDENTIFIER,
                "Please enter the name for the DB instance. DB instance name can include numbers, \
                 lowercase letters, uppercase letters, hyphens (-), and forward slash (/).",
            )
            .with_pattern("^[0-9a-zA-Z-/]*$")?
            .with_constraint_description(
                "DB instance identifier can include numbers, lowercase letters, uppercase letters, \
                 hyphens (-), and forward slash (/).",
            ),
            ParameterSpec::new(names::DB_NAME, "Please enter the DB name.")
                .with_default(engine.default_db_name.clone()),
            ParameterSpec::new(
                names::MULTI_AZ,
                "Please enable or disable multiple Availability Zone deployment.",
            )
            .with_default("False")
            .with_allowed_values(["True", "False"]),
            ParameterSpec::new(
                names::TAG_FUNCTION,
                "What function will this Database instance have?",
            )
            .with_default(tags.default_function.clone()),
            ParameterSpec::new(names::TAG_COST_CENTRE, "Please select cost code")
                .with_default(tags.default_cost_centre.clone())
                .with_allowed_values(tags.cost_centres.iter().cloned()),
            ParameterSpec::new(names::TAG_ENVIRONMENT, "Please select environment type")
                .with_default(tags.default_environment.clone())
                .with_allowed_values(tags.environments.iter().cloned()),
            ParameterSpec::new(
                names::TAG_OWNER,
                "Please specify email of the team that will own the Database instance",
            )
            .with_default(tags.default_contact.clone())
            .with_pattern(&tags.owner_pattern)?,
            ParameterSpec::new(
                names::TAG_MANAGED_BY,
                "Please specify email of the team that will manage the Database instance",
            )
            .with_default(tags.default_contact.clone())
            .with_pattern(&tags.managed_by_pattern)?,
        ];

        Ok(Self { specs })
    }

    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> ParameterSchema {
        ParameterSchema::for_stack(&StackConfig::default()).expect("Default schema should build")
    }

    #[test]
    fn test_schema_declares_all_parameters() {
        let schema = schema();
        assert_eq!(schema.len(), 12);
        let required: Vec<_> = schema
            .iter()
            .filter(|s| s.is_required())
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(
            required,
            vec![names::MASTER_USER_PASSWORD, names::DB_INSTANCE_IDENTIFIER]
        );
    }

    #[test]
    fn test_tier_values_follow_mapping() {
        let schema = schema();
        let spec = schema.get(names::DB_INSTANCE_CLASS).unwrap();
        assert_eq!(spec.allowed_values, vec!["Small", "Medium", "Large"]);
        assert_eq!(spec.default.as_deref(), Some("Small"));
    }

    #[test]
    fn test_password_is_no_echo() {
        let schema = schema();
        assert!(schema.get(names::MASTER_USER_PASSWORD).unwrap().no_echo);
        assert!(!schema.get(names::MASTER_USERNAME).unwrap().no_echo);
    }

    #[test]
    fn test_pattern_is_full_match() {
        let pattern = AllowedPattern::new("[a-z]+").unwrap();
        assert!(pattern.is_match("abc"));
        assert!(!pattern.is_match("abc1"));
        assert_eq!(pattern.as_str(), "[a-z]+");
    }

    #[test]
    fn test_identifier_pattern() {
        let schema = schema();
        let pattern = schema
            .get(names::DB_INSTANCE_IDENTIFIER)
            .unwrap()
            .allowed_pattern
            .as_ref()
            .unwrap();
        assert!(pattern.is_match("pg-test-01"));
        assert!(pattern.is_match("team/pg-01"));
        assert!(!pattern.is_match("pg_test"));
        assert!(!pattern.is_match("pg test"));
    }

    #[test]
    fn test_contact_patterns() {
        let schema = schema();
        let owner = schema.get(names::TAG_OWNER).unwrap();
        let owner = owner.allowed_pattern.as_ref().unwrap();
        assert!(owner.is_match("data.team@superretailgroup.com"));
        assert!(!owner.is_match("data.team@example.com"));

        let managed = schema.get(names::TAG_MANAGED_BY).unwrap();
        let managed = managed.allowed_pattern.as_ref().unwrap();
        assert!(managed.is_match("srgsrq@blazeclan.com"));
        assert!(managed.is_match("ops@voicefoundry.com.au"));
        assert!(!managed.is_match("someone@blazeclan.com"));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let result = ParameterSpec::new("x", "x").with_pattern("[unclosed");
        assert!(matches!(result, Err(ConfigError::InvalidPattern { .. })));
    }
}
