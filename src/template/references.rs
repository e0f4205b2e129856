//! Reference checking for assembled templates

use thiserror::Error;

use super::model::{Template, Value};

/// Pseudo parameters every stack provides
pub const PSEUDO_PARAMETERS: &[&str] = &[
    "AWS::AccountId",
    "AWS::NotificationARNs",
    "AWS::NoValue",
    "AWS::Partition",
    "AWS::Region",
    "AWS::StackId",
    "AWS::StackName",
    "AWS::URLSuffix",
];

/// Errors that can occur while assembling or checking a template
#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    /// A `Ref`, `Fn::GetAtt` or `${...}` that names nothing in the template
    #[error("'{location}' references undefined name '{name}'")]
    UndefinedReference { location: String, name: String },

    /// `Fn::FindInMap` against a mapping that is not declared
    #[error("'{location}' looks up undeclared mapping '{map}'")]
    UndefinedMapping { location: String, map: String },

    /// Two declarations with the same logical id
    #[error("duplicate logical id: {name}")]
    Duplicate { name: String },
}

impl Template {
    /// Check that every reference in resources and outputs resolves
    pub fn check_references(&self) -> Result<(), Vec<TemplateError>> {
        let mut errors = Vec::new();

        let locations = self
            .resources
            .iter()
            .flat_map(|(id, r)| {
                r.properties
                    .iter()
                    .map(move |(prop, v)| (format!("{}.{}", id, prop), v))
            })
            .chain(self.outputs.iter().flat_map(|(id, o)| {
                let export = o
                    .export
                    .as_ref()
                    .map(|e| (format!("Outputs.{}.Export", id), &e.name));
                std::iter::once((format!("Outputs.{}", id), &o.value)).chain(export)
            }));

        for (location, value) in locations {
            value.walk(&mut |v| self.check_value(&location, v, &mut errors));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn check_value(&self, location: &str, value: &Value, errors: &mut Vec<TemplateError>) {
        let undefined = |name: &str| TemplateError::UndefinedReference {
            location: location.to_string(),
            name: name.to_string(),
        };
        match value {
            Value::Ref(name) if !self.is_referenceable(name) => errors.push(undefined(name)),
            Value::GetAtt { resource, .. } if !self.resources.contains_key(resource) => {
                errors.push(undefined(resource))
            }
            Value::Sub(sub) => {
                for var in sub.variables() {
                    let known = match var.target() {
                        (resource, Some(_)) => self.resources.contains_key(resource),
                        (name, None) => self.is_referenceable(name),
                    };
                    if !known {
                        errors.push(undefined(&var.name));
                    }
                }
            }
            Value::FindInMap { map, .. } if !self.mappings.contains_key(map) => {
                errors.push(TemplateError::UndefinedMapping {
                    location: location.to_string(),
                    map: map.clone(),
                })
            }
            _ => {}
        }
    }

    /// Names a `Ref` may point at
    fn is_referenceable(&self, name: &str) -> bool {
        PSEUDO_PARAMETERS.contains(&name)
            || self.parameters.contains_key(name)
            || self.resources.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::model::{Export, Output, Resource};

    fn template_with(value: Value) -> Template {
        let mut template = Template::new("test");
        template.resources.insert(
            "Group".to_string(),
            Resource::new("AWS::EC2::SecurityGroup").with_property("GroupName", value),
        );
        template
    }

    #[test]
    fn test_pseudo_parameter_sub_is_valid() {
        let template = template_with(Value::sub("sg-${AWS::StackName}").unwrap());
        assert!(template.check_references().is_ok());
    }

    #[test]
    fn test_undefined_ref() {
        let template = template_with(Value::reference("missing"));
        let errors = template.check_references().unwrap_err();
        assert_eq!(
            errors,
            vec![TemplateError::UndefinedReference {
                location: "Group.GroupName".to_string(),
                name: "missing".to_string(),
            }]
        );
    }

    #[test]
    fn test_sub_attribute_needs_resource() {
        let template = template_with(Value::sub("${Nope.Arn}-${Group.GroupId}").unwrap());
        let errors = template.check_references().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("Nope.Arn"));
    }

    #[test]
    fn test_output_export_checked() {
        let mut template = template_with("fixed".into());
        template.outputs.insert(
            "GroupId".to_string(),
            Output {
                description: "Security Group ID".to_string(),
                value: Value::get_att("Group", "GroupId"),
                export: Some(Export {
                    name: Value::sub("${Unknown}-sg").unwrap(),
                }),
            },
        );
        let errors = template.check_references().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("Outputs.GroupId.Export"));
    }

    #[test]
    fn test_undeclared_mapping() {
        let template = template_with(Value::FindInMap {
            map: "InstSize".to_string(),
            top: Box::new("instsize".into()),
            second: Box::new("Small".into()),
        });
        let errors = template.check_references().unwrap_err();
        assert!(matches!(errors[0], TemplateError::UndefinedMapping { .. }));
    }
}
