//! Template evaluation
//!
//! Evaluates the intrinsics of a [`Template`] against validated parameter
//! values and a [`ResolveContext`], giving the concrete stack the
//! orchestration platform would create. Values only the platform can know
//! (imports without a known value, resource attributes, pseudo parameters
//! missing from the context) become [`Resolved::Deferred`]. `NoEcho`
//! parameters evaluate to [`Resolved::Masked`].

mod error;
mod view;

pub use error::ResolveError;
pub use view::{Resolved, ResolvedOutput, ResolvedResource, ResolvedStack};

use std::collections::BTreeMap;

use tracing::debug;

use crate::params::ValidatedParameters;
use crate::sub::SubString;
use crate::template::{Template, Value, PSEUDO_PARAMETERS};

/// Deployment facts known at synthesis time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveContext {
    pub stack_name: Option<String>,
    pub region: Option<String>,
    pub account_id: Option<String>,
    pub partition: Option<String>,
    /// Values of other stacks' exports, by export name
    pub imports: BTreeMap<String, String>,
}

impl ResolveContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stack_name(mut self, name: impl Into<String>) -> Self {
        self.stack_name = Some(name.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_account_id(mut self, account: impl Into<String>) -> Self {
        self.account_id = Some(account.into());
        self
    }

    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = Some(partition.into());
        self
    }

    /// Record the value of another stack's export
    pub fn with_import(mut self, export: impl Into<String>, value: impl Into<String>) -> Self {
        self.imports.insert(export.into(), value.into());
        self
    }

    fn pseudo(&self, name: &str) -> Option<&str> {
        match name {
            "AWS::StackName" => self.stack_name.as_deref(),
            "AWS::Region" => self.region.as_deref(),
            "AWS::AccountId" => self.account_id.as_deref(),
            "AWS::Partition" => self.partition.as_deref(),
            _ => None,
        }
    }
}

/// Evaluate every resource property and output of `template`
pub fn evaluate(
    template: &Template,
    params: &ValidatedParameters,
    context: &ResolveContext,
) -> Result<ResolvedStack, ResolveError> {
    let evaluator = Evaluator {
        template,
        params,
        context,
    };

    let mut resources = BTreeMap::new();
    for (id, resource) in &template.resources {
        let properties = resource
            .properties
            .iter()
            .map(|(name, value)| Ok((name.clone(), evaluator.eval(value)?)))
            .collect::<Result<BTreeMap<_, _>, ResolveError>>()?;
        debug!(resource = %id, properties = properties.len(), "resource evaluated");
        resources.insert(
            id.clone(),
            ResolvedResource {
                resource_type: resource.resource_type.clone(),
                properties,
            },
        );
    }

    let mut outputs = BTreeMap::new();
    for (id, output) in &template.outputs {
        let export_name = output
            .export
            .as_ref()
            .map(|e| evaluator.eval(&e.name))
            .transpose()?;
        outputs.insert(
            id.clone(),
            ResolvedOutput {
                description: output.description.clone(),
                value: evaluator.eval(&output.value)?,
                export_name,
            },
        );
    }

    Ok(ResolvedStack { resources, outputs })
}

struct Evaluator<'a> {
    template: &'a Template,
    params: &'a ValidatedParameters,
    context: &'a ResolveContext,
}

impl Evaluator<'_> {
    fn eval(&self, value: &Value) -> Result<Resolved, ResolveError> {
        match value {
            Value::String(s) => Ok(Resolved::Str(s.clone())),
            Value::Integer(i) => Ok(Resolved::Int(*i)),
            Value::Bool(b) => Ok(Resolved::Bool(*b)),
            Value::List(items) => items
                .iter()
                .map(|v| self.eval(v))
                .collect::<Result<Vec<_>, _>>()
                .map(Resolved::List),
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| Ok((k.clone(), self.eval(v)?)))
                .collect::<Result<BTreeMap<_, _>, ResolveError>>()
                .map(Resolved::Object),
            Value::Ref(name) => self.reference(name),
            Value::Sub(sub) => self.substitute(sub),
            Value::ImportValue(inner) => Ok(match self.eval(inner)? {
                Resolved::Str(export) => match self.context.imports.get(&export) {
                    Some(v) => Resolved::Str(v.clone()),
                    None => Resolved::Deferred(format!("Fn::ImportValue({export})")),
                },
                Resolved::Deferred(what) => Resolved::Deferred(format!("Fn::ImportValue({what})")),
                _ => {
                    return Err(ResolveError::TypeMismatch {
                        function: "Fn::ImportValue",
                        expected: "an export name",
                    })
                }
            }),
            Value::FindInMap { map, top, second } => self.find_in_map(map, top, second),
            Value::Select { index, list } => match self.eval(list)? {
                Resolved::List(items) => {
                    let len = items.len();
                    items
                        .into_iter()
                        .nth(*index)
                        .ok_or(ResolveError::SelectOutOfRange { index: *index, len })
                }
                Resolved::Deferred(what) => Ok(Resolved::Deferred(format!("Fn::Select({index}, {what})"))),
                _ => Err(ResolveError::TypeMismatch {
                    function: "Fn::Select",
                    expected: "a list",
                }),
            },
            Value::Split { delimiter, source } => match self.eval(source)? {
                Resolved::Str(s) => Ok(Resolved::List(
                    s.split(delimiter.as_str())
                        .map(|part| Resolved::Str(part.to_string()))
                        .collect(),
                )),
                Resolved::Deferred(what) => Ok(Resolved::Deferred(format!("Fn::Split({delimiter}, {what})"))),
                _ => Err(ResolveError::TypeMismatch {
                    function: "Fn::Split",
                    expected: "a string",
                }),
            },
            Value::GetAtt {
                resource,
                attribute,
            } => {
                if self.template.resources.contains_key(resource) {
                    Ok(Resolved::Deferred(format!("{resource}.{attribute}")))
                } else {
                    Err(ResolveError::unknown(resource.clone()))
                }
            }
        }
    }

    fn reference(&self, name: &str) -> Result<Resolved, ResolveError> {
        if let Some(param) = self.params.entry(name) {
            return Ok(if param.no_echo {
                Resolved::Masked
            } else {
                Resolved::Str(param.value.clone())
            });
        }
        if PSEUDO_PARAMETERS.contains(&name) {
            return Ok(match self.context.pseudo(name) {
                Some(v) => Resolved::Str(v.to_string()),
                None => Resolved::Deferred(name.to_string()),
            });
        }
        if self.template.resources.contains_key(name) {
            return Ok(Resolved::Deferred(format!("Ref({name})")));
        }
        Err(ResolveError::unknown(name))
    }

    fn substitute(&self, sub: &SubString) -> Result<Resolved, ResolveError> {
        for var in sub.variables() {
            let known = match var.target() {
                (resource, Some(_)) => self.template.resources.contains_key(resource),
                (name, None) => {
                    self.params.entry(name).is_some()
                        || PSEUDO_PARAMETERS.contains(&name)
                        || self.template.resources.contains_key(name)
                }
            };
            if !known {
                return Err(ResolveError::unknown(var.name.clone()));
            }
        }

        let (text, complete) = sub.substitute(|var| match var.target() {
            (_, Some(_)) => None,
            (name, None) => match self.params.entry(name) {
                Some(param) if param.no_echo => Some("****".to_string()),
                Some(param) => Some(param.value.clone()),
                None => self.context.pseudo(name).map(str::to_string),
            },
        });

        Ok(if complete {
            Resolved::Str(text)
        } else {
            Resolved::Deferred(text)
        })
    }

    fn find_in_map(&self, map: &str, top: &Value, second: &Value) -> Result<Resolved, ResolveError> {
        let top = self.eval(top)?;
        let second = self.eval(second)?;
        let (top, second) = match (&top, &second) {
            (Resolved::Str(t), Resolved::Str(s)) => (t, s),
            (Resolved::Deferred(_), _) | (_, Resolved::Deferred(_)) => {
                return Ok(Resolved::Deferred(format!("Fn::FindInMap({map})")));
            }
            _ => {
                return Err(ResolveError::TypeMismatch {
                    function: "Fn::FindInMap",
                    expected: "string keys",
                })
            }
        };

        let table = self
            .template
            .mappings
            .get(map)
            .ok_or_else(|| ResolveError::UnknownMapping {
                map: map.to_string(),
            })?;
        table
            .get(top)
            .and_then(|entries| entries.get(second))
            .map(|v| Resolved::Str(v.clone()))
            .ok_or_else(|| ResolveError::missing_key(map, top, second))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StackConfig;
    use crate::params::{names, ParameterSchema, ParameterValues};
    use crate::template::Resource;

    use pretty_assertions::assert_eq;

    fn params(values: ParameterValues) -> ValidatedParameters {
        let schema = ParameterSchema::for_stack(&StackConfig::default()).unwrap();
        schema
            .validate(
                &values
                    .with(names::MASTER_USER_PASSWORD, "secret1")
                    .with(names::DB_INSTANCE_IDENTIFIER, "pg-test-01"),
            )
            .expect("Should validate")
    }

    fn template() -> Template {
        let mut template = Template::new("test");
        template.mappings.insert(
            "InstSize".to_string(),
            BTreeMap::from([(
                "instsize".to_string(),
                BTreeMap::from([("Small".to_string(), "db.t3.small".to_string())]),
            )]),
        );
        template
            .add_resource("DBInstance", Resource::new("AWS::RDS::DBInstance"))
            .unwrap();
        template
    }

    fn eval(value: &Value, params: &ValidatedParameters, context: &ResolveContext) -> Result<Resolved, ResolveError> {
        let template = template();
        Evaluator {
            template: &template,
            params,
            context,
        }
        .eval(value)
    }

    #[test]
    fn test_cost_code_is_first_segment() {
        let params = params(ParameterValues::new().with(names::TAG_COST_CENTRE, "G130-Finance"));
        let value = Value::Select {
            index: 0,
            list: Box::new(Value::Split {
                delimiter: "-".to_string(),
                source: Box::new(Value::reference(names::TAG_COST_CENTRE)),
            }),
        };
        let resolved = eval(&value, &params, &ResolveContext::new()).unwrap();
        assert_eq!(resolved, Resolved::Str("G130".to_string()));
    }

    #[test]
    fn test_sub_with_and_without_stack_name() {
        let params = params(ParameterValues::new());
        let value = Value::sub("PostgresSGId-${AWS::StackName}").unwrap();

        let known = ResolveContext::new().with_stack_name("orders");
        assert_eq!(
            eval(&value, &params, &known).unwrap(),
            Resolved::Str("PostgresSGId-orders".to_string())
        );
        assert_eq!(
            eval(&value, &params, &ResolveContext::new()).unwrap(),
            Resolved::Deferred("PostgresSGId-${AWS::StackName}".to_string())
        );
    }

    #[test]
    fn test_secret_is_masked() {
        let params = params(ParameterValues::new());
        let context = ResolveContext::new();
        assert_eq!(
            eval(&Value::reference(names::MASTER_USER_PASSWORD), &params, &context).unwrap(),
            Resolved::Masked
        );
        let sub = Value::sub("pw=${master_user_password}").unwrap();
        assert_eq!(
            eval(&sub, &params, &context).unwrap(),
            Resolved::Str("pw=****".to_string())
        );
    }

    #[test]
    fn test_import_uses_known_exports() {
        let params = params(ParameterValues::new());
        let value = Value::import("VPC-ID");
        assert_eq!(
            eval(&value, &params, &ResolveContext::new()).unwrap(),
            Resolved::Deferred("Fn::ImportValue(VPC-ID)".to_string())
        );
        let context = ResolveContext::new().with_import("VPC-ID", "vpc-0abc");
        assert_eq!(
            eval(&value, &params, &context).unwrap(),
            Resolved::Str("vpc-0abc".to_string())
        );
    }

    #[test]
    fn test_find_in_map() {
        let params = params(ParameterValues::new());
        let context = ResolveContext::new();
        let lookup = |map: &str, second: &str| Value::FindInMap {
            map: map.to_string(),
            top: Box::new("instsize".into()),
            second: Box::new(second.into()),
        };
        assert_eq!(
            eval(&lookup("InstSize", "Small"), &params, &context).unwrap(),
            Resolved::Str("db.t3.small".to_string())
        );
        assert_eq!(
            eval(&lookup("InstSize", "Huge"), &params, &context).unwrap_err(),
            ResolveError::missing_key("InstSize", "instsize", "Huge")
        );
        assert!(matches!(
            eval(&lookup("Sizes", "Small"), &params, &context),
            Err(ResolveError::UnknownMapping { .. })
        ));
    }

    #[test]
    fn test_select_out_of_range() {
        let params = params(ParameterValues::new());
        let value = Value::Select {
            index: 2,
            list: Box::new(Value::list_of_strings(["a", "b"])),
        };
        assert_eq!(
            eval(&value, &params, &ResolveContext::new()).unwrap_err(),
            ResolveError::SelectOutOfRange { index: 2, len: 2 }
        );
    }

    #[test]
    fn test_attributes_are_deferred() {
        let params = params(ParameterValues::new());
        let context = ResolveContext::new();
        assert_eq!(
            eval(&Value::get_att("DBInstance", "Endpoint.Address"), &params, &context).unwrap(),
            Resolved::Deferred("DBInstance.Endpoint.Address".to_string())
        );
        assert_eq!(
            eval(&Value::reference("Missing"), &params, &context).unwrap_err(),
            ResolveError::unknown("Missing")
        );
    }
}
