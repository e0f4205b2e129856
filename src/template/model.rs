//! Template document types and their CloudFormation JSON shape

use std::collections::BTreeMap;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use super::references::TemplateError;
use crate::error::SubError;
use crate::sub::{self, SubString};

/// A property value: a literal or an intrinsic function
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Bool(bool),
    List(Vec<Value>),
    Object(BTreeMap<String, Value>),
    /// `Ref` to a parameter, pseudo parameter or resource
    Ref(String),
    /// `Fn::Sub` with the string already parsed
    Sub(SubString),
    /// `Fn::ImportValue` of another stack's export
    ImportValue(Box<Value>),
    /// `Fn::FindInMap [map, top, second]`
    FindInMap {
        map: String,
        top: Box<Value>,
        second: Box<Value>,
    },
    /// `Fn::Select [index, list]`
    Select { index: usize, list: Box<Value> },
    /// `Fn::Split [delimiter, source]`
    Split {
        delimiter: String,
        source: Box<Value>,
    },
    /// `Fn::GetAtt [resource, attribute]`
    GetAtt { resource: String, attribute: String },
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Value::Ref(name.into())
    }

    /// Parse `text` as an `Fn::Sub` string
    pub fn sub(text: &str) -> Result<Self, Vec<SubError>> {
        sub::parse(text).map(Value::Sub)
    }

    pub fn import(export_name: impl Into<String>) -> Self {
        Value::ImportValue(Box::new(Value::String(export_name.into())))
    }

    pub fn get_att(resource: impl Into<String>, attribute: impl Into<String>) -> Self {
        Value::GetAtt {
            resource: resource.into(),
            attribute: attribute.into(),
        }
    }

    pub fn list_of_strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::List(items.into_iter().map(|s| Value::String(s.into())).collect())
    }

    /// An object from `(key, value)` pairs
    pub fn object<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Object(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// A CloudFormation tag list: `[{Key, Value}, ...]`
    pub fn tags(tags: Vec<(String, Value)>) -> Self {
        Value::List(
            tags.into_iter()
                .map(|(key, value)| {
                    Value::Object(BTreeMap::from([
                        ("Key".to_string(), Value::String(key)),
                        ("Value".to_string(), value),
                    ]))
                })
                .collect(),
        )
    }

    /// Visit this value and every nested value, depth first
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Value)) {
        visit(self);
        match self {
            Value::List(items) => items.iter().for_each(|v| v.walk(visit)),
            Value::Object(map) => map.values().for_each(|v| v.walk(visit)),
            Value::ImportValue(inner) => inner.walk(visit),
            Value::FindInMap { top, second, .. } => {
                top.walk(visit);
                second.walk(visit);
            }
            Value::Select { list, .. } => list.walk(visit),
            Value::Split { source, .. } => source.walk(visit),
            Value::String(_)
            | Value::Integer(_)
            | Value::Bool(_)
            | Value::Ref(_)
            | Value::Sub(_)
            | Value::GetAtt { .. } => {}
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

fn single_key<S: Serializer, V: Serialize + ?Sized>(
    serializer: S,
    key: &str,
    value: &V,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry(key, value)?;
    map.end()
}

/// `[first, second]` with differently typed elements
struct Pair<'a, A: ?Sized, B: ?Sized>(&'a A, &'a B);

impl<A: Serialize + ?Sized, B: Serialize + ?Sized> Serialize for Pair<'_, A, B> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element(self.0)?;
        seq.serialize_element(self.1)?;
        seq.end()
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::List(items) => items.serialize(serializer),
            Value::Object(map) => map.serialize(serializer),
            Value::Ref(name) => single_key(serializer, "Ref", name),
            Value::Sub(sub) => single_key(serializer, "Fn::Sub", &sub.to_string()),
            Value::ImportValue(inner) => single_key(serializer, "Fn::ImportValue", inner.as_ref()),
            Value::FindInMap { map, top, second } => {
                struct Args<'a>(&'a str, &'a Value, &'a Value);
                impl Serialize for Args<'_> {
                    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                        let mut seq = serializer.serialize_seq(Some(3))?;
                        seq.serialize_element(self.0)?;
                        seq.serialize_element(self.1)?;
                        seq.serialize_element(self.2)?;
                        seq.end()
                    }
                }
                single_key(serializer, "Fn::FindInMap", &Args(map, top, second))
            }
            Value::Select { index, list } => {
                single_key(serializer, "Fn::Select", &Pair(index, list.as_ref()))
            }
            Value::Split { delimiter, source } => single_key(
                serializer,
                "Fn::Split",
                &Pair(delimiter.as_str(), source.as_ref()),
            ),
            Value::GetAtt {
                resource,
                attribute,
            } => single_key(
                serializer,
                "Fn::GetAtt",
                &Pair(resource.as_str(), attribute.as_str()),
            ),
        }
    }
}

/// A declared template parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParameterDecl {
    #[serde(rename = "Type")]
    pub kind: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint_description: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub no_echo: bool,
}

/// What happens to a resource's data when the stack deletes or replaces it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeletionPolicy {
    Delete,
}

/// A declared resource
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    pub properties: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<DeletionPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<DeletionPolicy>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties: BTreeMap::new(),
            deletion_policy: None,
            update_replace_policy: None,
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Apply the same policy on deletion and on replacement
    pub fn with_removal_policy(mut self, policy: DeletionPolicy) -> Self {
        self.deletion_policy = Some(policy);
        self.update_replace_policy = Some(policy);
        self
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

/// `Export: {Name: ...}` of an output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Export {
    pub name: Value,
}

/// A declared stack output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    pub description: String,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<Export>,
}

/// `Mappings`: map name → top-level key → second-level key → value
pub type Mappings = BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>;

/// A complete template document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    pub description: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, ParameterDecl>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub mappings: Mappings,
    pub resources: BTreeMap<String, Resource>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Output>,
}

impl Template {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            format_version: "2010-09-09".to_string(),
            description: description.into(),
            metadata: BTreeMap::new(),
            parameters: BTreeMap::new(),
            mappings: BTreeMap::new(),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// Declare a parameter under a new logical id
    pub fn add_parameter(
        &mut self,
        name: impl Into<String>,
        decl: ParameterDecl,
    ) -> Result<(), TemplateError> {
        insert_unique(&mut self.parameters, name.into(), decl)
    }

    /// Declare a resource under a new logical id
    pub fn add_resource(
        &mut self,
        id: impl Into<String>,
        resource: Resource,
    ) -> Result<(), TemplateError> {
        insert_unique(&mut self.resources, id.into(), resource)
    }

    /// Declare an output under a new logical id
    pub fn add_output(&mut self, id: impl Into<String>, output: Output) -> Result<(), TemplateError> {
        insert_unique(&mut self.outputs, id.into(), output)
    }

    /// Look up `Fn::FindInMap [map, top, second]` in the declared mappings
    pub fn find_in_map(&self, map: &str, top: &str, second: &str) -> Option<&str> {
        self.mappings
            .get(map)
            .and_then(|m| m.get(top))
            .and_then(|m| m.get(second))
            .map(String::as_str)
    }

    /// Every export name value, keyed by output id
    pub fn export_names(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.outputs
            .iter()
            .filter_map(|(id, o)| o.export.as_ref().map(|e| (id.as_str(), &e.name)))
    }
}

fn insert_unique<T>(
    map: &mut BTreeMap<String, T>,
    name: String,
    item: T,
) -> Result<(), TemplateError> {
    if map.contains_key(&name) {
        return Err(TemplateError::Duplicate { name });
    }
    map.insert(name, item);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_intrinsics_serialize_long_form() {
        let value = Value::List(vec![
            Value::reference("db_name"),
            Value::import("VPC-ID"),
            Value::get_att("DBInstance", "Endpoint.Address"),
            Value::FindInMap {
                map: "InstSize".to_string(),
                top: Box::new("instsize".into()),
                second: Box::new(Value::reference("db_instance_class")),
            },
            Value::Select {
                index: 0,
                list: Box::new(Value::Split {
                    delimiter: "-".to_string(),
                    source: Box::new(Value::reference("TagCostCentre")),
                }),
            },
        ]);
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!([
                {"Ref": "db_name"},
                {"Fn::ImportValue": "VPC-ID"},
                {"Fn::GetAtt": ["DBInstance", "Endpoint.Address"]},
                {"Fn::FindInMap": ["InstSize", "instsize", {"Ref": "db_instance_class"}]},
                {"Fn::Select": [0, {"Fn::Split": ["-", {"Ref": "TagCostCentre"}]}]},
            ])
        );
    }

    #[test]
    fn test_sub_serializes_source_text() {
        let value = Value::sub("PostgresSGId-${AWS::StackName}").unwrap();
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!({"Fn::Sub": "PostgresSGId-${AWS::StackName}"})
        );
    }

    #[test]
    fn test_tags_shape() {
        let tags = Value::tags(vec![("srg:owner".to_string(), "a@b".into())]);
        assert_eq!(
            serde_json::to_value(&tags).unwrap(),
            json!([{"Key": "srg:owner", "Value": "a@b"}])
        );
    }

    #[test]
    fn test_parameter_decl_omits_empty_fields() {
        let decl = ParameterDecl {
            kind: "String".to_string(),
            description: "Please enter the password.".to_string(),
            default: None,
            allowed_values: Vec::new(),
            allowed_pattern: None,
            constraint_description: None,
            no_echo: true,
        };
        assert_eq!(
            serde_json::to_value(&decl).unwrap(),
            json!({"Type": "String", "Description": "Please enter the password.", "NoEcho": true})
        );
    }

    #[test]
    fn test_resource_removal_policy() {
        let resource = Resource::new("AWS::RDS::DBInstance")
            .with_property("StorageEncrypted", true)
            .with_removal_policy(DeletionPolicy::Delete);
        assert_eq!(
            serde_json::to_value(&resource).unwrap(),
            json!({
                "Type": "AWS::RDS::DBInstance",
                "Properties": {"StorageEncrypted": true},
                "DeletionPolicy": "Delete",
                "UpdateReplacePolicy": "Delete",
            })
        );
    }

    #[test]
    fn test_duplicate_resource_rejected() {
        let mut template = Template::new("test");
        template
            .add_resource("DBInstance", Resource::new("AWS::RDS::DBInstance"))
            .unwrap();
        let err = template
            .add_resource("DBInstance", Resource::new("AWS::RDS::DBInstance"))
            .unwrap_err();
        assert_eq!(
            err,
            TemplateError::Duplicate {
                name: "DBInstance".to_string()
            }
        );
    }

    #[test]
    fn test_walk_visits_nested_refs() {
        let value = Value::Select {
            index: 0,
            list: Box::new(Value::Split {
                delimiter: "-".to_string(),
                source: Box::new(Value::reference("TagCostCentre")),
            }),
        };
        let mut refs = Vec::new();
        value.walk(&mut |v| {
            if let Value::Ref(name) = v {
                refs.push(name.as_str());
            }
        });
        assert_eq!(refs, vec!["TagCostCentre"]);
    }
}
