//! The resolved stack view

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

/// A property value after evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Str(String),
    Int(i64),
    Bool(bool),
    List(Vec<Resolved>),
    Object(BTreeMap<String, Resolved>),
    /// A `NoEcho` parameter value
    Masked,
    /// Known only at deploy time; carries a readable description
    Deferred(String),
}

impl Resolved {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Resolved::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integers, or strings holding one (parameters are strings)
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Resolved::Int(i) => Some(*i),
            Resolved::Str(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Booleans, or the `True`/`False` strings flag parameters hold
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Resolved::Bool(b) => Some(*b),
            Resolved::Str(s) if s.eq_ignore_ascii_case("true") => Some(true),
            Resolved::Str(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Resolved]> {
        match self {
            Resolved::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Resolved::Deferred(_))
    }
}

impl Serialize for Resolved {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Resolved::Str(s) => serializer.serialize_str(s),
            Resolved::Int(i) => serializer.serialize_i64(*i),
            Resolved::Bool(b) => serializer.serialize_bool(*b),
            Resolved::List(items) => items.serialize(serializer),
            Resolved::Object(map) => map.serialize(serializer),
            Resolved::Masked => serializer.serialize_str("****"),
            Resolved::Deferred(what) => serializer.serialize_str(&format!("<deferred: {what}>")),
        }
    }
}

/// A resource with evaluated properties
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResolvedResource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    pub properties: BTreeMap<String, Resolved>,
}

impl ResolvedResource {
    pub fn property(&self, name: &str) -> Option<&Resolved> {
        self.properties.get(name)
    }

    /// Value of the tag with `key` in the `Tags` property
    pub fn tag(&self, key: &str) -> Option<&Resolved> {
        self.property("Tags")?
            .as_list()?
            .iter()
            .filter_map(|tag| match tag {
                Resolved::Object(map) => Some(map),
                _ => None,
            })
            .find(|map| map.get("Key").and_then(Resolved::as_str) == Some(key))
            .and_then(|map| map.get("Value"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResolvedOutput {
    pub description: String,
    pub value: Resolved,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_name: Option<Resolved>,
}

/// Every resource and output of a template, evaluated
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResolvedStack {
    pub resources: BTreeMap<String, ResolvedResource>,
    pub outputs: BTreeMap<String, ResolvedOutput>,
}

impl ResolvedStack {
    pub fn resource(&self, id: &str) -> Option<&ResolvedResource> {
        self.resources.get(id)
    }

    pub fn output(&self, id: &str) -> Option<&ResolvedOutput> {
        self.outputs.get(id)
    }

    /// Export name of an output, if it has one
    pub fn export_name(&self, output: &str) -> Option<&Resolved> {
        self.outputs.get(output)?.export_name.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_strings_read_as_bool() {
        assert_eq!(Resolved::Str("False".to_string()).as_bool(), Some(false));
        assert_eq!(Resolved::Str("True".to_string()).as_bool(), Some(true));
        assert_eq!(Resolved::Str("yes".to_string()).as_bool(), None);
        assert_eq!(Resolved::Str("40".to_string()).as_int(), Some(40));
    }

    #[test]
    fn test_masked_and_deferred_serialize() {
        let value = Resolved::List(vec![
            Resolved::Masked,
            Resolved::Deferred("Fn::ImportValue(VPC-ID)".to_string()),
        ]);
        insta::assert_snapshot!(
            serde_json::to_string(&value).unwrap(),
            @r#"["****","<deferred: Fn::ImportValue(VPC-ID)>"]"#
        );
    }

    #[test]
    fn test_tag_lookup() {
        let tag = |k: &str, v: &str| {
            Resolved::Object(BTreeMap::from([
                ("Key".to_string(), Resolved::Str(k.to_string())),
                ("Value".to_string(), Resolved::Str(v.to_string())),
            ]))
        };
        let resource = ResolvedResource {
            resource_type: "AWS::RDS::DBInstance".to_string(),
            properties: BTreeMap::from([(
                "Tags".to_string(),
                Resolved::List(vec![tag("srg:owner", "a@b"), tag("srg:cost-centre", "G130")]),
            )]),
        };
        assert_eq!(
            resource.tag("srg:cost-centre"),
            Some(&Resolved::Str("G130".to_string()))
        );
        assert_eq!(resource.tag("srg:missing"), None);
    }
}
