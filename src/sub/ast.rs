//! Syntax tree for `Fn::Sub` strings

use std::fmt;

use super::lexer::Span;

/// One piece of a substitution string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text emitted verbatim (escapes already unfolded)
    Literal(String),
    /// A `${...}` reference
    Variable(Variable),
}

/// A variable reference inside `${...}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub span: Span,
}

impl Variable {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }

    /// Split `Resource.Attribute` into its parts.
    ///
    /// Pseudo parameters (`AWS::Region`) and plain parameters have no attribute.
    pub fn target(&self) -> (&str, Option<&str>) {
        match self.name.split_once('.') {
            Some((resource, attribute)) => (resource, Some(attribute)),
            None => (self.name.as_str(), None),
        }
    }

    pub fn is_pseudo(&self) -> bool {
        self.name.starts_with("AWS::")
    }
}

/// A parsed substitution string
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubString {
    pub segments: Vec<Segment>,
}

impl SubString {
    /// Iterate over the variables referenced by this string
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Variable(v) => Some(v),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute every variable with the text returned by `lookup`.
    ///
    /// Variables for which `lookup` returns `None` are written back as
    /// `${name}`; the second tuple element reports whether that happened.
    pub fn substitute<F>(&self, mut lookup: F) -> (String, bool)
    where
        F: FnMut(&Variable) -> Option<String>,
    {
        let mut out = String::new();
        let mut complete = true;
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Variable(var) => match lookup(var) {
                    Some(value) => out.push_str(&value),
                    None => {
                        complete = false;
                        out.push_str("${");
                        out.push_str(&var.name);
                        out.push('}');
                    }
                },
            }
        }
        (out, complete)
    }
}

impl fmt::Display for SubString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                // Re-escape so the output parses back to the same segments
                Segment::Literal(text) => write!(f, "{}", text.replace("${", "${!"))?,
                Segment::Variable(var) => write!(f, "${{{}}}", var.name)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_target() {
        let attr = Variable::new("DBInstance.Endpoint.Address", 0..0);
        assert_eq!(attr.target(), ("DBInstance", Some("Endpoint.Address")));

        let pseudo = Variable::new("AWS::StackName", 0..0);
        assert_eq!(pseudo.target(), ("AWS::StackName", None));
        assert!(pseudo.is_pseudo());
    }

    #[test]
    fn test_substitute_partial() {
        let sub = SubString {
            segments: vec![
                Segment::Literal("a-".to_string()),
                Segment::Variable(Variable::new("X", 2..6)),
                Segment::Literal("-".to_string()),
                Segment::Variable(Variable::new("Y", 7..11)),
            ],
        };
        let (text, complete) = sub.substitute(|v| (v.name == "X").then(|| "x".to_string()));
        assert_eq!(text, "a-x-${Y}");
        assert!(!complete);
    }
}
