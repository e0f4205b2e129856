//! Error types for parameter intake and `Fn::Sub` parsing

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// A supplied parameter value that fails the parameter schema
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("parameter '{name}' is required but was not supplied")]
    Missing { name: String },

    #[error("parameter '{name}' is not declared by this template")]
    Unknown { name: String, span: Option<Span> },

    #[error("parameter '{name}' must be one of [{}]{}", .allowed.join(", "), describe_value(.value))]
    NotAllowed {
        name: String,
        /// `None` when the parameter is `NoEcho`
        value: Option<String>,
        allowed: Vec<String>,
        span: Option<Span>,
    },

    #[error("parameter '{name}' does not match pattern {pattern}{}", .constraint.as_deref().map(|c| format!(" ({c})")).unwrap_or_default())]
    PatternMismatch {
        name: String,
        pattern: String,
        constraint: Option<String>,
        span: Option<Span>,
    },

    #[error("parameter '{name}' has unsupported value type {found}; expected a string, integer or boolean")]
    UnsupportedType {
        name: String,
        found: String,
        span: Option<Span>,
    },
}

fn describe_value(value: &Option<String>) -> String {
    match value {
        Some(v) => format!(", got '{v}'"),
        None => String::new(),
    }
}

impl ParameterError {
    /// Name of the offending parameter
    pub fn parameter(&self) -> &str {
        match self {
            Self::Missing { name }
            | Self::Unknown { name, .. }
            | Self::NotAllowed { name, .. }
            | Self::PatternMismatch { name, .. }
            | Self::UnsupportedType { name, .. } => name,
        }
    }

    /// Location of the offending value in the parameters file, if it came from one
    pub fn span(&self) -> Option<&Span> {
        match self {
            Self::Missing { .. } => None,
            Self::Unknown { span, .. }
            | Self::NotAllowed { span, .. }
            | Self::PatternMismatch { span, .. }
            | Self::UnsupportedType { span, .. } => span.as_ref(),
        }
    }

    /// Format the error with source context using ariadne.
    ///
    /// Errors without a span (command-line overrides, missing parameters)
    /// fall back to the plain message.
    pub fn format(&self, source: &str, filename: &str) -> String {
        let Some(span) = self.span() else {
            return format!("Error: {self}");
        };
        render_report(source, filename, span, &self.to_string(), self.parameter())
    }
}

/// Errors raised while parsing a `Fn::Sub` string
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubError {
    #[error("Fn::Sub syntax error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },
}

fn render_report(source: &str, filename: &str, span: &Span, message: &str, label: &str) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail
    let _ = Report::build(ReportKind::Error, filename, span.start)
        .with_message(message)
        .with_label(
            Label::new((filename, span.clone()))
                .with_message(label)
                .with_color(Color::Red),
        )
        .finish()
        .write((filename, Source::from(source)), &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

impl<'a> From<chumsky::error::Rich<'a, crate::sub::lexer::Token>> for SubError {
    fn from(err: chumsky::error::Rich<'a, crate::sub::lexer::Token>) -> Self {
        use chumsky::error::{RichPattern, RichReason};

        let message = match err.reason() {
            RichReason::ExpectedFound { found, .. } => match found {
                Some(tok) => format!("Unexpected {}", format_token(tok)),
                None => "Unexpected end of string".to_string(),
            },
            RichReason::Custom(msg) => msg.to_string(),
            #[allow(unreachable_patterns)]
            _ => "invalid substitution".to_string(),
        };

        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                RichPattern::Token(tok) => Some(format_token(tok)),
                RichPattern::Label(label) => Some(label.to_string()),
                RichPattern::EndOfInput => Some("end of string".to_string()),
                _ => None,
            })
            .collect();

        SubError::Syntax {
            span: err.span().into_range(),
            message,
            expected,
        }
    }
}

fn format_token(tok: &crate::sub::lexer::Token) -> String {
    use crate::sub::lexer::Token;
    match tok {
        Token::Name(s) => format!("variable name '{}'", s),
        Token::Text(s) => format!("text \"{}\"", s),
        Token::VarOpen => "'${'".to_string(),
        Token::EscapeOpen => "'${!'".to_string(),
        Token::Dollar => "'$'".to_string(),
        Token::Close => "'}'".to_string(),
    }
}
