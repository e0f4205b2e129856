//! Lexer for `Fn::Sub` strings using logos

use logos::Logos;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    // Openers (order matters - longer patterns first)
    #[token("${!")]
    EscapeOpen,
    #[token("${")]
    VarOpen,
    #[token("$")]
    Dollar,

    #[token("}")]
    Close,

    // A variable name: `Param`, `AWS::StackName` or `Resource.Attribute`.
    // Outside of `${...}` the grammar treats it as plain text.
    #[regex(r"[A-Za-z0-9_]+(::[A-Za-z0-9_]+)*(\.[A-Za-z0-9_]+)*", |lex| lex.slice().to_string(), priority = 3)]
    Name(String),

    #[regex(r"[^$}]+", |lex| lex.slice().to_string(), priority = 1)]
    Text(String),
}

/// Lex a `Fn::Sub` string into tokens with spans
pub fn lex(input: &str) -> impl Iterator<Item = (Token, Span)> + '_ {
    Token::lexer(input)
        .spanned()
        .filter_map(|(tok, span)| tok.ok().map(|t| (t, span)))
}
