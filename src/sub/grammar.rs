//! Parser for `Fn::Sub` strings using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::SubError;
use crate::sub::ast::{Segment, SubString, Variable};
use crate::sub::lexer::Token;

/// Parse a `Fn::Sub` string into literal and variable segments
pub fn parse(input: &str) -> Result<SubString, Vec<SubError>> {
    let len = input.len();

    let token_iter = crate::sub::lexer::lex(input).map(|(tok, span)| (tok, span.into()));

    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    sub_parser()
        .parse(token_stream)
        .into_result()
        .map(|segments| SubString {
            segments: merge_literals(segments),
        })
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn sub_parser<'a, I>() -> impl Parser<'a, I, Vec<Segment>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let variable = just(Token::VarOpen)
        .ignore_then(select! { Token::Name(name) => name })
        .then_ignore(just(Token::Close))
        .map_with(|name, e| Segment::Variable(Variable::new(name, span_range(&e.span()))));

    // `${!text}` renders as the literal `${text}`
    let escaped = just(Token::EscapeOpen)
        .ignore_then(
            select! {
                Token::Name(s) => s,
                Token::Text(s) => s,
                Token::Dollar => "$".to_string(),
            }
            .repeated()
            .collect::<Vec<_>>(),
        )
        .then_ignore(just(Token::Close))
        .map(|parts| Segment::Literal(format!("${{{}}}", parts.concat())));

    let literal = select! {
        Token::Name(s) => s,
        Token::Text(s) => s,
        Token::Dollar => "$".to_string(),
        Token::Close => "}".to_string(),
    }
    .map(Segment::Literal);

    choice((escaped, variable, literal))
        .repeated()
        .collect::<Vec<_>>()
}

/// Join runs of adjacent literal segments
fn merge_literals(segments: Vec<Segment>) -> Vec<Segment> {
    let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
    for segment in segments {
        match (merged.last_mut(), segment) {
            (Some(Segment::Literal(prev)), Segment::Literal(text)) => prev.push_str(&text),
            (_, segment) => merged.push(segment),
        }
    }
    merged
}
