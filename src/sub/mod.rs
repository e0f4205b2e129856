//! The `Fn::Sub` substitution-string language
//!
//! Export names, group names and descriptions are declared as `Fn::Sub`
//! strings such as `PostgresSGId-${AWS::StackName}` so that every stack
//! instantiated from the template gets its own names. This module parses
//! those strings so references can be checked and substituted.

pub mod ast;
mod grammar;
pub mod lexer;

pub use ast::{Segment, SubString, Variable};
pub use grammar::parse;
