//! CloudFormation template document model
//!
//! A [`Template`] is plain data: parameters, mappings, resources and
//! outputs whose property values are [`Value`]s. Intrinsic functions are
//! kept as structured variants and serialized in their long form
//! (`{"Ref": ...}`, `{"Fn::Sub": ...}`) so the document is valid JSON and
//! YAML without custom tags.

mod model;
mod references;

pub use model::{DeletionPolicy, Export, Mappings, Output, ParameterDecl, Resource, Template, Value};
pub use references::{TemplateError, PSEUDO_PARAMETERS};
