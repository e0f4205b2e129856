//! Template assembly
//!
//! Turns a [`StackConfig`] and a set of validated parameters into a
//! [`Template`]: parameter declarations, the tier mapping, the three
//! resources and the exported outputs. Resource properties stay symbolic
//! (`Ref`, `Fn::Sub`, ...) so the template is valid for any stack name;
//! concrete values are produced later by [`crate::resolve`].

mod database;
mod network;

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::StackConfig;
use crate::params::{names, ParameterSchema, ValidatedParameters};
use crate::template::{Export, Output, ParameterDecl, Template, Value};
use crate::SynthError;

/// Logical ids used in the generated template
pub mod ids {
    pub const SUBNET_GROUP: &str = "SubnetGroup";
    pub const SECURITY_GROUP: &str = "SecurityGroup";
    pub const DB_INSTANCE: &str = "DBInstance";

    pub const INSTANCE_SIZE_MAP: &str = "InstSize";
    pub const INSTANCE_SIZE_KEY: &str = "instsize";

    pub const OUTPUT_VPC_ID: &str = "VpcId";
    pub const OUTPUT_SECURITY_GROUP_ID: &str = "SecurityGroupId";
    pub const OUTPUT_DATABASE_NAME: &str = "DatabaseName";
    pub const OUTPUT_ENDPOINT_ADDRESS: &str = "EndpointAddress";
}

/// Parameters shown together in the console, in display order
const PARAMETER_GROUPS: &[(&str, &[&str])] = &[
    (
        "Database",
        &[
            names::DB_INSTANCE_IDENTIFIER,
            names::DB_INSTANCE_CLASS,
            names::ALLOCATED_STORAGE,
            names::DB_NAME,
            names::MASTER_USERNAME,
            names::MASTER_USER_PASSWORD,
            names::MULTI_AZ,
        ],
    ),
    (
        "Tags",
        &[
            names::TAG_FUNCTION,
            names::TAG_COST_CENTRE,
            names::TAG_ENVIRONMENT,
            names::TAG_OWNER,
            names::TAG_MANAGED_BY,
        ],
    ),
];

/// Assemble the template for a stack.
///
/// `params` must come from validating against the schema of the same
/// `config`; their values become the declared parameter defaults.
pub fn build_template(
    config: &StackConfig,
    params: &ValidatedParameters,
) -> Result<Template, SynthError> {
    config.validate()?;
    let schema = ParameterSchema::for_stack(config)?;
    let mut template = Template::new(config.template.description.clone());

    for spec in schema.iter() {
        let default = if spec.no_echo {
            None
        } else {
            params.get(&spec.name).map(str::to_string)
        };
        template.add_parameter(
            spec.name.clone(),
            ParameterDecl {
                kind: "String".to_string(),
                description: spec.description.clone(),
                default,
                allowed_values: spec.allowed_values.clone(),
                allowed_pattern: spec.allowed_pattern.as_ref().map(|p| p.as_str().to_string()),
                constraint_description: spec.constraint_description.clone(),
                no_echo: spec.no_echo,
            },
        )?;
    }

    template
        .metadata
        .insert("AWS::CloudFormation::Interface".to_string(), interface());

    let classes: BTreeMap<String, String> = config
        .sizing
        .classes
        .iter()
        .map(|c| (c.tier.clone(), c.class.clone()))
        .collect();
    template.mappings.insert(
        ids::INSTANCE_SIZE_MAP.to_string(),
        BTreeMap::from([(ids::INSTANCE_SIZE_KEY.to_string(), classes)]),
    );

    template.add_resource(ids::SUBNET_GROUP, network::subnet_group(&config.network)?)?;
    template.add_resource(
        ids::SECURITY_GROUP,
        network::security_group(&config.network, &config.ingress)?,
    )?;
    template.add_resource(ids::DB_INSTANCE, database::db_instance(config))?;

    add_outputs(&mut template, config)?;

    info!(
        resources = template.resources.len(),
        outputs = template.outputs.len(),
        "template assembled"
    );
    Ok(template)
}

fn interface() -> Value {
    let groups = PARAMETER_GROUPS
        .iter()
        .map(|(label, parameters)| {
            Value::object([
                ("Label", Value::object([("default", Value::from(*label))])),
                ("Parameters", Value::list_of_strings(parameters.iter().copied())),
            ])
        })
        .collect();
    Value::object([("ParameterGroups", Value::List(groups))])
}

fn add_outputs(template: &mut Template, config: &StackConfig) -> Result<(), SynthError> {
    let outputs = [
        (
            ids::OUTPUT_VPC_ID,
            "VPC ID",
            Value::import(config.network.vpc_export.clone()),
            "PostgresVpcID-${AWS::StackName}",
        ),
        (
            ids::OUTPUT_SECURITY_GROUP_ID,
            "Security Group ID",
            Value::get_att(ids::SECURITY_GROUP, "GroupId"),
            "PostgresSGId-${AWS::StackName}",
        ),
        (
            ids::OUTPUT_DATABASE_NAME,
            "Database name",
            Value::reference(names::DB_NAME),
            "Postgres-RDS-${AWS::StackName}",
        ),
        (
            ids::OUTPUT_ENDPOINT_ADDRESS,
            "postgres-rds-instance-endpoint-address",
            Value::get_att(ids::DB_INSTANCE, "Endpoint.Address"),
            "postgres-rds-instance-endpoint-address-${AWS::StackName}",
        ),
    ];

    for (id, description, value, export) in outputs {
        debug!(output = id, export, "declaring output");
        template.add_output(
            id,
            Output {
                description: description.to_string(),
                value,
                export: Some(Export {
                    name: Value::sub(export)?,
                }),
            },
        )?;
    }
    Ok(())
}
