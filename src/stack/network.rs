//! DB subnet group and security group

use tracing::debug;

use crate::config::{IngressConfig, NetworkConfig};
use crate::template::{Resource, Value};
use crate::SynthError;

pub(super) fn subnet_group(network: &NetworkConfig) -> Result<Resource, SynthError> {
    let name = Value::sub("postgresdbsubnetgroup-${AWS::StackName}")?;
    let subnets = network
        .subnet_group_members()
        .iter()
        .map(|s| Value::import(s.export.clone()))
        .collect();

    Ok(Resource::new("AWS::RDS::DBSubnetGroup")
        .with_property("DBSubnetGroupName", name.clone())
        .with_property("DBSubnetGroupDescription", name)
        .with_property("SubnetIds", Value::List(subnets)))
}

pub(super) fn security_group(
    network: &NetworkConfig,
    ingress: &IngressConfig,
) -> Result<Resource, SynthError> {
    let name = Value::sub("Postgres-RDS_Sec_Group-${AWS::StackName}")?;
    let rules = ingress_rules(ingress);
    debug!(rules = rules.len(), "generated ingress rules");

    Ok(Resource::new("AWS::EC2::SecurityGroup")
        .with_property("GroupName", name.clone())
        .with_property("GroupDescription", name)
        .with_property("VpcId", Value::import(network.vpc_export.clone()))
        .with_property("SecurityGroupIngress", Value::List(rules))
        .with_property("SecurityGroupEgress", Value::List(vec![allow_all_egress()])))
}

/// One rule per (port, CIDR), ports in the outer loop
fn ingress_rules(ingress: &IngressConfig) -> Vec<Value> {
    ingress
        .ports
        .iter()
        .flat_map(|&port| {
            ingress.cidrs.iter().map(move |cidr| {
                Value::object([
                    ("IpProtocol", Value::from("tcp")),
                    ("CidrIp", Value::string(cidr.clone())),
                    ("FromPort", Value::Integer(i64::from(port))),
                    ("ToPort", Value::Integer(i64::from(port))),
                    ("Description", Value::string(format!("from {}:{}", cidr, port))),
                ])
            })
        })
        .collect()
}

fn allow_all_egress() -> Value {
    Value::object([
        ("IpProtocol", Value::from("-1")),
        ("CidrIp", Value::from("0.0.0.0/0")),
        ("Description", Value::from("Allow all outbound traffic by default")),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StackConfig;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_rule_per_port_and_cidr() {
        let ingress = IngressConfig {
            ports: vec![5432, 6432],
            cidrs: vec!["10.0.0.0/16".to_string(), "192.168.1.0/24".to_string()],
        };
        let rules = ingress_rules(&ingress);
        assert_eq!(rules.len(), 4);

        let descriptions: Vec<_> = rules
            .iter()
            .map(|r| match r {
                Value::Object(map) => map["Description"].clone(),
                other => panic!("rule should be an object, got {other:?}"),
            })
            .collect();
        assert_eq!(
            descriptions,
            vec![
                Value::from("from 10.0.0.0/16:5432"),
                Value::from("from 192.168.1.0/24:5432"),
                Value::from("from 10.0.0.0/16:6432"),
                Value::from("from 192.168.1.0/24:6432"),
            ]
        );
    }

    #[test]
    fn test_rule_shape() {
        let ingress = IngressConfig {
            ports: vec![5432],
            cidrs: vec!["10.0.0.0/16".to_string()],
        };
        let rules = ingress_rules(&ingress);
        assert_eq!(
            serde_json::to_value(&rules[0]).unwrap(),
            serde_json::json!({
                "IpProtocol": "tcp",
                "CidrIp": "10.0.0.0/16",
                "FromPort": 5432,
                "ToPort": 5432,
                "Description": "from 10.0.0.0/16:5432",
            })
        );
    }

    #[test]
    fn test_subnet_group_uses_first_members() {
        let config = StackConfig::default();
        let group = subnet_group(&config.network).unwrap();
        assert_eq!(
            group.property("SubnetIds"),
            Some(&Value::List(vec![
                Value::import("ApplicationSubnetAzA"),
                Value::import("ApplicationSubnetAzB"),
            ]))
        );

        let wide = config.with_subnet_group_size(3);
        let group = subnet_group(&wide.network).unwrap();
        let Some(Value::List(ids)) = group.property("SubnetIds") else {
            panic!("SubnetIds should be a list");
        };
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_security_group_imports_vpc() {
        let config = StackConfig::default().with_cidrs(["10.0.0.0/16"]);
        let group = security_group(&config.network, &config.ingress).unwrap();
        assert_eq!(group.property("VpcId"), Some(&Value::import("VPC-ID")));
        assert_eq!(group.resource_type, "AWS::EC2::SecurityGroup");
    }
}
