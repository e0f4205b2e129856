//! The DB instance and its tags

use crate::config::{StackConfig, TagPolicy};
use crate::params::names;
use crate::template::{DeletionPolicy, Resource, Value};

use super::ids;

pub(super) fn db_instance(config: &StackConfig) -> Resource {
    let engine = &config.engine;

    Resource::new("AWS::RDS::DBInstance")
        .with_property(
            "DBInstanceClass",
            Value::FindInMap {
                map: ids::INSTANCE_SIZE_MAP.to_string(),
                top: Box::new(ids::INSTANCE_SIZE_KEY.into()),
                second: Box::new(Value::reference(names::DB_INSTANCE_CLASS)),
            },
        )
        .with_property("Engine", Value::string(engine.name.clone()))
        .with_property("EngineVersion", Value::string(engine.version.clone()))
        .with_property("AllocatedStorage", Value::reference(names::ALLOCATED_STORAGE))
        .with_property("StorageEncrypted", true)
        .with_property("StorageType", Value::string(engine.storage_type.clone()))
        .with_property("MasterUsername", Value::reference(names::MASTER_USERNAME))
        .with_property(
            "MasterUserPassword",
            Value::reference(names::MASTER_USER_PASSWORD),
        )
        .with_property(
            "BackupRetentionPeriod",
            i64::from(engine.backup_retention_days),
        )
        .with_property(
            "DBInstanceIdentifier",
            Value::reference(names::DB_INSTANCE_IDENTIFIER),
        )
        .with_property("DBName", Value::reference(names::DB_NAME))
        .with_property("DeletionProtection", false)
        .with_property("DeleteAutomatedBackups", true)
        .with_property("MultiAZ", Value::reference(names::MULTI_AZ))
        .with_property("DBSubnetGroupName", Value::reference(ids::SUBNET_GROUP))
        .with_property(
            "VPCSecurityGroups",
            Value::List(vec![Value::get_att(ids::SECURITY_GROUP, "GroupId")]),
        )
        .with_property(
            "EnableCloudwatchLogsExports",
            Value::list_of_strings(engine.log_exports.iter().cloned()),
        )
        .with_property("Tags", tags(&config.tags))
        .with_removal_policy(DeletionPolicy::Delete)
}

/// Tag set; the cost centre keeps only the code before the first `-`
fn tags(policy: &TagPolicy) -> Value {
    let cost_code = Value::Select {
        index: 0,
        list: Box::new(Value::Split {
            delimiter: "-".to_string(),
            source: Box::new(Value::reference(names::TAG_COST_CENTRE)),
        }),
    };

    Value::tags(vec![
        (policy.key("function"), Value::reference(names::TAG_FUNCTION)),
        (policy.key("cost-centre"), cost_code),
        (policy.key("environment"), Value::reference(names::TAG_ENVIRONMENT)),
        (policy.key("owner"), Value::reference(names::TAG_OWNER)),
        (policy.key("managed-by"), Value::reference(names::TAG_MANAGED_BY)),
    ])
}
