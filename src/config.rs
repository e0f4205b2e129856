//! Stack configuration
//!
//! Everything the template needs besides the per-deployment parameters:
//! network export names, ingress rules, engine settings, the tier mapping
//! and the tagging policy. A configuration file is merged over the embedded
//! default document, so it only needs to name what it changes.

use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;
use std::path::Path;

use ipnet::Ipv4Net;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading or checking a stack configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read stack config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse stack config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("ingress {field} list is empty; supply at least one real value")]
    EmptyIngress { field: &'static str },
    #[error("invalid ingress CIDR '{cidr}': {reason}")]
    InvalidCidr { cidr: String, reason: String },
    #[error("invalid ingress port 0")]
    InvalidPort,
    #[error("availability zone '{zone}' is listed more than once")]
    DuplicateZone { zone: String },
    #[error("subnet group size {size} must be between 1 and {available} (the number of subnets)")]
    SubnetGroupSize { size: usize, available: usize },
    #[error("duplicate {what} '{value}'")]
    Duplicate { what: &'static str, value: String },
    #[error("{what} list is empty")]
    Empty { what: &'static str },
    #[error("default {what} '{value}' is not one of the allowed values")]
    DefaultNotAllowed { what: &'static str, value: String },
    #[error("invalid allowed pattern for parameter '{name}': {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}

/// Complete stack configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackConfig {
    pub template: TemplateSection,
    pub engine: EngineConfig,
    pub network: NetworkConfig,
    pub ingress: IngressConfig,
    pub sizing: SizingConfig,
    pub tags: TagPolicy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateSection {
    pub description: String,
}

/// Database engine and fixed instance policy
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    pub name: String,
    pub version: String,
    /// Default port of the engine; the ingress port when `ingress.ports` is not given
    pub port: u16,
    pub log_exports: Vec<String>,
    pub storage_type: String,
    pub backup_retention_days: u32,
    /// Allowed allocated storage sizes in GiB
    pub storage_options: Vec<u32>,
    pub default_storage: u32,
    pub default_master_username: String,
    pub default_db_name: String,
}

/// Imported network the instance is placed in
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    /// Export name of the VPC id
    pub vpc_export: String,
    /// One subnet per availability zone, in order
    pub subnets: Vec<SubnetConfig>,
    /// How many of `subnets` (from the front) the DB subnet group spans
    pub subnet_group_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubnetConfig {
    pub zone: String,
    /// Export name of the subnet id
    pub export: String,
}

impl NetworkConfig {
    pub fn availability_zones(&self) -> impl Iterator<Item = &str> {
        self.subnets.iter().map(|s| s.zone.as_str())
    }

    /// Subnets attached to the DB subnet group
    pub fn subnet_group_members(&self) -> &[SubnetConfig] {
        let n = self.subnet_group_size.min(self.subnets.len());
        &self.subnets[..n]
    }
}

/// Security group ingress inputs; rules are the product of both lists
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngressConfig {
    pub ports: Vec<u16>,
    pub cidrs: Vec<String>,
}

/// Symbolic tier → instance class table
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SizingConfig {
    pub default_tier: String,
    pub classes: Vec<InstanceClass>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstanceClass {
    pub tier: String,
    pub class: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Tag keys, allowed values and contact patterns
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagPolicy {
    /// Namespace for tag keys, e.g. `srg` gives `srg:owner`
    pub prefix: String,
    pub default_function: String,
    /// Allowed cost centres, formatted `<code>-<label>`
    pub cost_centres: Vec<String>,
    pub default_cost_centre: String,
    pub environments: Vec<String>,
    pub default_environment: String,
    pub default_contact: String,
    pub owner_pattern: String,
    pub managed_by_pattern: String,
}

impl TagPolicy {
    pub fn key(&self, name: &str) -> String {
        format!("{}:{}", self.prefix, name)
    }
}

/// Default stack configuration
const DEFAULT_CONFIG: &str = r#"
[template]
description = "Managed PostgreSQL instance with its DB subnet group and security group"

[engine]
name = "postgres"
# Some versions don't support every log type in log_exports
version = "13.1"
port = 5432
log_exports = ["postgresql", "upgrade"]
# io1 would need provisioned IOPS
storage_type = "gp2"
backup_retention_days = 7
storage_options = [30, 40, 50, 60]
default_storage = 30
default_master_username = "dbadmin"
default_db_name = "postgresdb"

[network]
vpc_export = "VPC-ID"
subnet_group_size = 2

[[network.subnets]]
zone = "ap-southeast-2a"
export = "ApplicationSubnetAzA"

[[network.subnets]]
zone = "ap-southeast-2b"
export = "ApplicationSubnetAzB"

[[network.subnets]]
zone = "ap-southeast-2c"
export = "ApplicationSubnetAzC"

[ingress]
cidrs = []

[sizing]
default_tier = "Small"

[[sizing.classes]]
tier = "Small"
class = "db.t3.small"
description = "1 vCPU + 2GB"

[[sizing.classes]]
tier = "Medium"
class = "db.t3.medium"
description = "1 vCPU + 4GB"

[[sizing.classes]]
tier = "Large"
class = "db.t3.large"
description = "2 vCPU + 8GB"

[tags]
prefix = "srg"
default_function = "Storage"
cost_centres = [
    "G110-Executive",
    "G111-Strategy",
    "G120-People",
    "G121-Payroll",
    "G130-Finance",
    "G131-Treasury",
    "G141-Legal",
    "G150-Technology",
    "G151-Infrastructure",
    "G160-Marketing",
    "G161-Digital",
    "G171-Merchandise",
    "G191-SupplyChain",
    "G201-Retail",
    "G202-Stores",
    "G220-Property",
]
default_cost_centre = "G151-Infrastructure"
environments = ["SBX", "DEV", "TST", "STG", "PRD"]
default_environment = "DEV"
default_contact = "REPLACE.ME@superretailgroup.com"
owner_pattern = '[\p{Alpha}\p{Digit}.]*@superretailgroup.com'
managed_by_pattern = '[\p{Alpha}\p{Digit}.]*@superretailgroup.com|srgsrq@blazeclan.com|srgoperate@lemongrassconsulting.com|[\p{Alpha}\p{Digit}.]*@voicefoundry.com.au'
"#;

impl StackConfig {
    /// Load a configuration file, merged over the defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load a configuration from TOML, merged over the defaults.
    ///
    /// Tables merge key by key; arrays and scalars replace.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let mut base: toml::Table = toml::from_str(DEFAULT_CONFIG)?;
        let overlay: toml::Table = toml::from_str(content)?;
        merge_tables(&mut base, overlay);
        default_ingress_ports(&mut base);
        Ok(toml::Value::Table(base).try_into()?)
    }

    /// Append ingress CIDRs (e.g. from the command line), skipping ones
    /// already listed
    pub fn with_cidrs<I, S>(mut self, cidrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for cidr in cidrs.into_iter().map(Into::into) {
            if !self.ingress.cidrs.contains(&cidr) {
                self.ingress.cidrs.push(cidr);
            }
        }
        self
    }

    /// Replace the ingress ports
    pub fn with_ports(mut self, ports: Vec<u16>) -> Self {
        self.ingress.ports = ports;
        self
    }

    /// Set how many subnets the DB subnet group spans
    pub fn with_subnet_group_size(mut self, size: usize) -> Self {
        self.network.subnet_group_size = size;
        self
    }

    /// Check the invariants synthesis relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_network()?;
        self.validate_ingress()?;
        self.validate_sizing()?;
        self.validate_tags()?;

        if !self.engine.storage_options.contains(&self.engine.default_storage) {
            return Err(ConfigError::DefaultNotAllowed {
                what: "storage",
                value: self.engine.default_storage.to_string(),
            });
        }
        Ok(())
    }

    fn validate_network(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for zone in self.network.availability_zones() {
            if !seen.insert(zone) {
                return Err(ConfigError::DuplicateZone {
                    zone: zone.to_string(),
                });
            }
        }
        let available = self.network.subnets.len();
        let size = self.network.subnet_group_size;
        if size == 0 || size > available {
            return Err(ConfigError::SubnetGroupSize { size, available });
        }
        Ok(())
    }

    fn validate_ingress(&self) -> Result<(), ConfigError> {
        if self.ingress.ports.is_empty() {
            return Err(ConfigError::EmptyIngress { field: "ports" });
        }
        if self.ingress.ports.contains(&0) {
            return Err(ConfigError::InvalidPort);
        }
        check_unique("ingress port", self.ingress.ports.iter())?;
        if self.ingress.cidrs.is_empty() {
            return Err(ConfigError::EmptyIngress { field: "cidrs" });
        }
        for cidr in &self.ingress.cidrs {
            cidr.parse::<Ipv4Net>()
                .map_err(|e| ConfigError::InvalidCidr {
                    cidr: cidr.clone(),
                    reason: e.to_string(),
                })?;
        }
        check_unique("ingress CIDR", self.ingress.cidrs.iter())?;
        Ok(())
    }

    fn validate_sizing(&self) -> Result<(), ConfigError> {
        if self.sizing.classes.is_empty() {
            return Err(ConfigError::Empty {
                what: "instance class",
            });
        }
        check_unique("tier", self.sizing.classes.iter().map(|c| c.tier.as_str()))?;
        if !self.sizing.classes.iter().any(|c| c.tier == self.sizing.default_tier) {
            return Err(ConfigError::DefaultNotAllowed {
                what: "tier",
                value: self.sizing.default_tier.clone(),
            });
        }
        Ok(())
    }

    fn validate_tags(&self) -> Result<(), ConfigError> {
        let tags = &self.tags;
        if tags.cost_centres.is_empty() {
            return Err(ConfigError::Empty {
                what: "cost centre",
            });
        }
        check_unique("cost centre", tags.cost_centres.iter().map(String::as_str))?;
        if !tags.cost_centres.contains(&tags.default_cost_centre) {
            return Err(ConfigError::DefaultNotAllowed {
                what: "cost centre",
                value: tags.default_cost_centre.clone(),
            });
        }
        check_unique("environment", tags.environments.iter().map(String::as_str))?;
        if !tags.environments.contains(&tags.default_environment) {
            return Err(ConfigError::DefaultNotAllowed {
                what: "environment",
                value: tags.default_environment.clone(),
            });
        }
        Ok(())
    }
}

impl Default for StackConfig {
    fn default() -> Self {
        Self::from_str("").expect("Default stack config should be valid TOML")
    }
}

fn check_unique<T: Eq + Hash + Display>(
    what: &'static str,
    values: impl Iterator<Item = T>,
) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for value in values {
        if seen.contains(&value) {
            return Err(ConfigError::Duplicate {
                what,
                value: value.to_string(),
            });
        }
        seen.insert(value);
    }
    Ok(())
}

/// Ingress ports fall back to the engine port
fn default_ingress_ports(config: &mut toml::Table) {
    let Some(port) = config.get("engine").and_then(|e| e.get("port")).cloned() else {
        return;
    };
    if let Some(toml::Value::Table(ingress)) = config.get_mut("ingress") {
        if !ingress.contains_key("ports") {
            ingress.insert("ports".to_string(), toml::Value::Array(vec![port]));
        }
    }
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
