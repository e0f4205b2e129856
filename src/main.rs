//! rds-template CLI
//!
//! Usage:
//!   rds-template [OPTIONS]
//!
//! Options:
//!   --params <FILE>        Parameter values (TOML, `name = value`)
//!   -p, --param <K=V>      Parameter override, repeatable
//!   -c, --config <FILE>    Stack configuration (TOML, merged over defaults)
//!   --cidr <CIDR>          Ingress CIDR, repeatable
//!   --stack-name <NAME>    Stack name used for the resolved view
//!   --region <REGION>      Region used for the resolved view
//!   -f, --format <FORMAT>  json (default) or yaml
//!   --resolved             Print the resolved stack instead of the template
//!   --schema               Print the parameter schema and exit
//!   -h, --help             Print help

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;

use rds_template::renderer::render_schema;
use rds_template::{
    emit, synthesize, OutputFormat, ParameterSchema, ParameterValues, ResolveContext, StackConfig,
    SynthConfig, SynthError,
};

#[derive(Parser)]
#[command(name = "rds-template")]
#[command(about = "Synthesize a CloudFormation template for a managed PostgreSQL instance")]
struct Cli {
    /// Parameter values file (TOML)
    #[arg(long, value_name = "FILE")]
    params: Option<PathBuf>,

    /// Parameter override as KEY=VALUE; wins over the parameters file
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Stack configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Ingress CIDR, added to those in the configuration
    #[arg(long = "cidr", value_name = "CIDR")]
    cidrs: Vec<String>,

    /// Stack name for evaluating `${AWS::StackName}`
    #[arg(long)]
    stack_name: Option<String>,

    /// Region for evaluating `${AWS::Region}`
    #[arg(long)]
    region: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Print the resolved stack view instead of the template
    #[arg(long)]
    resolved: bool,

    /// Print the parameter schema and exit
    #[arg(long)]
    schema: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rds_template=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load stack configuration
    let stack = match &cli.config {
        Some(path) => match StackConfig::from_file(path) {
            Ok(c) => c,
            Err(e) => fail(&format!("Error loading config '{}': {}", path.display(), e)),
        },
        None => StackConfig::default(),
    };
    let stack = stack.with_cidrs(cli.cidrs.iter().cloned());

    if cli.schema {
        match ParameterSchema::for_stack(&stack) {
            Ok(schema) => print!("{}", render_schema(&schema)),
            Err(e) => fail(&format!("Error: {}", e)),
        }
        return;
    }

    // Read parameter values; keep the source for error snippets
    let (mut values, source) = match &cli.params {
        Some(path) => {
            let content = match fs::read_to_string(path) {
                Ok(c) => c,
                Err(e) => fail(&format!("Error reading file '{}': {}", path.display(), e)),
            };
            match ParameterValues::from_toml_str(&content) {
                Ok(v) => (v, Some((path.display().to_string(), content))),
                Err(e) => fail(&format!("Error parsing '{}': {}", path.display(), e)),
            }
        }
        None => (ParameterValues::new(), None),
    };
    if let Err(e) = values.apply_overrides(&cli.overrides) {
        fail(&format!("Error: {}", e));
    }

    let mut context = ResolveContext::new();
    if let Some(name) = &cli.stack_name {
        context = context.with_stack_name(name.clone());
    }
    if let Some(region) = &cli.region {
        context = context.with_region(region.clone());
    }

    let config = SynthConfig::new().with_stack(stack).with_context(context);
    let synthesis = match synthesize(&values, &config) {
        Ok(s) => s,
        Err(SynthError::Parameters(errors)) => {
            for error in &errors {
                match &source {
                    Some((filename, content)) => {
                        eprintln!("{}", error.format(content, filename).trim_end())
                    }
                    None => eprintln!("Error: {}", error),
                }
            }
            process::exit(1);
        }
        Err(e) => fail(&format!("Error: {}", e)),
    };

    let output = if cli.resolved {
        emit(&synthesis.resolved, cli.format)
    } else {
        emit(&synthesis.template, cli.format)
    };
    match output {
        Ok(text) => println!("{}", text.trim_end()),
        Err(e) => fail(&format!("Error: {}", e)),
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{}", message);
    process::exit(1);
}
