//! Plain-text listing of the parameter schema

use crate::params::ParameterSchema;

/// One block per parameter: name, requirement, default and constraints
pub fn render_schema(schema: &ParameterSchema) -> String {
    let mut lines = Vec::new();
    for spec in schema.iter() {
        let requirement = if spec.is_required() { "required" } else { "optional" };
        lines.push(format!("{} ({})", spec.name, requirement));
        lines.push(format!("    {}", spec.description));
        if let Some(default) = &spec.default {
            lines.push(format!("    default: {}", default));
        }
        if !spec.allowed_values.is_empty() {
            lines.push(format!("    allowed: {}", spec.allowed_values.join(", ")));
        }
        if let Some(pattern) = &spec.allowed_pattern {
            lines.push(format!("    pattern: {}", pattern.as_str()));
        }
        if spec.no_echo {
            lines.push("    no echo".to_string());
        }
    }
    lines.into_iter().map(|line| line + "\n").collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StackConfig;

    #[test]
    fn test_schema_listing() {
        let schema = ParameterSchema::for_stack(&StackConfig::default()).unwrap();
        let text = render_schema(&schema);
        assert!(text.starts_with("db_instance_class (optional)\n"));
        assert!(text.contains("master_user_password (required)\n    Please enter the password.\n    no echo\n"));
        assert!(text.contains("    allowed: SBX, DEV, TST, STG, PRD\n"));
    }

    #[test]
    fn test_schema_listing_ends_each_line() {
        let schema = ParameterSchema::for_stack(&StackConfig::default()).unwrap();
        let text = render_schema(&schema);
        assert!(text.ends_with('\n'));
        assert!(!text.contains("\n\n"));
        assert!(text.contains("    default: Small\n"));
    }
}
