//! Module command - run one AWS module against the live account

use super::CommandContext;
use anyhow::{bail, Context, Result};
use awsible::error::Error;
use awsible::modules::cloud::aws::register_modules;
use awsible::modules::cloud::aws::sdk::load_clients;
use awsible::modules::{ModuleContext, ModuleOutput, ModuleParams, ModuleRegistry, ModuleStatus};
use clap::Parser;
use std::path::Path;
use tracing::debug;

/// Arguments for the module command
#[derive(Parser, Debug, Clone)]
pub struct ModuleArgs {
    /// Module name, e.g. ec2_scaling_policy
    pub name: String,

    /// Module parameters: inline JSON or a YAML/JSON file
    #[arg(short, long, default_value = "{}")]
    pub args: String,

    /// Report what would change without changing anything
    #[arg(long)]
    pub check: bool,

    /// Include before/after diffs
    #[arg(long)]
    pub diff: bool,
}

/// Parses inline JSON, or reads a YAML/JSON file when `raw` names one.
pub fn parse_module_args(raw: &str) -> Result<ModuleParams> {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') {
        return serde_json::from_str(trimmed).context("Module arguments are not a JSON object");
    }

    let path = Path::new(trimmed);
    if !path.is_file() {
        bail!("Module arguments must be a JSON object or a file path: {}", raw);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read module arguments: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse module arguments: {}", path.display()))
}

impl ModuleArgs {
    /// Execute the module command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let params = parse_module_args(&self.args)?;

        let clients = load_clients(&ctx.config.aws).await;
        let mut registry = ModuleRegistry::new();
        register_modules(&mut registry, &clients);

        if !registry.contains(&self.name) {
            ctx.output.error(&format!(
                "Unknown module '{}'. Available: {}",
                self.name,
                registry.names().join(", ")
            ));
            return Ok(Error::ModuleNotFound(self.name.clone()).exit_code());
        }

        let context = ModuleContext::new()
            .with_check_mode(self.check)
            .with_diff_mode(self.diff);
        let name = self.name.clone();
        debug!(module = %name, check = self.check, "Running module");

        let result =
            tokio::task::spawn_blocking(move || registry.execute(&name, &params, &context))
                .await
                .context("Module task panicked")?;

        match result {
            Ok(output) => {
                ctx.output.json(&output)?;
                Ok(if output.status == ModuleStatus::Failed { 2 } else { 0 })
            }
            Err(e) => {
                let err = Error::from(e);
                ctx.output.json(&failure_output(&err))?;
                Ok(err.exit_code())
            }
        }
    }
}

/// Result printed when a module returns an error.
fn failure_output(err: &Error) -> ModuleOutput {
    ModuleOutput::failed(err.to_string()).with_data("failed", serde_json::json!(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_json() {
        let params = parse_module_args(r#"{"name": "scale-up", "cooldown": 300}"#).unwrap();
        assert_eq!(params.get("cooldown"), Some(&serde_json::json!(300)));
    }

    #[test]
    fn test_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("args.yml");
        std::fs::write(&path, "name: scale-up\nasg_name: web\n").unwrap();
        let params = parse_module_args(path.to_str().unwrap()).unwrap();
        assert_eq!(params.get("asg_name"), Some(&serde_json::json!("web")));
    }

    #[test]
    fn test_neither_json_nor_file() {
        assert!(parse_module_args("name=scale-up").is_err());
    }

    #[test]
    fn test_failure_output() {
        let err = Error::validation("name is required");
        let value = serde_json::to_value(failure_output(&err)).unwrap();
        assert_eq!(value["failed"], serde_json::json!(true));
        assert_eq!(value["changed"], serde_json::json!(false));
        assert_eq!(value["status"], serde_json::json!("failed"));
        assert!(value["msg"].as_str().unwrap().contains("name is required"));
    }
}
