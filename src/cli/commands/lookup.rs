//! Lookup command - run a lookup plugin from the shell

use super::CommandContext;
use anyhow::{Context, Result};
use awsible::lookup::{LookupContext, LookupRegistry};
use awsible::modules::cloud::aws::sdk::SdkKmsConnector;
use clap::Parser;
use std::sync::Arc;

/// Arguments for the lookup command
#[derive(Parser, Debug, Clone)]
pub struct LookupArgs {
    /// Lookup plugin name, e.g. kms
    pub name: String,

    /// Plugin arguments; `key=value` entries are options
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl LookupArgs {
    /// Execute the lookup command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let registry = LookupRegistry::with_kms(Arc::new(SdkKmsConnector));
        let name = self.name.clone();
        let args = self.args.clone();

        let values = tokio::task::spawn_blocking(move || {
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            registry.lookup(&name, &args, &LookupContext::new())
        })
        .await
        .context("Lookup task panicked")?
        .with_context(|| format!("Lookup '{}' failed", self.name))?;

        for value in values {
            println!("{}", value);
        }
        ctx.output.info(&format!("Lookup '{}' done", self.name));
        Ok(0)
    }
}
