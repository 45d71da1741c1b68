use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use pathscope_core::{config_schema_json, write_schema_file};

use super::util::{effective_config, print_json, GlobalArgs};

#[derive(Subcommand, Clone)]
pub enum ConfigCmd {
    /// Print (or write) the JSON schema of the configuration file
    Schema(SchemaArgs),
    /// Print the effective configuration after env and flag overrides
    Show,
}

#[derive(Args, Clone)]
pub struct SchemaArgs {
    /// Write the schema to this path instead of stdout
    #[arg(long)]
    pub out: Option<String>,
}

pub fn run(global: &GlobalArgs, cmd: ConfigCmd) -> Result<()> {
    match cmd {
        ConfigCmd::Schema(args) => match args.out {
            Some(path) => {
                write_schema_file(&path).with_context(|| format!("writing schema to {path}"))?;
                println!("wrote {}", path);
                Ok(())
            }
            None => print_json(&config_schema_json(), global.pretty),
        },
        ConfigCmd::Show => print_json(&effective_config(global)?, global.pretty),
    }
}
