use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Sign-in endpoint load test
#[derive(Parser, Debug)]
#[command(name = "signin-loadtest")]
#[command(about = "Ramping virtual-user load test for the /signin endpoint")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the load scenario (stops early on Ctrl+C)
    Run(RunArgs),

    /// Print the scenario options as JSON and exit
    Options,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Extra TOML config file layered over config/default.toml
    #[arg(long, env = "LOADTEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write the end-of-run summary as JSON to this file
    #[arg(long)]
    pub summary_export: Option<PathBuf>,
}
