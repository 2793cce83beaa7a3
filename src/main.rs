use anyhow::{Context, Result};
use clap::Parser;
use signin_loadtest::{cli, config, env, runner, scenario, telemetry};
use cli::{Cli, Command};
use config::Config;
use env::EnvParams;
use scenario::Options;
use telemetry::init_tracing;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let params = EnvParams::from_process_env();
    let options = Options::load_test(&params);

    match cli.command {
        Command::Options => {
            println!("{}", options.to_json_pretty()?);
        }
        Command::Run(args) => {
            let cfg = Config::load(args.config.as_deref()).context("loading configuration")?;

            if params.target_vus > 10_000 {
                warn!(
                    target_vus = params.target_vus,
                    "very high VU count, make sure the file descriptor limit allows it"
                );
            }

            info!(
                target_vus = params.target_vus,
                rampup = %params.rampup,
                sustained = %params.sustained,
                rampdown = %params.rampdown,
                url = %cfg.target.url,
                "starting signin load test"
            );

            let shutdown = telemetry::shutdown_token();
            let summary = runner::run_load_test(&cfg, &options, shutdown).await?;

            println!("{}", summary.render());

            if let Some(path) = args.summary_export {
                summary
                    .write_json(&path)
                    .await
                    .with_context(|| format!("exporting summary to {}", path.display()))?;
            }

            info!("load test complete");
        }
    }

    Ok(())
}
