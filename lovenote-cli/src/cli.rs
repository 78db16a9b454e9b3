use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use lovenote_core::{Config, Pipeline, RunOptions, RunOutcome};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Top-level CLI struct. Running with no arguments performs one scheduled send.
#[derive(Debug, Parser)]
#[command(name = "lovenote", version, about = "Daily love note dispatcher")]
pub struct Cli {
    /// Send even outside the daily window (same as FORCE_SEND=1).
    #[arg(long)]
    pub force: bool,

    /// Compose the message and print it without sending.
    #[arg(long)]
    pub dry_run: bool,

    /// Config file to read instead of the default location.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load(self.config.as_deref()).context("loading configuration")?;
        config.apply_process_env();
        let config = config.resolve()?;

        info!(
            provider = %config.weather_provider,
            sender = %config.sender.city,
            recipient = %config.recipient.city,
            "starting run"
        );

        let pipeline = Pipeline::from_config(&config)?;
        let options = RunOptions {
            force: self.force,
            dry_run: self.dry_run,
        };

        let mut rng = rand::rng();
        match pipeline.run(Utc::now(), &mut rng, options).await? {
            RunOutcome::Skipped { local_time } => {
                println!(
                    "skipped: {local_time} in {} is outside the send window",
                    config.recipient.timezone
                );
            }
            RunOutcome::Composed(payload) => {
                let json = serde_json::to_string_pretty(&payload.redacted())
                    .context("serializing payload")?;
                println!("{json}");
                println!("dry run: not sent");
            }
            RunOutcome::Sent { response, .. } => {
                let msgid = response
                    .msgid
                    .map_or_else(|| "-".to_string(), |id| id.to_string());
                println!("OK (msgid {msgid})");
            }
        }

        Ok(())
    }
}

/// Logs go to stderr, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
