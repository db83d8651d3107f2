//! `fallback`: registrations parked while the profile API was unreachable

use anyhow::Result;
use clap::Subcommand;
use colored::*;

use crate::api::ProfileApiClient;
use crate::config::Config;
use crate::services::dispatch::{FallbackSink, replay_fallback};

#[derive(Subcommand, Debug)]
pub enum FallbackCommands {
    /// List parked registrations
    List,
    /// Send parked registrations to the profile API, removing delivered ones
    Replay,
}

pub async fn handle_fallback_command(cmd: FallbackCommands, config: &Config) -> Result<()> {
    let sink = FallbackSink::new(config.fallback_dir());

    match cmd {
        FallbackCommands::List => {
            let pending = sink.pending().await?;
            if pending.is_empty() {
                println!("{}", "No parked registrations".dimmed());
            }
            for path in pending {
                match sink.read(&path).await {
                    Ok(record) => println!(
                        "{}  {}  {}  {}",
                        record.recorded_at.format("%Y-%m-%d %H:%M:%S"),
                        record.phone_number.cyan(),
                        record.profile.name.bold(),
                        record.error.dimmed()
                    ),
                    Err(e) => println!("{} {:#}", "Unreadable".red(), e),
                }
            }
        }
        FallbackCommands::Replay => {
            let resilience = config.resilience();
            let client = ProfileApiClient::new(
                &config.api.base_url,
                config.api.token.clone(),
                &resilience.http,
            )?;
            let summary = replay_fallback(&sink, &client).await?;
            println!(
                "{} delivered, {} still parked",
                summary.delivered.to_string().green().bold(),
                summary.failed.to_string().yellow()
            );
        }
    }

    Ok(())
}
