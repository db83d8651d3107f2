//! Command-line interface

pub mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::config::repository::{self, resources};
use crate::ussd::{Menu, ResourceCache};
use commands::fallback::FallbackCommands;
use commands::matching::MatchArgs;
use commands::mentor::MentorCommands;
use commands::mentorship::MentorshipCommands;
use commands::resource::ResourceCommands;
use commands::serve::ServeArgs;
use commands::simulate::SimulateArgs;

#[derive(Parser, Debug)]
#[command(name = "mentor-ussd")]
#[command(about = "USSD gateway and mentor matching for the Mentorship Platform")]
#[command(version)]
pub struct Cli {
    /// Config file (default: <config dir>/mentor-ussd/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP listener for gateway callbacks
    Serve(ServeArgs),
    /// Render the menu response for a transcript without a gateway
    Simulate(SimulateArgs),
    /// Manage mentors
    #[command(subcommand)]
    Mentor(MentorCommands),
    /// Manage learning resources
    #[command(subcommand)]
    Resource(ResourceCommands),
    /// Match a stored mentee with a mentor
    Match(MatchArgs),
    /// Manage mentorships
    #[command(subcommand)]
    Mentorship(MentorshipCommands),
    /// Inspect or replay registrations the profile API missed
    #[command(subcommand)]
    Fallback(FallbackCommands),
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve(args) => commands::serve::handle_serve_command(args, config).await,
        Commands::Simulate(args) => {
            commands::simulate::handle_simulate_command(args, &config).await
        }
        Commands::Mentor(cmd) => commands::mentor::handle_mentor_command(cmd, &config).await,
        Commands::Resource(cmd) => commands::resource::handle_resource_command(cmd, &config).await,
        Commands::Match(args) => commands::matching::handle_match_command(args, &config).await,
        Commands::Mentorship(cmd) => {
            commands::mentorship::handle_mentorship_command(cmd, &config).await
        }
        Commands::Fallback(cmd) => commands::fallback::handle_fallback_command(cmd, &config).await,
    }
}

pub(crate) async fn open_store(config: &Config) -> Result<SqlitePool> {
    repository::connect(&config.database_path()).await
}

/// Menu over the built-in catalog plus every stored resource
pub(crate) async fn load_menu(config: &Config, pool: &SqlitePool) -> Result<Menu> {
    let stored = resources::list_resources(pool).await?;
    let cache = ResourceCache::with_stored(&stored);
    Ok(Menu::new(Arc::new(cache), config.ussd.age_policy))
}
