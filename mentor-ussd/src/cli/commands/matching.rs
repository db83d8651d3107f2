//! `match`: pair a stored mentee with a mentor

use anyhow::{Result, bail};
use clap::Args;
use colored::*;

use crate::cli;
use crate::config::Config;
use crate::services::matching::{self, MatchOutcome};

#[derive(Args, Debug)]
pub struct MatchArgs {
    #[arg(long)]
    pub mentee_id: i64,
}

pub async fn handle_match_command(args: MatchArgs, config: &Config) -> Result<()> {
    let pool = cli::open_store(config).await?;

    match matching::match_mentee(&pool, args.mentee_id).await? {
        Some(MatchOutcome::Matched(matched)) => {
            println!(
                "{} mentee {} with {} (load {}/{})",
                "Matched".green().bold(),
                args.mentee_id,
                matched.mentor.name.bold(),
                matched.mentor.mentees_count,
                matched.mentor.max_mentees
            );
            println!("Mentorship {}", matched.mentorship.id.to_string().cyan());
        }
        Some(MatchOutcome::AlreadyMatched(existing)) => println!(
            "{} mentee {} already has active mentorship {}",
            "Unchanged:".yellow(),
            args.mentee_id,
            existing.id.to_string().cyan()
        ),
        Some(MatchOutcome::NotFound) => println!("{}", "No matching mentors found".yellow()),
        None => bail!("No mentee with id {}", args.mentee_id),
    }

    Ok(())
}
