//! `mentorship`: list and complete mentorships

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use colored::*;
use uuid::Uuid;

use crate::cli;
use crate::config::Config;
use crate::config::repository::mentorships::{self, MentorshipStatus};

#[derive(Subcommand, Debug)]
pub enum MentorshipCommands {
    /// List a mentor's mentorships
    List {
        #[arg(long)]
        mentor_id: i64,
    },
    /// Mark a mentorship completed (the mentor's load is not released)
    Complete {
        #[arg(long)]
        id: String,
    },
}

pub async fn handle_mentorship_command(cmd: MentorshipCommands, config: &Config) -> Result<()> {
    let pool = cli::open_store(config).await?;

    match cmd {
        MentorshipCommands::List { mentor_id } => {
            let listed = mentorships::list_for_mentor(&pool, mentor_id).await?;
            if listed.is_empty() {
                println!("{}", "No mentorships".dimmed());
            }
            for mentorship in listed {
                let status = match mentorship.status {
                    MentorshipStatus::Active => mentorship.status.as_str().green(),
                    MentorshipStatus::Completed => mentorship.status.as_str().dimmed(),
                };
                println!(
                    "{}  mentee {}  {}  since {}",
                    mentorship.id,
                    mentorship.mentee_id,
                    status,
                    mentorship.created_at.format("%Y-%m-%d")
                );
            }
        }
        MentorshipCommands::Complete { id } => {
            let id = Uuid::parse_str(id.trim())
                .with_context(|| format!("Invalid mentorship id: {}", id))?;
            if !mentorships::complete_mentorship(&pool, id).await? {
                bail!("No active mentorship with id {}", id);
            }
            if let Some(mentorship) = mentorships::get_mentorship(&pool, id).await? {
                println!(
                    "{} mentorship {} (mentor {}, mentee {})",
                    "Completed".green().bold(),
                    id,
                    mentorship.mentor_id,
                    mentorship.mentee_id
                );
            }
        }
    }

    Ok(())
}
