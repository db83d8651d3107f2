//! `mentor`: add, list and remove mentors

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use colored::*;

use crate::cli;
use crate::config::Config;
use crate::config::repository::mentors::{self, NewMentor};
use crate::ussd::catalog::{self, CATEGORIES, LOCATIONS};

#[derive(Subcommand, Debug)]
pub enum MentorCommands {
    /// Register a mentor
    Add(AddMentorArgs),
    /// List mentors with their current load
    List {
        /// Only mentors with a free slot
        #[arg(long)]
        available: bool,
    },
    /// Remove a mentor and their mentorships
    Remove {
        #[arg(long)]
        id: i64,
    },
}

#[derive(Args, Debug)]
pub struct AddMentorArgs {
    /// Phone number or other unique reference
    #[arg(long)]
    pub user_ref: String,

    #[arg(long)]
    pub name: String,

    /// County served, by menu code or name; repeatable
    #[arg(long = "county", required = true)]
    pub counties: Vec<String>,

    /// Expertise category, by menu code or name; repeatable
    #[arg(long = "expertise", required = true)]
    pub expertise: Vec<String>,

    /// Maximum concurrent mentees
    #[arg(long, default_value_t = 3)]
    pub capacity: u32,

    #[arg(long, default_value = "en")]
    pub language: String,

    #[arg(long, default_value = "visible")]
    pub visibility: String,
}

/// Accept either a menu code ("1") or a catalog name, case-insensitively
pub(crate) fn resolve_catalog_value(
    raw: &str,
    entries: &[(&str, &'static str)],
) -> Option<&'static str> {
    let raw = raw.trim();
    entries
        .iter()
        .find(|(code, name)| *code == raw || name.eq_ignore_ascii_case(raw))
        .map(|(_, name)| *name)
}

fn resolve_all(
    values: &[String],
    entries: &[(&str, &'static str)],
    kind: &str,
) -> Result<Vec<String>> {
    let mut resolved: Vec<String> = Vec::new();
    for value in values {
        let Some(name) = resolve_catalog_value(value, entries) else {
            bail!(
                "Unknown {} '{}'; expected one of:\n{}",
                kind,
                value,
                catalog::menu_listing(entries)
            );
        };
        if !resolved.iter().any(|existing| existing == name) {
            resolved.push(name.to_string());
        }
    }
    Ok(resolved)
}

pub async fn handle_mentor_command(cmd: MentorCommands, config: &Config) -> Result<()> {
    let pool = cli::open_store(config).await?;

    match cmd {
        MentorCommands::Add(args) => {
            if args.capacity == 0 {
                bail!("Capacity must be at least 1");
            }
            let mentor = NewMentor {
                user_ref: args.user_ref,
                name: args.name,
                expertise: resolve_all(&args.expertise, CATEGORIES, "expertise")?,
                language_preference: args.language,
                counties: resolve_all(&args.counties, LOCATIONS, "county")?,
                max_mentees: args.capacity,
                visibility: args.visibility,
            };
            let id = mentors::add_mentor(&pool, &mentor).await?;
            println!("{} mentor {} ({})", "Added".green().bold(), mentor.name.bold(), id);
        }
        MentorCommands::List { available } => {
            let listed = if available {
                mentors::list_available_mentors(&pool).await?
            } else {
                mentors::list_mentors(&pool).await?
            };

            if listed.is_empty() {
                println!("{}", "No mentors".dimmed());
                return Ok(());
            }

            for mentor in listed {
                let load = format!("{}/{}", mentor.mentees_count, mentor.max_mentees);
                let load = if mentor.has_capacity() { load.green() } else { load.red() };
                println!(
                    "{:>4}  {:<24} {}  counties: {}  expertise: {}",
                    mentor.id,
                    mentor.name.bold(),
                    load,
                    mentor.counties.join(", "),
                    mentor.expertise.join(", ")
                );
            }
        }
        MentorCommands::Remove { id } => {
            if mentors::delete_mentor(&pool, id).await? {
                println!("{} mentor {}", "Removed".yellow().bold(), id);
            } else {
                bail!("No mentor with id {}", id);
            }
        }
    }

    Ok(())
}
