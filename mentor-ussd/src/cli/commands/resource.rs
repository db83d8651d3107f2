//! `resource`: add and list learning resources

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::*;

use crate::cli;
use crate::config::Config;
use crate::config::repository::resources::{self, NewResource};
use crate::ussd::catalog::CATEGORIES;

use super::mentor::resolve_catalog_value;

#[derive(Subcommand, Debug)]
pub enum ResourceCommands {
    /// Store a resource; tagged categories show it in the USSD resources menu after restart
    Add(AddResourceArgs),
    /// List stored resources
    List {
        /// Only resources carrying this tag
        #[arg(long)]
        tag: Option<String>,
    },
}

#[derive(Args, Debug)]
pub struct AddResourceArgs {
    #[arg(long)]
    pub title: String,

    #[arg(long, default_value = "")]
    pub description: String,

    /// Tag, repeatable. Category codes are expanded to their names.
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    #[arg(long)]
    pub link: Option<String>,

    /// Short line shown to USSD callers instead of the title
    #[arg(long)]
    pub sms_text: Option<String>,

    /// Id of the uploading mentor
    #[arg(long)]
    pub created_by: Option<i64>,
}

pub async fn handle_resource_command(cmd: ResourceCommands, config: &Config) -> Result<()> {
    let pool = cli::open_store(config).await?;

    match cmd {
        ResourceCommands::Add(args) => {
            let tags = args
                .tags
                .iter()
                .map(|tag| {
                    resolve_catalog_value(tag, CATEGORIES)
                        .map(str::to_string)
                        .unwrap_or_else(|| tag.trim().to_string())
                })
                .collect();

            let resource = NewResource {
                title: args.title,
                description: args.description,
                tags,
                link: args.link,
                sms_text: args.sms_text,
                created_by: args.created_by,
            };
            let id = resources::add_resource(&pool, &resource).await?;
            println!("{} resource {} ({})", "Added".green().bold(), resource.title.bold(), id);
        }
        ResourceCommands::List { tag } => {
            let listed = match tag {
                Some(tag) => resources::list_by_tag(&pool, &tag).await?,
                None => resources::list_resources(&pool).await?,
            };

            if listed.is_empty() {
                println!("{}", "No resources".dimmed());
                return Ok(());
            }

            for resource in listed {
                println!("{}  [{}]", resource.title.bold(), resource.tags.join(", ").cyan());
                println!("    {}", resource.ussd_line().dimmed());
                if let Some(link) = &resource.link {
                    println!("    {}", link);
                }
            }
        }
    }

    Ok(())
}
