//! `simulate`: render menu responses offline

use anyhow::Result;
use clap::Args;
use colored::*;

use crate::cli;
use crate::config::Config;
use crate::ussd::{SessionRequest, Transcript, UssdHandler, UssdResponse};

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Accumulated transcript, e.g. "1*Ann*23*1*1,2" (empty for the welcome screen)
    #[arg(long, short, default_value = "")]
    pub text: String,

    /// Show the response for every prefix of the transcript
    #[arg(long)]
    pub walk: bool,
}

pub async fn handle_simulate_command(args: SimulateArgs, config: &Config) -> Result<()> {
    let pool = cli::open_store(config).await?;
    let handler = UssdHandler::offline(cli::load_menu(config, &pool).await?);

    let transcript = Transcript::parse(&args.text);
    let steps = if args.walk {
        let mut steps = vec![Transcript::default()];
        for token in transcript.tokens() {
            let next = steps[steps.len() - 1].extended(token);
            steps.push(next);
        }
        steps
    } else {
        vec![transcript]
    };

    for step in steps {
        let request = SessionRequest {
            session_id: "simulated".to_string(),
            text: step.to_text(),
            ..Default::default()
        };
        let response = handler.handle(&request);
        print_step(&request.text, &response);
    }
    Ok(())
}

fn print_step(text: &str, response: &UssdResponse) {
    let label = if text.is_empty() { "(empty)" } else { text };
    println!("{} {}", ">".dimmed(), label.cyan());
    let prefix = if response.is_terminal() {
        "END".red().bold()
    } else {
        "CON".green().bold()
    };
    println!("{} {}", prefix, response.body());
    println!();
}
