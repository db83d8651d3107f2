//! `serve`: run the gateway listener

use anyhow::Result;
use clap::Args;
use log::{info, warn};
use std::sync::Arc;

use crate::api::{ConcurrencyLimiter, LogOnlySink, NotificationSink, ProfileApiClient, SmsClient};
use crate::cli;
use crate::config::Config;
use crate::server::{self, AppState};
use crate::services::dispatch::{Dispatcher, FallbackSink};
use crate::ussd::UssdHandler;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Bind host (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port (overrides config)
    #[arg(long, short)]
    pub port: Option<u16>,
}

pub async fn handle_serve_command(args: ServeArgs, mut config: Config) -> Result<()> {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let pool = cli::open_store(&config).await?;
    let menu = cli::load_menu(&config, &pool).await?;
    let dispatcher = build_dispatcher(&config, pool.clone())?;

    info!(
        "Age policy: {:?}, fallback directory: {}",
        menu.age_policy(),
        dispatcher.fallback().dir().display()
    );

    let limiter = dispatcher.limiter().clone();
    let state = AppState {
        handler: UssdHandler::new(menu, dispatcher),
        pool,
    };
    server::serve(&config.bind_addr(), state).await?;

    let stats = limiter.stats();
    info!(
        "Side effects: {} calls, {} waited for one of {} permits",
        stats.calls_acquired, stats.calls_waited, stats.max_concurrent_requests
    );
    Ok(())
}

fn build_dispatcher(config: &Config, pool: sqlx::SqlitePool) -> Result<Dispatcher> {
    let resilience = config.resilience();

    let profiles = Arc::new(ProfileApiClient::new(
        &config.api.base_url,
        config.api.token.clone(),
        &resilience.http,
    )?);

    let notifier: Arc<dyn NotificationSink> = match &config.sms.api_key {
        Some(api_key) => Arc::new(SmsClient::new(
            &config.sms.username,
            api_key,
            config.sms.sender_id.clone(),
            &resilience.http,
        )?),
        None => {
            warn!("AT_API_KEY not set; SMS notifications will only be logged");
            Arc::new(LogOnlySink)
        }
    };

    let limiter = ConcurrencyLimiter::new(resilience.concurrency);
    if limiter.is_enabled() {
        info!(
            "Side effects limited to {} concurrent calls",
            limiter.stats().max_concurrent_requests
        );
    } else {
        warn!("Side-effect concurrency limiting disabled");
    }

    Ok(
        Dispatcher::new(pool, profiles, notifier, FallbackSink::new(config.fallback_dir()))
            .with_limiter(limiter)
            .with_resource_base_url(&config.ussd.resource_base_url),
    )
}
