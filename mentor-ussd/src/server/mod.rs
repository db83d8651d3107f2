// HTTP listener for the USSD gateway callback and the matching endpoint
//
// One task per connection. The callback path answers from the menu alone;
// anything slow happens in tasks the dispatcher spawned.

pub mod http;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

use crate::services::matching::{self, MatchOutcome};
use crate::ussd::menu::INVALID_OPTION;
use crate::ussd::{SessionRequest, UssdHandler, UssdResponse};
use self::http::{Request, http_json, http_text, parse_form};

const CALLBACK_PATHS: &[&str] = &[
    "/ussd/callback",
    "/ussd/callback/",
    "/api/ussd/callback",
    "/api/ussd/callback/",
];

const MATCH_PATHS: &[&str] = &["/match-mentor", "/match-mentor/", "/api/match-mentor/"];

pub const METHOD_NOT_ALLOWED: &str = "Method not allowed";

/// How long a client gets to deliver a complete request
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct AppState {
    pub handler: UssdHandler,
    pub pool: SqlitePool,
}

#[derive(Debug, Deserialize)]
struct MatchMentorBody {
    mentee_id: i64,
}

/// Accept connections until Ctrl-C
pub async fn serve(addr: &str, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", listener.local_addr()?);
    run(listener, state).await
}

async fn run(listener: TcpListener, state: AppState) -> Result<()> {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let state = state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &state, READ_TIMEOUT).await {
                            debug!("Connection from {} dropped: {:#}", peer, e);
                        }
                    });
                }
                Err(e) => warn!("Accept failed: {}", e),
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                return Ok(());
            }
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    state: &AppState,
    read_timeout: Duration,
) -> Result<()> {
    let read = tokio::time::timeout(read_timeout, http::read_request(&mut stream)).await;
    let response = match read {
        Ok(Ok(request)) => route(&request, state).await,
        Ok(Err(e)) => {
            debug!("Bad request: {:#}", e);
            http_json(400, &json!({"error": "bad_request"}))
        }
        Err(_) => {
            debug!("No complete request within {:?}", read_timeout);
            http_json(408, &json!({"error": "request_timeout"}))
        }
    };

    stream.write_all(response.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

pub async fn route(request: &Request, state: &AppState) -> String {
    let method = request.method.as_str();
    let path = request.path.as_str();

    match method {
        "POST" if CALLBACK_PATHS.contains(&path) => ussd_callback(&request.body, &state.handler),
        _ if CALLBACK_PATHS.contains(&path) => http_text(405, METHOD_NOT_ALLOWED),
        "POST" if MATCH_PATHS.contains(&path) => match_mentor(&request.body, &state.pool).await,
        _ if MATCH_PATHS.contains(&path) => {
            http_json(405, &json!({"error": METHOD_NOT_ALLOWED}))
        }
        "GET" if path == "/health" => http_json(200, &json!({"status": "ok"})),
        _ => http_json(404, &json!({"error": "not_found"})),
    }
}

fn ussd_callback(body: &str, handler: &UssdHandler) -> String {
    let response = match parse_form(body) {
        Ok(fields) => handler.handle(&SessionRequest::from_form(&fields)),
        Err(e) => {
            warn!("Undecodable USSD callback: {:#}", e);
            UssdResponse::end(INVALID_OPTION)
        }
    };
    http_text(200, &response.to_string())
}

async fn match_mentor(body: &str, pool: &SqlitePool) -> String {
    let request: MatchMentorBody = match serde_json::from_str(body) {
        Ok(request) => request,
        Err(e) => return http_json(400, &json!({"error": format!("Invalid request: {}", e)})),
    };

    match matching::match_mentee(pool, request.mentee_id).await {
        Ok(Some(MatchOutcome::Matched(matched))) => {
            match serde_json::to_value(&matched.mentorship) {
                Ok(body) => http_json(201, &body),
                Err(e) => {
                    error!("Failed to serialize mentorship: {}", e);
                    http_json(500, &json!({"error": "internal_error"}))
                }
            }
        }
        Ok(Some(MatchOutcome::AlreadyMatched(existing))) => http_json(
            409,
            &json!({
                "message": "Mentee already has an active mentorship",
                "mentorship_id": existing.id,
            }),
        ),
        Ok(Some(MatchOutcome::NotFound)) => {
            http_json(404, &json!({"message": "No matching mentors found"}))
        }
        Ok(None) => http_json(404, &json!({"message": "Mentee not found"})),
        Err(e) => {
            error!("Matching mentee {} failed: {:#}", request.mentee_id, e);
            http_json(500, &json!({"error": "internal_error"}))
        }
    }
}
