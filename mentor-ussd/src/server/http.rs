//! Just enough HTTP/1.1 for a gateway callback: one request per connection

use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

/// Upper bound on accepted request bodies; gateway callbacks are a few hundred bytes
pub const MAX_BODY_BYTES: usize = 64 * 1024;
/// Upper bound on the request line and on each header line
pub const MAX_LINE_BYTES: usize = 8 * 1024;
pub const MAX_HEADERS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Path without the query string
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// Read one line, failing once it grows past `MAX_LINE_BYTES`.
/// Returns an empty string at end of stream.
async fn read_line_bounded<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<String> {
    let mut line = Vec::new();
    let mut limited = (&mut *reader).take(MAX_LINE_BYTES as u64 + 1);
    limited.read_until(b'\n', &mut line).await?;
    if line.len() > MAX_LINE_BYTES {
        bail!("Line longer than {} bytes", MAX_LINE_BYTES);
    }
    Ok(String::from_utf8_lossy(&line).into_owned())
}

/// Read the request line, headers and a `Content-Length` body
pub async fn read_request<R: AsyncRead + Unpin>(stream: R) -> Result<Request> {
    let mut reader = BufReader::new(stream);

    let request_line = read_line_bounded(&mut reader)
        .await
        .context("Failed to read request line")?;

    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        bail!("Malformed request line: {:?}", request_line.trim());
    };
    let method = method.to_uppercase();
    let path = target.split('?').next().unwrap_or(target).to_string();

    let mut headers = HashMap::new();
    let mut content_length: usize = 0;
    for count in 0.. {
        let line = read_line_bounded(&mut reader).await.context("Failed to read header")?;
        if line.trim().is_empty() {
            break;
        }
        if count == MAX_HEADERS {
            bail!("More than {} headers", MAX_HEADERS);
        }
        let Some((key, value)) = line.trim().split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim().to_string();
        match key.as_str() {
            "content-length" => {
                content_length = value
                    .parse()
                    .with_context(|| format!("Invalid Content-Length: {}", value))?;
            }
            "transfer-encoding" if !value.eq_ignore_ascii_case("identity") => {
                bail!("Unsupported Transfer-Encoding: {}", value);
            }
            _ => {}
        }
        headers.insert(key, value);
    }

    if content_length > MAX_BODY_BYTES {
        bail!("Request body too large: {} bytes", content_length);
    }

    let mut body = vec![0u8; content_length];
    if content_length > 0 {
        reader.read_exact(&mut body).await.context("Failed to read request body")?;
    }

    Ok(Request {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

/// Decode an `application/x-www-form-urlencoded` body
pub fn parse_form(body: &str) -> Result<HashMap<String, String>> {
    let decode = |raw: &str| -> Result<String> {
        let spaced = raw.replace('+', " ");
        Ok(urlencoding::decode(&spaced)
            .with_context(|| format!("Invalid form encoding: {}", raw))?
            .into_owned())
    };

    let mut fields = HashMap::new();
    for pair in body.trim().split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        fields.insert(decode(key)?, decode(value)?);
    }
    Ok(fields)
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        409 => "Conflict",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

fn http_response(status: u16, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text(status),
        content_type,
        body.len(),
        body
    )
}

pub fn http_text(status: u16, body: &str) -> String {
    http_response(status, "text/plain; charset=utf-8", body)
}

pub fn http_json(status: u16, body: &serde_json::Value) -> String {
    http_response(status, "application/json", &body.to_string())
}
