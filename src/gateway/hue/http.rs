//! Minimal HTTP/1.1 client for the bridge's local REST API.
//!
//! The bridge serves plain HTTP on the local network and closes the
//! connection after each response when asked to, so every request opens a
//! fresh `TcpStream`, sends one request with `Connection: close` and reads
//! until EOF. Bodies may come with a `Content-Length` or chunked.

use anyhow::{Context, Result};
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;

use crate::constants::*;
use crate::logger::Log;

/// Error classification for retry logic.
#[derive(Debug, PartialEq)]
enum ErrorType {
    Temporary, // Should retry with standard delay
    Permanent, // Don't retry - fundamental issue
}

/// A parsed response.
#[derive(Debug, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

/// Error for a non-2xx status, kept typed so retries can inspect it.
#[derive(Debug)]
pub struct StatusError {
    pub status: u16,
    pub body: String,
}

impl std::fmt::Display for StatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bridge answered with HTTP status {}", self.status)
    }
}

impl std::error::Error for StatusError {}

#[derive(Debug, Clone)]
pub struct HttpClient {
    host: String,
    port: u16,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.trim().to_string(),
            port: BRIDGE_HTTP_PORT,
            timeout: Duration::from_millis(BRIDGE_TIMEOUT_MS),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn get(&self, path: &str) -> Result<String> {
        self.request_with_retry("GET", path, None, MAX_RETRIES)
    }

    pub fn put(&self, path: &str, body: &str) -> Result<String> {
        self.request_with_retry("PUT", path, Some(body), MAX_RETRIES)
    }

    /// Send a request, retrying transient failures.
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - Absolute path including the API prefix
    /// * `body` - Optional JSON body
    /// * `max_retries` - Maximum number of attempts
    fn request_with_retry(
        &self,
        method: &str,
        path: &str,
        body: Option<&str>,
        max_retries: u32,
    ) -> Result<String> {
        let mut last_error = None;

        for attempt in 0..max_retries {
            match self.try_request(method, path, body) {
                Ok(response) => {
                    if attempt > 0 {
                        Log::log_debug(&format!(
                            "{} {} succeeded on attempt {}/{}",
                            method,
                            redact(path),
                            attempt + 1,
                            max_retries
                        ));
                    }
                    return Ok(response.body);
                }
                Err(e) => {
                    let error_type = classify_error(&e);
                    Log::log_debug(&format!(
                        "{} {} failed on attempt {}/{}: {:#}",
                        method,
                        redact(path),
                        attempt + 1,
                        max_retries,
                        e
                    ));
                    last_error = Some(e);

                    match error_type {
                        ErrorType::Temporary => {
                            if attempt + 1 < max_retries {
                                thread::sleep(Duration::from_millis(RETRY_DELAY_MS));
                            }
                        }
                        ErrorType::Permanent => break,
                    }
                }
            }
        }

        let error = last_error.unwrap_or_else(|| anyhow::anyhow!("no request attempted"));
        Err(error.context(format!(
            "{} {} on bridge {} failed",
            method,
            redact(path),
            self.host
        )))
    }

    /// Perform a single request without retry logic.
    fn try_request(&self, method: &str, path: &str, body: Option<&str>) -> Result<Response> {
        let address = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .with_context(|| format!("Failed to resolve bridge address {}", self.host))?
            .next()
            .with_context(|| format!("Bridge address {} did not resolve", self.host))?;

        let mut stream = TcpStream::connect_timeout(&address, self.timeout)
            .with_context(|| format!("Failed to connect to bridge at {}", address))?;
        stream
            .set_read_timeout(Some(self.timeout))
            .context("Failed to set read timeout")?;
        stream
            .set_write_timeout(Some(self.timeout))
            .context("Failed to set write timeout")?;

        stream
            .write_all(build_request(method, &self.host, path, body).as_bytes())
            .context("Failed to send request to bridge")?;

        let mut raw = Vec::new();
        stream
            .read_to_end(&mut raw)
            .context("Failed to read response from bridge")?;

        let response = parse_response(&raw)?;
        if !(200..300).contains(&response.status) {
            return Err(StatusError {
                status: response.status,
                body: response.body,
            }
            .into());
        }
        Ok(response)
    }
}

fn build_request(method: &str, host: &str, path: &str, body: Option<&str>) -> String {
    let mut request = format!(
        "{} {} HTTP/1.1\r\nHost: {}\r\nAccept: application/json\r\nConnection: close\r\n",
        method, path, host
    );
    match body {
        Some(body) => {
            request.push_str("Content-Type: application/json\r\n");
            request.push_str(&format!("Content-Length: {}\r\n\r\n", body.len()));
            request.push_str(body);
        }
        None => request.push_str("\r\n"),
    }
    request
}

/// Parse a complete HTTP/1.1 response as read until EOF.
pub fn parse_response(raw: &[u8]) -> Result<Response> {
    let split = raw
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .context("Malformed response: no end of headers")?;
    let head = std::str::from_utf8(&raw[..split]).context("Malformed response headers")?;
    let payload = &raw[split + 4..];

    let mut lines = head.split("\r\n");
    let status_line = lines.next().unwrap_or_default();
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
        .with_context(|| format!("Malformed status line '{}'", status_line))?;

    let mut chunked = false;
    let mut content_length = None;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if name.eq_ignore_ascii_case("transfer-encoding") {
            chunked = value.to_ascii_lowercase().contains("chunked");
        } else if name.eq_ignore_ascii_case("content-length") {
            content_length = value.parse::<usize>().ok();
        }
    }

    let body = if chunked {
        decode_chunked(payload)?
    } else {
        match content_length {
            Some(length) if length <= payload.len() => payload[..length].to_vec(),
            Some(length) => anyhow::bail!(
                "Truncated response: expected {} bytes, got {}",
                length,
                payload.len()
            ),
            None => payload.to_vec(),
        }
    };

    Ok(Response {
        status,
        body: String::from_utf8(body).context("Response body is not UTF-8")?,
    })
}

fn decode_chunked(mut payload: &[u8]) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    loop {
        let line_end = payload
            .windows(2)
            .position(|window| window == b"\r\n")
            .context("Malformed chunk header")?;
        let size_line = std::str::from_utf8(&payload[..line_end]).context("Malformed chunk size")?;
        let size_hex = size_line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_hex, 16)
            .with_context(|| format!("Malformed chunk size '{}'", size_hex))?;
        payload = &payload[line_end + 2..];

        if size == 0 {
            return Ok(body);
        }
        if payload.len() < size {
            anyhow::bail!("Truncated chunk: expected {} bytes, got {}", size, payload.len());
        }
        body.extend_from_slice(&payload[..size]);
        payload = payload.get(size + 2..).unwrap_or_default();
    }
}

/// Hide the username segment of `/api/<username>/...` in log output.
fn redact(path: &str) -> String {
    let mut segments: Vec<&str> = path.split('/').collect();
    if segments.len() > 2 && segments[1] == "api" {
        segments[2] = "***";
    }
    segments.join("/")
}

/// Classify an error to decide whether retrying makes sense.
fn classify_error(error: &anyhow::Error) -> ErrorType {
    if let Some(status) = error.downcast_ref::<StatusError>() {
        return if status.status >= 500 {
            ErrorType::Temporary
        } else {
            ErrorType::Permanent
        };
    }

    for cause in error.chain() {
        if let Some(io_error) = cause.downcast_ref::<std::io::Error>() {
            return match io_error.kind() {
                ErrorKind::PermissionDenied | ErrorKind::InvalidInput => ErrorType::Permanent,
                _ => ErrorType::Temporary,
            };
        }
    }

    ErrorType::Temporary
}
