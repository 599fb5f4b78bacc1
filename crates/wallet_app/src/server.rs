//! Static file server for the built front-end.
//!
//! Serves files from a build directory plus one dynamic endpoint,
//! `/env.js`, which assigns the public configuration to `window.__ENV__`.
//! Requests are parsed straight off the TCP stream.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde_json::{Map, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};
use wallet_chain::NetworkRegistry;
use wallet_core::WalletConfig;
use wallet_core::config::rpc_env_var;

const ENV_SCRIPT_PATH: &str = "/env.js";
const INDEX_FILE: &str = "index.html";
const MAX_REQUEST_BYTES: usize = 8192;

// ── Responses ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Response {
    fn ok(content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type,
            body,
        }
    }

    fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.as_bytes().to_vec(),
        }
    }

    fn not_found() -> Self {
        Self::text(404, "404 Not Found")
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            500 => "Internal Server Error",
            _ => "Unknown",
        }
    }

    fn to_bytes(&self, include_body: bool) -> Vec<u8> {
        let mut out = format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: {}\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n",
            self.status,
            self.reason(),
            self.content_type,
            self.body.len(),
        )
        .into_bytes();
        if include_body {
            out.extend_from_slice(&self.body);
        }
        out
    }
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "html" | "htm" => "text/html; charset=utf-8",
        "js" | "mjs" => "application/javascript; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "json" | "map" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "wasm" => "application/wasm",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

// ── env.js ───────────────────────────────────────────────────────────

/// `window.__ENV__ = {...};` with the values the browser may see. The
/// private key is never included.
pub fn env_script(config: &WalletConfig, networks: &NetworkRegistry) -> String {
    let mut env = Map::new();
    env.insert("DEFAULT_NETWORK".into(), Value::String(config.default_network.clone()));
    if let Some(id) = &config.walletconnect_project_id {
        env.insert("WALLETCONNECT_PROJECT_ID".into(), Value::String(id.clone()));
    }
    if let Some(url) = &config.deploy_api_url {
        env.insert("DEPLOY_API_URL".into(), Value::String(url.clone()));
    }
    for network in networks.all() {
        env.insert(rpc_env_var(&network.id), Value::String(network.rpc_url.clone()));
    }
    format!("window.__ENV__ = {};", Value::Object(env))
}

// ── Request handling ─────────────────────────────────────────────────

/// Minimal percent-decoding (handles `%XX` sequences).
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && let Some(byte) = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
        {
            out.push(byte);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Map a request path onto a file under `root`. `None` when the path tries
/// to leave the root.
fn resolve(root: &Path, request_path: &str) -> Option<PathBuf> {
    let path = request_path.split(['?', '#']).next().unwrap_or("/");
    let decoded = percent_decode(path);
    let relative = decoded.trim_start_matches('/');

    let mut resolved = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if relative.is_empty() || decoded.ends_with('/') {
        resolved.push(INDEX_FILE);
    }
    Some(resolved)
}

pub struct StaticServer {
    root: PathBuf,
    env_script: String,
}

impl StaticServer {
    pub fn new(root: impl Into<PathBuf>, env_script: String) -> Self {
        Self {
            root: root.into(),
            env_script,
        }
    }

    /// Produce the response for one request line.
    pub async fn respond(&self, method: &str, path: &str) -> Response {
        if method != "GET" && method != "HEAD" {
            return Response::text(405, "405 Method Not Allowed");
        }
        if path.split('?').next() == Some(ENV_SCRIPT_PATH) {
            return Response::ok(
                "application/javascript; charset=utf-8",
                self.env_script.clone().into_bytes(),
            );
        }

        let Some(file) = resolve(&self.root, path) else {
            warn!(path, "rejected path outside the build directory");
            return Response::not_found();
        };
        match tokio::fs::read(&file).await {
            Ok(body) => Response::ok(content_type(&file), body),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Response::not_found(),
            Err(e) if file.is_dir() => {
                debug!(path = %file.display(), error = %e, "directory requested");
                Response::not_found()
            }
            Err(e) => {
                error!(path = %file.display(), error = %e, "failed to read file");
                Response::text(500, "500 Internal Server Error")
            }
        }
    }

    async fn handle_connection(&self, mut stream: TcpStream) -> anyhow::Result<()> {
        let mut buf = vec![0u8; MAX_REQUEST_BYTES];
        let n = stream
            .read(&mut buf)
            .await
            .context("Failed to read request")?;
        let request = String::from_utf8_lossy(&buf[..n]);
        let request_line = request.lines().next().unwrap_or("");
        let mut parts = request_line.split_whitespace();

        let (response, include_body) = match (parts.next(), parts.next()) {
            (Some(method), Some(path)) => {
                debug!(method, path, "request");
                (self.respond(method, path).await, method != "HEAD")
            }
            _ => (Response::text(400, "400 Bad Request"), true),
        };

        stream
            .write_all(&response.to_bytes(include_body))
            .await
            .context("Failed to write response")?;
        stream.flush().await.context("Failed to flush response")?;
        Ok(())
    }

    /// Accept connections until the task is dropped.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> anyhow::Result<()> {
        info!(
            root = %self.root.display(),
            addr = %listener.local_addr()?,
            "static server listening"
        );
        loop {
            let (stream, addr) = listener.accept().await.context("Failed to accept connection")?;
            let server = self.clone();
            tokio::spawn(async move {
                if let Err(e) = server.handle_connection(stream).await {
                    warn!(%addr, error = %e, "connection failed");
                }
            });
        }
    }
}
