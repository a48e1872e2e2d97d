//! Single-page web application serving the persisted model.
//!
//! Requests are handled one at a time on the calling thread; the model is
//! loaded once by [`AppState::load`] and never mutated afterwards.

pub mod charts;
pub mod eda;
pub mod forms;
pub mod render;
mod routes;

use std::io::Read;
use std::net::SocketAddr;

use thiserror::Error;
use tiny_http::{Header, Response, Server};

use crate::config::Settings;
use crate::store::{self, ModelArtifact};

pub use routes::{Reply, handle};

/// Errors raised while starting or running the web process.
#[derive(Debug, Error)]
pub enum WebError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("Server address is not an IP socket")]
    NotIp,
}

/// Settings plus the model loaded at startup.
pub struct AppState {
    pub settings: Settings,
    /// The artifact, or the readable reason it could not be loaded.
    pub model: Result<ModelArtifact, String>,
}

impl AppState {
    /// Load the configured model; failures are kept for display instead of aborting.
    pub fn load(settings: Settings) -> Self {
        let model = match store::load(&settings.model.path) {
            Ok(artifact) => {
                tracing::info!(
                    "Loaded {} model {} ({} features)",
                    artifact.kind(),
                    artifact.model_id,
                    artifact.feature_names().len()
                );
                Ok(artifact)
            }
            Err(err) => {
                tracing::error!("{err}");
                Err(err.to_string())
            }
        };
        Self { settings, model }
    }

    pub fn with_model(settings: Settings, artifact: ModelArtifact) -> Self {
        Self {
            settings,
            model: Ok(artifact),
        }
    }

    pub(crate) fn model_status(&self) -> render::ModelStatus<'_> {
        self.model.as_ref().map_err(String::as_str)
    }
}

/// Blocking HTTP server bound to one address.
pub struct WebServer {
    server: Server,
    state: AppState,
}

impl WebServer {
    pub fn bind(state: AppState, addr: &str) -> Result<Self, WebError> {
        let server = Server::http(addr).map_err(|source| WebError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        Ok(Self { server, state })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, WebError> {
        self.server.server_addr().to_ip().ok_or(WebError::NotIp)
    }

    /// Answer requests until the listener shuts down.
    pub fn serve(&self) {
        if let Ok(addr) = self.local_addr() {
            tracing::info!("Serving on http://{addr}");
        }
        for request in self.server.incoming_requests() {
            self.respond(request);
        }
    }

    fn respond(&self, mut request: tiny_http::Request) {
        let method = request.method().as_str().to_string();
        let url = request.url().to_string();
        let content_type = request
            .headers()
            .iter()
            .find(|header| header.field.equiv("Content-Type"))
            .map(|header| header.value.as_str().to_string());
        let limit = self.state.settings.server.max_upload_bytes;

        let reply = match read_body(&mut request, limit) {
            Ok(body) => handle(&self.state, &method, &url, content_type.as_deref(), &body),
            Err(BodyError::TooLarge) => Reply::error(
                413,
                "Upload too large",
                &format!("Request bodies are limited to {limit} bytes."),
            ),
            Err(BodyError::Io(err)) => Reply::error(400, "Bad request", &err.to_string()),
        };
        tracing::debug!("{method} {url} -> {}", reply.status);

        let mut response = Response::from_data(reply.body).with_status_code(reply.status);
        if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
            response = response.with_header(header);
        }
        if let Some(name) = reply.attachment {
            let value = format!("attachment; filename=\"{name}\"");
            if let Ok(header) = Header::from_bytes(&b"Content-Disposition"[..], value.as_bytes()) {
                response = response.with_header(header);
            }
        }
        if let Err(err) = request.respond(response) {
            tracing::warn!("Failed to send response for {url}: {err}");
        }
    }
}

enum BodyError {
    TooLarge,
    Io(std::io::Error),
}

fn read_body(request: &mut tiny_http::Request, limit: usize) -> Result<Vec<u8>, BodyError> {
    if request.body_length().is_some_and(|len| len > limit) {
        return Err(BodyError::TooLarge);
    }
    let mut body = Vec::new();
    request
        .as_reader()
        .take(limit as u64 + 1)
        .read_to_end(&mut body)
        .map_err(BodyError::Io)?;
    if body.len() > limit {
        return Err(BodyError::TooLarge);
    }
    Ok(body)
}
