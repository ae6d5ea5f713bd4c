//! HTTP-over-Unix-socket server that dispatches plugin verbs to a
//! [`VolumePlugin`].
//!
//! The dispatcher decodes, calls the plugin and encodes. It holds no volume
//! logic of its own.

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info, warn};

use crate::error::VolumeError;
use crate::plugin::VolumePlugin;
use crate::protocol::*;

/// Pause after a failed `accept` so a persistent error (e.g. `EMFILE`) does
/// not spin the loop.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Unix listener that logs and skips failed accepts instead of ending the
/// serve loop.
pub struct PluginListener {
    inner: UnixListener,
}

impl PluginListener {
    pub fn new(inner: UnixListener) -> Self {
        Self { inner }
    }
}

impl axum::serve::Listener for PluginListener {
    type Io = UnixStream;
    type Addr = tokio::net::unix::SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        loop {
            match self.inner.accept().await {
                Ok((stream, addr)) => {
                    debug!("plugin connection accepted");
                    return (stream, addr);
                }
                Err(e) => {
                    warn!(error = %e, "failed to accept plugin connection");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            }
        }
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        self.inner.local_addr()
    }
}

/// Serves the Docker volume plugin protocol for a [`VolumePlugin`].
pub struct PluginServer<T> {
    listener: PluginListener,
    handler: Arc<T>,
}

impl<T> PluginServer<T>
where
    T: VolumePlugin + 'static,
{
    /// Wrap an already bound listener. Socket placement and permissions are
    /// the caller's concern.
    pub fn new(listener: UnixListener, handler: Arc<T>) -> Self {
        Self {
            listener: PluginListener::new(listener),
            handler,
        }
    }

    /// Build the verb router. Each connection is served on its own task.
    pub fn router(handler: Arc<T>) -> Router {
        Router::new()
            .route(ACTIVATE_PATH, post(activate))
            .route(CREATE_PATH, post(create::<T>))
            .route(REMOVE_PATH, post(remove::<T>))
            .route(MOUNT_PATH, post(mount::<T>))
            .route(UNMOUNT_PATH, post(unmount::<T>))
            .route(PATH_PATH, post(path::<T>))
            .route(GET_PATH, post(get::<T>))
            .route(LIST_PATH, post(list::<T>))
            .route(CAPABILITIES_PATH, post(capabilities::<T>))
            .fallback(unknown_method)
            .with_state(handler)
    }

    /// Serve until the process exits.
    pub async fn serve(self) -> Result<(), VolumeError> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Serve until `signal` resolves, then drain in-flight requests.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<(), VolumeError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("volume plugin server listening");
        let app = Self::router(self.handler);
        axum::serve(self.listener, app)
            .with_graceful_shutdown(signal)
            .await
            .map_err(VolumeError::internal)?;
        info!("volume plugin server stopped");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Encoding helpers
// ---------------------------------------------------------------------------

fn reply<R: Serialize>(status: StatusCode, body: &R) -> Response {
    match serde_json::to_vec(body) {
        Ok(bytes) => (status, [(header::CONTENT_TYPE, PLUGIN_CONTENT_TYPE)], bytes).into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode plugin response");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, PLUGIN_CONTENT_TYPE)],
                r#"{"Err":"internal error: failed to encode response"}"#,
            )
                .into_response()
        }
    }
}

fn failure(err: &VolumeError) -> Response {
    warn!(error = %err, kind = ?err.kind(), "plugin request failed");
    reply(
        StatusCode::INTERNAL_SERVER_ERROR,
        &ErrorResponse::new(err.to_string()),
    )
}

fn respond<R: Serialize>(result: Result<R, VolumeError>) -> Response {
    match result {
        Ok(body) => reply(StatusCode::OK, &body),
        Err(e) => failure(&e),
    }
}

fn decode<R: DeserializeOwned>(body: &Bytes) -> Result<R, Response> {
    serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "malformed plugin request");
        reply(
            StatusCode::BAD_REQUEST,
            &ErrorResponse::new(format!("malformed request: {e}")),
        )
    })
}

/// Run `fut` on its own task so that a client hanging up cannot cancel a
/// mount or unmount halfway.
async fn detached<F, R>(fut: F) -> Result<R, VolumeError>
where
    F: Future<Output = Result<R, VolumeError>> + Send + 'static,
    R: Send + 'static,
{
    tokio::spawn(fut).await.map_err(VolumeError::internal)?
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn activate() -> Response {
    debug!("plugin activated");
    reply(StatusCode::OK, &ActivateResponse::default())
}

async fn create<T: VolumePlugin + 'static>(State(plugin): State<Arc<T>>, body: Bytes) -> Response {
    let req: CreateVolumeRequest = match decode(&body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    debug!(volume = %req.name, "VolumeDriver.Create");
    let result = plugin
        .create(&req.name, req.opts.unwrap_or_default())
        .await
        .map(|()| ErrorResponse::default());
    respond(result)
}

async fn remove<T: VolumePlugin + 'static>(State(plugin): State<Arc<T>>, body: Bytes) -> Response {
    let req: NameRequest = match decode(&body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    debug!(volume = %req.name, "VolumeDriver.Remove");
    let result = plugin
        .remove(&req.name)
        .await
        .map(|()| ErrorResponse::default());
    respond(result)
}

async fn mount<T: VolumePlugin + 'static>(State(plugin): State<Arc<T>>, body: Bytes) -> Response {
    let req: MountVolumeRequest = match decode(&body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    debug!(volume = %req.name, id = %req.id, "VolumeDriver.Mount");
    let result = detached(async move { plugin.mount(&req.name, &req.id).await })
        .await
        .map(|path| MountpointResponse::new(Some(&path)));
    respond(result)
}

async fn unmount<T: VolumePlugin + 'static>(State(plugin): State<Arc<T>>, body: Bytes) -> Response {
    let req: MountVolumeRequest = match decode(&body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    debug!(volume = %req.name, id = %req.id, "VolumeDriver.Unmount");
    let result = detached(async move { plugin.unmount(&req.name, &req.id).await })
        .await
        .map(|()| ErrorResponse::default());
    respond(result)
}

async fn path<T: VolumePlugin + 'static>(State(plugin): State<Arc<T>>, body: Bytes) -> Response {
    let req: NameRequest = match decode(&body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let result = plugin
        .path(&req.name)
        .await
        .map(|p| MountpointResponse::new(p.as_deref()));
    respond(result)
}

async fn get<T: VolumePlugin + 'static>(State(plugin): State<Arc<T>>, body: Bytes) -> Response {
    let req: NameRequest = match decode(&body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let result = plugin.get(&req.name).await.map(|v| GetResponse {
        volume: WireVolume::from(&v),
        err: String::new(),
    });
    respond(result)
}

async fn list<T: VolumePlugin + 'static>(State(plugin): State<Arc<T>>) -> Response {
    let result = plugin.list().await.map(|vols| ListResponse {
        volumes: vols.iter().map(WireVolume::from).collect(),
        err: String::new(),
    });
    respond(result)
}

async fn capabilities<T: VolumePlugin + 'static>(State(plugin): State<Arc<T>>) -> Response {
    reply(
        StatusCode::OK,
        &CapabilitiesResponse {
            capabilities: plugin.capabilities(),
        },
    )
}

async fn unknown_method(uri: Uri) -> Response {
    warn!(%uri, "unknown plugin method");
    reply(
        StatusCode::NOT_FOUND,
        &ErrorResponse::new(format!("unknown plugin method {}", uri.path())),
    )
}
