// src/server/file_server.rs

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

use crate::errors::{FeedpipeError, Result};
use crate::server::ServerSettings;

/// Cache-Control sent with every artifact response.
pub const NO_CACHE: &str = "no-store, no-cache, must-revalidate, proxy-revalidate, max-age=0";

#[derive(Debug)]
struct ArtifactRoute {
    root: PathBuf,
    suffix: String,
    content_type: &'static str,
}

/// Content type announced for artifacts with the given extension.
pub fn content_type_for(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "xml" | "rss" => "application/xml",
        "atom" => "application/atom+xml",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

/// Router with two effective routes:
/// - paths ending in the artifact extension: the file's bytes with an
///   explicit content type and no-cache headers (404/500 carry the same
///   headers)
/// - anything else: plain static file serving from the static root
pub fn build_router(settings: &ServerSettings) -> Router {
    let route = Arc::new(ArtifactRoute {
        root: settings.static_root.clone(),
        suffix: format!(".{}", settings.artifact_extension),
        content_type: content_type_for(&settings.artifact_extension),
    });

    Router::new()
        .fallback_service(ServeDir::new(&settings.static_root))
        .layer(middleware::from_fn_with_state(route, serve_artifact))
}

async fn serve_artifact(
    State(route): State<Arc<ArtifactRoute>>,
    request: Request,
    next: Next,
) -> Response {
    let is_read = matches!(*request.method(), Method::GET | Method::HEAD);
    if !is_read || !request.uri().path().ends_with(&route.suffix) {
        return next.run(request).await;
    }

    let uri_path = request.uri().path();
    debug!(path = %uri_path, "serving artifact request");

    let Some(file) = resolve_under(&route.root, uri_path) else {
        return artifact_response(&route, StatusCode::NOT_FOUND, Body::from("Not Found"));
    };

    match tokio::fs::read(&file).await {
        Ok(bytes) => artifact_response(&route, StatusCode::OK, Body::from(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            artifact_response(&route, StatusCode::NOT_FOUND, Body::from("Not Found"))
        }
        Err(e) => {
            warn!(file = ?file, error = %e, "failed to read artifact");
            artifact_response(
                &route,
                StatusCode::INTERNAL_SERVER_ERROR,
                Body::from("Internal Server Error"),
            )
        }
    }
}

fn artifact_response(route: &ArtifactRoute, status: StatusCode, body: Body) -> Response {
    (
        status,
        [
            (header::CONTENT_TYPE, route.content_type),
            (header::CACHE_CONTROL, NO_CACHE),
            (header::PRAGMA, "no-cache"),
            (header::EXPIRES, "0"),
        ],
        body,
    )
        .into_response()
}

/// Map a request path onto the static root. `None` for paths that try to
/// leave it.
fn resolve_under(root: &Path, uri_path: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for segment in uri_path.split('/').filter(|s| !s.is_empty()) {
        if segment == "." || segment == ".." || segment.contains('\\') {
            return None;
        }
        path.push(segment);
    }
    Some(path)
}

/// A running file server.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Arc<Notify>,
    join: JoinHandle<std::io::Result<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_alive(&self) -> bool {
        !self.join.is_finished()
    }

    /// Hard stop: signal graceful shutdown, let in-flight requests drain for
    /// up to `grace`, then abort the accept loop. The listener is closed
    /// when this returns.
    pub async fn shutdown(self, grace: Duration) {
        self.shutdown.notify_one();
        let mut join = self.join;

        match tokio::time::timeout(grace, &mut join).await {
            Ok(Ok(Ok(()))) => info!(addr = %self.local_addr, "file server stopped"),
            Ok(Ok(Err(e))) => warn!(addr = %self.local_addr, error = %e, "file server exited with error"),
            Ok(Err(e)) => warn!(addr = %self.local_addr, error = %e, "file server task failed"),
            Err(_) => {
                warn!(
                    addr = %self.local_addr,
                    grace_ms = grace.as_millis() as u64,
                    "grace period elapsed; aborting file server"
                );
                join.abort();
                let _ = join.await;
            }
        }
    }

    /// Soft stop: stop tracking the server but leave the listener running
    /// until the process exits.
    pub fn detach(self) {
        warn!(
            addr = %self.local_addr,
            "file server detached; it keeps accepting connections until the process exits"
        );
    }
}

/// Bind the listener and spawn the accept loop.
///
/// Bind failures are returned, never swallowed: an occupied port is
/// [`FeedpipeError::PortInUse`].
pub async fn start_file_server(settings: &ServerSettings) -> Result<ServerHandle> {
    let addr = format!("{}:{}", settings.bind_address, settings.port);
    let listener = TcpListener::bind(&addr).await.map_err(|source| {
        if source.kind() == ErrorKind::AddrInUse {
            FeedpipeError::PortInUse {
                port: settings.port,
            }
        } else {
            FeedpipeError::ServerBind {
                addr: addr.clone(),
                source,
            }
        }
    })?;
    let local_addr = listener.local_addr()?;

    let app = build_router(settings);
    let shutdown = Arc::new(Notify::new());
    let signal = Arc::clone(&shutdown);

    let join = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { signal.notified().await })
            .await
    });

    info!(
        addr = %local_addr,
        root = ?settings.static_root,
        "file server started"
    );

    Ok(ServerHandle {
        local_addr,
        shutdown,
        join,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_rejects_traversal() {
        let root = Path::new("/srv/static");
        assert_eq!(
            resolve_under(root, "/uglyfeed.xml"),
            Some(PathBuf::from("/srv/static/uglyfeed.xml"))
        );
        assert_eq!(
            resolve_under(root, "/feeds//daily.xml"),
            Some(PathBuf::from("/srv/static/feeds/daily.xml"))
        );
        assert_eq!(resolve_under(root, "/../etc/passwd.xml"), None);
    }

    #[test]
    fn xml_extension_maps_to_xml_content_type() {
        assert_eq!(content_type_for("xml"), "application/xml");
        assert_eq!(content_type_for("XML"), "application/xml");
        assert_eq!(content_type_for("bin"), "application/octet-stream");
    }
}
