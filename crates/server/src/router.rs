//! Request routing: SEO files, static tree, cache, then upstream.
//!
//! ### Resolution Order (first match wins)
//! 1. `/sitemap.xml` and `/robots.txt` from the SEO directory
//! 2. A file, or a directory's `index.html`, under the static directory
//! 3. A cached page
//! 4. The "unavailable" page when remote fetching is off
//! 5. Fetch, rewrite, cache and serve; otherwise an "empty" or "not found" page
//!
//! Clients only ever see 200 or 404.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{self, HeaderName};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use lazarus_core::RequestPath;

use crate::pages::NotServed;
use crate::state::{AppState, MirrorOutcome};
use crate::static_files::{self, SeoFile};

/// Content type of every generated or cached page.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

const X_ROBOTS_TAG: HeaderName = HeaderName::from_static("x-robots-tag");
const INDEX_FOLLOW: &str = "index, follow";

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(serve))
        .route("/{*path}", get(serve))
        .with_state(state)
}

/// Serve one request.
pub async fn serve(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    let path = match RequestPath::parse(uri.path()) {
        Ok(path) => path,
        Err(e) => {
            tracing::debug!(path = uri.path(), "rejecting: {e}");
            return html(StatusCode::NOT_FOUND, NotServed::NotFound.render(uri.path()));
        }
    };

    if let Some(seo) = SeoFile::from_path(&path)
        && let Some(bytes) = seo.read(&state.config.seo_dir).await
    {
        tracing::debug!(%path, source = "seo", "serving");
        return file(seo.content_type(), bytes);
    }

    if let Some(local) = static_files::resolve(&state.config.static_dir, &path).await {
        return match tokio::fs::read(&local).await {
            Ok(bytes) => {
                tracing::debug!(%path, source = "static", file = %local.display(), "serving");
                file(static_files::content_type_for(&local), bytes)
            }
            Err(e) => {
                tracing::warn!(%path, file = %local.display(), "failed to read static file: {e}");
                html(StatusCode::NOT_FOUND, NotServed::NotFound.render(&path))
            }
        };
    }

    match state.store.get(&path).await {
        Ok(Some(page)) => {
            tracing::info!(%path, source = "cache", "serving");
            return html(StatusCode::OK, page);
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(%path, "cache lookup failed: {e}"),
    }

    if !state.config.remote_fetch_enabled() {
        tracing::info!(%path, source = "unavailable", "remote fetch disabled");
        return html(StatusCode::NOT_FOUND, NotServed::RemoteDisabled.render(&path));
    }

    match state.mirror(&path).await {
        MirrorOutcome::Page(page) => {
            tracing::info!(%path, source = "fetch", bytes = page.len(), "serving");
            html(StatusCode::OK, String::from(&*page))
        }
        MirrorOutcome::Empty => {
            tracing::info!(%path, source = "fetch", "archived content empty");
            html(StatusCode::NOT_FOUND, NotServed::ArchiveEmpty.render(&path))
        }
        MirrorOutcome::Failed(status) => {
            tracing::info!(%path, source = "fetch", status, "not found upstream");
            html(StatusCode::NOT_FOUND, NotServed::NotFound.render(&path))
        }
    }
}

fn html(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, HTML_CONTENT_TYPE), (X_ROBOTS_TAG, INDEX_FOLLOW)], body).into_response()
}

fn file(content_type: &'static str, bytes: Vec<u8>) -> Response {
    let mut response = (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], Body::from(bytes)).into_response();
    if content_type == "text/html" {
        response
            .headers_mut()
            .insert(X_ROBOTS_TAG, header::HeaderValue::from_static(INDEX_FOLLOW));
    }
    response
}
