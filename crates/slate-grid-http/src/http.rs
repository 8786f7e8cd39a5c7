use std::sync::Arc;

use http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use http::{HeaderValue, Method, Request, Response, StatusCode};
use serde_json::{Map, Value};
use slate_grid::{ExportFile, ExportOutcome, Grid, GridError, GridQuery, RequestContext};
use tracing::{debug, error};

pub const VIEWER_HEADER: &str = "x-viewer-id";
pub const SESSION_HEADER: &str = "x-session-id";

type GridFactory<Q> = Arc<dyn Fn() -> Grid<Q> + Send + Sync>;

/// Serves one grid over plain `http` types. A fresh [`Grid`] is built for
/// every request so state never leaks between requests.
pub struct GridHttp<Q: GridQuery> {
    factory: GridFactory<Q>,
}

impl<Q: GridQuery> Clone for GridHttp<Q> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<Q: GridQuery> GridHttp<Q> {
    pub fn new(factory: impl Fn() -> Grid<Q> + Send + Sync + 'static) -> Self {
        Self {
            factory: Arc::new(factory),
        }
    }

    pub async fn handle(&self, req: Request<Vec<u8>>) -> Response<Vec<u8>> {
        match req.method() {
            &Method::GET | &Method::POST => self.render(&req).await,
            _ => error_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed"),
        }
    }

    async fn render(&self, req: &Request<Vec<u8>>) -> Response<Vec<u8>> {
        let ctx = match request_context(req) {
            Ok(ctx) => ctx,
            Err(e) => return error_response(e.status_code(), &e.to_string()),
        };

        let mut grid = (self.factory)();
        let outcome = match ctx.export_type() {
            Some(_) => grid.export(&ctx).await,
            None => grid.render(&ctx).await.map(ExportOutcome::Rendered),
        };

        match outcome {
            Ok(ExportOutcome::Rendered(body)) => json_response(StatusCode::OK, body.to_string()),
            Ok(ExportOutcome::File(file)) => file_response(file),
            Err(e) => {
                error!(path = req.uri().path(), error = %e, "grid request failed");
                error_response(e.status_code(), &e.to_string())
            }
        }
    }
}

fn request_context(req: &Request<Vec<u8>>) -> Result<RequestContext, GridError> {
    let mut ctx = RequestContext::new().with_query_string(req.uri().query().unwrap_or(""));

    if !req.body().is_empty() {
        let body: Map<String, Value> = serde_json::from_slice(req.body())?;
        ctx = ctx.with_body(body);
    }
    if let Some(viewer) = header(req, VIEWER_HEADER) {
        ctx = ctx.with_viewer(viewer);
    }
    if let Some(session) = header(req, SESSION_HEADER) {
        ctx = ctx.with_session(session);
    }
    debug!(
        path = req.uri().path(),
        viewer = ctx.viewer.as_deref(),
        "grid request"
    );
    Ok(ctx)
}

fn header<'a, T>(req: &'a Request<T>, name: &str) -> Option<&'a str> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

fn file_response(file: ExportFile) -> Response<Vec<u8>> {
    let disposition = format!("attachment; filename={}", file.filename);
    let (Ok(disposition), Ok(content_type)) = (
        HeaderValue::from_str(&disposition),
        HeaderValue::from_str(&file.content_type),
    ) else {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "export produced an invalid header",
        );
    };

    let mut response = Response::new(file.bytes);
    response.headers_mut().insert(CONTENT_TYPE, content_type);
    response
        .headers_mut()
        .insert(CONTENT_DISPOSITION, disposition);
    response
}

fn json_response(status: StatusCode, body: impl Into<Vec<u8>>) -> Response<Vec<u8>> {
    let mut response = Response::new(body.into());
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn error_response(status: StatusCode, message: &str) -> Response<Vec<u8>> {
    let body = serde_json::json!({ "error": message });
    json_response(status, body.to_string().into_bytes())
}
