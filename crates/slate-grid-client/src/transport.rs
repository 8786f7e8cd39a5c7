use serde_json::{Map, Value};
use ureq::Agent;

use crate::error::ClientError;

/// Carries one grid request to the server and returns its JSON response.
pub trait Transport {
    fn send(&self, route: &str, body: &Map<String, Value>) -> Result<Value, ClientError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, route: &str, body: &Map<String, Value>) -> Result<Value, ClientError> {
        (**self).send(route, body)
    }
}

/// Blocking HTTP transport. Routes are resolved against `base_url`.
pub struct UreqTransport {
    agent: Agent,
    base_url: String,
    viewer: Option<String>,
    session: Option<String>,
}

impl UreqTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        let config = Agent::config_builder().http_status_as_error(false).build();
        Self {
            agent: config.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            viewer: None,
            session: None,
        }
    }

    pub fn with_viewer(mut self, viewer: impl Into<String>) -> Self {
        self.viewer = Some(viewer.into());
        self
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    fn url(&self, route: &str) -> String {
        if route.starts_with("http://") || route.starts_with("https://") {
            return route.to_string();
        }
        format!("{}/{}", self.base_url, route.trim_start_matches('/'))
    }
}

impl Transport for UreqTransport {
    fn send(&self, route: &str, body: &Map<String, Value>) -> Result<Value, ClientError> {
        let payload = serde_json::to_vec(body)?;
        let mut request = self
            .agent
            .post(&self.url(route))
            .header("content-type", "application/json");
        if let Some(viewer) = &self.viewer {
            request = request.header("x-viewer-id", viewer);
        }
        if let Some(session) = &self.session {
            request = request.header("x-session-id", session);
        }

        let response = request.send(&payload[..])?;
        let status = response.status().as_u16();
        let bytes = response.into_body().read_to_vec()?;
        parse_response(status, &bytes)
    }
}

/// Decodes a grid response, turning `{"error": ...}` bodies on non-2xx
/// statuses into [`ClientError::Server`].
pub(crate) fn parse_response(status: u16, bytes: &[u8]) -> Result<Value, ClientError> {
    if (200..300).contains(&status) {
        return Ok(serde_json::from_slice(bytes)?);
    }
    let message = serde_json::from_slice::<Value>(bytes)
        .ok()
        .and_then(|body| body.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| String::from_utf8_lossy(bytes).into_owned());
    Err(ClientError::Server { status, message })
}
