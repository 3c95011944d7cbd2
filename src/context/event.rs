use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, MatchedPath, Path, Request},
    http::{header, request::Parts, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http_body_util::LengthLimitError;
use serde::Serialize;
use serde_json::Value;
use std::{
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{debug, error, info, warn};

use super::{
    input::{Input, Params},
    output::{Output, HTML_CONTENT_TYPE},
};
use crate::{
    error::AppError,
    handlers::AppState,
    metrics,
    render::{RenderError, Renderer},
    snowflake::{IdError, IdGenerator},
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Event is created on every request and models the request being served.
///
/// It carries the identifier allocated for the request, the client's
/// [`Input`], the [`Output`] the handler writes into, and the timing and
/// size figures reported once the response is produced.
pub struct Event {
    id: u64,
    /// Incoming body bytes
    pub request_content_length: usize,
    /// Outgoing body bytes, set when the event concludes
    pub response_content_length: usize,
    pub start_time: DateTime<Utc>,
    started: Instant,
    /// Set when the event concludes
    pub duration: Option<Duration>,
    pub status_code: StatusCode,
    pub input: Input,
    pub output: Output,
    pub request: Parts,
    renderer: Arc<dyn Renderer>,
}

/// Serializable view of an event's figures
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    #[serde(rename = "requestID")]
    pub request_id: u64,
    pub method: String,
    pub path: String,
    pub request_content_length: usize,
    pub response_content_length: usize,
    pub start_time: DateTime<Utc>,
    pub duration_ms: Option<u128>,
    pub status_code: u16,
}

impl Event {
    /// Build the event for one request
    ///
    /// Fails only when `ids` cannot produce an identifier; no event is ever
    /// created with a substitute id.
    pub fn new(
        ids: &dyn IdGenerator,
        renderer: Arc<dyn Renderer>,
        request: Parts,
        params: Params,
        body: Bytes,
    ) -> Result<Self, IdError> {
        let start_time = Utc::now();
        let started = Instant::now();
        let id = ids.next_id()?;

        Ok(Self {
            id,
            request_content_length: body.len(),
            response_content_length: 0,
            start_time,
            started,
            duration: None,
            status_code: StatusCode::OK,
            input: Input::new(&request.uri, params, body),
            output: Output::new(),
            request,
            renderer,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Render the HTML view `name` (no file extension) into the output
    ///
    /// On failure the renderer's error is returned as is and the output
    /// body is left untouched.
    pub fn html(&mut self, name: &str, args: &Value) -> Result<(), RenderError> {
        let content = match self.renderer.render(name, args) {
            Ok(content) => content,
            Err(e) => {
                warn!(request_id = self.id, view = %name, error = %e, "View render failed");
                metrics::record_render_error(name);
                return Err(e);
            }
        };

        self.output.content_type(HTML_CONTENT_TYPE);
        self.output.body(content);

        Ok(())
    }

    /// Render `template` inside `layout`
    ///
    /// Layout composition is not supported; this leaves the event unchanged.
    pub fn layout_html(&mut self, layout: &str, template: &str, _args: &Value) {
        debug!(
            request_id = self.id,
            layout = %layout,
            template = %template,
            "Layout rendering is not supported, output left unchanged"
        );
    }

    /// Replace the output with the JSON error document for `err`
    ///
    /// The event still concludes normally, so failed requests keep their
    /// request id, access log line and metrics.
    pub fn fail(&mut self, err: AppError) {
        let status = err.status();
        if status.is_server_error() {
            error!(request_id = self.id, error = %err, "Request failed");
        } else {
            debug!(request_id = self.id, error = %err, "Request rejected");
        }

        // Serializing a `serde_json::Value` cannot fail
        let body = serde_json::to_vec(&err.body()).unwrap_or_default();

        self.output = Output::new();
        self.output.status(status);
        self.output.content_type(JSON_CONTENT_TYPE);
        self.output.body(body);
    }

    /// Record the figures known once the handler is done
    pub fn finish(&mut self) {
        self.duration = Some(self.started.elapsed());
        self.status_code = self.output.status_code();
        self.response_content_length = self.output.len();
    }

    pub fn summary(&self) -> EventSummary {
        EventSummary {
            request_id: self.id,
            method: self.request.method.to_string(),
            path: self.request.uri.path().to_string(),
            request_content_length: self.request_content_length,
            response_content_length: self.response_content_length,
            start_time: self.start_time,
            duration_ms: self.duration.map(|d| d.as_millis()),
            status_code: self.status_code.as_u16(),
        }
    }

    fn route(&self) -> &str {
        self.request
            .extensions
            .get::<MatchedPath>()
            .map(MatchedPath::as_str)
            .unwrap_or("unmatched")
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("id", &self.id)
            .field("method", &self.request.method)
            .field("uri", &self.request.uri)
            .field("status_code", &self.status_code)
            .field("request_content_length", &self.request_content_length)
            .field("response_content_length", &self.response_content_length)
            .field("duration", &self.duration)
            .finish_non_exhaustive()
    }
}

impl IntoResponse for Event {
    fn into_response(mut self) -> Response {
        self.finish();

        let duration = self.duration.unwrap_or_default();
        info!(
            request_id = self.id,
            method = %self.request.method,
            path = %self.request.uri.path(),
            status = self.status_code.as_u16(),
            bytes_in = self.request_content_length,
            bytes_out = self.response_content_length,
            duration_ms = duration.as_millis(),
            "Request completed"
        );

        metrics::record_event(
            self.request.method.as_str(),
            self.route(),
            self.status_code.as_u16(),
            duration,
            self.request_content_length,
            self.response_content_length,
        );

        self.output.header(
            HeaderName::from_static(REQUEST_ID_HEADER),
            HeaderValue::from(self.id),
        );
        self.output.into_response()
    }
}

#[async_trait]
impl FromRequest<AppState> for Event {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();

        let params = match Option::<Path<Vec<(String, String)>>>::from_request_parts(
            &mut parts, state,
        )
        .await
        {
            Ok(Some(Path(params))) => Params::new(params),
            _ => Params::default(),
        };

        let declared_length = parts
            .headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if matches!(declared_length, Some(len) if len > state.body_limit) {
            return Err(AppError::PayloadTooLarge(format!(
                "Request body exceeds {} bytes",
                state.body_limit
            )));
        }

        let body = axum::body::to_bytes(body, state.body_limit)
            .await
            .map_err(|e| {
                if is_length_limit(&e) {
                    AppError::PayloadTooLarge(format!(
                        "Request body exceeds {} bytes",
                        state.body_limit
                    ))
                } else {
                    AppError::BadRequest(format!("Failed to read request body: {}", e))
                }
            })?;

        Event::new(state.ids.as_ref(), state.renderer.clone(), parts, params, body).map_err(|e| {
            error!(error = %e, "Request identifier generation failed");
            metrics::record_id_failure();
            AppError::IdGeneration(e)
        })
    }
}

/// Whether a body read failed because it went over the size limit
fn is_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}
