use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::Response,
};
use bytes::Bytes;

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Response being built for the client
///
/// Handlers write into the `Output`; it becomes the HTTP response when the
/// owning event is turned into one.
#[derive(Debug, Clone)]
pub struct Output {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Replace the body
    pub fn body(&mut self, content: impl Into<Bytes>) {
        self.body = Some(content.into());
    }

    pub fn status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn content_type(&mut self, value: &'static str) {
        self.headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(value));
    }

    pub fn header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn content(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn is_written(&self) -> bool {
        self.body.is_some()
    }

    pub fn len(&self) -> usize {
        self.body.as_ref().map_or(0, Bytes::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn into_response(self) -> Response {
        let mut response = Response::new(self.body.map(Body::from).unwrap_or_else(Body::empty));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_output_is_empty_ok() {
        let output = Output::new();
        assert_eq!(output.status_code(), StatusCode::OK);
        assert!(!output.is_written());
        assert_eq!(output.len(), 0);
    }

    #[test]
    fn test_body_replaces_content() {
        let mut output = Output::new();
        output.body("first");
        output.body(Bytes::from_static(b"second"));

        assert_eq!(output.content().unwrap(), &Bytes::from_static(b"second"));
        assert_eq!(output.len(), 6);
    }

    #[test]
    fn test_into_response_carries_status_and_headers() {
        let mut output = Output::new();
        output.status(StatusCode::CREATED);
        output.content_type(HTML_CONTENT_TYPE);
        output.header(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        );
        output.body("<p>ok</p>");

        let response = output.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            HTML_CONTENT_TYPE
        );
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
    }
}
