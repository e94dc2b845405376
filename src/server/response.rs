//! HTTP replies
//!
//! Handlers build an [`HttpReply`]; only [`HttpReply::into_response`] knows
//! about `tiny_http`. Every reply carries the permissive CORS origin header.

use serde_json::json;
use std::io::Cursor;
use tiny_http::{Header, Response, StatusCode};

/// MIME types used by the service
pub mod mime {
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const JSON: &str = "application/json";
    pub const PNG: &str = "image/png";
    pub const JPEG: &str = "image/jpeg";
}

/// Methods answered in CORS preflight responses
pub const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";

/// A finished response, independent of the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl HttpReply {
    fn new(status: u16, content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: vec![("Content-Type", content_type.to_string())],
            body,
        }
    }

    /// Plain-text reply
    pub fn text<S: Into<String>>(status: u16, message: S) -> Self {
        Self::new(status, mime::PLAIN, message.into().into_bytes())
    }

    /// JSON reply
    #[must_use]
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, mime::JSON, value.to_string().into_bytes())
    }

    /// `{"error": message}` with the given status
    pub fn error_json<S: AsRef<str>>(status: u16, message: S) -> Self {
        Self::json(status, &json!({ "error": message.as_ref() }))
    }

    /// File download with `Content-Disposition: attachment`
    #[must_use]
    pub fn attachment(body: Vec<u8>, content_type: &'static str, file_name: &str) -> Self {
        let mut reply = Self::new(200, content_type, body);
        reply.headers.push((
            "Content-Disposition",
            format!("attachment; filename=\"{file_name}\""),
        ));
        reply
    }

    /// 204 answer to a CORS preflight
    #[must_use]
    pub fn preflight() -> Self {
        Self {
            status: 204,
            headers: vec![
                ("Access-Control-Allow-Methods", ALLOWED_METHODS.to_string()),
                ("Access-Control-Allow-Headers", "Content-Type".to_string()),
                ("Access-Control-Max-Age", "86400".to_string()),
            ],
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self::text(404, "404 Not Found")
    }

    #[must_use]
    pub fn method_not_allowed(allowed: &str) -> Self {
        let mut reply = Self::text(405, "405 Method Not Allowed");
        reply.headers.push(("Allow", allowed.to_string()));
        reply
    }

    /// First value of header `name` (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Body parsed as JSON, for JSON replies
    #[must_use]
    pub fn json_body(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }

    /// Convert into a `tiny_http` response, adding the CORS origin header
    #[must_use]
    pub fn into_response(self) -> Response<Cursor<Vec<u8>>> {
        let mut response = Response::from_data(self.body).with_status_code(StatusCode(self.status));
        let headers = self
            .headers
            .iter()
            .map(|(field, value)| (*field, value.as_str()))
            .chain(std::iter::once(("Access-Control-Allow-Origin", "*")));
        for (field, value) in headers {
            if let Ok(header) = Header::from_bytes(field.as_bytes(), value.as_bytes()) {
                response.add_header(header);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_json_body() {
        let reply = HttpReply::error_json(400, "Invalid image type");
        assert_eq!(reply.status, 400);
        assert_eq!(reply.header("content-type"), Some(mime::JSON));
        assert_eq!(
            reply.json_body().unwrap(),
            json!({ "error": "Invalid image type" })
        );
    }

    #[test]
    fn test_attachment_headers() {
        let reply = HttpReply::attachment(vec![1, 2, 3], mime::PNG, "output.png");
        assert_eq!(reply.status, 200);
        assert_eq!(
            reply.header("Content-Disposition"),
            Some("attachment; filename=\"output.png\"")
        );
        assert_eq!(reply.body, vec![1, 2, 3]);
    }

    #[test]
    fn test_preflight() {
        let reply = HttpReply::preflight();
        assert_eq!(reply.status, 204);
        assert!(reply.body.is_empty());
        assert_eq!(
            reply.header("Access-Control-Allow-Methods"),
            Some(ALLOWED_METHODS)
        );
    }

    #[test]
    fn test_into_response_status() {
        let response = HttpReply::text(413, "too big").into_response();
        assert_eq!(response.status_code(), StatusCode(413));
        assert!(response
            .headers()
            .iter()
            .any(|h| h.field.equiv("Access-Control-Allow-Origin") && h.value.as_str() == "*"));
    }
}
