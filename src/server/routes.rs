//! Request routing
//!
//! [`dispatch`] maps a transport-independent [`ApiRequest`] to an
//! [`HttpReply`]. Every error is turned into a reply here; nothing escapes to
//! the accept loop.

use super::multipart::{self, ImageUpload};
use super::response::{mime, HttpReply};
use crate::{error::RetouchError, services::RetouchService, types::ImageSlot};
use serde_json::json;
use tiny_http::Method;
use tracing::{debug, warn};

/// Message returned by `/upload` when no file was sent
pub const NO_IMAGE_UPLOADED: &str = "No image uploaded";

/// A fully read request
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Request target, possibly with a query string
    pub url: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl ApiRequest {
    /// Request without a body
    pub fn new<S: Into<String>>(method: Method, url: S) -> Self {
        Self {
            method,
            url: url.into(),
            content_type: None,
            body: Vec::new(),
        }
    }

    /// Attach a body and its content type
    #[must_use]
    pub fn with_body<S: Into<String>>(mut self, content_type: S, body: Vec<u8>) -> Self {
        self.content_type = Some(content_type.into());
        self.body = body;
        self
    }

    /// Path without the query string
    #[must_use]
    pub fn path(&self) -> &str {
        self.url.split_once('?').map_or(self.url.as_str(), |(path, _)| path)
    }
}

enum Route {
    RemoveBackground,
    Upload,
    Download(String),
    Health,
}

impl Route {
    fn resolve(path: &str) -> Option<Self> {
        match path {
            "/remove-background" => Some(Self::RemoveBackground),
            "/upload" => Some(Self::Upload),
            "/health" => Some(Self::Health),
            _ => path
                .strip_prefix("/download/")
                .filter(|key| !key.is_empty() && !key.contains('/'))
                .map(|key| Self::Download(key.to_string())),
        }
    }

    fn allowed(&self) -> &'static str {
        match self {
            Self::RemoveBackground | Self::Upload => "POST, OPTIONS",
            Self::Download(_) | Self::Health => "GET, HEAD, OPTIONS",
        }
    }

    fn accepts(&self, method: &Method) -> bool {
        match self {
            Self::RemoveBackground | Self::Upload => *method == Method::Post,
            Self::Download(_) | Self::Health => matches!(method, Method::Get | Method::Head),
        }
    }
}

/// Route a request and produce the reply
pub async fn dispatch(service: &RetouchService, request: ApiRequest) -> HttpReply {
    if request.method == Method::Options {
        return HttpReply::preflight();
    }

    let Some(route) = Route::resolve(request.path()) else {
        debug!(path = request.path(), "no route");
        return HttpReply::not_found();
    };
    if !route.accepts(&request.method) {
        return HttpReply::method_not_allowed(route.allowed());
    }

    match route {
        Route::RemoveBackground => remove_background(service, request).await,
        Route::Upload => upload(service, request).await,
        Route::Download(key) => download(service, &key).await,
        Route::Health => HttpReply::json(
            200,
            &json!({ "status": "ok", "remover": service.remover_name() }),
        ),
    }
}

async fn read_upload(
    service: &RetouchService,
    request: ApiRequest,
) -> Result<ImageUpload, RetouchError> {
    service.check_upload_size(request.body.len())?;
    multipart::extract_image(request.content_type.as_deref(), request.body).await
}

async fn remove_background(service: &RetouchService, request: ApiRequest) -> HttpReply {
    let result = match read_upload(service, request).await {
        Ok(upload) => service.remove_background(upload.bytes).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(png) => HttpReply::attachment(png, mime::PNG, "output.png"),
        Err(e) => {
            log_failure("/remove-background", &e);
            HttpReply::text(e.status_code(), e.to_string())
        }
    }
}

async fn upload(service: &RetouchService, request: ApiRequest) -> HttpReply {
    let result = match read_upload(service, request).await {
        Ok(upload) => service.upload(upload.bytes).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(receipt) => HttpReply::json(
            200,
            &json!({ "processed_image_url": receipt.processed_image_url }),
        ),
        Err(RetouchError::MissingFile(reason)) => {
            debug!(reason = %reason, "upload without image");
            HttpReply::error_json(400, NO_IMAGE_UPLOADED)
        }
        Err(e) => {
            log_failure("/upload", &e);
            HttpReply::error_json(e.status_code(), e.to_string())
        }
    }
}

async fn download(service: &RetouchService, key: &str) -> HttpReply {
    let result = match key.parse::<ImageSlot>() {
        Ok(slot) => service.download(slot).await.map(|bytes| (slot, bytes)),
        Err(e) => Err(e),
    };

    match result {
        Ok((slot, bytes)) => HttpReply::attachment(bytes, mime::JPEG, slot.file_name()),
        Err(e) => {
            log_failure("/download", &e);
            HttpReply::error_json(e.status_code(), e.to_string())
        }
    }
}

fn log_failure(route: &str, error: &RetouchError) {
    if error.status_code() >= 500 {
        warn!(route, error = %error, "request failed");
    } else {
        debug!(route, error = %error, "request rejected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ServerConfig, removal::ColorKeyRemover, store::MemoryImageStore};
    use std::sync::Arc;

    fn service() -> RetouchService {
        RetouchService::new(
            &ServerConfig::default(),
            Arc::new(ColorKeyRemover::default()),
            Arc::new(MemoryImageStore::new()),
        )
    }

    #[test]
    fn test_path_strips_query() {
        let request = ApiRequest::new(Method::Get, "/download/original_image?t=1");
        assert_eq!(request.path(), "/download/original_image");
    }

    #[tokio::test]
    async fn test_unknown_path_and_method() {
        let service = service();
        let reply = dispatch(&service, ApiRequest::new(Method::Get, "/nope")).await;
        assert_eq!(reply.status, 404);

        let reply = dispatch(&service, ApiRequest::new(Method::Get, "/upload")).await;
        assert_eq!(reply.status, 405);
        assert_eq!(reply.header("Allow"), Some("POST, OPTIONS"));

        let reply = dispatch(&service, ApiRequest::new(Method::Get, "/download/")).await;
        assert_eq!(reply.status, 404);
    }

    #[tokio::test]
    async fn test_allow_header_lists_accepted_methods() {
        let service = service();
        for url in ["/health", "/download/original_image"] {
            let reply = dispatch(&service, ApiRequest::new(Method::Delete, url)).await;
            assert_eq!(reply.status, 405);
            let allow = reply.header("Allow").unwrap();
            assert_eq!(allow, "GET, HEAD, OPTIONS");

            for method in [Method::Get, Method::Head] {
                assert!(allow.contains(method.as_str()));
                let reply = dispatch(&service, ApiRequest::new(method, url)).await;
                assert_ne!(reply.status, 405);
            }
        }
    }

    #[tokio::test]
    async fn test_options_is_preflight_everywhere() {
        let service = service();
        for url in ["/upload", "/download/processed_image", "/anything"] {
            let reply = dispatch(&service, ApiRequest::new(Method::Options, url)).await;
            assert_eq!(reply.status, 204);
        }
    }

    #[tokio::test]
    async fn test_health() {
        let service = service();
        let reply = dispatch(&service, ApiRequest::new(Method::Get, "/health")).await;
        assert_eq!(reply.status, 200);
        assert_eq!(
            reply.json_body().unwrap(),
            json!({ "status": "ok", "remover": "color-key" })
        );
    }
}
