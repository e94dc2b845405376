//! Extraction of the `image` file field from multipart form bodies

use crate::error::{RetouchError, Result};
use tracing::debug;

/// Name of the form field carrying the uploaded file
pub const IMAGE_FIELD: &str = "image";

/// Message for a body without an `image` file part
pub const NO_FILE_PART: &str = "No file part";

/// Message for an `image` part submitted without choosing a file
pub const NO_SELECTED_FILE: &str = "No selected file";

/// The uploaded file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Find the first `image` file part in a `multipart/form-data` body
///
/// # Errors
/// `RetouchError::MissingFile` with [`NO_FILE_PART`] when the body is not
/// multipart, is malformed or has no `image` file part, and with
/// [`NO_SELECTED_FILE`] when the part's filename is empty.
pub async fn extract_image(content_type: Option<&str>, body: Vec<u8>) -> Result<ImageUpload> {
    let Some(boundary) = content_type.and_then(|ct| multer::parse_boundary(ct).ok()) else {
        debug!(content_type, "request body is not multipart");
        return Err(RetouchError::missing_file(NO_FILE_PART));
    };

    let stream = futures::stream::once(async move { Ok::<_, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "malformed multipart body");
                break;
            }
        };

        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        // a plain form value named `image` is not a file part
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        if file_name.is_empty() {
            return Err(RetouchError::missing_file(NO_SELECTED_FILE));
        }

        let bytes = field.bytes().await.map_err(|e| {
            debug!(error = %e, "failed to read image part");
            RetouchError::missing_file(NO_FILE_PART)
        })?;

        debug!(file_name = %file_name, size = bytes.len(), "extracted image part");
        return Ok(ImageUpload {
            file_name,
            bytes: bytes.to_vec(),
        });
    }

    Err(RetouchError::missing_file(NO_FILE_PART))
}

/// Build a `multipart/form-data` body with one file part
///
/// Returns the content type (with boundary) and the body. Used by clients and
/// tests that talk to the server without a full HTTP client.
#[must_use]
pub fn encode_file_part(field: &str, file_name: &str, bytes: &[u8]) -> (String, Vec<u8>) {
    let boundary = format!("retouch-{}", uuid::Uuid::new_v4().simple());
    let mut body = Vec::with_capacity(bytes.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}
