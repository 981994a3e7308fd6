//! File download responses.
//!
//! [`send_file`] loads the whole file into memory and answers with exactly
//! four headers (Cache-Control, Content-Type, Content-Disposition,
//! Content-Length). No streaming, no range support: the callers this
//! serves hand out small exports and attachments.

use std::path::Path;

use axum::body::Body;
use axum::response::Response;
use http::header;

use crate::error::HttpHelperError;

/// Mapping of file extensions to MIME types.
/// Format: `(extension, mime_type)`
const EXTENSION_MIME_MAPPINGS: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("txt", "text/plain"),
    ("csv", "text/csv"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("zip", "application/zip"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("webp", "image/webp"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
];

/// MIME type for a path, by extension. Unknown extensions sniff as
/// `application/octet-stream`.
#[must_use]
pub fn mime_for_path(path: &Path) -> mime::Mime {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .and_then(|ext| {
            EXTENSION_MIME_MAPPINGS
                .iter()
                .find(|(e, _)| *e == ext)
                .map(|(_, m)| *m)
        })
        .and_then(|m| m.parse().ok())
        .unwrap_or(mime::APPLICATION_OCTET_STREAM)
}

/// Build an attachment response serving the given file.
///
/// `file_name` overrides the basename advertised in `Content-Disposition`.
///
/// # Errors
/// Fails when the file cannot be read.
pub async fn send_file(
    path: impl AsRef<Path>,
    file_name: Option<&str>,
) -> Result<Response, HttpHelperError> {
    let path = path.as_ref();
    let contents = tokio::fs::read(path).await?;

    let name = match file_name {
        Some(name) => name.to_owned(),
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    let mime = mime_for_path(path);

    let response = Response::builder()
        .header(header::CACHE_CONTROL, "private")
        .header(header::CONTENT_TYPE, mime.as_ref())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment;filename=\"{name}\""),
        )
        .header(header::CONTENT_LENGTH, contents.len())
        .body(Body::from(contents))?;

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::io::Write;

    #[test]
    fn mime_lookup_by_extension() {
        assert_eq!(mime_for_path(Path::new("a/report.pdf")), "application/pdf");
        assert_eq!(mime_for_path(Path::new("IMAGE.JPG")), "image/jpeg");
        assert_eq!(
            mime_for_path(Path::new("blob.unknown")),
            mime::APPLICATION_OCTET_STREAM
        );
        assert_eq!(
            mime_for_path(Path::new("no_extension")),
            mime::APPLICATION_OCTET_STREAM
        );
    }

    #[tokio::test]
    async fn send_file_sets_the_four_headers_and_full_body() {
        let mut file = tempfile::NamedTempFile::with_suffix(".csv").unwrap();
        file.write_all(b"a,b\n1,2\n").unwrap();

        let response = send_file(file.path(), None).await.unwrap();

        let headers = response.headers();
        assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "private");
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "text/csv");
        assert_eq!(headers.get(header::CONTENT_LENGTH).unwrap(), "8");
        let disposition = headers
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(disposition.starts_with("attachment;filename=\""));

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"a,b\n1,2\n");
    }

    #[tokio::test]
    async fn send_file_honors_the_custom_name() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"data").unwrap();

        let response = send_file(file.path(), Some("export.bin")).await.unwrap();
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_DISPOSITION)
                .unwrap(),
            "attachment;filename=\"export.bin\""
        );
    }

    #[tokio::test]
    async fn send_file_surfaces_missing_files() {
        let err = send_file("/definitely/not/here.txt", None).await.unwrap_err();
        assert!(matches!(err, HttpHelperError::Io(_)));
    }
}
