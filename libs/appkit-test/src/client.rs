//! In-memory test client.
//!
//! Drives an axum router through `tower::ServiceExt::oneshot`: no socket,
//! no spawned server. The client keeps a cookie jar; `Set-Cookie` response
//! headers are absorbed and replayed on subsequent requests, which is what
//! lets the simulated login flow work like a browser session.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use appkit::UrlGenerator;
use axum::body::Body;
use axum::Router;
use bytes::Bytes;
use http::{header, HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tower::ServiceExt;
use uuid::Uuid;

use crate::files::DummyUploadedFile;

/// A fully-buffered response.
#[derive(Debug)]
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON.
    ///
    /// # Errors
    /// Fails when the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

pub struct TestClient {
    router: Router,
    cookies: Mutex<HashMap<String, String>>,
    urls: Option<Arc<UrlGenerator>>,
}

impl TestClient {
    #[must_use]
    pub fn new(router: Router) -> Self {
        Self {
            router,
            cookies: Mutex::new(HashMap::new()),
            urls: None,
        }
    }

    /// Attach a URL generator so requests can address named routes.
    #[must_use]
    pub fn with_urls(mut self, urls: Arc<UrlGenerator>) -> Self {
        self.urls = Some(urls);
        self
    }

    pub fn set_cookie(&self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.lock().insert(name.into(), value.into());
    }

    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.lock().get(name).cloned()
    }

    /// Issue a request. Cookies from the jar ride along; `Set-Cookie`
    /// headers in the response update the jar.
    ///
    /// # Errors
    /// Fails when the request cannot be built or the body not collected.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        headers: &[(&str, &str)],
        body: Body,
    ) -> anyhow::Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(path);

        let jar: Vec<String> = {
            let cookies = self.cookies.lock();
            cookies.iter().map(|(k, v)| format!("{k}={v}")).collect()
        };
        if !jar.is_empty() {
            builder = builder.header(header::COOKIE, jar.join("; "));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let request = builder.body(body)?;
        let response = self.router.clone().oneshot(request).await?;

        for value in response.headers().get_all(header::SET_COOKIE) {
            if let Some((name, value)) = value
                .to_str()
                .ok()
                .and_then(|v| v.split(';').next())
                .and_then(|pair| pair.split_once('='))
            {
                self.cookies
                    .lock()
                    .insert(name.trim().to_owned(), value.trim().to_owned());
            }
        }

        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| anyhow::anyhow!("failed to collect response body: {e}"))?
            .to_bytes();

        Ok(TestResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }

    /// # Errors
    /// See [`request`](Self::request).
    pub async fn get(&self, path: &str) -> anyhow::Result<TestResponse> {
        self.request(Method::GET, path, &[], Body::empty()).await
    }

    /// POST an urlencoded form.
    ///
    /// # Errors
    /// See [`request`](Self::request).
    pub async fn post_form(
        &self,
        path: &str,
        fields: &[(&str, &str)],
    ) -> anyhow::Result<TestResponse> {
        let body = serde_urlencoded::to_string(fields)?;
        self.request(
            Method::POST,
            path,
            &[(
                header::CONTENT_TYPE.as_str(),
                "application/x-www-form-urlencoded",
            )],
            Body::from(body),
        )
        .await
    }

    /// Request a named route; `ajax` adds `X-Requested-With: XMLHttpRequest`.
    ///
    /// # Errors
    /// Fails when no URL generator is attached, the route is unknown, or
    /// the request itself fails.
    pub async fn request_route(
        &self,
        name: &str,
        method: Method,
        params: &[(&str, &str)],
        ajax: bool,
    ) -> anyhow::Result<TestResponse> {
        let urls = self
            .urls
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("test client has no URL generator attached"))?;
        let path = urls.generate(name, params)?;

        let headers: &[(&str, &str)] = if ajax {
            &[("x-requested-with", "XMLHttpRequest")]
        } else {
            &[]
        };
        self.request(method, &path, headers, Body::empty()).await
    }

    /// POST a dummy uploaded file as a single-part multipart body.
    ///
    /// # Errors
    /// Fails when the file cannot be read or the request fails.
    pub async fn upload_file(
        &self,
        path: &str,
        field_name: &str,
        file: &DummyUploadedFile,
    ) -> anyhow::Result<TestResponse> {
        let boundary = format!("----appkit-{}", Uuid::new_v4().simple());
        let contents = file.contents()?;

        let mut body = Vec::with_capacity(contents.len() + 256);
        write!(body, "--{boundary}\r\n")?;
        write!(
            body,
            "Content-Disposition: form-data; name=\"{field_name}\"; filename=\"{}\"\r\n",
            file.client_name()
        )?;
        write!(body, "Content-Type: {}\r\n\r\n", file.content_type())?;
        body.extend_from_slice(&contents);
        write!(body, "\r\n--{boundary}--\r\n")?;

        let content_type = format!("multipart/form-data; boundary={boundary}");
        self.request(
            Method::POST,
            path,
            &[(header::CONTENT_TYPE.as_str(), content_type.as_str())],
            Body::from(body),
        )
        .await
    }
}
