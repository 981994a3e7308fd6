//! Small response builders shared by handlers.

use appkit::UrlGenerator;
use axum::body::Body;
use axum::response::Response;
use http::{header, Method, Request, StatusCode};
use serde::Serialize;

use crate::error::HttpHelperError;

/// 302 redirect to a raw location.
///
/// # Errors
/// Fails when the location is not a valid header value.
pub fn redirect(location: &str) -> Result<Response, HttpHelperError> {
    Ok(Response::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, location)
        .body(Body::empty())?)
}

/// 302 redirect to a named route.
///
/// # Errors
/// Fails on unknown routes or missing route parameters.
pub fn redirect_to_path(
    urls: &UrlGenerator,
    name: &str,
    params: &[(&str, &str)],
) -> Result<Response, HttpHelperError> {
    redirect(&urls.generate(name, params)?)
}

/// JSON response with an explicit status code.
///
/// # Errors
/// Fails when the value cannot be serialized.
pub fn json_response<T: Serialize>(
    value: &T,
    status: StatusCode,
) -> Result<Response, HttpHelperError> {
    let body = serde_json::to_vec(value)?;
    Ok(Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))?)
}

#[must_use]
pub fn is_method<B>(request: &Request<B>, method: &Method) -> bool {
    request.method() == method
}

#[must_use]
pub fn is_post<B>(request: &Request<B>) -> bool {
    is_method(request, &Method::POST)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_to_path_generates_the_location() {
        let urls = UrlGenerator::new("https://example.com");
        urls.add("user_show", "/users/{id}");

        let response = redirect_to_path(&urls, "user_show", &[("id", "5")]).unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/users/5"
        );
    }

    #[test]
    fn redirect_to_unknown_route_fails() {
        let urls = UrlGenerator::new("https://example.com");
        assert!(matches!(
            redirect_to_path(&urls, "nope", &[]),
            Err(HttpHelperError::Url(_))
        ));
    }

    #[test]
    fn json_response_sets_content_type_and_status() {
        let response =
            json_response(&serde_json::json!({"ok": true}), StatusCode::CREATED).unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn method_predicates() {
        let post = Request::builder()
            .method(Method::POST)
            .uri("/x")
            .body(())
            .unwrap();
        let get = Request::builder()
            .method(Method::GET)
            .uri("/x")
            .body(())
            .unwrap();

        assert!(is_post(&post));
        assert!(!is_post(&get));
        assert!(is_method(&get, &Method::GET));
    }
}
