//! Response assertions for functional tests.

use appkit::UrlGenerator;
use http::{header, StatusCode};

use crate::client::TestResponse;

/// Assert a response redirects to a named route.
///
/// # Panics
/// Panics with a descriptive message on status or location mismatch, and
/// when the expected route cannot be generated.
pub fn assert_redirects_to(
    urls: &UrlGenerator,
    response: &TestResponse,
    route: &str,
    params: &[(&str, &str)],
    expected_status: StatusCode,
) {
    let expected_location = match urls.generate(route, params) {
        Ok(location) => location,
        Err(e) => panic!("cannot generate expected route '{route}': {e}"),
    };

    assert_eq!(
        response.status(),
        expected_status,
        "expected redirect status {expected_status}, got {} (body: {})",
        response.status(),
        response.text()
    );
    assert_eq!(
        response.header(header::LOCATION),
        Some(expected_location.as_str()),
        "redirect location mismatch"
    );
}

/// Assert a JSON response matches the expected value and status.
///
/// # Panics
/// Panics on status mismatch, non-JSON bodies and value mismatch.
pub fn assert_json_response(
    expected: &serde_json::Value,
    response: &TestResponse,
    expected_status: StatusCode,
) {
    assert_eq!(
        response.status(),
        expected_status,
        "unexpected status (body: {})",
        response.text()
    );

    let actual: serde_json::Value = match response.json() {
        Ok(value) => value,
        Err(e) => panic!("response body is not JSON: {e} (body: {})", response.text()),
    };
    assert_eq!(&actual, expected, "JSON body mismatch");
}
