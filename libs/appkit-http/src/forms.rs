//! Form create-and-submit flow.
//!
//! A [`FormType`] pairs a deserializable data shape with validation rules.
//! [`create_and_submit_form`] reproduces the controller flow: non-POST
//! requests get an unsubmitted view; POST requests bind the urlencoded
//! body, validate, and hand valid data to the caller's callback. When the
//! callback produces a response it short-circuits; in every other case the
//! caller gets the bound view back, valid or not.

use axum::body::Body;
use axum::response::Response;
use http::{Method, Request};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;

use crate::error::HttpHelperError;

#[derive(Clone, Debug)]
pub struct FormError {
    pub field: Option<String>,
    pub message: String,
}

#[derive(Clone, Debug, Default)]
pub struct FormErrors {
    errors: Vec<FormError>,
}

impl FormErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Error attached to a single field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FormError {
            field: Some(field.into()),
            message: message.into(),
        });
    }

    /// Form-wide error.
    pub fn add_global(&mut self, message: impl Into<String>) {
        self.errors.push(FormError {
            field: None,
            message: message.into(),
        });
    }

    #[must_use]
    pub fn global(message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add_global(message);
        errors
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FormError> {
        self.errors.iter()
    }
}

/// A form definition: data shape plus validation.
pub trait FormType: Send + Sync {
    type Data: DeserializeOwned + Clone + Send;

    fn name(&self) -> &'static str;

    /// Validate bound data. The default accepts everything.
    fn validate(&self, _data: &Self::Data) -> Result<(), FormErrors> {
        Ok(())
    }
}

/// What a handler renders after the submit flow.
#[derive(Clone, Debug)]
pub enum FormView<T> {
    /// The request was not a POST; nothing was bound.
    Unsubmitted,
    /// The request was a POST. `data` is `None` when binding failed.
    Submitted {
        data: Option<T>,
        errors: FormErrors,
    },
}

impl<T> FormView<T> {
    #[must_use]
    pub fn is_submitted(&self) -> bool {
        matches!(self, FormView::Submitted { .. })
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, FormView::Submitted { data: Some(_), errors } if errors.is_empty())
    }

    #[must_use]
    pub fn data(&self) -> Option<&T> {
        match self {
            FormView::Submitted { data, .. } => data.as_ref(),
            FormView::Unsubmitted => None,
        }
    }

    #[must_use]
    pub fn errors(&self) -> Option<&FormErrors> {
        match self {
            FormView::Submitted { errors, .. } => Some(errors),
            FormView::Unsubmitted => None,
        }
    }
}

/// Result of [`create_and_submit_form`]: either the callback's response
/// (short-circuit) or the form view to render.
pub enum FormOutcome<T> {
    Response(Response),
    View(FormView<T>),
}

impl<T> FormOutcome<T> {
    #[must_use]
    pub fn view(self) -> Option<FormView<T>> {
        match self {
            FormOutcome::View(view) => Some(view),
            FormOutcome::Response(_) => None,
        }
    }

    #[must_use]
    pub fn response(self) -> Option<Response> {
        match self {
            FormOutcome::Response(response) => Some(response),
            FormOutcome::View(_) => None,
        }
    }
}

/// Create and submit a form against a request.
///
/// - Non-POST: returns [`FormView::Unsubmitted`]; the callback never runs.
/// - POST with an unparseable body: a submitted view with a global error.
/// - POST failing validation: a submitted view carrying the bound data and
///   the validation errors.
/// - POST passing validation: the callback runs with the bound data; a
///   `Some(Response)` return is passed through, otherwise the (valid)
///   view is returned.
///
/// # Errors
/// Fails only when the request body cannot be read at all.
pub async fn create_and_submit_form<F, C, Fut>(
    form: &F,
    request: Request<Body>,
    valid_callback: C,
) -> Result<FormOutcome<F::Data>, HttpHelperError>
where
    F: FormType,
    C: FnOnce(F::Data) -> Fut,
    Fut: Future<Output = Option<Response>>,
{
    if request.method() != Method::POST {
        return Ok(FormOutcome::View(FormView::Unsubmitted));
    }

    let bytes = request
        .into_body()
        .collect()
        .await
        .map_err(|e| HttpHelperError::Body(e.to_string()))?
        .to_bytes();

    let data: F::Data = match serde_urlencoded::from_bytes(&bytes) {
        Ok(data) => data,
        Err(e) => {
            tracing::debug!(form = form.name(), error = %e, "form binding failed");
            return Ok(FormOutcome::View(FormView::Submitted {
                data: None,
                errors: FormErrors::global(format!("malformed form payload: {e}")),
            }));
        }
    };

    match form.validate(&data) {
        Ok(()) => {
            if let Some(response) = valid_callback(data.clone()).await {
                return Ok(FormOutcome::Response(response));
            }
            Ok(FormOutcome::View(FormView::Submitted {
                data: Some(data),
                errors: FormErrors::new(),
            }))
        }
        Err(errors) => Ok(FormOutcome::View(FormView::Submitted {
            data: Some(data),
            errors,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use serde::Deserialize;

    #[derive(Clone, Debug, Deserialize, PartialEq)]
    struct Signup {
        email: String,
        age: u32,
    }

    struct SignupForm;

    impl FormType for SignupForm {
        type Data = Signup;

        fn name(&self) -> &'static str {
            "signup"
        }

        fn validate(&self, data: &Signup) -> Result<(), FormErrors> {
            let mut errors = FormErrors::new();
            if !data.email.contains('@') {
                errors.add("email", "not an email address");
            }
            if data.age < 18 {
                errors.add("age", "must be an adult");
            }
            if errors.is_empty() { Ok(()) } else { Err(errors) }
        }
    }

    fn post(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/signup")
            .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    fn get() -> Request<Body> {
        Request::builder()
            .method(Method::GET)
            .uri("/signup")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn get_requests_never_invoke_the_callback() {
        let outcome = create_and_submit_form(&SignupForm, get(), |_| async {
            panic!("callback must not run for GET")
        })
        .await
        .unwrap();

        let view = outcome.view().unwrap();
        assert!(!view.is_submitted());
        assert!(!view.is_valid());
    }

    #[tokio::test]
    async fn valid_post_short_circuits_with_the_callback_response() {
        let outcome = create_and_submit_form(
            &SignupForm,
            post("email=a%40b.com&age=30"),
            |data: Signup| async move {
                assert_eq!(data.email, "a@b.com");
                Some(
                    Response::builder()
                        .status(StatusCode::FOUND)
                        .body(Body::empty())
                        .unwrap(),
                )
            },
        )
        .await
        .unwrap();

        let response = outcome.response().unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
    }

    #[tokio::test]
    async fn valid_post_without_response_returns_the_valid_view() {
        let outcome = create_and_submit_form(
            &SignupForm,
            post("email=a%40b.com&age=30"),
            |_| async { None },
        )
        .await
        .unwrap();

        let view = outcome.view().unwrap();
        assert!(view.is_valid());
        assert_eq!(view.data().unwrap().age, 30);
    }

    #[tokio::test]
    async fn invalid_post_returns_errors_and_never_runs_the_callback() {
        let outcome = create_and_submit_form(
            &SignupForm,
            post("email=nope&age=12"),
            |_| async {
                panic!("callback must not run for invalid data");
            },
        )
        .await
        .unwrap();

        let view = outcome.view().unwrap();
        assert!(view.is_submitted());
        assert!(!view.is_valid());
        assert_eq!(view.errors().unwrap().len(), 2);
        // Bound data is still available for re-rendering.
        assert_eq!(view.data().unwrap().email, "nope");
    }

    #[tokio::test]
    async fn unparseable_body_becomes_a_global_error() {
        let outcome = create_and_submit_form(&SignupForm, post("age=notanumber"), |_| async {
            panic!("callback must not run for unbound data");
        })
        .await
        .unwrap();

        let view = outcome.view().unwrap();
        assert!(view.is_submitted());
        assert!(view.data().is_none());
        let errors = view.errors().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors.iter().next().unwrap().field.is_none());
    }
}
