//! Handler-side helpers for axum applications: request-scoped service
//! resolution, the form create-and-submit flow, file download responses
//! and the usual redirect/JSON shortcuts.

pub mod error;
pub mod files;
pub mod forms;
pub mod respond;
pub mod scope;

pub use error::HttpHelperError;
pub use files::{mime_for_path, send_file};
pub use forms::{create_and_submit_form, FormError, FormErrors, FormOutcome, FormType, FormView};
pub use respond::{is_method, is_post, json_response, redirect, redirect_to_path};
pub use scope::RequestScope;
