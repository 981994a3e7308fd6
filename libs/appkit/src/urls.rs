//! Named-route URL generation.
//!
//! Routes are registered as `name → "/users/{id}"` patterns. Generation
//! substitutes `{placeholder}` segments from the given parameters and
//! appends the leftovers as a query string, so one parameter list serves
//! both path and query needs.

use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum UrlError {
    #[error("unknown route: {0}")]
    UnknownRoute(String),

    #[error("route '{route}' is missing parameter '{parameter}'")]
    MissingParameter { route: String, parameter: String },
}

pub struct UrlGenerator {
    base_url: String,
    routes: RwLock<HashMap<String, String>>,
}

impl UrlGenerator {
    /// `base_url` is used by [`generate_absolute`](Self::generate_absolute),
    /// e.g. `"https://example.com"`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            routes: RwLock::new(HashMap::new()),
        }
    }

    pub fn add(&self, name: impl Into<String>, pattern: impl Into<String>) {
        self.routes.write().insert(name.into(), pattern.into());
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Generate a relative URL for a named route.
    ///
    /// # Errors
    /// Returns `UrlError::UnknownRoute` for unregistered names and
    /// `UrlError::MissingParameter` when a `{placeholder}` has no value.
    pub fn generate(&self, name: &str, params: &[(&str, &str)]) -> Result<String, UrlError> {
        let pattern = self
            .routes
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| UrlError::UnknownRoute(name.to_owned()))?;

        let mut path = String::with_capacity(pattern.len());
        let mut used = vec![false; params.len()];
        let mut rest = pattern.as_str();

        while let Some(start) = rest.find('{') {
            path.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let Some(end) = after.find('}') else {
                // Unbalanced brace: emit verbatim.
                path.push('{');
                rest = after;
                continue;
            };
            let placeholder = &after[..end];
            let position = params.iter().position(|(k, _)| *k == placeholder).ok_or(
                UrlError::MissingParameter {
                    route: name.to_owned(),
                    parameter: placeholder.to_owned(),
                },
            )?;
            path.push_str(&urlencoding::encode(params[position].1));
            used[position] = true;
            rest = &after[end + 1..];
        }
        path.push_str(rest);

        let query: Vec<(&str, &str)> = params
            .iter()
            .zip(&used)
            .filter(|(_, used)| !**used)
            .map(|(p, _)| *p)
            .collect();

        if query.is_empty() {
            return Ok(path);
        }

        let encoded = query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        Ok(format!("{path}?{encoded}"))
    }

    /// Generate an absolute URL (base URL + relative URL).
    ///
    /// # Errors
    /// Same failure modes as [`generate`](Self::generate).
    pub fn generate_absolute(
        &self,
        name: &str,
        params: &[(&str, &str)],
    ) -> Result<String, UrlError> {
        Ok(format!("{}{}", self.base_url, self.generate(name, params)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> UrlGenerator {
        let urls = UrlGenerator::new("https://example.com/");
        urls.add("home", "/");
        urls.add("user_show", "/users/{id}");
        urls.add("post_comment", "/posts/{post}/comments/{comment}");
        urls
    }

    #[test]
    fn generates_static_and_parameterized_paths() {
        let urls = generator();
        assert_eq!(urls.generate("home", &[]).unwrap(), "/");
        assert_eq!(
            urls.generate("user_show", &[("id", "42")]).unwrap(),
            "/users/42"
        );
        assert_eq!(
            urls.generate("post_comment", &[("post", "7"), ("comment", "9")])
                .unwrap(),
            "/posts/7/comments/9"
        );
    }

    #[test]
    fn leftover_parameters_become_a_query_string() {
        let urls = generator();
        assert_eq!(
            urls.generate("user_show", &[("id", "42"), ("tab", "profile")])
                .unwrap(),
            "/users/42?tab=profile"
        );
        assert_eq!(
            urls.generate("home", &[("q", "a b")]).unwrap(),
            "/?q=a%20b"
        );
    }

    #[test]
    fn placeholder_values_are_percent_encoded() {
        let urls = generator();
        assert_eq!(
            urls.generate("user_show", &[("id", "a/b")]).unwrap(),
            "/users/a%2Fb"
        );
    }

    #[test]
    fn unknown_route_and_missing_parameter_fail() {
        let urls = generator();
        assert!(matches!(
            urls.generate("nope", &[]),
            Err(UrlError::UnknownRoute(_))
        ));
        assert!(matches!(
            urls.generate("user_show", &[]),
            Err(UrlError::MissingParameter { .. })
        ));
    }

    #[test]
    fn absolute_urls_use_the_trimmed_base() {
        let urls = generator();
        assert_eq!(
            urls.generate_absolute("user_show", &[("id", "42")]).unwrap(),
            "https://example.com/users/42"
        );
    }
}
