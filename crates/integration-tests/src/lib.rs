//! Integration tests for Vitalis.
//!
//! The tests talk HTTP to a running storefront and are `#[ignore]`d by
//! default.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and the storefront, then:
//! VITALIS_TEST_URL=http://127.0.0.1:3000 cargo test -p vitalis-integration-tests -- --ignored
//! ```

use reqwest::{Client, Response, redirect};

/// Default storefront address when `VITALIS_TEST_URL` is unset.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";

/// HTTP client bound to one storefront, keeping cookies between requests.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
}

impl TestContext {
    /// Build a context for `VITALIS_TEST_URL` (or [`DEFAULT_BASE_URL`]).
    ///
    /// Redirects are not followed so tests can assert on them.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn new() -> Self {
        let base_url = std::env::var("VITALIS_TEST_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        let client = Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .build()
            .expect("Failed to build HTTP client");
        Self { client, base_url }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET `path`.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// POST a form to `path`.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST request failed")
    }

    /// POST JSON to `path`.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    pub async fn post_json(&self, path: &str, body: &serde_json::Value) -> Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("POST request failed")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
