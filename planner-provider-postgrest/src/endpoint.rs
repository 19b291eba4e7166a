//! Base URL, public key and HTTP client shared by the store and auth halves.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use url::Url;

use planner_core::{PlannerConfig, PlannerError};

#[derive(Clone)]
pub struct Endpoint {
    http: reqwest::Client,
    base: Url,
    anon_key: String,
    timeout_secs: u64,
}

impl Endpoint {
    pub fn new(base: Url, anon_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        if base.cannot_be_a_base() {
            anyhow::bail!("Store URL '{}' cannot have paths", base);
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Endpoint {
            http,
            base,
            anon_key: anon_key.into(),
            timeout_secs: timeout.as_secs(),
        })
    }

    pub fn from_config(config: &PlannerConfig) -> Result<Self> {
        let base = config.store_url()?.clone();
        let anon_key = config.anon_key.clone().with_context(|| {
            format!(
                "No anon_key configured. Set it in config.toml or via {}",
                planner_core::config::ANON_KEY_ENV
            )
        })?;

        Self::new(base, anon_key, config.request_timeout())
    }

    /// `{base}/{segments...}`, keeping any path already on the base URL.
    pub(crate) fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        // Checked in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Every request carries the public key; `bearer` defaults to it when
    /// nobody is signed in.
    pub(crate) fn request(&self, method: Method, url: Url, bearer: Option<&str>) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer.unwrap_or(&self.anon_key))
    }

    pub(crate) fn transport_error(&self, err: reqwest::Error) -> PlannerError {
        if err.is_timeout() {
            PlannerError::StoreTimeout(self.timeout_secs)
        } else {
            PlannerError::Store(format!("Request failed: {}", err))
        }
    }
}

/// Read the error a non-success response carries.
pub(crate) async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    message_from_body(status, &body)
}

/// PostgREST reports `message`, GoTrue `msg` or `error_description`.
pub(crate) fn message_from_body(status: StatusCode, body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let message = parsed.as_ref().and_then(|v| {
        ["message", "msg", "error_description", "error"]
            .iter()
            .find_map(|key| v.get(key).and_then(|m| m.as_str()))
            .map(str::to_string)
    });

    match message {
        Some(message) => format!("{} ({})", message, status),
        None if !body.trim().is_empty() => format!("{} ({})", body.trim(), status),
        None => status.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn endpoint(base: &str) -> Endpoint {
        Endpoint::new(Url::parse(base).unwrap(), "anon", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_url_appends_segments() {
        let hosted = endpoint("https://xyz.supabase.co");
        assert_eq!(
            hosted.url(&["rest", "v1", "guests"]).as_str(),
            "https://xyz.supabase.co/rest/v1/guests"
        );

        let proxied = endpoint("https://example.com/planner/?x=1");
        assert_eq!(
            proxied.url(&["auth", "v1", "token"]).as_str(),
            "https://example.com/planner/auth/v1/token"
        );
    }

    #[test]
    fn test_rejects_opaque_base() {
        let base = Url::parse("mailto:store@example.com").unwrap();
        assert!(Endpoint::new(base, "anon", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = PlannerConfig {
            store_url: Some(Url::parse("https://xyz.supabase.co").unwrap()),
            ..PlannerConfig::default()
        };
        assert!(Endpoint::from_config(&config).is_err());

        let config = PlannerConfig {
            anon_key: Some("anon".into()),
            ..config
        };
        assert!(Endpoint::from_config(&config).is_ok());
    }

    #[test]
    fn test_message_from_body() {
        assert_eq!(
            message_from_body(
                StatusCode::CONFLICT,
                r#"{"code":"23505","message":"duplicate key value"}"#
            ),
            "duplicate key value (409 Conflict)"
        );
        assert_eq!(
            message_from_body(
                StatusCode::BAD_REQUEST,
                r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#
            ),
            "Invalid login credentials (400 Bad Request)"
        );
        assert_eq!(
            message_from_body(StatusCode::BAD_GATEWAY, "upstream down"),
            "upstream down (502 Bad Gateway)"
        );
        assert_eq!(
            message_from_body(StatusCode::SERVICE_UNAVAILABLE, ""),
            "503 Service Unavailable"
        );
    }
}
