use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Url;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::models::TokenResponse;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// One wire format for exchanging `(email, password)` for a token.
/// Implementations are interchangeable; the session manager walks an ordered
/// list of them.
#[async_trait]
pub trait CredentialStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    async fn authenticate(&self, email: &str, password: &str) -> ClientResult<TokenResponse>;
}

/// Map a login HTTP response to a token response: non-2xx is a protocol error
/// carrying the body, a 2xx body must be a JSON object (possibly without token).
async fn read_token_response(resp: reqwest::Response) -> ClientResult<TokenResponse> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(ClientError::protocol(status.as_u16(), body));
    }
    if body.trim().is_empty() {
        return Ok(TokenResponse::default());
    }
    serde_json::from_str::<TokenResponse>(&body).map_err(|e| ClientError::Decode(format!("login response: {}", e)))
}

/// OAuth2 password grant with structured form encoding.
#[derive(Clone)]
pub struct FormPasswordGrant {
    http: reqwest::Client,
    url: Url,
}

impl FormPasswordGrant {
    pub fn new(cfg: &ClientConfig, http: reqwest::Client) -> ClientResult<Self> {
        Ok(Self { http, url: cfg.endpoint(&cfg.login_path)? })
    }
}

#[async_trait]
impl CredentialStrategy for FormPasswordGrant {
    fn name(&self) -> &'static str { "form_password_grant" }

    async fn authenticate(&self, email: &str, password: &str) -> ClientResult<TokenResponse> {
        debug!(strategy = self.name(), url = %self.url, "credential_exchange");
        let resp = self
            .http
            .post(self.url.clone())
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .form(&[("grant_type", "password"), ("username", email), ("password", password)])
            .send()
            .await?;
        read_token_response(resp).await
    }
}

/// Same password grant, but the body is a literal query string built by hand
/// and nothing beyond the content type is set. Browsers treat this as a simple
/// request and skip the CORS preflight that the structured variant can trigger.
#[derive(Clone)]
pub struct RawQueryPasswordGrant {
    http: reqwest::Client,
    url: Url,
}

impl RawQueryPasswordGrant {
    pub fn new(cfg: &ClientConfig, http: reqwest::Client) -> ClientResult<Self> {
        Ok(Self { http, url: cfg.endpoint(&cfg.login_path)? })
    }

    pub fn body(email: &str, password: &str) -> String {
        format!(
            "grant_type=password&username={}&password={}",
            urlencoding::encode(email),
            urlencoding::encode(password)
        )
    }
}

#[async_trait]
impl CredentialStrategy for RawQueryPasswordGrant {
    fn name(&self) -> &'static str { "raw_query_password_grant" }

    async fn authenticate(&self, email: &str, password: &str) -> ClientResult<TokenResponse> {
        debug!(strategy = self.name(), url = %self.url, "credential_exchange");
        let resp = self
            .http
            .post(self.url.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE))
            .body(Self::body(email, password))
            .send()
            .await?;
        read_token_response(resp).await
    }
}

/// Primary then alternative, sharing one HTTP client.
pub fn default_strategies(cfg: &ClientConfig, http: reqwest::Client) -> ClientResult<Vec<Arc<dyn CredentialStrategy>>> {
    let primary: Arc<dyn CredentialStrategy> = Arc::new(FormPasswordGrant::new(cfg, http.clone())?);
    let alternative: Arc<dyn CredentialStrategy> = Arc::new(RawQueryPasswordGrant::new(cfg, http)?);
    Ok(vec![primary, alternative])
}

/// Only failures that look like the request never got through are worth
/// retrying with another wire format.
pub fn should_fall_back(err: &ClientError) -> bool {
    err.is_connection_failure() || err.mentions_cors()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_body_is_percent_encoded_query_string() {
        assert_eq!(
            RawQueryPasswordGrant::body("a@b.com", "x"),
            "grant_type=password&username=a%40b.com&password=x"
        );
        assert_eq!(
            RawQueryPasswordGrant::body("u+1@x.io", "p&w=d ?"),
            "grant_type=password&username=u%2B1%40x.io&password=p%26w%3Dd%20%3F"
        );
    }

    #[test]
    fn fallback_predicate() {
        assert!(should_fall_back(&ClientError::connect("tcp connect error")));
        assert!(should_fall_back(&ClientError::transport("request blocked by CORS policy")));
        assert!(!should_fall_back(&ClientError::transport("operation timed out")));
        assert!(!should_fall_back(&ClientError::protocol(401, "")));
        assert!(!should_fall_back(&ClientError::Decode("eof".into())));
    }

    #[test]
    fn default_list_is_primary_first() {
        let cfg = ClientConfig::new("http://127.0.0.1:1");
        let list = default_strategies(&cfg, reqwest::Client::new()).unwrap();
        let names: Vec<&str> = list.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["form_password_grant", "raw_query_password_grant"]);
    }
}
