//! App-level Shopify OAuth client.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use growth_pilot_core::ShopDomain;

use super::{ShopContext, ShopifyError, signing};
use crate::config::ShopifyAppConfig;
use crate::models::ShopSession;

/// Offline access token returned by the code exchange.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct OAuthToken {
    pub access_token: SecretString,
    pub scopes: Vec<String>,
}

impl std::fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthToken")
            .field("access_token", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    #[serde(default)]
    scope: String,
}

/// Shopify app client shared by all requests.
#[derive(Clone)]
pub struct ShopifyClient {
    inner: Arc<ShopifyClientInner>,
}

struct ShopifyClientInner {
    http: reqwest::Client,
    api_key: String,
    api_secret: SecretString,
    scopes: Vec<String>,
    api_version: String,
    /// Replaces `https://{shop}` in every URL. Used to point the client at a
    /// mock server.
    base_url: Option<String>,
}

impl ShopifyClient {
    #[must_use]
    pub fn new(config: &ShopifyAppConfig) -> Self {
        Self::build(config, None)
    }

    /// Send every request to `base_url` instead of the shop's domain.
    #[must_use]
    pub fn with_base_url(config: &ShopifyAppConfig, base_url: &str) -> Self {
        Self::build(config, Some(base_url.trim_end_matches('/').to_string()))
    }

    fn build(config: &ShopifyAppConfig, base_url: Option<String>) -> Self {
        Self {
            inner: Arc::new(ShopifyClientInner {
                http: reqwest::Client::new(),
                api_key: config.api_key.clone(),
                api_secret: config.api_secret.clone(),
                scopes: config.scopes.clone(),
                api_version: config.api_version.clone(),
                base_url,
            }),
        }
    }

    pub(super) fn shop_base(&self, shop: &ShopDomain) -> String {
        self.inner
            .base_url
            .clone()
            .unwrap_or_else(|| format!("https://{shop}"))
    }

    pub(super) fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    pub(super) fn api_version(&self) -> &str {
        &self.inner.api_version
    }

    /// Requested OAuth scopes.
    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.inner.scopes
    }

    /// Whether `shop` is a well-formed `*.myshopify.com` domain.
    #[must_use]
    pub fn is_valid_shop_domain(shop: &str) -> bool {
        ShopDomain::parse(shop).is_ok()
    }

    /// URL that starts the install/OAuth flow for `shop`.
    #[must_use]
    pub fn authorization_url(&self, shop: &ShopDomain, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}/admin/oauth/authorize?client_id={}&scope={}&redirect_uri={}&state={}",
            self.shop_base(shop),
            urlencoding::encode(&self.inner.api_key),
            urlencoding::encode(&self.inner.scopes.join(",")),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state)
        )
    }

    /// Verify the `hmac` parameter of an OAuth redirect.
    #[must_use]
    pub fn verify_oauth_hmac<'a, I>(&self, params: I) -> bool
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        signing::verify_oauth(self.inner.api_secret.expose_secret().as_bytes(), params)
    }

    /// Verify a webhook body against its `X-Shopify-Hmac-Sha256` header.
    #[must_use]
    pub fn verify_webhook_hmac(&self, body: &[u8], header: &str) -> bool {
        signing::verify_webhook(self.inner.api_secret.expose_secret().as_bytes(), body, header)
    }

    /// Exchange an authorization code for an offline access token.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::OAuth` if Shopify rejects the code and
    /// `ShopifyError::Http` if the request fails.
    #[instrument(skip(self, code), fields(shop = %shop))]
    pub async fn exchange_code(
        &self,
        shop: &ShopDomain,
        code: &str,
    ) -> Result<OAuthToken, ShopifyError> {
        let url = format!("{}/admin/oauth/access_token", self.shop_base(shop));
        let params = [
            ("client_id", self.inner.api_key.as_str()),
            ("client_secret", self.inner.api_secret.expose_secret()),
            ("code", code),
        ];

        let response = self.inner.http.post(&url).form(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ShopifyError::OAuth(format!(
                "Token exchange failed ({status}): {text}"
            )));
        }

        let token: OAuthTokenResponse = response.json().await?;
        Ok(OAuthToken {
            access_token: SecretString::from(token.access_token),
            scopes: token
                .scope
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        })
    }

    /// A GraphQL handle for an installed shop.
    #[must_use]
    pub fn context(&self, session: &ShopSession) -> ShopContext {
        ShopContext::new(
            self.clone(),
            session.shop.clone(),
            session.access_token.clone(),
        )
    }
}
