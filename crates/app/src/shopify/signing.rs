//! HMAC-SHA256 signatures Shopify puts on OAuth redirects and webhooks.
//!
//! Both use the app API secret as key. OAuth redirects carry a hex digest
//! over the sorted query string; webhooks carry a base64 digest of the raw
//! body in `X-Shopify-Hmac-Sha256`. Comparisons are constant time.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HMAC accepts keys of any length, so this only fails on a broken backend.
fn mac(secret: &[u8]) -> Option<HmacSha256> {
    HmacSha256::new_from_slice(secret).ok()
}

/// Base64 signature of a webhook body.
#[must_use]
pub fn webhook_signature(secret: &[u8], body: &[u8]) -> Option<String> {
    let mut mac = mac(secret)?;
    mac.update(body);
    Some(BASE64.encode(mac.finalize().into_bytes()))
}

/// Verify the `X-Shopify-Hmac-Sha256` header against the raw body.
#[must_use]
pub fn verify_webhook(secret: &[u8], body: &[u8], header: &str) -> bool {
    let (Ok(expected), Some(mut mac)) = (BASE64.decode(header.trim()), mac(secret)) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// The message Shopify signs on OAuth redirects: every parameter except
/// `hmac` and `signature`, sorted by key, joined as `k=v&k=v`.
#[must_use]
pub fn oauth_message<'a, I>(params: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut pairs: Vec<(&str, &str)> = params
        .into_iter()
        .filter(|(k, _)| *k != "hmac" && *k != "signature")
        .collect();
    pairs.sort_unstable();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Hex signature of an OAuth redirect's parameters.
#[must_use]
pub fn oauth_signature<'a, I>(secret: &[u8], params: I) -> Option<String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut mac = mac(secret)?;
    mac.update(oauth_message(params).as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Verify the `hmac` parameter of an OAuth redirect.
#[must_use]
pub fn verify_oauth<'a, I>(secret: &[u8], params: I) -> bool
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let params: Vec<(&str, &str)> = params.into_iter().collect();
    let Some(provided) = params
        .iter()
        .find(|(k, _)| *k == "hmac")
        .and_then(|(_, v)| hex::decode(v).ok())
    else {
        return false;
    };
    let Some(mut mac) = mac(secret) else {
        return false;
    };
    mac.update(oauth_message(params).as_bytes());
    mac.verify_slice(&provided).is_ok()
}
