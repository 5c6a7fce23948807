//! OAuth 1.0a request signing (HMAC-SHA1), as Flickr requires.
//!
//! 1. Collect the request parameters plus the `oauth_*` protocol parameters.
//! 2. Percent-encode keys and values (RFC 3986 unreserved set), sort by key
//!    then value, join as `k=v&k=v`.
//! 3. Base string: `METHOD&enc(url)&enc(params)`.
//! 4. Key: `enc(consumer_secret)&enc(token_secret)`.
//! 5. `oauth_signature = base64(hmac_sha1(key, base))`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha1::Sha1;

/// Everything except RFC 3986 unreserved characters.
const RFC3986: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Consumer (app) and access-token credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token: String,
    pub token_secret: String,
}

pub fn percent_encode(s: &str) -> String {
    utf8_percent_encode(s, RFC3986).to_string()
}

/// `METHOD&enc(url)&enc(sorted params)`.
pub fn signature_base_string(method: &str, url: &str, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();
    let joined = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(url),
        percent_encode(&joined)
    )
}

pub(crate) fn hmac_sha1_base64(key: &str, data: &str) -> String {
    let mut mac =
        Hmac::<Sha1>::new_from_slice(key.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(data.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Sign a base string with `consumer_secret&token_secret`.
pub fn sign(base_string: &str, consumer_secret: &str, token_secret: &str) -> String {
    let key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    );
    hmac_sha1_base64(&key, base_string)
}

/// `params` plus the `oauth_*` parameters and `oauth_signature`, ready to
/// send as a query string or form body.
pub fn signed_params(
    credentials: &Credentials,
    method: &str,
    url: &str,
    params: &[(String, String)],
    nonce: &str,
    timestamp: i64,
) -> Vec<(String, String)> {
    let mut all: Vec<(String, String)> = params.to_vec();
    all.extend([
        ("oauth_consumer_key".into(), credentials.consumer_key.clone()),
        ("oauth_nonce".into(), nonce.to_string()),
        ("oauth_signature_method".into(), "HMAC-SHA1".into()),
        ("oauth_timestamp".into(), timestamp.to_string()),
        ("oauth_token".into(), credentials.token.clone()),
        ("oauth_version".into(), "1.0".into()),
    ]);
    let base = signature_base_string(method, url, &all);
    let signature = sign(
        &base,
        &credentials.consumer_secret,
        &credentials.token_secret,
    );
    all.push(("oauth_signature".into(), signature));
    all
}

/// A fresh random nonce.
pub fn nonce() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
