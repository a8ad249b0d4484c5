//! Signed WebSocket connection URL construction.
//!
//! The server authenticates the connection handshake by recomputing an
//! HMAC-SHA1 signature over a canonical string of the request parameters.
//! Canonicalization must agree byte-for-byte: parameters sorted
//! lexicographically by key, raw `key=value` pairs in the signed string,
//! percent-encoded values only in the final query.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::client::ClientConfig;

type HmacSha1 = Hmac<Sha1>;

/// WebSocket endpoint path for bidirectional synthesis.
pub(crate) const WS_PATH: &str = "/api/v1/flow_tts/bidirection";

/// Action name carried in the signed parameter set.
const ACTION: &str = "TextToSpeechBidirection";

/// Signed URL validity window in seconds.
const URL_TTL_SECS: u64 = 86400;

/// Builds the authenticated connection URL for one connection attempt.
///
/// Deterministic for identical inputs; `timestamp` is explicit so callers
/// (and tests) control the time-bounded part.
pub(crate) fn signed_url(config: &ClientConfig, connection_id: &str, timestamp: u64) -> String {
    let host = strip_scheme(&config.ws_url);

    let mut params = BTreeMap::new();
    params.insert("Action", ACTION.to_string());
    params.insert("AppId", config.app_id.to_string());
    params.insert("SecretId", config.secret_id.clone());
    params.insert("SdkAppId", config.sdk_app_id.to_string());
    params.insert("Timestamp", timestamp.to_string());
    params.insert("Expired", (timestamp + URL_TTL_SECS).to_string());
    params.insert("ConnectionId", connection_id.to_string());

    let signature = sign(&config.secret_key, &canonical_string(host, &params));
    params.insert("Signature", signature);

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}{}?{}", config.ws_url, WS_PATH, query)
}

/// Current Unix timestamp in seconds.
pub(crate) fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Builds the canonical signing string: `GET<host><path>?<sorted k=v>`.
fn canonical_string(host: &str, params: &BTreeMap<&str, String>) -> String {
    let joined = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("GET{host}{WS_PATH}?{joined}")
}

/// HMAC-SHA1 over the canonical string, base64-encoded.
fn sign(secret_key: &str, canonical: &str) -> String {
    let mut mac =
        HmacSha1::new_from_slice(secret_key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(canonical.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

fn strip_scheme(ws_url: &str) -> &str {
    ws_url
        .strip_prefix("wss://")
        .or_else(|| ws_url.strip_prefix("ws://"))
        .unwrap_or(ws_url)
}
