//! Fetching JSON documents with media type and charset validation

mod client;
mod memory;

pub use client::*;
pub use memory::*;

use crate::errors::FetchError;
use serde_json::Value;
use url::Url;

pub mod media_types {
    pub const REF_ENGINES: &str = "application/vnd.oci.ref-engines.v1+json";
    pub const IMAGE_INDEX: &str = "application/vnd.oci.image.index.v1+json";
    pub const DESCRIPTOR: &str = "application/vnd.oci.descriptor.v1+json";
}

/// A JSON document along with the URI it was finally retrieved from
#[derive(Clone, Debug, PartialEq)]
pub struct Fetched {
    /// Location after following any redirects
    pub uri: Url,
    pub json: Value,
}

/// Anything that can retrieve a JSON document of an expected media type
///
/// Implementations must release any connection or file they open before
/// returning, so a caller that stops iterating early never leaks resources.
pub trait Fetcher: Send + Sync {
    fn fetch_json(&self, uri: &Url, media_type: &str) -> Result<Fetched, FetchError>;
}

/// Split a `Content-Type` header value into its media type and charset
///
/// The media type is lowercased and stripped of parameters. The charset is
/// returned without quotes, if one was declared.
pub fn parse_content_type(value: &str) -> (String, Option<String>) {
    let mut params = value.split(';');
    let media_type = params.next().unwrap_or("").trim().to_ascii_lowercase();
    let charset = params.find_map(|param| {
        let mut kv = param.splitn(2, '=');
        let key = kv.next()?.trim();
        let value = kv.next()?.trim().trim_matches('"');
        if key.eq_ignore_ascii_case("charset") && !value.is_empty() {
            Some(value.to_owned())
        } else {
            None
        }
    });
    (media_type, charset)
}

/// Decode a response body with its declared charset, then parse it as JSON
pub fn decode_json_body(uri: &Url, charset: &str, body: &[u8]) -> Result<Value, FetchError> {
    let text = match charset.to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" => std::str::from_utf8(body).ok(),
        "us-ascii" | "ascii" => {
            if body.is_ascii() {
                std::str::from_utf8(body).ok()
            } else {
                None
            }
        }
        _ => {
            return Err(FetchError::UnsupportedCharset {
                uri: uri.to_string(),
                charset: charset.to_owned(),
            })
        }
    };
    let text = text.ok_or_else(|| FetchError::CharsetMismatch {
        uri: uri.to_string(),
        charset: charset.to_owned(),
    })?;
    serde_json::from_str(text).map_err(|source| FetchError::InvalidJson {
        uri: uri.to_string(),
        source,
    })
}
