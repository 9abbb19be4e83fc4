//! Error types you might see while discovering ref engines and resolving roots

use thiserror::Error;

/// Errors while fetching a JSON document
///
/// These are always recoverable from the point of view of discovery: the
/// candidate that produced one is abandoned and the next one is tried.
#[derive(Error, Debug)]
pub enum FetchError {
    /// network request error
    #[error("network request error: {0}")]
    Network(#[from] reqwest::Error),

    /// server answered with an error status
    #[error("{uri} returned HTTP status {status}")]
    HttpStatus { uri: String, status: u16 },

    /// response has no content type
    #[error("{0} does not declare a content type")]
    MissingContentType(String),

    /// response content type is not the one we asked for
    #[error("{uri} returned {found}, not {expected}")]
    UnexpectedMediaType {
        uri: String,
        expected: String,
        found: String,
    },

    /// response content type has no charset parameter
    #[error("{0} does not declare a charset")]
    MissingCharset(String),

    /// response declares a charset we can't decode
    #[error("{uri} declares an unsupported charset {charset:?}")]
    UnsupportedCharset { uri: String, charset: String },

    /// response body doesn't decode with the declared charset
    #[error("{uri} returned content which did not match the declared {charset} charset")]
    CharsetMismatch { uri: String, charset: String },

    /// response body is not JSON
    #[error("{uri} returned invalid JSON: {source}")]
    InvalidJson {
        uri: String,
        source: serde_json::Error,
    },

    /// no way to fetch this kind of URI
    #[error("unsupported URI scheme in {0}")]
    UnsupportedScheme(String),

    /// no document is available for this URI
    #[error("nothing found at {0}")]
    NotFound(String),
}

/// Errors parsing a URI Template
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum TemplateError {
    /// an expression was opened but never closed
    #[error("unclosed expression in URI template {template:?}")]
    Unclosed { template: String },

    /// a closing brace appeared outside of any expression
    #[error("unexpected '}}' in URI template {template:?}")]
    UnexpectedBrace { template: String },

    /// an expression could not be parsed
    #[error("invalid expression {{{expression}}} in URI template {template:?}")]
    InvalidExpression { template: String, expression: String },
}

/// Errors during ref-engine discovery and root resolution
#[derive(Error, Debug)]
pub enum ResolveError {
    /// invalid host-based image name
    #[error("{0:?} does not match the host-based-image-name pattern")]
    InvalidImageName(String),

    /// fetch error
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// a ref-engines object or local configuration has the wrong shape
    #[error("{uri} claimed to return {media_type} but actually returned {value}")]
    ConfigShape {
        uri: String,
        media_type: String,
        value: serde_json::Value,
    },

    /// a fetched document does not follow its schema
    #[error("{uri} claimed to return {media_type}, but actually returned {body}")]
    Schema {
        uri: String,
        media_type: String,
        body: serde_json::Value,
    },

    /// ref-engine configuration has no protocol string
    #[error("ref-engine configuration has no protocol: {0}")]
    MissingProtocol(serde_json::Value),

    /// ref-engine protocol is not registered
    #[error("unsupported ref-engine protocol {0:?}")]
    UnknownProtocol(String),

    /// ref-engine configuration was rejected by its constructor
    #[error("invalid {protocol} ref-engine configuration: {reason}")]
    InvalidEngineConfig { protocol: String, reason: String },

    /// uri template error
    #[error("uri template error: {0}")]
    Template(#[from] TemplateError),

    /// uri parsing error
    #[error("uri parsing error: {0}")]
    InvalidUri(#[from] url::ParseError),

    /// every engine was consulted and none produced a root
    #[error("no Merkle root found for {0:?}")]
    NoRootFound(String),
}
