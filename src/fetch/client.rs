//! Blocking HTTP fetcher for discovery documents and image indexes

use crate::{
    errors::FetchError,
    fetch::{decode_json_body, parse_content_type, Fetched, Fetcher},
};

use http::header::HeaderValue;
use reqwest::{header, header::HeaderMap, Certificate};
use std::{convert::TryInto, time::Duration};
use url::Url;

/// Builder for configuring custom [HttpFetcher] instances
#[derive(Debug)]
pub struct HttpFetcherBuilder {
    req: reqwest::blocking::ClientBuilder,
}

impl HttpFetcherBuilder {
    /// Start constructing a custom fetcher
    pub fn new() -> Self {
        let req = reqwest::blocking::Client::builder()
            .user_agent(HttpFetcher::default_user_agent())
            .timeout(None::<Duration>);
        HttpFetcherBuilder { req }
    }

    /// Set a timeout for each network request
    ///
    /// This timeout applies from the beginning of a (GET) request until the
    /// last byte has been received. By default there is no timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.req = self.req.timeout(timeout);
        self
    }

    /// Set a timeout for only the initial connect phase of each network request
    ///
    /// By default there is no timeout beyond those built into the networking
    /// stack.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.req = self.req.connect_timeout(timeout);
        self
    }

    /// Sets the `User-Agent` header used by this fetcher
    ///
    /// By default, the value returned by [HttpFetcher::default_user_agent()]
    /// is used, which identifies the version of `oci-discovery` acting as a
    /// client.
    pub fn user_agent<V>(mut self, value: V) -> Self
    where
        V: TryInto<HeaderValue>,
        V::Error: Into<http::Error>,
    {
        self.req = self.req.user_agent(value);
        self
    }

    /// Bind to a specific local IP address
    pub fn local_address<T>(mut self, addr: T) -> Self
    where
        T: Into<Option<std::net::IpAddr>>,
    {
        self.req = self.req.local_address(addr);
        self
    }

    /// Set the default headers for every HTTP request
    pub fn default_request_headers(mut self, headers: HeaderMap) -> Self {
        self.req = self.req.default_headers(headers);
        self
    }

    /// Trust an additional root certificate
    pub fn add_root_certificate(mut self, certificate: Certificate) -> Self {
        self.req = self.req.add_root_certificate(certificate);
        self
    }

    /// Construct an HttpFetcher using the parameters from this Builder
    pub fn build(self) -> Result<HttpFetcher, FetchError> {
        Ok(HttpFetcher {
            req: self.req.build()?,
        })
    }
}

impl Default for HttpFetcherBuilder {
    fn default() -> Self {
        HttpFetcherBuilder::new()
    }
}

/// Fetches JSON documents over HTTP and HTTPS
///
/// Each request asks for one media type via `Accept`, follows redirects, and
/// insists that the response declares that same media type along with a
/// charset. The body is read completely before returning, so no connection
/// is held once a fetch is over.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    req: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Construct a new fetcher with default options
    pub fn new() -> Result<HttpFetcher, FetchError> {
        HttpFetcher::builder().build()
    }

    /// Construct a fetcher with custom options, via HttpFetcherBuilder
    pub fn builder() -> HttpFetcherBuilder {
        HttpFetcherBuilder::new()
    }

    /// Return the default `User-Agent` that we use if no other is set
    pub fn default_user_agent() -> HeaderValue {
        static USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
        HeaderValue::from_static(USER_AGENT)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch_json(&self, uri: &Url, media_type: &str) -> Result<Fetched, FetchError> {
        match uri.scheme() {
            "http" | "https" => (),
            _ => return Err(FetchError::UnsupportedScheme(uri.to_string())),
        }

        log::debug!("requesting {} from {}", media_type, uri);
        let response = self
            .req
            .get(uri.clone())
            .header(header::ACCEPT, media_type)
            .send()?;

        let final_uri = response.url().clone();
        if &final_uri != uri {
            log::debug!("redirects lead from {} to {}", uri, final_uri);
        }

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                uri: final_uri.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = match response.headers().get(header::CONTENT_TYPE) {
            Some(value) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
            None => return Err(FetchError::MissingContentType(final_uri.to_string())),
        };
        let (found, charset) = parse_content_type(&content_type);
        if found != media_type {
            return Err(FetchError::UnexpectedMediaType {
                uri: final_uri.to_string(),
                expected: media_type.to_owned(),
                found,
            });
        }
        let charset = match charset {
            Some(charset) => charset,
            None => return Err(FetchError::MissingCharset(final_uri.to_string())),
        };

        let body = response.bytes()?;
        log::trace!("raw json from {}, {}", final_uri, String::from_utf8_lossy(&body));
        let json = decode_json_body(&final_uri, &charset, &body)?;
        Ok(Fetched {
            uri: final_uri,
            json,
        })
    }
}
