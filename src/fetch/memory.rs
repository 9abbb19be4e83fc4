//! Fetcher that serves documents from memory

use crate::{
    errors::FetchError,
    fetch::{Fetched, Fetcher},
};

use serde_json::Value;
use std::{collections::HashMap, sync::Mutex};
use url::Url;

#[derive(Clone, Debug)]
struct Document {
    media_type: String,
    json: Value,
}

/// Serves pre-loaded JSON documents by URI
///
/// Useful for tests and for resolving against a fixed set of documents
/// without touching the network. Media types are checked the same way
/// [crate::fetch::HttpFetcher] checks them, redirects can be declared
/// between URIs, and every requested URI is recorded in order.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    documents: HashMap<String, Document>,
    redirects: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        MemoryFetcher::default()
    }

    /// Serve a document at this URI, declared with the given media type
    pub fn insert(mut self, uri: &str, media_type: &str, json: Value) -> Self {
        self.documents.insert(
            uri.to_owned(),
            Document {
                media_type: media_type.to_owned(),
                json,
            },
        );
        self
    }

    /// Answer requests for `from` as if the server redirected to `to`
    pub fn redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_owned(), to.to_owned());
        self
    }

    /// Every URI requested so far, in request order
    pub fn requests(&self) -> Vec<String> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch_json(&self, uri: &Url, media_type: &str) -> Result<Fetched, FetchError> {
        match self.requests.lock() {
            Ok(mut requests) => requests.push(uri.to_string()),
            Err(poisoned) => poisoned.into_inner().push(uri.to_string()),
        }

        let mut location = uri.to_string();
        // bounded, so a redirect cycle is just another missing document
        for _ in 0..10 {
            match self.redirects.get(&location) {
                Some(next) => location = next.clone(),
                None => break,
            }
        }
        let final_uri = Url::parse(&location).map_err(|_| FetchError::NotFound(location.clone()))?;
        if final_uri != *uri {
            log::debug!("redirects lead from {} to {}", uri, final_uri);
        }

        let document = self
            .documents
            .get(&location)
            .ok_or_else(|| FetchError::NotFound(location.clone()))?;
        if document.media_type != media_type {
            return Err(FetchError::UnexpectedMediaType {
                uri: location,
                expected: media_type.to_owned(),
                found: document.media_type.clone(),
            });
        }
        Ok(Fetched {
            uri: final_uri,
            json: document.json.clone(),
        })
    }
}
