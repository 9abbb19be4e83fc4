use crate::{
    discovery::{references_from_ref_engines_object, DiscoveryEngine, RefEngineReference},
    fetch::{media_types, Fetcher},
    name::{ancestor_hosts, ImageName},
};
use std::{collections::HashSet, fmt, sync::Arc};
use url::Url;

/// Path where hosts publish their ref-engines object
pub const WELL_KNOWN_PATH: &str = "/.well-known/oci-host-ref-engines";

/// Discovers ref engines from a well-known URI on the image's host
///
/// For each protocol in order, the host and then each of its DNS ancestors
/// is asked for its ref-engines object. A host which answered under one
/// protocol is not asked again under the next.
pub struct WellKnownUriEngine {
    protocols: Vec<String>,
    port: Option<u16>,
    fetcher: Arc<dyn Fetcher>,
}

impl WellKnownUriEngine {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        WellKnownUriEngine {
            protocols: WellKnownUriEngine::default_protocols(),
            port: None,
            fetcher,
        }
    }

    /// Protocols tried when none are configured: `https`, then `http`
    pub fn default_protocols() -> Vec<String> {
        vec!["https".to_owned(), "http".to_owned()]
    }

    /// Change which protocols are tried, in order
    ///
    /// An empty list restores the defaults.
    pub fn protocols(mut self, protocols: Vec<String>) -> Self {
        self.protocols = if protocols.is_empty() {
            WellKnownUriEngine::default_protocols()
        } else {
            protocols
        };
        self
    }

    /// Connect to this port instead of the protocol's default
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    fn authority(&self, host: &str) -> String {
        match self.port {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_owned(),
        }
    }
}

impl DiscoveryEngine for WellKnownUriEngine {
    fn ref_engines<'a>(
        &'a self,
        name: &'a ImageName,
    ) -> Box<dyn Iterator<Item = RefEngineReference> + 'a> {
        let candidates = self.protocols.iter().flat_map(move |protocol| {
            ancestor_hosts(name.host()).map(move |host| (protocol, self.authority(host)))
        });
        let mut answered = HashSet::new();
        Box::new(
            candidates
                .filter_map(move |(protocol, authority)| {
                    if answered.contains(&authority) {
                        // already resolved via another protocol
                        return None;
                    }
                    let uri = format!("{}://{}{}", protocol, authority, WELL_KNOWN_PATH);
                    let uri = match Url::parse(&uri) {
                        Ok(uri) => uri,
                        Err(err) => {
                            log::warn!("can't build a discovery URI {:?} ({})", uri, err);
                            return None;
                        }
                    };
                    log::debug!("discovering ref engines via {}", uri);
                    let fetched = match self.fetcher.fetch_json(&uri, media_types::REF_ENGINES) {
                        Ok(fetched) => fetched,
                        Err(err) => {
                            log::warn!("failed to fetch {} ({})", uri, err);
                            return None;
                        }
                    };
                    log::debug!("received ref-engine discovery object: {}", fetched.json);
                    answered.insert(authority);
                    match references_from_ref_engines_object(&fetched.json, &fetched.uri) {
                        Ok(references) => Some(references),
                        Err(err) => {
                            log::warn!("{}", err);
                            None
                        }
                    }
                })
                .flatten(),
        )
    }
}

impl fmt::Debug for WellKnownUriEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WellKnownUriEngine")
            .field("protocols", &self.protocols)
            .field("port", &self.port)
            .finish()
    }
}
