//! Resolving image names all the way to Merkle roots

use crate::{
    discovery::{DiscoveryEngine, RefEngineReference, RegexConfigEngine, WellKnownUriEngine},
    errors::ResolveError,
    fetch::{Fetcher, HttpFetcher},
    name::ImageName,
    refengine::{Constructor, Registry, RootDescriptor, Roots},
};
use serde_json::Value;
use std::{collections::HashSet, fmt, path::PathBuf, sync::Arc};

/// Walk every discovery engine and every ref engine it suggests
///
/// Roots come out in discovery order, each one carrying the CAS engines
/// suggested alongside its ref engine. Roots that are identical after that
/// are only produced once. Failures in any one ref engine are logged and
/// end that engine's contribution, without disturbing the others.
pub fn resolve<'a>(
    registry: &'a Registry,
    engines: &'a [Box<dyn DiscoveryEngine>],
    name: &'a ImageName,
) -> impl Iterator<Item = RootDescriptor> + 'a {
    let mut seen = HashSet::new();
    engines
        .iter()
        .flat_map(move |engine| engine.ref_engines(name))
        .filter_map(move |reference| ReferenceRoots::new(registry, &reference, name))
        .flatten()
        .filter(move |root| seen.insert(root.dedup_key()))
}

/// Roots from one discovered ref engine, with its CAS engines attached
struct ReferenceRoots {
    engine: String,
    name: String,
    roots: Roots,
    cas_engines: Vec<Value>,
    found: bool,
    done: bool,
}

impl ReferenceRoots {
    fn new(registry: &Registry, reference: &RefEngineReference, name: &ImageName) -> Option<Self> {
        let engine = match registry.new_engine_for(reference) {
            Ok(engine) => engine,
            Err(err) => {
                log::warn!("skipping ref engine from {} ({})", reference.uri, err);
                return None;
            }
        };
        let mut cas_engines = Vec::with_capacity(reference.cas_engines.len());
        for cas_engine in &reference.cas_engines {
            match serde_json::to_value(cas_engine) {
                Ok(value) => cas_engines.push(value),
                Err(err) => log::warn!("can't represent CAS engine from {} ({})", cas_engine.uri, err),
            }
        }
        log::debug!("resolving {} with {}", name, engine);
        Some(ReferenceRoots {
            engine: engine.to_string(),
            name: name.to_string(),
            roots: engine.resolve(name),
            cas_engines,
            found: false,
            done: false,
        })
    }
}

impl Iterator for ReferenceRoots {
    type Item = RootDescriptor;

    fn next(&mut self) -> Option<RootDescriptor> {
        if self.done {
            return None;
        }
        match self.roots.next() {
            Some(Ok(mut root)) => {
                self.found = true;
                root.cas_engines.extend(self.cas_engines.iter().cloned());
                Some(root)
            }
            Some(Err(err)) => {
                log::warn!("{} failed to resolve {} ({})", self.engine, self.name, err);
                self.done = true;
                None
            }
            None => {
                if !self.found {
                    log::debug!("{} returned no results for {}", self.engine, self.name);
                }
                self.done = true;
                None
            }
        }
    }
}

/// A set of discovery engines and the ref-engine protocols they may use
///
/// ```no_run
/// let resolver = oci_discovery::Resolver::builder().build().unwrap();
/// for root in resolver.resolve("example.com/app#1.0").unwrap() {
///     println!("{}", serde_json::to_string(&root).unwrap());
/// }
/// ```
pub struct Resolver {
    registry: Registry,
    engines: Vec<Box<dyn DiscoveryEngine>>,
}

impl Resolver {
    /// Resolve with exactly these engines, in order
    pub fn new(registry: Registry, engines: Vec<Box<dyn DiscoveryEngine>>) -> Self {
        Resolver { registry, engines }
    }

    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::new()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn engines(&self) -> &[Box<dyn DiscoveryEngine>] {
        &self.engines
    }

    /// Lazily produce every root for a parsed name
    pub fn roots<'a>(&'a self, name: &'a ImageName) -> impl Iterator<Item = RootDescriptor> + 'a {
        resolve(&self.registry, &self.engines, name)
    }

    /// Parse a name and collect all of its roots
    ///
    /// It's an error for the name to be invalid, or for no root to be found.
    pub fn resolve(&self, name: &str) -> Result<Vec<RootDescriptor>, ResolveError> {
        let name = ImageName::parse(name)?;
        let roots: Vec<RootDescriptor> = self.roots(&name).collect();
        if roots.is_empty() {
            Err(ResolveError::NoRootFound(name.to_string()))
        } else {
            Ok(roots)
        }
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("registry", &self.registry)
            .field("engines", &self.engines.len())
            .finish()
    }
}

/// Builder for configuring a [Resolver]
///
/// By default the resolver consults local regex configuration from the XDG
/// directories and then the well-known URI of each host, over `https` and
/// then `http`, fetching with an [HttpFetcher].
pub struct ResolverBuilder {
    fetcher: Option<Arc<dyn Fetcher>>,
    protocols: Vec<String>,
    port: Option<u16>,
    local_config: bool,
    config_sources: Option<Vec<PathBuf>>,
    constructors: Vec<(String, Constructor)>,
}

impl ResolverBuilder {
    pub fn new() -> Self {
        ResolverBuilder {
            fetcher: None,
            protocols: WellKnownUriEngine::default_protocols(),
            port: None,
            local_config: true,
            config_sources: None,
            constructors: Vec::new(),
        }
    }

    /// Fetch documents with this instead of a default [HttpFetcher]
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Protocols tried for well-known URIs, in order
    pub fn protocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protocols = protocols.into_iter().map(Into::into).collect();
        self
    }

    /// Only look for well-known URIs over `https`
    pub fn https_only(self) -> Self {
        self.protocols(vec!["https"])
    }

    /// Connect to this port for well-known URIs
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Skip local regex configuration entirely
    pub fn no_local_config(mut self) -> Self {
        self.local_config = false;
        self
    }

    /// Read regex configuration from these files instead of the XDG defaults
    ///
    /// Files are listed highest priority first.
    pub fn config_sources<I, P>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.config_sources = Some(sources.into_iter().map(Into::into).collect());
        self
    }

    /// Support another ref-engine protocol
    pub fn register(mut self, protocol: &str, constructor: Constructor) -> Self {
        self.constructors.push((protocol.to_owned(), constructor));
        self
    }

    /// Construct the resolver, reading local configuration now
    pub fn build(self) -> Result<Resolver, ResolveError> {
        let fetcher: Arc<dyn Fetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpFetcher::new()?),
        };

        let mut registry = Registry::new(fetcher.clone());
        for (protocol, constructor) in &self.constructors {
            registry.register(protocol, *constructor);
        }

        let mut engines: Vec<Box<dyn DiscoveryEngine>> = Vec::new();
        if self.local_config {
            engines.push(Box::new(match &self.config_sources {
                Some(sources) => RegexConfigEngine::load(sources.as_slice()),
                None => RegexConfigEngine::new(),
            }));
        }
        let mut well_known = WellKnownUriEngine::new(fetcher).protocols(self.protocols);
        if let Some(port) = self.port {
            well_known = well_known.port(port);
        }
        engines.push(Box::new(well_known));

        Ok(Resolver::new(registry, engines))
    }
}

impl Default for ResolverBuilder {
    fn default() -> Self {
        ResolverBuilder::new()
    }
}
