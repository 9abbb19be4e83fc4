use crate::{
    discovery::RefEngineReference,
    errors::ResolveError,
    fetch::Fetcher,
    refengine::{DummyEngine, IndexTemplateEngine, RefEngine},
};
use serde_json::{Map, Value};
use std::{collections::HashMap, fmt, sync::Arc};
use url::Url;

/// Everything a ref-engine constructor gets to work with
pub struct EngineConfig {
    pub protocol: String,
    /// The configuration object, minus its `protocol` key
    pub params: Map<String, Value>,
    /// Where the configuration came from, for resolving relative references
    pub base: Option<Url>,
    pub fetcher: Arc<dyn Fetcher>,
}

impl EngineConfig {
    /// Look up a required string parameter
    pub fn required_str(&self, key: &str) -> Result<&str, ResolveError> {
        match self.params.get(key) {
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(self.invalid(format!("{:?} is not a string: {}", key, other))),
            None => Err(self.invalid(format!("missing required {:?} property", key))),
        }
    }

    /// Build an error rejecting this configuration
    pub fn invalid(&self, reason: String) -> ResolveError {
        ResolveError::InvalidEngineConfig {
            protocol: self.protocol.clone(),
            reason,
        }
    }
}

/// Builds a ref engine from its configuration
pub type Constructor = fn(EngineConfig) -> Result<Box<dyn RefEngine>, ResolveError>;

/// Mapping from ref-engine protocol names to constructors
///
/// A registry is an ordinary value; build one, add protocols to it, and hand
/// it to whatever needs to construct engines.
#[derive(Clone)]
pub struct Registry {
    constructors: HashMap<String, Constructor>,
    fetcher: Arc<dyn Fetcher>,
}

impl Registry {
    /// A registry with every built-in protocol
    ///
    /// The test-only `_dummy` protocol is not included; see
    /// [Registry::with_dummy()].
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        let mut registry = Registry::empty(fetcher);
        registry.register(IndexTemplateEngine::PROTOCOL, IndexTemplateEngine::from_config);
        registry
    }

    /// A registry with no protocols at all
    pub fn empty(fetcher: Arc<dyn Fetcher>) -> Self {
        Registry {
            constructors: HashMap::new(),
            fetcher,
        }
    }

    /// Add the `_dummy` protocol, which serves roots straight from its
    /// configuration
    pub fn with_dummy(mut self) -> Self {
        self.register(DummyEngine::PROTOCOL, DummyEngine::from_config);
        self
    }

    /// Add or replace the constructor for a protocol
    pub fn register(&mut self, protocol: &str, constructor: Constructor) -> &mut Self {
        self.constructors.insert(protocol.to_owned(), constructor);
        self
    }

    /// Names of all registered protocols, sorted
    pub fn protocols(&self) -> Vec<&str> {
        let mut protocols: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        protocols.sort();
        protocols
    }

    /// Construct a ref engine for a protocol
    ///
    /// `params` holds the rest of the engine's configuration. Unknown
    /// protocols are an error, which callers are expected to log before
    /// moving on.
    pub fn new_engine(
        &self,
        protocol: &str,
        params: Map<String, Value>,
        base: Option<&Url>,
    ) -> Result<Box<dyn RefEngine>, ResolveError> {
        let constructor = match self.constructors.get(protocol) {
            Some(constructor) => constructor,
            None => return Err(ResolveError::UnknownProtocol(protocol.to_owned())),
        };
        constructor(EngineConfig {
            protocol: protocol.to_owned(),
            params,
            base: base.cloned(),
            fetcher: self.fetcher.clone(),
        })
    }

    /// Construct the ref engine described by a discovered reference
    pub fn new_engine_for(
        &self,
        reference: &RefEngineReference,
    ) -> Result<Box<dyn RefEngine>, ResolveError> {
        let protocol = match reference.protocol() {
            Some(protocol) => protocol,
            None => {
                return Err(ResolveError::MissingProtocol(Value::Object(
                    reference.config.clone(),
                )))
            }
        };
        let mut params = reference.config.clone();
        params.remove("protocol");
        self.new_engine(protocol, params, Some(&reference.uri))
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Registry({:?})", self.protocols())
    }
}
