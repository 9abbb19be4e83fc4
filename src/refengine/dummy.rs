use crate::{
    errors::ResolveError,
    name::ImageName,
    refengine::{EngineConfig, RefEngine, RootDescriptor, Roots},
};
use std::fmt;

/// Ref engine which answers every name with the roots in its configuration
///
/// Registered as `_dummy` by [crate::refengine::Registry::with_dummy()], so
/// resolution can be exercised without a network.
#[derive(Clone, Debug)]
pub struct DummyEngine {
    response: Vec<RootDescriptor>,
}

impl DummyEngine {
    pub const PROTOCOL: &'static str = "_dummy";

    pub fn new(response: Vec<RootDescriptor>) -> Self {
        DummyEngine { response }
    }

    /// Registry constructor, reading the `response` array of roots
    pub fn from_config(config: EngineConfig) -> Result<Box<dyn RefEngine>, ResolveError> {
        let response = match config.params.get("response") {
            Some(response) => serde_json::from_value(response.clone())
                .map_err(|err| config.invalid(format!("bad response: {}", err)))?,
            None => return Err(config.invalid("missing required \"response\" property".to_owned())),
        };
        Ok(Box::new(DummyEngine::new(response)))
    }
}

impl RefEngine for DummyEngine {
    fn resolve(&self, _name: &ImageName) -> Roots {
        Box::new(self.response.clone().into_iter().map(Ok))
    }
}

impl fmt::Display for DummyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} roots={}>", DummyEngine::PROTOCOL, self.response.len())
    }
}
