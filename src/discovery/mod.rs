//! Ref-engine discovery: finding out which ref engines can resolve a name
//!
//! Discovery engines never fail as a whole. A candidate that can't be
//! fetched or doesn't have the right shape is logged and skipped, and the
//! engine carries on with the next one.

#[cfg(test)] mod tests;

mod regex_config;
mod well_known;

pub use regex_config::*;
pub use well_known::*;

use crate::{errors::ResolveError, fetch::media_types, name::ImageName};
use serde_json::{Map, Value};
use url::Url;

/// Something that can find ref engines for an image name
///
/// The sequence is produced lazily; each fetch or file read happens only
/// when the consumer asks for the next reference.
pub trait DiscoveryEngine: Send + Sync {
    fn ref_engines<'a>(
        &'a self,
        name: &'a ImageName,
    ) -> Box<dyn Iterator<Item = RefEngineReference> + 'a>;
}

/// A CAS-engine configuration along with where it came from
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CasEngineReference {
    pub config: Map<String, Value>,
    pub uri: Url,
}

/// A discovered ref-engine configuration
///
/// Carries every CAS engine suggested alongside it, and the URI of the
/// document it came from, which serves as the base for relative URIs in the
/// configuration.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RefEngineReference {
    pub config: Map<String, Value>,
    #[serde(rename = "casEngines", skip_serializing_if = "Vec::is_empty")]
    pub cas_engines: Vec<CasEngineReference>,
    pub uri: Url,
}

impl RefEngineReference {
    /// The configured protocol, if there is one and it's a string
    pub fn protocol(&self) -> Option<&str> {
        self.config.get("protocol").and_then(Value::as_str)
    }
}

/// Split a ref-engines object into one reference per ref engine
///
/// The object looks like `{"refEngines": [...], "casEngines": [...]}`, both
/// members optional. Each ref engine is paired with all of the CAS engines.
pub fn references_from_ref_engines_object(
    object: &Value,
    uri: &Url,
) -> Result<Vec<RefEngineReference>, ResolveError> {
    let shape_error = || ResolveError::ConfigShape {
        uri: uri.to_string(),
        media_type: media_types::REF_ENGINES.to_owned(),
        value: object.clone(),
    };
    let object_map = object.as_object().ok_or_else(shape_error)?;
    let configs = |key: &str| -> Result<Vec<Map<String, Value>>, ResolveError> {
        match object_map.get(key) {
            None => Ok(vec![]),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| item.as_object().cloned().ok_or_else(shape_error))
                .collect(),
            Some(_) => Err(shape_error()),
        }
    };

    let cas_engines: Vec<CasEngineReference> = configs("casEngines")?
        .into_iter()
        .map(|config| CasEngineReference {
            config,
            uri: uri.clone(),
        })
        .collect();
    Ok(configs("refEngines")?
        .into_iter()
        .map(|config| RefEngineReference {
            config,
            cas_engines: cas_engines.clone(),
            uri: uri.clone(),
        })
        .collect())
}
