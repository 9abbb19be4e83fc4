//! Ref engines turn an image name into Merkle root descriptors


mod dummy;
mod index_template;
mod registry;

pub use dummy::DummyEngine;
pub use index_template::IndexTemplateEngine;
pub use registry::{Constructor, EngineConfig, Registry};

use crate::{errors::ResolveError, name::ImageName};
use serde_json::Value;
use std::fmt;

/// Lazily produced roots from one ref engine
///
/// An `Err` means the engine could not continue; consumers should not expect
/// anything further from the same sequence.
pub type Roots = Box<dyn Iterator<Item = Result<RootDescriptor, ResolveError>>>;

/// A pluggable resolver from image names to Merkle roots
///
/// Nothing is fetched until the returned sequence is consumed. The sequence
/// owns everything it needs, so it may outlive the engine that made it.
pub trait RefEngine: fmt::Display {
    fn resolve(&self, name: &ImageName) -> Roots;
}

/// A Merkle root along with where it came from
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RootDescriptor {
    #[serde(rename = "mediaType")]
    pub media_type: String,
    /// The root itself, kept as opaque JSON
    pub root: Value,
    /// Where the root was found, usable as a base for relative references
    pub uri: String,
    /// CAS engines suggested for retrieving content below this root
    #[serde(rename = "casEngines", default, skip_serializing_if = "Vec::is_empty")]
    pub cas_engines: Vec<Value>,
}

impl RootDescriptor {
    /// Key for structural deduplication
    ///
    /// This is a JSON serialization of the whole descriptor with object keys
    /// sorted at every level, so two descriptors have the same key exactly
    /// when they have the same content.
    pub fn dedup_key(&self) -> String {
        let mut key = String::new();
        let value = serde_json::json!({
            "mediaType": self.media_type,
            "root": self.root,
            "uri": self.uri,
            "casEngines": self.cas_engines,
        });
        write_canonical_json(&mut key, &value);
        key
    }
}

fn write_canonical_json(out: &mut String, value: &Value) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical_json(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical_json(out, &map[key]);
            }
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
