use crate::{
    errors::ResolveError,
    fetch::{media_types, Fetcher},
    name::ImageName,
    refengine::{EngineConfig, RefEngine, RootDescriptor, Roots},
    template::UriTemplate,
};
use serde_json::Value;
use std::{collections::HashMap, fmt, iter, sync::Arc};
use url::Url;

/// Annotation naming the version a manifest entry stands for
pub const REF_NAME_ANNOTATION: &str = "org.opencontainers.image.ref.name";

/// Ref engine which fetches an OCI image index from a templated URI
///
/// The template is expanded with the `host`, `path`, and `fragment` of the
/// image name, plus the whole `name`. The result may be relative, in which
/// case it is resolved against the URI the engine's configuration came from.
///
/// Every manifest entry in the index is a candidate root. With an empty
/// fragment all of them are returned; otherwise only entries whose
/// `org.opencontainers.image.ref.name` annotation equals the fragment.
#[derive(Clone)]
pub struct IndexTemplateEngine {
    template: UriTemplate,
    base: Option<Url>,
    fetcher: Arc<dyn Fetcher>,
}

impl IndexTemplateEngine {
    pub const PROTOCOL: &'static str = "oci-index-template-v1";

    pub fn new(template: UriTemplate, base: Option<Url>, fetcher: Arc<dyn Fetcher>) -> Self {
        IndexTemplateEngine {
            template,
            base,
            fetcher,
        }
    }

    /// Registry constructor, reading a `uri` template from the configuration
    pub fn from_config(config: EngineConfig) -> Result<Box<dyn RefEngine>, ResolveError> {
        let template = UriTemplate::parse(config.required_str("uri")?)?;
        Ok(Box::new(IndexTemplateEngine::new(
            template,
            config.base,
            config.fetcher,
        )))
    }

    /// Expand the template for a name, resolved against the base URI
    pub fn index_uri(&self, name: &ImageName) -> Result<Url, ResolveError> {
        let mut vars = HashMap::new();
        vars.insert("name", name.as_str());
        vars.insert("host", name.host());
        vars.insert("path", name.path());
        vars.insert("fragment", name.fragment());
        let expanded = self.template.expand(&vars);
        Ok(match &self.base {
            Some(base) => base.join(&expanded)?,
            None => Url::parse(&expanded)?,
        })
    }

    fn fetch_roots(&self, name: &ImageName) -> Result<Vec<RootDescriptor>, ResolveError> {
        let uri = self.index_uri(name)?;
        log::debug!("fetching an OCI index for {} from {}", name, uri);
        let fetched = self.fetcher.fetch_json(&uri, media_types::IMAGE_INDEX)?;
        log::debug!("received OCI index object: {}", fetched.json);

        let schema_error = || ResolveError::Schema {
            uri: fetched.uri.to_string(),
            media_type: media_types::IMAGE_INDEX.to_owned(),
            body: fetched.json.clone(),
        };
        let index = fetched.json.as_object().ok_or_else(schema_error)?;
        let manifests = match index.get("manifests") {
            None => return Ok(vec![]),
            Some(Value::Array(manifests)) => manifests,
            Some(_) => return Err(schema_error()),
        };

        let mut roots = vec![];
        for entry in manifests {
            let entry_object = entry.as_object().ok_or_else(schema_error)?;
            let ref_name = match entry_object.get("annotations") {
                None => None,
                Some(Value::Object(annotations)) => {
                    annotations.get(REF_NAME_ANNOTATION).and_then(Value::as_str)
                }
                Some(_) => return Err(schema_error()),
            };
            if !name.has_fragment() || ref_name == Some(name.fragment()) {
                roots.push(RootDescriptor {
                    media_type: media_types::DESCRIPTOR.to_owned(),
                    root: entry.clone(),
                    uri: fetched.uri.to_string(),
                    cas_engines: vec![],
                });
            }
        }
        Ok(roots)
    }
}

impl RefEngine for IndexTemplateEngine {
    fn resolve(&self, name: &ImageName) -> Roots {
        let engine = self.clone();
        let name = name.clone();
        Box::new(
            iter::once_with(move || engine.fetch_roots(&name)).flat_map(|result| match result {
                Ok(roots) => roots.into_iter().map(Ok).collect::<Vec<_>>(),
                Err(err) => vec![Err(err)],
            }),
        )
    }
}

impl fmt::Display for IndexTemplateEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} uri={}>", IndexTemplateEngine::PROTOCOL, self.template)
    }
}
