use super::*;
use crate::fetch::MemoryFetcher;
use serde_json::json;
use std::sync::Arc;

fn uri(s: &str) -> Url {
    Url::parse(s).unwrap()
}

fn name(s: &str) -> ImageName {
    ImageName::parse(s).unwrap()
}

#[test]
fn decompose_ref_engines_object() {
    let source = uri("https://example.com/.well-known/oci-host-ref-engines");
    let object = json!({
        "refEngines": [
            {"protocol": "oci-index-template-v1", "uri": "https://a.example.com/{path}"},
            {"protocol": "_dummy", "response": []}
        ],
        "casEngines": [{"protocol": "oci-cas-template-v1", "uri": "https://b.example.com/{algorithm}/{encoded}"}]
    });
    let references = references_from_ref_engines_object(&object, &source).unwrap();
    assert_eq!(references.len(), 2);
    assert_eq!(references[0].protocol(), Some("oci-index-template-v1"));
    assert_eq!(references[1].protocol(), Some("_dummy"));
    for reference in &references {
        assert_eq!(reference.uri, source);
        assert_eq!(reference.cas_engines.len(), 1);
        assert_eq!(reference.cas_engines[0].uri, source);
        assert_eq!(
            reference.cas_engines[0].config.get("protocol"),
            Some(&json!("oci-cas-template-v1"))
        );
    }
}

#[test]
fn decompose_sparse_objects() {
    let source = uri("https://example.com/x");
    assert!(references_from_ref_engines_object(&json!({}), &source)
        .unwrap()
        .is_empty());
    assert!(
        references_from_ref_engines_object(&json!({"casEngines": [{"protocol": "x"}]}), &source)
            .unwrap()
            .is_empty()
    );
    let references =
        references_from_ref_engines_object(&json!({"refEngines": [{"protocol": "x"}]}), &source)
            .unwrap();
    assert_eq!(references.len(), 1);
    assert!(references[0].cas_engines.is_empty());
    assert_eq!(references[0].protocol(), Some("x"));
    let references =
        references_from_ref_engines_object(&json!({"refEngines": [{"uri": "y"}]}), &source)
            .unwrap();
    assert_eq!(references[0].protocol(), None);
}

#[test]
fn decompose_bad_shapes() {
    let source = uri("https://example.com/x");
    for bad in &[
        json!([]),
        json!("refEngines"),
        json!({"refEngines": {}}),
        json!({"refEngines": [1]}),
        json!({"refEngines": [{}], "casEngines": "no"}),
        json!({"casEngines": [[]]}),
    ] {
        match references_from_ref_engines_object(bad, &source) {
            Err(ResolveError::ConfigShape {
                uri,
                media_type,
                value,
            }) => {
                assert_eq!(uri, "https://example.com/x");
                assert_eq!(media_type, media_types::REF_ENGINES);
                assert_eq!(&value, bad);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }
}

#[test]
fn serialize_reference() {
    let source = uri("https://example.com/x");
    let references = references_from_ref_engines_object(
        &json!({"refEngines": [{"protocol": "p"}], "casEngines": [{"protocol": "c"}]}),
        &source,
    )
    .unwrap();
    assert_eq!(
        serde_json::to_value(&references[0]).unwrap(),
        json!({
            "config": {"protocol": "p"},
            "casEngines": [{"config": {"protocol": "c"}, "uri": "https://example.com/x"}],
            "uri": "https://example.com/x"
        })
    );
}

#[test]
fn well_known_walks_ancestors() {
    let _ = env_logger::builder().is_test(true).try_init();
    let fetcher = Arc::new(MemoryFetcher::new().insert(
        "http://example.com/.well-known/oci-host-ref-engines",
        media_types::REF_ENGINES,
        json!({"refEngines": [{"protocol": "x"}]}),
    ));
    let engine = WellKnownUriEngine::new(fetcher.clone());
    let name = name("a.b.example.com/app#1.0");
    let references: Vec<RefEngineReference> = engine.ref_engines(&name).collect();
    assert_eq!(references.len(), 1);
    assert_eq!(
        references[0].uri.as_str(),
        "http://example.com/.well-known/oci-host-ref-engines"
    );
    assert_eq!(
        fetcher.requests(),
        vec![
            "https://a.b.example.com/.well-known/oci-host-ref-engines",
            "https://b.example.com/.well-known/oci-host-ref-engines",
            "https://example.com/.well-known/oci-host-ref-engines",
            "http://a.b.example.com/.well-known/oci-host-ref-engines",
            "http://b.example.com/.well-known/oci-host-ref-engines",
            "http://example.com/.well-known/oci-host-ref-engines",
        ]
    );
}

#[test]
fn well_known_skips_answered_hosts() {
    let _ = env_logger::builder().is_test(true).try_init();
    let fetcher = Arc::new(
        MemoryFetcher::new()
            .insert(
                "https://example.com/.well-known/oci-host-ref-engines",
                media_types::REF_ENGINES,
                json!({"refEngines": [{"protocol": "x"}]}),
            )
            .insert(
                "http://example.com/.well-known/oci-host-ref-engines",
                media_types::REF_ENGINES,
                json!({"refEngines": [{"protocol": "y"}]}),
            )
            .insert(
                "http://a.example.com/.well-known/oci-host-ref-engines",
                media_types::REF_ENGINES,
                json!({"refEngines": [{"protocol": "z"}]}),
            ),
    );
    let engine = WellKnownUriEngine::new(fetcher.clone());
    let name = name("a.example.com/app");
    let protocols: Vec<Option<String>> = engine
        .ref_engines(&name)
        .map(|reference| reference.protocol().map(str::to_owned))
        .collect();
    assert_eq!(protocols, vec![Some("x".to_owned()), Some("z".to_owned())]);
    assert_eq!(
        fetcher.requests(),
        vec![
            "https://a.example.com/.well-known/oci-host-ref-engines",
            "https://example.com/.well-known/oci-host-ref-engines",
            "http://a.example.com/.well-known/oci-host-ref-engines",
        ]
    );
}

#[test]
fn well_known_is_lazy() {
    let fetcher = Arc::new(
        MemoryFetcher::new()
            .insert(
                "https://a.example.com/.well-known/oci-host-ref-engines",
                media_types::REF_ENGINES,
                json!({"refEngines": [{"protocol": "x"}]}),
            )
            .insert(
                "https://example.com/.well-known/oci-host-ref-engines",
                media_types::REF_ENGINES,
                json!({"refEngines": [{"protocol": "y"}]}),
            ),
    );
    let engine = WellKnownUriEngine::new(fetcher.clone());
    let name = name("a.example.com/app");
    let mut references = engine.ref_engines(&name);
    assert!(fetcher.requests().is_empty());
    assert_eq!(references.next().unwrap().protocol(), Some("x"));
    assert_eq!(fetcher.requests().len(), 1);
    drop(references);
    assert_eq!(fetcher.requests().len(), 1);
}

#[test]
fn well_known_recovers_from_bad_documents() {
    let _ = env_logger::builder().is_test(true).try_init();
    let fetcher = Arc::new(
        MemoryFetcher::new()
            .insert(
                "https://a.example.com/.well-known/oci-host-ref-engines",
                "text/html",
                json!("not this"),
            )
            .insert(
                "https://example.com/.well-known/oci-host-ref-engines",
                media_types::REF_ENGINES,
                json!(["wrong shape"]),
            )
            .insert(
                "http://example.com/.well-known/oci-host-ref-engines",
                media_types::REF_ENGINES,
                json!({"refEngines": [{"protocol": "y"}]}),
            ),
    );
    let engine = WellKnownUriEngine::new(fetcher.clone());
    let name = name("a.example.com/app");
    // example.com answered over https, so http is never asked
    assert_eq!(engine.ref_engines(&name).count(), 0);
    assert_eq!(
        fetcher.requests(),
        vec![
            "https://a.example.com/.well-known/oci-host-ref-engines",
            "https://example.com/.well-known/oci-host-ref-engines",
            "http://a.example.com/.well-known/oci-host-ref-engines",
        ]
    );
}

#[test]
fn well_known_follows_redirects() {
    let fetcher = Arc::new(
        MemoryFetcher::new()
            .redirect(
                "https://example.com/.well-known/oci-host-ref-engines",
                "https://config.example.net/engines.json",
            )
            .insert(
                "https://config.example.net/engines.json",
                media_types::REF_ENGINES,
                json!({"refEngines": [{"protocol": "x"}], "casEngines": [{"protocol": "c"}]}),
            ),
    );
    let engine = WellKnownUriEngine::new(fetcher);
    let name = name("example.com/app");
    let references: Vec<RefEngineReference> = engine.ref_engines(&name).collect();
    assert_eq!(references.len(), 1);
    assert_eq!(
        references[0].uri.as_str(),
        "https://config.example.net/engines.json"
    );
    assert_eq!(
        references[0].cas_engines[0].uri.as_str(),
        "https://config.example.net/engines.json"
    );
}

#[test]
fn well_known_protocols_and_port() {
    let fetcher = Arc::new(MemoryFetcher::new());
    let engine = WellKnownUriEngine::new(fetcher.clone())
        .protocols(vec!["http".to_owned()])
        .port(8080);
    let name = name("example.com/app");
    assert_eq!(engine.ref_engines(&name).count(), 0);
    assert_eq!(
        fetcher.requests(),
        vec!["http://example.com:8080/.well-known/oci-host-ref-engines"]
    );

    let engine = WellKnownUriEngine::new(fetcher).protocols(vec![]);
    assert_eq!(
        format!("{:?}", engine),
        "WellKnownUriEngine { protocols: [\"https\", \"http\"], port: None }"
    );
}

#[test]
fn well_known_address_hosts() {
    let fetcher = Arc::new(MemoryFetcher::new());
    let engine = WellKnownUriEngine::new(fetcher.clone()).protocols(vec!["https".to_owned()]);
    assert_eq!(engine.ref_engines(&name("192.168.0.1/app")).count(), 0);
    assert_eq!(engine.ref_engines(&name("[::1]/app")).count(), 0);
    assert_eq!(
        fetcher.requests(),
        vec![
            "https://192.168.0.1/.well-known/oci-host-ref-engines",
            "https://[::1]/.well-known/oci-host-ref-engines",
        ]
    );
}

#[test]
fn default_config_paths_end_with_file_name() {
    for path in RegexConfigEngine::default_config_paths(DEFAULT_SUBDIR) {
        assert!(path.ends_with("oci-discovery/ref-engine-discovery.json"));
    }
}
