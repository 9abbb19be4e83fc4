use oci_discovery::{
    discovery::{DiscoveryEngine, RegexConfigEngine},
    fetch::media_types,
    refengine::DummyEngine,
    ImageName, MemoryFetcher, Resolver,
};
use serde_json::json;
use std::{fs, path::PathBuf, sync::Arc};
use tempfile::TempDir;
use url::Url;

fn common() -> TempDir {
    let _ = env_logger::builder().is_test(true).try_init();
    tempfile::tempdir().unwrap()
}

fn write_config(dir: &TempDir, file_name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(file_name);
    fs::write(&path, contents).unwrap();
    path
}

fn protocols(engine: &RegexConfigEngine, name: &str) -> Vec<String> {
    let name = ImageName::parse(name).unwrap();
    engine
        .ref_engines(&name)
        .map(|reference| reference.protocol().unwrap_or("").to_owned())
        .collect()
}

#[test]
fn first_source_wins() {
    let dir = common();
    let a = write_config(
        &dir,
        "a.json",
        &json!({"ab": {"refEngines": [{"protocol": "a-ab"}]}}).to_string(),
    );
    let b = write_config(
        &dir,
        "b.json",
        &json!({
            "ab": {"refEngines": [{"protocol": "b-ab"}]},
            "cd": {"refEngines": [{"protocol": "b-cd"}]}
        })
        .to_string(),
    );
    let engine = RegexConfigEngine::load(&[&a, &b]);
    let patterns: Vec<&str> = engine.entries().iter().map(|entry| entry.pattern()).collect();
    assert_eq!(patterns, vec!["ab", "cd"]);

    let ab = engine.entry("ab").unwrap();
    assert_eq!(ab.ref_engines_object(), &json!({"refEngines": [{"protocol": "a-ab"}]}));
    assert_eq!(ab.source_uri(), &Url::from_file_path(&a).unwrap());
    let cd = engine.entry("cd").unwrap();
    assert_eq!(cd.source_uri(), &Url::from_file_path(&b).unwrap());

    assert_eq!(protocols(&engine, "example.com/ab"), vec!["a-ab"]);
    assert_eq!(protocols(&engine, "example.com/cd"), vec!["b-cd"]);
    assert!(protocols(&engine, "example.com/ef").is_empty());
}

#[test]
fn every_match_contributes_longest_first() {
    let dir = common();
    let path = write_config(
        &dir,
        "config.json",
        &json!({
            "example": {"refEngines": [{"protocol": "short"}]},
            "^example\\.com/": {"refEngines": [{"protocol": "long"}]},
            "app$": {"refEngines": [{"protocol": "app"}, {"protocol": "app2"}]},
            "zzz": {"refEngines": [{"protocol": "unmatched"}]}
        })
        .to_string(),
    );
    let engine = RegexConfigEngine::load(&[path]);
    let patterns: Vec<&str> = engine.entries().iter().map(|entry| entry.pattern()).collect();
    assert_eq!(patterns, vec!["^example\\.com/", "example", "app$", "zzz"]);
    assert_eq!(
        protocols(&engine, "example.com/app"),
        vec!["long", "short", "app", "app2"]
    );
    assert_eq!(protocols(&engine, "other.example.net/x"), vec!["short"]);
}

#[test]
fn bad_sources_are_skipped() {
    let dir = common();
    let missing = dir.path().join("missing.json");
    let not_json = write_config(&dir, "not-json.json", "{");
    let not_object = write_config(&dir, "array.json", "[1, 2]");
    let good = write_config(
        &dir,
        "good.json",
        &json!({
            "(": {"refEngines": [{"protocol": "bad-regex"}]},
            "shape": ["not an object"],
            ".": {"refEngines": [{"protocol": "good"}]}
        })
        .to_string(),
    );
    let engine = RegexConfigEngine::load(&[missing, not_json, not_object, good]);
    let patterns: Vec<&str> = engine.entries().iter().map(|entry| entry.pattern()).collect();
    assert_eq!(patterns, vec!["shape", "."]);
    assert_eq!(protocols(&engine, "example.com/app"), vec!["good"]);
    assert_eq!(protocols(&engine, "example.com/shape"), vec!["good"]);
}

#[test]
fn directory_source_is_skipped() {
    let dir = common();
    let engine = RegexConfigEngine::load(&[dir.path()]);
    assert!(engine.entries().is_empty());
}

#[test]
fn local_config_comes_first() {
    let dir = common();
    let config = write_config(
        &dir,
        "config.json",
        &json!({
            "^example\\.com/": {
                "refEngines": [
                    {"protocol": "oci-index-template-v1", "uri": "https://{host}/oci-index/{path}"},
                    {"protocol": "_dummy", "response": [{"mediaType": "m", "root": {}, "uri": "u"}]}
                ],
                "casEngines": [{"protocol": "oci-cas-template-v1", "uri": "cas/{algorithm}"}]
            }
        })
        .to_string(),
    );
    let fetcher = Arc::new(MemoryFetcher::new().insert(
        "https://example.com/oci-index/app",
        media_types::IMAGE_INDEX,
        json!({"manifests": [{"digest": "sha256:aaaa"}]}),
    ));
    let resolver = Resolver::builder()
        .fetcher(fetcher.clone())
        .config_sources(vec![config.clone()])
        .https_only()
        .register(DummyEngine::PROTOCOL, DummyEngine::from_config)
        .build()
        .unwrap();
    let roots = resolver.resolve("example.com/app").unwrap();
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0].uri, "https://example.com/oci-index/app");
    assert_eq!(roots[0].root, json!({"digest": "sha256:aaaa"}));
    assert_eq!(
        roots[0].cas_engines[0]["uri"],
        json!(Url::from_file_path(&config).unwrap().as_str())
    );
    assert_eq!(roots[1].media_type, "m");
    // regex configuration comes before the well-known URI
    assert_eq!(
        fetcher.requests(),
        vec![
            "https://example.com/oci-index/app",
            "https://example.com/.well-known/oci-host-ref-engines",
        ]
    );
}
