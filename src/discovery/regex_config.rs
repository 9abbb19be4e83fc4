use crate::{
    discovery::{references_from_ref_engines_object, DiscoveryEngine, RefEngineReference},
    name::ImageName,
};
use regex::Regex;
use serde_json::Value;
use std::{
    cmp::Reverse,
    collections::BTreeMap,
    env, fmt, fs, io,
    path::{Path, PathBuf},
};
use url::Url;

/// File name looked up in each configuration directory
pub const CONFIG_FILE: &str = "ref-engine-discovery.json";

/// Subdirectory of each XDG configuration directory holding [CONFIG_FILE]
pub const DEFAULT_SUBDIR: &str = "oci-discovery";

const REGEXP_REF_ENGINES: &str = "application/vnd.oci.regexp-ref-engines.v1+json";

/// One compiled pattern from the local configuration
pub struct RegexConfigEntry {
    pattern: String,
    regex: Regex,
    ref_engines: Value,
    uri: Url,
}

impl RegexConfigEntry {
    /// The pattern as written in the configuration
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The ref-engines object this pattern maps to
    pub fn ref_engines_object(&self) -> &Value {
        &self.ref_engines
    }

    /// The configuration file this pattern was loaded from
    pub fn source_uri(&self) -> &Url {
        &self.uri
    }

    pub fn is_match(&self, name: &ImageName) -> bool {
        self.regex.is_match(name.as_str())
    }
}

impl fmt::Debug for RegexConfigEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} from {}", self.pattern, self.uri)
    }
}

/// Discovers ref engines from locally configured regular expressions
///
/// Configuration is a list of JSON files in priority order, each mapping
/// regular expressions to ref-engines objects. When two files define the same
/// pattern, the higher-priority one wins. Configuration is read once, when
/// the engine is created.
///
/// Every pattern which matches somewhere in the image name contributes its
/// ref engines. Patterns are tried longest first (ties in lexical order), so
/// the more specific configuration tends to come first.
pub struct RegexConfigEngine {
    entries: Vec<RegexConfigEntry>,
}

impl RegexConfigEngine {
    /// Load configuration from the default XDG locations
    pub fn new() -> Self {
        RegexConfigEngine::load(&RegexConfigEngine::default_config_paths(DEFAULT_SUBDIR))
    }

    /// Load configuration from the given files, highest priority first
    ///
    /// Missing files are skipped quietly. Unreadable files, files that aren't
    /// JSON objects, and patterns that don't compile are skipped with a
    /// warning.
    pub fn load<P: AsRef<Path>>(sources: &[P]) -> Self {
        let mut merged: BTreeMap<String, (Value, Url)> = BTreeMap::new();
        for source in sources {
            if let Some((uri, config)) = read_source(source.as_ref()) {
                for (pattern, ref_engines) in config {
                    if merged.contains_key(&pattern) {
                        continue;
                    }
                    log::debug!("load {:?} from {}", pattern, uri);
                    merged.insert(pattern, (ref_engines, uri.clone()));
                }
            }
        }

        let mut patterns: Vec<String> = merged.keys().cloned().collect();
        patterns.sort_by_key(|pattern| (Reverse(pattern.len()), pattern.clone()));

        let mut entries = Vec::new();
        for pattern in patterns {
            let regex = match Regex::new(&pattern) {
                Ok(regex) => regex,
                Err(err) => {
                    log::warn!("invalid regular expression {:?} ({})", pattern, err);
                    continue;
                }
            };
            if let Some((ref_engines, uri)) = merged.remove(&pattern) {
                entries.push(RegexConfigEntry {
                    pattern,
                    regex,
                    ref_engines,
                    uri,
                });
            }
        }
        RegexConfigEngine { entries }
    }

    /// The compiled patterns, in the order they are tried
    pub fn entries(&self) -> &[RegexConfigEntry] {
        &self.entries
    }

    /// Find the entry for a pattern
    pub fn entry(&self, pattern: &str) -> Option<&RegexConfigEntry> {
        self.entries.iter().find(|entry| entry.pattern == pattern)
    }

    /// Configuration files to read, in decreasing priority
    ///
    /// The user's file comes from `$XDG_CONFIG_HOME`, defaulting to
    /// `$HOME/.config`. System files come from each directory in
    /// `$XDG_CONFIG_DIRS`, defaulting to `/etc/xdg`. Paths are returned
    /// whether or not they exist.
    pub fn default_config_paths(subdir: &str) -> Vec<PathBuf> {
        let tail = Path::new(subdir).join(CONFIG_FILE);
        let mut paths = vec![];
        let home = match env::var("XDG_CONFIG_HOME") {
            Ok(s) if !s.is_empty() => Some(PathBuf::from(s)),
            _ => env::var("HOME")
                .ok()
                .filter(|s| !s.is_empty())
                .map(|s| Path::new(&s).join(".config")),
        };
        if let Some(home) = home {
            paths.push(home.join(&tail));
        }
        let dirs = match env::var("XDG_CONFIG_DIRS") {
            Ok(s) if !s.is_empty() => s,
            _ => "/etc/xdg".to_owned(),
        };
        for dir in dirs.split(':').filter(|dir| !dir.is_empty()) {
            paths.push(Path::new(dir).join(&tail));
        }
        paths
    }
}

impl Default for RegexConfigEngine {
    fn default() -> Self {
        RegexConfigEngine::new()
    }
}

fn read_source(path: &Path) -> Option<(Url, serde_json::Map<String, Value>)> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match env::current_dir() {
            Ok(dir) => dir.join(path),
            Err(err) => {
                log::warn!("can't resolve {:?} ({})", path, err);
                return None;
            }
        }
    };
    let uri = match Url::from_file_path(&path) {
        Ok(uri) => uri,
        Err(()) => {
            log::warn!("can't express {:?} as a file URI", path);
            return None;
        }
    };
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
        Err(err) => {
            log::warn!("failed to read {} ({})", uri, err);
            return None;
        }
    };
    log::debug!("requesting {} from {}", REGEXP_REF_ENGINES, uri);
    match serde_json::from_str(&text) {
        Ok(Value::Object(config)) => Some((uri, config)),
        Ok(other) => {
            log::warn!(
                "{} claimed to return {} but actually returned {}",
                uri,
                REGEXP_REF_ENGINES,
                other
            );
            None
        }
        Err(err) => {
            log::warn!("{} returned invalid JSON: {}", uri, err);
            None
        }
    }
}

impl DiscoveryEngine for RegexConfigEngine {
    fn ref_engines<'a>(
        &'a self,
        name: &'a ImageName,
    ) -> Box<dyn Iterator<Item = RefEngineReference> + 'a> {
        Box::new(
            self.entries
                .iter()
                .filter(move |entry| entry.is_match(name))
                .filter_map(move |entry| {
                    log::debug!("{:?} matched {:?} from {}", name.as_str(), entry.pattern, entry.uri);
                    match references_from_ref_engines_object(&entry.ref_engines, &entry.uri) {
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

impl fmt::Debug for RegexConfigEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}
