#[macro_use] extern crate clap;

use clap::{App, ArgMatches};
use env_logger::{from_env, Env};
use oci_discovery::{HttpFetcher, Resolver};
use serde_json::{Map, Value};
use std::{process, sync::Arc, time::Duration};

fn main() {
    let yaml = load_yaml!("cli.yml");
    let matches = App::from_yaml(yaml).get_matches();

    let log_level = matches.value_of("log_level").unwrap();
    from_env(Env::default().default_filter_or(log_level)).init();

    let mut fetcher = HttpFetcher::builder();
    if let Some(secs) = matches.value_of("timeout") {
        match secs.parse() {
            Ok(secs) => fetcher = fetcher.request_timeout(Duration::from_secs(secs)),
            Err(err) => exit_with_error(format!("bad timeout {:?} ({})", secs, err)),
        }
    }
    let fetcher = match fetcher.build() {
        Ok(fetcher) => fetcher,
        Err(err) => exit_with_error(format!("can't create HTTP client ({})", err)),
    };

    let mut resolver = Resolver::builder().fetcher(Arc::new(fetcher));
    if matches.is_present("https_only") {
        resolver = resolver.https_only();
    }
    if let Some(port) = matches.value_of("port") {
        match port.parse() {
            Ok(port) => resolver = resolver.port(port),
            Err(err) => exit_with_error(format!("bad port {:?} ({})", port, err)),
        }
    }
    if matches.is_present("no_local_config") {
        resolver = resolver.no_local_config();
    }
    let config = string_values(&matches, "config");
    if !config.is_empty() {
        resolver = resolver.config_sources(config);
    }
    let resolver = match resolver.build() {
        Ok(resolver) => resolver,
        Err(err) => exit_with_error(err.to_string()),
    };

    let mut failed = false;
    let mut resolved = Map::new();
    for name in string_values(&matches, "names") {
        match resolver.resolve(&name) {
            Ok(roots) => {
                let roots = serde_json::to_value(roots).unwrap();
                resolved.insert(name, roots);
            }
            Err(err) => {
                log::error!("{}", err);
                failed = true;
            }
        }
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&Value::Object(resolved)).unwrap()
    );
    if failed {
        process::exit(1);
    }
}

fn exit_with_error(message: String) -> ! {
    log::error!("{}", message);
    process::exit(1)
}

fn string_values<S: AsRef<str>>(matches: &ArgMatches, name: S) -> Vec<String> {
    matches
        .values_of(name)
        .into_iter()
        .map(|values| values.map(|value| value.to_string()))
        .flatten()
        .collect()
}
