//! Resolve host-based image names to Merkle roots
//!
//! A name like `example.com/app#1.0` is resolved in two steps. Discovery
//! engines find ref-engine configurations for the name, from local regex
//! configuration or from a well-known URI published by the host. Each ref
//! engine then turns the name into root descriptors, usually by fetching an
//! OCI image index.

#[macro_use] extern crate lazy_static;
#[macro_use] extern crate serde;

pub mod discovery;
pub mod errors;
pub mod fetch;
pub mod name;
pub mod refengine;
pub mod resolve;
pub mod template;

pub use crate::{
    discovery::{DiscoveryEngine, RefEngineReference},
    errors::ResolveError,
    fetch::{Fetcher, HttpFetcher, MemoryFetcher},
    name::ImageName,
    refengine::{RefEngine, Registry, RootDescriptor},
    resolve::{Resolver, ResolverBuilder},
};
