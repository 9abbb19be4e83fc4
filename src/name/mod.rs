//! Host-based image names and the hosts trusted to describe them


mod host;
mod name;

pub use host::{ancestor_hosts, is_address, AncestorHosts};
pub use name::ImageName;
