use crate::name::ImageName;
use regex::Regex;

/// Iterator over a host and its DNS ancestors
///
/// Discovery is first attempted at the most specific host, then at each
/// parent domain in turn, stopping at the last name which still has two
/// labels: `a.b.example.com` yields `a.b.example.com`, `b.example.com`, and
/// `example.com`. A single-label host yields only itself.
///
/// IP literals and IPv4 addresses have no ancestors and are yielded
/// unchanged. The iterator is [Clone], so a sequence can be restarted from
/// any point.
#[derive(Clone, Debug)]
pub struct AncestorHosts<'a> {
    next: Option<&'a str>,
    is_address: bool,
}

impl<'a> AncestorHosts<'a> {
    /// Start iterating from the given host
    pub fn new(host: &'a str) -> Self {
        AncestorHosts {
            next: Some(host),
            is_address: is_address(host),
        }
    }
}

impl<'a> Iterator for AncestorHosts<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let current = self.next.take()?;
        if !self.is_address {
            if let Some(dot) = current.find('.') {
                let parent = &current[dot + 1..];
                if parent.contains('.') {
                    self.next = Some(parent);
                }
            }
        }
        Some(current)
    }
}

/// Iterate through a host and its DNS ancestors
pub fn ancestor_hosts(host: &str) -> AncestorHosts<'_> {
    AncestorHosts::new(host)
}

/// Is this host an IP literal or a dotted-decimal IPv4 address?
pub fn is_address(host: &str) -> bool {
    lazy_static! {
        static ref IPV4: Regex =
            Regex::new(&format!("^{}$", ImageName::ipv4_regex_str())).unwrap();
    }
    host.starts_with('[') || IPV4.is_match(host)
}
