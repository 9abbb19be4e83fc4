use crate::errors::ResolveError;
use regex::Regex;
use std::{
    cmp::{Ordering, PartialOrd},
    fmt,
    hash::{Hash, Hasher},
    ops::Range,
    str,
    str::FromStr,
};

/// Parsed host-based image name
///
/// This is an owned struct representing a name of the form
/// `host/path[#fragment]`, which identifies an artifact by the host that is
/// trusted to publish it, a path on that host, and an optional fragment
/// selecting a specific version.
///
/// The grammar borrows its productions from RFC 3986. The host is an IP
/// literal in brackets, a dotted-decimal IPv4 address, or a registered name.
/// Ports are not part of the grammar, so `example.com:5000/a` is rejected.
/// Path segments may contain `:` and `@`, and the fragment may additionally
/// contain `/` and `?`.
///
/// A missing fragment and an empty fragment are equivalent; both match any
/// version.
#[derive(Clone)]
pub struct ImageName {
    serialized: String,
    host_pos: Range<usize>,
    path_pos: Range<usize>,
    fragment_pos: Option<Range<usize>>,
}

impl ImageName {
    /// Returns a reference to the existing string representation of an
    /// [ImageName]
    pub fn as_str(&self) -> &str {
        &self.serialized
    }

    /// Parse a [prim@str] as an [ImageName]
    pub fn parse(s: &str) -> Result<Self, ResolveError> {
        lazy_static! {
            static ref RE: Regex = Regex::new(&format!(
                "^{}/{}(?:#{})?$",
                ImageName::host_regex_str(),
                ImageName::path_regex_str(),
                ImageName::fragment_regex_str(),
            ))
            .unwrap();
        }
        match RE.captures(s) {
            None => Err(ResolveError::InvalidImageName(s.to_owned())),
            Some(captures) => Ok(ImageName {
                serialized: s.to_owned(),
                host_pos: captures.name("host").unwrap().range(),
                path_pos: captures.name("path").unwrap().range(),
                fragment_pos: captures.name("fragment").map(|m| m.range()),
            }),
        }
    }

    /// Build an [ImageName] from its component pieces
    ///
    /// This fails if any component is invalid, or if the combined string
    /// would parse into different components than the ones given.
    pub fn from_parts(host: &str, path: &str, fragment: Option<&str>) -> Result<Self, ResolveError> {
        let combined = match fragment {
            Some(fragment) => format!("{}/{}#{}", host, path, fragment),
            None => format!("{}/{}", host, path),
        };
        let parsed = ImageName::parse(&combined)?;
        if parsed.host() == host
            && parsed.path() == path
            && parsed.fragment() == fragment.unwrap_or("")
        {
            Ok(parsed)
        } else {
            // Parsing ambiguity
            Err(ResolveError::InvalidImageName(combined))
        }
    }

    /// Return references to the parsed components within this [ImageName]
    pub fn as_parts(&self) -> (&str, &str, &str) {
        (self.host(), self.path(), self.fragment())
    }

    /// Returns a reference to the host portion of the string
    pub fn host(&self) -> &str {
        &self.serialized[self.host_pos.clone()]
    }

    /// Returns a reference to the path portion of the string
    pub fn path(&self) -> &str {
        &self.serialized[self.path_pos.clone()]
    }

    /// Returns a reference to the fragment, or an empty string if there is
    /// none
    pub fn fragment(&self) -> &str {
        match &self.fragment_pos {
            Some(pos) => &self.serialized[pos.clone()],
            None => "",
        }
    }

    /// Does this name select a specific version?
    pub fn has_fragment(&self) -> bool {
        !self.fragment().is_empty()
    }

    pub(crate) fn ipv4_regex_str() -> &'static str {
        concat!(
            "(?:",
            /* */ "(?:[0-9]|[1-9][0-9]|1[0-9][0-9]|2[0-4][0-9]|25[0-5])",
            /* */ "(?:\\.(?:[0-9]|[1-9][0-9]|1[0-9][0-9]|2[0-4][0-9]|25[0-5])){3}",
            ")",
        )
    }

    fn host_regex_str() -> String {
        lazy_static! {
            static ref HOST: String = {
                let h16 = "[0-9a-fA-F]{1,4}";
                let ipv4 = ImageName::ipv4_regex_str();
                let ls32 = format!("(?:{h16}:{h16}|{ipv4})", h16 = h16, ipv4 = ipv4);
                let ipv6 = [
                    format!("(?:{h16}:){{6}}{ls32}", h16 = h16, ls32 = ls32),
                    format!("::(?:{h16}:){{5}}{ls32}", h16 = h16, ls32 = ls32),
                    format!("(?:{h16})?::(?:{h16}:){{4}}{ls32}", h16 = h16, ls32 = ls32),
                    format!(
                        "(?:(?:{h16}:){{0,1}}{h16})?::(?:{h16}:){{3}}{ls32}",
                        h16 = h16,
                        ls32 = ls32
                    ),
                    format!(
                        "(?:(?:{h16}:){{0,2}}{h16})?::(?:{h16}:){{2}}{ls32}",
                        h16 = h16,
                        ls32 = ls32
                    ),
                    format!(
                        "(?:(?:{h16}:){{0,3}}{h16})?::{h16}:{ls32}",
                        h16 = h16,
                        ls32 = ls32
                    ),
                    format!("(?:(?:{h16}:){{0,4}}{h16})?::{ls32}", h16 = h16, ls32 = ls32),
                    format!("(?:(?:{h16}:){{0,5}}{h16})?::{h16}", h16 = h16),
                    format!("(?:(?:{h16}:){{0,6}}{h16})?::", h16 = h16),
                ]
                .join("|");
                let ipvfuture = "v[0-9a-fA-F]+\\.[a-zA-Z0-9._~!$&'()*+,;=:-]+";
                format!(
                    "(?P<host>\\[(?:{ipv6}|{ipvfuture})\\]|{ipv4}|{reg_name})",
                    ipv6 = ipv6,
                    ipvfuture = ipvfuture,
                    ipv4 = ipv4,
                    reg_name = "[a-zA-Z0-9._~%!$&'()*+,;=-]+",
                )
            };
        }
        HOST.clone()
    }

    fn path_regex_str() -> &'static str {
        concat!(
            "(?P<path>",
            /* */ "[a-zA-Z0-9._~%!$&'()*+,;=:@-]+", // first segment is never empty
            /* */ "(?:/[a-zA-Z0-9._~%!$&'()*+,;=:@-]*)*",
            ")",
        )
    }

    fn fragment_regex_str() -> &'static str {
        "(?P<fragment>[/?a-zA-Z0-9._~%!$&'()*+,;=:@-]*)"
    }
}

impl Eq for ImageName {}

impl PartialEq for ImageName {
    fn eq(&self, other: &Self) -> bool {
        self.serialized.eq(&other.serialized)
    }
}

impl FromStr for ImageName {
    type Err = ResolveError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImageName::parse(s)
    }
}

impl fmt::Display for ImageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Debug for ImageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl Hash for ImageName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.serialized.hash(state);
    }
}

impl Ord for ImageName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.serialized.cmp(&other.serialized)
    }
}

impl PartialOrd for ImageName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.serialized.partial_cmp(&other.serialized)
    }
}
